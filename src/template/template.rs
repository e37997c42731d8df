/// One named parameter occurrence inside a query template.
///
/// `start..=end` is the inclusive byte span of the occurrence in the
/// original text, covering the sigil. Spans are non-decreasing across the
/// variable sequence and never overlap a literal region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    /// Logical name; may encode a dotted property path (`user.name.first`).
    pub name: String,
    /// Byte offset of the sigil in the original text.
    pub start: usize,
    /// Byte offset of the last identifier character, inclusive.
    pub end: usize,
}

/// A parsed query template: the original text, its variables in
/// left-to-right order, and the transport-ready text with each variable
/// span replaced by a positional placeholder.
///
/// Templates are parsed once per distinct query text and are immutable
/// afterwards apart from the attached name and prepare flag.
#[derive(Debug, Clone)]
pub struct StringTemplate {
    text: String,
    variables: Vec<Variable>,
    prepared: String,
    name: Option<String>,
    prepare: bool,
}

/// Positional placeholder marker emitted per variable.
const PLACEHOLDER: &str = "?";

impl StringTemplate {
    pub(crate) fn build(text: &str, variables: Vec<Variable>) -> StringTemplate {
        let prepared = substitute(text, &variables);
        StringTemplate {
            text: text.to_string(),
            variables,
            prepared,
            name: None,
            prepare: false,
        }
    }

    /// Original query text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Variables in left-to-right order of occurrence; duplicates kept.
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Transport-ready text: one positional placeholder per variable, in
    /// the same order as [`StringTemplate::variables`], with all
    /// non-variable text preserved exactly.
    pub fn prepared_text(&self) -> &str {
        &self.prepared
    }

    /// Attaches a template name, used in diagnostics.
    pub fn with_name(mut self, name: impl Into<String>) -> StringTemplate {
        self.name = Some(name.into());
        self
    }

    /// Template name, when set.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Marks whether the statement should be prepared by the transport.
    pub fn with_prepare(mut self, prepare: bool) -> StringTemplate {
        self.prepare = prepare;
        self
    }

    /// Whether the statement should be prepared by the transport.
    pub fn prepare(&self) -> bool {
        self.prepare
    }
}

fn substitute(text: &str, variables: &[Variable]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for var in variables {
        out.push_str(&text[cursor..var.start]);
        out.push_str(PLACEHOLDER);
        cursor = var.end + 1;
    }
    out.push_str(&text[cursor..]);
    out
}
