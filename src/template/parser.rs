use crate::error::{BindrowError, Result};
use crate::template::template::{StringTemplate, Variable};

// Identifier characters allowed after the ':' sigil, e.g. :my_var.val
fn is_identifier_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'.'
}

fn parse_error(message: &str, position: usize) -> BindrowError {
    BindrowError::Parse {
        message: message.to_string(),
        position,
    }
}

/// Parses a query template, recording every `:identifier` occurrence that
/// falls outside quote-enclosed and dollar-enclosed literal regions.
///
/// Variables are returned in left-to-right order; duplicate names are kept
/// as separate entries, one per occurrence.
pub fn parse_template(text: &str) -> Result<StringTemplate> {
    let bytes = text.as_bytes();
    let mut variables = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        match bytes[pos] {
            b':' => variables.push(parse_identifier(text, bytes, &mut pos)?),
            b'\'' => skip_quoted(bytes, &mut pos)?,
            b'$' => skip_dollar_quoted(bytes, &mut pos)?,
            _ => pos += 1,
        }
    }

    Ok(StringTemplate::build(text, variables))
}

// The span covers the sigil and the identifier, inclusive on both ends;
// the recorded name excludes the sigil.
fn parse_identifier(text: &str, bytes: &[u8], pos: &mut usize) -> Result<Variable> {
    let start = *pos;
    *pos += 1;
    let ident_start = *pos;
    while *pos < bytes.len() && is_identifier_char(bytes[*pos]) {
        *pos += 1;
    }
    if *pos == ident_start {
        return Err(parse_error("invalid identifier", ident_start));
    }
    Ok(Variable {
        name: text[ident_start..*pos].to_string(),
        start,
        end: *pos - 1,
    })
}

fn skip_quoted(bytes: &[u8], pos: &mut usize) -> Result<()> {
    let start = *pos;
    *pos += 1;
    match find_byte(bytes, *pos, b'\'') {
        Some(close) => {
            *pos = close + 1;
            Ok(())
        }
        None => Err(parse_error("unterminated quote-enclosed string", start)),
    }
}

// A dollar-enclosed region opens with `$tag$` (tag may be empty) and runs
// until the identical `$tag$` sequence recurs. The terminator is matched as
// a found `$` followed by `tag$`, which is why `term` keeps its trailing
// dollar.
fn skip_dollar_quoted(bytes: &[u8], pos: &mut usize) -> Result<()> {
    let start = *pos;
    *pos += 1;
    let tag_start = *pos;
    match find_byte(bytes, *pos, b'$') {
        Some(tag_end) => *pos = tag_end + 1,
        None => return Err(parse_error("unterminated dollar-enclosed string", start)),
    }
    let term = &bytes[tag_start..*pos];

    loop {
        match find_byte(bytes, *pos, b'$') {
            Some(found) => {
                *pos = found + 1;
                if bytes[*pos..].starts_with(term) {
                    *pos += term.len();
                    return Ok(());
                }
            }
            None => return Err(parse_error("unterminated dollar-enclosed string", start)),
        }
    }
}

fn find_byte(bytes: &[u8], from: usize, needle: u8) -> Option<usize> {
    bytes[from..].iter().position(|&b| b == needle).map(|i| from + i)
}
