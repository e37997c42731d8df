use super::ty::{Interpretation, Type};
use super::value::Tagged;

/// Resolves dotted property paths against tagged values and decides which
/// declared interpretations are enabled for the current execution.
///
/// This is the crate's rendering of the host reflection capability: the
/// binder asks it for the value behind `user.name.first`, and both mappers
/// ask it for the interpretation to fall back to when a type class has no
/// registered handler.
#[derive(Clone, Default)]
pub struct TypeResolver {
    enabled: Vec<String>,
}

/// Outcome of a property-path walk.
#[derive(Debug, PartialEq)]
pub enum Resolution {
    /// The path resolved to this value.
    Value(Tagged),
    /// The walk stopped: the named segment does not exist or the value it
    /// was applied to cannot be traversed.
    Unknown {
        /// Path segment that failed to resolve.
        segment: String,
    },
}

impl TypeResolver {
    /// A resolver with no named interpretations enabled.
    pub fn new() -> TypeResolver {
        TypeResolver::default()
    }

    /// Enables a named interpretation.
    pub fn with_interpretation(mut self, name: impl Into<String>) -> TypeResolver {
        self.enabled.push(name.into());
        self
    }

    /// Enabled interpretation names.
    pub fn enabled_interpretations(&self) -> &[String] {
        &self.enabled
    }

    /// First enabled interpretation declared on `ty`, if any.
    pub fn interpretation_for<'a>(&self, ty: &'a Type) -> Option<&'a Interpretation> {
        ty.find_interpretation(&self.enabled)
    }

    /// Walks `path` through nested object fields of `value`.
    ///
    /// An empty path resolves to the value itself. The walk cannot cross a
    /// null object or a non-object value; both stop it with
    /// [`Resolution::Unknown`].
    pub fn resolve_property_path(&self, value: &Tagged, path: &[String]) -> Resolution {
        let mut current = value;
        for segment in path {
            let object = match current.as_object() {
                Some(object) => object,
                None => {
                    return Resolution::Unknown {
                        segment: segment.clone(),
                    }
                }
            };
            current = match object.get(segment) {
                Some(next) => next,
                None => {
                    return Resolution::Unknown {
                        segment: segment.clone(),
                    }
                }
            };
        }
        Resolution::Value(current.clone())
    }
}

/// Convenience for resolving against a root type without a resolver
/// instance; used by tests and simple callers.
pub fn resolve_direct(value: &Tagged, path: &[String]) -> Option<Tagged> {
    match TypeResolver::new().resolve_property_path(value, path) {
        Resolution::Value(v) => Some(v),
        Resolution::Unknown { .. } => None,
    }
}
