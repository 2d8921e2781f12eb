use std::fmt;

use serde::{Deserialize, Serialize};

/// Discriminant of an [`Identifier`]: which naming scheme the id string
/// belongs to.
///
/// The `Display` token of the kind (`"IRI"`, `"IRDI"`, `"CUSTOM"`) is part of
/// the persistence contract: storage keys are derived from
/// `"{KIND}-{id}"`, so the tokens must never change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IdentifierKind {
    /// An Internationalized Resource Identifier (e.g. a URN or URL).
    Iri,
    /// An International Registration Data Identifier.
    Irdi,
    /// A proprietary, application-defined id string.
    Custom,
}

impl IdentifierKind {
    /// The canonical token hashed into storage keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentifierKind::Iri => "IRI",
            IdentifierKind::Irdi => "IRDI",
            IdentifierKind::Custom => "CUSTOM",
        }
    }
}

impl fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Globally unique name of a top-level domain object.
///
/// An `Identifier` is a plain value: two identifiers are the same identity
/// exactly when kind and id string are equal. It is immutable once assigned
/// to an object.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Identifier {
    kind: IdentifierKind,
    id: String,
}

impl Identifier {
    pub fn new(kind: IdentifierKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    /// Shorthand for the most common kind.
    pub fn iri(id: impl Into<String>) -> Self {
        Self::new(IdentifierKind::Iri, id)
    }

    pub fn kind(&self) -> IdentifierKind {
        self.kind
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identifier({}:{})", self.kind, self.id)
    }
}

/// `Display` is `"<KIND>:<id>"`, e.g. `"IRI:urn:example:pump-7"`.
impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_is_by_kind_and_id() {
        let a = Identifier::iri("urn:example:a");
        let b = Identifier::new(IdentifierKind::Iri, "urn:example:a");
        let c = Identifier::new(IdentifierKind::Custom, "urn:example:a");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn kind_tokens_are_stable() {
        assert_eq!(IdentifierKind::Iri.as_str(), "IRI");
        assert_eq!(IdentifierKind::Irdi.as_str(), "IRDI");
        assert_eq!(IdentifierKind::Custom.as_str(), "CUSTOM");
    }

    #[test]
    fn display_format() {
        let id = Identifier::iri("urn:example:a");
        assert_eq!(id.to_string(), "IRI:urn:example:a");
    }
}
