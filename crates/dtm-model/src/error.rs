use thiserror::Error;

/// Machine-checkable identifiers for the cross-member rules an ordered
/// element list can enforce.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConstraintRule {
    /// All members must be of the element kind the list declares.
    TypeAgreement,
    /// All members of a property/range list must carry the declared value type.
    ValueTypeAgreement,
    /// Members' semantic ids must agree with the declared member semantic id,
    /// or with each other when none is declared.
    SemanticIdAgreement,
    /// A property/range list was constructed without a member value type.
    MissingValueType,
}

impl ConstraintRule {
    /// Stable token used in error messages and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConstraintRule::TypeAgreement => "type-agreement",
            ConstraintRule::ValueTypeAgreement => "value-type-agreement",
            ConstraintRule::SemanticIdAgreement => "semantic-id-agreement",
            ConstraintRule::MissingValueType => "missing-value-type",
        }
    }
}

/// Errors produced by metamodel collections and element constructors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    /// Another member already holds this value for a unique key.
    #[error("duplicate value {value:?} for unique key {key:?}")]
    DuplicateKey { key: &'static str, value: String },

    /// The candidate is still attached to a different namespace.
    #[error("object {id_short:?} is already owned by another namespace")]
    AlreadyOwned { id_short: String },

    /// A secondary constraint rejected the insertion.
    #[error("constraint {} violated: {message}", rule.as_str())]
    Constraint {
        rule: ConstraintRule,
        message: String,
    },

    /// No member carries this value under the given key.
    #[error("no member with {key} = {value:?}")]
    NotFound { key: &'static str, value: String },

    /// The collection has no key with this attribute name.
    #[error("collection has no key named {key:?}")]
    UnknownKey { key: &'static str },

    /// An index-based access was out of bounds.
    #[error("index {index} out of bounds for collection of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },
}

/// Result alias for metamodel operations.
pub type ModelResult<T> = Result<T, ModelError>;
