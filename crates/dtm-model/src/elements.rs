//! A compact element catalogue exercising the collection framework.
//!
//! The catalogue is intentionally small: a value-carrying [`Property`], a
//! min/max [`Range`], an order-preserving [`ElementList`] with cross-member
//! agreement rules, and the [`Submodel`] top-level object that owns elements.
//! Richer field sets (display names, categories, administrative information)
//! belong to concrete applications, not to the core.

use serde::{Deserialize, Serialize};

use crate::error::{ConstraintRule, ModelError, ModelResult};
use crate::list::ConstrainedList;
use crate::namespace::{KeySpec, NamespaceId, NamespaceSet};
use crate::ordered::{ConstraintHook, OrderedNamespaceSet};
use crate::traits::{Identifiable, KeyedMember, NamespaceMember, Referable};
use crate::Identifier;

/// Opaque reference to a semantic definition (e.g. a dictionary entry IRI).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference(pub String);

impl Reference {
    pub fn new(target: impl Into<String>) -> Self {
        Self(target.into())
    }
}

/// XSD-style value types a data element can declare.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    XsString,
    XsInteger,
    XsDouble,
    XsBoolean,
    XsAnyUri,
}

/// Additional qualification of an element, uniquely keyed by its type token
/// within the owning element's qualifier namespace.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Qualifier {
    pub qualifier_type: String,
    pub value_type: ValueType,
    pub value: Option<String>,
    #[serde(skip)]
    parent: Option<NamespaceId>,
}

impl Qualifier {
    pub fn new(qualifier_type: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            qualifier_type: qualifier_type.into(),
            value_type,
            value: None,
            parent: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

impl PartialEq for Qualifier {
    fn eq(&self, other: &Self) -> bool {
        self.qualifier_type == other.qualifier_type
            && self.value_type == other.value_type
            && self.value == other.value
    }
}

impl NamespaceMember for Qualifier {
    fn parent(&self) -> Option<NamespaceId> {
        self.parent
    }

    fn set_parent(&mut self, parent: Option<NamespaceId>) {
        self.parent = parent;
    }
}

fn qualifier_type_key(q: &Qualifier) -> Option<String> {
    Some(q.qualifier_type.clone())
}

static QUALIFIER_KEYS: [KeySpec<Qualifier>; 1] = [KeySpec {
    name: "type",
    unique: true,
    extract: qualifier_type_key,
}];

impl KeyedMember for Qualifier {
    fn key_specs() -> &'static [KeySpec<Qualifier>] {
        &QUALIFIER_KEYS
    }
}

/// A typed, value-carrying data element.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Property {
    pub id_short: String,
    pub value_type: ValueType,
    pub value: Option<String>,
    pub semantic_id: Option<Reference>,
    pub qualifiers: NamespaceSet<Qualifier>,
    pub supplemental_semantic_ids: ConstrainedList<Reference>,
    #[serde(skip)]
    parent: Option<NamespaceId>,
}

impl Property {
    pub fn new(id_short: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            id_short: id_short.into(),
            value_type,
            value: None,
            semantic_id: None,
            qualifiers: NamespaceSet::empty(QUALIFIER_KEYS.to_vec()),
            supplemental_semantic_ids: ConstrainedList::default(),
            parent: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_semantic_id(mut self, semantic_id: Reference) -> Self {
        self.semantic_id = Some(semantic_id);
        self
    }
}

impl PartialEq for Property {
    fn eq(&self, other: &Self) -> bool {
        self.id_short == other.id_short
            && self.value_type == other.value_type
            && self.value == other.value
            && self.semantic_id == other.semantic_id
            && self.qualifiers == other.qualifiers
            && self.supplemental_semantic_ids == other.supplemental_semantic_ids
    }
}

/// A data element describing a min/max interval.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Range {
    pub id_short: String,
    pub value_type: ValueType,
    pub min: Option<String>,
    pub max: Option<String>,
    pub semantic_id: Option<Reference>,
    pub qualifiers: NamespaceSet<Qualifier>,
    #[serde(skip)]
    parent: Option<NamespaceId>,
}

impl Range {
    pub fn new(id_short: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            id_short: id_short.into(),
            value_type,
            min: None,
            max: None,
            semantic_id: None,
            qualifiers: NamespaceSet::empty(QUALIFIER_KEYS.to_vec()),
            parent: None,
        }
    }
}

impl PartialEq for Range {
    fn eq(&self, other: &Self) -> bool {
        self.id_short == other.id_short
            && self.value_type == other.value_type
            && self.min == other.min
            && self.max == other.max
            && self.semantic_id == other.semantic_id
            && self.qualifiers == other.qualifiers
    }
}

/// Discriminant of an [`Element`], used by the type-agreement rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    Property,
    Range,
    List,
}

/// Any element a composite can contain, keyed uniquely by `id_short`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Element {
    Property(Property),
    Range(Range),
    List(ElementList),
}

impl Element {
    pub fn kind(&self) -> ElementKind {
        match self {
            Element::Property(_) => ElementKind::Property,
            Element::Range(_) => ElementKind::Range,
            Element::List(_) => ElementKind::List,
        }
    }

    pub fn semantic_id(&self) -> Option<&Reference> {
        match self {
            Element::Property(p) => p.semantic_id.as_ref(),
            Element::Range(r) => r.semantic_id.as_ref(),
            Element::List(l) => l.semantic_id.as_ref(),
        }
    }

    /// The declared value type, for the element kinds that carry one.
    pub fn value_type(&self) -> Option<ValueType> {
        match self {
            Element::Property(p) => Some(p.value_type),
            Element::Range(r) => Some(r.value_type),
            Element::List(_) => None,
        }
    }
}

impl NamespaceMember for Element {
    fn parent(&self) -> Option<NamespaceId> {
        match self {
            Element::Property(p) => p.parent,
            Element::Range(r) => r.parent,
            Element::List(l) => l.parent,
        }
    }

    fn set_parent(&mut self, parent: Option<NamespaceId>) {
        match self {
            Element::Property(p) => p.parent = parent,
            Element::Range(r) => r.parent = parent,
            Element::List(l) => l.parent = parent,
        }
    }
}

impl Referable for Element {
    fn id_short(&self) -> &str {
        match self {
            Element::Property(p) => &p.id_short,
            Element::Range(r) => &r.id_short,
            Element::List(l) => &l.id_short,
        }
    }
}

fn element_id_short_key(e: &Element) -> Option<String> {
    Some(e.id_short().to_string())
}

static ELEMENT_KEYS: [KeySpec<Element>; 1] = [KeySpec {
    name: "id_short",
    unique: true,
    extract: element_id_short_key,
}];

impl KeyedMember for Element {
    fn key_specs() -> &'static [KeySpec<Element>] {
        &ELEMENT_KEYS
    }
}

/// An order-preserving list of elements of one declared kind.
///
/// The list enforces three cross-member agreement rules on every insertion:
/// - every member is exactly the declared [`ElementKind`]
///   ([`ConstraintRule::TypeAgreement`]);
/// - for `Property`/`Range` lists, every member carries the declared member
///   value type ([`ConstraintRule::ValueTypeAgreement`]);
/// - members' semantic ids equal the declared member semantic id, or, when
///   none is declared, equal each other
///   ([`ConstraintRule::SemanticIdAgreement`]).
#[derive(Debug)]
pub struct ElementList {
    pub id_short: String,
    element_kind: ElementKind,
    member_semantic_id: Option<Reference>,
    member_value_type: Option<ValueType>,
    order_relevant: bool,
    pub semantic_id: Option<Reference>,
    members: OrderedNamespaceSet<Element>,
    parent: Option<NamespaceId>,
}

impl ElementList {
    /// Create a list for members of `element_kind`.
    ///
    /// `Property` and `Range` lists must declare a `member_value_type`
    /// ([`ConstraintRule::MissingValueType`] otherwise). Initial members pass
    /// through the full insertion path.
    pub fn new(
        id_short: impl Into<String>,
        element_kind: ElementKind,
        member_semantic_id: Option<Reference>,
        member_value_type: Option<ValueType>,
        order_relevant: bool,
        initial: impl IntoIterator<Item = Element>,
    ) -> ModelResult<Self> {
        if matches!(element_kind, ElementKind::Property | ElementKind::Range)
            && member_value_type.is_none()
        {
            return Err(ModelError::Constraint {
                rule: ConstraintRule::MissingValueType,
                message: format!(
                    "{element_kind:?} lists must declare a member value type"
                ),
            });
        }
        let hook = agreement_hook(
            element_kind,
            member_semantic_id.clone(),
            member_value_type,
        );
        let members =
            OrderedNamespaceSet::new(ELEMENT_KEYS.to_vec(), initial, Some(hook))?;
        Ok(Self {
            id_short: id_short.into(),
            element_kind,
            member_semantic_id,
            member_value_type,
            order_relevant,
            semantic_id: None,
            members,
            parent: None,
        })
    }

    pub fn element_kind(&self) -> ElementKind {
        self.element_kind
    }

    pub fn member_semantic_id(&self) -> Option<&Reference> {
        self.member_semantic_id.as_ref()
    }

    pub fn member_value_type(&self) -> Option<ValueType> {
        self.member_value_type
    }

    /// Whether the member order carries meaning; `false` means the list
    /// represents a set or bag.
    pub fn order_relevant(&self) -> bool {
        self.order_relevant
    }

    pub fn members(&self) -> &OrderedNamespaceSet<Element> {
        &self.members
    }

    pub fn members_mut(&mut self) -> &mut OrderedNamespaceSet<Element> {
        &mut self.members
    }
}

impl PartialEq for ElementList {
    fn eq(&self, other: &Self) -> bool {
        self.id_short == other.id_short
            && self.element_kind == other.element_kind
            && self.member_semantic_id == other.member_semantic_id
            && self.member_value_type == other.member_value_type
            && self.order_relevant == other.order_relevant
            && self.semantic_id == other.semantic_id
            && self.members == other.members
    }
}

impl Clone for ElementList {
    fn clone(&self) -> Self {
        let mut clone = Self::new(
            self.id_short.clone(),
            self.element_kind,
            self.member_semantic_id.clone(),
            self.member_value_type,
            self.order_relevant,
            self.members.iter().map(|m| {
                let mut m = m.clone();
                m.set_parent(None);
                m
            }),
        )
        .expect("clone of a valid list revalidates");
        clone.semantic_id = self.semantic_id.clone();
        clone
    }
}

impl NamespaceMember for ElementList {
    fn parent(&self) -> Option<NamespaceId> {
        self.parent
    }

    fn set_parent(&mut self, parent: Option<NamespaceId>) {
        self.parent = parent;
    }
}

impl Referable for ElementList {
    fn id_short(&self) -> &str {
        &self.id_short
    }
}

fn agreement_hook(
    kind: ElementKind,
    member_semantic_id: Option<Reference>,
    member_value_type: Option<ValueType>,
) -> ConstraintHook<Element> {
    Box::new(move |new, existing| {
        if new.kind() != kind {
            return Err(ModelError::Constraint {
                rule: ConstraintRule::TypeAgreement,
                message: format!(
                    "list holds {kind:?} members, got {:?} ({:?})",
                    new.kind(),
                    new.id_short()
                ),
            });
        }
        if let Some(declared) = &member_semantic_id {
            if let Some(got) = new.semantic_id() {
                if got != declared {
                    return Err(ModelError::Constraint {
                        rule: ConstraintRule::SemanticIdAgreement,
                        message: format!(
                            "member {:?} declares semantic id {:?}, list requires {:?}",
                            new.id_short(),
                            got.0,
                            declared.0
                        ),
                    });
                }
            }
        } else if let Some(new_sid) = new.semantic_id() {
            // No declared member semantic id: members that declare one must
            // agree with each other.
            for item in existing {
                if let Some(sid) = item.semantic_id() {
                    if sid != new_sid {
                        return Err(ModelError::Constraint {
                            rule: ConstraintRule::SemanticIdAgreement,
                            message: format!(
                                "member {:?} has semantic id {:?}, sibling {:?} has {:?}",
                                new.id_short(),
                                new_sid.0,
                                item.id_short(),
                                sid.0
                            ),
                        });
                    }
                }
            }
        }
        if let Some(declared) = member_value_type {
            if let Some(got) = new.value_type() {
                if got != declared {
                    return Err(ModelError::Constraint {
                        rule: ConstraintRule::ValueTypeAgreement,
                        message: format!(
                            "member {:?} has value type {got:?}, list requires {declared:?}",
                            new.id_short()
                        ),
                    });
                }
            }
        }
        Ok(())
    })
}

/// Serde representation: members as a plain sequence; the hook and namespace
/// id are rebuilt through [`ElementList::new`], which re-validates the
/// document's members on load.
#[derive(Deserialize)]
struct ElementListRepr {
    id_short: String,
    element_kind: ElementKind,
    member_semantic_id: Option<Reference>,
    member_value_type: Option<ValueType>,
    order_relevant: bool,
    semantic_id: Option<Reference>,
    members: Vec<Element>,
}

#[derive(Serialize)]
struct ElementListReprRef<'a> {
    id_short: &'a str,
    element_kind: ElementKind,
    member_semantic_id: &'a Option<Reference>,
    member_value_type: Option<ValueType>,
    order_relevant: bool,
    semantic_id: &'a Option<Reference>,
    members: &'a [Element],
}

impl Serialize for ElementList {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        ElementListReprRef {
            id_short: &self.id_short,
            element_kind: self.element_kind,
            member_semantic_id: &self.member_semantic_id,
            member_value_type: self.member_value_type,
            order_relevant: self.order_relevant,
            semantic_id: &self.semantic_id,
            members: self.members.as_slice(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ElementList {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let repr = ElementListRepr::deserialize(deserializer)?;
        let mut list = ElementList::new(
            repr.id_short,
            repr.element_kind,
            repr.member_semantic_id,
            repr.member_value_type,
            repr.order_relevant,
            repr.members,
        )
        .map_err(serde::de::Error::custom)?;
        list.semantic_id = repr.semantic_id;
        Ok(list)
    }
}

/// The top-level identifiable object: a coherent aspect of one asset,
/// structured as a namespace of elements.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Submodel {
    identifier: Identifier,
    pub id_short: String,
    pub semantic_id: Option<Reference>,
    pub elements: NamespaceSet<Element>,
    pub qualifiers: NamespaceSet<Qualifier>,
    pub supplemental_semantic_ids: ConstrainedList<Reference>,
    #[serde(skip)]
    source: String,
    #[serde(skip)]
    parent: Option<NamespaceId>,
}

impl Submodel {
    pub fn new(identifier: Identifier, id_short: impl Into<String>) -> Self {
        Self {
            identifier,
            id_short: id_short.into(),
            semantic_id: None,
            elements: NamespaceSet::empty(ELEMENT_KEYS.to_vec()),
            qualifiers: NamespaceSet::empty(QUALIFIER_KEYS.to_vec()),
            supplemental_semantic_ids: ConstrainedList::default(),
            source: String::new(),
            parent: None,
        }
    }
}

impl PartialEq for Submodel {
    fn eq(&self, other: &Self) -> bool {
        self.identifier == other.identifier
            && self.id_short == other.id_short
            && self.semantic_id == other.semantic_id
            && self.elements == other.elements
            && self.qualifiers == other.qualifiers
            && self.supplemental_semantic_ids == other.supplemental_semantic_ids
    }
}

impl NamespaceMember for Submodel {
    fn parent(&self) -> Option<NamespaceId> {
        self.parent
    }

    fn set_parent(&mut self, parent: Option<NamespaceId>) {
        self.parent = parent;
    }
}

impl Referable for Submodel {
    fn id_short(&self) -> &str {
        &self.id_short
    }
}

impl Identifiable for Submodel {
    fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    fn source(&self) -> &str {
        &self.source
    }

    fn set_source(&mut self, source: String) {
        self.source = source;
    }

    fn update_from(&mut self, other: Self) {
        let parent = self.parent;
        *self = other;
        self.parent = parent;
    }
}
