//! Attribute types
//!
//! Attributes arrive as JSON objects discriminated by `type`. The variants the
//! store reasons about (relations, components, dynamic zones, uid fields) are
//! parsed into closed structs; every other type (string, integer, media,
//! custom fields, ...) is kept as a [`ScalarAttribute`] with its options
//! preserved verbatim.

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

use crate::error::{BuilderError, Result};

/// Cardinality of a relation attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RelationKind {
    OneToOne,
    OneToMany,
    ManyToOne,
    ManyToMany,
    OneWay,
    ManyWay,
}

impl RelationKind {
    /// The kind the paired attribute on the other side carries
    pub fn opposite(self) -> RelationKind {
        match self {
            RelationKind::OneToMany => RelationKind::ManyToOne,
            RelationKind::ManyToOne => RelationKind::OneToMany,
            other => other,
        }
    }

    /// One-sided relations never have an opposite attribute
    pub fn is_one_sided(self) -> bool {
        matches!(self, RelationKind::OneWay | RelationKind::ManyWay)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::OneToOne => "oneToOne",
            RelationKind::OneToMany => "oneToMany",
            RelationKind::ManyToOne => "manyToOne",
            RelationKind::ManyToMany => "manyToMany",
            RelationKind::OneWay => "oneWay",
            RelationKind::ManyWay => "manyWay",
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A field referencing another content type (or the owner itself)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationAttribute {
    pub name: String,
    pub relation: RelationKind,
    /// uid of the related content type
    pub target: String,
    /// Name of the paired attribute on the target
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_attribute: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin_options: Option<Value>,
    /// Other keys (configurable, useJoinTable, ...), preserved verbatim
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

impl RelationAttribute {
    pub fn new(name: impl Into<String>, relation: RelationKind, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            relation,
            target: target.into(),
            target_attribute: None,
            private: None,
            plugin_options: None,
            options: Map::new(),
        }
    }

    /// Set the name of the paired attribute
    pub fn with_target_attribute(mut self, target_attribute: impl Into<String>) -> Self {
        self.target_attribute = Some(target_attribute.into());
        self
    }

    /// Pairing name, treating an empty string as absent
    pub fn pairing_name(&self) -> Option<&str> {
        self.target_attribute.as_deref().filter(|name| !name.is_empty())
    }

    /// Relation kind after accounting for a missing pairing name:
    /// `oneToOne` without one is `oneWay`, `oneToMany` without one is `manyWay`.
    pub fn effective_kind(&self) -> RelationKind {
        match (self.relation, self.pairing_name()) {
            (RelationKind::OneToOne, None) => RelationKind::OneWay,
            (RelationKind::OneToMany, None) => RelationKind::ManyWay,
            (kind, _) => kind,
        }
    }

    pub fn is_two_sided(&self) -> bool {
        !self.effective_kind().is_one_sided()
    }

    /// Whether the relation points back at `owner_uid`
    pub fn is_internal_to(&self, owner_uid: &str) -> bool {
        self.target == owner_uid
    }

    /// Build the paired attribute for the other side of a two-sided relation.
    ///
    /// Returns `None` for one-sided relations or when no pairing name is set.
    pub fn opposite(&self) -> Option<RelationAttribute> {
        let pair = self.pairing_name()?;
        let kind = self.effective_kind();
        if kind.is_one_sided() {
            return None;
        }

        Some(RelationAttribute {
            name: pair.to_string(),
            relation: kind.opposite(),
            target: self.target.clone(),
            target_attribute: Some(self.name.clone()),
            private: self.private.filter(|private| *private),
            plugin_options: None,
            options: Map::new(),
        })
    }
}

/// Embeds a single component (or a repeatable list of them)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentAttribute {
    pub name: String,
    pub component: String,
    #[serde(default)]
    pub repeatable: bool,
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

/// Heterogeneous list of components chosen from an allow-list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DynamicZoneAttribute {
    pub name: String,
    #[serde(default)]
    pub components: Vec<String>,
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

/// Slug-like field derived from another field, referenced by name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UidAttribute {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_field: Option<String>,
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

/// Any attribute the store does not reason about structurally
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScalarAttribute {
    pub name: String,
    /// The `type` discriminator (string, integer, media, ...)
    #[serde(skip)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_field: Option<String>,
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

/// A schema attribute
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Value")]
pub enum Attribute {
    Relation(RelationAttribute),
    Component(ComponentAttribute),
    DynamicZone(DynamicZoneAttribute),
    Uid(UidAttribute),
    Scalar(ScalarAttribute),
}

impl Attribute {
    pub fn scalar(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Attribute::Scalar(ScalarAttribute {
            name: name.into(),
            kind: kind.into(),
            custom_field: None,
            options: Map::new(),
        })
    }

    pub fn uid(name: impl Into<String>, target_field: Option<&str>) -> Self {
        Attribute::Uid(UidAttribute {
            name: name.into(),
            target_field: target_field.map(String::from),
            options: Map::new(),
        })
    }

    pub fn component(
        name: impl Into<String>,
        component: impl Into<String>,
        repeatable: bool,
    ) -> Self {
        Attribute::Component(ComponentAttribute {
            name: name.into(),
            component: component.into(),
            repeatable,
            options: Map::new(),
        })
    }

    pub fn dynamic_zone(name: impl Into<String>, components: Vec<String>) -> Self {
        Attribute::DynamicZone(DynamicZoneAttribute {
            name: name.into(),
            components,
            options: Map::new(),
        })
    }

    pub fn name(&self) -> &str {
        match self {
            Attribute::Relation(a) => &a.name,
            Attribute::Component(a) => &a.name,
            Attribute::DynamicZone(a) => &a.name,
            Attribute::Uid(a) => &a.name,
            Attribute::Scalar(a) => &a.name,
        }
    }

    /// The `type` discriminator as it appears on the wire
    pub fn type_name(&self) -> &str {
        match self {
            Attribute::Relation(_) => "relation",
            Attribute::Component(_) => "component",
            Attribute::DynamicZone(_) => "dynamiczone",
            Attribute::Uid(_) => "uid",
            Attribute::Scalar(a) => &a.kind,
        }
    }

    pub fn as_relation(&self) -> Option<&RelationAttribute> {
        match self {
            Attribute::Relation(relation) => Some(relation),
            _ => None,
        }
    }

    pub fn plugin_options(&self) -> Option<&Value> {
        match self {
            Attribute::Relation(a) => a.plugin_options.as_ref(),
            Attribute::Component(a) => a.options.get("pluginOptions"),
            Attribute::DynamicZone(a) => a.options.get("pluginOptions"),
            Attribute::Uid(a) => a.options.get("pluginOptions"),
            Attribute::Scalar(a) => a.options.get("pluginOptions"),
        }
    }

    /// Relation attribute pointing at `uid`
    pub fn targets(&self, uid: &str) -> bool {
        matches!(self, Attribute::Relation(a) if a.target == uid)
    }

    /// Component attribute embedding `uid`
    pub fn embeds(&self, uid: &str) -> bool {
        matches!(self, Attribute::Component(a) if a.component == uid)
    }

    /// Two-sided relation that points back at its owner
    pub fn is_internal_pair(&self, owner_uid: &str) -> bool {
        matches!(self, Attribute::Relation(a) if a.is_internal_to(owner_uid) && a.is_two_sided())
    }
}

impl From<RelationAttribute> for Attribute {
    fn from(relation: RelationAttribute) -> Self {
        Attribute::Relation(relation)
    }
}

impl TryFrom<Value> for Attribute {
    type Error = BuilderError;

    fn try_from(value: Value) -> Result<Self> {
        let Value::Object(mut map) = value else {
            return Err(BuilderError::InvalidPayload(
                "attribute must be a JSON object".to_string(),
            ));
        };

        let kind = match map.remove("type") {
            Some(Value::String(kind)) => kind,
            _ => {
                return Err(BuilderError::InvalidPayload(
                    "attribute is missing a string `type`".to_string(),
                ))
            }
        };

        // UI-only flag set by the "create component" flow
        map.remove("createComponent");

        match map.get("name") {
            Some(Value::String(name)) if !name.is_empty() => {}
            _ => {
                return Err(BuilderError::InvalidPayload(format!(
                    "{} attribute is missing a `name`",
                    kind
                )))
            }
        }

        let body = Value::Object(map);
        let attribute = match kind.as_str() {
            "relation" => Attribute::Relation(serde_json::from_value(body)?),
            "component" => Attribute::Component(serde_json::from_value(body)?),
            "dynamiczone" => Attribute::DynamicZone(serde_json::from_value(body)?),
            "uid" => Attribute::Uid(serde_json::from_value(body)?),
            _ => {
                let mut scalar: ScalarAttribute = serde_json::from_value(body)?;
                scalar.kind = kind;
                Attribute::Scalar(scalar)
            }
        };

        Ok(attribute)
    }
}

impl Serialize for Attribute {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Tagged<'a, T: Serialize> {
            #[serde(rename = "type")]
            kind: &'a str,
            #[serde(flatten)]
            inner: &'a T,
        }

        let kind = self.type_name();
        match self {
            Attribute::Relation(inner) => Tagged { kind, inner }.serialize(serializer),
            Attribute::Component(inner) => Tagged { kind, inner }.serialize(serializer),
            Attribute::DynamicZone(inner) => Tagged { kind, inner }.serialize(serializer),
            Attribute::Uid(inner) => Tagged { kind, inner }.serialize(serializer),
            Attribute::Scalar(inner) => Tagged { kind, inner }.serialize(serializer),
        }
    }
}
