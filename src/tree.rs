//! Provider property trees
//!
//! The immutable data model produced by reflecting over a provider's
//! resources, functions, and config variables. Trees are built once by the
//! reflection layer (or loaded from JSON) and never mutated; the collector,
//! builder, and validator all consume them read-only.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Doc string the reflection layer supplies when a property has no
/// documentation. Properties carrying this sentinel and no doc URL emit no
/// description.
pub const MISSING_DOC: &str = "(documentation is not available)";

/// Sub-kind of an asset-typed property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    /// A single file or blob
    Asset,
    /// A bundle of files
    Archive,
}

/// A recursive type node in a property tree
///
/// Unions only ever appear in input-shaped trees; a value observed as an
/// output has exactly one concrete shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PropertyType {
    Bool,
    Int,
    Float,
    String,
    List {
        element: Box<PropertyType>,
    },
    Set {
        element: Box<PropertyType>,
    },
    Map {
        element: Box<PropertyType>,
    },
    Object {
        /// Provider-assigned type name. When non-empty it seeds the derived
        /// token, letting structurally identical objects declared from
        /// different owners collapse to one shared type.
        #[serde(default)]
        name: String,
        properties: Vec<Property>,
    },
    Union {
        primary: Box<PropertyType>,
        #[serde(default)]
        alternates: Vec<PropertyType>,
    },
    Asset {
        format: AssetKind,
    },
}

impl PropertyType {
    /// Short tag name, used in structural diffs
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::String => "string",
            Self::List { .. } => "list",
            Self::Set { .. } => "set",
            Self::Map { .. } => "map",
            Self::Object { .. } => "object",
            Self::Union { .. } => "union",
            Self::Asset { .. } => "asset",
        }
    }

    /// The element type of a list, set, or map
    pub fn element(&self) -> Option<&PropertyType> {
        match self {
            Self::List { element } | Self::Set { element } | Self::Map { element } => Some(element),
            _ => None,
        }
    }

    /// True for list and set kinds, whose object elements get singularized
    /// type names
    pub fn is_list_or_set(&self) -> bool {
        matches!(self, Self::List { .. } | Self::Set { .. })
    }
}

/// Override metadata attached to a property by the provider author
///
/// Overrides may force an explicit nested type name, force a per-language
/// projection flag, or supply a static default value. All fields are
/// additive; nothing here is required for base-schema correctness.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertyOverrides {
    /// Forced output name for this property, bypassing the forward translator
    pub name: Option<String>,

    /// Forced nested type name, used verbatim instead of the derived one
    pub type_name: Option<String>,

    /// Alternate property names for individual target languages
    pub language_names: BTreeMap<String, String>,

    /// Opt out of the legacy casing convention for targets that have one
    pub legacy_casing_opt_out: bool,

    /// Collapse a single-item list or set to a bare value in the output
    /// projection
    pub max_items_one: bool,

    /// Static default injected into the emitted property
    pub default: Option<serde_json::Value>,
}

impl PropertyOverrides {
    /// True when no override is set
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A single named property in a tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    /// Source key, as the provider spells it (typically snake_case)
    pub name: String,

    #[serde(rename = "type")]
    pub ty: PropertyType,

    #[serde(default)]
    pub optional: bool,

    #[serde(default)]
    pub doc: String,

    #[serde(default)]
    pub doc_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecation: Option<String>,

    #[serde(default, skip_serializing_if = "PropertyOverrides::is_empty")]
    pub overrides: PropertyOverrides,
}

impl Property {
    /// A required (non-optional) property with no doc or overrides; the
    /// fixture-builder shorthand used throughout the tests
    pub fn required(name: impl Into<String>, ty: PropertyType) -> Self {
        Self {
            name: name.into(),
            ty,
            optional: false,
            doc: String::new(),
            doc_url: String::new(),
            deprecation: None,
            overrides: PropertyOverrides::default(),
        }
    }

    /// An optional property with no doc or overrides
    pub fn optional(name: impl Into<String>, ty: PropertyType) -> Self {
        Self {
            optional: true,
            ..Self::required(name, ty)
        }
    }
}

/// A resource exposed by the provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceNode {
    pub name: String,

    /// Module the resource (and its nested types) belongs to
    #[serde(default = "default_module")]
    pub module: String,

    #[serde(default)]
    pub doc: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecation: Option<String>,

    /// Previous tokens this resource was known under
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,

    /// The provider resource itself gets no derived state object
    #[serde(default)]
    pub is_provider: bool,

    /// Input projection of the resource's properties
    #[serde(default)]
    pub inputs: Vec<Property>,

    /// Output projection of the resource's properties
    #[serde(default)]
    pub outputs: Vec<Property>,
}

/// A data function (invoke) exposed by the provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionNode {
    pub name: String,

    #[serde(default = "default_module")]
    pub module: String,

    #[serde(default)]
    pub doc: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecation: Option<String>,

    #[serde(default)]
    pub args: Vec<Property>,

    #[serde(default)]
    pub rets: Vec<Property>,
}

/// The root of a provider reflection: everything one generation run consumes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderTree {
    /// Package name; becomes the first token segment
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default)]
    pub config: Vec<Property>,

    #[serde(default)]
    pub resources: Vec<ResourceNode>,

    #[serde(default)]
    pub functions: Vec<FunctionNode>,
}

fn default_module() -> String {
    "index".to_string()
}

/// Map from source key to that property's overrides, the shape the name
/// translators consume
pub type OverrideMap<'a> = BTreeMap<String, &'a PropertyOverrides>;

/// Build the override map for an ordered property list
pub fn override_map(properties: &[Property]) -> OverrideMap<'_> {
    properties
        .iter()
        .map(|p| (p.name.clone(), &p.overrides))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_type_json_round_trip() {
        let ty = PropertyType::List {
            element: Box::new(PropertyType::Object {
                name: "Visual".to_string(),
                properties: vec![Property::required("title", PropertyType::String)],
            }),
        };
        let json = serde_json::to_string(&ty).unwrap();
        let back: PropertyType = serde_json::from_str(&json).unwrap();
        assert_eq!(ty, back);
    }

    #[test]
    fn test_overrides_skipped_when_empty() {
        let prop = Property::required("count", PropertyType::Int);
        let json = serde_json::to_value(&prop).unwrap();
        assert!(json.get("overrides").is_none());
    }

    #[test]
    fn test_element_access() {
        let ty = PropertyType::Set {
            element: Box::new(PropertyType::String),
        };
        assert_eq!(ty.element(), Some(&PropertyType::String));
        assert!(ty.is_list_or_set());
        assert!(PropertyType::Bool.element().is_none());
    }
}
