//! Output package schema
//!
//! The target-neutral `PackageSpec` consumed by downstream SDK emitters.
//! Built once per generation run, immutable after the builder finishes, and
//! read-only for the name validator and every emitter. All maps are
//! `BTreeMap` so serialization order never depends on insertion order.

use std::collections::BTreeMap;

use semver::Version;
use serde::{Deserialize, Serialize};

/// Well-known reference for asset-typed properties
pub const ASSET_REF: &str = "schema.json#/Asset";
/// Well-known reference for archive-typed properties
pub const ARCHIVE_REF: &str = "schema.json#/Archive";

/// A lowered type: exactly one of `ty`, `reference` is the primary shape,
/// with `items`/`additional_properties`/`one_of` refining it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeSpec {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub ty: Option<String>,

    #[serde(rename = "$ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    /// Element type for arrays
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<TypeSpec>>,

    /// Element type for string-keyed maps
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<Box<TypeSpec>>,

    /// Alternate shapes for input-side unions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub one_of: Vec<TypeSpec>,
}

impl TypeSpec {
    /// A named primitive type
    pub fn named(ty: &str) -> Self {
        Self {
            ty: Some(ty.to_string()),
            ..Default::default()
        }
    }

    /// A `$ref` to a declared type or a well-known reference
    pub fn reference(target: impl Into<String>) -> Self {
        Self {
            reference: Some(target.into()),
            ..Default::default()
        }
    }

    /// An array of `element`
    pub fn array(element: TypeSpec) -> Self {
        Self {
            ty: Some("array".to_string()),
            items: Some(Box::new(element)),
            ..Default::default()
        }
    }

    /// A string-keyed map of `element`
    pub fn map(element: TypeSpec) -> Self {
        Self {
            ty: Some("object".to_string()),
            additional_properties: Some(Box::new(element)),
            ..Default::default()
        }
    }
}

/// An emitted property
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertySpec {
    #[serde(flatten)]
    pub type_spec: TypeSpec,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecation_message: Option<String>,

    /// Per-language metadata bag; additive only, never required for
    /// base-schema correctness
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub language: BTreeMap<String, serde_json::Value>,
}

/// A shared object type, emitted once and referenced by `$ref`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectTypeSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, PropertySpec>,

    /// Output names of properties required in every projection
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,

    /// Present only when the input projection's required set diverges from
    /// `required`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_inputs: Vec<String>,

    /// Present only when the output projection's required set diverges from
    /// `required`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_outputs: Vec<String>,
}

/// A previous token a resource answers to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AliasSpec {
    #[serde(rename = "type")]
    pub ty: String,
}

/// An emitted resource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecation_message: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<AliasSpec>,

    /// Output projection
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, PropertySpec>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,

    /// Input projection
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub input_properties: BTreeMap<String, PropertySpec>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_inputs: Vec<String>,

    /// Derived look-up-by-id state object; absent for the provider resource
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_inputs: Option<ObjectTypeSpec>,
}

/// An emitted function
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecation_message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inputs: Option<ObjectTypeSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<ObjectTypeSpec>,
}

/// Provider configuration variables
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSpec {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub variables: BTreeMap<String, PropertySpec>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
}

/// The output root: the compatibility surface downstream emitters depend on.
/// Token strings and property names must be stable across regenerations for
/// unchanged input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageSpec {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<Version>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub types: BTreeMap<String, ObjectTypeSpec>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub resources: BTreeMap<String, ResourceSpec>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub functions: BTreeMap<String, FunctionSpec>,

    #[serde(default)]
    pub config: ConfigSpec,
}

impl PackageSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
            types: BTreeMap::new(),
            resources: BTreeMap::new(),
            functions: BTreeMap::new(),
            config: ConfigSpec::default(),
        }
    }
}
