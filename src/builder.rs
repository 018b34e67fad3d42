//! Spec builder
//!
//! Lowers a provider tree plus the frozen nested-type registry into the
//! output `PackageSpec`. The build is a pure function of its inputs: no I/O,
//! and every externally observable list is sorted (or stored in a `BTreeMap`)
//! before it lands in the spec, so two runs over unchanged input produce
//! byte-identical output.

use std::collections::{BTreeMap, BTreeSet};

use semver::Version;

use crate::error::{CompileError, Result};
use crate::names::{title_case, NameMapper};
use crate::registry::{derived_type_name, NestedType, TypeRegistry};
use crate::spec::{
    AliasSpec, ConfigSpec, FunctionSpec, ObjectTypeSpec, PackageSpec, PropertySpec, ResourceSpec,
    TypeSpec, ARCHIVE_REF, ASSET_REF,
};
use crate::token::Token;
use crate::tree::{
    override_map, AssetKind, OverrideMap, Property, PropertyType, ProviderTree, ResourceNode,
    MISSING_DOC,
};

/// Prefix seeding derived nested-type names for an owner (resource,
/// function, or the package itself for config). The collector and the
/// builder must agree on this or `$ref` targets would miss the registry.
pub fn owner_prefix(name: &str) -> String {
    title_case(name)
}

/// Caller-supplied build inputs beyond the tree itself
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    /// Overrides the tree's package version
    pub version: Option<String>,

    /// Externally supplied object types, keyed by token string. A token
    /// colliding with a derived one is a configuration error.
    pub extra_types: BTreeMap<String, ObjectTypeSpec>,
}

/// Lowers the property-tree model into the output package schema
pub struct SpecBuilder<'a> {
    tree: &'a ProviderTree,
    registry: &'a TypeRegistry,
    mapper: &'a dyn NameMapper,
    options: &'a CompileOptions,
}

impl<'a> SpecBuilder<'a> {
    pub fn new(
        tree: &'a ProviderTree,
        registry: &'a TypeRegistry,
        mapper: &'a dyn NameMapper,
        options: &'a CompileOptions,
    ) -> Self {
        Self { tree, registry, mapper, options }
    }

    /// Produce the package spec. Deterministic given its inputs; the result
    /// is immutable from the caller's point of view.
    pub fn build(&self) -> Result<PackageSpec> {
        let mut spec = PackageSpec::new(&self.tree.name);

        let version = self.options.version.as_ref().or(self.tree.version.as_ref());
        if let Some(raw) = version {
            spec.version = Some(Version::parse(raw)?);
        }

        for nested in self.registry.all() {
            let lowered = self.lower_object_type(nested)?;
            spec.types.insert(nested.token.to_string(), lowered);
        }

        for (token, extra) in &self.options.extra_types {
            if spec.types.contains_key(token) {
                return Err(CompileError::ExtraTypeCollision { token: token.clone() });
            }
            spec.types.insert(token.clone(), extra.clone());
        }

        for resource in &self.tree.resources {
            let token = Token::resource(&self.tree.name, &resource.module, &resource.name);
            spec.resources.insert(token.to_string(), self.lower_resource(resource)?);
        }

        for function in &self.tree.functions {
            let token = Token::function(&self.tree.name, &function.module, &function.name);
            let lowered = FunctionSpec {
                description: self.description(&function.doc, ""),
                deprecation_message: function.deprecation.clone(),
                inputs: if function.args.is_empty() {
                    None
                } else {
                    Some(self.lower_member_object(
                        &function.args,
                        &owner_prefix(&function.name),
                        &function.module,
                        true,
                        None,
                    )?)
                },
                outputs: if function.rets.is_empty() {
                    None
                } else {
                    Some(self.lower_member_object(
                        &function.rets,
                        &owner_prefix(&function.name),
                        &function.module,
                        false,
                        None,
                    )?)
                },
            };
            spec.functions.insert(token.to_string(), lowered);
        }

        spec.config = self.lower_config()?;

        Ok(spec)
    }

    // =========================================================================
    // Object types
    // =========================================================================

    fn lower_object_type(&self, nested: &NestedType) -> Result<ObjectTypeSpec> {
        let schema = &nested.properties;
        let overrides = override_map(schema);

        let mut properties = BTreeMap::new();
        for prop in schema {
            let name = self.mapper.forward(&prop.name, schema, &overrides);
            // A shared type's union properties only ever come from
            // input-shaped trees; output trees are single-typed at source.
            let lowered = self.lower_property(prop, &nested.name, &nested.module, true)?;
            properties.insert(name, lowered);
        }

        Ok(ObjectTypeSpec {
            description: self.description(&nested.doc, ""),
            properties,
            required: self.emitted_names(&nested.required, schema, &overrides),
            required_inputs: nested
                .required_for_input
                .as_ref()
                .map(|s| self.emitted_names(s, schema, &overrides))
                .unwrap_or_default(),
            required_outputs: nested
                .required_for_output
                .as_ref()
                .map(|s| self.emitted_names(s, schema, &overrides))
                .unwrap_or_default(),
        })
    }

    /// Translate a required set to sorted output names
    fn emitted_names(
        &self,
        names: &BTreeSet<String>,
        schema: &[Property],
        overrides: &OverrideMap<'_>,
    ) -> Vec<String> {
        let mut out: Vec<String> = names
            .iter()
            .map(|n| self.mapper.forward(n, schema, overrides))
            .collect();
        out.sort();
        out
    }

    // =========================================================================
    // Members
    // =========================================================================

    fn lower_resource(&self, resource: &ResourceNode) -> Result<ResourceSpec> {
        let prefix = owner_prefix(&resource.name);

        let outputs = self.lower_member_object(&resource.outputs, &prefix, &resource.module, false, None)?;
        let inputs = self.lower_member_object(&resource.inputs, &prefix, &resource.module, true, None)?;

        // Look-up-by-id flows filter on the same surface as the inputs, so
        // the state object mirrors them with every property optional. The
        // provider resource has no such flow.
        let state_inputs = if resource.is_provider {
            None
        } else {
            let mut state = self.lower_member_object(&resource.inputs, &prefix, &resource.module, true, None)?;
            state.required.clear();
            state.description = Some(format!(
                "Input properties used for looking up and filtering {} resources.",
                resource.name
            ));
            Some(state)
        };

        Ok(ResourceSpec {
            description: self.description(&resource.doc, ""),
            deprecation_message: resource.deprecation.clone(),
            aliases: resource.aliases.iter().map(|a| AliasSpec { ty: a.clone() }).collect(),
            properties: outputs.properties,
            required: outputs.required,
            input_properties: inputs.properties,
            required_inputs: inputs.required,
            state_inputs,
        })
    }

    fn lower_member_object(
        &self,
        schema: &[Property],
        prefix: &str,
        module: &str,
        is_input: bool,
        description: Option<String>,
    ) -> Result<ObjectTypeSpec> {
        let overrides = override_map(schema);
        let mut properties = BTreeMap::new();
        let mut required = Vec::new();
        for prop in schema {
            let name = self.mapper.forward(&prop.name, schema, &overrides);
            if !prop.optional {
                required.push(name.clone());
            }
            properties.insert(name, self.lower_property(prop, prefix, module, is_input)?);
        }
        required.sort();
        Ok(ObjectTypeSpec {
            description,
            properties,
            required,
            required_inputs: Vec::new(),
            required_outputs: Vec::new(),
        })
    }

    fn lower_config(&self) -> Result<ConfigSpec> {
        let lowered = self.lower_member_object(
            &self.tree.config,
            &owner_prefix(&self.tree.name),
            "index",
            true,
            None,
        )?;
        Ok(ConfigSpec {
            variables: lowered.properties,
            required: lowered.required,
        })
    }

    // =========================================================================
    // Properties and types
    // =========================================================================

    fn lower_property(
        &self,
        prop: &Property,
        prefix: &str,
        module: &str,
        is_input: bool,
    ) -> Result<PropertySpec> {
        let type_spec =
            self.lower_type(&prop.ty, prop, prefix, module, is_input, prop.ty.is_list_or_set())?;

        let mut language = BTreeMap::new();
        for (lang, alt) in &prop.overrides.language_names {
            language.insert(lang.clone(), serde_json::json!({ "name": alt }));
        }
        if prop.overrides.legacy_casing_opt_out {
            let entry = language
                .entry("csharp".to_string())
                .or_insert_with(|| serde_json::json!({}));
            if let Some(obj) = entry.as_object_mut() {
                obj.insert("useLegacyCasing".to_string(), serde_json::Value::Bool(false));
            }
        }

        Ok(PropertySpec {
            type_spec,
            description: self.description(&prop.doc, &prop.doc_url),
            default: prop.overrides.default.as_ref().map(numeric_default),
            deprecation_message: prop.deprecation.clone(),
            language,
        })
    }

    fn description(&self, doc: &str, doc_url: &str) -> Option<String> {
        if !doc.is_empty() && doc != MISSING_DOC {
            return Some(doc.to_string());
        }
        if !doc_url.is_empty() {
            return Some(doc_url.to_string());
        }
        None
    }

    #[allow(clippy::too_many_arguments)]
    fn lower_type(
        &self,
        ty: &PropertyType,
        prop: &Property,
        prefix: &str,
        module: &str,
        is_input: bool,
        plural: bool,
    ) -> Result<TypeSpec> {
        match ty {
            PropertyType::Bool => Ok(TypeSpec::named("boolean")),
            PropertyType::Int => Ok(TypeSpec::named("integer")),
            PropertyType::Float => Ok(TypeSpec::named("number")),
            PropertyType::String => Ok(TypeSpec::named("string")),
            PropertyType::List { element } | PropertyType::Set { element } => Ok(TypeSpec::array(
                self.lower_type(element, prop, prefix, module, is_input, plural)?,
            )),
            PropertyType::Map { element } => Ok(TypeSpec::map(
                self.lower_type(element, prop, prefix, module, is_input, plural)?,
            )),
            PropertyType::Object { name, .. } => {
                let type_name = derived_type_name(prop, name, prefix, plural);
                let token = Token::ty(self.registry.package(), module, &type_name);
                let key = token.to_string();
                if !self.registry.contains(&key) {
                    // The collector and the builder derive names the same
                    // way; a miss here is a compiler bug, not bad input.
                    return Err(CompileError::UnknownToken(key));
                }
                Ok(TypeSpec::reference(token.reference()))
            }
            PropertyType::Union { primary, alternates } => {
                // Outputs never carry the alternate list: a materialized
                // value has exactly one observable shape.
                if !is_input || alternates.is_empty() {
                    return self.lower_type(primary, prop, prefix, module, is_input, plural);
                }
                let mut one_of = Vec::with_capacity(alternates.len() + 1);
                one_of.push(self.lower_type(primary, prop, prefix, module, is_input, plural)?);
                for alt in alternates {
                    one_of.push(self.lower_type(alt, prop, prefix, module, is_input, plural)?);
                }
                Ok(TypeSpec {
                    ty: Some(base_type_name(primary).to_string()),
                    one_of,
                    ..Default::default()
                })
            }
            PropertyType::Asset { format } => Ok(TypeSpec::reference(match format {
                AssetKind::Asset => ASSET_REF,
                AssetKind::Archive => ARCHIVE_REF,
            })),
        }
    }
}

/// Primitive fallback for a union's wrapper type
fn base_type_name(ty: &PropertyType) -> &'static str {
    match ty {
        PropertyType::Bool => "boolean",
        PropertyType::Int => "integer",
        PropertyType::Float => "number",
        PropertyType::String => "string",
        PropertyType::List { .. } | PropertyType::Set { .. } => "array",
        PropertyType::Map { .. } | PropertyType::Object { .. } => "object",
        PropertyType::Union { primary, .. } => base_type_name(primary),
        PropertyType::Asset { .. } => "string",
    }
}

/// Integer defaults are emitted as floating numerics to match the wire
/// schema's single numeric type
fn numeric_default(value: &serde_json::Value) -> serde_json::Value {
    if let Some(i) = value.as_i64() {
        if let Some(n) = serde_json::Number::from_f64(i as f64) {
            return serde_json::Value::Number(n);
        }
    }
    value.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::names::CamelCaseMapper;
    use crate::tree::PropertyOverrides;

    fn empty_tree() -> ProviderTree {
        ProviderTree {
            name: "example".to_string(),
            version: None,
            config: vec![],
            resources: vec![],
            functions: vec![],
        }
    }

    fn builder_fixture<'a>(
        tree: &'a ProviderTree,
        registry: &'a TypeRegistry,
        options: &'a CompileOptions,
    ) -> SpecBuilder<'a> {
        SpecBuilder::new(tree, registry, &CamelCaseMapper, options)
    }

    #[test]
    fn test_primitive_lowering() {
        let tree = empty_tree();
        let registry = TypeRegistry::new("example");
        let options = CompileOptions::default();
        let b = builder_fixture(&tree, &registry, &options);
        let prop = Property::required("x", PropertyType::Bool);
        let ts = b.lower_type(&PropertyType::Bool, &prop, "P", "index", true, false).unwrap();
        assert_eq!(ts, TypeSpec::named("boolean"));
        let ts = b.lower_type(&PropertyType::Float, &prop, "P", "index", true, false).unwrap();
        assert_eq!(ts, TypeSpec::named("number"));
    }

    #[test]
    fn test_union_lowering_by_projection() {
        let tree = empty_tree();
        let registry = TypeRegistry::new("example");
        let options = CompileOptions::default();
        let b = builder_fixture(&tree, &registry, &options);
        let union = PropertyType::Union {
            primary: Box::new(PropertyType::String),
            alternates: vec![PropertyType::Int],
        };
        let prop = Property::required("value", union.clone());

        let input = b.lower_type(&union, &prop, "P", "index", true, false).unwrap();
        assert_eq!(input.ty.as_deref(), Some("string"));
        assert_eq!(input.one_of.len(), 2);

        let output = b.lower_type(&union, &prop, "P", "index", false, false).unwrap();
        assert_eq!(output, TypeSpec::named("string"));
        assert!(output.one_of.is_empty());
    }

    #[test]
    fn test_single_candidate_union_collapses() {
        let tree = empty_tree();
        let registry = TypeRegistry::new("example");
        let options = CompileOptions::default();
        let b = builder_fixture(&tree, &registry, &options);
        let union = PropertyType::Union {
            primary: Box::new(PropertyType::Int),
            alternates: vec![],
        };
        let prop = Property::required("count", union.clone());
        let ts = b.lower_type(&union, &prop, "P", "index", true, false).unwrap();
        assert_eq!(ts, TypeSpec::named("integer"));
    }

    #[test]
    fn test_asset_references() {
        let tree = empty_tree();
        let registry = TypeRegistry::new("example");
        let options = CompileOptions::default();
        let b = builder_fixture(&tree, &registry, &options);
        let prop = Property::required("source", PropertyType::Asset { format: AssetKind::Asset });
        let ts = b
            .lower_type(&prop.ty.clone(), &prop, "P", "index", true, false)
            .unwrap();
        assert_eq!(ts.reference.as_deref(), Some(ASSET_REF));
        let archive = PropertyType::Asset { format: AssetKind::Archive };
        let ts = b.lower_type(&archive, &prop, "P", "index", true, false).unwrap();
        assert_eq!(ts.reference.as_deref(), Some(ARCHIVE_REF));
    }

    #[test]
    fn test_integer_default_becomes_float() {
        let converted = numeric_default(&serde_json::json!(8080));
        assert_eq!(serde_json::to_string(&converted).unwrap(), "8080.0");
        // Non-integers pass through untouched.
        let s = numeric_default(&serde_json::json!("keep"));
        assert_eq!(s, serde_json::json!("keep"));
    }

    #[test]
    fn test_doc_sentinel_suppresses_description() {
        let tree = empty_tree();
        let registry = TypeRegistry::new("example");
        let options = CompileOptions::default();
        let b = builder_fixture(&tree, &registry, &options);
        assert_eq!(b.description(MISSING_DOC, ""), None);
        assert_eq!(b.description(MISSING_DOC, "https://docs"), Some("https://docs".to_string()));
        assert_eq!(b.description("real docs", ""), Some("real docs".to_string()));
    }

    #[test]
    fn test_language_bag_is_minimal() {
        let tree = empty_tree();
        let registry = TypeRegistry::new("example");
        let options = CompileOptions::default();
        let b = builder_fixture(&tree, &registry, &options);

        let plain = Property::required("x", PropertyType::String);
        let spec = b.lower_property(&plain, "P", "index", true).unwrap();
        assert!(spec.language.is_empty());

        let mut renamed = Property::required("x", PropertyType::String);
        renamed.overrides = PropertyOverrides {
            language_names: [("csharp".to_string(), "XValue".to_string())].into(),
            legacy_casing_opt_out: true,
            ..Default::default()
        };
        let spec = b.lower_property(&renamed, "P", "index", true).unwrap();
        let csharp = spec.language.get("csharp").unwrap();
        assert_eq!(csharp["name"], "XValue");
        assert_eq!(csharp["useLegacyCasing"], false);
    }
}
