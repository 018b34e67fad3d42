//! Nested type registry
//!
//! Walks property trees and registers every named nested object type into a
//! token-keyed registry, deduplicating structurally identical declarations.
//! The registry is an explicit object built fresh per generation run and
//! frozen before the spec builder consumes it; it is never process-wide
//! state, so repeated or concurrent generation runs stay isolated.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{CompileError, Result};
use crate::names::{singularize, title_case};
use crate::paths::TypePath;
use crate::token::Token;
use crate::tree::{Property, PropertyType};

// =============================================================================
// Registry entries
// =============================================================================

/// A shared nested object type
///
/// `required_for_input` / `required_for_output` are populated **only** when a
/// use-site's required set diverges from the generic `required` set. The same
/// type can be reached as a resource's output and a data function's input
/// with different optionality, and neither side may corrupt the other's list.
#[derive(Debug, Clone)]
pub struct NestedType {
    pub token: Token,
    pub name: String,
    pub module: String,
    /// Owner whose walk first declared this type
    pub declared_by: String,
    /// Doc string of the first declaring property
    pub doc: String,
    /// Ordered property list from the first declaration
    pub properties: Vec<Property>,
    pub required: BTreeSet<String>,
    pub required_for_input: Option<BTreeSet<String>>,
    pub required_for_output: Option<BTreeSet<String>>,
    /// Every site this type occurs at, for the name validator
    pub occurrences: Vec<TypePath>,
}

/// Record of a third occurrence disagreeing with both recorded required sets.
/// The first-recorded divergence is kept; the conflict surfaces as an
/// independent diagnostic.
#[derive(Debug, Clone)]
pub struct RequiredConflict {
    pub token: String,
    pub is_input: bool,
    pub recorded: BTreeSet<String>,
    pub incoming: BTreeSet<String>,
}

/// Which projection a walk is collecting, and for whom
#[derive(Debug, Clone, Copy)]
pub struct Usage<'a> {
    pub module: &'a str,
    pub owner: &'a str,
    pub is_input: bool,
}

// =============================================================================
// Name derivation
// =============================================================================

/// Candidate type name for an object declared by `prop`.
///
/// Precedence: an explicit override is used verbatim; a provider-assigned
/// object name seeds a shared name across use-sites; otherwise the name is
/// derived from the walk prefix and the property name, singularized when the
/// property is list- or set-typed.
pub fn derived_type_name(prop: &Property, object_name: &str, prefix: &str, plural: bool) -> String {
    if let Some(forced) = &prop.overrides.type_name {
        return forced.clone();
    }
    if !object_name.is_empty() {
        return title_case(object_name);
    }
    let base = if plural { singularize(&prop.name) } else { prop.name.clone() };
    format!("{}{}", prefix, title_case(&base))
}

/// Names of the non-optional properties, the immediate (non-recursive)
/// required set of an object declaration
pub fn required_names(properties: &[Property]) -> BTreeSet<String> {
    properties
        .iter()
        .filter(|p| !p.optional)
        .map(|p| p.name.clone())
        .collect()
}

// =============================================================================
// Structural equality
// =============================================================================

/// Describe the first structural difference between two ordered property
/// lists, or None when they are structurally identical (same ordered names,
/// same nested kinds; optionality deliberately excluded).
pub fn structural_diff(a: &[Property], b: &[Property]) -> Option<String> {
    if a.len() != b.len() {
        return Some(format!("property count {} vs {}", a.len(), b.len()));
    }
    for (pa, pb) in a.iter().zip(b) {
        if pa.name != pb.name {
            return Some(format!("property name '{}' vs '{}'", pa.name, pb.name));
        }
        if let Some(detail) = type_diff(&pa.ty, &pb.ty) {
            return Some(format!("property '{}': {}", pa.name, detail));
        }
    }
    None
}

fn type_diff(a: &PropertyType, b: &PropertyType) -> Option<String> {
    use PropertyType::*;
    match (a, b) {
        (List { element: ea }, List { element: eb })
        | (Set { element: ea }, Set { element: eb })
        | (Map { element: ea }, Map { element: eb }) => {
            type_diff(ea, eb).map(|d| format!("element: {}", d))
        }
        (Object { name: na, properties: pa }, Object { name: nb, properties: pb }) => {
            if na != nb {
                return Some(format!("object name '{}' vs '{}'", na, nb));
            }
            structural_diff(pa, pb)
        }
        (Union { primary: ma, alternates: aa }, Union { primary: mb, alternates: ab }) => {
            if let Some(d) = type_diff(ma, mb) {
                return Some(format!("union primary: {}", d));
            }
            if aa.len() != ab.len() {
                return Some(format!("union alternate count {} vs {}", aa.len(), ab.len()));
            }
            for (x, y) in aa.iter().zip(ab) {
                if let Some(d) = type_diff(x, y) {
                    return Some(format!("union alternate: {}", d));
                }
            }
            None
        }
        (Asset { format: fa }, Asset { format: fb }) => {
            (fa != fb).then(|| format!("asset sub-kind {:?} vs {:?}", fa, fb))
        }
        _ => {
            if a.kind_name() == b.kind_name() {
                None
            } else {
                Some(format!("kind {} vs {}", a.kind_name(), b.kind_name()))
            }
        }
    }
}

// =============================================================================
// Registry
// =============================================================================

/// The per-run nested type registry
pub struct TypeRegistry {
    package: String,
    types: BTreeMap<String, NestedType>,
    conflicts: Vec<RequiredConflict>,
}

impl TypeRegistry {
    pub fn new(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            types: BTreeMap::new(),
            conflicts: Vec::new(),
        }
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    /// Walk an ordered property list, registering every nested object type.
    ///
    /// `prefix` seeds derived type names; `base` is the path of the property
    /// list itself. A structural mismatch under an already-claimed token is
    /// fatal for the run: two semantically different schemas are falsely
    /// colliding on one derived name, which the generator cannot resolve.
    pub fn collect_properties(
        &mut self,
        properties: &[Property],
        prefix: &str,
        usage: &Usage<'_>,
        base: &TypePath,
    ) -> Result<()> {
        for prop in properties {
            let path = base.with_property(&prop.name);
            self.collect_type(&prop.ty, prop, prefix, usage, &path, prop.ty.is_list_or_set(), true)?;
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn collect_type(
        &mut self,
        ty: &PropertyType,
        prop: &Property,
        prefix: &str,
        usage: &Usage<'_>,
        path: &TypePath,
        plural: bool,
        record: bool,
    ) -> Result<()> {
        match ty {
            PropertyType::List { element }
            | PropertyType::Set { element }
            | PropertyType::Map { element } => {
                self.collect_type(element, prop, prefix, usage, &path.with_element(), plural, record)
            }
            PropertyType::Object { name, properties } => {
                let type_name = derived_type_name(prop, name, prefix, plural);
                self.register(&type_name, prop, properties, usage, path, record)?;
                self.collect_properties(properties, &type_name, usage, path)
            }
            PropertyType::Union { primary, alternates } => {
                self.collect_type(primary, prop, prefix, usage, path, plural, record)?;
                // Alternates share the primary's schema location; occurrence
                // paths resolve to the primary, so alternates register their
                // types without claiming a site.
                for alt in alternates {
                    self.collect_type(alt, prop, prefix, usage, path, plural, false)?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn register(
        &mut self,
        type_name: &str,
        prop: &Property,
        properties: &[Property],
        usage: &Usage<'_>,
        path: &TypePath,
        record: bool,
    ) -> Result<()> {
        let token = Token::ty(&self.package, usage.module, type_name);
        let key = token.to_string();
        let incoming = required_names(properties);

        match self.types.get_mut(&key) {
            None => {
                self.types.insert(
                    key,
                    NestedType {
                        token,
                        name: type_name.to_string(),
                        module: usage.module.to_string(),
                        declared_by: usage.owner.to_string(),
                        doc: prop.doc.clone(),
                        properties: properties.to_vec(),
                        required: incoming,
                        required_for_input: None,
                        required_for_output: None,
                        occurrences: if record { vec![path.clone()] } else { Vec::new() },
                    },
                );
            }
            Some(existing) => {
                if let Some(detail) = structural_diff(&existing.properties, properties) {
                    return Err(CompileError::StructuralMismatch { token: key, detail });
                }
                if incoming != existing.required {
                    let slot = if usage.is_input {
                        &mut existing.required_for_input
                    } else {
                        &mut existing.required_for_output
                    };
                    match slot {
                        None => *slot = Some(incoming),
                        Some(recorded) if *recorded != incoming => {
                            let conflict = RequiredConflict {
                                token: key.clone(),
                                is_input: usage.is_input,
                                recorded: recorded.clone(),
                                incoming,
                            };
                            self.conflicts.push(conflict);
                        }
                        _ => {}
                    }
                }
                if record {
                    existing.occurrences.push(path.clone());
                }
            }
        }
        Ok(())
    }

    pub fn get(&self, token: &str) -> Option<&NestedType> {
        self.types.get(token)
    }

    pub fn contains(&self, token: &str) -> bool {
        self.types.contains_key(token)
    }

    /// All registered types in token order
    pub fn all(&self) -> impl Iterator<Item = &NestedType> {
        self.types.values()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Required-set conflicts recorded during collection
    pub fn conflicts(&self) -> &[RequiredConflict] {
        &self.conflicts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::PathRoot;

    fn visual_object() -> PropertyType {
        PropertyType::Object {
            name: "Visual".to_string(),
            properties: vec![
                Property::required("title", PropertyType::String),
                Property::optional("width", PropertyType::Int),
            ],
        }
    }

    fn sheets_property() -> Property {
        Property::required(
            "sheets",
            PropertyType::List {
                element: Box::new(PropertyType::Object {
                    name: String::new(),
                    properties: vec![Property::required(
                        "visuals",
                        PropertyType::List { element: Box::new(visual_object()) },
                    )],
                }),
            },
        )
    }

    fn usage<'a>(owner: &'a str, is_input: bool) -> Usage<'a> {
        Usage { module: "index", owner, is_input }
    }

    #[test]
    fn test_named_object_shared_across_owners() {
        let mut registry = TypeRegistry::new("example");
        let props_a = vec![sheets_property()];
        let props_b = vec![sheets_property()];
        registry
            .collect_properties(&props_a, "Dashboard", &usage("a", true), &TypePath::new(PathRoot::Config))
            .unwrap();
        registry
            .collect_properties(&props_b, "Template", &usage("b", true), &TypePath::new(PathRoot::Config))
            .unwrap();

        // The anonymous sheet objects get prefix-derived names and stay
        // separate; the named Visual object collapses to one token.
        assert!(registry.contains("example:index/Visual:Visual"));
        assert!(registry.contains("example:index/DashboardSheet:DashboardSheet"));
        assert!(registry.contains("example:index/TemplateSheet:TemplateSheet"));
        let visual = registry.get("example:index/Visual:Visual").unwrap();
        assert_eq!(visual.occurrences.len(), 2);
    }

    #[test]
    fn test_singularized_derived_name() {
        let mut registry = TypeRegistry::new("example");
        let props = vec![Property::required(
            "widgets",
            PropertyType::List {
                element: Box::new(PropertyType::Object {
                    name: String::new(),
                    properties: vec![Property::required("id", PropertyType::String)],
                }),
            },
        )];
        registry
            .collect_properties(&props, "Panel", &usage("a", true), &TypePath::new(PathRoot::Config))
            .unwrap();
        assert!(registry.contains("example:index/PanelWidget:PanelWidget"));
        assert!(!registry.contains("example:index/PanelWidgets:PanelWidgets"));
    }

    #[test]
    fn test_type_name_override_is_verbatim() {
        let mut registry = TypeRegistry::new("example");
        let mut prop = Property::required(
            "phases",
            PropertyType::List {
                element: Box::new(PropertyType::Object {
                    name: String::new(),
                    properties: vec![Property::required("at", PropertyType::String)],
                }),
            },
        );
        prop.overrides.type_name = Some("RulesetRuleActionParameterPhases".to_string());
        registry
            .collect_properties(&[prop], "Ruleset", &usage("a", true), &TypePath::new(PathRoot::Config))
            .unwrap();
        assert!(registry.contains(
            "example:index/RulesetRuleActionParameterPhases:RulesetRuleActionParameterPhases"
        ));
        assert!(!registry.contains("example:index/RulesetPhase:RulesetPhase"));
    }

    #[test]
    fn test_required_divergence_kept_per_side() {
        let mut registry = TypeRegistry::new("example");
        let output_decl = vec![Property::required(
            "rule",
            PropertyType::Object {
                name: "Rule".to_string(),
                properties: vec![
                    Property::required("name", PropertyType::String),
                    Property::required("weight", PropertyType::Int),
                ],
            },
        )];
        // Same shared type reached as a data function's input, where weight
        // is optional.
        let input_decl = vec![Property::required(
            "rule",
            PropertyType::Object {
                name: "Rule".to_string(),
                properties: vec![
                    Property::required("name", PropertyType::String),
                    Property::optional("weight", PropertyType::Int),
                ],
            },
        )];
        registry
            .collect_properties(&output_decl, "Widget", &usage("r", false), &TypePath::new(PathRoot::Config))
            .unwrap();
        registry
            .collect_properties(&input_decl, "GetWidget", &usage("f", true), &TypePath::new(PathRoot::Config))
            .unwrap();

        let rule = registry.get("example:index/Rule:Rule").unwrap();
        assert!(rule.required.contains("weight"));
        assert!(rule.required_for_output.is_none());
        let for_input = rule.required_for_input.as_ref().unwrap();
        assert!(!for_input.contains("weight"));
        assert!(for_input.contains("name"));
    }

    #[test]
    fn test_three_way_conflict_recorded() {
        let mut registry = TypeRegistry::new("example");
        let decl = |optional_weight: bool, optional_name: bool| {
            vec![Property::required(
                "rule",
                PropertyType::Object {
                    name: "Rule".to_string(),
                    properties: vec![
                        Property {
                            optional: optional_name,
                            ..Property::required("name", PropertyType::String)
                        },
                        Property {
                            optional: optional_weight,
                            ..Property::required("weight", PropertyType::Int)
                        },
                    ],
                },
            )]
        };
        let base = TypePath::new(PathRoot::Config);
        registry.collect_properties(&decl(false, false), "A", &usage("a", true), &base).unwrap();
        registry.collect_properties(&decl(true, false), "B", &usage("b", true), &base).unwrap();
        registry.collect_properties(&decl(false, true), "C", &usage("c", true), &base).unwrap();

        assert_eq!(registry.conflicts().len(), 1);
        let rule = registry.get("example:index/Rule:Rule").unwrap();
        // First-recorded divergence wins.
        let for_input = rule.required_for_input.as_ref().unwrap();
        assert!(for_input.contains("name"));
        assert!(!for_input.contains("weight"));
    }

    #[test]
    fn test_structural_mismatch_is_fatal() {
        let mut registry = TypeRegistry::new("example");
        let a = vec![Property::required(
            "rule",
            PropertyType::Object {
                name: "Rule".to_string(),
                properties: vec![Property::required("name", PropertyType::String)],
            },
        )];
        let b = vec![Property::required(
            "rule",
            PropertyType::Object {
                name: "Rule".to_string(),
                properties: vec![Property::required("title", PropertyType::String)],
            },
        )];
        let base = TypePath::new(PathRoot::Config);
        registry.collect_properties(&a, "A", &usage("a", true), &base).unwrap();
        let err = registry.collect_properties(&b, "B", &usage("b", true), &base).unwrap_err();
        match err {
            CompileError::StructuralMismatch { token, detail } => {
                assert_eq!(token, "example:index/Rule:Rule");
                assert!(detail.contains("name"));
            }
            other => panic!("expected StructuralMismatch, got {}", other),
        }
    }

    #[test]
    fn test_structural_diff_ignores_optionality() {
        let a = vec![Property::required("name", PropertyType::String)];
        let b = vec![Property::optional("name", PropertyType::String)];
        assert!(structural_diff(&a, &b).is_none());
    }
}
