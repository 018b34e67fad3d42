//! Name translation
//!
//! Casing helpers plus the `NameMapper` seam between the compiler and the
//! name translation scheme it verifies. The translators are deterministic
//! black boxes from the compiler's point of view; the bijection validator
//! exists precisely to check that a mapper's two directions are mutual
//! inverses over every name the builder actually emitted.

use crate::tree::{OverrideMap, Property};

/// Convert a snake/kebab-case word sequence to PascalCase.
///
/// Characters after the first of each word are preserved as-is, so an
/// already-cased segment survives the conversion.
pub fn title_case(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut capitalize_next = true;
    for c in s.chars() {
        if c == '_' || c == '-' || c == ' ' {
            capitalize_next = true;
        } else if capitalize_next {
            result.extend(c.to_uppercase());
            capitalize_next = false;
        } else {
            result.push(c);
        }
    }
    result
}

/// Convert a snake_case source key to camelCase
pub fn camel_case(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut capitalize_next = false;
    for c in s.chars() {
        if c == '_' {
            capitalize_next = true;
        } else if capitalize_next {
            result.extend(c.to_uppercase());
            capitalize_next = false;
        } else {
            result.push(c);
        }
    }
    result
}

/// Convert a camelCase output name back to snake_case
pub fn snake_case(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 4);
    for c in s.chars() {
        if c.is_ascii_uppercase() {
            if !result.is_empty() {
                result.push('_');
            }
            result.push(c.to_ascii_lowercase());
        } else {
            result.push(c);
        }
    }
    result
}

/// Strip an English plural suffix from a property name.
///
/// A `widgets: list<Widget>` property declares the type `Widget`, not
/// `Widgets`; this implements just enough inflection for provider attribute
/// names.
pub fn singularize(s: &str) -> String {
    if let Some(stem) = s.strip_suffix("ies") {
        if !stem.is_empty() {
            return format!("{}y", stem);
        }
    }
    if let Some(stem) = s.strip_suffix("sses") {
        return format!("{}ss", stem);
    }
    if s.ends_with("ss") || s.len() <= 1 {
        return s.to_string();
    }
    if let Some(stem) = s.strip_suffix('s') {
        return stem.to_string();
    }
    s.to_string()
}

/// The source-name ⇄ output-name translation pair.
///
/// `schema` is the ordered source property list for the scope and
/// `overrides` its override map; implementations may consult either. Both
/// directions must be deterministic, and are expected (but not trusted) to
/// be mutual inverses.
pub trait NameMapper {
    fn forward(&self, source_key: &str, schema: &[Property], overrides: &OverrideMap<'_>) -> String;

    fn backward(&self, output_name: &str, schema: &[Property], overrides: &OverrideMap<'_>) -> String;
}

/// Default mapper: snake_case provider keys to camelCase schema names, with
/// explicit per-property name overrides taking precedence in both
/// directions.
#[derive(Debug, Clone, Copy, Default)]
pub struct CamelCaseMapper;

impl NameMapper for CamelCaseMapper {
    fn forward(&self, source_key: &str, _schema: &[Property], overrides: &OverrideMap<'_>) -> String {
        if let Some(forced) = overrides.get(source_key).and_then(|o| o.name.clone()) {
            return forced;
        }
        camel_case(source_key)
    }

    fn backward(&self, output_name: &str, _schema: &[Property], overrides: &OverrideMap<'_>) -> String {
        for (key, ov) in overrides {
            if ov.name.as_deref() == Some(output_name) {
                return key.clone();
            }
        }
        snake_case(output_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{override_map, PropertyOverrides, PropertyType};

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("rule_action"), "RuleAction");
        assert_eq!(title_case("widget"), "Widget");
        // Already-cased input is preserved
        assert_eq!(title_case("RuleAction"), "RuleAction");
    }

    #[test]
    fn test_camel_snake_round_trip() {
        for key in ["foo_bar", "a", "widget_sheet_visual", "name"] {
            assert_eq!(snake_case(&camel_case(key)), key);
        }
    }

    #[test]
    fn test_camel_case_not_injective_on_mixed_input() {
        // The classic collision the bijection validator exists to catch.
        assert_eq!(camel_case("foo_bar"), camel_case("fooBar"));
    }

    #[test]
    fn test_singularize() {
        assert_eq!(singularize("widgets"), "widget");
        assert_eq!(singularize("policies"), "policy");
        assert_eq!(singularize("classes"), "class");
        assert_eq!(singularize("address"), "address");
        assert_eq!(singularize("phases"), "phase");
        assert_eq!(singularize("s"), "s");
    }

    #[test]
    fn test_mapper_honors_name_override() {
        let mut prop = Property::required("foo_bar", PropertyType::String);
        prop.overrides = PropertyOverrides {
            name: Some("renamed".to_string()),
            ..Default::default()
        };
        let schema = vec![prop];
        let overrides = override_map(&schema);
        let mapper = CamelCaseMapper;
        assert_eq!(mapper.forward("foo_bar", &schema, &overrides), "renamed");
        assert_eq!(mapper.backward("renamed", &schema, &overrides), "foo_bar");
    }
}
