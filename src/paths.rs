//! Type paths
//!
//! A `TypePath` is an abstract address identifying one occurrence of a
//! generated type within the output schema. The resolver navigates the path
//! back through the original provider tree to the source node and its
//! override metadata, which is what the name validator checks emitted names
//! against.

use std::fmt;

use crate::error::{CompileError, Result};
use crate::tree::{override_map, OverrideMap, Property, PropertyType, ProviderTree};
use crate::token::Token;

// =============================================================================
// Path model
// =============================================================================

/// Where a path starts
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathRoot {
    Config,
    /// Input projection of a resource, by member token string
    ResourceInputs(String),
    /// Output projection of a resource
    ResourceOutputs(String),
    /// Argument list of a function
    FunctionArgs(String),
    /// Return list of a function
    FunctionReturns(String),
}

impl fmt::Display for PathRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config => write!(f, "config"),
            Self::ResourceInputs(token) => write!(f, "resource {} (inputs)", token),
            Self::ResourceOutputs(token) => write!(f, "resource {} (outputs)", token),
            Self::FunctionArgs(token) => write!(f, "function {} (args)", token),
            Self::FunctionReturns(token) => write!(f, "function {} (returns)", token),
        }
    }
}

/// One navigation step
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathStep {
    /// Descend into a named property of an object
    Property(String),
    /// Descend into the element of a list, set, or map
    Element,
}

/// An abstract address into the generated schema
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypePath {
    pub root: PathRoot,
    pub steps: Vec<PathStep>,
}

impl TypePath {
    pub fn new(root: PathRoot) -> Self {
        Self { root, steps: Vec::new() }
    }

    pub fn with_property(&self, name: &str) -> Self {
        let mut path = self.clone();
        path.steps.push(PathStep::Property(name.to_string()));
        path
    }

    pub fn with_element(&self) -> Self {
        let mut path = self.clone();
        path.steps.push(PathStep::Element);
        path
    }
}

impl fmt::Display for TypePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.root)?;
        for step in &self.steps {
            match step {
                PathStep::Property(name) => write!(f, ".{}", name)?,
                PathStep::Element => write!(f, "[]")?,
            }
        }
        Ok(())
    }
}

// =============================================================================
// Navigation nodes
// =============================================================================

/// A navigation failure, before it is anchored to a path
#[derive(Debug, Clone)]
pub struct NavigationError {
    pub op: &'static str,
    pub detail: String,
}

impl NavigationError {
    fn new(op: &'static str, detail: impl Into<String>) -> Self {
        Self { op, detail: detail.into() }
    }

    /// Anchor this failure to the path that was being resolved
    pub fn at(self, path: &TypePath) -> CompileError {
        CompileError::InvalidTypePath {
            path: path.to_string(),
            detail: format!("{}: {}", self.op, self.detail),
        }
    }
}

/// A source schema node reached by navigation
///
/// A `Collection` wrapping an `Object` transparently delegates `property`,
/// `fields`, and `overrides` to its element: a list or set with at most one
/// item is flattened to a bare object in the output projection, and path
/// navigation has to match the flattened shape rather than the pre-flattening
/// source shape.
#[derive(Debug, Clone)]
pub enum TypeNode<'a> {
    Object(&'a [Property]),
    Collection(Box<TypeNode<'a>>),
    Scalar,
}

impl<'a> TypeNode<'a> {
    /// Project a property type onto its navigation shape. Unions navigate as
    /// their primary type.
    pub fn from_type(ty: &'a PropertyType) -> Self {
        match ty {
            PropertyType::Object { properties, .. } => Self::Object(properties),
            PropertyType::List { element }
            | PropertyType::Set { element }
            | PropertyType::Map { element } => Self::Collection(Box::new(Self::from_type(element))),
            PropertyType::Union { primary, .. } => Self::from_type(primary),
            _ => Self::Scalar,
        }
    }

    fn variant_name(&self) -> &'static str {
        match self {
            Self::Object(_) => "object",
            Self::Collection(_) => "collection",
            Self::Scalar => "scalar",
        }
    }

    /// Navigate into a named property
    pub fn property(&self, name: &str) -> std::result::Result<TypeNode<'a>, NavigationError> {
        match self {
            Self::Object(props) => props
                .iter()
                .find(|p| p.name == name)
                .map(|p| TypeNode::from_type(&p.ty))
                .ok_or_else(|| NavigationError::new("property", format!("no property '{}' on object", name))),
            Self::Collection(element) => match element.as_ref() {
                TypeNode::Object(_) => element.property(name),
                other => Err(NavigationError::new(
                    "property",
                    format!("collection element is a {}, not an object", other.variant_name()),
                )),
            },
            Self::Scalar => Err(NavigationError::new("property", "scalar has no properties")),
        }
    }

    /// Navigate into a collection's element
    pub fn element(&self) -> std::result::Result<TypeNode<'a>, NavigationError> {
        match self {
            Self::Collection(element) => Ok((**element).clone()),
            other => Err(NavigationError::new(
                "element",
                format!("{} is not a collection", other.variant_name()),
            )),
        }
    }

    /// The ordered source property list of this node
    pub fn fields(&self) -> std::result::Result<&'a [Property], NavigationError> {
        match self {
            Self::Object(props) => Ok(props),
            Self::Collection(element) => match element.as_ref() {
                TypeNode::Object(_) => element.fields(),
                other => Err(NavigationError::new(
                    "fields",
                    format!("collection element is a {}, not an object", other.variant_name()),
                )),
            },
            Self::Scalar => Err(NavigationError::new("fields", "scalar has no fields")),
        }
    }

    /// The override map of this node's properties
    pub fn overrides(&self) -> std::result::Result<OverrideMap<'a>, NavigationError> {
        self.fields()
            .map(override_map)
            .map_err(|e| NavigationError::new("overrides", e.detail))
    }
}

// =============================================================================
// Resolver
// =============================================================================

/// Navigates abstract schema paths back to the original provider tree
pub struct TypePathResolver<'a> {
    tree: &'a ProviderTree,
}

impl<'a> TypePathResolver<'a> {
    pub fn new(tree: &'a ProviderTree) -> Self {
        Self { tree }
    }

    /// Resolve a path to its source node. Navigation into an undefined
    /// combination is a hard error that aborts the validation pass: the
    /// generated schema and the provider schema have diverged in a way the
    /// resolver cannot reconcile.
    pub fn resolve(&self, path: &TypePath) -> Result<TypeNode<'a>> {
        let mut node = self.root_node(&path.root)?;
        for step in &path.steps {
            node = match step {
                PathStep::Property(name) => node.property(name).map_err(|e| e.at(path))?,
                PathStep::Element => node.element().map_err(|e| e.at(path))?,
            };
        }
        Ok(node)
    }

    fn root_node(&self, root: &PathRoot) -> Result<TypeNode<'a>> {
        match root {
            PathRoot::Config => Ok(TypeNode::Object(&self.tree.config)),
            PathRoot::ResourceInputs(token) => self.resource(token).map(|r| TypeNode::Object(&r.inputs)),
            PathRoot::ResourceOutputs(token) => self.resource(token).map(|r| TypeNode::Object(&r.outputs)),
            PathRoot::FunctionArgs(token) => self.function(token).map(|f| TypeNode::Object(&f.args)),
            PathRoot::FunctionReturns(token) => self.function(token).map(|f| TypeNode::Object(&f.rets)),
        }
    }

    fn resource(&self, token: &str) -> Result<&'a crate::tree::ResourceNode> {
        self.tree
            .resources
            .iter()
            .find(|r| Token::resource(&self.tree.name, &r.module, &r.name).to_string() == token)
            .ok_or_else(|| CompileError::UnknownToken(token.to_string()))
    }

    fn function(&self, token: &str) -> Result<&'a crate::tree::FunctionNode> {
        self.tree
            .functions
            .iter()
            .find(|f| Token::function(&self.tree.name, &f.module, &f.name).to_string() == token)
            .ok_or_else(|| CompileError::UnknownToken(token.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{Property, ResourceNode};

    fn sample_tree() -> ProviderTree {
        ProviderTree {
            name: "example".to_string(),
            version: None,
            config: vec![Property::optional("region", PropertyType::String)],
            resources: vec![ResourceNode {
                name: "Widget".to_string(),
                module: "index".to_string(),
                doc: String::new(),
                deprecation: None,
                aliases: vec![],
                is_provider: false,
                inputs: vec![Property::required(
                    "sheets",
                    PropertyType::List {
                        element: Box::new(PropertyType::Object {
                            name: String::new(),
                            properties: vec![Property::required("title", PropertyType::String)],
                        }),
                    },
                )],
                outputs: vec![],
            }],
            functions: vec![],
        }
    }

    #[test]
    fn test_path_display() {
        let path = TypePath::new(PathRoot::ResourceInputs("example:index:Widget".to_string()))
            .with_property("sheets")
            .with_element();
        assert_eq!(path.to_string(), "resource example:index:Widget (inputs).sheets[]");
    }

    #[test]
    fn test_resolve_through_collection() {
        let tree = sample_tree();
        let resolver = TypePathResolver::new(&tree);
        let path = TypePath::new(PathRoot::ResourceInputs("example:index:Widget".to_string()))
            .with_property("sheets")
            .with_element();
        let node = resolver.resolve(&path).unwrap();
        let fields = node.fields().unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].name, "title");
    }

    #[test]
    fn test_collection_delegates_to_object_element() {
        let tree = sample_tree();
        let resolver = TypePathResolver::new(&tree);
        // Stop at the collection itself; property access must flatten through.
        let path = TypePath::new(PathRoot::ResourceInputs("example:index:Widget".to_string()))
            .with_property("sheets");
        let node = resolver.resolve(&path).unwrap();
        assert!(matches!(node, TypeNode::Collection(_)));
        assert!(node.property("title").is_ok());
        assert!(node.fields().is_ok());
        assert!(node.overrides().is_ok());
    }

    #[test]
    fn test_scalar_navigation_is_an_error() {
        let tree = sample_tree();
        let resolver = TypePathResolver::new(&tree);
        let path = TypePath::new(PathRoot::Config).with_property("region");
        let node = resolver.resolve(&path).unwrap();
        assert!(matches!(node, TypeNode::Scalar));
        assert!(node.fields().is_err());
        assert!(node.property("anything").is_err());
        assert!(node.element().is_err());
    }

    #[test]
    fn test_bad_path_aborts_with_invalid_type_path() {
        let tree = sample_tree();
        let resolver = TypePathResolver::new(&tree);
        let path = TypePath::new(PathRoot::Config)
            .with_property("region")
            .with_property("nope");
        match resolver.resolve(&path) {
            Err(CompileError::InvalidTypePath { path, .. }) => {
                assert!(path.contains("config.region.nope"));
            }
            other => panic!("expected InvalidTypePath, got {:?}", other.map(|_| ())),
        }
    }
}
