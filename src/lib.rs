//! Bridgegen Schema Compiler
//!
//! Translates a declarative provider resource/schema description into a
//! target-neutral package schema consumed by downstream SDK generators.
//!
//! ## Architecture
//!
//! ```text
//! ProviderTree
//!     │
//!     ▼
//! TypeRegistry::collect_*   (nested object types, deduplicated by token)
//!     │
//!     ▼
//! SpecBuilder::build        (PackageSpec: types, resources, functions, config)
//!     │
//!     ▼
//! bijection::validate       (name checks, routed to a diagnostics sink)
//! ```
//!
//! The registry is built fresh per generation run and frozen before the
//! builder consumes it; the spec is immutable once built; the validator is
//! read-only. Everything runs single-threaded with no I/O.

pub mod bijection;
pub mod builder;
pub mod checksum;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod names;
pub mod paths;
pub mod registry;
pub mod spec;
pub mod token;
pub mod tree;

pub use builder::{CompileOptions, SpecBuilder};
pub use checksum::Fingerprint;
pub use diagnostics::{CollectSink, Diagnostic, DiagnosticSink, LogSink, NullSink, Severity};
pub use error::{CompileError, Result};
pub use names::{CamelCaseMapper, NameMapper};
pub use paths::{TypePath, TypePathResolver};
pub use registry::TypeRegistry;
pub use spec::PackageSpec;
pub use token::Token;
pub use tree::ProviderTree;

use builder::owner_prefix;
use paths::PathRoot;
use registry::Usage;

/// Everything one generation run produces
#[derive(Debug)]
pub struct CompileOutput {
    pub spec: PackageSpec,
    pub diagnostics: Vec<Diagnostic>,
}

/// Run the whole pipeline over a provider tree: collect nested types, build
/// the package spec, then validate the name mapping.
///
/// Fatal contract violations and configuration errors surface as `Err`;
/// name-check findings are advisory and come back in the output (and through
/// the sink) without blocking emission.
pub fn compile(
    tree: &ProviderTree,
    options: &CompileOptions,
    mapper: &dyn NameMapper,
    sink: &mut dyn DiagnosticSink,
) -> Result<CompileOutput> {
    let mut registry = TypeRegistry::new(&tree.name);

    registry.collect_properties(
        &tree.config,
        &owner_prefix(&tree.name),
        &Usage { module: "index", owner: "config", is_input: true },
        &TypePath::new(PathRoot::Config),
    )?;

    for resource in &tree.resources {
        let token = Token::resource(&tree.name, &resource.module, &resource.name).to_string();
        let prefix = owner_prefix(&resource.name);
        registry.collect_properties(
            &resource.inputs,
            &prefix,
            &Usage { module: &resource.module, owner: &token, is_input: true },
            &TypePath::new(PathRoot::ResourceInputs(token.clone())),
        )?;
        registry.collect_properties(
            &resource.outputs,
            &prefix,
            &Usage { module: &resource.module, owner: &token, is_input: false },
            &TypePath::new(PathRoot::ResourceOutputs(token.clone())),
        )?;
    }

    for function in &tree.functions {
        let token = Token::function(&tree.name, &function.module, &function.name).to_string();
        let prefix = owner_prefix(&function.name);
        registry.collect_properties(
            &function.args,
            &prefix,
            &Usage { module: &function.module, owner: &token, is_input: true },
            &TypePath::new(PathRoot::FunctionArgs(token.clone())),
        )?;
        registry.collect_properties(
            &function.rets,
            &prefix,
            &Usage { module: &function.module, owner: &token, is_input: false },
            &TypePath::new(PathRoot::FunctionReturns(token.clone())),
        )?;
    }

    tracing::debug!(
        nested_types = registry.len(),
        conflicts = registry.conflicts().len(),
        "nested type collection finished"
    );

    let spec = SpecBuilder::new(tree, &registry, mapper, options).build()?;

    let resolver = TypePathResolver::new(tree);
    let diagnostics = bijection::validate(&spec, tree, &registry, &resolver, mapper, sink)?;
    tracing::debug!(findings = diagnostics.len(), "name validation finished");

    Ok(CompileOutput { spec, diagnostics })
}
