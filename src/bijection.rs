//! Name bijection validation
//!
//! An independent pass over the completed `PackageSpec` that re-derives the
//! source-name ⇄ output-name mapping for every emitted property and flags
//! collisions or non-invertible translations before they become runtime
//! failures in generated SDKs. The validator does not own the translators;
//! it verifies them. All findings are advisory and never block emission —
//! the only fatal condition here is a type-path navigation failure.

use std::collections::{BTreeMap, BTreeSet};

use regex::Regex;

use crate::diagnostics::{sort_diagnostics, Diagnostic, DiagnosticCode, DiagnosticSink};
use crate::error::Result;
use crate::names::NameMapper;
use crate::paths::TypePathResolver;
use crate::registry::TypeRegistry;
use crate::spec::PackageSpec;
use crate::token::Token;
use crate::tree::{override_map, Property, ProviderTree};

/// One validation scope: the property pairs of a single location
///
/// Constructed transiently for the validation pass only.
#[derive(Debug)]
pub struct NameCheckPropertySet {
    /// Scope location, e.g. `config` or `resource example:index:Widget`
    pub location: String,
    /// Ordered source properties (with their override metadata) in scope
    pub schema: Vec<Property>,
    /// Output names the builder actually emitted for this scope
    pub emitted: BTreeSet<String>,
}

/// Run every check over every scope of the package.
///
/// Scopes: config; each resource's combined input+output properties; each
/// function's args and returns; each nested object type at each of its
/// occurrence sites, resolved through the type-path resolver. Findings are
/// deterministically ordered before delivery so repeated runs over unchanged
/// input produce byte-identical diagnostic output.
pub fn validate(
    spec: &PackageSpec,
    tree: &ProviderTree,
    registry: &TypeRegistry,
    resolver: &TypePathResolver<'_>,
    mapper: &dyn NameMapper,
    sink: &mut dyn DiagnosticSink,
) -> Result<Vec<Diagnostic>> {
    let identifier = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();

    let mut scopes: Vec<NameCheckPropertySet> = Vec::new();

    scopes.push(NameCheckPropertySet {
        location: "config".to_string(),
        schema: tree.config.clone(),
        emitted: spec.config.variables.keys().cloned().collect(),
    });

    for resource in &tree.resources {
        let token = Token::resource(&tree.name, &resource.module, &resource.name).to_string();
        let Some(emitted_spec) = spec.resources.get(&token) else { continue };

        // Combined input+output surface; a key present in both projections
        // is one property.
        let mut combined: Vec<Property> = Vec::new();
        let mut seen = BTreeSet::new();
        for prop in resource.outputs.iter().chain(resource.inputs.iter()) {
            if seen.insert(prop.name.clone()) {
                combined.push(prop.clone());
            }
        }
        let emitted = emitted_spec
            .properties
            .keys()
            .chain(emitted_spec.input_properties.keys())
            .cloned()
            .collect();
        scopes.push(NameCheckPropertySet {
            location: format!("resource {}", token),
            schema: combined,
            emitted,
        });
    }

    for function in &tree.functions {
        let token = Token::function(&tree.name, &function.module, &function.name).to_string();
        let Some(emitted_spec) = spec.functions.get(&token) else { continue };
        if let Some(inputs) = &emitted_spec.inputs {
            scopes.push(NameCheckPropertySet {
                location: format!("function {} (args)", token),
                schema: function.args.clone(),
                emitted: inputs.properties.keys().cloned().collect(),
            });
        }
        if let Some(outputs) = &emitted_spec.outputs {
            scopes.push(NameCheckPropertySet {
                location: format!("function {} (returns)", token),
                schema: function.rets.clone(),
                emitted: outputs.properties.keys().cloned().collect(),
            });
        }
    }

    for nested in registry.all() {
        let token = nested.token.to_string();
        let Some(emitted_spec) = spec.types.get(&token) else { continue };
        let emitted: BTreeSet<String> = emitted_spec.properties.keys().cloned().collect();
        for occurrence in &nested.occurrences {
            // A navigation failure aborts the whole pass: the generated
            // schema and the provider schema have diverged.
            let node = resolver.resolve(occurrence)?;
            let fields = node.fields().map_err(|e| e.at(occurrence))?;
            scopes.push(NameCheckPropertySet {
                location: format!("type {} at {}", token, occurrence),
                schema: fields.to_vec(),
                emitted: emitted.clone(),
            });
        }
    }

    let mut diagnostics = Vec::new();
    for scope in &scopes {
        check_scope(scope, mapper, &identifier, &mut diagnostics);
    }

    for conflict in registry.conflicts() {
        let side = if conflict.is_input { "input" } else { "output" };
        let join = |s: &BTreeSet<String>| s.iter().cloned().collect::<Vec<_>>().join(", ");
        diagnostics.push(Diagnostic::new(
            format!("type {}", conflict.token),
            "",
            side,
            DiagnosticCode::RequiredSetConflict,
            format!(
                "a further {} occurrence requires [{}], disagreeing with both the generic required set and the recorded [{}]",
                side,
                join(&conflict.incoming),
                join(&conflict.recorded),
            ),
        ));
    }

    sort_diagnostics(&mut diagnostics);
    for diag in &diagnostics {
        sink.report(diag.severity(), &diag.to_string());
    }
    Ok(diagnostics)
}

/// The four name checks plus the identifier-shape check, over one scope
fn check_scope(
    set: &NameCheckPropertySet,
    mapper: &dyn NameMapper,
    identifier: &Regex,
    diags: &mut Vec<Diagnostic>,
) {
    let overrides = override_map(&set.schema);

    let mut by_output: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for prop in &set.schema {
        let output = mapper.forward(&prop.name, &set.schema, &overrides);
        by_output.entry(output.clone()).or_default().push(prop.name.clone());

        // Forward-consistency: the recomputed name must be one the builder
        // actually used.
        if !set.emitted.contains(&output) {
            diags.push(Diagnostic::new(
                &set.location,
                &prop.name,
                &output,
                DiagnosticCode::ForwardMismatch,
                format!(
                    "forward translation of '{}' yields '{}', which is not among the emitted property names",
                    prop.name, output
                ),
            ));
        }

        // Round-trip law: backward(forward(key)) == key.
        let back = mapper.backward(&output, &set.schema, &overrides);
        if back != prop.name {
            diags.push(Diagnostic::new(
                &set.location,
                &prop.name,
                &output,
                DiagnosticCode::RoundTripMismatch,
                format!(
                    "translating '{}' forward to '{}' and back returns '{}'",
                    prop.name, output, back
                ),
            ));
        }
    }

    // Output-name uniqueness.
    for (output, sources) in &by_output {
        if sources.len() > 1 {
            diags.push(Diagnostic::new(
                &set.location,
                &sources[0],
                output,
                DiagnosticCode::OutputNameCollision,
                format!(
                    "source keys [{}] all translate to output name '{}'",
                    sources.join(", "),
                    output
                ),
            ));
        }
    }

    // Source-key uniqueness, the symmetric grouping over emitted names.
    let mut by_source: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for output in &set.emitted {
        let back = mapper.backward(output, &set.schema, &overrides);
        by_source.entry(back).or_default().push(output.clone());
    }
    for (source, outputs) in &by_source {
        if outputs.len() > 1 {
            diags.push(Diagnostic::new(
                &set.location,
                source,
                &outputs[0],
                DiagnosticCode::SourceKeyCollision,
                format!(
                    "emitted names [{}] all translate back to source key '{}'",
                    outputs.join(", "),
                    source
                ),
            ));
        }
    }

    // Emitted names must be usable identifiers downstream.
    for output in &set.emitted {
        if !identifier.is_match(output) {
            diags.push(Diagnostic::new(
                &set.location,
                "",
                output,
                DiagnosticCode::InvalidIdentifier,
                format!("emitted name '{}' is not a valid identifier", output),
            ));
        }
    }
}
