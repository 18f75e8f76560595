//! CP-011: End-to-end import pipeline.
//!
//! bytes → decode → normalize → analyze references → order → generate → stamp

use super::catalog::TypeCatalog;
use super::codegen::{generate_code, ImportOptions};
use super::error::ImportError;
use super::parser::parse_template;
use super::provenance;
use super::resolver::{analyze_references, build_resource_order, strict_resource_order};
use super::types::*;
use std::collections::BTreeMap;
use std::time::Instant;

/// Everything one import run produced.
#[derive(Debug, Clone)]
pub struct ImportResult {
    /// File name → Go source
    pub files: BTreeMap<String, String>,
    pub template: Template,
    pub graph: ReferenceGraph,

    /// Resource ids in emission order
    pub order: Vec<String>,
    pub diagnostics: Diagnostics,
}

impl ImportResult {
    pub fn warning_count(&self) -> usize {
        self.diagnostics.warnings().count()
    }
}

/// Run the whole pipeline over one template buffer.
pub fn import_template(
    content: &[u8],
    catalog: &dyn TypeCatalog,
    options: &ImportOptions,
) -> Result<ImportResult, ImportError> {
    let start = Instant::now();

    let (template, mut diagnostics) = parse_template(content)?;
    let graph = analyze_references(&template);

    let ids: Vec<String> = template.resources.keys().cloned().collect();
    let order = if options.strict {
        strict_resource_order(&ids, &graph)?
    } else {
        build_resource_order(&ids, &graph)
    };

    let generated = generate_code(&template, &graph, &order, catalog, options);
    diagnostics.extend(generated.diagnostics);

    let files = if options.provenance {
        let digest = provenance::hash_bytes(content);
        generated
            .files
            .into_iter()
            .map(|(name, code)| {
                let stamped = provenance::stamp(&code, &digest);
                (name, stamped)
            })
            .collect()
    } else {
        generated.files
    };

    tracing::info!(
        package = %options.package_name,
        resources = order.len(),
        warnings = diagnostics.warnings().count(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "import complete"
    );

    Ok(ImportResult {
        files,
        template,
        graph,
        order,
        diagnostics,
    })
}
