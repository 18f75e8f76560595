//! CP-012: CLI subcommands: import, validate, order.

use crate::core::catalog::{ConventionCatalog, StaticCatalog, TypeCatalog, DEFAULT_IMPORT_ROOT};
use crate::core::codegen::ImportOptions;
use crate::core::naming::package_name_for_path;
use crate::core::{importer, parser, resolver};
use clap::Subcommand;
use std::path::{Path, PathBuf};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Convert a template into Go declarations
    Import {
        /// Template file (YAML or JSON)
        template: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Go package name (default: derived from the file name)
        #[arg(short, long)]
        package: Option<String>,

        /// Type catalog file (YAML or JSON); naming conventions when absent
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Module path of the type library (ignored with --catalog)
        #[arg(long, default_value = DEFAULT_IMPORT_ROOT)]
        import_root: String,

        /// Fail on dependency cycles instead of ordering them alphabetically
        #[arg(long)]
        strict: bool,

        /// Omit the source digest from the generated header
        #[arg(long)]
        no_provenance: bool,
    },

    /// Check a template for dangling references, unknown conditions, and cycles
    Validate {
        /// Template file (YAML or JSON)
        template: PathBuf,
    },

    /// Print the order resources would be emitted in
    Order {
        /// Template file (YAML or JSON)
        template: PathBuf,

        /// Fail on dependency cycles
        #[arg(long)]
        strict: bool,
    },
}

/// Dispatch a CLI command.
pub fn dispatch(cmd: Commands) -> Result<(), String> {
    match cmd {
        Commands::Import {
            template,
            output,
            package,
            catalog,
            import_root,
            strict,
            no_provenance,
        } => {
            let options = ImportOptions {
                package_name: package.unwrap_or_else(|| package_name_for_path(&template)),
                strict,
                provenance: !no_provenance,
            };
            cmd_import(&template, &output, catalog.as_deref(), &import_root, &options)
        }
        Commands::Validate { template } => cmd_validate(&template),
        Commands::Order { template, strict } => cmd_order(&template, strict),
    }
}

fn load_catalog(catalog: Option<&Path>, import_root: &str) -> Result<Box<dyn TypeCatalog>, String> {
    match catalog {
        Some(path) => {
            let loaded = StaticCatalog::load(path).map_err(|e| e.to_string())?;
            Ok(Box::new(loaded))
        }
        None => Ok(Box::new(ConventionCatalog::new(import_root))),
    }
}

fn cmd_import(
    template: &Path,
    output: &Path,
    catalog: Option<&Path>,
    import_root: &str,
    options: &ImportOptions,
) -> Result<(), String> {
    let content = std::fs::read(template)
        .map_err(|e| format!("failed to read {}: {}", template.display(), e))?;
    let catalog = load_catalog(catalog, import_root)?;

    let result =
        importer::import_template(&content, catalog.as_ref(), options).map_err(|e| e.to_string())?;

    std::fs::create_dir_all(output)
        .map_err(|e| format!("cannot create {}: {}", output.display(), e))?;
    for (name, code) in &result.files {
        let path = output.join(name);
        std::fs::write(&path, code)
            .map_err(|e| format!("cannot write {}: {}", path.display(), e))?;
        println!("Generated: {}", path.display());
    }

    for diag in result.diagnostics.warnings() {
        eprintln!("  {}", diag);
    }
    println!(
        "Imported {} resources ({} parameters, {} outputs), {} warning(s)",
        result.template.resources.len(),
        result.template.parameters.len(),
        result.template.outputs.len(),
        result.warning_count()
    );
    Ok(())
}

fn cmd_validate(file: &Path) -> Result<(), String> {
    let (template, diags) = parser::parse_template_file(file).map_err(|e| e.to_string())?;
    let graph = resolver::analyze_references(&template);
    let errors = parser::validate_template(&template, &graph);

    for diag in diags.warnings() {
        eprintln!("  {}", diag);
    }

    if errors.is_empty() {
        println!(
            "OK: {} ({} resources, {} parameters, {} outputs)",
            file.display(),
            template.resources.len(),
            template.parameters.len(),
            template.outputs.len()
        );
        Ok(())
    } else {
        for e in &errors {
            eprintln!("  ERROR: {}", e);
        }
        Err(format!("{} validation error(s)", errors.len()))
    }
}

fn cmd_order(file: &Path, strict: bool) -> Result<(), String> {
    let (template, _) = parser::parse_template_file(file).map_err(|e| e.to_string())?;
    let graph = resolver::analyze_references(&template);
    let ids: Vec<String> = template.resources.keys().cloned().collect();

    let order = if strict {
        resolver::strict_resource_order(&ids, &graph).map_err(|e| e.to_string())?
    } else {
        resolver::build_resource_order(&ids, &graph)
    };

    for (i, id) in order.iter().enumerate() {
        let deps: Vec<&str> = graph
            .dependencies(id)
            .filter(|dep| *dep != id && template.resources.contains_key(*dep))
            .collect();
        if deps.is_empty() {
            println!("{:>3}. {}", i + 1, id);
        } else {
            println!("{:>3}. {} (after {})", i + 1, id, deps.join(", "));
        }
    }

    let cycles = resolver::find_cycles(&ids, &graph);
    for cycle in &cycles {
        eprintln!("  warning: dependency cycle: {}", cycle.join(" -> "));
    }
    Ok(())
}
