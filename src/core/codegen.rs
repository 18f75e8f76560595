//! CP-009: Code generation from IR to one Go source file.
//!
//! Declarations come out in a fixed layout: header, imports, parameters,
//! mappings, conditions, resources (dependency order, each preceded by its
//! property blocks), outputs. Imports and the parameter list are only known
//! after every value has been rendered, so the body is rendered first and the
//! header assembled last.

use super::catalog::{QualifiedName, TypeCatalog};
use super::naming::{
    disambiguate, is_valid_identifier, pseudo_constant, sanitize_identifier, singularize,
    DeclKind, FALLBACK_PACKAGE,
};
use super::resolver::is_pseudo_parameter;
use super::types::*;
use crate::emit::{self, blocks, go_quote, value::value_to_go};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Properties that always stay untyped (`[]any` / `map[string]any`).
pub const UNTYPED_PROPERTIES: &[&str] = &["Tags", "Metadata"];

/// Placeholder emitted for resource types the catalog does not know.
pub const UNKNOWN_RESOURCE: &str = "unknown.Resource";

/// Caller-facing knobs for one import run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportOptions {
    /// Go package name of the generated file
    #[serde(default = "default_package")]
    pub package_name: String,

    /// Fail on dependency cycles instead of ordering them alphabetically
    #[serde(default)]
    pub strict: bool,

    /// Embed a BLAKE3 digest of the source document in the header
    #[serde(default = "default_true")]
    pub provenance: bool,
}

fn default_package() -> String {
    FALLBACK_PACKAGE.to_string()
}

fn default_true() -> bool {
    true
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            package_name: default_package(),
            strict: false,
            provenance: true,
        }
    }
}

impl ImportOptions {
    pub fn with_package(package_name: impl Into<String>) -> Self {
        Self {
            package_name: package_name.into(),
            ..Self::default()
        }
    }

    /// Name of the single generated file.
    pub fn file_name(&self) -> String {
        format!("{}.go", self.package_name)
    }
}

/// Generated source files plus everything worth telling the user.
#[derive(Debug, Clone)]
pub struct Generated {
    /// File name → source text
    pub files: BTreeMap<String, String>,
    pub diagnostics: Diagnostics,
}

/// A top-level declaration hoisted out of a resource's property values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingBlock {
    pub var_name: String,
    pub text: String,
}

/// The resource currently being rendered.
#[derive(Debug, Clone)]
struct ResourceScope {
    logical_id: String,
    var_name: String,
    type_name: Option<QualifiedName>,
}

/// All mutable state of one generation run.
pub struct GenContext<'a> {
    pub template: &'a Template,
    catalog: &'a dyn TypeCatalog,
    imports: BTreeSet<String>,
    used_parameters: BTreeSet<String>,
    block_name_count: HashMap<String, usize>,
    declarations: BTreeMap<(DeclKind, String), String>,
    reserved: BTreeSet<String>,
    pending_blocks: Vec<PendingBlock>,
    scope: Option<ResourceScope>,
    current_property: Option<String>,
    pub diagnostics: Diagnostics,
}

impl<'a> GenContext<'a> {
    /// Fresh context with every top-level declaration name assigned.
    pub fn new(template: &'a Template, catalog: &'a dyn TypeCatalog) -> Self {
        let (declarations, reserved) = assign_declaration_names(template);
        Self {
            template,
            catalog,
            imports: BTreeSet::new(),
            used_parameters: BTreeSet::new(),
            block_name_count: HashMap::new(),
            declarations,
            reserved,
            pending_blocks: Vec::new(),
            scope: None,
            current_property: None,
            diagnostics: Diagnostics::new(),
        }
    }

    /// Record that the dot-imported intrinsics package is needed.
    pub fn use_intrinsics(&mut self) {
        self.imports.insert(self.catalog.intrinsics_import());
    }

    pub fn use_package(&mut self, package: &str) {
        self.imports.insert(self.catalog.package_import(package));
    }

    pub fn imports(&self) -> impl Iterator<Item = &str> {
        self.imports.iter().map(String::as_str)
    }

    pub fn is_parameter_used(&self, id: &str) -> bool {
        self.used_parameters.contains(id)
    }

    /// Variable name of a top-level declaration.
    pub fn declared_name(&self, kind: DeclKind, id: &str) -> String {
        self.declarations
            .get(&(kind, id.to_string()))
            .cloned()
            .unwrap_or_else(|| kind.base_name(id))
    }

    /// Render a `Ref`: pseudo-parameter constant, bare identifier for a
    /// known resource or parameter, `Ref{"X"}` otherwise.
    pub fn resolve_ref(&mut self, target: &str) -> String {
        if is_pseudo_parameter(target) {
            self.use_intrinsics();
            return match pseudo_constant(target) {
                Some(constant) => constant.to_string(),
                None => format!("Ref{{{}}}", go_quote(target)),
            };
        }
        if self.template.resources.contains_key(target) {
            return self.declared_name(DeclKind::Resource, target);
        }
        if self.template.parameters.contains_key(target) {
            self.used_parameters.insert(target.to_string());
            return self.declared_name(DeclKind::Parameter, target);
        }
        self.use_intrinsics();
        format!("Ref{{{}}}", go_quote(target))
    }

    /// Render a `GetAtt`: attribute access on a known resource,
    /// `GetAtt{"X", "Attr"}` otherwise.
    pub fn resolve_get_att(&mut self, target: &str, attribute: &str) -> String {
        let selectable = !attribute.is_empty()
            && attribute.split('.').all(is_valid_identifier);
        if self.template.resources.contains_key(target) && selectable {
            return format!("{}.{}", self.declared_name(DeclKind::Resource, target), attribute);
        }
        self.use_intrinsics();
        format!("GetAtt{{{}, {}}}", go_quote(target), go_quote(attribute))
    }

    /// Logical id of the resource being rendered.
    pub fn current_logical_id(&self) -> Option<&str> {
        self.scope.as_ref().map(|s| s.logical_id.as_str())
    }

    /// Variable name of the resource being rendered.
    pub fn current_var_name(&self) -> Option<&str> {
        self.scope.as_ref().map(|s| s.var_name.as_str())
    }

    /// Catalog type of the resource being rendered.
    pub fn current_type(&self) -> Option<&QualifiedName> {
        self.scope.as_ref().and_then(|s| s.type_name.as_ref())
    }

    /// Typed struct for a map-valued property, if the catalog has one.
    pub fn nested_type(&self, property: &str) -> Option<QualifiedName> {
        if UNTYPED_PROPERTIES.contains(&property) {
            return None;
        }
        let owner = self.current_type()?;
        self.catalog.lookup_nested(owner, property)
    }

    /// Typed struct for the elements of a list-valued property.
    pub fn element_type(&self, property: &str) -> Option<QualifiedName> {
        if UNTYPED_PROPERTIES.contains(&property) {
            return None;
        }
        self.nested_type(&singularize(property))
    }

    /// Next value of the per-(resource, property) counter, starting at 1.
    pub fn next_counter(&mut self) -> usize {
        let key = format!(
            "{}.{}",
            self.current_logical_id().unwrap_or_default(),
            self.current_property.as_deref().unwrap_or_default()
        );
        let count = self.block_name_count.entry(key).or_insert(0);
        *count += 1;
        *count
    }

    /// Claim a top-level name, numbering it when already taken.
    pub fn reserve_name(&mut self, base: &str) -> String {
        let name = disambiguate(&sanitize_identifier(base), &self.reserved);
        self.reserved.insert(name.clone());
        name
    }

    /// Queue a declaration to be emitted before the current resource.
    pub fn push_block(&mut self, var_name: String, text: String) {
        self.pending_blocks.push(PendingBlock { var_name, text });
    }

    fn take_blocks(&mut self) -> Vec<PendingBlock> {
        std::mem::take(&mut self.pending_blocks)
    }

    fn enter_resource(&mut self, logical_id: &str, type_name: Option<QualifiedName>) {
        self.scope = Some(ResourceScope {
            logical_id: logical_id.to_string(),
            var_name: self.declared_name(DeclKind::Resource, logical_id),
            type_name,
        });
        self.current_property = None;
    }

    fn enter_property(&mut self, property: &str) {
        self.current_property = Some(property.to_string());
    }

    fn leave_resource(&mut self) {
        self.scope = None;
        self.current_property = None;
    }
}

/// One variable name per top-level declaration. Verbatim ids claim first so a
/// rewritten id (`my-queue`) never displaces one that is already valid Go
/// (`myqueue`); within each pass kinds go resources, parameters, mappings,
/// conditions, outputs, and ids sort alphabetically.
fn assign_declaration_names(
    template: &Template,
) -> (BTreeMap<(DeclKind, String), String>, BTreeSet<String>) {
    let mut candidates: Vec<(DeclKind, &str)> = Vec::new();
    for kind in DeclKind::ALL {
        let mut ids: Vec<&str> = match kind {
            DeclKind::Resource => template.resources.keys().map(String::as_str).collect(),
            DeclKind::Parameter => template.parameters.keys().map(String::as_str).collect(),
            DeclKind::Mapping => template.mappings.keys().map(String::as_str).collect(),
            DeclKind::Condition => template.conditions.keys().map(String::as_str).collect(),
            DeclKind::Output => template.outputs.keys().map(String::as_str).collect(),
        };
        ids.sort_unstable();
        candidates.extend(ids.into_iter().map(|id| (kind, id)));
    }
    candidates.sort_by_key(|(kind, id)| !kind.is_verbatim(id));

    let mut declarations = BTreeMap::new();
    let mut reserved = BTreeSet::new();
    for (kind, id) in candidates {
        let name = disambiguate(&kind.base_name(id), &reserved);
        reserved.insert(name.clone());
        declarations.insert((kind, id.to_string()), name);
    }
    (declarations, reserved)
}

// ============================================================================
// Declarations
// ============================================================================

fn generate_parameter(ctx: &GenContext, param: &Parameter) -> String {
    let name = ctx.declared_name(DeclKind::Parameter, &param.logical_id);
    let mut lines = Vec::new();
    if let Some(desc) = param.description.as_deref().filter(|d| !d.is_empty()) {
        lines.push(format!("// {} - {}", name, single_line(desc)));
    }
    lines.push(format!(
        "var {} = Param({})",
        name,
        go_quote(&param.logical_id)
    ));
    lines.join("\n")
}

fn generate_mapping(ctx: &mut GenContext, mapping: &Mapping) -> String {
    let table: Vec<String> = mapping
        .entries
        .iter()
        .map(|(top, second)| {
            let inner: Vec<String> = second
                .iter()
                .map(|(key, value)| format!("{}: {}", go_quote(key), value_to_go(ctx, value, 2, None)))
                .collect();
            format!("{}: {}", go_quote(top), emit::composite("map[string]any", &inner, 1))
        })
        .collect();
    format!(
        "var {} = {}",
        ctx.declared_name(DeclKind::Mapping, &mapping.logical_id),
        emit::composite("map[string]any", &table, 0)
    )
}

fn generate_condition(ctx: &mut GenContext, condition: &Condition) -> String {
    format!(
        "var {} = {}",
        ctx.declared_name(DeclKind::Condition, &condition.logical_id),
        value_to_go(ctx, &condition.expression, 0, None)
    )
}

fn generate_resource(ctx: &mut GenContext, resource: &Resource) -> String {
    let id = &resource.logical_id;
    let entry = ctx.catalog.lookup(&resource.resource_type);
    let mut lines = Vec::new();

    let type_text = match &entry {
        Some(entry) => {
            ctx.use_package(&entry.type_name.package);
            entry.type_name.to_string()
        }
        None => {
            ctx.diagnostics.warn(
                Some(id),
                format!("unknown resource type {}", resource.resource_type),
            );
            lines.push(format!(
                "// Unknown resource type: {}",
                single_line(&resource.resource_type)
            ));
            UNKNOWN_RESOURCE.to_string()
        }
    };

    ctx.enter_resource(id, entry.as_ref().map(|e| e.type_name.clone()));

    let mut names: Vec<&String> = resource.properties.keys().collect();
    names.sort();

    let mut fields = Vec::with_capacity(names.len());
    for name in names {
        let value = &resource.properties[name];
        if let Some(entry) = &entry {
            if !entry.properties.is_empty() && !entry.properties.contains(name) {
                ctx.diagnostics.warn(
                    Some(id),
                    format!("property {} is not declared by {}", name, entry.type_name),
                );
            }
        }
        ctx.enter_property(name);
        let rendered = render_property(ctx, &resource.resource_type, name, value);
        fields.push(format!("{}: {}", sanitize_identifier(name), rendered));
    }

    let blocks = ctx.take_blocks();
    ctx.leave_resource();

    let mut sections: Vec<String> = blocks.into_iter().map(|b| b.text).collect();
    lines.push(format!(
        "var {} = {}",
        ctx.declared_name(DeclKind::Resource, id),
        emit::composite(&type_text, &fields, 0)
    ));
    sections.push(lines.join("\n"));
    sections.join("\n\n")
}

/// Dispatch one property to block style, tag style, or plain conversion.
fn render_property(ctx: &mut GenContext, resource_type: &str, name: &str, value: &Value) -> String {
    if name == "Tags" {
        if let Some(text) = blocks::tags_to_blocks(ctx, value) {
            return text;
        }
    } else if let Some(element) = blocks::block_element_type(ctx, resource_type, name) {
        if let Some(text) = blocks::list_to_blocks(ctx, value, &element) {
            return text;
        }
    }
    value_to_go(ctx, value, 1, Some(name))
}

fn generate_output(ctx: &mut GenContext, output: &Output) -> String {
    let name = ctx.declared_name(DeclKind::Output, &output.logical_id);
    ctx.use_intrinsics();

    let mut lines = Vec::new();
    let description = output.description.as_deref().filter(|d| !d.is_empty());
    if let Some(desc) = description {
        lines.push(format!("// {} - {}", name, single_line(desc)));
    }
    lines.push(format!("var {} = Output{{", name));
    lines.push(format!("\tValue:       {},", value_to_go(ctx, &output.value, 1, None)));
    if let Some(desc) = description {
        lines.push(format!("\tDescription: {},", go_quote(desc)));
    }
    if let Some(export) = &output.export_name {
        lines.push(format!("\tExportName:  {},", value_to_go(ctx, export, 1, None)));
    }
    if let Some(cond) = &output.condition {
        lines.push(format!("\tCondition:   {},", go_quote(cond)));
    }
    lines.push("}".to_string());
    lines.join("\n")
}

/// Collapse a free-form string onto one comment line.
fn single_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn generate_header(template: &Template, package: &str) -> String {
    let mut header = format!("// Package {} contains CloudFormation resources.\n", package);
    if let Some(desc) = template.description.as_deref().filter(|d| !d.trim().is_empty()) {
        for line in desc.lines().filter(|l| !l.trim().is_empty()) {
            header.push_str(&format!("// {}\n", line.trim_end()));
        }
    }
    header.push_str("//\n// Generated by cfnport import.\n");
    header.push_str(&format!("package {}", package));
    header
}

fn generate_imports(ctx: &GenContext) -> Option<String> {
    if ctx.imports.is_empty() {
        return None;
    }
    let intrinsics = ctx.catalog.intrinsics_import();
    let lines: Vec<String> = ctx
        .imports()
        .map(|path| {
            if path == intrinsics {
                format!("\t. {}", go_quote(path))
            } else {
                format!("\t{}", go_quote(path))
            }
        })
        .collect();
    Some(format!("import (\n{}\n)", lines.join("\n")))
}

/// Generate Go source for a template whose resources are already ordered.
pub fn generate_code(
    template: &Template,
    graph: &ReferenceGraph,
    order: &[String],
    catalog: &dyn TypeCatalog,
    options: &ImportOptions,
) -> Generated {
    let mut ctx = GenContext::new(template, catalog);

    // Render the body first: it decides imports and which parameters are used.
    let mut mappings: Vec<&Mapping> = template.mappings.values().collect();
    mappings.sort_by(|a, b| a.logical_id.cmp(&b.logical_id));
    let mapping_sections: Vec<String> = mappings
        .into_iter()
        .map(|m| generate_mapping(&mut ctx, m))
        .collect();

    let mut conditions: Vec<&Condition> = template.conditions.values().collect();
    conditions.sort_by(|a, b| a.logical_id.cmp(&b.logical_id));
    let condition_sections: Vec<String> = conditions
        .into_iter()
        .map(|c| generate_condition(&mut ctx, c))
        .collect();

    let resource_sections: Vec<String> = order
        .iter()
        .filter_map(|id| template.resources.get(id))
        .map(|r| generate_resource(&mut ctx, r))
        .collect();

    let mut outputs: Vec<&Output> = template.outputs.values().collect();
    outputs.sort_by(|a, b| a.logical_id.cmp(&b.logical_id));
    let output_sections: Vec<String> = outputs
        .into_iter()
        .map(|o| generate_output(&mut ctx, o))
        .collect();

    let mut params: Vec<&Parameter> = template
        .parameters
        .values()
        .filter(|p| graph.is_referenced(&p.logical_id) || ctx.is_parameter_used(&p.logical_id))
        .collect();
    params.sort_by(|a, b| a.logical_id.cmp(&b.logical_id));
    if !params.is_empty() {
        ctx.use_intrinsics();
    }
    let param_sections: Vec<String> = params
        .into_iter()
        .map(|p| generate_parameter(&ctx, p))
        .collect();

    let mut sections = vec![generate_header(template, &options.package_name)];
    sections.extend(generate_imports(&ctx));
    sections.extend(param_sections);
    sections.extend(mapping_sections);
    sections.extend(condition_sections);
    sections.extend(resource_sections);
    sections.extend(output_sections);

    let code = sections.join("\n\n") + "\n";
    tracing::debug!(
        package = %options.package_name,
        bytes = code.len(),
        warnings = ctx.diagnostics.warnings().count(),
        "generated code"
    );

    let mut files = BTreeMap::new();
    files.insert(options.file_name(), code);
    Generated {
        files,
        diagnostics: ctx.diagnostics,
    }
}
