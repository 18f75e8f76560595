//! CP-004: Normalization of the generic tree into the canonical IR.
//!
//! Short-form tags and long-form `Fn::` maps are both reduced to
//! `(kind, normalized argument)` and built through
//! [`intrinsics::build`](super::intrinsics::build), so the two syntaxes accept
//! exactly the same shapes.
//!
//! Unrecognized or malformed tags degrade instead of failing: a scalar passes
//! through as a literal string, a composite becomes `Null`. Each degradation is
//! recorded as a warning.

use super::decoder::Node;
use super::intrinsics::{self, ArgShape, IntrinsicKind};
use super::types::*;
use indexmap::IndexMap;

/// Logical-id prefix of loop-expansion entries, which are not imported.
pub const FOR_EACH_PREFIX: &str = "Fn::ForEach::";

/// Build a [`Template`] from a decoded root mapping.
pub fn normalize_template(root: &Node, diags: &mut Diagnostics) -> Template {
    let mut template = Template::default();
    let Some(data) = root.as_map() else {
        diags.warn(None, "template root is not a mapping");
        return template;
    };

    template.description = data.get("Description").and_then(Node::scalar_text);
    if let Some(version) = data.get("AWSTemplateFormatVersion").and_then(Node::scalar_text) {
        template.format_version = version;
    }
    template.transform = data
        .get("Transform")
        .map(|node| normalize_value(node, None, diags));

    if let Some(params) = data.get("Parameters").and_then(Node::as_map) {
        for (id, def) in params {
            match def.as_map() {
                Some(props) => {
                    let param = normalize_parameter(id, props, diags);
                    template.parameters.insert(id.clone(), param);
                }
                None => diags.warn(Some(id), "parameter definition is not a mapping; skipped"),
            }
        }
    }

    if let Some(mappings) = data.get("Mappings").and_then(Node::as_map) {
        for (id, table) in mappings {
            match table.as_map() {
                Some(table) => {
                    let mapping = normalize_mapping(id, table, diags);
                    template.mappings.insert(id.clone(), mapping);
                }
                None => diags.warn(Some(id), "mapping is not a mapping table; skipped"),
            }
        }
    }

    if let Some(conditions) = data.get("Conditions").and_then(Node::as_map) {
        for (id, expr) in conditions {
            let condition = Condition {
                logical_id: id.clone(),
                expression: normalize_value(expr, Some(id), diags),
            };
            template.conditions.insert(id.clone(), condition);
        }
    }

    if let Some(resources) = data.get("Resources").and_then(Node::as_map) {
        for (id, def) in resources {
            if id.starts_with(FOR_EACH_PREFIX) {
                diags.info(Some(id), "loop expansion is not imported; skipped");
                continue;
            }
            match def.as_map() {
                Some(def) => {
                    let resource = normalize_resource(id, def, diags);
                    template.resources.insert(id.clone(), resource);
                }
                None => diags.warn(Some(id), "resource definition is not a mapping; skipped"),
            }
        }
    }

    if let Some(outputs) = data.get("Outputs").and_then(Node::as_map) {
        for (id, def) in outputs {
            if id.starts_with(FOR_EACH_PREFIX) {
                diags.info(Some(id), "loop expansion is not imported; skipped");
                continue;
            }
            match def.as_map() {
                Some(def) => {
                    let output = normalize_output(id, def, diags);
                    template.outputs.insert(id.clone(), output);
                }
                None => diags.warn(Some(id), "output definition is not a mapping; skipped"),
            }
        }
    }

    template
}

/// Convert one node (and everything below it) into a [`Value`].
pub fn normalize_value(node: &Node, entity: Option<&str>, diags: &mut Diagnostics) -> Value {
    match node {
        Node::Null => Value::Null,
        Node::Bool(b) => Value::Bool(*b),
        Node::Int(n) => Value::Number(Number::Int(*n)),
        Node::Float(x) => Value::Number(Number::Float(*x)),
        Node::String(s) => Value::String(s.clone()),
        Node::Seq(items) => Value::List(
            items
                .iter()
                .map(|item| normalize_value(item, entity, diags))
                .collect(),
        ),
        Node::Tagged { tag, node } => normalize_tagged(tag, node, entity, diags),
        Node::Map(map) => {
            if map.len() == 1 {
                if let Some((key, arg)) = map.first() {
                    if let Some(value) = normalize_long_form(key, arg, entity, diags) {
                        return value;
                    }
                }
            }
            Value::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), normalize_value(v, entity, diags)))
                    .collect(),
            )
        }
    }
}

fn normalize_tagged(
    tag: &str,
    node: &Node,
    entity: Option<&str>,
    diags: &mut Diagnostics,
) -> Value {
    let Some(kind) = IntrinsicKind::from_tag(tag) else {
        diags.warn(entity, format!("unknown tag !{}; value kept as a literal", tag));
        return degrade(node);
    };
    let arg = normalize_value(node, entity, diags);
    match intrinsics::build(kind, arg) {
        Ok(intrinsic) => intrinsic.into(),
        Err(e) => {
            diags.warn(entity, format!("!{}: {}; value kept as a literal", tag, e));
            degrade(node)
        }
    }
}

/// Returns `None` when the single-key map is not an intrinsic call and should
/// be kept as an ordinary map.
fn normalize_long_form(
    key: &str,
    arg: &Node,
    entity: Option<&str>,
    diags: &mut Diagnostics,
) -> Option<Value> {
    let kind = IntrinsicKind::from_key(key)?;
    // A name-shaped key over a composite is ordinary data (a policy
    // `Condition` block); scalars go through the shared table.
    if matches!(kind.shape(), ArgShape::Name) && matches!(arg, Node::Map(_) | Node::Seq(_)) {
        return None;
    }
    let value = normalize_value(arg, entity, diags);
    match intrinsics::build(kind, value) {
        Ok(intrinsic) => Some(intrinsic.into()),
        Err(e) => {
            diags.warn(entity, format!("{}: {}; kept as a map", key, e));
            None
        }
    }
}

/// Information-loss boundary for tags that cannot be interpreted.
fn degrade(node: &Node) -> Value {
    match node {
        Node::Tagged { node, .. } => degrade(node),
        other => match other.scalar_text() {
            Some(text) if !matches!(other, Node::Null) => Value::String(text),
            _ => Value::Null,
        },
    }
}

fn text(props: &IndexMap<String, Node>, key: &str) -> Option<String> {
    props.get(key).and_then(Node::scalar_text)
}

fn int(props: &IndexMap<String, Node>, key: &str) -> Option<i64> {
    match props.get(key)? {
        Node::Int(n) => Some(*n),
        Node::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn float(props: &IndexMap<String, Node>, key: &str) -> Option<f64> {
    match props.get(key)? {
        Node::Int(n) => Some(*n as f64),
        Node::Float(x) => Some(*x),
        Node::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn normalize_parameter(
    id: &str,
    props: &IndexMap<String, Node>,
    diags: &mut Diagnostics,
) -> Parameter {
    let mut param = Parameter::new(id);
    if let Some(t) = text(props, "Type") {
        param.param_type = t;
    }
    param.description = text(props, "Description");
    param.default = props
        .get("Default")
        .map(|node| normalize_value(node, Some(id), diags));
    if let Some(Node::Seq(items)) = props.get("AllowedValues") {
        param.allowed_values = items
            .iter()
            .map(|node| normalize_value(node, Some(id), diags))
            .collect();
    }
    param.allowed_pattern = text(props, "AllowedPattern");
    param.min_length = int(props, "MinLength");
    param.max_length = int(props, "MaxLength");
    param.min_value = float(props, "MinValue");
    param.max_value = float(props, "MaxValue");
    param.constraint_description = text(props, "ConstraintDescription");
    param.no_echo = match props.get("NoEcho") {
        Some(Node::Bool(b)) => *b,
        Some(Node::String(s)) => s.eq_ignore_ascii_case("true"),
        _ => false,
    };
    param
}

fn normalize_mapping(
    id: &str,
    table: &IndexMap<String, Node>,
    diags: &mut Diagnostics,
) -> Mapping {
    let mut entries = IndexMap::new();
    for (top_key, second) in table {
        match second.as_map() {
            Some(second) => {
                let row = second
                    .iter()
                    .map(|(k, v)| (k.clone(), normalize_value(v, Some(id), diags)))
                    .collect();
                entries.insert(top_key.clone(), row);
            }
            None => diags.warn(
                Some(id),
                format!("mapping key '{}' is not a second-level table; skipped", top_key),
            ),
        }
    }
    Mapping {
        logical_id: id.to_string(),
        entries,
    }
}

fn normalize_resource(id: &str, def: &IndexMap<String, Node>, diags: &mut Diagnostics) -> Resource {
    let resource_type = text(def, "Type").unwrap_or_else(|| {
        diags.warn(Some(id), "resource has no Type");
        String::new()
    });
    let mut resource = Resource::new(id, resource_type);

    match def.get("Properties") {
        Some(Node::Map(props)) => {
            for (name, node) in props {
                let value = normalize_value(node, Some(id), diags);
                resource.properties.insert(name.clone(), value);
            }
        }
        Some(Node::Null) | None => {}
        Some(_) => diags.warn(Some(id), "Properties is not a mapping; ignored"),
    }

    resource.depends_on = match def.get("DependsOn") {
        Some(Node::String(dep)) => vec![dep.clone()],
        Some(Node::Seq(items)) => items
            .iter()
            .filter_map(|n| n.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    };
    resource.condition = def.get("Condition").and_then(|n| n.as_str().map(str::to_string));
    resource.deletion_policy = text(def, "DeletionPolicy");
    resource.update_replace_policy = text(def, "UpdateReplacePolicy");
    resource.metadata = def
        .get("Metadata")
        .map(|node| normalize_value(node, Some(id), diags));
    resource
}

fn normalize_output(id: &str, def: &IndexMap<String, Node>, diags: &mut Diagnostics) -> Output {
    let value = match def.get("Value") {
        Some(node) => normalize_value(node, Some(id), diags),
        None => {
            diags.warn(Some(id), "output has no Value");
            Value::Null
        }
    };
    let export_name = def
        .get("Export")
        .and_then(Node::as_map)
        .and_then(|export| export.get("Name"))
        .map(|node| normalize_value(node, Some(id), diags));

    Output {
        logical_id: id.to_string(),
        value,
        description: text(def, "Description"),
        export_name,
        condition: def.get("Condition").and_then(|n| n.as_str().map(str::to_string)),
    }
}
