//! Block-style properties: list elements hoisted into their own named `var`
//! declarations, referenced from the owning resource by name.

use super::value::{sorted_entries, value_to_go};
use super::{composite, go_quote};
use crate::core::catalog::QualifiedName;
use crate::core::codegen::GenContext;
use crate::core::naming::{clean_for_name, is_valid_identifier};
use crate::core::types::Value;
use indexmap::IndexMap;

/// `(resource type, property, element type)` triples rendered block style.
pub const BLOCK_PROPERTIES: &[(&str, &str, &str)] = &[
    (
        "AWS::EC2::SecurityGroup",
        "SecurityGroupIngress",
        "SecurityGroup_Ingress",
    ),
    (
        "AWS::EC2::SecurityGroup",
        "SecurityGroupEgress",
        "SecurityGroup_Egress",
    ),
];

/// Keys searched, in order, for a descriptive block name.
pub const NAME_KEYS: &[&str] = &["Name", "Key", "Type", "DeviceName", "PolicyName"];

/// Element type for a block-worthy property of the current resource.
pub fn block_element_type(
    ctx: &GenContext,
    resource_type: &str,
    property: &str,
) -> Option<QualifiedName> {
    let (_, _, element) = BLOCK_PROPERTIES
        .iter()
        .find(|(t, p, _)| *t == resource_type && *p == property)?;
    let owner = ctx.current_type()?;
    Some(QualifiedName::new(owner.package.clone(), *element))
}

/// `Port80`, `Ports8000To8080`, `Port53UDP`.
fn port_suffix(fields: &IndexMap<String, Value>) -> Option<String> {
    let from = fields.get("FromPort")?.scalar_text()?;
    let mut suffix = match fields.get("ToPort").and_then(Value::scalar_text) {
        Some(to) if to != from => format!("Ports{}To{}", from, to),
        _ => format!("Port{}", from),
    };
    if let Some(protocol) = fields.get("IpProtocol").and_then(Value::as_str) {
        if protocol != "tcp" {
            suffix.push_str(&protocol.to_uppercase());
        }
    }
    let cleaned: String = suffix
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect();
    Some(cleaned)
}

fn name_suffix(fields: &IndexMap<String, Value>) -> Option<String> {
    NAME_KEYS
        .iter()
        .filter_map(|key| fields.get(*key).and_then(Value::as_str))
        .map(clean_for_name)
        .find(|cleaned| !cleaned.is_empty())
}

/// `Ingress` for `SecurityGroup_Ingress`.
fn element_fragment(element: &QualifiedName) -> &str {
    element.name.rsplit('_').next().unwrap_or(&element.name)
}

/// Derive and reserve a unique variable name for one block: port suffix,
/// then a name-like field, then the element kind plus a per-property counter.
pub fn block_var_name(
    ctx: &mut GenContext,
    fields: &IndexMap<String, Value>,
    element: &QualifiedName,
) -> String {
    let owner = ctx.current_var_name().unwrap_or_default().to_string();
    let suffix = match port_suffix(fields).or_else(|| name_suffix(fields)) {
        Some(suffix) => suffix,
        None => format!("{}{}", element_fragment(element), ctx.next_counter()),
    };
    ctx.reserve_name(&format!("{}{}", owner, suffix))
}

fn block_text(ctx: &mut GenContext, name: &str, type_text: &str, fields: &IndexMap<String, Value>) -> String {
    let rendered: Vec<String> = sorted_entries(fields)
        .into_iter()
        .map(|(key, value)| format!("{}: {}", key, value_to_go(ctx, value, 1, None)))
        .collect();
    format!("var {} = {}", name, composite(type_text, &rendered, 0))
}

/// Hoist every element of a block-worthy list. Returns `None` (leaving the
/// caller to render the value inline) unless every element is a map with
/// identifier keys.
pub fn list_to_blocks(
    ctx: &mut GenContext,
    value: &Value,
    element: &QualifiedName,
) -> Option<String> {
    let items = value.as_list()?;
    let maps: Vec<&IndexMap<String, Value>> =
        items.iter().map(Value::as_map).collect::<Option<_>>()?;
    if !maps.iter().all(|m| m.keys().all(|k| is_valid_identifier(k))) {
        return None;
    }

    let type_text = element.to_string();
    let mut names = Vec::with_capacity(maps.len());
    for fields in maps {
        let name = block_var_name(ctx, fields, element);
        let text = block_text(ctx, &name, &type_text, fields);
        ctx.push_block(name.clone(), text);
        names.push(name);
    }
    Some(format!("[]{}{{{}}}", type_text, names.join(", ")))
}

/// Hoist each `{Key, Value}` tag into a `Tag` declaration. Returns `None`
/// unless every element has exactly a string `Key` and a `Value`.
pub fn tags_to_blocks(ctx: &mut GenContext, value: &Value) -> Option<String> {
    let items = value.as_list()?;
    let mut tags = Vec::with_capacity(items.len());
    for item in items {
        let fields = item.as_map()?;
        let key = fields.get("Key")?.as_str()?;
        let tag_value = fields.get("Value")?;
        if fields.len() != 2 {
            return None;
        }
        tags.push((key, tag_value));
    }

    ctx.use_intrinsics();
    let owner = ctx.current_var_name().unwrap_or_default().to_string();
    let mut names = Vec::with_capacity(tags.len());
    for (key, tag_value) in tags {
        let name = ctx.reserve_name(&format!("{}Tag{}", owner, clean_for_name(key)));
        let rendered = value_to_go(ctx, tag_value, 1, None);
        let text = format!(
            "var {} = Tag{{\n\tKey:   {},\n\tValue: {},\n}}",
            name,
            go_quote(key),
            rendered
        );
        ctx.push_block(name.clone(), text);
        names.push(name);
    }
    Some(format!("[]any{{{}}}", names.join(", ")))
}
