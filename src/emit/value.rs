//! Literal and composite values.
//!
//! `property` threads the name of the field being rendered so map and list
//! values can pick a typed struct from the catalog. It is dropped once a value
//! falls back to an untyped literal.

use super::intrinsic::intrinsic_to_go;
use super::{composite, go_quote};
use crate::core::catalog::QualifiedName;
use crate::core::codegen::GenContext;
use crate::core::naming::{is_valid_identifier, pseudo_constant};
use crate::core::types::Value;
use indexmap::IndexMap;

/// Render any value at nesting depth `level`.
pub fn value_to_go(
    ctx: &mut GenContext,
    value: &Value,
    level: usize,
    property: Option<&str>,
) -> String {
    match value {
        Value::Null => "nil".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => string_to_go(ctx, s),
        Value::List(items) => list_to_go(ctx, items, level, property),
        Value::Map(map) => map_to_go(ctx, map, level, property),
        Value::Intrinsic(intrinsic) => intrinsic_to_go(ctx, intrinsic, level),
    }
}

/// A string literal; pseudo-parameter names become their constants.
pub fn string_to_go(ctx: &mut GenContext, s: &str) -> String {
    match pseudo_constant(s) {
        Some(constant) => {
            ctx.use_intrinsics();
            constant.to_string()
        }
        None => go_quote(s),
    }
}

fn has_identifier_keys(map: &IndexMap<String, Value>) -> bool {
    map.keys().all(|k| is_valid_identifier(k))
}

/// Keys of `map` in sorted order.
pub fn sorted_entries(map: &IndexMap<String, Value>) -> Vec<(&String, &Value)> {
    let mut entries: Vec<(&String, &Value)> = map.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    entries
}

pub fn list_to_go(
    ctx: &mut GenContext,
    items: &[Value],
    level: usize,
    property: Option<&str>,
) -> String {
    if items.is_empty() {
        return "[]any{}".to_string();
    }

    let all_struct_like = items
        .iter()
        .all(|item| item.as_map().is_some_and(has_identifier_keys));
    let element = match property {
        Some(prop) if all_struct_like => ctx.element_type(prop),
        _ => None,
    };

    if let Some(element) = element {
        let rendered: Vec<String> = items
            .iter()
            .filter_map(Value::as_map)
            .map(|map| struct_to_go(ctx, &element, map, level + 1))
            .collect();
        return composite(&format!("[]{}", element), &rendered, level);
    }

    let rendered: Vec<String> = items
        .iter()
        .map(|item| value_to_go(ctx, item, level + 1, None))
        .collect();
    composite("[]any", &rendered, level)
}

pub fn map_to_go(
    ctx: &mut GenContext,
    map: &IndexMap<String, Value>,
    level: usize,
    property: Option<&str>,
) -> String {
    if map.is_empty() {
        return "map[string]any{}".to_string();
    }

    let typed = match property {
        Some(prop) if has_identifier_keys(map) => ctx.nested_type(prop),
        _ => None,
    };
    if let Some(type_name) = typed {
        return struct_to_go(ctx, &type_name, map, level);
    }

    let rendered: Vec<String> = sorted_entries(map)
        .into_iter()
        .map(|(key, value)| format!("{}: {}", go_quote(key), value_to_go(ctx, value, level + 1, None)))
        .collect();
    composite("map[string]any", &rendered, level)
}

/// `pkg.Type{Field: value, ...}` with fields sorted by name.
pub fn struct_to_go(
    ctx: &mut GenContext,
    type_name: &QualifiedName,
    map: &IndexMap<String, Value>,
    level: usize,
) -> String {
    let rendered: Vec<String> = sorted_entries(map)
        .into_iter()
        .map(|(key, value)| format!("{}: {}", key, value_to_go(ctx, value, level + 1, Some(key.as_str()))))
        .collect();
    composite(&type_name.to_string(), &rendered, level)
}
