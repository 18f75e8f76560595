//! Intrinsic functions as struct literals from the dot-imported intrinsics
//! package. `Ref` and `GetAtt` go through [`GenContext::resolve_ref`] and
//! [`GenContext::resolve_get_att`] so the bare/dotted/generic decision lives
//! in one place.

use super::go_quote;
use super::value::{list_to_go, map_to_go, value_to_go};
use crate::core::codegen::GenContext;
use crate::core::types::{Intrinsic, Value};

pub fn intrinsic_to_go(ctx: &mut GenContext, intrinsic: &Intrinsic, level: usize) -> String {
    let arg = |ctx: &mut GenContext, value: &Value| value_to_go(ctx, value, level, None);

    let text = match intrinsic {
        Intrinsic::Ref(target) => return ctx.resolve_ref(target),
        Intrinsic::GetAtt { target, attribute } => {
            return ctx.resolve_get_att(target, attribute)
        }
        Intrinsic::Sub {
            template,
            variables: None,
        } => format!("Sub{{{}}}", go_quote(template)),
        Intrinsic::Sub {
            template,
            variables: Some(vars),
        } => format!(
            "SubWithMap{{{}, {}}}",
            go_quote(template),
            map_to_go(ctx, vars, level, None)
        ),
        Intrinsic::Join { delimiter, values } => {
            format!("Join{{{}, {}}}", go_quote(delimiter), arg(ctx, values))
        }
        Intrinsic::Select { index, list } => {
            let index = arg(ctx, index);
            format!("Select{{{}, {}}}", index, arg(ctx, list))
        }
        Intrinsic::GetAZs(Value::Null) => "GetAZs{}".to_string(),
        Intrinsic::GetAZs(region) => format!("GetAZs{{{}}}", arg(ctx, region)),
        Intrinsic::If {
            condition,
            then,
            otherwise,
        } => {
            let then = arg(ctx, then);
            format!(
                "If{{{}, {}, {}}}",
                go_quote(condition),
                then,
                arg(ctx, otherwise)
            )
        }
        Intrinsic::Equals(a, b) => {
            let a = arg(ctx, a);
            format!("Equals{{{}, {}}}", a, arg(ctx, b))
        }
        Intrinsic::And(items) => format!("And{{{}}}", list_to_go(ctx, items, level, None)),
        Intrinsic::Or(items) => format!("Or{{{}}}", list_to_go(ctx, items, level, None)),
        Intrinsic::Not(inner) => format!("Not{{{}}}", arg(ctx, inner)),
        Intrinsic::Condition(name) => format!("Condition{{{}}}", go_quote(name)),
        Intrinsic::FindInMap {
            map_name,
            top_key,
            second_key,
        } => {
            let name = match map_name {
                Value::String(s) => go_quote(s),
                other => arg(ctx, other),
            };
            let top = arg(ctx, top_key);
            format!("FindInMap{{{}, {}, {}}}", name, top, arg(ctx, second_key))
        }
        Intrinsic::Base64(inner) => format!("Base64{{{}}}", arg(ctx, inner)),
        Intrinsic::Cidr {
            ip_block,
            count,
            cidr_bits,
        } => {
            let ip_block = arg(ctx, ip_block);
            let count = arg(ctx, count);
            format!("Cidr{{{}, {}, {}}}", ip_block, count, arg(ctx, cidr_bits))
        }
        Intrinsic::ImportValue(inner) => format!("ImportValue{{{}}}", arg(ctx, inner)),
        Intrinsic::Split { delimiter, source } => {
            format!("Split{{{}, {}}}", go_quote(delimiter), arg(ctx, source))
        }
        Intrinsic::Transform(inner) => format!("Transform{{{}}}", arg(ctx, inner)),
        Intrinsic::ValueOf(items) => {
            let rendered: Vec<String> = items.iter().map(|item| arg(ctx, item)).collect();
            format!("ValueOf{{{}}}", rendered.join(", "))
        }
    };
    ctx.use_intrinsics();
    text
}
