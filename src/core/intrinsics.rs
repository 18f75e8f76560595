//! CP-002: Intrinsic kinds and the shared argument-shape table.
//!
//! Both surface syntaxes reduce an intrinsic to `(kind, normalized argument)`
//! and call [`build`]. The table in [`IntrinsicKind::shape`] is the only place
//! argument shapes are defined; adding a kind means one new row there plus a
//! variant in [`Intrinsic`].

use super::types::{Intrinsic, Number, Value};
use std::fmt;

/// Prefix of long-form intrinsic keys (`Fn::Join`).
pub const FN_PREFIX: &str = "Fn::";

/// Discriminator for [`Intrinsic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IntrinsicKind {
    Ref,
    GetAtt,
    Sub,
    Join,
    Select,
    GetAZs,
    If,
    Equals,
    And,
    Or,
    Not,
    Condition,
    FindInMap,
    Base64,
    Cidr,
    ImportValue,
    Split,
    Transform,
    ValueOf,
}

/// Accepted argument shape of an intrinsic kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgShape {
    /// A logical name: a string, or an integer rendered as text
    Name,
    /// `"Target.Attribute"` or `[Target, Attribute]`
    DottedPair,
    /// `template`, `[template]`, or `[template, {vars}]`
    Template,
    /// A list with at least `min` elements
    Fixed { min: usize },
    /// Any list
    Variadic,
    /// Null, a scalar, a one-element list, or a nested intrinsic
    Optional,
    /// `[x]` unwraps to `x`, anything else is taken as-is
    Unary,
    /// Any value, passed through
    Any,
}

impl IntrinsicKind {
    pub const ALL: [IntrinsicKind; 19] = [
        Self::Ref,
        Self::GetAtt,
        Self::Sub,
        Self::Join,
        Self::Select,
        Self::GetAZs,
        Self::If,
        Self::Equals,
        Self::And,
        Self::Or,
        Self::Not,
        Self::Condition,
        Self::FindInMap,
        Self::Base64,
        Self::Cidr,
        Self::ImportValue,
        Self::Split,
        Self::Transform,
        Self::ValueOf,
    ];

    /// Template-language name (`GetAtt`, `FindInMap`, ...).
    pub fn name(self) -> &'static str {
        match self {
            Self::Ref => "Ref",
            Self::GetAtt => "GetAtt",
            Self::Sub => "Sub",
            Self::Join => "Join",
            Self::Select => "Select",
            Self::GetAZs => "GetAZs",
            Self::If => "If",
            Self::Equals => "Equals",
            Self::And => "And",
            Self::Or => "Or",
            Self::Not => "Not",
            Self::Condition => "Condition",
            Self::FindInMap => "FindInMap",
            Self::Base64 => "Base64",
            Self::Cidr => "Cidr",
            Self::ImportValue => "ImportValue",
            Self::Split => "Split",
            Self::Transform => "Transform",
            Self::ValueOf => "ValueOf",
        }
    }

    /// The argument shape table.
    pub fn shape(self) -> ArgShape {
        match self {
            Self::Ref | Self::Condition => ArgShape::Name,
            Self::GetAtt => ArgShape::DottedPair,
            Self::Sub => ArgShape::Template,
            Self::Join | Self::Select | Self::Equals | Self::Split | Self::ValueOf => {
                ArgShape::Fixed { min: 2 }
            }
            Self::If | Self::FindInMap | Self::Cidr => ArgShape::Fixed { min: 3 },
            Self::And | Self::Or => ArgShape::Variadic,
            Self::GetAZs => ArgShape::Optional,
            Self::Not => ArgShape::Unary,
            Self::Base64 | Self::ImportValue | Self::Transform => ArgShape::Any,
        }
    }

    /// Look up a kind by its bare name (`Join`).
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    /// Resolve a short-form YAML tag (`!GetAtt`, or `GetAtt` once the bang is
    /// stripped).
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::from_name(tag.strip_prefix('!').unwrap_or(tag))
    }

    /// Resolve a long-form map key. `Ref` and `Condition` are bare; every
    /// other kind is written with the `Fn::` prefix.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "Ref" => Some(Self::Ref),
            "Condition" => Some(Self::Condition),
            _ => key
                .strip_prefix(FN_PREFIX)
                .and_then(Self::from_name)
                .filter(|k| !matches!(k, Self::Ref | Self::Condition)),
        }
    }
}

impl fmt::Display for IntrinsicKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Intrinsic {
    pub fn kind(&self) -> IntrinsicKind {
        match self {
            Self::Ref(_) => IntrinsicKind::Ref,
            Self::GetAtt { .. } => IntrinsicKind::GetAtt,
            Self::Sub { .. } => IntrinsicKind::Sub,
            Self::Join { .. } => IntrinsicKind::Join,
            Self::Select { .. } => IntrinsicKind::Select,
            Self::GetAZs(_) => IntrinsicKind::GetAZs,
            Self::If { .. } => IntrinsicKind::If,
            Self::Equals(..) => IntrinsicKind::Equals,
            Self::And(_) => IntrinsicKind::And,
            Self::Or(_) => IntrinsicKind::Or,
            Self::Not(_) => IntrinsicKind::Not,
            Self::Condition(_) => IntrinsicKind::Condition,
            Self::FindInMap { .. } => IntrinsicKind::FindInMap,
            Self::Base64(_) => IntrinsicKind::Base64,
            Self::Cidr { .. } => IntrinsicKind::Cidr,
            Self::ImportValue(_) => IntrinsicKind::ImportValue,
            Self::Split { .. } => IntrinsicKind::Split,
            Self::Transform(_) => IntrinsicKind::Transform,
            Self::ValueOf(_) => IntrinsicKind::ValueOf,
        }
    }

    /// Every argument value of this intrinsic, in declaration order.
    pub fn arguments(&self) -> Vec<&Value> {
        match self {
            Self::Ref(_) | Self::GetAtt { .. } | Self::Condition(_) => Vec::new(),
            Self::Sub { variables, .. } => variables
                .as_ref()
                .map(|vars| vars.values().collect())
                .unwrap_or_default(),
            Self::Join { values, .. } => vec![values],
            Self::Select { index, list } => vec![index, list],
            Self::GetAZs(region) => vec![region],
            Self::If {
                then, otherwise, ..
            } => vec![then, otherwise],
            Self::Equals(a, b) => vec![a, b],
            Self::And(items) | Self::Or(items) | Self::ValueOf(items) => items.iter().collect(),
            Self::Not(v) | Self::Base64(v) | Self::ImportValue(v) | Self::Transform(v) => vec![v],
            Self::FindInMap {
                map_name,
                top_key,
                second_key,
            } => vec![map_name, top_key, second_key],
            Self::Cidr {
                ip_block,
                count,
                cidr_bits,
            } => vec![ip_block, count, cidr_bits],
            Self::Split { source, .. } => vec![source],
        }
    }
}

/// Why an argument did not fit the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeMismatch {
    pub kind: IntrinsicKind,
    pub reason: String,
}

impl fmt::Display for ShapeMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed {} arguments: {}", self.kind, self.reason)
    }
}

fn mismatch(kind: IntrinsicKind, reason: impl Into<String>) -> ShapeMismatch {
    ShapeMismatch {
        kind,
        reason: reason.into(),
    }
}

/// Build an intrinsic from an already-normalized argument.
pub fn build(kind: IntrinsicKind, arg: Value) -> Result<Intrinsic, ShapeMismatch> {
    match kind.shape() {
        ArgShape::Name => {
            let name = logical_name(&arg).ok_or_else(|| mismatch(kind, "expected a name"))?;
            Ok(match kind {
                IntrinsicKind::Ref => Intrinsic::Ref(name),
                _ => Intrinsic::Condition(name),
            })
        }
        ArgShape::DottedPair => build_get_att(arg),
        ArgShape::Template => build_sub(arg),
        ArgShape::Fixed { min } => {
            let items = match arg {
                Value::List(items) if items.len() >= min => items,
                Value::List(items) => {
                    return Err(mismatch(
                        kind,
                        format!("expected at least {} elements, got {}", min, items.len()),
                    ))
                }
                _ => return Err(mismatch(kind, "expected a list")),
            };
            build_fixed(kind, items)
        }
        ArgShape::Variadic => match arg {
            Value::List(items) if kind == IntrinsicKind::And => Ok(Intrinsic::And(items)),
            Value::List(items) => Ok(Intrinsic::Or(items)),
            _ => Err(mismatch(kind, "expected a list")),
        },
        ArgShape::Optional => Ok(Intrinsic::GetAZs(match arg {
            Value::String(s) if s.is_empty() => Value::Null,
            Value::List(mut items) => {
                if items.is_empty() {
                    Value::Null
                } else {
                    match items.swap_remove(0) {
                        Value::String(s) if s.is_empty() => Value::Null,
                        first => first,
                    }
                }
            }
            other => other,
        })),
        ArgShape::Unary => Ok(Intrinsic::Not(match arg {
            Value::List(mut items) if !items.is_empty() => items.swap_remove(0),
            other => other,
        })),
        ArgShape::Any => Ok(match kind {
            IntrinsicKind::Base64 => Intrinsic::Base64(arg),
            IntrinsicKind::ImportValue => Intrinsic::ImportValue(arg),
            _ => Intrinsic::Transform(arg),
        }),
    }
}

/// Argument of a [`ArgShape::Name`] kind, identical for both syntaxes.
pub fn logical_name(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(Number::Int(n)) => Some(n.to_string()),
        _ => None,
    }
}

fn scalar_name(value: &Value) -> Option<String> {
    match value {
        Value::String(_) | Value::Number(_) | Value::Bool(_) => value.scalar_text(),
        _ => None,
    }
}

fn build_get_att(arg: Value) -> Result<Intrinsic, ShapeMismatch> {
    let kind = IntrinsicKind::GetAtt;
    match arg {
        Value::String(s) => match s.split_once('.') {
            Some((target, attribute)) if !target.is_empty() && !attribute.is_empty() => {
                Ok(Intrinsic::GetAtt {
                    target: target.to_string(),
                    attribute: attribute.to_string(),
                })
            }
            _ => Err(mismatch(kind, format!("expected Target.Attribute, got {:?}", s))),
        },
        Value::List(items) if items.len() >= 2 => {
            let target = scalar_name(&items[0]).ok_or_else(|| mismatch(kind, "target must be a name"))?;
            let attribute =
                scalar_name(&items[1]).ok_or_else(|| mismatch(kind, "attribute must be a name"))?;
            Ok(Intrinsic::GetAtt { target, attribute })
        }
        _ => Err(mismatch(kind, "expected a string or a two-element list")),
    }
}

fn build_sub(arg: Value) -> Result<Intrinsic, ShapeMismatch> {
    let kind = IntrinsicKind::Sub;
    match arg {
        Value::String(template) => Ok(Intrinsic::Sub {
            template,
            variables: None,
        }),
        Value::List(items) => {
            let mut items = items.into_iter();
            let template = match items.next() {
                Some(Value::String(s)) => s,
                _ => return Err(mismatch(kind, "template must be a string")),
            };
            let variables = match items.next() {
                None => None,
                Some(Value::Map(vars)) => Some(vars),
                Some(_) => return Err(mismatch(kind, "variables must be a map")),
            };
            Ok(Intrinsic::Sub {
                template,
                variables,
            })
        }
        _ => Err(mismatch(kind, "expected a string or a list")),
    }
}

fn build_fixed(kind: IntrinsicKind, items: Vec<Value>) -> Result<Intrinsic, ShapeMismatch> {
    if kind == IntrinsicKind::ValueOf {
        return Ok(Intrinsic::ValueOf(items));
    }
    let mut it = items.into_iter();
    let mut next = || it.next().unwrap_or(Value::Null);
    let (a, b, c) = (next(), next(), next());
    Ok(match kind {
        IntrinsicKind::Join => Intrinsic::Join {
            delimiter: scalar_name(&a).ok_or_else(|| mismatch(kind, "delimiter must be a string"))?,
            values: b,
        },
        IntrinsicKind::Select => Intrinsic::Select { index: a, list: b },
        IntrinsicKind::Equals => Intrinsic::Equals(a, b),
        IntrinsicKind::Split => Intrinsic::Split {
            delimiter: scalar_name(&a).ok_or_else(|| mismatch(kind, "delimiter must be a string"))?,
            source: b,
        },
        IntrinsicKind::If => Intrinsic::If {
            condition: scalar_name(&a)
                .ok_or_else(|| mismatch(kind, "condition must be a name"))?,
            then: b,
            otherwise: c,
        },
        IntrinsicKind::FindInMap => Intrinsic::FindInMap {
            map_name: a,
            top_key: b,
            second_key: c,
        },
        IntrinsicKind::Cidr => Intrinsic::Cidr {
            ip_block: a,
            count: b,
            cidr_bits: c,
        },
        other => return Err(mismatch(other, "not a fixed-arity intrinsic")),
    })
}
