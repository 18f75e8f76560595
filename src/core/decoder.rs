//! CP-003: Decoding raw bytes into a generic labeled tree.
//!
//! YAML is tried first so short-form tags (`!Ref`, `!Sub`) survive as
//! [`Node::Tagged`]. JSON is the fallback for documents YAML rejects (tab
//! indentation is the usual culprit). Inputs that fingerprint as a foreign
//! format are refused before either parser runs.

use super::error::ImportError;
use indexmap::IndexMap;

/// Generic tree produced by either surface syntax.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Seq(Vec<Node>),
    Map(IndexMap<String, Node>),
    /// A node carrying a local tag; `tag` has its leading `!` removed
    Tagged { tag: String, node: Box<Node> },
}

impl Node {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, Node>> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Scalar text of a key or scalar value.
    pub fn scalar_text(&self) -> Option<String> {
        match self {
            Self::Null => Some(String::new()),
            Self::Bool(b) => Some(b.to_string()),
            Self::Int(n) => Some(n.to_string()),
            Self::Float(x) => Some(x.to_string()),
            Self::String(s) => Some(s.clone()),
            _ => None,
        }
    }
}

/// Decode a template buffer into a [`Node`] tree whose root is a mapping.
pub fn decode(content: &[u8]) -> Result<Node, ImportError> {
    check_fingerprints(&String::from_utf8_lossy(content))?;

    let root = match serde_yaml_ng::from_slice::<serde_yaml_ng::Value>(content) {
        Ok(mut value) => {
            if let Err(e) = value.apply_merge() {
                tracing::debug!("YAML merge keys left unresolved: {}", e);
            }
            tracing::debug!("decoded template as YAML");
            from_yaml(value)
        }
        Err(yaml_err) => match serde_json::from_slice::<serde_json::Value>(content) {
            Ok(value) => {
                tracing::debug!("YAML rejected input ({}), decoded as JSON", yaml_err);
                from_json(value)
            }
            Err(json_err) => {
                return Err(ImportError::Parse(format!(
                    "YAML: {}; JSON: {}",
                    yaml_err, json_err
                )))
            }
        },
    };

    let Some(map) = root.as_map() else {
        return Err(ImportError::RootNotMapping);
    };
    if map.contains_key("apiVersion") && map.contains_key("kind") {
        return Err(ImportError::ForeignFormat(
            "file appears to be a Kubernetes manifest, not a CloudFormation template".to_string(),
        ));
    }
    Ok(root)
}

/// Refuse documents that belong to another tool before parsing them.
pub fn check_fingerprints(text: &str) -> Result<(), ImportError> {
    if text.contains("!Rain::") {
        return Err(ImportError::ForeignFormat(
            "template uses Rain-specific tags (!Rain::S3, etc.) which are not standard CloudFormation"
                .to_string(),
        ));
    }

    let top_level_key = |key: &str| {
        text.lines().any(|line| {
            line.strip_prefix(key)
                .is_some_and(|rest| rest.trim_start().starts_with(':'))
        })
    };
    if top_level_key("apiVersion") && top_level_key("kind") {
        return Err(ImportError::ForeignFormat(
            "file appears to be a Kubernetes manifest, not a CloudFormation template".to_string(),
        ));
    }
    Ok(())
}

fn from_yaml(value: serde_yaml_ng::Value) -> Node {
    use serde_yaml_ng::Value as Y;
    match value {
        Y::Null => Node::Null,
        Y::Bool(b) => Node::Bool(b),
        Y::Number(n) => match n.as_i64() {
            Some(i) => Node::Int(i),
            None => Node::Float(n.as_f64().unwrap_or_default()),
        },
        Y::String(s) => Node::String(s),
        Y::Sequence(items) => Node::Seq(items.into_iter().map(from_yaml).collect()),
        Y::Mapping(mapping) => {
            let mut map = IndexMap::with_capacity(mapping.len());
            for (k, v) in mapping {
                let key = match from_yaml(k).scalar_text() {
                    Some(key) => key,
                    None => {
                        tracing::debug!("skipping mapping entry with non-scalar key");
                        continue;
                    }
                };
                map.insert(key, from_yaml(v));
            }
            Node::Map(map)
        }
        Y::Tagged(tagged) => {
            let raw = tagged.tag.to_string();
            let tag = raw.strip_prefix('!').unwrap_or(&raw).to_string();
            let node = from_yaml(tagged.value);
            // `!!type` tags are core-schema annotations, not intrinsics
            if tag.starts_with('!') {
                node
            } else {
                Node::Tagged {
                    tag,
                    node: Box::new(node),
                }
            }
        }
    }
}

fn from_json(value: serde_json::Value) -> Node {
    use serde_json::Value as J;
    match value {
        J::Null => Node::Null,
        J::Bool(b) => Node::Bool(b),
        J::Number(n) => match n.as_i64() {
            Some(i) => Node::Int(i),
            None => Node::Float(n.as_f64().unwrap_or_default()),
        },
        J::String(s) => Node::String(s),
        J::Array(items) => Node::Seq(items.into_iter().map(from_json).collect()),
        J::Object(obj) => Node::Map(obj.into_iter().map(|(k, v)| (k, from_json(v))).collect()),
    }
}
