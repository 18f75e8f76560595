//! CP-001: Canonical intermediate representation of an imported template.
//!
//! Both surface syntaxes (YAML short-form tags and `Fn::` long-form maps) are
//! normalized into these types. Nothing downstream of the normalizer knows
//! which syntax produced a value.

use indexmap::IndexMap;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Format version assumed when a template does not declare one.
pub const DEFAULT_FORMAT_VERSION: &str = "2010-09-09";

/// Prefix of environment-provided pseudo-parameters (`AWS::Region`, ...).
pub const PSEUDO_PREFIX: &str = "AWS::";

// ============================================================================
// Template
// ============================================================================

/// Root of the IR: one parsed template.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    /// Optional template description
    pub description: Option<String>,

    /// Format version string
    pub format_version: String,

    /// Top-level `Transform` declaration, kept verbatim
    pub transform: Option<Value>,

    /// Input parameters
    pub parameters: IndexMap<String, Parameter>,

    /// Two-level lookup tables
    pub mappings: IndexMap<String, Mapping>,

    /// Named boolean expressions
    pub conditions: IndexMap<String, Condition>,

    /// Resource declarations (source order preserved)
    pub resources: IndexMap<String, Resource>,

    /// Stack outputs
    pub outputs: IndexMap<String, Output>,
}

impl Default for Template {
    fn default() -> Self {
        Self {
            description: None,
            format_version: DEFAULT_FORMAT_VERSION.to_string(),
            transform: None,
            parameters: IndexMap::new(),
            mappings: IndexMap::new(),
            conditions: IndexMap::new(),
            resources: IndexMap::new(),
            outputs: IndexMap::new(),
        }
    }
}

impl Template {
    /// True if `id` names a resource or a parameter, the two entity kinds a
    /// `Ref` can resolve to.
    pub fn is_referenceable(&self, id: &str) -> bool {
        self.resources.contains_key(id) || self.parameters.contains_key(id)
    }
}

// ============================================================================
// Entities
// ============================================================================

/// A template parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub logical_id: String,

    /// Declared parameter type (defaults to `String`)
    pub param_type: String,

    pub description: Option<String>,
    pub default: Option<Value>,
    pub allowed_values: Vec<Value>,
    pub allowed_pattern: Option<String>,
    pub min_length: Option<i64>,
    pub max_length: Option<i64>,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub constraint_description: Option<String>,

    /// Mask the value in console output
    pub no_echo: bool,
}

impl Parameter {
    /// A `String` parameter with no constraints.
    pub fn new(logical_id: impl Into<String>) -> Self {
        Self {
            logical_id: logical_id.into(),
            param_type: "String".to_string(),
            description: None,
            default: None,
            allowed_values: Vec::new(),
            allowed_pattern: None,
            min_length: None,
            max_length: None,
            min_value: None,
            max_value: None,
            constraint_description: None,
            no_echo: false,
        }
    }
}

/// A mapping table: top-level key → second-level key → value.
#[derive(Debug, Clone, PartialEq)]
pub struct Mapping {
    pub logical_id: String,
    pub entries: IndexMap<String, IndexMap<String, Value>>,
}

/// A named condition expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub logical_id: String,
    pub expression: Value,
}

/// A single resource declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub logical_id: String,

    /// Provider type string, e.g. `AWS::S3::Bucket`
    pub resource_type: String,

    /// Properties in source order
    pub properties: IndexMap<String, Value>,

    /// Explicit predecessors
    pub depends_on: Vec<String>,

    /// Guard condition name
    pub condition: Option<String>,

    pub deletion_policy: Option<String>,
    pub update_replace_policy: Option<String>,
    pub metadata: Option<Value>,
}

impl Resource {
    /// A resource of `resource_type` with no properties or attributes.
    pub fn new(logical_id: impl Into<String>, resource_type: impl Into<String>) -> Self {
        Self {
            logical_id: logical_id.into(),
            resource_type: resource_type.into(),
            properties: IndexMap::new(),
            depends_on: Vec::new(),
            condition: None,
            deletion_policy: None,
            update_replace_policy: None,
            metadata: None,
        }
    }

    /// Service segment of the type (`S3` in `AWS::S3::Bucket`).
    pub fn service(&self) -> Option<&str> {
        self.resource_type.split("::").nth(1)
    }

    /// Type-name segment of the type (`Bucket` in `AWS::S3::Bucket`).
    pub fn type_name(&self) -> Option<&str> {
        self.resource_type.split("::").nth(2)
    }
}

/// A stack output.
#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    pub logical_id: String,
    pub value: Value,
    pub description: Option<String>,

    /// Export name, may itself be an intrinsic
    pub export_name: Option<Value>,

    /// Guard condition name
    pub condition: Option<String>,
}

// ============================================================================
// Values
// ============================================================================

/// A numeric literal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{}", n),
            Self::Float(x) if x.fract() == 0.0 && x.abs() < 1e15 => write!(f, "{}", *x as i64),
            Self::Float(x) => write!(f, "{}", x),
        }
    }
}

/// A template value: literal, collection, or intrinsic call.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    List(Vec<Value>),
    Map(IndexMap<String, Value>),
    Intrinsic(Box<Intrinsic>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Render a scalar the way it reads in the source document.
    /// Composite values and intrinsics have no scalar text.
    pub fn scalar_text(&self) -> Option<String> {
        match self {
            Self::String(s) => Some(s.clone()),
            Self::Number(n) => Some(n.to_string()),
            Self::Bool(b) => Some(b.to_string()),
            Self::Null => Some(String::new()),
            _ => None,
        }
    }
}

impl From<Intrinsic> for Value {
    fn from(intrinsic: Intrinsic) -> Self {
        Self::Intrinsic(Box::new(intrinsic))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

/// A built-in template function with its normalized arguments.
///
/// The variant set is closed; argument shapes are enforced by the table in
/// [`crate::core::intrinsics`].
#[derive(Debug, Clone, PartialEq)]
pub enum Intrinsic {
    Ref(String),
    GetAtt {
        target: String,
        attribute: String,
    },
    Sub {
        template: String,
        variables: Option<IndexMap<String, Value>>,
    },
    Join {
        delimiter: String,
        values: Value,
    },
    Select {
        index: Value,
        list: Value,
    },
    /// Region argument; `Null` means the current region
    GetAZs(Value),
    If {
        condition: String,
        then: Value,
        otherwise: Value,
    },
    Equals(Value, Value),
    And(Vec<Value>),
    Or(Vec<Value>),
    Not(Value),
    Condition(String),
    FindInMap {
        map_name: Value,
        top_key: Value,
        second_key: Value,
    },
    Base64(Value),
    Cidr {
        ip_block: Value,
        count: Value,
        cidr_bits: Value,
    },
    ImportValue(Value),
    Split {
        delimiter: String,
        source: Value,
    },
    Transform(Value),
    ValueOf(Vec<Value>),
}

// ============================================================================
// Reference graph
// ============================================================================

/// Entity id → ids it reads. Ordered for deterministic iteration.
/// May contain dangling targets and cycles.
///
/// Outputs live in their own namespace: an output may share a logical id with
/// a resource, and its reads must not become that resource's dependencies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceGraph {
    pub resources: BTreeMap<String, BTreeSet<String>>,
    pub outputs: BTreeMap<String, BTreeSet<String>>,
}

impl ReferenceGraph {
    /// Ids read by resource `id`.
    pub fn dependencies(&self, id: &str) -> impl Iterator<Item = &str> {
        self.resources
            .get(id)
            .into_iter()
            .flat_map(|targets| targets.iter().map(String::as_str))
    }

    /// True if any resource or output reads `id`.
    pub fn is_referenced(&self, id: &str) -> bool {
        self.resources
            .values()
            .chain(self.outputs.values())
            .any(|targets| targets.contains(id))
    }

    /// Every `(source, target)` edge, resources first, then outputs.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str)> {
        self.resources
            .iter()
            .chain(self.outputs.iter())
            .flat_map(|(source, targets)| {
                targets
                    .iter()
                    .map(move |target| (source.as_str(), target.as_str()))
            })
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty() && self.outputs.is_empty()
    }
}

// ============================================================================
// Diagnostics
// ============================================================================

/// Severity of a soft failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// A recorded soft failure. Never aborts a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,

    /// Logical id the diagnostic is about, if any
    pub entity: Option<String>,

    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.entity {
            Some(id) => write!(f, "{}: {}: {}", self.severity, id, self.message),
            None => write!(f, "{}: {}", self.severity, self.message),
        }
    }
}

/// Collector for diagnostics produced during one invocation.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a warning and emit it as a tracing event.
    pub fn warn(&mut self, entity: Option<&str>, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(entity = entity.unwrap_or("-"), "{}", message);
        self.items.push(Diagnostic {
            severity: Severity::Warning,
            entity: entity.map(str::to_string),
            message,
        });
    }

    /// Record an informational note.
    pub fn info(&mut self, entity: Option<&str>, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!(entity = entity.unwrap_or("-"), "{}", message);
        self.items.push(Diagnostic {
            severity: Severity::Info,
            entity: entity.map(str::to_string),
            message,
        });
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.items.extend(other.items);
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items
            .iter()
            .filter(|d| d.severity == Severity::Warning)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cp001_template_defaults() {
        let t = Template::default();
        assert_eq!(t.format_version, "2010-09-09");
        assert!(t.resources.is_empty());
        assert!(t.description.is_none());
    }

    #[test]
    fn test_cp001_resource_type_segments() {
        let r = Resource::new("Bucket", "AWS::S3::Bucket");
        assert_eq!(r.service(), Some("S3"));
        assert_eq!(r.type_name(), Some("Bucket"));

        let custom = Resource::new("Thing", "Custom");
        assert_eq!(custom.service(), None);
    }

    #[test]
    fn test_cp001_number_display() {
        assert_eq!(Number::Int(80).to_string(), "80");
        assert_eq!(Number::Float(3.0).to_string(), "3");
        assert_eq!(Number::Float(0.5).to_string(), "0.5");
    }

    #[test]
    fn test_cp001_map_equality_ignores_order() {
        let mut a = IndexMap::new();
        a.insert("x".to_string(), Value::from("1"));
        a.insert("y".to_string(), Value::from("2"));
        let mut b = IndexMap::new();
        b.insert("y".to_string(), Value::from("2"));
        b.insert("x".to_string(), Value::from("1"));
        assert_eq!(Value::Map(a), Value::Map(b));
    }

    #[test]
    fn test_cp001_scalar_text() {
        assert_eq!(Value::Bool(true).scalar_text().as_deref(), Some("true"));
        assert_eq!(Value::Null.scalar_text().as_deref(), Some(""));
        assert_eq!(Value::List(vec![]).scalar_text(), None);
    }

    #[test]
    fn test_cp001_is_referenceable() {
        let mut t = Template::default();
        t.resources
            .insert("A".to_string(), Resource::new("A", "AWS::SNS::Topic"));
        t.parameters.insert("P".to_string(), Parameter::new("P"));
        assert!(t.is_referenceable("A"));
        assert!(t.is_referenceable("P"));
        assert!(!t.is_referenceable("Missing"));
    }

    #[test]
    fn test_cp001_diagnostics_collect() {
        let mut d = Diagnostics::new();
        d.warn(Some("Res"), "unknown tag !Foo");
        d.info(None, "skipped");
        assert_eq!(d.len(), 2);
        assert_eq!(d.warnings().count(), 1);
        let first = d.iter().next().unwrap();
        assert_eq!(first.to_string(), "warning: Res: unknown tag !Foo");
    }
}
