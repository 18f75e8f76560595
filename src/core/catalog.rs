//! CP-006: Type catalog: where generated code finds its typed declarations.
//!
//! The catalog answers three questions for the generator: which package and
//! type a provider resource type maps to, which nested property types exist,
//! and which import path each package lives at. [`ConventionCatalog`] derives
//! every answer from naming conventions; [`StaticCatalog`] is loaded from a
//! YAML or JSON description of a pre-built type library.

use super::error::ImportError;
use super::naming::is_valid_identifier;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

/// Module path the generated code imports from when none is configured.
pub const DEFAULT_IMPORT_ROOT: &str = "github.com/lex00/wetwire-aws";

/// Package-qualified type name, rendered as `package.Name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QualifiedName {
    pub package: String,
    pub name: String,
}

impl QualifiedName {
    pub fn new(package: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.package, self.name)
    }
}

/// Result of a successful resource type lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub type_name: QualifiedName,

    /// Declared property names; empty means "not known", not "none allowed"
    pub properties: Vec<String>,
}

/// Read-only view of a pre-built type library.
pub trait TypeCatalog {
    /// Map a provider resource type (`AWS::S3::Bucket`) to its declaration.
    fn lookup(&self, resource_type: &str) -> Option<CatalogEntry>;

    /// Nested property type `property` of `owner`, if the library has one.
    fn lookup_nested(&self, owner: &QualifiedName, property: &str) -> Option<QualifiedName>;

    /// Import path of a resource package.
    fn package_import(&self, package: &str) -> String;

    /// Import path of the intrinsic helpers (dot-imported by generated code).
    fn intrinsics_import(&self) -> String;
}

/// Split `AWS::Service::Type` into `(service, type)`.
fn split_resource_type(resource_type: &str) -> Option<(&str, &str)> {
    let mut parts = resource_type.split("::");
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some("AWS"), Some(service), Some(name), None)
            if !service.is_empty() && is_valid_identifier(name) =>
        {
            Some((service, name))
        }
        _ => None,
    }
}

// ============================================================================
// Convention catalog
// ============================================================================

/// Catalog that assumes the library mirrors the provider's naming:
/// `AWS::S3::Bucket` → `s3.Bucket`, nested types `Bucket_Prop`.
#[derive(Debug, Clone)]
pub struct ConventionCatalog {
    import_root: String,
}

impl ConventionCatalog {
    pub fn new(import_root: impl Into<String>) -> Self {
        Self {
            import_root: import_root.into(),
        }
    }
}

impl Default for ConventionCatalog {
    fn default() -> Self {
        Self::new(DEFAULT_IMPORT_ROOT)
    }
}

impl TypeCatalog for ConventionCatalog {
    fn lookup(&self, resource_type: &str) -> Option<CatalogEntry> {
        let (service, name) = split_resource_type(resource_type)?;
        let package = service.to_lowercase();
        if !is_valid_identifier(&package) {
            return None;
        }
        Some(CatalogEntry {
            type_name: QualifiedName::new(package, name),
            properties: Vec::new(),
        })
    }

    fn lookup_nested(&self, owner: &QualifiedName, property: &str) -> Option<QualifiedName> {
        Some(QualifiedName::new(
            owner.package.clone(),
            format!("{}_{}", owner.name, property),
        ))
    }

    fn package_import(&self, package: &str) -> String {
        format!("{}/resources/{}", self.import_root, package)
    }

    fn intrinsics_import(&self) -> String {
        format!("{}/intrinsics", self.import_root)
    }
}

// ============================================================================
// Static catalog
// ============================================================================

/// One resource type in a catalog file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogResource {
    pub package: String,

    #[serde(rename = "type")]
    pub type_name: String,

    #[serde(default)]
    pub properties: Vec<String>,
}

fn default_import_root() -> String {
    DEFAULT_IMPORT_ROOT.to_string()
}

/// Catalog backed by an explicit description of the type library.
///
/// ```yaml
/// import_root: github.com/lex00/wetwire-aws
/// resources:
///   AWS::S3::Bucket:
///     package: s3
///     type: Bucket
///     properties: [BucketName, Tags]
/// property_types:
///   s3: [Bucket_VersioningConfiguration]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticCatalog {
    #[serde(default = "default_import_root")]
    pub import_root: String,

    /// Provider type → declaration
    #[serde(default)]
    pub resources: IndexMap<String, CatalogResource>,

    /// Package → nested property type names in that package
    #[serde(default)]
    pub property_types: IndexMap<String, BTreeSet<String>>,
}

impl Default for StaticCatalog {
    fn default() -> Self {
        Self {
            import_root: default_import_root(),
            resources: IndexMap::new(),
            property_types: IndexMap::new(),
        }
    }
}

impl StaticCatalog {
    /// Parse a catalog from YAML text (JSON is accepted too).
    pub fn from_yaml(text: &str) -> Result<Self, ImportError> {
        serde_yaml_ng::from_str(text)
            .map_err(|e| ImportError::Catalog(format!("YAML parse error: {}", e)))
    }

    pub fn from_json(text: &str) -> Result<Self, ImportError> {
        serde_json::from_str(text)
            .map_err(|e| ImportError::Catalog(format!("JSON parse error: {}", e)))
    }

    /// Load a catalog file; `.json` files are parsed as JSON, anything else
    /// as YAML.
    pub fn load(path: &Path) -> Result<Self, ImportError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ImportError::Catalog(format!("failed to read {}: {}", path.display(), e))
        })?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let catalog = if is_json {
            Self::from_json(&content)?
        } else {
            Self::from_yaml(&content)?
        };
        tracing::debug!(
            path = %path.display(),
            resources = catalog.resources.len(),
            "loaded type catalog"
        );
        Ok(catalog)
    }

    /// Register a resource type.
    pub fn with_resource(
        mut self,
        resource_type: &str,
        package: &str,
        type_name: &str,
        properties: &[&str],
    ) -> Self {
        self.resources.insert(
            resource_type.to_string(),
            CatalogResource {
                package: package.to_string(),
                type_name: type_name.to_string(),
                properties: properties.iter().map(|p| p.to_string()).collect(),
            },
        );
        self
    }

    /// Register a nested property type.
    pub fn with_property_type(mut self, package: &str, type_name: &str) -> Self {
        self.property_types
            .entry(package.to_string())
            .or_default()
            .insert(type_name.to_string());
        self
    }
}

impl TypeCatalog for StaticCatalog {
    fn lookup(&self, resource_type: &str) -> Option<CatalogEntry> {
        self.resources.get(resource_type).map(|r| CatalogEntry {
            type_name: QualifiedName::new(r.package.clone(), r.type_name.clone()),
            properties: r.properties.clone(),
        })
    }

    fn lookup_nested(&self, owner: &QualifiedName, property: &str) -> Option<QualifiedName> {
        let candidate = format!("{}_{}", owner.name, property);
        self.property_types
            .get(&owner.package)
            .filter(|names| names.contains(&candidate))
            .map(|_| QualifiedName::new(owner.package.clone(), candidate))
    }

    fn package_import(&self, package: &str) -> String {
        format!("{}/resources/{}", self.import_root, package)
    }

    fn intrinsics_import(&self) -> String {
        format!("{}/intrinsics", self.import_root)
    }
}
