//! Core import logic: decoding, normalization, reference analysis, ordering,
//! and code generation.

pub mod catalog;
pub mod codegen;
pub mod decoder;
pub mod error;
pub mod importer;
pub mod intrinsics;
pub mod naming;
pub mod normalizer;
pub mod parser;
pub mod provenance;
pub mod resolver;
pub mod types;

pub use catalog::{ConventionCatalog, StaticCatalog, TypeCatalog};
pub use codegen::{generate_code, ImportOptions};
pub use error::ImportError;
pub use importer::{import_template, ImportResult};
