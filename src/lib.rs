//! cfnport: import CloudFormation templates as typed Go declarations.
//!
//! Both template syntaxes (YAML short-form tags, `Fn::` long-form maps) parse
//! into one IR. References are inferred from intrinsics and `${}`
//! interpolation, resources are emitted in dependency order, and every value
//! is rendered against a catalog of pre-generated types.

pub mod cli;
pub mod core;
pub mod emit;

pub use crate::core::{import_template, ImportError, ImportOptions, ImportResult};
