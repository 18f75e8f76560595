//! CP-014: Template parsing and validation.
//!
//! Parses a template into the IR and validates structural constraints:
//! - Format version must be "2010-09-09"
//! - At least one resource must be declared
//! - `Ref`/`${}` targets must exist; `GetAtt` targets must be resources.
//!   Names bound by a `Fn::Sub` variable map are local to that `Sub`.
//! - depends_on references must exist
//! - Guard conditions and `Fn::If` conditions must exist
//! - No reference cycles between resources

use super::decoder::decode;
use super::error::ImportError;
use super::normalizer::normalize_template;
use super::resolver::{find_cycles, is_pseudo_parameter, sub_references};
use super::types::*;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Parse a template file from disk.
pub fn parse_template_file(path: &Path) -> Result<(Template, Diagnostics), ImportError> {
    let content = std::fs::read(path)
        .map_err(|e| ImportError::Io(format!("failed to read {}: {}", path.display(), e)))?;
    parse_template(&content)
}

/// Parse a template from raw bytes (YAML or JSON).
pub fn parse_template(content: &[u8]) -> Result<(Template, Diagnostics), ImportError> {
    let root = decode(content)?;
    let mut diags = Diagnostics::new();
    let template = normalize_template(&root, &mut diags);
    tracing::debug!(
        parameters = template.parameters.len(),
        resources = template.resources.len(),
        outputs = template.outputs.len(),
        "parsed template"
    );
    Ok((template, diags))
}

/// Condition names read by `Fn::If` and `Condition` intrinsics in `value`.
fn collect_condition_names(value: &Value, out: &mut BTreeSet<String>) {
    match value {
        Value::List(items) => {
            for item in items {
                collect_condition_names(item, out);
            }
        }
        Value::Map(map) => {
            for item in map.values() {
                collect_condition_names(item, out);
            }
        }
        Value::Intrinsic(intrinsic) => {
            match intrinsic.as_ref() {
                Intrinsic::If { condition, .. } | Intrinsic::Condition(condition) => {
                    out.insert(condition.clone());
                }
                _ => {}
            }
            for arg in intrinsic.arguments() {
                collect_condition_names(arg, out);
            }
        }
        _ => {}
    }
}

/// What a referenced name has to resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Target {
    /// A parameter or resource (`Ref`, `${Name}`)
    Entity,
    /// A resource (`GetAtt`)
    Resource,
}

fn add_target(out: &mut BTreeMap<String, Target>, name: &str, target: Target) {
    let entry = out.entry(name.to_string()).or_insert(target);
    *entry = (*entry).max(target);
}

/// Names read by `value`. A name read both ways must be a resource.
fn collect_targets(value: &Value, out: &mut BTreeMap<String, Target>) {
    match value {
        Value::List(items) => {
            for item in items {
                collect_targets(item, out);
            }
        }
        Value::Map(map) => {
            for item in map.values() {
                collect_targets(item, out);
            }
        }
        Value::Intrinsic(intrinsic) => {
            match intrinsic.as_ref() {
                Intrinsic::Ref(name) if !is_pseudo_parameter(name) => {
                    add_target(out, name, Target::Entity)
                }
                Intrinsic::GetAtt { target, .. } => add_target(out, target, Target::Resource),
                Intrinsic::Sub {
                    template,
                    variables,
                } => {
                    let local = |name: &str| variables.as_ref().is_some_and(|v| v.contains_key(name));
                    for name in sub_references(template) {
                        if !local(name) {
                            add_target(out, name, Target::Entity);
                        }
                    }
                }
                _ => {}
            }
            for arg in intrinsic.arguments() {
                collect_targets(arg, out);
            }
        }
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {}
    }
}

fn check_targets<'v>(
    template: &Template,
    kind: &str,
    id: &str,
    values: impl IntoIterator<Item = &'v Value>,
    errors: &mut Vec<ValidationError>,
) {
    let mut targets = BTreeMap::new();
    for value in values {
        collect_targets(value, &mut targets);
    }
    for (name, target) in targets {
        let message = if !template.is_referenceable(&name) {
            format!("{} '{}' references unknown entity '{}'", kind, id, name)
        } else if target == Target::Resource && !template.resources.contains_key(&name) {
            format!(
                "{} '{}' reads an attribute of '{}', which is not a resource",
                kind, id, name
            )
        } else {
            continue;
        };
        errors.push(ValidationError { message });
    }
}

fn check_conditions(
    template: &Template,
    kind: &str,
    id: &str,
    names: &BTreeSet<String>,
    errors: &mut Vec<ValidationError>,
) {
    for name in names {
        if !template.conditions.contains_key(name) {
            errors.push(ValidationError {
                message: format!("{} '{}' uses unknown condition '{}'", kind, id, name),
            });
        }
    }
}

/// Validate a parsed template. Returns a list of errors (empty = valid).
pub fn validate_template(template: &Template, graph: &ReferenceGraph) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    // Version check
    if template.format_version != DEFAULT_FORMAT_VERSION {
        errors.push(ValidationError {
            message: format!(
                "AWSTemplateFormatVersion must be \"{}\", got \"{}\"",
                DEFAULT_FORMAT_VERSION, template.format_version
            ),
        });
    }

    if template.resources.is_empty() {
        errors.push(ValidationError {
            message: "template declares no resources".to_string(),
        });
    }

    // Dangling references
    let mut resource_ids: Vec<&String> = template.resources.keys().collect();
    resource_ids.sort();
    for id in resource_ids {
        let properties = template.resources[id].properties.values();
        check_targets(template, "resource", id, properties, &mut errors);
    }
    let mut output_ids: Vec<&String> = template.outputs.keys().collect();
    output_ids.sort();
    for id in output_ids {
        let value = std::iter::once(&template.outputs[id].value);
        check_targets(template, "output", id, value, &mut errors);
    }

    for (id, resource) in &template.resources {
        // depends_on references
        for dep in &resource.depends_on {
            if dep == id {
                errors.push(ValidationError {
                    message: format!("resource '{}' depends on itself", id),
                });
            } else if !template.resources.contains_key(dep) {
                errors.push(ValidationError {
                    message: format!("resource '{}' depends on unknown resource '{}'", id, dep),
                });
            }
        }

        let mut names: BTreeSet<String> = resource.condition.iter().cloned().collect();
        for value in resource.properties.values() {
            collect_condition_names(value, &mut names);
        }
        check_conditions(template, "resource", id, &names, &mut errors);
    }

    for (id, output) in &template.outputs {
        let mut names: BTreeSet<String> = output.condition.iter().cloned().collect();
        collect_condition_names(&output.value, &mut names);
        if let Some(export) = &output.export_name {
            collect_condition_names(export, &mut names);
        }
        check_conditions(template, "output", id, &names, &mut errors);
    }

    for (id, condition) in &template.conditions {
        let mut names = BTreeSet::new();
        collect_condition_names(&condition.expression, &mut names);
        check_conditions(template, "condition", id, &names, &mut errors);
    }

    // Reference cycles
    let ids: Vec<String> = template.resources.keys().cloned().collect();
    for cycle in find_cycles(&ids, graph) {
        errors.push(ValidationError {
            message: format!("dependency cycle: {}", cycle.join(" -> ")),
        });
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::resolver::analyze_references;

    fn validate(yaml: &str) -> Vec<String> {
        let (template, _) = parse_template(yaml.as_bytes()).unwrap();
        let graph = analyze_references(&template);
        validate_template(&template, &graph)
            .into_iter()
            .map(|e| e.to_string())
            .collect()
    }

    #[test]
    fn test_cp014_parse_valid() {
        let yaml = r#"
AWSTemplateFormatVersion: "2010-09-09"
Description: test
Parameters:
  Env:
    Type: String
Resources:
  Bucket:
    Type: AWS::S3::Bucket
    Properties:
      BucketName: !Sub "${Env}-data"
"#;
        let (template, diags) = parse_template(yaml.as_bytes()).unwrap();
        assert_eq!(template.description.as_deref(), Some("test"));
        assert_eq!(template.resources.len(), 1);
        assert!(diags.is_empty());
        assert!(validate(yaml).is_empty());
    }

    #[test]
    fn test_cp014_bad_version() {
        let errors = validate(
            "AWSTemplateFormatVersion: \"2099-01-01\"\nResources:\n  A:\n    Type: AWS::SNS::Topic\n",
        );
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("2099-01-01"));
    }

    #[test]
    fn test_cp014_no_resources() {
        let errors = validate("Description: empty\n");
        assert_eq!(errors, vec!["template declares no resources"]);
    }

    #[test]
    fn test_cp014_dangling_reference() {
        let errors = validate(
            r#"
Resources:
  A:
    Type: AWS::SNS::Topic
    Properties:
      TopicName: !Ref Ghost
      DisplayName: !Sub "${AWS::Region}-${Phantom.Name}"
Outputs:
  Out:
    Value: !GetAtt Missing.Arn
"#,
        );
        assert_eq!(
            errors,
            vec![
                "resource 'A' references unknown entity 'Ghost'",
                "resource 'A' references unknown entity 'Phantom'",
                "output 'Out' references unknown entity 'Missing'",
            ]
        );
    }

    #[test]
    fn test_cp014_sub_variables_are_local() {
        let errors = validate(
            r#"
Parameters:
  Env:
    Type: String
Resources:
  Topic:
    Type: AWS::SNS::Topic
    Properties:
      TopicName: !Sub ["${Prefix}-${Env}-events", {Prefix: app}]
      DisplayName: !Sub
        - "${Label}"
        - Label: !Ref Ghost
      KmsMasterKeyId: !Sub "${Prefix}-key"
"#,
        );
        assert_eq!(
            errors,
            vec![
                "resource 'Topic' references unknown entity 'Ghost'",
                "resource 'Topic' references unknown entity 'Prefix'",
            ]
        );
    }

    #[test]
    fn test_cp014_sub_variables_validate_cleanly() {
        let errors = validate(
            "Resources:\n  Topic:\n    Type: AWS::SNS::Topic\n    Properties:\n      TopicName: !Sub [\"${Prefix}-events\", {Prefix: app}]\n",
        );
        assert!(errors.is_empty(), "{:?}", errors);
    }

    #[test]
    fn test_cp014_get_att_needs_a_resource() {
        let errors = validate(
            r#"
Parameters:
  Env:
    Type: String
Resources:
  A:
    Type: AWS::SNS::Topic
    Properties:
      TopicName: !GetAtt Env.Value
      DisplayName: !Ref Env
Outputs:
  Out:
    Value: !GetAtt A.TopicName
"#,
        );
        assert_eq!(
            errors,
            vec!["resource 'A' reads an attribute of 'Env', which is not a resource"]
        );
    }

    #[test]
    fn test_cp014_unknown_dependency() {
        let errors = validate(
            "Resources:\n  A:\n    Type: AWS::SNS::Topic\n    DependsOn: [B, A]\n",
        );
        assert_eq!(
            errors,
            vec![
                "resource 'A' depends on unknown resource 'B'",
                "resource 'A' depends on itself",
            ]
        );
    }

    #[test]
    fn test_cp014_unknown_conditions() {
        let errors = validate(
            r#"
Conditions:
  IsProd: !Equals [a, b]
  Combined: !And [!Condition IsProd, !Condition IsBeta]
Resources:
  A:
    Type: AWS::SNS::Topic
    Condition: IsStaging
    Properties:
      TopicName: !If [IsProd, p, !If [IsDev, d, x]]
Outputs:
  Out:
    Value: x
    Condition: IsProd
"#,
        );
        assert_eq!(
            errors,
            vec![
                "resource 'A' uses unknown condition 'IsDev'",
                "resource 'A' uses unknown condition 'IsStaging'",
                "condition 'Combined' uses unknown condition 'IsBeta'",
            ]
        );
    }

    #[test]
    fn test_cp014_cycle() {
        let errors = validate(
            r#"
Resources:
  A:
    Type: AWS::SNS::Topic
    Properties:
      TopicName: !GetAtt B.TopicName
  B:
    Type: AWS::SNS::Topic
    Properties:
      TopicName: !GetAtt A.TopicName
"#,
        );
        assert_eq!(errors, vec!["dependency cycle: A -> B"]);
    }

    #[test]
    fn test_cp014_parse_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("stack.yaml");
        std::fs::write(&file, "Resources:\n  A:\n    Type: AWS::SNS::Topic\n").unwrap();
        let (template, _) = parse_template_file(&file).unwrap();
        assert!(template.resources.contains_key("A"));
    }

    #[test]
    fn test_cp014_parse_missing_file() {
        let err = parse_template_file(Path::new("/nonexistent/stack.yaml")).unwrap_err();
        assert!(matches!(err, ImportError::Io(_)));
        assert!(err.to_string().contains("failed to read"));
    }

    #[test]
    fn test_cp014_parse_invalid_yaml() {
        assert!(parse_template(b"{{{{").is_err());
    }
}
