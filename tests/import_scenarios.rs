//! End-to-end import scenarios through the public library API.

use cfnport::core::catalog::{ConventionCatalog, TypeCatalog};
use cfnport::core::parser::parse_template;
use cfnport::core::resolver::analyze_references;
use cfnport::{import_template, ImportOptions, ImportResult};
use regex::Regex;
use std::collections::BTreeSet;

fn import(doc: &str) -> ImportResult {
    let options = ImportOptions {
        provenance: false,
        ..ImportOptions::with_package("stack")
    };
    import_template(doc.as_bytes(), &ConventionCatalog::default(), &options).unwrap()
}

fn code(result: &ImportResult) -> &str {
    &result.files["stack.go"]
}

fn position(code: &str, needle: &str) -> usize {
    code.find(needle)
        .unwrap_or_else(|| panic!("missing {needle:?} in:\n{code}"))
}

#[test]
fn test_cp013_direct_reference_orders_target_first() {
    let result = import(
        r#"
Resources:
  Alpha:
    Type: AWS::SQS::Queue
    Properties:
      QueueName: !Ref Zebra
  Zebra:
    Type: AWS::SNS::Topic
"#,
    );
    assert_eq!(result.order, vec!["Zebra", "Alpha"]);
    let code = code(&result);
    let zebra = position(code, "var Zebra = sns.Topic{}");
    let alpha = position(code, "var Alpha = sqs.Queue{\n\tQueueName: Zebra,\n}");
    assert!(zebra < alpha);
}

#[test]
fn test_cp013_attribute_reference_is_field_access() {
    let result = import(
        r#"
Resources:
  Target:
    Type: AWS::IAM::Role
  Handler:
    Type: AWS::Lambda::Function
    Properties:
      Role: !GetAtt Target.Arn
"#,
    );
    let code = code(&result);
    assert!(code.contains("\tRole: Target.Arn,\n"));
    assert!(!code.contains("GetAtt{"));
    assert!(position(code, "var Target = ") < position(code, "var Handler = "));
}

#[test]
fn test_cp013_interpolation_pulls_in_parameter() {
    let doc = r#"
Parameters:
  Foo:
    Type: String
  Unused:
    Type: String
Resources:
  Bucket:
    Type: AWS::S3::Bucket
    Properties:
      BucketName: !Sub "${Foo}-suffix"
"#;
    let result = import(doc);
    assert!(result.graph.dependencies("Bucket").any(|d| d == "Foo"));

    let code = code(&result);
    assert!(code.contains("var Foo = Param(\"Foo\")"));
    assert!(code.contains("BucketName: Sub{\"${Foo}-suffix\"},"));
    assert!(!code.contains("Unused"));
}

#[test]
fn test_cp013_block_properties_named_by_port() {
    let result = import(
        r#"
Resources:
  WebSG:
    Type: AWS::EC2::SecurityGroup
    Properties:
      GroupDescription: web
      SecurityGroupIngress:
        - IpProtocol: tcp
          FromPort: 80
          ToPort: 80
          CidrIp: 0.0.0.0/0
        - IpProtocol: tcp
          FromPort: 443
          ToPort: 443
          CidrIp: 0.0.0.0/0
"#,
    );
    let code = code(&result);
    let http = position(code, "var WebSGPort80 = ec2.SecurityGroup_Ingress{\n");
    let https = position(code, "var WebSGPort443 = ec2.SecurityGroup_Ingress{\n");
    let owner = position(code, "var WebSG = ec2.SecurityGroup{\n");
    assert!(http < https && https < owner);
    assert!(code.contains("\tFromPort: 443,\n"));
    assert!(code.contains(
        "\tSecurityGroupIngress: []ec2.SecurityGroup_Ingress{WebSGPort80, WebSGPort443},\n"
    ));
}

#[test]
fn test_cp013_unnamed_blocks_numbered_per_property() {
    let doc = r#"
Resources:
  SG:
    Type: AWS::EC2::SecurityGroup
    Properties:
      GroupDescription: mixed
      SecurityGroupIngress:
        - IpProtocol: "-1"
          CidrIp: 10.0.0.0/8
        - IpProtocol: tcp
          FromPort: 80
          ToPort: 80
          CidrIp: 0.0.0.0/0
        - IpProtocol: "-1"
          CidrIp: 192.168.0.0/16
        - IpProtocol: tcp
          FromPort: 80
          ToPort: 80
          SourceSecurityGroupId: sg-123
      SecurityGroupEgress:
        - IpProtocol: "-1"
          CidrIp: 0.0.0.0/0
"#;
    let result = import(doc);
    let code = code(&result);
    assert!(code.contains(
        "\tSecurityGroupEgress: []ec2.SecurityGroup_Egress{SGEgress1},\n"
    ));
    assert!(code.contains(
        "\tSecurityGroupIngress: []ec2.SecurityGroup_Ingress{SGIngress1, SGPort80, SGIngress2, SGPort80_2},\n"
    ));
    for name in ["SGEgress1", "SGIngress1", "SGIngress2", "SGPort80", "SGPort80_2"] {
        assert_eq!(code.matches(&format!("var {name} = ")).count(), 1, "{name}");
    }
    let egress = position(code, "var SGEgress1 = ec2.SecurityGroup_Egress{\n");
    let owner = position(code, "var SG = ec2.SecurityGroup{\n");
    assert!(egress < owner);
    assert!(code.contains("\tSourceSecurityGroupId: \"sg-123\",\n"));

    assert_eq!(import(doc).files, result.files);
}

#[test]
fn test_cp013_blocks_never_shadow_declarations() {
    let result = import(
        r#"
Resources:
  SGIngress1:
    Type: AWS::SNS::Topic
  SG:
    Type: AWS::EC2::SecurityGroup
    Properties:
      GroupDescription: all
      SecurityGroupIngress:
        - IpProtocol: "-1"
          CidrIp: 10.0.0.0/8
"#,
    );
    let code = code(&result);
    assert!(code.contains("var SGIngress1 = sns.Topic{}"));
    assert!(code.contains("var SGIngress1_2 = ec2.SecurityGroup_Ingress{\n"));
    assert!(code.contains("\tSecurityGroupIngress: []ec2.SecurityGroup_Ingress{SGIngress1_2},\n"));
}

#[test]
fn test_cp013_colliding_ids_declared_once() {
    let result = import(
        r#"
Resources:
  my-queue:
    Type: AWS::SQS::Queue
  myqueue:
    Type: AWS::SQS::Queue
  BucketOutput:
    Type: AWS::S3::Bucket
    Properties:
      BucketName: !GetAtt my-queue.QueueName
Outputs:
  Bucket:
    Value: !Ref myqueue
"#,
    );
    let code = code(&result);
    let declared: Vec<&str> = Regex::new(r"(?m)^var (\w+) =")
        .unwrap()
        .captures_iter(code)
        .map(|c| c.get(1).unwrap().as_str())
        .collect();
    let unique: BTreeSet<&str> = declared.iter().copied().collect();
    assert_eq!(declared.len(), unique.len(), "duplicate declaration in:\n{code}");
    assert_eq!(
        unique,
        ["BucketOutput", "BucketOutput2", "myqueue", "myqueue2"].into_iter().collect()
    );
    assert!(code.contains("\tBucketName: myqueue2.QueueName,\n"));
    assert!(code.contains("\tValue:       myqueue,\n"));
}

#[test]
fn test_cp013_cycle_still_emitted() {
    let result = import(
        r#"
Resources:
  Beta:
    Type: AWS::SNS::Topic
    Properties:
      DisplayName: !GetAtt Alpha.TopicName
  Alpha:
    Type: AWS::SNS::Topic
    Properties:
      DisplayName: !GetAtt Beta.TopicName
"#,
    );
    assert_eq!(result.order, vec!["Alpha", "Beta"]);
    let code = code(&result);
    assert!(position(code, "var Alpha = sns.Topic{") < position(code, "var Beta = sns.Topic{"));
}

#[test]
fn test_cp013_short_and_long_form_equivalent() {
    let yaml = r#"
Parameters:
  Env:
    Type: String
Conditions:
  IsProd: !Equals [!Ref Env, prod]
Resources:
  Queue:
    Type: AWS::SQS::Queue
    Properties:
      QueueName: !Join ["-", [!Ref Env, jobs]]
  Topic:
    Type: AWS::SNS::Topic
    Properties:
      TopicName: !Sub "${Env}-events"
      DisplayName: !If [IsProd, !GetAtt Queue.Arn, !Ref AWS::NoValue]
"#;
    let json = r#"{
  "Parameters": {"Env": {"Type": "String"}},
  "Conditions": {"IsProd": {"Fn::Equals": [{"Ref": "Env"}, "prod"]}},
  "Resources": {
    "Queue": {
      "Type": "AWS::SQS::Queue",
      "Properties": {"QueueName": {"Fn::Join": ["-", [{"Ref": "Env"}, "jobs"]]}}
    },
    "Topic": {
      "Type": "AWS::SNS::Topic",
      "Properties": {
        "TopicName": {"Fn::Sub": "${Env}-events"},
        "DisplayName": {"Fn::If": ["IsProd", {"Fn::GetAtt": ["Queue", "Arn"]}, {"Ref": "AWS::NoValue"}]}
      }
    }
  }
}"#;
    let (from_yaml, _) = parse_template(yaml.as_bytes()).unwrap();
    let (from_json, _) = parse_template(json.as_bytes()).unwrap();
    assert_eq!(from_yaml, from_json);
    assert_eq!(analyze_references(&from_yaml), analyze_references(&from_json));
    assert_eq!(import(yaml).files, import(json).files);
}

#[test]
fn test_cp013_output_is_deterministic() {
    let doc = r#"
Parameters:
  B:
    Type: String
  A:
    Type: String
Resources:
  Z:
    Type: AWS::SNS::Topic
    Properties:
      TopicName: !Sub "${A}-${B}"
      Tags:
        - Key: team
          Value: core
  Y:
    Type: AWS::SQS::Queue
  X:
    Type: AWS::S3::Bucket
    Properties:
      BucketName: !Ref Y
Outputs:
  TopicArn:
    Value: !Ref Z
"#;
    let first = import(doc);
    for _ in 0..5 {
        assert_eq!(import(doc).files, first.files);
    }
}

#[test]
fn test_cp013_no_dangling_bare_identifiers() {
    let result = import(
        r#"
Parameters:
  Env:
    Type: String
Resources:
  Queue:
    Type: AWS::SQS::Queue
    Properties:
      QueueName: !Ref Env
      RedrivePolicy:
        deadLetterTargetArn: !GetAtt Dlq.Arn
  Dlq:
    Type: AWS::SQS::Queue
  Topic:
    Type: AWS::SNS::Topic
    Properties:
      TopicName: !Ref Ghost
      DisplayName: !GetAtt Phantom.Name
      KmsMasterKeyId: !Ref AWS::Region
Outputs:
  QueueUrl:
    Value: !Ref Queue
"#,
    );
    let code = code(&result);

    let declared: BTreeSet<&str> = Regex::new(r"(?m)^var (\w+) =")
        .unwrap()
        .captures_iter(code)
        .map(|c| c.get(1).unwrap().as_str())
        .collect();
    let field = Regex::new(r"^\w+:\s+([A-Za-z_]\w*)(\.[\w.]+)?,$").unwrap();
    for line in code.lines() {
        if let Some(caps) = field.captures(line.trim()) {
            let ident = &caps[1];
            assert!(
                declared.contains(ident) || ident.starts_with("AWS_") || ident == "nil",
                "undeclared identifier {ident} in line {line:?}"
            );
        }
    }
    assert!(code.contains("Ref{\"Ghost\"}"));
    assert!(code.contains("GetAtt{\"Phantom\", \"Name\"}"));
}

#[test]
fn test_cp013_imports_follow_catalog() {
    let catalog = ConventionCatalog::new("example.com/aws");
    let result = import_template(
        b"Resources:\n  T:\n    Type: AWS::SNS::Topic\n    Properties:\n      TopicName: !Sub x\n",
        &catalog,
        &ImportOptions::with_package("x"),
    )
    .unwrap();
    let code = &result.files["x.go"];
    assert!(code.contains(&format!("\t. \"{}\"\n", catalog.intrinsics_import())));
    assert!(code.contains("\t\"example.com/aws/resources/sns\"\n"));
}
