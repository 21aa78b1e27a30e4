#![cfg(test)]

use pe2pkcs7_compiler::{
    compile_modules, compile_schema,
    parser::parse_schema,
    schema_from_json, schema_to_json,
    tokenizer::tokenize_schema,
    types::{AstType, TagDefault},
    Pe2Pkcs7Error,
};
use pe2pkcs7_schema::{TypeDef, TypeKind};

const SPC: &str = r#"
    SpcModule { 1 3 6 1 4 1 311 } DEFINITIONS IMPLICIT TAGS ::= BEGIN

    EXPORTS ALL;
    IMPORTS AlgorithmIdentifier FROM PKIX1Explicit88 { iso(1) 5 };

    spc-indirect-data OBJECT IDENTIFIER ::= { 1 3 6 1 4 1 311 2 1 4 }

    SpcIndirectDataContent ::= SEQUENCE {
        data            SpcAttributeTypeAndOptionalValue,
        messageDigest   DigestInfo
    }

    SpcAttributeTypeAndOptionalValue ::= SEQUENCE {
        type            OBJECT IDENTIFIER,
        value           [0] EXPLICIT ANY DEFINED BY type OPTIONAL
    }

    DigestInfo ::= SEQUENCE {
        digestAlgorithm AlgorithmIdentifier,
        digest          OCTET STRING (SIZE (1..64))
    }

    SpcString ::= CHOICE {
        unicode         [0] BMPString,
        ascii           [1] IA5String
    }

    END
"#;

#[test]
fn test_parse_schema() {
    let tokens = tokenize_schema(SPC).expect("tokenize_schema failed");
    let module = parse_schema(&tokens).expect("parse_schema failed");

    assert_eq!(module.name.as_deref(), Some("SpcModule"));
    assert_eq!(module.tag_default, TagDefault::Implicit);
    assert_eq!(module.imports, vec!["AlgorithmIdentifier"]);

    // the value assignment is skipped
    let names: Vec<&str> = module.assignments.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["SpcIndirectDataContent", "SpcAttributeTypeAndOptionalValue", "DigestInfo", "SpcString"]
    );

    match &module.assignments[2].ty {
        AstType::Sequence(components) => {
            assert_eq!(components.len(), 2);
            assert_eq!(components[0].name, "digestAlgorithm");
            assert_eq!(components[0].ty, AstType::Reference("AlgorithmIdentifier".into()));
            assert_eq!(components[1].ty, AstType::Builtin("OCTET STRING".into()));
        }
        other => panic!("expected a SEQUENCE, got {:?}", other),
    }
}

#[test]
fn test_compile_schema() {
    let schema = compile_schema(SPC).expect("compile_schema failed");
    assert_eq!(schema.len(), 4);

    let value = &schema.get("SpcAttributeTypeAndOptionalValue").unwrap().content[1];
    assert_eq!(value.name, "[0]");
    assert_eq!(value.kind, TypeKind::Sequence);
    assert!(value.optional);
    assert_eq!(value.content, vec![TypeDef::primitive("ANY")]);

    let string = schema.get("SpcString").unwrap();
    assert_eq!(string.kind, TypeKind::Choice);
    assert_eq!(string.content[0].name, "[0]");
    assert_eq!(string.content[0].underlying.as_deref(), Some("BMPString"));
    assert_eq!(string.content[1].underlying.as_deref(), Some("IA5String"));

    // imported but undefined: left as a reference that resolves to nothing
    let digest_info = schema.get("DigestInfo").unwrap();
    assert_eq!(schema.resolve(Some(&digest_info.content[0])), None);
}

#[test]
fn test_compile_against_imported_module() {
    let pkix = "PKIX1Explicit88 DEFINITIONS EXPLICIT TAGS ::= BEGIN
        AlgorithmIdentifier ::= SEQUENCE { algorithm OBJECT IDENTIFIER, parameters ANY OPTIONAL }
    END";
    let schema = compile_modules(&[SPC, pkix]).expect("compile_modules failed");
    let digest_info = schema.get("DigestInfo").unwrap();
    let algorithm = schema.resolve(Some(&digest_info.content[0])).unwrap();
    assert_eq!(algorithm.name, "SEQUENCE");
    assert_eq!(algorithm.content.len(), 2);
}

#[test]
fn test_json_round_trip() {
    let schema = compile_schema(SPC).expect("compile_schema failed");
    let json = schema_to_json(&schema).expect("schema_to_json failed");
    let back = schema_from_json(&json).expect("schema_from_json failed");
    assert_eq!(back, schema);
}

#[test]
fn test_errors_carry_positions() {
    let err = compile_schema("A ::= SEQUENCE {\n  x INTEGER\n  y NULL\n}").unwrap_err();
    match err {
        Pe2Pkcs7Error::ParseError { line, column, .. } => assert_eq!((line, column), (3, 3)),
        other => panic!("expected a ParseError, got {:?}", other),
    }

    let err = compile_schema("A ::= SEQUENCE { x Missing }").unwrap_err();
    assert!(matches!(err, Pe2Pkcs7Error::VerifierError(_)), "{:?}", err);
}
