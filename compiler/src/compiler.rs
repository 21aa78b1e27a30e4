use std::collections::HashMap;

use pe2pkcs7_schema::{Def, Schema, Tag, TagClass, TypeDef, TypeKind, ANY, MAX_REFERENCE_HOPS};
use tracing::debug;

use crate::{
    types::{AstType, Component, Module, TagDefault, Tagging},
    verifier::verify_schema,
    tokenizer::tokenize_schema,
    parser::parse_schema,
    utils::quote,
    error::Pe2Pkcs7Error,
};

/// Compile one ASN.1 module into a [Schema].
/// Returns `Err(Pe2Pkcs7Error)` if tokenization/parsing/verification fails.
pub fn compile_schema(text: &str) -> Result<Schema, Pe2Pkcs7Error> {
    compile_modules(&[text])
}

/// Compile several ASN.1 modules into one [Schema]. Definitions keep their
/// declaration order, module by module.
pub fn compile_modules(texts: &[&str]) -> Result<Schema, Pe2Pkcs7Error> {
    let modules = texts
        .iter()
        .map(|text| parse_schema(&tokenize_schema(text)?))
        .collect::<Result<Vec<_>, _>>()?;
    verify_schema(&modules)?;
    lower_modules(&modules)
}

/// Lower verified modules to the TypeDef symbol table.
pub fn lower_modules(modules: &[Module]) -> Result<Schema, Pe2Pkcs7Error> {
    let lowerer = Lowerer::new(modules);
    let mut defs = Vec::new();
    for module in modules {
        for assignment in &module.assignments {
            let mut inlining = vec![assignment.name.as_str()];
            let ty = lowerer.lower_type(&assignment.ty, module.tag_default, &mut inlining)?;
            defs.push(Def::new(&assignment.name, ty));
        }
    }
    debug!(definitions = defs.len(), "lowered schema");
    Ok(Schema::new(defs))
}

/// Serialize a schema as a JSON array of `{ name, type }` definitions.
pub fn schema_to_json(schema: &Schema) -> Result<String, Pe2Pkcs7Error> {
    Ok(serde_json::to_string_pretty(schema)?)
}

pub fn schema_from_json(text: &str) -> Result<Schema, Pe2Pkcs7Error> {
    Ok(serde_json::from_str(text)?)
}

struct Lowerer<'m> {
    assignments: HashMap<&'m str, (&'m AstType, TagDefault)>,
}

impl<'m> Lowerer<'m> {
    fn new(modules: &'m [Module]) -> Self {
        let mut assignments = HashMap::new();
        for module in modules {
            for assignment in &module.assignments {
                assignments
                    .entry(assignment.name.as_str())
                    .or_insert((&assignment.ty, module.tag_default));
            }
        }
        Lowerer { assignments }
    }

    /// `inlining` holds the assignments whose bodies are being expanded in
    /// place of an implicit tag, outermost first.
    fn lower_type(
        &self,
        ty: &'m AstType,
        tag_default: TagDefault,
        inlining: &mut Vec<&'m str>,
    ) -> Result<TypeDef, Pe2Pkcs7Error> {
        let def = match ty {
            AstType::Builtin(name) => TypeDef::primitive(name),
            AstType::Reference(name) => TypeDef::reference(name),
            AstType::Sequence(components) => {
                TypeDef::sequence("SEQUENCE", self.lower_components(components, tag_default, inlining)?)
            }
            AstType::Set(components) => {
                TypeDef::sequence("SET", self.lower_components(components, tag_default, inlining)?)
            }
            AstType::SequenceOf(element) => {
                TypeDef::sequence_of("SEQUENCE", self.lower_type(element, tag_default, inlining)?)
            }
            AstType::SetOf(element) => {
                TypeDef::sequence_of("SET", self.lower_type(element, tag_default, inlining)?)
            }
            AstType::Choice(components) => {
                TypeDef::choice(self.lower_components(components, tag_default, inlining)?)
            }
            AstType::Tagged { class, number, tagging, inner } => {
                return self.lower_tagged(*class, *number, *tagging, inner, tag_default, inlining);
            }
        };
        Ok(def)
    }

    fn lower_components(
        &self,
        components: &'m [Component],
        tag_default: TagDefault,
        inlining: &mut Vec<&'m str>,
    ) -> Result<Vec<TypeDef>, Pe2Pkcs7Error> {
        // automatic tagging only applies when no component carries a tag
        let automatic =
            tag_default == TagDefault::Automatic && !components.iter().any(|c| c.ty.is_tagged());

        let mut fields = Vec::with_capacity(components.len());
        for (i, component) in components.iter().enumerate() {
            let mut def = if automatic {
                self.lower_tagged(TagClass::Context, i as u32, None, &component.ty, tag_default, inlining)?
            } else {
                self.lower_type(&component.ty, tag_default, inlining)?
            };
            def.field = Some(component.name.clone());
            def.optional = component.optional;
            def.has_default = component.has_default;
            fields.push(def);
        }
        Ok(fields)
    }

    fn lower_tagged(
        &self,
        class: TagClass,
        number: u32,
        tagging: Option<Tagging>,
        inner: &'m AstType,
        tag_default: TagDefault,
        inlining: &mut Vec<&'m str>,
    ) -> Result<TypeDef, Pe2Pkcs7Error> {
        let tag_name = Tag { class, constructed: false, number }.type_name().into_owned();
        let implicit = match tagging {
            Some(Tagging::Implicit) => true,
            Some(Tagging::Explicit) => false,
            None => tag_default != TagDefault::Explicit,
        };

        let (target, target_default, target_name) = self.dereference(inner, tag_default)?;
        let untaggable = matches!(target, AstType::Choice(_))
            || matches!(target, AstType::Builtin(name) if name == ANY);

        if !implicit || untaggable {
            let inner_def = self.lower_type(inner, tag_default, inlining)?;
            return Ok(TypeDef::sequence(&tag_name, vec![inner_def]));
        }

        if let AstType::Reference(name) = target {
            // imported but never defined: only the tag is known
            debug!(tag = %tag_name, name = %name, "implicit tag over an undefined type");
            return Ok(TypeDef::primitive(&tag_name));
        }

        if let Some(name) = target_name {
            if inlining.contains(&name) {
                // recursive type: the inner structure is not expanded again
                debug!(tag = %tag_name, name = %name, "implicit tag over a recursive type");
                return Ok(TypeDef::primitive(&tag_name));
            }
            if inlining.len() > MAX_REFERENCE_HOPS {
                return Err(Pe2Pkcs7Error::VerifierError(format!(
                    "Implicit tag {} nests too deeply",
                    quote(&tag_name)
                )));
            }
            inlining.push(name);
        }
        let def = self.lower_type(target, target_default, inlining);
        if target_name.is_some() {
            inlining.pop();
        }

        let mut def = def?;
        if def.kind == TypeKind::Primitive && def.underlying.is_none() {
            def.underlying = Some(def.name.clone());
        }
        def.name = tag_name;
        Ok(def)
    }

    /// Follows bare references to the type they name, together with the
    /// tagging default of the module that declared it and the last name
    /// followed. An undefined name is returned as the reference itself.
    fn dereference(
        &self,
        ty: &'m AstType,
        tag_default: TagDefault,
    ) -> Result<(&'m AstType, TagDefault, Option<&'m str>), Pe2Pkcs7Error> {
        let (mut current, mut default, mut name) = (ty, tag_default, None);
        for _ in 0..MAX_REFERENCE_HOPS {
            match current {
                AstType::Reference(reference) => match self.assignments.get_key_value(reference.as_str()) {
                    Some((&key, &(target, target_default))) => {
                        current = target;
                        default = target_default;
                        name = Some(key);
                    }
                    None => return Ok((current, default, name)),
                },
                _ => return Ok((current, default, name)),
            }
        }
        Err(Pe2Pkcs7Error::VerifierError("Reference chain is too long".to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field<'a>(def: &'a TypeDef, name: &str) -> &'a TypeDef {
        def.content
            .iter()
            .find(|f| f.field.as_deref() == Some(name))
            .unwrap_or_else(|| panic!("no field {}", name))
    }

    #[test]
    fn test_compile_sequence_fields() {
        let schema = compile_schema(
            "AlgorithmIdentifier ::= SEQUENCE { algorithm OBJECT IDENTIFIER, parameters ANY OPTIONAL }",
        )
        .unwrap();
        let def = schema.get("AlgorithmIdentifier").unwrap();
        assert_eq!(def.kind, TypeKind::Sequence);
        assert_eq!(def.name, "SEQUENCE");
        assert_eq!(def.content[0], TypeDef::primitive("OBJECT IDENTIFIER").with_field("algorithm"));
        assert_eq!(def.content[1], TypeDef::primitive("ANY").with_field("parameters").with_optional());
    }

    #[test]
    fn test_compile_collections() {
        let schema = compile_schema("Certs ::= SET OF Cert\nCert ::= SEQUENCE { }").unwrap();
        let certs = schema.get("Certs").unwrap();
        assert!(certs.repeated);
        assert_eq!(certs.name, "SET");
        assert_eq!(certs.content, vec![TypeDef::reference("Cert")]);
    }

    #[test]
    fn test_compile_explicit_tag() {
        let schema = compile_schema("A ::= SEQUENCE { v [0] EXPLICIT INTEGER DEFAULT 0 }").unwrap();
        let v = field(schema.get("A").unwrap(), "v");
        assert_eq!(v.name, "[0]");
        assert_eq!(v.kind, TypeKind::Sequence);
        assert!(v.has_default);
        assert_eq!(v.content, vec![TypeDef::primitive("INTEGER")]);
    }

    #[test]
    fn test_compile_implicit_tag_follows_references() {
        let text = "M DEFINITIONS IMPLICIT TAGS ::= BEGIN
            A ::= SEQUENCE { attrs [1] Attributes OPTIONAL, name [APPLICATION 2] Str }
            Attributes ::= SET OF INTEGER
            Str ::= IA5String
        END";
        let schema = compile_schema(text).unwrap();
        let a = schema.get("A").unwrap();

        let attrs = field(a, "attrs");
        assert_eq!(attrs.name, "[1]");
        assert!(attrs.repeated);
        assert!(attrs.optional);
        assert_eq!(attrs.content, vec![TypeDef::primitive("INTEGER")]);

        let name = field(a, "name");
        assert_eq!(name.name, "[APPLICATION 2]");
        assert_eq!(name.kind, TypeKind::Primitive);
        assert_eq!(name.underlying.as_deref(), Some("IA5String"));
    }

    #[test]
    fn test_compile_choice_tags_are_explicit() {
        let text = "M DEFINITIONS IMPLICIT TAGS ::= BEGIN
            A ::= SEQUENCE { t [0] Time, any [1] ANY }
            Time ::= CHOICE { utc UTCTime, gen GeneralizedTime }
        END";
        let schema = compile_schema(text).unwrap();
        let a = schema.get("A").unwrap();
        let t = field(a, "t");
        assert_eq!(t.kind, TypeKind::Sequence);
        assert_eq!(t.content, vec![TypeDef::reference("Time")]);
        let any = field(a, "any");
        assert_eq!(any.content, vec![TypeDef::primitive("ANY")]);
    }

    #[test]
    fn test_compile_automatic_tags() {
        let text = "M DEFINITIONS AUTOMATIC TAGS ::= BEGIN
            A ::= SEQUENCE { x INTEGER, y BOOLEAN OPTIONAL }
            B ::= SEQUENCE { x [5] INTEGER, y BOOLEAN }
        END";
        let schema = compile_schema(text).unwrap();
        let a = schema.get("A").unwrap();
        assert_eq!(field(a, "x").name, "[0]");
        assert_eq!(field(a, "x").underlying.as_deref(), Some("INTEGER"));
        assert_eq!(field(a, "y").name, "[1]");
        assert!(field(a, "y").optional);

        let b = schema.get("B").unwrap();
        assert_eq!(field(b, "x").name, "[5]");
        assert_eq!(field(b, "y").name, "BOOLEAN");
    }

    #[test]
    fn test_compile_imported_undefined_implicit() {
        let text = "M DEFINITIONS ::= BEGIN IMPORTS Name FROM X;
            A ::= SEQUENCE { n [0] IMPLICIT Name }
        END";
        let schema = compile_schema(text).unwrap();
        let n = field(schema.get("A").unwrap(), "n");
        assert_eq!(n, &TypeDef::primitive("[0]").with_field("n"));
    }

    #[test]
    fn test_compile_recursive_implicit_tag() {
        let schema = compile_schema("Node ::= SEQUENCE { value INTEGER, next [0] IMPLICIT Node OPTIONAL }")
            .unwrap();
        let node = schema.get("Node").unwrap();
        assert_eq!(node.content.len(), 2);
        assert_eq!(field(node, "next"), &TypeDef::primitive("[0]").with_field("next").with_optional());
    }

    #[test]
    fn test_compile_mutually_recursive_implicit_tags() {
        let text = "M DEFINITIONS IMPLICIT TAGS ::= BEGIN
            A ::= SEQUENCE { b [0] B OPTIONAL }
            B ::= SEQUENCE { a [1] A OPTIONAL, s [2] Str, t [3] Str }
            Str ::= IA5String
        END";
        let schema = compile_schema(text).unwrap();

        // B is expanded once inside A, and A is not expanded again inside it
        let b = field(schema.get("A").unwrap(), "b");
        assert_eq!(b.name, "[0]");
        assert_eq!(b.kind, TypeKind::Sequence);
        assert_eq!(field(b, "a"), &TypeDef::primitive("[1]").with_field("a").with_optional());
        assert_eq!(field(b, "s").underlying.as_deref(), Some("IA5String"));
        assert_eq!(field(b, "t").underlying.as_deref(), Some("IA5String"));

        let a = field(schema.get("B").unwrap(), "a");
        assert_eq!(a.kind, TypeKind::Sequence);
        assert_eq!(field(a, "b"), &TypeDef::primitive("[0]").with_field("b").with_optional());
    }

    #[test]
    fn test_compile_modules_in_order() {
        let schema = compile_modules(&["B ::= A", "A ::= INTEGER"]).unwrap();
        assert_eq!(schema.names().collect::<Vec<_>>(), vec!["B", "A"]);
        let b = schema.get("B").unwrap();
        assert_eq!(schema.resolve(Some(b)).unwrap().name, "INTEGER");
    }

    #[test]
    fn test_schema_json_round_trip() {
        let schema = compile_schema("A ::= SEQUENCE { v [0] IMPLICIT INTEGER OPTIONAL }").unwrap();
        let json = schema_to_json(&schema).unwrap();
        assert!(json.contains("\"underlying\": \"INTEGER\""), "{}", json);
        assert_eq!(schema_from_json(&json).unwrap(), schema);
    }

    #[test]
    fn test_schema_from_bad_json() {
        assert!(matches!(schema_from_json("{"), Err(Pe2Pkcs7Error::Json(_))));
    }
}
