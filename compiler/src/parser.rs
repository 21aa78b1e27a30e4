use crate::{
    tokenizer::Token,
    types::{Assignment, AstType, Component, Module, TagDefault, Tagging},
    utils::{error, quote},
    error::Pe2Pkcs7Error,
};
use lazy_static::lazy_static;
use pe2pkcs7_schema::TagClass;
use regex::Regex;

lazy_static! {
    static ref TYPE_REFERENCE:  Regex = Regex::new(r"^[A-Z][A-Za-z0-9]*(?:-[A-Za-z0-9]+)*$").unwrap();
    static ref VALUE_REFERENCE: Regex = Regex::new(r"^[a-z][A-Za-z0-9]*(?:-[A-Za-z0-9]+)*$").unwrap();
    static ref NUMBER:          Regex = Regex::new(r"^\d+$").unwrap();
    static ref EOF:             Regex = Regex::new(r"^$").unwrap();
}

/// Builtin types that are spelled with a single keyword.
const SIMPLE_BUILTINS: [&str; 19] = [
    "BOOLEAN", "NULL", "REAL", "RELATIVE-OID", "EXTERNAL", "ObjectDescriptor",
    "UTCTime", "GeneralizedTime", "UTF8String", "NumericString", "PrintableString",
    "TeletexString", "VideotexString", "IA5String", "GraphicString",
    "VisibleString", "GeneralString", "UniversalString", "BMPString",
];

/// Deepest nesting of type notation accepted in one assignment.
pub const MAX_TYPE_DEPTH: usize = 100;

struct Parser<'a> {
    tokens: &'a [Token],
    index:  usize,
    depth:  usize,
}

impl<'a> Parser<'a> {
    fn current(&self) -> &'a Token {
        &self.tokens[self.index.min(self.tokens.len() - 1)]
    }

    fn peek(&self, ahead: usize) -> &'a Token {
        &self.tokens[(self.index + ahead).min(self.tokens.len() - 1)]
    }

    fn at_eof(&self) -> bool {
        EOF.is_match(&self.current().text)
    }

    fn advance(&mut self) -> &'a Token {
        let tok = self.current();
        if !self.at_eof() {
            self.index += 1;
        }
        tok
    }

    fn eat(&mut self, text: &str) -> bool {
        if self.current().text == text && !self.at_eof() {
            self.index += 1;
            true
        } else {
            false
        }
    }

    fn eat_match(&mut self, test: &Regex) -> Option<&'a Token> {
        if !self.at_eof() && test.is_match(&self.current().text) {
            Some(self.advance())
        } else {
            None
        }
    }

    fn expect(&mut self, text: &str) -> Result<&'a Token, Pe2Pkcs7Error> {
        if self.eat(text) {
            Ok(&self.tokens[self.index - 1])
        } else {
            Err(self.expected(&quote(text)))
        }
    }

    fn expect_match(&mut self, test: &Regex, expected: &str) -> Result<&'a Token, Pe2Pkcs7Error> {
        match self.eat_match(test) {
            Some(tok) => Ok(tok),
            None => Err(self.expected(expected)),
        }
    }

    fn expected(&self, expected: &str) -> Pe2Pkcs7Error {
        let tok = self.current();
        let found = if self.at_eof() { "end of input".to_owned() } else { quote(&tok.text) };
        error(&format!("Expected {} but found {}", expected, found), tok.line, tok.column)
    }

    fn unexpected_token(&self) -> Pe2Pkcs7Error {
        let tok = self.current();
        if self.at_eof() {
            error("Unexpected end of input", tok.line, tok.column)
        } else {
            error(&format!("Unexpected token {}", quote(&tok.text)), tok.line, tok.column)
        }
    }

    /// Skips a bracketed group; the current token must be `open`.
    fn skip_group(&mut self, open: &str, close: &str) -> Result<(), Pe2Pkcs7Error> {
        self.expect(open)?;
        let mut depth = 1;
        while depth > 0 {
            if self.at_eof() {
                return Err(self.expected(&quote(close)));
            }
            let tok = self.advance();
            if tok.text == open {
                depth += 1;
            } else if tok.text == close {
                depth -= 1;
            }
        }
        Ok(())
    }

    fn skip_constraints(&mut self) -> Result<(), Pe2Pkcs7Error> {
        while self.current().text == "(" {
            self.skip_group("(", ")")?;
        }
        Ok(())
    }

    /// Values are not interpreted: DEFAULT values and value assignments
    /// are only stepped over.
    fn skip_value(&mut self) -> Result<(), Pe2Pkcs7Error> {
        if self.current().text == "{" {
            self.skip_group("{", "}")
        } else if self.at_eof() {
            Err(self.expected("a value"))
        } else {
            self.advance();
            Ok(())
        }
    }

    fn parse_header(&mut self) -> Result<(Option<String>, TagDefault, bool), Pe2Pkcs7Error> {
        let is_header = TYPE_REFERENCE.is_match(&self.current().text)
            && (self.peek(1).text == "DEFINITIONS" || self.peek(1).text == "{");
        if !is_header {
            return Ok((None, TagDefault::Explicit, false));
        }

        let name = self.advance().text.clone();
        if self.current().text == "{" {
            self.skip_group("{", "}")?;
        }
        self.expect("DEFINITIONS")?;

        let mut tag_default = TagDefault::Explicit;
        if self.eat("EXPLICIT") {
            self.expect("TAGS")?;
        } else if self.eat("IMPLICIT") {
            tag_default = TagDefault::Implicit;
            self.expect("TAGS")?;
        } else if self.eat("AUTOMATIC") {
            tag_default = TagDefault::Automatic;
            self.expect("TAGS")?;
        }
        if self.eat("EXTENSIBILITY") {
            self.expect("IMPLIED")?;
        }

        self.expect("::=")?;
        self.expect("BEGIN")?;
        Ok((Some(name), tag_default, true))
    }

    fn parse_exports_and_imports(&mut self) -> Result<Vec<String>, Pe2Pkcs7Error> {
        if self.eat("EXPORTS") {
            while !self.eat(";") {
                if self.at_eof() {
                    return Err(self.expected("\";\""));
                }
                self.advance();
            }
        }

        let mut imports = Vec::new();
        if self.eat("IMPORTS") {
            while !self.eat(";") {
                if self.at_eof() {
                    return Err(self.expected("\";\""));
                }
                if self.eat("FROM") {
                    // module reference, optionally followed by its OID
                    self.expect_match(&TYPE_REFERENCE, "module name")?;
                    if self.current().text == "{" {
                        self.skip_group("{", "}")?;
                    }
                    continue;
                }
                let tok = self.advance();
                if TYPE_REFERENCE.is_match(&tok.text) {
                    imports.push(tok.text.clone());
                }
            }
        }
        Ok(imports)
    }

    fn parse_type(&mut self) -> Result<AstType, Pe2Pkcs7Error> {
        if self.depth >= MAX_TYPE_DEPTH {
            let tok = self.current();
            return Err(error(
                &format!("Type nests deeper than {} levels", MAX_TYPE_DEPTH),
                tok.line,
                tok.column,
            ));
        }
        self.depth += 1;
        let ty = self.parse_nested_type();
        self.depth -= 1;
        ty
    }

    fn parse_nested_type(&mut self) -> Result<AstType, Pe2Pkcs7Error> {
        if self.eat("[") {
            let class = if self.eat("UNIVERSAL") {
                TagClass::Universal
            } else if self.eat("APPLICATION") {
                TagClass::Application
            } else if self.eat("PRIVATE") {
                TagClass::Private
            } else {
                TagClass::Context
            };
            let num_tok = self.expect_match(&NUMBER, "tag number")?;
            let number = num_tok.text.parse::<u32>().map_err(|_| {
                error(
                    &format!("Invalid tag number {}", quote(&num_tok.text)),
                    num_tok.line,
                    num_tok.column,
                )
            })?;
            self.expect("]")?;

            let tagging = if self.eat("IMPLICIT") {
                Some(Tagging::Implicit)
            } else if self.eat("EXPLICIT") {
                Some(Tagging::Explicit)
            } else {
                None
            };
            let inner = self.parse_type()?;
            return Ok(AstType::Tagged {
                class,
                number,
                tagging,
                inner: Box::new(inner),
            });
        }

        let ty = self.parse_untagged_type()?;
        self.skip_constraints()?;
        Ok(ty)
    }

    fn parse_untagged_type(&mut self) -> Result<AstType, Pe2Pkcs7Error> {
        let tok = self.current();
        match tok.text.as_str() {
            "SEQUENCE" | "SET" => {
                let is_set = tok.text == "SET";
                self.advance();
                if self.current().text == "{" {
                    let components = self.parse_components()?;
                    return Ok(if is_set {
                        AstType::Set(components)
                    } else {
                        AstType::Sequence(components)
                    });
                }
                self.eat("SIZE");
                self.skip_constraints()?;
                self.expect("OF")?;
                // `SEQUENCE OF name Type` names the element; the name is dropped
                if VALUE_REFERENCE.is_match(&self.current().text) {
                    self.advance();
                }
                let element = Box::new(self.parse_type()?);
                Ok(if is_set {
                    AstType::SetOf(element)
                } else {
                    AstType::SequenceOf(element)
                })
            }

            "CHOICE" => {
                self.advance();
                Ok(AstType::Choice(self.parse_components()?))
            }

            "INTEGER" | "ENUMERATED" | "BIT" => {
                self.advance();
                let name = if tok.text == "BIT" {
                    self.expect("STRING")?;
                    "BIT STRING".to_owned()
                } else {
                    tok.text.clone()
                };
                if self.current().text == "{" {
                    self.skip_group("{", "}")?;
                }
                Ok(AstType::Builtin(name))
            }

            "OCTET" | "CHARACTER" => {
                self.advance();
                self.expect("STRING")?;
                Ok(AstType::Builtin(format!("{} STRING", tok.text)))
            }

            "OBJECT" => {
                self.advance();
                self.expect("IDENTIFIER")?;
                Ok(AstType::Builtin("OBJECT IDENTIFIER".to_owned()))
            }

            "EMBEDDED" => {
                self.advance();
                self.expect("PDV")?;
                Ok(AstType::Builtin("EMBEDDED PDV".to_owned()))
            }

            "ANY" => {
                self.advance();
                if self.eat("DEFINED") {
                    self.expect("BY")?;
                    self.expect_match(&VALUE_REFERENCE, "identifier")?;
                }
                Ok(AstType::Builtin("ANY".to_owned()))
            }

            "T61String" => {
                self.advance();
                Ok(AstType::Builtin("TeletexString".to_owned()))
            }

            "ISO646String" => {
                self.advance();
                Ok(AstType::Builtin("VisibleString".to_owned()))
            }

            text if SIMPLE_BUILTINS.contains(&text) => {
                self.advance();
                Ok(AstType::Builtin(text.to_owned()))
            }

            text if TYPE_REFERENCE.is_match(text) => {
                self.advance();
                // `Module.Type` external reference
                if self.eat(".") {
                    let target = self.expect_match(&TYPE_REFERENCE, "type name")?;
                    return Ok(AstType::Reference(target.text.clone()));
                }
                Ok(AstType::Reference(text.to_owned()))
            }

            _ => Err(self.unexpected_token()),
        }
    }

    fn parse_components(&mut self) -> Result<Vec<Component>, Pe2Pkcs7Error> {
        self.expect("{")?;
        let mut components = Vec::new();
        if self.eat("}") {
            return Ok(components);
        }

        loop {
            if self.eat("...") {
                // extension marker, optionally with "!" and an exception value
                if self.eat("!") {
                    self.skip_value()?;
                }
            } else if self.current().text == "COMPONENTS" {
                let tok = self.current();
                return Err(error("COMPONENTS OF is not supported", tok.line, tok.column));
            } else {
                let name_tok = self.expect_match(&VALUE_REFERENCE, "identifier")?;
                let ty = self.parse_type()?;
                let mut optional = false;
                let mut has_default = false;
                if self.eat("OPTIONAL") {
                    optional = true;
                } else if self.eat("DEFAULT") {
                    has_default = true;
                    self.skip_value()?;
                }
                components.push(Component {
                    name:   name_tok.text.clone(),
                    line:   name_tok.line,
                    column: name_tok.column,
                    ty,
                    optional,
                    has_default,
                });
            }

            if self.eat(",") {
                continue;
            }
            self.expect("}")?;
            return Ok(components);
        }
    }

    fn parse_assignment(&mut self, assignments: &mut Vec<Assignment>) -> Result<(), Pe2Pkcs7Error> {
        if let Some(name_tok) = self.eat_match(&TYPE_REFERENCE) {
            self.expect("::=")?;
            let ty = self.parse_type()?;
            assignments.push(Assignment {
                name:   name_tok.text.clone(),
                line:   name_tok.line,
                column: name_tok.column,
                ty,
            });
            Ok(())
        } else if self.eat_match(&VALUE_REFERENCE).is_some() {
            // value assignment: `name Type ::= value`
            self.parse_type()?;
            self.expect("::=")?;
            self.skip_value()
        } else {
            Err(self.unexpected_token())
        }
    }
}

/// Parses tokenized ASN.1 module text. The module header (`DEFINITIONS ...
/// BEGIN ... END`) is optional so that bare lists of type assignments can be
/// compiled too.
pub fn parse_schema(tokens: &[Token]) -> Result<Module, Pe2Pkcs7Error> {
    if tokens.is_empty() {
        return Err(error("Expected at least an end-of-input token", 0, 0));
    }
    let mut parser = Parser { tokens, index: 0, depth: 0 };

    let (name, tag_default, has_header) = parser.parse_header()?;
    let imports = parser.parse_exports_and_imports()?;

    let mut assignments = Vec::new();
    loop {
        if parser.at_eof() {
            if has_header {
                return Err(parser.expected("\"END\""));
            }
            break;
        }
        if has_header && parser.eat("END") {
            if !parser.at_eof() {
                return Err(parser.unexpected_token());
            }
            break;
        }
        parser.parse_assignment(&mut assignments)?;
    }

    Ok(Module {
        name,
        tag_default,
        imports,
        assignments,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize_schema;

    fn parse(text: &str) -> Result<Module, Pe2Pkcs7Error> {
        parse_schema(&tokenize_schema(text)?)
    }

    #[test]
    fn test_parse_bare_assignments() {
        let module = parse("Version ::= INTEGER { v1(0), v2(1) }\nDigest ::= OCTET STRING").unwrap();
        assert_eq!(module.name, None);
        assert_eq!(module.tag_default, TagDefault::Explicit);
        assert_eq!(module.assignments.len(), 2);
        assert_eq!(module.assignments[0].ty, AstType::Builtin("INTEGER".into()));
        assert_eq!(module.assignments[1].ty, AstType::Builtin("OCTET STRING".into()));
        assert_eq!(module.assignments[1].line, 2);
    }

    #[test]
    fn test_parse_module_header() {
        let text = r#"
        PKCS7 { iso(1) member-body(2) us(840) rsadsi(113549) pkcs(1) pkcs-7(7) 0 }
        DEFINITIONS IMPLICIT TAGS ::= BEGIN
        IMPORTS Name, Certificate FROM X509 { joint-iso-ccitt ds(5) 1 }
                Attribute FROM Attrs;
        pkcs-7 OBJECT IDENTIFIER ::= { iso(1) member-body(2) 840 113549 1 7 }
        Data ::= OCTET STRING
        END
        "#;
        let module = parse(text).unwrap();
        assert_eq!(module.name.as_deref(), Some("PKCS7"));
        assert_eq!(module.tag_default, TagDefault::Implicit);
        assert_eq!(module.imports, vec!["Name", "Certificate", "Attribute"]);
        assert_eq!(module.assignments.len(), 1);
        assert_eq!(module.assignments[0].name, "Data");
    }

    #[test]
    fn test_parse_sequence_components() {
        let text = r#"
        SignerInfo ::= SEQUENCE {
            version INTEGER (1..3),
            digestAlgorithm AlgorithmIdentifier,
            authenticatedAttributes [0] IMPLICIT Attributes OPTIONAL,
            flags BIT STRING { a(0), b(1) } DEFAULT { a },
            ...
        }
        "#;
        let module = parse(text).unwrap();
        let components = match &module.assignments[0].ty {
            AstType::Sequence(components) => components,
            other => panic!("expected a SEQUENCE, got {:?}", other),
        };
        assert_eq!(components.len(), 4);
        assert_eq!(components[0].name, "version");
        assert_eq!(components[1].ty, AstType::Reference("AlgorithmIdentifier".into()));
        assert!(components[2].optional);
        assert_eq!(
            components[2].ty,
            AstType::Tagged {
                class:   TagClass::Context,
                number:  0,
                tagging: Some(Tagging::Implicit),
                inner:   Box::new(AstType::Reference("Attributes".into())),
            }
        );
        assert!(components[3].has_default);
        assert_eq!(components[3].ty, AstType::Builtin("BIT STRING".into()));
    }

    #[test]
    fn test_parse_collections_and_choice() {
        let text = r#"
        Certificates ::= SET SIZE (1..MAX) OF Certificate
        Path ::= SEQUENCE OF cert Certificate
        Time ::= CHOICE { utcTime UTCTime, generalTime GeneralizedTime }
        Content ::= [APPLICATION 3] EXPLICIT ANY DEFINED BY contentType
        "#;
        let module = parse(text).unwrap();
        assert_eq!(
            module.assignments[0].ty,
            AstType::SetOf(Box::new(AstType::Reference("Certificate".into())))
        );
        assert_eq!(
            module.assignments[1].ty,
            AstType::SequenceOf(Box::new(AstType::Reference("Certificate".into())))
        );
        match &module.assignments[2].ty {
            AstType::Choice(alternatives) => {
                assert_eq!(alternatives.len(), 2);
                assert_eq!(alternatives[1].ty, AstType::Builtin("GeneralizedTime".into()));
            }
            other => panic!("expected a CHOICE, got {:?}", other),
        }
        assert_eq!(
            module.assignments[3].ty,
            AstType::Tagged {
                class:   TagClass::Application,
                number:  3,
                tagging: Some(Tagging::Explicit),
                inner:   Box::new(AstType::Builtin("ANY".into())),
            }
        );
    }

    #[test]
    fn test_parse_missing_end() {
        let err = parse("M DEFINITIONS ::= BEGIN A ::= NULL").unwrap_err();
        assert!(matches!(err, Pe2Pkcs7Error::ParseError { .. }), "{:?}", err);
    }

    #[test]
    fn test_parse_unexpected_token() {
        let err = parse("Version ::= , INTEGER").unwrap_err();
        match err {
            Pe2Pkcs7Error::ParseError { line, column, msg } => {
                assert_eq!((line, column), (1, 13));
                assert!(msg.contains("\",\""), "{}", msg);
            }
            other => panic!("expected a ParseError, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_nesting_limit() {
        let nested = |levels: usize| format!("A ::= {}INTEGER", "SEQUENCE OF ".repeat(levels));

        assert!(parse(&nested(MAX_TYPE_DEPTH - 1)).is_ok());

        let err = parse(&nested(MAX_TYPE_DEPTH + 50)).unwrap_err();
        match err {
            Pe2Pkcs7Error::ParseError { line, column, msg } => {
                assert_eq!((line, column), (1, 7 + 12 * MAX_TYPE_DEPTH));
                assert!(msg.contains("nests deeper"), "{}", msg);
            }
            other => panic!("expected a ParseError, got {:?}", other),
        }
    }
}
