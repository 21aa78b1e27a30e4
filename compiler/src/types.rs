use pe2pkcs7_schema::TagClass;
use serde::Serialize;

/// Default tagging mode declared in a module header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TagDefault {
    Explicit,
    Implicit,
    Automatic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Tagging {
    Explicit,
    Implicit,
}

/// A parsed ASN.1 module.
#[derive(Debug, PartialEq, Serialize)]
pub struct Module {
    pub name:        Option<String>,
    pub tag_default: TagDefault,
    pub imports:     Vec<String>,
    pub assignments: Vec<Assignment>,
}

/// `Name ::= Type`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assignment {
    pub name:   String,
    pub line:   usize,
    pub column: usize,
    pub ty:     AstType,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum AstType {
    /// A builtin type such as `INTEGER` or `OCTET STRING`, by its canonical name.
    Builtin(String),
    Reference(String),
    Sequence(Vec<Component>),
    Set(Vec<Component>),
    SequenceOf(Box<AstType>),
    SetOf(Box<AstType>),
    Choice(Vec<Component>),
    Tagged {
        class:   TagClass,
        number:  u32,
        tagging: Option<Tagging>,
        inner:   Box<AstType>,
    },
}

/// A named member of a SEQUENCE, SET or CHOICE.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Component {
    pub name:        String,
    pub line:        usize,
    pub column:      usize,
    pub ty:          AstType,
    pub optional:    bool,
    pub has_default: bool,
}

impl AstType {
    pub fn is_tagged(&self) -> bool {
        matches!(self, AstType::Tagged { .. })
    }
}
