use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Structural name that matches any decoded node.
pub const ANY: &str = "ANY";
/// Structural name carried by every CHOICE definition.
pub const CHOICE: &str = "CHOICE";
/// Upper bound on reference hops (and nested CHOICE levels) followed while
/// resolving a single definition.
pub const MAX_REFERENCE_HOPS: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    Primitive,
    Sequence,
    Choice,
    DefinedReference,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// One node of a schema type tree.
///
/// `name` is the structural name a decoded node must carry for this
/// definition to apply (`SEQUENCE`, `INTEGER`, `[0]`, ...). For a
/// [DefinedReference](TypeKind::DefinedReference) it is instead the name of
/// the referenced definition in the [Schema].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDef {
    pub name: String,
    pub kind: TypeKind,

    /// Component identifier inside the enclosing SEQUENCE, SET or CHOICE.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<TypeDef>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub optional: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub has_default: bool,

    /// SEQUENCE OF / SET OF: `content[0]` describes every element.
    #[serde(default, skip_serializing_if = "is_false")]
    pub repeated: bool,

    /// Universal type replaced by an implicit tag, kept so the content can
    /// still be rendered as that type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub underlying: Option<String>,
}

impl TypeDef {
    fn new(name: &str, kind: TypeKind, content: Vec<TypeDef>) -> Self {
        TypeDef {
            name: name.to_owned(),
            kind,
            field: None,
            content,
            optional: false,
            has_default: false,
            repeated: false,
            underlying: None,
        }
    }

    pub fn primitive(name: &str) -> Self {
        TypeDef::new(name, TypeKind::Primitive, Vec::new())
    }

    pub fn sequence(name: &str, fields: Vec<TypeDef>) -> Self {
        TypeDef::new(name, TypeKind::Sequence, fields)
    }

    pub fn sequence_of(name: &str, element: TypeDef) -> Self {
        TypeDef {
            repeated: true,
            ..TypeDef::new(name, TypeKind::Sequence, vec![element])
        }
    }

    pub fn choice(alternatives: Vec<TypeDef>) -> Self {
        TypeDef::new(CHOICE, TypeKind::Choice, alternatives)
    }

    pub fn reference(name: &str) -> Self {
        TypeDef::new(name, TypeKind::DefinedReference, Vec::new())
    }

    pub fn with_field(mut self, field: &str) -> Self {
        self.field = Some(field.to_owned());
        self
    }

    pub fn with_optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn with_default(mut self) -> Self {
        self.has_default = true;
        self
    }

    /// True for entries a SEQUENCE walk may skip without consuming a child.
    pub fn is_skippable(&self) -> bool {
        self.optional || self.has_default
    }

    pub fn is_any(&self) -> bool {
        self.kind != TypeKind::DefinedReference && self.name == ANY
    }
}

/// A named top-level definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Def {
    pub name: String,
    #[serde(rename = "type")]
    pub ty:   TypeDef,
}

impl Def {
    pub fn new(name: &str, ty: TypeDef) -> Self {
        Def { name: name.to_owned(), ty }
    }
}

/// The schema symbol table: definitions in declaration order plus a
/// name → index map. Built once and only read afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Def>", into = "Vec<Def>")]
pub struct Schema {
    pub defs:              Vec<Def>,
    pub def_name_to_index: HashMap<String, usize>,
}

impl From<Vec<Def>> for Schema {
    fn from(defs: Vec<Def>) -> Self {
        Schema::new(defs)
    }
}

impl From<Schema> for Vec<Def> {
    fn from(schema: Schema) -> Self {
        schema.defs
    }
}

impl Schema {
    /// Builds the symbol table. When a name is defined twice the first
    /// definition wins.
    pub fn new(defs: Vec<Def>) -> Schema {
        let mut def_name_to_index = HashMap::new();
        for (i, def) in defs.iter().enumerate() {
            def_name_to_index.entry(def.name.clone()).or_insert(i);
        }
        Schema { defs, def_name_to_index }
    }

    pub fn get(&self, name: &str) -> Option<&TypeDef> {
        self.def_name_to_index.get(name).map(|&i| &self.defs[i].ty)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.def_name_to_index.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.defs.iter().map(|def| def.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Follows named indirection. `None` stays `None`; a reference yields
    /// its target, or `None` when the name is unknown or the chain of
    /// references does not end within [MAX_REFERENCE_HOPS].
    pub fn resolve<'a>(&'a self, def: Option<&'a TypeDef>) -> Option<&'a TypeDef> {
        let mut current = def?;
        for _ in 0..MAX_REFERENCE_HOPS {
            if current.kind != TypeKind::DefinedReference {
                return Some(current);
            }
            match self.get(&current.name) {
                Some(target) => current = target,
                None => {
                    debug!(name = %current.name, "reference to an undefined type");
                    return None;
                }
            }
        }
        debug!(name = %current.name, "reference chain too long");
        None
    }

    /// Picks the CHOICE alternative describing a node of type `type_name`.
    /// Returns the alternative as declared (for its field name) and the
    /// structural definition it resolves to.
    pub fn select_alternative<'a>(
        &'a self,
        choice: &'a TypeDef,
        type_name: &str,
    ) -> Option<(&'a TypeDef, &'a TypeDef)> {
        self.select_alternative_bounded(choice, type_name, MAX_REFERENCE_HOPS)
    }

    fn select_alternative_bounded<'a>(
        &'a self,
        choice: &'a TypeDef,
        type_name: &str,
        budget: usize,
    ) -> Option<(&'a TypeDef, &'a TypeDef)> {
        if budget == 0 {
            return None;
        }
        for alternative in &choice.content {
            let resolved = match self.resolve(Some(alternative)) {
                Some(resolved) => resolved,
                None => continue,
            };
            if resolved.kind == TypeKind::Choice {
                if let Some((_, inner)) =
                    self.select_alternative_bounded(resolved, type_name, budget - 1)
                {
                    return Some((alternative, inner));
                }
            } else if resolved.name == type_name || resolved.is_any() {
                return Some((alternative, resolved));
            }
        }
        None
    }

    /// The structural definition of the first CHOICE alternative that
    /// matches `type_name`, in declared order.
    pub fn select_branch<'a>(&'a self, choice: &'a TypeDef, type_name: &str) -> Option<&'a TypeDef> {
        self.select_alternative(choice, type_name).map(|(_, resolved)| resolved)
    }

    /// Whether `def` could describe a node of type `type_name`.
    pub fn accepts(&self, def: &TypeDef, type_name: &str) -> bool {
        match self.resolve(Some(def)) {
            Some(resolved) if resolved.kind == TypeKind::Choice => {
                self.select_alternative(resolved, type_name).is_some()
            }
            Some(resolved) => resolved.name == type_name || resolved.is_any(),
            None => false,
        }
    }
}
