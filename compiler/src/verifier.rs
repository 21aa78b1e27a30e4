use std::collections::{HashMap, HashSet};

use pe2pkcs7_schema::MAX_REFERENCE_HOPS;
use tracing::warn;

use crate::{
    types::{AstType, Component, Module, TagDefault, Tagging},
    utils::quote,
    error::Pe2Pkcs7Error,
};

/// Returns `Ok(())` if verification passed, or `Err(Pe2Pkcs7Error::VerifierError(_))` otherwise.
///
/// All modules are checked together, so a name imported by one module may
/// be defined by another.
pub fn verify_schema(modules: &[Module]) -> Result<(), Pe2Pkcs7Error> {
    let mut definitions_map: HashMap<&str, (&AstType, TagDefault)> = HashMap::new();

    // 1) Check duplicate type names
    for module in modules {
        for assignment in &module.assignments {
            if definitions_map.contains_key(assignment.name.as_str()) {
                return Err(Pe2Pkcs7Error::VerifierError(format!(
                    "The type {} is defined twice (line {})",
                    quote(&assignment.name),
                    assignment.line
                )));
            }
            definitions_map.insert(&assignment.name, (&assignment.ty, module.tag_default));
        }
    }

    // 2) Check components and references inside each assignment
    for module in modules {
        let imports: HashSet<&str> = module.imports.iter().map(String::as_str).collect();
        for assignment in &module.assignments {
            check_type(&assignment.name, &assignment.ty, &definitions_map, &imports)?;
        }
    }

    // 3) Check that aliases eventually reach a structural type
    for module in modules {
        for assignment in &module.assignments {
            check_alias_chain(&assignment.name, &definitions_map)?;
        }
    }

    Ok(())
}

fn check_type(
    owner: &str,
    ty: &AstType,
    definitions_map: &HashMap<&str, (&AstType, TagDefault)>,
    imports: &HashSet<&str>,
) -> Result<(), Pe2Pkcs7Error> {
    match ty {
        AstType::Builtin(_) => Ok(()),
        AstType::Reference(name) => {
            if definitions_map.contains_key(name.as_str()) {
                Ok(())
            } else if imports.contains(name.as_str()) {
                warn!(name = %name, owner = %owner, "imported type is not defined; it will render unlabeled");
                Ok(())
            } else {
                Err(Pe2Pkcs7Error::VerifierError(format!(
                    "The type {} is not defined for {}",
                    quote(name),
                    quote(owner)
                )))
            }
        }
        AstType::Sequence(components) | AstType::Set(components) | AstType::Choice(components) => {
            check_components(owner, components)?;
            for component in components {
                check_type(owner, &component.ty, definitions_map, imports)?;
            }
            Ok(())
        }
        AstType::SequenceOf(element) | AstType::SetOf(element) => {
            check_type(owner, element, definitions_map, imports)
        }
        AstType::Tagged { inner, .. } => check_type(owner, inner, definitions_map, imports),
    }
}

fn check_components(owner: &str, components: &[Component]) -> Result<(), Pe2Pkcs7Error> {
    let mut names: Vec<&str> = Vec::new();
    for component in components {
        if names.contains(&component.name.as_str()) {
            return Err(Pe2Pkcs7Error::VerifierError(format!(
                "The field {} is defined twice in {} (line {})",
                quote(&component.name),
                quote(owner),
                component.line
            )));
        }
        names.push(&component.name);
    }
    Ok(())
}

/// The name an assignment forwards to without adding structure of its own:
/// a bare reference, or an implicitly tagged one.
fn alias_target(ty: &AstType, tag_default: TagDefault) -> Option<&str> {
    match ty {
        AstType::Reference(name) => Some(name.as_str()),
        AstType::Tagged { tagging, inner, .. } => {
            let implicit = match tagging {
                Some(Tagging::Implicit) => true,
                Some(Tagging::Explicit) => false,
                None => tag_default != TagDefault::Explicit,
            };
            if implicit {
                alias_target(inner, tag_default)
            } else {
                None
            }
        }
        _ => None,
    }
}

fn check_alias_chain(
    name: &str,
    definitions_map: &HashMap<&str, (&AstType, TagDefault)>,
) -> Result<(), Pe2Pkcs7Error> {
    let mut visited = vec![name];
    let mut current = name;
    while let Some(&(ty, tag_default)) = definitions_map.get(current) {
        let target = match alias_target(ty, tag_default) {
            Some(target) => target,
            None => return Ok(()),
        };
        if visited.contains(&target) || visited.len() > MAX_REFERENCE_HOPS {
            return Err(Pe2Pkcs7Error::VerifierError(format!(
                "The type {} never reaches a concrete type ({})",
                quote(name),
                visited.join(" -> ")
            )));
        }
        visited.push(target);
        current = target;
    }
    Ok(())
}
