//! Type Resolution
//!
//! Turns references into concrete types by substituting type arguments into
//! declaration bodies.

use super::{ConfigValue, Decl, DeclRegistry, ListType, MapType, Named, Struct, Type};
use crate::error::{CuegenError, Result};

/// Type-argument bindings for one generic declaration
#[derive(Debug, Clone, Copy)]
pub struct Bindings<'a> {
    pub decl: &'a Decl,
    pub args: &'a [Type],
}

impl<'a> Bindings<'a> {
    pub fn new(decl: &'a Decl, args: &'a [Type]) -> Result<Self> {
        if decl.type_params.len() != args.len() {
            return Err(CuegenError::TypeArgCount {
                decl: decl.name.clone(),
                expected: decl.type_params.len(),
                actual: args.len(),
            });
        }
        Ok(Self { decl, args })
    }

    /// Replace every reference to this declaration's type parameters
    pub fn apply(&self, typ: &Type) -> Result<Type> {
        Ok(match typ {
            Type::TypeParameter(param) if param.decl_id == self.decl.id => self
                .args
                .get(param.param_idx)
                .cloned()
                .ok_or_else(|| CuegenError::UnboundTypeParam {
                    decl: self.decl.name.clone(),
                    index: param.param_idx,
                })?,
            Type::TypeParameter(_) | Type::Builtin(_) => typ.clone(),
            Type::Named(named) => Type::Named(Named {
                id: named.id,
                type_arguments: named
                    .type_arguments
                    .iter()
                    .map(|arg| self.apply(arg))
                    .collect::<Result<_>>()?,
            }),
            Type::Struct(s) => {
                let mut fields = Vec::with_capacity(s.fields.len());
                for field in &s.fields {
                    let mut field = field.clone();
                    field.typ = self.apply(&field.typ)?;
                    fields.push(field);
                }
                Type::Struct(Struct { fields })
            }
            Type::Map(m) => Type::Map(MapType {
                key: Box::new(self.apply(&m.key)?),
                value: Box::new(self.apply(&m.value)?),
            }),
            Type::List(l) => Type::List(ListType {
                elem: Box::new(self.apply(&l.elem)?),
            }),
            Type::Config(c) => Type::Config(ConfigValue {
                elem: Box::new(self.apply(&c.elem)?),
            }),
        })
    }
}

/// Resolve a reference one level: the declaration body with the reference's
/// type arguments substituted in
pub fn instantiate(registry: &DeclRegistry, named: &Named) -> Result<Type> {
    let decl = registry.get(named.id)?;
    if decl.type_params.is_empty() && named.type_arguments.is_empty() {
        return Ok(decl.typ.clone());
    }
    Bindings::new(decl, &named.type_arguments)?.apply(&decl.typ)
}

/// Resolve a type until it is no longer a reference
pub fn concrete_type(registry: &DeclRegistry, typ: &Type, bindings: Option<Bindings<'_>>) -> Result<Type> {
    let mut current = match bindings {
        Some(b) => b.apply(typ)?,
        None => typ.clone(),
    };
    while let Type::Named(named) = &current {
        current = instantiate(registry, named)?;
    }
    Ok(current)
}

/// Resolve a config load to the record whose fields become the document
pub fn concrete_struct_type(registry: &DeclRegistry, typ: &Type, bindings: Option<Bindings<'_>>) -> Result<Struct> {
    match concrete_type(registry, typ, bindings)? {
        Type::Struct(s) => Ok(s),
        _ => {
            let name = match typ {
                Type::Named(named) => registry.get(named.id)?.name.clone(),
                other => other.to_string(),
            };
            Err(CuegenError::NotAStruct { name })
        }
    }
}
