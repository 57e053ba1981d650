//! Structural Schema Walk
//!
//! Depth-first traversal that follows references into their (instantiated)
//! declarations. A reference reached twice is walked twice; the visitor sees
//! every occurrence, which is what usage counting needs.

use super::resolve::instantiate;
use super::{Builtin, ConfigValue, DeclRegistry, Field, ListType, MapType, Named, Struct, Type, TypeParameterRef};
use crate::error::Result;

/// A node handed to the visitor
#[derive(Debug, Clone, Copy)]
pub enum Node<'a> {
    Named(&'a Named),
    Struct(&'a Struct),
    Field(&'a Field),
    Map(&'a MapType),
    List(&'a ListType),
    Builtin(Builtin),
    Config(&'a ConfigValue),
    TypeParameter(&'a TypeParameterRef),
}

/// Walk `root`, calling `visit` once per node encountered (repeats included).
///
/// The first error returned by the visitor or by resolution stops the walk.
pub fn walk<F>(registry: &DeclRegistry, root: &Type, visit: &mut F) -> Result<()>
where
    F: FnMut(Node<'_>) -> Result<()>,
{
    match root {
        Type::Named(named) => {
            visit(Node::Named(named))?;
            let body = instantiate(registry, named)?;
            walk(registry, &body, visit)
        }
        Type::Struct(s) => {
            visit(Node::Struct(s))?;
            for field in &s.fields {
                visit(Node::Field(field))?;
                walk(registry, &field.typ, visit)?;
            }
            Ok(())
        }
        Type::Map(m) => {
            visit(Node::Map(m))?;
            walk(registry, &m.key, visit)?;
            walk(registry, &m.value, visit)
        }
        Type::List(l) => {
            visit(Node::List(l))?;
            walk(registry, &l.elem, visit)
        }
        Type::Builtin(b) => visit(Node::Builtin(*b)),
        Type::Config(c) => {
            visit(Node::Config(c))?;
            walk(registry, &c.elem, visit)
        }
        Type::TypeParameter(p) => visit(Node::TypeParameter(p)),
    }
}
