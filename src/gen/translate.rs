//! Schema Type to CUE Translation
//!
//! Recursive structural mapping from schema types to CUE expressions. Named
//! types used once are inlined; types used more than once become references
//! to their hoisted `#Definition`.

use tracing::trace;

use super::fields::build_field;
use super::usage::UsageTable;
use crate::config::GeneratorConfig;
use crate::cue::{Expr, Field as CueField, StructLit};
use crate::error::{CuegenError, Result};
use crate::schema::{concrete_type, Builtin, DeclRegistry, Struct, Type};

/// Translator for one service; the usage table is frozen before it is built
pub struct Translator<'a> {
    registry: &'a DeclRegistry,
    usage: &'a UsageTable,
    config: &'a GeneratorConfig,
}

impl<'a> Translator<'a> {
    pub fn new(registry: &'a DeclRegistry, usage: &'a UsageTable, config: &'a GeneratorConfig) -> Self {
        Self { registry, usage, config }
    }

    /// Translate a type to the expression used as a field value
    pub fn to_cue(&self, typ: &Type) -> Result<Expr> {
        match typ {
            Type::Named(named) => {
                if self.usage.count(named) <= 1 {
                    trace!(decl = named.id, "inlining named type");
                    let concrete = concrete_type(self.registry, typ, None)?;
                    self.to_cue(&concrete)
                } else {
                    let ident = self.usage.ident(named).ok_or_else(|| {
                        CuegenError::Internal(format!("hoisted type {} has no definition name", typ))
                    })?;
                    Ok(Expr::ident(ident))
                }
            }
            Type::Struct(s) => Ok(Expr::Struct(StructLit {
                fields: self.struct_fields(s)?,
            })),
            Type::Map(m) => Ok(Expr::pattern_struct(self.to_cue(&m.key)?, self.to_cue(&m.value)?)),
            Type::List(l) => Ok(Expr::open_list(self.to_cue(&l.elem)?)),
            Type::Builtin(b) => Ok(builtin_to_cue(*b)),
            // The wrapper is invisible in the document
            Type::Config(c) => self.to_cue(&c.elem),
            Type::TypeParameter(p) => Err(CuegenError::Internal(format!(
                "unsubstituted type parameter {} of declaration {}",
                p.param_idx, p.decl_id
            ))),
        }
    }

    /// Fields of a record, in declaration order
    pub fn struct_fields(&self, s: &Struct) -> Result<Vec<CueField>> {
        s.fields
            .iter()
            .map(|field| build_field(field, self.to_cue(&field.typ)?, self.config))
            .collect()
    }
}

/// Fixed builtin vocabulary shared with hand-written CUE files
pub fn builtin_to_cue(builtin: Builtin) -> Expr {
    match builtin {
        Builtin::Any => Expr::ident("_"),
        Builtin::Bool => Expr::ident("bool"),
        Builtin::Int8 => Expr::ident("int8"),
        Builtin::Int16 => Expr::ident("int16"),
        Builtin::Int32 => Expr::ident("int32"),
        Builtin::Int64 => Expr::ident("int64"),
        Builtin::Uint8 => Expr::ident("uint8"),
        Builtin::Uint16 => Expr::ident("uint16"),
        Builtin::Uint32 => Expr::ident("uint32"),
        Builtin::Uint64 => Expr::ident("uint64"),
        Builtin::Float32 => Expr::ident("float32"),
        Builtin::Float64 => Expr::ident("float64"),
        Builtin::String => Expr::ident("string"),
        Builtin::Bytes => Expr::ident("bytes"),
        Builtin::Time => Expr::selector(Expr::ident("time"), "Time"),
        Builtin::Uuid => Expr::ident("string"),
        Builtin::Json => Expr::ident("string"),
        Builtin::UserId => Expr::ident("string"),
        Builtin::Int => Expr::ident("int"),
        Builtin::Uint => Expr::ident("uint"),
    }
}
