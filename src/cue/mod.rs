//! CUE Document Model
//!
//! Syntax tree, printer and expression parser for the generated documents.

pub mod ast;
pub mod parser;
pub mod printer;

pub use ast::{
    BinOp, CommentGroup, Expr, Field, File, ImportSpec, Label, ListLit, Lit, LitKind, StructLit, UnaryOp,
};
pub use parser::{parse_expr, ParseError};
pub use printer::{format_expr, format_file};
