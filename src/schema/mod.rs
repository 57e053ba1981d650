//! Service Type Schema
//!
//! The typed description of declarations and config loads produced by the
//! parsing front end. Generation consumes it read-only.
//!
//! ## Wire format
//!
//! ```json
//! {
//!   "decls": [
//!     { "id": 1, "name": "Retry", "loc": { "pkg_path": "app/svc", "pkg_name": "svc" },
//!       "type": { "struct": { "fields": [
//!         { "name": "Count", "type": { "builtin": "INT" } }
//!       ] } } }
//!   ],
//!   "services": [
//!     { "name": "svc", "config_loads": [ { "named": { "id": 1 } } ] }
//!   ]
//! }
//! ```

pub mod registry;
pub mod resolve;
pub mod walk;

pub use registry::DeclRegistry;
pub use resolve::{concrete_struct_type, concrete_type, instantiate, Bindings};
pub use walk::{walk, Node};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a declaration in the registry
pub type DeclId = u32;

// =============================================================================
// Types
// =============================================================================

/// A schema type.
///
/// Closed over the kinds the front end can produce; translation matches it
/// exhaustively.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Type {
    /// Reference to a declared type
    Named(Named),
    /// Inline record type
    Struct(Struct),
    Map(MapType),
    List(ListType),
    Builtin(Builtin),
    /// `config.Value[T]` style wrapper, invisible in the generated document
    Config(ConfigValue),
    /// Reference to a type parameter of the enclosing generic declaration
    TypeParameter(TypeParameterRef),
}

/// Reference to a declaration, with type arguments for generic declarations
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Named {
    pub id: DeclId,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub type_arguments: Vec<Type>,
}

impl Named {
    pub fn new(id: DeclId) -> Self {
        Self { id, type_arguments: Vec::new() }
    }

    pub fn with_args(id: DeclId, type_arguments: Vec<Type>) -> Self {
        Self { id, type_arguments }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Struct {
    #[serde(default)]
    pub fields: Vec<Field>,
}

/// A field of a record type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub typ: Type,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub doc: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

impl Field {
    pub fn new(name: impl Into<String>, typ: Type) -> Self {
        Self {
            name: name.into(),
            typ,
            doc: String::new(),
            tags: Vec::new(),
        }
    }

    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = doc.into();
        self
    }

    pub fn with_tag(mut self, tag: Tag) -> Self {
        self.tags.push(tag);
        self
    }
}

/// A parsed struct tag, e.g. `json:"port,omitempty"` is
/// `{ key: "json", name: "port", options: ["omitempty"] }`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

impl Tag {
    pub fn new(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            options: Vec::new(),
        }
    }

    pub fn with_option(mut self, option: impl Into<String>) -> Self {
        self.options.push(option.into());
        self
    }

    pub fn has_option(&self, option: &str) -> bool {
        self.options.iter().any(|o| o == option)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MapType {
    pub key: Box<Type>,
    pub value: Box<Type>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListType {
    pub elem: Box<Type>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConfigValue {
    pub elem: Box<Type>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeParameterRef {
    pub decl_id: DeclId,
    pub param_idx: usize,
}

/// Builtin primitive kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Builtin {
    Any,
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Float32,
    Float64,
    String,
    Bytes,
    Time,
    Uuid,
    Json,
    UserId,
    Int,
    Uint,
}

impl Builtin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::Bool => "bool",
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Uint8 => "uint8",
            Self::Uint16 => "uint16",
            Self::Uint32 => "uint32",
            Self::Uint64 => "uint64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::String => "string",
            Self::Bytes => "bytes",
            Self::Time => "time",
            Self::Uuid => "uuid",
            Self::Json => "json",
            Self::UserId => "user_id",
            Self::Int => "int",
            Self::Uint => "uint",
        }
    }
}

// Convenience constructors, mostly for tests and fixtures
impl Type {
    pub fn named(id: DeclId) -> Self {
        Type::Named(Named::new(id))
    }

    pub fn builtin(b: Builtin) -> Self {
        Type::Builtin(b)
    }

    pub fn list(elem: Type) -> Self {
        Type::List(ListType { elem: Box::new(elem) })
    }

    pub fn map(key: Type, value: Type) -> Self {
        Type::Map(MapType {
            key: Box::new(key),
            value: Box::new(value),
        })
    }

    pub fn config(elem: Type) -> Self {
        Type::Config(ConfigValue { elem: Box::new(elem) })
    }

    pub fn record(fields: Vec<Field>) -> Self {
        Type::Struct(Struct { fields })
    }

    pub fn type_param(decl_id: DeclId, param_idx: usize) -> Self {
        Type::TypeParameter(TypeParameterRef { decl_id, param_idx })
    }
}

/// Compact signature used in log messages and ordering keys
impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Named(named) => {
                write!(f, "decl#{}", named.id)?;
                if !named.type_arguments.is_empty() {
                    write!(f, "[")?;
                    for (i, arg) in named.type_arguments.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{}", arg)?;
                    }
                    write!(f, "]")?;
                }
                Ok(())
            }
            Type::Struct(s) => {
                write!(f, "struct{{")?;
                for (i, field) in s.fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{} {}", field.name, field.typ)?;
                }
                write!(f, "}}")
            }
            Type::Map(m) => write!(f, "map[{}]{}", m.key, m.value),
            Type::List(l) => write!(f, "[]{}", l.elem),
            Type::Builtin(b) => write!(f, "{}", b.as_str()),
            Type::Config(c) => write!(f, "config.Value[{}]", c.elem),
            Type::TypeParameter(p) => write!(f, "T{}@{}", p.param_idx, p.decl_id),
        }
    }
}

// =============================================================================
// Declarations
// =============================================================================

/// A declared (named) type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decl {
    pub id: DeclId,
    pub name: String,
    #[serde(rename = "type")]
    pub typ: Type,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub type_params: Vec<TypeParam>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub doc: String,
    #[serde(default)]
    pub loc: Loc,
}

impl Decl {
    pub fn new(id: DeclId, name: impl Into<String>, typ: Type) -> Self {
        Self {
            id,
            name: name.into(),
            typ,
            type_params: Vec::new(),
            doc: String::new(),
            loc: Loc::default(),
        }
    }

    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = doc.into();
        self
    }

    pub fn with_type_params(mut self, names: &[&str]) -> Self {
        self.type_params = names
            .iter()
            .map(|n| TypeParam { name: n.to_string() })
            .collect();
        self
    }

    pub fn in_package(mut self, pkg_path: impl Into<String>, pkg_name: impl Into<String>) -> Self {
        self.loc = Loc {
            pkg_path: pkg_path.into(),
            pkg_name: pkg_name.into(),
        };
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeParam {
    pub name: String,
}

/// Where a declaration lives
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loc {
    #[serde(default)]
    pub pkg_path: String,
    #[serde(default)]
    pub pkg_name: String,
}

// =============================================================================
// Services
// =============================================================================

/// A service and the types it loads as configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub name: String,
    /// One entry per `config.Load[T]()` call, in source order
    #[serde(default)]
    pub config_loads: Vec<Type>,
}

impl Service {
    pub fn new(name: impl Into<String>, config_loads: Vec<Type>) -> Self {
        Self {
            name: name.into(),
            config_loads,
        }
    }
}

/// Everything the front end hands over
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    #[serde(default)]
    pub decls: Vec<Decl>,
    #[serde(default)]
    pub services: Vec<Service>,
}

impl Meta {
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_meta() {
        let json = r#"{
            "decls": [
                { "id": 1, "name": "Config",
                  "type": { "struct": { "fields": [
                    { "name": "Port", "type": { "builtin": "INT" },
                      "tags": [{ "key": "json", "name": "port", "options": ["omitempty"] }] },
                    { "name": "Owner", "type": { "builtin": "USER_ID" } }
                  ] } } }
            ],
            "services": [{ "name": "svc", "config_loads": [{ "named": { "id": 1 } }] }]
        }"#;
        let meta = Meta::from_json(json).unwrap();
        assert_eq!(meta.decls.len(), 1);
        assert_eq!(meta.services[0].config_loads, vec![Type::named(1)]);

        let Type::Struct(s) = &meta.decls[0].typ else {
            panic!("expected struct, got {:?}", meta.decls[0].typ);
        };
        assert_eq!(s.fields[0].tags[0].name, "port");
        assert!(s.fields[0].tags[0].has_option("omitempty"));
        assert_eq!(s.fields[1].typ, Type::builtin(Builtin::UserId));
    }

    #[test]
    fn test_unknown_builtin_rejected() {
        let json = r#"{ "decls": [{ "id": 1, "name": "X", "type": { "builtin": "DECIMAL" } }] }"#;
        assert!(Meta::from_json(json).is_err());
    }

    #[test]
    fn test_type_display() {
        let t = Type::Named(Named::with_args(
            3,
            vec![Type::list(Type::builtin(Builtin::String))],
        ));
        assert_eq!(t.to_string(), "decl#3[[]string]");
    }
}
