//! CUE syntax tree
//!
//! Only the subset the generator builds or the annotation parser accepts.
//! Nodes carry no source positions, so derived `PartialEq` is structural
//! equality over the tree.

use regex::Regex;
use std::sync::OnceLock;

// =============================================================================
// Expressions
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `string`, `#Retry`, `_`
    Ident(String),
    Lit(Lit),
    /// `time.Time`
    Selector { x: Box<Expr>, sel: String },
    Struct(StructLit),
    List(ListLit),
    Binary { op: BinOp, x: Box<Expr>, y: Box<Expr> },
    /// `>=10`, `=~"^a"`, `-1`, `*"default"`
    Unary { op: UnaryOp, x: Box<Expr> },
    Paren(Box<Expr>),
    Call { fun: Box<Expr>, args: Vec<Expr> },
    Index { x: Box<Expr>, index: Box<Expr> },
    /// `...T`, only meaningful as the last list element
    Ellipsis(Option<Box<Expr>>),
}

impl Expr {
    pub fn ident(name: impl Into<String>) -> Self {
        Expr::Ident(name.into())
    }

    pub fn selector(x: Expr, sel: impl Into<String>) -> Self {
        Expr::Selector {
            x: Box::new(x),
            sel: sel.into(),
        }
    }

    /// `x & y`
    pub fn and(x: Expr, y: Expr) -> Self {
        Expr::binary(BinOp::And, x, y)
    }

    pub fn binary(op: BinOp, x: Expr, y: Expr) -> Self {
        Expr::Binary {
            op,
            x: Box::new(x),
            y: Box::new(y),
        }
    }

    pub fn unary(op: UnaryOp, x: Expr) -> Self {
        Expr::Unary { op, x: Box::new(x) }
    }

    /// `[...elem]`
    pub fn open_list(elem: Expr) -> Self {
        Expr::List(ListLit {
            elems: vec![Expr::Ellipsis(Some(Box::new(elem)))],
        })
    }

    /// `{[key]: value}`
    pub fn pattern_struct(key: Expr, value: Expr) -> Self {
        Expr::Struct(StructLit {
            fields: vec![Field::new(Label::Pattern(Box::new(key)), value)],
        })
    }

    pub fn string_lit(value: &str) -> Self {
        Expr::Lit(Lit::string(value))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Lit {
    pub kind: LitKind,
    /// Source text, quotes included for strings
    pub raw: String,
}

impl Lit {
    pub fn new(kind: LitKind, raw: impl Into<String>) -> Self {
        Self { kind, raw: raw.into() }
    }

    /// Double-quoted string literal with escaping
    pub fn string(value: &str) -> Self {
        Self::new(LitKind::String, quote(value))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LitKind {
    Int,
    Float,
    String,
    Bytes,
    Bool,
    Null,
    /// `_|_`
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Or,
    And,
    LogicalOr,
    LogicalAnd,
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    Match,
    NotMatch,
    Add,
    Sub,
    Mul,
    Div,
}

impl BinOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Or => "|",
            Self::And => "&",
            Self::LogicalOr => "||",
            Self::LogicalAnd => "&&",
            Self::Eq => "==",
            Self::Neq => "!=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Match => "=~",
            Self::NotMatch => "!~",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
        }
    }

    /// Binding strength; higher binds tighter
    pub fn precedence(&self) -> u8 {
        match self {
            Self::Or => 1,
            Self::And => 2,
            Self::LogicalOr => 3,
            Self::LogicalAnd => 4,
            Self::Eq | Self::Neq | Self::Lt | Self::Lte | Self::Gt | Self::Gte | Self::Match | Self::NotMatch => 5,
            Self::Add | Self::Sub => 6,
            Self::Mul | Self::Div => 7,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Pos,
    Not,
    /// Default marker `*`
    Default,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    Match,
    NotMatch,
}

impl UnaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Neg => "-",
            Self::Pos => "+",
            Self::Not => "!",
            Self::Default => "*",
            Self::Neq => "!=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Match => "=~",
            Self::NotMatch => "!~",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListLit {
    pub elems: Vec<Expr>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructLit {
    pub fields: Vec<Field>,
}

// =============================================================================
// Fields
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Label {
    /// Identifier, or a quoted string when not a valid identifier
    Name(String),
    /// `[K]` pattern constraint
    Pattern(Box<Expr>),
}

impl Label {
    pub fn name(name: impl Into<String>) -> Self {
        Label::Name(name.into())
    }

    /// The label as a lookup key, `None` for patterns
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Label::Name(name) => Some(name),
            Label::Pattern(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub label: Label,
    /// Rendered as `label?:`
    pub optional: bool,
    pub value: Expr,
    /// Doc comment rendered above the field
    pub comments: Option<CommentGroup>,
    /// Start a new section (blank line) before this field
    pub new_section: bool,
}

impl Field {
    pub fn new(label: Label, value: Expr) -> Self {
        Self {
            label,
            optional: false,
            value,
            comments: None,
            new_section: false,
        }
    }
}

/// Comment lines without their `//` marker
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentGroup {
    pub lines: Vec<String>,
}

impl CommentGroup {
    pub fn new(lines: Vec<String>) -> Self {
        Self { lines }
    }

    /// Split a doc string into comment lines; `None` when blank
    pub fn from_doc(doc: &str) -> Option<Self> {
        let doc = doc.trim();
        if doc.is_empty() {
            return None;
        }
        Some(Self {
            lines: doc.lines().map(|l| l.trim_end().to_string()).collect(),
        })
    }

    pub fn contains(&self, line: &str) -> bool {
        self.lines.iter().any(|l| l == line)
    }

    pub fn is_multiline(&self) -> bool {
        self.lines.len() > 1
    }
}

// =============================================================================
// Files
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSpec {
    /// Set only when the local name differs from the path's natural name
    pub alias: Option<String>,
    pub path: String,
}

impl ImportSpec {
    pub fn new(path: impl Into<String>, local_name: &str) -> Self {
        let path = path.into();
        let alias = (natural_name(&path) != local_name).then(|| local_name.to_string());
        Self { alias, path }
    }
}

/// Last path element, the name an unaliased import binds
pub fn natural_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct File {
    /// Comment block before the package clause
    pub header: Option<CommentGroup>,
    pub package: String,
    pub imports: Vec<ImportSpec>,
    pub decls: Vec<Field>,
}

// =============================================================================
// Identifiers
// =============================================================================

fn ident_regex() -> &'static Regex {
    static IDENT: OnceLock<Regex> = OnceLock::new();
    IDENT.get_or_init(|| Regex::new(r"^[#_]*[A-Za-z_$][A-Za-z0-9_$]*$").unwrap())
}

const KEYWORDS: &[&str] = &["package", "import", "for", "in", "if", "let", "true", "false", "null"];

/// Whether `name` can be written as a bare label
pub fn is_valid_ident(name: &str) -> bool {
    ident_regex().is_match(name) && !KEYWORDS.contains(&name)
}

/// Double-quote a string the way CUE string literals are written
pub fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ident_validity() {
        assert!(is_valid_ident("port"));
        assert!(is_valid_ident("#Retry"));
        assert!(is_valid_ident("_hidden"));
        assert!(is_valid_ident("MaxConns2"));
        assert!(!is_valid_ident("max-conns"));
        assert!(!is_valid_ident("2fast"));
        assert!(!is_valid_ident("import"));
        assert!(!is_valid_ident(""));
    }

    #[test]
    fn test_comment_group_from_doc() {
        let cg = CommentGroup::from_doc("  First line.  \nSecond line.\n").unwrap();
        assert_eq!(cg.lines, vec!["First line.", "Second line."]);
        assert!(cg.is_multiline());
        assert!(CommentGroup::from_doc("   \n").is_none());
    }

    #[test]
    fn test_import_alias_only_when_needed() {
        assert_eq!(ImportSpec::new("time", "time").alias, None);
        assert_eq!(ImportSpec::new("encoding/json", "json").alias, None);
        assert_eq!(ImportSpec::new("encoding/json", "enc").alias.as_deref(), Some("enc"));
    }

    #[test]
    fn test_structural_equality() {
        let a = Expr::and(Expr::ident("string"), Expr::ident("#Name"));
        let b = Expr::and(Expr::ident("string"), Expr::ident("#Name"));
        assert_eq!(a, b);
        assert_ne!(a, Expr::and(Expr::ident("#Name"), Expr::ident("string")));
    }
}
