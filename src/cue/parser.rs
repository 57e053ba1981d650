//! Annotation Expression Parser
//!
//! Parses the CUE expression fragments authors attach to fields with the
//! annotation tag, e.g. `cue:">=1 & <=100"` or `cue:"=~\"^[a-z]+$\""`.
//! Covers CUE's expression grammar minus comprehensions, interpolation and
//! multi-line strings.

use thiserror::Error;

use super::ast::{BinOp, Expr, Field, Label, ListLit, Lit, LitKind, StructLit, UnaryOp};

/// A fragment failed to parse
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("at offset {offset}: {message}")]
pub struct ParseError {
    /// Byte offset into the fragment
    pub offset: usize,
    pub message: String,
}

impl ParseError {
    fn new(offset: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }
}

/// Parse a complete expression; trailing input is an error
pub fn parse_expr(src: &str) -> Result<Expr, ParseError> {
    let tokens = Lexer::new(src).tokenize()?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.expr()?;
    match parser.peek() {
        Tok::Eof => Ok(expr),
        other => Err(ParseError::new(
            parser.offset(),
            format!("unexpected {} after expression", other.describe()),
        )),
    }
}

// =============================================================================
// Lexer
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Ident(String),
    Lit(LitKind, String),
    Op(&'static str),
    Eof,
}

impl Tok {
    fn describe(&self) -> String {
        match self {
            Tok::Ident(name) => format!("identifier {}", name),
            Tok::Lit(_, raw) => format!("literal {}", raw),
            Tok::Op(op) => format!("'{}'", op),
            Tok::Eof => "end of input".to_string(),
        }
    }
}

/// Longest first so that `...` wins over `.` and `<=` over `<`
const OPERATORS: &[&str] = &[
    "...", "&&", "||", "==", "!=", "<=", ">=", "=~", "!~", "&", "|", "<", ">", "!", "+", "-", "*", "/", "(",
    ")", "[", "]", "{", "}", ",", ":", ".", "?",
];

struct Lexer<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn tokenize(mut self) -> Result<Vec<(Tok, usize)>, ParseError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace();
            let start = self.pos;
            let Some(c) = self.rest().chars().next() else {
                tokens.push((Tok::Eof, start));
                return Ok(tokens);
            };

            let tok = if self.rest().starts_with("_|_") {
                self.pos += 3;
                Tok::Lit(LitKind::Bottom, "_|_".to_string())
            } else if c.is_ascii_digit() {
                self.number()
            } else if c == '"' || c == '\'' {
                self.string(0)?
            } else if c == '#' && self.rest()[1..].trim_start_matches('#').starts_with('"') {
                let hashes = self.rest().chars().take_while(|&c| c == '#').count();
                self.string(hashes)?
            } else if c.is_alphabetic() || c == '_' || c == '$' || c == '#' {
                self.word()
            } else if let Some(op) = OPERATORS.iter().find(|op| self.rest().starts_with(**op)) {
                self.pos += op.len();
                Tok::Op(*op)
            } else {
                return Err(ParseError::new(start, format!("unexpected character {:?}", c)));
            };
            tokens.push((tok, start));
        }
    }

    fn skip_whitespace(&mut self) {
        let trimmed = self.rest().trim_start();
        self.pos = self.src.len() - trimmed.len();
    }

    fn word(&mut self) -> Tok {
        let len = self
            .rest()
            .char_indices()
            .find(|&(i, c)| !(c.is_alphanumeric() || c == '_' || c == '$' || (c == '#' && i == 0)))
            .map(|(i, _)| i)
            .unwrap_or(self.rest().len());
        let word = &self.rest()[..len];
        self.pos += len;
        match word {
            "true" | "false" => Tok::Lit(LitKind::Bool, word.to_string()),
            "null" => Tok::Lit(LitKind::Null, word.to_string()),
            _ => Tok::Ident(word.to_string()),
        }
    }

    fn number(&mut self) -> Tok {
        let rest = self.rest();
        let bytes = rest.as_bytes();
        let mut len = 0;
        let mut kind = LitKind::Int;

        let radix_prefix = bytes.len() > 1 && bytes[0] == b'0' && matches!(bytes[1], b'x' | b'X' | b'o' | b'b');
        if radix_prefix {
            len = 2;
            while len < bytes.len() && (bytes[len].is_ascii_hexdigit() || bytes[len] == b'_') {
                len += 1;
            }
        } else {
            let digits = |from: usize| {
                let mut end = from;
                while end < bytes.len() && (bytes[end].is_ascii_digit() || bytes[end] == b'_') {
                    end += 1;
                }
                end
            };
            len = digits(len);
            if len + 1 < bytes.len() && bytes[len] == b'.' && bytes[len + 1].is_ascii_digit() {
                kind = LitKind::Float;
                len = digits(len + 1);
            }
            if len < bytes.len() && matches!(bytes[len], b'e' | b'E') {
                let mut exp = len + 1;
                if exp < bytes.len() && matches!(bytes[exp], b'+' | b'-') {
                    exp += 1;
                }
                if exp < bytes.len() && bytes[exp].is_ascii_digit() {
                    kind = LitKind::Float;
                    len = digits(exp);
                }
            }
            // SI multipliers: 1K, 2Mi, 1.5G
            if len < bytes.len() && matches!(bytes[len], b'K' | b'M' | b'G' | b'T' | b'P') {
                len += 1;
                if len < bytes.len() && bytes[len] == b'i' {
                    len += 1;
                }
                kind = LitKind::Int;
            }
        }

        let raw = rest[..len].to_string();
        self.pos += len;
        Tok::Lit(kind, raw)
    }

    /// Quoted string or bytes; `hashes` > 0 for raw `#"..."#` strings
    fn string(&mut self, hashes: usize) -> Result<Tok, ParseError> {
        let start = self.pos;
        let body_start = start + hashes;
        let quote = self.src[body_start..].chars().next().unwrap_or('"');
        let closing = format!("{}{}", quote, "#".repeat(hashes));

        let mut i = body_start + 1;
        let bytes = self.src.as_bytes();
        while i < bytes.len() {
            if bytes[i] == b'\\' && hashes == 0 {
                i += 2;
                continue;
            }
            if bytes[i] == b'\n' {
                break;
            }
            if bytes[i..].starts_with(closing.as_bytes()) {
                self.pos = i + closing.len();
                let kind = if quote == '\'' { LitKind::Bytes } else { LitKind::String };
                return Ok(Tok::Lit(kind, self.src[start..self.pos].to_string()));
            }
            i += 1;
        }
        Err(ParseError::new(start, "unterminated string literal"))
    }
}

// =============================================================================
// Parser
// =============================================================================

struct Parser {
    tokens: Vec<(Tok, usize)>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Tok {
        static EOF: Tok = Tok::Eof;
        self.tokens.get(self.pos).map(|(t, _)| t).unwrap_or(&EOF)
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|(_, o)| *o)
            .unwrap_or(0)
    }

    fn bump(&mut self) -> Tok {
        let tok = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, op: &str) -> bool {
        if matches!(self.peek(), Tok::Op(o) if *o == op) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, op: &str) -> Result<(), ParseError> {
        if self.eat(op) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{}'", op)))
        }
    }

    fn unexpected(&self, wanted: &str) -> ParseError {
        ParseError::new(
            self.offset(),
            format!("expected {}, found {}", wanted, self.peek().describe()),
        )
    }

    fn expr(&mut self) -> Result<Expr, ParseError> {
        self.binary(1)
    }

    /// Precedence climbing, left associative
    fn binary(&mut self, min_prec: u8) -> Result<Expr, ParseError> {
        let mut lhs = self.unary()?;
        while let Some(op) = self.peek_binop() {
            if op.precedence() < min_prec {
                break;
            }
            self.pos += 1;
            let rhs = self.binary(op.precedence() + 1)?;
            lhs = Expr::binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn peek_binop(&self) -> Option<BinOp> {
        let Tok::Op(op) = self.peek() else {
            return None;
        };
        Some(match *op {
            "|" => BinOp::Or,
            "&" => BinOp::And,
            "||" => BinOp::LogicalOr,
            "&&" => BinOp::LogicalAnd,
            "==" => BinOp::Eq,
            "!=" => BinOp::Neq,
            "<" => BinOp::Lt,
            "<=" => BinOp::Lte,
            ">" => BinOp::Gt,
            ">=" => BinOp::Gte,
            "=~" => BinOp::Match,
            "!~" => BinOp::NotMatch,
            "+" => BinOp::Add,
            "-" => BinOp::Sub,
            "*" => BinOp::Mul,
            "/" => BinOp::Div,
            _ => return None,
        })
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        let op = match self.peek() {
            Tok::Op("-") => UnaryOp::Neg,
            Tok::Op("+") => UnaryOp::Pos,
            Tok::Op("!") => UnaryOp::Not,
            Tok::Op("*") => UnaryOp::Default,
            Tok::Op("!=") => UnaryOp::Neq,
            Tok::Op("<") => UnaryOp::Lt,
            Tok::Op("<=") => UnaryOp::Lte,
            Tok::Op(">") => UnaryOp::Gt,
            Tok::Op(">=") => UnaryOp::Gte,
            Tok::Op("=~") => UnaryOp::Match,
            Tok::Op("!~") => UnaryOp::NotMatch,
            _ => return self.postfix(),
        };
        self.pos += 1;
        Ok(Expr::unary(op, self.unary()?))
    }

    fn postfix(&mut self) -> Result<Expr, ParseError> {
        let mut x = self.operand()?;
        loop {
            if self.eat(".") {
                match self.bump() {
                    Tok::Ident(sel) => x = Expr::selector(x, sel),
                    _ => {
                        self.pos -= 1;
                        return Err(self.unexpected("selector name"));
                    }
                }
            } else if self.eat("(") {
                let mut args = Vec::new();
                while !self.eat(")") {
                    args.push(self.expr()?);
                    if !self.eat(",") {
                        self.expect(")")?;
                        break;
                    }
                }
                x = Expr::Call { fun: Box::new(x), args };
            } else if self.eat("[") {
                let index = self.expr()?;
                self.expect("]")?;
                x = Expr::Index {
                    x: Box::new(x),
                    index: Box::new(index),
                };
            } else {
                return Ok(x);
            }
        }
    }

    fn operand(&mut self) -> Result<Expr, ParseError> {
        match self.peek().clone() {
            Tok::Ident(name) => {
                self.pos += 1;
                Ok(Expr::Ident(name))
            }
            Tok::Lit(kind, raw) => {
                self.pos += 1;
                Ok(Expr::Lit(Lit::new(kind, raw)))
            }
            Tok::Op("(") => {
                self.pos += 1;
                let inner = self.expr()?;
                self.expect(")")?;
                Ok(Expr::Paren(Box::new(inner)))
            }
            Tok::Op("[") => {
                self.pos += 1;
                self.list()
            }
            Tok::Op("{") => {
                self.pos += 1;
                self.struct_lit()
            }
            _ => Err(self.unexpected("expression")),
        }
    }

    /// After `[`
    fn list(&mut self) -> Result<Expr, ParseError> {
        let mut elems = Vec::new();
        while !self.eat("]") {
            if self.eat("...") {
                let elem = match self.peek() {
                    Tok::Op("]") | Tok::Op(",") => None,
                    _ => Some(Box::new(self.unary()?)),
                };
                elems.push(Expr::Ellipsis(elem));
                self.eat(",");
                self.expect("]")?;
                break;
            }
            elems.push(self.expr()?);
            if !self.eat(",") {
                self.expect("]")?;
                break;
            }
        }
        Ok(Expr::List(ListLit { elems }))
    }

    /// After `{`
    fn struct_lit(&mut self) -> Result<Expr, ParseError> {
        let mut fields = Vec::new();
        while !self.eat("}") {
            let label = match self.bump() {
                Tok::Ident(name) => Label::Name(name),
                Tok::Lit(LitKind::String, raw) => Label::Name(unquote(&raw)),
                Tok::Op("[") => {
                    let pattern = self.expr()?;
                    self.expect("]")?;
                    Label::Pattern(Box::new(pattern))
                }
                _ => {
                    self.pos -= 1;
                    return Err(self.unexpected("field label"));
                }
            };
            let optional = self.eat("?");
            self.expect(":")?;
            let mut field = Field::new(label, self.expr()?);
            field.optional = optional;
            fields.push(field);
            self.eat(",");
        }
        Ok(Expr::Struct(StructLit { fields }))
    }
}

/// Label text of a simple double-quoted string
fn unquote(raw: &str) -> String {
    let inner = raw.trim_start_matches('#').trim_end_matches('#');
    let inner = inner.strip_prefix('"').and_then(|s| s.strip_suffix('"')).unwrap_or(inner);
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some(other) => out.push(other),
                None => {}
            }
        } else {
            out.push(c);
        }
    }
    out
}
