//! CUE Printer
//!
//! Renders a syntax tree to text in `cue fmt` style: tab indentation,
//! aligned values for runs of single-line fields, blank lines before new
//! sections, and parentheses wherever operator precedence requires them.

use super::ast::{is_valid_ident, quote, BinOp, CommentGroup, Expr, Field, File, Label};

/// Render a whole file
pub fn format_file(file: &File, indent: &str) -> String {
    let printer = Printer { indent };
    let mut out = String::new();

    if let Some(header) = &file.header {
        printer.comments(&mut out, header, 0);
        out.push('\n');
    }

    out.push_str("package ");
    out.push_str(&file.package);
    out.push('\n');

    match file.imports.as_slice() {
        [] => {}
        [single] => {
            out.push_str("\nimport ");
            out.push_str(&import_line(single.alias.as_deref(), &single.path));
            out.push('\n');
        }
        many => {
            out.push_str("\nimport (\n");
            for spec in many {
                out.push_str(indent);
                out.push_str(&import_line(spec.alias.as_deref(), &spec.path));
                out.push('\n');
            }
            out.push_str(")\n");
        }
    }

    if !file.decls.is_empty() {
        out.push('\n');
        printer.fields(&mut out, &file.decls, 0);
    }

    out
}

/// Render a single expression using tab indentation
pub fn format_expr(expr: &Expr) -> String {
    Printer { indent: "\t" }.expr(expr, 0)
}

fn import_line(alias: Option<&str>, path: &str) -> String {
    match alias {
        Some(alias) => format!("{} {}", alias, quote(path)),
        None => quote(path),
    }
}

struct Printer<'a> {
    indent: &'a str,
}

impl Printer<'_> {
    fn pad(&self, out: &mut String, depth: usize) {
        for _ in 0..depth {
            out.push_str(self.indent);
        }
    }

    fn comments(&self, out: &mut String, group: &CommentGroup, depth: usize) {
        for line in &group.lines {
            self.pad(out, depth);
            if line.is_empty() {
                out.push_str("//\n");
            } else {
                out.push_str("// ");
                out.push_str(line);
                out.push('\n');
            }
        }
    }

    fn fields(&self, out: &mut String, fields: &[Field], depth: usize) {
        let labels: Vec<String> = fields.iter().map(|f| self.label(f)).collect();
        let values: Vec<String> = fields.iter().map(|f| self.expr(&f.value, depth)).collect();

        // Alignment runs: a field joins the previous run when both render on
        // one line and nothing (comment, section break) sits between them.
        let mut widths = vec![0usize; fields.len()];
        let mut run_start = 0;
        for i in 0..=fields.len() {
            let continues = i < fields.len()
                && i > 0
                && !fields[i].new_section
                && fields[i].comments.is_none()
                && !values[i].contains('\n')
                && !values[i - 1].contains('\n');
            if !continues && i > 0 {
                let width = labels[run_start..i].iter().map(|l| l.chars().count()).max().unwrap_or(0);
                for w in &mut widths[run_start..i] {
                    *w = width;
                }
                run_start = i;
            }
        }

        for (i, field) in fields.iter().enumerate() {
            if i > 0 && field.new_section {
                out.push('\n');
            }
            if let Some(group) = &field.comments {
                self.comments(out, group, depth);
            }
            self.pad(out, depth);
            out.push_str(&labels[i]);
            let gap = widths[i].saturating_sub(labels[i].chars().count()) + 1;
            out.extend(std::iter::repeat(' ').take(gap));
            out.push_str(&values[i]);
            out.push('\n');
        }
    }

    fn label(&self, field: &Field) -> String {
        let mut label = match &field.label {
            Label::Name(name) if is_valid_ident(name) => name.clone(),
            Label::Name(name) => quote(name),
            Label::Pattern(expr) => format!("[{}]", self.expr(expr, 0)),
        };
        if field.optional {
            label.push('?');
        }
        label.push(':');
        label
    }

    fn expr(&self, expr: &Expr, depth: usize) -> String {
        match expr {
            Expr::Ident(name) => name.clone(),
            Expr::Lit(lit) => lit.raw.clone(),
            Expr::Selector { x, sel } => format!("{}.{}", self.operand(x, depth), sel),
            Expr::Struct(s) if s.fields.is_empty() => "{}".to_string(),
            Expr::Struct(s) => {
                let mut out = String::from("{\n");
                self.fields(&mut out, &s.fields, depth + 1);
                self.pad(&mut out, depth);
                out.push('}');
                out
            }
            Expr::List(list) => {
                let elems: Vec<String> = list.elems.iter().map(|e| self.expr(e, depth)).collect();
                format!("[{}]", elems.join(", "))
            }
            Expr::Binary { op, x, y } => {
                let prec = op.precedence();
                let left = match x.as_ref() {
                    Expr::Binary { op: inner, .. } if inner.precedence() < prec => {
                        format!("({})", self.expr(x, depth))
                    }
                    _ => self.expr(x, depth),
                };
                let right = match y.as_ref() {
                    // Unification and disjunction are associative
                    Expr::Binary { op: inner, .. }
                        if inner.precedence() < prec
                            || (inner.precedence() == prec && !matches!(op, BinOp::And | BinOp::Or)) =>
                    {
                        format!("({})", self.expr(y, depth))
                    }
                    _ => self.expr(y, depth),
                };
                format!("{} {} {}", left, op.as_str(), right)
            }
            Expr::Unary { op, x } => format!("{}{}", op.as_str(), self.operand(x, depth)),
            Expr::Paren(inner) => format!("({})", self.expr(inner, depth)),
            Expr::Call { fun, args } => {
                let args: Vec<String> = args.iter().map(|a| self.expr(a, depth)).collect();
                format!("{}({})", self.operand(fun, depth), args.join(", "))
            }
            Expr::Index { x, index } => format!("{}[{}]", self.operand(x, depth), self.expr(index, depth)),
            Expr::Ellipsis(None) => "...".to_string(),
            Expr::Ellipsis(Some(elem)) => format!("...{}", self.operand(elem, depth)),
        }
    }

    /// Operands of unary/postfix forms need parentheses around binaries
    fn operand(&self, expr: &Expr, depth: usize) -> String {
        match expr {
            Expr::Binary { .. } => format!("({})", self.expr(expr, depth)),
            _ => self.expr(expr, depth),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cue::ast::{ImportSpec, Lit, LitKind, UnaryOp};

    fn field(name: &str, value: Expr) -> Field {
        Field::new(Label::name(name), value)
    }

    #[test]
    fn test_format_expr_forms() {
        assert_eq!(format_expr(&Expr::open_list(Expr::ident("string"))), "[...string]");
        assert_eq!(
            format_expr(&Expr::pattern_struct(Expr::ident("string"), Expr::ident("int"))),
            "{\n\t[string]: int\n}"
        );
        assert_eq!(format_expr(&Expr::selector(Expr::ident("time"), "Time")), "time.Time");
        assert_eq!(
            format_expr(&Expr::unary(UnaryOp::Gte, Expr::Lit(Lit::new(LitKind::Int, "1")))),
            ">=1"
        );
    }

    #[test]
    fn test_precedence_parens() {
        let or = Expr::binary(BinOp::Or, Expr::ident("a"), Expr::ident("b"));
        let and = Expr::and(Expr::ident("int"), or.clone());
        assert_eq!(format_expr(&and), "int & (a | b)");

        let chained = Expr::and(Expr::and(Expr::ident("a"), Expr::ident("b")), Expr::ident("c"));
        assert_eq!(format_expr(&chained), "a & b & c");

        let or_of_and = Expr::binary(BinOp::Or, Expr::and(Expr::ident("a"), Expr::ident("b")), Expr::ident("c"));
        assert_eq!(format_expr(&or_of_and), "a & b | c");

        let nested_right = Expr::and(Expr::ident("a"), Expr::and(Expr::ident("b"), Expr::ident("c")));
        assert_eq!(format_expr(&nested_right), "a & b & c");

        let sub = Expr::binary(BinOp::Sub, Expr::ident("a"), Expr::binary(BinOp::Sub, Expr::ident("b"), Expr::ident("c")));
        assert_eq!(format_expr(&sub), "a - (b - c)");
    }

    #[test]
    fn test_alignment_and_sections() {
        let mut name = field("name", Expr::ident("string"));
        name.optional = true;
        let mut documented = field("retries", Expr::ident("int"));
        documented.comments = Some(CommentGroup::new(vec!["How often".into()]));
        let mut sectioned = field("#Def", Expr::ident("bool"));
        sectioned.new_section = true;

        let file = File {
            header: None,
            package: "svc".into(),
            imports: vec![],
            decls: vec![field("port", Expr::ident("int")), name, documented, sectioned],
        };

        assert_eq!(
            format_file(&file, "\t"),
            "package svc\n\nport:  int\nname?: string\n// How often\nretries: int\n\n#Def: bool\n"
        );
    }

    #[test]
    fn test_nested_struct_indentation() {
        let inner = Expr::Struct(crate::cue::StructLit {
            fields: vec![field("Count", Expr::ident("int")), field("max-wait", Expr::ident("string"))],
        });
        let file = File {
            header: Some(CommentGroup::new(vec!["Generated.".into(), String::new()])),
            package: "svc".into(),
            imports: vec![ImportSpec::new("time", "time")],
            decls: vec![field("retry", inner)],
        };
        assert_eq!(
            format_file(&file, "\t"),
            "// Generated.\n//\n\npackage svc\n\nimport \"time\"\n\nretry: {\n\tCount:      int\n\t\"max-wait\": string\n}\n"
        );
    }

    #[test]
    fn test_multiple_imports() {
        let file = File {
            header: None,
            package: "svc".into(),
            imports: vec![ImportSpec::new("strings", "strings"), ImportSpec::new("time", "t")],
            decls: vec![],
        };
        assert_eq!(
            format_file(&file, "  "),
            "package svc\n\nimport (\n  \"strings\"\n  t \"time\"\n)\n"
        );
    }
}
