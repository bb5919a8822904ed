//! Parsed expression tree, shared by every `Attribute::Expression` and
//! every `Filter` predicate (spec §4.1/§4.2).

use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Concat,
    Mul,
    Div,
    Mod,
    Add,
    Sub,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    /// Null-safe equality for a bare `a IS b` (not `IS NULL`, which is
    /// [`Ast::IsNull`]).
    Is,
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Ast {
    Null,
    Int(i64),
    Float(f64),
    Str(String),
    Ident(String),
    Unary(UnaryOp, Box<Ast>),
    Binary(BinaryOp, Box<Ast>, Box<Ast>),
    /// `expr IS [NOT] NULL`.
    IsNull(Box<Ast>, bool),
    /// `expr [NOT] BETWEEN low AND high`.
    Between(Box<Ast>, Box<Ast>, Box<Ast>, bool),
    /// `expr [NOT] IN (list...)`.
    In(Box<Ast>, Vec<Ast>, bool),
    /// `expr [NOT] LIKE pattern`.
    Like(Box<Ast>, Box<Ast>, bool),
    /// A parenthesized value-list primary `(e, e, …)`, used outside an
    /// `IN`/`NOT IN` tail (e.g. `(1, 2) = (1, 2)`).
    List(Vec<Ast>),
}

/// Collects every identifier referenced anywhere in `ast` (spec §4.1's
/// `identifiers(ast)` requirement — used to compute an `Expression`
/// attribute's direct dependencies).
pub fn identifiers(ast: &Ast) -> HashSet<String> {
    let mut out = HashSet::new();
    collect(ast, &mut out);
    out
}

fn collect(ast: &Ast, out: &mut HashSet<String>) {
    match ast {
        Ast::Null | Ast::Int(_) | Ast::Float(_) | Ast::Str(_) => {}
        Ast::Ident(name) => {
            out.insert(name.clone());
        }
        Ast::Unary(_, inner) => collect(inner, out),
        Ast::Binary(_, lhs, rhs) => {
            collect(lhs, out);
            collect(rhs, out);
        }
        Ast::IsNull(inner, _) => collect(inner, out),
        Ast::Between(expr, low, high, _) => {
            collect(expr, out);
            collect(low, out);
            collect(high, out);
        }
        Ast::In(expr, list, _) => {
            collect(expr, out);
            for item in list {
                collect(item, out);
            }
        }
        Ast::Like(expr, pattern, _) => {
            collect(expr, out);
            collect(pattern, out);
        }
        Ast::List(items) => {
            for item in items {
                collect(item, out);
            }
        }
    }
}

/// Re-emits `ast` as SQL text (spec §4.1 `to_sql()` — used for `--explain`
/// output and diagnostics). Always fully parenthesized; not intended to
/// match the author's original formatting, only to be re-parseable.
pub fn to_sql(ast: &Ast) -> String {
    match ast {
        Ast::Null => "NULL".to_string(),
        Ast::Int(i) => i.to_string(),
        Ast::Float(f) => f.to_string(),
        Ast::Str(s) => format!("'{}'", s.replace('\'', "''")),
        Ast::Ident(name) => name.clone(),
        Ast::Unary(op, inner) => {
            let op_str = match op {
                UnaryOp::Neg => "-",
                UnaryOp::Plus => "+",
                UnaryOp::Not => "NOT ",
            };
            format!("({op_str}{})", to_sql(inner))
        }
        Ast::Binary(op, lhs, rhs) => {
            let op_str = match op {
                BinaryOp::Concat => "||",
                BinaryOp::Mul => "*",
                BinaryOp::Div => "/",
                BinaryOp::Mod => "%",
                BinaryOp::Add => "+",
                BinaryOp::Sub => "-",
                BinaryOp::Lt => "<",
                BinaryOp::Le => "<=",
                BinaryOp::Gt => ">",
                BinaryOp::Ge => ">=",
                BinaryOp::Eq => "=",
                BinaryOp::Ne => "!=",
                BinaryOp::Is => "IS",
                BinaryOp::And => "AND",
                BinaryOp::Or => "OR",
            };
            format!("({} {op_str} {})", to_sql(lhs), to_sql(rhs))
        }
        Ast::IsNull(inner, negate) => {
            format!("({} IS {}NULL)", to_sql(inner), if *negate { "NOT " } else { "" })
        }
        Ast::Between(expr, low, high, negate) => format!(
            "({} {}BETWEEN {} AND {})",
            to_sql(expr),
            if *negate { "NOT " } else { "" },
            to_sql(low),
            to_sql(high)
        ),
        Ast::In(expr, list, negate) => {
            let items: Vec<String> = list.iter().map(to_sql).collect();
            format!(
                "({} {}IN ({}))",
                to_sql(expr),
                if *negate { "NOT " } else { "" },
                items.join(", ")
            )
        }
        Ast::Like(expr, pattern, negate) => format!(
            "({} {}LIKE {})",
            to_sql(expr),
            if *negate { "NOT " } else { "" },
            to_sql(pattern)
        ),
        Ast::List(items) => {
            let items: Vec<String> = items.iter().map(to_sql).collect();
            format!("({})", items.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_collects_from_every_branch() {
        let ast = Ast::Binary(
            BinaryOp::And,
            Box::new(Ast::Between(
                Box::new(Ast::Ident("A".to_string())),
                Box::new(Ast::Ident("LOW".to_string())),
                Box::new(Ast::Int(10)),
                false,
            )),
            Box::new(Ast::In(
                Box::new(Ast::Ident("B".to_string())),
                vec![Ast::Ident("C".to_string())],
                true,
            )),
        );
        let ids = identifiers(&ast);
        assert_eq!(
            ids,
            ["A", "LOW", "B", "C"].into_iter().map(str::to_string).collect()
        );
    }

    #[test]
    fn to_sql_round_trips_structure() {
        let ast = Ast::IsNull(Box::new(Ast::Ident("X".to_string())), true);
        assert_eq!(to_sql(&ast), "(X IS NOT NULL)");
    }
}
