//! Row-context expression evaluator (spec §4.1's "evaluation" rules,
//! §4.7's null-propagation and type-mismatch edge cases).
//!
//! Three-valued (Kleene) logic is used throughout: `AND`/`OR`/`NOT`
//! propagate `NULL` the way SQL does, rather than collapsing early. Only
//! the final filter-mask step (`Value::truthy`) collapses `NULL` to
//! `false`.

use regex::Regex;

use super::ast::{Ast, BinaryOp, UnaryOp};
use crate::value::Value;

/// Resolves an identifier to its current row value. Implemented by the
/// execution engine's row cursor over a [`crate::exec::RowSet`].
pub trait Resolver {
    fn resolve(&self, code: &str) -> Value;
}

impl<F: Fn(&str) -> Value> Resolver for F {
    fn resolve(&self, code: &str) -> Value {
        self(code)
    }
}

pub fn eval(ast: &Ast, ctx: &dyn Resolver) -> Value {
    match ast {
        Ast::Null => Value::Null,
        Ast::Int(i) => Value::Int(*i),
        Ast::Float(f) => Value::Float(*f),
        Ast::Str(s) => Value::Str(s.clone()),
        Ast::Ident(code) => ctx.resolve(code),
        Ast::Unary(op, inner) => eval_unary(*op, &eval(inner, ctx)),
        Ast::Binary(op, lhs, rhs) => eval_binary(*op, &eval(lhs, ctx), &eval(rhs, ctx)),
        Ast::IsNull(inner, negate) => {
            let is_null = eval(inner, ctx).is_null();
            Value::Bool(is_null != *negate)
        }
        Ast::Between(expr, low, high, negate) => {
            let v = eval(expr, ctx);
            let l = eval(low, ctx);
            let h = eval(high, ctx);
            if v.is_null() || l.is_null() || h.is_null() {
                return Value::Null;
            }
            let inside = v.rank_cmp(&l) != std::cmp::Ordering::Less
                && v.rank_cmp(&h) != std::cmp::Ordering::Greater;
            Value::Bool(inside != *negate)
        }
        Ast::In(expr, list, negate) => {
            let v = eval(expr, ctx);
            if v.is_null() {
                return Value::Null;
            }
            let mut saw_null = false;
            let mut found = false;
            for item in list {
                let iv = eval(item, ctx);
                if iv.is_null() {
                    saw_null = true;
                } else if v == iv {
                    found = true;
                    break;
                }
            }
            if found {
                Value::Bool(!*negate)
            } else if saw_null {
                Value::Null
            } else {
                Value::Bool(*negate)
            }
        }
        Ast::Like(expr, pattern, negate) => {
            let v = eval(expr, ctx);
            let p = eval(pattern, ctx);
            match (v.as_str(), p.as_str()) {
                (Some(s), Some(pat)) => {
                    let matched = like_matches(s, pat);
                    Value::Bool(matched != *negate)
                }
                _ => Value::Null,
            }
        }
        // No tuple/row value type exists to hold a list's elements; a
        // bare value-list only has meaning inside `IN`/`NOT IN` (handled
        // separately above) or `to_sql`/`identifiers`.
        Ast::List(_) => Value::Null,
    }
}

fn eval_unary(op: UnaryOp, v: &Value) -> Value {
    match op {
        UnaryOp::Plus => {
            if v.is_null() {
                Value::Null
            } else {
                match v.as_f64() {
                    Some(_) => v.clone(),
                    None => Value::Null,
                }
            }
        }
        UnaryOp::Neg => match v {
            Value::Int(i) => Value::Int(-i),
            Value::Float(f) => Value::Float(-f),
            Value::Null => Value::Null,
            _ => Value::Null,
        },
        UnaryOp::Not => match v.as_bool_tri() {
            Some(b) => Value::Bool(!b),
            None => Value::Null,
        },
    }
}

fn eval_binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> Value {
    use BinaryOp::*;
    match op {
        And => match (lhs.as_bool_tri(), rhs.as_bool_tri()) {
            (Some(false), _) | (_, Some(false)) => Value::Bool(false),
            (Some(true), Some(true)) => Value::Bool(true),
            _ => Value::Null,
        },
        Or => match (lhs.as_bool_tri(), rhs.as_bool_tri()) {
            (Some(true), _) | (_, Some(true)) => Value::Bool(true),
            (Some(false), Some(false)) => Value::Bool(false),
            _ => Value::Null,
        },
        Eq => {
            if lhs.is_null() || rhs.is_null() {
                Value::Null
            } else {
                Value::Bool(lhs == rhs)
            }
        }
        Ne => {
            if lhs.is_null() || rhs.is_null() {
                Value::Null
            } else {
                Value::Bool(lhs != rhs)
            }
        }
        Is => Value::Bool(lhs.is_null() == rhs.is_null() && lhs == rhs),
        Lt | Le | Gt | Ge => {
            if lhs.is_null() || rhs.is_null() {
                return Value::Null;
            }
            match lhs.partial_cmp(rhs) {
                Some(ord) => {
                    let b = match op {
                        Lt => ord == std::cmp::Ordering::Less,
                        Le => ord != std::cmp::Ordering::Greater,
                        Gt => ord == std::cmp::Ordering::Greater,
                        Ge => ord != std::cmp::Ordering::Less,
                        _ => unreachable!(),
                    };
                    Value::Bool(b)
                }
                None => Value::Null,
            }
        }
        Add | Sub | Mul | Div | Mod => {
            if lhs.is_null() || rhs.is_null() {
                return Value::Null;
            }
            arithmetic(op, lhs, rhs)
        }
        Concat => {
            if lhs.is_null() || rhs.is_null() {
                Value::Null
            } else {
                Value::string(format!("{lhs}{rhs}"))
            }
        }
    }
}

fn arithmetic(op: BinaryOp, lhs: &Value, rhs: &Value) -> Value {
    use BinaryOp::*;
    if let (Value::Int(a), Value::Int(b)) = (lhs, rhs) {
        return match op {
            Add => Value::Int(a.wrapping_add(*b)),
            Sub => Value::Int(a.wrapping_sub(*b)),
            Mul => Value::Int(a.wrapping_mul(*b)),
            Div => {
                if *b == 0 {
                    Value::Null
                } else {
                    Value::Int(a.wrapping_div_euclid(*b))
                }
            }
            Mod => {
                if *b == 0 {
                    Value::Null
                } else {
                    Value::Int(a.wrapping_rem_euclid(*b))
                }
            }
            _ => unreachable!(),
        };
    }
    match (lhs.as_f64(), rhs.as_f64()) {
        (Some(a), Some(b)) => match op {
            Add => Value::Float(a + b),
            Sub => Value::Float(a - b),
            Mul => Value::Float(a * b),
            Div => {
                if b == 0.0 {
                    Value::Null
                } else {
                    Value::Float(a / b)
                }
            }
            Mod => {
                if b == 0.0 {
                    Value::Null
                } else {
                    Value::Float(a % b)
                }
            }
            _ => unreachable!(),
        },
        _ => Value::Null,
    }
}

trait TriBool {
    fn as_bool_tri(&self) -> Option<bool>;
}

impl TriBool for Value {
    fn as_bool_tri(&self) -> Option<bool> {
        if self.is_null() {
            None
        } else {
            self.as_bool()
        }
    }
}

/// Translates a SQL `LIKE` pattern (`%` = any run, `_` = single char) into
/// an anchored regex and matches `s` against it.
fn like_matches(s: &str, pattern: &str) -> bool {
    match Regex::new(&translate_like_pattern(pattern)) {
        Ok(re) => re.is_match(s),
        Err(_) => false,
    }
}

fn translate_like_pattern(pattern: &str) -> String {
    let mut out = String::from("(?s)^");
    for c in pattern.chars() {
        match c {
            '%' => out.push_str(".*"),
            '_' => out.push('.'),
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }
    out.push('$');
    out
}
