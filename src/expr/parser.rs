//! Precedence-climbing recursive-descent parser implementing spec §4.1's
//! grammar, grounded on `original_source/sql_expr_parser.py`'s pyparsing
//! `infixNotation` level table (translated here into explicit functions,
//! one per precedence level, rather than a combinator list).

use super::ast::{Ast, BinaryOp, UnaryOp};
use super::lexer::{tokenize, Keyword, NumberLit, ParseError, Token};

pub fn parse(input: &str) -> Result<Ast, ParseError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser { tokens, pos: 0 };
    let ast = parser.parse_or()?;
    parser.expect_eof()?;
    Ok(ast)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn expect_eof(&self) -> Result<(), ParseError> {
        match self.peek() {
            Token::Eof => Ok(()),
            other => Err(ParseError::UnexpectedToken(format!("{other:?}"))),
        }
    }

    fn expect_op(&mut self, op: &'static str) -> Result<(), ParseError> {
        match self.peek() {
            Token::Op(o) if *o == op => {
                self.advance();
                Ok(())
            }
            other => Err(ParseError::UnexpectedToken(format!("expected '{op}', found {other:?}"))),
        }
    }

    fn expect_lparen(&mut self) -> Result<(), ParseError> {
        match self.peek() {
            Token::LParen => {
                self.advance();
                Ok(())
            }
            other => Err(ParseError::UnexpectedToken(format!("expected '(', found {other:?}"))),
        }
    }

    fn expect_rparen(&mut self) -> Result<(), ParseError> {
        match self.peek() {
            Token::RParen => {
                self.advance();
                Ok(())
            }
            other => Err(ParseError::UnexpectedToken(format!("expected ')', found {other:?}"))),
        }
    }

    fn expect_keyword(&mut self, kw: Keyword) -> Result<(), ParseError> {
        match self.peek() {
            Token::Keyword(k) if *k == kw => {
                self.advance();
                Ok(())
            }
            other => Err(ParseError::UnexpectedToken(format!("expected {kw:?}, found {other:?}"))),
        }
    }

    // Level 9 (loosest): OR
    fn parse_or(&mut self) -> Result<Ast, ParseError> {
        let mut lhs = self.parse_and()?;
        while matches!(self.peek(), Token::Keyword(Keyword::Or)) {
            self.advance();
            let rhs = self.parse_and()?;
            lhs = Ast::Binary(BinaryOp::Or, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    // Level 9: AND (binds tighter than OR)
    fn parse_and(&mut self) -> Result<Ast, ParseError> {
        let mut lhs = self.parse_between()?;
        while matches!(self.peek(), Token::Keyword(Keyword::And)) {
            self.advance();
            let rhs = self.parse_between()?;
            lhs = Ast::Binary(BinaryOp::And, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    // Level 8: [NOT] BETWEEN low AND high
    fn parse_between(&mut self) -> Result<Ast, ParseError> {
        let expr = self.parse_equality()?;
        let negate = if matches!(self.peek(), Token::Keyword(Keyword::Not)) {
            // could be NOT BETWEEN, NOT IN, NOT LIKE — only consume here if
            // followed by BETWEEN.
            if matches!(self.tokens.get(self.pos + 1), Some(Token::Keyword(Keyword::Between))) {
                self.advance();
                true
            } else {
                false
            }
        } else {
            false
        };
        if matches!(self.peek(), Token::Keyword(Keyword::Between)) {
            self.advance();
            let low = self.parse_equality()?;
            self.expect_keyword(Keyword::And)?;
            let high = self.parse_equality()?;
            return Ok(Ast::Between(Box::new(expr), Box::new(low), Box::new(high), negate));
        }
        if negate {
            // We consumed NOT speculatively expecting BETWEEN; since it
            // wasn't there, this is a malformed expression.
            return Err(ParseError::UnexpectedToken("expected BETWEEN after NOT".to_string()));
        }
        Ok(expr)
    }

    // Level 7: =, !=/<>, IS, IN (list), NOT IN (list), LIKE, NOT LIKE
    fn parse_equality(&mut self) -> Result<Ast, ParseError> {
        let mut lhs = self.parse_comparison()?;
        loop {
            match self.peek().clone() {
                Token::Op(op @ ("=" | "!=" | "<>")) => {
                    self.advance();
                    let rhs = self.parse_comparison()?;
                    let bop = if op == "=" { BinaryOp::Eq } else { BinaryOp::Ne };
                    lhs = Ast::Binary(bop, Box::new(lhs), Box::new(rhs));
                }
                Token::Keyword(Keyword::Is) => {
                    self.advance();
                    lhs = self.parse_is_tail(lhs)?;
                }
                Token::Keyword(Keyword::In) => {
                    self.advance();
                    lhs = self.parse_in_tail(lhs, false)?;
                }
                Token::Keyword(Keyword::Like) => {
                    self.advance();
                    let pattern = self.parse_comparison()?;
                    lhs = Ast::Like(Box::new(lhs), Box::new(pattern), false);
                }
                Token::Keyword(Keyword::Not) => {
                    match self.tokens.get(self.pos + 1) {
                        Some(Token::Keyword(Keyword::In)) => {
                            self.advance();
                            self.advance();
                            lhs = self.parse_in_tail(lhs, true)?;
                        }
                        Some(Token::Keyword(Keyword::Like)) => {
                            self.advance();
                            self.advance();
                            let pattern = self.parse_comparison()?;
                            lhs = Ast::Like(Box::new(lhs), Box::new(pattern), true);
                        }
                        _ => break,
                    }
                }
                _ => break,
            }
        }
        Ok(lhs)
    }

    fn parse_is_tail(&mut self, lhs: Ast) -> Result<Ast, ParseError> {
        // Here for `a IS b` reached via the equality level when postfix `IS
        // NULL` wasn't already consumed right after the primary (e.g. `1 IS
        // 1`). `IS NULL`/`IS NOT NULL` are normally swallowed by
        // `parse_postfix`, so reaching here with NULL means the grammar saw
        // a standalone `IS` not immediately following a primary — treat
        // identically for simplicity.
        if matches!(self.peek(), Token::Keyword(Keyword::Not)) {
            self.advance();
            self.expect_keyword(Keyword::Null)?;
            return Ok(Ast::IsNull(Box::new(lhs), true));
        }
        if matches!(self.peek(), Token::Keyword(Keyword::Null)) {
            self.advance();
            return Ok(Ast::IsNull(Box::new(lhs), false));
        }
        let rhs = self.parse_comparison()?;
        Ok(Ast::Binary(BinaryOp::Is, Box::new(lhs), Box::new(rhs)))
    }

    fn parse_in_tail(&mut self, lhs: Ast, negate: bool) -> Result<Ast, ParseError> {
        self.expect_lparen()?;
        let mut items = Vec::new();
        if !matches!(self.peek(), Token::RParen) {
            loop {
                items.push(self.parse_or()?);
                if matches!(self.peek(), Token::Comma) {
                    self.advance();
                    continue;
                }
                break;
            }
        }
        self.expect_rparen()?;
        Ok(Ast::In(Box::new(lhs), items, negate))
    }

    // Level 6: <, <=, >, >=
    fn parse_comparison(&mut self) -> Result<Ast, ParseError> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = match self.peek() {
                Token::Op("<") => BinaryOp::Lt,
                Token::Op("<=") => BinaryOp::Le,
                Token::Op(">") => BinaryOp::Gt,
                Token::Op(">=") => BinaryOp::Ge,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_additive()?;
            lhs = Ast::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    // Level 5: +, -
    fn parse_additive(&mut self) -> Result<Ast, ParseError> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Token::Op("+") => BinaryOp::Add,
                Token::Op("-") => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_multiplicative()?;
            lhs = Ast::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    // Level 4: *, /, %
    fn parse_multiplicative(&mut self) -> Result<Ast, ParseError> {
        let mut lhs = self.parse_concat()?;
        loop {
            let op = match self.peek() {
                Token::Op("*") => BinaryOp::Mul,
                Token::Op("/") => BinaryOp::Div,
                Token::Op("%") => BinaryOp::Mod,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_concat()?;
            lhs = Ast::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    // Level 3: ||
    fn parse_concat(&mut self) -> Result<Ast, ParseError> {
        let mut lhs = self.parse_unary()?;
        while matches!(self.peek(), Token::Op("||")) {
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = Ast::Binary(BinaryOp::Concat, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    // Level 2: unary prefix +, -, NOT; postfix IS [NOT] NULL
    fn parse_unary(&mut self) -> Result<Ast, ParseError> {
        match self.peek().clone() {
            Token::Op("-") => {
                self.advance();
                Ok(Ast::Unary(UnaryOp::Neg, Box::new(self.parse_unary()?)))
            }
            Token::Op("+") => {
                self.advance();
                Ok(Ast::Unary(UnaryOp::Plus, Box::new(self.parse_unary()?)))
            }
            Token::Keyword(Keyword::Not) => {
                self.advance();
                Ok(Ast::Unary(UnaryOp::Not, Box::new(self.parse_unary()?)))
            }
            _ => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> Result<Ast, ParseError> {
        let mut expr = self.parse_primary()?;
        loop {
            if matches!(self.peek(), Token::Keyword(Keyword::Is)) {
                let save = self.pos;
                self.advance();
                if matches!(self.peek(), Token::Keyword(Keyword::Null)) {
                    self.advance();
                    expr = Ast::IsNull(Box::new(expr), false);
                    continue;
                }
                if matches!(self.peek(), Token::Keyword(Keyword::Not))
                    && matches!(self.tokens.get(self.pos + 1), Some(Token::Keyword(Keyword::Null)))
                {
                    self.advance();
                    self.advance();
                    expr = Ast::IsNull(Box::new(expr), true);
                    continue;
                }
                // Not `IS NULL`/`IS NOT NULL` — rewind, let parse_equality
                // handle a plain `IS` comparison.
                self.pos = save;
            }
            break;
        }
        Ok(expr)
    }

    // Level 1: literals, identifiers, parenthesized expr, value list
    fn parse_primary(&mut self) -> Result<Ast, ParseError> {
        match self.advance() {
            Token::Number(NumberLit::Int(i)) => Ok(Ast::Int(i)),
            Token::Number(NumberLit::Float(bits)) => Ok(Ast::Float(f64::from_bits(bits))),
            Token::Str(s) => Ok(Ast::Str(s)),
            Token::Keyword(Keyword::Null) => Ok(Ast::Null),
            Token::Ident(name) => Ok(Ast::Ident(name)),
            Token::LParen => {
                let mut items = vec![self.parse_or()?];
                while matches!(self.peek(), Token::Comma) {
                    self.advance();
                    items.push(self.parse_or()?);
                }
                self.expect_rparen()?;
                if items.len() == 1 {
                    Ok(items.into_iter().next().expect("just pushed one item"))
                } else {
                    Ok(Ast::List(items))
                }
            }
            other => Err(ParseError::UnexpectedToken(format!("{other:?}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_precedence_correctly() {
        // AND binds tighter than OR, so this is (a=1) OR (b=2 AND c=3)
        let ast = parse("a = 1 OR b = 2 AND c = 3").unwrap();
        match ast {
            Ast::Binary(BinaryOp::Or, _, rhs) => {
                assert!(matches!(*rhs, Ast::Binary(BinaryOp::And, _, _)));
            }
            other => panic!("unexpected shape: {other:?}"),
        }
    }

    #[test]
    fn parses_between_without_eating_outer_and() {
        let ast = parse("x BETWEEN 1 AND 10 AND y = 1").unwrap();
        assert!(matches!(ast, Ast::Binary(BinaryOp::And, _, _)));
    }

    #[test]
    fn parses_is_null_postfix() {
        let ast = parse("x IS NOT NULL").unwrap();
        assert_eq!(ast, Ast::IsNull(Box::new(Ast::Ident("X".to_string())), true));
    }

    #[test]
    fn parses_in_list() {
        let ast = parse("x NOT IN (1, 2, 3)").unwrap();
        match ast {
            Ast::In(_, items, true) => assert_eq!(items.len(), 3),
            other => panic!("unexpected shape: {other:?}"),
        }
    }

    #[test]
    fn parses_like() {
        let ast = parse("name LIKE 'A%'").unwrap();
        assert!(matches!(ast, Ast::Like(_, _, false)));
    }

    #[test]
    fn rejects_trailing_garbage() {
        assert!(parse("1 + 1)").is_err());
    }

    #[test]
    fn parses_value_list_as_a_primary() {
        let ast = parse("(1, 2, 3)").unwrap();
        match ast {
            Ast::List(items) => assert_eq!(items.len(), 3),
            other => panic!("unexpected shape: {other:?}"),
        }
    }

    #[test]
    fn parses_value_list_compared_to_value_list() {
        let ast = parse("(1, 2) = (1, 2)").unwrap();
        match ast {
            Ast::Binary(BinaryOp::Eq, lhs, rhs) => {
                assert!(matches!(*lhs, Ast::List(_)));
                assert!(matches!(*rhs, Ast::List(_)));
            }
            other => panic!("unexpected shape: {other:?}"),
        }
    }

    #[test]
    fn single_parenthesized_expr_is_not_a_list() {
        let ast = parse("(1 + 2)").unwrap();
        assert!(matches!(ast, Ast::Binary(BinaryOp::Add, _, _)));
    }
}
