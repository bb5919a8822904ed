//! Tokenizer for the SQL-subset expression grammar (spec §4.1).

use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(NumberLit),
    Str(String),
    /// An identifier, already case-folded to uppercase per spec §4.1
    /// (quoted identifiers preserve case as written, but are still
    /// case-folded here for lookup consistency — the universe resolves
    /// codes case-insensitively).
    Ident(String),
    Keyword(Keyword),
    LParen,
    RParen,
    Comma,
    Op(&'static str),
    Eof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberLit {
    Int(i64),
    Float(u64), // bit pattern, compared/used via f64::from_bits
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    And,
    Or,
    Not,
    Null,
    Is,
    Between,
    Case,
    When,
    Then,
    In,
    Like,
}

impl Keyword {
    fn from_word(word: &str) -> Option<Keyword> {
        match word {
            "AND" => Some(Keyword::And),
            "OR" => Some(Keyword::Or),
            "NOT" => Some(Keyword::Not),
            "NULL" => Some(Keyword::Null),
            "IS" => Some(Keyword::Is),
            "BETWEEN" => Some(Keyword::Between),
            "CASE" => Some(Keyword::Case),
            "WHEN" => Some(Keyword::When),
            "THEN" => Some(Keyword::Then),
            "IN" => Some(Keyword::In),
            "LIKE" => Some(Keyword::Like),
            _ => None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ParseError {
    #[error("unexpected character '{0}' at position {1}")]
    UnexpectedChar(char, usize),
    #[error("unterminated string literal starting at position {0}")]
    UnterminatedString(usize),
    #[error("unterminated quoted identifier starting at position {0}")]
    UnterminatedIdentifier(usize),
    #[error("unexpected end of expression")]
    UnexpectedEof,
    #[error("unexpected token {0:?}")]
    UnexpectedToken(String),
    #[error("keyword '{0}' cannot be used as an identifier")]
    ReservedKeyword(String),
}

pub fn tokenize(input: &str) -> Result<Vec<Token>, ParseError> {
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;
    let mut tokens = Vec::new();

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        match c {
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '\'' => {
                let (s, next) = read_quoted(&chars, i, '\'')?;
                tokens.push(Token::Str(s));
                i = next;
            }
            '"' => {
                let (s, next) = read_quoted(&chars, i, '"')?;
                tokens.push(Token::Ident(s.to_ascii_uppercase()));
                i = next;
            }
            '|' if chars.get(i + 1) == Some(&'|') => {
                tokens.push(Token::Op("||"));
                i += 2;
            }
            '<' if chars.get(i + 1) == Some(&'=') => {
                tokens.push(Token::Op("<="));
                i += 2;
            }
            '>' if chars.get(i + 1) == Some(&'=') => {
                tokens.push(Token::Op(">="));
                i += 2;
            }
            '<' if chars.get(i + 1) == Some(&'>') => {
                tokens.push(Token::Op("<>"));
                i += 2;
            }
            '!' if chars.get(i + 1) == Some(&'=') => {
                tokens.push(Token::Op("!="));
                i += 2;
            }
            '<' => {
                tokens.push(Token::Op("<"));
                i += 1;
            }
            '>' => {
                tokens.push(Token::Op(">"));
                i += 1;
            }
            '=' => {
                tokens.push(Token::Op("="));
                i += 1;
            }
            '+' => {
                tokens.push(Token::Op("+"));
                i += 1;
            }
            '-' => {
                tokens.push(Token::Op("-"));
                i += 1;
            }
            '*' => {
                tokens.push(Token::Op("*"));
                i += 1;
            }
            '/' => {
                tokens.push(Token::Op("/"));
                i += 1;
            }
            '%' => {
                tokens.push(Token::Op("%"));
                i += 1;
            }
            _ if c.is_ascii_digit() => {
                let (tok, next) = read_number(&chars, i);
                tokens.push(tok);
                i = next;
            }
            _ if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect::<String>().to_ascii_uppercase();
                if let Some(kw) = Keyword::from_word(&word) {
                    tokens.push(Token::Keyword(kw));
                } else {
                    tokens.push(Token::Ident(word));
                }
            }
            other => return Err(ParseError::UnexpectedChar(other, i)),
        }
    }

    tokens.push(Token::Eof);
    Ok(tokens)
}

fn read_quoted(chars: &[char], start: usize, quote: char) -> Result<(String, usize), ParseError> {
    let mut i = start + 1;
    let mut out = String::new();
    loop {
        if i >= chars.len() {
            return Err(if quote == '\'' {
                ParseError::UnterminatedString(start)
            } else {
                ParseError::UnterminatedIdentifier(start)
            });
        }
        if chars[i] == quote {
            // doubled quote char is an escaped literal quote
            if chars.get(i + 1) == Some(&quote) {
                out.push(quote);
                i += 2;
                continue;
            }
            return Ok((out, i + 1));
        }
        out.push(chars[i]);
        i += 1;
    }
}

fn read_number(chars: &[char], start: usize) -> (Token, usize) {
    let mut i = start;
    let mut is_float = false;
    while i < chars.len() && chars[i].is_ascii_digit() {
        i += 1;
    }
    if chars.get(i) == Some(&'.') && chars.get(i + 1).map_or(false, char::is_ascii_digit) {
        is_float = true;
        i += 1;
        while i < chars.len() && chars[i].is_ascii_digit() {
            i += 1;
        }
    }
    if matches!(chars.get(i), Some('e') | Some('E')) {
        let mut j = i + 1;
        if matches!(chars.get(j), Some('+') | Some('-')) {
            j += 1;
        }
        if chars.get(j).map_or(false, char::is_ascii_digit) {
            is_float = true;
            i = j;
            while i < chars.len() && chars[i].is_ascii_digit() {
                i += 1;
            }
        }
    }
    let text: String = chars[start..i].iter().collect();
    if is_float {
        let f: f64 = text.parse().unwrap_or(0.0);
        (Token::Number(NumberLit::Float(f.to_bits())), i)
    } else {
        match text.parse::<i64>() {
            Ok(v) => (Token::Number(NumberLit::Int(v)), i),
            Err(_) => {
                let f: f64 = text.parse().unwrap_or(0.0);
                (Token::Number(NumberLit::Float(f.to_bits())), i)
            }
        }
    }
}
