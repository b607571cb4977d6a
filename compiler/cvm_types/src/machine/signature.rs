//! Parser for intrinsic declarations.
//!
//! Hosts declare intrinsics with ordinary C prototypes:
//!
//! ```text
//! int memcmp (void* s1, void* s2, int n)
//! void assertAreEqual (int expected, int actual)
//! void tone (unsigned int pin, unsigned int freq, unsigned long duration = 0)
//! ```
//!
//! Parameter names are optional, `f(void)` declares no parameters, and
//! trailing parameters may carry integer or floating defaults.

use std::ops::Range;

use cvm_ir::{BasicTypeName, ParamDecl, Signature, Signedness, TypeName, Value};
use logos::Logos;

/// A malformed intrinsic declaration.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("unrecognised text '{text}' at byte {offset}")]
    InvalidToken { text: String, offset: usize },
    #[error("expected {expected} at byte {offset}, found '{found}'")]
    Unexpected {
        expected: &'static str,
        found: String,
        offset: usize,
    },
    #[error("unexpected end of declaration, expected {expected}")]
    UnexpectedEnd { expected: &'static str },
}

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
enum Token {
    #[token("void")]
    Void,
    #[token("bool")]
    Bool,
    #[token("char")]
    Char,
    #[token("short")]
    Short,
    #[token("int")]
    Int,
    #[token("long")]
    Long,
    #[token("float")]
    Float,
    #[token("double")]
    Double,
    #[token("signed")]
    Signed,
    #[token("unsigned")]
    Unsigned,
    #[token("const")]
    Const,
    #[token("struct")]
    Struct,

    #[token("*")]
    Star,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(",")]
    Comma,
    #[token("=")]
    Assign,
    #[token("-")]
    Minus,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_owned())]
    Ident(String),
    #[regex(r"0[xX][0-9a-fA-F]+", |lex| i64::from_str_radix(&lex.slice()[2..], 16).ok())]
    HexInt(i64),
    #[regex(r"[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    Int10(i64),
    #[regex(r"[0-9]+\.[0-9]*", |lex| lex.slice().parse::<f64>().ok())]
    Decimal(f64),
}

fn tokenize(source: &str) -> Result<Vec<(Token, Range<usize>)>, SignatureError> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();
    while let Some(result) = lexer.next() {
        match result {
            Ok(token) => tokens.push((token, lexer.span())),
            Err(()) => {
                return Err(SignatureError::InvalidToken {
                    text: lexer.slice().to_owned(),
                    offset: lexer.span().start,
                })
            }
        }
    }
    Ok(tokens)
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<(Token, Range<usize>)>,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.peek_nth(0)
    }

    fn peek_nth(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.pos + n).map(|(token, _)| token)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token, expected: &'static str) -> Result<(), SignatureError> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn unexpected(&self, expected: &'static str) -> SignatureError {
        match self.tokens.get(self.pos) {
            Some((_, range)) => SignatureError::Unexpected {
                expected,
                found: self.source[range.clone()].to_owned(),
                offset: range.start,
            },
            None => SignatureError::UnexpectedEnd { expected },
        }
    }

    fn ident(&mut self, expected: &'static str) -> Result<String, SignatureError> {
        match self.peek().cloned() {
            Some(Token::Ident(name)) => {
                self.pos += 1;
                Ok(name)
            }
            _ => Err(self.unexpected(expected)),
        }
    }

    fn parse_type(&mut self) -> Result<TypeName, SignatureError> {
        while self.eat(&Token::Const) {}
        let mut ty = self.parse_base_type()?;
        loop {
            if self.eat(&Token::Star) {
                ty = ty.pointer();
            } else if !self.eat(&Token::Const) {
                break;
            }
        }
        Ok(ty)
    }

    fn parse_base_type(&mut self) -> Result<TypeName, SignatureError> {
        let signedness = if self.eat(&Token::Signed) {
            Some(Signedness::Signed)
        } else if self.eat(&Token::Unsigned) {
            Some(Signedness::Unsigned)
        } else {
            None
        };
        let explicit = signedness.is_some();

        let name = match self.peek().cloned() {
            Some(Token::Void) if !explicit => {
                self.pos += 1;
                return Ok(TypeName::Void);
            }
            Some(Token::Bool) if !explicit => {
                self.pos += 1;
                return Ok(TypeName::bool());
            }
            Some(Token::Struct) if !explicit => {
                self.pos += 1;
                return self.ident("a struct name").map(TypeName::Struct);
            }
            Some(Token::Ident(name)) if !explicit => {
                self.pos += 1;
                return Ok(TypeName::Struct(name));
            }
            Some(Token::Char) => {
                self.pos += 1;
                BasicTypeName::Char
            }
            Some(Token::Short) => {
                self.pos += 1;
                self.eat(&Token::Int);
                BasicTypeName::ShortInt
            }
            Some(Token::Int) => {
                self.pos += 1;
                BasicTypeName::Int
            }
            Some(Token::Long) => {
                self.pos += 1;
                if self.eat(&Token::Long) {
                    self.eat(&Token::Int);
                    BasicTypeName::LongLongInt
                } else if !explicit && self.eat(&Token::Double) {
                    BasicTypeName::LongDouble
                } else {
                    self.eat(&Token::Int);
                    BasicTypeName::LongInt
                }
            }
            Some(Token::Float) if !explicit => {
                self.pos += 1;
                BasicTypeName::Float
            }
            Some(Token::Double) if !explicit => {
                self.pos += 1;
                BasicTypeName::Double
            }
            // bare `unsigned` / `signed`
            _ if explicit => BasicTypeName::Int,
            _ => return Err(self.unexpected("a type")),
        };

        Ok(TypeName::Basic {
            name,
            signedness: signedness.unwrap_or(Signedness::Signed),
        })
    }

    fn parse_param(&mut self, index: usize) -> Result<ParamDecl, SignatureError> {
        let ty = self.parse_type()?;
        let name = match self.peek() {
            Some(Token::Ident(_)) => self.ident("a parameter name")?,
            _ => format!("arg{index}"),
        };
        let mut param = ParamDecl::new(name, ty);
        if self.eat(&Token::Assign) {
            param = param.with_default(self.parse_default()?);
        }
        Ok(param)
    }

    fn parse_default(&mut self) -> Result<Value, SignatureError> {
        let negative = self.eat(&Token::Minus);
        let value = match self.peek().cloned() {
            Some(Token::Int10(v) | Token::HexInt(v)) => {
                Value::Int64(if negative { v.wrapping_neg() } else { v })
            }
            Some(Token::Decimal(v)) => Value::Float64(if negative { -v } else { v }),
            _ => return Err(self.unexpected("a default value")),
        };
        self.pos += 1;
        Ok(value)
    }
}

/// Parse a C prototype into the function name and its signature.
pub fn parse_signature(source: &str) -> Result<(String, Signature), SignatureError> {
    let mut parser = Parser {
        source,
        tokens: tokenize(source)?,
        pos: 0,
    };

    let return_type = parser.parse_type()?;
    let name = parser.ident("a function name")?;
    parser.expect(&Token::LParen, "'('")?;

    let mut params = Vec::new();
    if parser.peek() == Some(&Token::Void) && parser.peek_nth(1) == Some(&Token::RParen) {
        parser.pos += 1;
    } else if parser.peek() != Some(&Token::RParen) {
        loop {
            params.push(parser.parse_param(params.len())?);
            if !parser.eat(&Token::Comma) {
                break;
            }
        }
    }
    parser.expect(&Token::RParen, "')'")?;

    if parser.peek().is_some() {
        return Err(parser.unexpected("end of declaration"));
    }
    Ok((name, Signature::new(return_type, params)))
}
