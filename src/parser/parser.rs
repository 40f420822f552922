//! S-Expression парсер для SX-модулей.

use super::error::ParseError;
use super::lexer::Lexer;
use super::token::{Span, Spanned, Token};

/// S-Expression - атом или список.
#[derive(Debug, Clone, PartialEq)]
pub enum SExpr {
    /// Атом - число, строка, идентификатор, ключевое слово.
    Atom(Spanned<Atom>),
    /// Список - (expr expr ...)
    List(Spanned<Vec<SExpr>>),
}

/// Атомарное значение.
#[derive(Debug, Clone, PartialEq)]
pub enum Atom {
    /// Целое число.
    Int(i64),
    /// Число с плавающей точкой.
    Float(f64),
    /// Строка.
    String(String),
    /// Идентификатор.
    Ident(String),
    /// Ключевое слово без двоеточия.
    Keyword(String),
}

impl SExpr {
    /// Получить Span выражения.
    pub fn span(&self) -> Span {
        match self {
            SExpr::Atom(spanned) => spanned.span,
            SExpr::List(spanned) => spanned.span,
        }
    }

    /// Проверить, является ли выражение списком.
    pub fn is_list(&self) -> bool {
        matches!(self, SExpr::List(_))
    }

    /// Получить идентификатор из атома.
    pub fn as_ident(&self) -> Option<&str> {
        match self {
            SExpr::Atom(Spanned {
                value: Atom::Ident(s),
                ..
            }) => Some(s),
            _ => None,
        }
    }

    /// Получить ключевое слово из атома.
    pub fn as_keyword(&self) -> Option<&str> {
        match self {
            SExpr::Atom(Spanned {
                value: Atom::Keyword(s),
                ..
            }) => Some(s),
            _ => None,
        }
    }

    /// Получить строку из атома.
    pub fn as_string(&self) -> Option<&str> {
        match self {
            SExpr::Atom(Spanned {
                value: Atom::String(s),
                ..
            }) => Some(s),
            _ => None,
        }
    }

    /// Получить список.
    pub fn as_list(&self) -> Option<&[SExpr]> {
        match self {
            SExpr::List(Spanned { value, .. }) => Some(value),
            _ => None,
        }
    }

    /// Получить имя формы (первый элемент списка, если это идентификатор).
    pub fn form_name(&self) -> Option<&str> {
        self.as_list()
            .and_then(|list| list.first())
            .and_then(|first| first.as_ident())
    }
}

/// Наибольшая допустимая вложенность списков.
pub const MAX_DEPTH: usize = 256;

/// Парсер S-Expression.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    /// Число открытых списков
    depth: usize,
}

impl<'a> Parser<'a> {
    /// Создать новый парсер.
    pub fn new(source: &'a str) -> Self {
        Self {
            lexer: Lexer::new(source),
            depth: 0,
        }
    }

    /// Распарсить все S-выражения из исходника.
    pub fn parse_all(&mut self) -> Result<Vec<SExpr>, ParseError> {
        let mut exprs = Vec::new();

        loop {
            let token = self.lexer.peek_token()?;
            if matches!(token.value, Token::Eof) {
                break;
            }
            exprs.push(self.parse_sexpr()?);
        }

        Ok(exprs)
    }

    /// Распарсить одно S-выражение.
    pub fn parse_sexpr(&mut self) -> Result<SExpr, ParseError> {
        stacker::maybe_grow(32 * 1024, 1024 * 1024, || {
            let token = self.lexer.next_token()?;

            let atom = match token.value {
                Token::LParen => return self.parse_list(token.span),
                Token::Int(n) => Atom::Int(n),
                Token::Float(f) => Atom::Float(f),
                Token::String(s) => Atom::String(s),
                Token::Ident(s) => Atom::Ident(s),
                Token::Keyword(s) => Atom::Keyword(s),
                Token::RParen => return Err(self.unexpected(token.span, "')'")),
                Token::Eof => return Err(self.unexpected(token.span, "end of module")),
            };

            Ok(SExpr::Atom(Spanned::new(atom, token.span)))
        })
    }

    /// Распарсить список (после открывающей скобки).
    fn parse_list(&mut self, start_span: Span) -> Result<SExpr, ParseError> {
        if self.depth >= MAX_DEPTH {
            return Err(ParseError::TooDeep {
                at: self.lexer.locate(start_span),
                limit: MAX_DEPTH,
            });
        }

        self.depth += 1;
        let result = self.parse_elements(start_span);
        self.depth -= 1;
        result
    }

    fn parse_elements(&mut self, start_span: Span) -> Result<SExpr, ParseError> {
        let mut elements = Vec::new();

        loop {
            let token = self.lexer.peek_token()?;

            match &token.value {
                Token::RParen => {
                    let end_token = self.lexer.next_token()?;
                    let span = start_span.merge(end_token.span);
                    return Ok(SExpr::List(Spanned::new(elements, span)));
                }
                Token::Eof => {
                    return Err(ParseError::UnclosedList {
                        at: self.lexer.locate(start_span),
                    });
                }
                _ => {
                    elements.push(self.parse_sexpr()?);
                }
            }
        }
    }

    fn unexpected(&self, span: Span, found: &str) -> ParseError {
        ParseError::UnexpectedToken {
            at: self.lexer.locate(span),
            expected: "expression",
            found: found.to_string(),
        }
    }
}
