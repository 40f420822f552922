//! Лексер для S-Expression синтаксиса SX-модулей.

use logos::Logos;

use super::error::{ParseError, Position};
use super::token::{Span, Spanned, Token};

/// Внутренние токены для logos.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")] // Пропускаем пробелы
#[logos(skip r";[^\n]*")] // Пропускаем комментарии ; до конца строки
enum LogosToken {
    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    // Float (должен быть до Int для правильного приоритета)
    #[regex(r"-?[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    Float(f64),

    // Integer
    #[regex(r"-?[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    Int(i64),

    // Hex integer
    #[regex(r"0[xX][0-9a-fA-F]+", |lex| i64::from_str_radix(&lex.slice()[2..], 16).ok())]
    HexInt(i64),

    // Строковый литерал
    #[regex(r#""([^"\\]|\\.)*""#, |lex| {
        let s = lex.slice();
        Some(unescape_string(&s[1..s.len()-1]))
    })]
    String(String),

    // Ключевое слово: :extends, :as, :key
    #[regex(r":[a-zA-Z_][a-zA-Z0-9_-]*", |lex| lex.slice()[1..].to_string())]
    Keyword(String),

    // Идентификатор, сегменты через точку: Config.Nested
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_-]*(\.[a-zA-Z_][a-zA-Z0-9_-]*)*", |lex| lex.slice().to_string())]
    Ident(String),
}

/// Обработка escape-последовательностей в строке.
fn unescape_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('t') => result.push('\t'),
                Some('r') => result.push('\r'),
                Some('\\') => result.push('\\'),
                Some('"') => result.push('"'),
                Some(other) => {
                    result.push('\\');
                    result.push(other);
                }
                None => result.push('\\'),
            }
        } else {
            result.push(c);
        }
    }

    result
}

/// Лексер для SX S-Expression.
pub struct Lexer<'a> {
    logos: logos::Lexer<'a, LogosToken>,
    source: &'a str,
    peeked: Option<Spanned<Token>>,
}

impl<'a> Lexer<'a> {
    /// Создать новый лексер.
    pub fn new(source: &'a str) -> Self {
        Self {
            logos: LogosToken::lexer(source),
            source,
            peeked: None,
        }
    }

    /// Получить следующий токен.
    pub fn next_token(&mut self) -> Result<Spanned<Token>, ParseError> {
        if let Some(token) = self.peeked.take() {
            return Ok(token);
        }

        self.read_token()
    }

    /// Посмотреть на следующий токен без его потребления.
    pub fn peek_token(&mut self) -> Result<&Spanned<Token>, ParseError> {
        let token = match self.peeked.take() {
            Some(token) => token,
            None => self.read_token()?,
        };
        Ok(self.peeked.insert(token))
    }

    /// Строка и колонка для позиции в этом исходнике.
    pub fn locate(&self, span: Span) -> Position {
        Position::locate(self.source, span)
    }

    /// Прочитать токен из logos.
    fn read_token(&mut self) -> Result<Spanned<Token>, ParseError> {
        match self.logos.next() {
            Some(Ok(logos_token)) => {
                let span = Span::new(self.logos.span().start, self.logos.span().end);
                Ok(Spanned::new(convert_token(logos_token), span))
            }
            Some(Err(())) => {
                let span = Span::new(self.logos.span().start, self.logos.span().end);
                Err(ParseError::UnexpectedChar {
                    at: self.locate(span),
                    found: self.logos.slice().to_string(),
                })
            }
            None => {
                let pos = self.source.len();
                Ok(Spanned::new(Token::Eof, Span::new(pos, pos)))
            }
        }
    }
}

/// Конвертировать внутренний токен logos в публичный Token.
fn convert_token(logos_token: LogosToken) -> Token {
    match logos_token {
        LogosToken::LParen => Token::LParen,
        LogosToken::RParen => Token::RParen,
        LogosToken::Int(n) | LogosToken::HexInt(n) => Token::Int(n),
        LogosToken::Float(f) => Token::Float(f),
        LogosToken::String(s) => Token::String(s),
        LogosToken::Keyword(s) => Token::Keyword(s),
        LogosToken::Ident(s) => Token::Ident(s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lexer_basic() {
        let mut lexer = Lexer::new("(let x 1)");

        assert!(matches!(lexer.next_token().unwrap().value, Token::LParen));
        assert!(matches!(
            lexer.next_token().unwrap().value,
            Token::Ident(s) if s == "let"
        ));
        assert!(matches!(
            lexer.next_token().unwrap().value,
            Token::Ident(s) if s == "x"
        ));
        assert!(matches!(lexer.next_token().unwrap().value, Token::Int(1)));
        assert!(matches!(lexer.next_token().unwrap().value, Token::RParen));
        assert!(matches!(lexer.next_token().unwrap().value, Token::Eof));
    }

    #[test]
    fn test_lexer_dotted_ident_and_keyword() {
        let mut lexer = Lexer::new("Config.Nested :extends __main__");
        assert!(matches!(
            lexer.next_token().unwrap().value,
            Token::Ident(s) if s == "Config.Nested"
        ));
        assert!(matches!(
            lexer.next_token().unwrap().value,
            Token::Keyword(s) if s == "extends"
        ));
        assert!(matches!(
            lexer.next_token().unwrap().value,
            Token::Ident(s) if s == "__main__"
        ));
    }

    #[test]
    fn test_lexer_string() {
        let mut lexer = Lexer::new(r#""hello\nworld""#);
        match lexer.next_token().unwrap().value {
            Token::String(s) => assert_eq!(s, "hello\nworld"),
            _ => panic!("Expected string"),
        }
    }

    #[test]
    fn test_lexer_comments() {
        let mut lexer = Lexer::new("; comment\n42");
        assert!(matches!(lexer.next_token().unwrap().value, Token::Int(42)));
    }

    #[test]
    fn test_lexer_peek_does_not_consume() {
        let mut lexer = Lexer::new("7 8");
        assert!(matches!(lexer.peek_token().unwrap().value, Token::Int(7)));
        assert!(matches!(lexer.next_token().unwrap().value, Token::Int(7)));
        assert!(matches!(lexer.next_token().unwrap().value, Token::Int(8)));
    }

    #[test]
    fn test_lexer_error() {
        let mut lexer = Lexer::new("(let a 1)\n  @");
        for _ in 0..5 {
            lexer.next_token().unwrap();
        }
        match lexer.next_token() {
            Err(ParseError::UnexpectedChar { at, found }) => {
                assert_eq!(at, Position { line: 2, column: 3 });
                assert_eq!(found, "@");
            }
            other => panic!("expected UnexpectedChar, got {:?}", other),
        }
    }
}
