//! Модуль парсера S-Expression для SX-модулей.
//!
//! # Синтаксис
//!
//! ```lisp
//! ; Литералы
//! 42  3.14  true  "hello"  ()
//!
//! ; Привязки и ссылки
//! (let x 42)
//! Config.Nested
//!
//! ; Классы, экземпляры, функции
//! (class Config (let debug false) (class Nested))
//! (class Error2 :extends Error1)
//! (let conf (new Config :key "x"))
//! (fn cli ())
//!
//! ; Импорт и ошибки
//! (import "app.config" :as cfg)
//! (raise "message")
//! ```

pub mod error;
pub mod lexer;
pub mod parser;
pub mod token;

pub use error::{ParseError, Position};
pub use lexer::Lexer;
pub use parser::{Atom, Parser, SExpr, MAX_DEPTH};
pub use token::{Span, Spanned, Token};

/// Парсит исходный код модуля в список top-level выражений.
///
/// # Пример
///
/// ```rust,ignore
/// use importloc::parser::parse;
///
/// let exprs = parse("(let x 1) (class Config)").unwrap();
/// assert_eq!(exprs.len(), 2);
/// ```
pub fn parse(source: &str) -> Result<Vec<SExpr>, ParseError> {
    Parser::new(source).parse_all()
}
