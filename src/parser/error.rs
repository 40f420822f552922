//! Ошибки разбора SX-модуля.
//!
//! Позиция сообщается строкой и колонкой (обе с 1), как её видит автор модуля.

use std::fmt;

use thiserror::Error;

use super::token::Span;

/// Строка и колонка в исходнике модуля.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    /// Позиция начала `span` в `source`.
    pub fn locate(source: &str, span: Span) -> Self {
        let offset = span.start.min(source.len());
        let before = source.get(..offset).unwrap_or(source);
        let line_start = before.rfind('\n').map_or(0, |idx| idx + 1);
        Self {
            line: span.line(source),
            column: before[line_start..].chars().count() + 1,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Ошибка разбора модуля.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("{at}: expected {expected}, found {found}")]
    UnexpectedToken {
        at: Position,
        expected: &'static str,
        found: String,
    },

    /// Модуль закончился внутри списка; `at` указывает на его `(`.
    #[error("{at}: list is never closed")]
    UnclosedList { at: Position },

    #[error("{at}: unexpected character '{found}'")]
    UnexpectedChar { at: Position, found: String },

    /// Списки вложены глубже допустимого.
    #[error("{at}: lists nested deeper than {limit}")]
    TooDeep { at: Position, limit: usize },
}

impl ParseError {
    pub fn position(&self) -> Position {
        match self {
            Self::UnexpectedToken { at, .. }
            | Self::UnclosedList { at }
            | Self::UnexpectedChar { at, .. }
            | Self::TooDeep { at, .. } => *at,
        }
    }
}
