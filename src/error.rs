//! Определения ошибок для importloc.

use std::path::PathBuf;

use thiserror::Error;

use crate::parser::ParseError;

/// Основной тип `Result` для библиотеки.
pub type LocResult<T> = Result<T, LocError>;

/// Перечисление всех возможных ошибок.
#[derive(Error, Debug)]
pub enum LocError {
    // === Ошибки использования API ===
    #[error("Invalid arguments: {0}")]
    Usage(String),

    // === Классификация ===
    #[error("Invalid location: {0}")]
    InvalidLocation(String),

    // === Конфликт имён ===
    #[error("Module \"{0}\" is already imported")]
    ModuleNameConflict(String),

    // === Разрешение цели ===
    #[error("No module named '{0}'")]
    ModuleNotFound(String),

    #[error("Path \"{}\" does not exist", .0.display())]
    FileNotFound(PathBuf),

    #[error("Path \"{}\" is a directory", .0.display())]
    IsADirectory(PathBuf),

    // === Материализация ===
    #[error("Module \"{module}\" cannot be imported")]
    ImportFailed {
        module: String,
        #[source]
        source: Box<LocError>,
    },

    // === Атрибуты и рефлексия ===
    #[error("object has no attribute '{0}'")]
    AttributeNotFound(String),

    #[error("Source location is not available for '{0}'")]
    NoSourceLocation(String),

    // === Ошибки выполнения модуля ===
    #[error("Parse error in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unknown name: {0}")]
    UnknownName(String),

    #[error("Type mismatch during execution: {0}")]
    TypeError(String),

    #[error("Invalid form: {0}")]
    InvalidForm(String),

    #[error("Raised: {0}")]
    Raised(String),
}

impl LocError {
    /// Обернуть ошибку выполнения в `ImportFailed` для модуля `module`.
    pub fn import_failed(module: impl Into<String>, source: LocError) -> Self {
        Self::ImportFailed {
            module: module.into(),
            source: Box::new(source),
        }
    }

    /// Ошибка разрешения цели (модуль или файл не найдены, путь - директория).
    ///
    /// Такие ошибки никогда не оборачиваются в `ImportFailed`, вызывающий код
    /// может ветвиться по ним.
    pub fn is_resolution(&self) -> bool {
        matches!(
            self,
            Self::ModuleNotFound(_) | Self::FileNotFound(_) | Self::IsADirectory(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_import_failed_keeps_cause() {
        let err = LocError::import_failed("config", LocError::Raised("boom".to_string()));
        assert_eq!(err.to_string(), "Module \"config\" cannot be imported");

        let cause = err.source().expect("cause must be chained");
        assert_eq!(cause.to_string(), "Raised: boom");
    }

    #[test]
    fn test_resolution_errors() {
        assert!(LocError::ModuleNotFound("x".into()).is_resolution());
        assert!(LocError::IsADirectory(PathBuf::from("/tmp")).is_resolution());
        assert!(!LocError::ModuleNameConflict("x".into()).is_resolution());
    }

    #[test]
    fn test_conflict_message() {
        let err = LocError::ModuleNameConflict("config".into());
        assert_eq!(err.to_string(), "Module \"config\" is already imported");
    }
}
