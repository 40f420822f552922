//! Модульная система: реестр, поиск и загрузка SX-модулей.
//!
//! ## Раскладка на диске
//!
//! ```text
//! app/
//!   mod.sx        ; пакет `app`
//!   config.sx     ; модуль `app.config`
//!   plugins/      ; namespace-пакет `app.plugins` (без mod.sx)
//!     auth.sx     ; модуль `app.plugins.auth`
//! ```

mod loader;
mod registry;
mod resolver;

pub use loader::ModuleLoader;
pub use registry::{ModuleRegistry, Snapshot};
pub use resolver::{Found, ModuleResolver};

use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{LocError, LocResult};

/// Расширение исходных файлов модулей.
pub const SOURCE_EXTENSION: &str = "sx";

/// Имя файла пакета внутри директории.
pub const PACKAGE_FILE: &str = "mod.sx";

/// Конфигурация модульной системы.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleConfig {
    /// Пути поиска модулей
    pub search_paths: Vec<PathBuf>,
    /// Базовая директория для относительных путей (по умолчанию - текущая)
    pub working_dir: Option<PathBuf>,
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            search_paths: vec![PathBuf::from(".")],
            working_dir: None,
        }
    }
}

impl ModuleConfig {
    /// Переменная окружения со списком путей поиска (разделитель платформенный).
    pub const PATH_VAR: &'static str = "IMPORTLOC_PATH";
    /// Переменная окружения с базовой директорией.
    pub const WORKDIR_VAR: &'static str = "IMPORTLOC_WORKDIR";

    /// Прочитать конфигурацию из окружения.
    ///
    /// Пути из `IMPORTLOC_PATH` идут перед путём по умолчанию `.`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(paths) = env::var_os(Self::PATH_VAR) {
            let mut search_paths: Vec<PathBuf> = env::split_paths(&paths)
                .filter(|p| !p.as_os_str().is_empty())
                .collect();
            search_paths.append(&mut config.search_paths);
            config.search_paths = search_paths;
        }
        if let Some(dir) = env::var_os(Self::WORKDIR_VAR) {
            config.working_dir = Some(PathBuf::from(dir));
        }
        config
    }

    /// Разобрать конфигурацию из JSON.
    pub fn from_json_str(json: &str) -> LocResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| LocError::Usage(format!("invalid module config: {}", e)))
    }
}

/// Имя модуля и все его предки, от корня: `a.b.c` -> `a`, `a.b`, `a.b.c`.
pub fn explode_module_name(name: &str) -> impl Iterator<Item = &str> {
    name.match_indices('.')
        .map(move |(idx, _)| &name[..idx])
        .chain(std::iter::once(name))
}

/// Последний сегмент имени модуля.
pub(crate) fn last_segment(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explode_module_name() {
        let parts: Vec<_> = explode_module_name("a.b.c").collect();
        assert_eq!(parts, vec!["a", "a.b", "a.b.c"]);

        let single: Vec<_> = explode_module_name("config").collect();
        assert_eq!(single, vec!["config"]);
    }

    #[test]
    fn test_last_segment() {
        assert_eq!(last_segment("app.__main__"), "__main__");
        assert_eq!(last_segment("app"), "app");
    }

    #[test]
    fn test_config_from_json() {
        let config =
            ModuleConfig::from_json_str(r#"{"search_paths": ["/srv/mods"], "working_dir": "/srv"}"#)
                .unwrap();
        assert_eq!(config.search_paths, vec![PathBuf::from("/srv/mods")]);
        assert_eq!(config.working_dir, Some(PathBuf::from("/srv")));

        let defaults = ModuleConfig::from_json_str("{}").unwrap();
        assert_eq!(defaults, ModuleConfig::default());

        assert!(matches!(
            ModuleConfig::from_json_str("[1]"),
            Err(LocError::Usage(_))
        ));
    }
}
