//! Разрешение путей модулей.
//!
//! Отвечает за поиск файлов модулей по имени и разрешение относительных путей.

use std::env;
use std::path::{Path, PathBuf};

use log::debug;

use super::{PACKAGE_FILE, SOURCE_EXTENSION};

/// Результат поиска модуля.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Found {
    /// Исходный файл: `name.sx` или `name/mod.sx` (пакет).
    Source { path: PathBuf, package: bool },
    /// Директория без `mod.sx`.
    Namespace(PathBuf),
}

/// Резолвер модулей.
#[derive(Debug, Clone)]
pub struct ModuleResolver {
    /// Пути поиска модулей
    search_paths: Vec<PathBuf>,
    /// База для относительных путей
    working_dir: Option<PathBuf>,
}

impl ModuleResolver {
    /// Создать новый резолвер.
    pub fn new() -> Self {
        Self::with_search_paths(vec![PathBuf::from(".")])
    }

    /// Создать резолвер с путями поиска.
    pub fn with_search_paths(paths: Vec<PathBuf>) -> Self {
        Self {
            search_paths: paths,
            working_dir: None,
        }
    }

    /// Добавить путь поиска.
    pub fn add_search_path(&mut self, path: PathBuf) {
        if !self.search_paths.contains(&path) {
            self.search_paths.push(path);
        }
    }

    /// Установить базовую директорию для относительных путей.
    pub fn set_working_dir(&mut self, dir: Option<PathBuf>) {
        self.working_dir = dir;
    }

    /// Получить все пути поиска.
    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }

    /// Найти модуль по имени `a.b.c`.
    ///
    /// Файлы (`a/b/c.sx`, затем `a/b/c/mod.sx`) во всех путях поиска имеют
    /// приоритет над namespace-директориями.
    pub fn find(&self, module_name: &str) -> Option<Found> {
        let module_path = module_name.replace('.', "/");
        let roots: Vec<PathBuf> = self
            .search_paths
            .iter()
            .map(|root| self.absolute(root))
            .collect();

        for root in &roots {
            let file = root.join(format!("{}.{}", module_path, SOURCE_EXTENSION));
            if file.is_file() {
                debug!("Resolved module '{}' to {}", module_name, file.display());
                return Some(Found::Source {
                    path: file,
                    package: false,
                });
            }

            let package = root.join(&module_path).join(PACKAGE_FILE);
            if package.is_file() {
                debug!("Resolved package '{}' to {}", module_name, package.display());
                return Some(Found::Source {
                    path: package,
                    package: true,
                });
            }
        }

        roots
            .iter()
            .map(|root| root.join(&module_path))
            .find(|dir| dir.is_dir())
            .map(|dir| {
                debug!("Resolved namespace package '{}' to {}", module_name, dir.display());
                Found::Namespace(dir)
            })
    }

    /// Сделать путь абсолютным относительно рабочей директории.
    ///
    /// Существующие пути канонизируются, остальные просто присоединяются к базе.
    pub fn absolute(&self, path: &Path) -> PathBuf {
        let joined = if path.is_absolute() {
            path.to_path_buf()
        } else {
            match &self.working_dir {
                Some(dir) => dir.join(path),
                None => match env::current_dir() {
                    Ok(cwd) => cwd.join(path),
                    Err(_) => path.to_path_buf(),
                },
            }
        };
        joined.canonicalize().unwrap_or(joined)
    }
}

impl Default for ModuleResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::io::Write;
    use tempfile::tempdir;

    fn canonical(path: &Path) -> PathBuf {
        path.canonicalize().unwrap()
    }

    #[test]
    fn test_resolver_creation() {
        let resolver = ModuleResolver::new();
        assert_eq!(resolver.search_paths().len(), 1);
        assert!(resolver.working_dir().is_none());
    }

    #[test]
    fn test_find_module_file() {
        let dir = tempdir().unwrap();
        let module_path = dir.path().join("math.sx");
        File::create(&module_path)
            .unwrap()
            .write_all(b"(let pi 3)")
            .unwrap();

        let resolver = ModuleResolver::with_search_paths(vec![dir.path().to_path_buf()]);
        assert_eq!(
            resolver.find("math"),
            Some(Found::Source {
                path: canonical(&module_path),
                package: false
            })
        );
    }

    #[test]
    fn test_find_nested_package() {
        let dir = tempdir().unwrap();
        let nested_dir = dir.path().join("utils");
        fs::create_dir(&nested_dir).unwrap();
        let module_path = nested_dir.join("mod.sx");
        File::create(&module_path).unwrap();

        let resolver = ModuleResolver::with_search_paths(vec![dir.path().to_path_buf()]);
        assert_eq!(
            resolver.find("utils"),
            Some(Found::Source {
                path: canonical(&module_path),
                package: true
            })
        );
    }

    #[test]
    fn test_find_namespace_package() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("app").join("plugins")).unwrap();

        let resolver = ModuleResolver::with_search_paths(vec![dir.path().to_path_buf()]);
        assert_eq!(
            resolver.find("app.plugins"),
            Some(Found::Namespace(canonical(&dir.path().join("app/plugins"))))
        );
    }

    #[test]
    fn test_file_wins_over_namespace_in_later_path() {
        let first = tempdir().unwrap();
        let second = tempdir().unwrap();
        fs::create_dir(first.path().join("cfg")).unwrap();
        File::create(second.path().join("cfg.sx")).unwrap();

        let resolver = ModuleResolver::with_search_paths(vec![
            first.path().to_path_buf(),
            second.path().to_path_buf(),
        ]);
        assert!(matches!(
            resolver.find("cfg"),
            Some(Found::Source { package: false, .. })
        ));
    }

    #[test]
    fn test_find_not_found() {
        let dir = tempdir().unwrap();
        let resolver = ModuleResolver::with_search_paths(vec![dir.path().to_path_buf()]);
        assert_eq!(resolver.find("nonexistent_module_xyz"), None);
    }

    #[test]
    fn test_relative_search_path_uses_working_dir() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("lib")).unwrap();
        File::create(dir.path().join("lib").join("tools.sx")).unwrap();

        let mut resolver = ModuleResolver::with_search_paths(vec![PathBuf::from("lib")]);
        resolver.set_working_dir(Some(dir.path().to_path_buf()));
        assert!(resolver.find("tools").is_some());
    }
}
