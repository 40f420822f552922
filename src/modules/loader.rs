//! Загрузчик модулей.
//!
//! Отвечает за чтение, выполнение и регистрацию модулей в реестре, а также за
//! атомарный импорт: при ошибке реестр возвращается в исходное состояние.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock, Mutex};

use log::{debug, info, warn};

use crate::error::{LocError, LocResult};
use crate::runtime::{self, Module, Value};

use super::{
    explode_module_name, last_segment, Found, ModuleConfig, ModuleRegistry, ModuleResolver,
};

static GLOBAL: LazyLock<Mutex<ModuleLoader>> =
    LazyLock::new(|| Mutex::new(ModuleLoader::with_config(ModuleConfig::from_env())));

/// Загрузчик модулей.
#[derive(Debug)]
pub struct ModuleLoader {
    /// Резолвер путей
    resolver: ModuleResolver,
    /// Реестр загруженных модулей
    registry: ModuleRegistry,
}

impl ModuleLoader {
    /// Создать новый загрузчик с конфигурацией по умолчанию.
    pub fn new() -> Self {
        Self::with_config(ModuleConfig::default())
    }

    /// Создать загрузчик по конфигурации.
    pub fn with_config(config: ModuleConfig) -> Self {
        let mut resolver = ModuleResolver::with_search_paths(config.search_paths);
        resolver.set_working_dir(config.working_dir);
        Self {
            resolver,
            registry: ModuleRegistry::new(),
        }
    }

    /// Создать загрузчик с путями поиска.
    pub fn with_search_paths(paths: Vec<PathBuf>) -> Self {
        Self::with_config(ModuleConfig {
            search_paths: paths,
            ..ModuleConfig::default()
        })
    }

    /// Общий для процесса загрузчик.
    ///
    /// Блокировка удерживается на всё время загрузки: снимок, выполнение,
    /// фиксация или откат.
    pub fn global() -> &'static Mutex<ModuleLoader> {
        &GLOBAL
    }

    /// Добавить путь поиска модулей.
    pub fn add_search_path(&mut self, path: PathBuf) {
        self.resolver.add_search_path(path);
    }

    /// Установить базовую директорию для относительных путей.
    pub fn set_working_dir(&mut self, dir: Option<PathBuf>) {
        self.resolver.set_working_dir(dir);
    }

    /// Получить реестр модулей.
    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    /// Получить резолвер.
    pub fn resolver(&self) -> &ModuleResolver {
        &self.resolver
    }

    /// Импортировать модуль по имени, используя уже загруженный, если он есть.
    ///
    /// Так работают `(import ...)` внутри модулей. Неудачный импорт атомарен.
    pub fn import(&mut self, name: &str) -> LocResult<Arc<Module>> {
        if let Some(module) = self.registry.get(name) {
            return Ok(module);
        }
        self.atomic_import(name, |loader| loader.import_fresh(name, name))
    }

    /// Выполнить модуль `target` заново и зарегистрировать его как `register_as`.
    ///
    /// Если имена совпадают, недостающие родительские пакеты импортируются
    /// первыми, а модуль привязывается атрибутом к родителю. Если имя
    /// переопределено, выполняется только найденный для `target` файл.
    /// Откат при ошибке - забота вызывающего (см. [`Self::atomic_import`]).
    pub fn import_fresh(&mut self, target: &str, register_as: &str) -> LocResult<Arc<Module>> {
        if target != register_as {
            return self.import_one(target, register_as);
        }

        let mut parent: Option<Arc<Module>> = None;
        for prefix in explode_module_name(target) {
            let module = match self.registry.get(prefix) {
                Some(existing) if prefix != target => existing,
                _ => self.import_one(prefix, prefix)?,
            };
            if let Some(parent) = &parent {
                parent.set_attr(last_segment(prefix), Value::Module(Arc::clone(&module)));
            }
            parent = Some(module);
        }

        parent.ok_or_else(|| LocError::ModuleNotFound(target.to_string()))
    }

    /// Найти и выполнить один модуль без родителей.
    fn import_one(&mut self, target: &str, register_as: &str) -> LocResult<Arc<Module>> {
        match self.resolver.find(target) {
            Some(Found::Source { path, package }) => self.exec_file(register_as, &path, package),
            Some(Found::Namespace(dir)) => {
                debug!(
                    "Registering namespace package '{}' ({})",
                    register_as,
                    dir.display()
                );
                let module = Arc::new(Module::namespace_package(register_as));
                self.registry.insert(register_as, Arc::clone(&module));
                Ok(module)
            }
            None => Err(LocError::ModuleNotFound(target.to_string())),
        }
    }

    /// Выполнить файл как модуль `name`.
    ///
    /// Модуль регистрируется до начала выполнения, поэтому импорт самого себя
    /// во время выполнения видит частично инициализированный модуль. При ошибке
    /// запись остаётся в реестре.
    pub fn exec_file(&mut self, name: &str, path: &Path, package: bool) -> LocResult<Arc<Module>> {
        let module = Arc::new(Module::from_file(name, path.to_path_buf(), package));
        self.registry.insert(name, Arc::clone(&module));
        info!("Importing module '{}' from {}", name, path.display());
        self.exec_into(&module, path)?;
        Ok(module)
    }

    /// Перевыполнить модуль на месте: идентичность сохраняется, имена,
    /// привязанные в теле, получают новые объекты.
    ///
    /// Отката нет: при ошибке пространство имён может остаться частично обновлённым.
    pub fn reload(&mut self, module: &Arc<Module>) -> LocResult<()> {
        match module.file() {
            Some(path) => {
                let path = path.to_path_buf();
                info!("Reloading module '{}' from {}", module.name(), path.display());
                self.exec_into(module, &path)
            }
            None => {
                debug!("Module '{}' has no source, reload skipped", module.name());
                Ok(())
            }
        }
    }

    fn exec_into(&mut self, module: &Arc<Module>, path: &Path) -> LocResult<()> {
        let source = fs::read_to_string(path).map_err(|source| LocError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        runtime::exec_module(self, module, path, &source)
    }

    /// Выполнить `f` с откатом реестра при ошибке.
    ///
    /// Перед вызовом запоминаются записи для `name` и всех его предков
    /// (`a.b.c` -> `a`, `a.b`, `a.b.c`). Если `f` вернул ошибку, существовавшие
    /// записи возвращаются, новые удаляются, ошибка пробрасывается дальше.
    pub fn atomic_import<T>(
        &mut self,
        name: &str,
        f: impl FnOnce(&mut Self) -> LocResult<T>,
    ) -> LocResult<T> {
        let snapshot = self.registry.snapshot(explode_module_name(name));
        match f(self) {
            Ok(value) => Ok(value),
            Err(err) => {
                warn!("Import of '{}' failed, rolling back registry: {}", name, err);
                self.registry.restore(snapshot);
                Err(err)
            }
        }
    }

    /// Выгрузить модуль, если он всё ещё зарегистрирован под своим именем.
    pub fn unload(&mut self, module: &Arc<Module>) -> bool {
        match self.registry.get(module.name()) {
            Some(registered) if Arc::ptr_eq(&registered, module) => {
                debug!("Unloading module '{}'", module.name());
                self.registry.remove(module.name());
                true
            }
            _ => false,
        }
    }
}

impl Default for ModuleLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::{tempdir, TempDir};

    fn write(dir: &TempDir, rel: &str, text: &str) -> PathBuf {
        let path = dir.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        File::create(&path)
            .unwrap()
            .write_all(text.as_bytes())
            .unwrap();
        path
    }

    fn loader_for(dir: &TempDir) -> ModuleLoader {
        ModuleLoader::with_search_paths(vec![dir.path().to_path_buf()])
    }

    #[test]
    fn test_loader_creation() {
        let loader = ModuleLoader::new();
        assert_eq!(loader.registry().len(), 0);
    }

    #[test]
    fn test_import_simple_module() {
        let dir = tempdir().unwrap();
        write(&dir, "simple.sx", "(fn hello ())");

        let mut loader = loader_for(&dir);
        let module = loader.import("simple").unwrap();

        assert!(module.has_attr("hello"));
        assert!(loader.registry().contains("simple"));
    }

    #[test]
    fn test_import_is_cached() {
        let dir = tempdir().unwrap();
        write(&dir, "simple.sx", "(class A)");

        let mut loader = loader_for(&dir);
        let first = loader.import("simple").unwrap();
        let second = loader.import("simple").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_dotted_import_registers_parents() {
        let dir = tempdir().unwrap();
        write(&dir, "app/mod.sx", "(let version 1)");
        write(&dir, "app/config.sx", "(class Config)");

        let mut loader = loader_for(&dir);
        let config = loader.import("app.config").unwrap();

        let app = loader.registry().get("app").unwrap();
        assert!(app.is_package());
        assert!(app.has_attr("version"));
        let bound = app.get_attr("config").unwrap();
        assert!(Arc::ptr_eq(bound.as_module().unwrap(), &config));
    }

    #[test]
    fn test_namespace_parent() {
        let dir = tempdir().unwrap();
        write(&dir, "app/errors.sx", "(class Error1)");

        let mut loader = loader_for(&dir);
        loader.import("app.errors").unwrap();

        let app = loader.registry().get("app").unwrap();
        assert!(app.file().is_none());
        assert!(app.has_attr("errors"));
    }

    #[test]
    fn test_failed_import_rolls_back_parents() {
        let dir = tempdir().unwrap();
        write(&dir, "pkg/mod.sx", "(let ok 1)");
        write(&dir, "pkg/broken.sx", "(let a 1) (raise \"nope\")");

        let mut loader = loader_for(&dir);
        let err = loader.import("pkg.broken").unwrap_err();

        assert!(matches!(err, LocError::Raised(_)));
        assert!(loader.registry().is_empty());
    }

    #[test]
    fn test_missing_module() {
        let dir = tempdir().unwrap();
        let mut loader = loader_for(&dir);
        assert!(matches!(
            loader.import("nowhere"),
            Err(LocError::ModuleNotFound(ref name)) if name == "nowhere"
        ));
    }

    #[test]
    fn test_nested_import_from_module_body() {
        let dir = tempdir().unwrap();
        write(&dir, "base.sx", "(class Plugin)");
        write(
            &dir,
            "plugins.sx",
            "(import \"base\" :as b)\n(class Auth :extends b.Plugin)",
        );

        let mut loader = loader_for(&dir);
        let plugins = loader.import("plugins").unwrap();

        assert!(loader.registry().contains("base"));
        let auth = plugins.get_attr("Auth").unwrap();
        assert_eq!(auth.as_class().unwrap().bases().len(), 1);
    }

    #[test]
    fn test_self_import_sees_partial_module() {
        let dir = tempdir().unwrap();
        write(&dir, "selfref.sx", "(let early 1)\n(import \"selfref\" :as me)\n(let copy me.early)");

        let mut loader = loader_for(&dir);
        let module = loader.import("selfref").unwrap();
        assert_eq!(module.get_attr("copy").and_then(|v| v.as_int()), Some(1));
    }

    #[test]
    fn test_reload_keeps_identity() {
        let dir = tempdir().unwrap();
        let path = write(&dir, "conf.sx", "(class Config)");

        let mut loader = loader_for(&dir);
        let module = loader.import("conf").unwrap();
        let before = module.get_attr("Config").unwrap();

        write(&dir, "conf.sx", "(class Config) (let extra 2)");
        loader.reload(&module).unwrap();

        let after = module.get_attr("Config").unwrap();
        assert!(!before.is(&after));
        assert!(module.has_attr("extra"));
        assert!(Arc::ptr_eq(&loader.registry().get("conf").unwrap(), &module));
        assert_eq!(module.file(), Some(path.canonicalize().unwrap().as_path()));
    }

    #[test]
    fn test_unload() {
        let dir = tempdir().unwrap();
        write(&dir, "gone.sx", "(let x 1)");

        let mut loader = loader_for(&dir);
        let module = loader.import("gone").unwrap();
        assert!(loader.unload(&module));
        assert!(!loader.registry().contains("gone"));
        assert!(!loader.unload(&module));
    }
}
