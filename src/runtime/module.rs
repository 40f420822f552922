//! `Module` - рантайм-представление загруженного модуля.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::value::Value;

/// Загруженный модуль.
///
/// Пространство имён лежит за `RwLock`, поэтому перезагрузка обновляет его на месте:
/// идентичность `Arc<Module>` в реестре сохраняется.
pub struct Module {
    /// Имя, под которым модуль был создан
    name: String,
    /// Путь к файлу (None для namespace-пакетов)
    file: Option<PathBuf>,
    /// Пакет (`mod.sx` или директория)
    package: bool,
    /// Атрибуты модуля
    namespace: RwLock<BTreeMap<String, Value>>,
}

impl Module {
    /// Создать пустой модуль без исходного файла.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            file: None,
            package: false,
            namespace: RwLock::new(BTreeMap::new()),
        }
    }

    /// Создать модуль, который будет выполнен из файла.
    pub fn from_file(name: impl Into<String>, file: PathBuf, package: bool) -> Self {
        Self {
            name: name.into(),
            file: Some(file),
            package,
            namespace: RwLock::new(BTreeMap::new()),
        }
    }

    /// Создать namespace-пакет (директория без `mod.sx`).
    pub fn namespace_package(name: impl Into<String>) -> Self {
        Self {
            package: true,
            ..Self::new(name)
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    pub fn is_package(&self) -> bool {
        self.package
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, Value>> {
        self.namespace.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, Value>> {
        self.namespace.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Получить атрибут модуля.
    pub fn get_attr(&self, name: &str) -> Option<Value> {
        self.read().get(name).cloned()
    }

    /// Установить атрибут модуля.
    pub fn set_attr(&self, name: impl Into<String>, value: Value) {
        self.write().insert(name.into(), value);
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.read().contains_key(name)
    }

    /// Имена атрибутов в порядке сортировки.
    pub fn names(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    /// Пары (имя, значение), отсортированные по имени.
    pub fn members(&self) -> Vec<(String, Value)> {
        self.read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

// Пространство имён может ссылаться на сам модуль, поэтому Debug не рекурсивный.
impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("name", &self.name)
            .field("file", &self.file)
            .field("package", &self.package)
            .field("attrs", &self.names())
            .finish()
    }
}
