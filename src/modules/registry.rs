//! Реестр модулей.

use std::collections::HashMap;
use std::sync::Arc;

use crate::runtime::Module;

/// Реестр загруженных модулей: имя -> модуль.
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    /// Загруженные модули по имени
    modules: HashMap<String, Arc<Module>>,
}

/// Снимок записей реестра для отката.
///
/// `None` означает, что имени в реестре не было.
#[derive(Debug)]
pub struct Snapshot {
    entries: Vec<(String, Option<Arc<Module>>)>,
}

impl Snapshot {
    /// Имена, попавшие в снимок.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }
}

impl ModuleRegistry {
    /// Создать новый реестр.
    pub fn new() -> Self {
        Self::default()
    }

    /// Получить модуль по имени.
    pub fn get(&self, name: &str) -> Option<Arc<Module>> {
        self.modules.get(name).cloned()
    }

    /// Зарегистрировать модуль под именем. Возвращает предыдущую запись.
    pub fn insert(&mut self, name: impl Into<String>, module: Arc<Module>) -> Option<Arc<Module>> {
        self.modules.insert(name.into(), module)
    }

    /// Удалить модуль из реестра.
    pub fn remove(&mut self, name: &str) -> Option<Arc<Module>> {
        self.modules.remove(name)
    }

    /// Проверить, загружен ли модуль.
    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    /// Имена загруженных модулей (отсортированы).
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.modules.keys().cloned().collect();
        names.sort();
        names
    }

    /// Получить количество загруженных модулей.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Запомнить текущее состояние записей для `names`.
    pub fn snapshot<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> Snapshot {
        Snapshot {
            entries: names
                .into_iter()
                .map(|name| (name.to_string(), self.get(name)))
                .collect(),
        }
    }

    /// Вернуть записи к состоянию снимка: существовавшие - на место,
    /// отсутствовавшие - удалить.
    pub fn restore(&mut self, snapshot: Snapshot) {
        for (name, previous) in snapshot.entries {
            match previous {
                Some(module) => {
                    self.modules.insert(name, module);
                }
                None => {
                    self.modules.remove(&name);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_insert() {
        let mut registry = ModuleRegistry::new();
        registry.insert("math", Arc::new(Module::new("math")));

        assert!(registry.contains("math"));
        assert!(!registry.contains("string"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_insert_returns_previous() {
        let mut registry = ModuleRegistry::new();
        let first = Arc::new(Module::new("m"));
        registry.insert("m", Arc::clone(&first));
        let previous = registry.insert("m", Arc::new(Module::new("m"))).unwrap();
        assert!(Arc::ptr_eq(&previous, &first));
    }

    #[test]
    fn test_snapshot_restore() {
        let mut registry = ModuleRegistry::new();
        let parent = Arc::new(Module::new("a"));
        registry.insert("a", Arc::clone(&parent));

        let snapshot = registry.snapshot(["a", "a.b"]);
        assert_eq!(snapshot.names().collect::<Vec<_>>(), vec!["a", "a.b"]);

        registry.insert("a", Arc::new(Module::new("a")));
        registry.insert("a.b", Arc::new(Module::new("a.b")));
        registry.restore(snapshot);

        assert!(Arc::ptr_eq(&registry.get("a").unwrap(), &parent));
        assert!(!registry.contains("a.b"));
        assert_eq!(registry.names(), vec!["a".to_string()]);
    }
}
