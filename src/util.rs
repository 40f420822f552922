//! Вспомогательные функции: вложенные атрибуты, рефлексия, случайные имена.

use std::sync::Arc;

use data_encoding::BASE32_NOPAD;

use crate::error::{LocError, LocResult};
use crate::runtime::{Class, Ty, Value};

/// Получить атрибут по точечному пути `a.b.c`.
///
/// При первом же промахе возвращает [`LocError::AttributeNotFound`] с полным путём.
pub fn getattr_nested(value: &Value, name: &str) -> LocResult<Value> {
    getattr_nested_or_else(value, name, |full| LocError::AttributeNotFound(full.to_string()))
}

/// Как [`getattr_nested`], но вместо ошибки возвращает `default`.
pub fn getattr_nested_or(value: &Value, name: &str, default: Value) -> Value {
    walk(value, name).unwrap_or(default)
}

/// Как [`getattr_nested`], но ошибку строит вызывающий по полному пути.
pub fn getattr_nested_or_else<E>(
    value: &Value,
    name: &str,
    err: impl FnOnce(&str) -> E,
) -> Result<Value, E> {
    walk(value, name).ok_or_else(|| err(name))
}

fn walk(value: &Value, name: &str) -> Option<Value> {
    name.split('.')
        .try_fold(value.clone(), |current, segment| current.get_attr(segment))
}

/// Порядок результатов [`get_instances`] и [`get_subclasses`].
#[derive(Default)]
pub enum OrderBy<'a> {
    /// По имени атрибута.
    #[default]
    Name,
    /// По месту определения: файл, затем строка.
    Source,
    /// По ключу вызывающего (сортировка стабильная).
    Key(Box<dyn Fn(&Value) -> String + 'a>),
}

impl<'a> OrderBy<'a> {
    pub fn key(f: impl Fn(&Value) -> String + 'a) -> Self {
        OrderBy::Key(Box::new(f))
    }
}

/// Атрибуты контейнера, являющиеся экземплярами `ty`.
pub fn get_instances(container: &Value, ty: &Ty, order: OrderBy<'_>) -> LocResult<Vec<Value>> {
    let members = container
        .members()
        .into_iter()
        .filter(|(_, value)| value.is_instance(ty))
        .collect();
    sorted(members, order)
}

/// Классы контейнера, являющиеся строгими подклассами `base`.
pub fn get_subclasses(container: &Value, base: &Arc<Class>, order: OrderBy<'_>) -> LocResult<Vec<Value>> {
    let members = container
        .members()
        .into_iter()
        .filter(|(_, value)| match value {
            Value::Class(class) => !Arc::ptr_eq(class, base) && class.is_subclass_of(base),
            _ => false,
        })
        .collect();
    sorted(members, order)
}

/// `members` приходят отсортированными по имени.
fn sorted(mut members: Vec<(String, Value)>, order: OrderBy<'_>) -> LocResult<Vec<Value>> {
    match order {
        OrderBy::Name => {}
        OrderBy::Source => {
            let mut located = members
                .into_iter()
                .map(|(name, value)| match value.origin() {
                    Some(origin) => Ok((origin.clone(), value)),
                    None => Err(LocError::NoSourceLocation(name)),
                })
                .collect::<LocResult<Vec<_>>>()?;
            located.sort_by(|(a, _), (b, _)| a.cmp(b));
            return Ok(located.into_iter().map(|(_, value)| value).collect());
        }
        OrderBy::Key(key) => members.sort_by_cached_key(|(_, value)| key(value)),
    }
    Ok(members.into_iter().map(|(_, value)| value).collect())
}

/// Случайное имя модуля: `u` + base32 от 128 случайных бит.
///
/// Всегда является допустимым идентификатором.
pub fn random_name() -> String {
    let bytes: [u8; 16] = rand::random();
    format!("u{}", BASE32_NOPAD.encode(&bytes).to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::ModuleLoader;
    use std::collections::HashSet;
    use std::fs;
    use tempfile::tempdir;

    fn load_source(source: &str) -> (tempfile::TempDir, Value) {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("zoo.sx"), source).unwrap();
        let mut loader = ModuleLoader::with_search_paths(vec![dir.path().to_path_buf()]);
        let module = loader.import("zoo").unwrap();
        (dir, Value::Module(module))
    }

    fn names(values: &[Value]) -> Vec<String> {
        values
            .iter()
            .map(|v| match v {
                Value::Class(c) => c.name().to_string(),
                Value::Function(f) => f.name().to_string(),
                other => other.to_string(),
            })
            .collect()
    }

    const ZOO: &str = "\
(class Animal)
(class Zebra :extends Animal)
(class Ant :extends Animal)
(class Rock)
(let zed (new Zebra))
(let ann (new Ant))
(let count 3)
";

    #[test]
    fn test_getattr_nested() {
        let (_dir, module) =
            load_source("(class Config (class Nested (let value 7)))");
        let value = getattr_nested(&module, "Config.Nested.value").unwrap();
        assert_eq!(value.as_int(), Some(7));
    }

    #[test]
    fn test_getattr_nested_reports_full_path() {
        let (_dir, module) = load_source("(class Config)");
        let err = getattr_nested(&module, "Config.Missing.deeper").unwrap_err();
        assert!(matches!(err, LocError::AttributeNotFound(ref n) if n == "Config.Missing.deeper"));
    }

    #[test]
    fn test_getattr_nested_defaults() {
        let (_dir, module) = load_source("(let a 1)");
        let fallback = getattr_nested_or(&module, "b.c", Value::Int(-1));
        assert_eq!(fallback.as_int(), Some(-1));

        let err: Result<Value, String> =
            getattr_nested_or_else(&module, "b.c", |name| format!("missing {}", name));
        assert_eq!(err.unwrap_err(), "missing b.c");
    }

    #[test]
    fn test_get_subclasses_by_name_and_source() {
        let (_dir, module) = load_source(ZOO);
        let animal = module.get_attr("Animal").unwrap();
        let animal = animal.as_class().unwrap();

        let by_name = get_subclasses(&module, animal, OrderBy::Name).unwrap();
        assert_eq!(names(&by_name), vec!["Ant", "Zebra"]);

        let by_source = get_subclasses(&module, animal, OrderBy::Source).unwrap();
        assert_eq!(names(&by_source), vec!["Zebra", "Ant"]);
    }

    #[test]
    fn test_get_subclasses_by_key() {
        let (_dir, module) = load_source(ZOO);
        let animal = module.get_attr("Animal").unwrap();
        let animal = animal.as_class().unwrap();

        let by_len = get_subclasses(
            &module,
            animal,
            OrderBy::key(|v| v.as_class().map(|c| c.name().len().to_string()).unwrap_or_default()),
        )
        .unwrap();
        assert_eq!(names(&by_len), vec!["Ant", "Zebra"]);
    }

    #[test]
    fn test_get_instances() {
        let (_dir, module) = load_source(ZOO);
        let animal = module.get_attr("Animal").unwrap();
        let animal = animal.as_class().unwrap();

        let animals = get_instances(&module, &Ty::Class(Arc::clone(animal)), OrderBy::Name).unwrap();
        assert_eq!(animals.len(), 2);
        assert!(animals[0].is(&module.get_attr("ann").unwrap()));

        let classes = get_instances(&module, &Ty::Type, OrderBy::Name).unwrap();
        assert_eq!(names(&classes), vec!["Animal", "Ant", "Rock", "Zebra"]);

        let ints = get_instances(&module, &Ty::Int, OrderBy::Name).unwrap();
        assert_eq!(ints.len(), 1);
    }

    #[test]
    fn test_source_order_needs_origin() {
        let (_dir, module) = load_source(ZOO);
        let err = get_instances(&module, &Ty::Object, OrderBy::Source).unwrap_err();
        assert!(matches!(err, LocError::NoSourceLocation(ref n) if n == "ann"));
    }

    #[test]
    fn test_random_name() {
        let mut seen = HashSet::new();
        for _ in 0..64 {
            let name = random_name();
            assert_eq!(name.len(), 27);
            assert!(name.starts_with('u'));
            assert!(name
                .chars()
                .all(|c| c.is_ascii_lowercase() || ('2'..='7').contains(&c)));
            let decoded = BASE32_NOPAD
                .decode(name[1..].to_ascii_uppercase().as_bytes())
                .unwrap();
            assert_eq!(decoded.len(), 16);
            assert!(seen.insert(name));
        }
    }
}
