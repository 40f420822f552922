//! Рантайм-значения SX-модулей.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use super::module::Module;

/// Место определения: файл и номер строки (с 1).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Origin {
    pub file: PathBuf,
    pub line: usize,
}

/// Класс, определённый в модуле.
#[derive(Debug)]
pub struct Class {
    name: String,
    qualname: String,
    module: String,
    bases: Vec<Arc<Class>>,
    attrs: BTreeMap<String, Value>,
    origin: Origin,
}

impl Class {
    pub fn new(
        name: impl Into<String>,
        qualname: impl Into<String>,
        module: impl Into<String>,
        bases: Vec<Arc<Class>>,
        attrs: BTreeMap<String, Value>,
        origin: Origin,
    ) -> Self {
        Self {
            name: name.into(),
            qualname: qualname.into(),
            module: module.into(),
            bases,
            attrs,
            origin,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Полное имя внутри модуля, например `Config.Nested`.
    pub fn qualname(&self) -> &str {
        &self.qualname
    }

    /// Имя модуля, в котором класс был определён.
    pub fn module_name(&self) -> &str {
        &self.module
    }

    pub fn bases(&self) -> &[Arc<Class>] {
        &self.bases
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    /// Найти атрибут: сначала собственные, затем базовые классы (в глубину, слева направо).
    pub fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.attrs.get(name) {
            return Some(value.clone());
        }
        self.bases.iter().find_map(|base| base.lookup(name))
    }

    /// Все атрибуты, включая унаследованные. Собственные перекрывают базовые.
    pub fn members(&self) -> BTreeMap<String, Value> {
        let mut members = BTreeMap::new();
        for base in self.bases.iter().rev() {
            members.extend(base.members());
        }
        members.extend(self.attrs.iter().map(|(k, v)| (k.clone(), v.clone())));
        members
    }

    /// Является ли класс подклассом `other` (или им самим).
    pub fn is_subclass_of(&self, other: &Arc<Class>) -> bool {
        std::ptr::eq(self, Arc::as_ptr(other))
            || self.bases.iter().any(|base| base.is_subclass_of(other))
    }
}

/// Экземпляр класса.
#[derive(Debug)]
pub struct Instance {
    class: Arc<Class>,
    fields: BTreeMap<String, Value>,
}

impl Instance {
    pub fn new(class: Arc<Class>, fields: BTreeMap<String, Value>) -> Self {
        Self { class, fields }
    }

    pub fn class(&self) -> &Arc<Class> {
        &self.class
    }

    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }
}

/// Объявленная функция.
#[derive(Debug)]
pub struct Function {
    name: String,
    qualname: String,
    module: String,
    params: Vec<String>,
    origin: Origin,
}

impl Function {
    pub fn new(
        name: impl Into<String>,
        qualname: impl Into<String>,
        module: impl Into<String>,
        params: Vec<String>,
        origin: Origin,
    ) -> Self {
        Self {
            name: name.into(),
            qualname: qualname.into(),
            module: module.into(),
            params,
            origin,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn qualname(&self) -> &str {
        &self.qualname
    }

    pub fn module_name(&self) -> &str {
        &self.module
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }
}

/// Представление рантайм-значений.
///
/// Клонирование дешёвое: составные значения разделяются через `Arc`,
/// и их идентичность наблюдаема через [`Value::is`].
#[derive(Debug, Clone)]
pub enum Value {
    /// Unit (отсутствие значения)
    Unit,
    /// Булево значение
    Bool(bool),
    /// Целое число
    Int(i64),
    /// Число с плавающей точкой
    Float(f64),
    /// Строка
    Str(Arc<str>),
    /// Класс
    Class(Arc<Class>),
    /// Экземпляр класса
    Instance(Arc<Instance>),
    /// Функция
    Function(Arc<Function>),
    /// Модуль
    Module(Arc<Module>),
}

/// Тип для проверки `is instance of` в [`crate::util::get_instances`].
#[derive(Debug, Clone)]
pub enum Ty {
    Int,
    Float,
    Str,
    Bool,
    Function,
    /// Любой класс (аналог `type`).
    Type,
    Module,
    /// Любое значение.
    Object,
    /// Экземпляры класса или его подклассов.
    Class(Arc<Class>),
}

impl Value {
    /// Идентичность: для `Arc`-значений - один и тот же объект, для скаляров - равенство.
    pub fn is(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Unit, Value::Unit) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Class(a), Value::Class(b)) => Arc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Arc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Arc::ptr_eq(a, b),
            (Value::Module(a), Value::Module(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Получить атрибут значения.
    pub fn get_attr(&self, name: &str) -> Option<Value> {
        match self {
            Value::Module(module) => module.get_attr(name),
            Value::Class(class) => class.lookup(name),
            Value::Instance(instance) => instance
                .fields()
                .get(name)
                .cloned()
                .or_else(|| instance.class().lookup(name)),
            _ => None,
        }
    }

    /// Все видимые атрибуты, отсортированные по имени.
    pub fn members(&self) -> Vec<(String, Value)> {
        match self {
            Value::Module(module) => module.members(),
            Value::Class(class) => class.members().into_iter().collect(),
            Value::Instance(instance) => {
                let mut members = instance.class().members();
                members.extend(
                    instance
                        .fields()
                        .iter()
                        .map(|(k, v)| (k.clone(), v.clone())),
                );
                members.into_iter().collect()
            }
            _ => Vec::new(),
        }
    }

    /// Место определения, если оно известно (классы и функции).
    pub fn origin(&self) -> Option<&Origin> {
        match self {
            Value::Class(class) => Some(class.origin()),
            Value::Function(function) => Some(function.origin()),
            _ => None,
        }
    }

    pub fn is_instance(&self, ty: &Ty) -> bool {
        match (ty, self) {
            (Ty::Object, _) => true,
            (Ty::Int, Value::Int(_))
            | (Ty::Float, Value::Float(_))
            | (Ty::Str, Value::Str(_))
            | (Ty::Bool, Value::Bool(_))
            | (Ty::Function, Value::Function(_))
            | (Ty::Type, Value::Class(_))
            | (Ty::Module, Value::Module(_)) => true,
            (Ty::Class(class), Value::Instance(instance)) => {
                instance.class().is_subclass_of(class)
            }
            _ => false,
        }
    }

    /// Имя типа значения для сообщений об ошибках.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Unit => "unit",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Class(_) => "class",
            Value::Instance(_) => "instance",
            Value::Function(_) => "function",
            Value::Module(_) => "module",
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_class(&self) -> Option<&Arc<Class>> {
        match self {
            Value::Class(class) => Some(class),
            _ => None,
        }
    }

    pub fn as_instance(&self) -> Option<&Arc<Instance>> {
        match self {
            Value::Instance(instance) => Some(instance),
            _ => None,
        }
    }

    pub fn as_module(&self) -> Option<&Arc<Module>> {
        match self {
            Value::Module(module) => Some(module),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unit => write!(f, "()"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => write!(f, "\"{}\"", s),
            Value::Class(class) => {
                write!(f, "<class '{}.{}'>", class.module_name(), class.qualname())
            }
            Value::Instance(instance) => {
                let class = instance.class();
                write!(f, "<{}.{} object>", class.module_name(), class.qualname())
            }
            Value::Function(function) => write!(
                f,
                "<function {}({})>",
                function.qualname(),
                function.params().join(", ")
            ),
            Value::Module(module) => match module.file() {
                Some(file) => write!(f, "<module '{}' from '{}'>", module.name(), file.display()),
                None => write!(f, "<module '{}' (namespace)>", module.name()),
            },
        }
    }
}
