//! # importloc
//!
//! Загрузка SX-модулей и объектов по строке-локации.
//!
//! ## Основные модули
//!
//! - [`location`] - Разбор локаций и загрузка с политикой конфликтов имён
//! - [`modules`] - Реестр, поиск и загрузчик модулей
//! - [`runtime`] - Значения и выполнение SX-модулей
//! - [`parser`] - S-Expression парсер
//! - [`util`] - Вложенные атрибуты, рефлексия, случайные имена
//! - [`dirlay`] - Временные раскладки файлов для тестов
//!
//! ## Формат локации
//!
//! - `pkg.mod` или `pkg.mod:Obj.Nested` - модуль по точечному имени
//! - `dir/file.sx` или `dir/file.sx:Obj` - модуль по пути к файлу
//!
//! ## Пример
//!
//! ```rust,ignore
//! use importloc::{ConflictResolution, LoadOptions, Location};
//!
//! let location = Location::parse("plugins.auth:AuthPlugin")?;
//! let plugin = location.load(&LoadOptions::new().on_conflict(ConflictResolution::Reuse))?;
//! ```

// === Основные модули ===
pub mod error;
pub mod location;
pub mod modules;
pub mod parser;
pub mod runtime;

// === Дополнительные модули ===
pub mod dirlay;
pub mod util;

// === Re-exports для удобства ===
pub use dirlay::{DirectoryLayout, File};
pub use error::{LocError, LocResult};
pub use location::{
    ConflictResolution, LoadOptions, Location, LocationBuilder, ModuleLocation, NameOverride,
    PathLocation,
};
pub use modules::{ModuleConfig, ModuleLoader, ModuleRegistry};
pub use runtime::{Class, Module, Ty, Value};
pub use util::{get_instances, get_subclasses, getattr_nested, random_name, OrderBy};
