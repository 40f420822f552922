//! Локации: строка вида `pkg.mod:Obj` или `dir/file.sx:Obj` и их загрузка.
//!
//! ## Пример
//!
//! ```rust,ignore
//! use importloc::{Location, LoadOptions, ConflictResolution};
//!
//! let location = Location::parse("app/config.sx:Config")?;
//! let options = LoadOptions::new().on_conflict(ConflictResolution::Reuse);
//! let config = location.load(&options)?;
//! ```
//!
//! Загрузка атомарна: если импорт модуля или поиск объекта завершились
//! ошибкой, реестр возвращается к состоянию до вызова.

mod conflict;
mod grammar;

pub use conflict::{resolve_module_name, Action, ConflictResolution};

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::{LocError, LocResult};
use crate::modules::{ModuleLoader, ModuleResolver};
use crate::runtime::{Module, Value};
use crate::util::{getattr_nested, random_name};

/// Модуль, заданный точечным именем.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "LocationFields<String>")]
pub struct ModuleLocation {
    spec: String,
    module: String,
    obj: Option<String>,
}

impl ModuleLocation {
    /// Разобрать только по грамматике модуля.
    pub fn parse(spec: &str) -> LocResult<Self> {
        let parts = grammar::match_module(spec)
            .ok_or_else(|| LocError::InvalidLocation(spec.to_string()))?;
        Ok(Self {
            spec: spec.to_string(),
            module: parts.target,
            obj: parts.obj,
        })
    }

    pub fn new(module: impl Into<String>, obj: Option<String>) -> Self {
        let module = module.into();
        Self {
            spec: join_spec(&module, obj.as_deref()),
            module,
            obj,
        }
    }

    pub fn module(&self) -> &str {
        &self.module
    }
}

/// Модуль, заданный путём к файлу `.sx`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "LocationFields<PathBuf>")]
pub struct PathLocation {
    spec: String,
    path: PathBuf,
    obj: Option<String>,
}

impl PathLocation {
    /// Разобрать только по грамматике пути.
    pub fn parse(spec: &str) -> LocResult<Self> {
        let parts = grammar::match_path(spec)
            .ok_or_else(|| LocError::InvalidLocation(spec.to_string()))?;
        Ok(Self {
            spec: spec.to_string(),
            path: PathBuf::from(parts.target),
            obj: parts.obj,
        })
    }

    pub fn new(path: impl Into<PathBuf>, obj: Option<String>) -> Self {
        let path = path.into();
        Self {
            spec: join_spec(&path.to_string_lossy(), obj.as_deref()),
            path,
            obj,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Абсолютный путь к существующему файлу.
    fn validated_path(&self, resolver: &ModuleResolver) -> LocResult<PathBuf> {
        let path = resolver.absolute(&self.path);
        if !path.exists() {
            return Err(LocError::FileNotFound(path));
        }
        if path.is_dir() {
            return Err(LocError::IsADirectory(path));
        }
        Ok(path)
    }
}

/// Поля локации в сериализованном виде; `spec` обязан им соответствовать.
#[derive(Deserialize)]
struct LocationFields<T> {
    spec: String,
    #[serde(alias = "module", alias = "path")]
    target: T,
    #[serde(default)]
    obj: Option<String>,
}

impl TryFrom<LocationFields<String>> for ModuleLocation {
    type Error = LocError;

    fn try_from(fields: LocationFields<String>) -> LocResult<Self> {
        let location = Self::parse(&fields.spec)?;
        if location.module != fields.target || location.obj != fields.obj {
            return Err(LocError::InvalidLocation(fields.spec));
        }
        Ok(location)
    }
}

impl TryFrom<LocationFields<PathBuf>> for PathLocation {
    type Error = LocError;

    fn try_from(fields: LocationFields<PathBuf>) -> LocResult<Self> {
        let location = Self::parse(&fields.spec)?;
        if location.path != fields.target || location.obj != fields.obj {
            return Err(LocError::InvalidLocation(fields.spec));
        }
        Ok(location)
    }
}

fn join_spec(target: &str, obj: Option<&str>) -> String {
    match obj {
        Some(obj) => format!("{}:{}", target, obj),
        None => target.to_string(),
    }
}

/// Разобранная локация.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Location {
    Module(ModuleLocation),
    Path(PathLocation),
}

impl Location {
    /// Разобрать строку: сначала грамматика модуля, затем грамматика пути.
    pub fn parse(spec: &str) -> LocResult<Self> {
        if let Some(parts) = grammar::match_module(spec) {
            return Ok(Location::Module(ModuleLocation {
                spec: spec.to_string(),
                module: parts.target,
                obj: parts.obj,
            }));
        }
        if let Some(parts) = grammar::match_path(spec) {
            return Ok(Location::Path(PathLocation {
                spec: spec.to_string(),
                path: PathBuf::from(parts.target),
                obj: parts.obj,
            }));
        }
        Err(LocError::InvalidLocation(spec.to_string()))
    }

    pub fn builder() -> LocationBuilder {
        LocationBuilder::default()
    }

    pub fn spec(&self) -> &str {
        match self {
            Location::Module(loc) => &loc.spec,
            Location::Path(loc) => &loc.spec,
        }
    }

    pub fn obj(&self) -> Option<&str> {
        match self {
            Location::Module(loc) => loc.obj.as_deref(),
            Location::Path(loc) => loc.obj.as_deref(),
        }
    }

    /// Имя модуля по умолчанию: имя модуля или имя файла без расширения.
    pub fn default_module_name(&self) -> String {
        match self {
            Location::Module(loc) => loc.module.clone(),
            Location::Path(loc) => loc
                .path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default(),
        }
    }

    /// Отладочное представление: `<ModuleLocation 'pkg.mod' obj='Obj'>`.
    pub fn repr(&self) -> String {
        let (kind, target) = match self {
            Location::Module(loc) => ("ModuleLocation", loc.module.clone()),
            Location::Path(loc) => ("PathLocation", loc.path.to_string_lossy().into_owned()),
        };
        match self.obj() {
            Some(obj) => format!("<{} '{}' obj='{}'>", kind, target, obj),
            None => format!("<{} '{}'>", kind, target),
        }
    }

    /// Загрузить через общий загрузчик процесса.
    pub fn load(&self, options: &LoadOptions<'_>) -> LocResult<Value> {
        let mut loader = ModuleLoader::global()
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        self.load_with(&mut loader, options)
    }

    /// Загрузить через переданный загрузчик.
    ///
    /// Возвращает модуль или, если задан `obj`, объект внутри него.
    pub fn load_with(&self, loader: &mut ModuleLoader, options: &LoadOptions<'_>) -> LocResult<Value> {
        let action = resolve_module_name(self, options, loader.registry())?;
        let source = match self {
            Location::Path(loc) => Some(loc.validated_path(loader.resolver())?),
            Location::Module(_) => None,
        };
        debug!("Loading {} with {:?}", self.repr(), action);

        match action {
            Action::ImportFresh(name) => loader.atomic_import(&name, |loader| {
                let module = self.materialize(loader, &name, source.as_deref())?;
                self.select(module)
            }),
            Action::UseExisting(name) => {
                let module = registered(loader, &name)?;
                self.select(module)
            }
            Action::ReloadExisting(name) => {
                let module = registered(loader, &name)?;
                loader
                    .reload(&module)
                    .map_err(|err| LocError::import_failed(name.as_str(), err))?;
                self.select(module)
            }
        }
    }

    fn materialize(
        &self,
        loader: &mut ModuleLoader,
        name: &str,
        source: Option<&Path>,
    ) -> LocResult<Arc<Module>> {
        match (self, source) {
            (Location::Path(_), Some(path)) => loader
                .exec_file(name, path, false)
                .map_err(|err| LocError::import_failed(name, err)),
            (Location::Path(loc), None) => Err(LocError::FileNotFound(loc.path.clone())),
            (Location::Module(loc), _) => {
                loader
                    .import_fresh(&loc.module, name)
                    .map_err(|err| match err {
                        not_found @ LocError::ModuleNotFound(_) => not_found,
                        other => LocError::import_failed(name, other),
                    })
            }
        }
    }

    fn select(&self, module: Arc<Module>) -> LocResult<Value> {
        let module = Value::Module(module);
        match self.obj() {
            Some(obj) => getattr_nested(&module, obj),
            None => Ok(module),
        }
    }
}

fn registered(loader: &ModuleLoader, name: &str) -> LocResult<Arc<Module>> {
    loader
        .registry()
        .get(name)
        .ok_or_else(|| LocError::ModuleNotFound(name.to_string()))
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.spec())
    }
}

/// Построитель локации из строки или из явных полей.
///
/// Строка не сочетается с полями; без строки нужен ровно один из
/// `module` и `path`.
#[derive(Debug, Clone, Default)]
pub struct LocationBuilder {
    spec: Option<String>,
    module: Option<String>,
    path: Option<PathBuf>,
    obj: Option<String>,
}

impl LocationBuilder {
    pub fn spec(mut self, spec: impl Into<String>) -> Self {
        self.spec = Some(spec.into());
        self
    }

    pub fn module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn obj(mut self, obj: impl Into<String>) -> Self {
        self.obj = Some(obj.into());
        self
    }

    pub fn build(self) -> LocResult<Location> {
        if let Some(spec) = self.spec {
            if self.module.is_some() || self.path.is_some() || self.obj.is_some() {
                return Err(LocError::Usage(
                    "spec cannot be combined with module, path or obj".to_string(),
                ));
            }
            return Location::parse(&spec);
        }

        match (self.module, self.path) {
            (Some(module), None) => Ok(Location::Module(ModuleLocation::new(module, self.obj))),
            (None, Some(path)) => Ok(Location::Path(PathLocation::new(path, self.obj))),
            (Some(_), Some(_)) => Err(LocError::Usage(
                "module and path are mutually exclusive".to_string(),
            )),
            (None, None) => Err(LocError::Usage(
                "either spec, module or path is required".to_string(),
            )),
        }
    }
}

/// Генератор имени модуля по локации.
pub type NameFn<'a> = Box<dyn Fn(&Location) -> String + 'a>;

/// Имя, под которым модуль регистрируется.
#[derive(Default)]
pub enum NameOverride<'a> {
    /// Имя модуля или имя файла без расширения.
    #[default]
    Default,
    Literal(String),
    Generate(NameFn<'a>),
}

impl fmt::Debug for NameOverride<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameOverride::Default => f.write_str("Default"),
            NameOverride::Literal(name) => f.debug_tuple("Literal").field(name).finish(),
            NameOverride::Generate(_) => f.write_str("Generate(..)"),
        }
    }
}

/// Параметры загрузки.
#[derive(Default)]
pub struct LoadOptions<'a> {
    module_name: NameOverride<'a>,
    on_conflict: ConflictResolution,
    retry_name: Option<NameFn<'a>>,
}

impl<'a> LoadOptions<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Зарегистрировать модуль под этим именем.
    pub fn module_name(mut self, name: impl Into<String>) -> Self {
        self.module_name = NameOverride::Literal(name.into());
        self
    }

    /// Вычислить имя модуля по локации.
    pub fn module_name_with(mut self, f: impl Fn(&Location) -> String + 'a) -> Self {
        self.module_name = NameOverride::Generate(Box::new(f));
        self
    }

    pub fn on_conflict(mut self, policy: ConflictResolution) -> Self {
        self.on_conflict = policy;
        self
    }

    /// Генератор имени для повторной попытки при [`ConflictResolution::Rename`].
    pub fn retry_name(mut self, f: impl Fn(&Location) -> String + 'a) -> Self {
        self.retry_name = Some(Box::new(f));
        self
    }

    /// `Rename` со случайным именем из [`random_name`].
    pub fn rename_random(self) -> Self {
        self.on_conflict(ConflictResolution::Rename)
            .retry_name(|_| random_name())
    }
}

impl fmt::Debug for LoadOptions<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadOptions")
            .field("module_name", &self.module_name)
            .field("on_conflict", &self.on_conflict)
            .field("retry_name", &self.retry_name.as_ref().map(|_| ".."))
            .finish()
    }
}

impl ModuleLoader {
    /// Загрузить строку-локацию этим загрузчиком.
    pub fn load_spec(&mut self, spec: &str, options: &LoadOptions<'_>) -> LocResult<Value> {
        let location = Location::parse(spec)?;
        info!("Loading location '{}'", location);
        location.load_with(self, options)
    }
}
