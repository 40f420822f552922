//! Разрешение конфликтов имён в реестре модулей.

use std::fmt;
use std::str::FromStr;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{LocError, LocResult};
use crate::modules::ModuleRegistry;

use super::{LoadOptions, Location, NameOverride};

/// Поведение, если модуль с нужным именем уже есть в реестре.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictResolution {
    /// Не импортировать заново, взять модуль из реестра.
    Reuse,
    /// Не импортировать заново, перевыполнить существующий модуль на месте.
    Reload,
    /// Импортировать заново и заменить запись в реестре.
    Replace,
    /// Повторить импорт под новым сгенерированным именем; если и оно занято -
    /// [`LocError::ModuleNameConflict`].
    Rename,
    /// Вернуть [`LocError::ModuleNameConflict`].
    #[default]
    Raise,
}

impl ConflictResolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reuse => "reuse",
            Self::Reload => "reload",
            Self::Replace => "replace",
            Self::Rename => "rename",
            Self::Raise => "raise",
        }
    }
}

impl fmt::Display for ConflictResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConflictResolution {
    type Err = LocError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reuse" => Ok(Self::Reuse),
            "reload" => Ok(Self::Reload),
            "replace" => Ok(Self::Replace),
            "rename" => Ok(Self::Rename),
            "raise" => Ok(Self::Raise),
            other => Err(LocError::Usage(format!(
                "unknown conflict resolution '{}' (expected reuse, reload, replace, rename or raise)",
                other
            ))),
        }
    }
}

/// Что сделать с модулем после разрешения имени.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Импортировать модуль под этим именем (запись, если есть, будет заменена).
    ImportFresh(String),
    /// Взять зарегистрированный модуль.
    UseExisting(String),
    /// Перевыполнить зарегистрированный модуль и взять его.
    ReloadExisting(String),
}

impl Action {
    pub fn module_name(&self) -> &str {
        match self {
            Self::ImportFresh(name) | Self::UseExisting(name) | Self::ReloadExisting(name) => name,
        }
    }
}

/// Решить, под каким именем и как загружать модуль для `location`.
///
/// Реестр только читается; перезагрузку выполняет вызывающий код.
pub fn resolve_module_name(
    location: &Location,
    options: &LoadOptions<'_>,
    registry: &ModuleRegistry,
) -> LocResult<Action> {
    if options.on_conflict == ConflictResolution::Rename && options.retry_name.is_none() {
        return Err(LocError::Usage(
            "retry_name is required when on_conflict is 'rename'".to_string(),
        ));
    }

    let name = match &options.module_name {
        NameOverride::Default => location.default_module_name(),
        NameOverride::Literal(name) => name.clone(),
        NameOverride::Generate(generate) => generate(location),
    };

    if !registry.contains(&name) {
        debug!("Module name '{}' is free, importing", name);
        return Ok(Action::ImportFresh(name));
    }

    debug!(
        "Module name '{}' is taken, resolving with '{}'",
        name, options.on_conflict
    );
    match options.on_conflict {
        ConflictResolution::Reuse => Ok(Action::UseExisting(name)),
        ConflictResolution::Reload => Ok(Action::ReloadExisting(name)),
        ConflictResolution::Replace => Ok(Action::ImportFresh(name)),
        ConflictResolution::Rename => {
            let retry = options
                .retry_name
                .as_ref()
                .ok_or_else(|| LocError::Usage("retry_name is missing".to_string()))?;
            let renamed = retry(location);
            if registry.contains(&renamed) {
                Err(LocError::ModuleNameConflict(renamed))
            } else {
                Ok(Action::ImportFresh(renamed))
            }
        }
        ConflictResolution::Raise => Err(LocError::ModuleNameConflict(name)),
    }
}
