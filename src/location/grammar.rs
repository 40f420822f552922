//! Грамматики строк-локаций.
//!
//! | Вариант           | Формат                                             |
//! |-------------------|----------------------------------------------------|
//! | `PathLocation`    | `(?:.*/)?[^/]*\.sx` + необязательный `:obj`        |
//! | `ModuleLocation`  | `[^./:]+(?:\.[^./:]+)*` + необязательный `:obj`    |
//!
//! `obj` - `[^./:]+(?:\.[^./:]+)*`. Строка с `/` или с расширением `.sx` у цели -
//! всегда путь; грамматика модуля такие строки отвергает.

use std::sync::LazyLock;

use regex::Regex;

use crate::modules::SOURCE_EXTENSION;

const OBJ: &str = r"[^./:]+(?:\.[^./:]+)*";

static MODULE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^(?P<module>{OBJ})(?::(?P<obj>{OBJ}))?$"))
        .expect("module location regex is valid")
});

static PATH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^(?P<path>(?:.*/)?[^/]*\.{ext})(?::(?P<obj>{OBJ}))?$",
        ext = regex::escape(SOURCE_EXTENSION)
    ))
    .expect("path location regex is valid")
});

/// Разобранная строка: цель и необязательный путь к объекту.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecParts {
    pub target: String,
    pub obj: Option<String>,
}

fn has_source_extension(target: &str) -> bool {
    target
        .rsplit_once('.')
        .is_some_and(|(stem, ext)| !stem.is_empty() && ext == SOURCE_EXTENSION)
}

/// Сопоставить с грамматикой модуля: `pkg.mod:Obj.Nested`.
pub fn match_module(spec: &str) -> Option<SpecParts> {
    let caps = MODULE_RE.captures(spec)?;
    let module = caps.name("module")?.as_str();
    if has_source_extension(module) {
        return None;
    }
    Some(SpecParts {
        target: module.to_string(),
        obj: caps.name("obj").map(|m| m.as_str().to_string()),
    })
}

/// Сопоставить с грамматикой пути: `dir/file.sx:Obj.Nested`.
pub fn match_path(spec: &str) -> Option<SpecParts> {
    let caps = PATH_RE.captures(spec)?;
    Some(SpecParts {
        target: caps.name("path")?.as_str().to_string(),
        obj: caps.name("obj").map(|m| m.as_str().to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts(target: &str, obj: Option<&str>) -> Option<SpecParts> {
        Some(SpecParts {
            target: target.to_string(),
            obj: obj.map(str::to_string),
        })
    }

    #[test]
    fn test_module_grammar() {
        assert_eq!(match_module("pkg.mod:Obj"), parts("pkg.mod", Some("Obj")));
        assert_eq!(match_module("app.__main__:cli"), parts("app.__main__", Some("cli")));
        assert_eq!(match_module("logging"), parts("logging", None));
        assert_eq!(match_module("a:b.c"), parts("a", Some("b.c")));
    }

    #[test]
    fn test_module_grammar_rejects_paths() {
        assert_eq!(match_module("pkg/mod"), None);
        assert_eq!(match_module("config.sx:conf"), None);
        assert_eq!(match_module("a..b"), None);
        assert_eq!(match_module(".hidden"), None);
        assert_eq!(match_module("a:b:c"), None);
        assert_eq!(match_module(""), None);
    }

    #[test]
    fn test_path_grammar() {
        assert_eq!(
            match_path("pkg/mod.sx:Obj.Nested"),
            parts("pkg/mod.sx", Some("Obj.Nested"))
        );
        assert_eq!(match_path("../config.sx"), parts("../config.sx", None));
        assert_eq!(match_path("./config.sx:conf"), parts("./config.sx", Some("conf")));
        assert_eq!(match_path("config.sx"), parts("config.sx", None));
        assert_eq!(match_path("/abs/dir/x.sx"), parts("/abs/dir/x.sx", None));
    }

    #[test]
    fn test_path_grammar_rejects() {
        assert_eq!(match_path("pkg/mod.txt"), None);
        assert_eq!(match_path("pkg.mod:Obj"), None);
        assert_eq!(match_path("pkg/mod.sx:a/b"), None);
        assert_eq!(match_path("pkg/mod.sx:"), None);
    }
}
