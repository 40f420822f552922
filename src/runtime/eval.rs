//! Выполнение тела SX-модуля.
//!
//! Инструкции выполняются по порядку, привязки попадают в пространство имён
//! модуля (или в атрибуты класса, если мы внутри тела класса). Вложенные
//! `(import ...)` идут через тот же [`ModuleLoader`], поэтому видят модули,
//! зарегистрированные до начала выполнения, включая текущий.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use crate::error::{LocError, LocResult};
use crate::modules::ModuleLoader;
use crate::parser::{self, Atom, SExpr, Spanned};

use super::module::Module;
use super::value::{Class, Function, Instance, Origin, Value};

/// Область видимости тела класса.
struct ClassScope {
    qualname: String,
    attrs: BTreeMap<String, Value>,
}

/// Выполнить исходный код `source` в пространстве имён `module`.
pub fn exec_module(
    loader: &mut ModuleLoader,
    module: &Arc<Module>,
    file: &Path,
    source: &str,
) -> LocResult<()> {
    let exprs = parser::parse(source).map_err(|source| LocError::Parse {
        path: file.to_path_buf(),
        source,
    })?;

    let mut evaluator = Evaluator {
        loader,
        module: Arc::clone(module),
        file,
        source,
        scopes: Vec::new(),
    };

    for expr in &exprs {
        evaluator.exec_stmt(expr)?;
    }

    Ok(())
}

struct Evaluator<'a> {
    loader: &'a mut ModuleLoader,
    module: Arc<Module>,
    file: &'a Path,
    source: &'a str,
    scopes: Vec<ClassScope>,
}

impl Evaluator<'_> {
    /// Выполнить инструкцию.
    ///
    /// Использует stacker для расширения стека при глубокой вложенности классов.
    fn exec_stmt(&mut self, expr: &SExpr) -> LocResult<()> {
        stacker::maybe_grow(64 * 1024, 1024 * 1024, || {
            let Some(list) = expr.as_list() else {
                self.eval(expr)?;
                return Ok(());
            };

            match expr.form_name() {
                Some("let") => self.exec_let(list),
                Some("class") => self.exec_class(expr, list),
                Some("fn") => self.exec_fn(expr, list),
                Some("import") => self.exec_import(list),
                Some("raise") => self.exec_raise(list),
                _ => self.eval(expr).map(|_| ()),
            }
        })
    }

    /// `(let NAME EXPR)`
    fn exec_let(&mut self, list: &[SExpr]) -> LocResult<()> {
        if list.len() != 3 {
            return Err(self.invalid(&list[0], "expected (let NAME EXPR)"));
        }
        let name = self.simple_name(&list[1])?;
        let value = self.eval(&list[2])?;
        self.bind(name, value);
        Ok(())
    }

    /// `(class NAME [:extends BASE...] BODY...)`
    fn exec_class(&mut self, expr: &SExpr, list: &[SExpr]) -> LocResult<()> {
        let Some(name_expr) = list.get(1) else {
            return Err(self.invalid(expr, "expected (class NAME ...)"));
        };
        let name = self.simple_name(name_expr)?;

        let mut idx = 2;
        let mut bases = Vec::new();
        if list.get(idx).and_then(SExpr::as_keyword) == Some("extends") {
            idx += 1;
            while let Some(base_name) = list.get(idx).and_then(SExpr::as_ident) {
                match self.lookup_path(base_name)? {
                    Value::Class(base) => bases.push(base),
                    other => {
                        return Err(LocError::TypeError(format!(
                            "base '{}' of class '{}' is a {}, not a class",
                            base_name,
                            name,
                            other.type_name()
                        )))
                    }
                }
                idx += 1;
            }
            if bases.is_empty() {
                return Err(self.invalid(expr, ":extends requires at least one base class"));
            }
        }

        let qualname = self.qualify(&name);
        let origin = self.origin(expr);

        self.scopes.push(ClassScope {
            qualname: qualname.clone(),
            attrs: BTreeMap::new(),
        });
        let result = list[idx..].iter().try_for_each(|stmt| self.exec_stmt(stmt));
        let scope = self.scopes.pop();
        result?;

        let attrs = scope.map(|s| s.attrs).unwrap_or_default();
        let class = Class::new(
            name.clone(),
            qualname,
            self.module.name(),
            bases,
            attrs,
            origin,
        );
        self.bind(name, Value::Class(Arc::new(class)));
        Ok(())
    }

    /// `(fn NAME (PARAMS...) BODY...)` - только объявление.
    fn exec_fn(&mut self, expr: &SExpr, list: &[SExpr]) -> LocResult<()> {
        if list.len() < 3 {
            return Err(self.invalid(expr, "expected (fn NAME (PARAMS...) BODY...)"));
        }
        let name = self.simple_name(&list[1])?;
        let params = list[2]
            .as_list()
            .ok_or_else(|| self.invalid(&list[2], "expected parameter list"))?
            .iter()
            .map(|param| self.simple_name(param))
            .collect::<LocResult<Vec<_>>>()?;

        let function = Function::new(
            name.clone(),
            self.qualify(&name),
            self.module.name(),
            params,
            self.origin(expr),
        );
        self.bind(name, Value::Function(Arc::new(function)));
        Ok(())
    }

    /// `(import "dotted.name" [:as ALIAS])`
    fn exec_import(&mut self, list: &[SExpr]) -> LocResult<()> {
        let module_name = list
            .get(1)
            .and_then(SExpr::as_string)
            .ok_or_else(|| self.invalid(&list[0], "expected (import \"name\" [:as ALIAS])"))?;

        let alias = match (list.get(2), list.get(3)) {
            (None, None) => module_name
                .rsplit('.')
                .next()
                .unwrap_or(module_name)
                .to_string(),
            (Some(keyword), Some(alias)) if keyword.as_keyword() == Some("as") => {
                self.simple_name(alias)?
            }
            _ => return Err(self.invalid(&list[0], "expected (import \"name\" :as ALIAS)")),
        };

        let module = self.loader.import(module_name)?;
        self.bind(alias, Value::Module(module));
        Ok(())
    }

    /// `(raise EXPR)`
    fn exec_raise(&mut self, list: &[SExpr]) -> LocResult<()> {
        let message = match list.get(1) {
            Some(expr) => match self.eval(expr)? {
                Value::Str(s) => s.to_string(),
                other => other.to_string(),
            },
            None => "raised".to_string(),
        };
        Err(LocError::Raised(message))
    }

    /// Вычислить выражение.
    fn eval(&mut self, expr: &SExpr) -> LocResult<Value> {
        stacker::maybe_grow(64 * 1024, 1024 * 1024, || {
            match expr {
                SExpr::Atom(Spanned { value, .. }) => match value {
                    Atom::Int(n) => Ok(Value::Int(*n)),
                    Atom::Float(x) => Ok(Value::Float(*x)),
                    Atom::String(s) => Ok(Value::Str(Arc::from(s.as_str()))),
                    Atom::Ident(name) => match name.as_str() {
                        "true" => Ok(Value::Bool(true)),
                        "false" => Ok(Value::Bool(false)),
                        _ => self.lookup_path(name),
                    },
                    Atom::Keyword(keyword) => {
                        Err(self.invalid(expr, &format!("unexpected keyword :{}", keyword)))
                    }
                },
                SExpr::List(Spanned { value: list, .. }) => match expr.form_name() {
                    None if list.is_empty() => Ok(Value::Unit),
                    Some("new") => self.eval_new(expr, list),
                    _ => Err(self.invalid(expr, "unknown form")),
                },
            }
        })
    }

    /// `(new CLASS :field EXPR ...)`
    fn eval_new(&mut self, expr: &SExpr, list: &[SExpr]) -> LocResult<Value> {
        let Some(class_expr) = list.get(1) else {
            return Err(self.invalid(expr, "expected (new CLASS ...)"));
        };
        let class = match self.eval(class_expr)? {
            Value::Class(class) => class,
            other => {
                return Err(LocError::TypeError(format!(
                    "cannot instantiate a {}",
                    other.type_name()
                )))
            }
        };

        let mut fields = BTreeMap::new();
        let mut rest = list[2..].iter();
        while let Some(key) = rest.next() {
            let field = key
                .as_keyword()
                .ok_or_else(|| self.invalid(key, "expected :field"))?
                .to_string();
            let value_expr = rest
                .next()
                .ok_or_else(|| self.invalid(key, "missing field value"))?;
            let value = self.eval(value_expr)?;
            fields.insert(field, value);
        }

        Ok(Value::Instance(Arc::new(Instance::new(class, fields))))
    }

    /// Разрешить имя `a.b.c`: первый сегмент ищется в областях видимости,
    /// остальные - как атрибуты.
    fn lookup_path(&self, dotted: &str) -> LocResult<Value> {
        let mut segments = dotted.split('.');
        let head = segments.next().unwrap_or(dotted);

        let mut current = self
            .scopes
            .iter()
            .rev()
            .find_map(|scope| scope.attrs.get(head).cloned())
            .or_else(|| self.module.get_attr(head))
            .ok_or_else(|| LocError::UnknownName(dotted.to_string()))?;

        for segment in segments {
            current = current
                .get_attr(segment)
                .ok_or_else(|| LocError::AttributeNotFound(dotted.to_string()))?;
        }
        Ok(current)
    }

    fn bind(&mut self, name: String, value: Value) {
        match self.scopes.last_mut() {
            Some(scope) => {
                scope.attrs.insert(name, value);
            }
            None => self.module.set_attr(name, value),
        }
    }

    fn qualify(&self, name: &str) -> String {
        match self.scopes.last() {
            Some(scope) => format!("{}.{}", scope.qualname, name),
            None => name.to_string(),
        }
    }

    fn origin(&self, expr: &SExpr) -> Origin {
        Origin {
            file: self.file.to_path_buf(),
            line: expr.span().line(self.source),
        }
    }

    /// Имя без точек для привязки.
    fn simple_name(&self, expr: &SExpr) -> LocResult<String> {
        match expr.as_ident() {
            Some(name) if !name.contains('.') => Ok(name.to_string()),
            _ => Err(self.invalid(expr, "expected a plain name")),
        }
    }

    fn invalid(&self, expr: &SExpr, message: &str) -> LocError {
        LocError::InvalidForm(format!(
            "{} ({}:{})",
            message,
            self.file.display(),
            expr.span().line(self.source)
        ))
    }
}
