//! Рантайм SX-модулей: значения, объект модуля и выполнение тела модуля.

mod eval;
mod module;
mod value;

pub use eval::exec_module;
pub use module::Module;
pub use value::{Class, Function, Instance, Origin, Ty, Value};
