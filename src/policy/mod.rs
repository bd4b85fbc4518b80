//! Node policies: the single capability the engine borrows from its host.
//!
//! A flow shape, a release rule or a dynamic area is anything that can be invoked with a
//! short list of numbers. Hosts (native closures, scenario files, Python) adapt their
//! own values to [`Callable`] at the boundary; the engine only ever sees this trait.

pub mod builtin;

use crate::units::format_number;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

pub use builtin::{FlowShape, ReleaseRule};

/// What a host callable handed back. Only `Number` is meaningful to the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum HostValue {
    Number(f64),
    Bool(bool),
    Text(String),
    Nil,
    /// Any other host object; only its type name is kept.
    Other(String),
}

impl HostValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            HostValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            HostValue::Number(_) => "number",
            HostValue::Bool(_) => "bool",
            HostValue::Text(_) => "string",
            HostValue::Nil => "nil",
            HostValue::Other(_) => "object",
        }
    }
}

/// The callable itself failed inside the host.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{0}")]
pub struct HostError(pub String);

impl HostError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

pub trait Callable: fmt::Debug + Send + Sync {
    fn arity(&self) -> usize;

    fn call(&self, args: &[f64]) -> Result<HostValue, HostError>;

    /// Short label used in tree diagrams.
    fn describe(&self) -> String {
        "<fn>".to_string()
    }
}

pub type PolicyRef = Arc<dyn Callable>;

/// The node property a policy is bound to. Used to name the culprit in errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Property {
    FlowShape,
    OutFlow,
    Area,
}

impl Property {
    pub fn name(self) -> &'static str {
        match self {
            Property::FlowShape => "flow_shape",
            Property::OutFlow => "out_flow",
            Property::Area => "area",
        }
    }

    /// Number of arguments the engine passes for this property.
    pub fn arity(self) -> usize {
        match self {
            Property::FlowShape => 2,
            Property::OutFlow | Property::Area => 1,
        }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A bare number standing in for a callable: returns the same value for any arguments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Constant {
    pub value: f64,
    pub arity: usize,
}

impl Callable for Constant {
    fn arity(&self) -> usize {
        self.arity
    }

    fn call(&self, _args: &[f64]) -> Result<HostValue, HostError> {
        Ok(HostValue::Number(self.value))
    }

    fn describe(&self) -> String {
        format_number(self.value)
    }
}

/// A Rust closure exposed as a host callable.
pub struct FnPolicy<F> {
    name: String,
    arity: usize,
    func: F,
}

impl<F> fmt::Debug for FnPolicy<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnPolicy")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

impl<F> Callable for FnPolicy<F>
where
    F: Fn(&[f64]) -> Result<HostValue, HostError> + Send + Sync,
{
    fn arity(&self) -> usize {
        self.arity
    }

    fn call(&self, args: &[f64]) -> Result<HostValue, HostError> {
        (self.func)(args)
    }

    fn describe(&self) -> String {
        format!("<fn {}>", self.name)
    }
}

pub fn constant(value: f64, arity: usize) -> PolicyRef {
    Arc::new(Constant { value, arity })
}

/// Wraps a numeric closure.
pub fn native<F>(name: &str, arity: usize, func: F) -> PolicyRef
where
    F: Fn(&[f64]) -> f64 + Send + Sync + 'static,
{
    host_fn(name, arity, move |args| Ok(HostValue::Number(func(args))))
}

/// Wraps a closure that may return any host value, or fail.
pub fn host_fn<F>(name: &str, arity: usize, func: F) -> PolicyRef
where
    F: Fn(&[f64]) -> Result<HostValue, HostError> + Send + Sync + 'static,
{
    Arc::new(FnPolicy { name: name.to_string(), arity, func })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_ignores_arguments() {
        let c = constant(0.25, 2);
        assert_eq!(c.arity(), 2);
        assert_eq!(c.call(&[3.0, 9.0]).unwrap(), HostValue::Number(0.25));
        assert_eq!(c.describe(), "0.25");
    }

    #[test]
    fn test_native_closure() {
        let cap = native("cap", 1, |args| args[0].min(5.0));
        assert_eq!(cap.call(&[12.0]).unwrap().as_number(), Some(5.0));
        assert_eq!(cap.describe(), "<fn cap>");
    }

    #[test]
    fn test_host_fn_can_return_non_numbers() {
        let f = host_fn("text", 1, |_| Ok(HostValue::Text("oops".into())));
        let out = f.call(&[1.0]).unwrap();
        assert_eq!(out.as_number(), None);
        assert_eq!(out.type_name(), "string");

        let g = host_fn("boom", 1, |_| Err(HostError::new("division by nil")));
        assert_eq!(g.call(&[1.0]).unwrap_err().to_string(), "division by nil");
    }
}
