//! Runtime values.
//!
//! A single tagged union represents everything a script expression can
//! reduce to. Numbers are arbitrary-precision decimals, dictionaries
//! preserve insertion order, and callables come in two flavours: script
//! closures and host-bound natives.

use std::{fmt, rc::Rc};

use bigdecimal::BigDecimal;
use indexmap::IndexMap;
use num_traits::Zero;

use crate::{error::Error, node::Branch};

/// Ordered name-to-value map used for dictionaries, context bindings, and
/// closure captures.
pub type Bindings = IndexMap<String, Value>;

/// Signature of a host-bound native callable.
///
/// Arguments arrive already reduced against the calling context; the
/// returned value becomes the invocation's result.
pub type NativeCallable = dyn Fn(&[Value]) -> Result<Value, Error>;

/// A script closure: parameter names, a shared body, and a snapshot of
/// the bindings that were visible where the function literal was reduced.
///
/// At call time a fresh context is seeded from the snapshot merged with
/// the caller's current bindings (caller wins on collisions, parameters
/// win over both). Assignments inside the body never propagate back to
/// the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptFunction {
    pub(crate) params: Vec<String>,
    pub(crate) body: Rc<Branch>,
    pub(crate) captured: Bindings,
}

impl ScriptFunction {
    /// The function's parameter names, in order.
    #[must_use]
    pub fn params(&self) -> &[String] {
        &self.params
    }
}

/// A host callable bound into a context with [`Context::bind_function`].
///
/// [`Context::bind_function`]: crate::Context::bind_function
pub struct NativeFunction {
    pub(crate) name: String,
    pub(crate) func: Box<NativeCallable>,
}

impl NativeFunction {
    /// The name the callable was bound under.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native fn {}>", self.name)
    }
}

/// The result of reducing an AST node.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// Unit value; the result of statements and of functions without a
    /// `return`.
    #[default]
    None,
    Bool(bool),
    Number(BigDecimal),
    Str(String),
    List(Vec<Value>),
    /// Dictionary preserving insertion order.
    Map(Bindings),
    Function(Rc<ScriptFunction>),
    Native(Rc<NativeFunction>),
}

impl Value {
    /// Truthiness used by `if`, `while`, and boolean contexts.
    ///
    /// `false`, none, zero, and empty strings/lists/dictionaries are
    /// falsy; everything else, including every callable, is truthy.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::None => false,
            Self::Bool(b) => *b,
            Self::Number(n) => !n.is_zero(),
            Self::Str(s) => !s.is_empty(),
            Self::List(items) => !items.is_empty(),
            Self::Map(entries) => !entries.is_empty(),
            Self::Function(_) | Self::Native(_) => true,
        }
    }

    /// Short type name for error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::Str(_) => "string",
            Self::List(_) => "list",
            Self::Map(_) => "dictionary",
            Self::Function(_) | Self::Native(_) => "function",
        }
    }

    /// Script-syntax rendering: strings quoted, containers recursive.
    ///
    /// [`fmt::Display`] renders strings bare (what `print` wants); this
    /// form is used for elements inside containers and context dumps.
    #[must_use]
    pub fn repr(&self) -> String {
        match self {
            Self::Str(s) => format!("'{s}'"),
            other => other.to_string(),
        }
    }
}

impl PartialEq for Value {
    /// Equality used by the script `==` operator.
    ///
    /// Mismatched types compare unequal rather than erroring; callables
    /// compare by identity.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::None, Self::None) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Map(a), Self::Map(b)) => a == b,
            (Self::Function(a), Self::Function(b)) => Rc::ptr_eq(a, b),
            (Self::Native(a), Self::Native(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Str(s) => write!(f, "{s}"),
            Self::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item.repr())?;
                }
                write!(f, "]")
            }
            Self::Map(entries) => {
                write!(f, "{{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {}", value.repr())?;
                }
                write!(f, "}}")
            }
            Self::Function(func) => {
                write!(f, "<function({})>", func.params.join(", "))
            }
            Self::Native(func) => write!(f, "<native fn {}>", func.name),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<BigDecimal> for Value {
    fn from(v: BigDecimal) -> Self {
        Self::Number(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Number(BigDecimal::from(v))
    }
}
