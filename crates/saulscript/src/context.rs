//! The script execution environment.
//!
//! A [`Context`] is the only mutable state during evaluation: an ordered
//! map of bindings, a return-value slot, and the resource accounting that
//! makes running untrusted scripts safe. Hosts populate a context with
//! values and native callables, execute source against it, and read the
//! results back out.

use std::{
    fmt,
    rc::Rc,
    time::{Duration, Instant},
};

use crate::{
    error::Error,
    run::Script,
    value::{Bindings, NativeFunction, Value},
};

/// Configuration for execution budgets.
///
/// Both limits are optional; `None` disables the check. Use the builder
/// methods to construct custom limits.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecLimits {
    /// Maximum number of node reductions per execution.
    pub max_operations: Option<u64>,
    /// Maximum wall-clock execution time.
    pub max_duration: Option<Duration>,
}

impl ExecLimits {
    /// Creates limits with every check disabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of node reductions.
    #[must_use]
    pub fn max_operations(mut self, limit: u64) -> Self {
        self.max_operations = Some(limit);
        self
    }

    /// Sets the maximum wall-clock execution time.
    #[must_use]
    pub fn max_duration(mut self, limit: Duration) -> Self {
        self.max_duration = Some(limit);
        self
    }
}

/// Mutable environment a script executes against.
///
/// Bindings keep insertion order. The operation counter is monotonic
/// within one evaluation: every node reduction increments it by one
/// before doing any work, and both budget checks run on each increment.
pub struct Context {
    bindings: Bindings,
    return_value: Value,
    operations_counted: u64,
    limits: ExecLimits,
    start_time: Instant,
}

impl Context {
    /// Creates an empty context with no limits.
    #[must_use]
    pub fn new() -> Self {
        Self {
            bindings: Bindings::new(),
            return_value: Value::None,
            operations_counted: 0,
            limits: ExecLimits::new(),
            start_time: Instant::now(),
        }
    }

    /// Creates an empty context with the given budget limits.
    #[must_use]
    pub fn with_limits(limits: ExecLimits) -> Self {
        Self {
            limits,
            ..Self::new()
        }
    }

    /// Sets the operation budget. Values `<= 0` disable the check.
    pub fn set_op_limit(&mut self, limit: i64) {
        self.limits.max_operations = u64::try_from(limit).ok().filter(|&n| n > 0);
    }

    /// Sets the wall-clock budget in seconds. Values `<= 0.0` disable the
    /// check.
    pub fn set_time_limit(&mut self, seconds: f64) {
        self.limits.max_duration = (seconds > 0.0).then(|| Duration::from_secs_f64(seconds));
    }

    /// Exposes a value to scripts under `name`.
    pub fn bind_value(&mut self, name: impl Into<String>, value: Value) {
        self.bindings.insert(name.into(), value);
    }

    /// Exposes a host callable to scripts under `name`.
    ///
    /// Script-side invocation arguments are reduced against the calling
    /// context before `func` sees them, so the callable receives plain
    /// values and never touches script internals.
    pub fn bind_function<F>(&mut self, name: impl Into<String>, func: F)
    where
        F: Fn(&[Value]) -> Result<Value, Error> + 'static,
    {
        let name = name.into();
        let native = NativeFunction {
            name: name.clone(),
            func: Box::new(func),
        };
        self.bindings.insert(name, Value::Native(Rc::new(native)));
    }

    /// Looks up a binding.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    /// Iterates bindings in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.bindings.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// The value of a top-level `return`, or none if no return fired.
    #[must_use]
    pub fn return_value(&self) -> &Value {
        &self.return_value
    }

    /// Total node reductions counted so far.
    #[must_use]
    pub fn operations_counted(&self) -> u64 {
        self.operations_counted
    }

    /// Lexes, parses, and evaluates `source` against this context.
    ///
    /// The wall-clock budget is anchored here: nested calls inherit this
    /// entry's start time and never reset it.
    pub fn execute(&mut self, source: &str) -> Result<(), Error> {
        Script::compile(source)?.run(self)
    }

    pub(crate) fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.bindings.insert(name.into(), value);
    }

    /// Clone of the current bindings, taken when a closure is created.
    pub(crate) fn bindings_snapshot(&self) -> Bindings {
        self.bindings.clone()
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.bindings.get_mut(name)
    }

    pub(crate) fn set_return_value(&mut self, value: Value) {
        self.return_value = value;
    }

    pub(crate) fn take_return_value(&mut self) -> Value {
        std::mem::take(&mut self.return_value)
    }

    /// Restarts the wall-clock budget; called once per top-level run.
    pub(crate) fn begin_execution(&mut self) {
        self.start_time = Instant::now();
    }

    /// Counts `amount` node reductions and checks both budgets.
    ///
    /// The operation check runs first, then the wall-clock check, so an
    /// execution that blows both limits reports the operation budget.
    pub(crate) fn increment_operations(&mut self, amount: u64) -> Result<(), Error> {
        self.operations_counted += amount;
        if let Some(max) = self.limits.max_operations
            && self.operations_counted > max
        {
            return Err(Error::OperationLimitReached {
                limit: max,
                count: self.operations_counted,
            });
        }
        if let Some(max) = self.limits.max_duration {
            let elapsed = self.start_time.elapsed();
            if elapsed > max {
                return Err(Error::TimeLimitReached { limit: max, elapsed });
            }
        }
        Ok(())
    }

    /// Builds the context a script function body executes in.
    ///
    /// Bindings are the closure's captured snapshot merged with this
    /// (calling) context's current bindings, caller winning collisions.
    /// Budgets, the budget clock, and the current operation count carry
    /// over so the callee cannot outrun the caller's limits.
    pub(crate) fn call_context(&self, captured: &Bindings) -> Self {
        let mut bindings = captured.clone();
        for (name, value) in &self.bindings {
            bindings.insert(name.clone(), value.clone());
        }
        Self {
            bindings,
            return_value: Value::None,
            operations_counted: self.operations_counted,
            limits: self.limits,
            start_time: self.start_time,
        }
    }

    /// Absorbs a finished callee's operation count back into this
    /// context, re-checking the budgets.
    pub(crate) fn absorb(&mut self, callee: &Self) -> Result<(), Error> {
        let delta = callee.operations_counted.saturating_sub(self.operations_counted);
        self.increment_operations(delta)
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("bindings", &self.bindings)
            .field("return_value", &self.return_value)
            .field("operations_counted", &self.operations_counted)
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (name, value)) in self.bindings.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name} = {}", value.repr())?;
        }
        write!(f, "}}")
    }
}
