//! Evaluator tracing hooks.
//!
//! A trait-based seam for diagnostics: the evaluator reports node
//! reductions, calls, and returns to an [`EvalTracer`]. The default
//! [`NoopTracer`] does nothing; [`StderrTracer`] writes a human-readable
//! execution log. Tracing is purely diagnostic and has no effect on
//! script semantics or budgets.

/// Hook points reported by the evaluator.
///
/// All methods default to no-ops, so implementations only override the
/// hooks they care about.
pub trait EvalTracer {
    /// Called before each node reduction.
    ///
    /// # Arguments
    /// * `line` - Source line of the node
    /// * `what` - Short name of the node kind ("assignment", "while", ...)
    fn on_reduce(&mut self, _line: usize, _what: &'static str) {}

    /// Called when a script function invocation pushes a new context.
    fn on_call(&mut self, _name: &str, _depth: usize) {}

    /// Called when a script function invocation completes.
    fn on_return(&mut self, _depth: usize) {}

    /// Called when a branch (statement sequence) starts executing.
    fn on_branch(&mut self, _len: usize) {}
}

/// Tracer that does nothing.
#[derive(Debug, Default)]
pub struct NoopTracer;

impl EvalTracer for NoopTracer {}

/// Tracer that writes one line per event to stderr.
#[derive(Debug, Default)]
pub struct StderrTracer {
    depth: usize,
}

impl StderrTracer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn indent(&self) -> String {
        "  ".repeat(self.depth)
    }
}

impl EvalTracer for StderrTracer {
    fn on_reduce(&mut self, line: usize, what: &'static str) {
        eprintln!("{}[line {line}] reduce {what}", self.indent());
    }

    fn on_call(&mut self, name: &str, depth: usize) {
        eprintln!("{}call {name} (depth {depth})", self.indent());
        self.depth = depth;
    }

    fn on_return(&mut self, depth: usize) {
        self.depth = depth;
        eprintln!("{}return (depth {depth})", self.indent());
    }

    fn on_branch(&mut self, len: usize) {
        eprintln!("{}branch of {len}", self.indent());
    }
}
