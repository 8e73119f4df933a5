//! Public interface for compiling and running SaulScript code.

use crate::{
    context::Context,
    error::Error,
    eval::Evaluator,
    lexer::lex,
    node::Branch,
    parse::parse,
    tracer::{EvalTracer, NoopTracer},
};

/// A compiled script: lex and parse once, run any number of times.
///
/// # Example
/// ```
/// use saulscript::{Context, Script};
///
/// let script = Script::compile("x = 40 + 2\n").unwrap();
/// let mut ctx = Context::new();
/// script.run(&mut ctx).unwrap();
/// assert_eq!(ctx.get("x").unwrap().to_string(), "42");
/// ```
#[derive(Debug, Clone)]
pub struct Script {
    root: Branch,
}

impl Script {
    /// Lexes and parses `source`.
    pub fn compile(source: &str) -> Result<Self, Error> {
        let tokens = lex(source)?;
        let root = parse(tokens)?;
        Ok(Self { root })
    }

    /// Evaluates the script against `ctx`.
    ///
    /// The wall-clock budget restarts here; nested function calls inherit
    /// this entry's start time. Side effects (bindings, the return-value
    /// slot, the operation count) are left in `ctx` on success and on
    /// failure alike; the host decides whether to reuse or discard a
    /// context after an error.
    pub fn run(&self, ctx: &mut Context) -> Result<(), Error> {
        self.run_traced(ctx, &mut NoopTracer)
    }

    /// Evaluates the script, reporting execution events to `tracer`.
    pub fn run_traced(&self, ctx: &mut Context, tracer: &mut dyn EvalTracer) -> Result<(), Error> {
        ctx.begin_execution();
        Evaluator::new(tracer).exec_branch(&self.root, ctx)?;
        Ok(())
    }
}
