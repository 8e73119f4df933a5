#![doc = include_str!("../../../README.md")]

mod context;
mod decimal;
mod error;
mod eval;
mod lexer;
mod node;
mod parse;
mod run;
mod token;
pub mod tracer;
mod value;

pub use crate::{
    context::{Context, ExecLimits},
    error::Error,
    run::Script,
    tracer::{EvalTracer, NoopTracer, StderrTracer},
    value::{Bindings, NativeCallable, NativeFunction, ScriptFunction, Value},
};
