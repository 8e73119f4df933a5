//! Tree-walk evaluator.
//!
//! `reduce` turns a value expression into a [`Value`] against a
//! [`Context`]; `exec` runs statement nodes and threads the explicit
//! [`StepOutcome`] sentinel through branches so a `return` short-circuits
//! every enclosing block without unwinding through the error channel.
//!
//! Every node reduction counts one operation before doing any work, which
//! is what makes the operation and wall-clock budgets trip promptly on
//! runaway scripts.

use std::rc::Rc;

use num_traits::Zero;

use crate::{
    context::Context,
    decimal,
    error::Error,
    node::{BinaryOp, Branch, Node, NodeKind, UnaryOp},
    tracer::EvalTracer,
    value::{Bindings, ScriptFunction, Value},
};

/// How a statement finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StepOutcome {
    Normal,
    /// A `return` fired; stop executing the enclosing branches.
    Returned,
}

pub(crate) struct Evaluator<'t> {
    tracer: &'t mut dyn EvalTracer,
    depth: usize,
}

impl<'t> Evaluator<'t> {
    pub fn new(tracer: &'t mut dyn EvalTracer) -> Self {
        Self { tracer, depth: 0 }
    }

    /// Runs a branch, stopping early when a `return` fires.
    pub fn exec_branch(&mut self, branch: &Branch, ctx: &mut Context) -> Result<StepOutcome, Error> {
        self.tracer.on_branch(branch.nodes().len());
        for node in branch.nodes() {
            if self.exec(node, ctx)? == StepOutcome::Returned {
                return Ok(StepOutcome::Returned);
            }
        }
        Ok(StepOutcome::Normal)
    }

    /// Counts the node against the budgets and reports it to the tracer.
    fn tick(&mut self, node: &Node, ctx: &mut Context) -> Result<(), Error> {
        self.tracer.on_reduce(node.line, node.kind_name());
        ctx.increment_operations(1)
    }

    /// Executes one statement node.
    fn exec(&mut self, node: &Node, ctx: &mut Context) -> Result<StepOutcome, Error> {
        match &node.kind {
            NodeKind::Return(expr) => {
                self.tick(node, ctx)?;
                let value = match expr {
                    Some(inner) => self.reduce(inner, ctx)?,
                    None => Value::None,
                };
                ctx.set_return_value(value);
                Ok(StepOutcome::Returned)
            }
            NodeKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.tick(node, ctx)?;
                if self.reduce(condition, ctx)?.is_truthy() {
                    self.exec_branch(then_branch, ctx)
                } else if else_branch.is_empty() {
                    Ok(StepOutcome::Normal)
                } else {
                    self.exec_branch(else_branch, ctx)
                }
            }
            NodeKind::While { condition, body } => {
                self.tick(node, ctx)?;
                loop {
                    if !self.reduce(condition, ctx)?.is_truthy() {
                        return Ok(StepOutcome::Normal);
                    }
                    if self.exec_branch(body, ctx)? == StepOutcome::Returned {
                        return Ok(StepOutcome::Returned);
                    }
                }
            }
            NodeKind::For {
                binding,
                iterable,
                body,
            } => {
                self.tick(node, ctx)?;
                let items = match self.reduce(iterable, ctx)? {
                    Value::List(items) => items,
                    other => {
                        return Err(Error::runtime(
                            node.line,
                            format!("for loop must iterate over a list (got {})", other.type_name()),
                        ));
                    }
                };
                for item in items {
                    // same as the caller's scope: the loop variable is
                    // bound in the enclosing context and survives the loop
                    ctx.insert(binding.clone(), item);
                    if self.exec_branch(body, ctx)? == StepOutcome::Returned {
                        return Ok(StepOutcome::Returned);
                    }
                }
                Ok(StepOutcome::Normal)
            }
            _ => {
                self.reduce(node, ctx)?;
                Ok(StepOutcome::Normal)
            }
        }
    }

    /// Reduces a value expression to a [`Value`].
    fn reduce(&mut self, node: &Node, ctx: &mut Context) -> Result<Value, Error> {
        self.tick(node, ctx)?;
        match &node.kind {
            NodeKind::Nop => Ok(Value::None),
            NodeKind::Number(n) => Ok(Value::Number(n.clone())),
            NodeKind::Str(s) => Ok(Value::Str(s.clone())),
            NodeKind::Bool(b) => Ok(Value::Bool(*b)),
            NodeKind::Variable(name) => match ctx.get(name) {
                Some(value) => Ok(value.clone()),
                None => Err(Error::ObjectResolution {
                    line: node.line,
                    name: name.clone(),
                }),
            },
            NodeKind::List(elements) => {
                let mut items = Vec::with_capacity(elements.len());
                for element in elements {
                    items.push(self.reduce(element, ctx)?);
                }
                Ok(Value::List(items))
            }
            NodeKind::Dict(entries) => {
                let mut map = Bindings::new();
                for (key, value_node) in entries {
                    let value = self.reduce(value_node, ctx)?;
                    map.insert(key.clone(), value);
                }
                Ok(Value::Map(map))
            }
            NodeKind::Binary { op, left, right } => self.reduce_binary(node.line, *op, left, right, ctx),
            NodeKind::Unary {
                op: UnaryOp::Neg,
                target,
            } => match self.reduce(target, ctx)? {
                Value::Number(n) => Ok(Value::Number(-n)),
                other => Err(Error::runtime(
                    node.line,
                    format!("cannot negate {}", other.type_name()),
                )),
            },
            NodeKind::Function { params, body } => Ok(Value::Function(Rc::new(ScriptFunction {
                params: params.clone(),
                body: Rc::clone(body),
                captured: ctx.bindings_snapshot(),
            }))),
            NodeKind::Invocation { target, args } => self.invoke(node.line, target, args, ctx),
            NodeKind::If { .. } | NodeKind::While { .. } | NodeKind::For { .. } | NodeKind::Return(_) => Err(
                Error::runtime(node.line, "statement not allowed in expression position"),
            ),
        }
    }

    fn reduce_binary(
        &mut self,
        line: usize,
        op: BinaryOp,
        left: &Node,
        right: &Node,
        ctx: &mut Context,
    ) -> Result<Value, Error> {
        match op {
            BinaryOp::Assign => return self.assign(line, left, right, ctx),
            BinaryOp::Dot => return self.dot(line, left, right, ctx),
            BinaryOp::Subscript => return self.subscript(line, left, right, ctx),
            _ => {}
        }
        let lhs = self.reduce(left, ctx)?;
        let rhs = self.reduce(right, ctx)?;
        match op {
            BinaryOp::Add => add(line, lhs, rhs),
            BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Pow => arithmetic(line, op, &lhs, &rhs),
            BinaryOp::Eq => Ok(Value::Bool(lhs == rhs)),
            BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge => ordering(line, op, &lhs, &rhs),
            BinaryOp::Assign | BinaryOp::Dot | BinaryOp::Subscript => unreachable!("handled above"),
        }
    }

    /// Binds `right` to the variable or subscript slot named by `left`.
    ///
    /// An assignment expression itself evaluates to none, so chained
    /// `x = y = 2` leaves `x` bound to none.
    fn assign(&mut self, line: usize, left: &Node, right: &Node, ctx: &mut Context) -> Result<Value, Error> {
        let value = self.reduce(right, ctx)?;
        match &left.kind {
            NodeKind::Variable(name) => {
                ctx.insert(name.clone(), value);
                Ok(Value::None)
            }
            NodeKind::Binary {
                op: BinaryOp::Subscript,
                left: target,
                right: index,
            } => {
                let NodeKind::Variable(name) = &target.kind else {
                    return Err(Error::runtime(line, "invalid assignment target"));
                };
                let index_value = self.reduce(index, ctx)?;
                let Some(slot) = ctx.get_mut(name) else {
                    return Err(Error::ObjectResolution {
                        line,
                        name: name.clone(),
                    });
                };
                match slot {
                    Value::Map(entries) => {
                        let Value::Str(key) = index_value else {
                            return Err(Error::runtime(line, "dictionary index must be a string"));
                        };
                        entries.insert(key, value);
                    }
                    Value::List(items) => {
                        let index = list_index(line, &index_value, items.len())?;
                        items[index] = value;
                    }
                    other => {
                        return Err(Error::runtime(
                            line,
                            format!(
                                "subscript assignment requires a list or dictionary (got {})",
                                other.type_name()
                            ),
                        ));
                    }
                }
                Ok(Value::None)
            }
            _ => Err(Error::runtime(line, "invalid assignment target")),
        }
    }

    fn dot(&mut self, line: usize, left: &Node, right: &Node, ctx: &mut Context) -> Result<Value, Error> {
        let NodeKind::Variable(key) = &right.kind else {
            return Err(Error::runtime(line, "dot notation requires a member name"));
        };
        match self.reduce(left, ctx)? {
            Value::Map(entries) => match entries.get(key) {
                Some(value) => Ok(value.clone()),
                None => Err(Error::ObjectResolution {
                    line,
                    name: key.clone(),
                }),
            },
            other => Err(Error::runtime(
                line,
                format!("Dot notation used with non-dictionary: {}", other.type_name()),
            )),
        }
    }

    fn subscript(&mut self, line: usize, left: &Node, right: &Node, ctx: &mut Context) -> Result<Value, Error> {
        let collection = self.reduce(left, ctx)?;
        let index_value = self.reduce(right, ctx)?;
        match collection {
            Value::List(items) => {
                let index = list_index(line, &index_value, items.len())?;
                Ok(items[index].clone())
            }
            Value::Map(entries) => {
                let Value::Str(key) = index_value else {
                    return Err(Error::runtime(line, "dictionary index must be a string"));
                };
                match entries.get(&key) {
                    Some(value) => Ok(value.clone()),
                    None => Err(Error::runtime(line, format!("no key named '{key}'"))),
                }
            }
            other => Err(Error::runtime(
                line,
                format!(
                    "subscript notation requires a list or dictionary (got {})",
                    other.type_name()
                ),
            )),
        }
    }

    /// Invokes the callable bound under `target`.
    ///
    /// Argument nodes arrive unreduced. A script closure reduces them
    /// against this (calling) context before binding parameters; native
    /// callables receive them reduced the same way, so variable
    /// references in arguments always see caller scope.
    fn invoke(&mut self, line: usize, target: &str, args: &[Node], ctx: &mut Context) -> Result<Value, Error> {
        let Some(callee) = ctx.get(target).cloned() else {
            return Err(Error::ObjectResolution {
                line,
                name: target.to_owned(),
            });
        };
        match callee {
            Value::Function(func) => self.call_script(line, target, &func, args, ctx),
            Value::Native(native) => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.reduce(arg, ctx)?);
                }
                (native.func)(&values)
            }
            other => Err(Error::runtime(
                line,
                format!("'{target}' is not callable (got {})", other.type_name()),
            )),
        }
    }

    fn call_script(
        &mut self,
        line: usize,
        name: &str,
        func: &ScriptFunction,
        args: &[Node],
        ctx: &mut Context,
    ) -> Result<Value, Error> {
        if args.len() < func.params.len() {
            return Err(Error::runtime(line, "Not enough arguments supplied."));
        }
        let mut bound = Vec::with_capacity(func.params.len());
        for (param, arg) in func.params.iter().zip(args) {
            bound.push((param.clone(), self.reduce(arg, ctx)?));
        }

        let mut callee_ctx = ctx.call_context(&func.captured);
        for (param, value) in bound {
            callee_ctx.insert(param, value);
        }

        self.depth += 1;
        self.tracer.on_call(name, self.depth);
        let outcome = self.exec_branch(&func.body, &mut callee_ctx);
        self.depth -= 1;
        self.tracer.on_return(self.depth);

        // the caller is billed for the callee's work even when the body
        // failed; only then does the callee's error propagate
        let result = callee_ctx.take_return_value();
        let absorbed = ctx.absorb(&callee_ctx);
        outcome?;
        absorbed?;
        Ok(result)
    }
}

/// `+`: decimal addition, string concatenation, or list concatenation.
fn add(line: usize, lhs: Value, rhs: Value) -> Result<Value, Error> {
    match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
        (Value::Str(a), Value::Str(b)) => Ok(Value::Str(a + &b)),
        (Value::List(mut a), Value::List(b)) => {
            a.extend(b);
            Ok(Value::List(a))
        }
        (lhs, rhs) => Err(Error::runtime(
            line,
            format!("cannot add {} and {}", lhs.type_name(), rhs.type_name()),
        )),
    }
}

fn arithmetic(line: usize, op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, Error> {
    let (Value::Number(a), Value::Number(b)) = (lhs, rhs) else {
        return Err(Error::runtime(
            line,
            format!(
                "{} requires numbers (got {} and {})",
                op.name(),
                lhs.type_name(),
                rhs.type_name()
            ),
        ));
    };
    match op {
        BinaryOp::Sub => Ok(Value::Number(a - b)),
        BinaryOp::Mul => Ok(Value::Number(a * b)),
        BinaryOp::Div => {
            if b.is_zero() {
                return Err(Error::runtime(line, "Division by zero"));
            }
            Ok(Value::Number(a / b))
        }
        BinaryOp::Pow => decimal::pow(a, b)
            .map(Value::Number)
            .map_err(|e| Error::runtime(line, e.message())),
        _ => unreachable!("not an arithmetic operator"),
    }
}

fn ordering(line: usize, op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, Error> {
    let ord = match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => a.cmp(b),
        (Value::Str(a), Value::Str(b)) => a.cmp(b),
        (lhs, rhs) => {
            return Err(Error::runtime(
                line,
                format!("cannot compare {} and {}", lhs.type_name(), rhs.type_name()),
            ));
        }
    };
    let result = match op {
        BinaryOp::Lt => ord.is_lt(),
        BinaryOp::Gt => ord.is_gt(),
        BinaryOp::Le => ord.is_le(),
        BinaryOp::Ge => ord.is_ge(),
        _ => unreachable!("not an ordering operator"),
    };
    Ok(Value::Bool(result))
}

/// Validates a list subscript: an integral, in-range decimal.
fn list_index(line: usize, index: &Value, len: usize) -> Result<usize, Error> {
    let Value::Number(n) = index else {
        return Err(Error::runtime(line, "list index must be a number"));
    };
    let Some(i) = decimal::to_index(n) else {
        return Err(Error::runtime(
            line,
            "list index must be a non-negative whole number",
        ));
    };
    if i >= len {
        return Err(Error::runtime(line, format!("list index {i} out of range")));
    }
    Ok(i)
}
