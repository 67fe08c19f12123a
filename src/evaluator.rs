use crate::Error;
use crate::MAX_EVAL_DEPTH;
use crate::ast::{Pair, Value};
use crate::builtinops::get_builtin_ops;

mod frame;
mod special_forms;

pub use frame::Frame;
pub use special_forms::SpecialForm;

/// Evaluate an S-expression in the given frame
pub fn eval(expr: &Value, frame: &Frame) -> Result<Value, Error> {
    eval_with_depth_tracking(expr, frame, 0)
}

/// Apply a procedure value to already evaluated arguments
pub fn apply(procedure: &Value, args: &[Value]) -> Result<Value, Error> {
    apply_with_depth_tracking(procedure, args, 0)
}

/// Evaluate an S-expression with depth tracking to prevent stack overflow
fn eval_with_depth_tracking(expr: &Value, frame: &Frame, depth: usize) -> Result<Value, Error> {
    if depth >= MAX_EVAL_DEPTH {
        return Err(Error::EvalError(format!(
            "Evaluation depth limit exceeded (max: {MAX_EVAL_DEPTH})"
        )));
    }
    match expr {
        // Variable lookup
        Value::Symbol(name) => frame
            .lookup(name)
            .ok_or_else(|| Error::UnboundVariable(name.clone())),

        // Special form or procedure call
        Value::Pair(pair) => {
            eval_pair(pair, frame, depth).map_err(|err| add_context(err, expr))
        }

        // Everything else evaluates to itself, including the empty list
        Value::Nil
        | Value::Void
        | Value::Unspecified
        | Value::Int(_)
        | Value::Double(_)
        | Value::Bool(_)
        | Value::Str(_)
        | Value::Closure(_)
        | Value::Primitive(_) => Ok(expr.clone()),
    }
}

/// Helper function to add expression context to errors. Only the innermost failing form is
/// recorded, so deep recursion does not repeat the context once per level.
fn add_context(error: Error, expr: &Value) -> Error {
    const MARKER: &str = "\n  Context: while evaluating: ";
    match error {
        Error::EvalError(msg) if !msg.contains(MARKER) => {
            Error::EvalError(format!("{msg}{MARKER}{expr}"))
        }
        Error::TypeMismatch(msg) if !msg.contains(MARKER) => {
            Error::TypeMismatch(format!("{msg}{MARKER}{expr}"))
        }
        other => other,
    }
}

fn eval_pair(pair: &Pair, frame: &Frame, depth: usize) -> Result<Value, Error> {
    if let Value::Symbol(name) = &pair.head
        && let Some(form) = SpecialForm::from_keyword(name)
    {
        let args = pair.tail.to_vec().ok_or_else(|| {
            Error::malformed(form.keyword(), "arguments must form a proper list")
        })?;
        if !form.arity().accepts(args.len()) {
            return Err(Error::malformed(
                form.keyword(),
                format!("expected {}, got {}", form.arity(), args.len()),
            ));
        }
        return form.evaluate(&args, frame, depth);
    }

    let operator = eval_with_depth_tracking(&pair.head, frame, depth + 1)?;
    let args = eval_each(&pair.tail, frame, depth + 1)?;
    apply_with_depth_tracking(&operator, &args, depth + 1)
}

/// Evaluate every argument expression left to right
fn eval_each(arg_exprs: &Value, frame: &Frame, depth: usize) -> Result<Vec<Value>, Error> {
    let exprs = arg_exprs.list_items().ok_or_else(|| {
        Error::EvalError(format!(
            "Procedure call arguments must form a proper list, got {arg_exprs}"
        ))
    })?;
    exprs
        .into_iter()
        .map(|expr| eval_with_depth_tracking(expr, frame, depth))
        .collect()
}

fn apply_with_depth_tracking(
    procedure: &Value,
    args: &[Value],
    depth: usize,
) -> Result<Value, Error> {
    match procedure {
        Value::Primitive(op) => {
            tracing::trace!(procedure = op.scheme_id, args = args.len(), "apply primitive");
            op.call(args)
        }
        Value::Closure(closure) => {
            tracing::trace!(args = args.len(), "apply closure");

            // Bind parameters positionally in a fresh frame below the captured one.
            // Surplus arguments are ignored.
            let scope = closure.env.child();
            let mut supplied = args.iter();
            let mut expected = 0;
            for param in closure.params.iter() {
                expected += 1;
                let Value::Symbol(name) = param else {
                    return Err(Error::TypeMismatch(format!(
                        "lambda parameters must be symbols, got {param}"
                    )));
                };
                if let Some(arg) = supplied.next() {
                    scope.define(name.as_str(), arg.clone());
                }
            }
            if args.len() < expected {
                return Err(Error::arity_error_with_expr(
                    expected,
                    args.len(),
                    format!("(lambda {} {})", closure.params, closure.body),
                ));
            }

            eval_with_depth_tracking(&closure.body, &scope, depth + 1)
        }
        other => Err(Error::NotApplicable(format!("{other}"))),
    }
}

/// Create the global frame with every primitive bound under its Scheme name
pub fn create_global_env() -> Frame {
    let frame = Frame::new();
    for op in get_builtin_ops() {
        frame.define(op.scheme_id, Value::Primitive(op));
    }
    frame
}
