//! Special forms: syntactic constructs that receive their arguments unevaluated.
//!
//! The head symbol of a call form is classified once into a [`SpecialForm`]; the argument
//! count is checked against [`SpecialForm::arity`] before the handler runs, so handlers only
//! deal with shape and type errors.

use std::collections::HashMap;
use std::sync::LazyLock;

use super::{Frame, eval_with_depth_tracking};
use crate::Error;
use crate::ast::{Closure, Value};
use crate::builtinops::Arity;

/// Every syntactic keyword the evaluator handles itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecialForm {
    If,
    Let,
    LetStar,
    LetRec,
    Quote,
    Define,
    Set,
    Lambda,
    And,
    Or,
    Begin,
    Cond,
}

const ALL_SPECIAL_FORMS: [SpecialForm; 12] = [
    SpecialForm::If,
    SpecialForm::Let,
    SpecialForm::LetStar,
    SpecialForm::LetRec,
    SpecialForm::Quote,
    SpecialForm::Define,
    SpecialForm::Set,
    SpecialForm::Lambda,
    SpecialForm::And,
    SpecialForm::Or,
    SpecialForm::Begin,
    SpecialForm::Cond,
];

static SPECIAL_FORMS: LazyLock<HashMap<&'static str, SpecialForm>> = LazyLock::new(|| {
    ALL_SPECIAL_FORMS
        .iter()
        .map(|form| (form.keyword(), *form))
        .collect()
});

impl SpecialForm {
    /// Classify a call head. Keywords are recognized by spelling alone, so a local binding
    /// named `if` does not turn `(if ...)` into a procedure call.
    pub fn from_keyword(name: &str) -> Option<SpecialForm> {
        SPECIAL_FORMS.get(name).copied()
    }

    pub fn keyword(self) -> &'static str {
        match self {
            SpecialForm::If => "if",
            SpecialForm::Let => "let",
            SpecialForm::LetStar => "let*",
            SpecialForm::LetRec => "letrec",
            SpecialForm::Quote => "quote",
            SpecialForm::Define => "define",
            SpecialForm::Set => "set!",
            SpecialForm::Lambda => "lambda",
            SpecialForm::And => "and",
            SpecialForm::Or => "or",
            SpecialForm::Begin => "begin",
            SpecialForm::Cond => "cond",
        }
    }

    /// Accepted number of (unevaluated) arguments after the keyword
    pub fn arity(self) -> Arity {
        match self {
            SpecialForm::Quote => Arity::Exact(1),
            SpecialForm::Define | SpecialForm::Set => Arity::Exact(2),
            SpecialForm::If => Arity::AtLeast(2),
            SpecialForm::Lambda
            | SpecialForm::Let
            | SpecialForm::LetStar
            | SpecialForm::LetRec => Arity::AtLeast(2),
            SpecialForm::And | SpecialForm::Or | SpecialForm::Begin | SpecialForm::Cond => {
                Arity::Any
            }
        }
    }

    pub(super) fn evaluate(
        self,
        args: &[Value],
        frame: &Frame,
        depth: usize,
    ) -> Result<Value, Error> {
        match self {
            SpecialForm::If => eval_if(args, frame, depth),
            SpecialForm::Let => eval_let(args, frame, depth),
            SpecialForm::LetStar => eval_let_star(args, frame, depth),
            SpecialForm::LetRec => eval_letrec(args, frame, depth),
            SpecialForm::Quote => eval_quote(args),
            SpecialForm::Define => eval_define(args, frame, depth),
            SpecialForm::Set => eval_set(args, frame, depth),
            SpecialForm::Lambda => eval_lambda(args, frame),
            SpecialForm::And => eval_and(args, frame, depth),
            SpecialForm::Or => eval_or(args, frame, depth),
            SpecialForm::Begin => eval_sequence(args, frame, depth),
            SpecialForm::Cond => eval_cond(args, frame, depth),
        }
    }
}

/// Shape error for a form whose argument count was not checked against its arity
fn wrong_arity(form: SpecialForm, args: &[Value]) -> Error {
    Error::malformed(
        form.keyword(),
        format!("expected {}, got {}", form.arity(), args.len()),
    )
}

/// Evaluate each expression in turn, returning the last value (`Void` when empty)
fn eval_sequence(body: &[Value], frame: &Frame, depth: usize) -> Result<Value, Error> {
    let mut result = Value::Void;
    for expr in body {
        result = eval_with_depth_tracking(expr, frame, depth + 1)?;
    }
    Ok(result)
}

fn eval_quote(args: &[Value]) -> Result<Value, Error> {
    match args {
        [datum] => Ok(datum.clone()),
        _ => Err(wrong_arity(SpecialForm::Quote, args)),
    }
}

/// Only `#f` selects the else branch; every other value, boolean or not, is true.
/// Forms after the else branch are never evaluated.
fn eval_if(args: &[Value], frame: &Frame, depth: usize) -> Result<Value, Error> {
    let [test, then_branch, rest @ ..] = args else {
        return Err(wrong_arity(SpecialForm::If, args));
    };
    let else_branch = rest.first();

    match eval_with_depth_tracking(test, frame, depth + 1)? {
        Value::Bool(false) => match else_branch {
            Some(expr) => eval_with_depth_tracking(expr, frame, depth + 1),
            None => Err(Error::malformed(
                "if",
                "test is false and there is no else branch",
            )),
        },
        _ => eval_with_depth_tracking(then_branch, frame, depth + 1),
    }
}

fn eval_define(args: &[Value], frame: &Frame, depth: usize) -> Result<Value, Error> {
    match args {
        [Value::Symbol(name), expr] => {
            let value = eval_with_depth_tracking(expr, frame, depth + 1)?;
            tracing::debug!(name = %name, "define");
            frame.define(name.as_str(), value);
            Ok(Value::Void)
        }
        [other, _] => Err(Error::TypeMismatch(format!(
            "define requires a symbol, got {} {other}",
            other.type_name()
        ))),
        _ => Err(wrong_arity(SpecialForm::Define, args)),
    }
}

/// The new value is computed in the frame of the `set!` form, then stored in the nearest
/// enclosing frame that binds the name
fn eval_set(args: &[Value], frame: &Frame, depth: usize) -> Result<Value, Error> {
    match args {
        [Value::Symbol(name), expr] => {
            let value = eval_with_depth_tracking(expr, frame, depth + 1)?;
            if frame.set(name, value) {
                tracing::debug!(name = %name, "set!");
                Ok(Value::Void)
            } else {
                Err(Error::UnboundAssignment(name.clone()))
            }
        }
        [other, _] => Err(Error::TypeMismatch(format!(
            "set! requires a symbol, got {} {other}",
            other.type_name()
        ))),
        _ => Err(wrong_arity(SpecialForm::Set, args)),
    }
}

/// Build a closure over the current frame. Only the first body expression is kept.
fn eval_lambda(args: &[Value], frame: &Frame) -> Result<Value, Error> {
    let [params, body, ..] = args else {
        return Err(wrong_arity(SpecialForm::Lambda, args));
    };

    let param_list = params.list_items().ok_or_else(|| {
        Error::TypeMismatch(format!("lambda parameters must be a list, got {params}"))
    })?;

    let mut seen: Vec<&str> = Vec::with_capacity(param_list.len());
    for param in param_list {
        let Value::Symbol(name) = param else {
            return Err(Error::TypeMismatch(format!(
                "lambda parameters must be symbols, got {} {param}",
                param.type_name()
            )));
        };
        if seen.contains(&name.as_str()) {
            return Err(Error::DuplicateBinding {
                form: "lambda",
                name: name.clone(),
            });
        }
        seen.push(name);
    }

    Ok(Value::Closure(std::rc::Rc::new(Closure {
        params: params.clone(),
        body: body.clone(),
        env: frame.clone(),
    })))
}

/// Only a boolean `#f` stops `and`; the result is always a fresh boolean
fn eval_and(args: &[Value], frame: &Frame, depth: usize) -> Result<Value, Error> {
    for arg in args {
        if let Value::Bool(false) = eval_with_depth_tracking(arg, frame, depth + 1)? {
            return Ok(Value::Bool(false));
        }
    }
    Ok(Value::Bool(true))
}

/// Any value other than `#f` stops `or` with `#t`
fn eval_or(args: &[Value], frame: &Frame, depth: usize) -> Result<Value, Error> {
    for arg in args {
        if !matches!(
            eval_with_depth_tracking(arg, frame, depth + 1)?,
            Value::Bool(false)
        ) {
            return Ok(Value::Bool(true));
        }
    }
    Ok(Value::Bool(false))
}

/// Split a binding list `((name expr) ...)` into its names and initializer expressions
fn parse_bindings<'a>(
    form: &'static str,
    bindings: &'a Value,
) -> Result<Vec<(&'a str, &'a Value)>, Error> {
    let items = bindings.list_items().ok_or_else(|| {
        Error::malformed(form, format!("bindings must be a list, got {bindings}"))
    })?;

    items
        .into_iter()
        .map(|binding| {
            let parts = binding
                .list_items()
                .filter(|parts| !parts.is_empty())
                .ok_or_else(|| {
                    Error::malformed(
                        form,
                        format!("each binding must be a non-empty list, got {binding}"),
                    )
                })?;
            let head: &'a Value = parts[0];
            let Value::Symbol(name) = head else {
                return Err(Error::TypeMismatch(format!(
                    "{form} binding name must be a symbol, got {} {head}",
                    head.type_name()
                )));
            };
            if parts.len() != 2 {
                return Err(Error::malformed(
                    form,
                    format!("binding for {name} must have exactly one value expression"),
                ));
            }
            Ok((name.as_str(), parts[1]))
        })
        .collect()
}

/// Parallel binding: every initializer sees only the outer frame
fn eval_let(args: &[Value], frame: &Frame, depth: usize) -> Result<Value, Error> {
    let [bindings, body @ ..] = args else {
        return Err(wrong_arity(SpecialForm::Let, args));
    };
    let bindings = parse_bindings("let", bindings)?;

    for (i, (name, _)) in bindings.iter().enumerate() {
        if bindings[..i].iter().any(|(earlier, _)| earlier == name) {
            return Err(Error::DuplicateBinding {
                form: "let",
                name: (*name).to_owned(),
            });
        }
    }

    let values = bindings
        .iter()
        .map(|(_, expr)| eval_with_depth_tracking(expr, frame, depth + 1))
        .collect::<Result<Vec<_>, _>>()?;

    let scope = frame.child();
    for ((name, _), value) in bindings.iter().zip(values) {
        scope.define(*name, value);
    }
    eval_sequence(body, &scope, depth)
}

/// Sequential binding: one new frame per binding, each chained onto the previous one
fn eval_let_star(args: &[Value], frame: &Frame, depth: usize) -> Result<Value, Error> {
    let [bindings, body @ ..] = args else {
        return Err(wrong_arity(SpecialForm::LetStar, args));
    };
    let bindings = parse_bindings("let*", bindings)?;

    let mut scope = frame.clone();
    for (name, expr) in bindings {
        let value = eval_with_depth_tracking(expr, &scope, depth + 1)?;
        scope = scope.child();
        scope.define(name, value);
    }
    eval_sequence(body, &scope, depth)
}

/// Recursive binding in three passes over one fresh frame:
///
/// 1. bind every name to `Unspecified`
/// 2. evaluate each initializer, failing if a result is still `Unspecified`
/// 3. drop the placeholders and evaluate every initializer again, binding as it goes
///
/// Initializers therefore run twice.
fn eval_letrec(args: &[Value], frame: &Frame, depth: usize) -> Result<Value, Error> {
    let [bindings, body @ ..] = args else {
        return Err(wrong_arity(SpecialForm::LetRec, args));
    };
    let bindings = parse_bindings("letrec", bindings)?;

    let scope = frame.child();
    for (name, _) in &bindings {
        scope.define(*name, Value::Unspecified);
    }

    tracing::debug!(bindings = bindings.len(), "letrec initialization check");
    for (name, expr) in &bindings {
        if let Value::Unspecified = eval_with_depth_tracking(expr, &scope, depth + 1)? {
            return Err(Error::UninitializedBinding((*name).to_owned()));
        }
    }

    scope.clear();
    for (name, expr) in &bindings {
        let value = eval_with_depth_tracking(expr, &scope, depth + 1)?;
        if scope.contains_local(name) {
            return Err(Error::DuplicateBinding {
                form: "letrec",
                name: (*name).to_owned(),
            });
        }
        scope.define(*name, value);
    }

    eval_sequence(body, &scope, depth)
}

/// The first clause whose test is `else` or evaluates to anything but `#f` wins
fn eval_cond(args: &[Value], frame: &Frame, depth: usize) -> Result<Value, Error> {
    for clause in args {
        let parts = clause
            .list_items()
            .filter(|parts| !parts.is_empty())
            .ok_or_else(|| {
                Error::malformed("cond", format!("clause must be a non-empty list, got {clause}"))
            })?;

        let matched = match parts[0] {
            Value::Symbol(name) if name == "else" => true,
            Value::Symbol(name) => {
                return Err(Error::malformed(
                    "cond",
                    format!("unexpected symbol in test position: {name}"),
                ));
            }
            test => !matches!(
                eval_with_depth_tracking(test, frame, depth + 1)?,
                Value::Bool(false)
            ),
        };

        if matched {
            let consequent = parts.get(1).ok_or_else(|| {
                Error::malformed("cond", format!("clause has no consequent: {clause}"))
            })?;
            return eval_with_depth_tracking(consequent, frame, depth + 1);
        }
    }
    Ok(Value::Void)
}
