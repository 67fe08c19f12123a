//! Built-in primitive procedures.
//!
//! Primitives are ordinary procedure values: the driver binds each one in the global frame
//! under its Scheme name, so they can be passed around, rebound or shadowed like closures.
//! Each receives the complete evaluated argument list and returns one value.
//!
//! ```scheme
//! (+ 1 2.5)          ; 3.5, any double argument makes the result a double
//! (/ 6 3)            ; 2, exact integer division stays an integer
//! (/ 1 3)            ; 0.3333333333333333
//! (car (cons 1 2))   ; 1
//! ```
//!
//! ## Error Handling
//!
//! - **Arity**: every primitive declares an [`Arity`] that is checked before it runs
//! - **Types**: non-numeric arguments to arithmetic, non-pairs to `car`/`cdr` and non-integers
//!   to `modulo` are [`Error::TypeMismatch`]
//! - **Overflow**: integer arithmetic is checked and reports overflow instead of wrapping
//!
//! Special forms are not in this registry; see `evaluator::special_forms`.

use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use crate::Error;
use crate::ast::{PrimitiveFn, Value};

/// Number of arguments accepted by a procedure or special form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
    Any,
}

impl Arity {
    pub fn accepts(&self, count: usize) -> bool {
        match *self {
            Arity::Exact(n) => count == n,
            Arity::AtLeast(n) => count >= n,
            Arity::Any => true,
        }
    }

    /// Check an argument count, reporting the minimum acceptable count on failure
    pub fn validate(&self, count: usize) -> Result<(), Error> {
        if self.accepts(count) {
            return Ok(());
        }
        let expected = match *self {
            Arity::Exact(n) | Arity::AtLeast(n) => n,
            Arity::Any => count,
        };
        Err(Error::arity_error(expected, count))
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(1) => write!(f, "exactly 1 argument"),
            Arity::Exact(n) => write!(f, "exactly {n} arguments"),
            Arity::AtLeast(1) => write!(f, "at least 1 argument"),
            Arity::AtLeast(n) => write!(f, "at least {n} arguments"),
            Arity::Any => write!(f, "any number of arguments"),
        }
    }
}

/// Definition of a built-in primitive procedure
#[derive(Debug)]
pub struct BuiltinOp {
    /// The name the procedure is bound to in the global frame
    pub scheme_id: &'static str,
    pub func: PrimitiveFn,
    pub arity: Arity,
}

impl BuiltinOp {
    /// Validate the argument count, then run the primitive
    pub fn call(&self, args: &[Value]) -> Result<Value, Error> {
        self.arity.validate(args.len()).map_err(|err| match err {
            Error::ArityMismatch { expected, got, .. } => {
                Error::arity_error_with_expr(expected, got, self.scheme_id.to_owned())
            }
            other => other,
        })?;
        (self.func)(args)
    }
}

impl PartialEq for BuiltinOp {
    fn eq(&self, other: &Self) -> bool {
        // Operations are uniquely identified by name
        self.scheme_id == other.scheme_id
    }
}

//
// Numeric tower: integers and doubles, with promotion to double when mixed
//

#[derive(Debug, Clone, Copy, PartialEq)]
enum Number {
    Int(i64),
    Double(f64),
}

impl Number {
    fn from_value(op: &str, position: usize, value: &Value) -> Result<Number, Error> {
        match value {
            Value::Int(n) => Ok(Number::Int(*n)),
            Value::Double(d) => Ok(Number::Double(*d)),
            other => Err(Error::TypeMismatch(format!(
                "{op}: argument {position} must be a number, got {} {other}",
                other.type_name()
            ))),
        }
    }

    fn to_f64(self) -> f64 {
        match self {
            Number::Int(n) => n as f64,
            Number::Double(d) => d,
        }
    }
}

fn numeric_args(op: &str, args: &[Value]) -> Result<Vec<Number>, Error> {
    args.iter()
        .enumerate()
        .map(|(i, arg)| Number::from_value(op, i + 1, arg))
        .collect()
}

fn numeric_pair(op: &str, args: &[Value]) -> Result<(Number, Number), Error> {
    match args {
        [a, b] => Ok((Number::from_value(op, 1, a)?, Number::from_value(op, 2, b)?)),
        _ => Err(Error::arity_error_with_expr(2, args.len(), op.to_owned())),
    }
}

fn overflow(operation: &str) -> Error {
    Error::EvalError(format!("Integer overflow in {operation}"))
}

// Macro to generate the variadic folds (+ and *)
macro_rules! variadic_arithmetic {
    ($name:ident, $op_str:expr, $identity:expr, $checked:ident, $float_op:tt, $what:expr) => {
        fn $name(args: &[Value]) -> Result<Value, Error> {
            let numbers = numeric_args($op_str, args)?;

            if numbers.iter().any(|n| matches!(n, Number::Double(_))) {
                let result = numbers
                    .iter()
                    .fold($identity as f64, |acc, n| acc $float_op n.to_f64());
                return Ok(Value::Double(result));
            }

            let mut result: i64 = $identity;
            for n in numbers {
                if let Number::Int(n) = n {
                    result = result.$checked(n).ok_or_else(|| overflow($what))?;
                }
            }
            Ok(Value::Int(result))
        }
    };
}

variadic_arithmetic!(builtin_add, "+", 0, checked_add, +, "addition");
variadic_arithmetic!(builtin_mul, "*", 1, checked_mul, *, "multiplication");

fn builtin_sub(args: &[Value]) -> Result<Value, Error> {
    match numeric_pair("-", args)? {
        (Number::Int(a), Number::Int(b)) => a
            .checked_sub(b)
            .map(Value::Int)
            .ok_or_else(|| overflow("subtraction")),
        (a, b) => Ok(Value::Double(a.to_f64() - b.to_f64())),
    }
}

/// Exact integer quotients stay integers; everything else is a true (non-floor) quotient
fn builtin_div(args: &[Value]) -> Result<Value, Error> {
    match numeric_pair("/", args)? {
        (Number::Int(_), Number::Int(0)) => Err(Error::EvalError("Division by zero".to_owned())),
        (Number::Int(a), Number::Int(b)) => {
            let remainder = a.checked_rem(b).ok_or_else(|| overflow("division"))?;
            if remainder == 0 {
                a.checked_div(b)
                    .map(Value::Int)
                    .ok_or_else(|| overflow("division"))
            } else {
                Ok(Value::Double(a as f64 / b as f64))
            }
        }
        (a, b) => Ok(Value::Double(a.to_f64() / b.to_f64())),
    }
}

/// Remainder with the sign of the dividend
fn builtin_modulo(args: &[Value]) -> Result<Value, Error> {
    match args {
        [Value::Int(_), Value::Int(0)] => {
            Err(Error::EvalError("Division by zero in modulo".to_owned()))
        }
        [Value::Int(a), Value::Int(b)] => Ok(Value::Int(a.wrapping_rem(*b))),
        [a, b] => {
            let offender = if matches!(a, Value::Int(_)) { b } else { a };
            Err(Error::TypeMismatch(format!(
                "modulo requires integer arguments, got {} {offender}",
                offender.type_name()
            )))
        }
        _ => Err(Error::arity_error_with_expr(2, args.len(), "modulo".to_owned())),
    }
}

// Macro to generate the binary numeric comparisons
macro_rules! numeric_comparison {
    ($name:ident, $op:tt, $op_str:expr) => {
        fn $name(args: &[Value]) -> Result<Value, Error> {
            let result = match numeric_pair($op_str, args)? {
                (Number::Int(a), Number::Int(b)) => a $op b,
                (a, b) => a.to_f64() $op b.to_f64(),
            };
            Ok(Value::Bool(result))
        }
    };
}

numeric_comparison!(builtin_lt, <, "<");
numeric_comparison!(builtin_gt, >, ">");
numeric_comparison!(builtin_eq, ==, "=");

fn builtin_car(args: &[Value]) -> Result<Value, Error> {
    match args {
        [Value::Pair(pair)] => Ok(pair.head.clone()),
        [other] => Err(Error::TypeMismatch(format!(
            "car requires a pair, got {} {other}",
            other.type_name()
        ))),
        _ => Err(Error::arity_error_with_expr(1, args.len(), "car".to_owned())),
    }
}

/// The tail as stored: the rest of a proper list, or the atom after the dot of a dotted pair
fn builtin_cdr(args: &[Value]) -> Result<Value, Error> {
    match args {
        [Value::Pair(pair)] => Ok(pair.tail.clone()),
        [other] => Err(Error::TypeMismatch(format!(
            "cdr requires a pair, got {} {other}",
            other.type_name()
        ))),
        _ => Err(Error::arity_error_with_expr(1, args.len(), "cdr".to_owned())),
    }
}

fn builtin_cons(args: &[Value]) -> Result<Value, Error> {
    match args {
        [head, tail] => Ok(Value::cons(head.clone(), tail.clone())),
        _ => Err(Error::arity_error_with_expr(2, args.len(), "cons".to_owned())),
    }
}

/// `#t` iff the argument, after repeatedly taking the head while it is a pair, is `()`
fn builtin_null(args: &[Value]) -> Result<Value, Error> {
    let [value] = args else {
        return Err(Error::arity_error_with_expr(1, args.len(), "null?".to_owned()));
    };

    let mut current = value;
    while let Value::Pair(pair) = current {
        current = &pair.head;
    }
    Ok(Value::Bool(current.is_nil()))
}

/// Registry of all primitives, in the order they are bound in the global frame
static BUILTIN_OPS: [BuiltinOp; 12] = [
    // List operations
    BuiltinOp {
        scheme_id: "car",
        func: builtin_car,
        arity: Arity::Exact(1),
    },
    BuiltinOp {
        scheme_id: "cdr",
        func: builtin_cdr,
        arity: Arity::Exact(1),
    },
    BuiltinOp {
        scheme_id: "null?",
        func: builtin_null,
        arity: Arity::Exact(1),
    },
    BuiltinOp {
        scheme_id: "cons",
        func: builtin_cons,
        arity: Arity::Exact(2),
    },
    // Arithmetic operations
    BuiltinOp {
        scheme_id: "+",
        func: builtin_add,
        arity: Arity::Any,
    },
    BuiltinOp {
        scheme_id: "-",
        func: builtin_sub,
        arity: Arity::Exact(2),
    },
    BuiltinOp {
        scheme_id: "*",
        func: builtin_mul,
        arity: Arity::Any,
    },
    BuiltinOp {
        scheme_id: "/",
        func: builtin_div,
        arity: Arity::Exact(2),
    },
    BuiltinOp {
        scheme_id: "modulo",
        func: builtin_modulo,
        arity: Arity::Exact(2),
    },
    // Comparison operations
    BuiltinOp {
        scheme_id: "<",
        func: builtin_lt,
        arity: Arity::Exact(2),
    },
    BuiltinOp {
        scheme_id: ">",
        func: builtin_gt,
        arity: Arity::Exact(2),
    },
    BuiltinOp {
        scheme_id: "=",
        func: builtin_eq,
        arity: Arity::Exact(2),
    },
];

/// Lazy static map from scheme_id to BuiltinOp (private - use find_scheme_op)
static BUILTIN_SCHEME: LazyLock<HashMap<&'static str, &'static BuiltinOp>> =
    LazyLock::new(|| BUILTIN_OPS.iter().map(|op| (op.scheme_id, op)).collect());

/// Get all builtin operations (for seeding the global frame)
pub fn get_builtin_ops() -> &'static [BuiltinOp] {
    &BUILTIN_OPS
}

/// Find a builtin operation by its Scheme identifier
pub fn find_scheme_op(id: &str) -> Option<&'static BuiltinOp> {
    BUILTIN_SCHEME.get(id).copied()
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use crate::ast::{nil, sym, val};

    /// Micro-helper for success cases in comprehensive tests
    fn success<T: Into<Value>>(value: T) -> Option<Value> {
        Some(val(value))
    }

    /// Invoke a builtin through the public registry, including arity validation
    fn call_builtin(name: &str, args: &[Value]) -> Result<Value, Error> {
        find_scheme_op(name).expect("builtin not found").call(args)
    }

    #[test]
    fn test_builtin_ops_registry() {
        let names: Vec<_> = get_builtin_ops().iter().map(|op| op.scheme_id).collect();
        assert_eq!(
            names,
            vec!["car", "cdr", "null?", "cons", "+", "-", "*", "/", "modulo", "<", ">", "="]
        );

        let add = find_scheme_op("+").unwrap();
        assert_eq!(add.arity, Arity::Any);
        assert!(std::ptr::eq(add, &get_builtin_ops()[4]));
        assert!(find_scheme_op("list").is_none());
    }

    #[test]
    fn test_arity_validation() {
        assert!(Arity::Exact(2).accepts(2));
        assert!(!Arity::Exact(2).accepts(3));
        assert!(Arity::AtLeast(1).accepts(5));
        assert!(!Arity::AtLeast(1).accepts(0));
        assert!(Arity::Any.accepts(0));

        assert_eq!(Arity::Exact(2).validate(3), Err(Error::arity_error(2, 3)));
        assert_eq!(Arity::AtLeast(2).validate(1), Err(Error::arity_error(2, 1)));
        assert_eq!(format!("{}", Arity::AtLeast(2)), "at least 2 arguments");
    }

    #[test]
    fn test_builtin_functions_data_driven() {
        let pair = Value::cons(val(1), val(2));
        let test_cases: Vec<(&str, Vec<Value>, Option<Value>)> = vec![
            // Variadic addition and multiplication
            ("+", vec![], success(0)),
            ("+", vec![val(1), val(2), val(3)], success(6)),
            ("+", vec![val(1), val(2.5)], success(3.5)),
            ("+", vec![val(1.5), val(1.5)], success(3.0)),
            ("+", vec![val(i64::MAX), val(1)], None),
            ("+", vec![val(1), val("2")], None),
            ("*", vec![], success(1)),
            ("*", vec![val(2), val(3), val(4)], success(24)),
            ("*", vec![val(2), val(0.5)], success(1.0)),
            ("*", vec![val(i64::MAX), val(2)], None),
            ("*", vec![val(true)], None),
            // Binary arithmetic with promotion
            ("-", vec![val(10), val(3)], success(7)),
            ("-", vec![val(10), val(0.5)], success(9.5)),
            ("-", vec![val(i64::MIN), val(1)], None),
            ("-", vec![val(10)], None),
            ("-", vec![val(1), val(2), val(3)], None),
            ("/", vec![val(6), val(3)], success(2)),
            ("/", vec![val(-6), val(3)], success(-2)),
            ("/", vec![val(1), val(3)], success(1.0 / 3.0)),
            ("/", vec![val(7), val(2)], success(3.5)),
            ("/", vec![val(6.0), val(3)], success(2.0)),
            ("/", vec![val(1), val(0)], None),
            ("/", vec![val(i64::MIN), val(-1)], None),
            ("/", vec![val(1), sym("x")], None),
            ("modulo", vec![val(7), val(3)], success(1)),
            ("modulo", vec![val(-7), val(3)], success(-1)),
            ("modulo", vec![val(i64::MIN), val(-1)], success(0)),
            ("modulo", vec![val(7), val(0)], None),
            ("modulo", vec![val(7.0), val(3)], None),
            ("modulo", vec![val(7), val(3.0)], None),
            // Comparisons
            ("<", vec![val(1), val(2)], success(true)),
            ("<", vec![val(2), val(1)], success(false)),
            ("<", vec![val(1), val(1.5)], success(true)),
            (">", vec![val(2.5), val(2)], success(true)),
            (">", vec![val(2), val(2)], success(false)),
            ("=", vec![val(2), val(2.0)], success(true)),
            ("=", vec![val(2), val(3)], success(false)),
            ("=", vec![val(1), val(1), val(1)], None),
            ("<", vec![val("a"), val(1)], None),
            // Pairs and lists
            ("car", vec![pair.clone()], success(1)),
            ("cdr", vec![pair.clone()], success(2)),
            ("car", vec![val([1, 2, 3])], success(1)),
            ("cdr", vec![val([1, 2, 3])], success([2, 3])),
            ("cdr", vec![val([1])], Some(nil())),
            ("car", vec![nil()], None),
            ("cdr", vec![val(5)], None),
            ("car", vec![pair.clone(), pair.clone()], None),
            ("cons", vec![val(1), val(2)], Some(pair.clone())),
            ("cons", vec![val(1), nil()], success([1])),
            ("cons", vec![val(1)], None),
            ("null?", vec![nil()], success(true)),
            ("null?", vec![val([1])], success(false)),
            ("null?", vec![val(0)], success(false)),
            ("null?", vec![val(vec![nil(), val(1)])], success(true)),
            ("null?", vec![], None),
        ];

        for (i, (name, args, expected)) in test_cases.into_iter().enumerate() {
            let result = call_builtin(name, &args);
            match (result, expected) {
                (Ok(actual), Some(expected)) => {
                    assert_eq!(actual, expected, "case #{} ({name})", i + 1);
                }
                (Err(_), None) => {}
                (Ok(actual), None) => {
                    panic!("case #{} ({name}): expected error, got {actual:?}", i + 1)
                }
                (Err(err), Some(expected)) => {
                    panic!("case #{} ({name}): expected {expected:?}, got {err}", i + 1)
                }
            }
        }
    }

    #[test]
    fn test_builtin_error_kinds() {
        assert!(matches!(
            call_builtin("car", &[val(1)]),
            Err(Error::TypeMismatch(_))
        ));
        assert!(matches!(
            call_builtin("+", &[val(1), nil()]),
            Err(Error::TypeMismatch(_))
        ));
        assert_eq!(
            call_builtin("cons", &[val(1)]),
            Err(Error::arity_error_with_expr(2, 1, "cons".to_owned()))
        );
        assert!(matches!(
            call_builtin("/", &[val(1), val(0)]),
            Err(Error::EvalError(msg)) if msg.contains("Division by zero")
        ));
    }

    #[test]
    fn test_double_division_follows_ieee() {
        assert_eq!(
            call_builtin("/", &[val(1.0), val(0)]).unwrap(),
            val(f64::INFINITY)
        );
    }
}
