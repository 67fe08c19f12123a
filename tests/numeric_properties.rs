//! Property tests for the numeric primitives: promotion, exact division and comparison laws.

use proptest::prelude::*;

use minischeme::ast::Value;
use minischeme::builtinops::find_scheme_op;
use minischeme::evaluator::{apply, create_global_env};

const PROP_CASES: u32 = 256;

fn call(name: &str, args: &[Value]) -> Result<Value, minischeme::Error> {
    let frame = create_global_env();
    let procedure = frame
        .lookup(name)
        .unwrap_or_else(|| panic!("{name} should be bound in the global frame"));
    apply(&procedure, args)
}

fn int_operand() -> impl Strategy<Value = i64> {
    -1_000_000i64..1_000_000i64
}

fn double_operand() -> impl Strategy<Value = f64> {
    -1_000_000.0f64..1_000_000.0f64
}

/// An operand that is either an integer or a double
fn numeric_operand() -> impl Strategy<Value = Value> {
    prop_oneof![
        int_operand().prop_map(Value::Int),
        double_operand().prop_map(Value::Double),
    ]
}

/// Small enough that products of a handful of operands cannot overflow
fn small_numeric_operand() -> impl Strategy<Value = Value> {
    prop_oneof![
        (-1_000i64..1_000i64).prop_map(Value::Int),
        (-1_000.0f64..1_000.0f64).prop_map(Value::Double),
    ]
}

fn as_f64(value: &Value) -> f64 {
    match value {
        Value::Int(n) => *n as f64,
        Value::Double(d) => *d,
        other => panic!("not a number: {other:?}"),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(PROP_CASES))]

    #[test]
    fn prop_arithmetic_promotes_iff_any_double(
        operands in prop::collection::vec(small_numeric_operand(), 2..6),
    ) {
        let any_double = operands.iter().any(|v| matches!(v, Value::Double(_)));
        for name in ["+", "*"] {
            let result = call(name, &operands);
            prop_assert!(result.is_ok(), "{name} failed: {result:?}");
            prop_assert_eq!(matches!(result, Ok(Value::Double(_))), any_double);
        }

        let pair = &operands[..2];
        let pair_has_double = pair.iter().any(|v| matches!(v, Value::Double(_)));
        let difference = call("-", pair);
        prop_assert!(difference.is_ok(), "- failed: {difference:?}");
        prop_assert_eq!(matches!(difference, Ok(Value::Double(_))), pair_has_double);
    }

    #[test]
    fn prop_integer_sum_is_exact(a in int_operand(), b in int_operand(), c in int_operand()) {
        prop_assert_eq!(
            call("+", &[Value::Int(a), Value::Int(b), Value::Int(c)]),
            Ok(Value::Int(a + b + c))
        );
        prop_assert_eq!(call("-", &[Value::Int(a), Value::Int(b)]), Ok(Value::Int(a - b)));
    }

    #[test]
    fn prop_exact_division_stays_integer(q in int_operand(), d in int_operand()) {
        prop_assume!(d != 0);
        prop_assert_eq!(call("/", &[Value::Int(q * d), Value::Int(d)]), Ok(Value::Int(q)));
    }

    #[test]
    fn prop_inexact_division_is_true_quotient(a in int_operand(), b in int_operand()) {
        prop_assume!(b != 0 && a % b != 0);
        prop_assert_eq!(
            call("/", &[Value::Int(a), Value::Int(b)]),
            Ok(Value::Double(a as f64 / b as f64))
        );
    }

    #[test]
    fn prop_modulo_takes_sign_of_dividend(a in int_operand(), b in int_operand()) {
        prop_assume!(b != 0);
        let Ok(Value::Int(r)) = call("modulo", &[Value::Int(a), Value::Int(b)]) else {
            panic!("modulo of integers should be an integer");
        };
        prop_assert_eq!(r, a % b);
        prop_assert!(r == 0 || (r < 0) == (a < 0));
        prop_assert!(r.abs() < b.abs());
    }

    #[test]
    fn prop_comparisons_agree_with_numeric_order(a in numeric_operand(), b in numeric_operand()) {
        let (x, y) = (as_f64(&a), as_f64(&b));
        let args = [a.clone(), b.clone()];
        prop_assert_eq!(call("<", &args), Ok(Value::Bool(x < y)));
        prop_assert_eq!(call(">", &args), Ok(Value::Bool(x > y)));
        prop_assert_eq!(call("=", &args), Ok(Value::Bool(x == y)));

        // Antisymmetry
        let swapped = [b, a];
        prop_assert_eq!(call("<", &args), call(">", &swapped));
    }

    #[test]
    fn prop_int_and_double_compare_equal(n in int_operand()) {
        prop_assert_eq!(
            call("=", &[Value::Int(n), Value::Double(n as f64)]),
            Ok(Value::Bool(true))
        );
    }

    #[test]
    fn prop_pair_accessors_invert_cons(a in numeric_operand(), b in numeric_operand()) {
        let pair = call("cons", &[a.clone(), b.clone()]);
        prop_assert!(pair.is_ok());
        let pair = pair.unwrap_or(Value::Nil);
        prop_assert_eq!(call("car", std::slice::from_ref(&pair)), Ok(a));
        prop_assert_eq!(call("cdr", std::slice::from_ref(&pair)), Ok(b));
        prop_assert_eq!(call("null?", &[pair]), Ok(Value::Bool(false)));
    }
}

#[test]
fn primitives_are_registered_by_name() {
    for name in ["car", "cdr", "null?", "cons", "+", "-", "*", "/", "modulo", "<", ">", "="] {
        let op = find_scheme_op(name).unwrap_or_else(|| panic!("missing {name}"));
        assert_eq!(op.scheme_id, name);
    }
}
