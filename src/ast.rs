//! This module defines the runtime value type shared by the parser, the evaluator and the
//! primitives. The main enum, [`Value`], covers every datum the interpreter handles: the
//! empty list, numbers, booleans, strings, symbols, pairs, closures and primitives, plus the
//! two markers `Void` (result of side-effecting forms) and `Unspecified` (used while a
//! `letrec` is being initialized).
//!
//! Pairs are the only structural constructor. A proper list is a chain of [`Pair`]s ending in
//! [`Value::Nil`]; any other tail makes a dotted pair. Pairs are immutable and shared through
//! `Rc`, so cloning a `Value` never copies list structure.
//!
//! Helper functions [`val`], [`sym`] and [`nil`] build values conveniently in code and tests.

use std::fmt;
use std::rc::Rc;

use crate::Error;
use crate::builtinops::BuiltinOp;
use crate::evaluator::Frame;

/// Signature shared by every primitive procedure: the full evaluated argument list in,
/// one value out.
pub type PrimitiveFn = fn(&[Value]) -> Result<Value, Error>;

/// Core value type of the interpreter
#[derive(Clone)]
pub enum Value {
    /// The empty list `()`
    Nil,
    /// Result of `define`, `set!` and forms with nothing to return; never printed
    Void,
    /// Placeholder bound to `letrec` names before their initializers have run
    Unspecified,
    Int(i64),
    Double(f64),
    Bool(bool),
    Str(String),
    Symbol(String),
    Pair(Rc<Pair>),
    /// User procedure created by `lambda`
    Closure(Rc<Closure>),
    /// Built-in procedure from the primitive registry
    Primitive(&'static BuiltinOp),
}

/// A cons cell
pub struct Pair {
    pub head: Value,
    pub tail: Value,
}

/// A procedure value: formal parameters, a single body expression and the frame that was
/// current when the `lambda` was evaluated.
pub struct Closure {
    /// Proper list of distinct symbols
    pub params: Value,
    pub body: Value,
    pub env: Frame,
}

impl Value {
    /// Build a pair from a head and a tail
    pub fn cons(head: Value, tail: Value) -> Value {
        Value::Pair(Rc::new(Pair { head, tail }))
    }

    /// Build a proper list from the given elements
    pub fn list<I>(elements: I) -> Value
    where
        I: IntoIterator<Item = Value>,
        I::IntoIter: DoubleEndedIterator,
    {
        Self::list_with_tail(elements, Value::Nil)
    }

    /// Build a list whose final tail is `tail` (a dotted list unless `tail` is a list)
    pub fn list_with_tail<I>(elements: I, tail: Value) -> Value
    where
        I: IntoIterator<Item = Value>,
        I::IntoIter: DoubleEndedIterator,
    {
        elements
            .into_iter()
            .rev()
            .fold(tail, |acc, element| Value::cons(element, acc))
    }

    /// Head of a pair
    pub fn first(&self) -> Option<&Value> {
        match self {
            Value::Pair(pair) => Some(&pair.head),
            _ => None,
        }
    }

    /// Tail of a pair
    pub fn rest(&self) -> Option<&Value> {
        match self {
            Value::Pair(pair) => Some(&pair.tail),
            _ => None,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// True for `Nil` and for pair chains terminated by `Nil`
    pub fn is_list(&self) -> bool {
        self.list_items().is_some()
    }

    /// Iterate over the heads of a pair chain. Iteration stops at the first non-pair tail,
    /// so a dotted list yields its elements without the final atom.
    pub fn iter(&self) -> ListIter<'_> {
        ListIter { cursor: self }
    }

    /// Borrow the elements of a proper list, or `None` if `self` is not a proper list
    pub fn list_items(&self) -> Option<Vec<&Value>> {
        let mut items = Vec::new();
        let mut cursor = self;
        loop {
            match cursor {
                Value::Nil => return Some(items),
                Value::Pair(pair) => {
                    items.push(&pair.head);
                    cursor = &pair.tail;
                }
                _ => return None,
            }
        }
    }

    /// Clone the elements of a proper list into a vector
    pub fn to_vec(&self) -> Option<Vec<Value>> {
        self.list_items()
            .map(|items| items.into_iter().cloned().collect())
    }

    /// Number of elements in a proper list
    pub fn list_length(&self) -> Option<usize> {
        self.list_items().map(|items| items.len())
    }

    /// A new list with the elements of a proper list in reverse order. The elements
    /// themselves are shared, not copied.
    pub fn reverse(&self) -> Option<Value> {
        let items = self.list_items()?;
        Some(
            items
                .into_iter()
                .fold(Value::Nil, |acc, item| Value::cons(item.clone(), acc)),
        )
    }

    /// Name of the variant for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "empty list",
            Value::Void => "void",
            Value::Unspecified => "unspecified",
            Value::Int(_) => "integer",
            Value::Double(_) => "double",
            Value::Bool(_) => "boolean",
            Value::Str(_) => "string",
            Value::Symbol(_) => "symbol",
            Value::Pair(_) => "pair",
            Value::Closure(_) | Value::Primitive(_) => "procedure",
        }
    }
}

/// Iterator over the heads of a pair chain, see [`Value::iter`]
pub struct ListIter<'a> {
    cursor: &'a Value,
}

impl<'a> Iterator for ListIter<'a> {
    type Item = &'a Value;

    fn next(&mut self) -> Option<Self::Item> {
        match self.cursor {
            Value::Pair(pair) => {
                self.cursor = &pair.tail;
                Some(&pair.head)
            }
            _ => None,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "Nil"),
            Value::Void => write!(f, "Void"),
            Value::Unspecified => write!(f, "Unspecified"),
            Value::Int(n) => write!(f, "Int({n})"),
            Value::Double(d) => write!(f, "Double({d:?})"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Str(s) => write!(f, "Str({s:?})"),
            Value::Symbol(s) => write!(f, "Symbol({s})"),
            Value::Pair(pair) => write!(f, "Pair({:?}, {:?})", pair.head, pair.tail),
            // The captured frame is left out: it usually contains the closure itself
            Value::Closure(closure) => write!(
                f,
                "Closure(params={}, body={})",
                closure.params, closure.body
            ),
            Value::Primitive(op) => write!(f, "Primitive({})", op.scheme_id),
        }
    }
}

/// Fixed-point with a decimal point always present, so the text reads back as a double
fn write_double(f: &mut fmt::Formatter<'_>, d: f64) -> fmt::Result {
    let text = d.to_string();
    if d.is_finite() && !text.contains('.') {
        write!(f, "{text}.0")
    } else {
        write!(f, "{text}")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "()"),
            Value::Void => Ok(()),
            Value::Unspecified => write!(f, "#<unspecified>"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Double(d) => write_double(f, *d),
            Value::Bool(b) => write!(f, "{}", if *b { "#t" } else { "#f" }),
            Value::Str(s) => {
                write!(f, "\"")?;
                for ch in s.chars() {
                    match ch {
                        '"' => write!(f, "\\\"")?,
                        '\\' => write!(f, "\\\\")?,
                        '\n' => write!(f, "\\n")?,
                        '\t' => write!(f, "\\t")?,
                        '\r' => write!(f, "\\r")?,
                        c => write!(f, "{c}")?,
                    }
                }
                write!(f, "\"")
            }
            Value::Symbol(s) => write!(f, "{s}"),
            Value::Pair(pair) => {
                write!(f, "({}", pair.head)?;
                let mut tail = &pair.tail;
                loop {
                    match tail {
                        Value::Nil => break,
                        Value::Pair(next) => {
                            write!(f, " {}", next.head)?;
                            tail = &next.tail;
                        }
                        atom => {
                            write!(f, " . {atom}")?;
                            break;
                        }
                    }
                }
                write!(f, ")")
            }
            Value::Closure(_) => write!(f, "#<procedure>"),
            Value::Primitive(op) => write!(f, "#<procedure:{}>", op.scheme_id),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil)
            | (Value::Void, Value::Void)
            | (Value::Unspecified, Value::Unspecified) => true,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::Pair(a), Value::Pair(b)) => a.head == b.head && a.tail == b.tail,
            // Procedures are equal only to themselves
            (Value::Closure(a), Value::Closure(b)) => Rc::ptr_eq(a, b),
            (Value::Primitive(a), Value::Primitive(b)) => a.scheme_id == b.scheme_id,
            _ => false,
        }
    }
}

// From trait implementations for Value - enables .into() conversion
impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Double(d)
    }
}

macro_rules! impl_from_integer {
    ($int_type:ty) => {
        impl From<$int_type> for Value {
            fn from(n: $int_type) -> Self {
                Value::Int(i64::from(n))
            }
        }
    };
}

impl_from_integer!(i8);
impl_from_integer!(i16);
impl_from_integer!(i32);
impl_from_integer!(i64);
impl_from_integer!(u8);
impl_from_integer!(u16);
impl_from_integer!(u32);

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::list(v.into_iter().map(Into::into))
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Value {
    fn from(arr: [T; N]) -> Self {
        Value::list(arr.into_iter().map(Into::into))
    }
}

/// Helper for creating symbols - works great in mixed lists
pub fn sym<S: AsRef<str>>(name: S) -> Value {
    Value::Symbol(name.as_ref().to_owned())
}

/// Helper for creating values from Rust literals, arrays and vectors
pub fn val<T: Into<Value>>(value: T) -> Value {
    value.into()
}

/// Helper for the empty list
pub fn nil() -> Value {
    Value::Nil
}
