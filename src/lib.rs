//! minischeme - a small tree-walking Scheme interpreter
//!
//! Source text is tokenized and parsed into nested pair structures, then evaluated by a
//! recursive evaluator with lexical frames, closures and a handful of primitive procedures.
//!
//! ```scheme
//! (define square (lambda (x) (* x x)))
//! (square 12)                          ; 144
//! (let* ((x 1) (y (+ x 1))) y)         ; 2
//! (cons 1 2)                           ; (1 . 2)
//! (/ 1 3)                              ; 0.3333333333333333
//! ```
//!
//! ## Evaluation model
//!
//! - Every datum is a [`ast::Value`]; lists are chains of pairs ending in the empty list.
//! - Scopes are [`evaluator::Frame`]s: ordered bindings plus a shared link to the enclosing
//!   frame. Closures keep their defining frame alive.
//! - Special forms (`if`, `let`, `let*`, `letrec`, `quote`, `define`, `set!`, `lambda`,
//!   `and`, `or`, `begin`, `cond`) are classified once per call form and receive their
//!   arguments unevaluated; everything else is evaluate-then-apply.
//!
//! ## Errors are fatal
//!
//! Every evaluation failure is returned as an [`Error`] and the driver stops at the first
//! one: no later top-level form is evaluated. There is no recovery mechanism inside the
//! language.
//!
//! ## Modules
//!
//! - `ast`: the value representation and the pair/list model
//! - `evaluator`: frames, `eval`/`apply` and the special forms
//! - `builtinops`: the primitive procedure registry
//! - `scheme`: tokenizer and parser from source text
//! - `interpreter`: the top-level driver used by the binary and the REPL

use std::fmt;

/// Maximum parsing depth to prevent stack overflow on pathological input
pub const MAX_PARSE_DEPTH: usize = 256;

/// Maximum evaluation depth. Non-tail recursion in Scheme programs recurses in the
/// evaluator; past this depth evaluation fails with `Error::EvalError`.
///
/// The limit only guards the native stack when evaluation runs on a stack of at least
/// [`EVAL_STACK_SIZE`] bytes. A default-sized thread (8 MiB on Linux) overflows after a
/// few thousand levels, well before the limit is reached.
pub const MAX_EVAL_DEPTH: usize = 10_000;

/// Stack size for a thread running the evaluator, large enough to reach
/// [`MAX_EVAL_DEPTH`] before the native stack runs out
pub const EVAL_STACK_SIZE: usize = 256 * 1024 * 1024;

/// Categorizes the different kinds of parsing errors.
#[derive(Debug, PartialEq, Clone)]
pub enum ParseErrorKind {
    /// Invalid or unexpected syntax (bad tokens, stray close parens)
    InvalidSyntax,
    /// Input ended before the expression was complete (unclosed parens or strings)
    Incomplete,
    /// Expression nesting exceeded the maximum parse depth
    TooDeeplyNested,
    /// Extra input found after a complete, valid expression
    TrailingContent,
    /// Implementation-imposed limit exceeded (integer literal overflow)
    ImplementationLimit,
}

/// A structured error providing detailed information about a parsing failure.
#[derive(Debug, PartialEq, Clone)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    /// Context snippet from the input showing where the error occurred (max 100 chars)
    pub context: Option<String>,
    /// The problematic token or character encountered, if identifiable
    pub found: Option<String>,
}

impl ParseError {
    pub fn new(
        kind: ParseErrorKind,
        message: impl Into<String>,
        context: Option<String>,
        found: Option<String>,
    ) -> Self {
        ParseError {
            kind,
            message: message.into(),
            context,
            found,
        }
    }

    /// Create a simple ParseError with a kind and message but no context
    pub fn from_message(kind: ParseErrorKind, message: impl Into<String>) -> Self {
        Self::new(kind, message, None, None)
    }

    /// Create a ParseError with a context snippet around the byte offset `error_offset`
    pub fn with_context_and_found(
        kind: ParseErrorKind,
        message: impl Into<String>,
        input: &str,
        error_offset: usize,
        found: Option<String>,
    ) -> Self {
        const MAX_CONTEXT: usize = 100;
        const CONTEXT_BEFORE: usize = 20;

        let error_char = input
            .get(..error_offset)
            .map_or(0, |prefix| prefix.chars().count());
        let context_start = error_char.saturating_sub(CONTEXT_BEFORE);
        let total_chars = input.chars().count();

        let context_str: String = input
            .chars()
            .skip(context_start)
            .take(MAX_CONTEXT)
            .collect();

        let mut display_context = String::new();
        if context_start > 0 {
            display_context.push_str("[...]");
        }
        display_context.push_str(&context_str);
        if context_start + MAX_CONTEXT < total_chars {
            display_context.push_str("[...]");
        }

        let display_context = display_context.replace('\n', "\\n").replace('\r', "");

        Self::new(kind, message, Some(display_context), found)
    }
}

/// Error types for the interpreter. Any of these ends the run.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    ParseError(ParseError),
    /// Symbol lookup reached the global frame without finding a binding
    UnboundVariable(String),
    /// `set!` of a name bound in no enclosing frame
    UnboundAssignment(String),
    /// Wrong arity or shape for a special form
    MalformedSpecialForm {
        form: &'static str,
        message: String,
    },
    /// Application of a value that is neither a closure nor a primitive
    NotApplicable(String),
    /// Wrong value variant passed to a primitive or special form
    TypeMismatch(String),
    /// The same name bound twice by one `let`, `letrec` or `lambda`
    DuplicateBinding {
        form: &'static str,
        name: String,
    },
    /// A `letrec` initializer observed a sibling that was not assigned yet
    UninitializedBinding(String),
    ArityMismatch {
        expected: usize,
        got: usize,
        expression: Option<String>,
    },
    /// Runtime failures outside the taxonomy above: overflow, division by zero, depth limit
    EvalError(String),
    /// Failure writing driver output
    Io(String),
}

impl Error {
    /// Create an ArityMismatch without expression context
    pub fn arity_error(expected: usize, got: usize) -> Self {
        Error::ArityMismatch {
            expected,
            got,
            expression: None,
        }
    }

    /// Create an ArityMismatch naming the procedure or expression involved
    pub fn arity_error_with_expr(expected: usize, got: usize, expression: String) -> Self {
        Error::ArityMismatch {
            expected,
            got,
            expression: Some(expression),
        }
    }

    pub fn malformed(form: &'static str, message: impl Into<String>) -> Self {
        Error::MalformedSpecialForm {
            form,
            message: message.into(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::ParseError(e) => {
                write!(f, "Syntax error: {}", e.message)?;
                if let Some(found) = &e.found {
                    write!(f, "\nFound: {found}")?;
                }
                if let Some(context) = &e.context {
                    write!(f, "\nContext: {context}")?;
                }
                Ok(())
            }
            Error::UnboundVariable(var) => write!(f, "Unbound variable: {var}"),
            Error::UnboundAssignment(var) => {
                write!(f, "Unbound variable in set!: {var} is not defined")
            }
            Error::MalformedSpecialForm { form, message } => {
                write!(f, "Bad syntax in {form}: {message}")
            }
            Error::NotApplicable(value) => write!(f, "Not a procedure: {value}"),
            Error::TypeMismatch(msg) => write!(f, "Type error: {msg}"),
            Error::DuplicateBinding { form, name } => {
                write!(f, "Duplicate identifier in {form}: {name}")
            }
            Error::UninitializedBinding(name) => {
                write!(f, "letrec binding used before initialization: {name}")
            }
            Error::ArityMismatch {
                expected,
                got,
                expression,
            } => match expression {
                Some(expr) => write!(
                    f,
                    "ArityError: {expr}: expected {expected} arguments, got {got}"
                ),
                None => write!(
                    f,
                    "ArityError: procedure expected {expected} arguments but got {got}"
                ),
            },
            Error::EvalError(msg) => write!(f, "Evaluation error: {msg}"),
            Error::Io(msg) => write!(f, "I/O error: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

pub mod ast;
pub mod builtinops;
pub mod evaluator;

#[cfg(feature = "scheme")]
pub mod interpreter;

#[cfg(feature = "scheme")]
pub mod scheme;
