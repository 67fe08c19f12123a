//! Top-level driver: parse a whole program, then evaluate its forms one by one in a shared
//! global frame, printing each result. The first error ends the run.

use std::io::Write;

use crate::Error;
use crate::ast::Value;
use crate::evaluator::{Frame, create_global_env, eval};
use crate::scheme::{ParseConfig, parse_program_with_config};

/// An interpreter session owning the global frame
#[derive(Debug)]
pub struct Interpreter {
    global: Frame,
    config: ParseConfig,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_config(ParseConfig::default())
    }

    pub fn with_config(config: ParseConfig) -> Self {
        Interpreter {
            global: create_global_env(),
            config,
        }
    }

    /// The global frame, seeded with every primitive
    pub fn global_frame(&self) -> &Frame {
        &self.global
    }

    /// Run a program, writing each non-`Void` result on its own line to `out`.
    ///
    /// The source is parsed completely before evaluation starts, so a syntax error produces no
    /// output at all. Otherwise forms run in order until one fails; output written for earlier
    /// forms is kept and the error is returned.
    ///
    /// Deeply recursive programs need a thread with [`crate::EVAL_STACK_SIZE`] bytes of stack
    /// to reach the evaluation depth limit instead of overflowing.
    pub fn run<W: Write>(&self, source: &str, out: &mut W) -> Result<(), Error> {
        let forms = parse_program_with_config(source, self.config)?;
        tracing::debug!(forms = forms.len(), "parsed program");

        for (index, form) in forms.iter().enumerate() {
            tracing::debug!(form = index + 1, "evaluating {form}");
            let result = eval(form, &self.global)?;
            write_value(out, &result)?;
        }
        out.flush()?;
        Ok(())
    }

    /// Evaluate every form in `source`, returning the value of the last one (`Void` if there
    /// are none)
    pub fn eval_str(&self, source: &str) -> Result<Value, Error> {
        let forms = parse_program_with_config(source, self.config)?;
        let mut last = Value::Void;
        for form in &forms {
            last = eval(form, &self.global)?;
        }
        Ok(last)
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

/// Print a value followed by a newline; `Void` prints nothing at all
pub fn write_value<W: Write>(out: &mut W, value: &Value) -> Result<(), Error> {
    if !matches!(value, Value::Void) {
        writeln!(out, "{value}")?;
    }
    Ok(())
}
