//! `minischeme [FILE]`: run a Scheme program from FILE, or from stdin when FILE is absent
//! or `-`. Results are printed one per line; the first error is printed as `Error: ...`
//! and ends the run with exit status 1.
//!
//! Set `RUST_LOG=minischeme=debug` (or `trace`) to see evaluation traces on stderr.

use std::env;
use std::fs;
use std::io::{self, Read, Write};
use std::process::ExitCode;

use minischeme::{EVAL_STACK_SIZE, Error};
use minischeme::interpreter::Interpreter;

fn read_source(path: Option<&str>) -> Result<String, Error> {
    match path {
        None | Some("-") => {
            let mut source = String::new();
            io::stdin().read_to_string(&mut source)?;
            Ok(source)
        }
        Some(path) => Ok(fs::read_to_string(path)?),
    }
}

fn run(path: Option<String>) -> Result<(), Error> {
    let source = read_source(path.as_deref())?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    Interpreter::new().run(&source, &mut out)
}

fn main() -> ExitCode {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .try_init();

    let mut args = env::args().skip(1);
    let path = args.next();
    if args.next().is_some() {
        eprintln!("Usage: minischeme [FILE]");
        return ExitCode::from(2);
    }

    let worker = std::thread::Builder::new()
        .name("interpreter".to_owned())
        .stack_size(EVAL_STACK_SIZE)
        .spawn(move || run(path));

    let outcome = match worker {
        Ok(handle) => handle
            .join()
            .unwrap_or_else(|_| Err(Error::EvalError("interpreter thread panicked".to_owned()))),
        Err(err) => Err(Error::from(err)),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let mut stdout = io::stdout();
            let _ = writeln!(stdout, "Error: {err}");
            let _ = stdout.flush();
            ExitCode::FAILURE
        }
    }
}
