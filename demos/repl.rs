use minischeme::Error;
use minischeme::ParseErrorKind;
use minischeme::ast::Value;
use minischeme::evaluator::Frame;
use minischeme::interpreter::Interpreter;
use minischeme::scheme::parse_program;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io;
use std::process;

fn main() {
    println!("minischeme REPL");
    println!("Enter S-expressions like: (+ 1 2)");
    println!("Type :help for more commands, or Ctrl+D to exit.");
    println!("Errors are fatal: the first one ends the session.");
    println!();

    let mut rl = DefaultEditor::new().expect("Could not initialize REPL");
    let interpreter = Interpreter::new();
    let mut pending = String::new();

    loop {
        let prompt = if pending.is_empty() {
            "minischeme> "
        } else {
            "        ...> "
        };

        match rl.readline(prompt) {
            Ok(line) => {
                if pending.is_empty() {
                    match line.trim() {
                        "" => continue,
                        ":help" => {
                            print_help();
                            continue;
                        }
                        ":env" => {
                            print_environment(interpreter.global_frame());
                            continue;
                        }
                        ":quit" | ":exit" => {
                            println!("Goodbye!");
                            break;
                        }
                        _ => {}
                    }
                }

                pending.push_str(&line);
                pending.push('\n');

                // Keep reading while the input is an unfinished expression
                if let Err(Error::ParseError(e)) = parse_program(&pending)
                    && e.kind == ParseErrorKind::Incomplete
                {
                    continue;
                }

                let _ = rl.add_history_entry(pending.trim_end());
                let source = std::mem::take(&mut pending);
                if let Err(e) = interpreter.run(&source, &mut io::stdout()) {
                    println!("Error: {e}");
                    process::exit(1);
                }
            }

            Err(ReadlineError::Eof) | Err(ReadlineError::Interrupted) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                println!("Error: {err:?}");
                process::exit(1);
            }
        }
    }
}

fn print_help() {
    println!("minischeme commands:");
    println!("  :help  - Show this help message");
    println!("  :env   - Show current global bindings");
    println!("  :quit  - Exit the interpreter");
    println!("  Ctrl+D - Exit the interpreter");
    println!();
    println!("Special forms:");
    println!("  quote if define set! lambda let let* letrec and or begin cond");
    println!();
    println!("Primitives:");
    println!("  car cdr null? cons + - * / modulo < > =");
    println!();
    println!("Examples:");
    println!("  (define square (lambda (x) (* x x)))");
    println!("  (square 12)");
    println!("  (letrec ((f (lambda (n) (if (= n 0) 1 (* n (f (- n 1))))))) (f 5))");
    println!("  (cons 1 '(2 3))");
    println!();
}

fn print_environment(frame: &Frame) {
    let bindings = frame.get_all_bindings();

    if bindings.is_empty() {
        println!("Environment is empty.");
        return;
    }

    println!("Global bindings ({} total):", bindings.len());
    println!();

    // Separate primitives from user-defined values
    let mut primitives = Vec::new();
    let mut user_defined = Vec::new();

    for (name, value) in bindings {
        match value {
            Value::Primitive(_) => primitives.push(name),
            _ => user_defined.push((name, value)),
        }
    }

    if !primitives.is_empty() {
        println!("Primitives ({}):", primitives.len());
        // Print in columns for readability
        let mut col = 0;
        for name in primitives {
            print!("  {name:<10}");
            col += 1;
            if col % 6 == 0 {
                println!();
            }
        }
        if col % 6 != 0 {
            println!();
        }
        println!();
    }

    if !user_defined.is_empty() {
        println!("User-defined values ({}):", user_defined.len());
        for (name, value) in user_defined {
            println!("  {name} = {value}");
        }
    }
}
