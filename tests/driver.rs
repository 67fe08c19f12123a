#![cfg(feature = "scheme")]
#![expect(clippy::unwrap_used)] // test code OK

use std::io::Write;
use std::process::{Command, Stdio};

use minischeme::Error;
use minischeme::interpreter::Interpreter;
use minischeme::scheme::parse_program;

/// Run a program in a fresh interpreter, returning what it printed and how it ended
fn run_program(source: &str) -> (String, Result<(), Error>) {
    let interpreter = Interpreter::new();
    let mut out = Vec::new();
    let result = interpreter.run(source, &mut out);
    (String::from_utf8(out).unwrap(), result)
}

/// Run the `minischeme` binary with `source` on stdin
fn run_binary(source: &str) -> (String, Option<i32>) {
    let mut child = Command::new(env!("CARGO_BIN_EXE_minischeme"))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(source.as_bytes())
        .unwrap();
    let output = child.wait_with_output().unwrap();
    (String::from_utf8(output.stdout).unwrap(), output.status.code())
}

#[test]
fn test_printed_forms() {
    let test_cases = vec![
        ("42", "42\n"),
        ("-3.5", "-3.5\n"),
        ("(/ 6 3)", "2\n"),
        ("(/ 1 3)", "0.3333333333333333\n"),
        ("(* 2 1.0)", "2.0\n"),
        ("(* 1.0 100000000000000000)", "100000000000000000.0\n"),
        ("(/ 1 100000)", "0.00001\n"),
        ("(* 1.0 0.00001)", "0.00001\n"),
        ("#t #f", "#t\n#f\n"),
        ("\"hi\"", "\"hi\"\n"),
        ("'sym", "sym\n"),
        ("'()", "()\n"),
        ("(cons 1 2)", "(1 . 2)\n"),
        ("(cons 1 (cons 2 '()))", "(1 2)\n"),
        ("'(1 (2 3) . 4)", "(1 (2 3) . 4)\n"),
        ("(lambda (x) x)", "#<procedure>\n"),
        ("car", "#<procedure:car>\n"),
        ("(define x 1)", ""),
        ("(cond (#f 1))", ""),
        ("(begin)", ""),
    ];

    for (source, expected) in test_cases {
        let (output, result) = run_program(source);
        assert!(result.is_ok(), "'{source}' failed: {result:?}");
        assert_eq!(output, expected, "output of '{source}'");
    }
}

#[test]
fn test_printed_doubles_read_back() {
    for source in ["(* 1.0 100000000000000000)", "(/ 1 100000)", "(/ 1 3)", "(- 0.0 2.5)"] {
        let (output, result) = run_program(source);
        assert!(result.is_ok(), "'{source}' failed: {result:?}");

        let expected = Interpreter::new().eval_str(source).unwrap();
        let reread = parse_program(output.trim_end()).unwrap();
        assert_eq!(reread, vec![expected], "'{output}' should read back");
    }
}

#[test]
fn test_program_with_state_and_comments() {
    let source = r#"
        ; accumulate with a closure over a let-bound counter
        (define make-counter
          (lambda ()
            (let ((n 0))
              (lambda () (begin (set! n (+ n 1)) n)))))
        (define tick (make-counter))
        (tick)
        (tick)
        (define fact
          (lambda (n) (if (= n 0) 1 (* n (fact (- n 1))))))
        (fact 10)  ; trailing comment
        (letrec ((even? (lambda (n) (if (= n 0) #t (odd? (- n 1)))))
                 (odd? (lambda (n) (if (= n 0) #f (even? (- n 1))))))
          (even? 100))
    "#;

    let (output, result) = run_program(source);
    assert!(result.is_ok(), "{result:?}");
    assert_eq!(output, "1\n2\n3628800\n#t\n");
}

#[test]
fn test_errors_halt_the_run() {
    let test_cases = vec![
        ("1 undefined 2", "1\n", "Unbound variable: undefined"),
        ("(set! y 1) 2", "", "Unbound variable in set!: y"),
        ("'a (1 2 3) 'b", "a\n", "Not a procedure: 1"),
        ("(define x 1) (car x) x", "", "Type error"),
        ("(let ((a 1) (a 2)) a) 3", "", "Duplicate identifier in let: a"),
        ("(letrec ((a a)) a) 3", "", "before initialization: a"),
        ("5 (quote) 6", "5\n", "Bad syntax in quote"),
        ("(/ 1 0) 1", "", "Division by zero"),
    ];

    for (source, expected_output, expected_error) in test_cases {
        let (output, result) = run_program(source);
        assert_eq!(output, expected_output, "partial output of '{source}'");
        let err = result.unwrap_err();
        assert!(
            err.to_string().contains(expected_error),
            "error for '{source}' should contain '{expected_error}', got: {err}"
        );
    }
}

#[test]
fn test_syntax_error_prevents_evaluation() {
    let (output, result) = run_program("(define x 1) x (+ x");
    assert_eq!(output, "");
    assert!(matches!(result, Err(Error::ParseError(_))));

    let (output, result) = run_program("1 2 ) 3");
    assert_eq!(output, "");
    assert!(result.unwrap_err().to_string().contains("too many close parens"));
}

#[test]
fn test_binary_success_and_failure() {
    let (stdout, status) = run_binary("(define x 2) (* x 21)\n");
    assert_eq!(stdout, "42\n");
    assert_eq!(status, Some(0));

    let (stdout, status) = run_binary("1 (car '()) 2\n");
    assert!(stdout.starts_with("1\nError: Type error: car requires a pair"), "{stdout}");
    assert_eq!(status, Some(1));
}

#[test]
fn test_binary_survives_deep_recursion() {
    let source = "(define count (lambda (n) (if (= n 0) 0 (+ 1 (count (- n 1))))))
                  (count 1000)
                  (count 1000000)
                  (count 1)";
    let (stdout, status) = run_binary(source);
    assert!(
        stdout.starts_with("1000\nError: Evaluation error: Evaluation depth limit exceeded"),
        "{stdout}"
    );
    assert_eq!(status, Some(1));
}
