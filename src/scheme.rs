//! Tokenizer and parser: source text to S-expression trees.
//!
//! Lexical rules:
//!
//! - whitespace separates tokens, `;` starts a comment that runs to the end of the line
//! - `(` and `)` delimit lists, `()` reads as the empty list and `(a . b)` as a dotted pair
//! - `'datum` is shorthand for `(quote datum)`
//! - `#t` and `#f` are booleans
//! - an optional sign followed by digits is an integer (`+5`, `-12`)
//! - an optional sign, digits and exactly one `.` is a double (`1.5`, `-0.25`, `3.`)
//! - a lone `+` or `-`, or a letter or one of `! $ % & * / : < = > ? ~ _ ^` followed by
//!   those, digits, `.`, `+` and `-`, is a symbol
//! - `"..."` is a string with the escapes `\n \t \r \\ \"`
//!
//! Any other token is a syntax error. A program is parsed completely before anything is
//! evaluated, so a syntax error anywhere means no form runs.

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{take_while, take_while1},
    character::complete::{char, digit0, digit1, multispace0, multispace1, one_of, satisfy},
    combinator::{all_consuming, cut, opt, recognize, value},
    error::ErrorKind,
    multi::many0,
};

use crate::ast::Value;
use crate::{Error, MAX_PARSE_DEPTH, ParseError, ParseErrorKind};

/// Parser options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseConfig {
    /// Treat `;` as the start of a line comment. When off, `;` is an ordinary (invalid)
    /// token character.
    pub handle_comments: bool,
}

impl Default for ParseConfig {
    fn default() -> Self {
        ParseConfig {
            handle_comments: true,
        }
    }
}

type ParseResult<'a, T> = IResult<&'a str, T>;

fn failure(input: &str, kind: ErrorKind) -> nom::Err<nom::error::Error<&str>> {
    nom::Err::Failure(nom::error::Error::new(input, kind))
}

/// Characters that end an atom
fn is_delimiter(c: char, config: ParseConfig) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n' | '(' | ')' | '"' | '\'')
        || (config.handle_comments && c == ';')
}

/// Convert nom parsing errors to structured parse errors
fn convert_error(input: &str, error: nom::Err<nom::error::Error<&str>>) -> Error {
    let e = match error {
        nom::Err::Error(e) | nom::Err::Failure(e) => e,
        nom::Err::Incomplete(_) => {
            return Error::ParseError(ParseError::from_message(
                ParseErrorKind::Incomplete,
                "Incomplete input",
            ));
        }
    };

    let offset = input.len().saturating_sub(e.input.len());
    let found = e
        .input
        .split(|c: char| c.is_whitespace() || c == '(' || c == ')')
        .next()
        .filter(|token| !token.is_empty())
        .map(str::to_owned)
        .or_else(|| e.input.chars().next().map(String::from));

    let (kind, message) = match e.code {
        ErrorKind::TooLarge => (
            ParseErrorKind::TooDeeplyNested,
            format!("Expression too deeply nested (max depth: {MAX_PARSE_DEPTH})"),
        ),
        _ if e.input.is_empty() => (
            ParseErrorKind::Incomplete,
            "Unexpected end of input: too few close parens or unterminated string".to_owned(),
        ),
        ErrorKind::Char if e.input.starts_with(')') => (
            ParseErrorKind::InvalidSyntax,
            "Unexpected ')': too many close parens".to_owned(),
        ),
        ErrorKind::Digit => (
            ParseErrorKind::ImplementationLimit,
            "Integer literal out of range".to_owned(),
        ),
        ErrorKind::Escaped => (
            ParseErrorKind::InvalidSyntax,
            "Unknown escape sequence in string".to_owned(),
        ),
        ErrorKind::Verify => (ParseErrorKind::InvalidSyntax, "cannot tokenize".to_owned()),
        _ => {
            let near: String = e.input.chars().take(10).collect();
            (
                ParseErrorKind::InvalidSyntax,
                format!("Invalid syntax near '{near}'"),
            )
        }
    };

    Error::ParseError(ParseError::with_context_and_found(
        kind, message, input, offset, found,
    ))
}

/// Skip whitespace and, when enabled, comments
fn skip_atmosphere(input: &str, config: ParseConfig) -> ParseResult<'_, ()> {
    if config.handle_comments {
        value((), many0(alt((multispace1, comment)))).parse(input)
    } else {
        value((), multispace0).parse(input)
    }
}

fn comment(input: &str) -> ParseResult<'_, &str> {
    recognize((char(';'), take_while(|c: char| c != '\n'))).parse(input)
}

fn integer_literal(input: &str) -> ParseResult<'_, &str> {
    recognize((opt(one_of("+-")), digit1)).parse(input)
}

/// Exactly one dot, led by a digit or a sign. A bare signed dot (`-.`) reads as zero.
fn double_literal(input: &str) -> ParseResult<'_, &str> {
    alt((
        recognize((opt(one_of("+-")), digit1, char('.'), digit0)),
        recognize((one_of("+-"), char('.'), digit0)),
    ))
    .parse(input)
}

fn is_initial(c: char) -> bool {
    c.is_ascii_alphabetic() || "!$%&*/:<=>?~_^".contains(c)
}

fn is_subsequent(c: char) -> bool {
    is_initial(c) || c.is_ascii_digit() || matches!(c, '.' | '+' | '-')
}

fn symbol_literal(input: &str) -> ParseResult<'_, &str> {
    alt((
        recognize(one_of("+-")),
        recognize((satisfy(is_initial), take_while(is_subsequent))),
    ))
    .parse(input)
}

fn matches_fully<'a, P>(parser: P, token: &'a str) -> bool
where
    P: Parser<&'a str, Error = nom::error::Error<&'a str>>,
{
    all_consuming(parser).parse(token).is_ok()
}

/// Classify a complete atom token into a value
fn classify_atom(token: &str) -> Result<Value, ErrorKind> {
    match token {
        "#t" => return Ok(Value::Bool(true)),
        "#f" => return Ok(Value::Bool(false)),
        _ => {}
    }

    if matches_fully(integer_literal, token) {
        token
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| ErrorKind::Digit)
    } else if matches!(token, "+." | "-.") {
        Ok(Value::Double(0.0))
    } else if matches_fully(double_literal, token) {
        token
            .parse::<f64>()
            .map(Value::Double)
            .map_err(|_| ErrorKind::Float)
    } else if matches_fully(symbol_literal, token) {
        Ok(Value::Symbol(token.to_owned()))
    } else {
        Err(ErrorKind::Verify)
    }
}

fn parse_atom(input: &str, config: ParseConfig) -> ParseResult<'_, Value> {
    let (remaining, token) = take_while1(|c: char| !is_delimiter(c, config)).parse(input)?;
    match classify_atom(token) {
        Ok(atom) => Ok((remaining, atom)),
        Err(kind) => Err(failure(input, kind)),
    }
}

/// Parse a string literal
fn parse_string(input: &str) -> ParseResult<'_, Value> {
    let (mut remaining, _) = char('"').parse(input)?;
    let mut text = String::new();

    loop {
        let mut char_iter = remaining.chars();
        match char_iter.next() {
            Some('"') => return Ok((char_iter.as_str(), Value::Str(text))),
            Some('\\') => {
                match char_iter.next() {
                    Some('n') => text.push('\n'),
                    Some('t') => text.push('\t'),
                    Some('r') => text.push('\r'),
                    Some('\\') => text.push('\\'),
                    Some('"') => text.push('"'),
                    Some(_) => return Err(failure(remaining, ErrorKind::Escaped)),
                    // Backslash at end of input
                    None => return Err(failure(char_iter.as_str(), ErrorKind::Eof)),
                }
                remaining = char_iter.as_str();
            }
            Some(ch) => {
                text.push(ch);
                remaining = char_iter.as_str();
            }
            None => return Err(failure(remaining, ErrorKind::Eof)),
        }
    }
}

/// Parse quoted expression ('expr -> (quote expr))
fn parse_quote(input: &str, config: ParseConfig, depth: usize) -> ParseResult<'_, Value> {
    let (input, _) = char('\'').parse(input)?;
    let (input, datum) = parse_datum(input, config, depth + 1)?;
    Ok((
        input,
        Value::list([Value::Symbol("quote".to_owned()), datum]),
    ))
}

/// A lone `.` inside a list introduces the tail of a dotted pair
fn dot_marker(input: &str, config: ParseConfig) -> Option<&str> {
    let rest = input.strip_prefix('.')?;
    match rest.chars().next() {
        None => Some(rest),
        Some(c) if is_delimiter(c, config) => Some(rest),
        Some(_) => None,
    }
}

fn parse_list(input: &str, config: ParseConfig, depth: usize) -> ParseResult<'_, Value> {
    let (mut input, _) = char('(').parse(input)?;
    let mut elements = Vec::new();

    loop {
        let (rest, _) = skip_atmosphere(input, config)?;

        if let Some(rest) = rest.strip_prefix(')') {
            return Ok((rest, Value::list(elements)));
        }

        if !elements.is_empty()
            && let Some(rest) = dot_marker(rest, config)
        {
            let (rest, tail) = parse_datum(rest, config, depth + 1)?;
            let (rest, _) = skip_atmosphere(rest, config)?;
            let (rest, _) = cut(char(')')).parse(rest)?;
            return Ok((rest, Value::list_with_tail(elements, tail)));
        }

        let (rest, element) = parse_datum(rest, config, depth + 1)?;
        elements.push(element);
        input = rest;
    }
}

/// Parse one datum, skipping any leading whitespace and comments
fn parse_datum(input: &str, config: ParseConfig, depth: usize) -> ParseResult<'_, Value> {
    if depth >= MAX_PARSE_DEPTH {
        return Err(failure(input, ErrorKind::TooLarge));
    }
    let (input, _) = skip_atmosphere(input, config)?;

    match input.chars().next() {
        None => Err(failure(input, ErrorKind::Eof)),
        Some('(') => parse_list(input, config, depth),
        Some(')') => Err(failure(input, ErrorKind::Char)),
        Some('\'') => parse_quote(input, config, depth),
        Some('"') => parse_string(input),
        Some(_) => parse_atom(input, config),
    }
}

/// Parse every top-level form in a program
pub fn parse_program(input: &str) -> Result<Vec<Value>, Error> {
    parse_program_with_config(input, ParseConfig::default())
}

pub fn parse_program_with_config(input: &str, config: ParseConfig) -> Result<Vec<Value>, Error> {
    let mut forms = Vec::new();
    let mut remaining = input;

    loop {
        let (rest, _) =
            skip_atmosphere(remaining, config).map_err(|e| convert_error(input, e))?;
        if rest.is_empty() {
            return Ok(forms);
        }
        let (rest, form) = parse_datum(rest, config, 0).map_err(|e| convert_error(input, e))?;
        forms.push(form);
        remaining = rest;
    }
}

/// Parse exactly one complete S-expression
pub fn parse_scheme(input: &str) -> Result<Value, Error> {
    parse_scheme_with_config(input, ParseConfig::default())
}

pub fn parse_scheme_with_config(input: &str, config: ParseConfig) -> Result<Value, Error> {
    let (rest, form) = parse_datum(input, config, 0).map_err(|e| convert_error(input, e))?;
    let (rest, _) = skip_atmosphere(rest, config).map_err(|e| convert_error(input, e))?;

    if rest.is_empty() {
        Ok(form)
    } else {
        Err(Error::ParseError(ParseError::with_context_and_found(
            ParseErrorKind::TrailingContent,
            format!("Unexpected remaining input: '{rest}'"),
            input,
            input.len() - rest.len(),
            None,
        )))
    }
}
