//! Console output, input and the conversion functions

use std::io::{self, BufRead, Write};

use crate::core::{format_float, Value};
use crate::vm::native::{check_arity, NativeError, NativeFn};

pub const FUNCTIONS: &[(&str, NativeFn)] = &[
    ("print", print),
    ("render", render),
    ("input", input),
    ("type", type_name),
    ("string", to_string),
    ("int", to_int),
    ("float", to_float),
    ("bool", to_bool),
];

fn io_error(e: io::Error) -> NativeError {
    NativeError::Io(e.to_string())
}

fn write_values(out: &mut impl Write, args: &[Value]) -> io::Result<()> {
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            write!(out, " ")?;
        }
        write!(out, "{}", arg)?;
    }
    Ok(())
}

/// writes the arguments separated by spaces
pub fn print(args: &[Value]) -> Result<Value, NativeError> {
    let mut out = io::stdout().lock();
    write_values(&mut out, args).map_err(io_error)?;
    out.flush().map_err(io_error)?;
    Ok(Value::None)
}

/// like print, with a trailing newline
pub fn render(args: &[Value]) -> Result<Value, NativeError> {
    let mut out = io::stdout().lock();
    write_values(&mut out, args).map_err(io_error)?;
    writeln!(out).map_err(io_error)?;
    Ok(Value::None)
}

/// Reads a line from stdin after printing the optional prompt. Returns the empty
/// string at end of input.
pub fn input(args: &[Value]) -> Result<Value, NativeError> {
    check_arity(args, 0, 1, "0 or 1")?;
    if let Some(prompt) = args.first() {
        let mut out = io::stdout().lock();
        write!(out, "{}", prompt).map_err(io_error)?;
        out.flush().map_err(io_error)?;
    }
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line).map_err(io_error)?;
    Ok(Value::Str(strip_newline(&line).to_owned()))
}

fn strip_newline(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

pub fn type_name(args: &[Value]) -> Result<Value, NativeError> {
    check_arity(args, 1, 1, "1")?;
    Ok(Value::Str(args[0].dtype().to_string()))
}

/// primitives render as they print, everything else becomes ""
pub fn to_string(args: &[Value]) -> Result<Value, NativeError> {
    check_arity(args, 1, 1, "1")?;
    Ok(Value::Str(match &args[0] {
        Value::Int(i) => i.to_string(),
        Value::Float(x) => format_float(x.0),
        Value::Bool(b) => b.to_string(),
        Value::Str(s) => s.clone(),
        _ => String::new(),
    }))
}

pub fn to_int(args: &[Value]) -> Result<Value, NativeError> {
    check_arity(args, 1, 1, "1")?;
    Ok(Value::Int(match &args[0] {
        Value::Int(i) => *i,
        Value::Float(x) => x.0 as i64,
        Value::Bool(b) => *b as i64,
        Value::Str(s) => leading_int(s),
        _ => 0,
    }))
}

pub fn to_float(args: &[Value]) -> Result<Value, NativeError> {
    check_arity(args, 1, 1, "1")?;
    Ok(Value::float(match &args[0] {
        Value::Int(i) => *i as f64,
        Value::Float(x) => x.0,
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Value::Str(s) => leading_float(s),
        _ => 0.0,
    }))
}

pub fn to_bool(args: &[Value]) -> Result<Value, NativeError> {
    check_arity(args, 1, 1, "1")?;
    Ok(Value::Bool(match &args[0] {
        Value::Int(i) => *i != 0,
        Value::Float(x) => x.0 != 0.0,
        Value::Bool(b) => *b,
        Value::Str(s) => !s.is_empty(),
        _ => false,
    }))
}

/// length of the optionally signed digit run at the start of `s`
fn int_prefix_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    let sign = matches!(bytes.first(), Some(b'+' | b'-')) as usize;
    let digits = bytes[sign..].iter().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 {
        0
    } else {
        sign + digits
    }
}

/// Parses the integer at the start of `s` after leading whitespace. Trailing
/// garbage is ignored, no digits give 0 and out of range values saturate.
fn leading_int(s: &str) -> i64 {
    let s = s.trim_start();
    let prefix = &s[..int_prefix_len(s)];
    if prefix.is_empty() {
        return 0;
    }
    prefix.parse().unwrap_or(if prefix.starts_with('-') {
        i64::MIN
    } else {
        i64::MAX
    })
}

/// Parses the decimal float at the start of `s` after leading whitespace, with
/// optional fraction and exponent. No digits give 0.0.
fn leading_float(s: &str) -> f64 {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = int_prefix_len(s);
    let sign = matches!(bytes.first(), Some(b'+' | b'-')) as usize;
    let mut mantissa_digits = end.saturating_sub(sign);
    if end == 0 {
        end = sign;
    }

    if bytes.get(end) == Some(&b'.') {
        let fraction = bytes[end + 1..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count();
        if mantissa_digits + fraction > 0 {
            end += 1 + fraction;
            mantissa_digits += fraction;
        }
    }
    if mantissa_digits == 0 {
        return 0.0;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let exp_len = int_prefix_len(&s[end + 1..]);
        if exp_len > 0 {
            end += 1 + exp_len;
        }
    }
    s[..end].parse().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DataType;

    fn call(f: NativeFn, args: &[Value]) -> Value {
        f(args).unwrap()
    }

    #[test]
    fn type_names() {
        assert_eq!(call(type_name, &[Value::Int(1)]), Value::from("int"));
        assert_eq!(call(type_name, &[Value::Native(0)]), Value::from("native_function"));
        assert_eq!(call(type_name, &[Value::None]), Value::from("None"));
        assert_eq!(
            type_name(&[]),
            Err(NativeError::Arity {
                expected: "1",
                got: 0
            })
        );
    }

    #[test]
    fn string_conversion() {
        assert_eq!(call(to_string, &[Value::float(2.5)]), Value::from("2.5"));
        assert_eq!(call(to_string, &[Value::Bool(true)]), Value::from("true"));
        assert_eq!(call(to_string, &[Value::Int(-7)]), Value::from("-7"));
        assert_eq!(call(to_string, &[Value::None]), Value::from(""));
        assert_eq!(call(to_string, &[Value::Function(2)]), Value::from(""));
    }

    #[test]
    fn int_conversion() {
        assert_eq!(call(to_int, &[Value::float(3.9)]), Value::Int(3));
        assert_eq!(call(to_int, &[Value::float(-3.9)]), Value::Int(-3));
        assert_eq!(call(to_int, &[Value::Bool(true)]), Value::Int(1));
        assert_eq!(call(to_int, &[Value::from("  42abc")]), Value::Int(42));
        assert_eq!(call(to_int, &[Value::from("-12")]), Value::Int(-12));
        assert_eq!(call(to_int, &[Value::from("abc")]), Value::Int(0));
        assert_eq!(call(to_int, &[Value::from("-")]), Value::Int(0));
        assert_eq!(
            call(to_int, &[Value::from("99999999999999999999")]),
            Value::Int(i64::MAX)
        );
        assert_eq!(call(to_int, &[Value::None]), Value::Int(0));
    }

    #[test]
    fn float_conversion() {
        assert_eq!(call(to_float, &[Value::Int(2)]), Value::float(2.0));
        assert_eq!(call(to_float, &[Value::Bool(false)]), Value::float(0.0));
        assert_eq!(call(to_float, &[Value::from("3.25xyz")]), Value::float(3.25));
        assert_eq!(call(to_float, &[Value::from(" -1.5e2!")]), Value::float(-150.0));
        assert_eq!(call(to_float, &[Value::from(".5")]), Value::float(0.5));
        assert_eq!(call(to_float, &[Value::from("7.")]), Value::float(7.0));
        assert_eq!(call(to_float, &[Value::from("1e")]), Value::float(1.0));
        assert_eq!(call(to_float, &[Value::from(".")]), Value::float(0.0));
        assert_eq!(call(to_float, &[Value::from("x1")]), Value::float(0.0));
    }

    #[test]
    fn bool_conversion() {
        assert_eq!(call(to_bool, &[Value::Int(0)]), Value::Bool(false));
        assert_eq!(call(to_bool, &[Value::float(0.1)]), Value::Bool(true));
        assert_eq!(call(to_bool, &[Value::from("")]), Value::Bool(false));
        assert_eq!(call(to_bool, &[Value::from("no")]), Value::Bool(true));
        assert_eq!(call(to_bool, &[Value::Prism(0)]), Value::Bool(false));
        assert_eq!(
            to_bool(&[Value::Int(1), Value::Int(2)]),
            Err(NativeError::Arity {
                expected: "1",
                got: 2
            })
        );
        assert!(matches!(to_bool(&[]), Err(NativeError::Arity { got: 0, .. })));
    }

    #[test]
    fn printing_renders_values() {
        let mut out = vec![];
        write_values(
            &mut out,
            &[Value::Int(1), Value::float(0.5), Value::from("x"), Value::None],
        )
        .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "1 0.5 x None");
    }

    #[test]
    fn input_arity() {
        let err = input(&[Value::None, Value::None]).unwrap_err();
        assert!(matches!(err, NativeError::Arity { got: 2, .. }));
        assert_eq!(strip_newline("abc\r\n"), "abc");
        assert_eq!(strip_newline("abc"), "abc");
        assert_eq!(DataType::String.to_string(), "string");
    }
}
