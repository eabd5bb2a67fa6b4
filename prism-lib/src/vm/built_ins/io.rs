//! File natives. Write, append and delete report failure as `false`, reading a
//! missing file is an error.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use crate::core::Value;
use crate::vm::native::{check_arity, string_arg, NativeError, NativeFn};

pub const FUNCTIONS: &[(&str, NativeFn)] = &[
    ("read_file", read_file),
    ("write_file", write_file),
    ("append_file", append_file),
    ("file_exists", file_exists),
    ("delete_file", delete_file),
];

pub fn read_file(args: &[Value]) -> Result<Value, NativeError> {
    check_arity(args, 1, 1, "1")?;
    let path = string_arg(args, 0)?;
    fs::read_to_string(path)
        .map(Value::Str)
        .map_err(|e| NativeError::Io(format!("Could not open file '{}' for reading: {}", path, e)))
}

pub fn write_file(args: &[Value]) -> Result<Value, NativeError> {
    check_arity(args, 2, 2, "2")?;
    let path = string_arg(args, 0)?;
    let content = string_arg(args, 1)?;
    let res = fs::write(path, content);
    if let Err(e) = &res {
        log::warn!("write_file '{}': {}", path, e);
    }
    Ok(Value::Bool(res.is_ok()))
}

pub fn append_file(args: &[Value]) -> Result<Value, NativeError> {
    check_arity(args, 2, 2, "2")?;
    let path = string_arg(args, 0)?;
    let content = string_arg(args, 1)?;
    let res = OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .and_then(|mut f| f.write_all(content.as_bytes()));
    if let Err(e) = &res {
        log::warn!("append_file '{}': {}", path, e);
    }
    Ok(Value::Bool(res.is_ok()))
}

pub fn file_exists(args: &[Value]) -> Result<Value, NativeError> {
    check_arity(args, 1, 1, "1")?;
    Ok(Value::Bool(Path::new(string_arg(args, 0)?).exists()))
}

pub fn delete_file(args: &[Value]) -> Result<Value, NativeError> {
    check_arity(args, 1, 1, "1")?;
    Ok(Value::Bool(fs::remove_file(string_arg(args, 0)?).is_ok()))
}
