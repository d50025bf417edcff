//! The built-in function surface, installed into the global environment at
//! interpreter construction: `clock()`, `sqrt(x)`, `pow(x, y)`.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::{
    callable::ArgumentValue,
    environment::EnvRef,
    error::RuntimeError,
    value::Value,
};

pub(crate) fn install(globals: &EnvRef) {
    let mut env = globals.borrow_mut();
    env.define_native("clock", || 0, clock, || "<native_fn clock>".to_owned());
    env.define_native("sqrt", || 1, sqrt, || "<native_fn sqrt>".to_owned());
    env.define_native("pow", || 2, pow, || "<native_fn pow>".to_owned());
}

/// Casts a numeric argument to double, rejecting everything else.
fn number_argument(argument: &ArgumentValue, name: &str, line: u32, column: u32) -> Result<f64, RuntimeError> {
    if argument.value.tag().is_number() {
        Ok(argument.value.widen_to_double())
    } else {
        Err(RuntimeError::new(name, line, column, "Expected a number as an argument."))
    }
}

fn clock(_line: u32, _column: u32, _arguments: &[ArgumentValue]) -> Result<Value, RuntimeError> {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64;
    Ok(Value::Long(millis))
}

fn sqrt(line: u32, column: u32, arguments: &[ArgumentValue]) -> Result<Value, RuntimeError> {
    let input = number_argument(&arguments[0], "sqrt", line, column)?;
    Ok(Value::Double(input.sqrt()))
}

fn pow(line: u32, column: u32, arguments: &[ArgumentValue]) -> Result<Value, RuntimeError> {
    let number = number_argument(&arguments[0], "pow", line, column)?;
    let power = number_argument(&arguments[1], "pow", line, column)?;
    Ok(Value::Double(number.powf(power)))
}
