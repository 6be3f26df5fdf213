use std::fmt::Write;

use graphql_parser::query::Value;

/// Compares two literals the way argument defaults are compared: numbers by
/// value (`1` equals `1.0`), everything else structurally.
pub fn values_equivalent(a: &Value<'static, String>, b: &Value<'static, String>) -> bool {
    match (a, b) {
        (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
            a.as_i64().is_some_and(|a| (a as f64) == *b)
        }
        (Value::List(a), Value::List(b)) => {
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(a, b)| values_equivalent(a, b))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(key, a)| b.get(key).is_some_and(|b| values_equivalent(a, b)))
        }
        (a, b) => a == b,
    }
}

/// GraphQL literal notation of a value.
pub fn render_value(value: &Value<'static, String>) -> String {
    let mut out = String::new();
    write_value(&mut out, value).ok();
    out
}

fn write_value(out: &mut String, value: &Value<'static, String>) -> std::fmt::Result {
    match value {
        Value::Variable(name) => write!(out, "${}", name),
        Value::Int(number) => match number.as_i64() {
            Some(number) => write!(out, "{}", number),
            None => write!(out, "{:?}", number),
        },
        Value::Float(number) => write!(out, "{:?}", number),
        Value::String(string) => write!(out, "{:?}", string),
        Value::Boolean(boolean) => write!(out, "{}", boolean),
        Value::Null => write!(out, "null"),
        Value::Enum(name) => write!(out, "{}", name),
        Value::List(values) => {
            out.push('[');
            for (index, value) in values.iter().enumerate() {
                if index > 0 {
                    out.push_str(", ");
                }
                write_value(out, value)?;
            }
            out.push(']');
            Ok(())
        }
        Value::Object(fields) => {
            out.push('{');
            for (index, (key, value)) in fields.iter().enumerate() {
                if index > 0 {
                    out.push_str(", ");
                }
                out.push_str(key);
                out.push_str(": ");
                write_value(out, value)?;
            }
            out.push('}');
            Ok(())
        }
    }
}
