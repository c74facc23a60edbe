//! Attribute value grammars.
//!
//! Every reflected field declares a [`FieldKind`], and the kind picks how an
//! attribute string is read:
//!
//! | Kind        | Accepts                         | Example          |
//! |-------------|---------------------------------|------------------|
//! | `Scalar`    | one number                      | `"2.5"`          |
//! | `Vector(n)` | `n` numbers, or one to broadcast| `"1 0 -3"`, `"2"`|
//! | `Quat`      | four numbers `x y z w`          | `"0 0 0 1"`      |
//! | `Flag`      | `true`/`false`/`on`/`off`/number| `"true"`         |
//!
//! Numbers may be separated by whitespace or commas. A whole component can
//! also be written as semicolon-separated `field: value` pairs, which
//! [`split_fields`] breaks apart before each value goes through the
//! per-kind grammar.

use crate::ecs::FieldKind;

/// Parse a single number.
pub fn parse_number(text: &str) -> Result<f32, String> {
    let text = text.trim();
    text.parse::<f32>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| format!("`{text}` is not a number"))
}

/// Parse a value for a field of the given kind into `kind.arity()` scalars.
pub fn parse_value(kind: FieldKind, text: &str) -> Result<Vec<f32>, String> {
    match kind {
        FieldKind::Flag => parse_flag(text).map(|b| vec![if b { 1.0 } else { 0.0 }]),
        FieldKind::Scalar => {
            let values = parse_numbers(text)?;
            match values.as_slice() {
                [v] => Ok(vec![*v]),
                _ => Err(format!("expected one number, got {}", values.len())),
            }
        }
        FieldKind::Vector(n) => {
            let values = parse_numbers(text)?;
            match values.len() {
                1 => Ok(vec![values[0]; n]),
                len if len == n => Ok(values),
                len => Err(format!("expected {n} numbers (or one to broadcast), got {len}")),
            }
        }
        FieldKind::Quat => {
            let values = parse_numbers(text)?;
            if values.len() != 4 {
                return Err(format!(
                    "expected a quaternion `x y z w`, got {} numbers",
                    values.len()
                ));
            }
            let len = values.iter().map(|v| v * v).sum::<f32>().sqrt();
            if len < f32::EPSILON {
                return Err("quaternion has zero length".to_string());
            }
            Ok(values.into_iter().map(|v| v / len).collect())
        }
    }
}

/// Parse a whitespace- or comma-separated list of numbers.
pub fn parse_numbers(text: &str) -> Result<Vec<f32>, String> {
    let values = text
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .map(parse_number)
        .collect::<Result<Vec<_>, _>>()?;
    if values.is_empty() {
        return Err("expected a number".to_string());
    }
    Ok(values)
}

pub fn parse_flag(text: &str) -> Result<bool, String> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" => Ok(true),
        "false" | "no" | "off" => Ok(false),
        other => parse_number(other)
            .map(|v| v != 0.0)
            .map_err(|_| format!("`{other}` is not a flag (true/false)")),
    }
}

/// Split `"a: 1; b: 2 3"` into `[("a", "1"), ("b", "2 3")]`.
///
/// Empty segments (such as a trailing `;`) are skipped. A segment without a
/// `:` is an error.
pub fn split_fields(text: &str) -> Result<Vec<(&str, &str)>, String> {
    text.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|segment| {
            let (name, value) = segment
                .split_once(':')
                .ok_or_else(|| format!("`{segment}` is not a `field: value` pair"))?;
            let name = name.trim();
            if name.is_empty() {
                return Err(format!("`{segment}` has an empty field name"));
            }
            Ok((name, value.trim()))
        })
        .collect()
}

/// `true` if the text uses the `field: value; ...` form.
pub fn is_field_list(text: &str) -> bool {
    text.contains(':')
}
