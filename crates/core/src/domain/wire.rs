//! Lenient field decoders for the booking API's loosely typed JSON.
//!
//! Ids show up as numbers or strings, counts occasionally as strings. A field that
//! cannot be interpreted decodes to its empty value instead of failing the record.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

pub fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(deserializer)?;
    Ok(value_to_text(&v)
        .map(|s| s.trim().to_string())
        .unwrap_or_default())
}

pub fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(deserializer)?;
    Ok(value_to_text(&v))
}

pub fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(deserializer)?;
    Ok(value_to_i64(&v))
}

fn value_to_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn value_to_i64(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_from_scalars_only() {
        assert_eq!(value_to_text(&json!(" a ")), Some(" a ".to_string()));
        assert_eq!(value_to_text(&json!(42)), Some("42".to_string()));
        assert_eq!(value_to_text(&json!(null)), None);
        assert_eq!(value_to_text(&json!([1])), None);
    }

    #[test]
    fn integers_from_numbers_and_strings() {
        assert_eq!(value_to_i64(&json!(3)), Some(3));
        assert_eq!(value_to_i64(&json!(-1.5)), Some(-1));
        assert_eq!(value_to_i64(&json!("12")), Some(12));
        assert_eq!(value_to_i64(&json!("x")), None);
        assert_eq!(value_to_i64(&json!(true)), None);
    }
}
