//! Forgiving deserializers for stored template data.
//!
//! Templates written by older editor versions contain `null`s, numbers
//! stored as strings, and the occasional value of the wrong type. Layout must
//! still work, so these helpers degrade to a sentinel or the field default
//! instead of rejecting the whole template.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Read a number. `null`, unparseable strings and other types become NaN,
/// which `LetterLayoutSettings::sanitize` replaces with the DIN default.
pub(crate) fn mm<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(number(&value).unwrap_or(f64::NAN))
}

/// Like [`mm`], but absence is a meaningful state.
pub(crate) fn opt_mm<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(number(&value).filter(|v| v.is_finite()))
}

pub(crate) fn opt_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Bool(b) => Some(b),
        Value::String(s) => match s.trim() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        },
        Value::Number(n) => n.as_f64().map(|v| v != 0.0),
        _ => None,
    })
}

/// Deserialize `T`, falling back to `T::default()` when the stored shape is wrong.
pub(crate) fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Strings that may be stored as `null` or as numbers (postal codes, phone numbers).
pub(crate) fn opt_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

/// A string that may be stored as `null` or as a number; absence is `""`.
pub(crate) fn string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(opt_string(deserializer)?.unwrap_or_default())
}

pub(crate) fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches("mm").trim().parse::<f64>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Probe {
        #[serde(default, deserialize_with = "mm")]
        top: f64,
        #[serde(default, deserialize_with = "opt_mm")]
        height: Option<f64>,
        #[serde(default, deserialize_with = "opt_bool")]
        enabled: Option<bool>,
        #[serde(default, deserialize_with = "opt_string")]
        zip: Option<String>,
    }

    #[test]
    fn null_number_becomes_nan() {
        let p: Probe = serde_json::from_str(r#"{"top": null, "height": null}"#).unwrap();
        assert!(p.top.is_nan());
        assert_eq!(p.height, None);
    }

    #[test]
    fn numeric_strings_are_accepted() {
        let p: Probe = serde_json::from_str(r#"{"top": "98.46", "height": "12mm"}"#).unwrap();
        assert_eq!(p.top, 98.46);
        assert_eq!(p.height, Some(12.0));
    }

    #[test]
    fn loose_booleans_and_numeric_zip_codes() {
        let p: Probe = serde_json::from_str(r#"{"enabled": "false", "zip": 10115}"#).unwrap();
        assert_eq!(p.enabled, Some(false));
        assert_eq!(p.zip.as_deref(), Some("10115"));
    }
}
