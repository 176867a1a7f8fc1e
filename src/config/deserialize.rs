// ABOUTME: Custom serde deserializers for config types.
// ABOUTME: Handles nullable fields and scalar environment values.

use serde::Deserialize;
use serde_yaml::Value;
use std::collections::BTreeMap;

/// Treat an empty key (`pre_install_commands:`) like a missing one.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    let opt: Option<T> = Option::deserialize(deserializer)?;
    Ok(opt.unwrap_or_default())
}

/// Environment values may be any YAML scalar; they are exported as text.
pub fn deserialize_environment<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<String, String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<BTreeMap<String, Value>> = Option::deserialize(deserializer)?;
    opt.unwrap_or_default()
        .into_iter()
        .map(|(key, value)| {
            scalar_to_string(value)
                .map(|value| (key.clone(), value))
                .ok_or_else(|| {
                    serde::de::Error::custom(format!(
                        "environment variable {key} must be a string, number, or boolean"
                    ))
                })
        })
        .collect()
}

fn scalar_to_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some(String::new()),
        Value::Sequence(_) | Value::Mapping(_) | Value::Tagged(_) => None,
    }
}
