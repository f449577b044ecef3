use crate::error::{ConfigError, Result};
use serde::de::DeserializeOwned;

/// Parse a configuration document. JSON is tried first, TOML second; TOML is
/// converted through `serde_json::Value` so both formats share one schema.
pub(crate) fn parse_document(origin: &str, bytes: &[u8]) -> Result<serde_json::Value> {
    match serde_json::from_slice(bytes) {
        Ok(value) => Ok(value),
        Err(json_err) => {
            let utf8 = std::str::from_utf8(bytes).map_err(|err| ConfigError::Parse {
                origin: origin.to_string(),
                message: format!("{json_err}; {err}"),
            })?;
            let toml_value: toml::Value =
                toml::from_str(utf8).map_err(|toml_err| ConfigError::Parse {
                    origin: origin.to_string(),
                    message: format!("JSON error: {json_err}; TOML error: {toml_err}"),
                })?;
            serde_json::to_value(toml_value).map_err(|err| ConfigError::Parse {
                origin: origin.to_string(),
                message: format!("failed to convert TOML to JSON: {err}"),
            })
        }
    }
}

pub(crate) fn from_value<T: DeserializeOwned>(origin: &str, value: serde_json::Value) -> Result<T> {
    serde_json::from_value(value).map_err(|err| ConfigError::Parse {
        origin: origin.to_string(),
        message: err.to_string(),
    })
}
