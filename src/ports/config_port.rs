//! Configuration access port.
//!
//! Implementors only supply raw string lookup; the typed getters parse on
//! top of it so every backend rejects malformed values the same way.

use crate::domain::error::TradesimError;

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;

    fn get_double(&self, section: &str, key: &str, default: f64) -> Result<f64, TradesimError> {
        match self.get_string(section, key) {
            None => Ok(default),
            Some(raw) => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| invalid(section, key, &raw, "a number")),
        }
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> Result<i64, TradesimError> {
        match self.get_string(section, key) {
            None => Ok(default),
            Some(raw) => raw
                .trim()
                .parse::<i64>()
                .map_err(|_| invalid(section, key, &raw, "an integer")),
        }
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> Result<bool, TradesimError> {
        match self.get_string(section, key) {
            None => Ok(default),
            Some(raw) => match raw.trim().to_lowercase().as_str() {
                "true" | "yes" | "1" => Ok(true),
                "false" | "no" | "0" => Ok(false),
                _ => Err(invalid(section, key, &raw, "a boolean")),
            },
        }
    }
}

fn invalid(section: &str, key: &str, raw: &str, expected: &str) -> TradesimError {
    TradesimError::InvalidConfiguration {
        field: format!("{}.{}", section, key),
        reason: format!("expected {}, got {:?}", expected, raw),
    }
}
