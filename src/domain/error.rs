//! Domain error types.

use chrono::NaiveDateTime;

/// Top-level error type for tradesim.
#[derive(Debug, thiserror::Error)]
pub enum TradesimError {
    #[error("insufficient data: need {required} values, have {available}")]
    InsufficientData { required: usize, available: usize },

    #[error("invalid configuration for {field}: {reason}")]
    InvalidConfiguration { field: String, reason: String },

    #[error("invalid bar series: {reason}")]
    InvalidBars { reason: String },

    #[error("a session for {symbol} / {strategy} is already active")]
    SessionAlreadyActive { symbol: String, strategy: String },

    #[error("out-of-order tick: received {received}, last accepted {last}")]
    OutOfOrderTick {
        last: NaiveDateTime,
        received: NaiveDateTime,
    },

    #[error("session for {symbol} / {strategy} has been stopped")]
    SessionClosed { symbol: String, strategy: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("data source error: {reason}")]
    DataSource { reason: String },

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TradesimError {
    pub(crate) fn invalid_config(field: &str, reason: impl Into<String>) -> Self {
        TradesimError::InvalidConfiguration {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&TradesimError> for std::process::ExitCode {
    fn from(err: &TradesimError) -> Self {
        let code: u8 = match err {
            TradesimError::Io(_) => 1,
            TradesimError::ConfigParse { .. }
            | TradesimError::ConfigMissing { .. }
            | TradesimError::InvalidConfiguration { .. } => 2,
            TradesimError::DataSource { .. } => 3,
            TradesimError::InsufficientData { .. } | TradesimError::InvalidBars { .. } => 4,
            TradesimError::SessionAlreadyActive { .. }
            | TradesimError::OutOfOrderTick { .. }
            | TradesimError::SessionClosed { .. } => 5,
            TradesimError::Serialization(_) => 6,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_config_message_names_field() {
        let err = TradesimError::invalid_config("stop_loss_pct", "must be in [0, 1)");
        assert_eq!(
            err.to_string(),
            "invalid configuration for stop_loss_pct: must be in [0, 1)"
        );
    }

    #[test]
    fn insufficient_data_message() {
        let err = TradesimError::InsufficientData {
            required: 20,
            available: 5,
        };
        assert_eq!(err.to_string(), "insufficient data: need 20 values, have 5");
    }
}
