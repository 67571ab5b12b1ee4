//! INI file configuration adapter.

use crate::domain::error::TradesimError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TradesimError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config.load(path).map_err(|reason| TradesimError::ConfigParse {
            file: path.display().to_string(),
            reason,
        })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, TradesimError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| TradesimError::ConfigParse {
                file: "<string>".to_string(),
                reason,
            })?;
        Ok(Self { config })
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config
            .get(section, key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn from_string_parses_config() {
        let content = r#"
[backtest]
symbol = AAPL
initial_capital = 25000.0

[strategy]
kind = rsi_momentum
period = 10
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(
            adapter.get_string("backtest", "symbol"),
            Some("AAPL".to_string())
        );
        assert_eq!(
            adapter.get_double("backtest", "initial_capital", 0.0).unwrap(),
            25000.0
        );
        assert_eq!(adapter.get_int("strategy", "period", 14).unwrap(), 10);
    }

    #[test]
    fn get_string_returns_none_for_missing_key() {
        let adapter =
            FileConfigAdapter::from_string("[backtest]\ninitial_capital = 100\n").unwrap();
        assert_eq!(adapter.get_string("backtest", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
    }

    #[test]
    fn empty_value_counts_as_missing() {
        let adapter = FileConfigAdapter::from_string("[backtest]\nsymbol =\n").unwrap();
        assert_eq!(adapter.get_string("backtest", "symbol"), None);
    }

    #[test]
    fn typed_getters_fall_back_to_defaults() {
        let adapter = FileConfigAdapter::from_string("[backtest]\n").unwrap();
        assert_eq!(adapter.get_int("backtest", "missing", 42).unwrap(), 42);
        assert_eq!(adapter.get_double("backtest", "missing", 99.9).unwrap(), 99.9);
        assert!(adapter.get_bool("backtest", "missing", true).unwrap());
    }

    #[test]
    fn typed_getters_reject_malformed_values() {
        let adapter = FileConfigAdapter::from_string(
            "[backtest]\nperiods = abc\ncapital = not_a_number\nflag = maybe\n",
        )
        .unwrap();
        assert!(matches!(
            adapter.get_int("backtest", "periods", 0),
            Err(TradesimError::InvalidConfiguration { .. })
        ));
        assert!(adapter.get_double("backtest", "capital", 0.0).is_err());
        assert!(adapter.get_bool("backtest", "flag", false).is_err());
    }

    #[test]
    fn get_bool_accepts_common_spellings() {
        let adapter = FileConfigAdapter::from_string(
            "[backtest]\na = true\nb = yes\nc = 1\nd = false\ne = no\nf = 0\n",
        )
        .unwrap();
        for key in ["a", "b", "c"] {
            assert!(adapter.get_bool("backtest", key, false).unwrap());
        }
        for key in ["d", "e", "f"] {
            assert!(!adapter.get_bool("backtest", key, true).unwrap());
        }
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config("[risk]\nstop_loss_pct = 0.08\n");
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(
            adapter.get_double("risk", "stop_loss_pct", 0.0).unwrap(),
            0.08
        );
    }

    #[test]
    fn from_file_returns_error_for_missing_file() {
        let result = FileConfigAdapter::from_file("/nonexistent/path/config.ini");
        assert!(matches!(result, Err(TradesimError::ConfigParse { .. })));
    }
}
