//! Market data port: supplies ordered bar series.

use chrono::NaiveDateTime;

use crate::domain::bar::Bar;
use crate::domain::error::TradesimError;

pub trait DataPort {
    /// All bars for `symbol`, ascending by timestamp.
    fn fetch_bars(&self, symbol: &str) -> Result<Vec<Bar>, TradesimError>;

    fn list_symbols(&self) -> Result<Vec<String>, TradesimError>;

    /// First timestamp, last timestamp and bar count, or `None` when the
    /// symbol has no bars.
    fn data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDateTime, NaiveDateTime, usize)>, TradesimError> {
        let bars = self.fetch_bars(symbol)?;
        Ok(match (bars.first(), bars.last()) {
            (Some(first), Some(last)) => Some((first.timestamp, last.timestamp, bars.len())),
            _ => None,
        })
    }
}
