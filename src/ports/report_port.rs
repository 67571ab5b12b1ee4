//! Result sink port.

use std::path::Path;

use crate::domain::backtest::{BacktestResult, Comparison};
use crate::domain::error::TradesimError;

pub trait ReportPort {
    fn write(&self, result: &BacktestResult, output_path: &Path) -> Result<(), TradesimError>;

    fn write_comparison(
        &self,
        comparison: &Comparison,
        output_path: &Path,
    ) -> Result<(), TradesimError>;
}
