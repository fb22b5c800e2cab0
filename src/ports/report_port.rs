//! Report sink port trait.

use crate::domain::batch::BatchReport;
use crate::domain::error::SkytraderError;
use crate::domain::results::ItemResult;

/// Port for presenting backtest results. The domain never formats output itself.
pub trait ReportPort {
    fn write_item(&self, result: &ItemResult) -> Result<(), SkytraderError>;

    /// Default implementation: writes every completed item in order.
    fn write_batch(&self, report: &BatchReport) -> Result<(), SkytraderError> {
        for result in report.completed() {
            self.write_item(result)?;
        }
        Ok(())
    }
}
