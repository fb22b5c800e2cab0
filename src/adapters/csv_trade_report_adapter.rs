//! CSV trade export implementing ReportPort.
//!
//! One row per trade:
//! `item,entry_time,entry_price,exit_time,exit_price,quantity,profit,invested,status`.
//! Open trades leave the exit columns empty.

use serde::Serialize;
use std::cell::RefCell;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::domain::backtest::Trade;
use crate::domain::batch::BatchReport;
use crate::domain::error::SkytraderError;
use crate::domain::results::ItemResult;
use crate::ports::report_port::ReportPort;

const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Serialize)]
struct TradeRow<'a> {
    item: &'a str,
    entry_time: String,
    entry_price: f64,
    exit_time: Option<String>,
    exit_price: Option<f64>,
    quantity: u64,
    profit: f64,
    invested: f64,
    status: &'static str,
}

impl<'a> TradeRow<'a> {
    fn new(item: &'a str, trade: &Trade) -> Self {
        TradeRow {
            item,
            entry_time: trade.entry_time.format(TIME_FORMAT).to_string(),
            entry_price: trade.entry_price,
            exit_time: trade.exit_time.map(|t| t.format(TIME_FORMAT).to_string()),
            exit_price: trade.exit_price,
            quantity: trade.quantity,
            profit: trade.profit,
            invested: trade.invested,
            status: if trade.is_open() { "open" } else { "closed" },
        }
    }
}

fn report_error(e: impl std::fmt::Display) -> SkytraderError {
    SkytraderError::Report {
        reason: format!("failed to write trade CSV: {e}"),
    }
}

pub struct CsvTradeReportAdapter<W: Write> {
    writer: RefCell<csv::Writer<W>>,
}

impl CsvTradeReportAdapter<File> {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, SkytraderError> {
        let file = File::create(path.as_ref()).map_err(|e| SkytraderError::Report {
            reason: format!("failed to create {}: {e}", path.as_ref().display()),
        })?;
        Ok(Self::new(file))
    }
}

impl<W: Write> CsvTradeReportAdapter<W> {
    pub fn new(out: W) -> Self {
        Self {
            writer: RefCell::new(csv::Writer::from_writer(out)),
        }
    }

    pub fn into_inner(self) -> Result<W, SkytraderError> {
        self.writer.into_inner().into_inner().map_err(report_error)
    }
}

impl<W: Write> ReportPort for CsvTradeReportAdapter<W> {
    fn write_item(&self, result: &ItemResult) -> Result<(), SkytraderError> {
        let mut writer = self.writer.borrow_mut();
        for trade in &result.trades {
            writer
                .serialize(TradeRow::new(&result.item_tag, trade))
                .map_err(report_error)?;
        }
        Ok(())
    }

    fn write_batch(&self, report: &BatchReport) -> Result<(), SkytraderError> {
        for result in report.completed() {
            self.write_item(result)?;
        }
        self.writer.borrow_mut().flush().map_err(report_error)
    }
}
