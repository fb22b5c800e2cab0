//! Plain-text report adapter implementing ReportPort.

use std::cell::RefCell;
use std::io::{self, Write};

use crate::domain::batch::{BatchReport, SkipReason};
use crate::domain::error::SkytraderError;
use crate::domain::results::{ItemResult, Roi};
use crate::ports::report_port::ReportPort;

pub fn format_roi(roi: Roi) -> String {
    match roi {
        Roi::Percent(p) => format!("{p:.2}%"),
        Roi::NoQualifyingTrades => "n/a (no qualifying trades)".to_string(),
    }
}

pub struct ConsoleReportAdapter<W: Write> {
    out: RefCell<W>,
}

impl ConsoleReportAdapter<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> ConsoleReportAdapter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: RefCell::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }

    fn emit(&self, text: &str) -> Result<(), SkytraderError> {
        self.out
            .borrow_mut()
            .write_all(text.as_bytes())
            .map_err(|e| SkytraderError::Report {
                reason: format!("failed to write report: {e}"),
            })
    }
}

fn render_item(result: &ItemResult) -> String {
    let mut text = format!("\n------- {} -------\n", result.item_tag);

    for trade in &result.trades {
        match (trade.exit_time, trade.exit_price) {
            (Some(exit_time), Some(exit_price)) => text.push_str(&format!(
                "  {} buy {} @ {:.2} -> {} sell @ {:.2}  profit {:.2}\n",
                trade.entry_time, trade.quantity, trade.entry_price, exit_time, exit_price, trade.profit
            )),
            _ => text.push_str(&format!(
                "  {} buy {} @ {:.2} -> open\n",
                trade.entry_time, trade.quantity, trade.entry_price
            )),
        }
    }

    let open = result.open_trades().count();
    text.push_str(&format!(
        "  Trades: {} closed, {} open\n  Profit: {:.2}\n  Invested: {:.2}\n  ROI: {}\n",
        result.trades.len() - open,
        open,
        result.total_profit,
        result.total_invested,
        format_roi(result.roi)
    ));
    text
}

impl<W: Write> ReportPort for ConsoleReportAdapter<W> {
    fn write_item(&self, result: &ItemResult) -> Result<(), SkytraderError> {
        self.emit(&render_item(result))
    }

    fn write_batch(&self, report: &BatchReport) -> Result<(), SkytraderError> {
        for result in report.completed() {
            self.write_item(result)?;
        }

        let mut text = String::new();
        for (item_tag, reason) in report.skipped() {
            let reason = match reason {
                SkipReason::Fetch(e) => e.clone(),
                SkipReason::InsufficientData { rows, minimum } => {
                    format!("insufficient data ({rows} rows, need {minimum})")
                }
                SkipReason::Evaluation(e) => format!("evaluation failed ({e})"),
            };
            text.push_str(&format!("\nSkipped {item_tag}: {reason}\n"));
        }

        let summary = &report.summary;
        text.push_str(&format!(
            "\n=== Portfolio ===\nItems:    {} of {}\nProfit:   {:.2}\nInvested: {:.2}\nROI:      {}\n",
            summary.items,
            report.outcomes.len(),
            summary.total_profit,
            summary.total_invested,
            format_roi(summary.roi)
        ));
        self.emit(&text)?;

        self.out.borrow_mut().flush().map_err(|e| SkytraderError::Report {
            reason: format!("failed to flush report: {e}"),
        })
    }
}
