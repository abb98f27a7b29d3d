//! Backtest report generation.

use std::path::Path;

use crate::result::{BacktestResult, TerminationReason};

const RULE: &str = "═══════════════════════════════════════════════════════════\n";
const SECTION: &str = "───────────────────────────────────────────────────────────\n";

impl BacktestResult {
    /// Generate a text summary.
    pub fn summary(&self) -> String {
        let m = &self.metrics;
        let mut s = String::new();

        s.push_str(RULE);
        s.push_str("                     BACKTEST REPORT                        \n");
        s.push_str(RULE);
        s.push_str(&format!("  Strategy:            {}\n", self.strategy));
        s.push_str(&format!("  Symbols:             {}\n", self.symbols.join(", ")));
        if self.is_degraded() {
            s.push_str(&format!(
                "  Skipped (no data):   {}\n",
                self.skipped_symbols.join(", ")
            ));
        }
        s.push('\n');

        s.push_str("PERFORMANCE\n");
        s.push_str(SECTION);
        s.push_str(&format!("  Initial Capital:     ${:.2}\n", self.initial_capital));
        s.push_str(&format!("  Final Equity:        ${:.2}\n", self.final_equity));
        s.push_str(&format!("  Total Return:        {:.2}%\n", m.total_return * 100.0));
        s.push_str(&format!("  Annualized Return:   {:.2}%\n", m.annualized_return * 100.0));
        s.push_str(&format!("  Max Drawdown:        {:.2}%\n", m.max_drawdown * 100.0));
        s.push_str(&format!(
            "  Max DD Duration:     {} bars\n",
            m.max_drawdown_duration_bars
        ));
        s.push('\n');

        s.push_str("RISK METRICS\n");
        s.push_str(SECTION);
        s.push_str(&format!("  Volatility:          {:.2}%\n", m.volatility * 100.0));
        s.push_str(&format!("  Sharpe Ratio:        {:.2}\n", m.sharpe_ratio));
        s.push_str(&format!("  Sortino Ratio:       {:.2}\n", m.sortino_ratio));
        s.push_str(&format!("  Calmar Ratio:        {:.2}\n", m.calmar_ratio));
        s.push_str(&format!("  VaR (95%):           {:.2}%\n", m.var_95 * 100.0));
        s.push_str(&format!("  CVaR (95%):          {:.2}%\n", m.cvar_95 * 100.0));
        s.push('\n');

        s.push_str("TRADE STATISTICS\n");
        s.push_str(SECTION);
        s.push_str(&format!("  Total Trades:        {}\n", m.total_trades));
        s.push_str(&format!("  Winning Trades:      {}\n", m.winning_trades));
        s.push_str(&format!("  Losing Trades:       {}\n", m.losing_trades));
        s.push_str(&format!("  Win Rate:            {:.2}%\n", m.win_rate * 100.0));
        s.push_str(&format!("  Profit Factor:       {:.2}\n", m.profit_factor));
        s.push_str(&format!("  Avg Win:             ${:.2}\n", m.avg_win));
        s.push_str(&format!("  Avg Loss:            ${:.2}\n", m.avg_loss));
        s.push_str(&format!("  Largest Win:         ${:.2}\n", m.largest_win));
        s.push_str(&format!("  Largest Loss:        ${:.2}\n", m.largest_loss));
        s.push_str(&format!("  Total Fees:          ${:.2}\n", m.total_fees));
        s.push('\n');

        s.push_str("EXECUTION\n");
        s.push_str(SECTION);
        s.push_str(&format!("  Bars Processed:      {}\n", self.bars_processed));
        s.push_str(&format!("  Fills:               {}\n", self.fills.len()));
        s.push_str(&format!("  Rejected Signals:    {}\n", self.rejected_signals));
        let termination = match self.termination {
            TerminationReason::DataExhausted => "data exhausted".to_string(),
            TerminationReason::RiskLimitBreach { drawdown, .. } => {
                format!("drawdown limit ({:.2}% from peak)", drawdown * 100.0)
            }
        };
        s.push_str(&format!("  Termination:         {}\n", termination));
        s.push('\n');

        s.push_str(RULE);
        s
    }

    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Equity curve as `timestamp,equity` CSV.
    pub fn equity_to_csv(&self) -> Result<String, csv::Error> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for point in self.equity_curve.iter() {
            writer.serialize(point)?;
        }
        into_string(writer)
    }

    /// Closed trades as CSV, one row per trade.
    pub fn trades_to_csv(&self) -> Result<String, csv::Error> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for trade in &self.trades {
            writer.serialize(trade)?;
        }
        into_string(writer)
    }

    pub fn write_equity_csv(&self, path: impl AsRef<Path>) -> Result<(), csv::Error> {
        let mut writer = csv::Writer::from_path(path)?;
        for point in self.equity_curve.iter() {
            writer.serialize(point)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn write_trades_csv(&self, path: impl AsRef<Path>) -> Result<(), csv::Error> {
        let mut writer = csv::Writer::from_path(path)?;
        for trade in &self.trades {
            writer.serialize(trade)?;
        }
        writer.flush()?;
        Ok(())
    }
}

fn into_string(writer: csv::Writer<Vec<u8>>) -> Result<String, csv::Error> {
    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
