//! Reporting and export: text reports, CSV tables and JSON artifacts.
//!
//! - **Text**: the performance report and the optimizer ranking table
//! - **CSV**: trade log, equity curve and optimizer rankings
//! - **JSON**: full round-trip serialization with schema versioning
//!
//! Persisted results carry a `schema_version`. Newer versions are rejected on
//! load.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use pairlab_core::domain::{EquityPoint, Trade};

use crate::metrics::PerformanceMetrics;
use crate::optimizer::OptimizerReport;
use crate::runner::{BacktestResult, SCHEMA_VERSION};

const RULE_WIDTH: usize = 70;

// ─── Text reports ───────────────────────────────────────────────────

/// Human-readable performance report.
pub fn render_report(metrics: &PerformanceMetrics) -> String {
    let heavy = "=".repeat(RULE_WIDTH);
    let light = "-".repeat(RULE_WIDTH);
    let mut r = String::with_capacity(2048);

    let _ = write!(r, "\n{heavy}\nPERFORMANCE REPORT\n{heavy}");
    if metrics.total_trades == 0 {
        r.push_str("\nNo trades executed.\n");
        return r;
    }

    let m = metrics;
    let _ = write!(r, "\n{:^70}\n{light}", "TRADE STATISTICS");
    let _ = write!(r, "\nTotal Trades:           {}", m.total_trades);
    let _ = write!(
        r,
        "\nWinning Trades:         {} ({:.2}%)",
        m.winning_trades,
        m.win_rate * 100.0
    );
    let _ = write!(
        r,
        "\nLosing Trades:          {} ({:.2}%)",
        m.losing_trades,
        m.loss_rate * 100.0
    );
    let _ = write!(r, "\nLargest Win:            {}", money(m.largest_win));
    let _ = write!(r, "\nLargest Loss:           {}", money(m.largest_loss));
    let _ = write!(r, "\nAvg Win:                {}", money(m.avg_win));
    let _ = write!(r, "\nAvg Loss:               {}", money(m.avg_loss));
    let _ = write!(r, "\nProfit Factor:          {:.2}", m.profit_factor);

    let _ = write!(r, "\n\n{:^70}\n{light}", "RETURNS");
    let _ = write!(r, "\nTotal Return:           {:.2}%", m.total_return_pct);
    let _ = write!(r, "\nAnnualized Return:      {:.2}%", m.annualized_return_pct);
    let _ = write!(r, "\nDaily Avg Return:       {:.4}%", m.daily_avg_return * 100.0);

    let _ = write!(r, "\n\n{:^70}\n{light}", "RISK METRICS");
    let _ = write!(r, "\nMax Drawdown:           {:.2}%", m.max_drawdown_pct);
    let _ = write!(r, "\nDaily Volatility:       {:.4}%", m.daily_volatility * 100.0);
    let _ = write!(r, "\nAnnual Volatility:      {:.2}%", m.annual_volatility * 100.0);
    let _ = write!(r, "\nSharpe Ratio:           {:.2}", m.sharpe_ratio);
    let _ = write!(r, "\nCalmar Ratio:           {:.2}", m.calmar_ratio);

    let _ = write!(r, "\n{heavy}\n");
    r
}

/// Ranking table plus a best-pair summary.
pub fn render_optimizer_table(report: &OptimizerReport) -> String {
    let heavy = "=".repeat(RULE_WIDTH);
    let mut r = String::with_capacity(1024);
    let _ = writeln!(r, "{heavy}\nRESULTS SUMMARY\n{heavy}");

    let Some(best) = report.best() else {
        r.push_str("No results to display\n");
        return r;
    };

    let _ = writeln!(
        r,
        "{:<12} {:<12} {:>6} {:>6} {:>10} {:>8} {:>8}",
        "Pair 1", "Pair 2", "Trades", "Win%", "Return%", "Sharpe", "MaxDD%"
    );
    let _ = writeln!(r, "{}", "-".repeat(RULE_WIDTH));
    for p in &report.rankings {
        let _ = writeln!(
            r,
            "{:<12} {:<12} {:>6} {:>5.1}% {:>9.2}% {:>8.2} {:>7.2}%",
            p.pair.asset1,
            p.pair.asset2,
            p.total_trades,
            p.win_rate * 100.0,
            p.total_return_pct,
            p.sharpe_ratio,
            p.max_drawdown_pct
        );
    }

    let _ = writeln!(r, "{heavy}");
    let _ = writeln!(r, "BEST PAIR: {} vs {}", best.pair.asset1, best.pair.asset2);
    let _ = writeln!(r, "Sharpe Ratio: {:.2}", best.sharpe_ratio);
    let _ = writeln!(r, "Total Return: {:.2}%", best.total_return_pct);
    let _ = writeln!(r, "Win Rate: {:.1}%", best.win_rate * 100.0);
    let _ = writeln!(r, "Max Drawdown: {:.2}%", best.max_drawdown_pct);
    let _ = writeln!(r, "Trades: {}", best.total_trades);
    if !report.failures.is_empty() {
        let _ = writeln!(r, "Failed pairs: {}", report.failures.len());
    }
    let _ = writeln!(r, "{heavy}");
    r
}

/// `$1,234.56` style formatting; negatives as `$-1,234.56`.
fn money(value: f64) -> String {
    let cents = (value.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!("${sign}{grouped}.{:02}", cents % 100)
}

// ─── JSON export ────────────────────────────────────────────────────

pub fn export_json(result: &BacktestResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize BacktestResult to JSON")
}

/// Deserialize a `BacktestResult`, rejecting newer schema versions.
pub fn import_json(json: &str) -> Result<BacktestResult> {
    let result: BacktestResult =
        serde_json::from_str(json).context("failed to deserialize BacktestResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Trade log as CSV, one row per closed trade.
pub fn export_trades_csv(trades: &[Trade]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "trade_id",
        "pair",
        "side",
        "entry_date",
        "exit_date",
        "days_held",
        "entry_spread",
        "exit_spread",
        "entry_deviation",
        "exit_deviation",
        "hedge_ratio",
        "notional",
        "gross_pnl",
        "fees",
        "net_pnl",
        "return_pct",
    ])?;
    for t in trades {
        wtr.write_record([
            &t.id.to_string(),
            &t.pair.to_string(),
            &format!("{:?}", t.side),
            &t.entry_date.to_string(),
            &t.exit_date.to_string(),
            &t.days_held.to_string(),
            &format!("{:.6}", t.entry_spread),
            &format!("{:.6}", t.exit_spread),
            &format!("{:.4}", t.entry_deviation),
            &format!("{:.4}", t.exit_deviation),
            &format!("{:.6}", t.hedge_ratio),
            &format!("{:.2}", t.notional),
            &format!("{:.2}", t.gross_pnl),
            &format!("{:.2}", t.fees),
            &format!("{:.2}", t.net_pnl),
            &format!("{:.4}", t.return_pct),
        ])?;
    }
    finish(wtr)
}

pub fn export_equity_csv(equity_curve: &[EquityPoint]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["date", "capital"])?;
    for p in equity_curve {
        wtr.write_record([p.date.to_string(), format!("{:.2}", p.capital)])?;
    }
    finish(wtr)
}

/// Optimizer rankings in rank order.
pub fn export_optimizer_csv(report: &OptimizerReport) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "pair1",
        "pair2",
        "total_trades",
        "win_rate",
        "total_return_pct",
        "sharpe_ratio",
        "max_drawdown_pct",
        "profit_factor",
        "annualized_return_pct",
    ])?;
    for p in &report.rankings {
        wtr.write_record([
            p.pair.asset1.clone(),
            p.pair.asset2.clone(),
            p.total_trades.to_string(),
            format!("{:.4}", p.win_rate),
            format!("{:.4}", p.total_return_pct),
            format!("{:.4}", p.sharpe_ratio),
            format!("{:.4}", p.max_drawdown_pct),
            format!("{:.4}", p.profit_factor),
            format!("{:.4}", p.annualized_return_pct),
        ])?;
    }
    finish(wtr)
}

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String> {
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Write the artifact set for one run into `dir` (created if missing):
/// - `manifest.json`: the full `BacktestResult`
/// - `trades.csv`
/// - `equity.csv`
/// - `report.txt`
///
/// Returns `dir`.
pub fn save_artifacts(result: &BacktestResult, dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create artifact dir: {}", dir.display()))?;

    write_file(&dir.join("manifest.json"), &export_json(result)?)?;
    write_file(&dir.join("trades.csv"), &export_trades_csv(&result.trades)?)?;
    write_file(&dir.join("equity.csv"), &export_equity_csv(&result.equity_curve)?)?;
    write_file(&dir.join("report.txt"), &render_report(&result.metrics))?;

    Ok(dir.to_path_buf())
}

/// Load a `BacktestResult` from an artifact directory's `manifest.json`.
pub fn load_artifacts(dir: &Path) -> Result<BacktestResult> {
    let manifest_path = dir.join("manifest.json");
    let json = std::fs::read_to_string(&manifest_path)
        .with_context(|| format!("failed to read {}", manifest_path.display()))?;
    import_json(&json)
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::PairRanking;
    use chrono::NaiveDate;
    use pairlab_core::domain::{PairKey, PositionSide, TradeId};

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn sample_metrics() -> PerformanceMetrics {
        PerformanceMetrics {
            total_trades: 4,
            winning_trades: 3,
            losing_trades: 1,
            win_rate: 0.75,
            loss_rate: 0.25,
            largest_win: 1234.5,
            largest_loss: -20.0,
            avg_win: 500.0,
            avg_loss: 20.0,
            profit_factor: 75.0,
            total_return_pct: 15.0,
            sharpe_ratio: 1.5,
            ..PerformanceMetrics::default()
        }
    }

    #[test]
    fn money_groups_thousands() {
        assert_eq!(money(1234.5), "$1,234.50");
        assert_eq!(money(0.0), "$0.00");
        assert_eq!(money(-20.0), "$-20.00");
        assert_eq!(money(1_000_000.0), "$1,000,000.00");
        assert_eq!(money(999.999), "$1,000.00");
    }

    #[test]
    fn report_sections_and_labels() {
        let text = render_report(&sample_metrics());
        assert!(text.contains("PERFORMANCE REPORT"));
        assert!(text.contains("TRADE STATISTICS"));
        assert!(text.contains("RETURNS"));
        assert!(text.contains("RISK METRICS"));
        assert!(text.contains("Total Trades:           4"));
        assert!(text.contains("Winning Trades:         3 (75.00%)"));
        assert!(text.contains("Largest Win:            $1,234.50"));
        assert!(text.contains("Profit Factor:          75.00"));
        assert!(text.contains("Sharpe Ratio:           1.50"));
        assert!(text.contains(&"=".repeat(70)));
    }

    #[test]
    fn empty_report_says_so() {
        let text = render_report(&PerformanceMetrics::default());
        assert!(text.contains("No trades executed."));
        assert!(!text.contains("TRADE STATISTICS"));
    }

    #[test]
    fn trades_csv_has_one_row_per_trade() {
        let trade = Trade {
            id: TradeId(1),
            pair: PairKey::new("BTC/USDT", "ETH/USDT"),
            side: PositionSide::Short,
            entry_date: d(2),
            entry_spread: 12.5,
            entry_deviation: 2.4,
            exit_date: d(9),
            exit_spread: 11.0,
            exit_deviation: 0.2,
            notional: 200.0,
            hedge_ratio: 1.8,
            gross_pnl: 24.0,
            fees: 0.2,
            net_pnl: 23.8,
            return_pct: 11.9,
            days_held: 7,
        };
        let csv = export_trades_csv(&[trade]).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("trade_id,pair,side"));
        assert!(lines[1].starts_with("T000001,BTC/USDT/ETH/USDT,Short,2024-01-02,2024-01-09,7,"));
        assert!(lines[1].ends_with(",23.80,11.9000"));
    }

    #[test]
    fn equity_csv_is_date_and_capital() {
        let curve = vec![
            EquityPoint { date: d(1), capital: 10_000.0 },
            EquityPoint { date: d(2), capital: 10_012.345 },
        ];
        let csv = export_equity_csv(&curve).unwrap();
        assert_eq!(csv, "date,capital\n2024-01-01,10000.00\n2024-01-02,10012.35\n");
    }

    #[test]
    fn optimizer_outputs_follow_rank_order() {
        let rank = |a: &str, sharpe: f64| PairRanking {
            pair: PairKey::new(a, "B"),
            total_trades: 3,
            win_rate: 0.5,
            total_return_pct: 1.0,
            sharpe_ratio: sharpe,
            max_drawdown_pct: 2.0,
            profit_factor: 1.2,
            annualized_return_pct: 1.5,
        };
        let report = OptimizerReport {
            rankings: vec![rank("A", 2.0), rank("C", 0.5)],
            failures: Vec::new(),
        };
        let csv = export_optimizer_csv(&report).unwrap();
        let rows: Vec<&str> = csv.lines().collect();
        assert_eq!(rows.len(), 3);
        assert!(rows[1].starts_with("A,B,3,"));

        let table = render_optimizer_table(&report);
        assert!(table.contains("BEST PAIR: A vs B"));
        assert!(table.contains("Sharpe Ratio: 2.00"));

        let empty = render_optimizer_table(&OptimizerReport::default());
        assert!(empty.contains("No results to display"));
    }
}
