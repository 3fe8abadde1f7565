//! Grid hygiene summary over an exported parameter-sweep CSV.
//!
//! Four Markdown tables: per-horizon summary, sharpe by band, promoted
//! pockets vs the rest, and the top pockets by sharpe. Empty numeric cells
//! are missing values and are skipped by every aggregate.

use std::collections::{BTreeMap, HashSet};
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use moonshot_core::stats::{mean, quantile};
use moonshot_core::validate::require_input;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::reporting::markdown::{fmt_opt, Align, MarkdownTable};
use crate::reporting::write_csv_rows;

/// Rows shown in the top-pockets table.
pub const TOP_POCKETS: usize = 20;

/// Pockets promoted by the most recent promotion run:
/// (symbol, horizon, side, min_mentions, pos_thresh).
pub const PROMOTED_POCKETS: [(&str, &str, &str, i64, f64); 29] = [
    ("SOFI", "5d", "LONG", 4, 0.15),
    ("SOUN", "3d", "LONG", 4, 0.15),
    ("SPY", "5d", "LONG", 2, 0.05),
    ("SPY", "3d", "LONG", 2, 0.10),
    ("TSLA", "5d", "LONG", 4, 0.10),
    ("SOUN", "5d", "LONG", 6, 0.10),
    ("GOOGL", "5d", "LONG", 6, 0.15),
    ("SOUN", "1d", "LONG", 6, 0.15),
    ("FUBO", "5d", "LONG", 6, 0.05),
    ("MARA", "3d", "LONG", 4, 0.05),
    ("GOOGL", "3d", "LONG", 6, 0.15),
    ("MSFT", "5d", "LONG", 4, 0.05),
    ("SOFI", "3d", "LONG", 6, 0.15),
    ("AAPL", "3d", "LONG", 6, 0.05),
    ("PYPL", "1d", "LONG", 2, 0.15),
    ("FUBO", "3d", "LONG", 6, 0.05),
    ("HOOD", "5d", "LONG", 2, 0.10),
    ("BBAI", "3d", "LONG", 6, 0.15),
    ("INTC", "5d", "LONG", 6, 0.05),
    ("BBAI", "5d", "LONG", 2, 0.10),
    ("AAPL", "5d", "LONG", 2, 0.05),
    ("AMD", "1d", "LONG", 2, 0.15),
    ("ASTS", "3d", "LONG", 6, 0.15),
    ("AMD", "5d", "LONG", 4, 0.15),
    ("SNAP", "3d", "LONG", 4, 0.05),
    ("HOOD", "3d", "LONG", 2, 0.10),
    ("BBAI", "1d", "LONG", 6, 0.15),
    ("ASTS", "1d", "LONG", 6, 0.10),
    ("AMD", "3d", "LONG", 6, 0.15),
];

/// File names written by [`GridSummary::write_plot_series`].
pub const PLOT_FILES: [&str; 3] = [
    "grid_sharpe_by_horizon.csv",
    "grid_sharpe_vs_adv30.csv",
    "grid_sharpe_by_band.csv",
];

/// One row of the sweep export. Unknown columns are ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GridRow {
    pub symbol: String,
    pub horizon: String,
    pub side: String,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub min_mentions: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub pos_thresh: Option<f64>,
    #[serde(default)]
    pub band: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub sharpe: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub trades: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub avg_daily_dollar_volume_30d: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub avg_sentiment_health_score: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub avg_beta_vs_spy: Option<f64>,
}

/// Identity of a pocket. The threshold is held in basis points so float
/// noise in the CSV doesn't break matching.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PocketKey {
    pub symbol: String,
    pub horizon: String,
    pub side: String,
    pub min_mentions: i64,
    pub pos_thresh_bp: i64,
}

impl PocketKey {
    pub fn new(symbol: &str, horizon: &str, side: &str, min_mentions: f64, pos_thresh: f64) -> Self {
        Self {
            symbol: symbol.to_string(),
            horizon: horizon.to_string(),
            side: side.to_string(),
            min_mentions: min_mentions.trunc() as i64,
            pos_thresh_bp: (pos_thresh * 10_000.0).round() as i64,
        }
    }

    /// `None` when the row lacks mentions or threshold.
    pub fn of(row: &GridRow) -> Option<Self> {
        Some(Self::new(
            &row.symbol,
            &row.horizon,
            &row.side,
            row.min_mentions?,
            row.pos_thresh?,
        ))
    }
}

#[derive(Debug, Deserialize)]
struct PromotedRecord {
    symbol: String,
    horizon: String,
    side: String,
    min_mentions: f64,
    pos_thresh: f64,
}

/// Set of promoted pockets.
#[derive(Debug, Clone, PartialEq)]
pub struct PromotedSet(HashSet<PocketKey>);

impl PromotedSet {
    /// The built-in promotion list.
    pub fn builtin() -> Self {
        Self(
            PROMOTED_POCKETS
                .iter()
                .map(|&(s, h, side, m, p)| PocketKey::new(s, h, side, m as f64, p))
                .collect(),
        )
    }

    /// CSV with `symbol,horizon,side,min_mentions,pos_thresh` columns.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::Reader::from_reader(reader);
        let mut keys = HashSet::new();
        for (i, record) in rdr.deserialize::<PromotedRecord>().enumerate() {
            let r = record.with_context(|| format!("promoted list row {}", i + 1))?;
            keys.insert(PocketKey::new(&r.symbol, &r.horizon, &r.side, r.min_mentions, r.pos_thresh));
        }
        Ok(Self(keys))
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        require_input(path)?;
        let file = std::fs::File::open(path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        Self::from_reader(file).with_context(|| format!("failed to read {}", path.display()))
    }

    pub fn contains(&self, row: &GridRow) -> bool {
        PocketKey::of(row).is_some_and(|k| self.0.contains(&k))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Parse grid rows from CSV text.
pub fn read_grid<R: Read>(reader: R) -> Result<Vec<GridRow>> {
    let mut rdr = csv::Reader::from_reader(reader);
    rdr.deserialize()
        .enumerate()
        .map(|(i, r)| r.with_context(|| format!("grid row {}", i + 1)))
        .collect()
}

/// Load the grid CSV; a missing file is a configuration error.
pub fn load_grid(path: &Path) -> Result<Vec<GridRow>> {
    require_input(path)?;
    let file =
        std::fs::File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let rows = read_grid(file).with_context(|| format!("failed to parse {}", path.display()))?;
    debug!(rows = rows.len(), path = %path.display(), "grid loaded");
    Ok(rows)
}

/// Aggregates for one group of rows.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupStats {
    pub label: String,
    pub rows: usize,
    /// Rows with a sharpe value.
    pub sharpe_n: usize,
    pub sharpe_avg: Option<f64>,
    pub trades_avg: Option<f64>,
    pub adv30_avg: Option<f64>,
    pub health_avg: Option<f64>,
}

impl GroupStats {
    fn collect<'a>(label: String, rows: impl IntoIterator<Item = &'a GridRow>) -> Self {
        let rows: Vec<&GridRow> = rows.into_iter().collect();
        let sharpe = present(rows.iter().map(|r| r.sharpe));
        Self {
            label,
            rows: rows.len(),
            sharpe_n: sharpe.len(),
            sharpe_avg: mean_of(&sharpe),
            trades_avg: mean_of(&present(rows.iter().map(|r| r.trades))),
            adv30_avg: mean_of(&present(rows.iter().map(|r| r.avg_daily_dollar_volume_30d))),
            health_avg: mean_of(&present(rows.iter().map(|r| r.avg_sentiment_health_score))),
        }
    }
}

/// Sharpe distribution within one band.
#[derive(Debug, Clone, PartialEq)]
pub struct BandStats {
    pub band: String,
    /// Ascending sharpe values.
    pub sharpes: Vec<f64>,
}

impl BandStats {
    pub fn count(&self) -> usize {
        self.sharpes.len()
    }

    pub fn mean(&self) -> Option<f64> {
        mean_of(&self.sharpes)
    }

    pub fn max(&self) -> Option<f64> {
        self.sharpes.last().copied()
    }
}

/// Everything the report and plot series are built from.
#[derive(Debug, Clone, PartialEq)]
pub struct GridSummary {
    pub horizons: Vec<GroupStats>,
    pub bands: Vec<BandStats>,
    /// `False` group first, then `True`; absent groups omitted.
    pub promoted: Vec<GroupStats>,
    /// (input row index, row), best sharpe first.
    pub top: Vec<(usize, GridRow)>,
    /// (horizon, ADV30, sharpe) for rows with both values.
    pub liquidity: Vec<(String, f64, f64)>,
}

/// Compute every table.
pub fn summarize_grid(rows: &[GridRow], promoted: &PromotedSet) -> GridSummary {
    let mut by_horizon: BTreeMap<&str, Vec<&GridRow>> = BTreeMap::new();
    for r in rows {
        by_horizon.entry(r.horizon.as_str()).or_default().push(r);
    }
    let horizons = sorted_labels(by_horizon.keys().copied())
        .into_iter()
        .map(|h| GroupStats::collect(h.to_string(), by_horizon[h].iter().copied()))
        .collect();

    let mut by_band: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for r in rows {
        if let Some(band) = r.band.as_deref() {
            let sharpes = by_band.entry(band).or_default();
            sharpes.extend(r.sharpe.filter(|s| s.is_finite()));
        }
    }
    let bands = sorted_labels(by_band.keys().copied())
        .into_iter()
        .map(|b| {
            let mut sharpes = by_band[b].clone();
            sharpes.sort_by(f64::total_cmp);
            BandStats {
                band: b.to_string(),
                sharpes,
            }
        })
        .collect();

    let (in_set, others): (Vec<&GridRow>, Vec<&GridRow>) =
        rows.iter().partition(|r| promoted.contains(r));
    let promoted_groups = [("False", others), ("True", in_set)]
        .into_iter()
        .filter(|(_, group)| !group.is_empty())
        .map(|(label, group)| GroupStats::collect(label.to_string(), group))
        .collect();

    let mut ranked: Vec<(usize, &GridRow)> = rows.iter().enumerate().collect();
    ranked.sort_by(|(_, a), (_, b)| match (a.sharpe, b.sharpe) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    let top = ranked
        .into_iter()
        .take(TOP_POCKETS)
        .map(|(i, r)| (i, r.clone()))
        .collect();

    let liquidity = rows
        .iter()
        .filter_map(|r| Some((r.horizon.clone(), r.avg_daily_dollar_volume_30d?, r.sharpe?)))
        .collect();

    GridSummary {
        horizons,
        bands,
        promoted: promoted_groups,
        top,
        liquidity,
    }
}

impl GridSummary {
    /// Titled tables in report order.
    pub fn tables(&self) -> Vec<(&'static str, MarkdownTable)> {
        let summary_cols = ["n", "sharpe_avg", "trades_avg", "adv30_avg_bil", "health_avg"];

        let mut horizon = MarkdownTable::new("horizon", &summary_cols);
        for g in &self.horizons {
            horizon.push_row(g.label.clone(), group_cells(g, g.sharpe_n));
        }

        let mut band = MarkdownTable::new("band", &["count", "mean", "max"]);
        for b in &self.bands {
            band.push_row(
                b.band.clone(),
                vec![b.count().to_string(), fmt_opt(b.mean(), 3), fmt_opt(b.max(), 3)],
            );
        }

        let mut promoted = MarkdownTable::new("is_promoted", &summary_cols);
        for g in &self.promoted {
            promoted.push_row(g.label.clone(), group_cells(g, g.rows));
        }

        let mut top = MarkdownTable::new(
            "",
            &[
                "symbol",
                "horizon",
                "side",
                "min_mentions",
                "pos_thresh",
                "band",
                "sharpe",
                "trades",
                "avg_daily_dollar_volume_30d",
                "avg_sentiment_health_score",
                "avg_beta_vs_spy",
            ],
        )
        .align(1, Align::Left)
        .align(2, Align::Left)
        .align(3, Align::Left)
        .align(6, Align::Left);
        for (i, r) in &self.top {
            top.push_row(
                i.to_string(),
                vec![
                    r.symbol.clone(),
                    r.horizon.clone(),
                    r.side.clone(),
                    raw(r.min_mentions),
                    raw(r.pos_thresh),
                    r.band.clone().unwrap_or_else(|| "nan".to_string()),
                    raw(r.sharpe),
                    raw(r.trades),
                    raw(r.avg_daily_dollar_volume_30d),
                    raw(r.avg_sentiment_health_score),
                    raw(r.avg_beta_vs_spy),
                ],
            );
        }

        vec![
            ("Horizon Summary", horizon),
            ("Band vs Sharpe", band),
            ("Promoted vs Others", promoted),
            ("Top Pockets by Sharpe", top),
        ]
    }

    /// Full Markdown report: one `##` section per table.
    pub fn render_report(&self) -> String {
        self.tables()
            .into_iter()
            .map(|(title, table)| format!("## {title}\n\n{}", table.render()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Write chart-ready series as CSV files into `dir`. Returns the paths.
    pub fn write_plot_series(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create plot directory {}", dir.display()))?;
        let [horizon_file, liquidity_file, band_file] = PLOT_FILES.map(|f| dir.join(f));

        #[derive(Serialize)]
        struct HorizonPoint<'a> {
            horizon: &'a str,
            sharpe_avg: Option<f64>,
        }
        let horizon_rows: Vec<HorizonPoint> = self
            .horizons
            .iter()
            .map(|g| HorizonPoint {
                horizon: &g.label,
                sharpe_avg: g.sharpe_avg,
            })
            .collect();
        write_csv_rows(&horizon_file, &["horizon", "sharpe_avg"], &horizon_rows)?;

        #[derive(Serialize)]
        struct LiquidityPoint<'a> {
            horizon: &'a str,
            avg_daily_dollar_volume_30d: f64,
            sharpe: f64,
        }
        let liquidity_rows: Vec<LiquidityPoint> = self
            .liquidity
            .iter()
            .map(|(h, adv, sharpe)| LiquidityPoint {
                horizon: h,
                avg_daily_dollar_volume_30d: *adv,
                sharpe: *sharpe,
            })
            .collect();
        write_csv_rows(
            &liquidity_file,
            &["horizon", "avg_daily_dollar_volume_30d", "sharpe"],
            &liquidity_rows,
        )?;

        #[derive(Serialize)]
        struct BandBox<'a> {
            band: &'a str,
            count: usize,
            min: Option<f64>,
            q1: Option<f64>,
            median: Option<f64>,
            q3: Option<f64>,
            max: Option<f64>,
        }
        let band_rows: Vec<BandBox> = self
            .bands
            .iter()
            .filter(|b| b.count() > 0)
            .map(|b| BandBox {
                band: &b.band,
                count: b.count(),
                min: b.sharpes.first().copied(),
                q1: quantile(&b.sharpes, 0.25),
                median: quantile(&b.sharpes, 0.5),
                q3: quantile(&b.sharpes, 0.75),
                max: b.max(),
            })
            .collect();
        write_csv_rows(
            &band_file,
            &["band", "count", "min", "q1", "median", "q3", "max"],
            &band_rows,
        )?;

        Ok(vec![horizon_file, liquidity_file, band_file])
    }
}

fn group_cells(g: &GroupStats, n: usize) -> Vec<String> {
    vec![
        n.to_string(),
        fmt_opt(g.sharpe_avg, 3),
        fmt_opt(g.trades_avg, 1),
        fmt_opt(g.adv30_avg.map(|v| v / 1e9), 2),
        fmt_opt(g.health_avg, 2),
    ]
}

fn present(values: impl Iterator<Item = Option<f64>>) -> Vec<f64> {
    values.flatten().filter(|v| v.is_finite()).collect()
}

fn mean_of(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| mean(values))
}

fn raw(value: Option<f64>) -> String {
    value.map_or_else(|| "nan".to_string(), |v| v.to_string())
}

/// Numeric order when every label parses as a number, else lexicographic.
fn sorted_labels<'a>(labels: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut labels: Vec<&str> = labels.collect();
    let numeric: Option<Vec<f64>> = labels.iter().map(|l| l.trim().parse::<f64>().ok()).collect();
    if numeric.is_some() {
        labels.sort_by(|a, b| {
            let (x, y) = (a.trim().parse::<f64>(), b.trim().parse::<f64>());
            match (x, y) {
                (Ok(x), Ok(y)) => x.total_cmp(&y),
                _ => a.cmp(b),
            }
        });
    } else {
        labels.sort();
    }
    labels
}
