//! Externally produced recommended-action time series.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::{debug, warn};

/// Preferred action column.
const RECOMMENDED_COLUMN: &str = "recommended_action_value";
/// Fallback action column.
const ACTION_COLUMN: &str = "action_value";

/// One recommended action scalar per row, in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecommendationSeries {
    actions: Vec<f64>,
}

impl RecommendationSeries {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_actions(actions: Vec<f64>) -> Self {
        Self { actions }
    }

    /// Loads a series from a CSV file.
    ///
    /// A missing file yields an empty series so that recommendation-driven
    /// strategies fall back to the base price.
    ///
    /// # Errors
    ///
    /// Returns a `csv::Error` if the file exists but cannot be read as CSV.
    pub fn load(path: &Path) -> Result<Self, csv::Error> {
        if !path.is_file() {
            warn!(path = %path.display(), "recommendation series not found, using empty series");
            return Ok(Self::empty());
        }
        let series = Self::from_reader(File::open(path)?)?;
        debug!(path = %path.display(), rows = series.len(), "loaded recommendation series");
        Ok(series)
    }

    /// Parses a series from CSV text. Header names are matched
    /// case-insensitively; cells that are missing or not numbers read as 0.
    ///
    /// # Errors
    ///
    /// Returns a `csv::Error` on malformed CSV.
    pub fn from_reader(reader: impl Read) -> Result<Self, csv::Error> {
        let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
        let headers: Vec<String> = rdr
            .headers()?
            .iter()
            .map(|h| h.trim().to_lowercase())
            .collect();
        let column = |name: &str| headers.iter().position(|h| h == name);
        let recommended = column(RECOMMENDED_COLUMN);
        let fallback = column(ACTION_COLUMN);

        let mut actions = Vec::new();
        for record in rdr.records() {
            let record = record?;
            let cell = recommended
                .and_then(|i| record.get(i))
                .or_else(|| fallback.and_then(|i| record.get(i)));
            actions.push(parse_action(cell));
        }
        Ok(Self { actions })
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn action(&self, index: usize) -> Option<f64> {
        self.actions.get(index).copied()
    }

    /// Row for `step`, advancing every `steps_per_row` steps and clamped to
    /// the last row. `None` for an empty series.
    pub fn index_by_step(&self, step: usize, steps_per_row: usize) -> Option<usize> {
        let last = self.actions.len().checked_sub(1)?;
        Some((step / steps_per_row.max(1)).min(last))
    }

    /// Row for elapsed time `time_s` with one row per `period_s` seconds,
    /// clamped to the last row. `None` for an empty series.
    pub fn index_by_period(&self, time_s: f64, period_s: f64) -> Option<usize> {
        let last = self.actions.len().checked_sub(1)?;
        if period_s <= 0.0 {
            return Some(last);
        }
        let row = (time_s / period_s).floor().max(0.0) as usize;
        Some(row.min(last))
    }
}

fn parse_action(cell: Option<&str>) -> f64 {
    cell.map(str::trim)
        .filter(|c| !c.is_empty())
        .and_then(|c| c.parse::<f64>().ok())
        .unwrap_or(0.0)
}
