//! Ranking of series by their recent derivatives.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrendError};
use crate::table::TrendTable;

/// How the tail window of derivative values is reduced to one score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    #[default]
    Max,
    #[serde(alias = "mean")]
    Avg,
}

impl Aggregation {
    /// Reduces `values`, skipping `NaN`. Returns `NaN` when nothing is left.
    pub fn apply(self, values: &[f64]) -> f64 {
        let mut finite = values.iter().copied().filter(|v| !v.is_nan()).peekable();
        if finite.peek().is_none() {
            return f64::NAN;
        }
        match self {
            Aggregation::Max => finite.fold(f64::NEG_INFINITY, f64::max),
            Aggregation::Avg => {
                let (sum, count) = finite.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
                sum / count as f64
            }
        }
    }
}

impl FromStr for Aggregation {
    type Err = TrendError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "max" => Ok(Aggregation::Max),
            "avg" | "mean" => Ok(Aggregation::Avg),
            other => Err(TrendError::UnknownAggregation(other.to_string())),
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Aggregation::Max => write!(f, "max"),
            Aggregation::Avg => write!(f, "avg"),
        }
    }
}

/// Parameters of [`rank`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendingConfig {
    /// Only rows computed for this derivative order are considered
    pub derivative_order: usize,
    pub aggregation: Aggregation,
    /// Number of most recent rows taken from each table
    pub k: usize,
}

impl Default for TrendingConfig {
    fn default() -> Self {
        Self {
            derivative_order: 1,
            aggregation: Aggregation::Max,
            k: 5,
        }
    }
}

impl TrendingConfig {
    pub fn with_derivative_order(mut self, derivative_order: usize) -> Self {
        self.derivative_order = derivative_order;
        self
    }

    pub fn with_aggregation(mut self, aggregation: Aggregation) -> Self {
        self.aggregation = aggregation;
        self
    }

    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }
}

/// One row of the ranking: a series id and its aggregated score.
///
/// An all-`NaN` score is written as `null` by self-describing formats and
/// read back as `NaN`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendScore {
    pub id: String,
    #[serde(with = "crate::nullable")]
    pub max_or_avg: f64,
}

/// Scores every id by the aggregate of its most recent derivative values.
///
/// From each table the last `k` rows with a matching derivative order are
/// pooled under the table's id; tables sharing an id are aggregated
/// together. Ids without matching rows do not appear. The result is sorted
/// by score, highest first, ties by id, `NaN` scores last.
///
/// # Example
///
/// ```rust
/// use incline::{naive_trend, rank, TimeSeriesTable, TrendingConfig};
///
/// let up = naive_trend(&TimeSeriesTable::from_values(vec![1.0, 2.0, 3.0]).with_id("up"), "value").unwrap();
/// let down = naive_trend(&TimeSeriesTable::from_values(vec![3.0, 2.0, 1.0]).with_id("down"), "value").unwrap();
/// let ranking = rank(&[down, up], &TrendingConfig::default()).unwrap();
/// assert_eq!(ranking[0].id, "up");
/// ```
pub fn rank(tables: &[TrendTable], config: &TrendingConfig) -> Result<Vec<TrendScore>> {
    if config.k == 0 {
        return Err(TrendError::InvalidLookback);
    }

    let mut pooled: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for (position, table) in tables.iter().enumerate() {
        let id = table.id().ok_or(TrendError::MissingId(position))?;
        if table.derivative_order() != config.derivative_order || table.is_empty() {
            continue;
        }
        let values = table.derivative_value();
        let tail = &values[values.len().saturating_sub(config.k)..];
        pooled.entry(id).or_default().extend_from_slice(tail);
    }

    let mut scores: Vec<TrendScore> = pooled
        .into_iter()
        .map(|(id, values)| TrendScore {
            id: id.to_string(),
            max_or_avg: config.aggregation.apply(&values),
        })
        .collect();
    scores.sort_by(|a, b| by_score_descending(a.max_or_avg, b.max_or_avg).then_with(|| a.id.cmp(&b.id)));

    debug!(
        "ranked {} ids from {} tables ({} of last {} rows, derivative order {})",
        scores.len(),
        tables.len(),
        config.aggregation,
        config.k,
        config.derivative_order
    );
    Ok(scores)
}

fn by_score_descending(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}
