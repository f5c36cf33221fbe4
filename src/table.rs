use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrendError};

/// Column read by the estimators when the caller does not name one.
pub const DEFAULT_VALUE_COLUMN: &str = "value";

/// An ordered set of rows with named numeric columns.
///
/// Row order is time order; the index holds a label per row (typically a
/// timestamp rendered as text). Missing values are `NaN`, serialised as
/// `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesTable {
    id: Option<String>,
    index: Vec<String>,
    columns: Vec<Column>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Column {
    name: String,
    #[serde(with = "crate::nullable::seq")]
    values: Vec<f64>,
}

impl TimeSeriesTable {
    /// Creates a table with the given row labels and no columns.
    pub fn new(index: Vec<String>) -> Self {
        Self {
            id: None,
            index,
            columns: Vec::new(),
        }
    }

    /// Creates a table with a positional index (`"0"`, `"1"`, ...) and a
    /// single `value` column.
    ///
    /// # Example
    ///
    /// ```rust
    /// use incline::TimeSeriesTable;
    ///
    /// let table = TimeSeriesTable::from_values(vec![1.0, 2.0, 4.0]).with_id("A");
    /// assert_eq!(table.len(), 3);
    /// assert_eq!(table.column("value").unwrap(), &[1.0, 2.0, 4.0]);
    /// ```
    pub fn from_values(values: Vec<f64>) -> Self {
        let index = (0..values.len()).map(|i| i.to_string()).collect();
        Self {
            id: None,
            index,
            columns: vec![Column {
                name: DEFAULT_VALUE_COLUMN.to_string(),
                values,
            }],
        }
    }

    /// Adds (or replaces) a column. Fails unless it has one value per row.
    pub fn with_column(mut self, name: impl Into<String>, values: Vec<f64>) -> Result<Self> {
        let name = name.into();
        if values.len() != self.index.len() {
            return Err(TrendError::LengthMismatch {
                column: name,
                found: values.len(),
                expected: self.index.len(),
            });
        }
        match self.columns.iter_mut().find(|column| column.name == name) {
            Some(column) => column.values = values,
            None => self.columns.push(Column { name, values }),
        }
        Ok(self)
    }

    /// Tags the table with the id of its source series.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn index(&self) -> &[String] {
        &self.index
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Values of the named column.
    pub fn column(&self, name: &str) -> Result<&[f64]> {
        self.columns
            .iter()
            .find(|column| column.name == name)
            .map(|column| column.values.as_slice())
            .ok_or_else(|| TrendError::ColumnNotFound(name.to_string()))
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|column| column.name.as_str())
    }
}

/// How a trend table's derivative was estimated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DerivativeMethod {
    Naive,
    Spline,
    Sgolay,
}

impl fmt::Display for DerivativeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DerivativeMethod::Naive => write!(f, "naive"),
            DerivativeMethod::Spline => write!(f, "spline"),
            DerivativeMethod::Sgolay => write!(f, "sgolay"),
        }
    }
}

/// An input table extended with a smoothed value and a derivative per row.
///
/// Undefined derivatives (a single-row naive trend) are `NaN` and serialise
/// as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendTable {
    source: TimeSeriesTable,
    #[serde(with = "crate::nullable::option_seq")]
    smoothed_value: Option<Vec<f64>>,
    #[serde(with = "crate::nullable::seq")]
    derivative_value: Vec<f64>,
    derivative_method: DerivativeMethod,
    function_order: Option<usize>,
    derivative_order: usize,
}

/// One row of a [`TrendTable`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendRow<'a> {
    pub label: &'a str,
    pub smoothed_value: Option<f64>,
    pub derivative_value: f64,
}

impl TrendTable {
    pub(crate) fn new(
        source: &TimeSeriesTable,
        derivative_value: Vec<f64>,
        derivative_method: DerivativeMethod,
        function_order: Option<usize>,
        derivative_order: usize,
    ) -> Self {
        debug_assert_eq!(derivative_value.len(), source.len());
        Self {
            source: source.clone(),
            smoothed_value: None,
            derivative_value,
            derivative_method,
            function_order,
            derivative_order,
        }
    }

    pub(crate) fn with_smoothed_value(mut self, smoothed_value: Vec<f64>) -> Self {
        debug_assert_eq!(smoothed_value.len(), self.source.len());
        self.smoothed_value = Some(smoothed_value);
        self
    }

    /// Tags the trend table with the id of its source series.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.source.id = Some(id.into());
        self
    }

    /// The table the trend was computed from.
    pub fn source(&self) -> &TimeSeriesTable {
        &self.source
    }

    pub fn id(&self) -> Option<&str> {
        self.source.id()
    }

    pub fn index(&self) -> &[String] {
        self.source.index()
    }

    pub fn len(&self) -> usize {
        self.derivative_value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.derivative_value.is_empty()
    }

    pub fn smoothed_value(&self) -> Option<&[f64]> {
        self.smoothed_value.as_deref()
    }

    pub fn derivative_value(&self) -> &[f64] {
        &self.derivative_value
    }

    pub fn derivative_method(&self) -> DerivativeMethod {
        self.derivative_method
    }

    /// Polynomial or spline degree, absent for the naive method.
    pub fn function_order(&self) -> Option<usize> {
        self.function_order
    }

    pub fn derivative_order(&self) -> usize {
        self.derivative_order
    }

    pub fn rows(&self) -> impl Iterator<Item = TrendRow<'_>> {
        self.source
            .index
            .iter()
            .enumerate()
            .map(move |(i, label)| TrendRow {
                label,
                smoothed_value: self.smoothed_value.as_ref().map(|values| values[i]),
                derivative_value: self.derivative_value[i],
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_values_builds_positional_index() {
        let table = TimeSeriesTable::from_values(vec![3.0, 1.0]);
        assert_eq!(table.index(), &["0".to_string(), "1".to_string()]);
        assert_eq!(table.column_names().collect::<Vec<_>>(), vec!["value"]);
        assert_eq!(table.id(), None);
    }

    #[test]
    fn test_with_column_checks_length() {
        let table = TimeSeriesTable::new(vec!["2024-01".into(), "2024-02".into()]);
        let err = table.clone().with_column("sales", vec![1.0]).unwrap_err();
        assert_eq!(
            err,
            TrendError::LengthMismatch {
                column: "sales".into(),
                found: 1,
                expected: 2
            }
        );

        let table = table
            .with_column("sales", vec![1.0, 2.0])
            .unwrap()
            .with_column("sales", vec![5.0, 6.0])
            .unwrap();
        assert_eq!(table.column("sales").unwrap(), &[5.0, 6.0]);
        assert_eq!(table.column_names().count(), 1);
    }

    #[test]
    fn test_missing_column() {
        let table = TimeSeriesTable::from_values(vec![1.0]);
        assert_eq!(
            table.column("price").unwrap_err(),
            TrendError::ColumnNotFound("price".into())
        );
    }

    #[test]
    fn test_trend_rows_follow_index() {
        let table = TimeSeriesTable::from_values(vec![1.0, 2.0]);
        let trend = TrendTable::new(&table, vec![0.5, 0.25], DerivativeMethod::Sgolay, Some(2), 1)
            .with_smoothed_value(vec![1.1, 1.9])
            .with_id("A");

        let rows: Vec<_> = trend.rows().collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].label, "1");
        assert_eq!(rows[1].smoothed_value, Some(1.9));
        assert_eq!(rows[1].derivative_value, 0.25);
        assert_eq!(trend.id(), Some("A"));
        assert_eq!(table.id(), None);
    }

    #[test]
    fn test_method_names() {
        assert_eq!(DerivativeMethod::Sgolay.to_string(), "sgolay");
        assert_eq!(serde_json::to_string(&DerivativeMethod::Naive).unwrap(), "\"naive\"");
    }

    #[test]
    fn test_nan_values_survive_json() {
        let table = TimeSeriesTable::from_values(vec![f64::NAN, 2.0]).with_id("A");
        let trend = TrendTable::new(&table, vec![f64::NAN, 0.5], DerivativeMethod::Sgolay, Some(2), 1)
            .with_smoothed_value(vec![1.0, f64::NAN]);

        let json = serde_json::to_value(&trend).unwrap();
        assert!(json["derivative_value"][0].is_null());
        assert!(json["smoothed_value"][1].is_null());
        assert!(json["source"]["columns"][0]["values"][0].is_null());

        let back: TrendTable = serde_json::from_value(json).unwrap();
        assert!(back.derivative_value()[0].is_nan());
        assert_eq!(back.derivative_value()[1], 0.5);
        assert_eq!(back.smoothed_value().unwrap()[0], 1.0);
        assert!(back.smoothed_value().unwrap()[1].is_nan());
        assert!(back.source().column("value").unwrap()[0].is_nan());
        assert_eq!(back.id(), Some("A"));
    }
}
