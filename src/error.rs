use thiserror::Error;

/// Error types for trend estimation and ranking
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrendError {
    /// The requested column does not exist in the table
    #[error("Column '{0}' was not found in the table")]
    ColumnNotFound(String),

    /// A column does not have one value per index row
    #[error("Column '{column}' has {found} rows, but the table index has {expected}")]
    LengthMismatch {
        column: String,
        found: usize,
        expected: usize,
    },

    /// Window size must be odd and at least 1
    #[error("Invalid window size: {0}. Window size must be odd and at least 1")]
    InvalidWindowSize(usize),

    /// Polynomial order must be less than window size
    #[error("Invalid polynomial order: {0}. Must be less than window size ({1})")]
    InvalidPolynomialOrder(usize, usize),

    /// Input data is too short for the requested fit
    #[error("Insufficient data: {found} points. Need at least {required} points")]
    InsufficientData { found: usize, required: usize },

    /// Spline degree outside the supported range
    #[error("Invalid spline degree: {0}. Degree must be between 1 and 5")]
    InvalidSplineDegree(usize),

    /// Derivative requested beyond what the fitted function supports
    #[error("Invalid derivative order: {derivative_order}. Must not exceed function order ({function_order})")]
    InvalidDerivativeOrder {
        derivative_order: usize,
        function_order: usize,
    },

    /// Smoothing factor must be finite and non-negative
    #[error("Invalid smoothing factor: {0}. Must be finite and non-negative")]
    InvalidSmoothingFactor(f64),

    /// Input contains NaN or infinity where a fit needs finite values
    #[error("Non-finite value {value} at row {row}")]
    NonFiniteValue { row: usize, value: f64 },

    /// A trend table passed to the ranking has no series id
    #[error("Trend table at position {0} has no id")]
    MissingId(usize),

    /// The ranking look-back window must cover at least one row
    #[error("Invalid look-back window: k must be at least 1")]
    InvalidLookback,

    /// Aggregation mode string is not recognised
    #[error("Unknown aggregation '{0}'. Expected 'max', 'avg' or 'mean'")]
    UnknownAggregation(String),

    /// Mathematical computation error (e.g., singular matrix)
    #[error("Computation error: {0}")]
    Computation(String),
}

/// Result type for trend operations
pub type Result<T> = std::result::Result<T, TrendError>;
