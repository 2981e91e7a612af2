use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("table {table}: missing required column '{column}'")]
    MissingColumn { table: String, column: &'static str },

    #[error("invalid timestamp '{0}'")]
    InvalidTimestamp(String),

    #[error("series {symbol}: timestamp at row {index} is not strictly increasing")]
    UnorderedSeries { symbol: String, index: usize },

    #[error("upstream fetch failed: {0}")]
    UpstreamFetch(String),

    #[error("{symbol}: need {need} closes for a prediction, have {have}")]
    InsufficientHistory {
        symbol: String,
        have: usize,
        need: usize,
    },

    #[error("predictor error: {0}")]
    Predictor(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
