use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    #[error("{0}")]
    Validation(String),
    #[error("No valid stock data found")]
    NoValidData,
    #[error("No common dates found across all stocks")]
    NoCommonDates,
    #[error("Ticker {ticker} not found: {detail}")]
    TickerNotFound { ticker: String, detail: String },
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::Validation(_) | Error::NoValidData | Error::NoCommonDates => {
                StatusCode::BAD_REQUEST
            }
            Error::TickerNotFound { .. } => StatusCode::NOT_FOUND,
            Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, self.to_string()).into_response()
    }
}
