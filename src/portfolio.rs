use axum::extract::State as AxumState;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::calculators::{build_portfolio, PortfolioData};
use crate::errors::Error;
use crate::market_data::{fetch_multiple_stocks, Period, StockData};
use crate::state::State;

const MAX_TICKERS: usize = 20;

#[derive(Deserialize, Debug)]
pub struct PortfolioRequest {
    pub tickers: Vec<String>,
    #[serde(default)]
    pub period: Period,
}

#[derive(Serialize, Debug)]
pub struct PortfolioResponse {
    pub tickers: Vec<String>,
    pub portfolio_data: PortfolioData,
    pub individual_stocks: Vec<StockData>,
    pub period: Period,
    pub created_at: String,
}

pub async fn create(
    AxumState(state): AxumState<State>,
    Json(request): Json<PortfolioRequest>,
) -> Result<Json<PortfolioResponse>, Error> {
    build_response(&state, request).await.map(Json)
}

/// Canned request used by frontend smoke checks; same flow as POST /portfolio.
pub async fn example(
    AxumState(state): AxumState<State>,
) -> Result<Json<PortfolioResponse>, Error> {
    let request = PortfolioRequest {
        tickers: ["AAPL", "GOOGL", "MSFT", "TSLA"]
            .iter()
            .map(|ticker| ticker.to_string())
            .collect(),
        period: Period::SixMonths,
    };

    build_response(&state, request).await.map(Json)
}

async fn build_response(
    state: &State,
    request: PortfolioRequest,
) -> Result<PortfolioResponse, Error> {
    if request.tickers.is_empty() {
        return Err(Error::Validation(
            "At least one ticker is required".to_string(),
        ));
    }

    if request.tickers.len() > MAX_TICKERS {
        return Err(Error::Validation("Maximum 20 tickers allowed".to_string()));
    }

    info!("Fetching data for tickers: {:?}", request.tickers);

    let individual_stocks = fetch_multiple_stocks(state, &request.tickers, request.period).await?;

    let portfolio_data = build_portfolio(&individual_stocks)?;

    Ok(PortfolioResponse {
        tickers: request.tickers,
        portfolio_data,
        individual_stocks,
        period: request.period,
        created_at: Utc::now().to_rfc3339(),
    })
}
