use axum::extract::{Path, State as AxumState};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::errors::Error;
use crate::state::State;

#[derive(Serialize, Debug)]
pub struct TickerDetails {
    pub ticker: String,
    pub name: String,
    pub sector: String,
    pub industry: String,
    /// Number when the provider reports one, "N/A" otherwise.
    pub market_cap: Value,
    pub currency: String,
}

#[derive(Deserialize, Debug)]
struct QuoteSummaryResponse {
    #[serde(rename = "quoteSummary")]
    quote_summary: QuoteSummary,
}

#[derive(Deserialize, Debug)]
struct QuoteSummary {
    result: Option<Vec<QuoteSummaryResult>>,
    error: Option<Value>,
}

#[derive(Deserialize, Debug)]
struct QuoteSummaryResult {
    #[serde(rename = "assetProfile")]
    asset_profile: Option<AssetProfile>,
    price: Option<PriceBlock>,
}

#[derive(Deserialize, Debug, Default)]
struct AssetProfile {
    sector: Option<String>,
    industry: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
struct PriceBlock {
    #[serde(rename = "longName")]
    long_name: Option<String>,
    #[serde(rename = "marketCap")]
    market_cap: Option<RawValue>,
    currency: Option<String>,
}

#[derive(Deserialize, Debug)]
struct RawValue {
    raw: Option<f64>,
}

pub async fn get(
    AxumState(state): AxumState<State>,
    Path(ticker): Path<String>,
) -> Result<Json<TickerDetails>, Error> {
    info!("Fetching details for ticker: {}", ticker);

    match fetch_details(&state, &ticker).await {
        Ok(details) => Ok(Json(details)),
        Err(detail) => {
            info!("Failed to resolve ticker {}: {}", ticker, detail);
            Err(Error::TickerNotFound { ticker, detail })
        }
    }
}

async fn fetch_details(state: &State, ticker: &str) -> Result<TickerDetails, String> {
    let url = format!(
        "{}/v10/finance/quoteSummary/{}",
        state.market_data.base, ticker
    );

    let response = state
        .http_client
        .get(&url)
        .header("accept", "application/json")
        .query(&[("modules", "assetProfile,price")])
        .send()
        .await
        .map_err(|err| err.to_string())?;

    let response = response.error_for_status().map_err(|err| err.to_string())?;

    let summary: QuoteSummaryResponse = response.json().await.map_err(|err| err.to_string())?;

    if let Some(provider_error) = summary.quote_summary.error {
        return Err(provider_error.to_string());
    }

    let result = summary
        .quote_summary
        .result
        .and_then(|mut results| {
            if results.is_empty() {
                None
            } else {
                Some(results.remove(0))
            }
        })
        .ok_or("no summary data returned".to_string())?;

    let profile = result.asset_profile.unwrap_or_default();
    let price = result.price.unwrap_or_default();

    Ok(TickerDetails {
        ticker: ticker.to_string(),
        name: price.long_name.unwrap_or("N/A".to_string()),
        sector: profile.sector.unwrap_or("N/A".to_string()),
        industry: profile.industry.unwrap_or("N/A".to_string()),
        market_cap: price
            .market_cap
            .and_then(|cap| cap.raw)
            .map(|raw| json!(raw))
            .unwrap_or(json!("N/A")),
        currency: price.currency.unwrap_or("USD".to_string()),
    })
}
