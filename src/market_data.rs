use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::errors::Error;
use crate::state::State;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "5d")]
    FiveDays,
    #[serde(rename = "1mo")]
    OneMonth,
    #[serde(rename = "3mo")]
    ThreeMonths,
    #[serde(rename = "6mo")]
    SixMonths,
    #[default]
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "2y")]
    TwoYears,
    #[serde(rename = "5y")]
    FiveYears,
    #[serde(rename = "10y")]
    TenYears,
    #[serde(rename = "ytd")]
    YearToDate,
    #[serde(rename = "max")]
    Max,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::OneDay => "1d",
            Period::FiveDays => "5d",
            Period::OneMonth => "1mo",
            Period::ThreeMonths => "3mo",
            Period::SixMonths => "6mo",
            Period::OneYear => "1y",
            Period::TwoYears => "2y",
            Period::FiveYears => "5y",
            Period::TenYears => "10y",
            Period::YearToDate => "ytd",
            Period::Max => "max",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct StockSeries {
    pub dates: Vec<String>,
    pub prices: Vec<f64>,
    pub volumes: Vec<f64>,
    pub highs: Vec<f64>,
    pub lows: Vec<f64>,
    pub opens: Vec<f64>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct StockData {
    pub ticker: String,
    pub data: Option<StockSeries>,
    pub error: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Deserialize, Debug)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<serde_json::Value>,
}

#[derive(Deserialize, Debug)]
struct ChartResult {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Deserialize, Debug)]
struct Indicators {
    quote: Vec<QuoteBlock>,
}

#[derive(Deserialize, Debug, Default)]
struct QuoteBlock {
    open: Option<Vec<Option<f64>>>,
    high: Option<Vec<Option<f64>>>,
    low: Option<Vec<Option<f64>>>,
    close: Option<Vec<Option<f64>>>,
    volume: Option<Vec<Option<f64>>>,
}

/// Fetch one ticker's daily history. Failures never propagate: they come
/// back as an error string on the returned record so one bad ticker cannot
/// abort a whole batch.
pub async fn fetch_stock_data(state: &State, ticker: &str, period: Period) -> StockData {
    match fetch_series(state, ticker, period).await {
        Ok(Some(series)) => StockData {
            ticker: ticker.to_string(),
            data: Some(series),
            error: None,
        },
        Ok(None) => StockData {
            ticker: ticker.to_string(),
            data: None,
            error: Some(format!("No data found for {}", ticker)),
        },
        Err(message) => {
            error!("Error fetching data for {}: {}", ticker, message);
            StockData {
                ticker: ticker.to_string(),
                data: None,
                error: Some(message),
            }
        }
    }
}

async fn fetch_series(
    state: &State,
    ticker: &str,
    period: Period,
) -> Result<Option<StockSeries>, String> {
    let url = format!("{}/v8/finance/chart/{}", state.market_data.base, ticker);

    let response = state
        .http_client
        .get(&url)
        .header("accept", "application/json")
        .query(&[("range", period.as_str()), ("interval", "1d")])
        .send()
        .await
        .map_err(|err| err.to_string())?;

    let response = response.error_for_status().map_err(|err| err.to_string())?;

    let chart: ChartResponse = response.json().await.map_err(|err| err.to_string())?;

    if let Some(provider_error) = chart.chart.error {
        return Err(provider_error.to_string());
    }

    let result = match chart.chart.result.and_then(|mut results| {
        if results.is_empty() {
            None
        } else {
            Some(results.remove(0))
        }
    }) {
        Some(result) => result,
        None => return Ok(None),
    };

    Ok(series_from_chart(result))
}

/// Flatten the provider's chart payload into parallel per-field vectors.
/// Rows without a close price are dropped; the rows that survive are
/// sorted by date rather than trusting provider ordering.
fn series_from_chart(result: ChartResult) -> Option<StockSeries> {
    let timestamps = result.timestamp?;
    let quote = result.indicators.quote.into_iter().next()?;

    let closes = quote.close.unwrap_or_default();
    let opens = quote.open.unwrap_or_default();
    let highs = quote.high.unwrap_or_default();
    let lows = quote.low.unwrap_or_default();
    let volumes = quote.volume.unwrap_or_default();

    let field_at = |fields: &[Option<f64>], index: usize| -> f64 {
        fields.get(index).copied().flatten().unwrap_or(0.0)
    };

    let mut rows: Vec<(String, f64, f64, f64, f64, f64)> = Vec::with_capacity(timestamps.len());
    for (index, unix_seconds) in timestamps.iter().enumerate() {
        let close = match closes.get(index).copied().flatten() {
            Some(close) => close,
            None => continue,
        };

        let date = match Utc.timestamp_opt(*unix_seconds, 0).single() {
            Some(datetime) => datetime.format("%Y-%m-%d").to_string(),
            None => continue,
        };

        rows.push((
            date,
            field_at(&opens, index),
            field_at(&highs, index),
            field_at(&lows, index),
            close,
            field_at(&volumes, index),
        ));
    }

    if rows.is_empty() {
        return None;
    }

    rows.sort_by(|a, b| a.0.cmp(&b.0));

    let mut series = StockSeries {
        dates: Vec::with_capacity(rows.len()),
        prices: Vec::with_capacity(rows.len()),
        volumes: Vec::with_capacity(rows.len()),
        highs: Vec::with_capacity(rows.len()),
        lows: Vec::with_capacity(rows.len()),
        opens: Vec::with_capacity(rows.len()),
    };

    for (date, open, high, low, close, volume) in rows {
        series.dates.push(date);
        series.opens.push(open);
        series.highs.push(high);
        series.lows.push(low);
        series.prices.push(close);
        series.volumes.push(volume);
    }

    Some(series)
}

/// Fan one fetch task out per ticker, bounded by the shared semaphore, and
/// join them all in input order. A panicked task is unexpected and fails
/// the whole batch.
pub async fn fetch_multiple_stocks(
    state: &State,
    tickers: &[String],
    period: Period,
) -> Result<Vec<StockData>, Error> {
    let mut handles = Vec::with_capacity(tickers.len());
    for ticker in tickers {
        let state = state.clone();
        let ticker = ticker.clone();
        handles.push(tokio::spawn(async move {
            let _permit = state
                .fetch_permits
                .clone()
                .acquire_owned()
                .await
                .expect("fetch semaphore is never closed");
            fetch_stock_data(&state, &ticker, period).await
        }));
    }

    let mut results = Vec::with_capacity(handles.len());
    for (ticker, handle) in tickers.iter().zip(handles) {
        match handle.await {
            Ok(stock) => results.push(stock),
            Err(err) => {
                error!("Fetch task for {} failed: {}", ticker, err);
                return Err(Error::Internal(err.to_string()));
            }
        }
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn chart_result(value: serde_json::Value) -> ChartResult {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_period_parses_provider_values() {
        let period: Period = serde_json::from_value(json!("6mo")).unwrap();
        assert_eq!(period, Period::SixMonths);
        assert_eq!(period.as_str(), "6mo");

        assert!(serde_json::from_value::<Period>(json!("7mo")).is_err());
    }

    #[test]
    fn test_period_defaults_to_one_year() {
        assert_eq!(Period::default(), Period::OneYear);
    }

    #[test]
    fn test_series_from_chart_formats_dates_and_sorts() {
        // 2024-01-03 listed before 2024-01-02 on purpose.
        let result = chart_result(json!({
            "timestamp": [1704240000, 1704153600],
            "indicators": {
                "quote": [{
                    "open": [20.0, 10.0],
                    "high": [21.0, 11.0],
                    "low": [19.0, 9.0],
                    "close": [20.5, 10.5],
                    "volume": [2000.0, 1000.0],
                }]
            }
        }));

        let series = series_from_chart(result).unwrap();

        assert_eq!(series.dates, vec!["2024-01-02", "2024-01-03"]);
        assert_eq!(series.prices, vec![10.5, 20.5]);
        assert_eq!(series.opens, vec![10.0, 20.0]);
        assert_eq!(series.volumes, vec![1000.0, 2000.0]);
    }

    #[test]
    fn test_series_from_chart_skips_null_closes() {
        let result = chart_result(json!({
            "timestamp": [1704153600, 1704240000, 1704326400],
            "indicators": {
                "quote": [{
                    "open": [10.0, null, 30.0],
                    "high": [11.0, 21.0, 31.0],
                    "low": [9.0, 19.0, 29.0],
                    "close": [10.5, null, 30.5],
                    "volume": [1000.0, 2000.0, null],
                }]
            }
        }));

        let series = series_from_chart(result).unwrap();

        assert_eq!(series.dates, vec!["2024-01-02", "2024-01-04"]);
        assert_eq!(series.prices, vec![10.5, 30.5]);
        // Missing non-close fields default to zero rather than dropping the row.
        assert_eq!(series.volumes, vec![1000.0, 0.0]);
    }

    #[test]
    fn test_series_from_chart_all_closes_missing() {
        let result = chart_result(json!({
            "timestamp": [1704153600],
            "indicators": {
                "quote": [{
                    "open": [10.0],
                    "high": [11.0],
                    "low": [9.0],
                    "close": [null],
                    "volume": [1000.0],
                }]
            }
        }));

        assert!(series_from_chart(result).is_none());
    }
}
