use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::{BTreeSet, HashMap};

use crate::errors::Error;
use crate::market_data::StockData;

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PortfolioData {
    pub dates: Vec<String>,
    pub prices: Vec<f64>,
    pub returns: Vec<f64>,
    pub total_return_percent: f64,
    pub annualized_volatility_percent: f64,
    pub num_data_points: usize,
}

/// Build the equal-weighted portfolio series over the dates shared by every
/// valid input series, then derive return and volatility statistics.
///
/// Records carrying a fetch error are excluded here; the caller still
/// returns them to the client for visibility.
pub fn build_portfolio(stocks: &[StockData]) -> Result<PortfolioData, Error> {
    let valid: Vec<_> = stocks
        .iter()
        .filter(|stock| stock.error.is_none())
        .filter_map(|stock| stock.data.as_ref())
        .collect();

    if valid.is_empty() {
        return Err(Error::NoValidData);
    }

    let lookups: Vec<HashMap<&str, f64>> = valid
        .iter()
        .map(|series| {
            series
                .dates
                .iter()
                .map(String::as_str)
                .zip(series.prices.iter().copied())
                .collect()
        })
        .collect();

    // Candidate axis is the sorted union of all dates; a date survives only
    // when every valid series can price it, which leaves the intersection.
    let candidate_dates: BTreeSet<&str> = valid
        .iter()
        .flat_map(|series| series.dates.iter().map(String::as_str))
        .collect();

    let mut dates: Vec<String> = Vec::new();
    let mut prices: Vec<f64> = Vec::new();
    for date in candidate_dates {
        let closes: Vec<f64> = lookups
            .iter()
            .filter_map(|lookup| lookup.get(date).copied())
            .collect();

        if closes.len() == lookups.len() {
            dates.push(date.to_string());
            prices.push(closes.iter().sum::<f64>() / closes.len() as f64);
        }
    }

    if prices.is_empty() {
        return Err(Error::NoCommonDates);
    }

    let returns: Vec<f64> = prices
        .windows(2)
        .map(|pair| (pair[1] - pair[0]) / pair[0])
        .collect();

    let total_return_percent = if prices.len() > 1 {
        (prices[prices.len() - 1] - prices[0]) / prices[0] * 100.0
    } else {
        0.0
    };

    let annualized_volatility_percent = if returns.len() > 1 {
        returns.clone().population_std_dev() * TRADING_DAYS_PER_YEAR.sqrt() * 100.0
    } else {
        0.0
    };

    let num_data_points = prices.len();

    Ok(PortfolioData {
        dates,
        prices,
        returns,
        total_return_percent: round_to_two(total_return_percent),
        annualized_volatility_percent: round_to_two(annualized_volatility_percent),
        num_data_points,
    })
}

fn round_to_two(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::StockSeries;

    fn stock(ticker: &str, dates: Vec<&str>, closes: Vec<f64>) -> StockData {
        let count = dates.len();
        StockData {
            ticker: ticker.to_string(),
            data: Some(StockSeries {
                dates: dates.into_iter().map(String::from).collect(),
                prices: closes,
                volumes: vec![0.0; count],
                highs: vec![0.0; count],
                lows: vec![0.0; count],
                opens: vec![0.0; count],
            }),
            error: None,
        }
    }

    fn failed_stock(ticker: &str, message: &str) -> StockData {
        StockData {
            ticker: ticker.to_string(),
            data: None,
            error: Some(message.to_string()),
        }
    }

    #[test]
    fn test_equal_weighted_two_stocks() {
        let stocks = vec![
            stock("A", vec!["2024-01-02", "2024-01-03"], vec![10.0, 20.0]),
            stock("B", vec!["2024-01-02", "2024-01-03"], vec![30.0, 40.0]),
        ];

        let portfolio = build_portfolio(&stocks).unwrap();

        assert_eq!(portfolio.dates, vec!["2024-01-02", "2024-01-03"]);
        assert_eq!(portfolio.prices, vec![20.0, 30.0]);
        assert_eq!(portfolio.returns, vec![0.5]);
        assert_eq!(portfolio.total_return_percent, 50.0);
        assert_eq!(portfolio.annualized_volatility_percent, 0.0);
        assert_eq!(portfolio.num_data_points, 2);
    }

    #[test]
    fn test_input_order_does_not_change_prices() {
        let forward = vec![
            stock("A", vec!["2024-01-02", "2024-01-03"], vec![10.0, 20.0]),
            stock("B", vec!["2024-01-02", "2024-01-03"], vec![30.0, 40.0]),
        ];
        let reversed: Vec<StockData> = forward.iter().rev().cloned().collect();

        let first = build_portfolio(&forward).unwrap();
        let second = build_portfolio(&reversed).unwrap();

        assert_eq!(first.prices, second.prices);
        assert_eq!(first.dates, second.dates);
    }

    #[test]
    fn test_failed_stocks_are_excluded() {
        let stocks = vec![
            stock("A", vec!["2024-01-02", "2024-01-03"], vec![10.0, 20.0]),
            failed_stock("B", "No data found for B"),
        ];

        let portfolio = build_portfolio(&stocks).unwrap();

        // Only A contributes, so the portfolio tracks A exactly.
        assert_eq!(portfolio.prices, vec![10.0, 20.0]);
        assert_eq!(portfolio.total_return_percent, 100.0);
    }

    #[test]
    fn test_all_failed_is_an_error() {
        let stocks = vec![
            failed_stock("A", "timed out"),
            failed_stock("B", "No data found for B"),
        ];

        assert!(matches!(build_portfolio(&stocks), Err(Error::NoValidData)));
    }

    #[test]
    fn test_disjoint_dates_is_an_error() {
        let stocks = vec![
            stock("A", vec!["2024-01-02"], vec![10.0]),
            stock("B", vec!["2024-01-03"], vec![30.0]),
        ];

        assert!(matches!(
            build_portfolio(&stocks),
            Err(Error::NoCommonDates)
        ));
    }

    #[test]
    fn test_partial_overlap_keeps_shared_dates_only() {
        let stocks = vec![
            stock(
                "A",
                vec!["2024-01-02", "2024-01-03", "2024-01-04"],
                vec![10.0, 20.0, 30.0],
            ),
            stock("B", vec!["2024-01-03", "2024-01-04"], vec![40.0, 50.0]),
        ];

        let portfolio = build_portfolio(&stocks).unwrap();

        assert_eq!(portfolio.dates, vec!["2024-01-03", "2024-01-04"]);
        assert_eq!(portfolio.prices, vec![30.0, 40.0]);
    }

    #[test]
    fn test_single_point_yields_zero_statistics() {
        let stocks = vec![stock("A", vec!["2024-01-02"], vec![10.0])];

        let portfolio = build_portfolio(&stocks).unwrap();

        assert_eq!(portfolio.num_data_points, 1);
        assert!(portfolio.returns.is_empty());
        assert_eq!(portfolio.total_return_percent, 0.0);
        assert_eq!(portfolio.annualized_volatility_percent, 0.0);
    }

    #[test]
    fn test_volatility_uses_population_deviation() {
        let stocks = vec![stock(
            "A",
            vec!["2024-01-02", "2024-01-03", "2024-01-04"],
            vec![100.0, 110.0, 99.0],
        )];

        let portfolio = build_portfolio(&stocks).unwrap();

        // Returns are 0.1 and -0.1: population std dev 0.1, annualized
        // 0.1 * sqrt(252) * 100 = 158.745..., rounded to 2 decimals.
        assert_eq!(portfolio.annualized_volatility_percent, 158.75);
        assert!(portfolio.annualized_volatility_percent.is_finite());
    }
}
