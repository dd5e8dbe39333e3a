use reqwest::Client as HTTPClient;
use std::sync::Arc;
use tokio::sync::Semaphore;

const DEFAULT_FETCH_CONCURRENCY: usize = 10;

#[derive(Clone)]
pub struct MarketDataConfig {
    pub base: String,
}

#[derive(Clone)]
pub struct State {
    pub http_client: HTTPClient,
    pub market_data: MarketDataConfig,
    pub fetch_permits: Arc<Semaphore>,
}

impl State {
    pub fn from_env() -> Self {
        let http_client = HTTPClient::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("failed to build HTTP client");

        let fetch_concurrency = std::env::var("FETCH_CONCURRENCY_LIMIT")
            .ok()
            .and_then(|value| value.parse::<usize>().ok())
            .unwrap_or(DEFAULT_FETCH_CONCURRENCY);

        Self {
            http_client,
            market_data: MarketDataConfig {
                base: std::env::var("MARKET_DATA_BASE_URL")
                    .unwrap_or("https://query1.finance.yahoo.com".to_string()),
            },
            // Shared across all requests so the cap bounds provider
            // parallelism process-wide, not per request.
            fetch_permits: Arc::new(Semaphore::new(fetch_concurrency)),
        }
    }
}
