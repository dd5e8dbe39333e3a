pub mod calculators;
pub mod errors;
pub mod health;
pub mod market_data;
pub mod portfolio;
pub mod router;
pub mod state;
pub mod ticker_details;

pub use router::{create_app, create_app_with_state};
