mod client;
mod error;
pub mod models;
pub mod query;

pub use client::{ClientConfig, Pacing, ProviderClient, ProviderSpec};
pub use error::ProviderError;
