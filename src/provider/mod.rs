//! Access to the third-party bank-data aggregation API.
//!
//! [BankingProvider] is the seam the rest of the crate depends on;
//! [ProviderClient] implements it over HTTP.

mod client;
mod error;
mod models;

pub use client::{BankingProvider, ProviderClient, TransactionQuery};
pub use error::ProviderError;
pub use models::{
    UpstreamAccount, UpstreamCategory, UpstreamConnection, UpstreamConnector, UpstreamTransaction,
};
