pub mod aggregate;
pub mod api_sports;
pub mod config;
pub mod error;
pub mod events;
pub mod fixtures;
pub mod football_data;
pub mod http_client;
pub mod identity;
pub mod model;
mod payload;
pub mod pipeline;
pub mod provider;
pub mod rate_limit;
pub mod scorers;
pub mod sink;
pub mod snapshot;
pub mod store;
#[doc(hidden)]
pub mod testing;
