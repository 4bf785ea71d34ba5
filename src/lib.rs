pub mod export;
pub mod fpl_fetch;
pub mod http_cache;
pub mod http_client;
pub mod reconcile;
pub mod records;
pub mod stats_fetch;
pub mod store;
