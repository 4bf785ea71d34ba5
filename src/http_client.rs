use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use reqwest::blocking::Client;

const REQUEST_TIMEOUT_SECS: u64 = 15;
const DEFAULT_THROTTLE_MS: u64 = 500;

static CLIENT: OnceCell<Client> = OnceCell::new();

/// Shared blocking client for both API collaborators.
pub fn http_client() -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("failed to build http client")
    })
}

/// Pause between consecutive requests to the same host. The fantasy API has
/// no documented rate limit but is not ours to hammer; the delay can be
/// tuned with `FETCH_THROTTLE_MS`.
pub fn polite_pause() {
    let millis = std::env::var("FETCH_THROTTLE_MS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(DEFAULT_THROTTLE_MS);
    if millis > 0 {
        thread::sleep(Duration::from_millis(millis));
    }
}
