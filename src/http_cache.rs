use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::header::USER_AGENT;
use serde::{Deserialize, Serialize};

const CACHE_VERSION: u32 = 1;
const CACHE_DIR: &str = "epl_reconcile";
const CACHE_FILE: &str = "http_cache.json";
const DEFAULT_TTL_SECS: u64 = 6 * 60 * 60;

static CACHE: Mutex<Option<BodyCacheFile>> = Mutex::new(None);

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct BodyCacheFile {
    version: u32,
    entries: HashMap<String, CachedBody>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedBody {
    body: String,
    fetched_at: u64,
}

/// Fetch a JSON payload, reusing an on-disk copy while it is fresh. Season
/// data changes slowly, so rebuild runs mostly replay from cache instead of
/// burning API quota. TTL can be tuned with `FETCH_CACHE_TTL_SECS`.
pub fn fetch_json_cached(
    client: &Client,
    url: &str,
    extra_headers: &[(&str, &str)],
) -> Result<String> {
    let ttl = cache_ttl_secs();
    if let Some(entry) = lookup(url)
        && now_secs().saturating_sub(entry.fetched_at) < ttl
    {
        return Ok(entry.body);
    }

    let mut req = client.get(url).header(USER_AGENT, "epl-reconcile/0.1");
    for (name, value) in extra_headers {
        req = req.header(*name, *value);
    }
    let resp = req.send().with_context(|| format!("request failed: {url}"))?;
    let status = resp.status();
    let body = resp.text().context("failed reading body")?;
    if !status.is_success() {
        // A stale cached body beats a hard failure for replay runs.
        if let Some(entry) = lookup(url) {
            return Ok(entry.body);
        }
        return Err(anyhow::anyhow!("http {}: {}", status, body));
    }

    store(url, &body);
    Ok(body)
}

/// Cache directory shared with the sqlite datasets.
pub fn app_cache_dir() -> Option<PathBuf> {
    if let Ok(base) = std::env::var("XDG_CACHE_HOME")
        && !base.trim().is_empty()
    {
        return Some(PathBuf::from(base).join(CACHE_DIR));
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(CACHE_DIR))
}

fn cache_ttl_secs() -> u64 {
    std::env::var("FETCH_CACHE_TTL_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(DEFAULT_TTL_SECS)
}

fn lookup(url: &str) -> Option<CachedBody> {
    let mut guard = CACHE.lock().expect("http cache lock poisoned");
    let cache = guard.get_or_insert_with(load_cache_file);
    cache.entries.get(url).cloned()
}

fn store(url: &str, body: &str) {
    let mut guard = CACHE.lock().expect("http cache lock poisoned");
    let cache = guard.get_or_insert_with(load_cache_file);
    cache.version = CACHE_VERSION;
    cache.entries.insert(
        url.to_string(),
        CachedBody {
            body: body.to_string(),
            fetched_at: now_secs(),
        },
    );
    let _ = save_cache_file(cache);
}

fn load_cache_file() -> BodyCacheFile {
    let Some(path) = cache_file_path() else {
        return BodyCacheFile::default();
    };
    let Ok(raw) = fs::read_to_string(path) else {
        return BodyCacheFile::default();
    };
    let cache = serde_json::from_str::<BodyCacheFile>(&raw).unwrap_or_default();
    if cache.version != CACHE_VERSION {
        return BodyCacheFile::default();
    }
    cache
}

fn save_cache_file(cache: &BodyCacheFile) -> Result<()> {
    let Some(path) = cache_file_path() else {
        return Ok(());
    };
    let Some(dir) = path.parent() else {
        return Ok(());
    };
    fs::create_dir_all(dir).ok();
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string(cache).context("serialize http cache")?;
    fs::write(&tmp, json).context("write http cache")?;
    fs::rename(&tmp, &path).context("swap http cache")?;
    Ok(())
}

fn cache_file_path() -> Option<PathBuf> {
    app_cache_dir().map(|dir| dir.join(CACHE_FILE))
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
