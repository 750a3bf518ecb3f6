use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tracing::debug;

use crate::{
    config::{env_megabytes_or, env_var_or},
    UploadError, UploadResult,
};

/// Bounds for the media URL cache
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of cached URLs
    pub max_entries: usize,
    /// Maximum total payload held, in bytes
    pub max_bytes: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 256,
            max_bytes: 256 * 1024 * 1024,
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_entries: env_var_or("LAMAH_MEDIA_CACHE_ENTRIES", defaults.max_entries),
            max_bytes: env_megabytes_or("LAMAH_MEDIA_CACHE_MB", defaults.max_bytes),
        }
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }
}

#[derive(Debug)]
struct CacheEntry {
    data: Bytes,
    last_used: u64,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    total_bytes: u64,
    clock: u64,
}

impl CacheState {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn remove(&mut self, url: &str) -> Option<Bytes> {
        let entry = self.entries.remove(url)?;
        self.total_bytes -= entry.data.len() as u64;
        Some(entry.data)
    }

    fn evict_lru(&mut self) -> bool {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_used)
            .map(|(url, _)| url.clone());
        match oldest {
            Some(url) => {
                debug!(%url, "evicting cached media");
                self.remove(&url).is_some()
            }
            None => false,
        }
    }
}

/// Current cache usage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub total_bytes: u64,
    pub max_entries: usize,
    pub max_bytes: u64,
}

/// In-memory media bytes keyed by source URL, least-recently-used eviction
/// by entry count and total bytes
#[derive(Debug, Default)]
pub struct MediaUrlCache {
    config: CacheConfig,
    state: Mutex<CacheState>,
}

impl MediaUrlCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            state: Mutex::new(CacheState::default()),
        }
    }

    pub fn get(&self, url: &str) -> Option<Bytes> {
        let mut state = self.state.lock();
        let now = state.tick();
        let entry = state.entries.get_mut(url)?;
        entry.last_used = now;
        Some(entry.data.clone())
    }

    /// Insert or replace. Payloads larger than the byte bound are not cached.
    pub fn put<S: Into<String>>(&self, url: S, data: Bytes) {
        let url = url.into();
        let size = data.len() as u64;
        if size > self.config.max_bytes || self.config.max_entries == 0 {
            return;
        }

        let mut state = self.state.lock();
        state.remove(&url);
        while state.entries.len() >= self.config.max_entries
            || state.total_bytes + size > self.config.max_bytes
        {
            if !state.evict_lru() {
                break;
            }
        }

        let now = state.tick();
        state.total_bytes += size;
        state.entries.insert(url, CacheEntry { data, last_used: now });
    }

    pub fn remove(&self, url: &str) -> Option<Bytes> {
        self.state.lock().remove(url)
    }

    /// Drop every held buffer before returning
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.total_bytes = 0;
    }

    pub fn contains(&self, url: &str) -> bool {
        self.state.lock().entries.contains_key(url)
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        CacheStats {
            entries: state.entries.len(),
            total_bytes: state.total_bytes,
            max_entries: self.config.max_entries,
            max_bytes: self.config.max_bytes,
        }
    }
}

/// Fetches remote media through a shared cache
#[derive(Debug, Clone)]
pub struct MediaFetcher {
    client: reqwest::Client,
    cache: Arc<MediaUrlCache>,
}

impl MediaFetcher {
    pub fn new(client: reqwest::Client, cache: Arc<MediaUrlCache>) -> Self {
        Self { client, cache }
    }

    pub fn cache(&self) -> &Arc<MediaUrlCache> {
        &self.cache
    }

    pub async fn fetch(&self, url: &str) -> UploadResult<Bytes> {
        if let Some(data) = self.cache.get(url) {
            debug!(%url, "media cache hit");
            return Ok(data);
        }

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(UploadError::rejected(
                status.as_u16(),
                format!("fetching {} failed", url),
            ));
        }
        let data = response.bytes().await?;
        self.cache.put(url, data.clone());
        Ok(data)
    }
}
