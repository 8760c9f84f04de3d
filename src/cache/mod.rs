pub mod types;

use std::path::Path;

use anyhow::{Context, Result};
use cnidarium::{StateDelta, StateRead, StateWrite, Storage};
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::transcript::TranscriptRecord;

pub use types::{cache_key, CacheEntry, CacheKind, CacheStats};

// Key prefixes, no trailing slashes
const ANALYSIS_PREFIX: &str = "cache/analysis";
const TRANSCRIPTS_PREFIX: &str = "cache/transcripts";
const RECORD_PREFIX: &str = "scrape/record";

fn prefix(kind: CacheKind) -> &'static str {
    match kind {
        CacheKind::Analysis => ANALYSIS_PREFIX,
        CacheKind::Transcripts => TRANSCRIPTS_PREFIX,
    }
}

fn entry_key(kind: CacheKind, key: &str) -> String {
    format!("{}/{}", prefix(kind), key)
}

fn record_key(url: &str) -> String {
    format!("{}/{}", RECORD_PREFIX, blake3::hash(url.as_bytes()).to_hex())
}

/// Persistent cache for analysis results and scraped transcripts.
pub struct ResultCache {
    storage: Storage,
}

impl ResultCache {
    pub async fn new(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let prefixes = vec![
            ANALYSIS_PREFIX.to_string(),
            TRANSCRIPTS_PREFIX.to_string(),
            RECORD_PREFIX.to_string(),
        ];
        let storage = Storage::load(data_dir.to_path_buf(), prefixes)
            .await
            .context("Failed to init cnidarium storage")?;
        Ok(Self { storage })
    }

    /// Read an entry. Entries older than `ttl_secs` are deleted and read as a miss.
    pub async fn get<T: DeserializeOwned>(&self, kind: CacheKind, key: &str, ttl_secs: u64) -> Result<Option<T>> {
        let full_key = entry_key(kind, key);
        let snapshot = self.storage.latest_snapshot();
        let Some(bytes) = snapshot.get_raw(&full_key).await? else {
            return Ok(None);
        };

        let entry: CacheEntry<T> = match serde_json::from_slice(&bytes) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key = %full_key, "Dropping unreadable cache entry: {}", e);
                self.delete(&full_key).await?;
                return Ok(None);
            }
        };

        if entry.is_expired(chrono::Utc::now().timestamp(), ttl_secs) {
            debug!(key = %full_key, "Cache entry expired");
            self.delete(&full_key).await?;
            return Ok(None);
        }

        debug!(key = %full_key, "Cache hit");
        Ok(Some(entry.value))
    }

    pub async fn put<T: Serialize>(&self, kind: CacheKind, key: &str, value: &T) -> Result<()> {
        let entry = CacheEntry {
            stored_at: chrono::Utc::now().timestamp(),
            value,
        };
        let snapshot = self.storage.latest_snapshot();
        let mut delta = StateDelta::new(snapshot);
        delta.put_raw(
            entry_key(kind, key),
            serde_json::to_vec(&entry).context("serialize cache entry")?,
        );
        self.storage.commit(delta).await?;
        debug!(kind = kind.as_str(), key, "Cache entry stored");
        Ok(())
    }

    /// A previously scraped record for this URL. Records never expire.
    pub async fn get_record(&self, url: &str) -> Result<Option<TranscriptRecord>> {
        let snapshot = self.storage.latest_snapshot();
        let Some(bytes) = snapshot.get_raw(&record_key(url)).await? else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_slice(&bytes).context("deserialize transcript record")?))
    }

    pub async fn put_record(&self, record: &TranscriptRecord) -> Result<()> {
        let snapshot = self.storage.latest_snapshot();
        let mut delta = StateDelta::new(snapshot);
        delta.put_raw(
            record_key(&record.url),
            serde_json::to_vec(record).context("serialize transcript record")?,
        );
        self.storage.commit(delta).await?;
        debug!(url = %record.url, "Transcript record stored");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let snapshot = self.storage.latest_snapshot();
        let mut delta = StateDelta::new(snapshot);
        delta.delete(key.to_string());
        self.storage.commit(delta).await?;
        Ok(())
    }

    async fn keys_under(&self, prefix: &str) -> Vec<String> {
        let snapshot = self.storage.latest_snapshot();
        let mut stream = snapshot.prefix_raw(prefix);
        let mut keys = Vec::new();

        while let Some(entry) = stream.next().await {
            match entry {
                Ok((key, _)) => keys.push(key),
                Err(e) => warn!("Error reading cache stream: {}", e),
            }
        }
        keys
    }

    pub async fn stats(&self) -> Result<CacheStats> {
        Ok(CacheStats {
            analyses: self.keys_under(ANALYSIS_PREFIX).await.len(),
            transcript_sets: self.keys_under(TRANSCRIPTS_PREFIX).await.len(),
            scraped_records: self.keys_under(RECORD_PREFIX).await.len(),
        })
    }

    /// Remove every entry. Returns how many were deleted.
    pub async fn clear(&self) -> Result<usize> {
        let mut keys = Vec::new();
        for prefix in [ANALYSIS_PREFIX, TRANSCRIPTS_PREFIX, RECORD_PREFIX] {
            keys.extend(self.keys_under(prefix).await);
        }

        let snapshot = self.storage.latest_snapshot();
        let mut delta = StateDelta::new(snapshot);
        for key in &keys {
            delta.delete(key.clone());
        }
        self.storage.commit(delta).await?;

        info!(removed = keys.len(), "Cache cleared");
        Ok(keys.len())
    }
}
