use serde::{Deserialize, Serialize};

/// What a cached analysis entry holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheKind {
    Analysis,
    Transcripts,
}

impl CacheKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheKind::Analysis => "analysis",
            CacheKind::Transcripts => "transcripts",
        }
    }
}

/// `{TICKER}_{quarters}_{kind}`
pub fn cache_key(ticker: &str, quarters: usize, kind: CacheKind) -> String {
    format!("{}_{}_{}", ticker.to_uppercase(), quarters, kind.as_str())
}

/// A stored value with the unix second it was written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub stored_at: i64,
    pub value: T,
}

impl<T> CacheEntry<T> {
    pub fn is_expired(&self, now: i64, ttl_secs: u64) -> bool {
        now.saturating_sub(self.stored_at) >= ttl_secs as i64
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
    pub analyses: usize,
    pub transcript_sets: usize,
    pub scraped_records: usize,
}

impl CacheStats {
    pub fn total(&self) -> usize {
        self.analyses + self.transcript_sets + self.scraped_records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_format() {
        assert_eq!(cache_key("nvda", 4, CacheKind::Analysis), "NVDA_4_analysis");
        assert_eq!(cache_key("AMD", 2, CacheKind::Transcripts), "AMD_2_transcripts");
    }

    #[test]
    fn test_expiry() {
        let entry = CacheEntry {
            stored_at: 1_000,
            value: (),
        };
        assert!(!entry.is_expired(1_000 + 3_599, 3_600));
        assert!(entry.is_expired(1_000 + 3_600, 3_600));
        assert!(entry.is_expired(1_000, 0));
    }
}
