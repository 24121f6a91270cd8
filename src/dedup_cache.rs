use chrono::{DateTime, Utc};
use moka::future::Cache;
use std::time::Duration;

/// Process-wide record of when each CNPJ was last looked up successfully.
///
/// Cloning is cheap and every clone shares the same entries, so concurrent
/// uploads see each other's cooldown decisions. Entries expire after the
/// cooldown and the cache is capacity-bounded.
///
/// Checking and marking are separate steps: two runs racing on the same
/// identifier can both look it up once. That costs a duplicate request and
/// nothing else.
#[derive(Clone)]
pub struct DedupCache {
    entries: Cache<String, DateTime<Utc>>,
    cooldown: Duration,
}

impl DedupCache {
    pub fn new(cooldown: Duration, max_capacity: u64) -> Self {
        let entries = Cache::builder()
            .time_to_live(cooldown.max(Duration::from_secs(1)))
            .max_capacity(max_capacity)
            .build();

        Self { entries, cooldown }
    }

    /// Whether `id` was looked up within the cooldown window.
    pub async fn should_skip(&self, id: &str) -> bool {
        self.should_skip_at(id, Utc::now()).await
    }

    /// Same as [`should_skip`](Self::should_skip) but against an explicit clock reading.
    pub async fn should_skip_at(&self, id: &str, now: DateTime<Utc>) -> bool {
        let Some(last) = self.entries.get(id).await else {
            return false;
        };

        // A timestamp from the future counts as recent.
        match now.signed_duration_since(last).to_std() {
            Ok(age) => age < self.cooldown,
            Err(_) => true,
        }
    }

    pub async fn mark_processed(&self, id: &str) {
        self.mark_processed_at(id, Utc::now()).await;
    }

    pub async fn mark_processed_at(&self, id: &str, at: DateTime<Utc>) {
        self.entries.insert(id.to_string(), at).await;
    }

    /// Approximate number of live entries.
    pub async fn entry_count(&self) -> u64 {
        self.entries.run_pending_tasks().await;
        self.entries.entry_count()
    }
}
