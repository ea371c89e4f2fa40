// Adapter-owned caches
//
// Each adapter owns one `SourceState`; only the adapter mutates it, always
// through `&mut self`, after its network calls have returned.

use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use super::SourceConfig;
use crate::magnet::Magnet;
use crate::models::{AvailabilityEntry, CloudDownload, CloudMagnet};

#[derive(Debug, Clone, Default)]
pub struct SourceState {
    settings: SourceConfig,
    availability: Vec<AvailabilityEntry>,
    cloud_magnets: Vec<CloudMagnet>,
    cloud_downloads: Vec<CloudDownload>,
    cloud_expires_at: Option<DateTime<Utc>>,
}

pub(crate) fn expiry_after(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(ttl)
        .ok()
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

impl SourceState {
    #[must_use]
    pub fn new(settings: SourceConfig) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn settings(&self) -> &SourceConfig {
        &self.settings
    }

    /// Expiry stamp for entries created now
    #[must_use]
    pub fn availability_expiry(&self) -> DateTime<Utc> {
        expiry_after(Utc::now(), self.settings.availability_ttl())
    }

    /// Evict expired entries for `magnets` and return the magnets that need
    /// a lookup: hashed, not cached, first occurrence only
    pub fn take_stale(&mut self, magnets: &[Magnet], now: DateTime<Utc>) -> Vec<Magnet> {
        let requested: HashSet<&str> = magnets.iter().filter_map(|m| m.hash.as_deref()).collect();
        let before = self.availability.len();
        self.availability
            .retain(|entry| !(entry.is_expired(now) && entry.hash().is_some_and(|h| requested.contains(h))));

        let evicted = before - self.availability.len();
        if evicted > 0 {
            tracing::debug!(evicted, "Evicted expired availability entries");
        }

        let cached: HashSet<&str> = self.availability.iter().filter_map(AvailabilityEntry::hash).collect();
        let mut seen = HashSet::new();
        magnets
            .iter()
            .filter(|m| {
                m.hash
                    .as_deref()
                    .is_some_and(|h| !cached.contains(h) && seen.insert(h.to_string()))
            })
            .cloned()
            .collect()
    }

    /// Store fresh entries, replacing any entry for the same hash
    pub fn insert_entries(&mut self, entries: Vec<AvailabilityEntry>) {
        for entry in entries {
            match self.availability.iter_mut().find(|e| e.hash() == entry.hash()) {
                Some(existing) => *existing = entry,
                None => self.availability.push(entry),
            }
        }
    }

    #[must_use]
    pub fn entry_for(&self, hash: &str) -> Option<&AvailabilityEntry> {
        self.availability.iter().find(|e| e.hash() == Some(hash))
    }

    #[must_use]
    pub fn entries(&self) -> &[AvailabilityEntry] {
        &self.availability
    }

    pub fn clear_availability(&mut self) {
        self.availability.clear();
    }

    #[must_use]
    pub fn cloud_magnets(&self) -> &[CloudMagnet] {
        &self.cloud_magnets
    }

    #[must_use]
    pub fn cloud_downloads(&self) -> &[CloudDownload] {
        &self.cloud_downloads
    }

    #[must_use]
    pub fn cloud_is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.cloud_expires_at.is_some_and(|expires| now < expires)
    }

    pub fn set_cloud(&mut self, magnets: Vec<CloudMagnet>, downloads: Vec<CloudDownload>, now: DateTime<Utc>) {
        self.cloud_magnets = magnets;
        self.cloud_downloads = downloads;
        self.cloud_expires_at = Some(expiry_after(now, self.settings.cloud_ttl()));
    }

    /// Drop every cached listing (used on logout)
    pub fn reset(&mut self) {
        self.availability.clear();
        self.cloud_magnets.clear();
        self.cloud_downloads.clear();
        self.cloud_expires_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceId;

    const HASH: &str = "af1b2c3d4e5f60718293a4b5c6d7e8f901234567";

    fn entry(hash: &str, expires_at: DateTime<Utc>) -> AvailabilityEntry {
        AvailabilityEntry {
            magnet: Magnet::from_hash(hash),
            source: SourceId::TorBox,
            expires_at,
            files: Vec::new(),
        }
    }

    #[test]
    fn test_fresh_entry_is_not_requeried() {
        let now = Utc::now();
        let mut state = SourceState::new(SourceConfig::default());
        state.insert_entries(vec![entry(HASH, now + TimeDelta::seconds(60))]);

        assert!(state.take_stale(&[Magnet::from_hash(HASH)], now).is_empty());
        assert!(state.entry_for(HASH).is_some());
    }

    #[test]
    fn test_expired_entry_is_evicted() {
        let now = Utc::now();
        let mut state = SourceState::new(SourceConfig::default());
        state.insert_entries(vec![entry(HASH, now)]);

        let stale = state.take_stale(&[Magnet::from_hash(HASH)], now);
        assert_eq!(stale.len(), 1);
        assert!(state.entry_for(HASH).is_none());
    }

    #[test]
    fn test_unhashed_and_duplicate_magnets_are_skipped() {
        let mut state = SourceState::new(SourceConfig::default());
        let magnets = [Magnet::from_hash(HASH), Magnet::default(), Magnet::from_hash(&HASH.to_uppercase())];
        assert_eq!(state.take_stale(&magnets, Utc::now()).len(), 1);
    }

    #[test]
    fn test_cloud_ttl() {
        let now = Utc::now();
        let mut state = SourceState::new(SourceConfig {
            cloud_ttl_secs: 300,
            ..SourceConfig::default()
        });
        assert!(!state.cloud_is_fresh(now));

        state.set_cloud(Vec::new(), Vec::new(), now);
        assert!(state.cloud_is_fresh(now + TimeDelta::seconds(299)));
        assert!(!state.cloud_is_fresh(now + TimeDelta::seconds(300)));

        state.reset();
        assert!(!state.cloud_is_fresh(now));
    }
}
