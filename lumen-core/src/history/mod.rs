//! In-memory scan history.
//!
//! An insertion-ordered log of past scene reports with favorite/delete
//! mutation and filtered reads. Nothing here touches a clock — relative-age
//! bucketing takes `now` as a parameter so callers (and tests) control time.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{LumenError, Result};
use crate::events::{ScanMode, SceneReport};

/// One saved scan result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// Unique for the lifetime of the cache.
    pub id: Uuid,
    #[serde(flatten)]
    pub report: SceneReport,
    pub is_favorite: bool,
    /// Free-text place tag supplied by the caller, if any.
    pub location: Option<String>,
}

impl HistoryEntry {
    /// Relative-age label of this entry against `now`.
    pub fn relative_age(&self, now: DateTime<Utc>) -> String {
        relative_age(self.report.produced_at, now)
    }
}

/// Read filters. `All` and `FavoritesOnly` plus one per scan mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryFilter {
    All,
    FavoritesOnly,
    ByMode(ScanMode),
}

impl HistoryFilter {
    fn matches(self, entry: &HistoryEntry) -> bool {
        match self {
            HistoryFilter::All => true,
            HistoryFilter::FavoritesOnly => entry.is_favorite,
            HistoryFilter::ByMode(mode) => entry.report.mode == mode,
        }
    }
}

/// Insertion-ordered scan log. All methods take `&self`; interior
/// mutability makes the cache shareable across the session and host.
pub struct ScanHistory {
    entries: RwLock<Vec<HistoryEntry>>,
}

impl ScanHistory {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Append a new entry. Prior entries are never touched.
    pub fn record(&self, report: SceneReport, location: Option<String>) -> HistoryEntry {
        let entry = HistoryEntry {
            id: Uuid::new_v4(),
            report,
            is_favorite: false,
            location,
        };
        debug!(id = %entry.id, mode = %entry.report.mode, "history entry recorded");
        self.entries.write().push(entry.clone());
        entry
    }

    /// Flip the favorite flag. Returns the new state.
    ///
    /// # Errors
    /// `LumenError::NotFound` if no entry has `id`.
    pub fn toggle_favorite(&self, id: Uuid) -> Result<bool> {
        let mut entries = self.entries.write();
        let entry = entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(LumenError::NotFound { id: id.to_string() })?;
        entry.is_favorite = !entry.is_favorite;
        Ok(entry.is_favorite)
    }

    /// Delete one entry. Other entries keep their ids and order.
    ///
    /// # Errors
    /// `LumenError::NotFound` if no entry has `id`.
    pub fn remove(&self, id: Uuid) -> Result<()> {
        let mut entries = self.entries.write();
        let idx = entries
            .iter()
            .position(|e| e.id == id)
            .ok_or(LumenError::NotFound { id: id.to_string() })?;
        entries.remove(idx);
        Ok(())
    }

    /// Remove every entry. Irreversible. Returns how many were dropped.
    pub fn clear(&self) -> usize {
        let mut entries = self.entries.write();
        let dropped = entries.len();
        entries.clear();
        info!(dropped, "scan history cleared");
        dropped
    }

    /// Snapshot of matching entries in insertion order. Pure read.
    pub fn filter(&self, filter: HistoryFilter) -> Vec<HistoryEntry> {
        self.entries
            .read()
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect()
    }

    /// Matching-entry count without cloning.
    pub fn count(&self, filter: HistoryFilter) -> usize {
        self.entries.read().iter().filter(|e| filter.matches(e)).count()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Default for ScanHistory {
    fn default() -> Self {
        Self::new()
    }
}

/// Bucket a timestamp's age against `now`:
/// under a minute → "Just now", under an hour → "Nm ago", under a day →
/// "Nh ago", otherwise "Nd ago". Floor division throughout; a timestamp at
/// or past `now` buckets as "Just now".
pub fn relative_age(produced_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let minutes = (now - produced_at).num_minutes();
    if minutes < 1 {
        "Just now".to_string()
    } else if minutes < 60 {
        format!("{minutes}m ago")
    } else if minutes < 1440 {
        format!("{}h ago", minutes / 60)
    } else {
        format!("{}d ago", minutes / 1440)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Duration;

    fn report(mode: ScanMode, description: &str) -> SceneReport {
        SceneReport {
            mode,
            description: description.into(),
            confidence: 92,
            produced_at: Utc::now(),
            language: Some("en".into()),
        }
    }

    #[test]
    fn record_then_filter_preserves_insertion_order() {
        let history = ScanHistory::new();
        let first = history.record(report(ScanMode::Objects, "first"), None);
        let second = history.record(report(ScanMode::Text, "second"), None);

        let all = history.filter(HistoryFilter::All);
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, first.id);
        assert_eq!(all[1].id, second.id);

        history.remove(first.id).expect("remove first");
        let all = history.filter(HistoryFilter::All);
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, second.id);

        // Removing again fails — the id is gone for good.
        assert!(matches!(
            history.remove(first.id),
            Err(LumenError::NotFound { .. })
        ));
    }

    #[test]
    fn record_never_mutates_prior_entries() {
        let history = ScanHistory::new();
        let first = history.record(report(ScanMode::Faces, "one person"), Some("lobby".into()));
        history.record(report(ScanMode::Faces, "two people"), None);

        let all = history.filter(HistoryFilter::All);
        assert_eq!(all[0].id, first.id);
        assert_eq!(all[0].report.description, "one person");
        assert_eq!(all[0].location.as_deref(), Some("lobby"));
    }

    #[test]
    fn ids_are_unique() {
        let history = ScanHistory::new();
        let a = history.record(report(ScanMode::Objects, "a"), None);
        let b = history.record(report(ScanMode::Objects, "a"), None);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn toggle_favorite_flips_and_reports_state() {
        let history = ScanHistory::new();
        let entry = history.record(report(ScanMode::Navigation, "stairs"), None);

        assert!(history.toggle_favorite(entry.id).expect("toggle on"));
        assert!(!history.toggle_favorite(entry.id).expect("toggle off"));

        assert!(matches!(
            history.toggle_favorite(Uuid::new_v4()),
            Err(LumenError::NotFound { .. })
        ));
    }

    #[test]
    fn filters_select_favorites_and_modes() {
        let history = ScanHistory::new();
        let fav = history.record(report(ScanMode::Objects, "table"), None);
        history.record(report(ScanMode::Text, "sign"), None);
        history.record(report(ScanMode::Text, "menu"), None);
        history.toggle_favorite(fav.id).expect("toggle");

        assert_eq!(history.count(HistoryFilter::All), 3);
        assert_eq!(history.count(HistoryFilter::FavoritesOnly), 1);
        assert_eq!(history.count(HistoryFilter::ByMode(ScanMode::Text)), 2);
        assert_eq!(history.count(HistoryFilter::ByMode(ScanMode::Faces)), 0);

        let favorites = history.filter(HistoryFilter::FavoritesOnly);
        assert_eq!(favorites[0].id, fav.id);
    }

    #[test]
    fn clear_removes_everything() {
        let history = ScanHistory::new();
        history.record(report(ScanMode::Objects, "a"), None);
        history.record(report(ScanMode::Text, "b"), None);

        assert_eq!(history.clear(), 2);
        assert!(history.is_empty());
        assert_eq!(history.clear(), 0);
    }

    #[test]
    fn relative_age_buckets() {
        let now = Utc::now();
        let age = |delta: Duration| relative_age(now - delta, now);

        assert_eq!(age(Duration::seconds(30)), "Just now");
        assert_eq!(age(Duration::minutes(45)), "45m ago");
        assert_eq!(age(Duration::hours(5)), "5h ago");
        assert_eq!(age(Duration::days(3)), "3d ago");
    }

    #[test]
    fn relative_age_bucket_boundaries_use_floor_division() {
        let now = Utc::now();
        let age = |delta: Duration| relative_age(now - delta, now);

        assert_eq!(age(Duration::seconds(59)), "Just now");
        assert_eq!(age(Duration::seconds(60)), "1m ago");
        assert_eq!(age(Duration::minutes(59)), "59m ago");
        assert_eq!(age(Duration::minutes(60)), "1h ago");
        assert_eq!(age(Duration::minutes(1439)), "23h ago");
        assert_eq!(age(Duration::minutes(1440)), "1d ago");
        assert_eq!(age(Duration::hours(49)), "2d ago");
    }

    #[test]
    fn relative_age_of_future_timestamp_is_just_now() {
        let now = Utc::now();
        assert_eq!(relative_age(now + Duration::minutes(5), now), "Just now");
    }
}
