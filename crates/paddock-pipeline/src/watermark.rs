//! Incremental cut-off per hierarchy level
//!
//! A level's watermark is the latest sync timestamp of its dimension table,
//! mapped into the level's ordering key: the calendar year for seasons, the
//! calendar date for events.

use chrono::{Datelike, NaiveDate, NaiveDateTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Watermark<K> {
    /// Nothing synced yet (or a full run): keep everything
    Unbounded,
    From(K),
}

impl<K: Ord> Watermark<K> {
    pub fn admits(&self, key: &K) -> bool {
        match self {
            Self::Unbounded => true,
            Self::From(mark) => key >= mark,
        }
    }

    /// Sort ascending by `key` (stable) and keep items at or past the mark.
    pub fn apply<T>(&self, mut items: Vec<T>, key: impl Fn(&T) -> K) -> Vec<T> {
        items.sort_by_key(|item| key(item));
        items.retain(|item| self.admits(&key(item)));
        items
    }
}

pub fn season_watermark(last_synced: Option<NaiveDateTime>) -> Watermark<i32> {
    last_synced.map_or(Watermark::Unbounded, |t| Watermark::From(t.year()))
}

pub fn event_watermark(last_synced: Option<NaiveDateTime>) -> Watermark<NaiveDate> {
    last_synced.map_or(Watermark::Unbounded, |t| Watermark::From(t.date()))
}
