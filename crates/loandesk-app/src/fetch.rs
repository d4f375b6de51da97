// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;

use crate::view::Record;

/// Issues monotonically increasing request tickets. Only the most recent
/// ticket's response may update state; anything older is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RequestSequencer {
    latest: u64,
}

impl RequestSequencer {
    pub fn issue(&mut self) -> u64 {
        self.latest = self.latest.wrapping_add(1).max(1);
        self.latest
    }

    pub const fn latest(&self) -> u64 {
        self.latest
    }

    pub fn is_latest(&self, ticket: u64) -> bool {
        ticket != 0 && ticket == self.latest
    }
}

/// A fetched collection plus its request lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Collection<T> {
    records: Vec<T>,
    loading: bool,
    last_error: Option<String>,
    sequencer: RequestSequencer,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            loading: false,
            last_error: None,
            sequencer: RequestSequencer::default(),
        }
    }
}

impl<T> Collection<T> {
    pub fn records(&self) -> &[T] {
        &self.records
    }

    pub const fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn begin(&mut self) -> u64 {
        self.loading = true;
        self.sequencer.issue()
    }

    /// Applies a response. Returns `false` when `ticket` has been superseded;
    /// the response is then dropped untouched. A failed fetch degrades to an
    /// empty collection.
    pub fn complete(&mut self, ticket: u64, result: Result<Vec<T>>) -> bool {
        if !self.sequencer.is_latest(ticket) {
            tracing::debug!(ticket, latest = self.sequencer.latest(), "dropping stale response");
            return false;
        }

        self.loading = false;
        match result {
            Ok(records) => {
                self.records = records;
                self.last_error = None;
            }
            Err(error) => {
                tracing::warn!(error = %format!("{error:#}"), "fetch failed");
                self.records.clear();
                self.last_error = Some(format!("{error:#}"));
            }
        }
        true
    }

    pub fn replace(&mut self, records: Vec<T>) {
        self.records = records;
        self.last_error = None;
    }
}

impl<T: Record> Collection<T> {
    /// Optimistically drops the record with `id`. Returns whether it was there.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.records.len();
        self.records.retain(|record| record.record_id() != id);
        self.records.len() != before
    }

    pub fn find(&self, id: &str) -> Option<&T> {
        self.records.iter().find(|record| record.record_id() == id)
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut T> {
        self.records.iter_mut().find(|record| record.record_id() == id)
    }
}

#[cfg(test)]
mod tests {
    use super::{Collection, RequestSequencer};
    use crate::view::{FieldValue, Record};
    use anyhow::anyhow;

    #[derive(Debug, Clone, PartialEq)]
    struct Item(&'static str);

    impl Record for Item {
        fn record_id(&self) -> &str {
            self.0
        }

        fn field(&self, path: &str) -> Option<FieldValue> {
            (path == "id").then(|| FieldValue::Text(self.0.to_owned()))
        }
    }

    #[test]
    fn tickets_increase_and_only_latest_matches() {
        let mut sequencer = RequestSequencer::default();
        assert!(!sequencer.is_latest(0));
        let first = sequencer.issue();
        let second = sequencer.issue();
        assert!(second > first);
        assert!(!sequencer.is_latest(first));
        assert!(sequencer.is_latest(second));
    }

    #[test]
    fn stale_response_is_discarded() {
        let mut collection = Collection::default();
        let slow = collection.begin();
        let fast = collection.begin();

        assert!(collection.complete(fast, Ok(vec![Item("new")])));
        assert!(!collection.complete(slow, Ok(vec![Item("old")])));
        assert_eq!(collection.records(), &[Item("new")]);
        assert!(!collection.is_loading());
    }

    #[test]
    fn failure_degrades_to_empty_collection() {
        let mut collection = Collection::default();
        let ticket = collection.begin();
        collection.complete(ticket, Ok(vec![Item("a")]));

        let ticket = collection.begin();
        assert!(collection.is_loading());
        assert!(collection.complete(ticket, Err(anyhow!("connection refused"))));
        assert!(collection.records().is_empty());
        assert!(!collection.is_loading());
        assert_eq!(collection.last_error(), Some("connection refused"));
    }

    #[test]
    fn remove_drops_only_the_target() {
        let mut collection = Collection::default();
        collection.replace(vec![Item("a"), Item("b"), Item("c")]);
        assert!(collection.remove("b"));
        assert!(!collection.remove("b"));
        assert_eq!(collection.records(), &[Item("a"), Item("c")]);
    }
}
