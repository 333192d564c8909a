//! Fixed-capacity history ring.

use std::collections::VecDeque;

use super::HistoryItem;

/// A bounded, append-only ring of [`HistoryItem`]s.
///
/// When full, the oldest item is evicted. A capacity of zero disables
/// recording entirely.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    items: VecDeque<HistoryItem>,
    capacity: usize,
    next_seq: u64,
    last_nanotime: i64,
}

impl HistoryBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity.min(64)),
            capacity,
            next_seq: 1,
            last_nanotime: i64::MIN,
        }
    }

    /// Append `item`, assigning its sequence number.
    ///
    /// The stored timestamp is clamped so it never goes backwards within this
    /// buffer, which keeps `(nanotime, seq)` order equal to insertion order.
    /// Returns the assigned sequence, or `None` if recording is disabled.
    pub fn push(&mut self, mut item: HistoryItem) -> Option<u64> {
        if self.capacity == 0 {
            return None;
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        item.seq = seq;
        item.nanotime = item.nanotime.max(self.last_nanotime);
        self.last_nanotime = item.nanotime;

        if self.items.len() == self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(item);
        Some(seq)
    }

    /// The newest `limit` items, oldest first.
    pub fn latest(&self, limit: usize) -> Vec<HistoryItem> {
        let skip = self.items.len().saturating_sub(limit);
        self.items.iter().skip(skip).cloned().collect()
    }

    /// Items recorded at or after `nanotime`, oldest first.
    pub fn since(&self, nanotime: i64) -> Vec<HistoryItem> {
        let start = self.items.partition_point(|item| item.nanotime < nanotime);
        self.items.range(start..).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::HistoryKind;

    fn item(nanotime: i64, param: &str) -> HistoryItem {
        let mut item = HistoryItem::new(HistoryKind::Nick, "a!u@h", None, vec![param.into()]);
        item.nanotime = nanotime;
        item
    }

    #[test]
    fn evicts_oldest_when_full() {
        let mut buf = HistoryBuffer::new(3);
        for (i, p) in ["a", "b", "c", "d"].iter().enumerate() {
            buf.push(item(i as i64, p));
        }
        assert_eq!(buf.len(), 3);
        let params: Vec<_> = buf.latest(10).into_iter().map(|i| i.params[0].clone()).collect();
        assert_eq!(params, vec!["b", "c", "d"]);
    }

    #[test]
    fn sequence_breaks_timestamp_ties() {
        let mut buf = HistoryBuffer::new(8);
        assert_eq!(buf.push(item(100, "first")), Some(1));
        assert_eq!(buf.push(item(100, "second")), Some(2));

        let items = buf.latest(2);
        assert_eq!(items[0].params[0], "first");
        assert_eq!(items[1].params[0], "second");
        assert!(items[0].seq < items[1].seq);
    }

    #[test]
    fn timestamps_never_go_backwards() {
        let mut buf = HistoryBuffer::new(8);
        buf.push(item(200, "late"));
        buf.push(item(50, "clock skew"));

        let items = buf.latest(2);
        assert_eq!(items[1].nanotime, 200);
        assert_eq!(items[1].params[0], "clock skew");
    }

    #[test]
    fn since_is_inclusive() {
        let mut buf = HistoryBuffer::new(8);
        buf.push(item(10, "a"));
        buf.push(item(20, "b"));
        buf.push(item(30, "c"));

        let params: Vec<_> = buf.since(20).into_iter().map(|i| i.params[0].clone()).collect();
        assert_eq!(params, vec!["b", "c"]);
        assert!(buf.since(31).is_empty());
    }

    #[test]
    fn latest_limits_count() {
        let mut buf = HistoryBuffer::new(8);
        buf.push(item(1, "a"));
        buf.push(item(2, "b"));
        assert_eq!(buf.latest(1)[0].params[0], "b");
        assert!(buf.latest(0).is_empty());
    }

    #[test]
    fn zero_capacity_records_nothing() {
        let mut buf = HistoryBuffer::new(0);
        assert_eq!(buf.push(item(1, "a")), None);
        assert!(buf.is_empty());
        assert_eq!(buf.capacity(), 0);
    }
}
