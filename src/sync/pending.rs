use std::collections::{HashMap, VecDeque};

#[derive(Debug)]
struct PendingWrite<T> {
    /// Last value the store is known to hold.
    confirmed: T,
    /// Value applied locally by each write still in flight, oldest first.
    in_flight: VecDeque<T>,
}

/// Entities with a local change the store has not confirmed yet.
///
/// Writes for one entity settle in the order they began. Each settled write
/// becomes the new restore point. `rollback` only restores while local state
/// still shows the latest optimistic value; if a newer snapshot has replaced
/// it, the snapshot stands.
#[derive(Debug)]
pub struct PendingWrites<T> {
    entries: HashMap<String, PendingWrite<T>>,
}

impl<T> Default for PendingWrites<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<T: Clone + PartialEq> PendingWrites<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self, id: &str, before: T, optimistic: T) {
        self.entries
            .entry(id.to_string())
            .or_insert_with(|| PendingWrite {
                confirmed: before,
                in_flight: VecDeque::new(),
            })
            .in_flight
            .push_back(optimistic);
    }

    /// The store confirmed the oldest write in flight.
    pub fn settle(&mut self, id: &str) {
        let Some(entry) = self.entries.get_mut(id) else {
            return;
        };
        if let Some(confirmed) = entry.in_flight.pop_front() {
            entry.confirmed = confirmed;
        }
        if entry.in_flight.is_empty() {
            self.entries.remove(id);
        }
    }

    /// A write failed. Returns the last confirmed value to restore, if local
    /// state is still ours to undo.
    pub fn rollback(&mut self, id: &str, current: Option<&T>) -> Option<T> {
        let entry = self.entries.remove(id)?;
        match (current, entry.in_flight.back()) {
            (Some(current), Some(latest)) if current == latest => Some(entry.confirmed),
            _ => None,
        }
    }

    pub fn is_pending(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settle_clears_marker() {
        let mut pending = PendingWrites::new();
        pending.begin("g1", 1, 2);
        assert!(pending.is_pending("g1"));
        pending.settle("g1");
        assert!(!pending.is_pending("g1"));
        assert!(pending.is_empty());
    }

    #[test]
    fn test_rollback_restores_before_value() {
        let mut pending = PendingWrites::new();
        pending.begin("g1", 1, 2);
        assert_eq!(pending.rollback("g1", Some(&2)), Some(1));
        assert!(!pending.is_pending("g1"));
    }

    #[test]
    fn test_rollback_yields_to_newer_snapshot() {
        let mut pending = PendingWrites::new();
        pending.begin("g1", 1, 2);
        // a snapshot replaced local state with 7 meanwhile
        assert_eq!(pending.rollback("g1", Some(&7)), None);
        assert_eq!(pending.rollback("g1", Some(&2)), None);
    }

    #[test]
    fn test_chained_writes_roll_back_to_last_confirmed() {
        let mut pending = PendingWrites::new();
        pending.begin("g1", 1, 2);
        pending.begin("g1", 2, 3);
        assert_eq!(pending.len(), 1);

        // The first write landed, so the store now holds 2.
        pending.settle("g1");
        assert!(pending.is_pending("g1"));
        assert_eq!(pending.rollback("g1", Some(&3)), Some(2));
    }

    #[test]
    fn test_chained_writes_fail_before_any_settles() {
        let mut pending = PendingWrites::new();
        pending.begin("g1", 1, 2);
        pending.begin("g1", 2, 3);
        assert_eq!(pending.rollback("g1", Some(&3)), Some(1));
    }

    #[test]
    fn test_all_chained_writes_settle() {
        let mut pending = PendingWrites::new();
        pending.begin("g1", 1, 2);
        pending.begin("g1", 2, 3);
        pending.settle("g1");
        pending.settle("g1");
        assert!(!pending.is_pending("g1"));
        assert_eq!(pending.rollback("g1", Some(&3)), None);
    }

    #[test]
    fn test_rollback_of_removed_entity() {
        let mut pending: PendingWrites<i32> = PendingWrites::new();
        pending.begin("n1", 1, 2);
        assert_eq!(pending.rollback("n1", None), None);
    }
}
