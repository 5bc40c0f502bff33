//! A single wheel position's member set.

use std::collections::HashSet;
use std::hash::Hash;

use parking_lot::RwLock;

/// One position on the wheel: an id plus the set of objects currently
/// assigned to it.
///
/// Membership is an unordered set keyed by the object's own identity; no
/// `Ord` bound is required. Iteration happens over an owned snapshot so the
/// driver's drain never contends with concurrent inserts and removes on the
/// live set. Two slots are equal iff their ids match.
#[derive(Debug)]
pub(crate) struct Slot<E> {
    id: usize,
    elements: RwLock<HashSet<E>>,
}

impl<E> Slot<E>
where
    E: Eq + Hash + Clone,
{
    pub(crate) fn new(id: usize) -> Self {
        Self {
            id,
            elements: RwLock::new(HashSet::new()),
        }
    }

    pub(crate) const fn id(&self) -> usize {
        self.id
    }

    /// Inserts an element. Idempotent: returns false if already present.
    pub(crate) fn insert(&self, element: E) -> bool {
        self.elements.write().insert(element)
    }

    /// Removes an element, reporting whether it was present.
    pub(crate) fn remove(&self, element: &E) -> bool {
        self.elements.write().remove(element)
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, element: &E) -> bool {
        self.elements.read().contains(element)
    }

    /// Returns an owned snapshot of the current members, in no particular
    /// order.
    pub(crate) fn snapshot(&self) -> Vec<E> {
        self.elements.read().iter().cloned().collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.elements.read().len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.elements.read().is_empty()
    }
}

impl<E> PartialEq for Slot<E> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<E> Eq for Slot<E> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn init_test(name: &str) {
        crate::test_utils::init_test_logging();
        crate::test_phase!(name);
    }

    #[test]
    fn insert_is_idempotent() {
        init_test("insert_is_idempotent");
        let slot: Slot<u32> = Slot::new(0);
        let first = slot.insert(7);
        let second = slot.insert(7);
        crate::assert_with_log!(first, "first insert", true, first);
        crate::assert_with_log!(!second, "duplicate insert", false, second);
        crate::assert_with_log!(slot.len() == 1, "single member", 1, slot.len());
        crate::test_complete!("insert_is_idempotent");
    }

    #[test]
    fn remove_reports_presence() {
        init_test("remove_reports_presence");
        let slot: Slot<u32> = Slot::new(0);
        slot.insert(7);
        let present = slot.remove(&7);
        let absent = slot.remove(&7);
        crate::assert_with_log!(present, "member removed", true, present);
        crate::assert_with_log!(!absent, "absent is no-op", false, absent);
        crate::assert_with_log!(slot.is_empty(), "slot empty", true, slot.is_empty());
        crate::test_complete!("remove_reports_presence");
    }

    #[test]
    fn snapshot_is_detached_from_live_set() {
        init_test("snapshot_is_detached_from_live_set");
        let slot: Slot<u32> = Slot::new(0);
        slot.insert(1);
        slot.insert(2);
        let snapshot = slot.snapshot();
        slot.remove(&1);
        slot.remove(&2);
        crate::assert_with_log!(snapshot.len() == 2, "snapshot retained", 2, snapshot.len());
        crate::assert_with_log!(slot.is_empty(), "live set drained", true, slot.is_empty());
        crate::test_complete!("snapshot_is_detached_from_live_set");
    }

    #[test]
    fn equality_is_by_id() {
        init_test("equality_is_by_id");
        let a: Slot<u32> = Slot::new(3);
        let b: Slot<u32> = Slot::new(3);
        let c: Slot<u32> = Slot::new(4);
        a.insert(1);
        crate::assert_with_log!(a == b, "same id equal", true, a == b);
        crate::assert_with_log!(a != c, "different id unequal", true, a != c);
        crate::test_complete!("equality_is_by_id");
    }
}
