//! The scheduling core: slots, reverse index, and rotating cursor.
//!
//! # Placement
//!
//! `schedule` puts an object into the slot *immediately behind* the cursor.
//! The driver will next reach that slot only after a full revolution minus
//! the portion of the current tick already elapsed, so every newly added
//! object survives at least `N-1` further pointer advances. This is the
//! standard hashed-timing-wheel approximation, not a per-object deadline.
//!
//! # Concurrency
//!
//! Three pieces of shared state:
//!
//! - the slot array, immutable after construction (lookup by position needs
//!   no lock);
//! - the reverse index (`object -> slot id`) enabling O(1) cancellation;
//! - the cursor, written once per tick by the driver and read by `schedule`.
//!
//! Multi-step transitions on a *single* object (detach-then-reinsert on
//! re-arm, drain-then-unindex on expiry) are serialized by a stripe lock
//! keyed by the object's hash. Operations on objects hashing to different
//! stripes proceed fully in parallel. Outside those critical sections the
//! index invariant holds: every indexed object is a member of exactly the
//! slot it maps to, and appears in at most one slot.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use parking_lot::{Mutex, RwLock};

/// Number of per-object exclusion stripes. Power of two so the hash can be
/// masked instead of divided.
const STRIPE_COUNT: usize = 64;

#[derive(Debug)]
pub(crate) struct Wheel<E> {
    slots: Box<[crate::slot::Slot<E>]>,
    index: RwLock<HashMap<E, usize>>,
    cursor: RwLock<usize>,
    stripes: Box<[Mutex<()>]>,
}

impl<E> Wheel<E>
where
    E: Eq + Hash + Clone,
{
    pub(crate) fn new(ticks_per_wheel: usize) -> Self {
        debug_assert!(ticks_per_wheel >= 1, "validated at construction");
        let slots = (0..ticks_per_wheel)
            .map(crate::slot::Slot::new)
            .collect::<Vec<_>>()
            .into_boxed_slice();
        let stripes = (0..STRIPE_COUNT)
            .map(|_| Mutex::new(()))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            slots,
            index: RwLock::new(HashMap::new()),
            cursor: RwLock::new(0),
            stripes,
        }
    }

    pub(crate) fn ticks_per_wheel(&self) -> usize {
        self.slots.len()
    }

    /// Number of objects currently pending.
    pub(crate) fn pending_count(&self) -> usize {
        self.index.read().len()
    }

    /// Current cursor position, `0 <= p < N`.
    pub(crate) fn position(&self) -> usize {
        *self.cursor.read()
    }

    /// Advances the cursor one slot, wrapping at the end of the revolution.
    /// Called only by the driver; the write lock keeps `schedule` from
    /// observing a torn position.
    pub(crate) fn advance(&self) -> usize {
        let mut cursor = self.cursor.write();
        *cursor = (*cursor + 1) % self.slots.len();
        *cursor
    }

    /// Registers `element`, re-arming it if already pending, and returns the
    /// slot it was placed in.
    ///
    /// Re-arming detaches the previous entry first, so at most one slot ever
    /// holds the object and exactly one notification fires per registration.
    pub(crate) fn schedule(&self, element: E) -> usize {
        let _exclusive = self.stripes[self.stripe_of(&element)].lock();

        let previous = self.index.read().get(&element).copied();
        if let Some(slot_id) = previous {
            self.slots[slot_id].remove(&element);
        }

        let target = {
            let cursor = *self.cursor.read();
            (cursor + self.slots.len() - 1) % self.slots.len()
        };
        self.slots[target].insert(element.clone());
        self.index.write().insert(element, target);
        tracing::trace!(slot = target, rearmed = previous.is_some(), "scheduled");
        target
    }

    /// Cancels `element` if pending. Returns whether the slot actually
    /// contained it, guarding the race where the driver drained it between
    /// the index lookup and the detach.
    pub(crate) fn cancel(&self, element: &E) -> bool {
        let _exclusive = self.stripes[self.stripe_of(element)].lock();

        let Some(slot_id) = self.index.write().remove(element) else {
            return false;
        };
        let was_member = self.slots[slot_id].remove(element);
        tracing::trace!(slot = slot_id, was_member, "cancelled");
        was_member
    }

    /// Drains the slot at `position`, returning every object that expired
    /// there.
    ///
    /// Each snapshot member is processed under its stripe lock: the slot
    /// removal, index check, and report form one atomic step, so a
    /// concurrent `cancel` or re-arm of the same object lands entirely
    /// before or entirely after it. An object re-armed before its step
    /// begins is gone from the slot already; it keeps its new entry and
    /// fires later, from the new slot.
    pub(crate) fn drain_expired(&self, position: usize) -> Vec<E> {
        let members = self.slots[position].snapshot();
        if members.is_empty() {
            return Vec::new();
        }

        let mut expired = Vec::with_capacity(members.len());
        for element in members {
            let _exclusive = self.stripes[self.stripe_of(&element)].lock();
            if !self.slots[position].remove(&element) {
                // Lost to a cancel or re-arm sequenced before this step.
                continue;
            }
            let mut index = self.index.write();
            if index.get(&element) == Some(&position) {
                index.remove(&element);
                drop(index);
                expired.push(element);
            }
        }
        if !expired.is_empty() {
            tracing::debug!(position, count = expired.len(), "slot drained");
        }
        expired
    }

    fn stripe_of(&self, element: &E) -> usize {
        let mut hasher = DefaultHasher::new();
        element.hash(&mut hasher);
        (hasher.finish() as usize) & (STRIPE_COUNT - 1)
    }
}

#[cfg(test)]
impl<E> Wheel<E>
where
    E: Eq + Hash + Clone + std::fmt::Debug,
{
    /// Checks the index invariant in both directions: every indexed object
    /// is a member of exactly the slot it maps to, and no slot holds an
    /// object the index does not claim for it.
    pub(crate) fn debug_validate(&self) {
        let index = self.index.read();
        for (element, slot_id) in index.iter() {
            assert!(
                self.slots[*slot_id].contains(element),
                "index maps {element:?} to slot {slot_id} but the slot does not contain it"
            );
        }
        let mut slot_members = 0usize;
        for slot in self.slots.iter() {
            for element in slot.snapshot() {
                slot_members += 1;
                assert_eq!(
                    index.get(&element),
                    Some(&slot.id()),
                    "slot {} holds {element:?} but the index disagrees",
                    slot.id()
                );
            }
        }
        assert_eq!(slot_members, index.len(), "object present in two slots");
    }

    pub(crate) fn slot_contains(&self, slot_id: usize, element: &E) -> bool {
        self.slots[slot_id].contains(element)
    }

    pub(crate) fn slot_len(&self, slot_id: usize) -> usize {
        self.slots[slot_id].len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init_test(name: &str) {
        crate::test_utils::init_test_logging();
        crate::test_phase!(name);
    }

    #[test]
    fn schedule_places_one_behind_cursor() {
        init_test("schedule_places_one_behind_cursor");
        let wheel: Wheel<u32> = Wheel::new(4);
        let slot = wheel.schedule(1);
        crate::assert_with_log!(slot == 3, "behind cursor 0", 3, slot);

        wheel.advance();
        let slot = wheel.schedule(2);
        crate::assert_with_log!(slot == 0, "behind cursor 1", 0, slot);
        wheel.debug_validate();
        crate::test_complete!("schedule_places_one_behind_cursor");
    }

    #[test]
    fn advance_wraps_at_revolution_end() {
        init_test("advance_wraps_at_revolution_end");
        let wheel: Wheel<u32> = Wheel::new(3);
        crate::assert_with_log!(wheel.position() == 0, "initial", 0, wheel.position());
        let first = wheel.advance();
        crate::assert_with_log!(first == 1, "tick 1", 1, first);
        wheel.advance();
        let wrapped = wheel.advance();
        crate::assert_with_log!(wrapped == 0, "wraps to zero", 0, wrapped);
        crate::test_complete!("advance_wraps_at_revolution_end");
    }

    #[test]
    fn rearm_moves_the_single_entry() {
        init_test("rearm_moves_the_single_entry");
        let wheel: Wheel<u32> = Wheel::new(4);
        let first = wheel.schedule(7);
        wheel.advance();
        wheel.advance();
        let second = wheel.schedule(7);

        crate::assert_with_log!(first == 3, "original slot", 3, first);
        crate::assert_with_log!(second == 1, "re-armed slot", 1, second);
        crate::assert_with_log!(
            !wheel.slot_contains(first, &7),
            "old slot vacated",
            false,
            wheel.slot_contains(first, &7)
        );
        crate::assert_with_log!(
            wheel.pending_count() == 1,
            "one entry total",
            1,
            wheel.pending_count()
        );
        wheel.debug_validate();
        crate::test_complete!("rearm_moves_the_single_entry");
    }

    #[test]
    fn cancel_detaches_slot_and_index() {
        init_test("cancel_detaches_slot_and_index");
        let wheel: Wheel<u32> = Wheel::new(4);
        let slot = wheel.schedule(9);
        let removed = wheel.cancel(&9);

        crate::assert_with_log!(removed, "cancel found it", true, removed);
        crate::assert_with_log!(
            wheel.slot_len(slot) == 0,
            "slot emptied",
            0,
            wheel.slot_len(slot)
        );
        crate::assert_with_log!(
            wheel.pending_count() == 0,
            "index emptied",
            0,
            wheel.pending_count()
        );
        wheel.debug_validate();
        crate::test_complete!("cancel_detaches_slot_and_index");
    }

    #[test]
    fn cancel_absent_is_noop() {
        init_test("cancel_absent_is_noop");
        let wheel: Wheel<u32> = Wheel::new(4);
        let removed = wheel.cancel(&42);
        crate::assert_with_log!(!removed, "absent", false, removed);
        let removed_twice = {
            wheel.schedule(42);
            wheel.cancel(&42);
            wheel.cancel(&42)
        };
        crate::assert_with_log!(!removed_twice, "idempotent", false, removed_twice);
        crate::test_complete!("cancel_absent_is_noop");
    }

    #[test]
    fn drain_returns_members_and_clears_index() {
        init_test("drain_returns_members_and_clears_index");
        let wheel: Wheel<u32> = Wheel::new(4);
        let slot = wheel.schedule(1);
        wheel.schedule(2);
        crate::assert_with_log!(slot == 3, "both in slot 3", 3, slot);

        let mut expired = wheel.drain_expired(slot);
        expired.sort_unstable();
        crate::assert_with_log!(expired == vec![1, 2], "both drained", vec![1, 2], expired);
        crate::assert_with_log!(
            wheel.pending_count() == 0,
            "index cleared",
            0,
            wheel.pending_count()
        );
        crate::assert_with_log!(
            wheel.slot_len(slot) == 0,
            "slot cleared",
            0,
            wheel.slot_len(slot)
        );
        wheel.debug_validate();
        crate::test_complete!("drain_returns_members_and_clears_index");
    }

    #[test]
    fn drain_of_empty_slot_is_empty() {
        init_test("drain_of_empty_slot_is_empty");
        let wheel: Wheel<u32> = Wheel::new(4);
        let expired = wheel.drain_expired(0);
        crate::assert_with_log!(expired.is_empty(), "nothing drained", 0, expired.len());
        crate::test_complete!("drain_of_empty_slot_is_empty");
    }

    #[test]
    fn drain_skips_entry_reindexed_elsewhere() {
        init_test("drain_skips_entry_reindexed_elsewhere");
        let wheel: Wheel<u32> = Wheel::new(4);
        // Simulate the window of a concurrent re-arm: the object sits in
        // slot 2 but its index entry already points at slot 1.
        wheel.slots[2].insert(5);
        wheel.index.write().insert(5, 1);

        let expired = wheel.drain_expired(2);
        crate::assert_with_log!(expired.is_empty(), "stale member skipped", 0, expired.len());
        crate::assert_with_log!(
            wheel.pending_count() == 1,
            "newer index entry kept",
            1,
            wheel.pending_count()
        );
        crate::test_complete!("drain_skips_entry_reindexed_elsewhere");
    }

    #[test]
    fn index_invariant_survives_mixed_operations() {
        init_test("index_invariant_survives_mixed_operations");
        let wheel: Wheel<u32> = Wheel::new(8);
        for round in 0u32..5 {
            for id in 0u32..40 {
                wheel.schedule(id);
                if id % 3 == 0 {
                    wheel.cancel(&id);
                }
                if id % 7 == 0 {
                    wheel.schedule(id);
                }
            }
            wheel.advance();
            wheel.drain_expired(wheel.position());
            wheel.debug_validate();
            tracing::debug!(round, pending = wheel.pending_count(), "round complete");
        }
        crate::test_complete!("index_invariant_survives_mixed_operations");
    }

    #[test]
    fn single_slot_wheel_degenerates_gracefully() {
        init_test("single_slot_wheel_degenerates_gracefully");
        let wheel: Wheel<u32> = Wheel::new(1);
        let slot = wheel.schedule(1);
        crate::assert_with_log!(slot == 0, "only slot", 0, slot);
        let expired = wheel.drain_expired(0);
        crate::assert_with_log!(expired == vec![1], "drained", vec![1], expired);
        wheel.debug_validate();
        crate::test_complete!("single_slot_wheel_degenerates_gracefully");
    }

    #[test]
    fn cancel_racing_drain_resolves_to_exactly_one_winner() {
        init_test("cancel_racing_drain_resolves_to_exactly_one_winner");
        use std::sync::Arc;

        // Either the cancel finds the object (and the drain stays silent)
        // or the drain reports it (and the cancel misses); both losing at
        // once would silently swallow a live registration.
        for round in 0u32..200 {
            let wheel: Arc<Wheel<u32>> = Arc::new(Wheel::new(4));
            let slot = wheel.schedule(1);
            let canceller = {
                let wheel = Arc::clone(&wheel);
                std::thread::spawn(move || wheel.cancel(&1))
            };
            let reported = wheel.drain_expired(slot) == vec![1];
            let cancelled = canceller.join().expect("cancel thread");
            assert!(
                cancelled ^ reported,
                "round {round}: cancelled={cancelled} reported={reported}"
            );
            wheel.debug_validate();
        }
        crate::test_complete!("cancel_racing_drain_resolves_to_exactly_one_winner");
    }

    #[test]
    fn concurrent_schedule_and_cancel_keep_invariant() {
        init_test("concurrent_schedule_and_cancel_keep_invariant");
        use std::sync::Arc;

        let wheel: Arc<Wheel<u32>> = Arc::new(Wheel::new(8));
        let mut handles = Vec::new();
        for t in 0u32..4 {
            let wheel = Arc::clone(&wheel);
            handles.push(std::thread::spawn(move || {
                let base = t * 1000;
                for i in 0..200 {
                    let id = base + i;
                    wheel.schedule(id);
                    if i % 2 == 0 {
                        wheel.cancel(&id);
                    }
                }
            }));
        }
        for _ in 0..16 {
            wheel.advance();
            wheel.drain_expired(wheel.position());
        }
        for handle in handles {
            handle.join().expect("worker thread");
        }
        wheel.debug_validate();
        crate::test_complete!("concurrent_schedule_and_cancel_keep_invariant");
    }
}
