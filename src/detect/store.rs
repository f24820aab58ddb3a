//! Double-buffered detection store.
//!
//! The hand-off point between the inference worker (producer) and the
//! consumer loop (reader). Two set slots and an active index live behind a
//! single mutex:
//!
//! - the slot at the active index always holds a fully written,
//!   self-consistent detection set;
//! - the other slot is either empty or mid-write by the worker.
//!
//! `publish` writes into the inactive slot and flips the index only after the
//! write completes, so a reader can never observe a partially written set.
//! `read` copies out of the active slot and never waits: a slow inference
//! pass degrades freshness, never read latency. Critical sections are
//! proportional to set size and hold no I/O.

use std::sync::Mutex;

use crate::detect::Detection;

pub struct DetectionStore {
    slots: Mutex<Slots>,
}

struct Slots {
    sets: [Vec<Detection>; 2],
    /// Index of the slot holding the latest complete set.
    active: usize,
}

impl DetectionStore {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(Slots {
                sets: [Vec::new(), Vec::new()],
                active: 0,
            }),
        }
    }

    /// Publish the detection set of one completed inference pass.
    ///
    /// Worker-side only. The inactive slot is cleared, overwritten with the
    /// new set, and then made active. Readers that held the lock before this
    /// call saw the previous set in full; readers after it see the new set in
    /// full.
    pub fn publish(&self, set: &[Detection]) {
        let mut slots = self.slots.lock().unwrap();
        let inactive = 1 - slots.active;
        slots.sets[inactive].clear();
        slots.sets[inactive].extend_from_slice(set);
        slots.active = inactive;
    }

    /// Copy out up to `max_count` detections from the latest published set.
    ///
    /// Never blocks on the worker and never returns a live reference. Before
    /// the first publish this returns the empty set. If the active set holds
    /// more than `max_count` entries the copy is silently truncated to the
    /// first `max_count`; that is a caller capacity bound, not a fault.
    pub fn read(&self, max_count: usize) -> Vec<Detection> {
        let slots = self.slots.lock().unwrap();
        let active = &slots.sets[slots.active];
        active[..active.len().min(max_count)].to_vec()
    }

    /// Bounded copy-out into a caller-supplied buffer.
    ///
    /// Writes up to `out.len()` detections from the latest published set and
    /// returns the number written.
    pub fn read_into(&self, out: &mut [Detection]) -> usize {
        let slots = self.slots.lock().unwrap();
        let active = &slots.sets[slots.active];
        let n = active.len().min(out.len());
        out[..n].copy_from_slice(&active[..n]);
        n
    }

    /// Size of the latest published set.
    pub fn len(&self) -> usize {
        let slots = self.slots.lock().unwrap();
        slots.sets[slots.active].len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for DetectionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{NormBox, PERSON_CLASS_ID};

    fn det(confidence: f32) -> Detection {
        Detection {
            class_id: PERSON_CLASS_ID,
            confidence,
            bbox: NormBox {
                x: 0.5,
                y: 0.5,
                w: 0.1,
                h: 0.2,
            },
        }
    }

    fn set_of(n: usize) -> Vec<Detection> {
        (0..n).map(|i| det(i as f32 / 100.0)).collect()
    }

    #[test]
    fn read_before_first_publish_is_empty() {
        let store = DetectionStore::new();
        assert!(store.read(16).is_empty());
        assert!(store.is_empty());
    }

    #[test]
    fn read_returns_latest_published_set() {
        let store = DetectionStore::new();
        store.publish(&set_of(3));
        store.publish(&set_of(5));
        let got = store.read(16);
        assert_eq!(got.len(), 5);
        assert_eq!(store.len(), 5);
    }

    #[test]
    fn truncation_law() {
        let store = DetectionStore::new();
        let set = set_of(10);
        store.publish(&set);

        // max below, equal to, and above the set size
        assert_eq!(store.read(4).len(), 4);
        assert_eq!(store.read(10).len(), 10);
        assert_eq!(store.read(100).len(), 10);
        assert!(store.read(0).is_empty());

        // truncation keeps the first entries in set order
        let first_four = store.read(4);
        assert_eq!(first_four, set[..4].to_vec());
    }

    #[test]
    fn read_into_respects_buffer_capacity() {
        let store = DetectionStore::new();
        store.publish(&set_of(10));

        let mut small = [det(0.0); 4];
        assert_eq!(store.read_into(&mut small), 4);

        let mut large = [det(0.0); 32];
        assert_eq!(store.read_into(&mut large), 10);

        let mut empty: [Detection; 0] = [];
        assert_eq!(store.read_into(&mut empty), 0);
    }

    #[test]
    fn read_returns_a_copy_not_a_view() {
        let store = DetectionStore::new();
        store.publish(&set_of(2));
        let before = store.read(16);
        store.publish(&set_of(7));
        // the earlier copy is unaffected by the later publish
        assert_eq!(before.len(), 2);
    }

    #[test]
    fn publish_empty_set_clears_reads() {
        let store = DetectionStore::new();
        store.publish(&set_of(4));
        store.publish(&[]);
        assert!(store.read(16).is_empty());
    }
}
