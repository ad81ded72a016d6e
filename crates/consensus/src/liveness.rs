//! Per-validator liveness bookkeeping.

use dbft_crypto::EcPoint;
use std::collections::HashMap;

/// Tracks, for each validator, the height of the most recent message
/// seen from it. Feeds the `count_failed` predicate.
#[derive(Debug, Clone, Default)]
pub struct LivenessTracker {
    last_seen: HashMap<EcPoint, u32>,
}

impl LivenessTracker {
    /// An empty tracker: nobody has been heard from.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether no validator has an entry yet.
    pub fn is_empty(&self) -> bool {
        self.last_seen.is_empty()
    }

    /// Records a message from `validator` at `height`. Heights only
    /// ever move forward.
    pub fn note(&mut self, validator: EcPoint, height: u32) {
        let entry = self.last_seen.entry(validator).or_insert(height);
        *entry = (*entry).max(height);
    }

    /// The last height `validator` was heard at, if ever.
    pub fn height_of(&self, validator: &EcPoint) -> Option<u32> {
        self.last_seen.get(validator).copied()
    }

    /// Number of validators never heard from or silent since before
    /// `height − 1`.
    pub fn count_failed(&self, validators: &[EcPoint], height: u32) -> usize {
        let cutoff = height.saturating_sub(1);
        validators
            .iter()
            .filter(|validator| {
                self.last_seen
                    .get(validator)
                    .map_or(true, |&seen| seen < cutoff)
            })
            .count()
    }

    /// Rebuilds the map for a new validator set: entries for validators
    /// still present are carried forward, new validators start at
    /// `height`.
    pub fn rebuild(&mut self, validators: &[EcPoint], height: u32) {
        let mut rebuilt = HashMap::with_capacity(validators.len());
        for validator in validators {
            let seen = self.last_seen.get(validator).copied().unwrap_or(height);
            rebuilt.insert(*validator, seen);
        }
        self.last_seen = rebuilt;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbft_crypto::KeyPair;

    fn keys(count: u8) -> Vec<EcPoint> {
        (1..=count)
            .map(|seed| *KeyPair::from_private_key(&[seed; 32]).unwrap().public_key())
            .collect()
    }

    #[test]
    fn note_keeps_the_maximum() {
        let validators = keys(1);
        let mut tracker = LivenessTracker::new();
        tracker.note(validators[0], 10);
        tracker.note(validators[0], 8);
        assert_eq!(tracker.height_of(&validators[0]), Some(10));
        tracker.note(validators[0], 12);
        assert_eq!(tracker.height_of(&validators[0]), Some(12));
    }

    #[test]
    fn unheard_validators_count_as_failed() {
        let validators = keys(4);
        let tracker = LivenessTracker::new();
        assert_eq!(tracker.count_failed(&validators, 10), 4);
    }

    #[test]
    fn recent_speakers_are_not_failed() {
        let validators = keys(4);
        let mut tracker = LivenessTracker::new();
        tracker.note(validators[0], 10); // current round
        tracker.note(validators[1], 9); // exactly height − 1
        tracker.note(validators[2], 5); // long silent
        assert_eq!(tracker.count_failed(&validators, 10), 2);
    }

    #[test]
    fn rebuild_carries_survivors_forward() {
        let old = keys(4);
        let mut tracker = LivenessTracker::new();
        tracker.note(old[0], 42);
        tracker.note(old[1], 7);

        // Validator 1 drops out, a new one joins.
        let mut new_set = vec![old[0], old[2], old[3]];
        new_set.push(*KeyPair::from_private_key(&[9; 32]).unwrap().public_key());
        tracker.rebuild(&new_set, 100);

        assert_eq!(tracker.height_of(&new_set[0]), Some(42));
        assert_eq!(tracker.height_of(&new_set[1]), Some(100));
        assert_eq!(tracker.height_of(&new_set[3]), Some(100));
        assert_eq!(tracker.height_of(&old[1]), None);
    }
}
