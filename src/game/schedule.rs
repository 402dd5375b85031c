//! Simulation-time scheduler.
//!
//! Delayed one-shot actions keyed to simulated seconds. Nothing here reads a
//! clock: when the run is paused, `elapsed` stops and so do pending actions.
//!
//! Keyed entries are last-write-wins: rescheduling a key invalidates the
//! earlier entry, and cancelling a key drops it, so a keyed action fires at
//! most once per schedule call that is still current.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};

use serde::{Deserialize, Serialize};

/// Action to run once its time arrives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScheduledAction {
    /// Reset the player's companion damage multiplier to 1.0
    RestoreCompanionMultiplier,
    /// End the run as a victory
    DeclareVictory,
}

/// Key for actions where only the latest schedule counts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ScheduleKey {
    /// Companion multiplier restore (Rally)
    CompanionRestore,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct Entry {
    at: f32,
    seq: u64,
    action: ScheduledAction,
    key: Option<(ScheduleKey, u64)>,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    // Reversed so the BinaryHeap pops the earliest entry first
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .at
            .total_cmp(&self.at)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Priority queue of actions ordered by simulated time.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Scheduler {
    queue: BinaryHeap<Entry>,
    seq: u64,
    /// Current generation of each pending key
    live: BTreeMap<ScheduleKey, u64>,
}

impl Scheduler {
    /// Run `action` at simulated time `at`.
    pub fn schedule(&mut self, at: f32, action: ScheduledAction) {
        self.push(at, action, None);
    }

    /// Run `action` at `at`, replacing any pending entry under `key`.
    pub fn schedule_keyed(&mut self, key: ScheduleKey, at: f32, action: ScheduledAction) {
        // Generation is the sequence number, unique per push
        let generation = self.seq;
        self.live.insert(key, generation);
        self.push(at, action, Some((key, generation)));
    }

    /// Drop the pending entry under `key`. Returns whether one was pending.
    pub fn cancel(&mut self, key: ScheduleKey) -> bool {
        self.live.remove(&key).is_some()
    }

    /// Whether an entry under `key` is pending.
    pub fn is_pending(&self, key: ScheduleKey) -> bool {
        self.live.contains_key(&key)
    }

    /// Number of queued entries, including superseded ones not yet drained.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Pop every action due at or before `now`, in time order.
    pub fn drain_due(&mut self, now: f32) -> Vec<ScheduledAction> {
        let mut due = Vec::new();
        while let Some(entry) = self.queue.peek() {
            if entry.at > now {
                break;
            }
            let Some(entry) = self.queue.pop() else { break };
            match entry.key {
                Some((key, generation)) => {
                    // Superseded or cancelled entries are skipped
                    if self.live.get(&key) == Some(&generation) {
                        self.live.remove(&key);
                        due.push(entry.action);
                    }
                }
                None => due.push(entry.action),
            }
        }
        due
    }

    fn push(&mut self, at: f32, action: ScheduledAction, key: Option<(ScheduleKey, u64)>) {
        let seq = self.seq;
        self.seq += 1;
        self.queue.push(Entry { at, seq, action, key });
    }
}
