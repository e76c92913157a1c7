// SPDX-FileCopyrightText: 2026 Notebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-user FIFO lanes.
//!
//! A lane exists while its user has queued or in-flight events and is
//! drained by exactly one worker task. Events claimed in later poll cycles
//! join the back of an existing lane, so a user's events run strictly in
//! arrival order no matter how many cycles they span.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};

use notebot_core::Event;

#[derive(Default)]
struct State {
    queues: HashMap<i64, VecDeque<Event>>,
    /// Ids queued or in flight. A claim that goes stale while its event
    /// waits in a lane is reclaimed by the next poll and must not run twice.
    held: HashSet<i64>,
}

#[derive(Default)]
pub struct Lanes {
    state: Mutex<State>,
}

impl Lanes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `events` to the user's lane, skipping any already held.
    ///
    /// Returns `true` when the lane was idle, in which case the caller must
    /// start a worker for it.
    pub fn push(&self, user_id: i64, events: Vec<Event>) -> bool {
        let mut state = self.lock();
        let fresh: Vec<Event> = events
            .into_iter()
            .filter(|event| state.held.insert(event.id))
            .collect();
        match state.queues.get_mut(&user_id) {
            Some(queue) => {
                queue.extend(fresh);
                false
            }
            None if fresh.is_empty() => false,
            None => {
                state.queues.insert(user_id, fresh.into());
                true
            }
        }
    }

    /// Takes the next event for `user_id`, closing the lane when it is empty.
    ///
    /// Once this returns `None` the worker must exit; the next `push` opens
    /// a fresh lane.
    pub fn next(&self, user_id: i64) -> Option<Event> {
        let mut state = self.lock();
        let queue = state.queues.get_mut(&user_id)?;
        match queue.pop_front() {
            Some(event) => Some(event),
            None => {
                state.queues.remove(&user_id);
                None
            }
        }
    }

    /// Forgets a finished event so a later claim of the same id is accepted.
    pub fn release(&self, event_id: i64) {
        self.lock().held.remove(&event_id);
    }

    /// Number of users with an open lane.
    pub fn active(&self) -> usize {
        self.lock().queues.len()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A panic while holding the lock cannot leave the state half-updated.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Groups a claimed batch by owner, keeping arrival order within each group.
///
/// Groups are returned in order of each user's first event.
pub fn partition_by_user(events: Vec<Event>) -> Vec<(i64, Vec<Event>)> {
    let mut groups: Vec<(i64, Vec<Event>)> = Vec::new();
    let mut index: HashMap<i64, usize> = HashMap::new();
    for event in events {
        let slot = *index.entry(event.owner_user_id).or_insert_with(|| {
            groups.push((event.owner_user_id, Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(event);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use notebot_core::{EventKind, StatusMessageRef};

    fn event(id: i64, user: i64) -> Event {
        Event {
            id,
            owner_user_id: user,
            kind: EventKind::Text,
            payload: serde_json::json!({ "text": id.to_string() }),
            status_message: StatusMessageRef {
                chat_id: user,
                message_id: id,
            },
            download_task_id: None,
            created_at: format!("2026-01-01T00:00:{id:02}.000Z"),
            claimed_at: None,
            claim_token: None,
        }
    }

    #[test]
    fn partition_preserves_per_user_order() {
        let groups = partition_by_user(vec![event(1, 7), event(2, 8), event(3, 7), event(4, 8)]);
        let ids: Vec<(i64, Vec<i64>)> = groups
            .into_iter()
            .map(|(user, events)| (user, events.iter().map(|e| e.id).collect()))
            .collect();
        assert_eq!(ids, vec![(7, vec![1, 3]), (8, vec![2, 4])]);
    }

    #[test]
    fn push_to_busy_lane_does_not_request_a_worker() {
        let lanes = Lanes::new();
        assert!(lanes.push(7, vec![event(1, 7)]));
        assert!(!lanes.push(7, vec![event(2, 7)]));
        assert_eq!(lanes.active(), 1);

        assert_eq!(lanes.next(7).map(|e| e.id), Some(1));
        assert_eq!(lanes.next(7).map(|e| e.id), Some(2));
        assert!(lanes.next(7).is_none());
        assert_eq!(lanes.active(), 0);

        // The drained lane was closed, so the next push opens a new one.
        assert!(lanes.push(7, vec![event(3, 7)]));
    }

    #[test]
    fn held_events_are_not_queued_twice() {
        let lanes = Lanes::new();
        assert!(lanes.push(7, vec![event(1, 7)]));
        let first = lanes.next(7).map(|e| e.id);
        assert_eq!(first, Some(1));

        // Reclaimed while still in flight.
        assert!(!lanes.push(7, vec![event(1, 7), event(2, 7)]));
        assert_eq!(lanes.next(7).map(|e| e.id), Some(2));
        assert!(lanes.next(7).is_none());

        lanes.release(1);
        assert!(lanes.push(7, vec![event(1, 7)]));
    }

    #[test]
    fn next_on_unknown_user_is_none() {
        assert!(Lanes::new().next(1).is_none());
    }
}
