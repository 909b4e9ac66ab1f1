// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::time::{Duration, Instant};

struct Deferred<T> {
    due: Instant,
    task: T,
}

/// A queue of tasks that become ready at a future instant.
///
/// The engine loop polls the queue once per tick with the current frame
/// timestamp, so tasks fire cooperatively on the engine thread rather than
/// from a timer thread. Tasks that share a due instant fire in the order
/// they were scheduled.
pub struct TaskQueue<T> {
    entries: Vec<Deferred<T>>,
}

impl<T> TaskQueue<T> {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Schedules `task` to become ready at `due`.
    pub fn schedule_at(&mut self, due: Instant, task: T) {
        self.entries.push(Deferred { due, task });
    }

    /// Schedules `task` to become ready `delay` from now.
    pub fn schedule_after(&mut self, delay: Duration, task: T) {
        self.schedule_at(Instant::now() + delay, task);
    }

    /// Removes and returns every task whose due instant is at or before
    /// `now`, preserving scheduling order.
    pub fn poll(&mut self, now: Instant) -> Vec<T> {
        if self.entries.is_empty() {
            return Vec::new();
        }
        let mut ready = Vec::new();
        let mut pending = Vec::new();
        for entry in self.entries.drain(..) {
            if entry.due <= now {
                ready.push(entry.task);
            } else {
                pending.push(entry);
            }
        }
        self.entries = pending;
        ready
    }

    /// The earliest due instant among pending tasks.
    pub fn next_due(&self) -> Option<Instant> {
        self.entries.iter().map(|entry| entry.due).min()
    }

    /// The number of pending tasks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the queue holds no pending tasks.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops all pending tasks without running them.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<T> Default for TaskQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poll_returns_only_due_tasks() {
        let now = Instant::now();
        let mut queue = TaskQueue::new();
        queue.schedule_at(now, "immediate");
        queue.schedule_at(now + Duration::from_millis(10), "later");

        let ready = queue.poll(now);
        assert_eq!(ready, vec!["immediate"]);
        assert_eq!(queue.len(), 1);

        let ready = queue.poll(now + Duration::from_millis(10));
        assert_eq!(ready, vec!["later"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn poll_preserves_scheduling_order() {
        let now = Instant::now();
        let mut queue = TaskQueue::new();
        queue.schedule_at(now + Duration::from_millis(5), 1);
        queue.schedule_at(now, 2);
        queue.schedule_at(now + Duration::from_millis(5), 3);

        let ready = queue.poll(now + Duration::from_millis(5));
        assert_eq!(ready, vec![1, 2, 3]);
    }

    #[test]
    fn next_due_reports_earliest_pending() {
        let now = Instant::now();
        let mut queue = TaskQueue::new();
        assert_eq!(queue.next_due(), None);

        queue.schedule_at(now + Duration::from_millis(20), ());
        queue.schedule_at(now + Duration::from_millis(5), ());
        assert_eq!(queue.next_due(), Some(now + Duration::from_millis(5)));
    }

    #[test]
    fn clear_drops_pending_tasks() {
        let now = Instant::now();
        let mut queue = TaskQueue::new();
        queue.schedule_at(now, ());
        queue.schedule_after(Duration::from_secs(1), ());
        assert_eq!(queue.len(), 2);

        queue.clear();
        assert!(queue.is_empty());
        assert!(queue.poll(now + Duration::from_secs(2)).is_empty());
    }
}
