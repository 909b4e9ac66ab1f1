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

/// A simple wall-clock stopwatch that starts on creation.
///
/// Used to time phases of the frame (update, render) and anywhere a scope
/// duration feeds a metric.
#[derive(Debug, Clone)]
pub struct Stopwatch {
    start_time: Option<Instant>,
}

impl Stopwatch {
    /// Creates a stopwatch and starts it immediately.
    #[inline]
    pub fn new() -> Self {
        Self {
            start_time: Some(Instant::now()),
        }
    }

    /// The elapsed time since the stopwatch was started.
    #[inline]
    pub fn elapsed(&self) -> Option<Duration> {
        self.start_time.map(|start| start.elapsed())
    }

    /// The elapsed time in whole milliseconds.
    #[inline]
    pub fn elapsed_ms(&self) -> Option<u64> {
        self.elapsed().map(|d| d.as_millis() as u64)
    }

    /// The elapsed time in seconds as an `f64`.
    #[inline]
    pub fn elapsed_secs_f64(&self) -> Option<f64> {
        self.elapsed().map(|d| d.as_secs_f64())
    }
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    const SLEEP_DURATION_MS: u64 = 50;
    const SLEEP_MARGIN_MS: u64 = 200;

    #[test]
    fn stopwatch_creation_starts_timer() {
        let watch = Stopwatch::new();
        assert!(watch.elapsed().is_some());
        assert!(watch.elapsed_ms().is_some());
        assert!(watch.elapsed_secs_f64().is_some());
    }

    #[test]
    fn stopwatch_elapsed_time_after_delay() {
        let watch = Stopwatch::new();
        thread::sleep(Duration::from_millis(SLEEP_DURATION_MS));

        let elapsed_ms = watch.elapsed_ms().expect("elapsed after sleep");
        assert!(
            elapsed_ms >= SLEEP_DURATION_MS,
            "Elapsed ms ({elapsed_ms}) should be >= sleep duration ({SLEEP_DURATION_MS})"
        );
        assert!(
            elapsed_ms < SLEEP_DURATION_MS + SLEEP_MARGIN_MS,
            "Elapsed ms ({elapsed_ms}) should be < sleep duration + margin"
        );
    }

    #[test]
    fn stopwatch_implements_default() {
        let watch = Stopwatch::default();
        assert!(watch.elapsed().is_some());
    }

    #[test]
    fn stopwatch_clone_shares_start_time() {
        let watch1 = Stopwatch::new();
        thread::sleep(Duration::from_millis(10));
        let watch2 = watch1.clone();

        let elapsed1 = watch1.elapsed().unwrap();
        let elapsed2 = watch2.elapsed().unwrap();
        let difference = if elapsed1 > elapsed2 {
            elapsed1 - elapsed2
        } else {
            elapsed2 - elapsed1
        };
        assert!(
            difference < Duration::from_millis(1),
            "Clones should report the same start time (diff: {difference:?})"
        );
    }
}
