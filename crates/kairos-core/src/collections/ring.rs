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

//! Fixed-capacity circular sample storage.

/// A fixed-size circular buffer that overwrites its oldest sample when full.
///
/// Used for rolling metric windows (FPS, frame time, resource pressure) where
/// only the last `N` samples matter and allocation per sample is unacceptable.
#[derive(Debug, Clone)]
pub struct RingBuffer<T, const N: usize> {
    data: [T; N],
    head: usize,
    len: usize,
}

impl<T: Default + Copy, const N: usize> RingBuffer<T, N> {
    /// Creates a new, empty ring buffer.
    pub fn new() -> Self {
        Self {
            data: [T::default(); N],
            head: 0,
            len: 0,
        }
    }

    /// Pushes a sample, overwriting the oldest one once the buffer is full.
    pub fn push(&mut self, value: T) {
        self.data[self.head] = value;
        self.head = (self.head + 1) % N;
        if self.len < N {
            self.len += 1;
        }
    }

    /// Returns the number of samples currently stored.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if no samples have been pushed yet.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns `true` once the buffer has wrapped at least once.
    pub fn is_full(&self) -> bool {
        self.len == N
    }

    /// Returns the most recently pushed sample, if any.
    pub fn last(&self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        Some(self.data[(self.head + N - 1) % N])
    }

    /// Drops all samples without touching the underlying storage.
    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }

    /// Iterates over the samples in chronological order (oldest first).
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        let oldest = if self.len < N { 0 } else { self.head };
        (0..self.len).map(move |i| &self.data[(oldest + i) % N])
    }
}

impl<T: Default + Copy, const N: usize> Default for RingBuffer<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> RingBuffer<f32, N> {
    /// Arithmetic mean of the stored samples, or `0.0` when empty.
    pub fn average(&self) -> f32 {
        if self.len == 0 {
            return 0.0;
        }
        self.iter().sum::<f32>() / self.len as f32
    }

    /// Averages of the first and second half of the window.
    ///
    /// With an odd sample count the middle sample belongs to neither half.
    /// Returns `None` with fewer than two samples.
    pub fn half_averages(&self) -> Option<(f32, f32)> {
        if self.len < 2 {
            return None;
        }
        let half = self.len / 2;
        let first: f32 = self.iter().take(half).sum::<f32>() / half as f32;
        let second: f32 = self.iter().skip(self.len - half).sum::<f32>() / half as f32;
        Some((first, second))
    }

    /// Difference between the second-half and first-half averages.
    ///
    /// Positive when the signal is rising, negative when falling.
    pub fn trend(&self) -> f32 {
        match self.half_averages() {
            Some((first, second)) => second - first,
            None => 0.0,
        }
    }

    /// Population variance of the stored samples.
    ///
    /// High variance in frame times is a strong stutter indicator.
    pub fn variance(&self) -> f32 {
        if self.len < 2 {
            return 0.0;
        }
        let avg = self.average();
        let sum_sq: f32 = self.iter().map(|v| (v - avg) * (v - avg)).sum();
        sum_sq / self.len as f32
    }

    /// Population standard deviation of the stored samples.
    pub fn std_dev(&self) -> f32 {
        self.variance().sqrt()
    }

    /// Smallest stored sample, or `f32::MAX` when empty.
    pub fn min(&self) -> f32 {
        if self.len == 0 {
            return f32::MAX;
        }
        self.iter().copied().fold(f32::MAX, f32::min)
    }

    /// Largest stored sample, or `f32::MIN` when empty.
    pub fn max(&self) -> f32 {
        if self.len == 0 {
            return f32::MIN;
        }
        self.iter().copied().fold(f32::MIN, f32::max)
    }
}
