//! Rolling-window rate limiter for collaborator calls.
//!
//! The discovery/enrichment loop is single-threaded with respect to
//! collaborator calls, so a plain counter suffices; a concurrent reimplementation
//! would need to put this behind a mutex with the same windowed semantics.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Token-bucket-like counter over a rolling window.
#[derive(Debug)]
pub struct RateLimiter {
    window: Duration,
    max_requests: usize,
    timestamps: VecDeque<Instant>,
}

impl RateLimiter {
    /// Limiter allowing `max_requests` per rolling 60-second window.
    pub fn per_minute(max_requests: usize) -> Self {
        Self::new(max_requests, Duration::from_secs(60))
    }

    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            window,
            max_requests: max_requests.max(1),
            timestamps: VecDeque::new(),
        }
    }

    /// Wait until a request slot is available, then claim it.
    pub async fn acquire(&mut self) {
        loop {
            let now = Instant::now();
            self.evict(now);
            if self.timestamps.len() < self.max_requests {
                self.timestamps.push_back(now);
                return;
            }
            // Sleep until the oldest entry leaves the window
            let oldest = self.timestamps[0];
            let wait = self.window.saturating_sub(now.duration_since(oldest));
            log::debug!("Rate limit reached, waiting {}ms", wait.as_millis());
            tokio::time::sleep(wait.max(Duration::from_millis(10))).await;
        }
    }

    /// Claim a slot if one is free, without waiting.
    pub fn try_acquire(&mut self) -> bool {
        let now = Instant::now();
        self.evict(now);
        if self.timestamps.len() < self.max_requests {
            self.timestamps.push_back(now);
            true
        } else {
            false
        }
    }

    /// Requests currently counted against the window.
    pub fn in_window(&mut self) -> usize {
        self.evict(Instant::now());
        self.timestamps.len()
    }

    fn evict(&mut self, now: Instant) {
        while let Some(&front) = self.timestamps.front() {
            if now.duration_since(front) >= self.window {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }
    }
}
