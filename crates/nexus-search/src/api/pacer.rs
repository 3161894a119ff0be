//! Client-side request pacing.
//!
//! Spaces outgoing requests so the client stays under both a per-second and a
//! per-minute budget before the server has to answer with 429.

use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::{sleep, Instant};

const WINDOW: Duration = Duration::from_secs(60);

/// Request pacer with dual constraints (per-second and per-minute)
#[derive(Debug)]
pub struct RequestPacer {
    /// Minimum gap between two sends
    min_interval: Duration,
    /// Maximum sends inside any sliding minute
    max_per_minute: usize,
    /// Send timestamps inside the current minute, oldest first
    recent: VecDeque<Instant>,
}

impl RequestPacer {
    pub fn new(max_per_second: f64, max_per_minute: u32) -> Self {
        // Rates too small to express as an interval never let a second send through
        let min_interval = if max_per_second > 0.0 {
            Duration::try_from_secs_f64(1.0 / max_per_second).unwrap_or(Duration::MAX)
        } else {
            Duration::ZERO
        };

        Self {
            min_interval,
            max_per_minute: max_per_minute.max(1) as usize,
            recent: VecDeque::with_capacity(max_per_minute as usize),
        }
    }

    /// Wait until another request may be sent, then record it.
    pub async fn acquire(&mut self) {
        let wait = self.wait_time(Instant::now());
        if !wait.is_zero() {
            tracing::debug!(wait_ms = wait.as_millis() as u64, "Pacing request");
            sleep(wait).await;
        }

        let now = Instant::now();
        self.prune(now);
        self.recent.push_back(now);
    }

    /// How long a send at `now` has to be held back
    fn wait_time(&mut self, now: Instant) -> Duration {
        self.prune(now);

        let mut wait = Duration::ZERO;

        if self.recent.len() >= self.max_per_minute {
            if let Some(&oldest) = self.recent.front() {
                wait = wait.max(WINDOW.saturating_sub(now.duration_since(oldest)));
            }
        }

        if let Some(&last) = self.recent.back() {
            wait = wait.max(self.min_interval.saturating_sub(now.duration_since(last)));
        }

        wait
    }

    fn prune(&mut self, now: Instant) {
        while let Some(&oldest) = self.recent.front() {
            if now.duration_since(oldest) >= WINDOW {
                self.recent.pop_front();
            } else {
                break;
            }
        }
    }

    /// Number of sends recorded in the last minute
    pub fn current_minute_count(&mut self) -> usize {
        self.prune(Instant::now());
        self.recent.len()
    }
}
