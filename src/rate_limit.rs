use std::collections::VecDeque;
use std::net::IpAddr;
use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Sliding-window cap on accepted submissions per client address.
pub struct SubmissionRateLimiter {
    limit: usize,
    window: Duration,
    /// ip -> accepted submissions still inside the window, oldest first
    hits: DashMap<IpAddr, VecDeque<Instant>>,
}

impl SubmissionRateLimiter {
    /// A limit of 0 disables limiting.
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit: limit as usize,
            window,
            hits: DashMap::new(),
        }
    }

    /// Count a submission from `ip`. When the window is full, returns how long
    /// until its oldest entry expires.
    pub fn check(&self, ip: IpAddr) -> Result<(), Duration> {
        if self.limit == 0 {
            return Ok(());
        }

        let now = Instant::now();
        let mut hits = self.hits.entry(ip).or_default();

        while hits
            .front()
            .is_some_and(|at| now.duration_since(*at) >= self.window)
        {
            hits.pop_front();
        }

        if hits.len() >= self.limit {
            let oldest = hits.front().copied().unwrap_or(now);
            return Err(self.window.saturating_sub(now.duration_since(oldest)));
        }

        hits.push_back(now);
        Ok(())
    }

    /// Forget addresses with nothing left inside the window.
    pub fn cleanup(&self) {
        let now = Instant::now();
        self.hits
            .retain(|_, hits| hits.back().is_some_and(|at| now.duration_since(*at) < self.window));
    }

    pub fn tracked(&self) -> usize {
        self.hits.len()
    }
}
