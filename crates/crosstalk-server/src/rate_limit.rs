//! Per-IP request rate limiting
//!
//! Fixed one-second counting windows, one per source address. Blunt by
//! design: the goal is to absorb accidental floods against the access
//! plane, not to shape traffic precisely. The allowance is configurable
//! and generous by default.

use std::collections::HashMap;
use std::net::IpAddr;
use std::time::{Duration, Instant};

/// Length of one counting window
const WINDOW: Duration = Duration::from_secs(1);

/// How often dead windows are swept out of the table
const SWEEP_EVERY: Duration = Duration::from_secs(30);

/// One counting window for a single source address
#[derive(Debug)]
struct Window {
    started: Instant,
    hits: u32,
}

impl Window {
    fn open(now: Instant) -> Self {
        Self {
            started: now,
            hits: 0,
        }
    }

    fn ended(&self, now: Instant) -> bool {
        now.duration_since(self.started) >= WINDOW
    }
}

/// Per-address fixed-window counter
#[derive(Debug)]
pub struct RateLimiter {
    /// Requests allowed per window per address
    allowance: u32,
    windows: HashMap<IpAddr, Window>,
    last_sweep: Instant,
}

impl RateLimiter {
    pub fn new(allowance: u32) -> Self {
        Self {
            allowance,
            windows: HashMap::new(),
            last_sweep: Instant::now(),
        }
    }

    /// Record a request from `ip`; `false` means it exceeded the allowance
    pub fn check(&mut self, ip: IpAddr) -> bool {
        let now = Instant::now();
        self.sweep(now);

        let window = self
            .windows
            .entry(ip)
            .and_modify(|w| {
                if w.ended(now) {
                    *w = Window::open(now);
                }
            })
            .or_insert_with(|| Window::open(now));

        if window.hits >= self.allowance {
            return false;
        }
        window.hits += 1;
        true
    }

    /// Drop windows that have ended, so the table stays bounded by the
    /// set of recently active addresses rather than everyone ever seen.
    fn sweep(&mut self, now: Instant) {
        if now.duration_since(self.last_sweep) < SWEEP_EVERY {
            return;
        }
        self.windows.retain(|_, w| !w.ended(now));
        self.last_sweep = now;
    }
}
