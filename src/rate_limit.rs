use std::thread;
use std::time::{Duration, Instant};

/// Gate consulted before every outbound provider call.
pub trait RateLimiter {
    fn acquire(&mut self);
}

/// Blocks until `interval` has passed since the previous acquisition.
#[derive(Debug, Clone)]
pub struct FixedInterval {
    interval: Duration,
    last: Option<Instant>,
}

impl FixedInterval {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl RateLimiter for FixedInterval {
    fn acquire(&mut self) {
        if let Some(last) = self.last {
            let elapsed = last.elapsed();
            if elapsed < self.interval {
                thread::sleep(self.interval - elapsed);
            }
        }
        self.last = Some(Instant::now());
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Unthrottled;

impl RateLimiter for Unthrottled {
    fn acquire(&mut self) {}
}

impl<L: RateLimiter + ?Sized> RateLimiter for Box<L> {
    fn acquire(&mut self) {
        (**self).acquire();
    }
}
