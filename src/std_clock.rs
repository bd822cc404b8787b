use std::time::{Duration, Instant};

use embedded_timers::clock::Clock;

/// 基于 `std::time::Instant` 的单调时钟
///
/// 用于给传感器读数打时间戳
#[derive(Debug, Default, Clone, Copy)]
pub struct StdClock;

impl StdClock {
    pub fn new() -> Self {
        Self
    }
}

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Self::Instant {
        Instant::now()
    }

    fn elapsed(&self, instant: Self::Instant) -> Duration {
        instant.elapsed()
    }
}
