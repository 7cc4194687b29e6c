//! Fixed-tick cooperative scheduler.
//!
//! ```text
//!  ┌──────────── tick_interval_ms ────────────┐
//!  │ feed WDT │ MotionNode::tick │   sleep    │
//!  └──────────────────────────────────────────┘
//! ```
//!
//! A tick that runs past its budget (a bounded session connect attempt,
//! typically) is counted as an overrun and the next tick starts at once;
//! missed ticks are not replayed.

use embedded_hal::delay::DelayNs;
use log::warn;

use crate::app::ports::Clock;
use crate::error::{Error, Result};

/// Tick timing statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickStats {
    pub ticks: u64,
    pub overruns: u64,
    pub worst_tick_ms: u32,
}

pub struct TickLoop {
    tick_budget_ms: u32,
    stats: TickStats,
}

impl TickLoop {
    pub fn new(tick_interval_ms: u32) -> Self {
        Self {
            tick_budget_ms: tick_interval_ms.max(1),
            stats: TickStats::default(),
        }
    }

    pub fn stats(&self) -> &TickStats {
        &self.stats
    }

    /// Run one tick and record its duration. Returns the time left in the
    /// budget (0 on overrun).
    pub fn step<F>(&mut self, clock: &impl Clock, tick: &mut F) -> Result<u32>
    where
        F: FnMut(u32) -> Result<()>,
    {
        let start = clock.now_ms();
        tick(start)?;
        let elapsed = clock.now_ms().wrapping_sub(start);

        self.stats.ticks += 1;
        if elapsed > self.stats.worst_tick_ms {
            self.stats.worst_tick_ms = elapsed;
        }
        if elapsed > self.tick_budget_ms {
            self.stats.overruns += 1;
            warn!(
                "TickLoop: tick took {} ms (budget {} ms, {} overruns)",
                elapsed, self.tick_budget_ms, self.stats.overruns
            );
            return Ok(0);
        }
        Ok(self.tick_budget_ms - elapsed)
    }

    /// Loop forever: feed, tick, sleep the remainder. Returns only the
    /// fatal error that stopped it.
    pub fn run<F, W>(&mut self, clock: &impl Clock, delay: &mut impl DelayNs, mut feed: W, mut tick: F) -> Error
    where
        F: FnMut(u32) -> Result<()>,
        W: FnMut(),
    {
        loop {
            feed();
            match self.step(clock, &mut tick) {
                Ok(0) => {}
                Ok(rest) => delay.delay_ms(rest),
                Err(e) if e.is_fatal() => return e,
                Err(e) => warn!("TickLoop: tick error {}", e),
            }
        }
    }
}
