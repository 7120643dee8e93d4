// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

use crate::common::time_utils::utc_day;
use chrono::NaiveDate;

/// Daily PnL kill switch. Trips once the rolling sum of realized returns falls below the
/// threshold and stays tripped until the UTC day rolls over or an operator resets it.
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    daily_pnl: f64,
    day: Option<NaiveDate>,
    threshold: f64,
    tripped: bool,
}

impl CircuitBreaker {
    pub fn new(threshold: f64) -> Self {
        Self {
            daily_pnl: 0.0,
            day: None,
            threshold,
            tripped: false,
        }
    }

    /// Advance to the day of `block_timestamp`; returns true when the breaker is tripped
    /// after the roll-over and threshold check.
    pub fn roll(&mut self, block_timestamp: u64) -> bool {
        let today = utc_day(block_timestamp);
        match self.day {
            Some(day) if day == today => {}
            Some(day) => {
                tracing::info!(
                    target: "strategy",
                    from = %day,
                    to = %today,
                    pnl = self.daily_pnl,
                    "New UTC day; circuit breaker reset"
                );
                self.day = Some(today);
                self.clear();
            }
            None => self.day = Some(today),
        }
        self.evaluate()
    }

    pub fn record(&mut self, realized_pct: f64) -> bool {
        self.daily_pnl += realized_pct;
        self.evaluate()
    }

    pub fn reset(&mut self) {
        tracing::info!(target: "strategy", pnl = self.daily_pnl, "Circuit breaker reset by operator");
        self.clear();
    }

    pub fn is_tripped(&self) -> bool {
        self.tripped
    }

    pub fn daily_pnl(&self) -> f64 {
        self.daily_pnl
    }

    fn clear(&mut self) {
        self.daily_pnl = 0.0;
        self.tripped = false;
    }

    fn evaluate(&mut self) -> bool {
        if !self.tripped && self.daily_pnl < self.threshold {
            self.tripped = true;
            tracing::error!(
                target: "strategy",
                pnl = self.daily_pnl,
                threshold = self.threshold,
                "CIRCUIT BREAKER TRIPPED: daily PnL below hard stop"
            );
        }
        self.tripped
    }
}
