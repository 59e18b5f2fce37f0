// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Local admission control for search calls
//!
//! Guards the paid search APIs before any provider is tried, so a burst of
//! acquisitions fails fast with a retry hint instead of burning quota.

use governor::clock::{Clock, DefaultClock};
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;

use super::types::SearchError;

/// Used when a zero budget slips past validation
const FALLBACK_PER_MINUTE: u32 = 60;

pub struct SearchRateLimiter {
    limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    clock: DefaultClock,
    per_minute: NonZeroU32,
}

impl SearchRateLimiter {
    pub fn new(requests_per_minute: u32) -> Self {
        let per_minute = NonZeroU32::new(requests_per_minute)
            .unwrap_or(NonZeroU32::MIN.saturating_add(FALLBACK_PER_MINUTE - 1));
        let clock = DefaultClock::default();

        Self {
            limiter: RateLimiter::direct_with_clock(Quota::per_minute(per_minute), &clock),
            clock,
            per_minute,
        }
    }

    /// Admit one search, or report how long until the next slot frees up
    pub fn check(&self) -> Result<(), SearchError> {
        self.limiter.check().map_err(|not_until| {
            let wait = not_until.wait_time_from(self.clock.now());
            SearchError::RateLimited {
                retry_after_secs: wait.as_secs().max(1),
            }
        })
    }

    pub fn requests_per_minute(&self) -> u32 {
        self.per_minute.get()
    }
}
