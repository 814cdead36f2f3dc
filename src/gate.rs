//! Mint gate state machine
//!
//! The gate is a pure function of the last sale state, the clock, and two
//! pieces of local knowledge: whether an attempt is in flight and whether a
//! sold-out signal has been latched. It is recomputed on every tick and every
//! refresh, so reaching the start time needs no separate callback.

use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::info;

use crate::types::{GateState, SaleState};

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Resolve the gate state. Sold out pre-empts everything, then an in-flight
/// attempt, then the start time (and any not-live hold).
pub fn resolve(
    sale: Option<&SaleState>,
    now: DateTime<Utc>,
    submitting: bool,
    sold_out_latched: bool,
    hold_until: Option<DateTime<Utc>>,
) -> GateState {
    if sold_out_latched || sale.is_some_and(SaleState::is_sold_out) {
        return GateState::SoldOut;
    }
    if submitting {
        return GateState::Submitting;
    }

    let Some(start) = sale.and_then(|s| s.sale_start_time) else {
        return GateState::WaitingForStart;
    };
    if now < start || hold_until.is_some_and(|h| now < h) {
        return GateState::WaitingForStart;
    }

    GateState::Active
}

/// Stateful wrapper around `resolve`
#[derive(Debug, Clone)]
pub struct MintGate {
    state: GateState,
    submitting: bool,
    sold_out_latched: bool,
    hold_until: Option<DateTime<Utc>>,
}

impl Default for MintGate {
    fn default() -> Self {
        Self::new()
    }
}

impl MintGate {
    /// Nothing is known before the first fetch
    pub fn new() -> Self {
        Self {
            state: GateState::WaitingForStart,
            submitting: false,
            sold_out_latched: false,
            hold_until: None,
        }
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// Recompute from the latest sale state and clock
    pub fn observe(&mut self, sale: Option<&SaleState>, now: DateTime<Utc>) -> GateState {
        let next = resolve(sale, now, self.submitting, self.sold_out_latched, self.hold_until);
        if next == GateState::SoldOut {
            self.sold_out_latched = true;
        }
        if self.hold_until.is_some_and(|h| now >= h) {
            self.hold_until = None;
        }
        if next != self.state {
            info!(from = %self.state, to = %next, "Gate transition");
            self.state = next;
        }
        next
    }

    /// Enter Submitting. Permitted only while Active; otherwise the current
    /// state is returned and nothing changes.
    pub fn try_begin(&mut self, sale: Option<&SaleState>, now: DateTime<Utc>) -> Result<(), GateState> {
        let current = self.observe(sale, now);
        if current != GateState::Active {
            return Err(current);
        }
        self.submitting = true;
        self.observe(sale, now);
        Ok(())
    }

    /// Clear the in-flight flag; the caller recomputes with fresh state
    pub fn finish(&mut self) {
        self.submitting = false;
    }

    /// Force SoldOut ahead of the next refresh; never reverts
    pub fn latch_sold_out(&mut self) {
        self.sold_out_latched = true;
    }

    /// Hold WaitingForStart until `until`, regardless of the local clock
    pub fn hold_until(&mut self, until: DateTime<Utc>) {
        self.hold_until = Some(until);
    }

    /// Time left until the sale opens
    pub fn countdown(&self, sale: Option<&SaleState>, now: DateTime<Utc>) -> Option<Duration> {
        if self.state != GateState::WaitingForStart {
            return None;
        }
        let start = sale.and_then(|s| s.sale_start_time)?;
        let target = match self.hold_until {
            Some(hold) if hold > start => hold,
            _ => start,
        };
        (target - now).to_std().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use proptest::prelude::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn sale(remaining: u64, start: i64) -> SaleState {
        SaleState::new(100, 100 - remaining, Some(at(start)), 1)
    }

    #[test]
    fn test_no_sale_waits() {
        assert_eq!(resolve(None, at(0), false, false, None), GateState::WaitingForStart);
    }

    #[test]
    fn test_missing_start_time_waits() {
        let s = SaleState::new(10, 0, None, 1);
        assert_eq!(resolve(Some(&s), at(10_000), false, false, None), GateState::WaitingForStart);
    }

    #[test]
    fn test_countdown_completion_activates_without_refetch() {
        let s = sale(5, 1_000);
        let mut gate = MintGate::new();
        assert_eq!(gate.observe(Some(&s), at(999)), GateState::WaitingForStart);
        assert_eq!(gate.countdown(Some(&s), at(999)), Some(Duration::from_secs(1)));
        assert_eq!(gate.observe(Some(&s), at(1_000)), GateState::Active);
        assert_eq!(gate.countdown(Some(&s), at(1_000)), None);
    }

    #[test]
    fn test_try_begin_only_from_active() {
        let waiting = sale(5, 1_000);
        let mut gate = MintGate::new();
        assert_eq!(gate.try_begin(Some(&waiting), at(10)), Err(GateState::WaitingForStart));
        assert!(!gate.is_submitting());

        assert!(gate.try_begin(Some(&waiting), at(2_000)).is_ok());
        assert_eq!(gate.state(), GateState::Submitting);
        assert_eq!(gate.try_begin(Some(&waiting), at(2_000)), Err(GateState::Submitting));

        gate.finish();
        assert_eq!(gate.observe(Some(&waiting), at(2_001)), GateState::Active);
    }

    #[test]
    fn test_sold_out_is_sticky() {
        let mut gate = MintGate::new();
        assert_eq!(gate.observe(Some(&sale(0, 0)), at(10)), GateState::SoldOut);
        // A later refresh reporting stock does not reopen the gate
        assert_eq!(gate.observe(Some(&sale(3, 0)), at(11)), GateState::SoldOut);
        assert_eq!(gate.try_begin(Some(&sale(3, 0)), at(12)), Err(GateState::SoldOut));
    }

    #[test]
    fn test_latch_preempts_refresh() {
        let mut gate = MintGate::new();
        gate.latch_sold_out();
        assert_eq!(gate.observe(Some(&sale(7, 0)), at(10)), GateState::SoldOut);
    }

    #[test]
    fn test_hold_keeps_waiting_past_start() {
        let s = sale(5, 100);
        let mut gate = MintGate::new();
        gate.hold_until(at(200));
        assert_eq!(gate.observe(Some(&s), at(150)), GateState::WaitingForStart);
        assert_eq!(gate.countdown(Some(&s), at(150)), Some(Duration::from_secs(50)));
        assert_eq!(gate.observe(Some(&s), at(200)), GateState::Active);
    }

    proptest! {
        #[test]
        fn prop_zero_remaining_is_sold_out(
            start in -1_000_000i64..1_000_000,
            now in -1_000_000i64..1_000_000,
            submitting: bool,
            latched: bool,
        ) {
            let s = sale(0, start);
            prop_assert_eq!(resolve(Some(&s), at(now), submitting, latched, None), GateState::SoldOut);
        }

        #[test]
        fn prop_before_start_waits_then_activates(
            remaining in 1u64..=100,
            start in 0i64..1_000_000,
            lead in 1i64..100_000,
            after in 0i64..100_000,
        ) {
            let s = sale(remaining, start);
            let mut gate = MintGate::new();
            prop_assert_eq!(
                gate.observe(Some(&s), at(start) - ChronoDuration::seconds(lead)),
                GateState::WaitingForStart
            );
            prop_assert_eq!(gate.observe(Some(&s), at(start + after)), GateState::Active);
        }

        #[test]
        fn prop_begin_outside_active_changes_nothing(
            remaining in 0u64..=3,
            start in 0i64..1_000,
            now in 0i64..2_000,
        ) {
            let s = sale(remaining, start);
            let mut gate = MintGate::new();
            let before = gate.observe(Some(&s), at(now));
            if before != GateState::Active {
                prop_assert_eq!(gate.try_begin(Some(&s), at(now)), Err(before));
                prop_assert!(!gate.is_submitting());
            }
        }
    }
}
