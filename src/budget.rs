//! Monthly budget gate for paid reasoning calls.
//!
//! Every paid call is preceded by a check that the projected post-call spend
//! (current spend plus a fixed per-call estimate) stays within the monthly
//! limit. The estimate is a cheap approximation, not a ledger: the gate is
//! conservative when the real cost is lower and can under-reject when it is
//! higher.

use crate::state::{BudgetTracker, StateStore};
use chrono::{DateTime, Datelike, Utc};
use tracing::{info, warn};

/// Fixed per-call cost estimate used for gating, in currency units.
pub const ESTIMATED_COST_PER_CALL: f64 = 0.015;

/// Format a timestamp as a `YYYY-MM` month key.
pub fn month_key(now: DateTime<Utc>) -> String {
    format!("{:04}-{:02}", now.year(), now.month())
}

/// Pre-call spend gate with calendar-month rollover.
#[derive(Debug, Clone, Copy)]
pub struct BudgetGate {
    estimated_cost_per_call: f64,
}

impl Default for BudgetGate {
    fn default() -> Self {
        Self {
            estimated_cost_per_call: ESTIMATED_COST_PER_CALL,
        }
    }
}

impl BudgetGate {
    /// Gate with a custom per-call estimate. Used by tests; production uses
    /// [`ESTIMATED_COST_PER_CALL`] via [`Default`].
    pub fn with_estimate(estimated_cost_per_call: f64) -> Self {
        Self {
            estimated_cost_per_call,
        }
    }

    /// Returns `true` when a paid call is permitted right now.
    ///
    /// If the tracker's month key differs from `now`'s, spend and call count
    /// reset to zero first and the reset is persisted before the check is
    /// evaluated. The reset happens only here, never mid-cycle on a timer.
    pub fn check(&self, tracker: &mut BudgetTracker, now: DateTime<Utc>, store: &StateStore) -> bool {
        let current_month = month_key(now);
        if tracker.month != current_month {
            info!(
                old_month = %tracker.month,
                new_month = %current_month,
                "new month, resetting budget tracker"
            );
            tracker.month = current_month;
            tracker.total_spent = 0.0;
            tracker.calls_this_month = 0;
            if let Err(e) = store.save_budget(tracker) {
                warn!(error = %e, "cannot persist budget reset");
            }
        }

        let projected = tracker.total_spent + self.estimated_cost_per_call;
        if projected > tracker.limit {
            warn!(
                spent = tracker.total_spent,
                limit = tracker.limit,
                "budget limit reached, skipping paid call"
            );
            return false;
        }

        true
    }

    /// Record the actual cost of a completed call and persist the tracker.
    pub fn record_cost(&self, tracker: &mut BudgetTracker, actual_cost: f64, store: &StateStore) {
        tracker.total_spent += actual_cost;
        tracker.calls_this_month += 1;
        if let Err(e) = store.save_budget(tracker) {
            warn!(error = %e, "cannot persist budget tracker");
        }

        info!(
            cost = actual_cost,
            month_total = tracker.total_spent,
            limit = tracker.limit,
            "cost recorded"
        );
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use chrono::TimeZone;

    fn store() -> (tempfile::TempDir, StateStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path());
        (dir, store)
    }

    fn tracker(month: &str, spent: f64, limit: f64) -> BudgetTracker {
        BudgetTracker {
            month: month.to_owned(),
            total_spent: spent,
            calls_this_month: 0,
            limit,
        }
    }

    fn at(year: i32, month: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn month_key_format() {
        assert_eq!(month_key(at(2024, 1)), "2024-01");
        assert_eq!(month_key(at(2024, 12)), "2024-12");
    }

    #[test]
    fn allows_call_under_limit() {
        let (_dir, store) = store();
        let gate = BudgetGate::default();
        let mut t = tracker("2024-01", 10.0, 20.0);
        assert!(gate.check(&mut t, at(2024, 1), &store));
    }

    #[test]
    fn rejects_when_projected_exceeds_limit() {
        // limit=20.00, spend=19.99, estimate=0.015 -> projected 20.005 > 20.00
        let (_dir, store) = store();
        let gate = BudgetGate::default();
        let mut t = tracker("2024-01", 19.99, 20.0);
        assert!(!gate.check(&mut t, at(2024, 1), &store));
        // The rejection does not mutate spend.
        assert!((t.total_spent - 19.99).abs() < 1e-9);
    }

    #[test]
    fn allows_exactly_at_limit() {
        let (_dir, store) = store();
        let gate = BudgetGate::with_estimate(0.015);
        let mut t = tracker("2024-01", 19.985, 20.0);
        // projected == limit is still permitted
        assert!(gate.check(&mut t, at(2024, 1), &store));
    }

    #[test]
    fn month_rollover_resets_then_evaluates() {
        let (_dir, store) = store();
        let gate = BudgetGate::default();
        // Fully spent in January; February's first check must reset and pass.
        let mut t = tracker("2024-01", 50.0, 50.0);
        t.calls_this_month = 40;

        assert!(gate.check(&mut t, at(2024, 2), &store));
        assert_eq!(t.month, "2024-02");
        assert!((t.total_spent).abs() < f64::EPSILON);
        assert_eq!(t.calls_this_month, 0);
    }

    #[test]
    fn rollover_is_persisted_before_returning() {
        let (dir, store) = store();
        let gate = BudgetGate::default();
        let mut t = tracker("2024-01", 50.0, 50.0);

        gate.check(&mut t, at(2024, 2), &store);

        let raw = std::fs::read_to_string(dir.path().join("budget_tracker.json")).unwrap();
        let on_disk: BudgetTracker = serde_json::from_str(&raw).unwrap();
        assert_eq!(on_disk.month, "2024-02");
        assert!((on_disk.total_spent).abs() < f64::EPSILON);
    }

    #[test]
    fn same_month_never_resets() {
        let (_dir, store) = store();
        let gate = BudgetGate::default();
        let mut t = tracker("2024-03", 5.0, 50.0);
        t.calls_this_month = 3;

        assert!(gate.check(&mut t, at(2024, 3), &store));
        assert!((t.total_spent - 5.0).abs() < f64::EPSILON);
        assert_eq!(t.calls_this_month, 3);
    }

    #[test]
    fn record_cost_accumulates_and_persists() {
        let (dir, store) = store();
        let gate = BudgetGate::default();
        let mut t = tracker("2024-01", 1.0, 50.0);

        gate.record_cost(&mut t, 0.01, &store);
        gate.record_cost(&mut t, 0.02, &store);

        assert!((t.total_spent - 1.03).abs() < 1e-9);
        assert_eq!(t.calls_this_month, 2);

        let raw = std::fs::read_to_string(dir.path().join("budget_tracker.json")).unwrap();
        let on_disk: BudgetTracker = serde_json::from_str(&raw).unwrap();
        assert_eq!(on_disk.calls_this_month, 2);
    }

    #[test]
    fn never_allows_projected_over_limit() {
        // Property sweep: for a range of spend values the gate never answers
        // true when spend + estimate > limit.
        let (_dir, store) = store();
        let gate = BudgetGate::default();
        for cents in 0..2100 {
            let spent = f64::from(cents) / 100.0;
            let mut t = tracker("2024-01", spent, 20.0);
            let allowed = gate.check(&mut t, at(2024, 1), &store);
            let projected = spent + ESTIMATED_COST_PER_CALL;
            assert_eq!(allowed, projected <= 20.0, "spend {spent}");
        }
    }
}
