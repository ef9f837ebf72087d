//! Periodic housekeeping, invoked by the replica roughly once a second the
//! same way `dice_backend::heartbeat_impl` is. The challenge protocol never
//! expires a competition on its own - every state transition in §4.5 is
//! triggered by an explicit call - so this heartbeat only surfaces a log line
//! when a test window has lapsed with prize money nobody has claimed yet; it
//! never mutates `Competition` or `CurrentSolution` itself.

use std::cell::RefCell;

use crate::challenge::Clock;

const CHECK_INTERVAL_NS: u64 = 30_000_000_000; // 30 seconds, same cadence dice_backend polls at

thread_local! {
    static LAST_CHECK: RefCell<u64> = RefCell::new(0);
}

/// Log a warning once per `CHECK_INTERVAL_NS` if the test window for the
/// current competition has closed but `CurrentSolution` is still outstanding
/// (i.e. nobody has called `take_player_bond` or `unlock_bond_award_prize`
/// yet). Purely diagnostic - unclaimed prizes stay claimable indefinitely.
pub fn heartbeat(now: u64, competition: &crate::types::Competition, current: &Option<crate::types::CurrentSolution>) {
    let due = LAST_CHECK.with(|c| {
        let mut last = c.borrow_mut();
        if now.saturating_sub(*last) < CHECK_INTERVAL_NS {
            return false;
        }
        *last = now;
        true
    });
    if !due {
        return;
    }

    if current.is_some() && now > competition.test_deadline() {
        ic_cdk::println!(
            "heartbeat: test window closed at {} but a solution is still outstanding - unlock_bond_award_prize has not been called",
            competition.test_deadline()
        );
    }
}

/// Production entry point, wired to `#[heartbeat]` in `lib.rs`.
pub fn run() {
    let now = crate::IcClock.now();
    crate::with_competition(|competition| {
        crate::peek_current_solution(|current| heartbeat(now, competition, current));
    });
}
