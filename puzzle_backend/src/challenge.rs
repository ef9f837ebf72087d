//! C5 - Challenge Protocol: the commit/reveal/challenge state machine gating
//! one `CurrentSolution` per competition. Structured like a provable-fairness
//! flow - canister-held secret material, a hash committed up front, later
//! checked against a caller-supplied preimage - generalized into an explicit
//! state machine with an injected [`Clock`] so the transition functions stay
//! pure and testable without a replica.

use candid::Principal;
use sha3::{Digest, Keccak256};

use crate::codec;
use crate::ledger::BondLedger;
use crate::types::{Competition, CurrentSolution, Move, ProtocolError, Solution, SolutionState};

/// Monotonic wall clock, injected rather than read directly from
/// `ic_cdk::api::time()` so transition functions can be driven with a fixed
/// `now` in tests instead of a handful of scattered `ic_cdk::api::time()`
/// call sites.
pub trait Clock {
    fn now(&self) -> u64;
}

/// Production clock backed by the replica's system time.
pub struct IcClock;

impl Clock for IcClock {
    fn now(&self) -> u64 {
        ic_cdk::api::time()
    }
}

/// External puzzle registry lookup, kept as a trait for the same reason
/// [`BondLedger`] is: so `take_player_bond` stays unit-testable without a
/// running replica.
pub trait DescriptorStore {
    fn get_puzzle(&self, id: u64) -> Option<[num_bigint::BigUint; 4]>;
    fn total_minted(&self) -> u64;
}

/// `keccak256` over the solution's wire encoding (the same little-endian
/// word bytes [`codec::encode_solution`] produces), not over some ad hoc
/// struct layout - the commit hash and the wire format describe the same
/// bytes.
pub fn hash_solution(solution: &Solution) -> [u8; 32] {
    let words = codec::encode_solution(solution);
    let mut hasher = Keccak256::new();
    for word in &words {
        hasher.update(word.to_bytes_le());
    }
    hasher.finalize().into()
}

fn require_not_running(competition: &Competition, current: &Option<CurrentSolution>, now: u64) -> Result<(), ProtocolError> {
    if current.is_some() || competition.is_running(now) {
        return Err(ProtocolError::CompetitionStillRunning);
    }
    Ok(())
}

// =============================================================================
// ADMINISTRATIVE TRANSITIONS
// =============================================================================

pub fn set_required_bond(
    competition: &mut Competition,
    current: &Option<CurrentSolution>,
    now: u64,
    required_bond: u64,
) -> Result<(), ProtocolError> {
    require_not_running(competition, current, now)?;
    competition.required_bond = required_bond;
    Ok(())
}

pub fn set_durations(
    competition: &mut Competition,
    current: &Option<CurrentSolution>,
    now: u64,
    comp_dur: u64,
    test_dur: u64,
) -> Result<(), ProtocolError> {
    require_not_running(competition, current, now)?;
    competition.comp_dur = comp_dur;
    competition.test_dur = test_dur;
    Ok(())
}

pub fn start_competition(
    competition: &mut Competition,
    current: &Option<CurrentSolution>,
    now: u64,
    puzzle_ids: [u64; 4],
    setup_data: u16,
    prize_amount: u64,
) -> Result<(), ProtocolError> {
    require_not_running(competition, current, now)?;
    competition.puzzle_ids = puzzle_ids;
    competition.setup_data = setup_data;
    competition.prize_amount = prize_amount;
    competition.start_timestamp = now;
    Ok(())
}

// =============================================================================
// COMMIT / REVEAL
// =============================================================================

pub fn commit(
    competition: &Competition,
    current: &mut Option<CurrentSolution>,
    ledger: &mut impl BondLedger,
    submitter: Principal,
    solution_hash: [u8; 32],
    now: u64,
) -> Result<(), ProtocolError> {
    if now > competition.submission_deadline() {
        return Err(ProtocolError::CompetitionAlreadyFinished);
    }
    if current.is_some() {
        return Err(ProtocolError::HashAlreadySet);
    }
    if ledger.available_bond(submitter) < competition.required_bond {
        return Err(ProtocolError::BondNotEnough);
    }

    ledger
        .lock_bond(submitter, competition.required_bond)
        .map_err(|_| ProtocolError::BondNotEnough)?;

    *current = Some(CurrentSolution {
        submitter,
        solution_hash,
        revealed_moves: None,
        state: SolutionState::Committed,
    });
    Ok(())
}

pub fn reveal(
    competition: &Competition,
    current: &mut Option<CurrentSolution>,
    revealed: Solution,
    now: u64,
) -> Result<(), ProtocolError> {
    if now > competition.submission_deadline() {
        return Err(ProtocolError::CompetitionAlreadyFinished);
    }
    let committed = current.as_mut().ok_or(ProtocolError::NoSolutionOwner)?;
    if hash_solution(&revealed) != committed.solution_hash {
        return Err(ProtocolError::SolutionNotEqualHash);
    }
    committed.revealed_moves = Some(revealed.moves);
    committed.state = SolutionState::Revealed;
    Ok(())
}

// =============================================================================
// CHALLENGE / AWARD
// =============================================================================

/// Result of a successful `take_player_bond` call: the submitter's bond was
/// slashed and transferred to `challenger`.
pub struct BondSlashed {
    pub amount: u64,
}

pub fn take_player_bond(
    competition: &Competition,
    current: &mut Option<CurrentSolution>,
    ledger: &mut impl BondLedger,
    store: &impl DescriptorStore,
    challenger: Principal,
    now: u64,
) -> Result<BondSlashed, ProtocolError> {
    if now <= competition.submission_deadline() {
        return Err(ProtocolError::CompetitionStillRunning);
    }
    if now > competition.test_deadline() {
        return Err(ProtocolError::OutsideTestTimeWindow);
    }
    let solution = current.as_ref().ok_or(ProtocolError::NoSolutionOwner)?;

    let moves = solution.revealed_moves.clone().unwrap_or_default();
    let valid = simulate_competition(competition, store, &moves);

    if valid {
        return Err(ProtocolError::SolutionIsValid);
    }

    let submitter = solution.submitter;
    ledger
        .pay_bond_to(challenger, submitter, competition.required_bond)
        .map_err(|_| ProtocolError::BondNotEnough)?;
    *current = None;
    Ok(BondSlashed { amount: competition.required_bond })
}

pub fn unlock_bond_award_prize(
    competition: &Competition,
    current: &mut Option<CurrentSolution>,
    ledger: &mut impl BondLedger,
    now: u64,
) -> Result<u64, ProtocolError> {
    if now <= competition.test_deadline() {
        return Err(ProtocolError::CompetitionStillRunning);
    }
    let solution = current.as_ref().ok_or(ProtocolError::NoSolutionOwner)?;
    let submitter = solution.submitter;

    ledger
        .unlock_bond(submitter, competition.required_bond)
        .map_err(|_| ProtocolError::UnclaimedPrize)?;
    ledger.allocate_prize(competition.prize_amount);
    let awarded = ledger
        .reward_prize_to(submitter)
        .map_err(|_| ProtocolError::UnclaimedPrize)?;
    *current = None;
    Ok(awarded)
}

/// Decode the competition's four descriptors into one composite board and
/// run the boolean simulator entry point against the given moves.
fn simulate_competition(competition: &Competition, store: &impl DescriptorStore, moves: &[Move]) -> bool {
    let setup = crate::board::SetupData::decode(competition.setup_data);
    let mut descriptors = Vec::with_capacity(4);
    for (k, &puzzle_id) in competition.puzzle_ids.iter().enumerate() {
        let words = match store.get_puzzle(puzzle_id) {
            Some(words) => words,
            None => return false,
        };
        let use_start = k as u8 == setup.start_quadrant;
        let use_exit = k as u8 == setup.exit_quadrant;
        descriptors.push(codec::decode_descriptor(&words, use_start, use_exit));
    }
    let descriptors: [_; 4] = match descriptors.try_into() {
        Ok(arr) => arr,
        Err(_) => return false,
    };
    let (mut board, target_crystals) = crate::board::compose_board(&descriptors, &setup);
    crate::simulator::simulate(&mut board, moves, target_crystals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::fixture::FixtureLedger;
    use crate::types::{Direction, MoveKind, Tile, DESCRIPTOR_HEIGHT, DESCRIPTOR_WIDTH};
    use num_bigint::BigUint;

    fn submitter() -> Principal {
        Principal::from_slice(&[9; 29])
    }

    fn challenger() -> Principal {
        Principal::from_slice(&[7; 29])
    }

    fn competition() -> Competition {
        Competition {
            puzzle_ids: [1, 2, 3, 4],
            setup_data: 0,
            start_timestamp: 1_000,
            prize_amount: 500,
            comp_dur: 100,
            test_dur: 50,
            required_bond: 200,
        }
    }

    struct EmptyStore;
    impl DescriptorStore for EmptyStore {
        fn get_puzzle(&self, _id: u64) -> Option<[BigUint; 4]> {
            None
        }
        fn total_minted(&self) -> u64 {
            0
        }
    }

    /// Single descriptor whose whole grid is `None` except a standable tile
    /// directly under `start`, so the player neither falls away nor needs
    /// any moves to be already sitting at the exit.
    struct TrivialStore;
    impl DescriptorStore for TrivialStore {
        fn get_puzzle(&self, _id: u64) -> Option<[BigUint; 4]> {
            let mut descriptor_tiles = vec![Tile::None; DESCRIPTOR_WIDTH * DESCRIPTOR_HEIGHT];
            descriptor_tiles[DESCRIPTOR_WIDTH + 0] = Tile::SoftBlock; // under (0,0)
            let descriptor = crate::types::Descriptor {
                tiles: descriptor_tiles,
                crystal: (5, 5),
                start: Some((0, 0)),
                exit: Some((0, 0)),
            };
            Some(codec::encode_descriptor(&descriptor))
        }
        fn total_minted(&self) -> u64 {
            1
        }
    }

    #[test]
    fn commit_fails_when_bond_is_insufficient() {
        let comp = competition();
        let mut current = None;
        let mut ledger = FixtureLedger::new();
        ledger.credit_available(submitter(), 50);
        let result = commit(&comp, &mut current, &mut ledger, submitter(), [0; 32], 1_001);
        assert_eq!(result, Err(ProtocolError::BondNotEnough));
        assert!(current.is_none());
    }

    #[test]
    fn double_commit_is_rejected() {
        let comp = competition();
        let mut current = None;
        let mut ledger = FixtureLedger::new();
        ledger.credit_available(submitter(), 1_000);
        commit(&comp, &mut current, &mut ledger, submitter(), [1; 32], 1_001).unwrap();
        let result = commit(&comp, &mut current, &mut ledger, challenger(), [2; 32], 1_002);
        assert_eq!(result, Err(ProtocolError::HashAlreadySet));
    }

    #[test]
    fn reveal_with_wrong_preimage_is_rejected() {
        let comp = competition();
        let mut current = None;
        let mut ledger = FixtureLedger::new();
        ledger.credit_available(submitter(), 1_000);
        let solution = Solution::new(vec![Move { kind: MoveKind::Move, direction: Direction::Right }]);
        commit(&comp, &mut current, &mut ledger, submitter(), hash_solution(&solution), 1_001).unwrap();

        let wrong_solution = Solution::new(vec![Move { kind: MoveKind::Move, direction: Direction::Left }]);
        let result = reveal(&comp, &mut current, wrong_solution, 1_002);
        assert_eq!(result, Err(ProtocolError::SolutionNotEqualHash));
    }

    #[test]
    fn reveal_with_matching_preimage_succeeds() {
        let comp = competition();
        let mut current = None;
        let mut ledger = FixtureLedger::new();
        ledger.credit_available(submitter(), 1_000);
        let solution = Solution::new(vec![Move { kind: MoveKind::Move, direction: Direction::Right }]);
        commit(&comp, &mut current, &mut ledger, submitter(), hash_solution(&solution), 1_001).unwrap();

        reveal(&comp, &mut current, solution.clone(), 1_002).unwrap();
        assert_eq!(current.as_ref().unwrap().revealed_moves, Some(solution.moves));
    }

    #[test]
    fn take_player_bond_before_submission_window_closes_is_rejected() {
        let comp = competition();
        let mut current = None;
        let mut ledger = FixtureLedger::new();
        let result = take_player_bond(&comp, &mut current, &mut ledger, &EmptyStore, challenger(), 1_050);
        assert_eq!(result, Err(ProtocolError::CompetitionStillRunning));
    }

    #[test]
    fn take_player_bond_slashes_submitter_when_solution_is_invalid() {
        let comp = competition();
        let mut current = Some(CurrentSolution {
            submitter: submitter(),
            solution_hash: [0; 32],
            revealed_moves: Some(vec![Move { kind: MoveKind::Move, direction: Direction::Right }]),
            state: SolutionState::Revealed,
        });
        let mut ledger = FixtureLedger::new();
        ledger.credit_available(submitter(), 1_000);
        ledger.lock_bond(submitter(), comp.required_bond).unwrap();

        // Puzzle ids point nowhere, so the store lookup fails and simulation
        // is treated as invalid.
        let result = take_player_bond(&comp, &mut current, &mut ledger, &EmptyStore, challenger(), 1_101);
        assert!(result.is_ok());
        assert_eq!(ledger.available_bond(challenger()), comp.required_bond);
        assert!(current.is_none());
    }

    #[test]
    fn take_player_bond_reverts_when_solution_is_valid() {
        let comp = competition();
        let mut current = Some(CurrentSolution {
            submitter: submitter(),
            solution_hash: [0; 32],
            revealed_moves: Some(vec![]),
            state: SolutionState::Revealed,
        });
        let mut ledger = FixtureLedger::new();
        ledger.credit_available(submitter(), 1_000);
        ledger.lock_bond(submitter(), comp.required_bond).unwrap();

        let result = take_player_bond(&comp, &mut current, &mut ledger, &TrivialStore, challenger(), 1_101);
        assert_eq!(result, Err(ProtocolError::SolutionIsValid));
        // A revert leaves state untouched: the bond is still locked for the submitter.
        assert!(current.is_some());
        assert_eq!(ledger.available_bond(challenger()), 0);
    }

    #[test]
    fn unlock_bond_award_prize_is_rejected_before_test_window_ends() {
        let comp = competition();
        let mut current = Some(CurrentSolution {
            submitter: submitter(),
            solution_hash: [0; 32],
            revealed_moves: Some(vec![]),
            state: SolutionState::Revealed,
        });
        let mut ledger = FixtureLedger::new();
        let result = unlock_bond_award_prize(&comp, &mut current, &mut ledger, 1_101);
        assert_eq!(result, Err(ProtocolError::CompetitionStillRunning));
    }

    #[test]
    fn unlock_bond_award_prize_pays_out_after_test_window_then_clears_state() {
        let comp = competition();
        let mut current = Some(CurrentSolution {
            submitter: submitter(),
            solution_hash: [0; 32],
            revealed_moves: Some(vec![]),
            state: SolutionState::Revealed,
        });
        let mut ledger = FixtureLedger::new();
        ledger.credit_available(submitter(), 1_000);
        ledger.lock_bond(submitter(), comp.required_bond).unwrap();

        let awarded = unlock_bond_award_prize(&comp, &mut current, &mut ledger, 1_200).unwrap();
        assert_eq!(awarded, comp.prize_amount);
        assert!(current.is_none());
        assert_eq!(
            ledger.available_bond(submitter()),
            1_000 - comp.required_bond + comp.required_bond + comp.prize_amount
        );

        // A second call has nothing left to act on.
        let result = unlock_bond_award_prize(&comp, &mut current, &mut ledger, 1_300);
        assert_eq!(result, Err(ProtocolError::NoSolutionOwner));
    }
}
