//! Puzzle canister: deterministic gravity-puzzle simulator and codec (C1-C4)
//! plus the commit/reveal/challenge economic protocol (C5) and its bond and
//! prize bookkeeping (C6). Stable-memory plumbing follows this workspace's
//! usual shape - one `MEMORY_MANAGER` handing out `VirtualMemory` regions by
//! id, `StableCell`/`StableBTreeMap` for anything that must survive an
//! upgrade.

use candid::Principal;
use ic_cdk::{heartbeat, init, post_upgrade, pre_upgrade, query, update};
use ic_stable_structures::memory_manager::{MemoryId, MemoryManager, VirtualMemory};
use ic_stable_structures::{DefaultMemoryImpl, StableCell};
use num_bigint::BigUint;
use std::cell::RefCell;

mod bigint;
mod board;
mod challenge;
mod codec;
mod descriptor_store;
mod heartbeat;
mod ledger;
mod simulator;
mod types;

pub use challenge::{Clock, DescriptorStore, IcClock};
pub use ledger::BondLedger;
pub use simulator::{simulate, simulate_strict, simulate_strict_with_inventory};
pub use types::{
    Balances, CompositeBoard, Competition, CurrentSolution, Descriptor, Direction, Inventory,
    Move, MoveKind, ProtocolError, SimError, Solution, SolutionState, Tile,
};

pub type Memory = VirtualMemory<DefaultMemoryImpl>;

// =============================================================================
// MEMORY ALLOCATION MAP (Stable Storage)
// =============================================================================
// Each id must stay unique across the lifetime of a deployed canister or an
// upgrade will read the wrong region's bytes back through the wrong Storable
// impl.
//
// Allocated Memory IDs:
//   0 - DESCRIPTOR_STORE: StableBTreeMap<u64, PuzzleWords>      (descriptor_store.rs)
//   1 - BOND_LEDGER: StableBTreeMap<Principal, Balances>        (ledger.rs)
//   2 - COMPETITION_CELL: StableCell<Competition>
//   3 - CURRENT_SOLUTION_CELL: StableCell<CurrentSolutionSlot>
//
// Available IDs: 4+
// =============================================================================

pub(crate) const DESCRIPTOR_STORE_MEMORY_ID: u8 = 0;
pub(crate) const BOND_LEDGER_MEMORY_ID: u8 = 1;
const COMPETITION_MEMORY_ID: u8 = 2;
const CURRENT_SOLUTION_MEMORY_ID: u8 = 3;

thread_local! {
    pub(crate) static MEMORY_MANAGER: RefCell<MemoryManager<DefaultMemoryImpl>> =
        RefCell::new(MemoryManager::init(DefaultMemoryImpl::default()));

    static COMPETITION_CELL: RefCell<StableCell<Competition, Memory>> = RefCell::new(
        StableCell::init(
            MEMORY_MANAGER.with(|m| m.borrow().get(MemoryId::new(COMPETITION_MEMORY_ID))),
            Competition::default(),
        ).expect("failed to init competition cell")
    );

    static CURRENT_SOLUTION_CELL: RefCell<StableCell<types::CurrentSolutionSlot, Memory>> = RefCell::new(
        StableCell::init(
            MEMORY_MANAGER.with(|m| m.borrow().get(MemoryId::new(CURRENT_SOLUTION_MEMORY_ID))),
            types::CurrentSolutionSlot::default(),
        ).expect("failed to init current-solution cell")
    );
}

#[init]
fn init() {
    ic_cdk::println!("puzzle_backend initialized");
}

#[pre_upgrade]
fn pre_upgrade() {
    // Every piece of canister state already lives in a StableCell/StableBTreeMap;
    // those persist across upgrades on their own.
}

#[post_upgrade]
fn post_upgrade() {
    ic_cdk::println!("puzzle_backend upgraded");
}

#[heartbeat]
fn heartbeat_tick() {
    heartbeat::run();
}

fn with_competition<R>(f: impl FnOnce(&Competition) -> R) -> R {
    COMPETITION_CELL.with(|cell| f(cell.borrow().get()))
}

/// Read-only peek at the current solution slot, for callers (the heartbeat)
/// that only need to inspect state, not mutate-and-persist it.
pub(crate) fn peek_current_solution<R>(f: impl FnOnce(&Option<CurrentSolution>) -> R) -> R {
    CURRENT_SOLUTION_CELL.with(|cell| f(&cell.borrow().get().0))
}

fn with_current_solution<R>(f: impl FnOnce(&mut Option<CurrentSolution>) -> R) -> R {
    CURRENT_SOLUTION_CELL.with(|cell| {
        let mut slot = cell.borrow().get().clone();
        let result = f(&mut slot.0);
        cell.borrow_mut()
            .set(slot)
            .expect("failed to persist current-solution cell");
        result
    })
}

// =============================================================================
// SIMULATOR / CODEC ENTRY POINTS (C1-C4)
// =============================================================================

/// Decode the canister's own descriptor bytes and run the strict simulator,
/// surfacing the first failure reason as a `String` at the candid boundary -
/// this workspace's uniform `Result<_, String>` convention for public entry
/// points.
#[query]
fn simulate_solution(puzzle_ids: [u64; 4], setup_data: u16, solution_words: Vec<candid::Nat>) -> Result<(), String> {
    let words: Vec<BigUint> = solution_words.into_iter().map(|n| n.0).collect();
    let solution = codec::decode_solution(&words);

    let setup = board::SetupData::decode(setup_data);
    let mut descriptors = Vec::with_capacity(4);
    for (k, &puzzle_id) in puzzle_ids.iter().enumerate() {
        let puzzle_words = descriptor_store::StableDescriptorStore
            .get_puzzle(puzzle_id)
            .ok_or_else(|| format!("unknown puzzle id {puzzle_id}"))?;
        let use_start = k as u8 == setup.start_quadrant;
        let use_exit = k as u8 == setup.exit_quadrant;
        descriptors.push(codec::decode_descriptor(&puzzle_words, use_start, use_exit));
    }
    let descriptors: [Descriptor; 4] = descriptors.try_into().map_err(|_| "expected four descriptors".to_string())?;
    let (mut composite, target_crystals) = board::compose_board(&descriptors, &setup);

    simulator::simulate_strict(&mut composite, &solution.moves, target_crystals).map_err(|e| e.to_string())
}

#[update]
fn mint_puzzle(id: u64, words: [candid::Nat; 4]) {
    let words = words.map(|n| n.0);
    descriptor_store::mint(id, words);
}

#[query]
fn total_minted() -> u64 {
    descriptor_store::puzzle_count()
}

// =============================================================================
// CHALLENGE PROTOCOL ENTRY POINTS (C5)
// =============================================================================

#[update]
fn start_competition(puzzle_ids: [u64; 4], setup_data: u16, prize_amount: u64) -> Result<(), String> {
    let now = IcClock.now();
    with_current_solution(|current| {
        COMPETITION_CELL.with(|cell| {
            let mut competition = cell.borrow().get().clone();
            let result = challenge::start_competition(&mut competition, current, now, puzzle_ids, setup_data, prize_amount);
            if result.is_ok() {
                cell.borrow_mut().set(competition).expect("failed to persist competition cell");
            }
            result
        })
    })
    .map_err(|e| e.to_string())
}

#[update]
fn set_required_bond(required_bond: u64) -> Result<(), String> {
    let now = IcClock.now();
    with_current_solution(|current| {
        COMPETITION_CELL.with(|cell| {
            let mut competition = cell.borrow().get().clone();
            let result = challenge::set_required_bond(&mut competition, current, now, required_bond);
            if result.is_ok() {
                cell.borrow_mut().set(competition).expect("failed to persist competition cell");
            }
            result
        })
    })
    .map_err(|e| e.to_string())
}

#[update]
fn set_durations(comp_dur: u64, test_dur: u64) -> Result<(), String> {
    let now = IcClock.now();
    with_current_solution(|current| {
        COMPETITION_CELL.with(|cell| {
            let mut competition = cell.borrow().get().clone();
            let result = challenge::set_durations(&mut competition, current, now, comp_dur, test_dur);
            if result.is_ok() {
                cell.borrow_mut().set(competition).expect("failed to persist competition cell");
            }
            result
        })
    })
    .map_err(|e| e.to_string())
}

#[update]
fn commit(solution_hash: [u8; 32]) -> Result<(), String> {
    let caller = ic_cdk::caller();
    let now = IcClock.now();
    with_competition(|competition| {
        with_current_solution(|current| {
            challenge::commit(competition, current, &mut ledger::StableLedger, caller, solution_hash, now)
        })
    })
    .map_err(|e| e.to_string())
}

#[update]
fn reveal(solution: Solution) -> Result<(), String> {
    let now = IcClock.now();
    with_competition(|competition| with_current_solution(|current| challenge::reveal(competition, current, solution, now)))
        .map_err(|e| e.to_string())
}

#[update]
fn take_player_bond() -> Result<u64, String> {
    let caller = ic_cdk::caller();
    let now = IcClock.now();
    with_competition(|competition| {
        with_current_solution(|current| {
            challenge::take_player_bond(
                competition,
                current,
                &mut ledger::StableLedger,
                &descriptor_store::StableDescriptorStore,
                caller,
                now,
            )
            .map(|slashed| slashed.amount)
        })
    })
    .map_err(|e| e.to_string())
}

#[update]
fn unlock_bond_award_prize() -> Result<u64, String> {
    let now = IcClock.now();
    with_competition(|competition| {
        with_current_solution(|current| {
            challenge::unlock_bond_award_prize(competition, current, &mut ledger::StableLedger, now)
        })
    })
    .map_err(|e| e.to_string())
}

// =============================================================================
// LEDGER QUERIES (C6)
// =============================================================================

#[query]
fn available_bond(account: Principal) -> u64 {
    ledger::StableLedger.available_bond(account)
}

#[query]
fn get_competition() -> Competition {
    with_competition(|c| c.clone())
}

#[query]
fn get_current_solution() -> Option<CurrentSolution> {
    CURRENT_SOLUTION_CELL.with(|cell| cell.borrow().get().0.clone())
}
