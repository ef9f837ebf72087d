//! Shared data model for the puzzle simulator, codec, board composer and
//! challenge protocol. Candid-facing records derive the same trait set every
//! sibling canister's public types do; purely internal simulator types stay
//! plain Rust.

use candid::{CandidType, Deserialize, Principal};
use ic_stable_structures::storable::Bound;
use ic_stable_structures::Storable;
use serde::Serialize;
use std::borrow::Cow;
use std::fmt;

// =============================================================================
// DIMENSIONS
// =============================================================================

pub const DESCRIPTOR_WIDTH: usize = 20;
pub const DESCRIPTOR_HEIGHT: usize = 14;
pub const COMPOSITE_WIDTH: usize = 40;
pub const COMPOSITE_HEIGHT: usize = 28;

/// One below the largest 77-digit decimal value a 256-bit register can hold
/// without losing precision. Digit streaming resets its running radix
/// markers whenever they would exceed this.
pub const MOD_LIMIT_DIGITS: u32 = 77;

// =============================================================================
// TILE
// =============================================================================

#[derive(CandidType, Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tile {
    None = 0,
    SoftBlock = 1,
    HardBlock = 2,
    SoftLadder = 3,
    HardLadder = 4,
    Pick = 5,
    Crystal = 10,
}

impl Tile {
    /// Tiles storable as a single descriptor digit (0..=5). `Crystal` is
    /// overlaid post-decode and never encoded in the grid digits.
    pub fn from_digit(d: u8) -> Tile {
        match d {
            0 => Tile::None,
            1 => Tile::SoftBlock,
            2 => Tile::HardBlock,
            3 => Tile::SoftLadder,
            4 => Tile::HardLadder,
            5 => Tile::Pick,
            _ => Tile::None,
        }
    }

    pub fn to_digit(self) -> u8 {
        match self {
            Tile::None => 0,
            Tile::SoftBlock => 1,
            Tile::HardBlock => 2,
            Tile::SoftLadder => 3,
            Tile::HardLadder => 4,
            Tile::Pick => 5,
            Tile::Crystal => 0, // never encoded; overlaid post-decode
        }
    }

    /// Halts a falling player.
    pub fn is_standable(self) -> bool {
        matches!(self, Tile::SoftBlock | Tile::SoftLadder)
    }

    /// Blocks horizontal/diagonal motion into the cell.
    pub fn is_solid(self) -> bool {
        matches!(self, Tile::SoftBlock | Tile::HardBlock)
    }
}

// =============================================================================
// MOVE
// =============================================================================

#[derive(CandidType, Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveKind {
    Move = 0,
    Mine = 1,
    PlaceBlock = 2,
    PlaceLadder = 3,
}

impl MoveKind {
    pub fn from_digit(d: u8) -> Option<MoveKind> {
        match d {
            0 => Some(MoveKind::Move),
            1 => Some(MoveKind::Mine),
            2 => Some(MoveKind::PlaceBlock),
            3 => Some(MoveKind::PlaceLadder),
            _ => None,
        }
    }
}

#[derive(CandidType, Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Right = 1,
    Left = 2,
    Up = 3,
    Down = 4,
    RightUp = 5,
    RightDown = 6,
    LeftUp = 7,
    LeftDown = 8,
    Wait = 9,
}

impl Direction {
    pub fn from_digit(d: u8) -> Option<Direction> {
        match d {
            1 => Some(Direction::Right),
            2 => Some(Direction::Left),
            3 => Some(Direction::Up),
            4 => Some(Direction::Down),
            5 => Some(Direction::RightUp),
            6 => Some(Direction::RightDown),
            7 => Some(Direction::LeftUp),
            8 => Some(Direction::LeftDown),
            9 => Some(Direction::Wait),
            _ => None,
        }
    }

    /// `(dx, dy)` offset for the eight compass directions. `Wait` has no
    /// offset - callers must reject it before reaching here.
    pub fn offset(self) -> Option<(i16, i16)> {
        match self {
            Direction::Right => Some((1, 0)),
            Direction::Left => Some((-1, 0)),
            Direction::Up => Some((0, -1)),
            Direction::Down => Some((0, 1)),
            Direction::RightUp => Some((1, -1)),
            Direction::RightDown => Some((1, 1)),
            Direction::LeftUp => Some((-1, -1)),
            Direction::LeftDown => Some((-1, 1)),
            Direction::Wait => None,
        }
    }
}

#[derive(CandidType, Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Move {
    pub kind: MoveKind,
    pub direction: Direction,
}

// =============================================================================
// SOLUTION
// =============================================================================

#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Solution {
    pub num_moves: u16,
    pub moves: Vec<Move>,
}

impl Solution {
    pub fn new(moves: Vec<Move>) -> Solution {
        Solution { num_moves: moves.len() as u16, moves }
    }
}

// =============================================================================
// INVENTORY
// =============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Inventory {
    pub picks: u8,
    pub soft_tiles: u8,
    pub ladders: u8,
    pub crystals: u8,
}

// =============================================================================
// DESCRIPTOR (single 20x14 puzzle)
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Descriptor {
    /// Row-major, `DESCRIPTOR_WIDTH * DESCRIPTOR_HEIGHT` tiles.
    pub tiles: Vec<Tile>,
    pub crystal: (u8, u8),
    pub start: Option<(u8, u8)>,
    pub exit: Option<(u8, u8)>,
}

impl Descriptor {
    pub fn tile_at(&self, x: usize, y: usize) -> Tile {
        self.tiles[y * DESCRIPTOR_WIDTH + x]
    }
}

// =============================================================================
// COMPOSITE BOARD (40x28, assembled from four descriptors)
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompositeBoard {
    pub tiles: Vec<Tile>,
    pub player: (i16, i16),
    pub exit: (i16, i16),
}

impl CompositeBoard {
    pub fn in_bounds(&self, x: i16, y: i16) -> bool {
        x >= 0 && y >= 0 && (x as usize) < COMPOSITE_WIDTH && (y as usize) < COMPOSITE_HEIGHT
    }

    pub fn get(&self, x: i16, y: i16) -> Option<Tile> {
        if self.in_bounds(x, y) {
            Some(self.tiles[y as usize * COMPOSITE_WIDTH + x as usize])
        } else {
            None
        }
    }

    pub fn set(&mut self, x: i16, y: i16, tile: Tile) {
        debug_assert!(self.in_bounds(x, y));
        self.tiles[y as usize * COMPOSITE_WIDTH + x as usize] = tile;
    }
}

// =============================================================================
// SIMULATOR ERRORS
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimError {
    CannotMoveUp { x: i16, y: i16 },
    NoPicks { x: i16, y: i16 },
    NothingToMine { x: i16, y: i16 },
    NoTileToPlace { tile: Tile, x: i16, y: i16 },
    CannotPlace { tile: Tile, x: i16, y: i16 },
    MovedIntoSolid { x: i16, y: i16 },
    MovedOutOfBounds { x: i16, y: i16 },
    InvalidMoveDirection { x: i16, y: i16 },
    NotAtExit { x: i16, y: i16 },
    NotEnoughCrystals { have: u8, need: u8 },
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::CannotMoveUp { x, y } => write!(f, "cannot move up at ({x},{y}): not on a ladder"),
            SimError::NoPicks { x, y } => write!(f, "no picks available at ({x},{y})"),
            SimError::NothingToMine { x, y } => write!(f, "nothing to mine at ({x},{y})"),
            SimError::NoTileToPlace { tile, x, y } => write!(f, "no {tile:?} in inventory to place at ({x},{y})"),
            SimError::CannotPlace { tile, x, y } => write!(f, "cannot place {tile:?} at ({x},{y}): occupied"),
            SimError::MovedIntoSolid { x, y } => write!(f, "moved into solid tile at ({x},{y})"),
            SimError::MovedOutOfBounds { x, y } => write!(f, "moved out of bounds at ({x},{y})"),
            SimError::InvalidMoveDirection { x, y } => write!(f, "invalid move direction at ({x},{y})"),
            SimError::NotAtExit { x, y } => write!(f, "player not at exit, at ({x},{y})"),
            SimError::NotEnoughCrystals { have, need } => {
                write!(f, "not enough crystals: have {have}, need {need}")
            }
        }
    }
}

// =============================================================================
// COMPETITION / CHALLENGE PROTOCOL
// =============================================================================

pub const DEFAULT_COMP_DUR_NS: u64 = 60 * 60 * 1_000_000_000; // 1 hour
pub const DEFAULT_TEST_DUR_NS: u64 = 15 * 60 * 1_000_000_000; // 15 minutes

#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Competition {
    pub puzzle_ids: [u64; 4],
    pub setup_data: u16,
    pub start_timestamp: u64,
    pub prize_amount: u64,
    pub comp_dur: u64,
    pub test_dur: u64,
    pub required_bond: u64,
}

impl Default for Competition {
    fn default() -> Self {
        Competition {
            puzzle_ids: [0; 4],
            setup_data: 0,
            start_timestamp: 0,
            prize_amount: 0,
            comp_dur: DEFAULT_COMP_DUR_NS,
            test_dur: DEFAULT_TEST_DUR_NS,
            required_bond: 0,
        }
    }
}

impl Competition {
    pub fn submission_deadline(&self) -> u64 {
        self.start_timestamp + self.comp_dur
    }

    pub fn test_deadline(&self) -> u64 {
        self.start_timestamp + self.comp_dur + self.test_dur
    }

    pub fn is_running(&self, now: u64) -> bool {
        now <= self.test_deadline()
    }
}

#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub enum SolutionState {
    Committed,
    Revealed,
}

#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct CurrentSolution {
    pub submitter: Principal,
    pub solution_hash: [u8; 32],
    pub revealed_moves: Option<Vec<Move>>,
    pub state: SolutionState,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProtocolError {
    BondNotEnough,
    SolutionNotEqualHash,
    CompetitionAlreadyFinished,
    OutsideTestTimeWindow,
    HashAlreadySet,
    NoSolutionOwner,
    SolutionIsValid,
    CompetitionStillRunning,
    UnclaimedPrize,
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProtocolError::BondNotEnough => "bond not enough",
            ProtocolError::SolutionNotEqualHash => "revealed solution does not match committed hash",
            ProtocolError::CompetitionAlreadyFinished => "competition already finished",
            ProtocolError::OutsideTestTimeWindow => "outside test time window",
            ProtocolError::HashAlreadySet => "a solution hash is already committed",
            ProtocolError::NoSolutionOwner => "no committed solution to act on",
            ProtocolError::SolutionIsValid => "solution is valid",
            ProtocolError::CompetitionStillRunning => "competition still running",
            ProtocolError::UnclaimedPrize => "prize already claimed or unavailable",
        };
        write!(f, "{s}")
    }
}

// =============================================================================
// BOND/PRIZE LEDGER (C6)
// =============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Balances {
    pub available: u64,
    pub locked: u64,
}

impl Storable for Balances {
    fn to_bytes(&self) -> Cow<[u8]> {
        let mut buf = Vec::with_capacity(16);
        buf.extend_from_slice(&self.available.to_le_bytes());
        buf.extend_from_slice(&self.locked.to_le_bytes());
        Cow::Owned(buf)
    }

    fn from_bytes(bytes: Cow<[u8]>) -> Self {
        let available = u64::from_le_bytes(bytes[0..8].try_into().unwrap());
        let locked = u64::from_le_bytes(bytes[8..16].try_into().unwrap());
        Balances { available, locked }
    }

    const BOUND: Bound = Bound::Bounded { max_size: 16, is_fixed_size: true };
}

// =============================================================================
// STABLE STORAGE
// =============================================================================

impl Storable for Competition {
    fn to_bytes(&self) -> Cow<[u8]> {
        Cow::Owned(serde_json::to_vec(self).unwrap())
    }

    fn from_bytes(bytes: Cow<[u8]>) -> Self {
        serde_json::from_slice(&bytes).unwrap()
    }

    const BOUND: Bound = Bound::Unbounded;
}

/// Wraps `Option<CurrentSolution>` in a local type so it can implement the
/// foreign `Storable` trait (a bare `Option<CurrentSolution>` runs into the
/// orphan rule; stable cells in this canister only ever hold locally-defined
/// structs, never a wrapped standard-library type, for exactly this reason).
#[derive(Clone, Debug, Default, PartialEq, Eq, CandidType, Deserialize, Serialize)]
pub struct CurrentSolutionSlot(pub Option<CurrentSolution>);

impl Storable for CurrentSolutionSlot {
    fn to_bytes(&self) -> Cow<[u8]> {
        Cow::Owned(serde_json::to_vec(self).unwrap())
    }

    fn from_bytes(bytes: Cow<[u8]>) -> Self {
        serde_json::from_slice(&bytes).unwrap()
    }

    const BOUND: Bound = Bound::Unbounded;
}
