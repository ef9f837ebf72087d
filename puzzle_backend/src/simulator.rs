//! C4 - Simulator: executes a decoded move stream against a
//! [`CompositeBoard`] under gravity, pickups, mining and placement, and
//! decides success or failure in finite time.
//!
//! Total step count is bounded by `moves.len() + (moves.len() + 1) *
//! COMPOSITE_HEIGHT`: gravity runs once before the first move and once
//! after each move, and each gravity pass strictly decreases the distance
//! to the floor, so it terminates in at most `COMPOSITE_HEIGHT` steps.
//! There is no other source of iteration, so the simulator is total on any
//! input - it never loops, and it always returns `Ok` or a tagged
//! [`SimError`].

use crate::types::{CompositeBoard, Direction, Inventory, Move, MoveKind, SimError, Tile};

/// Run gravity and pickup from the player's current cell, exactly once.
/// Called at initialization and after every move.
pub(crate) fn gravity_and_pickup(board: &mut CompositeBoard, inventory: &mut Inventory) {
    let (x, y) = board.player;

    // A ladder under the player suspends gravity outright.
    if board.get(x, y) == Some(Tile::SoftLadder) {
        return;
    }

    // Pickup on the player's own starting cell - not a cell fallen through.
    match board.get(x, y) {
        Some(Tile::Pick) => {
            inventory.picks = inventory.picks.saturating_add(1);
            board.set(x, y, Tile::None);
        }
        Some(Tile::Crystal) => {
            inventory.crystals = inventory.crystals.saturating_add(1);
            board.set(x, y, Tile::None);
        }
        _ => {}
    }

    loop {
        let (x, y) = board.player;
        if (y as usize) >= crate::types::COMPOSITE_HEIGHT - 1 {
            break;
        }
        match board.get(x, y + 1) {
            Some(tile) if tile.is_standable() => break,
            Some(Tile::Pick) => {
                inventory.picks = inventory.picks.saturating_add(1);
                board.set(x, y + 1, Tile::None);
            }
            Some(Tile::Crystal) => {
                inventory.crystals = inventory.crystals.saturating_add(1);
                board.set(x, y + 1, Tile::None);
            }
            _ => {}
        }
        board.player = (x, y + 1);
    }
}

fn apply_move(board: &mut CompositeBoard, inventory: &mut Inventory, mv: &Move) -> Result<(), SimError> {
    let (x, y) = board.player;

    match mv.kind {
        MoveKind::Move => {
            let (dx, dy) = match mv.direction {
                Direction::Left => (-1, 0),
                Direction::Right => (1, 0),
                Direction::Up => (0, -1),
                Direction::Down => (0, 1),
                // Diagonal directions are unreachable for Move, and Wait is
                // reserved - both reject rather than falling through to a
                // default direction.
                _ => return Err(SimError::InvalidMoveDirection { x, y }),
            };
            if mv.direction == Direction::Up && board.get(x, y) != Some(Tile::SoftLadder) {
                return Err(SimError::CannotMoveUp { x, y });
            }
            let (nx, ny) = (x + dx, y + dy);
            if !board.in_bounds(nx, ny) {
                return Err(SimError::MovedOutOfBounds { x: nx, y: ny });
            }
            board.player = (nx, ny);
        }

        MoveKind::Mine => {
            let (dx, dy) = mv
                .direction
                .offset()
                .ok_or(SimError::InvalidMoveDirection { x, y })?;
            if inventory.picks == 0 {
                return Err(SimError::NoPicks { x, y });
            }
            let (tx, ty) = (x + dx, y + dy);
            match board.get(tx, ty) {
                Some(Tile::SoftBlock) => inventory.soft_tiles = inventory.soft_tiles.saturating_add(1),
                Some(Tile::SoftLadder) => inventory.ladders = inventory.ladders.saturating_add(1),
                _ => return Err(SimError::NothingToMine { x: tx, y: ty }),
            }
            inventory.picks -= 1;
            board.set(tx, ty, Tile::None);
        }

        MoveKind::PlaceBlock => {
            let (dx, dy) = mv
                .direction
                .offset()
                .ok_or(SimError::InvalidMoveDirection { x, y })?;
            if inventory.soft_tiles == 0 {
                return Err(SimError::NoTileToPlace { tile: Tile::SoftBlock, x, y });
            }
            let (tx, ty) = (x + dx, y + dy);
            match board.get(tx, ty) {
                Some(Tile::None) => {}
                _ => return Err(SimError::CannotPlace { tile: Tile::SoftBlock, x: tx, y: ty }),
            }
            inventory.soft_tiles -= 1;
            board.set(tx, ty, Tile::SoftBlock);
        }

        MoveKind::PlaceLadder => {
            let (dx, dy) = mv
                .direction
                .offset()
                .ok_or(SimError::InvalidMoveDirection { x, y })?;
            if inventory.ladders == 0 {
                return Err(SimError::NoTileToPlace { tile: Tile::SoftLadder, x, y });
            }
            let (tx, ty) = (x + dx, y + dy);
            match board.get(tx, ty) {
                Some(Tile::None) => {}
                _ => return Err(SimError::CannotPlace { tile: Tile::SoftLadder, x: tx, y: ty }),
            }
            inventory.ladders -= 1;
            board.set(tx, ty, Tile::SoftLadder);
        }
    }

    Ok(())
}

/// Strict entry point: simulate `moves` against `board`, starting from a
/// fresh zero [`Inventory`], and return the terminal tagged reason on
/// failure.
pub fn simulate_strict(board: &mut CompositeBoard, moves: &[Move], target_crystals: u8) -> Result<(), SimError> {
    let mut inventory = Inventory::default();
    run(board, &mut inventory, moves, target_crystals)
}

/// Same as [`simulate_strict`] but also returns the final inventory, for
/// callers (and tests) that want to inspect pickup counts.
pub fn simulate_strict_with_inventory(
    board: &mut CompositeBoard,
    moves: &[Move],
    target_crystals: u8,
) -> (Result<(), SimError>, Inventory) {
    let mut inventory = Inventory::default();
    let result = run(board, &mut inventory, moves, target_crystals);
    (result, inventory)
}

fn run(board: &mut CompositeBoard, inventory: &mut Inventory, moves: &[Move], target_crystals: u8) -> Result<(), SimError> {
    gravity_and_pickup(board, inventory);

    for mv in moves {
        apply_move(board, inventory, mv)?;

        let (x, y) = board.player;
        if let Some(tile) = board.get(x, y) {
            if tile.is_solid() {
                return Err(SimError::MovedIntoSolid { x, y });
            }
        }

        gravity_and_pickup(board, inventory);
    }

    let (x, y) = board.player;
    if (x, y) != board.exit {
        return Err(SimError::NotAtExit { x, y });
    }
    if inventory.crystals < target_crystals {
        return Err(SimError::NotEnoughCrystals { have: inventory.crystals, need: target_crystals });
    }

    Ok(())
}

/// Boolean entry point: never propagates a failure reason. This is what the
/// challenge protocol (C5) invokes.
pub fn simulate(board: &mut CompositeBoard, moves: &[Move], target_crystals: u8) -> bool {
    simulate_strict(board, moves, target_crystals).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{COMPOSITE_HEIGHT, COMPOSITE_WIDTH};

    fn blank_board() -> CompositeBoard {
        CompositeBoard {
            tiles: vec![Tile::None; COMPOSITE_WIDTH * COMPOSITE_HEIGHT],
            player: (0, 0),
            exit: (0, 0),
        }
    }

    #[test]
    fn gravity_stops_on_standable_tile() {
        let mut board = blank_board();
        board.set(0, 1, Tile::SoftBlock);
        board.player = (0, 0);
        let mut inventory = Inventory::default();
        gravity_and_pickup(&mut board, &mut inventory);
        assert_eq!(board.player, (0, 0));
    }

    #[test]
    fn gravity_falls_through_hard_block_and_stops_at_floor() {
        let mut board = blank_board();
        board.set(0, COMPOSITE_HEIGHT as i16 - 1, Tile::HardBlock);
        board.player = (0, 0);
        let mut inventory = Inventory::default();
        gravity_and_pickup(&mut board, &mut inventory);
        assert_eq!(board.player, (0, COMPOSITE_HEIGHT as i16 - 1));
    }

    #[test]
    fn gravity_suspends_on_ladder_under_player() {
        let mut board = blank_board();
        board.set(0, 0, Tile::SoftLadder);
        board.player = (0, 0);
        let mut inventory = Inventory::default();
        gravity_and_pickup(&mut board, &mut inventory);
        assert_eq!(board.player, (0, 0));
    }

    #[test]
    fn gravity_collects_pick_and_crystal_while_falling() {
        let mut board = blank_board();
        board.set(0, 1, Tile::Pick);
        board.set(0, 2, Tile::Crystal);
        board.set(0, 3, Tile::SoftBlock);
        board.player = (0, 0);
        let mut inventory = Inventory::default();
        gravity_and_pickup(&mut board, &mut inventory);
        assert_eq!(board.player, (0, 2));
        assert_eq!(inventory.picks, 1);
        assert_eq!(inventory.crystals, 1);
        assert_eq!(board.get(0, 1), Some(Tile::None));
        assert_eq!(board.get(0, 2), Some(Tile::None));
    }

    /// The last row - placing the player there makes initialization's
    /// gravity pass a no-op regardless of the rest of the (blank) board, so
    /// these move-validation tests aren't entangled with fall behavior.
    const FLOOR: i16 = COMPOSITE_HEIGHT as i16 - 1;

    #[test]
    fn move_up_requires_ladder() {
        let mut board = blank_board();
        board.player = (0, FLOOR);
        board.exit = (0, FLOOR);
        let moves = vec![Move { kind: MoveKind::Move, direction: Direction::Up }];
        let result = simulate_strict(&mut board, &moves, 0);
        assert_eq!(result, Err(SimError::CannotMoveUp { x: 0, y: FLOOR }));
    }

    #[test]
    fn diagonal_move_is_rejected() {
        let mut board = blank_board();
        board.player = (1, FLOOR);
        let moves = vec![Move { kind: MoveKind::Move, direction: Direction::RightDown }];
        let result = simulate_strict(&mut board, &moves, 0);
        assert_eq!(result, Err(SimError::InvalidMoveDirection { x: 1, y: FLOOR }));
    }

    #[test]
    fn wait_direction_is_rejected_on_every_kind() {
        let mut board = blank_board();
        board.player = (1, FLOOR);
        let moves = vec![Move { kind: MoveKind::Mine, direction: Direction::Wait }];
        let result = simulate_strict(&mut board, &moves, 0);
        assert_eq!(result, Err(SimError::InvalidMoveDirection { x: 1, y: FLOOR }));
    }

    #[test]
    fn moving_left_off_the_edge_fails_rather_than_wrapping() {
        let mut board = blank_board();
        board.set(0, 1, Tile::SoftBlock); // pins the player at row 0 instead of falling
        board.player = (0, 0);
        let moves = vec![Move { kind: MoveKind::Move, direction: Direction::Left }];
        let result = simulate_strict(&mut board, &moves, 0);
        assert_eq!(result, Err(SimError::MovedOutOfBounds { x: -1, y: 0 }));
    }

    #[test]
    fn mine_requires_a_pick() {
        let mut board = blank_board();
        board.player = (1, FLOOR);
        board.set(2, FLOOR, Tile::SoftBlock);
        let moves = vec![Move { kind: MoveKind::Mine, direction: Direction::Right }];
        let result = simulate_strict(&mut board, &moves, 0);
        assert_eq!(result, Err(SimError::NoPicks { x: 1, y: FLOOR }));
    }

    #[test]
    fn mine_and_place_conserve_board_and_inventory() {
        let mut board = blank_board();
        board.set(1, FLOOR, Tile::Pick); // collected on init so the Mine below has a pick to spend
        board.set(2, FLOOR, Tile::SoftBlock);
        board.player = (1, FLOOR);
        board.exit = (1, FLOOR);
        let moves = vec![
            Move { kind: MoveKind::Mine, direction: Direction::Right },
            Move { kind: MoveKind::PlaceBlock, direction: Direction::Right },
        ];
        let (result, inventory) = simulate_strict_with_inventory(&mut board, &moves, 0);
        assert!(result.is_ok());
        assert_eq!(inventory.soft_tiles, 0);
        assert_eq!(inventory.picks, 0);
        assert_eq!(board.get(2, FLOOR), Some(Tile::SoftBlock));
    }

    #[test]
    fn not_at_exit_fails() {
        let mut board = blank_board();
        board.player = (0, FLOOR);
        board.exit = (5, 5);
        let result = simulate_strict(&mut board, &[], 0);
        assert_eq!(result, Err(SimError::NotAtExit { x: 0, y: FLOOR }));
    }

    #[test]
    fn not_enough_crystals_fails() {
        let mut board = blank_board();
        board.player = (0, FLOOR);
        board.exit = (0, FLOOR);
        let result = simulate_strict(&mut board, &[], 1);
        assert_eq!(result, Err(SimError::NotEnoughCrystals { have: 0, need: 1 }));
    }

    #[test]
    fn boolean_entry_point_never_propagates_a_reason() {
        let mut board = blank_board();
        board.player = (0, 0);
        let moves = vec![Move { kind: MoveKind::Move, direction: Direction::Up }];
        assert!(!simulate(&mut board, &moves, 0));
    }

    #[test]
    fn determinism_repeated_invocation_same_result() {
        let moves = vec![Move { kind: MoveKind::Move, direction: Direction::Right }];
        let mut board_a = blank_board();
        board_a.player = (0, 0);
        board_a.exit = (1, 0);
        let mut board_b = board_a.clone();

        let result_a = simulate(&mut board_a, &moves, 0);
        let result_b = simulate(&mut board_b, &moves, 0);
        assert_eq!(result_a, result_b);
        assert_eq!(board_a, board_b);
    }
}
