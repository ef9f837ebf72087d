//! C3 - Board Composer: assembles a 40x28 [`CompositeBoard`] out of four
//! 20x14 [`Descriptor`]s, picking which quadrant supplies the start cell,
//! which supplies the exit cell, and the crystal target for the whole
//! composite.

use crate::types::{
    CompositeBoard, Descriptor, COMPOSITE_HEIGHT, COMPOSITE_WIDTH, DESCRIPTOR_HEIGHT,
    DESCRIPTOR_WIDTH,
};

/// `setupData`'s three decimal digits, LSD-first: start quadrant, exit
/// quadrant, target crystal count. Both quadrants are forced into `0..=3`
/// by taking them mod 4.
pub struct SetupData {
    pub start_quadrant: u8,
    pub exit_quadrant: u8,
    pub target_crystals: u8,
}

impl SetupData {
    pub fn decode(setup_data: u16) -> SetupData {
        let digit0 = (setup_data % 10) as u8;
        let digit1 = ((setup_data / 10) % 10) as u8;
        let digit2 = ((setup_data / 100) % 10) as u8;
        SetupData {
            start_quadrant: digit0 % 4,
            exit_quadrant: digit1 % 4,
            target_crystals: digit2,
        }
    }
}

/// Quadrant index `k` maps to the 20x14 subframe at offset
/// `(k mod 2 * 20, k div 2 * 14)`.
pub fn quadrant_offset(k: u8) -> (usize, usize) {
    let kx = (k % 2) as usize;
    let ky = (k / 2) as usize;
    (kx * DESCRIPTOR_WIDTH, ky * DESCRIPTOR_HEIGHT)
}

/// Assemble the composite board. `descriptors[k]` must already have been
/// decoded with `use_start = (k == setup.start_quadrant)` and
/// `use_exit = (k == setup.exit_quadrant)` (see [`crate::codec::decode_descriptor`]).
pub fn compose_board(descriptors: &[Descriptor; 4], setup: &SetupData) -> (CompositeBoard, u8) {
    let mut tiles = vec![crate::types::Tile::None; COMPOSITE_WIDTH * COMPOSITE_HEIGHT];
    let mut player = (0i16, 0i16);
    let mut exit = (0i16, 0i16);

    for (k, descriptor) in descriptors.iter().enumerate() {
        let (x_off, y_off) = quadrant_offset(k as u8);

        for y in 0..DESCRIPTOR_HEIGHT {
            for x in 0..DESCRIPTOR_WIDTH {
                let tile = descriptor.tile_at(x, y);
                let gx = x_off + x;
                let gy = y_off + y;
                tiles[gy * COMPOSITE_WIDTH + gx] = tile;
            }
        }

        let (cx, cy) = descriptor.crystal;
        let gx = x_off + cx as usize;
        let gy = y_off + cy as usize;
        tiles[gy * COMPOSITE_WIDTH + gx] = crate::types::Tile::Crystal;

        if k as u8 == setup.start_quadrant {
            if let Some((sx, sy)) = descriptor.start {
                player = ((x_off + sx as usize) as i16, (y_off + sy as usize) as i16);
            }
        }
        if k as u8 == setup.exit_quadrant {
            if let Some((ex, ey)) = descriptor.exit {
                exit = ((x_off + ex as usize) as i16, (y_off + ey as usize) as i16);
            }
        }
    }

    (CompositeBoard { tiles, player, exit }, setup.target_crystals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Tile;

    fn blank_descriptor(crystal: (u8, u8), start: Option<(u8, u8)>, exit: Option<(u8, u8)>) -> Descriptor {
        Descriptor {
            tiles: vec![Tile::None; DESCRIPTOR_WIDTH * DESCRIPTOR_HEIGHT],
            crystal,
            start,
            exit,
        }
    }

    #[test]
    fn setup_data_decodes_lsd_first_digits() {
        // 3-1-2 means digit0=3 (start quadrant before mod), digit1=1 (exit), digit2=2 (target)
        let setup = SetupData::decode(213);
        assert_eq!(setup.start_quadrant, 3 % 4);
        assert_eq!(setup.exit_quadrant, 1);
        assert_eq!(setup.target_crystals, 2);
    }

    #[test]
    fn quadrant_offsets_tile_the_composite_board() {
        assert_eq!(quadrant_offset(0), (0, 0));
        assert_eq!(quadrant_offset(1), (20, 0));
        assert_eq!(quadrant_offset(2), (0, 14));
        assert_eq!(quadrant_offset(3), (20, 14));
    }

    #[test]
    fn compose_places_start_exit_and_crystals_per_quadrant() {
        let descriptors = [
            blank_descriptor((0, 0), Some((5, 5)), None),
            blank_descriptor((1, 1), None, Some((3, 2))),
            blank_descriptor((2, 2), None, None),
            blank_descriptor((3, 3), None, None),
        ];
        let setup = SetupData { start_quadrant: 0, exit_quadrant: 1, target_crystals: 4 };
        let (board, target) = compose_board(&descriptors, &setup);

        assert_eq!(board.player, (5, 5));
        assert_eq!(board.exit, (20 + 3, 2));
        assert_eq!(target, 4);

        // Each quadrant contributes exactly one crystal cell.
        assert_eq!(board.get(0, 0), Some(Tile::Crystal));
        assert_eq!(board.get(21, 1), Some(Tile::Crystal));
        assert_eq!(board.get(2, 16), Some(Tile::Crystal));
        assert_eq!(board.get(23, 17), Some(Tile::Crystal));
    }
}
