//! C1 (Descriptor Codec) and C2 (Solution Codec): bit-exact radix-10
//! decoding of the wire formats fixed in the descriptor and solution
//! specifications, built on the shared [`crate::bigint::DigitStream`]
//! primitive. Encoders are provided only to make the decoders testable by
//! round trip - the wire format is produced by the mint/registry layer,
//! which is out of scope here.

use num_bigint::BigUint;

use crate::bigint::{DigitStream, DigitWriter};
use crate::types::{
    Descriptor, Direction, Move, MoveKind, Solution, Tile, DESCRIPTOR_HEIGHT, DESCRIPTOR_WIDTH,
};

/// Maximum `numMoves` a solution may declare (matches an 8-bit counter).
pub const MAX_MOVES: u16 = 255;

// =============================================================================
// C1 - DESCRIPTOR CODEC
// =============================================================================

/// Decode one `(quadrant, y, x)` 3-digit object, applying the decode-time
/// adjustments: `quadrant > 2 && y < 4` adds 10 to `y`; an even `quadrant`
/// adds 10 to `x`.
fn decode_object(digits: [u8; 3]) -> (u8, u8) {
    let quadrant = digits[0];
    let mut y = digits[1];
    let mut x = digits[2];
    if quadrant > 2 && y < 4 {
        y += 10;
    }
    if quadrant % 2 == 0 {
        x += 10;
    }
    (x, y)
}

/// Inverse of [`decode_object`]: pick a `(quadrant, y, x)` digit triple that
/// decodes back to `(x, y)`. Local coordinates only (`x < 20`, `y < 14`).
fn encode_object(x: u8, y: u8) -> [u8; 3] {
    debug_assert!((x as usize) < DESCRIPTOR_WIDTH && (y as usize) < DESCRIPTOR_HEIGHT);
    let odd_quadrant_needed = x < 10;
    let quadrant = if y < 4 {
        if odd_quadrant_needed { 1 } else { 2 }
    } else if y >= 10 {
        if odd_quadrant_needed { 3 } else { 4 }
    } else if odd_quadrant_needed {
        1
    } else {
        2
    };
    let y_digit = if y >= 10 { y - 10 } else { y };
    let x_digit = if x >= 10 { x - 10 } else { x };
    [quadrant, y_digit, x_digit]
}

/// Decode a 20x14 descriptor from its four 256-bit words.
///
/// Order: 280 tile digits in row-major order, then three 3-digit objects -
/// crystal (always present), start (only if `use_start`), exit (only if
/// `use_exit`). Omitted objects still consume three digit-extraction steps
/// so later digits stay aligned; this decoder is total on any input.
pub fn decode_descriptor(words: &[BigUint; 4], use_start: bool, use_exit: bool) -> Descriptor {
    let mut stream = DigitStream::new(words);

    let mut tiles = Vec::with_capacity(DESCRIPTOR_WIDTH * DESCRIPTOR_HEIGHT);
    for _y in 0..DESCRIPTOR_HEIGHT {
        for _x in 0..DESCRIPTOR_WIDTH {
            tiles.push(Tile::from_digit(stream.next_digit()));
        }
    }

    let crystal_digits = stream.read_digits(3);
    let crystal = decode_object([crystal_digits[0], crystal_digits[1], crystal_digits[2]]);

    let start_digits = stream.read_digits(3);
    let start = if use_start {
        Some(decode_object([start_digits[0], start_digits[1], start_digits[2]]))
    } else {
        None
    };

    let exit_digits = stream.read_digits(3);
    let exit = if use_exit {
        Some(decode_object([exit_digits[0], exit_digits[1], exit_digits[2]]))
    } else {
        None
    };

    Descriptor { tiles, crystal, start, exit }
}

/// Encode a descriptor back into its four 256-bit words. Test-only inverse
/// of [`decode_descriptor`]; always writes placeholder start/exit objects
/// (as `(0, 0)`) when the corresponding field is `None`, matching the
/// decoder's "still consume three digit positions" rule.
pub fn encode_descriptor(descriptor: &Descriptor) -> [BigUint; 4] {
    let mut writer = DigitWriter::new();
    for tile in &descriptor.tiles {
        writer.write_digit(tile.to_digit());
    }
    writer.write_digits(&encode_object(descriptor.crystal.0, descriptor.crystal.1));
    let (sx, sy) = descriptor.start.unwrap_or((0, 0));
    writer.write_digits(&encode_object(sx, sy));
    let (ex, ey) = descriptor.exit.unwrap_or((0, 0));
    writer.write_digits(&encode_object(ex, ey));

    let words = writer.finish_padded(4);
    [
        words[0].clone(),
        words[1].clone(),
        words[2].clone(),
        words[3].clone(),
    ]
}

// =============================================================================
// C2 - SOLUTION CODEC
// =============================================================================

/// Decode a variable-length array of 256-bit words into a typed [`Solution`].
/// `words[0]`'s lowest three decimal digits (LSD-first) are `numMoves`;
/// every digit after that is a `(moveKind, moveDirection)` pair, two digits
/// per move. Exactly `numMoves` moves are returned; trailing digits are
/// padding and ignored. Unrecognised kind/direction digits decode to `None`
/// and are skipped - the move stream they appear in is still fully consumed
/// so alignment with later moves is preserved, but the simulator never
/// receives an invalid `Move`.
pub fn decode_solution(words: &[BigUint]) -> Solution {
    let mut stream = DigitStream::new(words);

    let counter_digits = stream.read_digits(3);
    let num_moves = (counter_digits[0] as u16)
        + (counter_digits[1] as u16) * 10
        + (counter_digits[2] as u16) * 100;
    let num_moves = num_moves.min(MAX_MOVES);

    let mut moves = Vec::with_capacity(num_moves as usize);
    for _ in 0..num_moves {
        let kind_digit = stream.next_digit();
        let dir_digit = stream.next_digit();
        if let (Some(kind), Some(direction)) = (
            MoveKind::from_digit(kind_digit),
            Direction::from_digit(dir_digit),
        ) {
            moves.push(Move { kind, direction });
        }
    }
    Solution { num_moves, moves }
}

/// Encode a solution into its wire words. Test-only inverse of
/// [`decode_solution`]. `solution.num_moves` is re-derived from
/// `solution.moves.len()` rather than trusted as-is, so a caller that built
/// a `Solution` by hand can't desync the two fields on the wire.
pub fn encode_solution(solution: &Solution) -> Vec<BigUint> {
    let moves = &solution.moves;
    let num_moves = (moves.len() as u16).min(MAX_MOVES);
    let mut writer = DigitWriter::new();
    writer.write_digit((num_moves % 10) as u8);
    writer.write_digit(((num_moves / 10) % 10) as u8);
    writer.write_digit(((num_moves / 100) % 10) as u8);

    for mv in moves.iter().take(num_moves as usize) {
        writer.write_digit(mv.kind as u8);
        writer.write_digit(mv.direction as u8);
    }

    writer.finish_padded(1)
}
