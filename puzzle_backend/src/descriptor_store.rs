//! Stable-map-backed [`DescriptorStore`]: the registry of minted puzzle
//! descriptors, keyed by puzzle id. Minting itself (who may register a new
//! descriptor and how its wire words are validated) lives outside this
//! canister's scope; this module only stores and serves already-encoded
//! descriptors, the same shape as any other stable-map-backed game-history
//! table in this codebase.

use ic_stable_structures::memory_manager::MemoryId;
use ic_stable_structures::storable::Bound;
use ic_stable_structures::{StableBTreeMap, Storable};
use num_bigint::BigUint;
use std::borrow::Cow;
use std::cell::RefCell;

use crate::challenge::DescriptorStore;
use crate::{Memory, DESCRIPTOR_STORE_MEMORY_ID, MEMORY_MANAGER};

/// The four 256-bit wire words of a descriptor, stored as big-endian byte
/// strings so ordering/size stays fixed regardless of each `BigUint`'s
/// significant-digit count.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PuzzleWords(pub [BigUint; 4]);

const WORD_BYTES: usize = 32;

impl Storable for PuzzleWords {
    fn to_bytes(&self) -> Cow<[u8]> {
        let mut buf = Vec::with_capacity(WORD_BYTES * 4);
        for word in &self.0 {
            let mut bytes = word.to_bytes_be();
            if bytes.len() < WORD_BYTES {
                let mut padded = vec![0u8; WORD_BYTES - bytes.len()];
                padded.append(&mut bytes);
                bytes = padded;
            }
            buf.extend_from_slice(&bytes);
        }
        Cow::Owned(buf)
    }

    fn from_bytes(bytes: Cow<[u8]>) -> Self {
        let words = [
            BigUint::from_bytes_be(&bytes[0..WORD_BYTES]),
            BigUint::from_bytes_be(&bytes[WORD_BYTES..WORD_BYTES * 2]),
            BigUint::from_bytes_be(&bytes[WORD_BYTES * 2..WORD_BYTES * 3]),
            BigUint::from_bytes_be(&bytes[WORD_BYTES * 3..WORD_BYTES * 4]),
        ];
        PuzzleWords(words)
    }

    const BOUND: Bound = Bound::Bounded {
        max_size: (WORD_BYTES * 4) as u32,
        is_fixed_size: true,
    };
}

thread_local! {
    static PUZZLES: RefCell<StableBTreeMap<u64, PuzzleWords, Memory>> = RefCell::new(
        StableBTreeMap::init(
            MEMORY_MANAGER.with(|m| m.borrow().get(MemoryId::new(DESCRIPTOR_STORE_MEMORY_ID))),
        )
    );
}

/// Register a freshly minted descriptor's wire words under `id`, overwriting
/// any prior entry at the same id.
pub fn mint(id: u64, words: [BigUint; 4]) {
    PUZZLES.with(|p| {
        p.borrow_mut().insert(id, PuzzleWords(words));
    });
}

pub fn puzzle_count() -> u64 {
    PUZZLES.with(|p| p.borrow().len())
}

/// Stable-storage-backed [`DescriptorStore`] used by the live canister.
pub struct StableDescriptorStore;

impl DescriptorStore for StableDescriptorStore {
    fn get_puzzle(&self, id: u64) -> Option<[BigUint; 4]> {
        PUZZLES.with(|p| p.borrow().get(&id).map(|w| w.0))
    }

    fn total_minted(&self) -> u64 {
        puzzle_count()
    }
}
