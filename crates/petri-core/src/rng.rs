use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;

/// RNG type owned by a colony and threaded through every random draw.
pub type ColonyRng = ChaCha12Rng;

/// Create a deterministic RNG from a seed.
pub fn create_rng(seed: u64) -> ColonyRng {
    ChaCha12Rng::seed_from_u64(seed)
}
