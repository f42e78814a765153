//! Seeded random streams
//!
//! A trial is driven by a single `u64` seed. Each consumer draws from its own
//! ChaCha stream of that seed, so the topology, the workload and every
//! message's routing decisions never shift one another's draws.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use churn_core::MessageId;

/// Stream used by topology generation and mutation
pub const TOPOLOGY_STREAM: u64 = 0;

/// Stream used by the workload generator
pub const WORKLOAD_STREAM: u64 = 1;

/// First stream used for per-message routing
const ROUTING_STREAM_BASE: u64 = 2;

/// Generator for stream `stream` of `seed`
pub fn stream(seed: u64, stream: u64) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(stream);
    rng
}

/// Generator for the routing decisions of one message
pub fn routing_stream(seed: u64, message: MessageId) -> ChaCha8Rng {
    stream(seed, ROUTING_STREAM_BASE.wrapping_add(message.0))
}

/// Derive a child seed from a base seed and a list of coordinates
///
/// Pure function of its inputs; used to give every heatmap trial its own
/// reproducible seed.
pub fn mix_seed(base: u64, parts: &[u64]) -> u64 {
    parts
        .iter()
        .fold(splitmix64(base), |acc, &part| {
            splitmix64(acc ^ part.wrapping_mul(0x517c_c1b7_2722_0a95))
        })
}

fn splitmix64(value: u64) -> u64 {
    let mut z = value.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}
