use std::collections::BTreeMap;

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// One ChaCha8 stream per phase, all keyed from the scenario seed.
///
/// A phase's stream is selected by hashing its name into the ChaCha stream
/// id, so the numbers a phase draws depend only on the seed and on how much
/// that phase has drawn so far. Adding, removing or reordering other phases
/// leaves it untouched.
pub struct PhaseStreams {
    seed: u64,
    streams: BTreeMap<String, ChaCha8Rng>,
}

impl PhaseStreams {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            streams: BTreeMap::new(),
        }
    }

    pub fn stream(&mut self, phase: &str) -> PhaseRng<'_> {
        let seed = self.seed;
        let inner = self
            .streams
            .entry(phase.to_owned())
            .or_insert_with(|| open_stream(seed, phase));
        PhaseRng { inner }
    }
}

fn open_stream(seed: u64, phase: &str) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(stream_id(phase));
    rng
}

// 64-bit FNV-1a
fn stream_id(phase: &str) -> u64 {
    phase.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0000_0100_0000_01b3)
    })
}

/// Borrowed handle on one phase's stream.
pub struct PhaseRng<'a> {
    inner: &'a mut ChaCha8Rng,
}

impl RngCore for PhaseRng<'_> {
    fn next_u32(&mut self) -> u32 {
        self.inner.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.inner.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.inner.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.inner.try_fill_bytes(dest)
    }
}

#[cfg(test)]
mod tests {
    use rand::Rng;

    use super::*;

    fn draws(streams: &mut PhaseStreams, phase: &str, n: usize) -> Vec<u64> {
        let mut rng = streams.stream(phase);
        (0..n).map(|_| rng.gen()).collect()
    }

    #[test]
    fn same_seed_same_streams() {
        let mut a = PhaseStreams::new(42);
        let mut b = PhaseStreams::new(42);
        assert_eq!(draws(&mut a, "war", 4), draws(&mut b, "war", 4));
        assert_ne!(
            draws(&mut PhaseStreams::new(43), "war", 4),
            draws(&mut PhaseStreams::new(42), "war", 4)
        );
    }

    #[test]
    fn phases_do_not_share_numbers() {
        let mut streams = PhaseStreams::new(42);
        assert_ne!(draws(&mut streams, "war", 4), draws(&mut streams, "technology", 4));
        assert_ne!(stream_id("war"), stream_id("technology"));
    }

    #[test]
    fn first_use_order_does_not_matter() {
        let mut war_first = PhaseStreams::new(7);
        let war = draws(&mut war_first, "war", 3);
        let tech = draws(&mut war_first, "technology", 3);

        let mut tech_first = PhaseStreams::new(7);
        draws(&mut tech_first, "lifecycle", 5);
        assert_eq!(draws(&mut tech_first, "technology", 3), tech);
        assert_eq!(draws(&mut tech_first, "war", 3), war);
    }

    #[test]
    fn a_stream_resumes_where_it_stopped() {
        let mut whole = PhaseStreams::new(42);
        let expected = draws(&mut whole, "war", 4);

        let mut split = PhaseStreams::new(42);
        let mut got = draws(&mut split, "war", 2);
        draws(&mut split, "diplomacy", 2);
        got.extend(draws(&mut split, "war", 2));
        assert_eq!(got, expected);
    }
}
