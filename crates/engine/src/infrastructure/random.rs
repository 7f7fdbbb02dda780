//! Random implementations.

use crate::infrastructure::ports::RandomPort;

/// System random - uses real randomness.
pub struct SystemRandom;

impl SystemRandom {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SystemRandom {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomPort for SystemRandom {
    fn gen_range(&self, min: i32, max: i32) -> i32 {
        use rand::Rng;
        if min >= max {
            return min;
        }
        rand::thread_rng().gen_range(min..=max)
    }
}

/// Fixed random for testing and replays.
pub struct FixedRandom(pub i32);

impl RandomPort for FixedRandom {
    fn gen_range(&self, min: i32, max: i32) -> i32 {
        self.0.clamp(min, max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_random_stays_in_range() {
        let random = SystemRandom::new();
        for _ in 0..200 {
            let roll = random.gen_range(1, 20);
            assert!((1..=20).contains(&roll));
        }
        assert_eq!(random.gen_range(5, 5), 5);
    }

    #[test]
    fn fixed_random_is_clamped() {
        assert_eq!(FixedRandom(25).gen_range(1, 20), 20);
        assert_eq!(FixedRandom(12).gen_range(1, 20), 12);
    }
}
