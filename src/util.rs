use rand::Rng;
use rand::seq::SliceRandom;

pub fn shuffle<T, R: Rng + ?Sized>(rng: &mut R, items: &mut [T]) {
    items.shuffle(rng);
}

/// Inclusive on both ends. Swaps the bounds if they arrive reversed.
pub fn random_int<R: Rng + ?Sized>(rng: &mut R, min: u32, max: u32) -> u32 {
    let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
    rng.gen_range(lo..=hi)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    #[test]
    fn test_random_int_stays_in_range() {
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..500 {
            let n = random_int(&mut rng, 1, 3);
            assert!((1..=3).contains(&n));
        }
    }

    #[test]
    fn test_random_int_degenerate_range() {
        let mut rng = SmallRng::seed_from_u64(7);
        assert_eq!(random_int(&mut rng, 4, 4), 4);
        let n = random_int(&mut rng, 5, 2);
        assert!((2..=5).contains(&n));
    }

    #[test]
    fn test_shuffle_keeps_members() {
        let mut rng = SmallRng::seed_from_u64(42);
        let mut items: Vec<u32> = (0..20).collect();
        shuffle(&mut rng, &mut items);
        let mut sorted = items.clone();
        sorted.sort();
        assert_eq!(sorted, (0..20).collect::<Vec<_>>());
    }
}
