use mocap_core::common::markers::{MarkerMap, MarkerSet};
use mocap_utils::vector::missing_v3f;
use rand::{
    distributions::{Distribution, WeightedIndex},
    rngs::StdRng,
    seq::SliceRandom,
    Rng, SeedableRng,
};

/// Probability of occluding 1, 2, 3 or 4 markers at once
pub const OCCLUSION_COUNT_WEIGHTS: [f32; 4] = [0.70, 0.17, 0.08, 0.05];

/// How many markers are hidden per frame
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OcclusionCount {
    /// 1 to 4 markers following [`OCCLUSION_COUNT_WEIGHTS`]
    Weighted,
    /// Uniformly between the two bounds, inclusive
    Range(usize, usize),
}

/// Hides random markers of complete frames, reproducibly for a given seed
#[derive(Clone, Debug)]
pub struct OcclusionSimulator {
    rng: StdRng,
    count: OcclusionCount,
    weights: WeightedIndex<f32>,
}
impl OcclusionSimulator {
    /// Simulator with the weighted occlusion count
    pub fn new(seed: u64) -> Self {
        Self::with_count(seed, OcclusionCount::Weighted)
    }
    /// Simulator with a given occlusion count distribution
    pub fn with_count(seed: u64, count: OcclusionCount) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            count,
            weights: WeightedIndex::new(OCCLUSION_COUNT_WEIGHTS).expect("occlusion count weights are positive"),
        }
    }
    /// Draws the number of markers to hide
    pub fn sample_count(&mut self) -> usize {
        match self.count {
            OcclusionCount::Weighted => self.weights.sample(&mut self.rng) + 1,
            OcclusionCount::Range(lo, hi) => self.rng.gen_range(lo.min(hi)..=hi.max(lo)),
        }
    }
    /// Picks distinct markers of `universe` to hide
    pub fn choose(&mut self, universe: &[String]) -> MarkerSet {
        let n = self.sample_count().min(universe.len());
        universe.choose_multiple(&mut self.rng, n).cloned().collect()
    }
    /// Replaces the positions of the chosen markers with the missing value and
    /// returns them
    pub fn occlude(&mut self, frame: &mut MarkerMap, universe: &[String]) -> MarkerSet {
        let hidden = self.choose(universe);
        for marker in &hidden {
            frame.insert(marker.clone(), missing_v3f());
        }
        hidden
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mocap_utils::vector::{is_missing_v3f, Vector3f};

    fn universe() -> Vec<String> {
        (0..9).map(|i| format!("m{i}")).collect()
    }

    #[test]
    fn test_same_seed_same_occlusions() {
        let mut a = OcclusionSimulator::new(7);
        let mut b = OcclusionSimulator::new(7);
        for _ in 0..20 {
            assert_eq!(a.choose(&universe()), b.choose(&universe()));
        }
    }

    #[test]
    fn test_weighted_counts_follow_the_weights() {
        let mut sim = OcclusionSimulator::new(1);
        let mut histogram = [0usize; 4];
        for _ in 0..4000 {
            let n = sim.sample_count();
            assert!((1..=4).contains(&n));
            histogram[n - 1] += 1;
        }
        // expected 2800, 680, 320, 200
        assert!((2600..3000).contains(&histogram[0]));
        assert!((550..810).contains(&histogram[1]));
        assert!((230..410).contains(&histogram[2]));
        assert!((130..270).contains(&histogram[3]));
    }

    #[test]
    fn test_fixed_range_and_small_universe() {
        let mut sim = OcclusionSimulator::with_count(3, OcclusionCount::Range(2, 2));
        assert_eq!(sim.choose(&universe()).len(), 2);
        let tiny = vec!["a".to_string()];
        assert_eq!(sim.choose(&tiny).len(), 1);
    }

    #[test]
    fn test_occlude_marks_missing() {
        let mut sim = OcclusionSimulator::with_count(5, OcclusionCount::Range(3, 3));
        let mut frame: MarkerMap = universe().into_iter().map(|m| (m, Vector3f::zeros())).collect();
        let hidden = sim.occlude(&mut frame, &universe());
        assert_eq!(hidden.len(), 3);
        assert_eq!(frame.values().filter(|p| is_missing_v3f(p)).count(), 3);
    }
}
