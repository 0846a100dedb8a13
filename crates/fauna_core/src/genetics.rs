//! Trait inheritance and compatibility.

use fauna_data::{Sex, Traits};
use rand::{Rng, RngCore};

/// Genetic collaborator consulted by the behavior engine.
///
/// The engine only ever asks about sex, mixes two parents and measures how far
/// apart two trait sets are; how traits are stored is up to the implementor.
pub trait Genetics {
    fn is_male(&self, traits: &Traits) -> bool {
        traits.sex == Sex::Male
    }

    fn is_female(&self, traits: &Traits) -> bool {
        traits.sex == Sex::Female
    }

    /// Offspring trait set from two parents.
    fn mix(&self, mother: &Traits, father: &Traits, rng: &mut dyn RngCore) -> Traits;

    /// Dissimilarity in `[0, 1]`; 0 means identical.
    fn genetic_distance(&self, a: &Traits, b: &Traits) -> f64;

    /// Trait set for a founder with no parents.
    fn random(&self, sex: Sex, rng: &mut dyn RngCore) -> Traits;
}

/// Every gene is inherited whole from one parent chosen by a fair coin.
#[derive(Debug, Clone, Copy, Default)]
pub struct MendelianGenetics;

impl MendelianGenetics {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn pick<T>(rng: &mut dyn RngCore, from_mother: T, from_father: T) -> T {
    if rng.gen_bool(0.5) {
        from_mother
    } else {
        from_father
    }
}

fn normalized_gap(a: f32, b: f32, range: (f32, f32)) -> f64 {
    let span = f64::from(range.1 - range.0);
    if span <= 0.0 {
        return 0.0;
    }
    (f64::from((a - b).abs()) / span).min(1.0)
}

/// Distance on the hue circle, scaled so opposite hues are 1.0.
fn hue_gap(a: f32, b: f32) -> f64 {
    let diff = f64::from((a - b).abs()).rem_euclid(360.0);
    diff.min(360.0 - diff) / 180.0
}

impl Genetics for MendelianGenetics {
    fn mix(&self, mother: &Traits, father: &Traits, rng: &mut dyn RngCore) -> Traits {
        Traits {
            sex: pick(rng, mother.sex, father.sex),
            speed: pick(rng, mother.speed, father.speed),
            size: pick(rng, mother.size, father.size),
            vision: pick(rng, mother.vision, father.vision),
            hue: pick(rng, mother.hue, father.hue),
        }
    }

    fn genetic_distance(&self, a: &Traits, b: &Traits) -> f64 {
        let gaps = [
            normalized_gap(a.speed, b.speed, Traits::SPEED_RANGE),
            normalized_gap(a.size, b.size, Traits::SIZE_RANGE),
            normalized_gap(a.vision, b.vision, Traits::VISION_RANGE),
            hue_gap(a.hue, b.hue),
        ];
        gaps.iter().sum::<f64>() / gaps.len() as f64
    }

    fn random(&self, sex: Sex, rng: &mut dyn RngCore) -> Traits {
        let (speed_lo, speed_hi) = Traits::SPEED_RANGE;
        let (size_lo, size_hi) = Traits::SIZE_RANGE;
        let (vision_lo, vision_hi) = Traits::VISION_RANGE;
        Traits {
            sex,
            speed: rng.gen_range(speed_lo..=speed_hi),
            size: rng.gen_range(size_lo..=size_hi),
            vision: rng.gen_range(vision_lo..=vision_hi),
            hue: rng.gen_range(0.0..360.0),
        }
    }
}
