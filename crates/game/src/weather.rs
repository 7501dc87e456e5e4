//! Weather only matters to the simulation through wind strength and gravity.

use engine_core::Vec3;
use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeatherKind {
    Clear,
    Rain,
    Snow,
    Fog,
    Storm,
}

const WEIGHTS: [(WeatherKind, f32); 5] = [
    (WeatherKind::Clear, 0.4),
    (WeatherKind::Rain, 0.25),
    (WeatherKind::Snow, 0.15),
    (WeatherKind::Fog, 0.1),
    (WeatherKind::Storm, 0.1),
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weather {
    pub kind: WeatherKind,
    /// 0 to 1.
    pub intensity: f32,
}

impl Default for Weather {
    fn default() -> Self {
        Self {
            kind: WeatherKind::Clear,
            intensity: 0.0,
        }
    }
}

impl Weather {
    pub fn new(kind: WeatherKind, intensity: f32) -> Self {
        Self {
            kind,
            intensity: intensity.clamp(0.0, 1.0),
        }
    }

    pub fn random<R: Rng>(rng: &mut R) -> Self {
        let total: f32 = WEIGHTS.iter().map(|(_, w)| w).sum();
        let mut pick = rng.gen_range(0.0..total);
        let mut kind = WeatherKind::Clear;
        for (k, w) in WEIGHTS {
            if pick < w {
                kind = k;
                break;
            }
            pick -= w;
        }
        Self::new(kind, rng.gen_range(0.3..=1.0))
    }

    /// Multiplier applied to freshly rolled wind.
    pub fn wind_factor(&self) -> f32 {
        match self.kind {
            WeatherKind::Rain | WeatherKind::Storm => 1.0 + 2.0 * self.intensity,
            _ => 1.0,
        }
    }

    /// Snow thickens the air, which reads as weaker gravity.
    pub fn gravity_scale(&self) -> f32 {
        match self.kind {
            WeatherKind::Snow => 1.0 - 0.3 * self.intensity,
            _ => 1.0,
        }
    }

    /// Horizontal wind for a new turn.
    pub fn roll_wind<R: Rng>(&self, rng: &mut R) -> Vec3 {
        Vec3::new(rng.gen_range(-2.0..=2.0), rng.gen_range(-2.0..=2.0), 0.0) * self.wind_factor()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn factors_by_kind() {
        assert_eq!(Weather::new(WeatherKind::Storm, 0.5).wind_factor(), 2.0);
        assert_eq!(Weather::new(WeatherKind::Snow, 0.5).wind_factor(), 1.0);
        assert!((Weather::new(WeatherKind::Snow, 1.0).gravity_scale() - 0.7).abs() < 1e-6);
        assert_eq!(Weather::new(WeatherKind::Fog, 1.0).gravity_scale(), 1.0);
    }

    #[test]
    fn random_weather_mostly_clear() {
        let mut rng = StdRng::seed_from_u64(3);
        let samples: Vec<_> = (0..2000).map(|_| Weather::random(&mut rng)).collect();
        let clear = samples.iter().filter(|w| w.kind == WeatherKind::Clear).count();
        assert!((600..1000).contains(&clear));
        assert!(samples.iter().all(|w| (0.3..=1.0).contains(&w.intensity)));
    }

    #[test]
    fn wind_is_horizontal_and_bounded() {
        let mut rng = StdRng::seed_from_u64(8);
        let calm = Weather::default();
        for _ in 0..100 {
            let w = calm.roll_wind(&mut rng);
            assert_eq!(w.z, 0.0);
            assert!(w.x.abs() <= 2.0 && w.y.abs() <= 2.0);
        }
    }
}
