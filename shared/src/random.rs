//! Random draws used when starting rounds, laying gaps and spawning power-ups

use crate::geometry::Point;
use crate::powerup::PowerUpKind;
use crate::settings::GameSettings;
use rand::Rng;

/// Uniform value in `[min, max)`; returns `min` for an empty window.
pub fn random_between<R: Rng + ?Sized>(rng: &mut R, min: f32, max: f32) -> f32 {
    rng.gen::<f32>() * (max - min) + min
}

fn random_millis<R: Rng + ?Sized>(rng: &mut R, min: u64, max: u64) -> u64 {
    if max <= min {
        min
    } else {
        rng.gen_range(min..=max)
    }
}

/// Time a player stays grounded before the next gap opens
pub fn random_gap_timing<R: Rng + ?Sized>(rng: &mut R, settings: &GameSettings) -> u64 {
    random_millis(rng, settings.gap_interval_min_ms, settings.gap_interval_max_ms)
}

/// Delay until the next power-up spawns
pub fn random_spawn_delay<R: Rng + ?Sized>(rng: &mut R, settings: &GameSettings) -> u64 {
    random_millis(
        rng,
        settings.power_up_spawn_min_ms,
        settings.power_up_spawn_max_ms,
    )
}

pub fn random_start_position<R: Rng + ?Sized>(rng: &mut R, settings: &GameSettings) -> Point {
    let margin = settings.start_edge_margin;
    Point::new(
        random_between(rng, margin, settings.field_width - margin),
        random_between(rng, margin, settings.field_height - margin),
    )
}

/// Heading in degrees
pub fn random_angle<R: Rng + ?Sized>(rng: &mut R) -> f32 {
    random_between(rng, 0.0, 360.0)
}

pub fn random_power_up_position<R: Rng + ?Sized>(rng: &mut R, settings: &GameSettings) -> Point {
    Point::new(
        random_between(rng, 0.0, settings.field_width),
        random_between(rng, 0.0, settings.field_height),
    )
}

pub fn random_power_up_kind<R: Rng + ?Sized>(rng: &mut R) -> PowerUpKind {
    PowerUpKind::ALL[rng.gen_range(0..PowerUpKind::ALL.len())]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_random_between_stays_in_window() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let value = random_between(&mut rng, 10.0, 20.0);
            assert!((10.0..20.0).contains(&value));
        }
        assert_eq!(random_between(&mut rng, 5.0, 5.0), 5.0);
    }

    #[test]
    fn test_start_position_respects_margin() {
        let mut rng = StdRng::seed_from_u64(11);
        let settings = GameSettings::default();
        for _ in 0..500 {
            let p = random_start_position(&mut rng, &settings);
            assert!(p.x >= settings.start_edge_margin);
            assert!(p.x <= settings.field_width - settings.start_edge_margin);
            assert!(p.y >= settings.start_edge_margin);
            assert!(p.y <= settings.field_height - settings.start_edge_margin);
        }
    }

    #[test]
    fn test_gap_timing_uses_configured_window() {
        let mut rng = StdRng::seed_from_u64(3);
        let settings = GameSettings::default();
        for _ in 0..500 {
            let t = random_gap_timing(&mut rng, &settings);
            assert!(t >= settings.gap_interval_min_ms && t <= settings.gap_interval_max_ms);
        }

        let fixed = GameSettings {
            gap_interval_min_ms: 42,
            gap_interval_max_ms: 42,
            ..GameSettings::default()
        };
        assert_eq!(random_gap_timing(&mut rng, &fixed), 42);
    }

    #[test]
    fn test_every_power_up_kind_is_drawn() {
        let mut rng = StdRng::seed_from_u64(99);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            seen.insert(random_power_up_kind(&mut rng));
        }
        assert_eq!(seen.len(), PowerUpKind::ALL.len());
    }
}
