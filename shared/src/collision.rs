//! Per-tick crash and pickup detection on the authoritative instance

use crate::geometry::{point_in_triangle, point_outside_field};
use crate::player::{Player, PlayerId};
use crate::powerup::PowerUp;
use crate::settings::GameSettings;
use crate::world::GameEvent;
use log::info;
use std::collections::BTreeMap;

/// True when the player's hitbox leaves the field or covers a solid sample
/// of any trail, its own included.
pub fn is_crashing<'a>(
    player: &Player,
    everyone: impl IntoIterator<Item = &'a Player>,
    settings: &GameSettings,
) -> bool {
    let out_of_field = player
        .hit_box
        .iter()
        .any(|vertex| point_outside_field(*vertex, settings.field_width, settings.field_height));
    if out_of_field {
        return true;
    }

    everyone.into_iter().any(|other| {
        other
            .path
            .iter()
            .any(|sample| !sample.is_gap && point_in_triangle(sample.point(), &player.hit_box))
    })
}

/// Crashes every player whose hitbox is out of the field or on a trail.
///
/// All decisions are taken against the same positions before any crash is
/// applied, so the outcome does not depend on iteration order. Every player
/// still alive afterwards earns `crash_score` per crash.
pub fn detect_players_crashing(
    players: &mut BTreeMap<PlayerId, Player>,
    settings: &GameSettings,
    now: u64,
) -> Vec<GameEvent> {
    let crashed: Vec<PlayerId> = players
        .values()
        .filter(|player| !player.is_crashed())
        .filter(|player| is_crashing(player, players.values(), settings))
        .map(|player| player.id)
        .collect();

    if crashed.is_empty() {
        return Vec::new();
    }

    let mut events = Vec::with_capacity(crashed.len() + players.len());
    for id in &crashed {
        if let Some(player) = players.get_mut(id) {
            player.handle_crash(now);
            info!("Player {} ({}) crashed", player.id, player.color);
            events.push(GameEvent::PlayerCrashed {
                player_id: *id,
                at: now,
            });
        }
    }

    let points = settings.crash_score * crashed.len() as u32;
    for player in players.values_mut().filter(|player| !player.is_crashed()) {
        player.score += points;
        events.push(GameEvent::ScoreChanged {
            player_id: player.id,
            score: player.score,
        });
    }

    events
}

/// Hands each live power-up to the first player, in id order, whose hitbox
/// touches it. A power-up leaves the list the moment it is taken, so it is
/// consumed at most once even when several players overlap it.
pub fn detect_power_up_pickup(
    players: &mut BTreeMap<PlayerId, Player>,
    power_ups: &mut Vec<PowerUp>,
    settings: &GameSettings,
    now: u64,
) -> Vec<GameEvent> {
    let mut events = Vec::new();
    if power_ups.is_empty() {
        return events;
    }

    for player in players.values_mut().filter(|player| !player.is_crashed()) {
        let mut index = 0;
        while index < power_ups.len() {
            if !power_ups[index].is_touched_by(&player.hit_box) {
                index += 1;
                continue;
            }

            let power_up = power_ups.remove(index);
            power_up.apply_to(player, now, settings);
            info!(
                "Player {} ({}) picked up a {}",
                player.id, player.color, power_up.kind
            );
            events.push(GameEvent::PowerUpPickedUp {
                player_id: player.id,
                power_up_id: power_up.id,
                kind: power_up.kind,
            });
        }
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use crate::player::{PathPoint, PlayerState};
    use crate::powerup::PowerUpKind;
    use assert_approx_eq::assert_approx_eq;

    fn player_at(id: PlayerId, x: f32, y: f32, angle: f32, settings: &GameSettings) -> Player {
        Player::with_state(
            id,
            "blue",
            Point::new(x, y),
            angle,
            PlayerState::Grounded {
                grounded_until: u64::MAX,
            },
            settings,
        )
    }

    fn sample(x: f32, y: f32, is_gap: bool) -> PathPoint {
        PathPoint {
            x,
            y,
            is_gap,
            line_width: 3.0,
        }
    }

    fn roster(players: Vec<Player>) -> BTreeMap<PlayerId, Player> {
        players.into_iter().map(|p| (p.id, p)).collect()
    }

    fn hitbox_center(player: &Player) -> Point {
        let [a, b, c] = player.hit_box;
        Point::new((a.x + b.x + c.x) / 3.0, (a.y + b.y + c.y) / 3.0)
    }

    #[test]
    fn test_trail_segment_through_hitbox_crashes_owner_of_hitbox() {
        let settings = GameSettings::default();
        let victim = player_at(1, 500.0, 400.0, 0.0, &settings);
        let center = hitbox_center(&victim);

        let mut other = player_at(2, 200.0, 200.0, 0.0, &settings);
        other.path = vec![
            sample(center.x, center.y - 20.0, false),
            sample(center.x, center.y, false),
            sample(center.x, center.y + 20.0, false),
        ];

        let mut players = roster(vec![victim, other]);
        let events = detect_players_crashing(&mut players, &settings, 1234);

        assert!(players[&1].is_crashed());
        assert!(!players[&2].is_crashed());
        assert!(events.contains(&GameEvent::PlayerCrashed {
            player_id: 1,
            at: 1234
        }));
        assert_eq!(players[&2].score, settings.crash_score);
    }

    #[test]
    fn test_gap_samples_are_not_solid() {
        let settings = GameSettings::default();
        let victim = player_at(1, 500.0, 400.0, 0.0, &settings);
        let center = hitbox_center(&victim);

        let mut other = player_at(2, 200.0, 200.0, 0.0, &settings);
        other.path = vec![sample(center.x, center.y, true)];

        let mut players = roster(vec![victim, other]);
        let events = detect_players_crashing(&mut players, &settings, 10);

        assert!(events.is_empty());
        assert!(!players[&1].is_crashed());
    }

    #[test]
    fn test_own_trail_counts() {
        let settings = GameSettings::default();
        let mut player = player_at(1, 500.0, 400.0, 0.0, &settings);
        let center = hitbox_center(&player);
        player.path.push(sample(center.x, center.y, false));

        let mut players = roster(vec![player]);
        detect_players_crashing(&mut players, &settings, 10);
        assert!(players[&1].is_crashed());
    }

    #[test]
    fn test_leaving_the_field_crashes() {
        let settings = GameSettings::default();
        let mut players = roster(vec![
            player_at(1, 0.0, 400.0, 180.0, &settings),
            player_at(2, 500.0, 400.0, 0.0, &settings),
        ]);

        detect_players_crashing(&mut players, &settings, 10);
        assert!(players[&1].is_crashed());
        assert!(!players[&2].is_crashed());
    }

    #[test]
    fn test_simultaneous_crashes_are_order_independent() {
        let settings = GameSettings::default();
        // Player 1 runs into player 2's trail and player 2 into player 1's
        let mut first = player_at(1, 300.0, 400.0, 0.0, &settings);
        let mut second = player_at(2, 700.0, 400.0, 0.0, &settings);
        let first_center = hitbox_center(&first);
        let second_center = hitbox_center(&second);
        first.path.push(sample(second_center.x, second_center.y, false));
        second.path.push(sample(first_center.x, first_center.y, false));
        let bystander = player_at(3, 500.0, 700.0, 0.0, &settings);

        let mut players = roster(vec![first, second, bystander]);
        let events = detect_players_crashing(&mut players, &settings, 50);

        assert!(players[&1].is_crashed());
        assert!(players[&2].is_crashed());
        assert_eq!(players[&1].score, 0);
        assert_eq!(players[&2].score, 0);
        assert_eq!(players[&3].score, settings.crash_score * 2);
        assert!(events.contains(&GameEvent::ScoreChanged {
            player_id: 3,
            score: settings.crash_score * 2
        }));
    }

    #[test]
    fn test_crashed_players_are_skipped() {
        let settings = GameSettings::default();
        let mut crashed = player_at(1, 0.0, 400.0, 180.0, &settings);
        crashed.handle_crash(5);

        let mut players = roster(vec![crashed, player_at(2, 500.0, 400.0, 0.0, &settings)]);
        let events = detect_players_crashing(&mut players, &settings, 10);

        assert!(events.is_empty());
        assert_eq!(players[&1].state, PlayerState::Crashed { crashed_at: 5 });
        assert_eq!(players[&2].score, 0);
    }

    #[test]
    fn test_power_up_consumed_once_by_overlapping_players() {
        let settings = GameSettings::default();
        let first = player_at(1, 500.0, 400.0, 0.0, &settings);
        let second = player_at(2, 500.0, 400.0, 0.0, &settings);
        let center = hitbox_center(&first);
        let mut power_ups = vec![PowerUp::new(7, PowerUpKind::Speed, center, &settings)];

        let mut players = roster(vec![first, second]);
        let events = detect_power_up_pickup(&mut players, &mut power_ups, &settings, 100);

        assert!(power_ups.is_empty());
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0],
            GameEvent::PowerUpPickedUp {
                player_id: 1,
                power_up_id: 7,
                kind: PowerUpKind::Speed
            }
        );
        assert_approx_eq!(players[&1].speed, settings.player_speed * settings.speed_boost);
        assert_approx_eq!(players[&2].speed, settings.player_speed);
        assert_eq!(players[&1].effects.len(), 1);
        assert!(players[&2].effects.is_empty());
    }

    #[test]
    fn test_untouched_power_ups_stay() {
        let settings = GameSettings::default();
        let mut power_ups = vec![
            PowerUp::new(1, PowerUpKind::Grow, Point::new(100.0, 100.0), &settings),
            PowerUp::new(2, PowerUpKind::Shrink, Point::new(900.0, 700.0), &settings),
        ];
        let mut players = roster(vec![player_at(1, 500.0, 400.0, 0.0, &settings)]);

        let events = detect_power_up_pickup(&mut players, &mut power_ups, &settings, 100);
        assert!(events.is_empty());
        assert_eq!(power_ups.len(), 2);
    }

    #[test]
    fn test_crashed_player_cannot_pick_up() {
        let settings = GameSettings::default();
        let mut player = player_at(1, 500.0, 400.0, 0.0, &settings);
        let center = hitbox_center(&player);
        player.handle_crash(1);
        let mut power_ups = vec![PowerUp::new(1, PowerUpKind::Slow, center, &settings)];

        let mut players = roster(vec![player]);
        detect_power_up_pickup(&mut players, &mut power_ups, &settings, 100);
        assert_eq!(power_ups.len(), 1);
    }
}
