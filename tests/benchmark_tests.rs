//! Performance benchmarks for critical game systems

use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::collision::detect_players_crashing;
use shared::geometry::{point_in_triangle, Point};
use shared::player::PathPoint;
use shared::protocol::{decode, encode};
use shared::world::GameState;
use shared::{Game, GameSettings, Message, Role};
use std::time::Instant;

/// Benchmarks the hitbox containment test every trail sample goes through
#[test]
fn benchmark_point_in_triangle() {
    let triangle = [
        Point::new(0.0, 0.0),
        Point::new(10.0, 0.0),
        Point::new(5.0, 8.0),
    ];

    let iterations = 100_000;
    let start = Instant::now();

    let mut inside = 0;
    for i in 0..iterations {
        let point = Point::new((i % 12) as f32, (i % 9) as f32);
        if point_in_triangle(point, &triangle) {
            inside += 1;
        }
    }

    let duration = start.elapsed();
    println!(
        "Point in triangle: {} iterations in {:?} ({:.2} ns/iter)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    assert!(inside > 0);
    // Should complete in under 100ms for 100k iterations
    assert!(duration.as_millis() < 100);
}

/// Benchmarks crash detection against long trails
#[test]
fn benchmark_crash_detection() {
    let settings = GameSettings::default();
    let mut rng = StdRng::seed_from_u64(3);
    let mut state = GameState::new();
    state.reset(8, 0, &settings, &mut rng);

    // Give everyone a long trail in a corner nobody starts in
    let sample = PathPoint {
        x: 1.0,
        y: 1.0,
        is_gap: false,
        line_width: settings.line_width,
    };
    for player in state.players.values_mut() {
        player.path = vec![sample; 2_000];
    }

    let iterations = 100;
    let start = Instant::now();

    for _ in 0..iterations {
        let mut players = state.players.clone();
        let _ = detect_players_crashing(&mut players, &settings, 0);
    }

    let duration = start.elapsed();
    println!(
        "Crash detection: 8 players × 2000 samples, {} iterations in {:?} ({:.2} μs/iter)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    // Should complete in under 5 seconds
    assert!(duration.as_millis() < 5000);
}

/// Benchmarks full authoritative ticks with a full lobby
#[test]
fn benchmark_engine_tick() {
    let mut game = Game::new(
        GameSettings::default(),
        Some(Role::Host),
        StdRng::seed_from_u64(9),
    );
    game.reset(8, 0);
    game.start();

    let frames = 300;
    let start = Instant::now();

    let mut now = 0;
    for _ in 0..frames {
        let _ = game.tick(now, None);
        now += 16;
    }

    let duration = start.elapsed();
    println!(
        "Engine tick: 8 players × {} frames in {:?} ({:.2} μs/frame)",
        frames,
        duration,
        duration.as_micros() as f64 / frames as f64
    );

    assert!(game.state().players.values().all(|p| !p.path.is_empty()));
    // Should complete in under 5 seconds
    assert!(duration.as_millis() < 5000);
}

/// Benchmarks encoding and decoding the snapshot shared every frame
#[test]
fn benchmark_snapshot_codec() {
    let settings = GameSettings::default();
    let mut game = Game::new(settings, Some(Role::Host), StdRng::seed_from_u64(21));
    game.reset(8, 0);
    game.start();
    let mut now = 0;
    for _ in 0..120 {
        let _ = game.tick(now, None);
        now += 16;
    }
    let message = Message::ShareGameState(game.state().snapshot());

    let iterations = 200;
    let start = Instant::now();

    let mut bytes = 0;
    for _ in 0..iterations {
        let payload = encode(&message).unwrap();
        bytes = payload.len();
        let _ = decode(&payload).unwrap();
    }

    let duration = start.elapsed();
    println!(
        "Snapshot codec: {} bytes, {} iterations in {:?} ({:.2} μs/iter)",
        bytes,
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert!(bytes > 0);
    // Should complete in under 5 seconds
    assert!(duration.as_millis() < 5000);
}
