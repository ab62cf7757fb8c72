//! End-to-end runs through the public API with a file-backed progress store

use glam::Vec2;
use tempfile::TempDir;

use gravity_puzzle::consts::SIM_DT;
use gravity_puzzle::sim::{
    GravityDirection, InputEvent, Outcome, Rect, SessionEvent, SessionPhase, replay,
};
use gravity_puzzle::{
    Difficulty, Game, GameError, LevelDefinition, LevelSet, ProgressStore, Tuning,
};

fn level(level_id: u32) -> LevelDefinition {
    LevelDefinition {
        level_id,
        name: format!("Scenario {level_id}"),
        difficulty: Difficulty::Medium,
        lives: 3,
        start_pos: Vec2::new(100.0, 100.0),
        gravity_start: Vec2::new(0.0, 900.0),
        damping_start: 0.5,
        goal_rect: Rect::new(700.0, 500.0, 60.0, 60.0),
        walls: vec![],
        hazards: vec![],
    }
}

fn game_at(dir: &TempDir, levels: Vec<LevelDefinition>) -> Game {
    let tuning = Tuning::default();
    let levels = LevelSet::new(levels, &tuning).unwrap();
    Game::new(levels, ProgressStore::open(dir.path().join("save.json")), tuning)
}

#[test]
fn goal_at_start_scores_on_first_tick_and_persists() {
    let dir = TempDir::new().unwrap();
    let first = LevelDefinition {
        goal_rect: Rect::new(80.0, 80.0, 40.0, 40.0),
        ..level(1)
    };
    let mut game = game_at(&dir, vec![first, level(2)]);

    assert!(matches!(game.enter_level(2), Err(GameError::Locked(2))));
    game.enter_level(1).unwrap();

    let events = game.update(SIM_DT);
    assert!(matches!(
        events.as_slice(),
        [SessionEvent::Completed { level_id: 1, score: 9_990, elapsed_ticks: 1, .. }]
    ));

    // A fresh store sees what the game wrote
    let reloaded = ProgressStore::load(&dir.path().join("save.json"));
    assert_eq!(reloaded.unlocked_levels, 2);
    assert_eq!(reloaded.best_score(1), Some(9_990));
    assert!(!dir.path().join("save.tmp").exists());

    assert_eq!(game.next_level().unwrap(), Some(2));
}

#[test]
fn hazard_one_tick_away_ends_the_attempt() {
    let dir = TempDir::new().unwrap();
    let deadly = LevelDefinition {
        lives: 1,
        gravity_start: Vec2::new(900.0, 0.0),
        hazards: vec![Rect::new(115.1, 50.0, 20.0, 100.0)],
        ..level(1)
    };
    let mut game = game_at(&dir, vec![deadly]);
    game.enter_level(1).unwrap();

    let events = game.update(SIM_DT);
    assert_eq!(events.len(), 2);
    assert!(matches!(events[0], SessionEvent::HazardHit { lives_left: 0 }));
    assert!(matches!(events[1], SessionEvent::GameOver { elapsed_ticks: 1, .. }));

    let snapshot = game.snapshot().unwrap();
    assert_eq!(snapshot.phase, SessionPhase::Ended(Outcome::LostAllLives));
    assert_eq!(snapshot.lives, 0);

    let record = ProgressStore::load(&dir.path().join("save.json"));
    assert_eq!(record.total_deaths, 1);
    assert!(record.level_scores.is_empty());
    assert_eq!(record.unlocked_levels, 1);
}

#[test]
fn hazard_and_goal_in_the_same_tick_is_a_death() {
    let overlap = Rect::new(110.0, 90.0, 30.0, 30.0);
    let contested = LevelDefinition {
        lives: 2,
        gravity_start: Vec2::new(900.0, 0.0),
        goal_rect: overlap,
        hazards: vec![overlap],
        ..level(1)
    };

    let session = replay(&contested, &Tuning::default(), &[], 1).unwrap();
    assert_eq!(session.lives(), 1);
    assert_eq!(session.phase(), SessionPhase::Playing);
    assert_eq!(session.body().pos, Vec2::new(100.0, 100.0));
    assert!(session.score().is_none());
}

#[test]
fn identical_inputs_replay_identically() {
    let walled = LevelDefinition {
        walls: vec![Rect::new(300.0, 200.0, 20.0, 390.0)],
        hazards: vec![Rect::new(400.0, 560.0, 120.0, 30.0)],
        ..level(1)
    };
    let script = [
        (0, InputEvent::DampingDown),
        (20, InputEvent::Gravity(GravityDirection::Right)),
        (45, InputEvent::Gravity(GravityDirection::Up)),
        (70, InputEvent::DampingUp),
        (90, InputEvent::Gravity(GravityDirection::Right)),
        (130, InputEvent::Gravity(GravityDirection::Down)),
    ];

    let tuning = Tuning::default();
    let a = replay(&walled, &tuning, &script, 600).unwrap();
    let b = replay(&walled, &tuning, &script, 600).unwrap();
    assert_eq!(a.body(), b.body());
    assert_eq!(a.state(), b.state());
    assert_eq!(a.score(), b.score());
}

#[test]
fn restart_keeps_persisted_progress() {
    let dir = TempDir::new().unwrap();
    let mut game = game_at(&dir, vec![level(1)]);
    game.enter_level(1).unwrap();
    for _ in 0..30 {
        game.update(SIM_DT);
    }
    let before = ProgressStore::load(&dir.path().join("save.json"));

    game.push_input(InputEvent::Restart);
    game.update(SIM_DT);

    let snapshot = game.snapshot().unwrap();
    assert_eq!(snapshot.elapsed_ticks, 1);
    assert_eq!(snapshot.lives, 3);
    assert_eq!(ProgressStore::load(&dir.path().join("save.json")), before);
}

#[test]
fn start_inside_the_frame_is_refused_at_load() {
    let tuning = Tuning::default();
    let cornered = LevelDefinition {
        start_pos: Vec2::new(5.0, 5.0),
        goal_rect: Rect::new(10.0, 560.0, 780.0, 30.0),
        ..level(1)
    };
    assert!(LevelSet::new(vec![cornered.clone()], &tuning).is_err());
    assert!(replay(&cornered, &tuning, &[], 10).is_err());
}
