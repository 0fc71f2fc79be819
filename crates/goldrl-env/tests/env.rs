mod common;

use approx::assert_relative_eq;

use common::{ScriptedEmulator, MAP_ID, X_COORD};
use goldrl_core::{DiscreteAction, Environment, JoypadAction, MemorySource, ObservationSpace, RLError};
use goldrl_env::{build_envs, EnvOptions, FrameStack, GoldConfig, GoldEnv, Skill};
use goldrl_state::StateExtractor;

fn env_with(options: EnvOptions) -> GoldEnv<ScriptedEmulator> {
    GoldEnv::new(ScriptedEmulator::new_bark(), StateExtractor::default(), options)
}

fn press(button: JoypadAction) -> DiscreteAction {
    DiscreteAction::from(button)
}

#[tokio::test]
async fn test_reset_boots_and_reports_snapshot() {
    let mut env = env_with(EnvOptions::default());
    let (obs, info) = env.reset().await.unwrap();

    assert_eq!(env.emulator().resets, 1);
    assert_eq!(obs.image.dim(), (1, 144, 160));
    assert_eq!(obs.state.len(), 5);
    assert_eq!(info.get("location").unwrap()["map_bank"], 24);
    assert_eq!(env.current_state().party_info.party_level_sum, 5);
    assert!(env.episode_info().is_some());
}

#[tokio::test]
async fn test_exploration_pays_for_new_tiles_only() {
    let mut env = env_with(EnvOptions::default());
    env.reset().await.unwrap();

    let first = env.step(press(JoypadAction::Right)).await.unwrap();
    let breakdown = first.info.get("reward").unwrap();
    assert_relative_eq!(breakdown["exploration"].as_f64().unwrap(), 5.1, epsilon = 1e-9);
    assert_relative_eq!(first.reward.0, 5.1, epsilon = 1e-9);
    assert_eq!(env.emulator().presses.last(), Some(&(JoypadAction::Right, 4)));

    let second = env.step(press(JoypadAction::Right)).await.unwrap();
    assert_relative_eq!(second.reward.0, 0.1, epsilon = 1e-9);

    let back = env.step(press(JoypadAction::Left)).await.unwrap();
    assert_relative_eq!(back.reward.0, 0.0, epsilon = 1e-9);
    assert_eq!(back.state.unwrap().location.x_coord, 8);
}

#[tokio::test]
async fn test_skill_completion_is_paid_once() {
    let mut env = env_with(EnvOptions::default());
    env.reset().await.unwrap();
    env.set_skill(Skill::GoToMap { map_bank: 24, map_id: 5, map_name: "Elm's Lab".to_string() });

    let entered = env.step(press(JoypadAction::A)).await.unwrap();
    let breakdown = entered.info.get("reward").unwrap();
    assert_relative_eq!(breakdown["main"].as_f64().unwrap(), 500.0, epsilon = 1e-9);
    assert!(env.skill().is_credited());
    assert_eq!(*entered.info.get("skill").unwrap(), "Go to Elm's Lab");

    let stay = env.step(press(JoypadAction::Noop)).await.unwrap();
    assert_relative_eq!(stay.info.get("reward").unwrap()["main"].as_f64().unwrap(), 0.0, epsilon = 1e-9);
}

#[tokio::test]
async fn test_episode_truncates_at_step_limit() {
    let mut env = env_with(EnvOptions { max_episode_steps: 3, ..EnvOptions::default() });
    env.reset().await.unwrap();

    for _ in 0..2 {
        let step = env.step(press(JoypadAction::Noop)).await.unwrap();
        assert!(!step.done);
        assert!(step.info.get("episode").is_none());
    }
    let last = env.step(press(JoypadAction::Up)).await.unwrap();
    assert!(last.done && last.truncated);
    let summary = last.info.get("episode").unwrap();
    assert_eq!(summary["l"], 3);

    let episode = env.episode_info().unwrap();
    assert!(episode.is_finished());
    assert!(episode.truncated);
    assert_eq!(episode.steps, 3);
}

#[tokio::test]
async fn test_reset_restores_saved_state() {
    let dir = tempfile::tempdir().unwrap();
    let saved = dir.path().join("best.state");

    let mut env = env_with(EnvOptions::default());
    env.reset().await.unwrap();
    env.step(press(JoypadAction::A)).await.unwrap();
    env.step(press(JoypadAction::Right)).await.unwrap();
    env.save_state(&saved).unwrap();

    env.set_initial_state_path(Some(saved.clone()));
    env.reset().await.unwrap();
    assert_eq!(env.emulator().resets, 1);
    assert_eq!(env.emulator().presses.last(), Some(&(JoypadAction::Noop, goldrl_env::env::SETTLE_FRAMES)));
    assert_eq!(env.emulator().ram.read_byte(MAP_ID), 5);
    assert_eq!(env.current_state().location.coords(), (8, 9));
    assert_eq!(env.steps(), 0);
}

#[tokio::test]
async fn test_missing_initial_state_is_an_error() {
    let mut env = env_with(EnvOptions {
        initial_state_path: Some("/nonexistent/start.state".into()),
        ..EnvOptions::default()
    });
    assert!(matches!(env.reset().await, Err(RLError::Environment(_))));
}

#[tokio::test]
async fn test_out_of_range_action_is_rejected() {
    let mut env = env_with(EnvOptions::default());
    env.reset().await.unwrap();
    assert!(matches!(env.step(DiscreteAction(8)).await, Err(RLError::InvalidAction(_))));
}

#[tokio::test]
async fn test_frame_stack_keeps_depth() {
    let mut env = FrameStack::new(env_with(EnvOptions::default()), 4);
    let (obs, _) = env.reset().await.unwrap();
    assert_eq!(obs.image.dim(), (4, 144, 160));
    assert_eq!(env.observation_space().shape(), vec![4, 144, 160]);

    let step = env.step(press(JoypadAction::Down)).await.unwrap();
    assert_eq!(step.observation.image.dim(), (4, 144, 160));
    assert_eq!(env.env.emulator().ram.read_byte(X_COORD), 7);
}

#[tokio::test]
async fn test_config_reaches_every_environment() {
    let config = GoldConfig { num_envs: 3, max_episode_steps: 2, frame_skip: 2, frame_stack: 2, ..GoldConfig::default() };
    let envs = build_envs(&config, |_| ScriptedEmulator::new_bark());
    assert_eq!(envs.len(), 3);

    let mut stacked = FrameStack::from_config(envs.into_iter().next().unwrap(), &config);
    assert_eq!(stacked.depth(), 2);
    let (obs, _) = stacked.reset().await.unwrap();
    assert_eq!(obs.image.dim(), (2, 144, 160));

    let first = stacked.step(press(JoypadAction::Right)).await.unwrap();
    assert!(!first.truncated);
    assert_eq!(stacked.env.emulator().presses.last(), Some(&(JoypadAction::Right, 2)));
    let second = stacked.step(press(JoypadAction::Right)).await.unwrap();
    assert!(second.truncated);
}
