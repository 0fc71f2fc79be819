mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use common::ScriptedEmulator;
use goldrl_core::{DiscreteAction, Environment, JoypadAction};
use goldrl_env::{
    build_envs, restart_from_best, restart_from_state, BestRecord, ChatMessage, ControlMode, EnvOptions, EpisodeLog,
    EpisodeScore, GoldConfig, GoldEnv, HierarchicalController, Plan, Planner, Skill, TaskProgression,
    AVAILABLE_SKILLS,
};
use goldrl_state::{GameSnapshot, StateExtractor};

/// Picks the second catalogue skill for every agent
struct SecondSkill;

#[async_trait]
impl Planner for SecondSkill {
    async fn complete(&self, messages: &[ChatMessage]) -> anyhow::Result<String> {
        let agents = messages[1].content.matches("### Agent ").count();
        let choice = AVAILABLE_SKILLS[1].description();
        Ok((0..agents).map(|i| format!("Agent {i} Decision: {choice}\n")).collect())
    }
}

fn envs(n: usize, steps: usize) -> Vec<GoldEnv<ScriptedEmulator>> {
    (0..n)
        .map(|_| {
            GoldEnv::new(
                ScriptedEmulator::new_bark(),
                StateExtractor::default(),
                EnvOptions { max_episode_steps: steps, ..EnvOptions::default() },
            )
        })
        .collect()
}

async fn run_episode(env: &mut GoldEnv<ScriptedEmulator>, moves: &[JoypadAction]) -> (f64, GameSnapshot) {
    let mut total = 0.0;
    for &button in moves.iter().cycle() {
        let step = env.step(DiscreteAction::from(button)).await.unwrap();
        total += step.reward.0;
        if step.done {
            return (total, step.state.unwrap());
        }
    }
    unreachable!("moves is never empty")
}

#[tokio::test]
async fn test_segments_assign_skills_log_and_restart_from_best() {
    let dir = tempfile::tempdir().unwrap();
    let config = GoldConfig {
        num_envs: 2,
        max_episode_steps: 4,
        sync_interval: 2,
        best_state_path: dir.path().join("best.state"),
        episode_log_path: dir.path().join("episodes.csv"),
        ..GoldConfig::default()
    };
    let best_path = config.best_state_path().to_path_buf();
    let mut log = EpisodeLog::from_config(&config).unwrap();
    let mut best = BestRecord::new();

    let mut agents = build_envs(&config, |_| ScriptedEmulator::new_bark());
    assert_eq!(agents.len(), 2);
    for env in &mut agents {
        env.reset().await.unwrap();
    }
    let mut controller = HierarchicalController::from_config(
        Arc::new(SecondSkill),
        TaskProgression::from_plan(Plan::opening()),
        AVAILABLE_SKILLS.clone(),
        &config,
    );

    // segment 1: request goes out, skills unchanged
    assert!(!controller.start_segment());
    let snaps: Vec<GameSnapshot> = agents.iter().map(|e| e.current_state().clone()).collect();
    let plan = controller.plan(&snaps).unwrap();
    assert_eq!(plan.mode, ControlMode::Navigation);
    plan.apply(&mut agents);
    assert_eq!(agents[0].main_task(), "Start game and choose Cyndaquil as starter");

    let routes = [[JoypadAction::Right, JoypadAction::Right], [JoypadAction::A, JoypadAction::Up]];
    let mut total_steps = 0;
    for (env, route) in agents.iter_mut().zip(&routes) {
        let (reward, last) = run_episode(env, route).await;
        total_steps += env.steps();
        log.append(total_steps, reward, &last).unwrap();
        best.offer(EpisodeScore::new(reward, &last), env, &best_path).unwrap();
    }
    assert_eq!(log.episodes(), 2);
    assert_eq!(std::fs::read_to_string(&config.episode_log_path).unwrap().lines().count(), 3);
    assert!(best_path.exists());
    // walking through doors found new maps, which beats walking one row
    let leader = *best.best().unwrap();
    assert!(leader.episode_reward > 10.0);

    // segment 2: planner answer lands, then everyone restarts from the best state
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(controller.start_segment());
    let restarted = restart_from_best(&mut agents, &config).await.unwrap().unwrap();
    assert!(restarted.iter().all(|s| s.location.map_id == 6));
    controller.resync(&restarted[0]);

    let mut applied = None;
    for _ in 0..100 {
        let plan = controller.plan(&restarted).unwrap();
        if plan.assignments.is_some() {
            applied = Some(plan);
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    let plan = applied.expect("planner answer");
    plan.apply(&mut agents);
    let expected: Skill = AVAILABLE_SKILLS[1].clone();
    assert!(agents.iter().all(|e| e.skill().skill() == &expected));
}

#[tokio::test]
async fn test_restart_without_best_state_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    let mut agents = envs(1, 10);
    agents[0].reset().await.unwrap();
    let result = restart_from_state(&mut agents, &dir.path().join("missing.state")).await.unwrap();
    assert!(result.is_none());
    assert_eq!(agents[0].emulator().resets, 1);
}
