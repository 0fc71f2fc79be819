//! Segment-level control: which policy runs, and which skill each agent pursues

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use goldrl_core::{Emulator, Environment, Result};
use goldrl_state::GameSnapshot;

use crate::config::GoldConfig;
use crate::env::GoldEnv;
use crate::planner::{Planner, PlanningRequest, PlanningSlot};
use crate::skills::{heal_skill_for, needs_healing, Skill};
use crate::tasks::TaskProgression;

/// Policy selected for a training segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMode {
    /// Battle policy; planning is paused
    Battle,
    /// Navigation policy pursuing planner-assigned skills
    Navigation,
}

impl ControlMode {
    /// Battle when the first agent is in a battle
    #[must_use]
    pub fn for_agents(snapshots: &[GameSnapshot]) -> Self {
        match snapshots.first() {
            Some(s) if s.is_in_battle => Self::Battle,
            _ => Self::Navigation,
        }
    }
}

/// What the caller should change before running a segment
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentPlan {
    /// Policy to run
    pub mode: ControlMode,
    /// New skill per agent, from a finished planning request
    pub assignments: Option<Vec<Skill>>,
    /// Main task sent with a newly submitted planning request
    pub main_task: Option<String>,
}

impl SegmentPlan {
    /// Push assignments and the main task into the environments
    pub fn apply<E: Emulator>(&self, envs: &mut [GoldEnv<E>]) {
        if let Some(skills) = &self.assignments {
            for (env, skill) in envs.iter_mut().zip(skills) {
                env.set_skill(skill.clone());
            }
        }
        if let Some(task) = &self.main_task {
            for env in envs.iter_mut() {
                env.set_main_task(task.clone());
            }
        }
    }
}

/// Hierarchical controller over a fixed set of agents
pub struct HierarchicalController {
    planner: Arc<dyn Planner>,
    progression: TaskProgression,
    skills: Vec<Skill>,
    slot: PlanningSlot,
    sync_interval: usize,
    segment: usize,
    heal_override: bool,
}

impl HierarchicalController {
    /// Controller restarting agents from the best state every `sync_interval` segments
    pub fn new(planner: Arc<dyn Planner>, progression: TaskProgression, skills: Vec<Skill>, sync_interval: usize) -> Self {
        Self {
            planner,
            progression,
            skills,
            slot: PlanningSlot::new(),
            sync_interval: sync_interval.max(1),
            segment: 0,
            heal_override: true,
        }
    }

    /// Controller using the configured `sync_interval`
    pub fn from_config(
        planner: Arc<dyn Planner>,
        progression: TaskProgression,
        skills: Vec<Skill>,
        config: &GoldConfig,
    ) -> Self {
        Self::new(planner, progression, skills, config.sync_interval)
    }

    /// Disable replacing planner choices with a heal skill for hurt agents
    #[must_use]
    pub fn without_heal_override(mut self) -> Self {
        self.heal_override = false;
        self
    }

    /// Task plan and its position
    pub fn progression(&self) -> &TaskProgression {
        &self.progression
    }

    /// Segments started so far
    pub fn segment(&self) -> usize {
        self.segment
    }

    /// Whether a planning request is in flight
    pub fn is_planning(&self) -> bool {
        !self.slot.is_idle()
    }

    /// Count a new segment; `true` when agents should restart from the best state
    pub fn start_segment(&mut self) -> bool {
        self.segment += 1;
        self.segment % self.sync_interval == 0
    }

    /// Realign the task plan after agents restarted from `snapshot`
    pub fn resync(&mut self, snapshot: &GameSnapshot) -> usize {
        self.progression.sync_with_initial_state(snapshot)
    }

    /// Decide the segment's mode, collect finished plans and keep one request in flight
    pub fn plan(&mut self, snapshots: &[GameSnapshot]) -> Result<SegmentPlan> {
        let mode = ControlMode::for_agents(snapshots);
        let mut plan = SegmentPlan { mode, assignments: None, main_task: None };
        if mode == ControlMode::Battle {
            debug!(segment = self.segment, "battle segment");
            return Ok(plan);
        }

        if let Some(chosen) = self.slot.poll() {
            let assignments = self.override_hurt_agents(chosen, snapshots);
            for (agent, skill) in assignments.iter().enumerate() {
                info!(agent, skill = %skill, "new sub-goal");
            }
            plan.assignments = Some(assignments);
        }

        if self.slot.is_idle() {
            if let Some(lead) = snapshots.first() {
                self.progression.advance_while_completed(lead);
            }
            let main_task = self.progression.current_task_description().to_string();
            let request = PlanningRequest {
                snapshots: snapshots.to_vec(),
                main_task: main_task.clone(),
                skills: self.skills.clone(),
            };
            if self.slot.submit(Arc::clone(&self.planner), request)? {
                info!(task = %main_task, "requested next sub-goals");
                plan.main_task = Some(main_task);
            }
        }
        Ok(plan)
    }

    fn override_hurt_agents(&self, chosen: Vec<Skill>, snapshots: &[GameSnapshot]) -> Vec<Skill> {
        if !self.heal_override {
            return chosen;
        }
        chosen
            .into_iter()
            .enumerate()
            .map(|(i, skill)| match snapshots.get(i) {
                Some(snapshot) if needs_healing(snapshot) => heal_skill_for(snapshot),
                _ => skill,
            })
            .collect()
    }
}

/// Point every environment at `state_path` and reset it.
///
/// Returns the fresh snapshots, or `None` when no such state exists yet.
pub async fn restart_from_state<E: Emulator>(
    envs: &mut [GoldEnv<E>],
    state_path: &Path,
) -> Result<Option<Vec<GameSnapshot>>> {
    if !state_path.exists() {
        return Ok(None);
    }
    info!(path = %state_path.display(), "restarting all agents from the best state");
    let mut snapshots = Vec::with_capacity(envs.len());
    for env in envs.iter_mut() {
        env.set_initial_state_path(Some(state_path.to_path_buf()));
        env.reset().await?;
        snapshots.push(env.current_state().clone());
    }
    Ok(Some(snapshots))
}

/// [`restart_from_state`] from the configured `best_state_path`
pub async fn restart_from_best<E: Emulator>(
    envs: &mut [GoldEnv<E>],
    config: &GoldConfig,
) -> Result<Option<Vec<GameSnapshot>>> {
    restart_from_state(envs, config.best_state_path()).await
}
