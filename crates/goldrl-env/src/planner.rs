//! Language-model planner boundary
//!
//! The model itself is external: anything implementing [`Planner`] turns a
//! chat transcript into text. This module builds the prompts, parses the
//! decisions back into catalogue skills and runs at most one request in the
//! background through [`PlanningSlot`].

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot::{self, error::TryRecvError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use goldrl_core::{RLError, Result};
use goldrl_state::GameSnapshot;

use crate::skills::{default_skill, match_skill, Skill};

const SINGLE_SYSTEM_PROMPT: &str = "You are an expert AI playing 'Pokémon Gold'. Your task is to choose the single \
best action from a given list to achieve the main objective. Respond using the specified format.";

const BATCH_SYSTEM_PROMPT: &str = "You are an expert AI playing 'Pokémon Gold'. For each agent, choose the single \
best action from the given list to achieve the main objective. Respond using the specified format for ALL agents.";

const DECISION_MARKER: &str = "Decision:";

lazy_static! {
    static ref AGENT_DECISION: Regex = Regex::new(r"Agent (\d+) Decision: (.*)").expect("valid decision pattern");
}

/// Speaker of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions framing the conversation
    System,
    /// Prompt from the controller
    User,
    /// Model output
    Assistant,
}

/// One chat turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who is speaking
    pub role: Role,
    /// Message text
    pub content: String,
}

impl ChatMessage {
    /// System message
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    /// User message
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }
}

/// Text generation backend
#[async_trait]
pub trait Planner: Send + Sync {
    /// Continue the conversation and return the generated text only
    async fn complete(&self, messages: &[ChatMessage]) -> anyhow::Result<String>;
}

fn party_levels(snapshot: &GameSnapshot) -> String {
    snapshot
        .party_info
        .pokemon
        .iter()
        .map(|p| format!("Lv.{}", p.level))
        .collect::<Vec<_>>()
        .join(", ")
}

fn skill_lines(skills: &[Skill]) -> String {
    skills.iter().map(|s| format!("- {}", s.description())).collect::<Vec<_>>().join("\n")
}

/// Prompt asking for one decision for one agent
#[must_use]
pub fn build_single_prompt(snapshot: &GameSnapshot, main_task: &str, skills: &[Skill]) -> Vec<ChatMessage> {
    let (bank, map) = snapshot.location.map_key();
    let events = snapshot.event_statuses.completed().collect::<Vec<_>>();
    let events = if events.is_empty() { "none".to_string() } else { events.join(", ") };
    let situation = format!(
        "Location: Map (Bank {bank}, ID {map}).\n\
         Player: ${}, Badges: {}.\n\
         Party: {} Pokémon ({}).\n\
         Completed events: {events}",
        snapshot.player_info.money,
        snapshot.player_info.johto_badges_count,
        snapshot.party_info.count,
        party_levels(snapshot),
    );
    let user = format!(
        "### Main Objective\n{main_task}\n\n\
         ### Current Game State\n{situation}\n\n\
         ### Available Actions\n{}\n\n\
         ### Instructions\n\
         1. Analyze the current game state and the main objective, then write your step-by-step reasoning in a 'Thought' section.\n\
         2. Based on your reasoning, choose the single most optimal action from the 'Available Actions' list and write its exact description in a 'Decision' section.\n\
         Format:\nThought: [Describe your reasoning step-by-step here]\nDecision: [Copy the chosen action description here]",
        skill_lines(skills),
    );
    vec![ChatMessage::system(SINGLE_SYSTEM_PROMPT), ChatMessage::user(user)]
}

/// Prompt asking for one decision per agent in a single completion
#[must_use]
pub fn build_batch_prompt(snapshots: &[GameSnapshot], main_task: &str, skills: &[Skill]) -> Vec<ChatMessage> {
    let reports = snapshots
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let (bank, map) = s.location.map_key();
            format!(
                "### Agent {i} State\n\
                 - Location: Map (Bank {bank}, ID {map})\n\
                 - Player: ${}, Badges: {}\n\
                 - Party: {} Pokémon ({})",
                s.player_info.money,
                s.player_info.johto_badges_count,
                s.party_info.count,
                party_levels(s),
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");
    let user = format!(
        "### Main Objective\n{main_task}\n\n\
         ### Current Game States\n{reports}\n\n\
         ### Available Actions\n{}\n\n\
         ### Instructions\n\
         1. Analyze each agent's state and the main objective.\n\
         2. For each agent, choose the single most optimal action from the 'Available Actions' list.\n\
         3. Provide your decision for every agent in the specified format, starting each on a new line.\n\
         Format:\n\
         Agent 0 Decision: [Copy the chosen action description here]\n\
         Agent 1 Decision: [Copy the chosen action description here]\n\
         Agent 2 Decision: [Copy the chosen action description here]\n\
         ...",
        skill_lines(skills),
    );
    vec![ChatMessage::system(BATCH_SYSTEM_PROMPT), ChatMessage::user(user)]
}

fn fallback(skills: &[Skill]) -> Skill {
    skills.first().cloned().unwrap_or_else(default_skill)
}

/// Skill named after the first `Decision:` marker, else the first catalogue skill
#[must_use]
pub fn parse_single_decision(response: &str, skills: &[Skill]) -> Skill {
    let chosen = response.split_once(DECISION_MARKER).map(|(_, rest)| rest.trim()).unwrap_or("");
    match match_skill(skills, chosen) {
        Some(skill) => skill.clone(),
        None => {
            warn!("planner response names no known skill, using the first one");
            fallback(skills)
        }
    }
}

/// One skill per agent from `Agent N Decision: ...` lines.
///
/// Lines for agents outside `0..agents` are ignored; a later line for the
/// same agent overrides an earlier one. Agents without a usable line get the
/// first catalogue skill.
#[must_use]
pub fn parse_batch_decisions(response: &str, agents: usize, skills: &[Skill]) -> Vec<Skill> {
    let mut chosen: Vec<Option<Skill>> = vec![None; agents];
    for caps in AGENT_DECISION.captures_iter(response) {
        let Ok(index) = caps[1].parse::<usize>() else { continue };
        if index >= agents {
            continue;
        }
        if let Some(skill) = match_skill(skills, caps[2].trim()) {
            chosen[index] = Some(skill.clone());
        }
    }

    chosen
        .into_iter()
        .enumerate()
        .map(|(i, skill)| {
            skill.unwrap_or_else(|| {
                warn!(agent = i, "planner chose no valid skill, assigning the default");
                fallback(skills)
            })
        })
        .collect()
}

/// Ask the planner for one agent's next skill
pub async fn choose_next_skill(
    planner: &dyn Planner,
    snapshot: &GameSnapshot,
    main_task: &str,
    skills: &[Skill],
) -> anyhow::Result<Skill> {
    let messages = build_single_prompt(snapshot, main_task, skills);
    let response = planner.complete(&messages).await?;
    debug!(%response, "planner response");
    Ok(parse_single_decision(&response, skills))
}

/// Ask the planner for every agent's next skill in one completion
pub async fn choose_next_skill_batch(
    planner: &dyn Planner,
    snapshots: &[GameSnapshot],
    main_task: &str,
    skills: &[Skill],
) -> anyhow::Result<Vec<Skill>> {
    let messages = build_batch_prompt(snapshots, main_task, skills);
    let response = planner.complete(&messages).await?;
    debug!(%response, "planner batch response");
    Ok(parse_batch_decisions(&response, snapshots.len(), skills))
}

/// Inputs of one batch planning request
#[derive(Debug, Clone)]
pub struct PlanningRequest {
    /// Snapshot of every agent, in agent order
    pub snapshots: Vec<GameSnapshot>,
    /// Current task of the plan
    pub main_task: String,
    /// Skills the planner may choose from
    pub skills: Vec<Skill>,
}

struct InFlight {
    receiver: oneshot::Receiver<anyhow::Result<Vec<Skill>>>,
    handle: JoinHandle<()>,
    submitted: Instant,
}

/// Holds at most one background planning request
#[derive(Default)]
pub struct PlanningSlot {
    in_flight: Option<InFlight>,
}

impl PlanningSlot {
    /// Empty slot
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether no request is pending
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.in_flight.is_none()
    }

    /// Start `request` on the current tokio runtime.
    ///
    /// Returns `Ok(false)` without doing anything while another request is pending.
    pub fn submit(&mut self, planner: Arc<dyn Planner>, request: PlanningRequest) -> Result<bool> {
        if self.in_flight.is_some() {
            return Ok(false);
        }
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| RLError::Environment(format!("planning needs a tokio runtime: {e}")))?;

        let (sender, receiver) = oneshot::channel();
        let handle = runtime.spawn(async move {
            let result =
                choose_next_skill_batch(planner.as_ref(), &request.snapshots, &request.main_task, &request.skills)
                    .await;
            // receiver gone means the request was cancelled
            let _ = sender.send(result);
        });
        self.in_flight = Some(InFlight { receiver, handle, submitted: Instant::now() });
        debug!("planning request submitted");
        Ok(true)
    }

    /// Take the finished result without blocking.
    ///
    /// Failed requests are logged and dropped, leaving the slot idle.
    pub fn poll(&mut self) -> Option<Vec<Skill>> {
        let mut in_flight = self.in_flight.take()?;
        match in_flight.receiver.try_recv() {
            Ok(Ok(skills)) => {
                debug!(elapsed_ms = in_flight.submitted.elapsed().as_millis(), "planning request finished");
                Some(skills)
            }
            Ok(Err(e)) => {
                warn!(error = %e, "planning request failed");
                None
            }
            Err(TryRecvError::Empty) => {
                self.in_flight = Some(in_flight);
                None
            }
            Err(TryRecvError::Closed) => {
                warn!("planning task ended without a result");
                None
            }
        }
    }

    /// Abort the pending request, if any
    pub fn cancel(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            in_flight.handle.abort();
            debug!("planning request cancelled");
        }
    }
}

impl Drop for PlanningSlot {
    fn drop(&mut self) {
        self.cancel();
    }
}
