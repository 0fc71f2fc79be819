//! Campaign plan and monotonic task progression
//!
//! A plan is an ordered list of tasks. Each task has display text and a
//! structured [`TaskCondition`]. Plain-text tasks are decoded into a
//! condition once, at load time, through a keyword table.

use std::path::Path;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use goldrl_state::{flags, GameSnapshot};

use crate::error::PlanError;

/// Description reported once every task is done
pub const ALL_GOALS_SATISFIED: &str = "All goals satisfied!";

/// Machine-checkable completion condition of a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskCondition {
    /// A named event flag is set
    Flag {
        /// Registry flag name
        name: String,
    },
    /// A named event flag is cleared
    FlagCleared {
        /// Registry flag name
        name: String,
    },
    /// At least `count` Johto badges
    Badges {
        /// Badges required
        count: u8,
    },
    /// A species is in the party
    OwnSpecies {
        /// Species id
        species_id: u8,
    },
    /// Standing on a map
    AtMap {
        /// Map bank
        map_bank: u8,
        /// Map id
        map_id: u8,
    },
    /// Every inner condition holds
    All {
        /// Conditions combined
        conditions: Vec<TaskCondition>,
    },
    /// Free text with no known condition; never completes
    Unrecognized,
}

impl TaskCondition {
    fn flag(name: &str) -> Self {
        TaskCondition::Flag { name: name.to_string() }
    }

    fn flag_cleared(name: &str) -> Self {
        TaskCondition::FlagCleared { name: name.to_string() }
    }

    /// Evaluate against a snapshot
    #[must_use]
    pub fn is_satisfied(&self, snapshot: &GameSnapshot) -> bool {
        match self {
            TaskCondition::Flag { name } => snapshot.event_statuses.is_set(name),
            TaskCondition::FlagCleared { name } => !snapshot.event_statuses.is_set(name),
            TaskCondition::Badges { count } => snapshot.player_info.johto_badges_count >= *count,
            TaskCondition::OwnSpecies { species_id } => snapshot.party_info.has_species(*species_id),
            TaskCondition::AtMap { map_bank, map_id } => {
                snapshot.location.map_key() == (*map_bank, *map_id)
            }
            TaskCondition::All { conditions } => conditions.iter().all(|c| c.is_satisfied(snapshot)),
            TaskCondition::Unrecognized => false,
        }
    }

    /// Every flag name this condition refers to
    #[must_use]
    pub fn flag_names(&self) -> Vec<&str> {
        match self {
            TaskCondition::Flag { name } | TaskCondition::FlagCleared { name } => vec![name.as_str()],
            TaskCondition::All { conditions } => conditions.iter().flat_map(TaskCondition::flag_names).collect(),
            _ => Vec::new(),
        }
    }

    /// Decode a free-text task description.
    ///
    /// Keyword entries are tried in order, then the arrival fallbacks.
    #[must_use]
    pub fn from_description(description: &str) -> Self {
        KEYWORD_TABLE
            .iter()
            .chain(ARRIVAL_FALLBACKS.iter())
            .find(|(keywords, _)| keywords.iter().all(|k| description.contains(k)))
            .map_or(TaskCondition::Unrecognized, |(_, condition)| condition.clone())
    }
}

const CYNDAQUIL: u8 = 155;
const HOOTHOOT: u8 = 163;
const MAREEP: u8 = 179;
const SLOWPOKE: u8 = 79;
const HO_OH: u8 = 250;

type KeywordEntry = (Vec<&'static str>, TaskCondition);

lazy_static! {
    static ref KEYWORD_TABLE: Vec<KeywordEntry> = {
        use TaskCondition as T;
        let species = |species_id| T::OwnSpecies { species_id };
        let badges = |count| T::Badges { count };
        vec![
            (
                vec!["Start game", "choose Cyndaquil"],
                T::All { conditions: vec![species(CYNDAQUIL), T::flag("starter_received")] },
            ),
            (vec!["Get Map Card"], T::flag("guide_gent_map")),
            (vec!["receive Mystery Egg and Pokédex"], T::flag("got_pokedex")),
            (
                vec!["give Mystery Egg to Professor Elm"],
                T::All { conditions: vec![T::flag("rival_stolen_pokemon"), T::flag("got_starter_pokeball")] },
            ),
            (vec!["capture Hoothoot"], species(HOOTHOOT)),
            (vec!["Clear Sprout Tower... receive HM05 Flash"], T::flag("rival_met_sprout_tower")),
            (vec!["defeat Falkner, receive Zephyr Badge"], badges(1)),
            (
                vec!["capture Mareep and a Slowpoke"],
                T::All { conditions: vec![species(MAREEP), species(SLOWPOKE)] },
            ),
            (vec!["Clear Slowpoke Well"], T::flag("rocket_slowpoke_well_defeated")),
            (vec!["defeat Bugsy, receive Hive Badge"], badges(2)),
            (vec!["receive HM01 Cut"], T::flag("farfetchd_brought_back")),
            (vec!["defeat Whitney, receive Plain Badge"], badges(3)),
            (vec!["Clear Sudowoodo"], T::flag("battled_sudowoodo")),
            (vec!["receive HM03 Surf"], T::flag("olivine_gym_leader_lighthouse")),
            (vec!["defeat Morty, receive Fog Badge"], badges(4)),
            // the flag reads "not yet received", so cleared means obtained
            (vec!["get HM04 Strength"], T::flag_cleared("hm04_olivine")),
            (vec!["defeat Chuck, receive Storm Badge"], badges(5)),
            (vec!["heal Ampharos at the Lighthouse"], T::flag("lighthouse_pokemon_cured")),
            (vec!["defeat Jasmine, receive Mineral Badge"], badges(6)),
            (vec!["capture the Red Gyarados"], T::flag("battled_red_gyarados")),
            (vec!["clear the Team Rocket Hideout"], T::flag("rocket_mahogany_cleared")),
            (vec!["defeat Pryce, receive Glacier Badge"], badges(7)),
            (vec!["clear the Team Rocket takeover of the Radio Tower"], T::flag("rocket_radio_tower_cleared")),
            (vec!["capture Ho-Oh"], species(HO_OH)),
            (vec!["defeat Clair, receive Rising Badge"], badges(8)),
            (vec!["Complete the Dragon's Den trial"], T::flag("rival_in_dragons_den")),
            (vec!["Defeat Elite Four Will"], T::flag("elite4_will")),
            (vec!["Defeat Elite Four Koga"], T::flag("elite4_koga")),
            (vec!["Defeat Elite Four Bruno"], T::flag("elite4_bruno")),
            (vec!["Defeat Elite Four Karen"], T::flag("elite4_karen")),
            (vec!["Defeat Champion Lance"], T::flag("champion_lance")),
            (vec!["Become the Johto Champion"], T::flag("champion_lance")),
        ]
    };

    static ref ARRIVAL_FALLBACKS: Vec<KeywordEntry> = vec![
        (vec!["Violet City"], TaskCondition::AtMap { map_bank: 3, map_id: 1 }),
        (vec!["Azalea Town"], TaskCondition::AtMap { map_bank: 4, map_id: 0 }),
        (vec!["Goldenrod City"], TaskCondition::AtMap { map_bank: 5, map_id: 0 }),
    ];
}

/// One step of the campaign
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Display text, also sent to the planner
    pub description: String,
    /// Completion condition
    pub condition: TaskCondition,
}

impl Task {
    /// Task whose condition is decoded from its text
    #[must_use]
    pub fn from_description(description: impl Into<String>) -> Self {
        let description = description.into();
        let condition = TaskCondition::from_description(&description);
        Self { description, condition }
    }
}

/// A plan file entry: free text or an explicit condition
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum TaskEntry {
    Text(String),
    Structured { description: String, condition: TaskCondition },
}

#[derive(Debug, Deserialize)]
struct PlanFile {
    goal: String,
    tasks: Vec<TaskEntry>,
}

/// A validated campaign plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    /// Overall objective
    pub goal: String,
    /// Ordered tasks
    pub tasks: Vec<Task>,
}

impl Plan {
    /// Parse and validate plan JSON
    pub fn from_json(json: &str) -> Result<Self, PlanError> {
        let file: PlanFile = serde_json::from_str(json)?;
        let tasks = file
            .tasks
            .into_iter()
            .map(|entry| match entry {
                TaskEntry::Text(text) => Task::from_description(text),
                TaskEntry::Structured { description, condition } => Task { description, condition },
            })
            .collect();
        let plan = Self { goal: file.goal, tasks };
        plan.validate()?;
        Ok(plan)
    }

    /// Read a plan file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PlanError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|source| PlanError::Io { path: path.to_path_buf(), source })?;
        Self::from_json(&json)
    }

    /// Write the plan with structured conditions
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), PlanError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|source| PlanError::Io { path: path.to_path_buf(), source })
    }

    /// Every flag referenced by a condition must exist in the registry
    pub fn validate(&self) -> Result<(), PlanError> {
        for task in &self.tasks {
            if let Some(flag) = task.condition.flag_names().into_iter().find(|f| flags::lookup(f).is_none()) {
                return Err(PlanError::UnknownFlag { task: task.description.clone(), flag: flag.to_string() });
            }
        }
        Ok(())
    }

    /// Minimal opening plan written when no plan file exists
    #[must_use]
    pub fn opening() -> Self {
        Self {
            goal: "Become the Johto Champion".to_string(),
            tasks: [
                "Start game and choose Cyndaquil as starter",
                "Obtain Pokédex and Poké Balls",
                "Defeat Gym 1 - Falkner (Flying, Violet City)",
            ]
            .into_iter()
            .map(Task::from_description)
            .collect(),
        }
    }
}

/// Cursor over a plan; only ever moves forward
#[derive(Debug, Clone)]
pub struct TaskProgression {
    plan: Plan,
    current_index: usize,
}

impl TaskProgression {
    /// Progression at the first task
    #[must_use]
    pub fn from_plan(plan: Plan) -> Self {
        Self { plan, current_index: 0 }
    }

    /// Load a plan file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PlanError> {
        Plan::load(path).map(Self::from_plan)
    }

    /// The plan being followed
    #[must_use]
    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    /// Overall objective
    #[must_use]
    pub fn goal(&self) -> &str {
        &self.plan.goal
    }

    /// Index of the current task; equals the task count at the end
    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// Number of tasks
    #[must_use]
    pub fn len(&self) -> usize {
        self.plan.tasks.len()
    }

    /// Whether the plan has no tasks
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plan.tasks.is_empty()
    }

    /// Whether every task is done
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.current_index >= self.plan.tasks.len()
    }

    /// The current task, `None` at the end
    #[must_use]
    pub fn current_task(&self) -> Option<&Task> {
        self.plan.tasks.get(self.current_index)
    }

    /// Description of the current task, or the all-done message
    #[must_use]
    pub fn current_task_description(&self) -> &str {
        self.current_task().map_or(ALL_GOALS_SATISFIED, |t| t.description.as_str())
    }

    /// Whether the current task holds; always true at the end
    #[must_use]
    pub fn is_current_task_completed(&self, snapshot: &GameSnapshot) -> bool {
        self.current_task().map_or(true, |t| t.condition.is_satisfied(snapshot))
    }

    /// Move to the next task. Returns `false` when already at the end.
    pub fn advance_to_next_task(&mut self) -> bool {
        if self.is_finished() {
            return false;
        }
        self.current_index += 1;
        info!("Advancing to next task: {}", self.current_task_description());
        true
    }

    /// Advance past every task that already holds; returns how many were skipped
    pub fn advance_while_completed(&mut self, snapshot: &GameSnapshot) -> usize {
        let mut skipped = 0;
        while !self.is_finished() && self.is_current_task_completed(snapshot) {
            debug!("Task already satisfied: {}", self.current_task_description());
            self.advance_to_next_task();
            skipped += 1;
        }
        skipped
    }

    /// Fast-forward to the first unsatisfied task of a resumed game
    pub fn sync_with_initial_state(&mut self, snapshot: &GameSnapshot) -> usize {
        info!("Syncing task plan with the loaded game state");
        let skipped = self.advance_while_completed(snapshot);
        info!(
            "Sync complete, skipped {} task(s); current task: {}",
            skipped,
            self.current_task_description()
        );
        skipped
    }
}
