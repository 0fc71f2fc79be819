//! Per-step reward composition
//!
//! [`RewardComposer`] produces the scalar the policy trains on. The
//! [`CategoryLedger`] is a separate, deduplicated per-category view used
//! only for logging.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use goldrl_state::GameSnapshot;

use crate::skills::SkillAssignment;

/// Weights of the composed step reward
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    /// Per point of enemy HP removed in battle
    pub battle_damage_dealt: f64,
    /// Per point of party HP lost in battle, subtracted
    pub battle_hp_lost: f64,
    /// Leaving a battle whose enemy was at 0 HP
    pub battle_won: f64,
    /// Leaving a battle any other way
    pub battle_exit_other: f64,
    /// First visit of a map this episode
    pub new_map: f64,
    /// First visit of a tile on a map this episode
    pub new_coordinate: f64,
    /// Per point of party HP lost, subtracted
    pub hp_lost: f64,
    /// Opening a menu
    pub menu_open: f64,
    /// Each step spent inside a menu
    pub menu_stay: f64,
    /// Party HP reaching zero
    pub party_wipe: f64,
    /// Diagnostic ledger weights
    pub categories: CategoryWeights,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            battle_damage_dealt: 0.5,
            battle_hp_lost: 0.1,
            battle_won: 100.0,
            battle_exit_other: -10.0,
            new_map: 5.0,
            new_coordinate: 0.1,
            hp_lost: 0.01,
            menu_open: -0.5,
            menu_stay: -0.1,
            party_wipe: -50.0,
            categories: CategoryWeights::default(),
        }
    }
}

/// Weights of the category ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryWeights {
    /// Per newly set event flag
    pub event: f64,
    /// Per new badge
    pub badge: f64,
    /// First visit of a map
    pub new_map: f64,
    /// First visit of a tile
    pub exploration: f64,
    /// Per level of party level sum gained
    pub level_up: f64,
    /// Per point of party HP lost; negative
    pub hp_penalty: f64,
}

impl Default for CategoryWeights {
    fn default() -> Self {
        Self {
            event: 10.0,
            badge: 50.0,
            new_map: 5.0,
            exploration: 0.1,
            level_up: 2.0,
            hp_penalty: -0.01,
        }
    }
}

/// Breakdown of one composed step reward
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StepReward {
    /// Sum of every component
    pub total: f64,
    /// Battle reward, or the active skill reward outside battle
    pub main: f64,
    /// New map and new tile bonuses
    pub exploration: f64,
    /// HP loss shaping
    pub hp_loss: f64,
    /// Menu open and dwell penalties
    pub menu: f64,
    /// Party wipe penalty
    pub faint: f64,
}

/// Tiles seen per map during one episode
#[derive(Debug, Clone, Default)]
struct VisitMap {
    seen: HashMap<(u8, u8), HashSet<(u8, u8)>>,
}

impl VisitMap {
    /// Record a visit; returns (new map, new tile)
    fn visit(&mut self, snapshot: &GameSnapshot) -> (bool, bool) {
        let map_key = snapshot.location.map_key();
        let new_map = !self.seen.contains_key(&map_key);
        let new_tile = self.seen.entry(map_key).or_default().insert(snapshot.location.coords());
        (new_map, new_tile)
    }

    fn clear(&mut self) {
        self.seen.clear();
    }

    fn maps(&self) -> usize {
        self.seen.len()
    }

    fn tiles(&self) -> usize {
        self.seen.values().map(HashSet::len).sum()
    }
}

fn hp_lost(prev: &GameSnapshot, curr: &GameSnapshot) -> u32 {
    prev.party_info.party_hp_sum.saturating_sub(curr.party_info.party_hp_sum)
}

/// Composes the per-step training reward
#[derive(Debug, Clone, Default)]
pub struct RewardComposer {
    config: RewardConfig,
    visits: VisitMap,
}

impl RewardComposer {
    /// Composer with the given weights
    #[must_use]
    pub fn new(config: RewardConfig) -> Self {
        Self { config, visits: VisitMap::default() }
    }

    /// Weights in use
    #[must_use]
    pub fn config(&self) -> &RewardConfig {
        &self.config
    }

    /// Forget every visit; call at episode start
    pub fn reset(&mut self) {
        self.visits.clear();
    }

    /// Maps visited this episode
    #[must_use]
    pub fn maps_seen(&self) -> usize {
        self.visits.maps()
    }

    /// Tiles visited this episode, over all maps
    #[must_use]
    pub fn tiles_seen(&self) -> usize {
        self.visits.tiles()
    }

    /// Reward of the `prev -> curr` step under `skill`
    pub fn compose(
        &mut self,
        prev: &GameSnapshot,
        curr: &GameSnapshot,
        skill: &mut SkillAssignment,
    ) -> StepReward {
        // battle steps include the step that leaves the battle
        let main = if prev.is_in_battle || curr.is_in_battle {
            self.battle_reward(prev, curr)
        } else {
            skill.reward(prev, curr)
        };
        let exploration = self.exploration_reward(curr);
        let hp_loss = -f64::from(hp_lost(prev, curr)) * self.config.hp_lost;
        let menu = self.menu_penalty(prev, curr);
        let faint = if prev.party_info.party_hp_sum > 0 && curr.party_info.party_hp_sum == 0 {
            self.config.party_wipe
        } else {
            0.0
        };

        StepReward {
            total: main + exploration + hp_loss + menu + faint,
            main,
            exploration,
            hp_loss,
            menu,
            faint,
        }
    }

    /// Damage dealt minus damage taken, plus the exit outcome
    #[must_use]
    pub fn battle_reward(&self, prev: &GameSnapshot, curr: &GameSnapshot) -> f64 {
        let mut reward = 0.0;
        if let (Some(before), Some(after)) = (&prev.battle_info, &curr.battle_info) {
            let dealt = before.enemy_hp.saturating_sub(after.enemy_hp);
            reward += f64::from(dealt) * self.config.battle_damage_dealt;
        }
        reward -= f64::from(hp_lost(prev, curr)) * self.config.battle_hp_lost;

        if prev.is_in_battle && !curr.is_in_battle {
            let enemy_fainted = prev.battle_info.map_or(true, |b| b.enemy_hp == 0);
            reward += if enemy_fainted { self.config.battle_won } else { self.config.battle_exit_other };
        }
        reward
    }

    fn exploration_reward(&mut self, curr: &GameSnapshot) -> f64 {
        let (new_map, new_tile) = self.visits.visit(curr);
        let mut reward = 0.0;
        if new_map {
            reward += self.config.new_map;
        }
        if new_tile {
            reward += self.config.new_coordinate;
        }
        reward
    }

    fn menu_penalty(&self, prev: &GameSnapshot, curr: &GameSnapshot) -> f64 {
        match (prev.is_in_menu, curr.is_in_menu) {
            (false, true) => self.config.menu_open,
            (true, true) => self.config.menu_stay,
            _ => 0.0,
        }
    }
}

/// Per-category rewards of one step
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryRewards {
    /// New event flags
    pub event: f64,
    /// New badges
    pub badge: f64,
    /// Party level sum gained
    pub level_up: f64,
    /// First visit to a map
    pub new_map: f64,
    /// First visit to a tile
    pub exploration: f64,
    /// HP lost outside battle
    pub hp_penalty: f64,
}

impl CategoryRewards {
    /// Sum over all categories
    #[must_use]
    pub fn total(&self) -> f64 {
        self.event + self.badge + self.level_up + self.new_map + self.exploration + self.hp_penalty
    }

    /// Only the categories that paid something
    #[must_use]
    pub fn non_zero(&self) -> BTreeMap<&'static str, f64> {
        [
            ("event", self.event),
            ("badge", self.badge),
            ("level_up", self.level_up),
            ("new_map", self.new_map),
            ("exploration", self.exploration),
            ("hp_penalty", self.hp_penalty),
        ]
        .into_iter()
        .filter(|(_, v)| *v != 0.0)
        .collect()
    }
}

/// Deduplicated per-category accounting over an episode.
///
/// Each event flag, badge and level-sum increment is credited once; the
/// ledger is seeded from the reset snapshot so pre-existing progress pays
/// nothing.
#[derive(Debug, Clone)]
pub struct CategoryLedger {
    weights: CategoryWeights,
    completed_events: HashSet<String>,
    max_badges: u8,
    max_level_sum: u32,
    visits: VisitMap,
}

impl CategoryLedger {
    /// Ledger seeded with the progress already present in `initial`
    #[must_use]
    pub fn seeded(weights: CategoryWeights, initial: &GameSnapshot) -> Self {
        Self {
            weights,
            completed_events: initial.event_statuses.completed().map(str::to_string).collect(),
            max_badges: initial.player_info.johto_badges_count,
            max_level_sum: initial.party_info.party_level_sum,
            visits: VisitMap::default(),
        }
    }

    /// Events credited so far, including seeded ones
    #[must_use]
    pub fn credited_events(&self) -> usize {
        self.completed_events.len()
    }

    /// Credit the progress of `prev -> curr`
    pub fn record(&mut self, prev: &GameSnapshot, curr: &GameSnapshot) -> CategoryRewards {
        let mut rewards = CategoryRewards::default();

        let mut new_events = 0u32;
        for name in curr.event_statuses.completed() {
            if self.completed_events.insert(name.to_string()) {
                new_events += 1;
            }
        }
        rewards.event = f64::from(new_events) * self.weights.event;

        let badges = curr.player_info.johto_badges_count;
        if badges > self.max_badges {
            rewards.badge = f64::from(badges - self.max_badges) * self.weights.badge;
            self.max_badges = badges;
        }

        let level_sum = curr.party_info.party_level_sum;
        if level_sum > self.max_level_sum {
            rewards.level_up = f64::from(level_sum - self.max_level_sum) * self.weights.level_up;
            self.max_level_sum = level_sum;
        }

        let (new_map, new_tile) = self.visits.visit(curr);
        if new_map {
            rewards.new_map = self.weights.new_map;
        }
        if new_tile {
            rewards.exploration = self.weights.exploration;
        }

        rewards.hp_penalty = f64::from(hp_lost(prev, curr)) * self.weights.hp_penalty;
        rewards
    }
}
