//! Skills: parameterised sub-goals the planner assigns to an agent
//!
//! A [`Skill`] is a pure predicate over two snapshots plus a reward rule.
//! Skills carry no state; the "already paid" bookkeeping lives in the
//! caller-owned [`SkillAssignment`].

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

use goldrl_state::{GameSnapshot, Pocket};

/// Bonus paid when a skill goal is first reached
pub const COMPLETION_REWARD: f64 = 500.0;
/// Per-step heal reward while on the wrong map
pub const OFF_TARGET_MAP_PENALTY: f64 = -0.1;
/// Heal reward per tile of distance closed
pub const DISTANCE_REWARD_SCALE: f64 = 0.1;
/// Every member above this HP ratio counts as healed
pub const HEALED_HP_RATIO: f64 = 0.95;
/// A member at or below this HP ratio asks for healing
pub const LOW_HP_RATIO: f64 = 0.3;

/// Level no species reaches; the fallback skill is never completed
const UNREACHABLE_LEVEL: u8 = 251;

/// A tile to walk to for healing, usually a Pokémon Center
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealLocation {
    /// Display name
    pub name: String,
    /// Map bank of the center
    pub map_bank: u8,
    /// Map id of the center
    pub map_id: u8,
    /// Target tile column
    pub x: u8,
    /// Target tile row
    pub y: u8,
}

impl HealLocation {
    fn new(name: &str, map_bank: u8, map_id: u8, x: u8, y: u8) -> Self {
        Self { name: name.to_string(), map_bank, map_id, x, y }
    }

    /// Whether the snapshot is on this location's map
    #[must_use]
    pub fn is_on_map(&self, snapshot: &GameSnapshot) -> bool {
        snapshot.location.map_key() == (self.map_bank, self.map_id)
    }

    /// Manhattan distance from the snapshot's tile
    #[must_use]
    pub fn distance(&self, snapshot: &GameSnapshot) -> u32 {
        snapshot.location.manhattan_to(self.x, self.y)
    }
}

/// A sub-goal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Skill {
    /// Stand on a given map
    GoToMap {
        /// Target map bank
        map_bank: u8,
        /// Target map id
        map_id: u8,
        /// Display name of the map
        map_name: String,
    },
    /// Hold at least `target_badge_count` Johto badges
    EarnBadge {
        /// Display name of the badge
        badge_name: String,
        /// Badges required
        target_badge_count: u8,
    },
    /// Set a named event flag
    EventFlag {
        /// Registry name of the flag
        event_name: String,
        /// Display text
        description: String,
    },
    /// Hold an item in a bag pocket
    ObtainItem {
        /// Item id
        item_id: u8,
        /// Display name of the item
        item_name: String,
        /// Pocket searched
        pocket: Pocket,
    },
    /// Have a species in the party
    CaptureSpecies {
        /// Species id
        species_id: u8,
        /// Display name of the species
        species_name: String,
    },
    /// Have a party member at or above a level
    ReachLevel {
        /// Level required
        target_level: u8,
    },
    /// Walk to a heal location until the party is healthy
    HealParty {
        /// Where to heal
        location: HealLocation,
    },
}

impl Skill {
    /// Text shown to the planner and matched back against its answer
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Skill::GoToMap { map_name, .. } => format!("Go to {map_name}"),
            Skill::EarnBadge { badge_name, target_badge_count } => {
                format!("Earn the {badge_name} Badge (badge #{target_badge_count})")
            }
            Skill::EventFlag { description, .. } => description.clone(),
            Skill::ObtainItem { item_name, .. } => format!("Obtain {item_name}"),
            Skill::CaptureSpecies { species_name, .. } => format!("Capture {species_name}"),
            Skill::ReachLevel { target_level } => {
                format!("Raise one party Pokémon to level {target_level} or higher")
            }
            Skill::HealParty { location } => format!("Heal the party at {}", location.name),
        }
    }

    /// Whether the goal holds in `curr`
    #[must_use]
    pub fn is_achieved(&self, _prev: &GameSnapshot, curr: &GameSnapshot) -> bool {
        match self {
            Skill::GoToMap { map_bank, map_id, .. } => curr.location.map_key() == (*map_bank, *map_id),
            Skill::EarnBadge { target_badge_count, .. } => {
                curr.player_info.johto_badges_count >= *target_badge_count
            }
            Skill::EventFlag { event_name, .. } => curr.event_statuses.is_set(event_name),
            Skill::ObtainItem { item_id, pocket, .. } => curr.inventory.contains(*pocket, *item_id),
            Skill::CaptureSpecies { species_id, .. } => curr.party_info.has_species(*species_id),
            Skill::ReachLevel { target_level } => {
                curr.party_info.pokemon.iter().any(|p| p.level >= *target_level)
            }
            Skill::HealParty { .. } => party_is_healed(curr),
        }
    }

    /// Reward for the `prev -> curr` transition.
    ///
    /// Goal skills pay [`COMPLETION_REWARD`] only when the goal becomes true
    /// on this step. `HealParty` pays distance shaping every step.
    #[must_use]
    pub fn get_reward(&self, prev: &GameSnapshot, curr: &GameSnapshot) -> f64 {
        match self {
            Skill::HealParty { location } => {
                if !location.is_on_map(curr) {
                    return OFF_TARGET_MAP_PENALTY;
                }
                let closed = i64::from(location.distance(prev)) - i64::from(location.distance(curr));
                #[allow(clippy::cast_precision_loss)]
                let closed = closed as f64;
                closed * DISTANCE_REWARD_SCALE
            }
            _ if self.is_achieved(prev, curr) && !self.is_achieved(prev, prev) => COMPLETION_REWARD,
            _ => 0.0,
        }
    }

    /// Whether the reward is continuous shaping rather than a one-shot bonus
    #[must_use]
    pub fn is_shaping(&self) -> bool {
        matches!(self, Skill::HealParty { .. })
    }
}

impl std::fmt::Display for Skill {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.description())
    }
}

/// A skill assigned to one agent, with its completion credit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillAssignment {
    skill: Skill,
    credited: bool,
}

impl SkillAssignment {
    /// Fresh assignment; nothing credited yet
    #[must_use]
    pub fn new(skill: Skill) -> Self {
        Self { skill, credited: false }
    }

    /// The assigned skill
    #[must_use]
    pub fn skill(&self) -> &Skill {
        &self.skill
    }

    /// Whether the completion bonus was already paid
    #[must_use]
    pub fn is_credited(&self) -> bool {
        self.credited
    }

    /// Skill reward for this step, paying the completion bonus at most once
    pub fn reward(&mut self, prev: &GameSnapshot, curr: &GameSnapshot) -> f64 {
        if self.skill.is_shaping() {
            return self.skill.get_reward(prev, curr);
        }
        if self.credited || !self.skill.is_achieved(prev, curr) {
            return 0.0;
        }
        self.credited = true;
        self.skill.get_reward(prev, curr)
    }
}

impl Default for SkillAssignment {
    fn default() -> Self {
        Self::new(default_skill())
    }
}

impl From<Skill> for SkillAssignment {
    fn from(skill: Skill) -> Self {
        Self::new(skill)
    }
}

/// Skill used before the planner has answered
#[must_use]
pub fn default_skill() -> Skill {
    Skill::ReachLevel { target_level: UNREACHABLE_LEVEL }
}

fn go_to(map_bank: u8, map_id: u8, map_name: &str) -> Skill {
    Skill::GoToMap { map_bank, map_id, map_name: map_name.to_string() }
}

fn badge(badge_name: &str, target_badge_count: u8) -> Skill {
    Skill::EarnBadge { badge_name: badge_name.to_string(), target_badge_count }
}

fn event(event_name: &str, description: &str) -> Skill {
    Skill::EventFlag { event_name: event_name.to_string(), description: description.to_string() }
}

fn capture(species_id: u8, species_name: &str) -> Skill {
    Skill::CaptureSpecies { species_id, species_name: species_name.to_string() }
}

lazy_static! {
    /// The campaign skill list offered to the planner, in story order
    pub static ref AVAILABLE_SKILLS: Vec<Skill> = {
        let mut skills = vec![
            // New Bark Town to Violet City
            go_to(24, 5, "Route 29"),
            go_to(24, 7, "Cherrygrove City"),
            go_to(24, 9, "Route 30"),
            event("got_pokedex", "Obtain the Pokédex and the Mystery Egg"),
            go_to(24, 4, "New Bark Town (return)"),
            capture(163, "Hoothoot"),
            go_to(3, 1, "Violet City"),
            event("rival_met_sprout_tower", "Clear Sprout Tower"),
            badge("Zephyr", 1),
            // Violet City to Azalea Town
            go_to(24, 12, "Route 32"),
            capture(179, "Mareep"),
            capture(79, "Slowpoke"),
            go_to(4, 0, "Azalea Town"),
            event("rocket_slowpoke_well_defeated", "Drive Team Rocket out of Slowpoke Well"),
            badge("Hive", 2),
            // Azalea Town to Goldenrod City
            event("farfetchd_brought_back", "Obtain HM01 Cut"),
            go_to(5, 0, "Goldenrod City"),
            badge("Plain", 3),
            // Goldenrod City to Ecruteak City
            go_to(6, 0, "Ecruteak City"),
            event("olivine_gym_leader_lighthouse", "Beat every Kimono Girl in Ecruteak City"),
            badge("Fog", 4),
            // Ecruteak City to Cianwood City
            go_to(17, 0, "Olivine City"),
            go_to(18, 0, "Cianwood City"),
            badge("Storm", 5),
            // Cianwood City back to the Olivine gym
            event("lighthouse_pokemon_cured", "Cure the sick Pokémon at the Olivine Lighthouse"),
            badge("Mineral", 6),
            // Olivine City to Mahogany Town
            go_to(19, 0, "Mahogany Town"),
            event("battled_red_gyarados", "Encounter and battle the Red Gyarados"),
            event("rocket_mahogany_cleared", "Clear the Team Rocket Hideout in Mahogany Town"),
            badge("Glacier", 7),
            // Mahogany Town to Blackthorn City
            event("rocket_radio_tower_cleared", "Free the Goldenrod Radio Tower from Team Rocket"),
            go_to(20, 0, "Blackthorn City"),
            event("rival_in_dragons_den", "Pass the Dragon's Den trial"),
            badge("Rising", 8),
            // Victory Road and the Elite Four
            go_to(26, 4, "Victory Road"),
            go_to(10, 1, "Indigo Plateau"),
            event("elite4_will", "Defeat Elite Four Will"),
            event("elite4_koga", "Defeat Elite Four Koga"),
            event("elite4_bruno", "Defeat Elite Four Bruno"),
            event("elite4_karen", "Defeat Elite Four Karen"),
            event("champion_lance", "Defeat Champion Lance"),
        ];
        // intermediate level goals
        skills.extend((10..=50).step_by(5).map(|target_level| Skill::ReachLevel { target_level }));
        skills
    };

    /// Heal location used when the current map has no center
    pub static ref HOME_CENTER: HealLocation = HealLocation::new("New Bark Town", 24, 5, 2, 2);

    /// Heal locations, starting with [`HOME_CENTER`]
    pub static ref POKEMON_CENTERS: Vec<HealLocation> = vec![
        HOME_CENTER.clone(),
        HealLocation::new("Cherrygrove City Pokémon Center", 24, 7, 10, 2),
        HealLocation::new("Violet City Pokémon Center", 3, 1, 12, 2),
        HealLocation::new("Azalea Town Pokémon Center", 4, 0, 8, 6),
        HealLocation::new("Goldenrod City Pokémon Center", 5, 0, 14, 8),
    ];
}

/// Empty parties and members with zero max HP count as healed
#[must_use]
pub fn party_is_healed(snapshot: &GameSnapshot) -> bool {
    snapshot
        .party_info
        .pokemon
        .iter()
        .all(|p| p.hp_ratio().map_or(true, |ratio| ratio > HEALED_HP_RATIO))
}

/// Any member fainted or at low HP
#[must_use]
pub fn needs_healing(snapshot: &GameSnapshot) -> bool {
    snapshot
        .party_info
        .pokemon
        .iter()
        .any(|p| p.is_fainted() || p.hp_ratio().is_some_and(|ratio| ratio <= LOW_HP_RATIO))
}

/// Heal at the center on the current map, else at the first center
#[must_use]
pub fn heal_skill_for(snapshot: &GameSnapshot) -> Skill {
    let location = POKEMON_CENTERS
        .iter()
        .find(|c| c.is_on_map(snapshot))
        .unwrap_or(&*HOME_CENTER)
        .clone();
    Skill::HealParty { location }
}

/// First skill whose description occurs in `text`
#[must_use]
pub fn match_skill<'a>(skills: &'a [Skill], text: &str) -> Option<&'a Skill> {
    skills.iter().find(|s| text.contains(&s.description()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use goldrl_state::{ItemSlot, PartyInfo, PartyMember};

    fn at(map_bank: u8, map_id: u8, x: u8, y: u8) -> GameSnapshot {
        let mut s = GameSnapshot::default();
        s.location.map_bank = map_bank;
        s.location.map_id = map_id;
        s.location.x_coord = x;
        s.location.y_coord = y;
        s
    }

    fn with_party(members: &[(u8, u8, u16, u16)]) -> GameSnapshot {
        let mut s = GameSnapshot::default();
        s.party_info = PartyInfo::from_members(
            members
                .iter()
                .map(|&(species_id, level, current_hp, max_hp)| PartyMember {
                    species_id,
                    level,
                    current_hp,
                    max_hp,
                    ..PartyMember::default()
                })
                .collect(),
        );
        s
    }

    #[test]
    fn test_go_to_map_pays_once_on_arrival() {
        let skill = go_to(3, 1, "Violet City");
        let away = at(24, 9, 0, 0);
        let there = at(3, 1, 5, 5);
        assert!(skill.is_achieved(&away, &there));
        assert_eq!(skill.get_reward(&away, &there), COMPLETION_REWARD);
        // already there on the previous step
        assert_eq!(skill.get_reward(&there, &there), 0.0);
    }

    #[test]
    fn test_get_reward_is_pure() {
        let skill = badge("Zephyr", 1);
        let prev = GameSnapshot::default();
        let mut curr = GameSnapshot::default();
        curr.player_info.johto_badges_count = 1;
        let first = skill.get_reward(&prev, &curr);
        let second = skill.get_reward(&prev, &curr);
        assert_eq!(first, second);
        assert_eq!(first, COMPLETION_REWARD);
    }

    #[test]
    fn test_assignment_credits_once() {
        let mut assignment = SkillAssignment::new(capture(163, "Hoothoot"));
        let empty = with_party(&[]);
        let caught = with_party(&[(163, 3, 10, 10)]);
        assert_eq!(assignment.reward(&empty, &caught), COMPLETION_REWARD);
        assert!(assignment.is_credited());
        // the goal flickering off and on again pays nothing more
        assert_eq!(assignment.reward(&caught, &empty), 0.0);
        assert_eq!(assignment.reward(&empty, &caught), 0.0);
    }

    #[test]
    fn test_assignment_of_satisfied_goal_pays_nothing() {
        let mut assignment = SkillAssignment::new(badge("Zephyr", 1));
        let mut s = GameSnapshot::default();
        s.player_info.johto_badges_count = 2;
        assert_eq!(assignment.reward(&s, &s), 0.0);
        assert!(assignment.is_credited());
    }

    #[test]
    fn test_event_item_and_level_predicates() {
        let prev = GameSnapshot::default();
        let mut curr = GameSnapshot::default();
        curr.event_statuses.set("got_pokedex", true);
        curr.inventory.key_items.push(0x37);
        curr.inventory.balls.push(ItemSlot { id: 5, amount: 3 });
        assert!(event("got_pokedex", "x").is_achieved(&prev, &curr));
        assert!(!event("elite4_will", "y").is_achieved(&prev, &curr));

        let map_card = Skill::ObtainItem { item_id: 0x37, item_name: "Map Card".into(), pocket: Pocket::KeyItems };
        assert!(map_card.is_achieved(&prev, &curr));
        let wrong_pocket = Skill::ObtainItem { item_id: 0x37, item_name: "Map Card".into(), pocket: Pocket::Items };
        assert!(!wrong_pocket.is_achieved(&prev, &curr));

        let level = Skill::ReachLevel { target_level: 10 };
        assert!(!level.is_achieved(&prev, &with_party(&[])));
        assert!(level.is_achieved(&prev, &with_party(&[(155, 4, 1, 1), (163, 10, 1, 1)])));
    }

    #[test]
    fn test_heal_shaping() {
        let skill = heal_skill_for(&at(3, 1, 0, 0));
        let Skill::HealParty { location } = &skill else { panic!("expected heal skill") };
        assert_eq!((location.x, location.y), (12, 2));

        // closed three tiles of distance
        let prev = at(3, 1, 5, 2);
        let curr = at(3, 1, 8, 2);
        assert!((skill.get_reward(&prev, &curr) - 0.3).abs() < 1e-9);
        // walked away
        assert!((skill.get_reward(&curr, &prev) + 0.3).abs() < 1e-9);
        // wrong map
        assert!((skill.get_reward(&prev, &at(24, 4, 0, 0)) - OFF_TARGET_MAP_PENALTY).abs() < 1e-9);
    }

    #[test]
    fn test_heal_shaping_is_not_one_shot() {
        let mut assignment = SkillAssignment::new(heal_skill_for(&at(3, 1, 0, 0)));
        let off = at(24, 4, 0, 0);
        assert!((assignment.reward(&off, &off) - OFF_TARGET_MAP_PENALTY).abs() < 1e-9);
        assert!((assignment.reward(&off, &off) - OFF_TARGET_MAP_PENALTY).abs() < 1e-9);
    }

    #[test]
    fn test_heal_skill_falls_back_to_first_center() {
        let Skill::HealParty { location } = heal_skill_for(&at(19, 0, 0, 0)) else { panic!("expected heal skill") };
        assert_eq!(location, POKEMON_CENTERS[0]);
        assert_eq!(location, *HOME_CENTER);
    }

    #[test]
    fn test_healing_thresholds() {
        assert!(party_is_healed(&with_party(&[])));
        assert!(party_is_healed(&with_party(&[(1, 5, 20, 20), (2, 5, 0, 0)])));
        assert!(!party_is_healed(&with_party(&[(1, 5, 19, 20)])));

        assert!(!needs_healing(&with_party(&[])));
        assert!(needs_healing(&with_party(&[(1, 5, 0, 20)])));
        assert!(needs_healing(&with_party(&[(1, 5, 6, 20)])));
        assert!(!needs_healing(&with_party(&[(1, 5, 7, 20)])));
    }

    #[test]
    fn test_catalogue_descriptions_do_not_shadow_each_other() {
        let descriptions: Vec<String> = AVAILABLE_SKILLS.iter().map(Skill::description).collect();
        for (i, a) in descriptions.iter().enumerate() {
            for (j, b) in descriptions.iter().enumerate() {
                if i != j {
                    assert!(!b.contains(a.as_str()), "{a:?} is contained in {b:?}");
                }
            }
        }
        assert_eq!(AVAILABLE_SKILLS.iter().filter(|s| matches!(s, Skill::ReachLevel { .. })).count(), 9);
    }

    #[test]
    fn test_match_skill() {
        let text = "I think we should Go to Violet City next.";
        assert_eq!(match_skill(&AVAILABLE_SKILLS, text), Some(&go_to(3, 1, "Violet City")));
        assert_eq!(match_skill(&AVAILABLE_SKILLS, "wander around"), None);
    }

    #[test]
    fn test_default_skill_is_never_achieved() {
        let s = with_party(&[(155, 100, 1, 1)]);
        assert!(!default_skill().is_achieved(&s, &s));
    }

    #[test]
    fn test_skill_serializes_with_kind_tag() {
        let json = serde_json::to_value(go_to(3, 1, "Violet City")).unwrap();
        assert_eq!(json["kind"], "go_to_map");
        assert_eq!(json["map_bank"], 3);
    }
}
