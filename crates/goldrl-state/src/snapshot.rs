//! Structured game state produced once per step

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use goldrl_core::State;

use crate::flags::{self, FlagCategory};
use crate::rom::MapConnection;

/// Party size limit
pub const MAX_PARTY_SIZE: usize = 6;

/// Current map and tile
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// Map bank
    pub map_bank: u8,
    /// Map id
    pub map_id: u8,
    /// Tile column
    pub x_coord: u8,
    /// Tile row
    pub y_coord: u8,
    /// Sub-tile column
    pub x_coord_detailed: u8,
    /// Sub-tile row
    pub y_coord_detailed: u8,
}

impl Location {
    /// `(map_bank, map_id)`
    #[must_use]
    pub fn map_key(&self) -> (u8, u8) {
        (self.map_bank, self.map_id)
    }

    /// `(x_coord, y_coord)`
    #[must_use]
    pub fn coords(&self) -> (u8, u8) {
        (self.x_coord, self.y_coord)
    }

    /// Manhattan distance to a tile on the same map
    #[must_use]
    pub fn manhattan_to(&self, x: u8, y: u8) -> u32 {
        u32::from(self.x_coord.abs_diff(x)) + u32::from(self.y_coord.abs_diff(y))
    }
}

/// Player identity, money and badges
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
    /// Trainer id
    pub player_id: u16,
    /// Player name
    pub player_name: String,
    /// Rival name
    pub rival_name: String,
    /// Decoded from 3-byte BCD
    pub money: u32,
    /// Raw Johto badge bits
    pub johto_badges_byte: u8,
    /// Johto badges held
    pub johto_badges_count: u8,
    /// Raw Kanto badge bits
    pub kanto_badges_byte: u8,
    /// Kanto badges held
    pub kanto_badges_count: u8,
    /// Player sprite
    pub sprite: u8,
    /// Outfit
    pub clothes: u8,
    /// Cycling
    pub on_bike: bool,
    /// Repel steps left
    pub repel_steps: u8,
}

/// Nibble-packed individual values
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ivs {
    /// Attack IV
    pub attack: u8,
    /// Defense IV
    pub defense: u8,
    /// Speed IV
    pub speed: u8,
    /// Special IV
    pub special: u8,
}

/// One decoded party record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyMember {
    /// Species
    pub species_id: u8,
    /// Level
    pub level: u8,
    /// Current HP
    pub current_hp: u16,
    /// Max HP
    pub max_hp: u16,
    /// Attack
    pub attack: u16,
    /// Defense
    pub defense: u16,
    /// Speed
    pub speed: u16,
    /// Special attack
    pub sp_attack: u16,
    /// Special defense
    pub sp_defense: u16,
    /// Total experience
    pub experience: u32,
    /// Individual values
    pub ivs: Ivs,
    /// Move ids
    pub moves: [u8; 4],
    /// PP per move
    pub pp_moves: [u8; 4],
    /// Happiness
    pub happiness: u8,
    /// Pokérus status
    pub pokerus: u8,
    /// Status condition
    pub status: u16,
    /// Held item
    pub item_held: u8,
    /// Nickname
    #[serde(default)]
    pub nickname: String,
}

impl PartyMember {
    /// `current_hp / max_hp`, or `None` when max HP is 0
    #[must_use]
    pub fn hp_ratio(&self) -> Option<f64> {
        (self.max_hp > 0).then(|| f64::from(self.current_hp) / f64::from(self.max_hp))
    }

    /// HP at zero
    #[must_use]
    pub fn is_fainted(&self) -> bool {
        self.current_hp == 0
    }
}

/// Party members and derived totals
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyInfo {
    /// Always equal to `pokemon.len()`
    pub count: u8,
    /// Members in slot order
    pub pokemon: Vec<PartyMember>,
    /// Sum of member levels
    pub party_level_sum: u32,
    /// Sum of member current HP
    pub party_hp_sum: u32,
}

impl PartyInfo {
    /// Build party info, deriving the count and sums from the members
    #[must_use]
    pub fn from_members(mut pokemon: Vec<PartyMember>) -> Self {
        pokemon.truncate(MAX_PARTY_SIZE);
        let party_level_sum = pokemon.iter().map(|p| u32::from(p.level)).sum();
        let party_hp_sum = pokemon.iter().map(|p| u32::from(p.current_hp)).sum();
        Self {
            // at most MAX_PARTY_SIZE
            count: pokemon.len() as u8,
            pokemon,
            party_level_sum,
            party_hp_sum,
        }
    }

    /// Whether any party member is of `species_id`
    #[must_use]
    pub fn has_species(&self, species_id: u8) -> bool {
        self.pokemon.iter().any(|p| p.species_id == species_id)
    }

    /// Highest level in the party
    #[must_use]
    pub fn max_level(&self) -> u8 {
        self.pokemon.iter().map(|p| p.level).max().unwrap_or(0)
    }
}

/// Present only while a battle is running
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleInfo {
    /// Battle type
    pub battle_type: u8,
    /// Enemy species
    pub enemy_species: u8,
    /// Enemy level
    pub enemy_level: u8,
    /// Enemy current HP
    pub enemy_hp: u16,
    /// Enemy max HP
    pub enemy_max_hp: u16,
    /// Enemy status
    pub enemy_status: u8,
    /// HP of the player's active battler
    pub player_hp: u16,
}

/// One bag slot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSlot {
    /// Item id
    pub id: u8,
    /// Quantity
    pub amount: u8,
}

/// Bag pocket selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pocket {
    /// Item pocket
    Items,
    /// Key item pocket
    KeyItems,
    /// Ball pocket
    Balls,
}

/// Bag contents
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    /// Slots used in the item pocket
    pub item_count: u8,
    /// Item pocket
    pub items: Vec<ItemSlot>,
    /// Key item pocket
    #[serde(default)]
    pub key_items: Vec<u8>,
    /// Ball pocket
    #[serde(default)]
    pub balls: Vec<ItemSlot>,
}

impl Inventory {
    /// Whether `pocket` holds `item_id`
    #[must_use]
    pub fn contains(&self, pocket: Pocket, item_id: u8) -> bool {
        match pocket {
            Pocket::Items => self.items.iter().any(|s| s.id == item_id),
            Pocket::KeyItems => self.key_items.contains(&item_id),
            Pocket::Balls => self.balls.iter().any(|s| s.id == item_id),
        }
    }
}

/// Pokédex totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pokedex {
    /// Species caught
    pub owned_count: u32,
    /// Species seen
    pub seen_count: u32,
}

/// The three Johto starters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Starter {
    /// Fire starter
    Cyndaquil,
    /// Water starter
    Totodile,
    /// Grass starter
    Chikorita,
}

impl Starter {
    /// National dex number
    #[must_use]
    pub fn species_id(self) -> u8 {
        match self {
            Starter::Cyndaquil => 155,
            Starter::Totodile => 158,
            Starter::Chikorita => 152,
        }
    }

    /// Starter with the given species id
    #[must_use]
    pub fn from_species(species_id: u8) -> Option<Self> {
        [Starter::Cyndaquil, Starter::Totodile, Starter::Chikorita]
            .into_iter()
            .find(|s| s.species_id() == species_id)
    }
}

/// Starter flag and species
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StarterInfo {
    /// Whether a starter was given
    pub received: bool,
    /// Which one, from the party
    pub which: Option<Starter>,
}

/// Named event flag values
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventStatuses(BTreeMap<String, bool>);

impl EventStatuses {
    /// Wrap a name → value map
    #[must_use]
    pub fn new(values: BTreeMap<String, bool>) -> Self {
        Self(values)
    }

    /// Every registry flag, all cleared
    #[must_use]
    pub fn all_cleared() -> Self {
        Self(flags::EVENT_FLAGS.iter().map(|f| (f.name.to_string(), false)).collect())
    }

    /// Value of `name`; unknown names read as cleared
    #[must_use]
    pub fn is_set(&self, name: &str) -> bool {
        self.0.get(name).copied().unwrap_or(false)
    }

    /// Value of `name` if reported
    #[must_use]
    pub fn get(&self, name: &str) -> Option<bool> {
        self.0.get(name).copied()
    }

    /// Set a value
    pub fn set(&mut self, name: impl Into<String>, value: bool) {
        self.0.insert(name.into(), value);
    }

    /// Number of set flags
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.0.values().filter(|&&v| v).count()
    }

    /// Names of set flags
    pub fn completed(&self) -> impl Iterator<Item = &str> {
        self.0.iter().filter(|(_, v)| **v).map(|(k, _)| k.as_str())
    }

    /// Iterate over all reported flags
    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.0.iter().map(|(k, &v)| (k.as_str(), v))
    }

    /// Number of reported flags
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no flag is reported
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Values of the registry flags in one category
    #[must_use]
    pub fn category(&self, category: FlagCategory) -> BTreeMap<&'static str, bool> {
        flags::in_category(category).map(|f| (f.name, self.is_set(f.name))).collect()
    }
}

/// Everything the environment, skills and planner know about the game
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameSnapshot {
    /// A battle is running
    pub is_in_battle: bool,
    /// A menu is open
    pub is_in_menu: bool,
    /// Map and tile
    pub location: Location,
    /// Player identity, money and badges
    pub player_info: PlayerInfo,
    /// Party
    pub party_info: PartyInfo,
    /// `Some` exactly when `is_in_battle`
    pub battle_info: Option<BattleInfo>,
    /// Named event flags
    pub event_statuses: EventStatuses,
    /// Connections of the current map
    pub map_connections: Vec<MapConnection>,
    /// Bag
    pub inventory: Inventory,
    /// Pokédex totals
    pub pokedex: Pokedex,
    /// Starter status
    pub starter_info: StarterInfo,
}

impl GameSnapshot {
    /// Policy state vector: position and map ids in [-1, 1], badges in [0, 1]
    #[must_use]
    pub fn state_vector(&self) -> [f32; 5] {
        let norm = |v: u8| f32::from(v) / 128.0 - 1.0;
        [
            norm(self.location.x_coord),
            norm(self.location.y_coord),
            norm(self.location.map_bank),
            norm(self.location.map_id),
            f32::from(self.player_info.johto_badges_count) / 8.0,
        ]
    }

    /// Number of set event flags
    #[must_use]
    pub fn events_completed(&self) -> usize {
        self.event_statuses.completed_count()
    }
}

impl State for GameSnapshot {
    fn features(&self) -> Vec<f64> {
        self.state_vector().iter().map(|&v| f64::from(v)).collect()
    }
}
