//! Event flag codec and the named flag registry
//!
//! A flag id encodes its bit position in the event flag array as
//! `sequential_index = flag_id / 256`. The sequential index selects byte
//! `sequential_index / 8` and bit `sequential_index % 8` from the base
//! address. Several ids can alias the same physical bit.

use std::collections::{BTreeMap, HashMap};
use std::ops::RangeInclusive;

use lazy_static::lazy_static;
use serde::Serialize;

use goldrl_core::MemorySource;

use self::FlagCategory as C;

/// Default event flag array base for Gold
pub const FLAGS_BASE_ADDRESS: u32 = 0xD7B7;

/// Addresses a flag may legally resolve to
pub const VALID_FLAG_ADDRESSES: RangeInclusive<u32> = 0x8000..=0xFFFF;

/// Physical location of one flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FlagLocation {
    /// The flag id the location was computed from
    pub flag_id: u32,
    /// `flag_id / 256`
    pub sequential_index: u32,
    /// Byte offset from the base address
    pub byte_offset: u32,
    /// Absolute address
    pub address: u32,
    /// Bit within the byte, 0..=7
    pub bit: u8,
}

impl FlagLocation {
    /// Whether the address falls in [`VALID_FLAG_ADDRESSES`]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        VALID_FLAG_ADDRESSES.contains(&self.address)
    }

    /// Mask selecting this flag's bit
    #[must_use]
    pub fn bit_mask(&self) -> u8 {
        1 << self.bit
    }
}

/// Diagnostic view of a flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FlagDetails {
    /// Flag id
    pub flag_id: u32,
    /// Byte holding the flag
    pub address: u32,
    /// Bit within the byte
    pub bit: u8,
    /// `1 << bit`
    pub bit_mask: u8,
    /// Whether `address` lies in `VALID_FLAG_ADDRESSES`
    pub valid: bool,
    /// Flag state, false when invalid
    pub value: bool,
    /// Whole byte at `address`, 0 when the address is invalid
    pub byte_value: u8,
}

impl std::fmt::Display for FlagDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "flag 0x{:04X} -> 0x{:04X} bit {} (mask 0x{:02X}) byte 0x{:02X} = {}{}",
            self.flag_id,
            self.address,
            self.bit,
            self.bit_mask,
            self.byte_value,
            self.value,
            if self.valid { "" } else { " [invalid address]" },
        )
    }
}

/// Maps flag ids to addresses and reads them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagCodec {
    base_address: u32,
}

impl Default for FlagCodec {
    fn default() -> Self {
        Self::new(FLAGS_BASE_ADDRESS)
    }
}

impl FlagCodec {
    /// Codec for a flag array starting at `base_address`
    #[must_use]
    pub const fn new(base_address: u32) -> Self {
        Self { base_address }
    }

    /// Base address of the flag array
    #[must_use]
    pub fn base_address(&self) -> u32 {
        self.base_address
    }

    /// Full location of `flag_id`
    #[must_use]
    pub fn locate(&self, flag_id: u32) -> FlagLocation {
        let sequential_index = flag_id / 256;
        let byte_offset = sequential_index / 8;
        FlagLocation {
            flag_id,
            sequential_index,
            byte_offset,
            address: self.base_address.saturating_add(byte_offset),
            // always < 8
            bit: (sequential_index % 8) as u8,
        }
    }

    /// `(address, bit)` of `flag_id`
    #[must_use]
    pub fn flag_to_address_bit(&self, flag_id: u32) -> (u32, u8) {
        let loc = self.locate(flag_id);
        (loc.address, loc.bit)
    }

    /// Whether the flag is set. Invalid addresses and failed reads are `false`.
    pub fn check_flag<M: MemorySource + ?Sized>(&self, mem: &M, flag_id: u32) -> bool {
        let loc = self.locate(flag_id);
        if !loc.is_valid() {
            return false;
        }
        mem.try_read_byte(loc.address)
            .is_some_and(|byte| byte & loc.bit_mask() != 0)
    }

    /// Check several flags at once
    pub fn check_multiple_flags<M: MemorySource + ?Sized>(
        &self,
        mem: &M,
        flag_ids: &[u32],
    ) -> BTreeMap<u32, bool> {
        flag_ids.iter().map(|&id| (id, self.check_flag(mem, id))).collect()
    }

    /// Location, validity and current value of a flag
    pub fn get_flag_details<M: MemorySource + ?Sized>(&self, mem: &M, flag_id: u32) -> FlagDetails {
        let loc = self.locate(flag_id);
        let valid = loc.is_valid();
        let byte_value = if valid {
            mem.try_read_byte(loc.address).unwrap_or(0)
        } else {
            0
        };
        FlagDetails {
            flag_id,
            address: loc.address,
            bit: loc.bit,
            bit_mask: loc.bit_mask(),
            valid,
            value: valid && byte_value & loc.bit_mask() != 0,
            byte_value,
        }
    }
}

/// Coarse grouping of registry flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagCategory {
    /// Starter choice
    Starter,
    /// Key item received
    KeyItem,
    /// Elite Four and Champion
    EliteFour,
    /// Team Rocket
    TeamRocket,
    /// Legendary encounters
    Legendary,
    /// Rival battles
    Rival,
    /// Main story
    Story,
    /// Day-Care
    DayCare,
    /// Farfetch'd chase
    Farfetchd,
    /// Kurt's balls
    Kurt,
    /// S.S. Aqua
    SsAqua,
    /// Weekday siblings
    SundaySiblings,
    /// TM gifts
    Tm,
    /// HM gifts
    Hm,
    /// Item gifts
    Item,
    /// Power Plant
    PowerPlant,
    /// Mahogany Voltorb
    MahoganyVoltorb,
    /// Location visits
    Location,
    /// Box pile events
    BoxPile,
}

/// A named entry of the flag registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EventFlag {
    /// Registry name
    pub name: &'static str,
    /// Flag id
    pub id: u32,
    /// Grouping
    pub category: FlagCategory,
}

const fn flag(name: &'static str, id: u32, category: FlagCategory) -> EventFlag {
    EventFlag { name, id, category }
}

/// Every event flag the snapshot reports, in registry order
pub static EVENT_FLAGS: &[EventFlag] = &[
    flag("starter_received", 0x1A00, C::Starter),
    flag("starter_cyndaquil", 0x1B00, C::Starter),
    flag("starter_totodile", 0x1C00, C::Starter),
    flag("starter_chikorita", 0x1D00, C::Starter),
    flag("elm_discovery", 0x1E00, C::Starter),
    flag("pokeballs_cherrygrove", 0x1F00, C::KeyItem),
    flag("got_pokedex", 0xBD06, C::KeyItem),
    flag("rival_stolen_pokemon", 0xBE06, C::KeyItem),
    flag("old_rod_route32", 0x1700, C::KeyItem),
    flag("good_rod_olivine", 0x1800, C::KeyItem),
    flag("bike_from_shop", 0x5B00, C::KeyItem),
    flag("itemfinder_ecruteak", 0x5A00, C::KeyItem),
    flag("charcoal_azalea", 0x1000, C::KeyItem),
    flag("hm04_olivine", 0x1300, C::KeyItem),
    flag("elite4_will", 0x0A03, C::EliteFour),
    flag("elite4_koga", 0x0C03, C::EliteFour),
    flag("elite4_bruno", 0x0E03, C::EliteFour),
    flag("elite4_karen", 0x1003, C::EliteFour),
    flag("champion_lance", 0x1203, C::EliteFour),
    flag("rocket_slowpoke_well_defeated", 0xD706, C::TeamRocket),
    flag("rocket_radio_tower_attacked", 0xCE06, C::TeamRocket),
    flag("rocket_radio_tower_cleared", 0xCF06, C::TeamRocket),
    flag("rocket_mahogany_cleared", 0xDC06, C::TeamRocket),
    flag("rocket_goldenrod_cleared", 0xE406, C::TeamRocket),
    flag("rocket_left_goldenrod", 0xCC06, C::TeamRocket),
    flag("rocket_mahogany_controls", 0xDA06, C::TeamRocket),
    flag("battled_red_gyarados", 0xD406, C::Legendary),
    flag("battled_sudowoodo", 0xF806, C::Legendary),
    flag("rival_met_cherrygrove", 0xC206, C::Rival),
    flag("rival_met_goldenrod_underground", 0xC106, C::Rival),
    flag("rival_met_sprout_tower", 0xC406, C::Rival),
    flag("rival_met_burned_tower", 0xC506, C::Rival),
    flag("rival_in_dragons_den", 0xC606, C::Rival),
    flag("got_starter_pokeball", 0xC806, C::Story),
    flag("first_pokemon_center", 0xC706, C::Story),
    flag("guide_gent_map", 0xFF06, C::Story),
    flag("first_mr_pokemon", 0xC906, C::Story),
    flag("teacher_in_school", 0xCB06, C::Story),
    flag("lighthouse_pokemon_ill", 0xD206, C::Story),
    flag("lighthouse_pokemon_cured", 0xD306, C::Story),
    flag("olivine_gym_leader_lighthouse", 0xC306, C::Story),
    flag("lance_mahogany_store", 0xD506, C::Story),
    flag("daycare_man_outside", 0xE506, C::DayCare),
    flag("daycare_pokemon_1", 0xE606, C::DayCare),
    flag("daycare_pokemon_2", 0xE706, C::DayCare),
    flag("daycare_pokemon_3", 0xE806, C::DayCare),
    flag("farfetchd_pos_1", 0xE906, C::Farfetchd),
    flag("farfetchd_pos_2", 0xEA06, C::Farfetchd),
    flag("farfetchd_pos_3", 0xEB06, C::Farfetchd),
    flag("farfetchd_pos_4", 0xEC06, C::Farfetchd),
    flag("farfetchd_pos_5", 0xED06, C::Farfetchd),
    flag("farfetchd_pos_6a", 0xEE06, C::Farfetchd),
    flag("farfetchd_pos_6b", 0xEF06, C::Farfetchd),
    flag("farfetchd_pos_7", 0xF006, C::Farfetchd),
    flag("farfetchd_pos_8", 0xF106, C::Farfetchd),
    flag("farfetchd_pos_end", 0xF206, C::Farfetchd),
    flag("farfetchd_still_forest", 0xF306, C::Farfetchd),
    flag("farfetchd_brought_back", 0xF406, C::Farfetchd),
    flag("kurt_in_house", 0xFD06, C::Kurt),
    flag("tr_azalea", 0xFA06, C::Kurt),
    flag("tr_not_azalea", 0xFB06, C::Kurt),
    flag("didnt_explore_azalea_well", 0xFC06, C::Kurt),
    flag("ss_aqua_first_time", 0x0007, C::SsAqua),
    flag("arthur", 0x6600, C::SundaySiblings),
    flag("arthur_flag2", 0x6700, C::SundaySiblings),
    flag("frieda", 0x6200, C::SundaySiblings),
    flag("frieda_flag2", 0x6300, C::SundaySiblings),
    flag("tuscany", 0x6400, C::SundaySiblings),
    flag("tuscany_flag2", 0x6500, C::SundaySiblings),
    flag("sunny", 0x6800, C::SundaySiblings),
    flag("sunny_flag2", 0x6900, C::SundaySiblings),
    flag("wesley", 0x6A00, C::SundaySiblings),
    flag("wesley_flag2", 0x6B00, C::SundaySiblings),
    flag("santos", 0x6C00, C::SundaySiblings),
    flag("santos_flag2", 0x6D00, C::SundaySiblings),
    flag("monica", 0x6E00, C::SundaySiblings),
    flag("monica_flag2", 0x6F00, C::SundaySiblings),
    flag("tm_headbutt_ilex", 0x5F00, C::Tm),
    flag("tm_sandstorm_route27", 0x7500, C::Tm),
    flag("tm_sweet_scent_route34", 0x7A00, C::Tm),
    flag("tm13_route40", 0x3E00, C::Tm),
    flag("tm05_route32", 0x4E00, C::Tm),
    flag("tm10_lake_rage", 0x5800, C::Tm),
    flag("tm_power_plant", 0xDF00, C::Tm),
    flag("hm11_radio_tower", 0x2500, C::Hm),
    flag("pink_bow_radio_tower", 0x2100, C::Item),
    flag("berry_route30_house", 0x2700, C::Item),
    flag("mystic_water_cherrygrove", 0x4D00, C::Item),
    flag("hp_up_route_guard", 0x5200, C::Item),
    flag("quick_claw_national_park", 0x5700, C::Item),
    flag("tyrogue_mt_mortar", 0x6100, C::Item),
    flag("transformer_power_plant", 0xC900, C::PowerPlant),
    flag("phone_call_power_plant", 0xCA00, C::PowerPlant),
    flag("transformer_brought_back", 0xCD00, C::PowerPlant),
    flag("voltorb_1_mahogany", 0xE006, C::MahoganyVoltorb),
    flag("voltorb_2_mahogany", 0xE106, C::MahoganyVoltorb),
    flag("voltorb_3_mahogany", 0xE206, C::MahoganyVoltorb),
    flag("bianca_beaten", 0x5C00, C::Location),
    flag("helped_slowpoke_azalea", 0x5E00, C::Location),
    flag("tr_azalea_beaten", 0x2B00, C::Location),
    flag("bill_eevee", 0x3100, C::Location),
    flag("doorkey_radio_tower", 0x4A00, C::Location),
    flag("door_underground1", 0x4900, C::Location),
    flag("goldenrod_mart_3rd_floor", 0x4B00, C::Location),
    flag("switch_mahogany_underground", 0xE202, C::Location),
    flag("left_box_pile_underground3", 0x0503, C::BoxPile),
    flag("right_box_pile_underground3", 0x0603, C::BoxPile),
];

lazy_static! {
    static ref FLAG_INDEX: HashMap<&'static str, &'static EventFlag> =
        EVENT_FLAGS.iter().map(|f| (f.name, f)).collect();
}

/// Registry entry by name
#[must_use]
pub fn lookup(name: &str) -> Option<&'static EventFlag> {
    FLAG_INDEX.get(name).copied()
}

/// Flag id by name
#[must_use]
pub fn flag_id(name: &str) -> Option<u32> {
    lookup(name).map(|f| f.id)
}

/// Every registry name, in registry order
pub fn flag_names() -> impl Iterator<Item = &'static str> {
    EVENT_FLAGS.iter().map(|f| f.name)
}

/// Registry entries whose name contains `pattern`, case-insensitively
#[must_use]
pub fn search(pattern: &str) -> Vec<&'static EventFlag> {
    let needle = pattern.to_lowercase();
    EVENT_FLAGS
        .iter()
        .filter(|f| f.name.to_lowercase().contains(&needle))
        .collect()
}

/// Registry entries in `category`
pub fn in_category(category: FlagCategory) -> impl Iterator<Item = &'static EventFlag> {
    EVENT_FLAGS.iter().filter(move |f| f.category == category)
}
