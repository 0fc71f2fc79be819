//! Builds a [`GameSnapshot`] from live memory
//!
//! Nothing is cached between calls; every snapshot is read fresh.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::warn;

use goldrl_core::MemorySource;

use crate::address::{AddressMap, GOLD};
use crate::decode::{count_set_bits, read_bcd, read_string, read_u24_be, read_word_be, read_word_le, split_nibbles};
use crate::flags::{self, FlagCodec, FlagDetails};
use crate::rom::{MapConnection, RomMapper};
use crate::snapshot::{
    BattleInfo, EventStatuses, GameSnapshot, Inventory, Ivs, ItemSlot, Location, PartyInfo,
    PartyMember, PlayerInfo, Pokedex, Starter, StarterInfo, MAX_PARTY_SIZE,
};

/// Reads structured state through an [`AddressMap`]
#[derive(Debug, Clone)]
pub struct StateExtractor {
    map: AddressMap,
    codec: FlagCodec,
    rom: Option<RomMapper>,
}

impl Default for StateExtractor {
    fn default() -> Self {
        Self::new(None)
    }
}

impl StateExtractor {
    /// Extractor for Gold; without a ROM every map reports no connections
    #[must_use]
    pub fn new(rom: Option<RomMapper>) -> Self {
        Self::with_map(GOLD, rom)
    }

    /// Extractor over a custom address map
    #[must_use]
    pub fn with_map(map: AddressMap, rom: Option<RomMapper>) -> Self {
        Self {
            codec: FlagCodec::new(u32::from(map.flags_base)),
            map,
            rom,
        }
    }

    /// Extractor loading the ROM at `path`; a missing or unreadable ROM is logged and ignored
    #[must_use]
    pub fn with_rom_path(path: Option<&Path>) -> Self {
        let rom = path.and_then(|p| match RomMapper::open(p) {
            Ok(rom) => Some(rom),
            Err(e) => {
                warn!("ROM {} unavailable, map connections disabled: {}", p.display(), e);
                None
            }
        });
        Self::new(rom)
    }

    /// Address map in use
    #[must_use]
    pub fn address_map(&self) -> &AddressMap {
        &self.map
    }

    /// Flag codec in use
    #[must_use]
    pub fn codec(&self) -> &FlagCodec {
        &self.codec
    }

    /// Whether a ROM image is attached
    #[must_use]
    pub fn has_rom(&self) -> bool {
        self.rom.is_some()
    }

    /// Full snapshot of the current game state
    pub fn get_state_dict<M: MemorySource + ?Sized>(&self, mem: &M) -> GameSnapshot {
        let location = self.location(mem);
        let party_info = self.party_info(mem);
        let battle_info = self.battle_info(mem);
        let event_statuses = self.event_statuses(mem);
        let starter_info = Self::derive_starter(&event_statuses, &party_info);

        GameSnapshot {
            is_in_battle: battle_info.is_some(),
            is_in_menu: self.is_in_menu(mem),
            map_connections: self.map_connections(location.map_bank, location.map_id),
            location,
            player_info: self.player_info(mem),
            party_info,
            battle_info,
            event_statuses,
            inventory: self.inventory(mem),
            pokedex: self.pokedex(mem),
            starter_info,
        }
    }

    /// Battle type byte is non-zero
    pub fn is_in_battle<M: MemorySource + ?Sized>(&self, mem: &M) -> bool {
        mem.read_byte(self.map.battle.battle_type.address) != 0
    }

    /// Game mode byte equals the menu value
    pub fn is_in_menu<M: MemorySource + ?Sized>(&self, mem: &M) -> bool {
        mem.read_byte(self.map.mode.game_mode.address) == self.map.mode.menu_value
    }

    /// Current map and tile
    pub fn location<M: MemorySource + ?Sized>(&self, mem: &M) -> Location {
        let p = &self.map.player;
        Location {
            map_bank: mem.read_byte(p.map_bank.address),
            map_id: mem.read_byte(p.map_id.address),
            x_coord: mem.read_byte(p.x_coord.address),
            y_coord: mem.read_byte(p.y_coord.address),
            x_coord_detailed: mem.read_byte(p.x_coord_detailed.address),
            y_coord_detailed: mem.read_byte(p.y_coord_detailed.address),
        }
    }

    /// Player, money and badges
    pub fn player_info<M: MemorySource + ?Sized>(&self, mem: &M) -> PlayerInfo {
        let p = &self.map.player;
        let johto = mem.read_byte(p.johto_badges.address);
        let kanto = mem.read_byte(p.kanto_badges.address);
        PlayerInfo {
            player_id: read_word_le(mem, p.player_id.address),
            player_name: read_string(mem, p.player_name.address, p.player_name.width),
            rival_name: read_string(mem, p.rival_name.address, p.rival_name.width),
            money: read_bcd(mem, p.money.address, p.money.width),
            johto_badges_byte: johto,
            // popcount of a byte is at most 8
            johto_badges_count: johto.count_ones() as u8,
            kanto_badges_byte: kanto,
            kanto_badges_count: kanto.count_ones() as u8,
            sprite: mem.read_byte(p.sprite.address),
            clothes: mem.read_byte(p.clothes.address),
            on_bike: mem.read_byte(p.on_bike.address) != 0,
            repel_steps: mem.read_byte(p.repel_steps.address),
        }
    }

    /// Party members in slot order; the count byte is clamped to six
    pub fn party_info<M: MemorySource + ?Sized>(&self, mem: &M) -> PartyInfo {
        let party = &self.map.party;
        let count = usize::from(mem.read_byte(party.count.address)).min(MAX_PARTY_SIZE);
        let members = (0..count)
            .filter_map(|i| u16::try_from(i).ok())
            .map(|i| self.party_member(mem, i))
            .collect();
        PartyInfo::from_members(members)
    }

    fn party_member<M: MemorySource + ?Sized>(&self, mem: &M, slot: u16) -> PartyMember {
        let party = &self.map.party;
        let r = &self.map.record;
        let base = party.data_start.nth(slot, party.record_stride);
        let at = |offset: u16| base.wrapping_add(offset);
        let four = |offset: u16| {
            let mut out = [0u8; 4];
            for (j, byte) in (0u16..).zip(out.iter_mut()) {
                *byte = mem.read_byte(at(offset).wrapping_add(j));
            }
            out
        };

        let (attack_iv, defense_iv) = split_nibbles(mem.read_byte(at(r.attack_defense_iv)));
        let (speed_iv, special_iv) = split_nibbles(mem.read_byte(at(r.speed_special_iv)));

        PartyMember {
            species_id: mem.read_byte(at(r.species_id)),
            level: mem.read_byte(at(r.level)),
            current_hp: read_word_be(mem, at(r.hp)),
            max_hp: read_word_be(mem, at(r.max_hp)),
            attack: read_word_be(mem, at(r.attack)),
            defense: read_word_be(mem, at(r.defense)),
            speed: read_word_be(mem, at(r.speed)),
            sp_attack: read_word_be(mem, at(r.sp_attack)),
            sp_defense: read_word_be(mem, at(r.sp_defense)),
            experience: read_u24_be(mem, at(r.experience)),
            ivs: Ivs { attack: attack_iv, defense: defense_iv, speed: speed_iv, special: special_iv },
            moves: four(r.moves),
            pp_moves: four(r.pp_moves),
            happiness: mem.read_byte(at(r.happiness)),
            pokerus: mem.read_byte(at(r.pokerus)),
            status: read_word_be(mem, at(r.status)),
            item_held: mem.read_byte(at(r.item_held)),
            nickname: read_string(mem, party.nicknames.nth(slot, party.name_stride), party.nicknames.width),
        }
    }

    /// `None` outside of battle
    pub fn battle_info<M: MemorySource + ?Sized>(&self, mem: &M) -> Option<BattleInfo> {
        let b = &self.map.battle;
        let battle_type = mem.read_byte(b.battle_type.address);
        if battle_type == 0 {
            return None;
        }
        Some(BattleInfo {
            battle_type,
            enemy_species: mem.read_byte(b.enemy_species.address),
            enemy_level: mem.read_byte(b.enemy_level.address),
            enemy_hp: read_word_be(mem, b.enemy_hp.address),
            enemy_max_hp: read_word_be(mem, b.enemy_max_hp.address),
            enemy_status: mem.read_byte(b.enemy_status.address),
            player_hp: read_word_be(mem, b.player_hp.address),
        })
    }

    /// Value of every registry flag
    pub fn event_statuses<M: MemorySource + ?Sized>(&self, mem: &M) -> EventStatuses {
        let values: BTreeMap<String, bool> = flags::EVENT_FLAGS
            .iter()
            .map(|f| (f.name.to_string(), self.codec.check_flag(mem, f.id)))
            .collect();
        EventStatuses::new(values)
    }

    /// All three bag pockets
    pub fn inventory<M: MemorySource + ?Sized>(&self, mem: &M) -> Inventory {
        let inv = &self.map.inventory;
        let pairs = |count_addr: u16, start: u16, max: u8| -> (u8, Vec<ItemSlot>) {
            let count = mem.read_byte(count_addr);
            let slots = (0..u16::from(count.min(max)))
                .map(|i| {
                    let addr = start.wrapping_add(i * 2);
                    ItemSlot { id: mem.read_byte(addr), amount: mem.read_byte(addr.wrapping_add(1)) }
                })
                .collect();
            (count, slots)
        };

        let (item_count, items) = pairs(inv.item_count.address, inv.items_start.address, inv.max_items);
        let (_, balls) = pairs(inv.ball_count.address, inv.balls_start.address, inv.max_balls);
        let key_count = mem.read_byte(inv.key_item_count.address).min(inv.max_key_items);
        let key_items = (0..u16::from(key_count))
            .map(|i| mem.read_byte(inv.key_items_start.at(i)))
            .collect();

        Inventory { item_count, items, key_items, balls }
    }

    /// Owned and seen counts
    pub fn pokedex<M: MemorySource + ?Sized>(&self, mem: &M) -> Pokedex {
        let dex = &self.map.pokedex;
        Pokedex {
            owned_count: count_set_bits(mem, dex.owned.address, dex.owned.width),
            seen_count: count_set_bits(mem, dex.seen.address, dex.seen.width),
        }
    }

    /// Starter summary straight from memory
    pub fn starter_info<M: MemorySource + ?Sized>(&self, mem: &M) -> StarterInfo {
        Self::derive_starter(&self.event_statuses(mem), &self.party_info(mem))
    }

    /// Starter flags take precedence; otherwise the first party member's species decides
    fn derive_starter(events: &EventStatuses, party: &PartyInfo) -> StarterInfo {
        let which = if events.is_set("starter_cyndaquil") {
            Some(Starter::Cyndaquil)
        } else if events.is_set("starter_totodile") {
            Some(Starter::Totodile)
        } else if events.is_set("starter_chikorita") {
            Some(Starter::Chikorita)
        } else {
            party.pokemon.first().and_then(|p| Starter::from_species(p.species_id))
        };
        StarterInfo {
            received: events.is_set("starter_received")
                || events.is_set("got_starter_pokeball")
                || party.count > 0,
            which,
        }
    }

    /// Connections of any map, empty without a ROM
    #[must_use]
    pub fn map_connections(&self, bank: u8, map: u8) -> Vec<MapConnection> {
        self.rom.as_ref().map(|rom| rom.map_connections(bank, map)).unwrap_or_default()
    }

    /// Diagnostic view of a flag
    pub fn get_flag_details<M: MemorySource + ?Sized>(&self, mem: &M, flag_id: u32) -> FlagDetails {
        self.codec.get_flag_details(mem, flag_id)
    }

    /// Raw bytes of `start..=end`
    pub fn debug_memory_range<M: MemorySource + ?Sized>(&self, mem: &M, start: u16, end: u16) -> BTreeMap<u16, u8> {
        (start..=end).map(|addr| (addr, mem.read_byte(addr))).collect()
    }
}
