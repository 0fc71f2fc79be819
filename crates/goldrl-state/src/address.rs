//! Pokémon Gold WRAM layout
//!
//! Every field the extractor reads is described once here as an absolute
//! address, a byte width and an encoding. The tables are `const` data and
//! never change at runtime.
//!
//! References:
//! - https://datacrystal.romhacking.net/wiki/Pok%C3%A9mon_Gold_and_Silver:RAM_map
//! - https://github.com/pret/pokegold (pokegold disassembly)

use serde::Serialize;

/// How the bytes of a field are interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    /// One or more raw bytes
    RawByte,
    /// Two bytes, high byte first
    BigEndianWord,
    /// Two bytes, low byte first
    LittleEndianWord,
    /// Packed binary-coded decimal, most significant byte first
    Bcd,
    /// Game text, terminated by 0x50 or the field width
    FixedLengthString,
    /// Fixed-stride record made of sub-fields
    PackedStruct,
}

/// A named, typed location in memory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldDescriptor {
    /// Field name
    pub name: &'static str,
    /// Absolute address of the first byte
    pub address: u16,
    /// Number of bytes covered
    pub width: u16,
    /// Interpretation of the bytes
    pub encoding: Encoding,
}

impl FieldDescriptor {
    /// Single raw byte
    #[must_use]
    pub const fn byte(name: &'static str, address: u16) -> Self {
        Self { name, address, width: 1, encoding: Encoding::RawByte }
    }

    /// Run of raw bytes (bit sets, lists)
    #[must_use]
    pub const fn bytes(name: &'static str, address: u16, width: u16) -> Self {
        Self { name, address, width, encoding: Encoding::RawByte }
    }

    /// Big-endian 16-bit word
    #[must_use]
    pub const fn word_be(name: &'static str, address: u16) -> Self {
        Self { name, address, width: 2, encoding: Encoding::BigEndianWord }
    }

    /// Little-endian 16-bit word
    #[must_use]
    pub const fn word_le(name: &'static str, address: u16) -> Self {
        Self { name, address, width: 2, encoding: Encoding::LittleEndianWord }
    }

    /// Packed BCD number
    #[must_use]
    pub const fn bcd(name: &'static str, address: u16, width: u16) -> Self {
        Self { name, address, width, encoding: Encoding::Bcd }
    }

    /// Game text of at most `width` characters
    #[must_use]
    pub const fn string(name: &'static str, address: u16, width: u16) -> Self {
        Self { name, address, width, encoding: Encoding::FixedLengthString }
    }

    /// First record of a fixed-stride table
    #[must_use]
    pub const fn record(name: &'static str, address: u16, stride: u16) -> Self {
        Self { name, address, width: stride, encoding: Encoding::PackedStruct }
    }

    /// Address of the `index`-th element when this field starts a table of `stride`-byte entries
    #[must_use]
    pub const fn nth(&self, index: u16, stride: u16) -> u16 {
        self.address.wrapping_add(index.wrapping_mul(stride))
    }

    /// Address `offset` bytes into this field
    #[must_use]
    pub const fn at(&self, offset: u16) -> u16 {
        self.address.wrapping_add(offset)
    }
}

/// Player and overworld position
#[derive(Debug, Clone, Copy)]
pub struct PlayerAddresses {
    /// Current map bank
    pub map_bank: FieldDescriptor,
    /// Current map id
    pub map_id: FieldDescriptor,
    /// Tile column
    pub x_coord: FieldDescriptor,
    /// Tile row
    pub y_coord: FieldDescriptor,
    /// Sub-tile column
    pub x_coord_detailed: FieldDescriptor,
    /// Sub-tile row
    pub y_coord_detailed: FieldDescriptor,
    /// Trainer id, little-endian
    pub player_id: FieldDescriptor,
    /// Player name
    pub player_name: FieldDescriptor,
    /// Rival name
    pub rival_name: FieldDescriptor,
    /// Money, 3-byte BCD
    pub money: FieldDescriptor,
    /// Johto badge bits
    pub johto_badges: FieldDescriptor,
    /// Kanto badge bits
    pub kanto_badges: FieldDescriptor,
    /// Player sprite
    pub sprite: FieldDescriptor,
    /// Outfit
    pub clothes: FieldDescriptor,
    /// Non-zero while cycling
    pub on_bike: FieldDescriptor,
    /// Repel steps left
    pub repel_steps: FieldDescriptor,
}

/// Party table
#[derive(Debug, Clone, Copy)]
pub struct PartyAddresses {
    /// Pokémon in the party
    pub count: FieldDescriptor,
    /// Species ids, 0xFF terminated
    pub species_list: FieldDescriptor,
    /// First party record
    pub data_start: FieldDescriptor,
    /// Original trainer names
    pub ot_names: FieldDescriptor,
    /// Party nicknames
    pub nicknames: FieldDescriptor,
    /// Bytes between consecutive party records
    pub record_stride: u16,
    /// Bytes between consecutive OT names and nicknames
    pub name_stride: u16,
    /// Party capacity
    pub max_size: u8,
}

/// Offsets inside one 48-byte party record
#[derive(Debug, Clone, Copy)]
pub struct PartyRecordLayout {
    /// Species
    pub species_id: u16,
    /// Held item
    pub item_held: u16,
    /// Four move ids
    pub moves: u16,
    /// Original trainer id
    pub id_number: u16,
    /// 3 bytes, big-endian
    pub experience: u16,
    /// Attack IV in the high nibble, defense in the low nibble
    pub attack_defense_iv: u16,
    /// Speed IV in the high nibble, special in the low nibble
    pub speed_special_iv: u16,
    /// PP of each move
    pub pp_moves: u16,
    /// Happiness
    pub happiness: u16,
    /// Pokérus status
    pub pokerus: u16,
    /// Catch time and place
    pub caught_data: u16,
    /// Level
    pub level: u16,
    /// Status condition
    pub status: u16,
    /// Current HP, big-endian
    pub hp: u16,
    /// Max HP, big-endian
    pub max_hp: u16,
    /// Attack
    pub attack: u16,
    /// Defense
    pub defense: u16,
    /// Speed
    pub speed: u16,
    /// Special defense
    pub sp_defense: u16,
    /// Special attack
    pub sp_attack: u16,
}

/// Battle state; zero `battle_type` means the overworld
#[derive(Debug, Clone, Copy)]
pub struct BattleAddresses {
    /// Battle type, 0 outside battle
    pub battle_type: FieldDescriptor,
    /// Enemy species
    pub enemy_species: FieldDescriptor,
    /// Enemy level
    pub enemy_level: FieldDescriptor,
    /// Enemy status
    pub enemy_status: FieldDescriptor,
    /// Enemy current HP
    pub enemy_hp: FieldDescriptor,
    /// Enemy max HP
    pub enemy_max_hp: FieldDescriptor,
    /// Current HP of the player's active battler
    pub player_hp: FieldDescriptor,
}

/// Bag pockets
#[derive(Debug, Clone, Copy)]
pub struct InventoryAddresses {
    /// Item pocket size
    pub item_count: FieldDescriptor,
    /// (id, amount) pairs
    pub items_start: FieldDescriptor,
    /// Item pocket capacity
    pub max_items: u8,
    /// Key item pocket size
    pub key_item_count: FieldDescriptor,
    /// One id per key item
    pub key_items_start: FieldDescriptor,
    /// Key item pocket capacity
    pub max_key_items: u8,
    /// Ball pocket size
    pub ball_count: FieldDescriptor,
    /// (id, amount) pairs
    pub balls_start: FieldDescriptor,
    /// Ball pocket capacity
    pub max_balls: u8,
}

/// Pokédex bit sets, one bit per species
#[derive(Debug, Clone, Copy)]
pub struct PokedexAddresses {
    /// Species caught
    pub owned: FieldDescriptor,
    /// Species seen
    pub seen: FieldDescriptor,
}

/// Overworld/menu mode byte
#[derive(Debug, Clone, Copy)]
pub struct GameModeAddresses {
    /// Current game mode
    pub game_mode: FieldDescriptor,
    /// `game_mode` value while a menu is open
    pub menu_value: u8,
}

/// Complete address map for one game revision
#[derive(Debug, Clone, Copy)]
pub struct AddressMap {
    /// Player fields
    pub player: PlayerAddresses,
    /// Party table
    pub party: PartyAddresses,
    /// Party record offsets
    pub record: PartyRecordLayout,
    /// Battle fields
    pub battle: BattleAddresses,
    /// Bag pockets
    pub inventory: InventoryAddresses,
    /// Pokédex bits
    pub pokedex: PokedexAddresses,
    /// Menu detection
    pub mode: GameModeAddresses,
    /// First byte of the event flag array
    pub flags_base: u16,
}

/// Pokémon Gold (international)
pub const GOLD: AddressMap = AddressMap {
    player: PlayerAddresses {
        map_bank: FieldDescriptor::byte("map_bank", 0xDA00),
        map_id: FieldDescriptor::byte("map_id", 0xDA01),
        x_coord: FieldDescriptor::byte("x_coord", 0xDA02),
        y_coord: FieldDescriptor::byte("y_coord", 0xDA03),
        x_coord_detailed: FieldDescriptor::byte("x_coord_detailed", 0xD20D),
        y_coord_detailed: FieldDescriptor::byte("y_coord_detailed", 0xD20E),
        player_id: FieldDescriptor::word_le("player_id", 0xD1A1),
        player_name: FieldDescriptor::string("player_name", 0xD1A3, 10),
        rival_name: FieldDescriptor::string("rival_name", 0xD1BC, 10),
        money: FieldDescriptor::bcd("money", 0xD573, 3),
        johto_badges: FieldDescriptor::byte("johto_badges", 0xD57C),
        kanto_badges: FieldDescriptor::byte("kanto_badges", 0xD57D),
        sprite: FieldDescriptor::byte("sprite", 0xD1FF),
        clothes: FieldDescriptor::byte("clothes", 0xD203),
        on_bike: FieldDescriptor::byte("on_bike", 0xD682),
        repel_steps: FieldDescriptor::byte("repel_steps", 0xD9EB),
    },
    party: PartyAddresses {
        count: FieldDescriptor::byte("party_count", 0xDA22),
        species_list: FieldDescriptor::bytes("party_species", 0xDA23, 7),
        data_start: FieldDescriptor::record("party_data", 0xDA2A, 48),
        ot_names: FieldDescriptor::string("party_ot_names", 0xDB4A, 11),
        nicknames: FieldDescriptor::string("party_nicknames", 0xDB8C, 11),
        record_stride: 48,
        name_stride: 11,
        max_size: 6,
    },
    record: PartyRecordLayout {
        species_id: 0x00,
        item_held: 0x01,
        moves: 0x02,
        id_number: 0x06,
        experience: 0x08,
        attack_defense_iv: 0x15,
        speed_special_iv: 0x16,
        pp_moves: 0x17,
        happiness: 0x1B,
        pokerus: 0x1C,
        caught_data: 0x1D,
        level: 0x1F,
        status: 0x20,
        hp: 0x22,
        max_hp: 0x24,
        attack: 0x26,
        defense: 0x28,
        speed: 0x2A,
        sp_defense: 0x2C,
        sp_attack: 0x2E,
    },
    battle: BattleAddresses {
        battle_type: FieldDescriptor::byte("battle_type", 0xD116),
        enemy_species: FieldDescriptor::byte("enemy_species", 0xD0ED),
        enemy_level: FieldDescriptor::byte("enemy_level", 0xD0FC),
        enemy_status: FieldDescriptor::byte("enemy_status", 0xD0FD),
        enemy_hp: FieldDescriptor::word_be("enemy_hp", 0xD0FF),
        enemy_max_hp: FieldDescriptor::word_be("enemy_max_hp", 0xD101),
        player_hp: FieldDescriptor::word_be("battle_player_hp", 0xCB1C),
    },
    inventory: InventoryAddresses {
        item_count: FieldDescriptor::byte("item_count", 0xD5B7),
        items_start: FieldDescriptor::bytes("items", 0xD5B8, 40),
        max_items: 20,
        key_item_count: FieldDescriptor::byte("key_item_count", 0xD5E1),
        key_items_start: FieldDescriptor::bytes("key_items", 0xD5E2, 25),
        max_key_items: 25,
        ball_count: FieldDescriptor::byte("ball_count", 0xD5FC),
        balls_start: FieldDescriptor::bytes("balls", 0xD5FD, 24),
        max_balls: 12,
    },
    pokedex: PokedexAddresses {
        owned: FieldDescriptor::bytes("pokedex_owned", 0xDBE4, 32),
        seen: FieldDescriptor::bytes("pokedex_seen", 0xDC04, 32),
    },
    mode: GameModeAddresses {
        game_mode: FieldDescriptor::byte("game_mode", 0xD11E),
        menu_value: 2,
    },
    flags_base: 0xD7B7,
};

impl Default for AddressMap {
    fn default() -> Self {
        GOLD
    }
}

impl AddressMap {
    /// Every top-level field descriptor, grouped by table
    #[must_use]
    pub fn fields(&self) -> Vec<FieldDescriptor> {
        let p = &self.player;
        let b = &self.battle;
        let i = &self.inventory;
        vec![
            p.map_bank,
            p.map_id,
            p.x_coord,
            p.y_coord,
            p.x_coord_detailed,
            p.y_coord_detailed,
            p.player_id,
            p.player_name,
            p.rival_name,
            p.money,
            p.johto_badges,
            p.kanto_badges,
            p.sprite,
            p.clothes,
            p.on_bike,
            p.repel_steps,
            self.party.count,
            self.party.species_list,
            self.party.data_start,
            self.party.ot_names,
            self.party.nicknames,
            b.battle_type,
            b.enemy_species,
            b.enemy_level,
            b.enemy_status,
            b.enemy_hp,
            b.enemy_max_hp,
            b.player_hp,
            i.item_count,
            i.items_start,
            i.key_item_count,
            i.key_items_start,
            i.ball_count,
            i.balls_start,
            self.pokedex.owned,
            self.pokedex.seen,
            self.mode.game_mode,
        ]
    }

    /// Look up a top-level field by name
    #[must_use]
    pub fn field(&self, name: &str) -> Option<FieldDescriptor> {
        self.fields().into_iter().find(|f| f.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_names_are_unique() {
        let fields = GOLD.fields();
        let mut names: Vec<_> = fields.iter().map(|f| f.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), fields.len());
    }

    #[test]
    fn test_party_record_fits_stride() {
        let r = GOLD.record;
        // sp_attack is the last word of the record
        assert!(r.sp_attack + 2 <= GOLD.party.record_stride);
        assert_eq!(GOLD.party.data_start.nth(1, GOLD.party.record_stride), 0xDA5A);
    }

    #[test]
    fn test_lookup_by_name() {
        let money = GOLD.field("money").unwrap();
        assert_eq!(money.address, 0xD573);
        assert_eq!(money.encoding, Encoding::Bcd);
        assert!(GOLD.field("no_such_field").is_none());
    }
}
