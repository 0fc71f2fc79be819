//! Memory-to-state decoding for Pokémon Gold
//!
//! Turns the raw Game Boy address space into a [`GameSnapshot`]: party,
//! battle, inventory, pokédex and event flags are decoded through a
//! declarative [`AddressMap`], and map connections are read from the ROM.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod address;
pub mod decode;
pub mod extractor;
pub mod flags;
pub mod memory;
pub mod rom;
pub mod snapshot;

pub use address::{AddressMap, Encoding, FieldDescriptor, GOLD};
pub use decode::FieldValue;
pub use extractor::StateExtractor;
pub use flags::{EventFlag, FlagCategory, FlagCodec, FlagDetails, FlagLocation, EVENT_FLAGS};
pub use memory::MemoryImage;
pub use rom::{Direction, MapConnection, RomError, RomMapper};
pub use snapshot::{
    BattleInfo, EventStatuses, GameSnapshot, Inventory, ItemSlot, Location, PartyInfo,
    PartyMember, PlayerInfo, Pocket, Pokedex, Starter, StarterInfo,
};
