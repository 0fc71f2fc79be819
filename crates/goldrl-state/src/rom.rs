//! Map connection extraction from the cartridge ROM
//!
//! Map headers are reached through the bank pointer table at 0x28000. ROM
//! pointers are banked: a local pointer `p` in bank `b` is at file offset
//! `(b - 1) * 0x4000 + (p - 0x4000)`.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// File offset of the map bank pointer table
pub const MAP_BANKS_POINTER_TABLE: i64 = 0x28000;

const BANK_SIZE: i64 = 0x4000;
const SECONDARY_HEADER_SIZE: i64 = 13;
const CONNECTION_SIZE: i64 = 11;

/// Errors raised while walking ROM tables
#[derive(Error, Debug)]
pub enum RomError {
    /// Reading the ROM file failed
    #[error("failed to read ROM: {0}")]
    Io(#[from] std::io::Error),

    /// A computed offset fell outside the image
    #[error("ROM offset {0:#x} out of range")]
    OutOfRange(i64),
}

/// Edge of the map a connection leaves through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    /// Top edge
    North,
    /// Bottom edge
    South,
    /// Left edge
    West,
    /// Right edge
    East,
}

impl Direction {
    /// Record order in the ROM; bit `3 - index` of the connection flags
    pub const ORDER: [Direction; 4] = [Direction::North, Direction::South, Direction::West, Direction::East];
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Direction::North => "NORTH",
            Direction::South => "SOUTH",
            Direction::West => "WEST",
            Direction::East => "EAST",
        };
        f.write_str(name)
    }
}

/// A walkable edge to a neighbouring map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapConnection {
    /// Edge the connection leaves through
    pub direction: Direction,
    /// Destination map bank
    pub dest_bank: u8,
    /// Destination map id
    pub dest_map: u8,
    /// Approximate tile to walk to on the current map
    pub target_x: u16,
    /// Row of the target tile
    pub target_y: u16,
}

/// Read-only view of a ROM image
#[derive(Debug, Clone)]
pub struct RomMapper {
    data: Vec<u8>,
}

impl RomMapper {
    /// Wrap raw ROM bytes
    #[must_use]
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Load a ROM file
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RomError> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        info!("Loaded ROM {} ({} bytes)", path.display(), data.len());
        Ok(Self { data })
    }

    /// Size of the image in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the image is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn byte(&self, offset: i64) -> Result<u8, RomError> {
        usize::try_from(offset)
            .ok()
            .and_then(|o| self.data.get(o))
            .copied()
            .ok_or(RomError::OutOfRange(offset))
    }

    fn word_le(&self, offset: i64) -> Result<u16, RomError> {
        Ok(u16::from_le_bytes([self.byte(offset)?, self.byte(offset + 1)?]))
    }

    fn banked(bank: i64, local: u16) -> i64 {
        (bank - 1) * BANK_SIZE + (i64::from(local) - BANK_SIZE)
    }

    fn bank_start(&self, bank: u8) -> Result<u16, RomError> {
        if bank == 0 {
            return Ok(0);
        }
        self.word_le(MAP_BANKS_POINTER_TABLE + (i64::from(bank) - 1) * 2)
    }

    /// File offset of the primary header of `(bank, map)`
    pub fn map_header_offset(&self, bank: u8, map: u8) -> Result<i64, RomError> {
        let bank_i = i64::from(bank);
        let header_list = Self::banked(bank_i, self.bank_start(bank)?);
        let header_pointer = header_list + (i64::from(map) - 1) * 2;
        let local = self.word_le(header_pointer)?;
        Ok(Self::banked(bank_i, local))
    }

    /// Connections of `(bank, map)`, or an error if any table lookup fails
    pub fn try_map_connections(&self, bank: u8, map: u8) -> Result<Vec<MapConnection>, RomError> {
        let header = self.map_header_offset(bank, map)?;

        let secondary_bank = self.byte(header)?;
        let secondary_local = self.word_le(header + 4)?;
        let secondary = Self::banked(i64::from(secondary_bank), secondary_local);

        let height = u16::from(self.byte(secondary + 1)?);
        let width = u16::from(self.byte(secondary + 2)?);
        let flags = self.byte(secondary + 12)?;

        let mut connections = Vec::new();
        let mut record = secondary + SECONDARY_HEADER_SIZE;
        for (i, direction) in Direction::ORDER.iter().copied().enumerate() {
            if (flags >> (3 - i)) & 1 == 0 {
                continue;
            }
            let dest_bank = self.byte(record)?;
            let dest_map = self.byte(record + 1)?;
            let conn_y = u16::from(self.byte(record + 8)?);
            let conn_x = u16::from(self.byte(record + 9)?);

            let (target_x, target_y) = match direction {
                Direction::North => (conn_x, 0),
                Direction::South => (conn_x, height + 3),
                Direction::West => (0, conn_y),
                Direction::East => (width + 3, conn_y),
            };
            connections.push(MapConnection { direction, dest_bank, dest_map, target_x, target_y });
            record += CONNECTION_SIZE;
        }
        Ok(connections)
    }

    /// Connections of `(bank, map)`; any parse failure yields an empty list
    #[must_use]
    pub fn map_connections(&self, bank: u8, map: u8) -> Vec<MapConnection> {
        self.try_map_connections(bank, map).unwrap_or_else(|e| {
            debug!("No map connections for bank {} map {}: {}", bank, map, e);
            Vec::new()
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Build a ROM with a single map (bank 1, map 1) whose secondary header
    /// sits at file offset 0x2000 with the given connection flags.
    pub(crate) fn synthetic_rom(flags: u8) -> Vec<u8> {
        let mut rom = vec![0u8; 0x2_8000 + 0x100];
        // bank 1 header list at local 0x4100 -> file 0x0100
        rom[0x2_8000] = 0x00;
        rom[0x2_8001] = 0x41;
        // map 1 header at local 0x4200 -> file 0x0200
        rom[0x0100] = 0x00;
        rom[0x0101] = 0x42;
        // secondary header: bank 1, local 0x6000 -> file 0x2000
        rom[0x0200] = 0x01;
        rom[0x0204] = 0x00;
        rom[0x0205] = 0x60;
        // height 9, width 10, flags
        rom[0x2001] = 9;
        rom[0x2002] = 10;
        rom[0x200C] = flags;

        let mut record = 0x200D;
        for (i, dest) in [(24u8, 5u8), (24, 7), (3, 1), (4, 0)].iter().enumerate() {
            if (flags >> (3 - i)) & 1 == 1 {
                rom[record] = dest.0;
                rom[record + 1] = dest.1;
                rom[record + 8] = 4;
                rom[record + 9] = 6;
                record += 11;
            }
        }
        rom
    }

    #[test]
    fn test_all_four_directions() {
        let mapper = RomMapper::from_bytes(synthetic_rom(0b1111));
        let conns = mapper.map_connections(1, 1);
        assert_eq!(conns.len(), 4);

        assert_eq!(conns[0], MapConnection { direction: Direction::North, dest_bank: 24, dest_map: 5, target_x: 6, target_y: 0 });
        assert_eq!(conns[1], MapConnection { direction: Direction::South, dest_bank: 24, dest_map: 7, target_x: 6, target_y: 12 });
        assert_eq!(conns[2], MapConnection { direction: Direction::West, dest_bank: 3, dest_map: 1, target_x: 0, target_y: 4 });
        assert_eq!(conns[3], MapConnection { direction: Direction::East, dest_bank: 4, dest_map: 0, target_x: 13, target_y: 4 });
    }

    #[test]
    fn test_absent_directions_are_skipped() {
        // only SOUTH and EAST present; records are packed
        let mapper = RomMapper::from_bytes(synthetic_rom(0b0101));
        let conns = mapper.map_connections(1, 1);
        let dirs: Vec<_> = conns.iter().map(|c| c.direction).collect();
        assert_eq!(dirs, vec![Direction::South, Direction::East]);
        assert_eq!((conns[0].dest_bank, conns[0].dest_map), (24, 7));
    }

    #[test]
    fn test_truncated_rom_yields_empty() {
        let mut rom = synthetic_rom(0b1111);
        rom.truncate(0x2005);
        let mapper = RomMapper::from_bytes(rom);
        assert!(mapper.map_connections(1, 1).is_empty());
        assert!(mapper.try_map_connections(1, 1).is_err());
    }

    #[test]
    fn test_map_zero_underflow_is_empty() {
        let mapper = RomMapper::from_bytes(synthetic_rom(0b1111));
        // bank 0 resolves to negative offsets
        assert!(mapper.map_connections(0, 0).is_empty());
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(RomMapper::open("/nonexistent/gold.gbc"), Err(RomError::Io(_))));
    }

    #[test]
    fn test_direction_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&Direction::North).unwrap(), "\"NORTH\"");
        assert_eq!(Direction::West.to_string(), "WEST");
    }
}
