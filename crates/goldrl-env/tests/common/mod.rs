//! Scripted emulator over a flat RAM image

#![allow(dead_code)]

use std::io::{Read, Write};

use ndarray::Array3;

use goldrl_core::{Emulator, JoypadAction, MemorySource, RLError, Result, Screen, SCREEN_HEIGHT, SCREEN_WIDTH};
use goldrl_state::MemoryImage;

pub const MAP_BANK: u16 = 0xDA00;
pub const MAP_ID: u16 = 0xDA01;
pub const X_COORD: u16 = 0xDA02;
pub const Y_COORD: u16 = 0xDA03;
pub const PARTY_COUNT: u16 = 0xDA22;
pub const PARTY_DATA: u16 = 0xDA2A;

/// Moves the player one tile per directional press; `A` walks through the door
/// to the next map id.
pub struct ScriptedEmulator {
    pub ram: MemoryImage,
    boot: MemoryImage,
    pub presses: Vec<(JoypadAction, u32)>,
    pub resets: usize,
}

impl ScriptedEmulator {
    pub fn new(boot: MemoryImage) -> Self {
        Self { ram: boot.clone(), boot, presses: Vec::new(), resets: 0 }
    }

    /// New Bark Town, standing at (7, 9) with one level-5 party member
    pub fn new_bark() -> Self {
        let mut ram = MemoryImage::zeroed();
        ram.write_bytes(MAP_BANK, &[24, 4, 7, 9]);
        ram.write_byte(PARTY_COUNT, 1);
        set_member(&mut ram, 0, 155, 5, 20, 20);
        Self::new(ram)
    }
}

pub fn set_member(ram: &mut MemoryImage, slot: u16, species: u8, level: u8, hp: u16, max_hp: u16) {
    let base = PARTY_DATA + slot * 48;
    ram.write_byte(base, species);
    ram.write_byte(base + 0x1F, level);
    ram.write_word_be(base + 0x22, hp);
    ram.write_word_be(base + 0x24, max_hp);
}

impl MemorySource for ScriptedEmulator {
    fn read_byte(&self, address: u16) -> u8 {
        self.ram.read_byte(address)
    }
}

impl Emulator for ScriptedEmulator {
    fn reset(&mut self) -> Result<()> {
        self.ram = self.boot.clone();
        self.resets += 1;
        Ok(())
    }

    fn step(&mut self, action: JoypadAction, frame_skip: u32) -> Result<()> {
        self.presses.push((action, frame_skip));
        let (x, y) = (self.ram.read_byte(X_COORD), self.ram.read_byte(Y_COORD));
        match action {
            JoypadAction::Up => self.ram.write_byte(Y_COORD, y.saturating_sub(1)),
            JoypadAction::Down => self.ram.write_byte(Y_COORD, y.saturating_add(1)),
            JoypadAction::Left => self.ram.write_byte(X_COORD, x.saturating_sub(1)),
            JoypadAction::Right => self.ram.write_byte(X_COORD, x.saturating_add(1)),
            JoypadAction::A => {
                let map = self.ram.read_byte(MAP_ID);
                self.ram.write_byte(MAP_ID, map.wrapping_add(1));
            }
            _ => {}
        }
        Ok(())
    }

    fn save_state(&mut self, writer: &mut dyn Write) -> Result<()> {
        writer.write_all(self.ram.as_bytes())?;
        Ok(())
    }

    fn load_state(&mut self, reader: &mut dyn Read) -> Result<()> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        if bytes.len() != 0x1_0000 {
            return Err(RLError::Emulator(format!("bad state size {}", bytes.len())));
        }
        self.ram = MemoryImage::new(0, bytes);
        Ok(())
    }

    fn capture_screen(&self) -> Result<Screen> {
        Ok(Array3::from_elem((SCREEN_HEIGHT, SCREEN_WIDTH, 3), 120))
    }
}
