//! Boundary to the Game Boy emulator
//!
//! The emulator itself is an external collaborator. The environment only
//! needs byte reads from the address space, button input, screen capture
//! and opaque save-state blobs.

use std::io::{Read, Write};

use ndarray::Array3;

use crate::action::JoypadAction;

/// Screen height in pixels
pub const SCREEN_HEIGHT: usize = 144;
/// Screen width in pixels
pub const SCREEN_WIDTH: usize = 160;

/// Captured screen, laid out height x width x channels
pub type Screen = Array3<u8>;

/// Byte-addressable view of the 16-bit Game Boy address space
pub trait MemorySource {
    /// Read a single byte
    fn read_byte(&self, address: u16) -> u8;

    /// Read a byte at a computed address that may lie outside the address space
    fn try_read_byte(&self, address: u32) -> Option<u8> {
        u16::try_from(address).ok().map(|a| self.read_byte(a))
    }
}

impl<M: MemorySource + ?Sized> MemorySource for &M {
    fn read_byte(&self, address: u16) -> u8 {
        (**self).read_byte(address)
    }

    fn try_read_byte(&self, address: u32) -> Option<u8> {
        (**self).try_read_byte(address)
    }
}

impl<M: MemorySource + ?Sized> MemorySource for Box<M> {
    fn read_byte(&self, address: u16) -> u8 {
        (**self).read_byte(address)
    }

    fn try_read_byte(&self, address: u32) -> Option<u8> {
        (**self).try_read_byte(address)
    }
}

/// A running emulator instance
pub trait Emulator: MemorySource + Send + Sync {
    /// Return to power-on state and skip the intro
    fn reset(&mut self) -> crate::Result<()>;

    /// Hold `action` for `frame_skip` frames, release it, then run `frame_skip` more
    fn step(&mut self, action: JoypadAction, frame_skip: u32) -> crate::Result<()>;

    /// Serialize the full machine state
    fn save_state(&mut self, writer: &mut dyn Write) -> crate::Result<()>;

    /// Restore a state previously produced by [`Emulator::save_state`]
    fn load_state(&mut self, reader: &mut dyn Read) -> crate::Result<()>;

    /// Capture the current frame
    fn capture_screen(&self) -> crate::Result<Screen>;
}
