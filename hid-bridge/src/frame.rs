//! Fixed-size output report frames

use core::fmt;

/// Size of one report frame in bytes
pub const FRAME_SIZE: usize = 8;

/// One 8-byte keyboard report
///
/// Report format: `[modifier, reserved, key1, key2, key3, key4, key5, key6]`.
///
/// A *press* frame is whatever the producer accepted; the *release* frame is
/// all zeros and is never queued, the dispatch loop synthesizes it after every
/// press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Frame([u8; FRAME_SIZE]);

/// The input slice does not have exactly [`FRAME_SIZE`] bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FrameLengthError {
    pub len: usize,
}

impl fmt::Display for FrameLengthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Expected {} bytes, got {}", FRAME_SIZE, self.len)
    }
}

impl core::error::Error for FrameLengthError {}

impl Frame {
    /// The all-zero release report
    pub const RELEASE: Frame = Frame([0; FRAME_SIZE]);

    pub const fn new(bytes: [u8; FRAME_SIZE]) -> Self {
        Self(bytes)
    }

    /// Copy a frame out of a slice that must be exactly [`FRAME_SIZE`] long
    pub fn from_slice(data: &[u8]) -> Result<Self, FrameLengthError> {
        let bytes: [u8; FRAME_SIZE] = data
            .try_into()
            .map_err(|_| FrameLengthError { len: data.len() })?;
        Ok(Self(bytes))
    }

    /// Single key, no modifiers
    pub const fn from_keycode(keycode: u8) -> Self {
        Self([0, 0, keycode, 0, 0, 0, 0, 0])
    }

    pub const fn as_bytes(&self) -> &[u8; FRAME_SIZE] {
        &self.0
    }

    pub fn modifier(&self) -> u8 {
        self.0[0]
    }

    /// The six key slots
    pub fn keycodes(&self) -> &[u8] {
        &self.0[2..]
    }

    pub fn is_release(&self) -> bool {
        *self == Self::RELEASE
    }
}

impl From<[u8; FRAME_SIZE]> for Frame {
    fn from(bytes: [u8; FRAME_SIZE]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
