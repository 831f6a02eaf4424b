//! Command opcodes used by the engine itself.
//!
//! Every command frame starts with a group byte followed by the command byte
//! within that group. The full per-function catalog lives with the
//! application; only the pairs the engine issues on its own are defined here.

/// A `[group, code]` command header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Opcode {
    /// Command group byte.
    pub group: u8,
    /// Command byte within the group.
    pub code: u8,
}

impl Opcode {
    /// Build an opcode pair.
    pub const fn new(group: u8, code: u8) -> Self {
        Self { group, code }
    }

    /// Wire bytes of the command header.
    pub const fn to_bytes(self) -> [u8; 2] {
        [self.group, self.code]
    }
}

/// Group of commands shared by all firmware variants.
pub const COMMON: u8 = 11;

/// Query the firmware version string.
pub const GET_VERSION: Opcode = Opcode::new(COMMON, 5);

/// Length of the version identifier, excluding the trailing delimiter.
pub const VERSION_STRING_LENGTH: usize = 2;
