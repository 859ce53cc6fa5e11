use serde::{Deserialize, Serialize};

use crate::error::InvalidChannel;

pub const RESULT_BITS: u32 = 10;
pub const RESULT_MASK: u16 = (1 << RESULT_BITS) - 1;

const START_BIT: u16 = 1 << 15;
const SINGLE_ENDED_BIT: u16 = 1 << 14;
const CHANNEL_SHIFT: u32 = 11;

/// 3-bit ADC input selector
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Channel(u8);

impl Channel {
    pub const COUNT: usize = 8;

    pub fn new(index: u8) -> Option<Channel> {
        (index < Channel::COUNT as u8).then_some(Channel(index))
    }

    /// Takes the low three bits of a raw selector value
    pub fn from_bits(bits: u8) -> Channel {
        Channel(bits & 0b111)
    }

    pub fn index(self) -> u8 {
        self.0
    }

    pub fn all() -> impl Iterator<Item=Channel> {
        (0..Channel::COUNT as u8).map(Channel)
    }
}

impl TryFrom<u8> for Channel {
    type Error = InvalidChannel;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Channel::new(value).ok_or(InvalidChannel(value))
    }
}

impl From<Channel> for u8 {
    fn from(ch: Channel) -> u8 {
        ch.0
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ch{}", self.0)
    }
}

/// Request frame: start bit, single-ended flag and channel, followed by zero padding
pub fn command_word(channel: Channel) -> u16 {
    START_BIT | SINGLE_ENDED_BIT | (channel.index() as u16) << CHANNEL_SHIFT
}

/// Parallel-in, serial-out command register, MSB first
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandRegister(u16);

impl CommandRegister {
    pub fn load(channel: Channel) -> Self {
        CommandRegister(command_word(channel))
    }

    pub fn bits(&self) -> u16 {
        self.0
    }

    /// Returns the current MSB and shifts a zero in at the bottom
    pub fn shift_out(&mut self) -> bool {
        let bit = self.0 & 0x8000 != 0;
        self.0 <<= 1;
        bit
    }
}

/// Serial-in result register holding the last ten sampled bits, first sample in the MSB
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ResultRegister(u16);

impl ResultRegister {
    pub fn value(&self) -> u16 {
        self.0
    }

    pub fn shift_in(&mut self, bit: bool) {
        self.0 = ((self.0 << 1) | bit as u16) & RESULT_MASK;
    }

    pub fn clear(&mut self) {
        self.0 = 0;
    }
}
