//! Device output channel identifiers

use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// One of the two independently controllable device outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Channel {
    A,
    B,
}

impl Channel {
    /// Every channel, in device order
    pub const ALL: [Channel; 2] = [Channel::A, Channel::B];

    pub fn as_str(self) -> &'static str {
        match self {
            Channel::A => "A",
            Channel::B => "B",
        }
    }

    /// Position of the channel in per-channel arrays
    pub fn index(self) -> usize {
        match self {
            Channel::A => 0,
            Channel::B => 1,
        }
    }
}

impl Display for Channel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parses the exact channel tag; case matters.
impl FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(Channel::A),
            "B" => Ok(Channel::B),
            _ => Err(format!("unknown channel: {}", s)),
        }
    }
}

/// Destination of an outbound command.
///
/// `Both` only exists for broadcast commands such as waveforms; per-channel
/// state is always keyed by [`Channel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelTarget {
    A,
    B,
    Both,
}

impl ChannelTarget {
    pub fn as_str(self) -> &'static str {
        match self {
            ChannelTarget::A => "A",
            ChannelTarget::B => "B",
            ChannelTarget::Both => "BOTH",
        }
    }

    /// Channels addressed by this target
    pub fn channels(self) -> &'static [Channel] {
        match self {
            ChannelTarget::A => &[Channel::A],
            ChannelTarget::B => &[Channel::B],
            ChannelTarget::Both => &Channel::ALL,
        }
    }
}

impl From<Channel> for ChannelTarget {
    fn from(channel: Channel) -> Self {
        match channel {
            Channel::A => ChannelTarget::A,
            Channel::B => ChannelTarget::B,
        }
    }
}

impl Display for ChannelTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
