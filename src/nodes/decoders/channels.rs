//! ONFI channel table and bus layout
//!
//! Decoder channel ids are positions in [`CHANNELS`] followed by
//! [`OPTIONAL_CHANNELS`]; every [`PinVector`](crate::runtime::PinVector)
//! handed to the decoder is indexed by these ids.

use super::config::{ConfigError, WordSize};
use super::types::Transition;

/// Static description of one decoder channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub desc: &'static str,
}

const fn channel(id: &'static str, name: &'static str, desc: &'static str) -> ChannelInfo {
    ChannelInfo { id, name, desc }
}

pub const ALE: usize = 0;
pub const CLE: usize = 1;
pub const NCE: usize = 2;
pub const NWE: usize = 3;
pub const NWP: usize = 4;
pub const NRE: usize = 5;
pub const RNB: usize = 6;
/// IO0; IO1..IO7 follow contiguously
pub const IO0: usize = 7;
pub const NWR: usize = 15;
pub const CLK: usize = 16;
/// IO8; IO9..IO15 follow contiguously
pub const IO8: usize = 17;
/// CE1; CE2..CE7 follow contiguously
pub const CE1: usize = 25;

pub const NUM_REQUIRED_CHANNELS: usize = 15;
pub const NUM_OPTIONAL_CHANNELS: usize = 17;
pub const NUM_CHANNELS: usize = NUM_REQUIRED_CHANNELS + NUM_OPTIONAL_CHANNELS;

pub static CHANNELS: [ChannelInfo; NUM_REQUIRED_CHANNELS] = [
    channel("ale", "ALE", "Address latch enable"),
    channel("cle", "CLE", "Command latch enable"),
    channel("nce", "nCE", "Chip enable (inverted)"),
    channel("nwe", "nWE", "Write enable (inverted)"),
    channel("nwp", "nWP", "Write protect (inverted)"),
    channel("nre", "nRE", "Read enable (inverted)"),
    channel("rnb", "RNB", "Ready/Busy - Low: Busy"),
    channel("io0", "IO0", "Data line 0"),
    channel("io1", "IO1", "Data line 1"),
    channel("io2", "IO2", "Data line 2"),
    channel("io3", "IO3", "Data line 3"),
    channel("io4", "IO4", "Data line 4"),
    channel("io5", "IO5", "Data line 5"),
    channel("io6", "IO6", "Data line 6"),
    channel("io7", "IO7", "Data line 7"),
];

pub static OPTIONAL_CHANNELS: [ChannelInfo; NUM_OPTIONAL_CHANNELS] = [
    channel("nwr", "W/R_n", "Write/Read direction"),
    channel("clk", "CLK", "Clock (only used for NV-DDR)"),
    channel("io8", "IO8", "Address line 8"),
    channel("io9", "IO9", "Address line 9"),
    channel("io10", "IO10", "Address line 10"),
    channel("io11", "IO11", "Address line 11"),
    channel("io12", "IO12", "Address line 12"),
    channel("io13", "IO13", "Address line 13"),
    channel("io14", "IO14", "Address line 14"),
    channel("io15", "IO15", "Address line 15"),
    channel("ce1", "CE1", "Chip enable line 1"),
    channel("ce2", "CE2", "Chip enable line 2"),
    channel("ce3", "CE3", "Chip enable line 3"),
    channel("ce4", "CE4", "Chip enable line 4"),
    channel("ce5", "CE5", "Chip enable line 5"),
    channel("ce6", "CE6", "Chip enable line 6"),
    channel("ce7", "CE7", "Chip enable line 7"),
];

/// Metadata for a decoder channel id
pub fn channel_info(channel: usize) -> Option<&'static ChannelInfo> {
    CHANNELS
        .get(channel)
        .or_else(|| OPTIONAL_CHANNELS.get(channel.checked_sub(NUM_REQUIRED_CHANNELS)?))
}

/// Look up a decoder channel id by its table id (e.g. `"ale"`, `"io12"`)
pub fn channel_by_id(id: &str) -> Option<usize> {
    CHANNELS
        .iter()
        .chain(OPTIONAL_CHANNELS.iter())
        .position(|info| info.id.eq_ignore_ascii_case(id))
}

pub fn is_required(channel: usize) -> bool {
    channel < NUM_REQUIRED_CHANNELS
}

/// Channels the main loop reads, and the edges that latch them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusLayout {
    /// Channel and transition that latch the address
    pub address_latch: (usize, Transition),
    /// Channel and transition that latch the data
    pub data_strobe: (usize, Transition),
    /// Data bus, LSB first
    pub data_bus: Vec<usize>,
    /// Address bus, LSB first; packed above the data bus bits
    pub address_bus: Vec<usize>,
    /// Bank channels, packed above the address bus bits when wired
    pub bank: Vec<usize>,
}

impl BusLayout {
    /// Default wiring for a word size: IO0-IO7 data, IO8-IO15 address on x16 parts
    pub fn for_wordsize(wordsize: WordSize) -> Self {
        let address_bus = match wordsize {
            WordSize::X8 => Vec::new(),
            WordSize::X16 => (IO8..IO8 + 8).collect(),
        };
        Self {
            address_latch: (ALE, Transition::Falling),
            data_strobe: (NRE, Transition::Rising),
            data_bus: (IO0..IO0 + 8).collect(),
            address_bus,
            bank: Vec::new(),
        }
    }

    pub fn with_address_bus(mut self, channels: Vec<usize>) -> Self {
        self.address_bus = channels;
        self
    }

    pub fn with_bank(mut self, channels: Vec<usize>) -> Self {
        self.bank = channels;
        self
    }

    pub fn with_data_strobe(mut self, channel: usize, transition: Transition) -> Self {
        self.data_strobe = (channel, transition);
        self
    }

    pub fn with_address_latch(mut self, channel: usize, transition: Transition) -> Self {
        self.address_latch = (channel, transition);
        self
    }

    /// Widest packed address this layout can produce, in bits
    pub fn max_address_bits(&self) -> usize {
        self.bank.len() + self.address_bus.len() + self.data_bus.len()
    }

    /// Check channel ids, role overlaps and widths
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.data_bus.is_empty() {
            return Err(ConfigError::InvalidLayout("data bus is empty".to_string()));
        }
        if self.data_bus.len() > 8 {
            return Err(ConfigError::InvalidLayout(format!(
                "data bus is {} bits wide, at most 8 supported",
                self.data_bus.len()
            )));
        }
        if self.max_address_bits() > 32 {
            return Err(ConfigError::InvalidLayout(format!(
                "packed address would be {} bits wide, at most 32 supported",
                self.max_address_bits()
            )));
        }

        let roles = [self.address_latch.0, self.data_strobe.0]
            .into_iter()
            .chain(self.data_bus.iter().copied())
            .chain(self.address_bus.iter().copied())
            .chain(self.bank.iter().copied());

        let mut seen = [false; NUM_CHANNELS];
        for ch in roles {
            if ch >= NUM_CHANNELS {
                return Err(ConfigError::UnknownChannel(ch));
            }
            if seen[ch] {
                let name = channel_info(ch).map(|info| info.name).unwrap_or("?");
                return Err(ConfigError::InvalidLayout(format!(
                    "channel {} ({}) is used for more than one role",
                    ch, name
                )));
            }
            seen[ch] = true;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_shape() {
        assert_eq!(NUM_REQUIRED_CHANNELS, 15);
        assert_eq!(NUM_CHANNELS, 32);
        assert_eq!(channel_info(ALE).map(|c| c.name), Some("ALE"));
        assert_eq!(channel_info(NRE).map(|c| c.name), Some("nRE"));
        assert_eq!(channel_info(IO0 + 7).map(|c| c.name), Some("IO7"));
        assert_eq!(channel_info(NWR).map(|c| c.id), Some("nwr"));
        assert_eq!(channel_info(CLK).map(|c| c.id), Some("clk"));
        assert_eq!(channel_info(IO8 + 7).map(|c| c.name), Some("IO15"));
        assert_eq!(channel_info(CE1 + 6).map(|c| c.name), Some("CE7"));
        assert!(channel_info(NUM_CHANNELS).is_none());
    }

    #[test]
    fn test_channel_by_id() {
        assert_eq!(channel_by_id("ale"), Some(ALE));
        assert_eq!(channel_by_id("IO12"), Some(IO8 + 4));
        assert_eq!(channel_by_id("ce3"), Some(CE1 + 2));
        assert_eq!(channel_by_id("psen"), None);
        assert!(is_required(RNB));
        assert!(!is_required(NWR));
    }

    #[test]
    fn test_default_layouts() {
        let x8 = BusLayout::for_wordsize(WordSize::X8);
        assert!(x8.address_bus.is_empty());
        assert_eq!(x8.data_bus, (7..15).collect::<Vec<_>>());
        assert_eq!(x8.address_latch, (ALE, Transition::Falling));
        assert_eq!(x8.data_strobe, (NRE, Transition::Rising));
        assert!(x8.validate().is_ok());

        let x16 = BusLayout::for_wordsize(WordSize::X16);
        assert_eq!(x16.address_bus, (17..25).collect::<Vec<_>>());
        assert_eq!(x16.max_address_bits(), 16);
        assert!(x16.validate().is_ok());
    }

    #[test]
    fn test_layout_rejects_shared_channel() {
        let layout = BusLayout::for_wordsize(WordSize::X8).with_bank(vec![IO0]);
        assert!(matches!(layout.validate(), Err(ConfigError::InvalidLayout(_))));
    }

    #[test]
    fn test_layout_rejects_unknown_channel() {
        let layout = BusLayout::for_wordsize(WordSize::X8).with_bank(vec![99]);
        assert!(matches!(layout.validate(), Err(ConfigError::UnknownChannel(99))));
    }

    #[test]
    fn test_layout_rejects_wide_or_empty_data_bus() {
        let mut layout = BusLayout::for_wordsize(WordSize::X8);
        layout.data_bus.clear();
        assert!(layout.validate().is_err());

        let mut layout = BusLayout::for_wordsize(WordSize::X8);
        layout.data_bus.push(IO8);
        assert!(layout.validate().is_err());
    }
}
