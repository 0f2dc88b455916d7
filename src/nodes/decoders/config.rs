//! Decoder options and their validation

use std::fmt;
use std::str::FromStr;

use super::channels::BusLayout;

/// Configuration errors, reported before any sample is processed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value '{value}' for option '{option}'")]
    InvalidOption { option: &'static str, value: String },

    #[error("Word size x16 is not supported in {0} mode")]
    UnsupportedWordSize(DataRateMode),

    #[error("Unknown channel id {0}")]
    UnknownChannel(usize),

    #[error("Invalid bus layout: {0}")]
    InvalidLayout(String),
}

/// ONFI standard revision (informational, does not change decoding)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum OnfiVersion {
    V1_0,
    V2_0,
    V2_1,
    V2_2,
    V2_3a,
    V3_0,
    V3_1,
    #[default]
    V3_2,
    V4_0,
    V4_1,
    V4_2,
    V5_0,
    V5_1,
}

impl OnfiVersion {
    pub const ALL: [OnfiVersion; 13] = [
        OnfiVersion::V1_0,
        OnfiVersion::V2_0,
        OnfiVersion::V2_1,
        OnfiVersion::V2_2,
        OnfiVersion::V2_3a,
        OnfiVersion::V3_0,
        OnfiVersion::V3_1,
        OnfiVersion::V3_2,
        OnfiVersion::V4_0,
        OnfiVersion::V4_1,
        OnfiVersion::V4_2,
        OnfiVersion::V5_0,
        OnfiVersion::V5_1,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OnfiVersion::V1_0 => "1.0",
            OnfiVersion::V2_0 => "2.0",
            OnfiVersion::V2_1 => "2.1",
            OnfiVersion::V2_2 => "2.2",
            OnfiVersion::V2_3a => "2.3a",
            OnfiVersion::V3_0 => "3.0",
            OnfiVersion::V3_1 => "3.1",
            OnfiVersion::V3_2 => "3.2",
            OnfiVersion::V4_0 => "4.0",
            OnfiVersion::V4_1 => "4.1",
            OnfiVersion::V4_2 => "4.2",
            OnfiVersion::V5_0 => "5.0",
            OnfiVersion::V5_1 => "5.1",
        }
    }
}

impl fmt::Display for OnfiVersion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OnfiVersion {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ConfigError::InvalidOption {
                option: "onfi",
                value: s.to_string(),
            })
    }
}

/// Number of I/O pins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WordSize {
    #[default]
    X8,
    X16,
}

impl WordSize {
    pub fn bits(self) -> usize {
        match self {
            WordSize::X8 => 8,
            WordSize::X16 => 16,
        }
    }
}

impl fmt::Display for WordSize {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.bits())
    }
}

impl FromStr for WordSize {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "8" => Ok(WordSize::X8),
            "16" => Ok(WordSize::X16),
            other => Err(ConfigError::InvalidOption {
                option: "wordsize",
                value: other.to_string(),
            }),
        }
    }
}

/// Data interface timing mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DataRateMode {
    #[default]
    Sdr,
    NvDdr,
    NvDdr2,
    NvDdr3,
    NvLpddr4,
}

impl DataRateMode {
    pub const ALL: [DataRateMode; 5] = [
        DataRateMode::Sdr,
        DataRateMode::NvDdr,
        DataRateMode::NvDdr2,
        DataRateMode::NvDdr3,
        DataRateMode::NvLpddr4,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DataRateMode::Sdr => "SDR",
            DataRateMode::NvDdr => "NV-DDR",
            DataRateMode::NvDdr2 => "NV-DDR2",
            DataRateMode::NvDdr3 => "NV-DDR3",
            DataRateMode::NvLpddr4 => "NV-LPDDR4",
        }
    }

    /// Whether x16 parts exist for this interface
    pub fn supports_x16(self) -> bool {
        matches!(self, DataRateMode::Sdr | DataRateMode::NvDdr)
    }
}

impl fmt::Display for DataRateMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataRateMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ConfigError::InvalidOption {
                option: "mode",
                value: s.to_string(),
            })
    }
}

/// Static description of one decoder option
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionInfo {
    pub id: &'static str,
    pub desc: &'static str,
    pub default: &'static str,
    pub values: &'static [&'static str],
}

pub static OPTIONS: [OptionInfo; 3] = [
    OptionInfo {
        id: "onfi",
        desc: "ONFI Standard",
        default: "3.2",
        values: &[
            "1.0", "2.0", "2.1", "2.2", "2.3a", "3.0", "3.1", "3.2", "4.0", "4.1", "4.2", "5.0",
            "5.1",
        ],
    },
    OptionInfo {
        id: "wordsize",
        desc: "IO pins",
        default: "8",
        values: &["8", "16"],
    },
    OptionInfo {
        id: "mode",
        desc: "Data Rate mode",
        default: "SDR",
        values: &["SDR", "NV-DDR", "NV-DDR2", "NV-DDR3", "NV-LPDDR4"],
    },
];

/// Decoder configuration
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OnfiConfig {
    pub version: OnfiVersion,
    pub wordsize: WordSize,
    pub mode: DataRateMode,
    /// Channel layout override; derived from `wordsize` when `None`
    pub layout: Option<BusLayout>,
}

impl OnfiConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_version(mut self, version: OnfiVersion) -> Self {
        self.version = version;
        self
    }

    pub fn with_wordsize(mut self, wordsize: WordSize) -> Self {
        self.wordsize = wordsize;
        self
    }

    pub fn with_mode(mut self, mode: DataRateMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_layout(mut self, layout: BusLayout) -> Self {
        self.layout = Some(layout);
        self
    }

    /// Set an option by its table id and string value
    pub fn set_option(&mut self, id: &str, value: &str) -> Result<(), ConfigError> {
        match id {
            "onfi" => self.version = value.parse()?,
            "wordsize" => self.wordsize = value.parse()?,
            "mode" => self.mode = value.parse()?,
            _ => {
                return Err(ConfigError::InvalidOption {
                    option: "option",
                    value: id.to_string(),
                });
            }
        }
        Ok(())
    }

    /// The layout the decoder will use
    pub fn bus_layout(&self) -> BusLayout {
        self.layout
            .clone()
            .unwrap_or_else(|| BusLayout::for_wordsize(self.wordsize))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.wordsize == WordSize::X16 && !self.mode.supports_x16() {
            return Err(ConfigError::UnsupportedWordSize(self.mode));
        }
        self.bus_layout().validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_option_table() {
        let config = OnfiConfig::default();
        assert_eq!(config.version.to_string(), OPTIONS[0].default);
        assert_eq!(config.wordsize.to_string(), OPTIONS[1].default);
        assert_eq!(config.mode.to_string(), OPTIONS[2].default);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_option_values_all_parse() {
        for v in OPTIONS[0].values {
            assert_eq!(v.parse::<OnfiVersion>().unwrap().as_str(), *v);
        }
        for v in OPTIONS[1].values {
            assert_eq!(v.parse::<WordSize>().unwrap().to_string(), *v);
        }
        for v in OPTIONS[2].values {
            assert_eq!(v.parse::<DataRateMode>().unwrap().as_str(), *v);
        }
    }

    #[test]
    fn test_invalid_option_values() {
        assert!(matches!(
            "6.0".parse::<OnfiVersion>(),
            Err(ConfigError::InvalidOption { option: "onfi", .. })
        ));
        assert!("32".parse::<WordSize>().is_err());
        assert!("DDR5".parse::<DataRateMode>().is_err());
        assert!("nv-ddr2".parse::<DataRateMode>().is_ok());
    }

    #[test]
    fn test_set_option() {
        let mut config = OnfiConfig::new();
        config.set_option("wordsize", "16").unwrap();
        config.set_option("mode", "NV-DDR").unwrap();
        config.set_option("onfi", "2.3a").unwrap();
        assert_eq!(config.wordsize, WordSize::X16);
        assert_eq!(config.mode, DataRateMode::NvDdr);
        assert_eq!(config.version, OnfiVersion::V2_3a);
        assert!(config.set_option("speed", "fast").is_err());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_x16_rejected_for_x8_only_modes() {
        for mode in [DataRateMode::NvDdr2, DataRateMode::NvDdr3, DataRateMode::NvLpddr4] {
            let config = OnfiConfig::new().with_wordsize(WordSize::X16).with_mode(mode);
            assert_eq!(config.validate(), Err(ConfigError::UnsupportedWordSize(mode)));
        }
    }

    #[test]
    fn test_layout_follows_wordsize_unless_overridden() {
        let config = OnfiConfig::new().with_wordsize(WordSize::X16);
        assert_eq!(config.bus_layout().address_bus.len(), 8);

        let custom = BusLayout::for_wordsize(WordSize::X8).with_address_bus(vec![17, 18]);
        let config = config.with_layout(custom.clone());
        assert_eq!(config.bus_layout(), custom);
    }
}
