use serde::{Deserialize, Serialize};

use super::sample_unpack::OutDataMode;
use crate::models::error::StreamError;

/// Address of the AD4630 modes register.
pub const MODES_REG: u32 = 0x20;

/// Value the Linux driver programs into the modes register. Written back on
/// exit so the driver finds the part the way it left it.
pub const DRIVER_DEFAULT_MODES: u32 = 0x82;

/// CLK_MD field: where the data clock comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockMode {
    /// SPI compatible clocking.
    #[default]
    Spi,
    /// Echo clock mode.
    Echo,
    /// Host clock mode.
    Host,
}

impl ClockMode {
    pub fn bits(self) -> u32 {
        match self {
            Self::Spi => 0,
            Self::Echo => 1,
            Self::Host => 2,
        }
    }
}

impl TryFrom<u32> for ClockMode {
    type Error = StreamError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Spi),
            1 => Ok(Self::Echo),
            2 => Ok(Self::Host),
            other => Err(StreamError::ConfigurationFailed(format!(
                "invalid clock mode: {}",
                other
            ))),
        }
    }
}

/// LANE_MD field: SDO lanes per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LaneMode {
    One,
    Two,
    #[default]
    Four,
}

impl LaneMode {
    pub fn bits(self) -> u32 {
        match self {
            Self::One => 0,
            Self::Two => 1,
            Self::Four => 2,
        }
    }
}

impl TryFrom<u32> for LaneMode {
    type Error = StreamError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::One),
            1 => Ok(Self::Two),
            2 => Ok(Self::Four),
            other => Err(StreamError::ConfigurationFailed(format!(
                "unsupported lane mode: {}",
                other
            ))),
        }
    }
}

/// Fields of the AD4630 modes register (0x20).
///
/// Layout: `LANE_MD[7:6] | CLK_MD[5:4] | DDR_MD[3] | OUT_DATA_MD[2:0]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModesRegister {
    pub out_data_mode: OutDataMode,
    /// Double data rate clocking.
    pub ddr: bool,
    pub clock_mode: ClockMode,
    pub lane_mode: LaneMode,
}

impl Default for ModesRegister {
    fn default() -> Self {
        Self {
            out_data_mode: OutDataMode::Data16Cm8,
            ddr: false,
            clock_mode: ClockMode::Spi,
            lane_mode: LaneMode::Four,
        }
    }
}

impl ModesRegister {
    pub fn encode(&self) -> u32 {
        (self.lane_mode.bits() << 6)
            | (self.clock_mode.bits() << 4)
            | (u32::from(self.ddr) << 3)
            | u32::from(self.out_data_mode.bits())
    }

    pub fn decode(value: u32) -> Result<Self, StreamError> {
        Ok(Self {
            out_data_mode: OutDataMode::try_from((value & 0x7) as u8)?,
            ddr: value & 0x8 != 0,
            clock_mode: ClockMode::try_from((value >> 4) & 0x3)?,
            lane_mode: LaneMode::try_from((value >> 6) & 0x3)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_encodes_to_0x81() {
        assert_eq!(ModesRegister::default().encode(), 0x81);
    }

    #[test]
    fn driver_default_decodes() {
        let modes = ModesRegister::decode(DRIVER_DEFAULT_MODES).unwrap();
        assert_eq!(modes.out_data_mode, OutDataMode::Data24Cm8);
        assert_eq!(modes.lane_mode, LaneMode::Four);
        assert_eq!(modes.clock_mode, ClockMode::Spi);
        assert!(!modes.ddr);
    }

    #[test]
    fn field_positions() {
        let modes = ModesRegister {
            out_data_mode: OutDataMode::TestPattern32,
            ddr: true,
            clock_mode: ClockMode::Host,
            lane_mode: LaneMode::Two,
        };
        assert_eq!(modes.encode(), 0b01_10_1_100);
        assert_eq!(ModesRegister::decode(modes.encode()).unwrap(), modes);
    }

    #[test]
    fn rejects_invalid_fields() {
        // CLK_MD = 3
        assert!(ModesRegister::decode(0x30).is_err());
        // LANE_MD = 3
        assert!(ModesRegister::decode(0xC0).is_err());
        // OUT_DATA_MD = 5
        assert!(ModesRegister::decode(0x05).is_err());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let modes: ModesRegister = serde_json::from_str(r#"{"out_data_mode":"avg30_or_sync"}"#).unwrap();
        assert_eq!(modes.out_data_mode, OutDataMode::Avg30OrSync);
        assert_eq!(modes.lane_mode, LaneMode::Four);
        assert_eq!(modes.encode(), 0x83);
    }
}
