//! Unpacking of raw buffer bytes into signed sample values.
//!
//! Samples are read `sample_size` bytes at a time (the stride the channel's
//! data format reports) and assembled little-endian.

use serde::{Deserialize, Serialize};

use crate::models::error::StreamError;

/// AD4630 output data mode (OUT_DATA_MD field of the modes register).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutDataMode {
    /// 24-bit data.
    Data24,
    /// 16-bit data, 8-bit common mode.
    Data16Cm8,
    /// 24-bit data, 8-bit common mode.
    Data24Cm8,
    /// 30-bit averaged data, 1 OR bit, 1 SYNC bit.
    Avg30OrSync,
    /// 32-bit test pattern.
    TestPattern32,
}

impl OutDataMode {
    pub fn bits(self) -> u8 {
        match self {
            Self::Data24 => 0,
            Self::Data16Cm8 => 1,
            Self::Data24Cm8 => 2,
            Self::Avg30OrSync => 3,
            Self::TestPattern32 => 4,
        }
    }

    /// Whether the words carry common-mode (VCOM) data.
    pub fn has_common_mode(self) -> bool {
        matches!(self, Self::Data16Cm8 | Self::Data24Cm8)
    }

    /// Whether the two low bits of each word are OR and SYNC flags.
    pub fn has_or_sync(self) -> bool {
        matches!(self, Self::Avg30OrSync)
    }

    /// Arithmetic right shift that moves the data to the low bits of the
    /// 32-bit lane.
    pub fn shift(self) -> u32 {
        match self {
            Self::Data24 | Self::Data24Cm8 => 8,
            Self::Data16Cm8 => 16,
            Self::Avg30OrSync => 2,
            Self::TestPattern32 => 0,
        }
    }
}

impl TryFrom<u8> for OutDataMode {
    type Error = StreamError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Data24),
            1 => Ok(Self::Data16Cm8),
            2 => Ok(Self::Data24Cm8),
            3 => Ok(Self::Avg30OrSync),
            4 => Ok(Self::TestPattern32),
            other => Err(StreamError::ConfigurationFailed(format!(
                "invalid output data mode: {}",
                other
            ))),
        }
    }
}

/// One unpacked AD4630 sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ad4630Sample {
    pub value: i32,
    /// OR/SYNC bits; zero unless the mode carries them.
    pub or_sync: u8,
}

/// Assembles up to 8 bytes into a little-endian container word.
pub fn container_word(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .take(8)
        .enumerate()
        .fold(0u64, |word, (i, &b)| word | (u64::from(b) << (8 * i)))
}

/// Selects the 32-bit lane of a channel within a 64-bit container.
///
/// Channel 0 sits in the low word, channel 1 in the high word.
pub fn lane_word(container: u64, channel: u32) -> i32 {
    let lane = if channel == 0 { container } else { container >> 32 };
    lane as u32 as i32
}

/// Unpacks AD4630 samples for one channel according to the output mode.
pub fn unpack_ad4630(
    raw: &[u8],
    sample_size: usize,
    channel: u32,
    mode: OutDataMode,
) -> Vec<Ad4630Sample> {
    if sample_size == 0 {
        return Vec::new();
    }
    raw.chunks_exact(sample_size)
        .map(|chunk| {
            let word = lane_word(container_word(chunk), channel);
            let or_sync = if mode.has_or_sync() { (word & 0x3) as u8 } else { 0 };
            Ad4630Sample {
                value: word >> mode.shift(),
                or_sync,
            }
        })
        .collect()
}

/// Decodes 16-bit signed samples.
pub fn decode_i16(raw: &[u8], sample_size: usize) -> Vec<i16> {
    if sample_size == 0 {
        return Vec::new();
    }
    raw.chunks_exact(sample_size)
        .map(|chunk| container_word(chunk) as u16 as i16)
        .collect()
}

/// Decodes 32-bit signed samples.
pub fn decode_i32(raw: &[u8], sample_size: usize) -> Vec<i32> {
    if sample_size == 0 {
        return Vec::new();
    }
    raw.chunks_exact(sample_size)
        .map(|chunk| container_word(chunk) as u32 as i32)
        .collect()
}

/// AD7768 samples are printed with the 24-bit code moved to the top of the
/// 32-bit word.
pub fn ad7768_scale(value: i32) -> i32 {
    value << 8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(values: &[u64]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    #[test]
    fn mode_from_register_bits() {
        for bits in 0..=4u8 {
            assert_eq!(OutDataMode::try_from(bits).unwrap().bits(), bits);
        }
        assert!(OutDataMode::try_from(5).is_err());
    }

    #[test]
    fn common_mode_and_or_sync_flags() {
        assert!(OutDataMode::Data16Cm8.has_common_mode());
        assert!(OutDataMode::Data24Cm8.has_common_mode());
        assert!(!OutDataMode::Data24.has_common_mode());
        assert!(OutDataMode::Avg30OrSync.has_or_sync());
        assert!(!OutDataMode::TestPattern32.has_or_sync());
    }

    #[test]
    fn container_is_little_endian() {
        assert_eq!(container_word(&[0x78, 0x56, 0x34, 0x12]), 0x1234_5678);
        assert_eq!(container_word(&[]), 0);
        assert_eq!(
            container_word(&[1, 0, 0, 0, 0, 0, 0, 0, 0xff]),
            1,
            "bytes past the eighth are ignored"
        );
    }

    #[test]
    fn lanes_select_low_and_high_words() {
        let container = 0xAAAA_BBBB_1111_2222u64;
        assert_eq!(lane_word(container, 0), 0x1111_2222);
        assert_eq!(lane_word(container, 1), 0xAAAA_BBBBu32 as i32);
    }

    #[test]
    fn data24_shifts_by_eight() {
        let raw = words(&[0x0012_3400, 0xFFFF_FF00]);
        let samples = unpack_ad4630(&raw, 8, 0, OutDataMode::Data24);

        assert_eq!(samples[0].value, 0x1234);
        assert_eq!(samples[1].value, -1, "sign is preserved");
    }

    #[test]
    fn data16_drops_common_mode_byte() {
        let raw = words(&[0x1234_5678, 0x8000_0000]);
        let samples = unpack_ad4630(&raw, 8, 0, OutDataMode::Data16Cm8);

        assert_eq!(samples[0].value, 0x1234);
        assert_eq!(samples[1].value, -32768);
    }

    #[test]
    fn channel_one_reads_high_word() {
        let raw = words(&[0x0000_0100_0000_0000]);
        let samples = unpack_ad4630(&raw, 8, 1, OutDataMode::Data24Cm8);
        assert_eq!(samples[0].value, 1);
    }

    #[test]
    fn averaged_mode_splits_or_sync() {
        let raw = words(&[0x0000_0007, 0xFFFF_FFFE]);
        let samples = unpack_ad4630(&raw, 8, 0, OutDataMode::Avg30OrSync);

        assert_eq!(samples[0], Ad4630Sample { value: 1, or_sync: 3 });
        assert_eq!(samples[1], Ad4630Sample { value: -1, or_sync: 2 });
    }

    #[test]
    fn test_pattern_is_unchanged() {
        let raw = words(&[0xAAAA_5555]);
        let samples = unpack_ad4630(&raw, 8, 0, OutDataMode::TestPattern32);
        assert_eq!(samples[0].value, 0xAAAA_5555u32 as i32);
        assert_eq!(samples[0].or_sync, 0);
    }

    #[test]
    fn stride_follows_sample_size() {
        let raw = [0x00, 0x01, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00];
        let samples = unpack_ad4630(&raw, 4, 0, OutDataMode::Data24);
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].value, 1);
        assert_eq!(samples[1].value, 2);
    }

    #[test]
    fn partial_trailing_sample_is_dropped() {
        let raw = words(&[0x100]);
        assert_eq!(unpack_ad4630(&raw[..7], 8, 0, OutDataMode::Data24).len(), 0);
    }

    #[test]
    fn zero_sample_size_yields_nothing() {
        assert!(unpack_ad4630(&[1, 2, 3], 0, 0, OutDataMode::Data24).is_empty());
        assert!(decode_i16(&[1, 2], 0).is_empty());
        assert!(decode_i32(&[1, 2, 3, 4], 0).is_empty());
    }

    #[test]
    fn i16_decoding() {
        let raw = [0x34, 0x12, 0x00, 0x80, 0xff, 0xff];
        assert_eq!(decode_i16(&raw, 2), vec![0x1234, i16::MIN, -1]);
    }

    #[test]
    fn i32_decoding_and_ad7768_scale() {
        let raw = [0x01, 0x00, 0x00, 0x00, 0xff, 0xff, 0xff, 0xff];
        let values = decode_i32(&raw, 4);
        assert_eq!(values, vec![1, -1]);
        assert_eq!(ad7768_scale(values[0]), 256);
        assert_eq!(ad7768_scale(values[1]), -256);
        assert_eq!(ad7768_scale(0x0080_0000), i32::MIN);
    }
}
