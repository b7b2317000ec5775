use serde::{Deserialize, Serialize};

/// Direction of an IIO channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Input,
    Output,
}

impl Direction {
    pub fn is_output(self) -> bool {
        matches!(self, Self::Output)
    }
}

/// Sample format of a channel, as reported by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataFormat {
    /// Bits of storage per sample.
    pub length: u32,
    /// Significant bits.
    pub bits: u32,
    /// Right shift to apply to the storage word.
    pub shift: u32,
    pub is_signed: bool,
    pub is_big_endian: bool,
    /// Number of times the sample repeats within one scan element.
    pub repeat: u32,
}

impl DataFormat {
    /// A signed little-endian format with `length` bits of storage, all
    /// significant.
    pub fn signed(length: u32) -> Self {
        Self {
            length,
            bits: length,
            shift: 0,
            is_signed: true,
            is_big_endian: false,
            repeat: 1,
        }
    }

    /// Bytes occupied by one sample in the buffer.
    pub fn sample_size(&self) -> usize {
        (self.length / 8) as usize * self.repeat as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_size_accounts_for_repeat() {
        let mut fmt = DataFormat::signed(16);
        assert_eq!(fmt.sample_size(), 2);

        fmt.repeat = 4;
        assert_eq!(fmt.sample_size(), 8);
    }

    #[test]
    fn sub_byte_length_has_zero_size() {
        let fmt = DataFormat::signed(4);
        assert_eq!(fmt.sample_size(), 0);
    }
}
