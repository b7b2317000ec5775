use std::fmt;

use super::data_format::DataFormat;

/// One IQ pair from a complex RX channel pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IqSample {
    pub i: i16,
    pub q: i16,
}

/// Decoded samples of one capture block, with the print layout they use.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockData {
    /// One line per sample: `Buffer Sample: <n>\t<label>: 0x<hex>`.
    Indexed {
        label: String,
        values: Vec<i32>,
        /// OR/SYNC bits per sample, when the output mode carries them.
        or_sync: Option<Vec<u8>>,
    },
    /// All samples on the channel line: `<id> v0 v1 ...`.
    Inline { values: Vec<i32> },
    /// One line per IQ pair.
    Iq { samples: Vec<IqSample>, show_q: bool },
}

/// Result of one refill of the capture loop.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureBlock {
    pub channel_id: String,
    pub format: Option<DataFormat>,
    pub common_mode_voltage: Option<i64>,
    pub data: BlockData,
}

impl CaptureBlock {
    /// Number of samples (or IQ pairs) in the block.
    pub fn len(&self) -> usize {
        match &self.data {
            BlockData::Indexed { values, .. } | BlockData::Inline { values } => values.len(),
            BlockData::Iq { samples, .. } => samples.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for CaptureBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(vcom) = self.common_mode_voltage {
            writeln!(f, "\t common_mode_voltage: {}", vcom)?;
        }
        if let Some(format) = &self.format {
            writeln!(
                f,
                "Fmt length = {}, fmt repeat = {}, sample size = {}",
                format.length,
                format.repeat,
                format.sample_size()
            )?;
        }

        match &self.data {
            BlockData::Indexed { label, values, or_sync } => {
                writeln!(f, "{} ", self.channel_id)?;
                for (index, value) in values.iter().enumerate() {
                    write!(f, "Buffer Sample: {}\t{}: 0x{:x}", index, label, value)?;
                    if let Some(bits) = or_sync.as_ref().and_then(|b| b.get(index)) {
                        write!(f, "\tOR_SYNC: 0x{:x}", bits)?;
                    }
                    writeln!(f)?;
                }
                writeln!(f)?;
            }
            BlockData::Inline { values } => {
                write!(f, "{} ", self.channel_id)?;
                for value in values {
                    write!(f, "{} ", value)?;
                }
                writeln!(f)?;
            }
            BlockData::Iq { samples, show_q } => {
                for sample in samples {
                    if *show_q {
                        writeln!(f, "Voltage (Q) = {}\t\t\tVoltage (I) = {}", sample.q, sample.i)?;
                    } else {
                        writeln!(f, "Voltage (I) = {}", sample.i)?;
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indexed_block_prints_hex_lines() {
        let block = CaptureBlock {
            channel_id: "voltage0".into(),
            format: Some(DataFormat::signed(64)),
            common_mode_voltage: Some(12),
            data: BlockData::Indexed {
                label: "CH0".into(),
                values: vec![0x12, -1],
                or_sync: None,
            },
        };

        let text = block.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "\t common_mode_voltage: 12");
        assert_eq!(lines[1], "Fmt length = 64, fmt repeat = 1, sample size = 8");
        assert_eq!(lines[2], "voltage0 ");
        assert_eq!(lines[3], "Buffer Sample: 0\tCH0: 0x12");
        // Negative values print as 32-bit two's complement.
        assert_eq!(lines[4], "Buffer Sample: 1\tCH0: 0xffffffff");
        assert_eq!(lines[5], "");
        assert_eq!(lines.len(), 6);
    }

    #[test]
    fn indexed_block_with_or_sync() {
        let block = CaptureBlock {
            channel_id: "voltage1".into(),
            format: None,
            common_mode_voltage: None,
            data: BlockData::Indexed {
                label: "CH1".into(),
                values: vec![5],
                or_sync: Some(vec![0x3]),
            },
        };

        assert_eq!(block.to_string(), "voltage1 \nBuffer Sample: 0\tCH1: 0x5\tOR_SYNC: 0x3\n\n");
    }

    #[test]
    fn inline_block_is_one_line() {
        let block = CaptureBlock {
            channel_id: "voltage4".into(),
            format: None,
            common_mode_voltage: None,
            data: BlockData::Inline { values: vec![256, -512, 0] },
        };

        assert_eq!(block.to_string(), "voltage4 256 -512 0 \n");
        assert_eq!(block.len(), 3);
    }

    #[test]
    fn iq_block_hides_q_when_asked() {
        let samples = vec![IqSample { i: 10, q: -20 }];
        let with_q = CaptureBlock {
            channel_id: "voltage0_i".into(),
            format: None,
            common_mode_voltage: None,
            data: BlockData::Iq { samples: samples.clone(), show_q: true },
        };
        let i_only = CaptureBlock {
            data: BlockData::Iq { samples, show_q: false },
            ..with_q.clone()
        };

        assert_eq!(with_q.to_string(), "Voltage (Q) = -20\t\t\tVoltage (I) = 10\n");
        assert_eq!(i_only.to_string(), "Voltage (I) = 10\n");
    }

    #[test]
    fn empty_block() {
        let block = CaptureBlock {
            channel_id: "voltage0".into(),
            format: None,
            common_mode_voltage: None,
            data: BlockData::Inline { values: Vec::new() },
        };
        assert!(block.is_empty());
    }
}
