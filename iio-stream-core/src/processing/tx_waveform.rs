//! TX waveform generation for the ADRV9002 DMA path.

use std::f64::consts::PI;

/// Entries in the sine lookup table.
pub const LUT_LENGTH: usize = 1024;

/// Full-scale amplitude of the table (about -10 dBFS of a 16-bit DAC).
const LUT_AMPLITUDE: f64 = 9830.0;

/// Samples per sine period.
const LUT_PERIOD: f64 = 128.0;

/// Packed IQ sine table: I in the high 16 bits, Q in the low 16 bits.
///
/// The table holds eight periods of a complex tone.
pub fn sine_lut_iq() -> Vec<u32> {
    (0..LUT_LENGTH)
        .map(|n| {
            let phase = 2.0 * PI * n as f64 / LUT_PERIOD;
            let i = (LUT_AMPLITUDE * phase.sin()) as i16;
            let q = (LUT_AMPLITUDE * phase.cos()) as i16;
            (u32::from(i as u16) << 16) | u32::from(q as u16)
        })
        .collect()
}

/// Splits a packed entry into its (I, Q) pair.
pub fn unpack_iq(entry: u32) -> (i16, i16) {
    ((entry >> 16) as u16 as i16, entry as u16 as i16)
}

/// I and Q sample vectors of `samples` length, cycling through the table.
pub fn fill_iq(samples: usize) -> (Vec<i16>, Vec<i16>) {
    let lut = sine_lut_iq();
    let mut i = Vec::with_capacity(samples);
    let mut q = Vec::with_capacity(samples);
    for entry in lut.iter().cycle().take(samples) {
        let (si, sq) = unpack_iq(*entry);
        i.push(si);
        q.push(sq);
    }
    (i, q)
}

/// Little-endian bytes of 16-bit samples, as the buffer stores them.
pub fn i16_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}
