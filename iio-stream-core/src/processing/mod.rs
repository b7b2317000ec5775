pub mod modes_register;
pub mod sample_unpack;
pub mod tx_waveform;
