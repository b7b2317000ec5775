pub mod ad4630;
pub mod adc;
pub mod adrv9002;
