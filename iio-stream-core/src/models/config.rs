use serde::de::DeserializeOwned;
use serde::Serialize;

/// Board configuration loadable from a JSON file.
///
/// Every field has a default taken from the hardware's reference setup, so a
/// file only needs to name what it changes.
pub trait BoardConfig: Default + Serialize + DeserializeOwned {
    fn validate(&self) -> Result<(), String>;
}

/// Name of the `index`-th voltage channel, e.g. `voltage4`.
pub fn voltage_channel(index: u32) -> String {
    format!("voltage{}", index)
}

/// Checks a channel index against the number of channels on the part.
pub fn validate_channel(index: u32, count: u32) -> Result<(), String> {
    if index >= count {
        return Err(format!(
            "channel {} out of range, device has {} channel(s)",
            index, count
        ));
    }
    Ok(())
}

/// Checks a buffer length in samples.
pub fn validate_buffer_length(samples: usize) -> Result<(), String> {
    if samples == 0 {
        return Err("buffer length must be positive".into());
    }
    Ok(())
}
