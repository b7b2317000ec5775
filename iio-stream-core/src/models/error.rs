use thiserror::Error;

/// Errors that can occur while configuring or streaming an IIO device.
///
/// Library failures carry the negative errno libiio returned.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StreamError {
    #[error("no IIO context: {0}")]
    ContextUnavailable(String),

    #[error("no devices in IIO context")]
    NoDevices,

    #[error("device not found: {0}")]
    DeviceNotFound(String),

    #[error("channel {channel} not found on {device}")]
    ChannelNotFound { device: String, channel: String },

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),

    #[error("error {code} reading attribute \"{attr}\", value may not be supported")]
    AttributeRead { attr: String, code: i32 },

    #[error("error {code} writing attribute \"{attr}\"")]
    AttributeWrite { attr: String, code: i32 },

    #[error("register 0x{address:x} access failed: error {code}")]
    Register { address: u32, code: i32 },

    #[error("could not create buffer: error {0}")]
    BufferCreate(i32),

    #[error("error refilling buffer: {0}")]
    Refill(i32),

    #[error("error pushing buffer: {0}")]
    Push(i32),

    #[error("signal handler: {0}")]
    Signal(String),

    #[error("storage error: {0}")]
    StorageError(String),
}

impl StreamError {
    /// Whether the error comes from looking up the context, a device or a
    /// channel, rather than from using them.
    pub fn is_lookup(&self) -> bool {
        matches!(
            self,
            Self::ContextUnavailable(_)
                | Self::NoDevices
                | Self::DeviceNotFound(_)
                | Self::ChannelNotFound { .. }
        )
    }
}
