//! libiio reports failures as negative errno values, either returned
//! directly or carried by an `io::Error`.

use std::io;

use iio_stream_core::models::error::StreamError;

/// Fallback when the OS reports no errno.
pub const EIO: i32 = 5;

/// Negative errno of an OS error.
pub fn negative_code(err: &io::Error) -> i32 {
    -err.raw_os_error().unwrap_or(EIO).abs()
}

/// Error for a failed context creation, with the library's description.
pub fn context_error(err: &io::Error) -> StreamError {
    StreamError::ContextUnavailable(format!("{} (error {})", err, negative_code(err)))
}

/// Maps a returned byte count or status to `Ok(count)`, or to the error
/// `on_error` builds from the negative code.
pub fn check_len(ret: isize, on_error: impl FnOnce(i32) -> StreamError) -> Result<usize, StreamError> {
    if ret < 0 {
        Err(on_error(ret as i32))
    } else {
        Ok(ret as usize)
    }
}
