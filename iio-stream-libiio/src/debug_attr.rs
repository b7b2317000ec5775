//! Debug attributes (`/sys/kernel/debug/iio/...`), which `industrial_io`
//! does not expose. Written through a second raw libiio context on the same
//! URI, opened on first use.

use std::ffi::CString;
use std::io;

use libiio_sys as ffi;

use iio_stream_core::models::error::StreamError;

use crate::errno::{check_len, context_error};

fn c_string(s: &str) -> Result<CString, StreamError> {
    CString::new(s).map_err(|_| StreamError::ConfigurationFailed(format!("invalid name: {:?}", s)))
}

pub struct DebugAttrs {
    ctx: *mut ffi::iio_context,
}

impl DebugAttrs {
    pub fn open(uri: Option<&str>) -> Result<Self, StreamError> {
        let ctx = match uri {
            Some(uri) => {
                let c_uri = c_string(uri)?;
                unsafe { ffi::iio_create_context_from_uri(c_uri.as_ptr()) }
            }
            None => unsafe { ffi::iio_create_default_context() },
        };
        if ctx.is_null() {
            return Err(context_error(&io::Error::last_os_error()));
        }
        Ok(Self { ctx })
    }

    /// Writes `value` to the debug attribute `attr` of `device`.
    pub fn write(&self, device: &str, attr: &str, value: &str) -> Result<(), StreamError> {
        let c_device = c_string(device)?;
        let c_attr = c_string(attr)?;
        let c_value = c_string(value)?;

        // SAFETY: `ctx` is live until drop; the device belongs to it.
        let dev = unsafe { ffi::iio_context_find_device(self.ctx, c_device.as_ptr()) };
        if dev.is_null() {
            return Err(StreamError::DeviceNotFound(device.to_string()));
        }
        let ret = unsafe { ffi::iio_device_debug_attr_write(dev, c_attr.as_ptr(), c_value.as_ptr()) };
        check_len(ret as isize, |code| StreamError::AttributeWrite { attr: attr.to_string(), code }).map(|_| ())
    }
}

impl Drop for DebugAttrs {
    fn drop(&mut self) {
        unsafe { ffi::iio_context_destroy(self.ctx) };
    }
}
