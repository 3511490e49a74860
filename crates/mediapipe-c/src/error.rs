//! Process-wide last error.
//!
//! C callers learn why a call failed through `mp_get_last_error`. Each
//! failure overwrites the slot; reading it empties it.

use std::fmt::Display;
use std::os::raw::c_char;
use std::ptr;

use lazy_static::lazy_static;
use mediapipe_ffi_common::cstring_new_or_fallback;
use parking_lot::Mutex;
use tracing::debug;

lazy_static! {
    static ref LAST_ERROR: Mutex<Option<String>> = Mutex::new(None);
}

/// Record `err` as the last error.
pub(crate) fn set_last_error(err: impl Display) {
    let message = err.to_string();
    debug!("mp call failed: {}", message);
    *LAST_ERROR.lock() = Some(message);
}

/// Take the last error, leaving the slot empty.
pub fn take_last_error() -> Option<String> {
    LAST_ERROR.lock().take()
}

/// Returns the message of the most recent failure, or NULL if none was
/// recorded since the last read. Free with `mp_free_error`.
#[no_mangle]
pub extern "C" fn mp_get_last_error() -> *const c_char {
    match take_last_error() {
        Some(message) => cstring_new_or_fallback(&message, "unknown error"),
        None => ptr::null(),
    }
}

mediapipe_ffi_common::define_string_free!(mp_free_error);
