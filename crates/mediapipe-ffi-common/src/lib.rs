//! Common FFI utilities for the libmediapipe C interface.
//!
//! Shared helpers for moving strings, boxed handles and element buffers
//! across the `mp_*` boundary.
//!
//! # Memory Ownership
//!
//! - Functions returning `*mut c_char` transfer ownership to the caller
//! - Buffers produced by [`vec_into_raw`] are owned by the caller until they
//!   are handed back to [`free_boxed_slice`]
//! - NULL pointers are handled safely (no-op for free functions)

use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};
use std::ptr;

/// Convert a Rust string to a C string pointer, with a fallback on failure.
///
/// If the input contains null bytes, returns the fallback string instead.
/// The returned pointer is owned by the caller and must be freed.
///
/// # Example
/// ```
/// use mediapipe_ffi_common::{cstring_new_or_fallback, free_cstring};
///
/// let ptr = cstring_new_or_fallback("graph failed", "unknown error");
/// unsafe { free_cstring(ptr) };
/// ```
#[inline]
pub fn cstring_new_or_fallback(s: &str, fallback: &'static str) -> *mut c_char {
    CString::new(s)
        .unwrap_or_else(|_| CString::new(fallback).expect("fallback must be valid"))
        .into_raw()
}

/// Convert a Rust string to a C string pointer, using empty string as fallback.
#[inline]
pub fn cstring_new_or_empty(s: &str) -> *mut c_char {
    CString::new(s).unwrap_or_default().into_raw()
}

/// Safely free a C string pointer.
///
/// Does nothing if the pointer is null.
///
/// # Safety
/// The pointer must have been allocated by `CString::into_raw()` or be null.
#[inline]
pub unsafe fn free_cstring(ptr: *mut c_char) {
    if !ptr.is_null() {
        unsafe {
            let _ = CString::from_raw(ptr);
        }
    }
}

/// Safely free a boxed value.
///
/// Does nothing if the pointer is null.
///
/// # Safety
/// The pointer must have been allocated by `Box::into_raw()` or be null.
#[inline]
pub unsafe fn free_boxed<T>(ptr: *mut T) {
    if !ptr.is_null() {
        unsafe {
            let _ = Box::from_raw(ptr);
        }
    }
}

/// Free a boxed slice and its contents.
///
/// Does nothing if the pointer is null or length is zero.
///
/// # Safety
/// The pointer must have been allocated by `Box::into_raw(slice.into_boxed_slice())`.
#[inline]
pub unsafe fn free_boxed_slice<T>(ptr: *mut T, len: usize) {
    if !ptr.is_null() && len > 0 {
        unsafe {
            let _ = Box::from_raw(ptr::slice_from_raw_parts_mut(ptr, len));
        }
    }
}

/// Reclaim a buffer produced by [`vec_into_raw`] as an owned `Vec`.
///
/// Returns an empty vector for a null pointer or zero length.
///
/// # Safety
/// Same contract as [`free_boxed_slice`]; the buffer must not be used again.
#[inline]
pub unsafe fn vec_from_raw<T>(ptr: *mut T, len: usize) -> Vec<T> {
    if ptr.is_null() || len == 0 {
        return Vec::new();
    }
    unsafe { Box::from_raw(ptr::slice_from_raw_parts_mut(ptr, len)) }.into_vec()
}

/// Convert a boxed slice to a raw pointer and length.
///
/// Returns null pointer and 0 length for empty vectors.
/// The returned pointer is owned by the caller.
#[inline]
pub fn vec_into_raw<T>(vec: Vec<T>) -> (*mut T, usize) {
    let len = vec.len();
    if len == 0 {
        (ptr::null_mut(), 0)
    } else {
        (Box::into_raw(vec.into_boxed_slice()) as *mut T, len)
    }
}

/// Clamp a Rust length to the `int` length fields used by the C structs.
#[inline]
pub fn len_to_c_int(len: usize) -> c_int {
    c_int::try_from(len).unwrap_or(c_int::MAX)
}

/// Convert a C `int` length back to `usize`; negative lengths become 0.
#[inline]
pub fn c_int_to_len(len: c_int) -> usize {
    usize::try_from(len).unwrap_or(0)
}

/// Safely convert a C string pointer to a Rust string reference.
///
/// # Returns
/// `Ok(&str)` on success, `Err(&'static str)` with error message on failure.
///
/// # Safety
/// The pointer must be valid and null-terminated, or null.
pub unsafe fn cstr_to_str<'a>(ptr: *const c_char) -> Result<&'a str, &'static str> {
    if ptr.is_null() {
        return Err("null pointer");
    }
    unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .map_err(|_| "invalid UTF-8")
}

/// Generate a free function for a boxed handle type.
///
/// # Example
/// ```ignore
/// mediapipe_ffi_common::define_handle_free!(mp_destroy_packet, Packet);
/// // Expands to:
/// // #[no_mangle]
/// // #[allow(clippy::not_unsafe_ptr_arg_deref)]
/// // pub extern "C" fn mp_destroy_packet(ptr: *mut Packet) {
/// //     mediapipe_ffi_common::free_boxed(ptr);
/// // }
/// ```
#[macro_export]
macro_rules! define_handle_free {
    ($fn_name:ident, $handle_type:ty) => {
        #[no_mangle]
        #[allow(clippy::not_unsafe_ptr_arg_deref)]
        pub extern "C" fn $fn_name(ptr: *mut $handle_type) {
            unsafe { $crate::free_boxed(ptr) };
        }
    };
}

/// Generate a free function for strings handed out as `const char*`.
///
/// # Example
/// ```ignore
/// mediapipe_ffi_common::define_string_free!(mp_free_error);
/// ```
#[macro_export]
macro_rules! define_string_free {
    ($fn_name:ident) => {
        #[no_mangle]
        #[allow(clippy::not_unsafe_ptr_arg_deref)]
        pub extern "C" fn $fn_name(s: *const std::os::raw::c_char) {
            unsafe { $crate::free_cstring(s as *mut std::os::raw::c_char) };
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cstring_new_or_fallback() {
        let ptr = cstring_new_or_fallback("hello", "fallback");
        assert!(!ptr.is_null());
        let s = unsafe { CStr::from_ptr(ptr) }.to_str().unwrap();
        assert_eq!(s, "hello");
        unsafe { free_cstring(ptr) };
    }

    #[test]
    fn test_cstring_with_null_bytes_uses_fallback() {
        let ptr = cstring_new_or_fallback("hel\0lo", "fallback");
        let s = unsafe { CStr::from_ptr(ptr) }.to_str().unwrap();
        assert_eq!(s, "fallback");
        unsafe { free_cstring(ptr) };
    }

    #[test]
    fn test_cstring_new_or_empty_strips_on_nul() {
        let ptr = cstring_new_or_empty("a\0b");
        let s = unsafe { CStr::from_ptr(ptr) }.to_str().unwrap();
        assert_eq!(s, "");
        unsafe { free_cstring(ptr) };
    }

    #[test]
    fn test_free_null_is_safe() {
        unsafe {
            free_cstring(ptr::null_mut());
            free_boxed::<i32>(ptr::null_mut());
            free_boxed_slice::<f32>(ptr::null_mut(), 4);
        }
    }

    #[test]
    fn test_vec_into_raw_empty() {
        let (ptr, len): (*mut i32, usize) = vec_into_raw(Vec::new());
        assert!(ptr.is_null());
        assert_eq!(len, 0);
    }

    #[test]
    fn test_vec_raw_round_trip() {
        let (ptr, len) = vec_into_raw(vec![1i32, 2, 3]);
        assert!(!ptr.is_null());
        assert_eq!(len, 3);
        let back = unsafe { vec_from_raw(ptr, len) };
        assert_eq!(back, vec![1, 2, 3]);
    }

    #[test]
    fn test_length_conversions() {
        assert_eq!(len_to_c_int(7), 7);
        assert_eq!(len_to_c_int(usize::MAX), c_int::MAX);
        assert_eq!(c_int_to_len(-3), 0);
        assert_eq!(c_int_to_len(12), 12);
    }

    #[test]
    fn test_cstr_to_str_null() {
        let result = unsafe { cstr_to_str(ptr::null()) };
        assert_eq!(result.unwrap_err(), "null pointer");
    }

    #[test]
    fn test_cstr_to_str_valid() {
        let s = CString::new("input_video").unwrap();
        let result = unsafe { cstr_to_str(s.as_ptr()) };
        assert_eq!(result.unwrap(), "input_video");
    }
}
