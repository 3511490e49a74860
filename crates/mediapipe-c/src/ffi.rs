//! The `mp_*` C ABI
//!
//! # Memory Ownership Rules
//!
//! - Builders, instances, pollers and packets are boxed on the Rust heap and
//!   released with their matching `mp_destroy_*` function.
//! - `mp_create_instance` consumes the builder's contents; the builder itself
//!   must still be destroyed.
//! - `mp_add_side_packet` and `mp_process` take ownership of the packet, even
//!   when they fail.
//! - Packets from `mp_poll_packet`, lists from the `mp_get_*` accessors and
//!   strings from `mp_get_packet_type` / `mp_get_last_error` are owned by the
//!   caller.
//!
//! # Errors
//!
//! Functions returning pointers return NULL on failure, boolean functions
//! return false. Either way the reason is available from
//! `mp_get_last_error`.
//!
//! # Safety
//!
//! All functions check for NULL handles. Non-null pointers must come from
//! this library and must not be used after they are destroyed.
//!
//! Builders, `mp_create_poller` and `mp_start` need exclusive use of their
//! handle. `mp_process`, `mp_wait_until_idle`, `mp_get_queue_size`,
//! `mp_poll_packet` and the packet accessors only borrow it and may be
//! called from several threads at once.

use std::os::raw::{c_char, c_int};
use std::ptr;
use std::slice;

use mediapipe_core::{
    logging, resources, Error, ImageFormat, ImageFrame, Instance, InstanceBuilder, Packet, Poller,
    Result,
};
use mediapipe_ffi_common::{cstr_to_str, cstring_new_or_empty, len_to_c_int};
use tracing::info;

use crate::error::set_last_error;
use crate::types::{ImageC, LandmarkListC, MultiFaceLandmarkListC, RectListC};

/// Borrow a C string argument, recording a last error if it is unusable.
unsafe fn str_arg<'a>(ptr: *const c_char, name: &str) -> Option<&'a str> {
    match unsafe { cstr_to_str(ptr) } {
        Ok(s) => Some(s),
        Err(reason) => {
            set_last_error(format!("{}: {}", name, reason));
            None
        }
    }
}

/// Borrow a C string argument of a builder setter. A bad argument is also
/// recorded on the builder so `mp_create_instance` fails.
unsafe fn setter_arg<'a>(
    builder: &mut InstanceBuilder,
    ptr: *const c_char,
    name: &str,
) -> Option<&'a str> {
    match unsafe { cstr_to_str(ptr) } {
        Ok(s) => Some(s),
        Err(reason) => {
            let err = Error::InvalidArgument(format!("{}: {}", name, reason));
            set_last_error(&err);
            builder.defer_error(err);
            None
        }
    }
}

/// Borrow a handle exclusively, recording a last error if it is NULL.
///
/// Only for calls that mutate the handle and are not made concurrently.
unsafe fn handle<'a, T>(ptr: *mut T, name: &str) -> Option<&'a mut T> {
    if ptr.is_null() {
        set_last_error(format!("null {}", name));
        return None;
    }
    Some(unsafe { &mut *ptr })
}

/// Borrow a handle shared, recording a last error if it is NULL.
///
/// Instances, pollers and packets may be used from several threads at once.
unsafe fn handle_ref<'a, T>(ptr: *const T, name: &str) -> Option<&'a T> {
    if ptr.is_null() {
        set_last_error(format!("null {}", name));
        return None;
    }
    Some(unsafe { &*ptr })
}

/// Run `read` on a packet, turning errors into `fallback` plus a last error.
fn read_packet<T>(packet: *const Packet, fallback: T, read: impl FnOnce(&Packet) -> Result<T>) -> T {
    let Some(packet) = (unsafe { handle_ref(packet, "packet") }) else {
        return fallback;
    };
    match read(packet) {
        Ok(value) => value,
        Err(err) => {
            set_last_error(err);
            fallback
        }
    }
}

/// Take ownership of a packet passed in by the caller.
unsafe fn take_packet(packet: *mut Packet) -> Option<Packet> {
    if packet.is_null() {
        set_last_error("null packet");
        return None;
    }
    Some(*unsafe { Box::from_raw(packet) })
}

fn boxed<T>(result: Result<T>) -> *mut T {
    match result {
        Ok(value) => Box::into_raw(Box::new(value)),
        Err(err) => {
            set_last_error(err);
            ptr::null_mut()
        }
    }
}

fn succeeded(result: Result<()>) -> bool {
    match result {
        Ok(()) => true,
        Err(err) => {
            set_last_error(err);
            false
        }
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Create a builder for the graph in `graph_filename`, fed through
/// `input_stream`.
///
/// # Returns
/// Builder pointer, or NULL if either argument is not a valid string.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn mp_create_instance_builder(
    graph_filename: *const c_char,
    input_stream: *const c_char,
) -> *mut InstanceBuilder {
    logging::init();
    let Some(graph_filename) = (unsafe { str_arg(graph_filename, "graph_filename") }) else {
        return ptr::null_mut();
    };
    let Some(input_stream) = (unsafe { str_arg(input_stream, "input_stream") }) else {
        return ptr::null_mut();
    };
    Box::into_raw(Box::new(InstanceBuilder::new(graph_filename, input_stream)))
}

mediapipe_ffi_common::define_handle_free!(mp_destroy_instance_builder, InstanceBuilder);

/// Override a numeric option. Unknown nodes or options, and invalid
/// arguments, are reported by `mp_create_instance`.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn mp_add_option_float(
    instance_builder: *mut InstanceBuilder,
    node: *const c_char,
    option: *const c_char,
    value: f32,
) {
    mp_add_option_double(instance_builder, node, option, value as f64);
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn mp_add_option_double(
    instance_builder: *mut InstanceBuilder,
    node: *const c_char,
    option: *const c_char,
    value: f64,
) {
    let Some(builder) = (unsafe { handle(instance_builder, "instance builder") }) else {
        return;
    };
    let Some(node) = (unsafe { setter_arg(builder, node, "node") }) else {
        return;
    };
    let Some(option) = (unsafe { setter_arg(builder, option, "option") }) else {
        return;
    };
    builder.add_option_double(node, option, value);
}

/// Add a side packet. The builder takes ownership of `packet`.
///
/// Invalid arguments are reported by `mp_create_instance`.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn mp_add_side_packet(
    instance_builder: *mut InstanceBuilder,
    name: *const c_char,
    packet: *mut Packet,
) {
    let packet = unsafe { take_packet(packet) };
    let Some(builder) = (unsafe { handle(instance_builder, "instance builder") }) else {
        return;
    };
    let Some(name) = (unsafe { setter_arg(builder, name, "name") }) else {
        return;
    };
    match packet {
        Some(packet) => {
            builder.add_side_packet(name, packet);
        }
        None => {
            builder.defer_error(Error::InvalidArgument(format!(
                "side packet {}: null packet",
                name
            )));
        }
    }
}

// ============================================================================
// Instance
// ============================================================================

/// Load and validate the builder's graph.
///
/// The builder is left empty but must still be destroyed.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn mp_create_instance(builder: *mut InstanceBuilder) -> *mut Instance {
    let Some(builder) = (unsafe { handle(builder, "instance builder") }) else {
        return ptr::null_mut();
    };
    boxed(std::mem::take(builder).build())
}

/// Attach a poller to `output_stream`. Only valid before `mp_start`.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn mp_create_poller(
    instance: *mut Instance,
    output_stream: *const c_char,
) -> *mut Poller {
    let Some(instance) = (unsafe { handle(instance, "instance") }) else {
        return ptr::null_mut();
    };
    let Some(output_stream) = (unsafe { str_arg(output_stream, "output_stream") }) else {
        return ptr::null_mut();
    };
    boxed(instance.create_poller(output_stream))
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn mp_start(instance: *mut Instance) -> bool {
    let Some(instance) = (unsafe { handle(instance, "instance") }) else {
        return false;
    };
    succeeded(instance.start())
}

/// Queue `packet` on the input stream at the next timestamp. Takes ownership
/// of `packet`; does not wait for it to be processed.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn mp_process(instance: *mut Instance, packet: *mut Packet) -> bool {
    let Some(packet) = (unsafe { take_packet(packet) }) else {
        return false;
    };
    let Some(instance) = (unsafe { handle_ref(instance, "instance") }) else {
        return false;
    };
    succeeded(instance.process(packet).map(|_| ()))
}

/// Block until every queued packet has been processed.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn mp_wait_until_idle(instance: *mut Instance) -> bool {
    let Some(instance) = (unsafe { handle_ref(instance, "instance") }) else {
        return false;
    };
    succeeded(instance.wait_until_idle())
}

/// Number of packets waiting in `poller`, or -1 for a NULL poller.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn mp_get_queue_size(poller: *mut Poller) -> c_int {
    match unsafe { handle_ref(poller, "poller") } {
        Some(poller) => len_to_c_int(poller.queue_size()),
        None => -1,
    }
}

mediapipe_ffi_common::define_handle_free!(mp_destroy_poller, Poller);

/// Close the graph and free the instance.
///
/// Returns false if the graph failed at any point. NULL is a no-op.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn mp_destroy_instance(instance: *mut Instance) -> bool {
    if instance.is_null() {
        return true;
    }
    let instance = unsafe { Box::from_raw(instance) };
    succeeded(instance.close())
}

/// Root relative resource paths at `dir`. Ignored on Android, where
/// resources come from the APK.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn mp_set_resource_dir(dir: *const c_char) {
    if let Some(dir) = unsafe { str_arg(dir, "dir") } {
        info!("resource directory: {}", dir);
        resources::set_resource_dir(dir);
    }
}

// ============================================================================
// Packets
// ============================================================================

#[no_mangle]
pub extern "C" fn mp_create_packet_int(value: c_int) -> *mut Packet {
    Box::into_raw(Box::new(Packet::int(value)))
}

#[no_mangle]
pub extern "C" fn mp_create_packet_float(value: f32) -> *mut Packet {
    Box::into_raw(Box::new(Packet::float(value)))
}

#[no_mangle]
pub extern "C" fn mp_create_packet_bool(value: bool) -> *mut Packet {
    Box::into_raw(Box::new(Packet::bool(value)))
}

fn image_from_c(image: &ImageC) -> Result<ImageFrame> {
    let format = ImageFormat::from_raw(image.format)
        .ok_or_else(|| Error::UnsupportedFormat(format!("image format {}", image.format)))?;
    let (width, height) = match (u32::try_from(image.width), u32::try_from(image.height)) {
        (Ok(w), Ok(h)) if w > 0 && h > 0 => (w, h),
        _ => {
            return Err(Error::InvalidImage(format!(
                "invalid dimensions {}x{}",
                image.width, image.height
            )))
        }
    };
    if image.data.is_null() {
        return Err(Error::InvalidImage("null pixel data".to_string()));
    }
    let size = format.frame_size(width, height)?;
    let pixels = unsafe { slice::from_raw_parts(image.data, size) };
    ImageFrame::from_slice(format, width, height, pixels)
}

/// Create an image packet. The pixels are copied; `image.data` must hold
/// `width * height` pixels of `image.format`.
#[no_mangle]
pub extern "C" fn mp_create_packet_image(image: ImageC) -> *mut Packet {
    boxed(image_from_c(&image).map(Packet::image))
}

/// Block until `poller` has a packet and return it.
///
/// Returns NULL once the instance is gone or its graph failed and the queue
/// is drained.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn mp_poll_packet(poller: *mut Poller) -> *mut Packet {
    let Some(poller) = (unsafe { handle_ref(poller, "poller") }) else {
        return ptr::null_mut();
    };
    boxed(poller.poll())
}

mediapipe_ffi_common::define_handle_free!(mp_destroy_packet, Packet);

/// Type name of the packet's payload. Free with `mp_free_packet_type`.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn mp_get_packet_type(packet: *mut Packet) -> *const c_char {
    read_packet(packet, ptr::null(), |p| Ok(cstring_new_or_empty(p.type_name()) as *const c_char))
}

mediapipe_ffi_common::define_string_free!(mp_free_packet_type);

/// Copy the image's pixels into `out_data`, which must hold
/// `width * height * pixel size` bytes.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn mp_copy_packet_image(packet: *mut Packet, out_data: *mut u8) {
    read_packet(packet, (), |p| {
        let frame = p.get_image()?;
        if out_data.is_null() {
            return Err(Error::InvalidImage("null output buffer".to_string()));
        }
        let out = unsafe { slice::from_raw_parts_mut(out_data, frame.pixels().len()) };
        frame.copy_to(out)
    });
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn mp_packet_get_bool(packet: *mut Packet) -> bool {
    read_packet(packet, false, Packet::get_bool)
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn mp_packet_get_int(packet: *mut Packet) -> c_int {
    read_packet(packet, 0, Packet::get_int)
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn mp_packet_get_float(packet: *mut Packet) -> f32 {
    read_packet(packet, 0.0, Packet::get_float)
}

// ============================================================================
// Landmarks and rects
// ============================================================================

/// Landmark lists of every detected face or hand.
/// Free with `mp_destroy_multi_face_landmarks`.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn mp_get_multi_face_landmarks(packet: *mut Packet) -> *mut MultiFaceLandmarkListC {
    read_packet(packet, ptr::null_mut(), |p| {
        let lists = p.get_multi_landmarks()?;
        let c_lists = MultiFaceLandmarkListC::from_lists(lists.iter().map(|l| l.landmarks.as_slice()));
        Ok(Box::into_raw(Box::new(c_lists)))
    })
}

/// Normalized variant of [`mp_get_multi_face_landmarks`].
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn mp_get_norm_multi_face_landmarks(
    packet: *mut Packet,
) -> *mut MultiFaceLandmarkListC {
    read_packet(packet, ptr::null_mut(), |p| {
        let lists = p.get_multi_norm_landmarks()?;
        let c_lists = MultiFaceLandmarkListC::from_lists(lists.iter().map(|l| l.landmarks.as_slice()));
        Ok(Box::into_raw(Box::new(c_lists)))
    })
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn mp_destroy_multi_face_landmarks(multi_face_landmarks: *mut MultiFaceLandmarkListC) {
    if multi_face_landmarks.is_null() {
        return;
    }
    let mut lists = unsafe { Box::from_raw(multi_face_landmarks) };
    unsafe { lists.release() };
}

/// Free with `mp_destroy_landmarks`.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn mp_get_landmarks(packet: *mut Packet) -> *mut LandmarkListC {
    read_packet(packet, ptr::null_mut(), |p| {
        let list = p.get_landmarks()?;
        Ok(Box::into_raw(Box::new(LandmarkListC::from_landmarks(&list.landmarks))))
    })
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn mp_get_norm_landmarks(packet: *mut Packet) -> *mut LandmarkListC {
    read_packet(packet, ptr::null_mut(), |p| {
        let list = p.get_norm_landmarks()?;
        Ok(Box::into_raw(Box::new(LandmarkListC::from_landmarks(&list.landmarks))))
    })
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn mp_destroy_landmarks(landmarks: *mut LandmarkListC) {
    if landmarks.is_null() {
        return;
    }
    let mut list = unsafe { Box::from_raw(landmarks) };
    unsafe { list.release() };
}

/// Free with `mp_destroy_rects`.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn mp_get_rects(packet: *mut Packet) -> *mut RectListC {
    read_packet(packet, ptr::null_mut(), |p| {
        Ok(Box::into_raw(Box::new(RectListC::from_rects(p.get_rects()?))))
    })
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn mp_get_norm_rects(packet: *mut Packet) -> *mut RectListC {
    read_packet(packet, ptr::null_mut(), |p| {
        Ok(Box::into_raw(Box::new(RectListC::from_rects(p.get_norm_rects()?))))
    })
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn mp_destroy_rects(list: *mut RectListC) {
    if list.is_null() {
        return;
    }
    let mut rects = unsafe { Box::from_raw(list) };
    unsafe { rects.release() };
}
