//! libmediapipe C interface
//!
//! Exposes the graph runtime of `mediapipe-core` through the flat `mp_*` C
//! ABI declared in `mediapipe.h`, for hosts that cannot link Rust directly.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────┐    ┌────────────────┐    ┌───────────────┐
//! │ mp_* (C ABI)  │───▶│ mediapipe-core │───▶│ graph worker  │
//! │ boxed handles │    │ Instance/Poller│    │ (calculators) │
//! └───────────────┘    └────────────────┘    └───────────────┘
//! ```
//!
//! ## Usage from C
//!
//! ```c
//! mp_instance_builder* builder = mp_create_instance_builder("graph.json", "input_video");
//! mp_instance* instance = mp_create_instance(builder);
//! mp_destroy_instance_builder(builder);
//! if (!instance) {
//!     const char* error = mp_get_last_error();
//!     fprintf(stderr, "%s\n", error);
//!     mp_free_error(error);
//! }
//!
//! mp_poller* poller = mp_create_poller(instance, "output_video");
//! mp_start(instance);
//! mp_process(instance, mp_create_packet_image(image));
//! mp_wait_until_idle(instance);
//! if (mp_get_queue_size(poller) > 0) {
//!     mp_packet* packet = mp_poll_packet(poller);
//!     mp_copy_packet_image(packet, pixels);
//!     mp_destroy_packet(packet);
//! }
//! mp_destroy_poller(poller);
//! mp_destroy_instance(instance);
//! ```
//!
//! See [`ffi`] for the ownership rules.

pub mod error;
pub mod ffi;
pub mod types;

#[cfg(target_os = "android")]
pub mod android;

pub use error::take_last_error;
pub use types::{ImageC, LandmarkC, LandmarkListC, MultiFaceLandmarkListC, RectC, RectListC};

// Handle and enum types behind the C names
pub use mediapipe_core::{
    HandLandmark, ImageFormat, Instance, InstanceBuilder, Packet, PacketValue, Poller,
    PoseLandmark,
};
