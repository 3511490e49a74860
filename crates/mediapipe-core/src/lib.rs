//! MediaPipe-style graph runtime
//!
//! Graphs of calculators connected by timestamped packet streams, plus the
//! packet payload types the C library exposes.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐ build ┌──────────┐ process ┌──────────────┐ poll ┌─────────┐
//! │InstanceBuilder│─────▶│ Instance │───────▶│ graph worker │────▶│ Poller  │
//! │ (graph JSON)  │      │          │        │ (calculators)│     │(per out)│
//! └──────────────┘       └──────────┘        └──────────────┘     └─────────┘
//! ```
//!
//! ## Usage
//!
//! ```no_run
//! use mediapipe_core::{ImageFormat, ImageFrame, InstanceBuilder};
//!
//! let mut instance = InstanceBuilder::new("flip.json", "input_video").build()?;
//! let poller = instance.create_poller("output_video")?;
//! instance.start()?;
//!
//! let frame = ImageFrame::new(ImageFormat::Srgb, 2, 2, vec![0; 12])?;
//! instance.process(frame)?;
//! instance.wait_until_idle()?;
//! let flipped = poller.poll()?;
//! println!("{:?}", flipped.get_image()?);
//! instance.close()?;
//! # Ok::<(), mediapipe_core::Error>(())
//! ```

pub mod calculators;
pub mod config;
pub mod logging;
pub mod resources;

mod builder;
mod error;
mod format;
mod frame;
mod graph;
mod instance;
mod landmark;
mod packet;
mod rect;
mod runner;

pub use builder::InstanceBuilder;
pub use error::{Error, Result};
pub use format::ImageFormat;
pub use frame::{ImageFrame, Transform};
pub use graph::OptionOverride;
pub use instance::{Instance, Poller};
pub use landmark::{HandLandmark, Landmark, LandmarkList, NormalizedLandmarkList, PoseLandmark};
pub use packet::{type_name, Packet, PacketValue, Timestamp};
pub use rect::Rect;

pub use config::GraphConfig;
