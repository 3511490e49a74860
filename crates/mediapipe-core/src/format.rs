//! Image formats
//!
//! Discriminants match `mp_image_format` in the C header, including the
//! out-of-sequence `Vec32F2 = 12`.

use crate::error::{Error, Result};

/// Pixel layout of an image frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(i32)]
pub enum ImageFormat {
    #[default]
    Unknown = 0,
    /// RGB, 8 bits per channel
    Srgb = 1,
    /// RGBA, 8 bits per channel
    Srgba = 2,
    /// Grayscale, 8 bits
    Gray8 = 3,
    /// Grayscale, 16 bits
    Gray16 = 4,
    /// Planar YCbCr 4:2:0, 8 bits
    Ycbcr420p = 5,
    /// Planar YCbCr 4:2:0, 10 bits in 16-bit words
    Ycbcr420p10 = 6,
    /// RGB, 16 bits per channel
    Srgb48 = 7,
    /// RGBA, 16 bits per channel
    Srgba64 = 8,
    /// One 32-bit float channel
    Vec32F1 = 9,
    /// LAB, 8 bits per channel
    Lab8 = 10,
    /// BGRA, 8 bits per channel
    Sbgra = 11,
    /// Two 32-bit float channels
    Vec32F2 = 12,
}

impl ImageFormat {
    /// Map a raw C value to a format.
    pub fn from_raw(value: i32) -> Option<Self> {
        let format = match value {
            0 => Self::Unknown,
            1 => Self::Srgb,
            2 => Self::Srgba,
            3 => Self::Gray8,
            4 => Self::Gray16,
            5 => Self::Ycbcr420p,
            6 => Self::Ycbcr420p10,
            7 => Self::Srgb48,
            8 => Self::Srgba64,
            9 => Self::Vec32F1,
            10 => Self::Lab8,
            11 => Self::Sbgra,
            12 => Self::Vec32F2,
            _ => return None,
        };
        Some(format)
    }

    pub fn as_raw(self) -> i32 {
        self as i32
    }

    /// Lower-case name used in graph options and log lines.
    pub fn name(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Srgb => "srgb",
            Self::Srgba => "srgba",
            Self::Gray8 => "gray8",
            Self::Gray16 => "gray16",
            Self::Ycbcr420p => "ycbcr420p",
            Self::Ycbcr420p10 => "ycbcr420p10",
            Self::Srgb48 => "srgb48",
            Self::Srgba64 => "srgba64",
            Self::Vec32F1 => "vec32f1",
            Self::Lab8 => "lab8",
            Self::Sbgra => "sbgra",
            Self::Vec32F2 => "vec32f2",
        }
    }

    /// Parse a format name as produced by [`ImageFormat::name`].
    pub fn from_name(name: &str) -> Option<Self> {
        (0..=12)
            .filter_map(Self::from_raw)
            .find(|format| format.name().eq_ignore_ascii_case(name))
    }

    /// Number of interleaved channels, `None` for formats that are not
    /// interleaved image frames.
    pub fn channels(self) -> Option<usize> {
        match self {
            Self::Gray8 | Self::Gray16 | Self::Vec32F1 => Some(1),
            Self::Vec32F2 => Some(2),
            Self::Srgb | Self::Srgb48 | Self::Lab8 => Some(3),
            Self::Srgba | Self::Srgba64 | Self::Sbgra => Some(4),
            Self::Unknown | Self::Ycbcr420p | Self::Ycbcr420p10 => None,
        }
    }

    /// Bytes per channel, `None` for formats that are not image frames.
    pub fn byte_depth(self) -> Option<usize> {
        match self {
            Self::Srgb | Self::Srgba | Self::Gray8 | Self::Lab8 | Self::Sbgra => Some(1),
            Self::Gray16 | Self::Srgb48 | Self::Srgba64 => Some(2),
            Self::Vec32F1 | Self::Vec32F2 => Some(4),
            Self::Unknown | Self::Ycbcr420p | Self::Ycbcr420p10 => None,
        }
    }

    /// Bytes per pixel.
    pub fn pixel_size(self) -> Result<usize> {
        match (self.channels(), self.byte_depth()) {
            (Some(channels), Some(depth)) => Ok(channels * depth),
            _ => Err(Error::UnsupportedFormat(self.name().to_string())),
        }
    }

    /// Contiguous buffer size for a frame of the given dimensions.
    pub fn frame_size(self, width: u32, height: u32) -> Result<usize> {
        let pixel = self.pixel_size()?;
        (width as usize)
            .checked_mul(height as usize)
            .and_then(|pixels| pixels.checked_mul(pixel))
            .ok_or_else(|| Error::InvalidImage(format!("{}x{} overflows", width, height)))
    }
}
