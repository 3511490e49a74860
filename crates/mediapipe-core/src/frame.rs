//! Image frames
//!
//! Pixel data is stored contiguously (no row padding), so the byte size is
//! always `width * height * pixel_size`.

use std::fmt;

use image::{imageops, DynamicImage, ImageBuffer, Luma, Pixel, Rgb, Rgba};

use crate::error::{Error, Result};
use crate::format::ImageFormat;

/// Geometric transforms supported on 8-bit frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    FlipHorizontal,
    FlipVertical,
    /// Clockwise, like the other rotations.
    Rotate90,
    Rotate180,
    Rotate270,
}

/// An owned, interleaved image.
#[derive(Clone, PartialEq)]
pub struct ImageFrame {
    format: ImageFormat,
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl ImageFrame {
    /// Wrap an owned pixel buffer. The buffer must match the dimensions exactly.
    pub fn new(format: ImageFormat, width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidImage(format!(
                "dimensions must be positive, got {}x{}",
                width, height
            )));
        }
        let expected = format.frame_size(width, height)?;
        if pixels.len() != expected {
            return Err(Error::InvalidImage(format!(
                "{} {}x{} needs {} bytes, got {}",
                format.name(),
                width,
                height,
                expected,
                pixels.len()
            )));
        }
        Ok(Self {
            format,
            width,
            height,
            pixels,
        })
    }

    /// Copy pixels out of a borrowed buffer. Extra trailing bytes are ignored.
    pub fn from_slice(format: ImageFormat, width: u32, height: u32, data: &[u8]) -> Result<Self> {
        let expected = format.frame_size(width, height)?;
        if data.len() < expected {
            return Err(Error::InvalidImage(format!(
                "{} {}x{} needs {} bytes, got {}",
                format.name(),
                width,
                height,
                expected,
                data.len()
            )));
        }
        Self::new(format, width, height, data[..expected].to_vec())
    }

    /// Convert a decoded image into a frame of the requested format.
    pub fn from_dynamic(image: DynamicImage, format: ImageFormat) -> Result<Self> {
        let (width, height) = (image.width(), image.height());
        let pixels = match format {
            ImageFormat::Srgb => image.to_rgb8().into_raw(),
            ImageFormat::Srgba => image.to_rgba8().into_raw(),
            ImageFormat::Gray8 => image.to_luma8().into_raw(),
            other => return Err(Error::UnsupportedFormat(other.name().to_string())),
        };
        Self::new(format, width, height, pixels)
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    /// Copy the pixels into `out`, which must hold at least the frame size.
    pub fn copy_to(&self, out: &mut [u8]) -> Result<()> {
        let len = self.pixels.len();
        if out.len() < len {
            return Err(Error::InvalidImage(format!(
                "output buffer holds {} bytes, frame needs {}",
                out.len(),
                len
            )));
        }
        out[..len].copy_from_slice(&self.pixels);
        Ok(())
    }

    /// Apply a transform, producing a new frame.
    pub fn transform(&self, transform: Transform) -> Result<Self> {
        match self.format {
            ImageFormat::Gray8 => self.transform_with::<Luma<u8>>(transform),
            ImageFormat::Srgb | ImageFormat::Lab8 => self.transform_with::<Rgb<u8>>(transform),
            ImageFormat::Srgba | ImageFormat::Sbgra => self.transform_with::<Rgba<u8>>(transform),
            other => Err(Error::UnsupportedFormat(other.name().to_string())),
        }
    }

    // Channel order is irrelevant to the geometric ops, so LAB and BGRA reuse
    // the RGB/RGBA pixel types.
    fn transform_with<P>(&self, transform: Transform) -> Result<Self>
    where
        P: Pixel<Subpixel = u8> + 'static,
    {
        let buffer: ImageBuffer<P, Vec<u8>> =
            ImageBuffer::from_raw(self.width, self.height, self.pixels.clone()).ok_or_else(
                || Error::InvalidImage("pixel buffer does not match dimensions".to_string()),
            )?;

        let out = match transform {
            Transform::FlipHorizontal => imageops::flip_horizontal(&buffer),
            Transform::FlipVertical => imageops::flip_vertical(&buffer),
            Transform::Rotate90 => imageops::rotate90(&buffer),
            Transform::Rotate180 => imageops::rotate180(&buffer),
            Transform::Rotate270 => imageops::rotate270(&buffer),
        };

        let (width, height) = out.dimensions();
        Self::new(self.format, width, height, out.into_raw())
    }
}

impl fmt::Debug for ImageFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageFrame")
            .field("format", &self.format)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gray_2x2() -> ImageFrame {
        ImageFrame::new(ImageFormat::Gray8, 2, 2, vec![1, 2, 3, 4]).unwrap()
    }

    #[test]
    fn test_size_validation() {
        assert!(ImageFrame::new(ImageFormat::Srgb, 2, 2, vec![0; 11]).is_err());
        assert!(ImageFrame::new(ImageFormat::Srgb, 0, 2, vec![]).is_err());
        assert!(ImageFrame::new(ImageFormat::Srgb, 2, 2, vec![0; 12]).is_ok());
    }

    #[test]
    fn test_from_slice_ignores_trailing_bytes() {
        let frame = ImageFrame::from_slice(ImageFormat::Gray8, 2, 1, &[9, 8, 7]).unwrap();
        assert_eq!(frame.pixels(), &[9, 8]);
        assert!(ImageFrame::from_slice(ImageFormat::Gray8, 2, 2, &[1]).is_err());
    }

    #[test]
    fn test_flips() {
        let frame = gray_2x2();
        let h = frame.transform(Transform::FlipHorizontal).unwrap();
        assert_eq!(h.pixels(), &[2, 1, 4, 3]);
        let v = frame.transform(Transform::FlipVertical).unwrap();
        assert_eq!(v.pixels(), &[3, 4, 1, 2]);
    }

    #[test]
    fn test_rotate90_swaps_dimensions() {
        let frame =
            ImageFrame::new(ImageFormat::Srgb, 3, 1, vec![1, 1, 1, 2, 2, 2, 3, 3, 3]).unwrap();
        let rotated = frame.transform(Transform::Rotate90).unwrap();
        assert_eq!((rotated.width(), rotated.height()), (1, 3));
        assert_eq!(rotated.pixels(), &[1, 1, 1, 2, 2, 2, 3, 3, 3]);

        let back = rotated.transform(Transform::Rotate270).unwrap();
        assert_eq!(back, frame);
    }

    #[test]
    fn test_transform_rejects_wide_formats() {
        let frame = ImageFrame::new(ImageFormat::Gray16, 1, 1, vec![0, 0]).unwrap();
        assert!(matches!(
            frame.transform(Transform::FlipVertical),
            Err(Error::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_copy_to() {
        let frame = gray_2x2();
        let mut out = [0u8; 5];
        frame.copy_to(&mut out).unwrap();
        assert_eq!(out, [1, 2, 3, 4, 0]);
        assert!(frame.copy_to(&mut [0u8; 3]).is_err());
    }
}
