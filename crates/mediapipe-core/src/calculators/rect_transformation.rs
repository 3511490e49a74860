use super::{Calculator, CalculatorContext, CalculatorRegistration};
use crate::error::Result;
use crate::packet::{Packet, PacketValue};
use crate::rect::Rect;

/// Scales, shifts and optionally squares rect lists.
///
/// Streams: `NORM_RECTS` → `NORM_RECTS` or `RECTS` → `RECTS`. Shifts are in
/// units of the rect's own size and follow its rotation.
///
/// Normalized rects are measured against the frame on the optional `IMAGE`
/// input, so `square_long` and rotated shifts respect its aspect ratio.
/// Without it they are treated as if the frame were square.
#[derive(Debug, Clone, PartialEq)]
pub struct RectTransformationCalculator {
    scale_x: f32,
    scale_y: f32,
    shift_x: f32,
    shift_y: f32,
    square_long: bool,
}

impl Default for RectTransformationCalculator {
    fn default() -> Self {
        Self {
            scale_x: 1.0,
            scale_y: 1.0,
            shift_x: 0.0,
            shift_y: 0.0,
            square_long: false,
        }
    }
}

impl RectTransformationCalculator {
    pub const REGISTRATION: CalculatorRegistration = CalculatorRegistration {
        name: "RectTransformationCalculator",
        options: &["scale_x", "scale_y", "shift_x", "shift_y", "square_long"],
        create: Self::boxed,
    };

    fn boxed() -> Box<dyn Calculator> {
        Box::new(Self::default())
    }

    /// `frame` is the (width, height) the rect's units are relative to.
    fn transform(&self, rect: &Rect, frame: (f32, f32)) -> Rect {
        let (frame_w, frame_h) = frame;
        let mut out = *rect;

        if self.shift_x != 0.0 || self.shift_y != 0.0 {
            let dx = rect.width * frame_w * self.shift_x;
            let dy = rect.height * frame_h * self.shift_y;
            let (sin, cos) = rect.rotation.sin_cos();
            out.x_center += (dx * cos - dy * sin) / frame_w;
            out.y_center += (dx * sin + dy * cos) / frame_h;
        }

        if self.square_long {
            let long = (out.width * frame_w).max(out.height * frame_h);
            out.width = long / frame_w;
            out.height = long / frame_h;
        }

        out.width *= self.scale_x;
        out.height *= self.scale_y;
        out
    }
}

impl Calculator for RectTransformationCalculator {
    fn open(&mut self, cx: &mut CalculatorContext<'_>) -> Result<()> {
        let normalized = cx.has_input("NORM_RECTS") && cx.has_output("NORM_RECTS");
        let pixel = cx.has_input("RECTS") && cx.has_output("RECTS");
        if !normalized && !pixel {
            return Err(cx.error("requires NORM_RECTS or RECTS on both input and output"));
        }

        let options = cx.options();
        self.scale_x = options.f64_or("scale_x", 1.0) as f32;
        self.scale_y = options.f64_or("scale_y", 1.0) as f32;
        self.shift_x = options.f64_or("shift_x", 0.0) as f32;
        self.shift_y = options.f64_or("shift_y", 0.0) as f32;
        self.square_long = options.bool_or("square_long", false);
        Ok(())
    }

    fn process(&mut self, cx: &mut CalculatorContext<'_>) -> Result<()> {
        if let Some(packet) = cx.input("NORM_RECTS").cloned() {
            let frame = match cx.input("IMAGE") {
                Some(image) => {
                    let image = image.get_image()?;
                    (image.width() as f32, image.height() as f32)
                }
                None => (1.0, 1.0),
            };
            let rects = packet
                .get_norm_rects()?
                .iter()
                .map(|r| self.transform(r, frame))
                .collect();
            cx.output("NORM_RECTS", Packet::new(PacketValue::NormRects(rects)))?;
        }
        if let Some(packet) = cx.input("RECTS").cloned() {
            let rects = packet
                .get_rects()?
                .iter()
                .map(|r| self.transform(r, (1.0, 1.0)))
                .collect();
            cx.output("RECTS", Packet::new(PacketValue::Rects(rects)))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculators::testing::Harness;
    use crate::format::ImageFormat;
    use crate::frame::ImageFrame;
    use std::f32::consts::FRAC_PI_2;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn test_scale_and_square() {
        let calculator = RectTransformationCalculator {
            scale_x: 2.0,
            scale_y: 2.0,
            square_long: true,
            ..Default::default()
        };
        let out = calculator.transform(&Rect::new(0.5, 0.5, 0.1, 0.2).with_id(9), (1.0, 1.0));
        assert!(approx(out.width, 0.4));
        assert!(approx(out.height, 0.4));
        assert_eq!(out.id, 9);
    }

    #[test]
    fn test_shift_follows_rotation() {
        let calculator = RectTransformationCalculator {
            shift_y: -0.5,
            ..Default::default()
        };
        let upright = calculator.transform(&Rect::new(0.5, 0.5, 0.2, 0.2), (1.0, 1.0));
        assert!(approx(upright.y_center, 0.4));

        let rotated = calculator.transform(
            &Rect::new(0.5, 0.5, 0.2, 0.2).with_rotation(FRAC_PI_2),
            (1.0, 1.0),
        );
        assert!(approx(rotated.x_center, 0.6));
        assert!(approx(rotated.y_center, 0.5));
    }

    #[test]
    fn test_normalized_units_follow_frame_aspect() {
        let calculator = RectTransformationCalculator {
            square_long: true,
            shift_y: -0.5,
            ..Default::default()
        };
        // 0.5 x 0.5 of a 200x100 frame is 100x50 pixels
        let rect = Rect::new(0.5, 0.5, 0.5, 0.5).with_rotation(FRAC_PI_2);
        let out = calculator.transform(&rect, (200.0, 100.0));
        assert!(approx(out.width, 0.5));
        assert!(approx(out.height, 1.0));
        // 25 pixels to the right, measured in frame widths
        assert!(approx(out.x_center, 0.625));
        assert!(approx(out.y_center, 0.5));
    }

    #[test]
    fn test_processes_norm_rects() {
        let mut harness = Harness::new(&["NORM_RECTS"], &["NORM_RECTS"]);
        harness.options.set_number("scale_x", 3.0).unwrap();
        let mut calculator = RectTransformationCalculator::default();
        harness.open(&mut calculator).unwrap();

        let input = Packet::new(PacketValue::NormRects(vec![Rect::new(0.5, 0.5, 0.1, 0.1)]));
        let out = harness.process(&mut calculator, vec![Some(input)]).unwrap();
        let rects = out[0].1.get_norm_rects().unwrap();
        assert!(approx(rects[0].width, 0.3));
        assert!(approx(rects[0].height, 0.1));
    }

    #[test]
    fn test_reads_frame_size_from_image() {
        let mut harness = Harness::new(&["NORM_RECTS", "IMAGE"], &["NORM_RECTS"]);
        harness.options.set_number("square_long", 1.0).unwrap();
        let mut calculator = RectTransformationCalculator::default();
        harness.open(&mut calculator).unwrap();

        let rects = Packet::new(PacketValue::NormRects(vec![Rect::new(0.5, 0.5, 0.5, 0.5)]));
        let frame = ImageFrame::new(ImageFormat::Gray8, 4, 2, vec![0; 8]).unwrap();
        let out = harness
            .process(&mut calculator, vec![Some(rects), Some(Packet::image(frame))])
            .unwrap();
        let rects = out[0].1.get_norm_rects().unwrap();
        assert!(approx(rects[0].width, 0.5));
        assert!(approx(rects[0].height, 1.0));
    }

    #[test]
    fn test_requires_rect_streams() {
        let harness = Harness::new(&["IMAGE"], &["IMAGE"]);
        assert!(harness
            .open(&mut RectTransformationCalculator::default())
            .is_err());
    }
}
