use super::{Calculator, CalculatorContext, CalculatorRegistration};
use crate::error::Result;
use crate::frame::Transform;
use crate::packet::Packet;

/// Rotates and flips `IMAGE` frames.
///
/// Options: `rotation_degrees` (counter-clockwise, multiple of 90, applied
/// first), `flip_horizontally`, `flip_vertically`.
#[derive(Debug, Default)]
pub struct ImageTransformationCalculator {
    steps: Vec<Transform>,
}

impl ImageTransformationCalculator {
    pub const REGISTRATION: CalculatorRegistration = CalculatorRegistration {
        name: "ImageTransformationCalculator",
        options: &["rotation_degrees", "flip_horizontally", "flip_vertically"],
        create: Self::boxed,
    };

    fn boxed() -> Box<dyn Calculator> {
        Box::new(Self::default())
    }
}

impl Calculator for ImageTransformationCalculator {
    fn open(&mut self, cx: &mut CalculatorContext<'_>) -> Result<()> {
        cx.require_input("IMAGE")?;
        cx.require_output("IMAGE")?;

        let options = cx.options();
        let degrees = options.f64_or("rotation_degrees", 0.0);
        if degrees.fract() != 0.0 || (degrees as i64) % 90 != 0 {
            return Err(cx.error(format!(
                "rotation_degrees must be a multiple of 90, got {}",
                degrees
            )));
        }

        self.steps.clear();
        // frame rotations turn clockwise
        match (degrees as i64).rem_euclid(360) {
            90 => self.steps.push(Transform::Rotate270),
            180 => self.steps.push(Transform::Rotate180),
            270 => self.steps.push(Transform::Rotate90),
            _ => {}
        }
        if options.bool_or("flip_horizontally", false) {
            self.steps.push(Transform::FlipHorizontal);
        }
        if options.bool_or("flip_vertically", false) {
            self.steps.push(Transform::FlipVertical);
        }
        Ok(())
    }

    fn process(&mut self, cx: &mut CalculatorContext<'_>) -> Result<()> {
        let Some(packet) = cx.input("IMAGE").cloned() else {
            return Ok(());
        };
        if self.steps.is_empty() {
            return cx.output("IMAGE", packet);
        }

        let mut frame = packet.get_image()?.clone();
        for step in &self.steps {
            frame = frame.transform(*step)?;
        }
        cx.output("IMAGE", Packet::image(frame))
    }
}
