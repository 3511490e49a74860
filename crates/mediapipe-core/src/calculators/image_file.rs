use tracing::debug;

use super::{Calculator, CalculatorContext, CalculatorRegistration};
use crate::error::Result;
use crate::format::ImageFormat;
use crate::frame::ImageFrame;
use crate::packet::Packet;

/// Decodes the image resource named by the `file` option when the graph
/// starts and emits it on `IMAGE` for every `TICK`.
///
/// `format` selects the frame format (`srgb`, `srgba` or `gray8`, default
/// `srgba`).
#[derive(Debug, Default)]
pub struct ImageFileCalculator {
    image: Option<Packet>,
}

impl ImageFileCalculator {
    pub const REGISTRATION: CalculatorRegistration = CalculatorRegistration {
        name: "ImageFileCalculator",
        options: &["file", "format"],
        create: Self::boxed,
    };

    fn boxed() -> Box<dyn Calculator> {
        Box::new(Self::default())
    }
}

impl Calculator for ImageFileCalculator {
    fn open(&mut self, cx: &mut CalculatorContext<'_>) -> Result<()> {
        cx.require_input("TICK")?;
        cx.require_output("IMAGE")?;

        let file = cx
            .options()
            .get_str("file")
            .ok_or_else(|| cx.error("option file is required"))?;
        let format_name = cx.options().get_str("format").unwrap_or("srgba");
        let format = ImageFormat::from_name(format_name)
            .ok_or_else(|| cx.error(format!("unknown image format {}", format_name)))?;

        let bytes = cx.resources().read(file)?;
        let decoded = image::load_from_memory(&bytes)?;
        let frame = ImageFrame::from_dynamic(decoded, format)?;
        debug!(
            node = cx.node_name(),
            file,
            width = frame.width(),
            height = frame.height(),
            "image resource loaded"
        );

        self.image = Some(Packet::image(frame));
        Ok(())
    }

    fn process(&mut self, cx: &mut CalculatorContext<'_>) -> Result<()> {
        if cx.input("TICK").is_none() {
            return Ok(());
        }
        match &self.image {
            Some(image) => cx.output("IMAGE", image.clone()),
            None => Err(cx.error("process called before open")),
        }
    }
}
