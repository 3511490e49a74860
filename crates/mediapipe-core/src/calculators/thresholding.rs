use super::{Calculator, CalculatorContext, CalculatorRegistration};
use crate::error::Result;
use crate::packet::Packet;

/// Emits `FLAG = FLOAT > threshold`.
///
/// The threshold comes from the `THRESHOLD` side packet when bound, else from
/// the `threshold` option.
#[derive(Debug, Default)]
pub struct ThresholdingCalculator {
    threshold: f64,
}

impl ThresholdingCalculator {
    pub const REGISTRATION: CalculatorRegistration = CalculatorRegistration {
        name: "ThresholdingCalculator",
        options: &["threshold"],
        create: Self::boxed,
    };

    fn boxed() -> Box<dyn Calculator> {
        Box::new(Self::default())
    }
}

impl Calculator for ThresholdingCalculator {
    fn open(&mut self, cx: &mut CalculatorContext<'_>) -> Result<()> {
        cx.require_input("FLOAT")?;
        cx.require_output("FLAG")?;

        self.threshold = match cx.side_packet("THRESHOLD") {
            Some(packet) => packet.get_float()? as f64,
            None => cx.options().f64_or("threshold", 0.0),
        };
        Ok(())
    }

    fn process(&mut self, cx: &mut CalculatorContext<'_>) -> Result<()> {
        let Some(value) = cx.input("FLOAT").map(Packet::get_float).transpose()? else {
            return Ok(());
        };
        cx.output("FLAG", Packet::bool(value as f64 > self.threshold))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculators::testing::Harness;

    fn run(harness: &Harness, value: f32) -> bool {
        let mut calculator = ThresholdingCalculator::default();
        harness.open(&mut calculator).unwrap();
        let out = harness
            .process(&mut calculator, vec![Some(Packet::float(value))])
            .unwrap();
        out[0].1.get_bool().unwrap()
    }

    #[test]
    fn test_option_threshold() {
        let mut harness = Harness::new(&["FLOAT"], &["FLAG"]);
        harness.options.set_number("threshold", 0.5).unwrap();
        assert!(run(&harness, 0.75));
        assert!(!run(&harness, 0.5));
    }

    #[test]
    fn test_side_packet_overrides_option() {
        let mut harness =
            Harness::new(&["FLOAT"], &["FLAG"]).side_packet("THRESHOLD", Packet::float(0.9));
        harness.options.set_number("threshold", 0.1).unwrap();
        assert!(!run(&harness, 0.5));
    }

    #[test]
    fn test_requires_tags() {
        let harness = Harness::new(&["VALUE"], &["FLAG"]);
        assert!(harness.open(&mut ThresholdingCalculator::default()).is_err());
    }
}
