use super::{Calculator, CalculatorContext, CalculatorRegistration};
use crate::error::Result;

/// Forwards the i-th input stream to the i-th output stream unchanged.
#[derive(Debug, Default)]
pub struct PassThroughCalculator;

impl PassThroughCalculator {
    pub const REGISTRATION: CalculatorRegistration = CalculatorRegistration {
        name: "PassThroughCalculator",
        options: &[],
        create: Self::boxed,
    };

    fn boxed() -> Box<dyn Calculator> {
        Box::new(Self)
    }
}

impl Calculator for PassThroughCalculator {
    fn open(&mut self, cx: &mut CalculatorContext<'_>) -> Result<()> {
        if cx.input_count() != cx.output_count() {
            return Err(cx.error(format!(
                "{} inputs but {} outputs",
                cx.input_count(),
                cx.output_count()
            )));
        }
        Ok(())
    }

    fn process(&mut self, cx: &mut CalculatorContext<'_>) -> Result<()> {
        for position in 0..cx.input_count() {
            if let Some(packet) = cx.input_by_position(position).cloned() {
                cx.output_by_position(position, packet)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculators::testing::Harness;
    use crate::packet::Packet;

    #[test]
    fn test_forwards_present_inputs_only() {
        let harness = Harness::new(&["", ""], &["", ""]);
        let mut calculator = PassThroughCalculator;
        harness.open(&mut calculator).unwrap();

        let out = harness
            .process(&mut calculator, vec![None, Some(Packet::int(5))])
            .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].0, 1);
        assert_eq!(out[0].1.get_int().unwrap(), 5);
    }

    #[test]
    fn test_mismatched_arity_fails_open() {
        let harness = Harness::new(&["", ""], &[""]);
        assert!(harness.open(&mut PassThroughCalculator).is_err());
    }
}
