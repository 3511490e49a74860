use super::{Calculator, CalculatorContext, CalculatorRegistration};
use crate::error::Result;
use crate::packet::Packet;

/// Re-emits the `PACKET` side packet on the `PACKET` output whenever `TICK`
/// carries a packet.
#[derive(Debug, Default)]
pub struct SidePacketToStreamCalculator {
    packet: Option<Packet>,
}

impl SidePacketToStreamCalculator {
    pub const REGISTRATION: CalculatorRegistration = CalculatorRegistration {
        name: "SidePacketToStreamCalculator",
        options: &[],
        create: Self::boxed,
    };

    fn boxed() -> Box<dyn Calculator> {
        Box::new(Self::default())
    }
}

impl Calculator for SidePacketToStreamCalculator {
    fn open(&mut self, cx: &mut CalculatorContext<'_>) -> Result<()> {
        cx.require_input("TICK")?;
        cx.require_output("PACKET")?;
        let packet = cx
            .side_packet("PACKET")
            .cloned()
            .ok_or_else(|| cx.error("requires side packet tagged PACKET"))?;
        self.packet = Some(packet);
        Ok(())
    }

    fn process(&mut self, cx: &mut CalculatorContext<'_>) -> Result<()> {
        if cx.input("TICK").is_none() {
            return Ok(());
        }
        match &self.packet {
            Some(packet) => cx.output("PACKET", packet.clone()),
            None => Err(cx.error("process called before open")),
        }
    }
}
