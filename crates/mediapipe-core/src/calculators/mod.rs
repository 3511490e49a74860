//! Calculators: the nodes of a graph
//!
//! A calculator is opened once when the graph starts, processed once per
//! timestamp at which any of its inputs carries a packet, and closed when the
//! graph shuts down. Calculators are looked up by name in a process-wide
//! registry that starts out with the built-ins below; hosts can add their own
//! with [`register_calculator`].

use std::collections::HashMap;

use lazy_static::lazy_static;
use parking_lot::RwLock;

use crate::config::NodeOptions;
use crate::error::{Error, Result};
use crate::packet::{Packet, Timestamp};
use crate::resources::ResourceProvider;

mod image_file;
mod image_transformation;
mod pass_through;
mod rect_transformation;
mod side_packet_to_stream;
mod thresholding;

pub use image_file::ImageFileCalculator;
pub use image_transformation::ImageTransformationCalculator;
pub use pass_through::PassThroughCalculator;
pub use rect_transformation::RectTransformationCalculator;
pub use side_packet_to_stream::SidePacketToStreamCalculator;
pub use thresholding::ThresholdingCalculator;

/// A node implementation.
pub trait Calculator: Send {
    /// Called once before the first packet.
    fn open(&mut self, cx: &mut CalculatorContext<'_>) -> Result<()> {
        let _ = cx;
        Ok(())
    }

    /// Called for every timestamp at which an input has a packet.
    fn process(&mut self, cx: &mut CalculatorContext<'_>) -> Result<()>;

    /// Called once when the graph shuts down.
    fn close(&mut self, cx: &mut CalculatorContext<'_>) -> Result<()> {
        let _ = cx;
        Ok(())
    }
}

/// Registry entry: the calculator's name, the options it accepts and a
/// constructor.
#[derive(Clone, Copy)]
pub struct CalculatorRegistration {
    pub name: &'static str,
    pub options: &'static [&'static str],
    pub create: fn() -> Box<dyn Calculator>,
}

impl CalculatorRegistration {
    pub fn accepts_option(&self, option: &str) -> bool {
        self.options.contains(&option)
    }
}

fn builtin_registry() -> HashMap<String, CalculatorRegistration> {
    [
        PassThroughCalculator::REGISTRATION,
        ImageTransformationCalculator::REGISTRATION,
        ThresholdingCalculator::REGISTRATION,
        RectTransformationCalculator::REGISTRATION,
        SidePacketToStreamCalculator::REGISTRATION,
        ImageFileCalculator::REGISTRATION,
    ]
    .into_iter()
    .map(|registration| (registration.name.to_string(), registration))
    .collect()
}

lazy_static! {
    static ref REGISTRY: RwLock<HashMap<String, CalculatorRegistration>> =
        RwLock::new(builtin_registry());
}

/// Add or replace a calculator. Returns true if a calculator of that name
/// was already registered.
pub fn register_calculator(registration: CalculatorRegistration) -> bool {
    REGISTRY
        .write()
        .insert(registration.name.to_string(), registration)
        .is_some()
}

pub fn lookup_calculator(name: &str) -> Option<CalculatorRegistration> {
    REGISTRY.read().get(name).copied()
}

/// Sorted names of every registered calculator.
pub fn registered_calculators() -> Vec<String> {
    let mut names: Vec<String> = REGISTRY.read().keys().cloned().collect();
    names.sort();
    names
}

/// A stream or side packet bound to a node under `tag` / `index`.
#[derive(Debug, Clone)]
pub(crate) struct Binding {
    pub tag: String,
    pub index: usize,
    pub slot: usize,
}

/// A side packet bound to a node.
#[derive(Debug, Clone)]
pub(crate) struct SideBinding {
    pub tag: String,
    pub index: usize,
    pub packet: Packet,
}

/// Everything a calculator sees during one call.
pub struct CalculatorContext<'a> {
    node: &'a str,
    options: &'a NodeOptions,
    inputs: &'a [Binding],
    outputs: &'a [Binding],
    side_packets: &'a [SideBinding],
    values: &'a [Option<Packet>],
    emitted: Vec<(usize, Packet)>,
    timestamp: Timestamp,
    resources: &'a dyn ResourceProvider,
}

impl<'a> CalculatorContext<'a> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        node: &'a str,
        options: &'a NodeOptions,
        inputs: &'a [Binding],
        outputs: &'a [Binding],
        side_packets: &'a [SideBinding],
        values: &'a [Option<Packet>],
        timestamp: Timestamp,
        resources: &'a dyn ResourceProvider,
    ) -> Self {
        Self {
            node,
            options,
            inputs,
            outputs,
            side_packets,
            values,
            emitted: Vec::new(),
            timestamp,
            resources,
        }
    }

    pub(crate) fn into_emitted(self) -> Vec<(usize, Packet)> {
        self.emitted
    }

    pub fn node_name(&self) -> &str {
        self.node
    }

    pub fn options(&self) -> &NodeOptions {
        self.options
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn resources(&self) -> &dyn ResourceProvider {
        self.resources
    }

    /// Build a calculator error attributed to this node.
    pub fn error(&self, message: impl ToString) -> Error {
        Error::calculator(self.node, message)
    }

    pub fn has_input(&self, tag: &str) -> bool {
        self.inputs.iter().any(|b| b.tag == tag)
    }

    pub fn has_output(&self, tag: &str) -> bool {
        self.outputs.iter().any(|b| b.tag == tag)
    }

    pub fn has_side_packet(&self, tag: &str) -> bool {
        self.side_packets.iter().any(|b| b.tag == tag)
    }

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    pub fn input(&self, tag: &str) -> Option<&Packet> {
        self.input_at(tag, 0)
    }

    pub fn input_at(&self, tag: &str, index: usize) -> Option<&Packet> {
        let binding = self
            .inputs
            .iter()
            .find(|b| b.tag == tag && b.index == index)?;
        self.values.get(binding.slot)?.as_ref()
    }

    /// Input packet by declaration order.
    pub fn input_by_position(&self, position: usize) -> Option<&Packet> {
        let binding = self.inputs.get(position)?;
        self.values.get(binding.slot)?.as_ref()
    }

    pub fn side_packet(&self, tag: &str) -> Option<&Packet> {
        self.side_packets
            .iter()
            .find(|b| b.tag == tag && b.index == 0)
            .map(|b| &b.packet)
    }

    pub fn output(&mut self, tag: &str, packet: impl Into<Packet>) -> Result<()> {
        self.output_at(tag, 0, packet)
    }

    pub fn output_at(&mut self, tag: &str, index: usize, packet: impl Into<Packet>) -> Result<()> {
        let slot = self
            .outputs
            .iter()
            .find(|b| b.tag == tag && b.index == index)
            .map(|b| b.slot)
            .ok_or_else(|| self.error(format!("no output stream {}:{}", tag, index)))?;
        let packet = packet.into().at(self.timestamp);
        self.emitted.push((slot, packet));
        Ok(())
    }

    /// Emit on the output declared at `position`.
    pub fn output_by_position(&mut self, position: usize, packet: impl Into<Packet>) -> Result<()> {
        let slot = self
            .outputs
            .get(position)
            .map(|b| b.slot)
            .ok_or_else(|| self.error(format!("no output stream at position {}", position)))?;
        let packet = packet.into().at(self.timestamp);
        self.emitted.push((slot, packet));
        Ok(())
    }

    /// Fail unless the node declares an input stream with `tag`.
    pub fn require_input(&self, tag: &str) -> Result<()> {
        if self.has_input(tag) {
            Ok(())
        } else {
            Err(self.error(format!("requires input stream tagged {}", tag)))
        }
    }

    /// Fail unless the node declares an output stream with `tag`.
    pub fn require_output(&self, tag: &str) -> Result<()> {
        if self.has_output(tag) {
            Ok(())
        } else {
            Err(self.error(format!("requires output stream tagged {}", tag)))
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Drive a single calculator without a graph.

    use super::*;
    use crate::resources::FileSystemResources;

    pub struct Harness {
        pub name: String,
        pub options: NodeOptions,
        pub inputs: Vec<Binding>,
        pub outputs: Vec<Binding>,
        pub side_packets: Vec<SideBinding>,
        pub resources: FileSystemResources,
    }

    fn bindings(tags: &[&str], first_slot: usize) -> Vec<Binding> {
        tags.iter()
            .enumerate()
            .map(|(i, tag)| Binding {
                tag: tag.to_string(),
                index: 0,
                slot: first_slot + i,
            })
            .collect()
    }

    impl Harness {
        /// Inputs occupy slots `0..inputs.len()`, outputs follow.
        pub fn new(inputs: &[&str], outputs: &[&str]) -> Self {
            Self {
                name: "under_test".to_string(),
                options: NodeOptions::new(),
                inputs: bindings(inputs, 0),
                outputs: bindings(outputs, inputs.len()),
                side_packets: Vec::new(),
                resources: FileSystemResources::new("."),
            }
        }

        pub fn side_packet(mut self, tag: &str, packet: Packet) -> Self {
            self.side_packets.push(SideBinding {
                tag: tag.to_string(),
                index: 0,
                packet,
            });
            self
        }

        pub fn open(&self, calculator: &mut dyn Calculator) -> Result<()> {
            let mut cx = CalculatorContext::new(
                &self.name,
                &self.options,
                &self.inputs,
                &self.outputs,
                &self.side_packets,
                &[],
                Timestamp::UNSET,
                &self.resources,
            );
            calculator.open(&mut cx)
        }

        /// Run one process call with `inputs` (by position) and return the
        /// emitted packets keyed by output position.
        pub fn process(
            &self,
            calculator: &mut dyn Calculator,
            inputs: Vec<Option<Packet>>,
        ) -> Result<Vec<(usize, Packet)>> {
            let mut values = inputs;
            values.resize(self.inputs.len() + self.outputs.len(), None);
            let mut cx = CalculatorContext::new(
                &self.name,
                &self.options,
                &self.inputs,
                &self.outputs,
                &self.side_packets,
                &values,
                Timestamp::new(0),
                &self.resources,
            );
            calculator.process(&mut cx)?;
            let first_output = self.inputs.len();
            Ok(cx
                .into_emitted()
                .into_iter()
                .map(|(slot, packet)| (slot - first_output, packet))
                .collect())
        }
    }
}
