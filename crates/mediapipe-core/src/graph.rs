//! Graph validation
//!
//! Turns a [`GraphConfig`] into a [`GraphPlan`]: every stream gets a slot,
//! every node is bound to its calculator and the nodes are put in
//! topological order. Everything that can be checked without running the
//! graph is checked here, so configuration errors surface when the instance
//! is created.

use std::collections::{HashMap, VecDeque};

use crate::calculators::{lookup_calculator, Binding, CalculatorRegistration};
use crate::config::{parse_refs, GraphConfig, NodeOptions, StreamRef};
use crate::error::{Error, Result};

/// A numeric option set on a node before the graph is built.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionOverride {
    pub node: String,
    pub option: String,
    pub value: f64,
}

/// A validated node.
pub(crate) struct NodePlan {
    pub name: String,
    pub registration: CalculatorRegistration,
    pub options: NodeOptions,
    pub inputs: Vec<Binding>,
    pub outputs: Vec<Binding>,
    pub side_inputs: Vec<StreamRef>,
}

/// A validated graph, nodes in execution order.
pub(crate) struct GraphPlan {
    pub streams: Vec<String>,
    pub slots: HashMap<String, usize>,
    pub input_stream: String,
    pub input_slot: usize,
    pub side_packets: Vec<String>,
    pub nodes: Vec<NodePlan>,
}

/// Write option overrides into the matching nodes.
pub(crate) fn apply_overrides(config: &mut GraphConfig, overrides: &[OptionOverride]) -> Result<()> {
    for entry in overrides {
        let targets = config.find_nodes(&entry.node);
        if targets.is_empty() {
            return Err(Error::UnknownNode(entry.node.clone()));
        }
        for index in targets {
            let node = &mut config.node[index];
            let registration = lookup_calculator(&node.calculator)
                .ok_or_else(|| Error::UnknownCalculator(node.calculator.clone()))?;
            if !registration.accepts_option(&entry.option) {
                return Err(Error::UnknownOption {
                    calculator: node.calculator.clone(),
                    option: entry.option.clone(),
                });
            }
            node.options.set_number(&entry.option, entry.value)?;
        }
    }
    Ok(())
}

impl GraphPlan {
    pub fn new(config: &GraphConfig, input_stream: &str) -> Result<Self> {
        let mut streams: Vec<String> = Vec::new();
        let mut slots: HashMap<String, usize> = HashMap::new();

        let mut add_stream = |name: &str, producer: &str| -> Result<usize> {
            if slots.contains_key(name) {
                return Err(Error::Config(format!(
                    "stream {} is produced more than once (again by {})",
                    name, producer
                )));
            }
            let slot = streams.len();
            streams.push(name.to_string());
            slots.insert(name.to_string(), slot);
            Ok(slot)
        };

        for graph_input in parse_refs(&config.input_stream)? {
            add_stream(&graph_input.name, "graph input")?;
        }

        // First pass: bind calculators and allocate output slots.
        let mut nodes = Vec::with_capacity(config.node.len());
        let mut input_refs = Vec::with_capacity(config.node.len());
        for node in &config.node {
            let name = node.display_name().to_string();
            let registration = lookup_calculator(&node.calculator)
                .ok_or_else(|| Error::UnknownCalculator(node.calculator.clone()))?;

            if let Some(option) = node.options.names().find(|o| !registration.accepts_option(o)) {
                return Err(Error::UnknownOption {
                    calculator: node.calculator.clone(),
                    option: option.to_string(),
                });
            }

            let mut outputs = Vec::new();
            for output in parse_refs(&node.output_stream)? {
                let slot = add_stream(&output.name, &name)?;
                outputs.push(Binding {
                    tag: output.tag,
                    index: output.index,
                    slot,
                });
            }

            input_refs.push(parse_refs(&node.input_stream)?);
            nodes.push(NodePlan {
                name,
                registration,
                options: node.options.clone(),
                inputs: Vec::new(),
                outputs,
                side_inputs: parse_refs(&node.input_side_packet)?,
            });
        }

        // Second pass: every input must be produced somewhere.
        for (node, refs) in nodes.iter_mut().zip(input_refs) {
            for input in refs {
                let slot = *slots.get(&input.name).ok_or_else(|| {
                    Error::Config(format!(
                        "node {} reads stream {} which nothing produces",
                        node.name, input.name
                    ))
                })?;
                node.inputs.push(Binding {
                    tag: input.tag,
                    index: input.index,
                    slot,
                });
            }
        }

        for output in parse_refs(&config.output_stream)? {
            if !slots.contains_key(&output.name) {
                return Err(Error::UnknownStream(output.name));
            }
        }

        let declared_inputs: Vec<String> = parse_refs(&config.input_stream)?
            .into_iter()
            .map(|r| r.name)
            .collect();
        if !declared_inputs.iter().any(|name| name == input_stream) {
            return Err(Error::Config(format!(
                "{} is not an input stream of the graph",
                input_stream
            )));
        }
        let input_slot = slots[input_stream];

        let nodes = topological_order(nodes, streams.len())?;
        let side_packets = parse_refs(&config.input_side_packet)?
            .into_iter()
            .map(|r| r.name)
            .collect();

        Ok(Self {
            streams,
            slots,
            input_stream: input_stream.to_string(),
            input_slot,
            side_packets,
            nodes,
        })
    }

    pub fn stream_slot(&self, name: &str) -> Result<usize> {
        self.slots
            .get(name)
            .copied()
            .ok_or_else(|| Error::UnknownStream(name.to_string()))
    }
}

/// Kahn's algorithm over node indices; ties keep config order.
fn topological_order(nodes: Vec<NodePlan>, stream_count: usize) -> Result<Vec<NodePlan>> {
    let mut producer: Vec<Option<usize>> = vec![None; stream_count];
    for (index, node) in nodes.iter().enumerate() {
        for output in &node.outputs {
            producer[output.slot] = Some(index);
        }
    }

    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    let mut in_degree = vec![0usize; nodes.len()];
    for (index, node) in nodes.iter().enumerate() {
        for input in &node.inputs {
            if let Some(upstream) = producer[input.slot] {
                dependents[upstream].push(index);
                in_degree[index] += 1;
            }
        }
    }

    let mut ready: VecDeque<usize> = (0..nodes.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(nodes.len());
    while let Some(index) = ready.pop_front() {
        order.push(index);
        for &next in &dependents[index] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                ready.push_back(next);
            }
        }
    }

    if order.len() != nodes.len() {
        let stuck: Vec<&str> = nodes
            .iter()
            .enumerate()
            .filter(|(i, _)| in_degree[*i] > 0)
            .map(|(_, n)| n.name.as_str())
            .collect();
        return Err(Error::Config(format!(
            "graph contains a cycle through {}",
            stuck.join(", ")
        )));
    }

    let mut slots: Vec<Option<NodePlan>> = nodes.into_iter().map(Some).collect();
    Ok(order
        .into_iter()
        .filter_map(|index| slots[index].take())
        .collect())
}
