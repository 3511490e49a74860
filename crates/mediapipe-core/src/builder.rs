use std::collections::HashMap;
use std::path::PathBuf;

use tracing::debug;

use crate::config::GraphConfig;
use crate::error::{Error, Result};
use crate::graph::{apply_overrides, GraphPlan, OptionOverride};
use crate::instance::Instance;
use crate::packet::Packet;

#[derive(Debug, Default)]
enum GraphSource {
    #[default]
    Empty,
    File(PathBuf),
    Config(GraphConfig),
}

/// Collects a graph, option overrides and side packets, then builds an
/// [`Instance`].
///
/// ```no_run
/// use mediapipe_core::{InstanceBuilder, Packet};
///
/// let mut builder = InstanceBuilder::new("hand_tracking.json", "input_video");
/// builder
///     .add_option_float("palm_detection", "threshold", 0.6)
///     .add_side_packet("num_hands", Packet::int(2));
/// let instance = builder.build()?;
/// # Ok::<(), mediapipe_core::Error>(())
/// ```
#[derive(Debug, Default)]
pub struct InstanceBuilder {
    source: GraphSource,
    input_stream: String,
    overrides: Vec<OptionOverride>,
    side_packets: HashMap<String, Packet>,
    deferred: Option<Error>,
}

impl InstanceBuilder {
    /// Build from the JSON graph file at `graph_path`, feeding `input_stream`.
    pub fn new(graph_path: impl Into<PathBuf>, input_stream: impl Into<String>) -> Self {
        Self {
            source: GraphSource::File(graph_path.into()),
            input_stream: input_stream.into(),
            ..Default::default()
        }
    }

    /// Build from an already parsed graph.
    pub fn from_config(config: GraphConfig, input_stream: impl Into<String>) -> Self {
        Self {
            source: GraphSource::Config(config),
            input_stream: input_stream.into(),
            ..Default::default()
        }
    }

    /// Set a numeric option on `node` (node name or calculator name).
    pub fn add_option_float(&mut self, node: &str, option: &str, value: f32) -> &mut Self {
        self.add_option_double(node, option, value as f64)
    }

    pub fn add_option_double(&mut self, node: &str, option: &str, value: f64) -> &mut Self {
        self.overrides.push(OptionOverride {
            node: node.to_string(),
            option: option.to_string(),
            value,
        });
        self
    }

    /// Provide side packet `name`. A later packet with the same name wins.
    pub fn add_side_packet(&mut self, name: &str, packet: Packet) -> &mut Self {
        if self.side_packets.insert(name.to_string(), packet).is_some() {
            debug!(name, "side packet replaced");
        }
        self
    }

    /// Record a setter failure. [`build`](Self::build) reports the first
    /// one instead of building a graph with the setting missing.
    pub fn defer_error(&mut self, err: Error) -> &mut Self {
        if self.deferred.is_none() {
            self.deferred = Some(err);
        }
        self
    }

    pub fn overrides(&self) -> &[OptionOverride] {
        &self.overrides
    }

    pub fn side_packet_names(&self) -> impl Iterator<Item = &str> {
        self.side_packets.keys().map(String::as_str)
    }

    /// Load and validate the graph. Nothing runs until
    /// [`Instance::start`].
    pub fn build(self) -> Result<Instance> {
        if let Some(err) = self.deferred {
            return Err(err);
        }
        let mut config = match self.source {
            GraphSource::Empty => {
                return Err(Error::Config("no graph given to the builder".to_string()))
            }
            GraphSource::File(path) => {
                debug!(path = %path.display(), "loading graph");
                GraphConfig::from_file(&path)?
            }
            GraphSource::Config(config) => config,
        };
        apply_overrides(&mut config, &self.overrides)?;
        let plan = GraphPlan::new(&config, &self.input_stream)?;
        Ok(Instance::new(plan, self.side_packets))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRAPH: &str = r#"{
        "input_stream": ["in"],
        "output_stream": ["flag"],
        "node": [
            { "calculator": "ThresholdingCalculator", "name": "gate",
              "input_stream": ["FLOAT:in"], "output_stream": ["FLAG:flag"] }
        ]
    }"#;

    #[test]
    fn test_build_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.json");
        std::fs::write(&path, GRAPH).unwrap();

        let mut builder = InstanceBuilder::new(&path, "in");
        builder.add_option_float("gate", "threshold", 0.5);
        let instance = builder.build().unwrap();
        assert_eq!(instance.input_stream(), "in");
        assert!(!instance.is_running());
    }

    #[test]
    fn test_build_errors() {
        assert!(matches!(
            InstanceBuilder::default().build(),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            InstanceBuilder::new("/definitely/not/here.json", "in").build(),
            Err(Error::Io(_))
        ));

        let config = GraphConfig::from_json(GRAPH).unwrap();
        let mut builder = InstanceBuilder::from_config(config, "in");
        builder.add_option_double("gate", "no_such_option", 1.0);
        assert!(matches!(builder.build(), Err(Error::UnknownOption { .. })));
    }

    #[test]
    fn test_deferred_error_fails_build() {
        let config = GraphConfig::from_json(GRAPH).unwrap();
        let mut builder = InstanceBuilder::from_config(config, "in");
        builder
            .defer_error(Error::InvalidArgument("node: null pointer".into()))
            .defer_error(Error::InvalidArgument("second".into()))
            .add_option_float("gate", "threshold", 0.5);
        match builder.build() {
            Err(err) => assert_eq!(err.to_string(), "invalid argument: node: null pointer"),
            Ok(_) => panic!("build succeeded despite a failed setter"),
        }
    }

    #[test]
    fn test_side_packet_replaced() {
        let mut builder = InstanceBuilder::default();
        builder
            .add_side_packet("n", Packet::int(1))
            .add_side_packet("n", Packet::int(2));
        assert_eq!(builder.side_packet_names().collect::<Vec<_>>(), vec!["n"]);
        assert_eq!(builder.side_packets["n"].get_int().unwrap(), 2);
    }
}
