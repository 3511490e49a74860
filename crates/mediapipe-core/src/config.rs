//! Graph configuration
//!
//! Graphs are described by a JSON document:
//!
//! ```json
//! {
//!   "input_stream": ["input_video"],
//!   "output_stream": ["output_video"],
//!   "node": [
//!     {
//!       "calculator": "ImageTransformationCalculator",
//!       "name": "flip",
//!       "input_stream": ["IMAGE:input_video"],
//!       "output_stream": ["IMAGE:output_video"],
//!       "options": { "flip_vertically": true }
//!     }
//!   ]
//! }
//! ```
//!
//! Stream and side packet references take the forms `NAME`, `TAG:NAME` and
//! `TAG:INDEX:NAME`.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::error::{Error, Result};

/// Top-level graph description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphConfig {
    #[serde(default)]
    pub input_stream: Vec<String>,
    #[serde(default)]
    pub output_stream: Vec<String>,
    #[serde(default)]
    pub input_side_packet: Vec<String>,
    #[serde(default)]
    pub node: Vec<NodeConfig>,
}

/// One calculator instance in the graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    pub calculator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub input_stream: Vec<String>,
    #[serde(default)]
    pub output_stream: Vec<String>,
    #[serde(default)]
    pub input_side_packet: Vec<String>,
    #[serde(default)]
    pub options: NodeOptions,
}

impl NodeConfig {
    /// Name used in logs and errors: the node name, else the calculator.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.calculator)
    }
}

/// Free-form calculator options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeOptions(Map<String, Value>);

impl NodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Numeric option; booleans read as 0 / 1.
    pub fn get_f64(&self, name: &str) -> Option<f64> {
        match self.0.get(name)? {
            Value::Number(n) => n.as_f64(),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn f64_or(&self, name: &str, default: f64) -> f64 {
        self.get_f64(name).unwrap_or(default)
    }

    /// Boolean option; numbers are true when non-zero.
    pub fn bool_or(&self, name: &str, default: bool) -> bool {
        match self.0.get(name) {
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_f64().map(|v| v != 0.0).unwrap_or(default),
            _ => default,
        }
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    /// Set a numeric option, replacing any previous value.
    pub fn set_number(&mut self, name: &str, value: f64) -> Result<()> {
        let number = Number::from_f64(value)
            .ok_or_else(|| Error::Config(format!("option {} must be finite, got {}", name, value)))?;
        self.0.insert(name.to_string(), Value::Number(number));
        Ok(())
    }
}

impl GraphConfig {
    /// Parse a graph from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Load a graph file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Indices of the nodes an option override addresses: nodes whose name
    /// matches, or failing that, nodes running the named calculator.
    pub fn find_nodes(&self, name: &str) -> Vec<usize> {
        let by_name: Vec<usize> = self
            .node
            .iter()
            .enumerate()
            .filter(|(_, node)| node.name.as_deref() == Some(name))
            .map(|(i, _)| i)
            .collect();
        if !by_name.is_empty() {
            return by_name;
        }
        self.node
            .iter()
            .enumerate()
            .filter(|(_, node)| node.calculator == name)
            .map(|(i, _)| i)
            .collect()
    }
}

/// A resolved `TAG:INDEX:NAME` reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRef {
    pub tag: String,
    pub index: usize,
    pub name: String,
}

/// Parse a list of stream or side packet references.
///
/// Entries without an explicit index are numbered in order within their tag.
pub fn parse_refs(specs: &[String]) -> Result<Vec<StreamRef>> {
    let mut next_index: HashMap<String, usize> = HashMap::new();
    let mut refs = Vec::with_capacity(specs.len());

    for spec in specs {
        let parts: Vec<&str> = spec.split(':').collect();
        let (tag, explicit, name) = match parts.as_slice() {
            [name] => ("", None, *name),
            [tag, name] => (*tag, None, *name),
            [tag, index, name] => {
                let index = index
                    .parse::<usize>()
                    .map_err(|_| Error::Config(format!("bad index in stream reference {}", spec)))?;
                (*tag, Some(index), *name)
            }
            _ => return Err(Error::Config(format!("bad stream reference {}", spec))),
        };

        if name.is_empty() {
            return Err(Error::Config(format!("empty name in stream reference {}", spec)));
        }
        if !tag.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_') {
            return Err(Error::Config(format!("tag must be upper case in {}", spec)));
        }

        let counter = next_index.entry(tag.to_string()).or_insert(0);
        let index = explicit.unwrap_or(*counter);
        *counter = (*counter).max(index + 1);

        refs.push(StreamRef {
            tag: tag.to_string(),
            index,
            name: name.to_string(),
        });
    }

    Ok(refs)
}
