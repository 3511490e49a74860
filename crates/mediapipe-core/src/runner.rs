//! The graph worker thread.
//!
//! Packets fed into the graph are queued on a channel. The worker takes one
//! at a time and runs every node whose inputs carry a packet at that
//! timestamp, in topological order. Whatever lands on an observed stream is
//! copied to that stream's pollers before the packet counts as done.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};
use parking_lot::{Condvar, Mutex};
use tracing::{debug, error, trace, warn};

use crate::calculators::{Calculator, CalculatorContext, SideBinding};
use crate::error::{Error, Result};
use crate::graph::GraphPlan;
use crate::logging::prefix;
use crate::packet::{Packet, Timestamp};
use crate::resources::ResourceProvider;

/// The first calculator failure of a run.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Failure {
    pub node: String,
    pub message: String,
}

impl Failure {
    fn new(node: &str, err: Error) -> Self {
        let message = match err {
            Error::Calculator { message, .. } => message,
            other => other.to_string(),
        };
        Self {
            node: node.to_string(),
            message,
        }
    }

    pub fn to_error(&self) -> Error {
        Error::calculator(&self.node, &self.message)
    }
}

/// State shared between the instance and its worker.
#[derive(Default)]
pub(crate) struct RunState {
    pub input: Option<Sender<Packet>>,
    pub next_timestamp: i64,
    pub pending: usize,
    pub failure: Option<Failure>,
}

#[derive(Default)]
pub(crate) struct Shared {
    pub state: Mutex<RunState>,
    pub idle: Condvar,
}

impl Shared {
    fn finish_one(&self) {
        let mut state = self.state.lock();
        state.pending = state.pending.saturating_sub(1);
        if state.pending == 0 {
            self.idle.notify_all();
        }
    }

    fn record_failure(&self, failure: Failure) {
        let mut state = self.state.lock();
        if state.failure.is_none() {
            state.failure = Some(failure);
        }
    }
}

/// A poller's end of an observed stream.
pub(crate) struct Observer {
    pub slot: usize,
    pub tx: Sender<Packet>,
}

pub(crate) struct RunningNode {
    pub calculator: Box<dyn Calculator>,
    pub side_packets: Vec<SideBinding>,
}

pub(crate) struct Worker {
    pub plan: Arc<GraphPlan>,
    pub nodes: Vec<RunningNode>,
    pub observers: Vec<Observer>,
    pub resources: Arc<dyn ResourceProvider>,
    pub shared: Arc<Shared>,
    failed: bool,
}

fn guarded<F>(node: &str, call: F) -> std::result::Result<(), Failure>
where
    F: FnOnce() -> Result<()>,
{
    match catch_unwind(AssertUnwindSafe(call)) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(Failure::new(node, err)),
        Err(_) => Err(Failure {
            node: node.to_string(),
            message: "calculator panicked".to_string(),
        }),
    }
}

impl Worker {
    pub fn new(
        plan: Arc<GraphPlan>,
        nodes: Vec<RunningNode>,
        resources: Arc<dyn ResourceProvider>,
        shared: Arc<Shared>,
    ) -> Self {
        Self {
            plan,
            nodes,
            observers: Vec::new(),
            resources,
            shared,
            failed: false,
        }
    }

    /// Attach poller queues. Done after [`open_all`](Self::open_all) so a
    /// failed open leaves them with the instance.
    pub fn observe(&mut self, observers: Vec<Observer>) {
        self.observers = observers;
    }

    /// Open every calculator on the calling thread.
    ///
    /// If one fails, the calculators opened before it are closed again.
    pub fn open_all(&mut self) -> Result<()> {
        let mut opened = 0;
        let mut failed = None;
        for (node, running) in self.plan.nodes.iter().zip(&mut self.nodes) {
            let mut cx = CalculatorContext::new(
                &node.name,
                &node.options,
                &node.inputs,
                &node.outputs,
                &running.side_packets,
                &[],
                Timestamp::UNSET,
                self.resources.as_ref(),
            );
            let calculator = &mut running.calculator;
            if let Err(failure) = guarded(&node.name, || calculator.open(&mut cx)) {
                failed = Some(failure);
                break;
            }
            debug!(node = %node.name, calculator = node.registration.name, "opened");
            opened += 1;
        }

        match failed {
            Some(failure) => {
                warn!(node = %failure.node, "open failed: {}", failure.message);
                self.close_nodes(opened);
                Err(failure.to_error())
            }
            None => Ok(()),
        }
    }

    /// Move the worker onto its own thread, draining `input` until every
    /// sender is dropped.
    pub fn spawn(self, input: Receiver<Packet>) -> Result<JoinHandle<()>> {
        let handle = thread::Builder::new()
            .name("mediapipe-graph".to_string())
            .spawn(move || self.run(input))?;
        Ok(handle)
    }

    fn run(mut self, input: Receiver<Packet>) {
        debug!("{} graph worker started", prefix::OPEN);
        for packet in input.iter() {
            if !self.failed {
                if let Err(failure) = self.step(packet) {
                    self.fail(failure);
                }
            }
            self.shared.finish_one();
        }
        self.close_all();
        debug!("{} graph worker stopped", prefix::CLOSE);
    }

    fn step(&mut self, packet: Packet) -> std::result::Result<(), Failure> {
        let timestamp = packet.timestamp();
        trace!("{} processing timestamp {}", prefix::FLOW, timestamp);

        let mut values: Vec<Option<Packet>> = vec![None; self.plan.streams.len()];
        values[self.plan.input_slot] = Some(packet);

        for (node, running) in self.plan.nodes.iter().zip(&mut self.nodes) {
            if !node.inputs.iter().any(|b| values[b.slot].is_some()) {
                continue;
            }
            let mut cx = CalculatorContext::new(
                &node.name,
                &node.options,
                &node.inputs,
                &node.outputs,
                &running.side_packets,
                &values,
                timestamp,
                self.resources.as_ref(),
            );
            let calculator = &mut running.calculator;
            guarded(&node.name, || calculator.process(&mut cx))?;
            for (slot, emitted) in cx.into_emitted() {
                values[slot] = Some(emitted);
            }
        }

        for observer in &self.observers {
            if let Some(packet) = &values[observer.slot] {
                // A dropped poller just stops receiving.
                let _ = observer.tx.send(packet.clone());
            }
        }
        Ok(())
    }

    fn fail(&mut self, failure: Failure) {
        warn!(node = %failure.node, "graph failed: {}", failure.message);
        self.failed = true;
        self.observers.clear();
        self.shared.record_failure(failure);
    }

    fn close_all(&mut self) {
        if let Some(failure) = self.close_nodes(self.nodes.len()) {
            self.shared.record_failure(failure);
        }
        self.observers.clear();
    }

    /// Close the first `count` calculators, returning the first failure.
    fn close_nodes(&mut self, count: usize) -> Option<Failure> {
        let mut first = None;
        for (node, running) in self.plan.nodes.iter().zip(&mut self.nodes).take(count) {
            let mut cx = CalculatorContext::new(
                &node.name,
                &node.options,
                &node.inputs,
                &node.outputs,
                &running.side_packets,
                &[],
                Timestamp::UNSET,
                self.resources.as_ref(),
            );
            let calculator = &mut running.calculator;
            if let Err(failure) = guarded(&node.name, || calculator.close(&mut cx)) {
                error!(node = %failure.node, "close failed: {}", failure.message);
                if first.is_none() {
                    first = Some(failure);
                }
            }
        }
        first
    }
}
