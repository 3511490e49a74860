//! Running graphs and output pollers.

use std::collections::HashMap;
use std::mem;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};
use tracing::{debug, error, info};

use crate::calculators::SideBinding;
use crate::error::{Error, Result};
use crate::graph::GraphPlan;
use crate::logging::prefix;
use crate::packet::{Packet, Timestamp};
use crate::resources;
use crate::runner::{Observer, RunningNode, Shared, Worker};

/// A graph built from an [`InstanceBuilder`](crate::InstanceBuilder).
///
/// The lifecycle is: create pollers, [`start`](Self::start), feed packets with
/// [`process`](Self::process), and finally [`close`](Self::close) or drop.
/// `process` and `wait_until_idle` take `&self` and may be called from several
/// threads; packets are timestamped and queued in call order.
pub struct Instance {
    plan: Arc<GraphPlan>,
    side_packets: HashMap<String, Packet>,
    observers: Vec<Observer>,
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl Instance {
    pub(crate) fn new(plan: GraphPlan, side_packets: HashMap<String, Packet>) -> Self {
        Self {
            plan: Arc::new(plan),
            side_packets,
            observers: Vec::new(),
            shared: Arc::new(Shared::default()),
            worker: None,
        }
    }

    /// Name of the stream [`process`](Self::process) feeds.
    pub fn input_stream(&self) -> &str {
        &self.plan.input_stream
    }

    /// Names of every stream in the graph, graph inputs first.
    pub fn streams(&self) -> &[String] {
        &self.plan.streams
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Observe `stream`. Must be called before [`start`](Self::start).
    pub fn create_poller(&mut self, stream: &str) -> Result<Poller> {
        if self.is_running() {
            return Err(Error::State(
                "pollers must be created before the graph starts".to_string(),
            ));
        }
        let slot = self.plan.stream_slot(stream)?;
        let (tx, rx) = crossbeam_channel::unbounded();
        self.observers.push(Observer { slot, tx });
        debug!(stream, "poller created");
        Ok(Poller {
            stream: stream.to_string(),
            rx,
        })
    }

    /// Bind side packets, open every calculator and start the worker.
    pub fn start(&mut self) -> Result<()> {
        if self.is_running() {
            return Err(Error::State("graph already started".to_string()));
        }

        if let Some(missing) = self
            .plan
            .side_packets
            .iter()
            .find(|name| !self.side_packets.contains_key(*name))
        {
            return Err(Error::MissingSidePacket(missing.clone()));
        }

        let mut nodes = Vec::with_capacity(self.plan.nodes.len());
        for node in &self.plan.nodes {
            let mut side_packets = Vec::with_capacity(node.side_inputs.len());
            for side in &node.side_inputs {
                let packet = self
                    .side_packets
                    .get(&side.name)
                    .cloned()
                    .ok_or_else(|| Error::MissingSidePacket(side.name.clone()))?;
                side_packets.push(SideBinding {
                    tag: side.tag.clone(),
                    index: side.index,
                    packet,
                });
            }
            nodes.push(RunningNode {
                calculator: (node.registration.create)(),
                side_packets,
            });
        }

        let mut worker = Worker::new(
            Arc::clone(&self.plan),
            nodes,
            resources::provider(),
            Arc::clone(&self.shared),
        );
        // Pollers stay attached to the instance until every calculator has
        // opened, so a failed start can be retried.
        worker.open_all()?;
        worker.observe(mem::take(&mut self.observers));

        let (tx, rx) = crossbeam_channel::unbounded();
        self.worker = Some(worker.spawn(rx)?);
        self.shared.state.lock().input = Some(tx);
        info!(
            "{} graph started: {} nodes, {} streams",
            prefix::OPEN,
            self.plan.nodes.len(),
            self.plan.streams.len()
        );
        Ok(())
    }

    /// Feed `packet` into the input stream at the next timestamp.
    ///
    /// Returns the timestamp assigned. Fails once the graph has failed.
    pub fn process(&self, packet: impl Into<Packet>) -> Result<Timestamp> {
        let mut state = self.shared.state.lock();
        if let Some(failure) = &state.failure {
            return Err(failure.to_error());
        }
        let timestamp = Timestamp::new(state.next_timestamp);
        let input = state
            .input
            .clone()
            .ok_or_else(|| Error::State("graph is not running".to_string()))?;

        // Counted while the lock is held so the worker cannot finish it first.
        state.pending += 1;
        if input.send(packet.into().at(timestamp)).is_err() {
            state.pending -= 1;
            return Err(Error::State("graph worker has stopped".to_string()));
        }
        state.next_timestamp += 1;
        Ok(timestamp)
    }

    /// Block until every packet fed so far has gone through the graph.
    pub fn wait_until_idle(&self) -> Result<()> {
        if !self.is_running() {
            return Err(Error::State("graph is not running".to_string()));
        }
        let mut state = self.shared.state.lock();
        while state.pending > 0 {
            self.shared.idle.wait(&mut state);
        }
        match &state.failure {
            Some(failure) => Err(failure.to_error()),
            None => Ok(()),
        }
    }

    /// Stop accepting packets, drain the queue and close every calculator.
    pub fn close(mut self) -> Result<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<()> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };
        drop(self.shared.state.lock().input.take());
        if worker.join().is_err() {
            error!("{} graph worker panicked", prefix::CLOSE);
            return Err(Error::State("graph worker panicked".to_string()));
        }
        info!("{} graph closed", prefix::CLOSE);
        match &self.shared.state.lock().failure {
            Some(failure) => Err(failure.to_error()),
            None => Ok(()),
        }
    }
}

impl Drop for Instance {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            debug!("graph closed with error: {}", err);
        }
    }
}

/// Receives every packet produced on one stream.
///
/// Pollers are independent of each other and of their instance: dropping
/// either side first is fine. Once the instance is closed or the graph fails,
/// queued packets can still be drained; after that polling returns
/// [`Error::PollerClosed`].
pub struct Poller {
    stream: String,
    rx: Receiver<Packet>,
}

impl Poller {
    pub fn stream(&self) -> &str {
        &self.stream
    }

    /// Packets waiting to be polled.
    pub fn queue_size(&self) -> usize {
        self.rx.len()
    }

    /// Block until the next packet arrives.
    pub fn poll(&self) -> Result<Packet> {
        self.rx
            .recv()
            .map_err(|_| Error::PollerClosed(self.stream.clone()))
    }

    /// Like [`poll`](Self::poll), giving up after `timeout`.
    pub fn poll_timeout(&self, timeout: Duration) -> Result<Option<Packet>> {
        match self.rx.recv_timeout(timeout) {
            Ok(packet) => Ok(Some(packet)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(Error::PollerClosed(self.stream.clone())),
        }
    }
}

impl std::fmt::Debug for Poller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Poller")
            .field("stream", &self.stream)
            .field("queued", &self.rx.len())
            .finish()
    }
}
