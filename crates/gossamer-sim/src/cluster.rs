//! The simulated cluster: nodes, network and services in one process.

use std::collections::BTreeMap;
use std::time::Duration;

use gossamer_node::{ManualClock, Node};
use gossamer_wire::{Body, Envelope, InitPayload, MsgId, NodeId, RuntimePayload};
use serde::Serialize;
use tracing::{debug, trace};

use crate::config::{NetworkStats, SimConfig};
use crate::error::{SimError, SimResult};
use crate::kv::KvStore;
use crate::rng::SimRng;

/// Sender of the `init` handshake.
pub const HARNESS: &str = "c0";

/// Sender of client requests.
pub const CLIENT: &str = "c1";

/// Upper bound on deliveries for one [`Cluster::run_until_quiet`] call in
/// [`Cluster::run_rounds`].
pub const MAX_DELIVERIES_PER_ROUND: usize = 100_000;

/// Nodes wired together by a lossy, reordering network.
///
/// Client requests and the handshake are delivered directly and reliably.
/// Everything nodes send to each other, and every key-value reply, goes
/// through the faulty network.
pub struct Cluster<S> {
    config: SimConfig,
    rng: SimRng,
    nodes: BTreeMap<NodeId, Node<S, ManualClock>>,
    in_flight: Vec<Envelope>,
    client_inbox: Vec<Envelope>,
    kv: KvStore,
    stats: NetworkStats,
    now_ns: u64,
    last_client_msg_id: MsgId,
}

impl<S> Cluster<S> {
    /// Builds one node per id with `build` and completes every handshake.
    ///
    /// # Errors
    ///
    /// Fails if a node rejects its `init`.
    pub fn new<F>(config: SimConfig, ids: &[&str], mut build: F) -> SimResult<Self>
    where
        F: FnMut(&NodeId) -> Node<S, ManualClock>,
    {
        let node_ids: Vec<NodeId> = ids.iter().copied().map(NodeId::from).collect();
        let nodes = node_ids.iter().map(|id| (id.clone(), build(id))).collect();

        let mut cluster = Self {
            config,
            rng: SimRng::new(config.seed),
            nodes,
            in_flight: Vec::new(),
            client_inbox: Vec::new(),
            kv: KvStore::new(),
            stats: NetworkStats::default(),
            now_ns: 0,
            last_client_msg_id: MsgId::default(),
        };

        for id in &node_ids {
            let init = RuntimePayload::Init(InitPayload {
                node_id: id.clone(),
                node_ids: node_ids.clone(),
            });
            cluster.inject(HARNESS, id.clone(), &init)?;
        }

        debug!(nodes = node_ids.len(), seed = config.seed, "cluster initialized");
        Ok(cluster)
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    /// # Errors
    ///
    /// [`SimError::UnknownNode`] if `id` is not part of the cluster.
    pub fn node(&self, id: &str) -> SimResult<&Node<S, ManualClock>> {
        let id = NodeId::from(id);
        self.nodes.get(&id).ok_or(SimError::UnknownNode(id))
    }

    pub fn nodes(&self) -> impl Iterator<Item = (&NodeId, &Node<S, ManualClock>)> {
        self.nodes.iter()
    }

    pub fn kv(&self) -> &KvStore {
        &self.kv
    }

    pub fn stats(&self) -> NetworkStats {
        self.stats
    }

    /// Simulated time elapsed since the cluster started.
    pub fn now(&self) -> Duration {
        Duration::from_nanos(self.now_ns)
    }

    /// Messages still on the wire.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Everything nodes have sent to clients or the harness.
    pub fn client_inbox(&self) -> &[Envelope] {
        &self.client_inbox
    }

    /// The first reply to the client request `msg_id`.
    pub fn reply(&self, msg_id: MsgId) -> Option<&Envelope> {
        self.client_inbox
            .iter()
            .find(|e| e.body.in_reply_to == Some(msg_id))
    }

    // ========================================================================
    // Driving
    // ========================================================================

    /// Delivers a client request to `dest` immediately and returns its id.
    ///
    /// # Errors
    ///
    /// Fails if the node hits a fatal error.
    pub fn request<P: Serialize>(&mut self, dest: &str, payload: &P) -> SimResult<MsgId> {
        self.inject(CLIENT, NodeId::from(dest), payload)
    }

    fn inject<P: Serialize>(&mut self, src: &str, dest: NodeId, payload: &P) -> SimResult<MsgId> {
        self.last_client_msg_id = self.last_client_msg_id.next();
        let msg_id = self.last_client_msg_id;
        let body = Body::from_payload(payload)?.with_msg_id(msg_id);
        self.deliver(Envelope::new(src, dest, body))?;
        Ok(msg_id)
    }

    /// Delivers one in-flight message, subject to the fault model.
    ///
    /// Returns `false` when nothing was in flight.
    pub fn step(&mut self) -> SimResult<bool> {
        if self.in_flight.is_empty() {
            return Ok(false);
        }

        let envelope = if self.config.reorder {
            let index = self.rng.index(self.in_flight.len());
            self.in_flight.swap_remove(index)
        } else {
            self.in_flight.remove(0)
        };

        if self.rng.chance(self.config.drop_probability) {
            self.stats.dropped += 1;
            trace!(kind = %envelope.body.kind, src = %envelope.src, dest = %envelope.dest, "dropped");
            return Ok(true);
        }
        if self.rng.chance(self.config.duplicate_probability) {
            self.stats.duplicated += 1;
            self.in_flight.push(envelope.clone());
        }

        self.stats.delivered += 1;
        self.deliver(envelope)?;
        Ok(true)
    }

    /// Steps until nothing is in flight; returns the number of steps.
    ///
    /// # Errors
    ///
    /// [`SimError::NotQuiet`] if the network is still busy after
    /// `max_steps`.
    pub fn run_until_quiet(&mut self, max_steps: usize) -> SimResult<usize> {
        for steps in 0..max_steps {
            if !self.step()? {
                return Ok(steps);
            }
        }
        if self.in_flight.is_empty() {
            Ok(max_steps)
        } else {
            Err(SimError::NotQuiet(max_steps))
        }
    }

    /// Moves every clock forward by `by` and ticks every node once.
    pub fn advance(&mut self, by: Duration) -> SimResult<()> {
        self.now_ns = self
            .now_ns
            .saturating_add(u64::try_from(by.as_nanos()).unwrap_or(u64::MAX));

        let ids: Vec<NodeId> = self.nodes.keys().cloned().collect();
        for id in ids {
            let out = {
                let node = self.node_mut(&id)?;
                node.tick().map_err(|source| SimError::Node {
                    id: id.clone(),
                    source,
                })?
            };
            self.route(out)?;
        }
        Ok(())
    }

    /// Runs `rounds` iterations of advance-then-drain.
    pub fn run_rounds(&mut self, rounds: usize, interval: Duration) -> SimResult<()> {
        for _ in 0..rounds {
            self.advance(interval)?;
            self.run_until_quiet(MAX_DELIVERIES_PER_ROUND)?;
        }
        Ok(())
    }

    fn node_mut(&mut self, id: &NodeId) -> SimResult<&mut Node<S, ManualClock>> {
        let now_ns = self.now_ns;
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| SimError::UnknownNode(id.clone()))?;
        node.clock_mut().set(now_ns);
        Ok(node)
    }

    fn deliver(&mut self, envelope: Envelope) -> SimResult<()> {
        let id = envelope.dest.clone();
        let out = self
            .node_mut(&id)?
            .handle(envelope)
            .map_err(|source| SimError::Node { id, source })?;
        self.route(out)
    }

    fn route(&mut self, out: Vec<Envelope>) -> SimResult<()> {
        for envelope in out {
            self.stats.sent += 1;
            if self.nodes.contains_key(&envelope.dest) {
                self.in_flight.push(envelope);
            } else if KvStore::serves(&envelope.dest) {
                let reply = self.kv.handle(&envelope)?;
                self.stats.sent += u64::from(reply.is_some());
                self.in_flight.extend(reply);
            } else {
                self.client_inbox.push(envelope);
            }
        }
        Ok(())
    }
}
