//! Per-node context handed to handlers, callbacks and hooks.
//!
//! A context only exists once the node has been initialized, so identity
//! accessors never fail. Sends are queued in an outbox that the runtime
//! drains after every step.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use gossamer_wire::{Body, Envelope, ErrorBody, ErrorCode, MsgId, NodeId, RuntimePayload};
use serde::Serialize;
use tracing::debug;

use crate::error::{NodeResult, ProtocolError};
use crate::topology::Topology;

/// One-shot continuation run when the reply to a correlated request arrives.
pub type Callback<S> = Box<dyn FnOnce(&mut Context<S>, Envelope) -> NodeResult<()>>;

/// Identity, topology, application state and outbound queue of a node.
pub struct Context<S> {
    id: NodeId,
    node_ids: Vec<NodeId>,
    topology: Topology,
    last_msg_id: MsgId,
    callbacks: HashMap<MsgId, Callback<S>>,
    outbox: Vec<Envelope>,
    now_ns: u64,
    state: S,
}

impl<S> Context<S> {
    pub(crate) fn new(id: NodeId, node_ids: Vec<NodeId>, state: S, now_ns: u64) -> Self {
        let topology = Topology::line(&node_ids);
        Self {
            id,
            node_ids,
            topology,
            last_msg_id: MsgId::default(),
            callbacks: HashMap::new(),
            outbox: Vec::new(),
            now_ns,
            state,
        }
    }

    // ========================================================================
    // Identity & topology
    // ========================================================================

    /// This node's id.
    pub fn id(&self) -> &NodeId {
        &self.id
    }

    /// Every node in the cluster, including this one, in handshake order.
    pub fn node_ids(&self) -> &[NodeId] {
        &self.node_ids
    }

    /// Every node in the cluster except this one.
    pub fn peers(&self) -> impl Iterator<Item = &NodeId> {
        self.node_ids.iter().filter(move |id| **id != self.id)
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Replaces the topology wholesale.
    pub fn set_topology(&mut self, topology: Topology) {
        debug!(nodes = topology.len(), "topology replaced");
        self.topology = topology;
    }

    /// This node's neighbours under the current topology.
    pub fn neighbors(&self) -> &[NodeId] {
        self.topology.neighbors(&self.id)
    }

    // ========================================================================
    // State & time
    // ========================================================================

    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut S {
        &mut self.state
    }

    /// Time of the current step, in nanoseconds from the clock's origin.
    pub fn now_ns(&self) -> u64 {
        self.now_ns
    }

    /// Time of the current step as a [`Duration`] from the clock's origin.
    pub fn now(&self) -> Duration {
        Duration::from_nanos(self.now_ns)
    }

    pub(crate) fn set_now_ns(&mut self, now_ns: u64) {
        self.now_ns = now_ns;
    }

    // ========================================================================
    // Sending
    // ========================================================================

    /// Allocates the next message id. Ids start at 1 and never repeat.
    pub fn next_msg_id(&mut self) -> MsgId {
        self.last_msg_id = self.last_msg_id.next();
        self.last_msg_id
    }

    /// Queues a message without correlation.
    pub fn send(&mut self, dest: impl Into<NodeId>, body: Body) {
        let envelope = Envelope::new(self.id.clone(), dest, body);
        debug!(kind = %envelope.body.kind, dest = %envelope.dest, "queued");
        self.outbox.push(envelope);
    }

    /// Queues a typed payload without correlation.
    pub fn send_payload<P: Serialize>(
        &mut self,
        dest: impl Into<NodeId>,
        payload: &P,
    ) -> NodeResult<()> {
        let body = Body::from_payload(payload)?;
        self.send(dest, body);
        Ok(())
    }

    /// Sends a correlated request and registers `callback` for its reply.
    ///
    /// The callback is stored before the request is queued, and runs at most
    /// once. If no reply ever arrives it is never run.
    pub fn rpc<F>(&mut self, dest: impl Into<NodeId>, body: Body, callback: F) -> MsgId
    where
        F: FnOnce(&mut Context<S>, Envelope) -> NodeResult<()> + 'static,
    {
        let msg_id = self.next_msg_id();
        self.callbacks.insert(msg_id, Box::new(callback));
        self.send(dest, body.with_msg_id(msg_id));
        msg_id
    }

    /// Replies to `request`, correlating by its `msg_id`.
    pub fn reply_to(&mut self, request: &Envelope, body: Body) -> NodeResult<()> {
        let Some(msg_id) = request.body.msg_id else {
            return Err(ProtocolError::MissingMsgId {
                kind: request.body.kind.clone(),
            }
            .into());
        };
        self.send(request.src.clone(), body.with_in_reply_to(msg_id));
        Ok(())
    }

    /// Replies to `request` with a typed payload.
    pub fn reply<P: Serialize>(&mut self, request: &Envelope, payload: &P) -> NodeResult<()> {
        let body = Body::from_payload(payload)?;
        self.reply_to(request, body)
    }

    /// Replies to `request` with an `error` body.
    pub fn reply_error(
        &mut self,
        request: &Envelope,
        code: ErrorCode,
        text: impl Into<String>,
    ) -> NodeResult<()> {
        self.reply(
            request,
            &RuntimePayload::Error(ErrorBody {
                code,
                text: Some(text.into()),
            }),
        )
    }

    /// Number of correlated requests still waiting for a reply.
    pub fn pending_callbacks(&self) -> usize {
        self.callbacks.len()
    }

    pub(crate) fn take_callback(&mut self, msg_id: MsgId) -> Option<Callback<S>> {
        self.callbacks.remove(&msg_id)
    }

    pub(crate) fn drain_outbox(&mut self) -> Vec<Envelope> {
        std::mem::take(&mut self.outbox)
    }

    pub(crate) fn into_state(self) -> S {
        self.state
    }
}

impl<S: fmt::Debug> fmt::Debug for Context<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("id", &self.id)
            .field("node_ids", &self.node_ids)
            .field("topology", &self.topology)
            .field("last_msg_id", &self.last_msg_id)
            .field("pending_callbacks", &self.callbacks.len())
            .field("outbox", &self.outbox.len())
            .field("now_ns", &self.now_ns)
            .field("state", &self.state)
            .finish()
    }
}
