//! Request handlers and the anti-entropy hook.

use gossamer_node::{Clock, ConfigurationError, Context, Node, NodeResult};
use gossamer_wire::{Envelope, ErrorCode};
use tracing::{debug, trace, warn};

use crate::payload::BroadcastPayload;
use crate::state::{BroadcastState, Value};

/// Registers the broadcast handlers and the gossip hook on `node`.
///
/// # Errors
///
/// Fails if any broadcast message type already has a handler.
pub fn install<C: Clock>(node: &mut Node<BroadcastState, C>) -> Result<(), ConfigurationError> {
    for kind in BroadcastPayload::REQUEST_KINDS {
        node.register_handler(kind, handle)?;
    }
    node.register_hook(propagate);
    Ok(())
}

fn handle(ctx: &mut Context<BroadcastState>, request: Envelope) -> NodeResult<()> {
    let payload = match request.body.decode::<BroadcastPayload>() {
        Ok(payload) => payload,
        Err(e) => {
            if request.body.msg_id.is_some() {
                ctx.reply_error(&request, ErrorCode::MalformedRequest, e.to_string())?;
            }
            return Err(e.into());
        }
    };

    match payload {
        BroadcastPayload::Broadcast { message } => {
            if ctx.state_mut().insert(message) {
                debug!(message, "accepted new value");
            }
            ctx.reply(&request, &BroadcastPayload::BroadcastOk)
        }
        BroadcastPayload::Read => {
            let messages = ctx.state().messages().iter().copied().collect();
            ctx.reply(&request, &BroadcastPayload::ReadOk { messages })
        }
        BroadcastPayload::Topology { topology } => {
            ctx.set_topology(topology);
            debug!(neighbors = ?ctx.neighbors(), "topology installed");
            ctx.reply(&request, &BroadcastPayload::TopologyOk)
        }
        BroadcastPayload::Gossip { seen } => {
            receive_gossip(ctx, &request, &seen);
            Ok(())
        }
        BroadcastPayload::BroadcastOk
        | BroadcastPayload::ReadOk { .. }
        | BroadcastPayload::TopologyOk => {
            warn!(kind = %request.body.kind, "uncorrelated acknowledgement");
            Ok(())
        }
    }
}

fn receive_gossip(ctx: &mut Context<BroadcastState>, request: &Envelope, seen: &[Value]) {
    let state = ctx.state_mut();
    let learned = state.merge(seen.iter().copied());
    state.record_known(&request.src, seen);
    trace!(from = %request.src, received = seen.len(), learned, "gossip merged");
}

/// Sends each neighbour the values it is not known to hold.
///
/// Runs at most once per configured interval; earlier calls are no-ops.
/// Sent values are recorded as known without waiting for confirmation, and
/// the periodic full sync repairs anything a lost message left behind. With
/// full syncs off, values are resent until the neighbour gossips them back.
pub fn propagate(ctx: &mut Context<BroadcastState>) -> NodeResult<()> {
    let now_ns = ctx.now_ns();
    let Some(full_sync) = ctx.state_mut().begin_round(now_ns) else {
        return Ok(());
    };

    let me = ctx.id().clone();
    let neighbors: Vec<_> = ctx.neighbors().iter().filter(|n| **n != me).cloned().collect();

    for neighbor in neighbors {
        let seen = ctx.state().delta_for(&neighbor, full_sync);
        if seen.is_empty() {
            continue;
        }
        trace!(to = %neighbor, values = seen.len(), full_sync, "gossip");
        ctx.state_mut().record_sent(&neighbor, &seen);
        ctx.send_payload(neighbor, &BroadcastPayload::Gossip { seen })?;
    }
    Ok(())
}
