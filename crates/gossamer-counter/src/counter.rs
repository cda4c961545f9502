//! Request handlers, the write pipeline and the read fan-out.

use gossamer_node::{Clock, ConfigurationError, Context, KvError, KvReply, Node, NodeResult};
use gossamer_wire::{Envelope, ErrorCode, NodeId};
use tracing::{debug, warn};

use crate::payload::CounterPayload;
use crate::state::{CounterState, FinishedRead, WriteTicket};

/// Registers the counter handlers and the flush hook on `node`.
///
/// # Errors
///
/// Fails if `add` or `read` already has a handler.
pub fn install<C: Clock>(node: &mut Node<CounterState, C>) -> Result<(), ConfigurationError> {
    for kind in CounterPayload::REQUEST_KINDS {
        node.register_handler(kind, handle)?;
    }
    node.register_hook(flush);
    Ok(())
}

fn handle(ctx: &mut Context<CounterState>, request: Envelope) -> NodeResult<()> {
    let payload = match request.body.decode::<CounterPayload>() {
        Ok(payload) => payload,
        Err(e) => {
            if request.body.msg_id.is_some() {
                ctx.reply_error(&request, ErrorCode::MalformedRequest, e.to_string())?;
            }
            return Err(e.into());
        }
    };

    match payload {
        CounterPayload::Add { delta } => {
            let total = ctx.state_mut().add(delta);
            debug!(delta, total, "add accepted");
            ctx.reply(&request, &CounterPayload::AddOk)?;
            write_if_behind(ctx)
        }
        CounterPayload::Read => start_read(ctx, request),
        CounterPayload::AddOk | CounterPayload::ReadOk { .. } => {
            warn!(kind = %request.body.kind, "uncorrelated acknowledgement");
            Ok(())
        }
    }
}

/// Periodic upkeep: gives up on stalled requests and pushes the local
/// total to the store if it is behind.
pub fn flush(ctx: &mut Context<CounterState>) -> NodeResult<()> {
    let now_ns = ctx.now_ns();

    if let Some(ticket) = ctx.state_mut().expire_write(now_ns) {
        warn!(generation = ticket.generation, to = ticket.to, "write timed out, retrying");
    }
    for read in ctx.state_mut().expire_reads(now_ns) {
        warn!(missing = read.missing, "read timed out, answering with partial sum");
        answer_read(ctx, &read)?;
    }

    write_if_behind(ctx)
}

// ============================================================================
// Writes
// ============================================================================

fn write_if_behind(ctx: &mut Context<CounterState>) -> NodeResult<()> {
    let now_ns = ctx.now_ns();
    let Some(ticket) = ctx.state_mut().start_write(now_ns) else {
        return Ok(());
    };

    let key = ctx.id().to_string();
    let kv = ctx.state().kv().clone();
    debug!(from = ticket.from, to = ticket.to, generation = ticket.generation, "writing total");
    kv.cas(ctx, key, ticket.from, ticket.to, true, move |ctx, result| {
        on_written(ctx, ticket, result)
    })
}

fn on_written(
    ctx: &mut Context<CounterState>,
    ticket: WriteTicket,
    result: Result<KvReply, KvError>,
) -> NodeResult<()> {
    match result {
        Ok(_) => {
            if ctx.state_mut().end_write(ticket.generation, Some(ticket.to)) {
                write_if_behind(ctx)?;
            } else {
                debug!(generation = ticket.generation, "late write acknowledgement ignored");
            }
            Ok(())
        }
        Err(e) if e.code() == Some(ErrorCode::PreconditionFailed) => {
            if !ctx.state_mut().end_write(ticket.generation, None) {
                return Ok(());
            }
            // The store moved without us seeing the ack; learn where it is.
            debug!(from = ticket.from, "stored total unknown, reading it back");
            let key = ctx.id().to_string();
            let kv = ctx.state().kv().clone();
            kv.read(ctx, key, |ctx, result| {
                let stored = peer_value(ctx.id(), result);
                ctx.state_mut().set_persisted(stored);
                write_if_behind(ctx)
            })
        }
        Err(e) => {
            ctx.state_mut().end_write(ticket.generation, None);
            warn!(error = %e, "write failed, will retry");
            Ok(())
        }
    }
}

// ============================================================================
// Reads
// ============================================================================

fn start_read(ctx: &mut Context<CounterState>, request: Envelope) -> NodeResult<()> {
    let peers: Vec<NodeId> = ctx.peers().cloned().collect();
    if peers.is_empty() {
        let value = ctx.state().total();
        return ctx.reply(&request, &CounterPayload::ReadOk { value });
    }

    let now_ns = ctx.now_ns();
    let token = ctx.state_mut().begin_read(request, peers.len(), now_ns);
    let kv = ctx.state().kv().clone();

    for peer in peers {
        kv.read(ctx, peer.to_string(), move |ctx, result| {
            let value = peer_value(&peer, result);
            match ctx.state_mut().record_peer_value(token, value) {
                Some(read) => answer_read(ctx, &read),
                None => Ok(()),
            }
        })?;
    }
    Ok(())
}

fn answer_read(ctx: &mut Context<CounterState>, read: &FinishedRead) -> NodeResult<()> {
    let value = ctx.state().total().saturating_add(read.peers);
    ctx.reply(&read.request, &CounterPayload::ReadOk { value })
}

/// A peer's stored total. A key that was never written counts as zero, as
/// does anything unreadable.
fn peer_value(peer: &NodeId, result: Result<KvReply, KvError>) -> u64 {
    match result.map(KvReply::into_value) {
        Ok(Some(value)) => value.as_u64().unwrap_or_else(|| {
            warn!(%peer, %value, "non-numeric total");
            0
        }),
        Ok(None) => {
            warn!(%peer, "read answered without a value");
            0
        }
        Err(e) if e.code() == Some(ErrorCode::KeyDoesNotExist) => 0,
        Err(e) => {
            warn!(%peer, error = %e, "could not read total");
            0
        }
    }
}
