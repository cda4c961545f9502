//! The dispatch runtime.
//!
//! Each step of the receive loop:
//!
//! 1. decodes a line into an [`Envelope`] (malformed lines are skipped),
//! 2. runs every periodic hook in registration order,
//! 3. completes the handshake for `init`, resolves the pending callback for
//!    a reply, or invokes the handler registered for the message type,
//! 4. returns everything queued for sending.
//!
//! Unknown types and replies without a pending callback are logged and
//! ignored.

use std::collections::HashMap;
use std::fmt;

use gossamer_wire::payload::RESERVED_KINDS;
use gossamer_wire::{Body, Envelope, InitPayload, RuntimePayload, codec};
use tracing::{debug, info, instrument, warn};

use crate::clock::{Clock, SystemClock};
use crate::context::Context;
use crate::error::{ConfigurationError, NodeResult, ProtocolError};

/// Handler for one message type.
pub type Handler<S> = Box<dyn FnMut(&mut Context<S>, Envelope) -> NodeResult<()>>;

/// Logic run once per loop iteration, before the iteration's message.
pub type Hook<S> = Box<dyn FnMut(&mut Context<S>) -> NodeResult<()>>;

/// Counters describing what the dispatcher has done so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Envelopes dispatched (decoded lines, including `init`).
    pub received: u64,
    /// Envelopes handed back for sending.
    pub sent: u64,
    /// Lines skipped because they did not decode.
    pub decode_failures: u64,
    /// Messages with no handler, or replies with no pending callback.
    pub unhandled: u64,
    /// Replies matched to a pending callback.
    pub callbacks_resolved: u64,
    /// Non-fatal errors logged and ignored.
    pub recovered_errors: u64,
}

/// A single participant: identity, handler table, callback table and hooks.
///
/// Generic over the application state `S` and the [`Clock`] used to stamp
/// each step, so the same node runs against wall-clock time in production
/// and against a [`ManualClock`](crate::ManualClock) in simulation.
pub struct Node<S, C = SystemClock> {
    /// Application state held until the handshake creates the context.
    waiting_state: Option<S>,
    context: Option<Context<S>>,
    handlers: HashMap<String, Handler<S>>,
    hooks: Vec<Hook<S>>,
    clock: C,
    stats: DispatchStats,
}

impl<S> Node<S, SystemClock> {
    /// Creates an uninitialized node driven by the system clock.
    pub fn new(state: S) -> Self {
        Self::with_clock(state, SystemClock::new())
    }
}

impl<S, C: Clock> Node<S, C> {
    /// Creates an uninitialized node driven by `clock`.
    pub fn with_clock(state: S, clock: C) -> Self {
        Self {
            waiting_state: Some(state),
            context: None,
            handlers: HashMap::new(),
            hooks: Vec::new(),
            clock,
            stats: DispatchStats::default(),
        }
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Registers the handler for messages of type `kind`.
    ///
    /// # Errors
    ///
    /// [`ConfigurationError::ReservedType`] for `init` and `error`, and
    /// [`ConfigurationError::DuplicateHandler`] if `kind` already has one.
    pub fn register_handler<F>(
        &mut self,
        kind: impl Into<String>,
        handler: F,
    ) -> Result<(), ConfigurationError>
    where
        F: FnMut(&mut Context<S>, Envelope) -> NodeResult<()> + 'static,
    {
        let kind = kind.into();
        if RESERVED_KINDS.contains(&kind.as_str()) {
            return Err(ConfigurationError::ReservedType(kind));
        }
        if self.handlers.contains_key(&kind) {
            return Err(ConfigurationError::DuplicateHandler(kind));
        }

        self.handlers.insert(kind, Box::new(handler));
        Ok(())
    }

    /// Appends a periodic hook. Hooks run in registration order.
    ///
    /// Hooks must not block and must tolerate being called with nothing to
    /// do; gating on elapsed time is the hook's own business.
    pub fn register_hook<F>(&mut self, hook: F)
    where
        F: FnMut(&mut Context<S>) -> NodeResult<()> + 'static,
    {
        self.hooks.push(Box::new(hook));
    }

    // ========================================================================
    // Stepping
    // ========================================================================

    /// Processes one input line.
    ///
    /// Blank and malformed lines are skipped. Only fatal errors are returned.
    pub fn handle_line(&mut self, line: &str) -> NodeResult<Vec<Envelope>> {
        if codec::is_blank(line) {
            return Ok(Vec::new());
        }

        match codec::decode_line(line) {
            Ok(envelope) => self.handle(envelope),
            Err(e) => {
                self.stats.decode_failures += 1;
                warn!(error = %e, "skipping undecodable line");
                Ok(Vec::new())
            }
        }
    }

    /// Runs the hooks, dispatches `envelope`, and returns what to send.
    ///
    /// Only fatal errors are returned; anything else is logged.
    #[instrument(skip_all, fields(kind = %envelope.body.kind, src = %envelope.src))]
    pub fn handle(&mut self, envelope: Envelope) -> NodeResult<Vec<Envelope>> {
        self.stats.received += 1;
        debug!("received");

        self.run_hooks()?;
        let result = self.dispatch(envelope);
        self.absorb(result)?;

        Ok(self.drain())
    }

    /// Runs the hooks without dispatching anything.
    ///
    /// Driven by a wall-clock timer so background work does not depend on
    /// message arrival. Does nothing before initialization.
    pub fn tick(&mut self) -> NodeResult<Vec<Envelope>> {
        self.run_hooks()?;
        Ok(self.drain())
    }

    fn run_hooks(&mut self) -> NodeResult<()> {
        let Some(ctx) = self.context.as_mut() else {
            return Ok(());
        };
        ctx.set_now_ns(self.clock.now_ns());

        for hook in &mut self.hooks {
            let result = hook(ctx);
            Self::absorb_into(&mut self.stats, result)?;
        }
        Ok(())
    }

    fn dispatch(&mut self, envelope: Envelope) -> NodeResult<()> {
        if envelope.body.kind == RuntimePayload::INIT {
            return self.initialize(envelope);
        }

        let Some(ctx) = self.context.as_mut() else {
            return Err(ProtocolError::NotInitialized {
                kind: envelope.body.kind,
            }
            .into());
        };
        ctx.set_now_ns(self.clock.now_ns());

        if let Some(in_reply_to) = envelope.body.in_reply_to {
            return match ctx.take_callback(in_reply_to) {
                Some(callback) => {
                    self.stats.callbacks_resolved += 1;
                    callback(ctx, envelope)
                }
                None => {
                    self.stats.unhandled += 1;
                    warn!(%in_reply_to, "no callback pending for reply");
                    Ok(())
                }
            };
        }

        if envelope.body.kind == RuntimePayload::ERROR {
            self.stats.unhandled += 1;
            warn!(fields = ?envelope.body.fields, "uncorrelated error message");
            return Ok(());
        }

        match self.handlers.get_mut(envelope.body.kind.as_str()) {
            Some(handler) => handler(ctx, envelope),
            None => {
                self.stats.unhandled += 1;
                warn!("no handler registered");
                Ok(())
            }
        }
    }

    fn initialize(&mut self, envelope: Envelope) -> NodeResult<()> {
        let Some(state) = self.waiting_state.take() else {
            return Err(ProtocolError::AlreadyInitialized.into());
        };

        let payload = match envelope.body.decode::<InitPayload>() {
            Ok(payload) => payload,
            Err(e) => {
                self.waiting_state = Some(state);
                return Err(e.into());
            }
        };

        let mut ctx = Context::new(
            payload.node_id,
            payload.node_ids,
            state,
            self.clock.now_ns(),
        );
        info!(
            id = %ctx.id(),
            nodes = ctx.node_ids().len(),
            neighbors = ?ctx.neighbors(),
            "initialized"
        );

        let reply = ctx.reply_to(&envelope, Body::new(RuntimePayload::INIT_OK));
        self.context = Some(ctx);
        reply
    }

    fn absorb(&mut self, result: NodeResult<()>) -> NodeResult<()> {
        Self::absorb_into(&mut self.stats, result)
    }

    /// Logs and swallows recoverable errors; passes fatal ones through.
    fn absorb_into(stats: &mut DispatchStats, result: NodeResult<()>) -> NodeResult<()> {
        match result {
            Err(e) if !e.is_fatal() => {
                stats.recovered_errors += 1;
                warn!(error = %e, "ignoring recoverable error");
                Ok(())
            }
            other => other,
        }
    }

    fn drain(&mut self) -> Vec<Envelope> {
        let out = self
            .context
            .as_mut()
            .map(Context::drain_outbox)
            .unwrap_or_default();
        self.stats.sent += out.len() as u64;
        out
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn is_initialized(&self) -> bool {
        self.context.is_some()
    }

    /// The context, once the handshake has completed.
    pub fn context(&self) -> Option<&Context<S>> {
        self.context.as_ref()
    }

    pub fn context_mut(&mut self) -> Option<&mut Context<S>> {
        self.context.as_mut()
    }

    /// Application state, before or after initialization.
    pub fn state(&self) -> &S {
        match (&self.context, &self.waiting_state) {
            (Some(ctx), _) => ctx.state(),
            (None, Some(state)) => state,
            (None, None) => unreachable!("node holds its state either waiting or in a context"),
        }
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    /// Consumes the node and returns its application state.
    pub fn into_state(self) -> S {
        match (self.context, self.waiting_state) {
            (Some(ctx), _) => ctx.into_state(),
            (None, Some(state)) => state,
            (None, None) => unreachable!("node holds its state either waiting or in a context"),
        }
    }
}

impl<S, C: fmt::Debug> fmt::Debug for Node<S, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        f.debug_struct("Node")
            .field("id", &self.context.as_ref().map(Context::id))
            .field("handlers", &kinds)
            .field("hooks", &self.hooks.len())
            .field("clock", &self.clock)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
