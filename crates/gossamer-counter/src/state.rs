//! Counter state: the local total, the write pipeline and pending reads.

use std::collections::HashMap;
use std::time::Duration;

use gossamer_node::KvClient;
use gossamer_node::kv::SEQ_KV;
use gossamer_wire::{Envelope, NodeId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterConfig {
    /// Key-value service holding the per-node totals.
    pub service: NodeId,
    /// How long a write or a read fan-out may wait for replies.
    pub request_timeout: Duration,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            service: NodeId::from(SEQ_KV),
            request_timeout: Duration::from_secs(1),
        }
    }
}

/// The write currently awaiting its acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteTicket {
    pub generation: u64,
    /// Value believed to be stored before this write.
    pub from: u64,
    pub to: u64,
    started_ns: u64,
}

#[derive(Debug, Clone)]
struct PendingRead {
    request: Envelope,
    sum: u64,
    outstanding: usize,
    started_ns: u64,
}

/// A read that has everything it is going to get.
#[derive(Debug, Clone)]
pub struct FinishedRead {
    pub request: Envelope,
    /// Sum of the peer values that arrived.
    pub peers: u64,
    /// Peers that never answered.
    pub missing: usize,
}

#[derive(Debug, Clone)]
pub struct CounterState {
    config: CounterConfig,
    kv: KvClient,
    total: u64,
    persisted: u64,
    generation: u64,
    write: Option<WriteTicket>,
    reads: HashMap<u64, PendingRead>,
    next_read: u64,
}

impl CounterState {
    pub fn new(config: CounterConfig) -> Self {
        Self {
            kv: KvClient::new(config.service.clone()),
            config,
            total: 0,
            persisted: 0,
            generation: 0,
            write: None,
            reads: HashMap::new(),
            next_read: 0,
        }
    }

    pub fn config(&self) -> &CounterConfig {
        &self.config
    }

    pub fn kv(&self) -> &KvClient {
        &self.kv
    }

    /// Everything this node has accepted.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// The value last confirmed as stored under this node's key.
    pub fn persisted(&self) -> u64 {
        self.persisted
    }

    /// Adds `delta` to the local total and returns the new total.
    pub fn add(&mut self, delta: u64) -> u64 {
        self.total = self.total.saturating_add(delta);
        self.total
    }

    // ========================================================================
    // Writes
    // ========================================================================

    pub fn write_in_flight(&self) -> Option<&WriteTicket> {
        self.write.as_ref()
    }

    /// Starts a write if none is in flight and the store is behind.
    pub fn start_write(&mut self, now_ns: u64) -> Option<WriteTicket> {
        if self.write.is_some() || self.total == self.persisted {
            return None;
        }
        self.generation += 1;
        let ticket = WriteTicket {
            generation: self.generation,
            from: self.persisted,
            to: self.total,
            started_ns: now_ns,
        };
        self.write = Some(ticket);
        Some(ticket)
    }

    /// Ends the write `generation`. Returns `false` if it is no longer
    /// current, in which case nothing changes.
    pub fn end_write(&mut self, generation: u64, stored: Option<u64>) -> bool {
        match self.write {
            Some(ticket) if ticket.generation == generation => {
                self.write = None;
                if let Some(stored) = stored {
                    self.persisted = stored;
                }
                true
            }
            _ => false,
        }
    }

    /// Replaces the belief about what is stored, e.g. after reading it back.
    pub fn set_persisted(&mut self, stored: u64) {
        self.persisted = stored;
    }

    /// Forgets a write that has waited longer than the request timeout.
    pub fn expire_write(&mut self, now_ns: u64) -> Option<WriteTicket> {
        let ticket = self.write?;
        if now_ns.saturating_sub(ticket.started_ns) < self.timeout_ns() {
            return None;
        }
        self.write = None;
        Some(ticket)
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Registers a read waiting on `outstanding` peer replies.
    pub fn begin_read(&mut self, request: Envelope, outstanding: usize, now_ns: u64) -> u64 {
        self.next_read += 1;
        self.reads.insert(
            self.next_read,
            PendingRead {
                request,
                sum: 0,
                outstanding,
                started_ns: now_ns,
            },
        );
        self.next_read
    }

    /// Folds one peer reply into read `token`; returns the read once the
    /// last reply is in.
    pub fn record_peer_value(&mut self, token: u64, value: u64) -> Option<FinishedRead> {
        let read = self.reads.get_mut(&token)?;
        read.sum = read.sum.saturating_add(value);
        read.outstanding = read.outstanding.saturating_sub(1);
        if read.outstanding > 0 {
            return None;
        }
        self.reads.remove(&token).map(|read| FinishedRead {
            request: read.request,
            peers: read.sum,
            missing: 0,
        })
    }

    /// Removes and returns reads older than the request timeout.
    pub fn expire_reads(&mut self, now_ns: u64) -> Vec<FinishedRead> {
        let timeout_ns = self.timeout_ns();
        let mut expired: Vec<u64> = self
            .reads
            .iter()
            .filter(|(_, read)| now_ns.saturating_sub(read.started_ns) >= timeout_ns)
            .map(|(token, _)| *token)
            .collect();
        expired.sort_unstable();

        expired
            .into_iter()
            .filter_map(|token| self.reads.remove(&token))
            .map(|read| FinishedRead {
                request: read.request,
                peers: read.sum,
                missing: read.outstanding,
            })
            .collect()
    }

    pub fn pending_reads(&self) -> usize {
        self.reads.len()
    }

    fn timeout_ns(&self) -> u64 {
        u64::try_from(self.config.request_timeout.as_nanos()).unwrap_or(u64::MAX)
    }
}

impl Default for CounterState {
    fn default() -> Self {
        Self::new(CounterConfig::default())
    }
}
