//! Correlated requests to an external key-value service.
//!
//! The client keeps no state of its own: every request goes through
//! [`Context::rpc`], so the node's callback table is the only record of what
//! is outstanding. Fan-out callers track their own "last reply" condition;
//! the runtime offers no join primitive.

use gossamer_wire::{Body, Envelope, ErrorBody, NodeId, RuntimePayload};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::Context;
use crate::error::{KvError, NodeResult};

/// Sequentially consistent store.
pub const SEQ_KV: &str = "seq-kv";
/// Linearizable store.
pub const LIN_KV: &str = "lin-kv";
/// Last-write-wins store.
pub const LWW_KV: &str = "lww-kv";

/// Requests and replies spoken by the key-value services.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KvPayload {
    Read {
        key: String,
    },
    ReadOk {
        value: Value,
    },
    Write {
        key: String,
        value: Value,
    },
    WriteOk,
    Cas {
        key: String,
        from: Value,
        to: Value,
        #[serde(default)]
        create_if_not_exists: bool,
    },
    CasOk,
}

/// A successful key-value reply.
#[derive(Debug, Clone, PartialEq)]
pub enum KvReply {
    Value(Value),
    Written,
    Swapped,
}

impl KvReply {
    /// Interprets a reply envelope from a key-value service.
    pub fn parse(reply: &Envelope) -> Result<Self, KvError> {
        if reply.body.kind == RuntimePayload::ERROR {
            return match reply.body.decode::<RuntimePayload>()? {
                RuntimePayload::Error(ErrorBody { code, text }) => {
                    Err(KvError::Service { code, text })
                }
                _ => Err(KvError::UnexpectedReply(reply.body.kind.clone())),
            };
        }

        match reply.body.decode::<KvPayload>() {
            Ok(KvPayload::ReadOk { value }) => Ok(Self::Value(value)),
            Ok(KvPayload::WriteOk) => Ok(Self::Written),
            Ok(KvPayload::CasOk) => Ok(Self::Swapped),
            Ok(_) => Err(KvError::UnexpectedReply(reply.body.kind.clone())),
            Err(e) if reply.body.kind.ends_with("_ok") => Err(e.into()),
            Err(_) => Err(KvError::UnexpectedReply(reply.body.kind.clone())),
        }
    }

    /// Returns the value of a `read_ok` reply.
    pub fn into_value(self) -> Option<Value> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }
}

/// Thin client for one key-value service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvClient {
    service: NodeId,
}

impl KvClient {
    pub fn new(service: impl Into<NodeId>) -> Self {
        Self {
            service: service.into(),
        }
    }

    pub fn seq() -> Self {
        Self::new(SEQ_KV)
    }

    pub fn lin() -> Self {
        Self::new(LIN_KV)
    }

    pub fn lww() -> Self {
        Self::new(LWW_KV)
    }

    pub fn service(&self) -> &NodeId {
        &self.service
    }

    /// Reads `key`; `callback` receives the value or the service error.
    pub fn read<S, F>(
        &self,
        ctx: &mut Context<S>,
        key: impl Into<String>,
        callback: F,
    ) -> NodeResult<()>
    where
        F: FnOnce(&mut Context<S>, Result<KvReply, KvError>) -> NodeResult<()> + 'static,
    {
        self.request(ctx, &KvPayload::Read { key: key.into() }, callback)
    }

    /// Writes `value` under `key`.
    pub fn write<S, F>(
        &self,
        ctx: &mut Context<S>,
        key: impl Into<String>,
        value: impl Into<Value>,
        callback: F,
    ) -> NodeResult<()>
    where
        F: FnOnce(&mut Context<S>, Result<KvReply, KvError>) -> NodeResult<()> + 'static,
    {
        let payload = KvPayload::Write {
            key: key.into(),
            value: value.into(),
        };
        self.request(ctx, &payload, callback)
    }

    /// Atomically replaces `from` with `to` under `key`.
    pub fn cas<S, F>(
        &self,
        ctx: &mut Context<S>,
        key: impl Into<String>,
        from: impl Into<Value>,
        to: impl Into<Value>,
        create_if_not_exists: bool,
        callback: F,
    ) -> NodeResult<()>
    where
        F: FnOnce(&mut Context<S>, Result<KvReply, KvError>) -> NodeResult<()> + 'static,
    {
        let payload = KvPayload::Cas {
            key: key.into(),
            from: from.into(),
            to: to.into(),
            create_if_not_exists,
        };
        self.request(ctx, &payload, callback)
    }

    fn request<S, F>(&self, ctx: &mut Context<S>, payload: &KvPayload, callback: F) -> NodeResult<()>
    where
        F: FnOnce(&mut Context<S>, Result<KvReply, KvError>) -> NodeResult<()> + 'static,
    {
        let body = Body::from_payload(payload)?;
        ctx.rpc(self.service.clone(), body, move |ctx, reply| {
            callback(ctx, KvReply::parse(&reply))
        });
        Ok(())
    }
}
