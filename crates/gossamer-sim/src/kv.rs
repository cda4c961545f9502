//! In-memory stand-in for the harness key-value services.

use std::collections::{BTreeMap, HashMap};

use gossamer_node::KvPayload;
use gossamer_node::kv::{LIN_KV, LWW_KV, SEQ_KV};
use gossamer_wire::{Body, Envelope, ErrorBody, ErrorCode, NodeId, RuntimePayload, WireResult};
use serde_json::Value;
use tracing::trace;

/// One keyspace per service name.
///
/// Requests are applied atomically in arrival order, which is at least as
/// strong as every consistency model the real services offer.
#[derive(Debug, Clone, Default)]
pub struct KvStore {
    services: BTreeMap<String, HashMap<String, Value>>,
}

impl KvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether messages to `dest` are answered by this store.
    pub fn serves(dest: &NodeId) -> bool {
        matches!(dest.as_str(), SEQ_KV | LIN_KV | LWW_KV)
    }

    pub fn get(&self, service: &str, key: &str) -> Option<&Value> {
        self.services.get(service)?.get(key)
    }

    /// Seeds a value directly, bypassing the message path.
    pub fn put(&mut self, service: &str, key: impl Into<String>, value: impl Into<Value>) {
        self.services
            .entry(service.to_owned())
            .or_default()
            .insert(key.into(), value.into());
    }

    /// Applies `request` and builds the reply.
    ///
    /// Returns `None` for requests without a `msg_id`, which cannot be
    /// answered.
    pub fn handle(&mut self, request: &Envelope) -> WireResult<Option<Envelope>> {
        let Some(msg_id) = request.body.msg_id else {
            trace!(kind = %request.body.kind, "uncorrelated kv message dropped");
            return Ok(None);
        };

        let reply = match request.body.decode::<KvPayload>() {
            Ok(payload) => self.apply(request.dest.as_str(), payload),
            Err(e) => Err((ErrorCode::MalformedRequest, e.to_string())),
        };

        let body = match reply {
            Ok(payload) => Body::from_payload(&payload)?,
            Err((code, text)) => Body::from_payload(&RuntimePayload::Error(ErrorBody {
                code,
                text: Some(text),
            }))?,
        };

        Ok(Some(Envelope::new(
            request.dest.clone(),
            request.src.clone(),
            body.with_in_reply_to(msg_id),
        )))
    }

    fn apply(&mut self, service: &str, payload: KvPayload) -> Result<KvPayload, (ErrorCode, String)> {
        let store = self.services.entry(service.to_owned()).or_default();

        match payload {
            KvPayload::Read { key } => match store.get(&key) {
                Some(value) => Ok(KvPayload::ReadOk {
                    value: value.clone(),
                }),
                None => Err(missing(&key)),
            },
            KvPayload::Write { key, value } => {
                store.insert(key, value);
                Ok(KvPayload::WriteOk)
            }
            KvPayload::Cas {
                key,
                from,
                to,
                create_if_not_exists,
            } => match store.get_mut(&key) {
                Some(current) if *current == from => {
                    *current = to;
                    Ok(KvPayload::CasOk)
                }
                Some(current) => Err((
                    ErrorCode::PreconditionFailed,
                    format!("expected {from}, found {current}"),
                )),
                None if create_if_not_exists => {
                    store.insert(key, to);
                    Ok(KvPayload::CasOk)
                }
                None => Err(missing(&key)),
            },
            KvPayload::ReadOk { .. } | KvPayload::WriteOk | KvPayload::CasOk => Err((
                ErrorCode::NotSupported,
                "replies are not requests".to_owned(),
            )),
        }
    }
}

fn missing(key: &str) -> (ErrorCode, String) {
    (ErrorCode::KeyDoesNotExist, format!("key {key} does not exist"))
}
