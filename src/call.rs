//! The `Call` aggregate (§3) and its actor (§5, §9): a single-threaded
//! cooperative owner of a set of transactions, driven by an mpsc-fed
//! command loop the way a long-lived session actor elsewhere in this
//! codebase's lineage is — an `Arc`-backed handle sends commands through
//! a channel, and one `tokio::spawn`ed task owns the mutable `Call` and
//! processes commands one at a time.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use crate::config::EngineConfig;
use crate::message::{DialogId, MsgId, MsgLog, SipMsg, TransId};
use crate::traits::Collaborators;
use crate::transaction::Trans;
use crate::uac;

/// Aggregate call state: the transaction map and the recent-message log.
/// Exclusively owns its `Trans`es — nothing outside the owning actor task
/// ever holds a `&mut Call` at the same time as another.
pub struct Call {
    /// Identifies the owning service/application, opaque to this core.
    pub service_id: Arc<str>,
    /// Live and recently-finished transactions, keyed by id.
    pub trans: HashMap<TransId, Trans>,
    /// Recent `(msg_id, trans_id, dialog_id)` triples, most-recent first.
    pub msg_log: MsgLog,
    /// Shared engine configuration (timer defaults, trans_time, ...).
    pub config: Arc<EngineConfig>,
}

impl Call {
    /// Creates an empty call for `service_id`.
    pub fn new(service_id: impl Into<Arc<str>>, config: Arc<EngineConfig>) -> Self {
        Self {
            service_id: service_id.into(),
            trans: HashMap::new(),
            msg_log: MsgLog::new(),
            config,
        }
    }

    /// Appends a message-log entry, evicting the oldest once the
    /// configured capacity is exceeded.
    pub fn log_message(&mut self, msg_id: MsgId, trans_id: Option<TransId>, dialog_id: Option<DialogId>) {
        self.msg_log.push_front((msg_id, trans_id, dialog_id));
        while self.msg_log.len() > self.config.msg_log_capacity {
            self.msg_log.pop_back();
        }
    }

    /// Inserts or replaces a transaction.
    pub fn put_trans(&mut self, trans: Trans) {
        self.trans.insert(trans.id.clone(), trans);
    }
}

/// Commands the call actor accepts. Only response ingestion is modeled
/// here — request-side forking is driven synchronously through
/// [`crate::router::route`] by whatever owns the `Call` at fork time,
/// since §5 only requires suspension-free synchronicity up to the point
/// of dispatching a transport send.
pub enum Command {
    /// A response arrived for one of this call's transactions.
    Response {
        /// The response.
        response: SipMsg,
        /// The transaction it is addressed to.
        trans_id: TransId,
        /// Completion signal, for callers that want to wait.
        done: Option<oneshot::Sender<()>>,
    },
}

/// A cheaply-cloneable handle to a running call actor.
#[derive(Clone)]
pub struct CallHandle {
    tx: mpsc::Sender<Command>,
}

impl CallHandle {
    /// Delivers a response to the call actor, not waiting for it to be
    /// processed.
    pub async fn deliver_response(&self, response: SipMsg, trans_id: TransId) -> Result<(), crate::error::Error> {
        self.tx
            .send(Command::Response {
                response,
                trans_id,
                done: None,
            })
            .await
            .map_err(|_| crate::error::Error::ChannelClosed)
    }

    /// Delivers a response and waits until the actor has finished
    /// processing it — used by tests that need deterministic ordering.
    pub async fn deliver_response_sync(&self, response: SipMsg, trans_id: TransId) -> Result<(), crate::error::Error> {
        let (done_tx, done_rx) = oneshot::channel();
        self.tx
            .send(Command::Response {
                response,
                trans_id,
                done: Some(done_tx),
            })
            .await
            .map_err(|_| crate::error::Error::ChannelClosed)?;
        done_rx.await.map_err(|_| crate::error::Error::ChannelClosed)
    }
}

/// Spawns the call actor task, returning a handle to it. The task runs
/// until every [`CallHandle`] clone is dropped.
pub fn spawn(mut call: Call, collaborators: Arc<Collaborators>) -> CallHandle {
    let (tx, mut rx) = mpsc::channel(64);
    tokio::spawn(async move {
        while let Some(cmd) = rx.recv().await {
            match cmd {
                Command::Response {
                    response,
                    trans_id,
                    done,
                } => {
                    if let Err(err) = uac::handle_response(response, &trans_id, &mut call, &collaborators).await {
                        log::warn!("uac response handling failed for {trans_id}: {err}");
                    }
                    if let Some(done) = done {
                        let _ = done.send(());
                    }
                }
            }
        }
        log::debug!("call actor for service shutting down");
    });
    CallHandle { tx }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;

    #[test]
    fn log_message_evicts_oldest() {
        let mut call = Call::new("svc", Arc::new(EngineConfig::builder().msg_log_capacity(2).build()));
        call.log_message(Arc::from("m1"), None, None);
        call.log_message(Arc::from("m2"), None, None);
        call.log_message(Arc::from("m3"), None, None);
        assert_eq!(call.msg_log.len(), 2);
        assert_eq!(call.msg_log.back().unwrap().0.as_ref(), "m2");
        assert_eq!(call.msg_log.front().unwrap().0.as_ref(), "m3");
    }
}
