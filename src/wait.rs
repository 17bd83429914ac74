//! Waiting for every watch to finish its initial listing

use crate::{errors::CountError, identity::ResourceTypeIdentity};
use event_listener::Event;
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio_util::sync::CancellationToken;

/// Initial-sync flag of one stream.
pub(crate) struct SyncFlag {
    synced: AtomicBool,
    changed: Arc<Event>,
}

impl SyncFlag {
    pub(crate) fn new(changed: Arc<Event>) -> Self {
        SyncFlag {
            synced: AtomicBool::new(false),
            changed,
        }
    }

    pub(crate) fn set(&self) {
        if !self.synced.swap(true, Ordering::AcqRel) {
            self.changed.notify(usize::MAX);
        }
    }

    pub(crate) fn is_synced(&self) -> bool {
        self.synced.load(Ordering::Acquire)
    }
}

/// Blocks until all registered streams have synced, then cancels them.
pub struct SyncBarrier {
    pub(crate) streams: Vec<(ResourceTypeIdentity, Arc<SyncFlag>)>,
    pub(crate) changed: Arc<Event>,
    pub(crate) cancel: CancellationToken,
}

impl SyncBarrier {
    /// Identities whose streams have not synced yet, without repeats
    pub fn unsynced(&self) -> Vec<ResourceTypeIdentity> {
        let mut out: Vec<ResourceTypeIdentity> = Vec::new();
        for (identity, flag) in &self.streams {
            if !flag.is_synced() && !out.contains(identity) {
                out.push(identity.clone());
            }
        }
        out
    }

    async fn all_synced(&self) {
        loop {
            // listen before checking, so a notification in between is not lost
            let listener = self.changed.listen();
            if self.streams.iter().all(|(_, flag)| flag.is_synced()) {
                return;
            }
            listener.await;
        }
    }

    /// Waits for every stream, bounded by `deadline` if given.
    ///
    /// The streams are cancelled whatever the outcome; on timeout the error
    /// names every stream that was still listing.
    #[tracing::instrument(skip(self), fields(streams = self.streams.len()))]
    pub async fn wait(self, deadline: Option<Duration>) -> Result<(), CountError> {
        let outcome = match deadline {
            None => {
                self.all_synced().await;
                Ok(())
            }
            Some(deadline) => {
                let deadline_exceeded = tokio::time::sleep(deadline);
                tokio::select! {
                    _ = self.all_synced() => Ok(()),
                    _ = deadline_exceeded => Err(CountError::SyncFailure {
                        identities: self.unsynced(),
                    }),
                }
            }
        };
        match &outcome {
            Ok(()) => tracing::debug!("all streams synced"),
            Err(err) => tracing::warn!("{}", err),
        }
        self.cancel.cancel();
        outcome
    }
}
