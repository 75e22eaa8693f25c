//! Loading and saving [`PlayerProgress`] through a [`PersistenceAdapter`].
//!
//! Saves are queued to a single [`ProgressWriter`] so writes to the record
//! key never interleave. A queued burst is collapsed to its newest value.

use crate::progress::PlayerProgress;
use anyhow::{
    Context,
    Result,
};
use cloud_store::PersistenceAdapter;
use tokio::sync::mpsc;
use tracing::{
    debug,
    warn,
};

pub const PROGRESS_KEY: &str = "playerData";

/// Missing or unreadable records start a fresh profile; the store is never
/// allowed to block a session from starting.
pub async fn load_progress(store: &impl PersistenceAdapter) -> PlayerProgress {
    match read_progress(store).await {
        Ok(Some(progress)) => progress,
        Ok(None) => {
            debug!("no stored progress, starting fresh");
            PlayerProgress::default()
        }
        Err(err) => {
            warn!(?err, "stored progress unavailable, starting fresh");
            PlayerProgress::default()
        }
    }
}

pub async fn read_progress(
    store: &impl PersistenceAdapter,
) -> Result<Option<PlayerProgress>> {
    let Some(raw) = store.get(PROGRESS_KEY).await? else {
        return Ok(None);
    };
    let progress: PlayerProgress =
        serde_json::from_str(&raw).context("Failed to parse stored player progress")?;
    Ok(Some(progress.normalized()))
}

pub async fn write_progress(
    store: &impl PersistenceAdapter,
    progress: &PlayerProgress,
) -> Result<()> {
    let json =
        serde_json::to_string(progress).context("Failed to serialize player progress")?;
    store
        .set(PROGRESS_KEY, &json)
        .await
        .context("Failed to store player progress")
}

#[derive(Clone, Debug)]
pub struct ProgressSaver {
    tx: mpsc::UnboundedSender<PlayerProgress>,
}

impl ProgressSaver {
    pub fn save(&self, progress: &PlayerProgress) {
        if self.tx.send(progress.clone()).is_err() {
            warn!("progress writer stopped, change kept in memory only");
        }
    }
}

pub struct ProgressWriter<A> {
    store: A,
    rx: mpsc::UnboundedReceiver<PlayerProgress>,
}

pub fn progress_writer<A: PersistenceAdapter>(store: A) -> (ProgressSaver, ProgressWriter<A>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ProgressSaver { tx }, ProgressWriter { store, rx })
}

impl<A: PersistenceAdapter> ProgressWriter<A> {
    /// Runs until every [`ProgressSaver`] is dropped.
    pub async fn run(mut self) {
        while let Some(mut progress) = self.rx.recv().await {
            while let Ok(newer) = self.rx.try_recv() {
                progress = newer;
            }
            if let Err(err) = write_progress(&self.store, &progress).await {
                warn!(?err, "failed to persist player progress");
            }
        }
        debug!("progress writer finished");
    }
}
