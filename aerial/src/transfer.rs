use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::StreamExt;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::client::TransferClient;
use crate::error::{AerialError, Result};
use crate::progress::ProgressTracker;

/// One wallpaper to download or remove.
///
/// Built once during planning and never mutated; each item is touched by
/// exactly one worker.
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub name: String,
    pub source: String,
    pub destination: PathBuf,
}

/// Result of processing one `WorkItem`.
#[derive(Debug, Clone)]
pub struct TransferOutcome {
    pub name: String,
    pub succeeded: bool,
    pub message: String,
}

impl TransferOutcome {
    fn ok(name: &str, message: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            succeeded: true,
            message: message.into(),
        }
    }

    fn failed(name: &str, message: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            succeeded: false,
            message: message.into(),
        }
    }
}

/// What to do with every item in a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferAction {
    Download,
    Delete,
}

impl TransferAction {
    pub fn label(self) -> &'static str {
        match self {
            TransferAction::Download => "download",
            TransferAction::Delete => "delete",
        }
    }

    pub fn progress_label(self) -> &'static str {
        match self {
            TransferAction::Download => "Downloading",
            TransferAction::Delete => "Deleting",
        }
    }
}

/// Apply `action` to every item on a pool of `width` concurrent workers.
///
/// Returns exactly one outcome per item, in input order, once every item has
/// been processed. A failing item never blocks or aborts its siblings; the
/// full work list is always drained. The pool width bounds how many
/// connections and file handles are open simultaneously.
pub async fn run_batch(
    client: &TransferClient,
    items: Vec<WorkItem>,
    action: TransferAction,
    tracker: Arc<ProgressTracker>,
    width: usize,
) -> Vec<TransferOutcome> {
    let names: Vec<String> = items.iter().map(|item| item.name.clone()).collect();
    let semaphore = Arc::new(Semaphore::new(width.max(1)));
    let mut tasks = JoinSet::new();

    for (index, item) in items.into_iter().enumerate() {
        let client = client.clone();
        let tracker = tracker.clone();
        let semaphore = semaphore.clone();
        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await.unwrap();
            let outcome = match action {
                TransferAction::Download => download_item(&client, &item, &tracker).await,
                TransferAction::Delete => delete_item(&item, &tracker).await,
            };
            (index, outcome)
        });
    }

    // Workers finish in arbitrary order; outcomes are correlated back to
    // their originating index, not appended in completion order.
    let mut outcomes: Vec<Option<TransferOutcome>> = names.iter().map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        if let Ok((index, outcome)) = joined {
            outcomes[index] = Some(outcome);
        }
    }

    outcomes
        .into_iter()
        .zip(names)
        .map(|(slot, name)| {
            slot.unwrap_or_else(|| TransferOutcome::failed(&name, "worker terminated unexpectedly"))
        })
        .collect()
}

/// Download one item: stream the body to its destination and credit the
/// tracker with the bytes actually written. Anything short of a clean HTTP
/// 200 transfer is a failure outcome and leaves the tracker untouched.
async fn download_item(
    client: &TransferClient,
    item: &WorkItem,
    tracker: &ProgressTracker,
) -> TransferOutcome {
    match fetch_to_destination(client, item).await {
        Ok(written) => {
            tracker.update(written);
            TransferOutcome::ok(&item.name, format!("saved {}", item.destination.display()))
        }
        Err(e) => TransferOutcome::failed(&item.name, e.to_string()),
    }
}

async fn fetch_to_destination(client: &TransferClient, item: &WorkItem) -> Result<u64> {
    if let Some(parent) = item.destination.parent() {
        fs::create_dir_all(parent).await?;
    }

    let response = client.fetch(&item.source).await?;
    let status = response.status();
    if status != reqwest::StatusCode::OK {
        return Err(AerialError::other(format!("HTTP {}", status.as_u16())));
    }

    let written = match write_body(response, &item.destination).await {
        Ok(written) => written,
        Err(e) => {
            // A failed transfer must not leave a partial file behind.
            let _ = fs::remove_file(&item.destination).await;
            return Err(e);
        }
    };
    Ok(written)
}

async fn write_body(response: reqwest::Response, destination: &Path) -> Result<u64> {
    let mut file = File::create(destination).await?;
    let mut stream = response.bytes_stream();
    let mut written = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;

    Ok(written)
}

/// Delete one item: record its size, remove it, credit the tracker. A
/// missing file is a failure outcome and leaves the tracker untouched.
async fn delete_item(item: &WorkItem, tracker: &ProgressTracker) -> TransferOutcome {
    let size = match fs::metadata(&item.destination).await {
        Ok(meta) => meta.len(),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return TransferOutcome::failed(&item.name, "not found");
        }
        Err(e) => return TransferOutcome::failed(&item.name, e.to_string()),
    };

    match fs::remove_file(&item.destination).await {
        Ok(()) => {
            tracker.update(size);
            TransferOutcome::ok(&item.name, "removed")
        }
        Err(e) => TransferOutcome::failed(&item.name, e.to_string()),
    }
}
