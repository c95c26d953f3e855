//! Runtime setup and the organiser commands.

use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{Instrument as _, debug, error, info, info_span, warn};

use docsort::cache::overlay::CacheOverlay;
use docsort::cache::store::{JsonFileStore, MemoryStore};
use docsort::cache::traits::PersistentStore;
use docsort::remote::RemoteError;
use docsort::resolve::{ResolveError, Resolver};

use crate::app_config::Config;
use crate::drive::DriveRemote;
use crate::mover::{Candidate, MoveError, Mover};

/// What to do once the runtime is up.
#[derive(Debug, Clone)]
pub enum Task {
    /// Reconcile, then file every statement in the downloads directory.
    Organise,
    /// Print the remote id of a logical path, creating folders as needed.
    Resolve(String),
    /// Only reconcile the folder cache.
    Reconcile,
}

#[derive(Debug, Error)]
pub enum OrganiseError {
    #[error("failed to start the async runtime: {0}")]
    Runtime(#[source] std::io::Error),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Move(#[from] MoveError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

type DriveResolver<S> = Resolver<DriveRemote, S>;

/// Build the runtime and run `task` to completion.
pub fn spawn(config: Config, task: Task) -> Result<(), OrganiseError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(OrganiseError::Runtime)?;
    runtime.block_on(run(config, task))
}

async fn run(config: Config, task: Task) -> Result<(), OrganiseError> {
    if config.cache.persist {
        let store = JsonFileStore::new(&config.cache.path);
        debug!(path = %store.path().display(), "Using persistent folder cache.");
        execute(config, Arc::new(store), task).await
    } else {
        debug!("Folder cache persistence is off.");
        execute(config, Arc::new(MemoryStore::new()), task).await
    }
}

async fn execute<S: PersistentStore>(
    config: Config,
    store: Arc<S>,
    task: Task,
) -> Result<(), OrganiseError> {
    let overlay = Arc::new(CacheOverlay::load(store).await);
    let remote = Arc::new(DriveRemote::new(&config.drive)?);
    let resolver = Arc::new(
        Resolver::new(remote, overlay).with_probe_concurrency(config.cache.probe_concurrency),
    );

    match task {
        Task::Resolve(path) => {
            let id = resolver.resolve_path(&path).await?;
            println!("{id}");
            Ok(())
        }
        Task::Reconcile => {
            let report = resolver.reconcile().await;
            println!(
                "Checked {} cached folders, evicted {}.",
                report.checked, report.evicted
            );
            if !report.persisted {
                warn!("The folder cache on disk could not be updated.");
            }
            Ok(())
        }
        Task::Organise => organise(&config, resolver).await,
    }
}

async fn organise<S: PersistentStore>(
    config: &Config,
    resolver: Arc<DriveResolver<S>>,
) -> Result<(), OrganiseError> {
    resolver.reconcile().await;
    if let Err(e) = resolver.seed_root(&config.organiser.root_folder).await {
        warn!(error = %e, "Could not look up the root folder, it will be resolved on demand.");
    }

    let mover = Arc::new(Mover::new(&config.organiser)?);
    let candidates = mover.scan().await?;
    if candidates.is_empty() {
        info!(dir = %mover.downloads_dir().display(), "No statements to file.");
        return Ok(());
    }

    let root: Arc<str> = Arc::from(config.organiser.root_folder.as_str());
    let mut tasks = JoinSet::new();
    for candidate in candidates {
        let span = info_span!("file", name = %candidate.file_name);
        tasks.spawn(
            file_statement(
                Arc::clone(&resolver),
                Arc::clone(&mover),
                Arc::clone(&root),
                candidate,
            )
            .instrument(span),
        );
    }

    let mut moved = 0_usize;
    let mut failed = 0_usize;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok(())) => moved += 1,
            Ok(Err(e)) => {
                failed += 1;
                warn!(error = %e, "Failed to file statement, leaving it in place.");
            }
            Err(e) => {
                failed += 1;
                error!(error = %e, "Statement task did not finish.");
            }
        }
    }

    info!(moved, failed, "Operation completed.");
    Ok(())
}

/// Upload one statement into its dated folder and move it into the local archive.
///
/// A statement already present remotely under its new name is archived without uploading it
/// again. Nothing is moved locally unless the remote copy exists.
async fn file_statement<S: PersistentStore>(
    resolver: Arc<DriveResolver<S>>,
    mover: Arc<Mover>,
    root: Arc<str>,
    candidate: Candidate,
) -> Result<(), OrganiseError> {
    let details = mover.details(&candidate).await?;
    let folder = resolver.resolve_path(&details.remote_path(&root)).await?;
    let remote = resolver.remote();

    if remote.file_exists(&folder, &details.new_name).await? {
        info!(name = %details.new_name, "Already on Drive, skipping upload.");
    } else {
        let data = tokio::fs::read(&details.source)
            .await
            .map_err(|source| OrganiseError::Read {
                path: details.source.clone(),
                source,
            })?;
        remote
            .upload_file(
                &folder,
                &details.new_name,
                details.kind.mime_type(),
                Bytes::from(data),
            )
            .await?;
        info!(name = %details.new_name, "Uploaded.");
    }

    let archived = mover.relocate(&details).await?;
    info!(to = %archived.display(), "Moved.");
    Ok(())
}
