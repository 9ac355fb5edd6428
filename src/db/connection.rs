use std::{
    path::{Path, PathBuf},
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
    time::Duration,
};

use anyhow::{anyhow, Context, Result};
use log::{debug, error, info};
use rusqlite::Connection;
use tokio::sync::oneshot;

use super::migrations::run_migrations;

/// How long a statement waits on a lock held by another process (for example
/// a second CLI invocation) before failing with `SQLITE_BUSY`.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const WORKER_THREAD_NAME: &str = "assessment-sync-db";

type Job = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum WorkerMessage {
    Run(Job),
    Stop,
}

/// Owns the worker thread. Dropped with the last `Database` clone.
struct Worker {
    jobs: mpsc::Sender<WorkerMessage>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl Worker {
    fn stop(&self) {
        let handle = match self.thread.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        let Some(handle) = handle else {
            return;
        };

        if let Err(err) = self.jobs.send(WorkerMessage::Stop) {
            error!("Failed to stop kv store worker: {err}");
        }
        if let Err(join_err) = handle.join() {
            error!("Failed to join kv store worker: {join_err:?}");
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Opens the file, applies connection pragmas and brings the schema up to date.
fn open_connection(path: &Path) -> Result<Connection> {
    let mut conn = Connection::open(path)
        .with_context(|| format!("failed to open SQLite database {}", path.display()))?;

    if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
        error!("Failed to enable WAL mode: {err}");
    }
    conn.busy_timeout(BUSY_TIMEOUT)
        .context("failed to set busy timeout")?;

    run_migrations(&mut conn).context("failed to run database migrations")?;
    Ok(conn)
}

fn run_worker(mut conn: Connection, jobs: mpsc::Receiver<WorkerMessage>) {
    while let Ok(message) = jobs.recv() {
        match message {
            WorkerMessage::Run(job) => job(&mut conn),
            WorkerMessage::Stop => break,
        }
    }
    debug!("kv store worker exiting");
}

/// The key-value database file behind the offline queue.
///
/// A single worker thread owns the `rusqlite::Connection`; every query is
/// shipped to it as a closure, so writes land in the order they were issued.
/// Clones share the worker.
#[derive(Clone)]
pub struct Database {
    worker: Arc<Worker>,
    db_path: Arc<PathBuf>,
}

impl Database {
    /// Opens (creating if needed) the database at `db_path` and migrates it.
    /// Returns once the worker is ready or has failed to start.
    pub fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }

        let (jobs_tx, jobs_rx) = mpsc::channel::<WorkerMessage>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<()>>();
        let worker_path = db_path.clone();

        let thread = thread::Builder::new()
            .name(WORKER_THREAD_NAME.into())
            .spawn(move || match open_connection(&worker_path) {
                Ok(conn) => {
                    if ready_tx.send(Ok(())).is_ok() {
                        run_worker(conn, jobs_rx);
                    }
                }
                Err(err) => {
                    let _ = ready_tx.send(Err(err));
                }
            })
            .context("failed to spawn kv store worker thread")?;

        ready_rx
            .recv()
            .context("kv store worker exited before signaling readiness")??;

        info!("Key-value store opened at {}", db_path.display());

        Ok(Self {
            worker: Arc::new(Worker {
                jobs: jobs_tx,
                thread: Mutex::new(Some(thread)),
            }),
            db_path: Arc::new(db_path),
        })
    }

    pub fn path(&self) -> &Path {
        self.db_path.as_path()
    }

    /// Runs `task` on the worker thread and awaits its result.
    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();

        let job: Job = Box::new(move |conn| {
            if reply_tx.send(task(conn)).is_err() {
                debug!("kv store caller went away before its result arrived");
            }
        });

        self.worker
            .jobs
            .send(WorkerMessage::Run(job))
            .map_err(|_| anyhow!("kv store worker is no longer running"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("kv store worker stopped before replying"))?
    }
}
