//! SQLite access for the label catalog.
//!
//! A `rusqlite::Connection` must not be shared across threads, so one worker
//! thread owns it and async callers queue closures for it. Dropping the last
//! [`Database`] clone closes the queue; the worker finishes what is queued
//! and exits.

use std::{
    path::Path,
    sync::{mpsc, Arc},
    thread::{self, JoinHandle},
    time::Duration,
};

use anyhow::{anyhow, Context, Result};
use log::{debug, error, info, warn};
use rusqlite::Connection;
use tokio::sync::oneshot;

pub mod helpers;
mod migrations;
pub mod repositories;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

type Job = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

struct Worker {
    jobs: Option<mpsc::Sender<Job>>,
    thread: Option<JoinHandle<()>>,
}

impl Drop for Worker {
    fn drop(&mut self) {
        // a closed queue is the stop signal
        drop(self.jobs.take());
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Database worker panicked");
            }
        }
    }
}

fn open_connection(path: &Path) -> Result<Connection> {
    let mut conn = Connection::open(path)
        .with_context(|| format!("failed to open SQLite database {}", path.display()))?;
    conn.busy_timeout(BUSY_TIMEOUT)
        .context("failed to set SQLite busy timeout")?;
    if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
        warn!("WAL journal mode unavailable: {err}");
    }
    migrations::run_migrations(&mut conn).context("failed to run database migrations")?;
    Ok(conn)
}

fn run_jobs(mut conn: Connection, jobs: mpsc::Receiver<Job>) {
    for job in jobs {
        job(&mut conn);
    }
    debug!("Database worker stopped");
}

/// Handle to the label database. Cheap to clone; all clones share the worker.
#[derive(Clone)]
pub struct Database {
    worker: Arc<Worker>,
}

impl Database {
    /// Open (creating directories and file as needed) and migrate before
    /// returning, so a broken database fails startup instead of a request.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }

        let (jobs_tx, jobs_rx) = mpsc::channel::<Job>();
        let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<()>>(1);
        let thread_path = path.clone();

        let thread = thread::Builder::new()
            .name("daybook-db".into())
            .spawn(move || match open_connection(&thread_path) {
                Ok(conn) => {
                    let _ = ready_tx.send(Ok(()));
                    run_jobs(conn, jobs_rx);
                }
                Err(err) => {
                    let _ = ready_tx.send(Err(err));
                }
            })
            .context("failed to spawn database worker thread")?;

        // built before waiting so a failed open still joins the thread
        let worker = Worker {
            jobs: Some(jobs_tx),
            thread: Some(thread),
        };
        ready_rx
            .recv()
            .context("database worker exited before it was ready")??;

        info!("Label database ready at {}", path.display());
        Ok(Self {
            worker: Arc::new(worker),
        })
    }

    /// Run `task` on the worker thread and hand back its result.
    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        {
            let jobs = self
                .worker
                .jobs
                .as_ref()
                .ok_or_else(|| anyhow!("database worker is stopped"))?;
            let job: Job = Box::new(move |conn| {
                // the caller may have stopped waiting; nothing to do then
                let _ = reply_tx.send(task(conn));
            });
            jobs.send(job)
                .map_err(|_| anyhow!("database worker is not running"))?;
        }

        reply_rx
            .await
            .map_err(|_| anyhow!("database worker dropped the request"))?
    }
}
