use std::{
    path::{Path, PathBuf},
    sync::{mpsc, Mutex},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use log::{error, info};
use rusqlite::{params, Connection, OptionalExtension};

use super::KeyValueStore;

/// `user_version` stamped on databases holding the `kv_entries` table.
const KV_SCHEMA_VERSION: i32 = 1;

type DbTask = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum DbCommand {
    Execute(DbTask),
    Shutdown,
}

/// SQLite-backed store. The connection lives on a dedicated worker thread;
/// reads wait for the worker, writes are queued and their failures logged
/// on the worker. Dropping the store drains queued writes before the
/// thread exits.
pub struct SqliteStore {
    sender: Mutex<mpsc::Sender<DbCommand>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    db_path: PathBuf,
}

impl Drop for SqliteStore {
    fn drop(&mut self) {
        let mut guard = match self.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(handle) = guard.take() {
            if let Err(err) = self.send(DbCommand::Shutdown) {
                error!("Failed to send shutdown to DB thread: {err}");
            }
            if let Err(join_err) = handle.join() {
                error!("Failed to join DB thread: {join_err:?}");
            }
        }
    }
}

impl SqliteStore {
    pub fn open(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }

        let (command_tx, command_rx) = mpsc::channel::<DbCommand>();
        let (ready_tx, ready_rx) = mpsc::channel();
        let path_for_thread = db_path.clone();

        let worker = thread::Builder::new()
            .name("idcapture-db".into())
            .spawn(move || {
                let mut conn = match Connection::open(&path_for_thread) {
                    Ok(connection) => connection,
                    Err(err) => {
                        let _ = ready_tx.send(Err(anyhow::Error::new(err)
                            .context("failed to open SQLite database")));
                        return;
                    }
                };

                if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
                    error!("Failed to enable WAL mode: {err}");
                }

                let init_result = ensure_schema(&conn);
                let init_failed = init_result.is_err();
                if ready_tx.send(init_result).is_err() || init_failed {
                    error!("DB initialization did not complete; worker exiting");
                    return;
                }

                while let Ok(command) = command_rx.recv() {
                    match command {
                        DbCommand::Execute(task) => {
                            task(&mut conn);
                        }
                        DbCommand::Shutdown => break,
                    }
                }

                info!("Database thread shutting down");
            })
            .with_context(|| "failed to spawn database worker thread")?;

        ready_rx
            .recv()
            .context("database worker exited before signaling readiness")??;

        info!("Database initialized at {}", db_path.as_path().display());

        Ok(Self {
            sender: Mutex::new(command_tx),
            worker: Mutex::new(Some(worker)),
            db_path,
        })
    }

    pub fn path(&self) -> &Path {
        self.db_path.as_path()
    }

    fn send(&self, command: DbCommand) -> Result<()> {
        let sender = match self.sender.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        sender
            .send(command)
            .map_err(|err| anyhow!("failed to send command to DB thread: {err}"))
    }

    /// Runs `task` on the worker and waits for its result.
    pub fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = mpsc::channel();

        self.send(DbCommand::Execute(Box::new(move |conn| {
            let result = task(conn);
            if reply_tx.send(result).is_err() {
                error!("DB caller dropped before receiving result");
            }
        })))?;

        reply_rx
            .recv()
            .map_err(|_| anyhow!("database thread terminated unexpectedly"))?
    }

    /// Queues `task` without waiting; failures are logged on the worker.
    pub fn submit<F>(&self, description: &'static str, task: F) -> Result<()>
    where
        F: FnOnce(&mut Connection) -> Result<()> + Send + 'static,
    {
        self.send(DbCommand::Execute(Box::new(move |conn| {
            if let Err(err) = task(conn) {
                error!("{description} failed: {err:#}");
            }
        })))
    }
}

/// Creates `kv_entries` on a fresh file and stamps it; accepts a file
/// already at this version; refuses one written by a newer build.
fn ensure_schema(conn: &Connection) -> Result<()> {
    let version: i32 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .context("failed to read kv store schema version")?;

    match version {
        KV_SCHEMA_VERSION => Ok(()),
        0 => {
            conn.execute_batch(include_str!("schemas/schema_v1.sql"))
                .context("failed to create kv_entries table")?;
            conn.pragma_update(None, "user_version", KV_SCHEMA_VERSION)
                .context("failed to stamp kv store schema version")?;
            info!("Created kv store schema v{KV_SCHEMA_VERSION}");
            Ok(())
        }
        newer if newer > KV_SCHEMA_VERSION => bail!(
            "kv store schema v{newer} is newer than supported v{KV_SCHEMA_VERSION}"
        ),
        other => bail!("unrecognized kv store schema version {other}"),
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let key = key.to_string();
        self.execute(move |conn| {
            let value = conn
                .query_row(
                    "SELECT value FROM kv_entries WHERE key = ?1",
                    params![key],
                    |row| row.get::<_, String>(0),
                )
                .optional()
                .with_context(|| format!("failed to read key {key}"))?;
            Ok(value)
        })
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let key = key.to_string();
        let value = value.to_string();
        let updated_at = Utc::now();
        self.submit("kv upsert", move |conn| {
            conn.execute(
                "INSERT INTO kv_entries (key, value, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                                                updated_at = excluded.updated_at",
                params![key, value, updated_at.to_rfc3339()],
            )
            .with_context(|| format!("failed to write key {key}"))?;
            Ok(())
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        let key = key.to_string();
        self.submit("kv delete", move |conn| {
            conn.execute("DELETE FROM kv_entries WHERE key = ?1", params![key])
                .with_context(|| format!("failed to delete key {key}"))?;
            Ok(())
        })
    }
}
