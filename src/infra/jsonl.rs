//! JSON-lines file shared between handles and processes.
//!
//! Every operation holds an advisory lock on a sibling `.lock` file and works
//! on what is on disk at that moment, so no handle keeps a private copy that
//! could overwrite another handle's writes. Rewrites go to a temporary file
//! that is renamed over the log. File I/O runs on tokio's blocking pool.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::core::SchedulerError;

pub(crate) fn backend_err(e: impl std::fmt::Display) -> SchedulerError {
    SchedulerError::Backend(e.to_string())
}

/// Location of one log and its lock file.
#[derive(Debug)]
pub(crate) struct JsonlLog {
    path: PathBuf,
    lock_path: PathBuf,
}

/// Held lock on a [`JsonlLog`]. Released on drop.
pub(crate) struct LogGuard<'a> {
    log: &'a JsonlLog,
    _lock: File,
}

impl JsonlLog {
    /// Log stored at `dir/file_name`, creating `dir` if needed.
    pub(crate) fn open(dir: &Path, file_name: &str) -> Result<Arc<Self>, SchedulerError> {
        fs::create_dir_all(dir).map_err(backend_err)?;
        Ok(Arc::new(Self {
            path: dir.join(file_name),
            lock_path: dir.join(format!("{file_name}.lock")),
        }))
    }

    fn lock_file(&self) -> Result<File, SchedulerError> {
        OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&self.lock_path)
            .map_err(backend_err)
    }

    /// Block until no other guard is held.
    pub(crate) fn exclusive(&self) -> Result<LogGuard<'_>, SchedulerError> {
        let lock = self.lock_file()?;
        lock.lock().map_err(backend_err)?;
        Ok(LogGuard { log: self, _lock: lock })
    }

    /// Block until no exclusive guard is held.
    pub(crate) fn shared(&self) -> Result<LogGuard<'_>, SchedulerError> {
        let lock = self.lock_file()?;
        lock.lock_shared().map_err(backend_err)?;
        Ok(LogGuard { log: self, _lock: lock })
    }

    /// Run `f` on the blocking pool.
    pub(crate) async fn blocking<T, F>(self: &Arc<Self>, f: F) -> Result<T, SchedulerError>
    where
        F: FnOnce(&Self) -> Result<T, SchedulerError> + Send + 'static,
        T: Send + 'static,
    {
        let log = Arc::clone(self);
        tokio::task::spawn_blocking(move || f(log.as_ref()))
            .await
            .map_err(backend_err)?
    }
}

impl LogGuard<'_> {
    /// Every record currently in the log, in file order.
    pub(crate) fn read<T: DeserializeOwned>(&self) -> Result<Vec<T>, SchedulerError> {
        let file = match File::open(&self.log.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(backend_err(e)),
        };
        let mut records = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line.map_err(backend_err)?;
            if line.trim().is_empty() {
                continue;
            }
            records.push(serde_json::from_str(&line).map_err(backend_err)?);
        }
        Ok(records)
    }

    /// Append one record.
    pub(crate) fn append<T: Serialize>(&self, record: &T) -> Result<(), SchedulerError> {
        let mut line = serde_json::to_string(record).map_err(backend_err)?;
        line.push('\n');
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log.path)
            .map_err(backend_err)?;
        file.write_all(line.as_bytes()).map_err(backend_err)?;
        file.sync_data().map_err(backend_err)
    }

    /// Replace the whole log with `records`.
    pub(crate) fn replace<'r, T, I>(&self, records: I) -> Result<(), SchedulerError>
    where
        T: Serialize + 'r,
        I: IntoIterator<Item = &'r T>,
    {
        let tmp = self.log.path.with_extension("jsonl.tmp");
        let mut out = BufWriter::new(File::create(&tmp).map_err(backend_err)?);
        for record in records {
            serde_json::to_writer(&mut out, record).map_err(backend_err)?;
            out.write_all(b"\n").map_err(backend_err)?;
        }
        let file = out.into_inner().map_err(backend_err)?;
        file.sync_all().map_err(backend_err)?;
        fs::rename(&tmp, &self.log.path).map_err(backend_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("prometheus-batch-jsonl-{}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn missing_log_reads_empty() {
        let dir = temp_dir();
        let log = JsonlLog::open(&dir, "x.jsonl").unwrap();
        let records: Vec<u32> = log.shared().unwrap().read().unwrap();
        assert!(records.is_empty());
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn replace_swaps_contents_atomically() {
        let dir = temp_dir();
        let log = JsonlLog::open(&dir, "x.jsonl").unwrap();
        {
            let guard = log.exclusive().unwrap();
            for n in [1_u32, 2, 3] {
                guard.append(&n).unwrap();
            }
            guard.replace(&[3_u32]).unwrap();
        }
        let records: Vec<u32> = log.shared().unwrap().read().unwrap();
        assert_eq!(records, [3]);
        assert!(!dir.join("x.jsonl.tmp").exists());
        let _ = fs::remove_dir_all(dir);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_appends_from_separate_handles_are_kept() {
        let dir = temp_dir();
        let mut tasks = Vec::new();
        for n in 0..8_u32 {
            let log = JsonlLog::open(&dir, "x.jsonl").unwrap();
            tasks.push(tokio::spawn(async move {
                log.blocking(move |log| log.exclusive()?.append(&n)).await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }
        let log = JsonlLog::open(&dir, "x.jsonl").unwrap();
        let mut records: Vec<u32> = log.shared().unwrap().read().unwrap();
        records.sort_unstable();
        assert_eq!(records, (0..8).collect::<Vec<_>>());
        let _ = fs::remove_dir_all(dir);
    }
}
