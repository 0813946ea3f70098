use std::{
    future::Future,
    io::{ErrorKind, SeekFrom},
    ops::Deref,
    path::{Path, PathBuf},
};

use anyhow::Result;
use fs4::tokio::AsyncFileExt;
use tokio::{
    fs::File,
    io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncSeekExt, AsyncWriteExt, BufReader},
};
use tracing::{debug, warn};

use crate::sessions::entities::WorkRecord;

/// Interface for abstracting storage of work records. It only ever returns fully materialized
/// collections; all the filtering happens in [sessions](crate::sessions).
pub trait RecordStorage {
    /// Retrieves all records of an owner.
    fn get_records_for(&self, owner: &str) -> impl Future<Output = Result<Vec<WorkRecord>>>;

    /// Saves a new record.
    fn append(&self, record: &WorkRecord) -> impl Future<Output = Result<()>>;

    /// Replaces the record with the same id. Returns false if there was no such record.
    fn replace(&self, record: &WorkRecord) -> impl Future<Output = Result<bool>>;

    /// Removes a record. Returns false if there was no such record.
    fn remove(&self, owner: &str, id: &str) -> impl Future<Output = Result<bool>>;
}

impl<T: Deref> RecordStorage for T
where
    T::Target: RecordStorage,
{
    fn get_records_for(&self, owner: &str) -> impl Future<Output = Result<Vec<WorkRecord>>> {
        self.deref().get_records_for(owner)
    }

    fn append(&self, record: &WorkRecord) -> impl Future<Output = Result<()>> {
        self.deref().append(record)
    }

    fn replace(&self, record: &WorkRecord) -> impl Future<Output = Result<bool>> {
        self.deref().replace(record)
    }

    fn remove(&self, owner: &str, id: &str) -> impl Future<Output = Result<bool>> {
        self.deref().remove(owner, id)
    }
}

/// The main realization of [RecordStorage]. Every owner gets a file with a json record per
/// line.
pub struct RecordStorageImpl {
    record_dir: PathBuf,
}

/// A line of an owner's file. Lines that can't be parsed are kept as is, so rewriting a file
/// never loses them.
#[derive(Debug, Clone, PartialEq)]
enum StoredLine {
    Record(WorkRecord),
    Raw(Vec<u8>),
}

impl StoredLine {
    fn record(&self) -> Option<&WorkRecord> {
        match self {
            StoredLine::Record(v) => Some(v),
            StoredLine::Raw(_) => None,
        }
    }

    fn is_record(&self, owner: &str, id: &str) -> bool {
        self.record().is_some_and(|v| &*v.owner_id == owner && &*v.id == id)
    }
}

impl RecordStorageImpl {
    pub fn new(record_dir: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&record_dir)?;

        Ok(Self { record_dir })
    }

    fn owner_path(&self, owner: &str) -> PathBuf {
        // Owner ids are opaque, so anything that could escape the directory is replaced.
        let file_name = owner
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect::<String>();
        self.record_dir.join(format!("{file_name}.jsonl"))
    }

    async fn open(&self, owner: &str) -> Result<File, std::io::Error> {
        File::options()
            .write(true)
            .create(true)
            .read(true)
            .truncate(false)
            .open(self.owner_path(owner))
            .await
    }

    async fn get_all_inner(&self, path: &Path) -> Result<Vec<WorkRecord>> {
        async fn extract(path: &Path) -> std::result::Result<Vec<StoredLine>, std::io::Error> {
            debug!("Extracting {path:?}");
            let file = File::open(path).await?;
            file.lock_shared()?;
            let mut reader = BufReader::new(file);
            let lines = read_lines(&mut reader, path).await;
            reader.into_inner().unlock_async().await?;
            lines
        }

        match extract(path).await {
            Ok(lines) => Ok(lines
                .into_iter()
                .filter_map(|v| match v {
                    StoredLine::Record(v) => Some(v),
                    StoredLine::Raw(_) => None,
                })
                .collect()),
            Err(e) => {
                if e.kind() == ErrorKind::NotFound {
                    Ok(vec![])
                } else {
                    Err(e)?
                }
            }
        }
    }

    /// Rewrites the owner's file with `change` applied. Nothing is written if `change` returns
    /// false or if the file couldn't be read completely.
    async fn rewrite(
        &self,
        owner: &str,
        change: impl FnOnce(&mut Vec<StoredLine>) -> bool,
    ) -> Result<bool> {
        let path = self.owner_path(owner);
        let mut file = self.open(owner).await?;
        // Semi-safe acquire-release for a file
        file.lock_exclusive()?;
        let result = Self::rewrite_with_file(&mut file, &path, change).await;
        file.unlock_async().await?;
        result
    }

    async fn rewrite_with_file(
        file: &mut File,
        path: &Path,
        change: impl FnOnce(&mut Vec<StoredLine>) -> bool,
    ) -> Result<bool> {
        let mut lines = read_lines(BufReader::new(&mut *file), path).await?;
        if !change(&mut lines) {
            return Ok(false);
        }

        let buffer = to_bytes(&lines)?;
        file.rewind().await?;
        file.set_len(0).await?;
        file.write_all(&buffer).await?;
        file.flush().await?;
        Ok(true)
    }

    async fn append_with_file(file: &mut File, record: &WorkRecord) -> Result<()> {
        let mut buffer = vec![];
        // A cut off last line must not swallow the new record.
        if file.seek(SeekFrom::End(0)).await? > 0 {
            file.seek(SeekFrom::End(-1)).await?;
            if file.read_u8().await? != b'\n' {
                buffer.push(b'\n');
            }
        }
        buffer.extend(to_bytes([&StoredLine::Record(record.clone())])?);
        file.seek(SeekFrom::End(0)).await?;
        file.write_all(&buffer).await?;
        file.flush().await?;
        Ok(())
    }
}

/// Reads every non empty line of a file. Lines that aren't valid records (including ones that
/// aren't valid utf-8) are reported and kept raw. Io errors abort the read.
async fn read_lines(
    mut reader: impl AsyncBufRead + Unpin,
    path: &Path,
) -> Result<Vec<StoredLine>, std::io::Error> {
    let mut lines = vec![];
    let mut buffer = vec![];
    loop {
        buffer.clear();
        if reader.read_until(b'\n', &mut buffer).await? == 0 {
            break;
        }
        let line = buffer.strip_suffix(b"\n").unwrap_or(&buffer[..]);
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if line.trim_ascii().is_empty() {
            continue;
        }
        match serde_json::from_slice::<WorkRecord>(line) {
            Ok(v) => lines.push(StoredLine::Record(v)),
            Err(e) => {
                // Might happen if a write was cut off or the file was edited by hand.
                warn!(
                    "During parsing in path {:?} found illegal json string {}:  {e}",
                    path,
                    String::from_utf8_lossy(line)
                );
                lines.push(StoredLine::Raw(line.to_vec()));
            }
        }
    }
    Ok(lines)
}

fn to_bytes<'a>(lines: impl IntoIterator<Item = &'a StoredLine>) -> Result<Vec<u8>> {
    let mut buffer = Vec::<u8>::new();
    for line in lines {
        match line {
            StoredLine::Record(record) => serde_json::to_writer(&mut buffer, record)?,
            StoredLine::Raw(raw) => buffer.extend_from_slice(raw),
        }
        buffer.push(b'\n');
    }
    Ok(buffer)
}

impl RecordStorage for RecordStorageImpl {
    async fn get_records_for(&self, owner: &str) -> Result<Vec<WorkRecord>> {
        let path = self.owner_path(owner);
        let data = self.get_all_inner(&path).await?;
        // Different owners might map onto the same file name.
        Ok(data
            .into_iter()
            .filter(|v| &*v.owner_id == owner)
            .collect())
    }

    async fn append(&self, record: &WorkRecord) -> Result<()> {
        let mut file = self.open(&record.owner_id).await?;
        file.lock_exclusive()?;
        let result = Self::append_with_file(&mut file, record).await;
        file.unlock_async().await?;
        result
    }

    async fn replace(&self, record: &WorkRecord) -> Result<bool> {
        self.rewrite(&record.owner_id, |lines| {
            match lines.iter_mut().find(|v| v.is_record(&record.owner_id, &record.id)) {
                Some(existing) => {
                    *existing = StoredLine::Record(record.clone());
                    true
                }
                None => false,
            }
        })
        .await
    }

    async fn remove(&self, owner: &str, id: &str) -> Result<bool> {
        self.rewrite(owner, |lines| {
            let before = lines.len();
            lines.retain(|v| !v.is_record(owner, id));
            lines.len() != before
        })
        .await
    }
}
