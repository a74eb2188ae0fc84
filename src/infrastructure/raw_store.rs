//! 원본 공고 보관소
//!
//! `raw-YYYYMMDD.jsonl` (KST 날짜) 파일에 한 줄씩 추가한다.
//! 날짜 키가 바뀌면 파일을 교체하고, 버퍼는 페이지 끝과 `close`에서 비운다.

use std::path::{Path, PathBuf};

use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::debug;

use super::errors::StoreError;
use crate::domain::job::RawJob;
use crate::utils::kst_date_key;

const WRITE_BUFFER_BYTES: usize = 64 * 1024;

struct OpenFile {
    date_key: String,
    path: PathBuf,
    writer: BufWriter<File>,
}

pub struct RawStore {
    dir: PathBuf,
    current: Option<OpenFile>,
    appended: usize,
}

impl RawStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            current: None,
            appended: 0,
        }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Records appended since creation
    #[must_use]
    pub fn appended(&self) -> usize {
        self.appended
    }

    pub async fn append(&mut self, job: &RawJob) -> Result<(), StoreError> {
        let date_key = kst_date_key(&job.fetched_at);
        let file = self.writer_for(&date_key).await?;

        let mut line = serde_json::to_vec(job).map_err(|e| StoreError::parse(&file.path, e))?;
        line.push(b'\n');
        file.writer
            .write_all(&line)
            .await
            .map_err(|e| StoreError::io(&file.path, e))?;
        self.appended += 1;
        Ok(())
    }

    pub async fn flush(&mut self) -> Result<(), StoreError> {
        if let Some(file) = self.current.as_mut() {
            file.writer
                .flush()
                .await
                .map_err(|e| StoreError::io(&file.path, e))?;
        }
        Ok(())
    }

    pub async fn close(&mut self) -> Result<(), StoreError> {
        self.flush().await?;
        self.current = None;
        Ok(())
    }

    async fn writer_for(&mut self, date_key: &str) -> Result<&mut OpenFile, StoreError> {
        let rotate = self
            .current
            .as_ref()
            .is_none_or(|file| file.date_key != date_key);
        if rotate {
            self.close().await?;
            tokio::fs::create_dir_all(&self.dir)
                .await
                .map_err(|e| StoreError::io(&self.dir, e))?;

            let path = self.dir.join(format!("raw-{date_key}.jsonl"));
            let handle = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .await
                .map_err(|e| StoreError::io(&path, e))?;
            debug!(path = %path.display(), "📦 raw store file opened");
            self.current = Some(OpenFile {
                date_key: date_key.to_string(),
                path,
                writer: BufWriter::with_capacity(WRITE_BUFFER_BYTES, handle),
            });
        }

        self.current.as_mut().ok_or_else(|| {
            StoreError::io(
                &self.dir,
                std::io::Error::other("raw store writer unavailable"),
            )
        })
    }
}

impl std::fmt::Debug for RawStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawStore")
            .field("dir", &self.dir)
            .field("current", &self.current.as_ref().map(|file| &file.path))
            .field("appended", &self.appended)
            .finish()
    }
}
