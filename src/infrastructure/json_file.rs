//! JSON 파일 읽기/쓰기 공통 헬퍼
//!
//! 상태/캐시/출력 파일은 모두 "객체 하나 + 개행" 형식이다.
//! 파일이 없으면 기본값, 파싱 실패는 에러.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use tokio::io::AsyncWriteExt;

use super::errors::StoreError;

/// `null` decodes to `T::default()`, the same as an absent field
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Read `path`, or `T::default()` when it does not exist
pub async fn load_json_or_default<T>(path: &Path) -> Result<T, StoreError>
where
    T: DeserializeOwned + Default,
{
    let payload = match tokio::fs::read(path).await {
        Ok(payload) => payload,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(T::default()),
        Err(e) => return Err(StoreError::io(path, e)),
    };
    serde_json::from_slice(&payload).map_err(|e| StoreError::parse(path, e))
}

/// Write compact JSON plus a trailing newline, creating parent directories
pub async fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    ensure_parent_dir(path).await?;
    let mut payload = serde_json::to_vec(value).map_err(|e| StoreError::parse(path, e))?;
    payload.push(b'\n');
    tokio::fs::write(path, payload)
        .await
        .map_err(|e| StoreError::io(path, e))
}

/// Append one JSON line per record
pub async fn append_jsonl<T: Serialize>(path: &Path, records: &[T]) -> Result<(), StoreError> {
    if records.is_empty() {
        return Ok(());
    }
    ensure_parent_dir(path).await?;

    let mut payload = Vec::new();
    for record in records {
        serde_json::to_writer(&mut payload, record).map_err(|e| StoreError::parse(path, e))?;
        payload.push(b'\n');
    }

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(|e| StoreError::io(path, e))?;
    file.write_all(&payload)
        .await
        .map_err(|e| StoreError::io(path, e))?;
    file.flush().await.map_err(|e| StoreError::io(path, e))
}

pub async fn ensure_parent_dir(path: &Path) -> Result<(), StoreError> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| StoreError::io(dir, e)),
        _ => Ok(()),
    }
}
