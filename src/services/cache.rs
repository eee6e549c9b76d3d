//! 磁盘缓存
//!
//! 键 = sha256(函数名 + 参数的 JSON 文本)，每个键一个 JSON 文件。
//! 没有过期和淘汰：函数逻辑或提示词变化后旧结果仍会命中，需要时手动 `clear()`。

use std::future::Future;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::{debug, warn};

use crate::error::{AppError, AppResult};

/// 内容寻址的磁盘缓存
#[derive(Debug, Clone)]
pub struct DiskCache {
    dir: PathBuf,
}

impl DiskCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 计算缓存键
    pub fn key_for<A: Serialize + ?Sized>(function: &str, args: &A) -> AppResult<String> {
        let args_text = serde_json::to_string(args)?;
        let mut hasher = Sha256::new();
        hasher.update(function.as_bytes());
        hasher.update(b":");
        hasher.update(args_text.as_bytes());
        Ok(hex::encode(hasher.finalize()))
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    /// 命中则读取，未命中则计算并写入
    pub async fn get_or_compute<T, A, F, Fut>(&self, function: &str, args: &A, compute: F) -> AppResult<T>
    where
        T: Serialize + DeserializeOwned,
        A: Serialize + ?Sized,
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let key = Self::key_for(function, args)?;
        let path = self.entry_path(&key);

        match fs::read_to_string(&path).await {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(value) => {
                    debug!("缓存命中: {} ({})", function, key);
                    return Ok(value);
                }
                Err(e) => warn!("缓存文件损坏，重新计算: {} ({})", path.display(), e),
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(AppError::io(path.display().to_string(), e)),
        }

        let value = compute().await?;

        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| AppError::io(self.dir.display().to_string(), e))?;
        let body = serde_json::to_string(&value)?;
        fs::write(&path, body)
            .await
            .map_err(|e| AppError::Cache(format!("写入 {} 失败: {}", path.display(), e)))?;
        debug!("缓存写入: {} ({})", function, key);

        Ok(value)
    }

    /// 删除全部缓存文件
    pub async fn clear(&self) -> AppResult<usize> {
        let mut removed = 0;
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(AppError::io(self.dir.display().to_string(), e)),
        };

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| AppError::io(self.dir.display().to_string(), e))?
        {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) == Some("json") {
                fs::remove_file(&path)
                    .await
                    .map_err(|e| AppError::io(path.display().to_string(), e))?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}
