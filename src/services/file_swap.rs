//! Spool files and one-shot download tokens
//!
//! A response body is written to a uniquely named file in the spool directory.
//! Once complete, the file is indexed under a random token with a TTL. The
//! first download consumes the token; expired tokens are swept lazily on every
//! lookup and periodically in the background. Either way the file is removed.

use base64::{Engine as _, engine::general_purpose};
use bytes::Bytes;
use futures::Stream;
use parking_lot::Mutex;
use rand::RngCore;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;

use crate::utils::error::{AppError, Result};

const SPOOL_EXTENSION: &str = "spool";
const TOKEN_BYTES: usize = 32;

struct Ticket {
    path: PathBuf,
    filename: String,
    expires_at: Instant,
}

struct Inner {
    dir: PathBuf,
    tickets: Mutex<HashMap<String, Ticket>>,
}

impl Inner {
    /// 清理所有过期的令牌及其文件，返回清理数量
    fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let expired: Vec<PathBuf> = {
            let mut tickets = self.tickets.lock();
            let tokens: Vec<String> = tickets
                .iter()
                .filter(|(_, t)| t.expires_at <= now)
                .map(|(token, _)| token.clone())
                .collect();
            tokens
                .iter()
                .filter_map(|token| tickets.remove(token))
                .map(|t| t.path)
                .collect()
        };

        for path in &expired {
            remove_quietly(path);
        }
        if !expired.is_empty() {
            tracing::debug!("Swept {} expired download tokens", expired.len());
        }
        expired.len()
    }
}

/// 临时文件与下载令牌管理
#[derive(Clone)]
pub struct FileSwap {
    inner: Arc<Inner>,
}

impl FileSwap {
    /// 创建 spool 目录并清理上次遗留的文件
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| {
            AppError::Spool(format!("failed to create spool dir {}: {}", dir.display(), e))
        })?;

        let swap = Self {
            inner: Arc::new(Inner {
                dir,
                tickets: Mutex::new(HashMap::new()),
            }),
        };
        let removed = swap.purge();
        if removed > 0 {
            tracing::info!("Removed {} orphaned spool files", removed);
        }
        Ok(swap)
    }

    pub fn dir(&self) -> &Path {
        &self.inner.dir
    }

    /// 分配一个新的临时文件
    pub async fn new_writer(&self, category: &str) -> Result<SpoolWriter> {
        let mut suffix = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut suffix);
        let path = self.inner.dir.join(format!(
            "{}_{}.{}",
            category,
            hex::encode(suffix),
            SPOOL_EXTENSION
        ));

        let file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| {
                AppError::Spool(format!("failed to create spool file {}: {}", path.display(), e))
            })?;

        Ok(SpoolWriter {
            swap: self.inner.clone(),
            path,
            file: Some(file),
            touched: false,
            minted: false,
            written: 0,
        })
    }

    /// 用令牌换取文件。令牌只能使用一次
    pub async fn serve_download(&self, token: &str) -> Result<Download> {
        let ticket = self.inner.tickets.lock().remove(token);
        self.inner.sweep_expired();

        let Some(ticket) = ticket else {
            return Err(AppError::TokenInvalid(
                "download token is invalid or has been used".to_string(),
            ));
        };

        let guard = SpoolGuard(ticket.path);
        if ticket.expires_at <= Instant::now() {
            return Err(AppError::TokenInvalid("download token has expired".to_string()));
        }

        let file = tokio::fs::File::open(&guard.0)
            .await
            .map_err(|e| AppError::Spool(format!("failed to open spool file: {}", e)))?;

        Ok(Download {
            filename: ticket.filename,
            stream: DownloadStream {
                inner: ReaderStream::new(file),
                _guard: guard,
            },
        })
    }

    pub fn sweep_expired(&self) -> usize {
        self.inner.sweep_expired()
    }

    /// 后台定期清理过期令牌。FileSwap 全部释放后任务自动退出
    pub fn spawn_sweeper(&self, interval: Duration) -> tokio::task::JoinHandle<()> {
        let inner: Weak<Inner> = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(inner) = inner.upgrade() else {
                    break;
                };
                inner.sweep_expired();
            }
        })
    }

    /// 删除所有令牌和 spool 目录下的临时文件，返回删除的文件数
    pub fn purge(&self) -> usize {
        self.inner.tickets.lock().clear();

        let Ok(entries) = std::fs::read_dir(&self.inner.dir) else {
            return 0;
        };
        entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && path.extension().and_then(|ext| ext.to_str()) == Some(SPOOL_EXTENSION)
            })
            .filter(|path| std::fs::remove_file(path).is_ok())
            .count()
    }

    pub fn ticket_count(&self) -> usize {
        self.inner.tickets.lock().len()
    }
}

/// 只追加的临时文件写入器。未生成令牌就被释放时删除文件
pub struct SpoolWriter {
    swap: Arc<Inner>,
    path: PathBuf,
    file: Option<tokio::fs::File>,
    touched: bool,
    minted: bool,
    written: u64,
}

impl SpoolWriter {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    /// 写入一段数据。写入空切片也会把文件标记为已写入
    pub async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| AppError::Spool("spool writer is closed".to_string()))?;
        file.write_all(data)
            .await
            .map_err(|e| AppError::Spool(format!("failed to write spool file: {}", e)))?;
        self.written += data.len() as u64;
        self.touched = true;
        Ok(())
    }

    /// 刷新并关闭文件，可重复调用
    pub async fn close(&mut self) -> Result<()> {
        if let Some(mut file) = self.file.take() {
            file.flush()
                .await
                .map_err(|e| AppError::Spool(format!("failed to flush spool file: {}", e)))?;
        }
        Ok(())
    }

    /// 关闭文件并以令牌索引，过期时间为当前时间加 `ttl`
    ///
    /// 从未写入过的文件不能生成令牌，此时文件随 writer 一起删除。
    pub async fn mint_token(mut self, filename: impl Into<String>, ttl: Duration) -> Result<String> {
        if !self.touched {
            return Err(AppError::Spool(format!(
                "spool file {} was never written to",
                self.path.display()
            )));
        }
        self.close().await?;

        let mut bytes = [0u8; TOKEN_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        let token = general_purpose::URL_SAFE_NO_PAD.encode(bytes);

        let ticket = Ticket {
            path: self.path.clone(),
            filename: filename.into(),
            expires_at: Instant::now() + ttl,
        };
        self.swap.tickets.lock().insert(token.clone(), ticket);
        self.minted = true;

        Ok(token)
    }
}

impl Drop for SpoolWriter {
    fn drop(&mut self) {
        if self.minted {
            return;
        }
        self.file.take();
        remove_quietly(&self.path);
    }
}

/// 一次下载：显示文件名和文件内容流
pub struct Download {
    pub filename: String,
    pub stream: DownloadStream,
}

/// 文件内容流，读完或被丢弃时删除文件
pub struct DownloadStream {
    inner: ReaderStream<tokio::fs::File>,
    _guard: SpoolGuard,
}

impl Stream for DownloadStream {
    type Item = std::io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

struct SpoolGuard(PathBuf);

impl Drop for SpoolGuard {
    fn drop(&mut self) {
        remove_quietly(&self.0);
    }
}

fn remove_quietly(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!("Failed to remove spool file {}: {}", path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    async fn read_all(download: Download) -> Vec<u8> {
        let chunks: Vec<Bytes> = download.stream.try_collect().await.unwrap();
        chunks.concat()
    }

    fn spool_files(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[tokio::test]
    async fn test_mint_and_download_once() {
        let dir = tempfile::tempdir().unwrap();
        let swap = FileSwap::new(dir.path()).unwrap();

        let mut writer = swap.new_writer("debug_api").await.unwrap();
        writer.write_all(b"hello ").await.unwrap();
        writer.write_all(b"world").await.unwrap();
        assert_eq!(writer.bytes_written(), 11);
        let path = writer.path().to_path_buf();
        let token = writer
            .mint_token("foo_1.txt", Duration::from_secs(300))
            .await
            .unwrap();
        assert!(token.len() >= 22);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        assert!(path.exists());

        let download = swap.serve_download(&token).await.unwrap();
        assert_eq!(download.filename, "foo_1.txt");
        assert_eq!(read_all(download).await, b"hello world");
        assert!(!path.exists());

        let err = swap.serve_download(&token).await.err().unwrap();
        assert!(matches!(err, AppError::TokenInvalid(_)));
    }

    #[tokio::test]
    async fn test_concurrent_downloads_single_winner() {
        let dir = tempfile::tempdir().unwrap();
        let swap = FileSwap::new(dir.path()).unwrap();
        let mut writer = swap.new_writer("debug_api").await.unwrap();
        writer.write_all(b"payload").await.unwrap();
        let token = writer.mint_token("x.bin", Duration::from_secs(300)).await.unwrap();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let swap = swap.clone();
                let token = token.clone();
                tokio::spawn(async move { swap.serve_download(&token).await.is_ok() })
            })
            .collect();

        let mut wins = 0;
        for handle in handles {
            if handle.await.unwrap() {
                wins += 1;
            }
        }
        assert_eq!(wins, 1);
    }

    #[tokio::test]
    async fn test_expired_token_deletes_file() {
        let dir = tempfile::tempdir().unwrap();
        let swap = FileSwap::new(dir.path()).unwrap();
        let mut writer = swap.new_writer("debug_api").await.unwrap();
        writer.write_all(b"stale").await.unwrap();
        let path = writer.path().to_path_buf();
        let token = writer.mint_token("x.bin", Duration::from_millis(20)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        let err = swap.serve_download(&token).await.err().unwrap();
        assert!(matches!(err, AppError::TokenInvalid(_)));
        assert!(!path.exists());
        assert_eq!(swap.ticket_count(), 0);
    }

    #[tokio::test]
    async fn test_lookup_sweeps_other_expired_tokens() {
        let dir = tempfile::tempdir().unwrap();
        let swap = FileSwap::new(dir.path()).unwrap();

        let mut stale = swap.new_writer("debug_api").await.unwrap();
        stale.write_all(b"a").await.unwrap();
        let stale_path = stale.path().to_path_buf();
        stale.mint_token("a.bin", Duration::from_millis(10)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(swap.serve_download("unknown").await.is_err());
        assert!(!stale_path.exists());
        assert_eq!(swap.ticket_count(), 0);
    }

    #[tokio::test]
    async fn test_background_sweeper() {
        let dir = tempfile::tempdir().unwrap();
        let swap = FileSwap::new(dir.path()).unwrap();
        let mut writer = swap.new_writer("debug_api").await.unwrap();
        writer.write_all(b"a").await.unwrap();
        writer.mint_token("a.bin", Duration::from_millis(10)).await.unwrap();

        let handle = swap.spawn_sweeper(Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(swap.ticket_count(), 0);
        assert_eq!(spool_files(dir.path()), 0);
        handle.abort();
    }

    #[tokio::test]
    async fn test_dropped_writer_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let swap = FileSwap::new(dir.path()).unwrap();
        let mut writer = swap.new_writer("debug_api").await.unwrap();
        writer.write_all(b"partial").await.unwrap();
        let path = writer.path().to_path_buf();
        assert!(path.exists());
        drop(writer);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_mint_requires_a_write() {
        let dir = tempfile::tempdir().unwrap();
        let swap = FileSwap::new(dir.path()).unwrap();

        let writer = swap.new_writer("debug_api").await.unwrap();
        let path = writer.path().to_path_buf();
        let err = writer
            .mint_token("x.bin", Duration::from_secs(60))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Spool(_)));
        assert!(!path.exists());
        assert_eq!(swap.ticket_count(), 0);

        // 空内容的写入同样有效
        let mut writer = swap.new_writer("debug_api").await.unwrap();
        writer.write_all(b"").await.unwrap();
        let token = writer.mint_token("x.bin", Duration::from_secs(60)).await.unwrap();
        let download = swap.serve_download(&token).await.unwrap();
        assert!(read_all(download).await.is_empty());
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_blocks_writes() {
        let dir = tempfile::tempdir().unwrap();
        let swap = FileSwap::new(dir.path()).unwrap();
        let mut writer = swap.new_writer("debug_api").await.unwrap();
        writer.write_all(b"x").await.unwrap();
        writer.close().await.unwrap();
        writer.close().await.unwrap();
        assert!(matches!(writer.write_all(b"y").await, Err(AppError::Spool(_))));
    }

    #[tokio::test]
    async fn test_startup_purges_orphans() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("debug_api_old.spool"), b"old").unwrap();
        std::fs::write(dir.path().join("keep.txt"), b"not ours").unwrap();

        let swap = FileSwap::new(dir.path()).unwrap();
        assert!(!dir.path().join("debug_api_old.spool").exists());
        assert!(dir.path().join("keep.txt").exists());
        assert_eq!(swap.purge(), 0);
    }

    #[tokio::test]
    async fn test_purge_clears_tickets() {
        let dir = tempfile::tempdir().unwrap();
        let swap = FileSwap::new(dir.path()).unwrap();
        let mut writer = swap.new_writer("debug_api").await.unwrap();
        writer.write_all(b"x").await.unwrap();
        let token = writer.mint_token("x.bin", Duration::from_secs(60)).await.unwrap();

        assert_eq!(swap.purge(), 1);
        assert!(swap.serve_download(&token).await.is_err());
    }
}
