//! Short-lived report files.
//!
//! A [`TransientFile`] owns a path under the temp directory and unlinks it on
//! drop. Handing it to [`TransientFile::into_stream`] moves that ownership into
//! the response body, so the file disappears once the body is finished or the
//! client goes away, whichever comes first.

use bytes::Bytes;
use futures::Stream;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio_util::io::ReaderStream;
use uuid::Uuid;

#[derive(Debug)]
pub struct TransientFile {
    path: PathBuf,
}

impl TransientFile {
    /// Reserve a unique `<prefix>-<millis>-<uuid>.<extension>` path in `dir`.
    /// Nothing is created on disk until someone writes to [`Self::path`].
    pub fn reserve(dir: &Path, prefix: &str, extension: &str) -> Self {
        let name = format!(
            "{}-{}-{}.{}",
            prefix,
            chrono::Utc::now().timestamp_millis(),
            Uuid::new_v4().simple(),
            extension
        );

        Self {
            path: dir.join(name),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open the file for streaming. Returns its length and a body stream that
    /// deletes the file when dropped. On error `self` is dropped here, which
    /// removes whatever was written.
    pub async fn into_stream(self) -> io::Result<(u64, TransientStream)> {
        let file = tokio::fs::File::open(&self.path).await?;
        let len = file.metadata().await?.len();

        Ok((
            len,
            TransientStream {
                inner: ReaderStream::new(file),
                _file: self,
            },
        ))
    }
}

impl Drop for TransientFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Removed transient file"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to remove transient file"
            ),
        }
    }
}

/// File contents as a byte stream; keeps the [`TransientFile`] alive until the
/// stream itself is dropped.
pub struct TransientStream {
    inner: ReaderStream<tokio::fs::File>,
    _file: TransientFile,
}

impl Stream for TransientStream {
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
