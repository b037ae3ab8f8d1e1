//! Static file serving module
//!
//! Opens a resolved file and streams its bytes as the response body, with the
//! content type taken from the file extension.

use futures_util::TryStreamExt;
use http_body_util::{BodyExt, StreamBody};
use hyper::body::Frame;
use std::io;
use std::path::Path;
use tokio::fs::File;
use tokio_util::io::ReaderStream;

use crate::http::{mime, ResponseBody};
use crate::logger;

const READ_BUF_SIZE: usize = 64 * 1024;

/// An opened file ready to be sent
pub struct FileResponse {
    pub content_type: &'static str,
    pub size_bytes: u64,
    pub body: ResponseBody,
}

/// Open `path` and wrap it in a streaming body.
///
/// Only the open and the metadata read can fail here. Errors while streaming
/// are logged and abort the connection mid-body.
pub async fn respond(path: &Path) -> io::Result<FileResponse> {
    let file = File::open(path).await?;
    let size_bytes = file.metadata().await?.len();

    let display = path.display().to_string();
    let stream = ReaderStream::with_capacity(file, READ_BUF_SIZE)
        .map_ok(Frame::data)
        .map_err(move |e| {
            logger::log_error(&format!("Error streaming '{display}': {e}"));
            e
        });

    Ok(FileResponse {
        content_type: mime::for_path(path),
        size_bytes,
        body: StreamBody::new(stream).boxed_unsync(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_streams_exact_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob.bin");
        // several buffers' worth, with every byte value present
        let data: Vec<u8> = (0..200_000u32).map(|i| (i.wrapping_mul(31) % 256) as u8).collect();
        std::fs::write(&path, &data).unwrap();

        let file = respond(&path).await.unwrap();
        assert_eq!(file.size_bytes, data.len() as u64);
        assert_eq!(file.content_type, mime::OCTET_STREAM);

        let bytes = file.body.collect().await.unwrap().to_bytes();
        assert_eq!(bytes.as_ref(), data.as_slice());
    }

    #[tokio::test]
    async fn test_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.txt");
        std::fs::write(&path, "").unwrap();

        let file = respond(&path).await.unwrap();
        assert_eq!(file.size_bytes, 0);
        assert_eq!(file.content_type, "text/plain");
        assert!(file.body.collect().await.unwrap().to_bytes().is_empty());
    }

    #[tokio::test]
    async fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = respond(&dir.path().join("nope.css")).await.err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
