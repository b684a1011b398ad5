//! Byte sources for local files.
//!
//! Each source is a lazy sequence of chunks. A failed read is yielded once
//! and ends the sequence; the underlying file is closed as soon as the
//! sequence ends or the source is dropped.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use log::{debug, trace};
use tokio_util::io::ReaderStream;
use xz::bufread::XzDecoder;

/// Default number of bytes requested from a file per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Reads a [`Read`] in chunks of at most `chunk_size` bytes.
pub struct ReadChunks<R> {
    reader: Option<R>,
    chunk_size: usize,
}

impl<R: Read> ReadChunks<R> {
    pub fn new(reader: R, chunk_size: usize) -> Self {
        ReadChunks {
            reader: Some(reader),
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.reader.is_none()
    }
}

impl<R: Read> Iterator for ReadChunks<R> {
    type Item = io::Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        let reader = self.reader.as_mut()?;
        let mut chunk = vec![0; self.chunk_size];
        loop {
            match reader.read(&mut chunk) {
                Ok(0) => {
                    self.reader = None;
                    return None;
                }
                Ok(len) => {
                    chunk.truncate(len);
                    trace!(len = len; "Read chunk");
                    return Some(Ok(chunk));
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    self.reader = None;
                    return Some(Err(err));
                }
            }
        }
    }
}

fn is_xz(path: &Path) -> bool {
    path.extension().is_some_and(|extension| extension == "xz")
}

/// Opens a file as a chunk source. Files ending in `.xz` are decompressed on
/// the fly.
pub fn open_file(
    path: impl AsRef<Path>,
    chunk_size: usize,
) -> io::Result<ReadChunks<Box<dyn Read + Send>>> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let reader: Box<dyn Read + Send> = if is_xz(path) {
        Box::new(XzDecoder::new(BufReader::new(file)))
    } else {
        Box::new(file)
    };
    debug!(path = path.display().to_string().as_str(), chunk_size = chunk_size; "Opened OSM file");
    Ok(ReadChunks::new(reader, chunk_size))
}

/// Async file source yielding [`bytes::Bytes`] chunks. Compressed files are
/// not decompressed here.
pub async fn open_file_stream(
    path: impl AsRef<Path>,
    chunk_size: usize,
) -> io::Result<ReaderStream<tokio::fs::File>> {
    let path = path.as_ref();
    let file = tokio::fs::File::open(path).await?;
    debug!(path = path.display().to_string().as_str(), chunk_size = chunk_size; "Opened OSM file stream");
    Ok(ReaderStream::with_capacity(file, chunk_size.max(1)))
}
