// src/exec/tee.rs

//! Fan-out writer used to mirror a child's stderr.
//!
//! Every chunk is written to all sinks before the next chunk is accepted. A
//! failing sink does not stop the others from receiving the chunk; the first
//! error seen is returned to the caller.

use std::io;

use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Type-erased sink so files and terminal streams can share one `TeeWriter`.
pub type BoxedSink = Box<dyn AsyncWrite + Send + Unpin>;

pub struct TeeWriter<W> {
    sinks: Vec<W>,
}

impl<W> TeeWriter<W>
where
    W: AsyncWrite + Unpin,
{
    pub fn new(sinks: Vec<W>) -> Self {
        Self { sinks }
    }

    /// Write `chunk` in full to every sink.
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> io::Result<()> {
        let mut first_err = None;
        for sink in self.sinks.iter_mut() {
            if let Err(e) = sink.write_all(chunk).await {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    pub async fn flush(&mut self) -> io::Result<()> {
        let mut first_err = None;
        for sink in self.sinks.iter_mut() {
            if let Err(e) = sink.flush().await {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    pub fn into_inner(self) -> Vec<W> {
        self.sinks
    }
}
