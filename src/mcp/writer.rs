//! Line-delimited response output.

use tokio::io::{AsyncWrite, AsyncWriteExt};

use super::protocol::JsonRpcResponse;

/// Response writer errors.
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    /// Response could not be serialized.
    #[error("Failed to serialize response: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Output stream failed.
    #[error("Failed to write response: {0}")]
    Io(#[from] std::io::Error),
}

/// Writes one JSON object per line to an output stream.
#[derive(Debug)]
pub struct ResponseWriter<W> {
    output: W,
    written: u64,
}

impl<W: AsyncWrite + Unpin> ResponseWriter<W> {
    /// Wrap an output stream.
    pub fn new(output: W) -> Self {
        Self { output, written: 0 }
    }

    /// Serialize `response`, terminate it with `\n`, and write it in one call.
    pub async fn write(&mut self, response: &JsonRpcResponse) -> Result<(), WriteError> {
        let mut line = serde_json::to_vec(response)?;
        line.push(b'\n');

        self.output.write_all(&line).await?;
        self.output.flush().await?;
        self.written += 1;
        Ok(())
    }

    /// Number of responses written so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Unwrap the output stream.
    pub fn into_inner(self) -> W {
        self.output
    }
}
