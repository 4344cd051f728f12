//! Native messaging host.
//!
//! Each message is a 4-byte length in native byte order followed by that
//! many bytes of UTF-8 JSON. Requests are answered one at a time, in order.

use std::io;

use serde::Serialize;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::cli::Environment;
use crate::core::background::Coordinator;
use crate::core::protocol::{Reply, Request};

/// Browsers refuse host messages above 1 MiB.
pub const MAX_OUTGOING_BYTES: usize = 1024 * 1024;
pub const MAX_INCOMING_BYTES: usize = 64 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("native messaging I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("could not encode reply: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("message of {len} bytes exceeds the {limit} byte limit")]
    TooLarge { len: usize, limit: usize },
}

/// Read one framed message. `None` means the browser closed the pipe.
pub async fn read_message<R>(reader: &mut R) -> Result<Option<Vec<u8>>, HostError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; 4];
    match reader.read_exact(&mut header).await {
        Ok(_) => {}
        Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(err) => return Err(err.into()),
    }
    let len = u32::from_ne_bytes(header) as usize;
    if len > MAX_INCOMING_BYTES {
        return Err(HostError::TooLarge {
            len,
            limit: MAX_INCOMING_BYTES,
        });
    }
    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    Ok(Some(body))
}

/// Encode and write one framed message. Nothing is written when the
/// encoded body is over the limit.
pub async fn write_message<W, T>(writer: &mut W, value: &T) -> Result<(), HostError>
where
    W: AsyncWrite + Unpin,
    T: Serialize + ?Sized,
{
    let body = serde_json::to_vec(value)?;
    if body.len() > MAX_OUTGOING_BYTES {
        return Err(HostError::TooLarge {
            len: body.len(),
            limit: MAX_OUTGOING_BYTES,
        });
    }
    let len = u32::try_from(body.len()).map_err(|_| HostError::TooLarge {
        len: body.len(),
        limit: MAX_OUTGOING_BYTES,
    })?;
    writer.write_all(&len.to_ne_bytes()).await?;
    writer.write_all(&body).await?;
    writer.flush().await?;
    Ok(())
}

/// Answer requests until the reader reaches end of input.
pub async fn serve<R, W>(
    coordinator: &Coordinator,
    reader: &mut R,
    writer: &mut W,
) -> Result<(), HostError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    while let Some(body) = read_message(reader).await? {
        let reply = match serde_json::from_slice::<Request>(&body) {
            Ok(request) => coordinator.handle(request).await,
            Err(err) => {
                warn!(%err, "Unrecognized native message");
                Reply::failure(format!("Unrecognized request: {err}"))
            }
        };
        match write_message(writer, &reply).await {
            Err(HostError::TooLarge { len, .. }) => {
                warn!(len, "Reply too large for native messaging");
                write_message(writer, &Reply::failure("Reply too large")).await?;
            }
            other => other?,
        }
    }
    debug!("Native messaging input closed");
    Ok(())
}

pub async fn run_host(env: &Environment) -> Result<(), Box<dyn std::error::Error>> {
    let coordinator = env.coordinator()?;
    let _watcher = coordinator.watch_storage();
    info!("Native messaging host started");

    let mut stdin = tokio::io::stdin();
    let mut stdout = tokio::io::stdout();
    serve(&coordinator, &mut stdin, &mut stdout).await?;
    Ok(())
}
