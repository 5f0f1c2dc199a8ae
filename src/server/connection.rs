//! Per-connection request handling on the proxy port.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::{timeout_at, Instant};
use tracing::debug;

use crate::dispatch::{ProxyResponse, RequestDispatcher, RequestLine};
use crate::error::ProxyError;

/// Longest request or header line accepted, in bytes.
pub const MAX_LINE_LEN: usize = 8 * 1024;
const MAX_HEADER_LINES: usize = 100;

#[derive(Debug)]
enum Line {
    Complete(String),
    Closed,
    Rejected(ProxyError),
}

/// Reads one request, dispatches it and writes the framed response.
///
/// Errors are client transport failures; they end this connection only.
pub async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    dispatcher: &RequestDispatcher,
    read_timeout: Duration,
) -> Result<()> {
    let client_id = peer.ip().to_string();
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let deadline = Instant::now() + read_timeout;

    let response = match read_line(&mut reader, deadline).await? {
        Line::Closed => {
            debug!(peer = %peer, "client closed before sending a request");
            return Ok(());
        }
        Line::Rejected(err) => dispatcher.reject(&err),
        Line::Complete(raw) => match RequestLine::parse(&raw) {
            Ok(request) => {
                if request.version.is_some() {
                    if let Err(err) = drain_headers(&mut reader, deadline).await {
                        debug!(peer = %peer, error = %err, "ignoring unreadable request headers");
                    }
                }
                dispatcher
                    .handle(&client_id, &request.method, &request.target)
                    .await
            }
            Err(err) => dispatcher.reject(&err),
        },
    };

    write_response(&mut write_half, &response)
        .await
        .with_context(|| format!("writing response to {peer}"))
}

async fn write_response<W>(writer: &mut W, response: &ProxyResponse) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&response.encode()).await?;
    writer.flush().await?;
    writer.shutdown().await
}

async fn read_line<R>(reader: &mut R, deadline: Instant) -> Result<Line>
where
    R: AsyncBufRead + Unpin,
{
    let mut collected = Vec::new();

    loop {
        let available = timeout_at(deadline, reader.fill_buf())
            .await
            .map_err(|_| anyhow!("timed out waiting for request"))?
            .context("reading request")?;

        if available.is_empty() {
            if collected.is_empty() {
                return Ok(Line::Closed);
            }
            bail!("connection closed mid-line");
        }

        let newline_pos = available.iter().position(|byte| *byte == b'\n');
        let consume = newline_pos.map_or(available.len(), |idx| idx + 1);

        if collected.len() + consume > MAX_LINE_LEN {
            return Ok(Line::Rejected(ProxyError::BadRequest(format!(
                "line exceeds {MAX_LINE_LEN} bytes"
            ))));
        }

        collected.extend_from_slice(&available[..consume]);
        reader.consume(consume);

        if newline_pos.is_some() {
            break;
        }
    }

    match String::from_utf8(collected) {
        Ok(line) => Ok(Line::Complete(line)),
        Err(_) => Ok(Line::Rejected(ProxyError::BadRequest(
            "request line is not valid UTF-8".to_string(),
        ))),
    }
}

/// Skips header lines up to the blank line ending the request head.
async fn drain_headers<R>(reader: &mut R, deadline: Instant) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    for _ in 0..MAX_HEADER_LINES {
        match read_line(reader, deadline).await? {
            Line::Complete(line) if line.trim_end_matches(['\r', '\n']).is_empty() => {
                return Ok(())
            }
            Line::Complete(_) => continue,
            Line::Closed => return Ok(()),
            Line::Rejected(err) => return Err(err.into()),
        }
    }
    bail!("more than {MAX_HEADER_LINES} header lines")
}
