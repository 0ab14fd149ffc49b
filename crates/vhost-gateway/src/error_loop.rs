use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use vhost_mux::{DemuxError, PeekedStream};

use crate::gateway::Gateway;

/// Long-running task draining the demuxer's error stream, classifying each
/// event, and writing a canned HTTP error response back on the offending
/// connection where one is available.
pub(crate) async fn run(gateway: Gateway) {
    loop {
        tokio::select! {
            biased;
            _ = gateway.done_signal().wait() => break,
            (conn, err) = gateway.demuxer().next_error() => {
                handle_one(conn, err).await;
            }
        }
    }
}

async fn handle_one(conn: Option<PeekedStream>, err: DemuxError) {
    let response = match &err {
        DemuxError::BadRequest => Some((400, "Bad Request", "bad request")),
        DemuxError::NotFound(name) => {
            debug!(vhost = %name, "connection for unknown vhost");
            Some((404, "Not Found", "vhost not found"))
        }
        DemuxError::Closed => {
            debug!("connection closed before headers completed");
            None
        }
        DemuxError::OpError(_) if err.is_closed_network_connection() => {
            debug!("ignoring closed-network-connection error during shutdown");
            None
        }
        other => {
            warn!(error = %other, "demuxer error");
            Some((500, "Internal Server Error", "server error"))
        }
    };

    if let (Some(mut conn), Some((status, reason, body))) = (conn, response) {
        if let Err(e) = write_error_response(&mut conn, status, reason, body).await {
            warn!(error = %e, "failed writing error response to connection");
        }
    }
}

async fn write_error_response(
    conn: &mut PeekedStream,
    status: u16,
    reason: &str,
    body: &str,
) -> std::io::Result<()> {
    let payload = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Length: {len}\r\nContent-Type: text/plain; charset=utf-8\r\nConnection: close\r\n\r\n{body}",
        len = body.len(),
    );
    conn.write_all(payload.as_bytes()).await?;
    conn.flush().await
}
