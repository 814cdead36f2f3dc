//! Endpoint server for exposing metrics and health checks

use anyhow::Result;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use crate::metrics::metrics;

/// Build the HTTP response for a raw request
pub fn respond(request: &[u8]) -> String {
    let line = request
        .split(|b| *b == b'\n')
        .next()
        .map(|l| String::from_utf8_lossy(l).to_string())
        .unwrap_or_default();
    let path = line.split_whitespace().nth(1).unwrap_or("/");

    match path {
        "/health" => http_response("200 OK", "ok"),
        "/metrics" | "/" => match metrics().export_text() {
            Ok(body) => http_response("200 OK", &body),
            Err(e) => http_response("500 Internal Server Error", &e.to_string()),
        },
        _ => http_response("404 Not Found", "not found"),
    }
}

fn http_response(status: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {}\r\nContent-Type: text/plain; version=0.0.4\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    )
}

/// Start the endpoint server
pub async fn endpoint_server(port: u16) -> Result<()> {
    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr).await?;

    tracing::info!("Metrics endpoint listening on {}", addr);

    loop {
        match listener.accept().await {
            Ok((mut socket, _peer)) => {
                tokio::spawn(async move {
                    let mut buf = [0; 1024];
                    match socket.read(&mut buf).await {
                        Ok(n) => {
                            let response = respond(&buf[..n]);
                            let _ = socket.write_all(response.as_bytes()).await;
                        }
                        Err(e) => {
                            tracing::error!("Failed to read from socket: {}", e);
                        }
                    }
                });
            }
            Err(e) => {
                tracing::error!("Failed to accept connection: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routes() {
        assert!(respond(b"GET /health HTTP/1.1\r\n\r\n").ends_with("ok"));
        assert!(respond(b"GET /nope HTTP/1.1\r\n\r\n").starts_with("HTTP/1.1 404"));

        metrics().mint_attempts_total.inc();
        let body = respond(b"GET /metrics HTTP/1.1\r\n\r\n");
        assert!(body.starts_with("HTTP/1.1 200"));
        assert!(body.contains("mint_attempts_total"));
    }
}
