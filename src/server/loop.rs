// Server loop module
// Accepts connections until the shutdown future resolves

use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;

use super::connection::accept_connection;
use crate::config::AppState;
use crate::logger;

/// Accept connections until `shutdown` resolves with its reason.
///
/// Connections already being served are not awaited; they end when the runtime drops.
pub async fn start_server_loop<F>(listener: TcpListener, state: Arc<AppState>, shutdown: F)
where
    F: Future<Output = &'static str>,
{
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => accept_connection(stream, peer_addr, &state),
                    Err(e) => logger::log_error(&format!("Failed to accept connection: {e}")),
                }
            }

            reason = &mut shutdown => {
                logger::log_shutdown(reason);
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::parse_args;
    use crate::config::{Config, ServerConfig, Settings};
    use crate::server::create_listener;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::sync::oneshot;

    fn state(root: &std::path::Path, max_connections: Option<usize>) -> Arc<AppState> {
        let cli = parse_args(["giles", "-r", root.to_str().unwrap(), "-u", "127.0.0.1"]).unwrap();
        let mut settings = Settings::load(None).unwrap();
        settings.logging.access_log = false;
        settings.performance.max_connections = max_connections;

        let config = Config {
            server: ServerConfig::from_cli(&cli).unwrap(),
            logging: settings.logging,
            performance: settings.performance,
        };
        Arc::new(AppState::new(config).unwrap())
    }

    async fn raw_request(addr: std::net::SocketAddr, request: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut buf = Vec::new();
        stream.read_to_end(&mut buf).await.unwrap();
        String::from_utf8_lossy(&buf).into_owned()
    }

    #[tokio::test]
    async fn test_serves_over_tcp_until_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "hello").unwrap();

        let listener = create_listener("127.0.0.1:0".parse().unwrap(), 16).unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel::<()>();
        let server = tokio::spawn(start_server_loop(listener, state(dir.path(), None), async {
            let _ = rx.await;
            "test finished"
        }));

        let response = raw_request(
            addr,
            "GET /a.txt HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
        )
        .await;
        assert!(response.starts_with("HTTP/1.1 200 OK"), "{response}");
        assert!(response.to_ascii_lowercase().contains("content-type: text/plain"));
        assert!(response.ends_with("\r\n\r\nhello"));

        let response = raw_request(
            addr,
            "GET /../etc/passwd HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
        )
        .await;
        assert!(response.starts_with("HTTP/1.1 404 Not Found"), "{response}");

        tx.send(()).unwrap();
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_connection_limit_drops_excess() {
        let dir = tempfile::tempdir().unwrap();
        let listener = create_listener("127.0.0.1:0".parse().unwrap(), 16).unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel::<()>();
        let server = tokio::spawn(start_server_loop(listener, state(dir.path(), Some(0)), async {
            let _ = rx.await;
            "test finished"
        }));

        let mut stream = TcpStream::connect(addr).await.unwrap();
        let _ = stream
            .write_all(b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await;
        let mut buf = Vec::new();
        // closed without a response; a reset is also acceptable
        let read = stream.read_to_end(&mut buf).await;
        assert!(read.is_err() || buf.is_empty());

        tx.send(()).unwrap();
        server.await.unwrap();
    }
}
