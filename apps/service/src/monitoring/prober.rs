//! Single-shot HTTP(S) probes.

use std::time::Duration;

use reqwest::{Client, Method};
use tokio::time::sleep;

use super::types::{OutcomeCell, ProbeOutcome};
use crate::models::{Check, HttpMethod};

/// Executes one outbound request per validated check and resolves exactly
/// one outcome, whichever of response, transport error, or timeout fires
/// first. No retries on any path.
pub struct Prober {
    client: Client,
}

impl Prober {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(concat!("vigil/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }

    /// Probe a check's target once, bounded by the check's own timeout.
    pub async fn probe(&self, check: &Check) -> ProbeOutcome {
        let cell = OutcomeCell::new();
        let timeout = Duration::from_secs(u64::from(check.timeout_seconds));
        let request = self.client.request(method_for(check.method), check.target());

        tokio::select! {
            result = request.send() => {
                let outcome = match result {
                    Ok(response) => ProbeOutcome::Response {
                        code: response.status().as_u16(),
                    },
                    Err(err) if err.is_timeout() => ProbeOutcome::Timeout,
                    Err(err) => ProbeOutcome::Transport {
                        detail: err.to_string(),
                    },
                };
                cell.complete(outcome);
            }
            _ = sleep(timeout) => {
                cell.complete(ProbeOutcome::Timeout);
            }
        }

        match cell.into_outcome() {
            Some(outcome) => outcome,
            // Unreachable: both branches above complete the cell
            None => ProbeOutcome::Transport {
                detail: "probe resolved without an outcome".into(),
            },
        }
    }
}

fn method_for(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Delete => Method::DELETE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CheckState, Protocol};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn check_for(addr: std::net::SocketAddr) -> Check {
        Check {
            id: "abcdefghij0123456789".into(),
            user_phone: "5551234567".into(),
            protocol: Protocol::Http,
            url: addr.to_string(),
            method: HttpMethod::Get,
            success_codes: vec![200],
            timeout_seconds: 2,
            state: CheckState::Down,
            last_checked: None,
        }
    }

    async fn serve_once(listener: TcpListener, response: &'static str) {
        if let Ok((mut socket, _)) = listener.accept().await {
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            let _ = socket.write_all(response.as_bytes()).await;
        }
    }

    #[tokio::test]
    async fn probe_reports_response_code() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve_once(
            listener,
            "HTTP/1.1 200 OK\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
        ));

        let prober = Prober::new().unwrap();
        let outcome = prober.probe(&check_for(addr)).await;
        assert_eq!(outcome, ProbeOutcome::Response { code: 200 });
    }

    #[tokio::test]
    async fn probe_reports_non_success_codes_too() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve_once(
            listener,
            "HTTP/1.1 503 Service Unavailable\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
        ));

        let prober = Prober::new().unwrap();
        let outcome = prober.probe(&check_for(addr)).await;
        assert_eq!(outcome, ProbeOutcome::Response { code: 503 });
    }

    #[tokio::test]
    async fn probe_times_out_when_server_never_responds() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // Accept the connection and hold it open silently
        tokio::spawn(async move {
            let _socket = listener.accept().await;
            sleep(Duration::from_secs(10)).await;
        });

        let prober = Prober::new().unwrap();
        let outcome = prober.probe(&check_for(addr)).await;
        assert_eq!(outcome, ProbeOutcome::Timeout);
    }

    #[tokio::test]
    async fn probe_reports_transport_error_for_dead_port() {
        // Bind then drop to get a port with no listener
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let prober = Prober::new().unwrap();
        let outcome = prober.probe(&check_for(addr)).await;
        assert!(matches!(outcome, ProbeOutcome::Transport { .. }));
    }
}
