// src/network/pool.rs

//! Mining pool client implementation
//!
//! Handles communication with mining pools using a Stratum-like protocol
//! over WebSocket. Manages connection lifecycle, job distribution, and
//! share submission. The pool supplies everything a job needs: the
//! 80-byte header template, the floating-point difficulty the algorithm's
//! scaling rule converts into a target, and the first nonce to scan.
use crate::miner::scheduler::{MiningJob, Share};
use crate::stats::reporter::ShareResult;
use crate::types::AlgorithmType;
use crate::utils::error::MinerError;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time;
use tokio_tungstenite::WebSocketStream;
use tungstenite::protocol::Message;
use url::Url;

/// JSON-RPC id used for share submissions, echoed back in responses.
const SUBMIT_ID: u64 = 3;

/// Write half of the pool WebSocket connection.
type PoolSink =
    SplitSink<WebSocketStream<tokio_tungstenite::MaybeTlsStream<TcpStream>>, Message>;

/// Configuration for connecting to a mining pool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Pool connection URL (e.g., "wss://pool.example.com:3333")
    pub url: String,
    /// Wallet address or pool username
    pub user: String,
    /// Worker password (often "x" if not required)
    pub password: String,
    /// Worker identifier for statistics tracking
    pub worker_id: String,
}

/// Client for communicating with a mining pool
///
/// Handles all pool protocol interactions including:
/// - Connection management
/// - Job distribution to miners
/// - Share submission and accept/reject accounting
/// - Keepalive messages
pub struct PoolClient {
    /// Pool connection configuration
    config: PoolConfig,
    /// Thread-safe WebSocket connection handle
    connection: Mutex<Option<WebSocketStream<tokio_tungstenite::MaybeTlsStream<TcpStream>>>>,
    /// Channel for sending received jobs to the scheduler
    job_sender: crossbeam_channel::Sender<MiningJob>,
    /// Channel for receiving shares from miners (wrapped in Arc for thread safety)
    share_receiver: Arc<crossbeam_channel::Receiver<Share>>,
    /// Channel for reporting submission results to stats
    result_sender: crossbeam_channel::Sender<ShareResult>,
}

impl PoolClient {
    /// Creates a new PoolClient instance
    ///
    /// # Arguments
    /// * `config` - Pool connection configuration
    /// * `job_sender` - Channel for sending jobs to the scheduler
    /// * `share_receiver` - Channel for receiving shares from miners
    /// * `result_sender` - Channel for reporting accept/reject results
    pub fn new(
        config: PoolConfig,
        job_sender: crossbeam_channel::Sender<MiningJob>,
        share_receiver: crossbeam_channel::Receiver<Share>,
        result_sender: crossbeam_channel::Sender<ShareResult>,
    ) -> Self {
        PoolClient {
            config,
            connection: Mutex::new(None),
            job_sender,
            share_receiver: Arc::new(share_receiver),
            result_sender,
        }
    }

    /// Establishes connection to the mining pool
    ///
    /// # Errors
    /// Returns `MinerError` if:
    /// - URL is invalid
    /// - DNS resolution fails
    /// - WebSocket handshake fails
    pub async fn connect(&self) -> Result<(), MinerError> {
        let url_str = &self.config.url;
        let url = Url::parse(url_str)
            .map_err(|e| MinerError::ConfigError(format!("Invalid URL '{}': {}", url_str, e)))?;

        if url.scheme() != "ws" && url.scheme() != "wss" {
            log::warn!(
                "Pool URL '{}' uses non-WebSocket scheme. Consider using 'ws://' or 'wss://'",
                url_str
            );
        }

        match tokio_tungstenite::connect_async(url_str).await {
            Ok((ws_stream, _)) => {
                let mut conn = self.connection.lock().await;
                *conn = Some(ws_stream);
                Ok(())
            }
            Err(e) => {
                if e.to_string().contains("dns error") {
                    Err(MinerError::ConnectionError(format!(
                        "DNS resolution failed. Check pool URL: {}",
                        url_str
                    )))
                } else {
                    Err(e.into())
                }
            }
        }
    }

    /// Main event loop for pool communication
    ///
    /// Handles:
    /// - Receiving jobs from pool
    /// - Submitting shares to pool
    /// - Sending keepalive messages
    ///
    /// # Errors
    /// Returns `MinerError` if communication fails
    pub async fn run(&self) -> Result<(), MinerError> {
        self.login().await?;
        self.subscribe().await?;

        // Take ownership of the stream and split it so the read half can
        // sit in the select loop while the write half serves the other
        // branches. Reconnecting means calling `connect` again.
        let ws = {
            let mut conn = self.connection.lock().await;
            conn.take()
                .ok_or(MinerError::ConnectionError("Not connected".into()))?
        };
        let (mut write, mut read) = ws.split();

        let mut interval = time::interval(Duration::from_secs(30));

        // One long-lived blocking receive at a time; re-armed only after
        // it yields, so no share is ever consumed and dropped.
        let mut pending_share = {
            let receiver = Arc::clone(&self.share_receiver);
            tokio::task::spawn_blocking(move || receiver.recv())
        };

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => self.handle_message(&text)?,
                        Some(Err(e)) => return Err(e.into()),
                        None => return Ok(()),
                        _ => {}
                    }
                }
                _ = interval.tick() => {
                    self.keep_alive_on(&mut write).await?;
                }
                share = &mut pending_share => {
                    match share? {
                        Ok(share) => self.submit_share_on(&mut write, &share).await?,
                        // Channel closed: the mining side is gone.
                        Err(_) => return Ok(()),
                    }
                    let receiver = Arc::clone(&self.share_receiver);
                    pending_share = tokio::task::spawn_blocking(move || receiver.recv());
                }
            }
        }
    }

    /// Handles incoming WebSocket messages from the pool
    ///
    /// # Arguments
    /// * `message` - The raw JSON message received from pool
    ///
    /// # Errors
    /// Returns `MinerError` if:
    /// - Message parsing fails
    /// - Job handling fails
    fn handle_message(&self, message: &str) -> Result<(), MinerError> {
        let json: Value = serde_json::from_str(message)?;

        if let Some(method) = json.get("method").and_then(|m| m.as_str()) {
            match method {
                "job" => self.handle_job(&json)?,
                _ => log::warn!("Unknown method received: {}", method),
            }
        } else if json.get("id").and_then(|i| i.as_u64()) == Some(SUBMIT_ID) {
            self.handle_submit_response(&json);
        }

        Ok(())
    }

    /// Processes incoming mining job notifications
    ///
    /// # Arguments
    /// * `json` - Parsed JSON message containing job details
    ///
    /// # Errors
    /// Returns `MinerError` if:
    /// - Required fields are missing
    /// - Hex decoding fails
    /// - Algorithm parsing fails
    /// - Job channel send fails
    fn handle_job(&self, json: &Value) -> Result<(), MinerError> {
        let params = json["params"]
            .as_object()
            .ok_or_else(|| MinerError::ProtocolError("Missing params object".to_string()))?;

        let job = MiningJob {
            job_id: params["job_id"]
                .as_str()
                .ok_or_else(|| MinerError::ProtocolError("Missing job_id".to_string()))?
                .to_string(),
            header: hex::decode(
                params["header"]
                    .as_str()
                    .ok_or_else(|| MinerError::ProtocolError("Missing header".to_string()))?,
            )?,
            difficulty: params["difficulty"]
                .as_f64()
                .ok_or_else(|| MinerError::ProtocolError("Missing difficulty".to_string()))?,
            start_nonce: params
                .get("start_nonce")
                .and_then(|n| n.as_u64())
                .unwrap_or(0) as u32,
            algorithm: AlgorithmType::from_str(
                params["algo"]
                    .as_str()
                    .ok_or_else(|| MinerError::ProtocolError("Missing algo".to_string()))?,
            )
            .map_err(MinerError::ProtocolError)?,
        };

        self.job_sender.send(job)?;
        Ok(())
    }

    /// Records a share submission response in the stats counters
    fn handle_submit_response(&self, json: &Value) {
        let accepted = json["result"]["status"].as_str() == Some("OK");
        if !accepted {
            log::warn!("pool rejected share: {}", json);
        }
        let result = if accepted {
            ShareResult::Accepted
        } else {
            ShareResult::Rejected
        };
        if self.result_sender.send(result).is_err() {
            log::debug!("stats listener gone, dropping share result");
        }
    }

    /// Sends login request to the mining pool
    ///
    /// # Errors
    /// Returns `MinerError` if:
    /// - WebSocket communication fails
    async fn login(&self) -> Result<(), MinerError> {
        let message = json!({
            "method": "login",
            "params": {
                "login": self.config.user,
                "pass": self.config.password,
                "agent": format!("helix_miner-rs/{}", env!("CARGO_PKG_VERSION"))
            },
            "id": 1
        });

        self.send(message).await
    }

    /// Sends subscription request to the mining pool
    ///
    /// # Errors
    /// Returns `MinerError` if:
    /// - WebSocket communication fails
    async fn subscribe(&self) -> Result<(), MinerError> {
        let message = json!({
            "method": "subscribe",
            "params": {
                "worker_id": self.config.worker_id
            },
            "id": 2
        });

        self.send(message).await
    }

    /// Submits a found share on the write half of the connection
    ///
    /// # Arguments
    /// * `write` - The write half of the live WebSocket stream
    /// * `share` - The share to submit
    ///
    /// # Errors
    /// Returns `MinerError` if the WebSocket send fails
    async fn submit_share_on(
        &self,
        write: &mut PoolSink,
        share: &Share,
    ) -> Result<(), MinerError> {
        let message = json!({
            "method": "submit",
            "params": {
                "id": self.config.worker_id,
                "job_id": share.job_id,
                "nonce": format!("{:08x}", share.nonce),
                "result": hex::encode(share.result)
            },
            "id": SUBMIT_ID
        });

        write.send(Message::Text(message.to_string().into())).await?;
        Ok(())
    }

    /// Sends a keepalive message on the write half of the connection
    ///
    /// # Errors
    /// Returns `MinerError` if the WebSocket send fails
    async fn keep_alive_on(&self, write: &mut PoolSink) -> Result<(), MinerError> {
        write
            .send(Message::Text(json!({"method": "keepalived"}).to_string().into()))
            .await?;
        Ok(())
    }

    /// Internal helper for sending JSON messages over WebSocket
    ///
    /// # Arguments
    /// * `value` - The JSON value to send
    ///
    /// # Errors
    /// Returns `MinerError` if:
    /// - Not connected to pool
    /// - WebSocket send fails
    async fn send(&self, value: Value) -> Result<(), MinerError> {
        let mut conn = self.connection.lock().await;
        let ws = conn
            .as_mut()
            .ok_or(MinerError::ConnectionError("Not connected".into()))?;
        ws.send(Message::Text(value.to_string().into())).await?;
        Ok(())
    }
}
