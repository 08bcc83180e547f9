// src/network/node.rs
use crate::miner::scheduler::{MiningJob, Share};
use crate::stats::reporter::ShareResult;
use crate::types::AlgorithmType;
use crate::utils::error::MinerError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for connecting to a node's RPC interface
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// URL of the node's RPC endpoint (e.g., "http://127.0.0.1:9333/json_rpc")
    pub rpc_url: String,
    /// Username for RPC authentication (if required)
    pub rpc_user: String,
    /// Password for RPC authentication (if required)
    pub rpc_password: String,
    /// Wallet address that will receive mining rewards
    pub wallet_address: String,
}

/// Client for solo mining against a node's RPC interface
///
/// Polls the chain height, fetches a fresh block template whenever it
/// changes, and submits solved blocks back.
pub struct NodeClient {
    /// Configuration for the node connection
    config: NodeConfig,
    /// HTTP client for making RPC requests
    client: Client,
    /// Current blockchain height known to this client
    current_height: u64,
    /// Channel for sending fresh jobs to the scheduler
    job_sender: crossbeam_channel::Sender<MiningJob>,
    /// Channel for receiving solved blocks from miners
    share_receiver: Arc<crossbeam_channel::Receiver<Share>>,
    /// Channel for reporting submission results to stats
    result_sender: crossbeam_channel::Sender<ShareResult>,
}

impl NodeClient {
    /// Creates a new NodeClient with the given configuration
    ///
    /// # Arguments
    /// * `config` - Node configuration containing RPC connection details
    /// * `job_sender` - Channel for sending jobs to the scheduler
    /// * `share_receiver` - Channel for receiving solved blocks
    /// * `result_sender` - Channel for reporting accept/reject results
    pub fn new(
        config: NodeConfig,
        job_sender: crossbeam_channel::Sender<MiningJob>,
        share_receiver: crossbeam_channel::Receiver<Share>,
        result_sender: crossbeam_channel::Sender<ShareResult>,
    ) -> Self {
        NodeClient {
            config,
            client: Client::new(),
            current_height: 0,
            job_sender,
            share_receiver: Arc::new(share_receiver),
            result_sender,
        }
    }

    /// Main event loop for solo mining
    ///
    /// Polls the chain height and pushes a fresh template to the
    /// scheduler whenever a new block appears; submits solved blocks as
    /// workers find them.
    ///
    /// # Errors
    /// Returns `MinerError` if an RPC call or channel send fails
    pub async fn run(&mut self) -> Result<(), MinerError> {
        let mut interval = tokio::time::interval(Duration::from_secs(15));

        let mut pending_share = {
            let receiver = Arc::clone(&self.share_receiver);
            tokio::task::spawn_blocking(move || receiver.recv())
        };

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let height = self.get_current_height().await?;
                    if height > self.current_height {
                        self.current_height = height;
                        let job = self.get_block_template().await?;
                        self.job_sender.send(job)?;
                    }
                }
                share = &mut pending_share => {
                    match share? {
                        Ok(share) => self.submit_block(&share).await?,
                        // Channel closed: the mining side is gone.
                        Err(_) => return Ok(()),
                    }
                    let receiver = Arc::clone(&self.share_receiver);
                    pending_share = tokio::task::spawn_blocking(move || receiver.recv());
                }
            }
        }
    }

    /// Requests a new block template from the node
    ///
    /// # Returns
    /// * `Ok(MiningJob)` - Contains the job details if successful
    /// * `Err(MinerError)` - If there was an error getting the block template
    pub async fn get_block_template(&self) -> Result<MiningJob, MinerError> {
        let response = self
            .rpc_call(
                "getblocktemplate",
                json!({
                    "wallet_address": self.config.wallet_address
                }),
            )
            .await?;

        let result = response["result"]
            .as_object()
            .ok_or_else(|| MinerError::ProtocolError("Missing result object".to_string()))?;

        Ok(MiningJob {
            job_id: result["job_id"]
                .as_str()
                .ok_or_else(|| MinerError::ProtocolError("Missing job_id".to_string()))?
                .to_string(),
            header: hex::decode(
                result["header"]
                    .as_str()
                    .ok_or_else(|| MinerError::ProtocolError("Missing header".to_string()))?,
            )?,
            difficulty: result["difficulty"]
                .as_f64()
                .ok_or_else(|| MinerError::ProtocolError("Missing difficulty".to_string()))?,
            start_nonce: result
                .get("start_nonce")
                .and_then(|n| n.as_u64())
                .unwrap_or(0) as u32,
            algorithm: AlgorithmType::from_str(
                result["algo"]
                    .as_str()
                    .ok_or_else(|| MinerError::ProtocolError("Missing algo".to_string()))?,
            )
            .map_err(MinerError::ProtocolError)?,
        })
    }

    /// Submits a solved block to the node
    ///
    /// # Arguments
    /// * `share` - The solved block to submit
    ///
    /// # Returns
    /// * `Ok(())` - If the submission round-trip succeeded
    /// * `Err(MinerError)` - If there was an error submitting the block
    pub async fn submit_block(&self, share: &Share) -> Result<(), MinerError> {
        let response = self
            .rpc_call(
                "submitblock",
                json!({
                    "job_id": share.job_id,
                    "nonce": format!("{:08x}", share.nonce),
                    "hash": hex::encode(share.result)
                }),
            )
            .await?;

        let accepted = response["result"]["status"].as_str() == Some("OK");
        if !accepted {
            log::warn!("node rejected block: {}", response);
        }
        let result = if accepted {
            ShareResult::Accepted
        } else {
            ShareResult::Rejected
        };
        if self.result_sender.send(result).is_err() {
            log::debug!("stats listener gone, dropping share result");
        }
        Ok(())
    }

    /// Makes an RPC call to the node
    ///
    /// # Arguments
    /// * `method` - The RPC method to call
    /// * `params` - Parameters for the RPC call
    ///
    /// # Returns
    /// * `Ok(Value)` - The JSON-RPC response if successful
    /// * `Err(MinerError)` - If there was an error making the RPC call
    async fn rpc_call(&self, method: &str, params: Value) -> Result<Value, MinerError> {
        let response = self
            .client
            .post(&self.config.rpc_url)
            .basic_auth(&self.config.rpc_user, Some(&self.config.rpc_password))
            .json(&json!({
                "jsonrpc": "2.0",
                "id": "0",
                "method": method,
                "params": params
            }))
            .send()
            .await?
            .json()
            .await?;

        Ok(response)
    }

    /// Gets the current blockchain height from the node
    ///
    /// # Returns
    /// * `Ok(u64)` - The current blockchain height
    /// * `Err(MinerError)` - If there was an error getting the height
    async fn get_current_height(&self) -> Result<u64, MinerError> {
        let response = self.rpc_call("get_info", json!({})).await?;
        Ok(response["result"]["height"].as_u64().unwrap_or(0))
    }
}
