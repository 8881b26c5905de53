//! In-memory chain and stage fakes shared by the integration tests
#![allow(dead_code)]

use alloy::primitives::{Address, B256, U256};
use async_trait::async_trait;
use signal_executor::chain::{ChainClient, ChainConnector, ChainError, ReceiptSummary};
use signal_executor::config::{Config, NetworkConfig};
use signal_executor::execution::{ExecutionRequest, SwapReceipt};
use signal_executor::monitor::{MonitorRequest, MonitorResult, MonitorStatus};
use signal_executor::pipeline::stages::{
    ExecutionService, MonitorService, RiskService, StageError,
};
use signal_executor::risk::{RecordAck, RiskCheckRequest, RiskDecision, TradeRecord};
use signal_executor::wallet::{PreparedTransaction, SecureWallet};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// Anvil's first dev account
pub const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const TEST_ADDRESS: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";
pub const ROUTER: &str = "0x7a250d5630B4cF539739dF2C5dAcb4c659F2488D";

pub fn ether(n: u64) -> U256 {
    U256::from(n) * U256::from(10u64).pow(U256::from(18))
}

/// Config with a usable router on both networks and fast polling
pub fn test_config() -> Config {
    let mut config = Config::default();
    for profile in config.networks.values_mut() {
        profile.router_address = ROUTER.to_string();
    }
    config.execution.receipt_poll_interval_ms = 1;
    config.execution.approval_timeout_secs = 1;
    config.timeouts.confirmation_secs = 1;
    config.risk.cooldown_seconds = 0;
    config
}

/// Scriptable chain: balances are fixed, every send gets the next queued
/// receipt (`None` = never mined), defaulting to a successful one
pub struct FakeChain {
    pub chain_id: u64,
    pub head: u64,
    pub native: Mutex<U256>,
    pub token: Mutex<U256>,
    pub allowance: Mutex<U256>,
    pub sends: Mutex<Vec<PreparedTransaction>>,
    pub send_error: Mutex<Option<ChainError>>,
    pub receipt_plan: Mutex<VecDeque<Option<ReceiptSummary>>>,
    pub receipts: Mutex<Vec<(B256, Option<ReceiptSummary>)>>,
}

impl FakeChain {
    pub fn funded() -> Self {
        Self {
            chain_id: 11_155_111,
            head: 105,
            native: Mutex::new(ether(1)),
            token: Mutex::new(ether(1_000)),
            allowance: Mutex::new(U256::ZERO),
            sends: Mutex::new(Vec::new()),
            send_error: Mutex::new(None),
            receipt_plan: Mutex::new(VecDeque::new()),
            receipts: Mutex::new(Vec::new()),
        }
    }

    pub fn plan_receipt(&self, receipt: Option<ReceiptSummary>) {
        self.receipt_plan.lock().unwrap().push_back(receipt);
    }

    pub fn sends(&self) -> Vec<PreparedTransaction> {
        self.sends.lock().unwrap().clone()
    }

    /// Register a receipt for an externally known hash
    pub fn add_receipt(&self, hash: B256, receipt: Option<ReceiptSummary>) {
        self.receipts.lock().unwrap().push((hash, receipt));
    }
}

pub fn mined(success: bool, block: u64) -> ReceiptSummary {
    ReceiptSummary {
        success,
        block_number: Some(block),
        gas_used: 120_000,
    }
}

#[async_trait]
impl ChainClient for FakeChain {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn native_balance(&self, _owner: Address) -> Result<U256, ChainError> {
        Ok(*self.native.lock().unwrap())
    }

    async fn token_balance(&self, _token: Address, _owner: Address) -> Result<U256, ChainError> {
        Ok(*self.token.lock().unwrap())
    }

    async fn allowance(
        &self,
        _token: Address,
        _owner: Address,
        _spender: Address,
    ) -> Result<U256, ChainError> {
        Ok(*self.allowance.lock().unwrap())
    }

    async fn block_number(&self) -> Result<u64, ChainError> {
        Ok(self.head)
    }

    async fn send_transaction(
        &self,
        _wallet: &SecureWallet,
        tx: PreparedTransaction,
    ) -> Result<B256, ChainError> {
        if let Some(err) = self.send_error.lock().unwrap().clone() {
            return Err(err);
        }
        let mut sends = self.sends.lock().unwrap();
        sends.push(tx);
        let hash = B256::with_last_byte(sends.len() as u8);

        let receipt = self
            .receipt_plan
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Some(mined(true, 100)));
        self.receipts.lock().unwrap().push((hash, receipt));
        Ok(hash)
    }

    async fn receipt(&self, hash: B256) -> Result<Option<ReceiptSummary>, ChainError> {
        Ok(self
            .receipts
            .lock()
            .unwrap()
            .iter()
            .find(|(h, _)| *h == hash)
            .and_then(|(_, r)| *r))
    }
}

/// Hands out the same fake chain for every network and remembers endpoints
pub struct FakeConnector {
    pub chain: Arc<FakeChain>,
    pub endpoints: Mutex<Vec<String>>,
}

impl FakeConnector {
    pub fn new(chain: Arc<FakeChain>) -> Self {
        Self {
            chain,
            endpoints: Mutex::new(Vec::new()),
        }
    }
}

impl ChainConnector for FakeConnector {
    fn connect(&self, network: &NetworkConfig) -> Result<Arc<dyn ChainClient>, ChainError> {
        self.endpoints
            .lock()
            .unwrap()
            .push(network.rpc_endpoint.clone());
        let client: Arc<dyn ChainClient> = self.chain.clone();
        Ok(client)
    }
}

pub struct FakeRisk {
    pub decision: Result<RiskDecision, StageError>,
    pub record_result: Result<RecordAck, StageError>,
    pub checks: AtomicUsize,
    pub records: Mutex<Vec<TradeRecord>>,
}

impl FakeRisk {
    pub fn allowing() -> Self {
        Self {
            decision: Ok(RiskDecision::allow()),
            record_result: Ok(RecordAck {
                recorded: true,
                current_daily_volume: 10.0,
            }),
            checks: AtomicUsize::new(0),
            records: Mutex::new(Vec::new()),
        }
    }

    pub fn denying(reason: &str) -> Self {
        Self {
            decision: Ok(RiskDecision::deny(reason)),
            ..Self::allowing()
        }
    }

    pub fn record_count(&self) -> usize {
        self.records.lock().unwrap().len()
    }
}

#[async_trait]
impl RiskService for FakeRisk {
    async fn check(&self, _request: RiskCheckRequest) -> Result<RiskDecision, StageError> {
        self.checks.fetch_add(1, Ordering::SeqCst);
        self.decision.clone()
    }

    async fn record(&self, record: &TradeRecord) -> Result<RecordAck, StageError> {
        self.records.lock().unwrap().push(record.clone());
        self.record_result.clone()
    }
}

pub struct FakeExecution {
    pub receipt: Result<SwapReceipt, StageError>,
    pub requests: Mutex<Vec<ExecutionRequest>>,
}

impl FakeExecution {
    pub fn submitting(tx_hash: &str) -> Self {
        Self {
            receipt: Ok(SwapReceipt::Submitted {
                tx_hash: tx_hash.to_string(),
            }),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ExecutionService for FakeExecution {
    async fn execute(&self, request: ExecutionRequest) -> Result<SwapReceipt, StageError> {
        self.requests.lock().unwrap().push(request);
        self.receipt.clone()
    }
}

pub struct FakeMonitor {
    pub result: Result<MonitorResult, StageError>,
    pub requests: Mutex<Vec<MonitorRequest>>,
}

impl FakeMonitor {
    pub fn with_status(status: MonitorStatus) -> Self {
        Self {
            result: Ok(MonitorResult {
                status,
                confirmations: if status == MonitorStatus::Pending { 0 } else { 3 },
                timestamp: chrono::Utc::now(),
                block_number: None,
                gas_used: None,
                detail: None,
                error_kind: None,
            }),
            requests: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl MonitorService for FakeMonitor {
    async fn check(&self, request: MonitorRequest) -> Result<MonitorResult, StageError> {
        self.requests.lock().unwrap().push(request);
        self.result.clone()
    }
}
