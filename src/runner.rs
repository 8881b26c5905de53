//! Executor runtime
//!
//! Builds every pipeline component from one [`Config`] and wires them into a
//! [`SignalRouter`]. All components share the token registry, the chain
//! connection cache and the single [`RiskGate`].

use crate::chain::{ChainConnections, ChainConnector, HttpConnector};
use crate::config::Config;
use crate::execution::SwapEngine;
use crate::monitor::ConfirmationMonitor;
use crate::pipeline::{PipelineOutcome, SignalRouter};
use crate::risk::{LedgerWriter, RiskGate};
use crate::signal::TradeSignal;
use crate::tokens::TokenRegistry;
use crate::wallet::{ConfiguredCredentials, CredentialProvider};
use crate::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Fully wired executor
pub struct ExecutorRuntime {
    config: Arc<Config>,
    tokens: Arc<TokenRegistry>,
    risk: Arc<RiskGate>,
    engine: Arc<SwapEngine>,
    monitor: Arc<ConfirmationMonitor>,
    router: SignalRouter,
}

impl ExecutorRuntime {
    /// Runtime talking to real nodes over HTTP
    pub fn new(config: Config) -> Result<Self> {
        Self::with_connector(config, Arc::new(HttpConnector))
    }

    /// Runtime with a custom chain connector and configured credentials
    pub fn with_connector(config: Config, connector: Arc<dyn ChainConnector>) -> Result<Self> {
        let credentials = Arc::new(ConfiguredCredentials::from_settings(&config.wallet));
        Self::build(config, connector, credentials)
    }

    pub fn build(
        config: Config,
        connector: Arc<dyn ChainConnector>,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);

        let tokens = Arc::new(TokenRegistry::with_overrides(&config.token_addresses)?);
        let connections = Arc::new(ChainConnections::new(connector));

        let risk = Arc::new(RiskGate::new(config.risk.clone()));
        info!(
            max_trade = config.risk.max_trade_amount,
            daily_limit = config.risk.daily_limit,
            cooldown_secs = config.risk.cooldown_seconds,
            "Risk gate ready"
        );

        let engine = Arc::new(SwapEngine::new(
            Arc::clone(&config),
            Arc::clone(&tokens),
            Arc::clone(&connections),
            credentials,
        ));
        let monitor = Arc::new(ConfirmationMonitor::new(
            Arc::clone(&config),
            Arc::clone(&connections),
        ));

        let mut ledger = LedgerWriter::new(
            risk.clone(),
            Duration::from_millis(config.timeouts.record_ms),
        );
        if let Some(path) = &config.ledger_path {
            info!(path = %path, "Journaling settlements");
            ledger = ledger.with_journal(path);
        }

        let router = SignalRouter::new(
            risk.clone(),
            engine.clone(),
            monitor.clone(),
            ledger,
            &config.timeouts,
            config.network_mode.clone(),
        );

        info!(
            network_mode = %config.network_mode,
            auto_approve = config.auto_approve,
            "Executor runtime ready"
        );

        Ok(Self {
            config,
            tokens,
            risk,
            engine,
            monitor,
            router,
        })
    }

    pub async fn submit(&self, signal: TradeSignal) -> PipelineOutcome {
        self.router.handle_signal(signal).await
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn tokens(&self) -> &TokenRegistry {
        &self.tokens
    }

    pub fn risk(&self) -> &RiskGate {
        &self.risk
    }

    pub fn engine(&self) -> &SwapEngine {
        &self.engine
    }

    pub fn monitor(&self) -> &ConfirmationMonitor {
        &self.monitor
    }

    pub fn router(&self) -> &SignalRouter {
        &self.router
    }
}
