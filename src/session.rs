use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;

use crate::actions::Actions;
use crate::backend::HttpBackend;
use crate::config::Config;
use crate::engine::ReconciliationEngine;
use crate::rpc::RpcChain;
use crate::sources::{BackendReader, ChainReader};
use crate::types::{Address, DaoParams};
use crate::wallet;

/// One connected session: configuration, caller identity, the DAO
/// parameters read once from the chain, and the engine plus orchestrators
/// wired to the concrete adapters.
///
/// These were module-level singletons in earlier clients; holding them in
/// one explicit object gives them a defined lifecycle (set at connect,
/// read-only afterwards).
pub struct Session {
    pub config: Config,
    pub caller: Address,
    pub params: DaoParams,
    pub engine: Arc<ReconciliationEngine>,
    pub actions: Actions,
    pub backend: Arc<dyn BackendReader>,
    pub rpc: Arc<RpcChain>,
}

impl Session {
    /// Connect using the on-disk configuration. Read-only commands work
    /// without a wallet; write actions fail their wallet precondition.
    pub async fn connect() -> Result<Self> {
        Self::connect_with(Config::load()?).await
    }

    pub async fn connect_with(config: Config) -> Result<Self> {
        let caller = match wallet::load_address() {
            Ok(address) => address,
            Err(error) => {
                debug!(%error, "no wallet connected; session is read-only");
                Address::new("")
            }
        };

        let backend: Arc<dyn BackendReader> = Arc::new(HttpBackend::new(
            &config.backend_url,
            config.auth_token.clone(),
        ));
        let rpc = Arc::new(RpcChain::new(&config.rpc_url, caller.clone()));

        let params = DaoParams {
            owner: rpc.owner().await.context("Failed to read DAO owner")?,
            quorum_threshold: rpc
                .quorum_threshold()
                .await
                .context("Failed to read quorum threshold")?,
            vote_duration_secs: rpc
                .vote_duration()
                .await
                .context("Failed to read vote duration")?,
        };
        debug!(owner = %params.owner, "DAO parameters loaded");

        let chain: Arc<dyn ChainReader> = rpc.clone();
        let engine = Arc::new(ReconciliationEngine::new(backend.clone(), chain.clone()));
        let actions = Actions::new(
            engine.clone(),
            backend.clone(),
            chain,
            rpc.clone(),
            params.clone(),
            caller.clone(),
        );

        Ok(Session {
            config,
            caller,
            params,
            engine,
            actions,
            backend,
            rpc,
        })
    }

    pub fn wallet_connected(&self) -> bool {
        !self.caller.as_str().is_empty()
    }
}
