//! Alloy-backed [`ChainClient`].
//! Providers are built per call from the configured HTTP endpoint, so the
//! client itself stays `Clone` and cheap to share.

use crate::calls::ContractCall;
use crate::client::ChainClient;
use crate::contracts::{ContractAddresses, IAggregatorV3, IDSCEngine};
use crate::error::ChainError;
use crate::types::{
    AggregateMetric, LiquidationEvent, PositionSnapshot, PriceFeedSnapshot, ProtocolConstants,
};
use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, B256, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::{Filter, TransactionRequest};
use alloy::signers::local::PrivateKeySigner;
use alloy::sol_types::SolEvent;
use alloy::transports::http::reqwest::Url;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default receipt polling interval.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1_000);

/// Chain client over a JSON-RPC HTTP endpoint.
#[derive(Clone)]
pub struct AlloyChainClient {
    /// RPC endpoint
    rpc_url: Url,
    /// Deployed contracts
    addresses: ContractAddresses,
    /// Signer for writes (read-only client when absent)
    wallet: Option<EthereumWallet>,
    /// Signer address
    account: Option<Address>,
    /// Receipt polling interval while awaiting confirmations
    poll_interval: Duration,
}

impl std::fmt::Debug for AlloyChainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlloyChainClient")
            .field("rpc_url", &self.rpc_url.as_str())
            .field("addresses", &self.addresses)
            .field("account", &self.account)
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}

impl AlloyChainClient {
    /// Create a read-only client.
    pub fn new(rpc_url: &str, addresses: ContractAddresses) -> Result<Self> {
        let rpc_url: Url = rpc_url
            .parse()
            .with_context(|| format!("Invalid RPC URL: {}", rpc_url))?;

        info!(
            rpc = %rpc_url,
            engine = %addresses.engine,
            stable_coin = %addresses.stable_coin,
            price_feed = %addresses.price_feed,
            "Chain client initialized"
        );

        Ok(Self {
            rpc_url,
            addresses,
            wallet: None,
            account: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    /// Attach a local signer (with or without `0x` prefix).
    pub fn with_signer(mut self, private_key: &str) -> Result<Self> {
        let signer: PrivateKeySigner = private_key
            .trim_start_matches("0x")
            .parse()
            .context("Invalid private key")?;
        let address = signer.address();

        info!(account = %address, "Signer attached");

        self.account = Some(address);
        self.wallet = Some(EthereumWallet::from(signer));
        Ok(self)
    }

    /// Set the receipt polling interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Address of the attached signer.
    pub fn account(&self) -> Option<Address> {
        self.account
    }

    /// Deployed contract addresses.
    pub fn addresses(&self) -> &ContractAddresses {
        &self.addresses
    }

    /// Chain ID reported by the endpoint.
    pub async fn chain_id(&self) -> Result<u64> {
        let provider = ProviderBuilder::new().on_http(self.rpc_url.clone());
        Ok(provider.get_chain_id().await?)
    }

    /// Check the endpoint answers.
    pub async fn health_check(&self) -> Result<bool> {
        let block = self.latest_block().await?;
        debug!(block = block, "Provider health check passed");
        Ok(block > 0)
    }
}

#[async_trait]
impl ChainClient for AlloyChainClient {
    async fn read_position(&self, account: Address) -> Result<PositionSnapshot, ChainError> {
        let provider = ProviderBuilder::new().on_http(self.rpc_url.clone());
        let engine = IDSCEngine::new(self.addresses.engine, &provider);

        let info = engine
            .getPositionInfo(account)
            .call()
            .await
            .map_err(|e| ChainError::from_contract(e, None))?;

        debug!(
            account = %account,
            collateral = %info._collateralDeposited,
            minted = %info._dscMinted,
            "Position read"
        );

        Ok(PositionSnapshot {
            collateral_deposited: info._collateralDeposited,
            dsc_minted: info._dscMinted,
            health_factor_raw: info._healthFactor,
        })
    }

    async fn read_protocol_constants(&self) -> Result<ProtocolConstants, ChainError> {
        let provider = ProviderBuilder::new().on_http(self.rpc_url.clone());
        let engine = IDSCEngine::new(self.addresses.engine, &provider);

        let min_hf_call = engine.MINIMUM_HEALTH_FACTOR();
        let precision_call = engine.PRECISION();
        let threshold_call = engine.LIQUIDATION_THRESHOLD();
        let liq_precision_call = engine.LIQUIDATION_PRECISION();

        let (min_hf, precision, threshold, liq_precision) = tokio::try_join!(
            min_hf_call.call(),
            precision_call.call(),
            threshold_call.call(),
            liq_precision_call.call()
        )
        .map_err(|e| ChainError::from_contract(e, None))?;

        Ok(ProtocolConstants {
            minimum_health_factor: min_hf._0,
            precision: precision._0,
            liquidation_threshold: threshold._0,
            liquidation_precision: liq_precision._0,
        })
    }

    async fn read_price_feed(&self) -> Result<PriceFeedSnapshot, ChainError> {
        let provider = ProviderBuilder::new().on_http(self.rpc_url.clone());
        let feed = IAggregatorV3::new(self.addresses.price_feed, &provider);

        let decimals_call = feed.decimals();
        let round_call = feed.latestRoundData();

        let (decimals, round) = tokio::try_join!(decimals_call.call(), round_call.call())
            .map_err(|e| ChainError::from_contract(e, None))?;

        if round.answer.is_negative() {
            warn!(feed = %self.addresses.price_feed, "Price feed returned a negative answer");
        }

        Ok(PriceFeedSnapshot::from_signed(
            decimals._0,
            round.answer,
            round.updatedAt.saturating_to::<u64>(),
        ))
    }

    async fn read_aggregate_metric(&self, metric: AggregateMetric) -> Result<U256, ChainError> {
        let provider = ProviderBuilder::new().on_http(self.rpc_url.clone());
        let engine = IDSCEngine::new(self.addresses.engine, &provider);

        let value = match metric {
            AggregateMetric::TotalDepositedCollateral => engine
                .getTotalDepositedCollateral()
                .call()
                .await
                .map(|r| r._0),
            AggregateMetric::StableSupply => engine.getDSCSupply().call().await.map(|r| r._0),
        }
        .map_err(|e| ChainError::from_contract(e, None))?;

        debug!(metric = metric.getter(), value = %value, "Aggregate metric read");
        Ok(value)
    }

    async fn latest_block(&self) -> Result<u64, ChainError> {
        let provider = ProviderBuilder::new().on_http(self.rpc_url.clone());
        provider
            .get_block_number()
            .await
            .map_err(|e| ChainError::from_rpc(&e, None))
    }

    async fn query_liquidation_events(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<LiquidationEvent>, ChainError> {
        let provider = ProviderBuilder::new().on_http(self.rpc_url.clone());
        let filter = Filter::new()
            .address(self.addresses.engine)
            .event_signature(IDSCEngine::Liquidated::SIGNATURE_HASH)
            .from_block(from_block)
            .to_block(to_block);

        let logs = provider
            .get_logs(&filter)
            .await
            .map_err(|e| ChainError::from_rpc(&e, None))?;

        let mut events = Vec::with_capacity(logs.len());
        for log in logs {
            match log.log_decode::<IDSCEngine::Liquidated>() {
                Ok(decoded) => events.push(LiquidationEvent {
                    block_number: log.block_number.unwrap_or_default(),
                    collateral_sold: decoded.inner.data._collateralSold,
                }),
                Err(e) => {
                    warn!(error = %e, tx = ?log.transaction_hash, "Skipping undecodable Liquidated log");
                }
            }
        }

        debug!(
            from = from_block,
            to = to_block,
            count = events.len(),
            "Liquidation events fetched"
        );

        Ok(events)
    }

    async fn submit(&self, call: &ContractCall) -> Result<B256, ChainError> {
        let Some(wallet) = self.wallet.clone() else {
            return Err(ChainError::other("no signer configured for writes"));
        };

        let encoded = call.encode(&self.addresses);
        let tx = TransactionRequest::default()
            .with_to(encoded.to)
            .with_input(encoded.input.clone())
            .with_value(encoded.value);

        info!(call = %call, to = %encoded.to, value = %encoded.value, "Sending transaction");

        let provider = ProviderBuilder::new()
            .wallet(wallet)
            .on_http(self.rpc_url.clone());

        let pending = provider
            .send_transaction(tx)
            .await
            .map_err(|e| ChainError::from_rpc(&e, Some(&encoded.input)))?;
        let hash = *pending.tx_hash();

        info!(tx_hash = %hash, call = call.name(), "Transaction submitted");
        Ok(hash)
    }

    async fn await_confirmations(&self, hash: B256, confirmations: u64) -> Result<(), ChainError> {
        let provider = ProviderBuilder::new().on_http(self.rpc_url.clone());
        let required = confirmations.max(1);

        loop {
            let receipt = provider
                .get_transaction_receipt(hash)
                .await
                .map_err(|e| ChainError::from_rpc(&e, None))?;

            if let Some(receipt) = receipt {
                if !receipt.status() {
                    warn!(tx_hash = %hash, "Transaction reverted");
                    return Err(ChainError::Reverted { hash });
                }

                let included = receipt.block_number.unwrap_or_default();
                let head = provider
                    .get_block_number()
                    .await
                    .map_err(|e| ChainError::from_rpc(&e, None))?;

                if head.saturating_sub(included) + 1 >= required {
                    info!(
                        tx_hash = %hash,
                        block = included,
                        gas_used = receipt.gas_used,
                        "Transaction confirmed"
                    );
                    return Ok(());
                }
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addresses() -> ContractAddresses {
        ContractAddresses {
            engine: Address::repeat_byte(0x11),
            stable_coin: Address::repeat_byte(0x22),
            price_feed: Address::repeat_byte(0x33),
        }
    }

    #[test]
    fn test_invalid_url_rejected() {
        assert!(AlloyChainClient::new("not a url", addresses()).is_err());
    }

    #[tokio::test]
    async fn test_submit_without_signer() {
        let client = AlloyChainClient::new("http://127.0.0.1:8545", addresses()).unwrap();
        let result = client
            .submit(&ContractCall::Mint {
                amount: U256::from(1u64),
            })
            .await;
        assert!(matches!(result, Err(ChainError::Other { .. })));
    }

    #[test]
    fn test_signer_sets_account() {
        // Anvil's first default key
        let client = AlloyChainClient::new("http://127.0.0.1:8545", addresses())
            .unwrap()
            .with_signer("0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80")
            .unwrap();
        assert_eq!(
            client.account().unwrap(),
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
                .parse::<Address>()
                .unwrap()
        );
    }

    #[tokio::test]
    #[ignore] // Requires a local node
    async fn test_read_latest_block() {
        let client = AlloyChainClient::new("http://127.0.0.1:8545", addresses()).unwrap();
        assert!(client.health_check().await.is_ok());
    }
}
