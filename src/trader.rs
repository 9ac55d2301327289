//! Create-and-buy, buy and sell
//!
//! Each operation reads a fresh reserve snapshot, prices the trade,
//! assembles the instructions, attaches the priority fee and hands the
//! result to [`TxPipeline`]. Nothing is cached between calls.

use solana_sdk::{
    commitment_config::CommitmentConfig,
    pubkey::Pubkey,
    signature::{Keypair, Signer},
};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::addresses::{AddressDeriver, ProgramIds};
use crate::chain::{ChainReader, RpcChainClient, TransactionSimulator, TransactionSubmitter};
use crate::config::Config;
use crate::curve::{
    fetch_reserve_snapshot, quote_buy, quote_sell, sol_to_lamports, SellLimit, Slippage,
};
use crate::errors::TradeError;
use crate::metrics::metrics;
use crate::tx_builder::{
    BuiltTransaction, ConfirmedTrade, InstructionBuilder, TokenMetadata, TradeKind, TxPipeline,
};

/// Commitment levels for the reads an operation performs
#[derive(Debug, Clone, Copy)]
pub struct TradeSettings {
    /// Global reserve account
    pub snapshot_commitment: CommitmentConfig,
    /// User token account existence check
    pub account_commitment: CommitmentConfig,
}

impl Default for TradeSettings {
    fn default() -> Self {
        Self {
            snapshot_commitment: CommitmentConfig::finalized(),
            account_commitment: CommitmentConfig::confirmed(),
        }
    }
}

/// Trading client over injected chain collaborators
#[derive(Clone)]
pub struct PumpTrader {
    reader: Arc<dyn ChainReader>,
    pipeline: TxPipeline,
    instructions: InstructionBuilder,
    settings: TradeSettings,
}

impl PumpTrader {
    pub fn new(
        reader: Arc<dyn ChainReader>,
        simulator: Arc<dyn TransactionSimulator>,
        submitter: Arc<dyn TransactionSubmitter>,
        ids: ProgramIds,
    ) -> Self {
        let deriver = AddressDeriver::new(ids);
        Self {
            pipeline: TxPipeline::new(reader.clone(), simulator, submitter, deriver),
            reader,
            instructions: InstructionBuilder::new(deriver),
            settings: TradeSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: TradeSettings) -> Self {
        self.settings = settings;
        self
    }

    /// All collaborators over one RPC client
    pub fn from_rpc(client: Arc<RpcChainClient>, ids: ProgramIds) -> Self {
        Self::new(client.clone(), client.clone(), client, ids)
    }

    /// Default program ids, `confirmed` commitment
    pub fn connect(rpc_endpoint: &str) -> Self {
        let client = RpcChainClient::new(rpc_endpoint, CommitmentConfig::confirmed());
        Self::from_rpc(Arc::new(client), ProgramIds::default())
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let ids = config.programs.program_ids()?;
        let snapshot_commitment = config.trading.snapshot_commitment_config();
        let client = Arc::new(RpcChainClient::from_config(&config.rpc));

        Ok(Self::from_rpc(client, ids).with_settings(TradeSettings {
            snapshot_commitment,
            account_commitment: config.rpc.commitment_config(),
        }))
    }

    pub fn deriver(&self) -> &AddressDeriver {
        self.instructions.deriver()
    }

    pub fn pipeline(&self) -> &TxPipeline {
        &self.pipeline
    }

    fn platform_fee_recipient(&self) -> Pubkey {
        self.deriver().program_ids().platform_fee_recipient
    }

    /// Launch a new token and buy into it in one transaction
    ///
    /// Both `payer` and `mint` sign.
    #[tracing::instrument(skip_all, fields(mint = %mint.pubkey(), symbol = %metadata.symbol))]
    pub async fn create_and_buy(
        &self,
        payer: &Keypair,
        mint: &Keypair,
        metadata: &TokenMetadata,
        buy_amount_sol: f64,
        priority_fee_sol: f64,
        slippage: f64,
    ) -> Result<ConfirmedTrade, TradeError> {
        let prepared = self
            .prepare_create_and_buy(
                &payer.pubkey(),
                &mint.pubkey(),
                metadata,
                buy_amount_sol,
                priority_fee_sol,
                slippage,
            )
            .await;

        let trade = self.run(TradeKind::CreateAndBuy, prepared, &[payer, mint]).await?;
        info!(signature = %trade.signature, slot = trade.slot, "Token created and bought");
        Ok(trade)
    }

    /// Buy `buy_amount_sol` worth of an existing token
    #[tracing::instrument(skip_all, fields(mint = %mint))]
    pub async fn buy(
        &self,
        payer: &Keypair,
        mint: &Pubkey,
        buy_amount_sol: f64,
        priority_fee_sol: f64,
        slippage: f64,
    ) -> Result<ConfirmedTrade, TradeError> {
        let prepared = self
            .prepare_buy(&payer.pubkey(), mint, buy_amount_sol, priority_fee_sol, slippage)
            .await;

        let trade = self.run(TradeKind::Buy, prepared, &[payer]).await?;
        info!(signature = %trade.signature, slot = trade.slot, "Buy confirmed");
        Ok(trade)
    }

    /// Sell `sell_amount_tokens` base units
    ///
    /// The snapshot is read for its fee recipient; proceeds are bounded by
    /// `limit`, not by the curve.
    #[tracing::instrument(skip_all, fields(mint = %mint, amount = sell_amount_tokens))]
    pub async fn sell(
        &self,
        payer: &Keypair,
        mint: &Pubkey,
        sell_amount_tokens: u64,
        limit: SellLimit,
        priority_fee_sol: f64,
    ) -> Result<ConfirmedTrade, TradeError> {
        let prepared = self
            .prepare_sell(&payer.pubkey(), mint, sell_amount_tokens, limit, priority_fee_sol)
            .await;

        let trade = self.run(TradeKind::Sell, prepared, &[payer]).await?;
        info!(signature = %trade.signature, slot = trade.slot, "Sell confirmed");
        Ok(trade)
    }

    /// Hand a prepared transaction to the pipeline
    ///
    /// Failures before the pipeline are recorded here; the pipeline records
    /// its own.
    async fn run(
        &self,
        kind: TradeKind,
        prepared: Result<PreparedTrade, TradeError>,
        signers: &[&Keypair],
    ) -> Result<ConfirmedTrade, TradeError> {
        let prepared = match prepared {
            Ok(prepared) => prepared,
            Err(e) => {
                metrics().record_failure(&e);
                warn!(%kind, category = e.category(), error = %e, "Trade rejected before simulation");
                return Err(e);
            }
        };

        let mut trade = self.pipeline.execute(prepared.built, signers).await?;
        trade.created_token_account = prepared.creates_token_account;
        if trade.created_token_account {
            metrics().token_accounts_created.inc();
        }
        Ok(trade)
    }

    async fn prepare_create_and_buy(
        &self,
        payer: &Pubkey,
        mint: &Pubkey,
        metadata: &TokenMetadata,
        buy_amount_sol: f64,
        priority_fee_sol: f64,
        slippage: f64,
    ) -> Result<PreparedTrade, TradeError> {
        let slippage = Slippage::new(slippage)?;
        let sol_in = sol_to_lamports(buy_amount_sol)?;

        let snapshot = fetch_reserve_snapshot(
            self.reader.as_ref(),
            self.deriver(),
            self.settings.snapshot_commitment,
        )
        .await?;
        let quote = quote_buy(&snapshot, sol_in, slippage)?;
        let fee_recipient = snapshot.effective_fee_recipient(&self.platform_fee_recipient());
        debug!(tokens = quote.amount, max_sol_cost = quote.limit, %fee_recipient, "Priced initial buy");

        let mut ixs = self.instructions.build_create(mint, payer, metadata)?;
        ixs.extend(
            self.instructions
                .build_buy_after_create(mint, payer, &fee_recipient, &quote)?,
        );

        let built = BuiltTransaction::new(TradeKind::CreateAndBuy, *payer, ixs)
            .with_signer(*mint)
            .with_priority_fee(priority_fee_sol)?;
        Ok(PreparedTrade {
            built,
            creates_token_account: true,
        })
    }

    async fn prepare_buy(
        &self,
        payer: &Pubkey,
        mint: &Pubkey,
        buy_amount_sol: f64,
        priority_fee_sol: f64,
        slippage: f64,
    ) -> Result<PreparedTrade, TradeError> {
        let slippage = Slippage::new(slippage)?;
        let sol_in = sol_to_lamports(buy_amount_sol)?;

        let snapshot = fetch_reserve_snapshot(
            self.reader.as_ref(),
            self.deriver(),
            self.settings.snapshot_commitment,
        )
        .await?;
        let quote = quote_buy(&snapshot, sol_in, slippage)?;
        let fee_recipient = snapshot.effective_fee_recipient(&self.platform_fee_recipient());
        debug!(tokens = quote.amount, max_sol_cost = quote.limit, %fee_recipient, "Priced buy");

        let ixs = self
            .instructions
            .build_buy(
                self.reader.as_ref(),
                mint,
                payer,
                &fee_recipient,
                &quote,
                self.settings.account_commitment,
            )
            .await?;
        let creates_token_account = ixs.len() > 1;

        let built = BuiltTransaction::new(TradeKind::Buy, *payer, ixs)
            .with_priority_fee(priority_fee_sol)?;
        Ok(PreparedTrade {
            built,
            creates_token_account,
        })
    }

    async fn prepare_sell(
        &self,
        payer: &Pubkey,
        mint: &Pubkey,
        sell_amount_tokens: u64,
        limit: SellLimit,
        priority_fee_sol: f64,
    ) -> Result<PreparedTrade, TradeError> {
        let quote = quote_sell(sell_amount_tokens, limit)?;

        let snapshot = fetch_reserve_snapshot(
            self.reader.as_ref(),
            self.deriver(),
            self.settings.snapshot_commitment,
        )
        .await?;
        let fee_recipient = snapshot.effective_fee_recipient(&self.platform_fee_recipient());
        debug!(min_sol_output = quote.limit, %fee_recipient, "Priced sell");

        let ixs = self
            .instructions
            .build_sell(
                self.reader.as_ref(),
                mint,
                payer,
                &fee_recipient,
                &quote,
                self.settings.account_commitment,
            )
            .await?;
        let creates_token_account = ixs.len() > 1;

        let built = BuiltTransaction::new(TradeKind::Sell, *payer, ixs)
            .with_priority_fee(priority_fee_sol)?;
        Ok(PreparedTrade {
            built,
            creates_token_account,
        })
    }
}

/// A priced, ordered transaction ready for the pipeline
struct PreparedTrade {
    built: BuiltTransaction,
    creates_token_account: bool,
}

/// [`PumpTrader::create_and_buy`] against `rpc_endpoint` with default program ids
#[allow(clippy::too_many_arguments)]
pub async fn create_and_buy(
    payer: &Keypair,
    mint: &Keypair,
    name: &str,
    symbol: &str,
    uri: &str,
    buy_amount_sol: f64,
    priority_fee_sol: f64,
    slippage: f64,
    rpc_endpoint: &str,
) -> Result<ConfirmedTrade, TradeError> {
    let metadata = TokenMetadata::new(name, symbol, uri);
    PumpTrader::connect(rpc_endpoint)
        .create_and_buy(payer, mint, &metadata, buy_amount_sol, priority_fee_sol, slippage)
        .await
}

/// [`PumpTrader::buy`] against `rpc_endpoint` with default program ids
pub async fn buy(
    payer: &Keypair,
    mint: &Pubkey,
    buy_amount_sol: f64,
    priority_fee_sol: f64,
    slippage: f64,
    rpc_endpoint: &str,
) -> Result<ConfirmedTrade, TradeError> {
    PumpTrader::connect(rpc_endpoint)
        .buy(payer, mint, buy_amount_sol, priority_fee_sol, slippage)
        .await
}

/// [`PumpTrader::sell`] against `rpc_endpoint` with default program ids
pub async fn sell(
    payer: &Keypair,
    mint: &Pubkey,
    sell_amount_tokens: u64,
    limit: SellLimit,
    priority_fee_sol: f64,
    rpc_endpoint: &str,
) -> Result<ConfirmedTrade, TradeError> {
    PumpTrader::connect(rpc_endpoint)
        .sell(payer, mint, sell_amount_tokens, limit, priority_fee_sol)
        .await
}
