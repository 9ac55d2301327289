//! End-to-end create / buy / sell flows over the mock chain
//!
//! Covers pricing from the snapshot, fee recipient sourcing, conditional
//! token account creation and parameter validation ahead of any I/O.

#[cfg(test)]
mod trade_flow_tests {
    use solana_sdk::{
        compute_budget,
        pubkey::Pubkey,
        signature::{Keypair, Signer},
        transaction::Transaction,
    };
    use std::sync::Arc;

    use crate::addresses::{AddressDeriver, ProgramIds, PLATFORM_FEE_RECIPIENT};
    use crate::curve::SellLimit;
    use crate::errors::TradeError;
    use crate::metrics::metrics;
    use crate::test_utils::{sample_snapshot, MockChain, SAMPLE_FEE_RECIPIENT};
    use crate::trader::PumpTrader;
    use crate::tx_builder::{
        TokenMetadata, TradeKind, BUY_DISCRIMINATOR, CREATE_DISCRIMINATOR, SELL_DISCRIMINATOR,
    };

    fn setup() -> (Arc<MockChain>, PumpTrader, Keypair) {
        let ids = ProgramIds::default();
        let chain = Arc::new(MockChain::with_global(&AddressDeriver::new(ids), &sample_snapshot()));
        let trader = PumpTrader::new(chain.clone(), chain.clone(), chain.clone(), ids);
        (chain, trader, Keypair::new())
    }

    fn program_of(tx: &Transaction, idx: usize) -> Pubkey {
        let ix = &tx.message.instructions[idx];
        tx.message.account_keys[ix.program_id_index as usize]
    }

    fn account_of(tx: &Transaction, idx: usize, position: usize) -> Pubkey {
        let ix = &tx.message.instructions[idx];
        tx.message.account_keys[ix.accounts[position] as usize]
    }

    fn u64_at(data: &[u8], offset: usize) -> u64 {
        u64::from_le_bytes(data[offset..offset + 8].try_into().unwrap())
    }

    #[tokio::test]
    async fn test_buy_prices_from_snapshot() {
        let (chain, trader, payer) = setup();
        let mint = Pubkey::new_unique();

        let trade = trader.buy(&payer, &mint, 1.0, 0.00001, 0.05).await.unwrap();
        assert_eq!(trade.kind, TradeKind::Buy);
        assert_eq!(trade.slot, 1);
        assert_eq!(trade.units_consumed, Some(42_000));
        assert!(trade.created_token_account);

        let sent = chain.sent_transactions();
        assert_eq!(sent.len(), 1);
        let tx = &sent[0];
        assert_eq!(trade.signature, tx.signatures[0]);

        // Token account missing: create, buy, fee
        assert_eq!(tx.message.instructions.len(), 3);
        assert_eq!(program_of(tx, 0), spl_associated_token_account::ID);
        assert_eq!(program_of(tx, 1), crate::addresses::PUMP_PROGRAM_ID);
        assert_eq!(program_of(tx, 2), compute_budget::id());

        let data = &tx.message.instructions[1].data;
        assert_eq!(&data[..8], &BUY_DISCRIMINATOR);
        assert_eq!(u64_at(data, 8), 32_258_064_516);
        assert_eq!(u64_at(data, 16), 1_050_000_000);

        assert_eq!(account_of(tx, 1, 1), SAMPLE_FEE_RECIPIENT);
        assert_eq!(account_of(tx, 1, 2), mint);
        assert_eq!(account_of(tx, 1, 6), payer.pubkey());
    }

    #[tokio::test]
    async fn test_buy_is_deterministic_for_same_snapshot() {
        let (chain, trader, payer) = setup();
        let mint = Pubkey::new_unique();

        trader.buy(&payer, &mint, 0.25, 0.0, 0.01).await.unwrap();
        trader.buy(&payer, &mint, 0.25, 0.0, 0.01).await.unwrap();

        let sent = chain.sent_transactions();
        assert_eq!(sent.len(), 2);
        assert_eq!(
            sent[0].message.instructions[1].data,
            sent[1].message.instructions[1].data
        );
    }

    #[tokio::test]
    async fn test_each_operation_reads_fresh_snapshot() {
        let (chain, trader, payer) = setup();
        let global = trader.deriver().global().address;
        let mint = Pubkey::new_unique();

        trader.buy(&payer, &mint, 1.0, 0.0, 0.05).await.unwrap();

        let mut moved = sample_snapshot();
        moved.initial_virtual_sol_reserves = 60_000_000_000;
        chain.set_account(global, moved.to_bytes());
        trader.buy(&payer, &mint, 1.0, 0.0, 0.05).await.unwrap();

        let global_reads = chain
            .read_addresses()
            .into_iter()
            .filter(|a| *a == global)
            .count();
        assert_eq!(global_reads, 2);

        let sent = chain.sent_transactions();
        let first = u64_at(&sent[0].message.instructions[1].data, 8);
        let second = u64_at(&sent[1].message.instructions[1].data, 8);
        assert!(second < first, "pricier curve must yield fewer tokens");
    }

    #[tokio::test]
    async fn test_buy_skips_existing_token_account() {
        let (chain, trader, payer) = setup();
        let mint = Pubkey::new_unique();
        let ata = trader.deriver().associated_token(&mint, &payer.pubkey()).address;
        chain.set_account(ata, vec![0u8; 165]);

        let trade = trader.buy(&payer, &mint, 0.1, 0.0, 0.05).await.unwrap();
        assert!(!trade.created_token_account);

        let tx = &chain.sent_transactions()[0];
        assert_eq!(tx.message.instructions.len(), 2);
        assert_eq!(program_of(tx, 0), crate::addresses::PUMP_PROGRAM_ID);
        assert_eq!(program_of(tx, 1), compute_budget::id());
    }

    #[tokio::test]
    async fn test_zero_fee_recipient_falls_back_to_platform() {
        let (chain, trader, payer) = setup();
        let mut snapshot = sample_snapshot();
        snapshot.fee_recipient = Pubkey::default();
        chain.set_account(trader.deriver().global().address, snapshot.to_bytes());

        trader
            .buy(&payer, &Pubkey::new_unique(), 0.1, 0.0, 0.05)
            .await
            .unwrap();

        let tx = &chain.sent_transactions()[0];
        assert_eq!(account_of(tx, 1, 1), PLATFORM_FEE_RECIPIENT);
    }

    #[tokio::test]
    async fn test_create_and_buy() {
        let (chain, trader, payer) = setup();
        let mint = Keypair::new();
        let metadata = TokenMetadata::new("Moon Cat", "MCAT", "https://example.com/mcat.json");

        let trade = trader
            .create_and_buy(&payer, &mint, &metadata, 0.5, 0.0001, 0.1)
            .await
            .unwrap();
        assert_eq!(trade.kind, TradeKind::CreateAndBuy);
        assert!(trade.created_token_account);
        assert_eq!(chain.simulate_count(), 1);
        assert_eq!(chain.send_count(), 1);

        // New mint: only the global account is read
        assert_eq!(
            chain.read_addresses(),
            vec![trader.deriver().global().address]
        );

        let tx = &chain.sent_transactions()[0];
        assert_eq!(tx.signatures.len(), 2);
        assert_eq!(tx.message.account_keys[0], payer.pubkey());
        assert!(tx.message.account_keys[..2].contains(&mint.pubkey()));

        assert_eq!(tx.message.instructions.len(), 4);
        assert_eq!(&tx.message.instructions[0].data[..8], &CREATE_DISCRIMINATOR);
        assert_eq!(program_of(tx, 1), spl_associated_token_account::ID);
        assert_eq!(&tx.message.instructions[2].data[..8], &BUY_DISCRIMINATOR);
        assert_eq!(u64_at(&tx.message.instructions[2].data, 8), 16_393_442_622);
        assert_eq!(u64_at(&tx.message.instructions[2].data, 16), 550_000_000);
        assert_eq!(program_of(tx, 3), compute_budget::id());
    }

    #[tokio::test]
    async fn test_create_rejects_empty_metadata_before_submit() {
        let (chain, trader, payer) = setup();
        let metadata = TokenMetadata::new("", "MCAT", "https://example.com/mcat.json");

        let err = trader
            .create_and_buy(&payer, &Keypair::new(), &metadata, 0.5, 0.0, 0.1)
            .await
            .unwrap_err();
        assert!(matches!(err, TradeError::InvalidParameter(_)));
        assert_eq!(chain.simulate_count(), 0);
    }

    #[tokio::test]
    async fn test_sell_with_explicit_minimum() {
        let (chain, trader, payer) = setup();
        let mint = Pubkey::new_unique();
        let ata = trader.deriver().associated_token(&mint, &payer.pubkey()).address;
        chain.set_account(ata, vec![0u8; 165]);

        let trade = trader
            .sell(&payer, &mint, 5_000_000, SellLimit::MinSolOutput(123_456), 0.0)
            .await
            .unwrap();
        assert_eq!(trade.kind, TradeKind::Sell);

        let tx = &chain.sent_transactions()[0];
        assert_eq!(tx.message.instructions.len(), 2);
        let data = &tx.message.instructions[0].data;
        assert_eq!(&data[..8], &SELL_DISCRIMINATOR);
        assert_eq!(u64_at(data, 8), 5_000_000);
        assert_eq!(u64_at(data, 16), 123_456);
    }

    #[tokio::test]
    async fn test_sell_with_price_bound() {
        let (chain, trader, payer) = setup();

        trader
            .sell(
                &payer,
                &Pubkey::new_unique(),
                1_000_000,
                SellLimit::FromPrice {
                    sol_price_per_token: 0.002,
                    slippage: 0.1,
                },
                0.0,
            )
            .await
            .unwrap();

        // Token account missing: creation is prepended for sells too
        let tx = &chain.sent_transactions()[0];
        assert_eq!(tx.message.instructions.len(), 3);
        assert_eq!(u64_at(&tx.message.instructions[1].data, 16), 1_800_000);
    }

    #[tokio::test]
    async fn test_invalid_slippage_rejected_before_io() {
        let (chain, trader, payer) = setup();

        for slippage in [1.0, -0.1, f64::NAN] {
            let err = trader
                .buy(&payer, &Pubkey::new_unique(), 1.0, 0.0, slippage)
                .await
                .unwrap_err();
            assert!(matches!(err, TradeError::InvalidParameter(_)));
        }
        assert!(chain.read_addresses().is_empty());
    }

    #[tokio::test]
    async fn test_zero_buy_rejected() {
        let (chain, trader, payer) = setup();

        let err = trader
            .buy(&payer, &Pubkey::new_unique(), 0.0, 0.0, 0.05)
            .await
            .unwrap_err();
        assert!(matches!(err, TradeError::InvalidParameter(_)));
        assert_eq!(chain.simulate_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_global_account_aborts() {
        let chain = Arc::new(MockChain::new());
        let trader = PumpTrader::new(chain.clone(), chain.clone(), chain.clone(), ProgramIds::default());

        let err = trader
            .buy(&Keypair::new(), &Pubkey::new_unique(), 1.0, 0.0, 0.05)
            .await
            .unwrap_err();
        assert!(matches!(err, TradeError::AccountNotFound { .. }));
        assert!(!err.is_retryable());
        assert_eq!(chain.simulate_count(), 0);
    }

    #[tokio::test]
    async fn test_failures_before_simulation_are_counted() {
        let failures = |category: &str| metrics().failures.with_label_values(&[category]).get();
        let (not_found, decode) = (failures("account_not_found"), failures("decode"));

        let chain = Arc::new(MockChain::new());
        let trader = PumpTrader::new(chain.clone(), chain.clone(), chain.clone(), ProgramIds::default());
        let payer = Keypair::new();
        trader
            .buy(&payer, &Pubkey::new_unique(), 1.0, 0.0, 0.05)
            .await
            .unwrap_err();

        chain.set_account(trader.deriver().global().address, vec![1u8; 50]);
        trader
            .sell(&payer, &Pubkey::new_unique(), 10, SellLimit::MinSolOutput(1), 0.0)
            .await
            .unwrap_err();

        // Other tests share the registry, so only a lower bound holds
        assert!(failures("account_not_found") > not_found);
        assert!(failures("decode") > decode);
        assert_eq!(chain.simulate_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_trade_reports_no_token_account() {
        let (chain, trader, payer) = setup();
        chain.set_simulation_error("InstructionError(1, Custom(6002))", Vec::new());

        let err = trader
            .buy(&payer, &Pubkey::new_unique(), 0.1, 0.0, 0.05)
            .await
            .unwrap_err();
        assert!(matches!(err, TradeError::SimulationFailed { .. }));
        assert_eq!(chain.send_count(), 0);

        // Same trade once the node accepts it
        let chain = Arc::new(MockChain::with_global(trader.deriver(), &sample_snapshot()));
        let trader = PumpTrader::new(chain.clone(), chain.clone(), chain.clone(), ProgramIds::default());
        let trade = trader
            .buy(&payer, &Pubkey::new_unique(), 0.1, 0.0, 0.05)
            .await
            .unwrap();
        assert!(trade.created_token_account);
    }

    #[tokio::test]
    async fn test_malformed_global_account_is_decode_error() {
        let (chain, trader, payer) = setup();
        chain.set_account(trader.deriver().global().address, vec![1u8; 50]);

        let err = trader
            .buy(&payer, &Pubkey::new_unique(), 1.0, 0.0, 0.05)
            .await
            .unwrap_err();
        assert!(matches!(err, TradeError::Decode(_)));
    }

    #[tokio::test]
    async fn test_token_account_read_failure_is_rpc_error() {
        let (chain, trader, payer) = setup();
        // Snapshot read happens first and must fail the same way
        chain.fail_reads("connection reset by peer");

        let err = trader
            .sell(&payer, &Pubkey::new_unique(), 10, SellLimit::MinSolOutput(1), 0.0)
            .await
            .unwrap_err();
        assert!(matches!(err, TradeError::Rpc(_)));
        assert!(err.is_retryable());
        assert_eq!(chain.send_count(), 0);
    }
}
