//! Global reserve account decoding
//!
//! Layout (little-endian, Anchor account):
//!
//! | offset | size | field                          |
//! |--------|------|--------------------------------|
//! | 0      | 8    | discriminator                  |
//! | 8      | 1    | initialized                    |
//! | 9      | 32   | authority                      |
//! | 41     | 32   | fee_recipient                  |
//! | 73     | 8    | initial_virtual_token_reserves |
//! | 81     | 8    | initial_virtual_sol_reserves   |
//! | 89     | 8    | initial_real_token_reserves    |
//! | 97     | 8    | token_total_supply             |
//! | 105    | 8    | fee_basis_points               |
//!
//! The live account has grown trailing fields since this layout was fixed;
//! bytes past offset 113 are ignored.

use borsh::BorshDeserialize;
use sha2::{Digest, Sha256};
use solana_sdk::{commitment_config::CommitmentConfig, pubkey::Pubkey};
use thiserror::Error;
use tracing::debug;

use crate::addresses::AddressDeriver;
use crate::chain::{AccountRead, ChainReader};
use crate::curve::pricer::quote_tokens_out;
use crate::errors::TradeError;

/// Bytes consumed by [`ReserveSnapshot::decode`]
pub const RESERVE_SNAPSHOT_LEN: usize = 8 + 1 + 32 + 32 + 8 * 5;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("Invalid length: expected at least {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Discriminator mismatch: expected {expected:?}, got {actual:?}")]
    DiscriminatorMismatch { expected: [u8; 8], actual: [u8; 8] },

    #[error("Malformed account data: {0}")]
    Malformed(String),

    #[error("Virtual token reserves {virtual_token_reserves} below real token reserves {real_token_reserves}")]
    ReserveInvariant {
        virtual_token_reserves: u64,
        real_token_reserves: u64,
    },
}

/// First 8 bytes of `sha256("<namespace>:<name>")`, the Anchor discriminator
pub fn anchor_discriminator(namespace: &str, name: &str) -> [u8; 8] {
    let digest = Sha256::digest(format!("{}:{}", namespace, name).as_bytes());
    let mut out = [0u8; 8];
    out.copy_from_slice(&digest[..8]);
    out
}

/// Discriminator of the launchpad's `Global` account
pub fn global_account_discriminator() -> [u8; 8] {
    anchor_discriminator("account", "Global")
}

#[derive(BorshDeserialize)]
struct GlobalLayout {
    discriminator: [u8; 8],
    initialized: bool,
    authority: [u8; 32],
    fee_recipient: [u8; 32],
    initial_virtual_token_reserves: u64,
    initial_virtual_sol_reserves: u64,
    initial_real_token_reserves: u64,
    token_total_supply: u64,
    fee_basis_points: u64,
}

/// Curve parameters read from the global account
///
/// Fetched fresh for every operation; reserves move between attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReserveSnapshot {
    pub discriminator: [u8; 8],
    pub initialized: bool,
    pub authority: Pubkey,
    pub fee_recipient: Pubkey,
    pub initial_virtual_token_reserves: u64,
    pub initial_virtual_sol_reserves: u64,
    pub initial_real_token_reserves: u64,
    pub token_total_supply: u64,
    pub fee_basis_points: u64,
}

impl ReserveSnapshot {
    /// Decode the fixed layout; no value is produced unless every check passes
    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        if data.len() < RESERVE_SNAPSHOT_LEN {
            return Err(DecodeError::InvalidLength {
                expected: RESERVE_SNAPSHOT_LEN,
                actual: data.len(),
            });
        }
        if data.len() > RESERVE_SNAPSHOT_LEN {
            debug!(
                len = data.len(),
                ignored = data.len() - RESERVE_SNAPSHOT_LEN,
                "Ignoring trailing global account bytes"
            );
        }

        let mut slice = &data[..RESERVE_SNAPSHOT_LEN];
        let layout = GlobalLayout::deserialize(&mut slice)
            .map_err(|e| DecodeError::Malformed(e.to_string()))?;

        let expected = global_account_discriminator();
        if layout.discriminator != expected {
            return Err(DecodeError::DiscriminatorMismatch {
                expected,
                actual: layout.discriminator,
            });
        }

        if layout.initial_virtual_token_reserves < layout.initial_real_token_reserves {
            return Err(DecodeError::ReserveInvariant {
                virtual_token_reserves: layout.initial_virtual_token_reserves,
                real_token_reserves: layout.initial_real_token_reserves,
            });
        }

        Ok(Self {
            discriminator: layout.discriminator,
            initialized: layout.initialized,
            authority: Pubkey::new_from_array(layout.authority),
            fee_recipient: Pubkey::new_from_array(layout.fee_recipient),
            initial_virtual_token_reserves: layout.initial_virtual_token_reserves,
            initial_virtual_sol_reserves: layout.initial_virtual_sol_reserves,
            initial_real_token_reserves: layout.initial_real_token_reserves,
            token_total_supply: layout.token_total_supply,
            fee_basis_points: layout.fee_basis_points,
        })
    }

    /// Tokens received for `sol_in` lamports on a fresh curve
    pub fn initial_buy_quote(&self, sol_in: u64) -> u64 {
        quote_tokens_out(
            self.initial_virtual_token_reserves,
            self.initial_virtual_sol_reserves,
            self.initial_real_token_reserves,
            sol_in,
        )
    }

    /// Fee recipient for trade instructions
    ///
    /// Falls back to the platform constant when the account carries the
    /// all-zero address.
    pub fn effective_fee_recipient(&self, platform_fee_recipient: &Pubkey) -> Pubkey {
        if self.fee_recipient == Pubkey::default() {
            *platform_fee_recipient
        } else {
            self.fee_recipient
        }
    }

    /// Serialize back into the fixed layout (fixtures and tooling)
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(RESERVE_SNAPSHOT_LEN);
        out.extend_from_slice(&self.discriminator);
        out.push(self.initialized as u8);
        out.extend_from_slice(self.authority.as_ref());
        out.extend_from_slice(self.fee_recipient.as_ref());
        out.extend_from_slice(&self.initial_virtual_token_reserves.to_le_bytes());
        out.extend_from_slice(&self.initial_virtual_sol_reserves.to_le_bytes());
        out.extend_from_slice(&self.initial_real_token_reserves.to_le_bytes());
        out.extend_from_slice(&self.token_total_supply.to_le_bytes());
        out.extend_from_slice(&self.fee_basis_points.to_le_bytes());
        out
    }
}

/// Read and decode the global account
///
/// A missing account is `AccountNotFound`, not a decode failure: the
/// program is not where the configuration says it is, and retrying will
/// not change that.
pub async fn fetch_reserve_snapshot(
    reader: &dyn ChainReader,
    deriver: &AddressDeriver,
    commitment: CommitmentConfig,
) -> Result<ReserveSnapshot, TradeError> {
    let global = deriver.global().address;

    match reader.get_account_data(&global, commitment).await? {
        AccountRead::Found(data) => {
            let snapshot = ReserveSnapshot::decode(&data)?;
            debug!(
                %global,
                virtual_token_reserves = snapshot.initial_virtual_token_reserves,
                virtual_sol_reserves = snapshot.initial_virtual_sol_reserves,
                real_token_reserves = snapshot.initial_real_token_reserves,
                fee_basis_points = snapshot.fee_basis_points,
                "Fetched reserve snapshot"
            );
            Ok(snapshot)
        }
        AccountRead::NotFound => Err(TradeError::AccountNotFound { address: global }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{sample_snapshot, MockChain};

    #[test]
    fn test_layout_length() {
        assert_eq!(RESERVE_SNAPSHOT_LEN, 113);
    }

    #[test]
    fn test_decode_valid_buffer() {
        let snapshot = sample_snapshot();
        let decoded = ReserveSnapshot::decode(&snapshot.to_bytes()).unwrap();

        assert_eq!(decoded, snapshot);
        assert_eq!(decoded.initial_virtual_token_reserves, 1_000_000_000_000);
        assert_eq!(decoded.initial_virtual_sol_reserves, 30_000_000_000);
        assert_eq!(decoded.initial_real_token_reserves, 800_000_000_000);
    }

    #[test]
    fn test_decode_accepts_trailing_bytes() {
        let snapshot = sample_snapshot();
        let mut bytes = snapshot.to_bytes();
        bytes.extend_from_slice(&[0xAB; 64]);

        assert_eq!(ReserveSnapshot::decode(&bytes).unwrap(), snapshot);
    }

    #[test]
    fn test_decode_short_buffer() {
        let bytes = sample_snapshot().to_bytes();

        for len in [0, 8, 9, 112] {
            let err = ReserveSnapshot::decode(&bytes[..len]).unwrap_err();
            assert_eq!(
                err,
                DecodeError::InvalidLength {
                    expected: 113,
                    actual: len
                }
            );
        }
    }

    #[test]
    fn test_decode_wrong_discriminator() {
        let mut bytes = sample_snapshot().to_bytes();
        bytes[0] ^= 0xFF;

        assert!(matches!(
            ReserveSnapshot::decode(&bytes),
            Err(DecodeError::DiscriminatorMismatch { .. })
        ));
    }

    #[test]
    fn test_decode_invalid_bool() {
        let mut bytes = sample_snapshot().to_bytes();
        bytes[8] = 2;

        assert!(matches!(
            ReserveSnapshot::decode(&bytes),
            Err(DecodeError::Malformed(_))
        ));
    }

    #[test]
    fn test_decode_reserve_invariant() {
        let mut snapshot = sample_snapshot();
        snapshot.initial_real_token_reserves = snapshot.initial_virtual_token_reserves + 1;

        assert!(matches!(
            ReserveSnapshot::decode(&snapshot.to_bytes()),
            Err(DecodeError::ReserveInvariant { .. })
        ));
    }

    #[test]
    fn test_effective_fee_recipient() {
        let platform = Pubkey::new_unique();
        let mut snapshot = sample_snapshot();
        assert_eq!(
            snapshot.effective_fee_recipient(&platform),
            snapshot.fee_recipient
        );

        snapshot.fee_recipient = Pubkey::default();
        assert_eq!(snapshot.effective_fee_recipient(&platform), platform);
    }

    #[tokio::test]
    async fn test_fetch_missing_global_account() {
        let chain = MockChain::new();
        let deriver = AddressDeriver::default();

        let err = fetch_reserve_snapshot(&chain, &deriver, CommitmentConfig::finalized())
            .await
            .unwrap_err();
        match err {
            TradeError::AccountNotFound { address } => {
                assert_eq!(address, deriver.global().address)
            }
            other => panic!("Expected AccountNotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_malformed_global_account() {
        let chain = MockChain::new();
        let deriver = AddressDeriver::default();
        chain.set_account(deriver.global().address, vec![0u8; 40]);

        let err = fetch_reserve_snapshot(&chain, &deriver, CommitmentConfig::finalized())
            .await
            .unwrap_err();
        assert!(matches!(err, TradeError::Decode(DecodeError::InvalidLength { .. })));
    }

    #[tokio::test]
    async fn test_fetch_read_error_propagates() {
        let chain = MockChain::new();
        chain.fail_reads("connection reset");

        let err = fetch_reserve_snapshot(
            &chain,
            &AddressDeriver::default(),
            CommitmentConfig::finalized(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, TradeError::Rpc(_)));
    }
}
