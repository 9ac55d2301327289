//! Program-derived address computation
//!
//! Every address the launchpad instructions touch is a pure function of
//! program ids and seeds. Nothing here performs I/O or caches results; a
//! wrong derivation would route funds to an account nobody owns, so the
//! seeds below must match the on-chain program exactly.

use solana_sdk::{pubkey, pubkey::Pubkey};

/// Launchpad (bonding-curve) program
pub const PUMP_PROGRAM_ID: Pubkey = pubkey!("6EF8rrecthR5Dkzon8Nwu78hRvfCKubJ14M5uBEwF6P");

/// Metaplex token metadata program
pub const METADATA_PROGRAM_ID: Pubkey = pubkey!("metaqbxxUerdq28cj1RbAWkYQm3ybzjb6a8bt518x1s");

/// Platform fee recipient used when the global account does not name one
pub const PLATFORM_FEE_RECIPIENT: Pubkey = pubkey!("CebN5WGQ4jvEPvsVU4EoHEpgzq1VV7AbicfhtW4xC9iM");

pub const GLOBAL_SEED: &[u8] = b"global";
pub const BONDING_CURVE_SEED: &[u8] = b"bonding-curve";
pub const MINT_AUTHORITY_SEED: &[u8] = b"mint-authority";
pub const EVENT_AUTHORITY_SEED: &[u8] = b"__event_authority";
pub const METADATA_SEED: &[u8] = b"metadata";

/// Program ids the deriver works under, injected from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramIds {
    pub trading_program: Pubkey,
    pub metadata_program: Pubkey,
    pub platform_fee_recipient: Pubkey,
    pub token_program: Pubkey,
    pub associated_token_program: Pubkey,
}

impl Default for ProgramIds {
    fn default() -> Self {
        Self {
            trading_program: PUMP_PROGRAM_ID,
            metadata_program: METADATA_PROGRAM_ID,
            platform_fee_recipient: PLATFORM_FEE_RECIPIENT,
            token_program: spl_token::ID,
            associated_token_program: spl_associated_token_account::ID,
        }
    }
}

/// A program-owned address together with its bump seed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DerivedAddress {
    pub address: Pubkey,
    pub bump: u8,
}

impl DerivedAddress {
    fn find(seeds: &[&[u8]], program_id: &Pubkey) -> Self {
        let (address, bump) = Pubkey::find_program_address(seeds, program_id);
        Self { address, bump }
    }
}

/// Stateless deriver bound to a set of program ids
#[derive(Debug, Clone, Copy, Default)]
pub struct AddressDeriver {
    ids: ProgramIds,
}

impl AddressDeriver {
    pub fn new(ids: ProgramIds) -> Self {
        Self { ids }
    }

    pub fn program_ids(&self) -> &ProgramIds {
        &self.ids
    }

    /// Global reserve account: `["global"]`
    pub fn global(&self) -> DerivedAddress {
        DerivedAddress::find(&[GLOBAL_SEED], &self.ids.trading_program)
    }

    /// Per-mint curve account: `["bonding-curve", mint]`
    pub fn bonding_curve(&self, mint: &Pubkey) -> DerivedAddress {
        DerivedAddress::find(&[BONDING_CURVE_SEED, mint.as_ref()], &self.ids.trading_program)
    }

    /// Token account of `owner` for `mint` under the token program
    ///
    /// `owner` is either the bonding curve (program-held reserve) or the
    /// trading user.
    pub fn associated_token(&self, mint: &Pubkey, owner: &Pubkey) -> DerivedAddress {
        DerivedAddress::find(
            &[
                owner.as_ref(),
                self.ids.token_program.as_ref(),
                mint.as_ref(),
            ],
            &self.ids.associated_token_program,
        )
    }

    /// Reserve token account held by the curve for `mint`
    pub fn associated_bonding_curve(&self, mint: &Pubkey) -> DerivedAddress {
        let curve = self.bonding_curve(mint);
        self.associated_token(mint, &curve.address)
    }

    /// Metaplex metadata account: `["metadata", metadata_program, mint]`
    pub fn metadata(&self, mint: &Pubkey) -> DerivedAddress {
        DerivedAddress::find(
            &[
                METADATA_SEED,
                self.ids.metadata_program.as_ref(),
                mint.as_ref(),
            ],
            &self.ids.metadata_program,
        )
    }

    pub fn mint_authority(&self) -> DerivedAddress {
        DerivedAddress::find(&[MINT_AUTHORITY_SEED], &self.ids.trading_program)
    }

    /// Anchor event CPI authority
    pub fn event_authority(&self) -> DerivedAddress {
        DerivedAddress::find(&[EVENT_AUTHORITY_SEED], &self.ids.trading_program)
    }
}
