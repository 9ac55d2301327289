//! Bonding curve pricing and slippage bounds
//!
//! All arithmetic is integer. Decimal inputs (SOL amounts, slippage, prices)
//! are converted once into fixed-point integers so every bound is
//! reproducible bit for bit.

use solana_sdk::native_token::LAMPORTS_PER_SOL;

use crate::curve::snapshot::ReserveSnapshot;
use crate::errors::TradeError;

/// Launchpad tokens use 6 decimals
pub const TOKEN_DECIMALS: u32 = 6;
pub const TOKEN_UNIT: u64 = 10u64.pow(TOKEN_DECIMALS);

/// Fixed-point scale for slippage fractions
const FRACTION_SCALE: u128 = 1_000_000_000;

/// Prices in SOL per whole token are scaled by 1e18 (nano-lamport precision);
/// launchpad prices sit around 1e-8 SOL, far below one lamport
const PRICE_SCALE: f64 = 1e18;

/// `10^6 token units * 1e9 (price scale over lamports) * fraction scale`
const MIN_OUTPUT_DENOMINATOR: u128 = TOKEN_UNIT as u128 * 1_000_000_000 * FRACTION_SCALE;

/// Tokens out for `sol_in` lamports under the constant-product invariant
///
/// `a <= 1` returns the minimal unit `1`. Otherwise
/// `Tv - ((Tv * Sv) / (Sv + a) + 1)` with floor division, clamped to the
/// real reserves. The `+ 1` matches the program's rounding.
pub fn quote_tokens_out(
    virtual_token_reserves: u64,
    virtual_sol_reserves: u64,
    real_token_reserves: u64,
    sol_in: u64,
) -> u64 {
    if sol_in <= 1 {
        return 1;
    }

    let tv = virtual_token_reserves as u128;
    let sv = virtual_sol_reserves as u128;
    let remaining = (tv * sv) / (sv + sol_in as u128) + 1;
    let out = tv.saturating_sub(remaining);

    out.min(real_token_reserves as u128) as u64
}

/// Validated slippage fraction in `[0, 1)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Slippage(f64);

impl Slippage {
    pub fn new(decimal: f64) -> Result<Self, TradeError> {
        if !decimal.is_finite() || !(0.0..1.0).contains(&decimal) {
            return Err(TradeError::invalid_parameter(format!(
                "slippage must be in [0, 1), got {}",
                decimal
            )));
        }
        Ok(Self(decimal))
    }

    pub fn decimal(&self) -> f64 {
        self.0
    }

    fn scaled(&self) -> u128 {
        ((self.0 * FRACTION_SCALE as f64).round() as u128).min(FRACTION_SCALE)
    }
}

/// Convert a SOL amount to lamports (nearest lamport)
pub fn sol_to_lamports(sol: f64) -> Result<u64, TradeError> {
    if !sol.is_finite() || sol < 0.0 {
        return Err(TradeError::invalid_parameter(format!(
            "SOL amount must be a non-negative number, got {}",
            sol
        )));
    }
    let lamports = (sol * LAMPORTS_PER_SOL as f64).round();
    if lamports > u64::MAX as f64 {
        return Err(TradeError::invalid_parameter(format!(
            "SOL amount {} overflows lamports",
            sol
        )));
    }
    Ok(lamports as u64)
}

/// Maximum acceptable cost of a buy: `floor(lamports * (1 + slippage))`
pub fn max_sol_cost(lamports: u64, slippage: Slippage) -> u64 {
    let bound = lamports as u128 * (FRACTION_SCALE + slippage.scaled()) / FRACTION_SCALE;
    bound.min(u64::MAX as u128) as u64
}

/// Minimum acceptable proceeds of a sell
///
/// `floor(token_amount / 10^6 * price * 1e9 * (1 - slippage))` where
/// `price` is SOL per whole token.
pub fn min_sol_output(
    token_amount: u64,
    sol_price_per_token: f64,
    slippage: Slippage,
) -> Result<u64, TradeError> {
    if !sol_price_per_token.is_finite() || sol_price_per_token < 0.0 {
        return Err(TradeError::invalid_parameter(format!(
            "price must be a non-negative number, got {}",
            sol_price_per_token
        )));
    }

    let price = (sol_price_per_token * PRICE_SCALE).round() as u128;
    let keep = FRACTION_SCALE - slippage.scaled();
    let numerator = (token_amount as u128)
        .checked_mul(price)
        .and_then(|v| v.checked_mul(keep))
        .ok_or_else(|| {
            TradeError::invalid_parameter(format!(
                "sell bound overflows for amount {} at price {}",
                token_amount, sol_price_per_token
            ))
        })?;

    let bound = numerator / MIN_OUTPUT_DENOMINATOR;
    u64::try_from(bound).map_err(|_| {
        TradeError::invalid_parameter(format!("sell bound {} exceeds u64 lamports", bound))
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeSide {
    Buy,
    Sell,
}

/// Amount to trade and its slippage-adjusted bound
///
/// Buy: `amount` tokens to receive, `limit` maximum lamport cost.
/// Sell: `amount` tokens to sell, `limit` minimum lamport proceeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradeQuote {
    pub side: TradeSide,
    pub amount: u64,
    pub limit: u64,
}

/// How the caller bounds the proceeds of a sell
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SellLimit {
    /// Explicit floor in lamports
    MinSolOutput(u64),
    /// Floor derived from a caller-observed price (SOL per whole token)
    FromPrice {
        sol_price_per_token: f64,
        slippage: f64,
    },
}

/// Quote a buy of `sol_in` lamports against the snapshot's curve
pub fn quote_buy(
    snapshot: &ReserveSnapshot,
    sol_in: u64,
    slippage: Slippage,
) -> Result<TradeQuote, TradeError> {
    if sol_in == 0 {
        return Err(TradeError::invalid_parameter("buy amount must be > 0"));
    }

    Ok(TradeQuote {
        side: TradeSide::Buy,
        amount: snapshot.initial_buy_quote(sol_in),
        limit: max_sol_cost(sol_in, slippage),
    })
}

/// Quote a sell of `token_amount` base units
pub fn quote_sell(token_amount: u64, limit: SellLimit) -> Result<TradeQuote, TradeError> {
    if token_amount == 0 {
        return Err(TradeError::invalid_parameter("sell amount must be > 0"));
    }

    let limit = match limit {
        SellLimit::MinSolOutput(lamports) => lamports,
        SellLimit::FromPrice {
            sol_price_per_token,
            slippage,
        } => min_sol_output(token_amount, sol_price_per_token, Slippage::new(slippage)?)?,
    };

    Ok(TradeQuote {
        side: TradeSide::Sell,
        amount: token_amount,
        limit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::sample_snapshot;
    use proptest::prelude::*;

    const TV: u64 = 1_000_000_000_000;
    const SV: u64 = 30_000_000_000;
    const TR: u64 = 800_000_000_000;

    #[test]
    fn test_degenerate_input_returns_one() {
        assert_eq!(quote_tokens_out(TV, SV, TR, 0), 1);
        assert_eq!(quote_tokens_out(TV, SV, TR, 1), 1);
        assert_eq!(quote_tokens_out(0, 0, 0, 1), 1);
    }

    #[test]
    fn test_quote_one_sol() {
        // 1e12 * 3e10 / 3.1e10 = 967_741_935_483.87 -> 967_741_935_483 + 1
        let out = quote_tokens_out(TV, SV, TR, 1_000_000_000);
        assert_eq!(out, 1_000_000_000_000 - 967_741_935_484);
        assert_eq!(out, 32_258_064_516);
    }

    #[test]
    fn test_quote_is_reproducible() {
        let first = quote_tokens_out(TV, SV, TR, 1_000_000_000);
        for _ in 0..10 {
            assert_eq!(quote_tokens_out(TV, SV, TR, 1_000_000_000), first);
        }
    }

    #[test]
    fn test_quote_clamped_to_real_reserves() {
        // Enough SOL to drain nearly all virtual tokens
        let out = quote_tokens_out(TV, SV, TR, u64::MAX);
        assert_eq!(out, TR);
    }

    #[test]
    fn test_quote_does_not_overflow_on_large_reserves() {
        let out = quote_tokens_out(u64::MAX, u64::MAX, u64::MAX, u64::MAX);
        assert_eq!(out, u64::MAX - u64::MAX / 2 - 1);
    }

    #[test]
    fn test_max_sol_cost() {
        let slippage = Slippage::new(0.05).unwrap();
        assert_eq!(max_sol_cost(1_000_000_000, slippage), 1_050_000_000);

        let zero = Slippage::new(0.0).unwrap();
        assert_eq!(max_sol_cost(123_456_789, zero), 123_456_789);

        // Floor, not round
        let third = Slippage::new(0.333_333_333).unwrap();
        assert_eq!(max_sol_cost(10, third), 13);
    }

    #[test]
    fn test_min_sol_output() {
        let slippage = Slippage::new(0.1).unwrap();
        assert_eq!(min_sol_output(1_000_000, 0.002, slippage).unwrap(), 1_800_000);

        // Sub-lamport prices keep their precision
        let zero = Slippage::new(0.0).unwrap();
        assert_eq!(
            min_sol_output(35_000_000_000_000, 0.000_000_028, zero).unwrap(),
            980_000_000
        );
    }

    #[test]
    fn test_min_sol_output_rejects_bad_price() {
        let slippage = Slippage::new(0.1).unwrap();
        assert!(min_sol_output(1, -0.5, slippage).is_err());
        assert!(min_sol_output(1, f64::NAN, slippage).is_err());
        assert!(min_sol_output(u64::MAX, 1e12, slippage).is_err());
    }

    #[test]
    fn test_slippage_range() {
        assert!(Slippage::new(0.0).is_ok());
        assert!(Slippage::new(0.999).is_ok());
        assert!(Slippage::new(1.0).is_err());
        assert!(Slippage::new(-0.01).is_err());
        assert!(Slippage::new(f64::NAN).is_err());
        assert!(Slippage::new(f64::INFINITY).is_err());
    }

    #[test]
    fn test_sol_to_lamports() {
        assert_eq!(sol_to_lamports(1.0).unwrap(), 1_000_000_000);
        assert_eq!(sol_to_lamports(0.1).unwrap(), 100_000_000);
        assert_eq!(sol_to_lamports(0.3).unwrap(), 300_000_000);
        assert_eq!(sol_to_lamports(0.0).unwrap(), 0);
        assert!(sol_to_lamports(-1.0).is_err());
        assert!(sol_to_lamports(f64::INFINITY).is_err());
        assert!(sol_to_lamports(1e30).is_err());
    }

    #[test]
    fn test_quote_buy_from_snapshot() {
        let snapshot = sample_snapshot();
        let quote = quote_buy(&snapshot, 1_000_000_000, Slippage::new(0.05).unwrap()).unwrap();

        assert_eq!(quote.side, TradeSide::Buy);
        assert_eq!(quote.amount, 32_258_064_516);
        assert_eq!(quote.limit, 1_050_000_000);

        assert!(quote_buy(&snapshot, 0, Slippage::new(0.05).unwrap()).is_err());
    }

    #[test]
    fn test_quote_sell_limits() {
        let explicit = quote_sell(5_000, SellLimit::MinSolOutput(42)).unwrap();
        assert_eq!(explicit.side, TradeSide::Sell);
        assert_eq!(explicit.amount, 5_000);
        assert_eq!(explicit.limit, 42);

        let priced = quote_sell(
            1_000_000,
            SellLimit::FromPrice {
                sol_price_per_token: 0.002,
                slippage: 0.1,
            },
        )
        .unwrap();
        assert_eq!(priced.limit, 1_800_000);

        assert!(quote_sell(0, SellLimit::MinSolOutput(1)).is_err());
        assert!(quote_sell(
            1,
            SellLimit::FromPrice {
                sol_price_per_token: 0.002,
                slippage: 1.5,
            }
        )
        .is_err());
    }

    proptest! {
        #[test]
        fn prop_quote_never_exceeds_real_reserves(
            tv in 1u64..=u64::MAX,
            sv in 0u64..=u64::MAX,
            tr in 0u64..=u64::MAX,
            a in 2u64..=u64::MAX,
        ) {
            prop_assert!(quote_tokens_out(tv, sv, tr, a) <= tr);
        }

        #[test]
        fn prop_quote_monotonic_in_sol_in(
            a in 0u64..100_000_000_000,
            b in 0u64..100_000_000_000,
        ) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(quote_tokens_out(TV, SV, TR, lo) <= quote_tokens_out(TV, SV, TR, hi));
        }

        #[test]
        fn prop_max_cost_at_least_input(lamports in 0u64..u64::MAX / 2, s in 0.0f64..0.99) {
            let slippage = Slippage::new(s).unwrap();
            prop_assert!(max_sol_cost(lamports, slippage) >= lamports);
        }
    }
}
