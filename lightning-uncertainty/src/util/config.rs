// This file is Copyright its original authors, visible in version control
// history.
//
// This file is licensed under the Apache License, Version 2.0 <LICENSE-APACHE
// or http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your option.
// You may not use this file except in accordance with one or both of these
// licenses.

//! User-configurable knobs which the liquidity belief store applies for you.

use core::time::Duration;

/// Configuration for a [`LiquidityBeliefStore`].
///
/// Default::default() provides sane defaults.
///
/// [`LiquidityBeliefStore`]: crate::routing::uncertainty::LiquidityBeliefStore
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct UncertaintyConfig {
	/// The amount of time after which everything learned about a channel's liquidity has been
	/// forgotten.
	///
	/// Each time [`LiquidityBeliefStore::time_passed`] is called, every belief interval is widened
	/// by the elapsed fraction of this interval times the channel capacity. Any part of that
	/// widening smaller than a msat is carried over to the next call. Once at least this interval
	/// has elapsed in total, every channel is back at full uncertainty, however often the store
	/// was ticked in between.
	///
	/// Setting this to zero disables time-based decay entirely; explicit calls to
	/// [`LiquidityBeliefStore::relax_all`] still work.
	///
	/// Default value: 1 hour.
	///
	/// [`LiquidityBeliefStore::time_passed`]: crate::routing::uncertainty::LiquidityBeliefStore::time_passed
	/// [`LiquidityBeliefStore::relax_all`]: crate::routing::uncertainty::LiquidityBeliefStore::relax_all
	pub knowledge_forget_interval: Duration,
	/// When ingesting the state of our own channels, the reported spendable amount is reduced by
	/// `payment_amount_msat / local_fee_headroom_divisor` to leave room for the fees that are
	/// deducted from it once a payment is actually sent.
	///
	/// A value of zero disables the headroom.
	///
	/// Default value: 100 (1% of the payment amount).
	pub local_fee_headroom_divisor: u64,
}

impl Default for UncertaintyConfig {
	fn default() -> Self {
		UncertaintyConfig {
			knowledge_forget_interval: Duration::from_secs(60 * 60),
			local_fee_headroom_divisor: 100,
		}
	}
}

impl UncertaintyConfig {
	/// The headroom withheld from a local channel's spendable amount for a payment of
	/// `payment_amount_msat`.
	pub fn local_fee_headroom_msat(&self, payment_amount_msat: u64) -> u64 {
		payment_amount_msat.checked_div(self.local_fee_headroom_divisor).unwrap_or(0)
	}
}
