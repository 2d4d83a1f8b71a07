// This file is Copyright its original authors, visible in version control
// history.
//
// This file is licensed under the Apache License, Version 2.0 <LICENSE-APACHE
// or http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your option.
// You may not use this file except in accordance with one or both of these
// licenses.

//! Updates to the belief store driven by the lifecycle of a payment flow: committing its HTLCs,
//! learning from how it resolved, and releasing its HTLCs again.
//!
//! Every operation here checks the whole flow against the store before touching any belief, so
//! a flow is either applied to every hop or to none.

use crate::routing::uncertainty::{BeliefError, Direction, LiquidityBeliefStore};
use crate::util::hash_tables::{new_hash_map, HashMap};
use crate::util::logger::Logger;

use core::ops::Deref;

/// One hop of a [`PaymentFlow`]: `amount_msat` forwarded over a channel in `direction`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FlowHop {
	/// The channel forwarded over.
	pub short_channel_id: u64,
	/// The direction forwarded in.
	pub direction: Direction,
	/// The amount forwarded, including the fees of later hops.
	pub amount_msat: u64,
}

/// A single path of a multi-part payment, ordered from us towards the payee.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct PaymentFlow {
	/// The hops of the path.
	pub hops: Vec<FlowHop>,
}

impl PaymentFlow {
	/// Wraps the given hops.
	pub fn new(hops: Vec<FlowHop>) -> Self {
		PaymentFlow { hops }
	}
}

impl<L: Deref> LiquidityBeliefStore<L>
where
	L::Target: Logger,
{
	fn check_flow_known(&self, hops: &[FlowHop]) -> Result<(), BeliefError> {
		for hop in hops {
			if !self.contains(hop.short_channel_id) {
				return Err(BeliefError::NotFound { short_channel_id: hop.short_channel_id });
			}
		}
		Ok(())
	}

	/// Notes the HTLCs of `flow` as in flight. Its channels stay busy until
	/// [`Self::release_flow`] is called.
	pub fn commit_flow(&mut self, flow: &PaymentFlow) -> Result<(), BeliefError> {
		self.check_flow_known(&flow.hops)?;
		for hop in &flow.hops {
			self.commit_htlc(hop.short_channel_id, hop.direction, hop.amount_msat)?;
		}
		Ok(())
	}

	/// Resolves the HTLCs of a flow previously passed to [`Self::commit_flow`].
	pub fn release_flow(&mut self, flow: &PaymentFlow) -> Result<(), BeliefError> {
		let mut releasing: HashMap<(u64, Direction), (u32, u64)> = new_hash_map();
		for hop in &flow.hops {
			let tally = releasing.entry((hop.short_channel_id, hop.direction)).or_insert((0, 0));
			tally.0 = tally.0.saturating_add(1);
			tally.1 = tally.1.saturating_add(hop.amount_msat);
		}
		for ((short_channel_id, direction), (num_htlcs, total_msat)) in releasing.iter() {
			let belief = self
				.get(*short_channel_id)
				.ok_or(BeliefError::NotFound { short_channel_id: *short_channel_id })?;
			if belief.num_inflight_htlcs(*direction) < *num_htlcs
				|| belief.inflight_msat(*direction) < *total_msat
			{
				return Err(BeliefError::NoInflightHtlc { short_channel_id: *short_channel_id });
			}
		}
		for hop in &flow.hops {
			self.remove_htlc(hop.short_channel_id, hop.direction, hop.amount_msat)?;
		}
		Ok(())
	}

	/// Learns from a flow which was delivered and settled: every hop moved its amount across its
	/// channel.
	pub fn record_full_success(&mut self, flow: &PaymentFlow) -> Result<(), BeliefError> {
		for hop in &flow.hops {
			let capacity_msat = self.capacity_msat(hop.short_channel_id)
				.ok_or(BeliefError::NotFound { short_channel_id: hop.short_channel_id })?;
			if hop.amount_msat > capacity_msat {
				return Err(BeliefError::AmountExceedsCapacity {
					short_channel_id: hop.short_channel_id,
					amount_msat: hop.amount_msat,
					capacity_msat,
				});
			}
		}
		for hop in &flow.hops {
			self.apply_settlement(hop.short_channel_id, hop.direction, hop.amount_msat)?;
			log_trace!(
				self.logger(),
				"Settled {} msat over channel {}",
				hop.amount_msat,
				log_scid!(hop.short_channel_id)
			);
		}
		Ok(())
	}

	/// Learns from a flow which failed at hop `failure_index`: every earlier hop accepted the HTLC,
	/// so it can carry at least what we have in flight over it.
	///
	/// The failing hop and those after it are not updated here.
	pub fn record_partial_failure(
		&mut self, flow: &PaymentFlow, failure_index: usize,
	) -> Result<(), BeliefError> {
		let num_hops = flow.hops.len();
		if failure_index > num_hops {
			return Err(BeliefError::InvalidFailureIndex { failure_index, num_hops });
		}
		let forwarded = &flow.hops[..failure_index];
		self.check_flow_known(forwarded)?;
		for hop in forwarded {
			self.observe_lower_bound(hop.short_channel_id, hop.direction, 0)?;
			log_trace!(
				self.logger(),
				"Channel {} forwarded our HTLC before the failure",
				log_scid!(hop.short_channel_id)
			);
		}
		Ok(())
	}
}
