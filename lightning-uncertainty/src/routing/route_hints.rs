// This file is Copyright its original authors, visible in version control
// history.
//
// This file is licensed under the Apache License, Version 2.0 <LICENSE-APACHE
// or http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your option.
// You may not use this file except in accordance with one or both of these
// licenses.

//! Private channels near the payee, learned from route hints, are made routable by creating a
//! belief for them and mirroring them into the [`TopologyOverlay`].

use crate::routing::topology::{ChannelPolicy, NodeId, RoutingFees, TopologyOverlay};
use crate::routing::uncertainty::{
	BeliefError, ChannelCapacity, Direction, LiquidityBeliefStore, UNKNOWN_CHANNEL_CAPACITY_MSAT,
};
use crate::util::logger::Logger;

use core::ops::Deref;

/// A list of hops along a payment path terminating with a channel to the recipient.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct RouteHint(pub Vec<RouteHintHop>);

/// A channel descriptor for a hop along a payment path.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub struct RouteHintHop {
	/// The node_id of the non-target end of the route
	pub src_node_id: NodeId,
	/// The short_channel_id of this channel
	pub short_channel_id: u64,
	/// The fees which must be paid to use this channel
	pub fees: RoutingFees,
	/// The difference in CLTV values between this node and the next node.
	pub cltv_expiry_delta: u16,
}

impl<L: Deref> LiquidityBeliefStore<L>
where
	L::Target: Logger,
{
	/// Makes the channels of `route_hints` routable on the way to `payee`.
	///
	/// Each hint is walked from its last hop backwards, starting at `payee`. Every channel without
	/// a belief gets one with [`ChannelCapacity::Unknown`] and is added to `overlay` with a policy
	/// accepting HTLCs up to [`UNKNOWN_CHANNEL_CAPACITY_MSAT`] and the fees and CLTV delta the hop
	/// states. Channels which already have a belief are left alone.
	///
	/// The hinted channel is never assumed to carry the payment amount, its true capacity may
	/// turn out to be smaller. Returns the number of channels added.
	pub fn add_route_hints<O: TopologyOverlay + ?Sized>(
		&mut self, overlay: &mut O, route_hints: &[RouteHint], payee: &NodeId,
	) -> Result<usize, BeliefError> {
		let mut added = 0;
		for hint in route_hints {
			let mut target = *payee;
			for hop in hint.0.iter().rev() {
				let source = hop.src_node_id;
				let scid = hop.short_channel_id;
				if source == target {
					log_debug!(
						self.logger(),
						"Ignoring route hint channel {} which loops back to {}",
						log_scid!(scid),
						source
					);
				} else if self.contains(scid) {
					let logger = self.logger();
					log_debug!(logger, "Route hint channel {} is already known", log_scid!(scid));
				} else {
					self.create(scid, ChannelCapacity::Unknown)?;
					overlay.add_channel(scid, source, target, UNKNOWN_CHANNEL_CAPACITY_MSAT);
					let direction = Direction::from_source_to_target(&source, &target);
					let policy = ChannelPolicy::permissive(
						UNKNOWN_CHANNEL_CAPACITY_MSAT,
						hop.fees,
						hop.cltv_expiry_delta,
					);
					overlay.update_channel_policy(scid, direction, policy);
					log_trace!(
						self.logger(),
						"Added route hint channel {} from {} to {}",
						log_scid!(scid),
						source,
						target
					);
					added += 1;
				}
				target = source;
			}
		}
		Ok(added)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::routing::topology::LocalChannelMods;
	use crate::util::config::UncertaintyConfig;
	use crate::util::test_utils::{node_id, TestLogger};

	const C1: u64 = 0x000001_000001_0001;
	const C2: u64 = 0x000002_000002_0002;
	const C3: u64 = 0x000003_000003_0003;

	fn hop(src: u8, short_channel_id: u64, base_msat: u32, cltv_expiry_delta: u16) -> RouteHintHop {
		RouteHintHop {
			src_node_id: node_id(src),
			short_channel_id,
			fees: RoutingFees { base_msat, proportional_millionths: 100 },
			cltv_expiry_delta,
		}
	}

	#[test]
	fn walks_hints_backwards_from_payee() {
		let logger = TestLogger::new();
		let mut store = LiquidityBeliefStore::new(UncertaintyConfig::default(), &logger);
		let mut overlay = LocalChannelMods::new();
		let payee = node_id(9);
		// 1 -C1-> 2 -C2-> payee
		let hints = [RouteHint(vec![hop(1, C1, 10, 40), hop(2, C2, 20, 80)])];

		assert_eq!(store.add_route_hints(&mut overlay, &hints, &payee), Ok(2));

		for scid in [C1, C2] {
			assert_eq!(store.get(scid).unwrap().capacity(), ChannelCapacity::Unknown);
			assert_eq!(store.capacity_msat(scid), Some(UNKNOWN_CHANNEL_CAPACITY_MSAT));
			assert_eq!(store.liquidity_range(scid, Direction::OneToTwo), Some((0, UNKNOWN_CHANNEL_CAPACITY_MSAT)));
		}
		assert!(store.check_invariants().is_ok());

		let last = overlay.channel(C2).unwrap();
		assert!((last.node_one, last.node_two) == (node_id(2), payee) || (last.node_one, last.node_two) == (payee, node_id(2)));
		let direction = Direction::from_source_to_target(&node_id(2), &payee);
		let policy = overlay.policy(C2, direction).unwrap();
		assert_eq!(*policy, ChannelPolicy {
			enabled: true,
			cltv_expiry_delta: 80,
			htlc_minimum_msat: 0,
			htlc_maximum_msat: UNKNOWN_CHANNEL_CAPACITY_MSAT,
			fees: RoutingFees { base_msat: 20, proportional_millionths: 100 },
		});
		assert_eq!(overlay.policy(C2, direction.opposite()), None);

		let direction = Direction::from_source_to_target(&node_id(1), &node_id(2));
		assert_eq!(overlay.policy(C1, direction).unwrap().cltv_expiry_delta, 40);
		logger.assert_log_contains("lightning_uncertainty::routing::route_hints", "Added route hint channel", 2);
	}

	#[test]
	fn known_channels_are_left_alone() {
		let logger = TestLogger::new();
		let mut store = LiquidityBeliefStore::new(UncertaintyConfig::default(), &logger);
		let mut overlay = LocalChannelMods::new();
		store.create(C1, ChannelCapacity::Known { capacity_msat: 50_000 }).unwrap();
		store.set_exact(C1, Direction::OneToTwo, 20_000).unwrap();

		let hints = [RouteHint(vec![hop(1, C1, 10, 40)]), RouteHint(vec![hop(3, C3, 0, 18)])];
		assert_eq!(store.add_route_hints(&mut overlay, &hints, &node_id(9)), Ok(1));

		assert_eq!(store.capacity_msat(C1), Some(50_000));
		assert_eq!(store.liquidity_range(C1, Direction::OneToTwo), Some((20_000, 20_000)));
		assert!(overlay.channel(C1).is_none());
		assert!(overlay.channel(C3).is_some());
		logger.assert_log_contains("lightning_uncertainty::routing::route_hints", "Route hint channel 1x1x1 is already known", 1);

		// A second pass over the same hints adds nothing.
		assert_eq!(store.add_route_hints(&mut overlay, &hints, &node_id(9)), Ok(0));
	}

	#[test]
	fn self_loops_are_skipped() {
		let logger = TestLogger::new();
		let mut store = LiquidityBeliefStore::new(UncertaintyConfig::default(), &logger);
		let mut overlay = LocalChannelMods::new();
		let hints = [RouteHint(vec![hop(9, C1, 0, 6)])];
		assert_eq!(store.add_route_hints(&mut overlay, &hints, &node_id(9)), Ok(0));
		assert!(store.is_empty());
		assert_eq!(overlay.num_channels(), 0);
		logger.assert_log_contains("lightning_uncertainty::routing::route_hints", "loops back", 1);
	}

	#[test]
	fn empty_hints_do_nothing() {
		let logger = TestLogger::new();
		let mut store = LiquidityBeliefStore::new(UncertaintyConfig::default(), &logger);
		let mut overlay = LocalChannelMods::new();
		assert_eq!(store.add_route_hints(&mut overlay, &[RouteHint(Vec::new())], &node_id(9)), Ok(0));
		assert!(store.is_empty());
	}
}
