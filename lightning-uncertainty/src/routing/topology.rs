// This file is Copyright its original authors, visible in version control
// history.
//
// This file is licensed under the Apache License, Version 2.0 <LICENSE-APACHE
// or http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your option.
// You may not use this file except in accordance with one or both of these
// licenses.

//! The view of the network topology the belief store is reconciled against, and the local overlay
//! private channels are mirrored into.
//!
//! Neither the topology nor the overlay is maintained here. [`NetworkTopology`] is read-only
//! access to whatever directory of advertised channels the caller keeps, [`TopologyOverlay`] is
//! the write side used for channels the directory cannot know about.

use bitcoin::secp256k1;
use bitcoin::secp256k1::constants::PUBLIC_KEY_SIZE;
use bitcoin::secp256k1::PublicKey;

use crate::routing::uncertainty::{
	BeliefError, ChannelCapacity, Direction, LiquidityBeliefStore, MAX_VALUE_MSAT,
};
use crate::util::hash_tables::{hash_map_with_capacity, new_hash_map, HashMap};
use crate::util::logger::Logger;

use core::cmp;
use core::fmt;
use core::ops::Deref;
use core::str::FromStr;

/// Represents the compressed public key of a node
#[derive(Clone, Copy)]
pub struct NodeId([u8; PUBLIC_KEY_SIZE]);

impl NodeId {
	/// Create a new NodeId from a public key
	pub fn from_pubkey(pubkey: &PublicKey) -> Self {
		NodeId(pubkey.serialize())
	}

	/// Get the public key slice from this NodeId
	pub fn as_slice(&self) -> &[u8] {
		&self.0
	}

	/// Get the public key from this NodeId
	pub fn as_pubkey(&self) -> Result<PublicKey, secp256k1::Error> {
		PublicKey::from_slice(&self.0)
	}
}

impl fmt::Debug for NodeId {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "NodeId({})", log_bytes!(self.0))
	}
}
impl fmt::Display for NodeId {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "{}", log_bytes!(self.0))
	}
}

impl core::hash::Hash for NodeId {
	fn hash<H: core::hash::Hasher>(&self, hasher: &mut H) {
		self.0.hash(hasher);
	}
}

impl Eq for NodeId {}

impl PartialEq for NodeId {
	fn eq(&self, other: &Self) -> bool {
		self.0[..] == other.0[..]
	}
}

impl cmp::PartialOrd for NodeId {
	fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> {
		Some(self.cmp(other))
	}
}

impl Ord for NodeId {
	fn cmp(&self, other: &Self) -> cmp::Ordering {
		self.0[..].cmp(&other.0[..])
	}
}

impl FromStr for NodeId {
	type Err = secp256k1::Error;

	/// Parses the hex encoding of a compressed public key.
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(NodeId::from_pubkey(&PublicKey::from_str(s)?))
	}
}

/// Fees for routing via a given channel
#[derive(Eq, PartialEq, Copy, Clone, Debug, Default, Hash)]
pub struct RoutingFees {
	/// Flat routing fee in millisatoshis.
	pub base_msat: u32,
	/// Liquidity-based routing fee in millionths of a routed amount.
	/// In other words, 10000 is 1%.
	pub proportional_millionths: u32,
}

/// The forwarding policy of one direction of a channel, as written to a [`TopologyOverlay`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChannelPolicy {
	/// Whether the channel can be currently used for payments (in this one direction).
	pub enabled: bool,
	/// The difference in CLTV values that you must have when routing through this channel.
	pub cltv_expiry_delta: u16,
	/// The minimum value, which must be relayed to the next hop via the channel
	pub htlc_minimum_msat: u64,
	/// The maximum value which may be relayed to the next hop via the channel.
	pub htlc_maximum_msat: u64,
	/// Fees charged when the channel is used for routing
	pub fees: RoutingFees,
}

impl ChannelPolicy {
	/// An enabled policy accepting any HTLC up to `htlc_maximum_msat`.
	pub fn permissive(htlc_maximum_msat: u64, fees: RoutingFees, cltv_expiry_delta: u16) -> Self {
		ChannelPolicy {
			enabled: true,
			cltv_expiry_delta,
			htlc_minimum_msat: 0,
			htlc_maximum_msat,
			fees,
		}
	}
}

/// An advertised channel as seen in a [`NetworkTopology`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChannelSnapshot {
	/// The channel's short channel id.
	pub short_channel_id: u64,
	/// Source node of the first direction of the channel.
	pub node_one: NodeId,
	/// Source node of the second direction of the channel.
	pub node_two: NodeId,
	/// The channel capacity as seen on-chain, if chain lookup is available.
	pub capacity_sats: Option<u64>,
}

/// Read access to a directory of advertised channels.
pub trait NetworkTopology {
	/// Whether the channel is currently advertised.
	fn contains_channel(&self, short_channel_id: u64) -> bool;

	/// Returns the channel with the given id, if advertised.
	fn channel(&self, short_channel_id: u64) -> Option<ChannelSnapshot>;

	/// Lists the ids of every advertised channel.
	fn short_channel_ids(&self) -> Vec<u64>;
}

/// A [`NetworkTopology`] held entirely in memory.
#[derive(Clone, Debug, Default)]
pub struct TopologySnapshot {
	channels: HashMap<u64, ChannelSnapshot>,
}

impl TopologySnapshot {
	/// Builds a snapshot out of the given channels. A later duplicate replaces an earlier one.
	pub fn from_channels<I: IntoIterator<Item = ChannelSnapshot>>(channels: I) -> Self {
		let channels = channels.into_iter();
		let mut map = hash_map_with_capacity(channels.size_hint().0);
		for channel in channels {
			map.insert(channel.short_channel_id, channel);
		}
		TopologySnapshot { channels: map }
	}

	/// Adds or replaces a channel.
	pub fn insert(&mut self, channel: ChannelSnapshot) {
		self.channels.insert(channel.short_channel_id, channel);
	}

	/// Removes a channel, returning it if it was present.
	pub fn remove(&mut self, short_channel_id: u64) -> Option<ChannelSnapshot> {
		self.channels.remove(&short_channel_id)
	}

	/// The number of channels in the snapshot.
	pub fn len(&self) -> usize {
		self.channels.len()
	}

	/// Whether the snapshot has no channels.
	pub fn is_empty(&self) -> bool {
		self.channels.is_empty()
	}
}

impl NetworkTopology for TopologySnapshot {
	fn contains_channel(&self, short_channel_id: u64) -> bool {
		self.channels.contains_key(&short_channel_id)
	}

	fn channel(&self, short_channel_id: u64) -> Option<ChannelSnapshot> {
		self.channels.get(&short_channel_id).copied()
	}

	fn short_channel_ids(&self) -> Vec<u64> {
		self.channels.keys().copied().collect()
	}
}

/// Write access to the local modifications layered over a [`NetworkTopology`] for channels it
/// does not advertise, such as private channels from route hints or our own unannounced channels.
pub trait TopologyOverlay {
	/// Adds a channel between `source` and `target` to the overlay.
	fn add_channel(
		&mut self, short_channel_id: u64, source: NodeId, target: NodeId, capacity_msat: u64,
	);

	/// Sets the forwarding policy of one direction of a channel, whether it was added with
	/// [`TopologyOverlay::add_channel`] or is advertised.
	fn update_channel_policy(
		&mut self, short_channel_id: u64, direction: Direction, policy: ChannelPolicy,
	);
}

/// A channel added to [`LocalChannelMods`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LocalChannel {
	/// The lower of the two endpoints.
	pub node_one: NodeId,
	/// The higher of the two endpoints.
	pub node_two: NodeId,
	/// The capacity the channel was added with.
	pub capacity_msat: u64,
}

/// An in-memory [`TopologyOverlay`].
#[derive(Clone, Debug, Default)]
pub struct LocalChannelMods {
	channels: HashMap<u64, LocalChannel>,
	policies: HashMap<u64, [Option<ChannelPolicy>; 2]>,
}

impl LocalChannelMods {
	/// Creates an empty overlay.
	pub fn new() -> Self {
		LocalChannelMods { channels: new_hash_map(), policies: new_hash_map() }
	}

	/// Returns a channel added to this overlay.
	pub fn channel(&self, short_channel_id: u64) -> Option<&LocalChannel> {
		self.channels.get(&short_channel_id)
	}

	/// Returns the policy set for one direction of a channel.
	pub fn policy(&self, short_channel_id: u64, direction: Direction) -> Option<&ChannelPolicy> {
		self.policies.get(&short_channel_id).and_then(|p| p[direction.index()].as_ref())
	}

	/// The number of channels added to this overlay.
	pub fn num_channels(&self) -> usize {
		self.channels.len()
	}
}

impl TopologyOverlay for LocalChannelMods {
	fn add_channel(
		&mut self, short_channel_id: u64, source: NodeId, target: NodeId, capacity_msat: u64,
	) {
		let (node_one, node_two) =
			if source < target { (source, target) } else { (target, source) };
		self.channels.insert(short_channel_id, LocalChannel { node_one, node_two, capacity_msat });
	}

	fn update_channel_policy(
		&mut self, short_channel_id: u64, direction: Direction, policy: ChannelPolicy,
	) {
		let policies = self.policies.entry(short_channel_id).or_insert([None; 2]);
		policies[direction.index()] = Some(policy);
	}
}

/// An error which occurred while reconciling a [`LiquidityBeliefStore`] with a
/// [`NetworkTopology`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TopologySyncError {
	/// The topology advertises a channel whose capacity is unavailable or cannot be expressed in
	/// msat. The topology itself is inconsistent and no value is guessed for it.
	FatalDataInconsistency {
		/// The channel in question.
		short_channel_id: u64,
		/// What was wrong with it.
		reason: &'static str,
	},
	/// The store refused an update.
	Belief(BeliefError),
}

impl fmt::Display for TopologySyncError {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::FatalDataInconsistency { short_channel_id, reason } => write!(
				f,
				"Inconsistent topology data for channel {}: {}",
				log_scid!(*short_channel_id),
				reason
			),
			Self::Belief(e) => write!(f, "Failed to update liquidity beliefs: {}", e),
		}
	}
}

impl std::error::Error for TopologySyncError {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match self {
			Self::Belief(e) => Some(e),
			_ => None,
		}
	}
}

impl From<BeliefError> for TopologySyncError {
	fn from(e: BeliefError) -> Self {
		Self::Belief(e)
	}
}

/// What [`LiquidityBeliefStore::sync_with_topology`] did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SyncSummary {
	/// Beliefs dropped because their channel is no longer advertised.
	pub removed: usize,
	/// Beliefs created for newly advertised channels.
	pub created: usize,
	/// Beliefs kept for channels no longer advertised because HTLCs are still in flight over them.
	pub retained_busy: usize,
}

impl<L: Deref> LiquidityBeliefStore<L>
where
	L::Target: Logger,
{
	/// Reconciles the store with `topology`.
	///
	/// Beliefs about channels `topology` no longer advertises are dropped unless the channel is
	/// busy, in which case they are kept to track the in-flight HTLCs. Every advertised channel
	/// without a belief gets one at full uncertainty.
	///
	/// Fails with [`TopologySyncError::FatalDataInconsistency`] if the capacity of a newly
	/// advertised channel is unknown or overflows. Stale beliefs have been dropped by then, and
	/// beliefs created for other channels before the failure are kept.
	pub fn sync_with_topology<T: NetworkTopology + ?Sized>(
		&mut self, topology: &T,
	) -> Result<SyncSummary, TopologySyncError> {
		let mut summary = SyncSummary::default();
		let mut stale = Vec::new();
		for (scid, belief) in self.iter() {
			if topology.contains_channel(*scid) {
				continue;
			}
			if belief.is_busy() {
				summary.retained_busy += 1;
			} else {
				stale.push(*scid);
			}
		}
		for scid in stale {
			self.remove(scid)?;
			log_trace!(
				self.logger(),
				"Dropped liquidity belief for channel {} which is no longer advertised",
				log_scid!(scid)
			);
			summary.removed += 1;
		}

		for scid in topology.short_channel_ids() {
			if self.contains(scid) {
				continue;
			}
			let capacity_msat = match topology_capacity_msat(topology, scid) {
				Ok(capacity_msat) => capacity_msat,
				Err(reason) => {
					log_error!(
						self.logger(),
						"Channel {} in topology is unusable: {}",
						log_scid!(scid),
						reason
					);
					return Err(TopologySyncError::FatalDataInconsistency {
						short_channel_id: scid,
						reason,
					});
				},
			};
			self.create(scid, ChannelCapacity::Known { capacity_msat })?;
			summary.created += 1;
		}

		log_debug!(
			self.logger(),
			"Synced liquidity beliefs with topology: {} removed, {} created, {} kept while busy",
			summary.removed,
			summary.created,
			summary.retained_busy
		);
		Ok(summary)
	}
}

fn topology_capacity_msat<T: NetworkTopology + ?Sized>(
	topology: &T, short_channel_id: u64,
) -> Result<u64, &'static str> {
	let channel = topology.channel(short_channel_id).ok_or("listed but not retrievable")?;
	let capacity_sats = channel.capacity_sats.ok_or("capacity unknown")?;
	match capacity_sats.checked_mul(1000) {
		Some(capacity_msat) if capacity_msat <= MAX_VALUE_MSAT => Ok(capacity_msat),
		_ => Err("capacity does not fit in msat"),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::routing::uncertainty::ChannelLiquidityBelief;
	use crate::util::config::UncertaintyConfig;
	use crate::util::test_utils::{node_id, ordered_node_ids, TestLogger};

	const C1: u64 = 0x000001_000001_0001;
	const C2: u64 = 0x000002_000002_0002;
	const C3: u64 = 0x000003_000003_0003;

	fn snapshot_channel(short_channel_id: u64, capacity_sats: Option<u64>) -> ChannelSnapshot {
		let (node_one, node_two) = ordered_node_ids(1, 2);
		ChannelSnapshot { short_channel_id, node_one, node_two, capacity_sats }
	}

	fn sorted_beliefs<L: Deref>(store: &LiquidityBeliefStore<L>) -> Vec<(u64, ChannelLiquidityBelief)>
	where L::Target: Logger {
		let mut beliefs: Vec<_> = store.iter().map(|(scid, b)| (*scid, b.clone())).collect();
		beliefs.sort_by_key(|(scid, _)| *scid);
		beliefs
	}

	#[test]
	fn node_id_parses_from_hex() {
		let id = node_id(42);
		let parsed = NodeId::from_str(&id.to_string()).unwrap();
		assert_eq!(parsed, id);
		assert_eq!(parsed.as_pubkey().unwrap().serialize()[..], *id.as_slice());
		assert!(NodeId::from_str("02abcd").is_err());
		assert!(NodeId::from_str("not hex").is_err());
	}

	#[test]
	fn node_id_orders_bytewise() {
		let (lower, higher) = ordered_node_ids(3, 4);
		assert!(lower < higher);
		assert!(lower.as_slice() < higher.as_slice());
	}

	#[test]
	fn sync_creates_advertised_channels() {
		let logger = TestLogger::new();
		let mut store = LiquidityBeliefStore::new(UncertaintyConfig::default(), &logger);
		let topology = TopologySnapshot::from_channels([
			snapshot_channel(C1, Some(100)),
			snapshot_channel(C2, Some(2_000)),
		]);
		let summary = store.sync_with_topology(&topology).unwrap();
		assert_eq!(summary, SyncSummary { removed: 0, created: 2, retained_busy: 0 });
		assert_eq!(store.capacity_msat(C1), Some(100_000));
		assert_eq!(store.capacity_msat(C2), Some(2_000_000));
		assert_eq!(store.liquidity_range(C2, Direction::TwoToOne), Some((0, 2_000_000)));
		logger.assert_log_contains("lightning_uncertainty::routing::topology", "0 removed, 2 created, 0 kept while busy", 1);
	}

	#[test]
	fn sync_removes_idle_stale_channels() {
		let logger = TestLogger::new();
		let mut store = LiquidityBeliefStore::new(UncertaintyConfig::default(), &logger);
		store.create(C1, ChannelCapacity::Known { capacity_msat: 100_000 }).unwrap();
		let topology = TopologySnapshot::from_channels([snapshot_channel(C2, Some(1))]);

		let summary = store.sync_with_topology(&topology).unwrap();
		assert_eq!(summary, SyncSummary { removed: 1, created: 1, retained_busy: 0 });
		assert!(!store.contains(C1));
		assert!(store.contains(C2));
		logger.assert_log_contains("lightning_uncertainty::routing::topology", "Dropped liquidity belief for channel 1x1x1", 1);
	}

	#[test]
	fn sync_retains_busy_stale_channels() {
		let logger = TestLogger::new();
		let mut store = LiquidityBeliefStore::new(UncertaintyConfig::default(), &logger);
		store.create(C1, ChannelCapacity::Known { capacity_msat: 100_000 }).unwrap();
		store.set_exact(C1, Direction::OneToTwo, 30_000).unwrap();
		store.commit_htlc(C1, Direction::OneToTwo, 5_000).unwrap();
		let before = store.get(C1).unwrap().clone();

		let topology = TopologySnapshot::from_channels([snapshot_channel(C2, Some(1))]);
		let summary = store.sync_with_topology(&topology).unwrap();
		assert_eq!(summary, SyncSummary { removed: 0, created: 1, retained_busy: 1 });
		assert_eq!(store.get(C1), Some(&before));

		// Once the HTLC resolves the next sync drops it.
		store.remove_htlc(C1, Direction::OneToTwo, 5_000).unwrap();
		let summary = store.sync_with_topology(&topology).unwrap();
		assert_eq!(summary, SyncSummary { removed: 1, created: 0, retained_busy: 0 });
		assert!(!store.contains(C1));
	}

	#[test]
	fn sync_keeps_existing_beliefs() {
		let logger = TestLogger::new();
		let mut store = LiquidityBeliefStore::new(UncertaintyConfig::default(), &logger);
		store.create(C1, ChannelCapacity::Known { capacity_msat: 100_000 }).unwrap();
		store.set_exact(C1, Direction::TwoToOne, 12_345).unwrap();
		let topology = TopologySnapshot::from_channels([snapshot_channel(C1, Some(100))]);
		store.sync_with_topology(&topology).unwrap();
		assert_eq!(store.liquidity_range(C1, Direction::TwoToOne), Some((12_345, 12_345)));
	}

	#[test]
	fn sync_is_idempotent() {
		let logger = TestLogger::new();
		let mut store = LiquidityBeliefStore::new(UncertaintyConfig::default(), &logger);
		store.create(C3, ChannelCapacity::Known { capacity_msat: 5_000 }).unwrap();
		store.commit_htlc(C3, Direction::TwoToOne, 1_000).unwrap();
		store.create(C2, ChannelCapacity::Unknown).unwrap();
		let topology = TopologySnapshot::from_channels([
			snapshot_channel(C1, Some(100)),
			snapshot_channel(0x000004_000004_0004, Some(250)),
		]);

		store.sync_with_topology(&topology).unwrap();
		let first = sorted_beliefs(&store);
		let summary = store.sync_with_topology(&topology).unwrap();
		assert_eq!(summary, SyncSummary { removed: 0, created: 0, retained_busy: 1 });
		assert_eq!(sorted_beliefs(&store), first);
	}

	#[test]
	fn sync_fails_on_missing_capacity() {
		let logger = TestLogger::new();
		let mut store = LiquidityBeliefStore::new(UncertaintyConfig::default(), &logger);
		let topology = TopologySnapshot::from_channels([snapshot_channel(C1, None)]);
		assert_eq!(store.sync_with_topology(&topology), Err(TopologySyncError::FatalDataInconsistency {
			short_channel_id: C1, reason: "capacity unknown",
		}));
		assert!(!store.contains(C1));
		logger.assert_log_contains("lightning_uncertainty::routing::topology", "Channel 1x1x1 in topology is unusable", 1);
	}

	#[test]
	fn sync_fails_on_unrepresentable_capacity() {
		let logger = TestLogger::new();
		let mut store = LiquidityBeliefStore::new(UncertaintyConfig::default(), &logger);
		for capacity_sats in [u64::MAX, MAX_VALUE_MSAT / 1000 + 1] {
			let topology = TopologySnapshot::from_channels([snapshot_channel(C1, Some(capacity_sats))]);
			match store.sync_with_topology(&topology) {
				Err(TopologySyncError::FatalDataInconsistency { short_channel_id, .. }) => assert_eq!(short_channel_id, C1),
				res => panic!("Unexpected sync result {:?}", res),
			}
		}
		let topology = TopologySnapshot::from_channels([snapshot_channel(C1, Some(MAX_VALUE_MSAT / 1000))]);
		store.sync_with_topology(&topology).unwrap();
		assert_eq!(store.capacity_msat(C1), Some(MAX_VALUE_MSAT));
	}

	struct BrokenTopology;
	impl NetworkTopology for BrokenTopology {
		fn contains_channel(&self, short_channel_id: u64) -> bool { short_channel_id == C1 }
		fn channel(&self, _short_channel_id: u64) -> Option<ChannelSnapshot> { None }
		fn short_channel_ids(&self) -> Vec<u64> { vec![C1] }
	}

	#[test]
	fn sync_fails_on_unretrievable_channel() {
		let logger = TestLogger::new();
		let mut store = LiquidityBeliefStore::new(UncertaintyConfig::default(), &logger);
		let err = store.sync_with_topology(&BrokenTopology).unwrap_err();
		assert_eq!(err.to_string(), "Inconsistent topology data for channel 1x1x1: listed but not retrievable");
	}

	#[test]
	fn overlay_orders_endpoints_and_stores_policies() {
		let (lower, higher) = ordered_node_ids(5, 6);
		let mut overlay = LocalChannelMods::new();
		overlay.add_channel(C1, higher, lower, 42);
		assert_eq!(overlay.channel(C1), Some(&LocalChannel { node_one: lower, node_two: higher, capacity_msat: 42 }));
		assert_eq!(overlay.num_channels(), 1);

		let policy = ChannelPolicy::permissive(42, RoutingFees { base_msat: 1, proportional_millionths: 2 }, 3);
		overlay.update_channel_policy(C1, Direction::TwoToOne, policy);
		assert_eq!(overlay.policy(C1, Direction::TwoToOne), Some(&policy));
		assert_eq!(overlay.policy(C1, Direction::OneToTwo), None);

		// Policies may be set for channels the overlay did not add.
		overlay.update_channel_policy(C2, Direction::OneToTwo, policy);
		assert_eq!(overlay.policy(C2, Direction::OneToTwo), Some(&policy));
		assert_eq!(overlay.channel(C2), None);
	}
}
