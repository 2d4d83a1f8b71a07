// This file is Copyright its original authors, visible in version control
// history.
//
// This file is licensed under the Apache License, Version 2.0 <LICENSE-APACHE
// or http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your option.
// You may not use this file except in accordance with one or both of these
// licenses.

//! The [`LiquidityBeliefStore`] tracks what we know about the spendable liquidity of every channel
//! we may route through.
//!
//! Nobody but the two channel counterparties can observe how a channel's capacity is split
//! between them. Instead we keep, per channel and per [`Direction`], an interval
//! `[min_liquidity_msat, max_liquidity_msat]` which the true spendable amount is known to lie in.
//! Both directions share a single capacity, so the two intervals are coupled:
//!
//! ```text
//! 0 <= min[d] <= max[d] <= capacity      for d in {OneToTwo, TwoToOne}
//! min[OneToTwo] == capacity - max[TwoToOne]
//! max[OneToTwo] == capacity - min[TwoToOne]
//! ```
//!
//! Every mutating method on the store leaves these relations intact for the channel it touched.
//! [`LiquidityBeliefStore::check_invariants`] verifies them over the whole store for debugging.

use crate::routing::topology::NodeId;
use crate::util::config::UncertaintyConfig;
use crate::util::hash_tables::{hash_map, new_hash_map, HashMap};
use crate::util::logger::Logger;

use core::fmt;
use core::ops::Deref;
use core::time::Duration;

/// The maximum value, in msat, that can ever exist: 21 million bitcoin.
pub const MAX_VALUE_MSAT: u64 = 21_000_000_0000_0000_000;

/// The capacity, in msat, presumed for a channel whose real capacity we cannot know, such as a
/// private channel learned from a route hint.
///
/// This is a deliberate approximation: it says "no bound is known", not "this much was
/// measured". Using all the bitcoin in existence keeps `min_liquidity_msat <= capacity` true
/// whatever the channel turns out to hold.
pub const UNKNOWN_CHANNEL_CAPACITY_MSAT: u64 = MAX_VALUE_MSAT;

/// One of the two forwarding directions of a channel.
///
/// Direction is defined in terms of [`NodeId`] ordering: [`Direction::OneToTwo`] forwards from
/// the counterparty which sorts first to the one which sorts second.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
	/// From the lower [`NodeId`] to the higher one. Encoded as `0`.
	OneToTwo,
	/// From the higher [`NodeId`] to the lower one. Encoded as `1`.
	TwoToOne,
}

impl Direction {
	/// Returns the direction a payment takes when forwarded from `source` to `target`.
	pub fn from_source_to_target(source: &NodeId, target: &NodeId) -> Direction {
		if source < target {
			Direction::OneToTwo
		} else {
			Direction::TwoToOne
		}
	}

	/// Decodes a direction from its wire value (`0` or `1`).
	pub fn from_index(index: u64) -> Option<Direction> {
		match index {
			0 => Some(Direction::OneToTwo),
			1 => Some(Direction::TwoToOne),
			_ => None,
		}
	}

	/// The wire value of this direction.
	pub fn index(self) -> usize {
		match self {
			Direction::OneToTwo => 0,
			Direction::TwoToOne => 1,
		}
	}

	/// The other direction of the same channel.
	pub fn opposite(self) -> Direction {
		match self {
			Direction::OneToTwo => Direction::TwoToOne,
			Direction::TwoToOne => Direction::OneToTwo,
		}
	}
}

/// The capacity of a channel as far as the belief store is concerned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelCapacity {
	/// The funding amount is known, from the topology or because the channel is ours.
	Known {
		/// The funding amount denominated in millisatoshi.
		capacity_msat: u64,
	},
	/// The channel is private and its funding amount was never disclosed to us.
	Unknown,
}

impl ChannelCapacity {
	/// Returns the capacity denominated in millisatoshi, which is
	/// [`UNKNOWN_CHANNEL_CAPACITY_MSAT`] for [`ChannelCapacity::Unknown`].
	pub fn as_msat(&self) -> u64 {
		match self {
			ChannelCapacity::Known { capacity_msat } => *capacity_msat,
			ChannelCapacity::Unknown => UNKNOWN_CHANNEL_CAPACITY_MSAT,
		}
	}
}

/// The interval the spendable liquidity of one channel direction is known to lie in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LiquidityBounds {
	/// We know at least this much can be sent in this direction.
	pub min_liquidity_msat: u64,
	/// We know no more than this can be sent in this direction.
	pub max_liquidity_msat: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct InflightHtlcs {
	num_htlcs: u32,
	total_msat: u64,
}

/// What we believe about one channel: its capacity, a [`LiquidityBounds`] per direction and the
/// HTLCs we currently have committed to it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelLiquidityBelief {
	capacity: ChannelCapacity,
	bounds: [LiquidityBounds; 2],
	inflight: [InflightHtlcs; 2],
	/// Decay owed from earlier [`LiquidityBeliefStore::time_passed`] calls which did not yet add
	/// up to a whole msat, in msat-nanoseconds over the forget interval.
	decay_remainder: u128,
}

impl ChannelLiquidityBelief {
	fn new(capacity: ChannelCapacity) -> Self {
		let capacity_msat = capacity.as_msat();
		let full = LiquidityBounds { min_liquidity_msat: 0, max_liquidity_msat: capacity_msat };
		Self {
			capacity,
			bounds: [full, full],
			inflight: [InflightHtlcs::default(); 2],
			decay_remainder: 0,
		}
	}

	/// The capacity this entry was created with. It never changes.
	pub fn capacity(&self) -> ChannelCapacity {
		self.capacity
	}

	/// The capacity in msat, see [`ChannelCapacity::as_msat`].
	pub fn capacity_msat(&self) -> u64 {
		self.capacity.as_msat()
	}

	/// The liquidity interval in the given direction.
	pub fn bounds(&self, direction: Direction) -> LiquidityBounds {
		self.bounds[direction.index()]
	}

	/// The total value of HTLCs we have committed, and not yet resolved, in the given direction.
	pub fn inflight_msat(&self, direction: Direction) -> u64 {
		self.inflight[direction.index()].total_msat
	}

	/// The number of HTLCs we have committed, and not yet resolved, in the given direction.
	pub fn num_inflight_htlcs(&self, direction: Direction) -> u32 {
		self.inflight[direction.index()].num_htlcs
	}

	/// Whether we have any committed, unresolved HTLC on this channel in either direction.
	pub fn is_busy(&self) -> bool {
		self.inflight.iter().any(|htlcs| htlcs.num_htlcs > 0)
	}

	fn satisfies_invariants(&self) -> bool {
		let capacity_msat = self.capacity_msat();
		let ordered = self.bounds.iter().all(|b| {
			b.min_liquidity_msat <= b.max_liquidity_msat && b.max_liquidity_msat <= capacity_msat
		});
		let (one_to_two, two_to_one) = (self.bounds[0], self.bounds[1]);
		ordered
			&& one_to_two.min_liquidity_msat == capacity_msat - two_to_one.max_liquidity_msat
			&& one_to_two.max_liquidity_msat == capacity_msat - two_to_one.min_liquidity_msat
	}

	/// Rewrites the opposite direction from the bounds of `direction`. The bounds of `direction`
	/// must already lie within the capacity.
	fn derive_opposite(&mut self, direction: Direction) {
		let capacity_msat = self.capacity_msat();
		let known = self.bounds[direction.index()];
		self.bounds[direction.opposite().index()] = LiquidityBounds {
			min_liquidity_msat: capacity_msat - known.max_liquidity_msat,
			max_liquidity_msat: capacity_msat - known.min_liquidity_msat,
		};
	}

	fn set_exact(&mut self, direction: Direction, liquidity_msat: u64) {
		let liquidity_msat = core::cmp::min(liquidity_msat, self.capacity_msat());
		self.bounds[direction.index()] = LiquidityBounds {
			min_liquidity_msat: liquidity_msat,
			max_liquidity_msat: liquidity_msat,
		};
		self.derive_opposite(direction);
	}

	fn raise_min(&mut self, direction: Direction, amount_msat: u64) {
		let bounds = &mut self.bounds[direction.index()];
		bounds.min_liquidity_msat = core::cmp::max(bounds.min_liquidity_msat, amount_msat);
		// Fresh evidence wins over a stale upper bound.
		bounds.max_liquidity_msat = core::cmp::max(bounds.max_liquidity_msat, amount_msat);
		self.derive_opposite(direction);
	}

	fn settle(&mut self, direction: Direction, amount_msat: u64) {
		let bounds = &mut self.bounds[direction.index()];
		bounds.min_liquidity_msat = bounds.min_liquidity_msat.saturating_sub(amount_msat);
		bounds.max_liquidity_msat = bounds.max_liquidity_msat.saturating_sub(amount_msat);
		self.derive_opposite(direction);
	}

	fn relax(&mut self, fraction: f64) {
		self.widen((self.capacity_msat() as f64 * fraction) as u64);
	}

	/// Forgets `elapsed / forget_interval` of what we know, carrying any sub-msat part of the
	/// decay over to the next call. `forget_interval` must not be zero.
	fn decay(&mut self, elapsed: Duration, forget_interval: Duration) {
		let capacity_msat = self.capacity_msat();
		if elapsed >= forget_interval {
			self.decay_remainder = 0;
			self.widen(capacity_msat);
			return;
		}
		let interval_nanos = forget_interval.as_nanos();
		let owed = (capacity_msat as u128)
			.checked_mul(elapsed.as_nanos())
			.and_then(|owed| owed.checked_add(self.decay_remainder));
		let delta_msat = match owed {
			Some(owed) => {
				self.decay_remainder = owed % interval_nanos;
				// At most `capacity_msat`, as `elapsed` and the remainder are below the interval.
				(owed / interval_nanos) as u64
			},
			None => {
				let fraction = elapsed.as_secs_f64() / forget_interval.as_secs_f64();
				(capacity_msat as f64 * fraction) as u64
			},
		};
		self.widen(delta_msat);
	}

	/// Moves every bound `delta_msat` towards full uncertainty.
	fn widen(&mut self, delta_msat: u64) {
		let capacity_msat = self.capacity_msat();
		let widened = self.bounds.map(|b| LiquidityBounds {
			min_liquidity_msat: b.min_liquidity_msat.saturating_sub(delta_msat),
			max_liquidity_msat: core::cmp::min(
				b.max_liquidity_msat.saturating_add(delta_msat),
				capacity_msat,
			),
		});
		// Each direction implies bounds on the other; keep the tighter of the two.
		self.bounds[0] = LiquidityBounds {
			min_liquidity_msat: core::cmp::max(
				widened[0].min_liquidity_msat,
				capacity_msat - widened[1].max_liquidity_msat,
			),
			max_liquidity_msat: core::cmp::min(
				widened[0].max_liquidity_msat,
				capacity_msat - widened[1].min_liquidity_msat,
			),
		};
		self.derive_opposite(Direction::OneToTwo);
	}

	#[cfg(test)]
	pub(crate) fn with_bounds(capacity: ChannelCapacity, bounds: [LiquidityBounds; 2]) -> Self {
		Self { capacity, bounds, inflight: [InflightHtlcs::default(); 2], decay_remainder: 0 }
	}
}

/// An error returned by a [`LiquidityBeliefStore`] operation.
///
/// Apart from [`BeliefError::InvariantViolation`], these signal a misuse by the caller which
/// can be avoided by checking the relevant precondition first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BeliefError {
	/// An entry for this channel already exists.
	DuplicateEntry {
		/// The channel in question.
		short_channel_id: u64,
	},
	/// No entry exists for this channel.
	NotFound {
		/// The channel in question.
		short_channel_id: u64,
	},
	/// The channel has committed, unresolved HTLCs and must not be removed.
	StillBusy {
		/// The channel in question.
		short_channel_id: u64,
	},
	/// An amount larger than the channel's capacity was claimed to have moved across it.
	AmountExceedsCapacity {
		/// The channel in question.
		short_channel_id: u64,
		/// The amount given.
		amount_msat: u64,
		/// The capacity of the channel.
		capacity_msat: u64,
	},
	/// A relaxation fraction outside of `(0, 1]` was given.
	InvalidFraction,
	/// An HTLC was resolved which had not been committed.
	NoInflightHtlc {
		/// The channel in question.
		short_channel_id: u64,
	},
	/// A failure index past the end of the flow was given.
	InvalidFailureIndex {
		/// The index given.
		failure_index: usize,
		/// The number of hops in the flow.
		num_hops: usize,
	},
	/// Entries were found whose bounds do not satisfy the store invariants.
	InvariantViolation {
		/// The offending channels, in ascending order.
		short_channel_ids: Vec<u64>,
	},
}

impl fmt::Display for BeliefError {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::DuplicateEntry { short_channel_id } => {
				write!(f, "Channel {} already has a liquidity belief", log_scid!(*short_channel_id))
			},
			Self::NotFound { short_channel_id } => {
				write!(f, "Channel {} has no liquidity belief", log_scid!(*short_channel_id))
			},
			Self::StillBusy { short_channel_id } => {
				write!(f, "Channel {} still has HTLCs in flight", log_scid!(*short_channel_id))
			},
			Self::AmountExceedsCapacity { short_channel_id, amount_msat, capacity_msat } => write!(
				f,
				"Amount {} msat exceeds the {} msat capacity of channel {}",
				amount_msat,
				capacity_msat,
				log_scid!(*short_channel_id)
			),
			Self::InvalidFraction => write!(f, "Relaxation fraction must lie in (0, 1]"),
			Self::NoInflightHtlc { short_channel_id } => write!(
				f,
				"Channel {} has no matching HTLC in flight",
				log_scid!(*short_channel_id)
			),
			Self::InvalidFailureIndex { failure_index, num_hops } => write!(
				f,
				"Failure index {} is past the end of a {}-hop flow",
				failure_index, num_hops
			),
			Self::InvariantViolation { short_channel_ids } => {
				let count = short_channel_ids.len();
				write!(f, "{} channel(s) violate the liquidity invariants:", count)?;
				for scid in short_channel_ids {
					write!(f, " {}", log_scid!(*scid))?;
				}
				Ok(())
			},
		}
	}
}

impl std::error::Error for BeliefError {}

/// Per-channel, per-direction liquidity beliefs for the channels a payment may route through.
///
/// The store is the single owner of every [`ChannelLiquidityBelief`]. It is not internally
/// synchronized: all mutation goes through `&mut self`, so sharing it across threads requires
/// wrapping the whole store in a lock, which keeps the paired-direction updates atomic.
pub struct LiquidityBeliefStore<L: Deref>
where
	L::Target: Logger,
{
	config: UncertaintyConfig,
	logger: L,
	channels: HashMap<u64, ChannelLiquidityBelief>,
	last_decayed: Option<Duration>,
}

impl<L: Deref> LiquidityBeliefStore<L>
where
	L::Target: Logger,
{
	/// Creates an empty store.
	pub fn new(config: UncertaintyConfig, logger: L) -> Self {
		Self { config, logger, channels: new_hash_map(), last_decayed: None }
	}

	#[cfg(test)]
	pub(crate) fn with_channel(
		mut self, short_channel_id: u64, belief: ChannelLiquidityBelief,
	) -> Self {
		assert!(self.channels.insert(short_channel_id, belief).is_none());
		self
	}

	/// The configuration this store was created with.
	pub fn config(&self) -> &UncertaintyConfig {
		&self.config
	}

	pub(crate) fn logger(&self) -> &L {
		&self.logger
	}

	/// The number of channels we hold a belief about.
	pub fn len(&self) -> usize {
		self.channels.len()
	}

	/// Whether the store holds no belief at all.
	pub fn is_empty(&self) -> bool {
		self.channels.is_empty()
	}

	/// Whether we hold a belief about the given channel.
	pub fn contains(&self, short_channel_id: u64) -> bool {
		self.channels.contains_key(&short_channel_id)
	}

	/// Returns the belief for the given channel, if any.
	pub fn get(&self, short_channel_id: u64) -> Option<&ChannelLiquidityBelief> {
		self.channels.get(&short_channel_id)
	}

	/// Iterates over every belief, in no particular order.
	pub fn iter(&self) -> impl Iterator<Item = (&u64, &ChannelLiquidityBelief)> {
		self.channels.iter()
	}

	/// Query the minimum and maximum liquidity known to be available for sending over the
	/// channel with `short_channel_id` in `direction`.
	pub fn liquidity_range(
		&self, short_channel_id: u64, direction: Direction,
	) -> Option<(u64, u64)> {
		self.channels.get(&short_channel_id).map(|belief| {
			let bounds = belief.bounds(direction);
			(bounds.min_liquidity_msat, bounds.max_liquidity_msat)
		})
	}

	/// The capacity, in msat, of the channel with `short_channel_id`.
	pub fn capacity_msat(&self, short_channel_id: u64) -> Option<u64> {
		self.channels.get(&short_channel_id).map(|belief| belief.capacity_msat())
	}

	/// The value of our unresolved HTLCs over the channel in `direction`.
	pub fn inflight_msat(&self, short_channel_id: u64, direction: Direction) -> Option<u64> {
		self.channels.get(&short_channel_id).map(|belief| belief.inflight_msat(direction))
	}

	fn channel_mut(
		&mut self, short_channel_id: u64,
	) -> Result<&mut ChannelLiquidityBelief, BeliefError> {
		self.channels.get_mut(&short_channel_id).ok_or(BeliefError::NotFound { short_channel_id })
	}

	/// Starts tracking a channel at full uncertainty: `[0, capacity]` in both directions.
	pub fn create(
		&mut self, short_channel_id: u64, capacity: ChannelCapacity,
	) -> Result<(), BeliefError> {
		match self.channels.entry(short_channel_id) {
			hash_map::Entry::Occupied(_) => Err(BeliefError::DuplicateEntry { short_channel_id }),
			hash_map::Entry::Vacant(entry) => {
				entry.insert(ChannelLiquidityBelief::new(capacity));
				Ok(())
			},
		}
	}

	/// Records that exactly `liquidity_msat` can be sent over the channel in `direction`,
	/// typically because it is our own channel and we were told its balance.
	///
	/// Values above the capacity are clamped to it.
	pub fn set_exact(
		&mut self, short_channel_id: u64, direction: Direction, liquidity_msat: u64,
	) -> Result<(), BeliefError> {
		self.channel_mut(short_channel_id)?.set_exact(direction, liquidity_msat);
		Ok(())
	}

	/// Records that the channel can carry at least `amount_msat` in `direction` on top of the
	/// HTLCs we already have in flight over it in that direction.
	///
	/// A claim exceeding the capacity carries no usable information and is ignored.
	pub fn observe_lower_bound(
		&mut self, short_channel_id: u64, direction: Direction, amount_msat: u64,
	) -> Result<(), BeliefError> {
		let belief = self
			.channels
			.get_mut(&short_channel_id)
			.ok_or(BeliefError::NotFound { short_channel_id })?;
		let sendable_msat = amount_msat.saturating_add(belief.inflight_msat(direction));
		if sendable_msat > belief.capacity_msat() {
			log_debug!(
				self.logger,
				"Ignoring lower bound of {} msat on channel {}, above its {} msat capacity",
				sendable_msat,
				log_scid!(short_channel_id),
				belief.capacity_msat()
			);
			return Ok(());
		}
		belief.raise_min(direction, sendable_msat);
		Ok(())
	}

	/// Records that `amount_msat` was forwarded over the channel in `direction` and settled,
	/// moving that much balance to the other side.
	pub fn apply_settlement(
		&mut self, short_channel_id: u64, direction: Direction, amount_msat: u64,
	) -> Result<(), BeliefError> {
		let belief = self.channel_mut(short_channel_id)?;
		let capacity_msat = belief.capacity_msat();
		if amount_msat > capacity_msat {
			return Err(BeliefError::AmountExceedsCapacity {
				short_channel_id,
				amount_msat,
				capacity_msat,
			});
		}
		belief.settle(direction, amount_msat);
		Ok(())
	}

	/// Forgets `fraction` of what we know about one channel: both bounds of both directions move
	/// `fraction * capacity` towards full uncertainty.
	///
	/// `fraction` must lie in `(0, 1]`. Bounds only ever widen.
	pub fn relax(&mut self, short_channel_id: u64, fraction: f64) -> Result<(), BeliefError> {
		check_fraction(fraction)?;
		self.channel_mut(short_channel_id)?.relax(fraction);
		Ok(())
	}

	/// Forgets `fraction` of what we know about every channel, see [`Self::relax`].
	pub fn relax_all(&mut self, fraction: f64) -> Result<(), BeliefError> {
		check_fraction(fraction)?;
		for belief in self.channels.values_mut() {
			belief.relax(fraction);
		}
		log_trace!(
			self.logger,
			"Relaxed {} channel liquidity beliefs by {}",
			self.channels.len(),
			fraction
		);
		Ok(())
	}

	/// Decays every belief according to the time elapsed since the last call, as a fraction of
	/// [`UncertaintyConfig::knowledge_forget_interval`].
	///
	/// The first call only records the current time. A time earlier than one already seen is
	/// ignored. Decay too small to widen a channel by a whole msat is carried over per channel,
	/// so frequent calls forget as much as a single call spanning the same time.
	pub fn time_passed(&mut self, duration_since_epoch: Duration) {
		let last_decayed = match self.last_decayed {
			Some(last_decayed) if duration_since_epoch > last_decayed => last_decayed,
			Some(_) => return,
			None => {
				self.last_decayed = Some(duration_since_epoch);
				return;
			},
		};
		self.last_decayed = Some(duration_since_epoch);
		let forget_interval = self.config.knowledge_forget_interval;
		if forget_interval.is_zero() {
			return;
		}
		let elapsed = duration_since_epoch - last_decayed;
		for belief in self.channels.values_mut() {
			belief.decay(elapsed, forget_interval);
		}
		log_trace!(
			self.logger,
			"Decayed {} channel liquidity beliefs after {}s",
			self.channels.len(),
			elapsed.as_secs_f64()
		);
	}

	/// Notes an HTLC of `amount_msat` we committed over the channel in `direction`. The channel
	/// stays busy until every committed HTLC is resolved with [`Self::remove_htlc`].
	pub fn commit_htlc(
		&mut self, short_channel_id: u64, direction: Direction, amount_msat: u64,
	) -> Result<(), BeliefError> {
		let htlcs = &mut self.channel_mut(short_channel_id)?.inflight[direction.index()];
		htlcs.num_htlcs = htlcs.num_htlcs.saturating_add(1);
		htlcs.total_msat = htlcs.total_msat.saturating_add(amount_msat);
		Ok(())
	}

	/// Resolves an HTLC previously noted with [`Self::commit_htlc`].
	pub fn remove_htlc(
		&mut self, short_channel_id: u64, direction: Direction, amount_msat: u64,
	) -> Result<(), BeliefError> {
		let htlcs = &mut self.channel_mut(short_channel_id)?.inflight[direction.index()];
		if htlcs.num_htlcs == 0 || htlcs.total_msat < amount_msat {
			return Err(BeliefError::NoInflightHtlc { short_channel_id });
		}
		htlcs.num_htlcs -= 1;
		htlcs.total_msat -= amount_msat;
		Ok(())
	}

	/// Whether we have committed, unresolved HTLCs over the channel. Unknown channels are not
	/// busy.
	pub fn is_busy(&self, short_channel_id: u64) -> bool {
		self.channels.get(&short_channel_id).map_or(false, |belief| belief.is_busy())
	}

	/// Stops tracking a channel. Busy channels are refused rather than skipped, check
	/// [`Self::is_busy`] first.
	pub fn remove(&mut self, short_channel_id: u64) -> Result<ChannelLiquidityBelief, BeliefError> {
		match self.channels.entry(short_channel_id) {
			hash_map::Entry::Vacant(_) => Err(BeliefError::NotFound { short_channel_id }),
			hash_map::Entry::Occupied(entry) => {
				if entry.get().is_busy() {
					return Err(BeliefError::StillBusy { short_channel_id });
				}
				Ok(entry.remove())
			},
		}
	}

	/// Checks every belief against the store invariants.
	///
	/// This is a diagnostic for tests and debugging. No mutation path relies on it.
	pub fn check_invariants(&self) -> Result<(), BeliefError> {
		let mut short_channel_ids: Vec<u64> = self
			.channels
			.iter()
			.filter(|(_, belief)| !belief.satisfies_invariants())
			.map(|(scid, _)| *scid)
			.collect();
		if short_channel_ids.is_empty() {
			return Ok(());
		}
		short_channel_ids.sort_unstable();
		Err(BeliefError::InvariantViolation { short_channel_ids })
	}

	/// Dump the contents of this store into the configured logger.
	///
	/// Note that this writes one line per channel, which may be a substantial amount of log
	/// output.
	pub fn debug_log_liquidity_stats(&self) {
		for (scid, belief) in self.channels.iter() {
			let one_to_two = belief.bounds(Direction::OneToTwo);
			let two_to_one = belief.bounds(Direction::TwoToOne);
			let unknown =
				if let ChannelCapacity::Unknown = belief.capacity() { ", unknown" } else { "" };
			log_debug!(
				self.logger,
				"Liquidity of {} (capacity {} msat{}) is in the range ({}, {}) one-to-two and ({}, {}) two-to-one{}",
				log_scid!(*scid),
				belief.capacity_msat(),
				unknown,
				one_to_two.min_liquidity_msat,
				one_to_two.max_liquidity_msat,
				two_to_one.min_liquidity_msat,
				two_to_one.max_liquidity_msat,
				if belief.is_busy() { ", busy" } else { "" }
			);
		}
	}
}

fn check_fraction(fraction: f64) -> Result<(), BeliefError> {
	if fraction > 0.0 && fraction <= 1.0 {
		Ok(())
	} else {
		Err(BeliefError::InvalidFraction)
	}
}
