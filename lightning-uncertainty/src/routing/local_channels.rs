// This file is Copyright its original authors, visible in version control
// history.
//
// This file is licensed under the Apache License, Version 2.0 <LICENSE-APACHE
// or http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your option.
// You may not use this file except in accordance with one or both of these
// licenses.

//! Ingestion of the authoritative state of our own channels, as reported by our node in the
//! `listpeerchannels` format.
//!
//! Our own channels are the only ones whose balance we actually know. Usable channels get an
//! exact belief, unusable ones are excluded from the payment session through a
//! [`ChannelExclusionSink`].

use crate::routing::topology::{ChannelPolicy, NodeId, RoutingFees, TopologyOverlay};
use crate::routing::uncertainty::{BeliefError, ChannelCapacity, Direction, LiquidityBeliefStore};
use crate::util::hash_tables::{new_hash_map, HashMap};
use crate::util::logger::{Level, Logger, WithChannel};
use crate::util::scid_utils;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use core::fmt;
use core::ops::Deref;
use core::str::FromStr;

/// Channel states in which a channel can carry new HTLCs.
pub const USABLE_CHANNEL_STATES: [&str; 2] = ["CHANNELD_NORMAL", "CHANNELD_AWAITING_SPLICE"];

/// Receives channels which must not be used for the rest of the payment session.
pub trait ChannelExclusionSink {
	/// Excludes the channel from routing. `level` is the severity the exclusion is reported with.
	fn disable_channel(&mut self, short_channel_id: u64, level: Level, reason: String);
}

/// Why a channel was disabled in [`DisabledChannels`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DisabledChannel {
	/// The severity the exclusion was reported with.
	pub level: Level,
	/// A human-readable reason.
	pub reason: String,
}

/// A [`ChannelExclusionSink`] which remembers every excluded channel. A channel disabled twice
/// keeps the latest reason.
#[derive(Clone, Debug, Default)]
pub struct DisabledChannels {
	channels: HashMap<u64, DisabledChannel>,
}

impl DisabledChannels {
	/// Creates an empty set.
	pub fn new() -> Self {
		DisabledChannels { channels: new_hash_map() }
	}

	/// Whether the channel was disabled.
	pub fn is_disabled(&self, short_channel_id: u64) -> bool {
		self.channels.contains_key(&short_channel_id)
	}

	/// Returns why the channel was disabled, if it was.
	pub fn get(&self, short_channel_id: u64) -> Option<&DisabledChannel> {
		self.channels.get(&short_channel_id)
	}

	/// The number of disabled channels.
	pub fn len(&self) -> usize {
		self.channels.len()
	}

	/// Whether no channel was disabled.
	pub fn is_empty(&self) -> bool {
		self.channels.is_empty()
	}
}

impl ChannelExclusionSink for DisabledChannels {
	fn disable_channel(&mut self, short_channel_id: u64, level: Level, reason: String) {
		self.channels.insert(short_channel_id, DisabledChannel { level, reason });
	}
}

/// An error which occurred while ingesting a peer channels report.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PeerChannelsError {
	/// The report, or one of its channel records, lacks a required field or has one of the
	/// wrong form.
	MalformedInput(String),
	/// The store refused an update.
	Belief(BeliefError),
}

impl fmt::Display for PeerChannelsError {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::MalformedInput(e) => write!(f, "Malformed peer channels report: {}", e),
			Self::Belief(e) => write!(f, "Failed to update liquidity beliefs: {}", e),
		}
	}
}

impl std::error::Error for PeerChannelsError {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match self {
			Self::Belief(e) => Some(e),
			_ => None,
		}
	}
}

impl From<BeliefError> for PeerChannelsError {
	fn from(e: BeliefError) -> Self {
		Self::Belief(e)
	}
}

/// One of our channels to a connected peer, validated out of a peer channels report.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct LocalChannelRecord {
	/// The direction from us to the peer.
	#[serde(deserialize_with = "deserialize_direction")]
	pub direction: Direction,
	/// The channel state as reported by our node, e.g. `CHANNELD_NORMAL`.
	pub state: String,
	/// What we can currently send over the channel.
	#[serde(deserialize_with = "deserialize_msat")]
	pub spendable_msat: u64,
	/// The channel capacity.
	#[serde(deserialize_with = "deserialize_msat")]
	pub total_msat: u64,
	/// The peer at the other end of the channel.
	#[serde(rename = "peer_id", deserialize_with = "deserialize_node_id")]
	pub peer_node_id: NodeId,
}

impl LocalChannelRecord {
	/// Whether the channel is in a state which can carry new HTLCs.
	pub fn is_usable(&self) -> bool {
		USABLE_CHANNEL_STATES.contains(&self.state.as_str())
	}
}

/// A channel record of a peer channels report.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PeerChannelRecord {
	/// The channel is still being opened and has no short channel id yet.
	Opening,
	/// The peer is not connected, so the channel cannot be used.
	PeerDisconnected {
		/// The channel in question.
		short_channel_id: u64,
	},
	/// The peer is connected.
	PeerConnected {
		/// The channel in question.
		short_channel_id: u64,
		/// What the report says about it.
		channel: LocalChannelRecord,
	},
}

impl PeerChannelRecord {
	/// Validates a single channel record.
	///
	/// Only the short channel id and `peer_connected` are required of channels whose peer is
	/// disconnected. Every other field is required once the peer is connected.
	pub fn from_json(record: &Value) -> Result<Self, PeerChannelsError> {
		let short_channel_id = match record.get("short_channel_id") {
			None => return Ok(PeerChannelRecord::Opening),
			Some(scid) => {
				let scid = scid.as_str()
					.ok_or_else(|| malformed("short_channel_id is not a string"))?;
				scid_utils::scid_from_str(scid)
					.map_err(|e| malformed(format!("short_channel_id {}: {}", scid, e)))?
			},
		};
		let peer_connected = record.get("peer_connected")
			.and_then(Value::as_bool)
			.ok_or_else(|| {
				let scid = log_scid!(short_channel_id);
				malformed(format!("channel {} lacks a peer_connected flag", scid))
			})?;
		if !peer_connected {
			return Ok(PeerChannelRecord::PeerDisconnected { short_channel_id });
		}
		let channel = LocalChannelRecord::deserialize(record)
			.map_err(|e| malformed(format!("channel {}: {}", log_scid!(short_channel_id), e)))?;
		Ok(PeerChannelRecord::PeerConnected { short_channel_id, channel })
	}
}

fn malformed<S: Into<String>>(reason: S) -> PeerChannelsError {
	PeerChannelsError::MalformedInput(reason.into())
}

fn deserialize_msat<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
	#[derive(Deserialize)]
	#[serde(untagged)]
	enum Msat {
		Number(u64),
		Text(String),
	}
	match Msat::deserialize(deserializer)? {
		Msat::Number(msat) => Ok(msat),
		Msat::Text(text) => text.strip_suffix("msat")
			.filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
			.and_then(|digits| digits.parse().ok())
			.ok_or_else(|| D::Error::custom(format!("invalid msat amount {:?}", text))),
	}
}

fn deserialize_direction<'de, D: Deserializer<'de>>(
	deserializer: D,
) -> Result<Direction, D::Error> {
	let index = u64::deserialize(deserializer)?;
	Direction::from_index(index)
		.ok_or_else(|| D::Error::custom(format!("invalid direction {}", index)))
}

fn deserialize_node_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NodeId, D::Error> {
	let hex = String::deserialize(deserializer)?;
	NodeId::from_str(&hex).map_err(|e| D::Error::custom(format!("invalid node id {}: {}", hex, e)))
}

/// What [`LiquidityBeliefStore::update_from_peer_channels`] did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IngestSummary {
	/// Channels whose belief was set to their reported spendable amount.
	pub updated: usize,
	/// Of the updated channels, those which had no belief before.
	pub created: usize,
	/// Channels excluded from the session.
	pub excluded: usize,
	/// Records skipped because the channel is still opening.
	pub skipped_opening: usize,
}

impl<L: Deref> LiquidityBeliefStore<L>
where
	L::Target: Logger,
{
	/// Overwrites the beliefs about our own channels with what our node reports about them.
	///
	/// `report` is a `listpeerchannels` response: an object whose `channels` member lists one
	/// record per channel. Records are processed in order:
	///  * a channel without a short channel id is still opening and is skipped,
	///  * a channel whose peer is disconnected, or which is not in one of the
	///    [`USABLE_CHANNEL_STATES`], is passed to `exclusions`,
	///  * any other channel gets an exact belief in its direction. Its spendable amount is reduced
	///    by [`UncertaintyConfig::local_fee_headroom_msat`] of `payment_amount_msat` to leave room
	///    for fees. The overlay gets a permissive, fee-free policy for that direction and, if the
	///    channel had no belief yet, the channel itself from `our_node_id` to the peer.
	///
	/// A report with an `error` member or without `channels`, or any malformed record, fails
	/// with [`PeerChannelsError::MalformedInput`]. Processing stops at the malformed record and
	/// updates made for the records before it are kept. Callers needing all-or-nothing semantics
	/// should validate the records with [`PeerChannelRecord::from_json`] first.
	///
	/// [`UncertaintyConfig::local_fee_headroom_msat`]: crate::util::config::UncertaintyConfig::local_fee_headroom_msat
	pub fn update_from_peer_channels<O, S>(
		&mut self, overlay: &mut O, exclusions: &mut S, our_node_id: &NodeId,
		payment_amount_msat: u64, report: &Value,
	) -> Result<IngestSummary, PeerChannelsError>
	where
		O: TopologyOverlay + ?Sized,
		S: ChannelExclusionSink + ?Sized,
	{
		if report.get("error").is_some() {
			return Err(malformed("report is an error response"));
		}
		let records = report.get("channels")
			.and_then(Value::as_array)
			.ok_or_else(|| malformed("report lacks a channels array"))?;

		let mut summary = IngestSummary::default();
		for record in records {
			match PeerChannelRecord::from_json(record)? {
				PeerChannelRecord::Opening => {
					log_debug!(
						self.logger(),
						"Skipping a channel without a short channel id, it is still opening"
					);
					summary.skipped_opening += 1;
				},
				PeerChannelRecord::PeerDisconnected { short_channel_id } => {
					let reason = "peer disconnected".to_owned();
					self.exclude_channel(&mut *exclusions, short_channel_id, reason);
					summary.excluded += 1;
				},
				PeerChannelRecord::PeerConnected { short_channel_id, channel }
					if !channel.is_usable() =>
				{
					let reason = format!("channel in state {}", channel.state);
					self.exclude_channel(&mut *exclusions, short_channel_id, reason);
					summary.excluded += 1;
				},
				PeerChannelRecord::PeerConnected { short_channel_id, channel } => {
					let created = self.apply_local_channel(
						&mut *overlay,
						our_node_id,
						payment_amount_msat,
						short_channel_id,
						&channel,
					)?;
					if created {
						summary.created += 1;
					}
					summary.updated += 1;
				},
			}
		}
		log_debug!(
			self.logger(),
			"Ingested peer channels: {} updated ({} new), {} excluded, {} still opening",
			summary.updated,
			summary.created,
			summary.excluded,
			summary.skipped_opening
		);
		Ok(summary)
	}

	/// Parses `report` as JSON and passes it to [`Self::update_from_peer_channels`].
	pub fn update_from_peer_channels_json<O, S>(
		&mut self, overlay: &mut O, exclusions: &mut S, our_node_id: &NodeId,
		payment_amount_msat: u64, report: &str,
	) -> Result<IngestSummary, PeerChannelsError>
	where
		O: TopologyOverlay + ?Sized,
		S: ChannelExclusionSink + ?Sized,
	{
		let report: Value =
			serde_json::from_str(report).map_err(|e| malformed(format!("invalid JSON: {}", e)))?;
		self.update_from_peer_channels(
			overlay,
			exclusions,
			our_node_id,
			payment_amount_msat,
			&report,
		)
	}

	fn exclude_channel<S: ChannelExclusionSink + ?Sized>(
		&self, exclusions: &mut S, short_channel_id: u64, reason: String,
	) {
		let logger = WithChannel::from(self.logger(), short_channel_id);
		log_given_level!(
			logger,
			Level::Debug,
			"Excluding channel from the payment session: {}",
			reason
		);
		exclusions.disable_channel(short_channel_id, Level::Debug, reason);
	}

	/// Returns whether a belief had to be created.
	fn apply_local_channel<O: TopologyOverlay + ?Sized>(
		&mut self, overlay: &mut O, our_node_id: &NodeId, payment_amount_msat: u64,
		short_channel_id: u64, channel: &LocalChannelRecord,
	) -> Result<bool, BeliefError> {
		let created = !self.contains(short_channel_id);
		if created {
			let capacity_msat = channel.total_msat;
			self.create(short_channel_id, ChannelCapacity::Known { capacity_msat })?;
			let peer_node_id = channel.peer_node_id;
			overlay.add_channel(short_channel_id, *our_node_id, peer_node_id, capacity_msat);
		}
		overlay.update_channel_policy(short_channel_id, channel.direction,
			ChannelPolicy::permissive(channel.total_msat, RoutingFees::default(), 0));

		let headroom_msat = self.config().local_fee_headroom_msat(payment_amount_msat);
		let spendable_msat = channel.spendable_msat.saturating_sub(headroom_msat);
		self.set_exact(short_channel_id, channel.direction, spendable_msat)?;

		let logger = WithChannel::from(self.logger(), short_channel_id);
		log_trace!(
			logger,
			"Local channel can send exactly {} msat ({} msat reported, {} msat fee headroom)",
			spendable_msat,
			channel.spendable_msat,
			headroom_msat
		);
		Ok(created)
	}
}
