// This file is Copyright its original authors, visible in version control
// history.
//
// This file is licensed under the Apache License, Version 2.0 <LICENSE-APACHE
// or http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your option.
// You may not use this file except in accordance with one or both of these
// licenses.

//! Packing and parsing of `short_channel_id`s.
//!
//! Channel ids are carried around as `u64`s everywhere in this crate. Node software usually
//! prints them in their `BLOCKxTXxOUT` form, which [`scid_from_str`] accepts.

use core::fmt;

/// Maximum block height that can be used in a `short_channel_id`. This
/// value is based on the 3-bytes available for block height.
pub const MAX_SCID_BLOCK: u64 = 0x00ffffff;

/// Maximum transaction index that can be used in a `short_channel_id`.
/// This value is based on the 3-bytes available for tx index.
pub const MAX_SCID_TX_INDEX: u64 = 0x00ffffff;

/// Maximum vout index that can be used in a `short_channel_id`. This
/// value is based on the 2-bytes available for the vout index.
pub const MAX_SCID_VOUT_INDEX: u64 = 0xffff;

/// A `short_channel_id` construction error
#[derive(Debug, PartialEq, Eq)]
pub enum ShortChannelIdError {
	/// The block height does not fit in 3 bytes.
	BlockOverflow,
	/// The transaction index does not fit in 3 bytes.
	TxIndexOverflow,
	/// The output index does not fit in 2 bytes.
	VoutIndexOverflow,
	/// The text is not of the form `BLOCKxTXxOUT`.
	InvalidFormat,
}

impl fmt::Display for ShortChannelIdError {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match *self {
			Self::BlockOverflow => write!(f, "block height overflows short channel id"),
			Self::TxIndexOverflow => write!(f, "transaction index overflows short channel id"),
			Self::VoutIndexOverflow => write!(f, "output index overflows short channel id"),
			Self::InvalidFormat => write!(f, "short channel id is not of the form BLOCKxTXxOUT"),
		}
	}
}

impl std::error::Error for ShortChannelIdError {}

/// Extracts the block height (most significant 3-bytes) from the `short_channel_id`
pub fn block_from_scid(short_channel_id: u64) -> u32 {
	(short_channel_id >> 40) as u32
}

/// Extracts the tx index (bytes [2..4]) from the `short_channel_id`
pub fn tx_index_from_scid(short_channel_id: u64) -> u32 {
	((short_channel_id >> 16) & MAX_SCID_TX_INDEX) as u32
}

/// Extracts the vout (bytes [0..2]) from the `short_channel_id`
pub fn vout_from_scid(short_channel_id: u64) -> u16 {
	(short_channel_id & MAX_SCID_VOUT_INDEX) as u16
}

/// Constructs a `short_channel_id` using the components pieces. Results in an error
/// if the block height, tx index, or vout index overflow the maximum sizes.
pub fn scid_from_parts(block: u64, tx_index: u64, vout_index: u64) -> Result<u64, ShortChannelIdError> {
	if block > MAX_SCID_BLOCK {
		return Err(ShortChannelIdError::BlockOverflow);
	}

	if tx_index > MAX_SCID_TX_INDEX {
		return Err(ShortChannelIdError::TxIndexOverflow);
	}

	if vout_index > MAX_SCID_VOUT_INDEX {
		return Err(ShortChannelIdError::VoutIndexOverflow);
	}

	Ok((block << 40) | (tx_index << 16) | vout_index)
}

/// Parses a `short_channel_id` given as `BLOCKxTXxOUT`, e.g. `103x1x0`.
pub fn scid_from_str(s: &str) -> Result<u64, ShortChannelIdError> {
	let mut parts = s.split('x');
	let mut next_part = || -> Result<u64, ShortChannelIdError> {
		let part = parts.next().ok_or(ShortChannelIdError::InvalidFormat)?;
		if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
			return Err(ShortChannelIdError::InvalidFormat);
		}
		part.parse::<u64>().map_err(|_| ShortChannelIdError::InvalidFormat)
	};
	let block = next_part()?;
	let tx_index = next_part()?;
	let vout_index = next_part()?;
	if parts.next().is_some() {
		return Err(ShortChannelIdError::InvalidFormat);
	}
	scid_from_parts(block, tx_index, vout_index)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_block_from_scid() {
		assert_eq!(block_from_scid(0x000000_000000_0000), 0);
		assert_eq!(block_from_scid(0x000001_000000_0000), 1);
		assert_eq!(block_from_scid(0x000001_ffffff_ffff), 1);
		assert_eq!(block_from_scid(0xffffff_ffffff_ffff), 0xffffff);
	}

	#[test]
	fn test_tx_index_and_vout_from_scid() {
		assert_eq!(tx_index_from_scid(0xffffff_000001_ffff), 1);
		assert_eq!(tx_index_from_scid(0xffffff_800000_ffff), 0x800000);
		assert_eq!(vout_from_scid(0xffffff_ffffff_0001), 1);
		assert_eq!(vout_from_scid(0xffffff_ffffff_8000), 0x8000);
	}

	#[test]
	fn test_scid_from_parts() {
		assert_eq!(scid_from_parts(0x00000001, 0x00000002, 0x0003).unwrap(), 0x000001_000002_0003);
		assert_eq!(scid_from_parts(0x00ffffff, 0x00ffffff, 0xffff).unwrap(), 0xffffff_ffffff_ffff);
		assert_eq!(scid_from_parts(0x01ffffff, 0x00000000, 0x0000).err().unwrap(), ShortChannelIdError::BlockOverflow);
		assert_eq!(scid_from_parts(0x00000000, 0x01ffffff, 0x0000).err().unwrap(), ShortChannelIdError::TxIndexOverflow);
		assert_eq!(scid_from_parts(0x00000000, 0x00000000, 0x010000).err().unwrap(), ShortChannelIdError::VoutIndexOverflow);
	}

	#[test]
	fn test_scid_from_str() {
		assert_eq!(scid_from_str("1x2x3").unwrap(), 0x000001_000002_0003);
		assert_eq!(scid_from_str("103x1x0").unwrap(), scid_from_parts(103, 1, 0).unwrap());
		assert_eq!(scid_from_str("16777216x0x0"), Err(ShortChannelIdError::BlockOverflow));
		assert_eq!(scid_from_str("1x2"), Err(ShortChannelIdError::InvalidFormat));
		assert_eq!(scid_from_str("1x2x3x4"), Err(ShortChannelIdError::InvalidFormat));
		assert_eq!(scid_from_str("1x-2x3"), Err(ShortChannelIdError::InvalidFormat));
		assert_eq!(scid_from_str(""), Err(ShortChannelIdError::InvalidFormat));
	}

	#[test]
	fn test_scid_display_round_trips_through_log_form() {
		let scid = scid_from_parts(700_000, 1234, 1).unwrap();
		assert_eq!(format!("{}", log_scid!(scid)), "700000x1234x1");
	}
}
