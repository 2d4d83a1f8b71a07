// This file is Copyright its original authors, visible in version control
// history.
//
// This file is licensed under the Apache License, Version 2.0 <LICENSE-APACHE
// or http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your option.
// You may not use this file except in accordance with one or both of these
// licenses.

#![crate_name = "lightning_uncertainty"]

//! Tracks what a multi-part payment sender believes about the liquidity of the channels it may
//! route through.
//!
//! Nobody but the two counterparties of a channel knows how its capacity is split between them.
//! The [`LiquidityBeliefStore`] instead keeps, for every channel and each of its directions, an
//! interval the spendable amount is known to lie in. It is fed from several sources:
//!
//!  * [`LiquidityBeliefStore::sync_with_topology`] follows the advertised network,
//!  * [`LiquidityBeliefStore::add_route_hints`] adds private channels near the payee,
//!  * [`LiquidityBeliefStore::record_full_success`] and
//!    [`LiquidityBeliefStore::record_partial_failure`] learn from payment attempts,
//!  * [`LiquidityBeliefStore::update_from_peer_channels`] reads the exact balances of our own
//!    channels,
//!  * [`LiquidityBeliefStore::time_passed`] lets old knowledge fade.
//!
//! Path finding itself is left to the caller, which reads the intervals through
//! [`LiquidityBeliefStore::liquidity_range`].
//!
//! [`LiquidityBeliefStore`]: routing::uncertainty::LiquidityBeliefStore
//! [`LiquidityBeliefStore::sync_with_topology`]: routing::uncertainty::LiquidityBeliefStore::sync_with_topology
//! [`LiquidityBeliefStore::add_route_hints`]: routing::uncertainty::LiquidityBeliefStore::add_route_hints
//! [`LiquidityBeliefStore::record_full_success`]: routing::uncertainty::LiquidityBeliefStore::record_full_success
//! [`LiquidityBeliefStore::record_partial_failure`]: routing::uncertainty::LiquidityBeliefStore::record_partial_failure
//! [`LiquidityBeliefStore::update_from_peer_channels`]: routing::uncertainty::LiquidityBeliefStore::update_from_peer_channels
//! [`LiquidityBeliefStore::time_passed`]: routing::uncertainty::LiquidityBeliefStore::time_passed
//! [`LiquidityBeliefStore::liquidity_range`]: routing::uncertainty::LiquidityBeliefStore::liquidity_range

#![deny(missing_docs)]
#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub extern crate bitcoin;

#[macro_use]
pub mod util;
pub mod routing;
