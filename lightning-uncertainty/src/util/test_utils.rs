// This file is Copyright its original authors, visible in version control
// history.
//
// This file is licensed under the Apache License, Version 2.0 <LICENSE-APACHE
// or http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your option.
// You may not use this file except in accordance with one or both of these
// licenses.

use crate::routing::topology::NodeId;
use crate::util::hash_tables::{new_hash_map, HashMap};
use crate::util::logger::{Level, Logger, Record};

use bitcoin::secp256k1::{PublicKey, Secp256k1, SecretKey};

use std::sync::Mutex;

pub struct TestLogger {
	level: Level,
	id: String,
	pub lines: Mutex<HashMap<(String, String), usize>>,
	last_short_channel_id: Mutex<Option<u64>>,
}

impl TestLogger {
	pub fn new() -> TestLogger {
		Self::with_id("".to_owned())
	}
	pub fn with_id(id: String) -> TestLogger {
		TestLogger {
			level: Level::Trace,
			id,
			lines: Mutex::new(new_hash_map()),
			last_short_channel_id: Mutex::new(None),
		}
	}
	/// Search for the number of occurrence of the logged lines which
	/// 1. belongs to the specified module and
	/// 2. contains `line` in it.
	/// And asserts if the number of occurrences is the same with the given `count`
	pub fn assert_log_contains(&self, module: &str, line: &str, count: usize) {
		let log_entries = self.lines.lock().unwrap();
		let l: usize = log_entries
			.iter()
			.filter(|&(&(ref m, ref l), _c)| m == module && l.contains(line))
			.map(|(_, c)| c)
			.sum();
		assert_eq!(l, count)
	}

	pub fn last_short_channel_id(&self) -> Option<u64> {
		*self.last_short_channel_id.lock().unwrap()
	}
}

impl Logger for TestLogger {
	fn log(&self, record: Record) {
		*self
			.lines
			.lock()
			.unwrap()
			.entry((record.module_path.to_string(), format!("{}", record.args)))
			.or_insert(0) += 1;
		if record.short_channel_id.is_some() {
			*self.last_short_channel_id.lock().unwrap() = record.short_channel_id;
		}
		if record.level >= self.level {
			println!("{:<5} {} [{} : {}, {}] {}", record.level.to_string(), self.id, record.module_path, record.file, record.line, record.args);
		}
	}
}

/// A public key derived from a secret key made of `byte` repeated. `byte` must be non-zero.
pub fn pubkey(byte: u8) -> PublicKey {
	let secp_ctx = Secp256k1::signing_only();
	PublicKey::from_secret_key(&secp_ctx, &SecretKey::from_slice(&[byte; 32]).unwrap())
}

pub fn node_id(byte: u8) -> NodeId {
	NodeId::from_pubkey(&pubkey(byte))
}

/// Returns the node ids for `a` and `b` ordered so the first one sorts lower.
pub fn ordered_node_ids(a: u8, b: u8) -> (NodeId, NodeId) {
	let (x, y) = (node_id(a), node_id(b));
	if x < y { (x, y) } else { (y, x) }
}
