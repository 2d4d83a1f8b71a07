// This file is Copyright its original authors, visible in version control
// history.
//
// This file is licensed under the Apache License, Version 2.0 <LICENSE-APACHE
// or http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your option.
// You may not use this file except in accordance with one or both of these
// licenses.

//! The [`Logger`] trait the belief store reports through, and the [`Record`]s it is handed.
//!
//! There is no global logger. Every store is given one at construction and filtering by
//! [`Level`] is left to the implementation, on top of the `max_level_*` compile-time ceilings.

use core::cmp;
use core::fmt;
use core::ops::Deref;

use crate::util::macro_logger::DebugScid;

static LOG_LEVEL_NAMES: [&'static str; 5] = ["TRACE", "DEBUG", "INFO", "WARN", "ERROR"];

/// An enum representing the available verbosity levels of the logger.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum Level {
	/// Per-channel detail, such as every bound touched by an update
	Trace,
	/// Summaries of bulk operations and ignored inputs
	Debug,
	/// Noteworthy events
	Info,
	/// Inputs which look wrong but could be handled
	Warn,
	/// Inconsistent data which aborts an operation
	Error,
}

impl PartialOrd for Level {
	#[inline]
	fn partial_cmp(&self, other: &Level) -> Option<cmp::Ordering> {
		Some(self.cmp(other))
	}
}

impl Ord for Level {
	#[inline]
	fn cmp(&self, other: &Level) -> cmp::Ordering {
		(*self as usize).cmp(&(*other as usize))
	}
}

impl fmt::Display for Level {
	fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
		fmt.pad(LOG_LEVEL_NAMES[*self as usize])
	}
}

impl Level {
	/// Returns the most verbose logging level.
	#[inline]
	pub fn max() -> Level {
		Level::Trace
	}
}

/// A single log line along with where it was logged from and the channel it concerns.
#[derive(Clone, Debug)]
pub struct Record<'a> {
	/// The verbosity level of the message.
	pub level: Level,
	/// The short channel id of the channel pertaining to the logged record, if any. Since it is
	/// not repeated in the message body, include it in the log output so entries remain clear.
	pub short_channel_id: Option<u64>,
	/// The message body.
	pub args: fmt::Arguments<'a>,
	/// The module path of the message.
	pub module_path: &'static str,
	/// The source file containing the message.
	pub file: &'static str,
	/// The line containing the message.
	pub line: u32,
}

impl<'a> Record<'a> {
	/// Returns a new Record.
	#[inline]
	pub fn new(
		level: Level, short_channel_id: Option<u64>, args: fmt::Arguments<'a>,
		module_path: &'static str, file: &'static str, line: u32,
	) -> Record<'a> {
		Record { level, short_channel_id, args, module_path, file, line }
	}
}

impl<'a> fmt::Display for Record<'a> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{:<5} [{}:{}]", self.level, self.module_path, self.line)?;
		if let Some(scid) = self.short_channel_id {
			write!(f, " ch:{}", DebugScid(scid))?;
		}
		write!(f, " {}", self.args)
	}
}

/// A trait encapsulating the operations required of a logger.
pub trait Logger {
	/// Logs the [`Record`]. Since [`Record::short_channel_id`] is not embedded in the message
	/// body, log implementations should print it alongside the message to keep entries clear.
	fn log(&self, record: Record);
}

/// Adds a channel context to a [`Record`] before passing it to the wrapped [`Logger`].
pub struct WithChannel<'a, L: Deref>
where
	L::Target: Logger,
{
	logger: &'a L,
	short_channel_id: u64,
}

impl<'a, L: Deref> Logger for WithChannel<'a, L>
where
	L::Target: Logger,
{
	fn log(&self, mut record: Record) {
		if record.short_channel_id.is_none() {
			record.short_channel_id = Some(self.short_channel_id);
		}
		self.logger.log(record)
	}
}

impl<'a, L: Deref> WithChannel<'a, L>
where
	L::Target: Logger,
{
	/// Wraps the given logger, attaching `short_channel_id` to every record which lacks one.
	pub fn from(logger: &'a L, short_channel_id: u64) -> Self {
		WithChannel { logger, short_channel_id }
	}
}
