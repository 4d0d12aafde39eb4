// This file is part of a fork of Substrate which has had various changes.

// Copyright (C) Parity Technologies (UK) Ltd.
// Copyright (C) 2022-2023 Luke Parker
// SPDX-License-Identifier: GPL-3.0-or-later WITH Classpath-exception-2.0

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.

// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Engine configuration.
//!
//! Follows `sc-network`'s convention of a plain option struct with a
//! `Default` impl, rather than a builder, see the `Params`/
//! `FullNetworkConfiguration` shapes referenced from `service.rs`.

use std::{borrow::Cow, time::Duration};

/// Version string embedded in the advertised Identify protocol name.
pub const IDENTIFY_VERSION: &str = "1.0.0";
/// Version string embedded in the advertised Identify-Push protocol name.
pub const PUSH_VERSION: &str = "1.0.0";

/// Default frame size cap, in bytes.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 8192;

/// Configuration for the Identify / Identify-Push engine.
#[derive(Debug, Clone)]
pub struct Config {
	/// First path segment of both protocol strings, e.g. `"ipfs"` yields
	/// `/ipfs/id/1.0.0` and `/ipfs/id/push/1.0.0`.
	pub protocol_prefix: Cow<'static, str>,
	/// Advertised `agent_version`, e.g. `"sc-identify/0.1.0"`.
	pub agent_version: String,
	/// Per-exchange deadline used when the caller supplies no cancellation token.
	pub timeout: Duration,
	/// Upper bound on a single Identify wire frame, in bytes.
	pub max_identify_message_size: usize,
	/// Cap on concurrent inbound identify substreams.
	pub max_inbound_streams: usize,
	/// Cap on concurrent outbound identify substreams.
	pub max_outbound_streams: usize,
	/// Cap on concurrent inbound push substreams.
	pub max_push_incoming_streams: usize,
	/// Cap on concurrent outbound push substreams.
	pub max_push_outgoing_streams: usize,
	/// Cap on the number of observed addresses retained by the address manager.
	pub max_observed_addresses: usize,
}

impl Default for Config {
	fn default() -> Self {
		Config {
			protocol_prefix: Cow::Borrowed("ipfs"),
			agent_version: format!("sc-identify/{}", env!("CARGO_PKG_VERSION")),
			timeout: Duration::from_secs(5),
			max_identify_message_size: DEFAULT_MAX_MESSAGE_SIZE,
			max_inbound_streams: 4,
			max_outbound_streams: 4,
			max_push_incoming_streams: 4,
			max_push_outgoing_streams: 4,
			max_observed_addresses: 4,
		}
	}
}

impl Config {
	/// Derives the two protocol strings advertised to the protocol-selection layer.
	pub fn protocol_names(&self) -> (String, String) {
		(
			format!("/{}/id/{}", self.protocol_prefix, IDENTIFY_VERSION),
			format!("/{}/id/push/{}", self.protocol_prefix, PUSH_VERSION),
		)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn default_protocol_names_use_ipfs_prefix() {
		let config = Config::default();
		let (identify, push) = config.protocol_names();
		assert_eq!(identify, "/ipfs/id/1.0.0");
		assert_eq!(push, "/ipfs/id/push/1.0.0");
	}

	#[test]
	fn custom_prefix_is_honored() {
		let mut config = Config::default();
		config.protocol_prefix = Cow::Borrowed("polkadot");
		let (identify, push) = config.protocol_names();
		assert_eq!(identify, "/polkadot/id/1.0.0");
		assert_eq!(push, "/polkadot/id/push/1.0.0");
	}
}
