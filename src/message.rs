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

//! The Identify message: the structured record carried by a single wire frame.

use multiaddr::Multiaddr;

use crate::proto;

/// A decoded Identify / Identify-Push message. All fields are optional on
/// the wire; absence is meaningful (§3, §4.1 "legacy mode").
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentifyMessage {
	/// e.g. `"ipfs/1.0.0"`.
	pub protocol_version: Option<String>,
	/// e.g. `"sc-identify/0.1.0"`.
	pub agent_version: Option<String>,
	/// Raw bytes of the sender's public key (protobuf `PublicKey` encoding).
	pub public_key: Option<Vec<u8>>,
	/// Addresses the sender listens on. Unparseable entries are *not* dropped
	/// here; that filtering happens in the reconciler (§4.1 edge cases).
	pub listen_addrs: Vec<Vec<u8>>,
	/// How the sender observed the receiver, as raw multiaddr bytes.
	pub observed_addr: Option<Vec<u8>>,
	/// Application protocols the sender supports.
	pub protocols: Vec<String>,
	/// Opaque signed envelope bytes wrapping a peer record.
	pub signed_peer_record: Option<Vec<u8>>,
}

impl IdentifyMessage {
	/// Encodes `listen_addrs` as a list of raw multiaddr byte strings, keeping
	/// only the entries that actually are multiaddrs.
	pub fn with_listen_addrs(mut self, addrs: impl IntoIterator<Item = Multiaddr>) -> Self {
		self.listen_addrs = addrs.into_iter().map(|addr| addr.to_vec()).collect();
		self
	}

	/// Parses `listen_addrs`, silently skipping any entry that fails to parse
	/// as a multiaddr (§4.1: "If `listen_addrs` contains an unparseable entry,
	/// skip only that entry").
	pub fn parsed_listen_addrs(&self) -> Vec<Multiaddr> {
		self
			.listen_addrs
			.iter()
			.filter_map(|raw| Multiaddr::try_from(raw.clone()).ok())
			.collect()
	}

	/// Parses `observed_addr`, returning `None` on any failure rather than
	/// propagating an error (§4.1: "parsed defensively").
	pub fn parsed_observed_addr(&self) -> Option<Multiaddr> {
		self.observed_addr.as_ref().and_then(|raw| Multiaddr::try_from(raw.clone()).ok())
	}
}

impl From<proto::Identify> for IdentifyMessage {
	fn from(msg: proto::Identify) -> Self {
		IdentifyMessage {
			protocol_version: msg.protocol_version,
			agent_version: msg.agent_version,
			public_key: msg.public_key,
			listen_addrs: msg.listen_addrs,
			observed_addr: msg.observed_addr,
			protocols: msg.protocols,
			signed_peer_record: msg.signed_peer_record,
		}
	}
}

impl From<IdentifyMessage> for proto::Identify {
	fn from(msg: IdentifyMessage) -> Self {
		proto::Identify {
			protocol_version: msg.protocol_version,
			agent_version: msg.agent_version,
			public_key: msg.public_key,
			listen_addrs: msg.listen_addrs,
			observed_addr: msg.observed_addr,
			protocols: msg.protocols,
			signed_peer_record: msg.signed_peer_record,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn round_trips_through_proto() {
		let addr: Multiaddr = "/ip4/10.0.0.1/tcp/4001".parse().unwrap();
		let msg = IdentifyMessage {
			protocol_version: Some("ipfs/1.0.0".into()),
			agent_version: Some("sc-identify/0.1.0".into()),
			public_key: Some(vec![1, 2, 3]),
			listen_addrs: vec![addr.to_vec()],
			observed_addr: Some(addr.to_vec()),
			protocols: vec!["/chat/1".into(), "/ping/1".into()],
			signed_peer_record: Some(vec![9, 9, 9]),
		};

		let proto: proto::Identify = msg.clone().into();
		let back: IdentifyMessage = proto.into();
		assert_eq!(msg, back);
	}

	#[test]
	fn unparseable_listen_addr_is_skipped_not_errored() {
		let good: Multiaddr = "/ip4/10.0.0.1/tcp/4001".parse().unwrap();
		let msg = IdentifyMessage {
			listen_addrs: vec![good.to_vec(), vec![0xff, 0xff, 0xff]],
			..Default::default()
		};
		assert_eq!(msg.parsed_listen_addrs(), vec![good]);
	}

	#[test]
	fn unparseable_observed_addr_yields_none() {
		let msg = IdentifyMessage { observed_addr: Some(vec![0xff, 0xff]), ..Default::default() };
		assert_eq!(msg.parsed_observed_addr(), None);
	}
}
