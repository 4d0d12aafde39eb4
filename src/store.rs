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

//! Peer store and address manager contracts (§6).
//!
//! These mirror `sc-network`'s own split between `address_book`,
//! `proto_book`, and `metadata_book` (see `PeerStoreProvider` in
//! `substrate/client/network/src/mock.rs`, kept in this tree as reference):
//! one trait per concern, all taking `&self` so a real implementation can be
//! an actor or a `parking_lot::Mutex`-guarded map without the engine itself
//! needing to know which.

use std::collections::HashSet;

use libp2p_core::PeerRecord;
use libp2p_identity::PeerId;
use multiaddr::Multiaddr;

/// Metadata keys written by the reconciler (§4.4, step 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetadataKey {
	/// The remote's `agent_version` string.
	AgentVersion,
	/// The remote's `protocol_version` string.
	ProtocolVersion,
}

/// The address book, protocol book, metadata book, and envelope storage
/// consumed by the Store Reconciler (§4.4) and the responder (§4.1).
pub trait PeerStore: Send + Sync {
	/// Overwrites `peer`'s known listen addresses verbatim (the legacy path).
	fn set_addresses(&self, peer: PeerId, addrs: Vec<Multiaddr>);

	/// Current listen addresses on file for `peer`.
	fn addresses_of(&self, peer: PeerId) -> Vec<Multiaddr>;

	/// Offers a verified envelope to the store. Returns `true` if accepted
	/// (typically: its sequence number is strictly greater than any already
	/// stored for `peer`), in which case the envelope's addresses supersede
	/// `set_addresses` (§4.4, step 1).
	fn consume_peer_record(&self, peer: PeerId, record: PeerRecord) -> bool;

	/// The most recently accepted envelope for `peer`, if any.
	fn envelope_of(&self, peer: PeerId) -> Option<PeerRecord>;

	/// Overwrites `peer`'s supported application protocols.
	fn set_protocols(&self, peer: PeerId, protocols: HashSet<String>);

	/// Currently recorded protocol set for `peer`.
	fn protocols_of(&self, peer: PeerId) -> HashSet<String>;

	/// Writes a metadata value (agent/protocol version) for `peer`.
	fn set_metadata(&self, peer: PeerId, key: MetadataKey, value: Vec<u8>);

	/// Reads a previously written metadata value for `peer`.
	fn metadata(&self, peer: PeerId, key: MetadataKey) -> Option<Vec<u8>>;
}

/// The local listen/observed address registry (§6: `AddressManager`).
pub trait AddressManager: Send + Sync {
	/// Addresses the local node currently listens on.
	fn get_addresses(&self) -> Vec<Multiaddr>;

	/// Addresses at which remote peers have reported seeing the local node.
	fn get_observed_addrs(&self) -> Vec<Multiaddr>;

	/// Offers an observed address, subject to `max_observed_addresses`.
	/// Returns `true` if it was stored, `false` if the cap was already
	/// reached or the address was already present (P6).
	fn add_observed_addr(&self, addr: Multiaddr, max_observed_addresses: usize) -> bool;
}
