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

//! In-memory implementations of this crate's collaborator traits, for use in
//! tests, both this crate's own and downstream integration tests.
//!
//! Follows the convention of `sp_core::offchain::testing` and
//! `sp_keystore::testing`: an always-compiled `testing` module rather than a
//! `#[cfg(test)]`-gated one, so integration tests outside the crate can
//! depend on it too. Mirrors the shape of `sc-network`'s own
//! `src/mock.rs::MockPeerStore` (kept in this tree as reference), generalized
//! to all of the traits this crate defines rather than just `PeerStoreProvider`.

use std::{
	collections::{HashMap, HashSet},
	sync::Arc,
};

use libp2p_core::PeerRecord;
use libp2p_identity::PeerId;
use multiaddr::Multiaddr;
use parking_lot::Mutex;

use crate::{
	store::{AddressManager, MetadataKey, PeerStore},
	transport::{BoxSubstream, Connection, ConnectionManager, Executor},
	error::Error,
};

/// An in-memory [`PeerStore`] sufficient for exercising the reconciler and
/// engine without a real address/protocol/metadata book.
#[derive(Default)]
pub struct InMemoryPeerStore {
	addresses: Mutex<HashMap<PeerId, Vec<Multiaddr>>>,
	envelopes: Mutex<HashMap<PeerId, PeerRecord>>,
	protocols: Mutex<HashMap<PeerId, HashSet<String>>>,
	metadata: Mutex<HashMap<(PeerId, MetadataKey), Vec<u8>>>,
}

impl PeerStore for InMemoryPeerStore {
	fn set_addresses(&self, peer: PeerId, addrs: Vec<Multiaddr>) {
		self.addresses.lock().insert(peer, addrs);
	}

	fn addresses_of(&self, peer: PeerId) -> Vec<Multiaddr> {
		self.addresses.lock().get(&peer).cloned().unwrap_or_default()
	}

	fn consume_peer_record(&self, peer: PeerId, record: PeerRecord) -> bool {
		let mut envelopes = self.envelopes.lock();
		let accept = match envelopes.get(&peer) {
			Some(existing) => record.seq() > existing.seq(),
			None => true,
		};
		if accept {
			self.set_addresses(peer, record.addresses().to_vec());
			envelopes.insert(peer, record);
		}
		accept
	}

	fn envelope_of(&self, peer: PeerId) -> Option<PeerRecord> {
		self.envelopes.lock().get(&peer).cloned()
	}

	fn set_protocols(&self, peer: PeerId, protocols: HashSet<String>) {
		self.protocols.lock().insert(peer, protocols);
	}

	fn protocols_of(&self, peer: PeerId) -> HashSet<String> {
		self.protocols.lock().get(&peer).cloned().unwrap_or_default()
	}

	fn set_metadata(&self, peer: PeerId, key: MetadataKey, value: Vec<u8>) {
		self.metadata.lock().insert((peer, key), value);
	}

	fn metadata(&self, peer: PeerId, key: MetadataKey) -> Option<Vec<u8>> {
		self.metadata.lock().get(&(peer, key)).cloned()
	}
}

/// An in-memory [`AddressManager`] enforcing the observed-address cap (P6).
#[derive(Default)]
pub struct InMemoryAddressManager {
	listen: Mutex<Vec<Multiaddr>>,
	observed: Mutex<Vec<Multiaddr>>,
}

impl InMemoryAddressManager {
	/// Builds a manager pre-seeded with the given listen addresses.
	pub fn with_listen_addrs(addrs: Vec<Multiaddr>) -> Self {
		Self { listen: Mutex::new(addrs), observed: Mutex::new(Vec::new()) }
	}

	/// Replaces the listen address set, as if the local transport started
	/// listening on a different set of addresses.
	pub fn set_listen_addrs(&self, addrs: Vec<Multiaddr>) {
		*self.listen.lock() = addrs;
	}
}

impl AddressManager for InMemoryAddressManager {
	fn get_addresses(&self) -> Vec<Multiaddr> {
		self.listen.lock().clone()
	}

	fn get_observed_addrs(&self) -> Vec<Multiaddr> {
		self.observed.lock().clone()
	}

	fn add_observed_addr(&self, addr: Multiaddr, max_observed_addresses: usize) -> bool {
		let mut observed = self.observed.lock();
		if observed.contains(&addr) {
			return false;
		}
		if observed.len() >= max_observed_addresses {
			return false;
		}
		observed.push(addr);
		true
	}
}

/// An in-memory [`Connection`] backed by a pair of in-memory duplex
/// substreams supplied by the test.
pub struct MockConnection {
	/// The peer-id this connection claims to be bound to.
	pub remote_peer_id: PeerId,
	/// The address this connection reports as "how we see the remote".
	pub remote_address: Multiaddr,
	/// Substreams handed out by `open_substream`, one per call, in order.
	pub substreams: Mutex<Vec<BoxSubstream>>,
}

#[async_trait::async_trait]
impl Connection for MockConnection {
	fn remote_peer_id(&self) -> PeerId {
		self.remote_peer_id
	}

	fn remote_address(&self) -> Multiaddr {
		self.remote_address.clone()
	}

	async fn open_substream(&self, _protocol: String) -> Result<BoxSubstream, Error> {
		self.substreams.lock().pop().ok_or(Error::ConnectionEnded)
	}
}

/// A [`ConnectionManager`] returning a fixed, test-supplied connection set.
#[derive(Default)]
pub struct MockConnectionManager {
	connections: Mutex<Vec<Arc<dyn Connection>>>,
}

impl MockConnectionManager {
	/// Replaces the connection snapshot returned by `connections()`.
	pub fn set_connections(&self, connections: Vec<Arc<dyn Connection>>) {
		*self.connections.lock() = connections;
	}
}

impl ConnectionManager for MockConnectionManager {
	fn connections(&self) -> Vec<Arc<dyn Connection>> {
		self.connections.lock().clone()
	}
}

/// An [`Executor`] that runs spawned futures on the ambient `tokio` runtime.
#[derive(Default, Clone, Copy)]
pub struct TokioExecutor;

impl Executor for TokioExecutor {
	fn spawn(&self, future: futures::future::BoxFuture<'static, ()>) {
		tokio::spawn(future);
	}
}

/// A [`Registrar`] that records registrations and caps, for asserting P5
/// ("after `stop()`, neither protocol string is registered").
#[derive(Default)]
pub struct MockRegistrar {
	registered: Mutex<HashMap<String, (usize, usize)>>,
}

impl MockRegistrar {
	/// Whether `protocol` is currently registered.
	pub fn is_registered(&self, protocol: &str) -> bool {
		self.registered.lock().contains_key(protocol)
	}

	/// The inbound/outbound caps `protocol` was registered with, if any.
	pub fn caps_of(&self, protocol: &str) -> Option<(usize, usize)> {
		self.registered.lock().get(protocol).copied()
	}
}

impl crate::transport::Registrar for MockRegistrar {
	fn register(&self, protocol: String, max_inbound_streams: usize, max_outbound_streams: usize) {
		self.registered.lock().insert(protocol, (max_inbound_streams, max_outbound_streams));
	}

	fn unregister(&self, protocol: &str) {
		self.registered.lock().remove(protocol);
	}
}
