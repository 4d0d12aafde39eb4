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

//! The Identify engine (§4): ties the codec, envelope, reconciler, and the
//! external collaborator traits together into the initiator, responder, and
//! push surfaces a network stack actually calls.

use std::sync::Arc;

use futures::{io::AsyncWriteExt, StreamExt};
use libp2p_core::PeerRecord;
use libp2p_identity::PublicKey;
use log::{debug, warn};
use multiaddr::{Multiaddr, Protocol};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::{
	codec,
	config::Config,
	envelope,
	error::Error,
	identity::HostIdentity,
	message::IdentifyMessage,
	reconciler::{self, Origin},
	store::{AddressManager, MetadataKey, PeerStore},
	transport::{BoxSubstream, Connection, ConnectionManager, CouplerEvent, CouplerEventStream, Executor, Registrar},
};

/// Per-call knobs for [`Engine::identify`].
#[derive(Default)]
pub struct IdentifyOptions {
	/// A caller-supplied cancellation signal. If present, it replaces the
	/// engine's internal timeout on this call (§5); if absent, the engine
	/// derives one from `Config::timeout`.
	pub cancel: Option<CancellationToken>,
}

/// The Identify / Identify-Push protocol engine.
///
/// Owns no transport of its own; driven by whatever embeds it through the
/// [`Connection`], [`ConnectionManager`], [`Registrar`], and [`Executor`]
/// contracts in [`crate::transport`].
pub struct Engine {
	config: Config,
	identity: HostIdentity,
	peer_store: Arc<dyn PeerStore>,
	address_manager: Arc<dyn AddressManager>,
	identify_protocol: String,
	push_protocol: String,
	// Cache of the last envelope sealed for the local peer, so repeated
	// responses and pushes don't re-sign when the address set is unchanged.
	local_envelope: Mutex<Option<PeerRecord>>,
	shutdown: CancellationToken,
}

impl Engine {
	/// Builds an engine around `identity`, backed by `peer_store` and
	/// `address_manager`. Returned already wrapped in an `Arc` since
	/// [`Engine::start`] needs to hand clones of itself to spawned tasks.
	pub fn new(
		config: Config,
		identity: HostIdentity,
		peer_store: Arc<dyn PeerStore>,
		address_manager: Arc<dyn AddressManager>,
	) -> Arc<Self> {
		let (identify_protocol, push_protocol) = config.protocol_names();
		Arc::new(Engine {
			config,
			identity,
			peer_store,
			address_manager,
			identify_protocol,
			push_protocol,
			local_envelope: Mutex::new(None),
			shutdown: CancellationToken::new(),
		})
	}

	/// The local node's identity this engine advertises.
	pub fn identity(&self) -> &HostIdentity {
		&self.identity
	}

	/// The identify protocol string this engine was configured with.
	pub fn identify_protocol(&self) -> &str {
		&self.identify_protocol
	}

	/// The identify-push protocol string this engine was configured with.
	pub fn push_protocol(&self) -> &str {
		&self.push_protocol
	}

	/// Registers both protocols with `registrar`, seeds the local peer's
	/// metadata into `peer_store`, and spawns a background task via
	/// `executor` that reacts to `events` by triggering identify exchanges
	/// on new connections and pushes on local-identity changes (§4.5).
	pub async fn start(
		self: &Arc<Self>,
		registrar: Arc<dyn Registrar>,
		connection_manager: Arc<dyn ConnectionManager>,
		executor: Arc<dyn Executor>,
		mut events: CouplerEventStream,
	) -> Result<(), Error> {
		let local = self.identity.peer_id();
		self.peer_store.set_metadata(
			local,
			MetadataKey::AgentVersion,
			self.identity.agent_version.clone().into_bytes(),
		);
		self.peer_store.set_metadata(
			local,
			MetadataKey::ProtocolVersion,
			self.identity.protocol_version.clone().into_bytes(),
		);

		registrar.register(
			self.identify_protocol.clone(),
			self.config.max_inbound_streams,
			self.config.max_outbound_streams,
		);
		registrar.register(
			self.push_protocol.clone(),
			self.config.max_push_incoming_streams,
			self.config.max_push_outgoing_streams,
		);

		let engine = Arc::clone(self);
		let shutdown = self.shutdown.clone();

		executor.spawn(Box::pin(async move {
			loop {
				tokio::select! {
					_ = shutdown.cancelled() => break,
					event = events.next() => {
						let Some(event) = event else { break };
						engine.handle_coupler_event(event, connection_manager.as_ref());
					}
				}
			}
		}));

		Ok(())
	}

	/// Unregisters both protocols and cancels every in-flight exchange and
	/// the event-coupler loop spawned by [`Engine::start`].
	pub fn stop(&self, registrar: &dyn Registrar) {
		self.shutdown.cancel();
		registrar.unregister(&self.identify_protocol);
		registrar.unregister(&self.push_protocol);
	}

	fn handle_coupler_event(self: &Arc<Self>, event: CouplerEvent, connection_manager: &dyn ConnectionManager) {
		match event {
			CouplerEvent::ConnectionEstablished(connection) => {
				let engine = Arc::clone(self);
				let cancel = engine.shutdown.child_token();
				tokio::spawn(async move {
					let remote = connection.remote_peer_id();
					let options = IdentifyOptions { cancel: Some(cancel) };
					if let Err(err) = engine.identify(connection.as_ref(), options).await {
						debug!(target: "sub-identify", "automatic identify of {remote} failed: {err}");
					}
				});
			},
			CouplerEvent::LocalListenAddrsChanged(peer) | CouplerEvent::LocalProtocolsChanged(peer)
				if peer == self.identity.peer_id() =>
			{
				let engine = Arc::clone(self);
				let targets = engine.push_targets(connection_manager);
				tokio::spawn(async move {
					if let Err(err) = engine.push_to_peer_store() {
						warn!(target: "sub-identify", "failed to refresh local peer record: {err}");
					}
					let _ = engine.push(&targets).await;
				});
			},
			CouplerEvent::LocalListenAddrsChanged(_) | CouplerEvent::LocalProtocolsChanged(_) => {},
		}
	}

	/// Connections that have already advertised support for the push
	/// protocol, per the peer store's recorded protocol set.
	fn push_targets(&self, connection_manager: &dyn ConnectionManager) -> Vec<Arc<dyn Connection>> {
		connection_manager
			.connections()
			.into_iter()
			.filter(|connection| {
				self.peer_store.protocols_of(connection.remote_peer_id()).contains(self.push_protocol.as_str())
			})
			.collect()
	}

	/// Initiates an identify exchange over `connection` (§4.1): opens a
	/// substream to the identify protocol, reads exactly one frame, verifies
	/// the sender's identity, and applies the result through the reconciler.
	pub async fn identify(
		&self,
		connection: &dyn Connection,
		options: IdentifyOptions,
	) -> Result<IdentifyMessage, Error> {
		let remote = connection.remote_peer_id();
		let local = self.identity.peer_id();
		if remote == local {
			return Err(Error::InvalidPeer { expected: remote, got: remote });
		}

		let exchange = self.run_identify_exchange(connection);
		tokio::pin!(exchange);

		match options.cancel {
			Some(cancel) => tokio::select! {
				_ = cancel.cancelled() => Err(Error::Cancelled),
				_ = self.shutdown.cancelled() => Err(Error::Cancelled),
				result = &mut exchange => result,
			},
			None => tokio::select! {
				_ = self.shutdown.cancelled() => Err(Error::Cancelled),
				result = tokio::time::timeout(self.config.timeout, &mut exchange) => match result {
					Ok(inner) => inner,
					Err(_) => Err(Error::Timeout),
				},
			},
		}
	}

	async fn run_identify_exchange(
		&self,
		connection: &dyn Connection,
	) -> Result<IdentifyMessage, Error> {
		let mut substream = connection.open_substream(self.identify_protocol.clone()).await?;
		let result = self.do_identify(&mut substream, connection).await;
		let _ = substream.close().await;
		result
	}

	async fn do_identify(
		&self,
		substream: &mut BoxSubstream,
		connection: &dyn Connection,
	) -> Result<IdentifyMessage, Error> {
		let msg = codec::read_one(substream, self.config.max_identify_message_size).await?;

		let public_key_bytes = msg.public_key.clone().ok_or(Error::MissingPublicKey)?;
		let public_key = PublicKey::try_decode_protobuf(&public_key_bytes)
			.map_err(|err| Error::InvalidPublicKey(err.to_string()))?;
		let derived = public_key.to_peer_id();

		let remote = connection.remote_peer_id();
		if derived != remote {
			return Err(Error::InvalidPeer { expected: remote, got: derived });
		}
		let local = self.identity.peer_id();
		if derived == local {
			return Err(Error::InvalidPeer { expected: local, got: derived });
		}

		reconciler::reconcile(
			remote,
			&msg,
			Origin::Identify,
			self.peer_store.as_ref(),
			self.address_manager.as_ref(),
			self.config.max_observed_addresses,
		);

		Ok(msg)
	}

	/// Responds to an inbound identify substream (§4.1, responder side).
	/// Never surfaces an error to the caller: failures are logged and the
	/// substream is closed either way.
	pub async fn handle_identify(&self, substream: &mut BoxSubstream, connection: &dyn Connection) {
		if let Err(err) = self.respond_identify(substream, connection).await {
			debug!(
				target: "sub-identify",
				"identify responder failed for {}: {err}",
				connection.remote_peer_id(),
			);
		}
		let _ = substream.close().await;
	}

	async fn respond_identify(&self, substream: &mut BoxSubstream, connection: &dyn Connection) -> Result<(), Error> {
		let msg = self.build_identify_message(connection);
		match tokio::time::timeout(self.config.timeout, codec::write_one(substream, &msg)).await {
			Ok(result) => result,
			Err(_) => Err(Error::Timeout),
		}
	}

	fn build_identify_message(&self, connection: &dyn Connection) -> IdentifyMessage {
		let local = self.identity.peer_id();
		let listen_addrs = self.address_manager.get_addresses();
		let envelope_bytes = self.ensure_local_envelope(&listen_addrs).map(|record| envelope::to_bytes(&record));

		IdentifyMessage {
			protocol_version: Some(self.identity.protocol_version.clone()),
			agent_version: Some(self.identity.agent_version.clone()),
			public_key: Some(self.identity.public_key().encode_protobuf()),
			listen_addrs: listen_addrs.iter().cloned().map(strip_p2p_suffix).map(|a| a.to_vec()).collect(),
			observed_addr: Some(connection.remote_address().to_vec()),
			protocols: self.peer_store.protocols_of(local).into_iter().collect(),
			signed_peer_record: envelope_bytes,
		}
	}

	/// Pushes the local identity (address set, protocols, envelope) to each
	/// of `connections` (§4.2, initiator side of identify-push). Per-target
	/// failures are logged, never returned: a push is best-effort fan-out.
	pub async fn push(&self, connections: &[Arc<dyn Connection>]) -> Result<(), Error> {
		let msg = self.build_push_message();
		let pushes = connections.iter().map(|connection| self.push_one(connection.as_ref(), &msg));
		futures::future::join_all(pushes).await;
		Ok(())
	}

	fn build_push_message(&self) -> IdentifyMessage {
		let local = self.identity.peer_id();
		let listen_addrs = self.address_manager.get_addresses();
		let envelope_bytes = self.peer_store.envelope_of(local).map(|record| envelope::to_bytes(&record));

		IdentifyMessage {
			listen_addrs: listen_addrs.into_iter().map(strip_p2p_suffix).map(|a| a.to_vec()).collect(),
			protocols: self.peer_store.protocols_of(local).into_iter().collect(),
			signed_peer_record: envelope_bytes,
			..Default::default()
		}
	}

	async fn push_one(&self, connection: &dyn Connection, msg: &IdentifyMessage) {
		if let Err(err) = self.push_one_inner(connection, msg).await {
			debug!(target: "sub-identify", "push to {} failed: {err}", connection.remote_peer_id());
		}
	}

	async fn push_one_inner(&self, connection: &dyn Connection, msg: &IdentifyMessage) -> Result<(), Error> {
		let mut substream = connection.open_substream(self.push_protocol.clone()).await?;
		let result = match tokio::time::timeout(self.config.timeout, codec::write_one(&mut substream, msg)).await {
			Ok(result) => result,
			Err(_) => Err(Error::Timeout),
		};
		let _ = substream.close().await;
		result
	}

	/// Responds to an inbound identify-push substream (§4.2, responder
	/// side). Unlike `handle_identify`, does not require `public_key`: the
	/// remote is already bound at the secure-channel layer, and any
	/// `signed_peer_record` is still verified by the reconciler.
	pub async fn handle_push(&self, substream: &mut BoxSubstream, connection: &dyn Connection) {
		if let Err(err) = self.respond_push(substream, connection).await {
			debug!(target: "sub-identify", "push responder failed for {}: {err}", connection.remote_peer_id());
		}
		let _ = substream.close().await;
	}

	async fn respond_push(&self, substream: &mut BoxSubstream, connection: &dyn Connection) -> Result<(), Error> {
		let read = codec::read_one(substream, self.config.max_identify_message_size);
		let msg = match tokio::time::timeout(self.config.timeout, read).await {
			Ok(result) => result?,
			Err(_) => return Err(Error::Timeout),
		};

		let remote = connection.remote_peer_id();
		if remote == self.identity.peer_id() {
			return Err(Error::InvalidPeer { expected: remote, got: remote });
		}

		reconciler::reconcile(
			remote,
			&msg,
			Origin::Push,
			self.peer_store.as_ref(),
			self.address_manager.as_ref(),
			self.config.max_observed_addresses,
		);

		Ok(())
	}

	/// Refreshes the cached local peer record if the address set has
	/// changed since it was last sealed, writing the new envelope back to
	/// the peer store (§12, supplemented feature). Called whenever the
	/// local listen address set changes, ahead of a push fan-out.
	pub fn push_to_peer_store(&self) -> Result<(), Error> {
		let listen_addrs = self.address_manager.get_addresses();
		self.ensure_local_envelope(&listen_addrs);
		Ok(())
	}

	/// Returns the current local peer record, minting and persisting a
	/// fresh one if none exists yet or if `listen_addrs` no longer matches
	/// the one it was last sealed over.
	fn ensure_local_envelope(&self, listen_addrs: &[Multiaddr]) -> Option<PeerRecord> {
		{
			let cached = self.local_envelope.lock();
			if let Some(record) = cached.as_ref() {
				if record.addresses() == listen_addrs {
					return Some(record.clone());
				}
			}
		}

		if listen_addrs.is_empty() {
			return self.local_envelope.lock().clone();
		}

		match envelope::seal(self.identity.keypair(), listen_addrs.to_vec()) {
			Ok(record) => {
				let local = self.identity.peer_id();
				self.peer_store.consume_peer_record(local, record.clone());
				*self.local_envelope.lock() = Some(record.clone());
				Some(record)
			},
			Err(err) => {
				warn!(target: "sub-identify", "failed to seal local peer record: {err}");
				self.local_envelope.lock().clone()
			},
		}
	}
}

/// Strips a trailing `/p2p/<peer-id>` component, matching how `sc-network`
/// reports its own listen addresses to peers without baking its identity
/// into the address itself.
fn strip_p2p_suffix(mut addr: Multiaddr) -> Multiaddr {
	if matches!(addr.iter().last(), Some(Protocol::P2p(_))) {
		addr.pop();
	}
	addr
}
