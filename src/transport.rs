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

//! Narrow contracts for the collaborators this engine treats as external
//! (§1 "out of scope", §6 "consumed collaborator interfaces"): the
//! transport/multiplexer, the connection manager, and the protocol-selection
//! layer. The engine is generic over these traits so it can be driven by a
//! mock in tests without pulling in a real libp2p `Swarm`.

use std::pin::Pin;

use async_trait::async_trait;
use futures::{future::BoxFuture, io::AsyncRead, io::AsyncWrite, stream::Stream};
use libp2p_identity::PeerId;
use multiaddr::Multiaddr;

use crate::error::Error;

/// A bidirectional byte stream multiplexed over one transport connection.
pub trait Substream: AsyncRead + AsyncWrite + Unpin + Send {}
impl<T: AsyncRead + AsyncWrite + Unpin + Send> Substream for T {}

/// A boxed, type-erased substream.
pub type BoxSubstream = Pin<Box<dyn Substream>>;

/// An established transport connection to a single remote peer.
///
/// Implementations own the actual multiplexer; `open_substream` negotiates
/// a new outbound substream to the given protocol name.
#[async_trait]
pub trait Connection: Send + Sync {
	/// The remote peer-id bound to this connection at the secure-channel layer.
	fn remote_peer_id(&self) -> PeerId;

	/// How the remote peer is addressed from the local node's point of view.
	fn remote_address(&self) -> Multiaddr;

	/// Opens a new outbound substream negotiated to `protocol`.
	async fn open_substream(&self, protocol: String) -> Result<BoxSubstream, Error>;
}

/// Enumerates currently-established connections (§6: "enumerate connections").
pub trait ConnectionManager: Send + Sync {
	/// Snapshot of all connections currently established.
	fn connections(&self) -> Vec<std::sync::Arc<dyn Connection>>;
}

/// An event emitted by the connection manager or by local-identity mutation,
/// driving the Event Coupler (§4.5).
#[derive(Clone)]
pub enum CouplerEvent {
	/// A new connection was established; the coupler triggers one identify
	/// exchange against it.
	ConnectionEstablished(std::sync::Arc<dyn Connection>),
	/// The local node's listen addresses changed.
	LocalListenAddrsChanged(PeerId),
	/// The local node's supported protocol set changed.
	LocalProtocolsChanged(PeerId),
}

/// A stream of [`CouplerEvent`]s, boxed for storage on `Engine`.
pub type CouplerEventStream = Pin<Box<dyn Stream<Item = CouplerEvent> + Send>>;

/// Registers/deregisters protocol handlers with the protocol-selection layer
/// (§6: `Registrar`: `handle(proto, cb, caps)`, `unhandle(proto)`).
pub trait Registrar: Send + Sync {
	/// Advertises `protocol`, capping concurrent inbound/outbound substreams.
	fn register(&self, protocol: String, max_inbound_streams: usize, max_outbound_streams: usize);

	/// Withdraws a previously registered protocol.
	fn unregister(&self, protocol: &str);
}

/// Runs a future to completion without blocking the caller, the way
/// `libp2p::swarm::Executor` decouples `sc-network` from any particular
/// async runtime.
pub trait Executor: Send + Sync {
	/// Spawns `future`, detached from the caller.
	fn spawn(&self, future: BoxFuture<'static, ()>);
}
