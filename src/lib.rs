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

//! Identify and Identify-Push protocol engine.
//!
//! Implements the two companion libp2p protocols used to exchange host
//! metadata between peers: the request/response `identify` protocol, run
//! once per freshly established connection, and the fire-and-forget
//! `identify-push` protocol, used to announce later changes to the local
//! node's listen addresses or supported protocols.
//!
//! The engine is transport-agnostic: it is driven through the narrow
//! [`transport::Connection`], [`transport::ConnectionManager`],
//! [`transport::Registrar`], and [`transport::Executor`] contracts rather
//! than against a concrete `libp2p::Swarm`, so it can be exercised with the
//! in-memory collaborators in [`testing`] instead of a real network stack.

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod envelope;
mod proto;
mod reconciler;

pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod identity;
pub mod message;
pub mod store;
pub mod testing;
pub mod transport;

pub use config::Config;
pub use engine::{Engine, IdentifyOptions};
pub use error::Error;
pub use identity::HostIdentity;
pub use message::IdentifyMessage;
pub use store::{AddressManager, MetadataKey, PeerStore};
pub use transport::{
	BoxSubstream, Connection, ConnectionManager, CouplerEvent, CouplerEventStream, Executor, Registrar, Substream,
};
