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

//! The local node's identity descriptor (§3 "Host Identity").

use libp2p_identity::{Keypair, PeerId, PublicKey};

/// The local node's descriptor. Immutable for the lifetime of the engine.
#[derive(Clone)]
pub struct HostIdentity {
	keypair: Keypair,
	/// e.g. `"ipfs/1.0.0"`.
	pub protocol_version: String,
	/// e.g. `"sc-identify/0.1.0"`.
	pub agent_version: String,
}

impl HostIdentity {
	/// Builds a host identity from a signing keypair and the two advertised
	/// version strings.
	pub fn new(keypair: Keypair, protocol_version: String, agent_version: String) -> Self {
		HostIdentity { keypair, protocol_version, agent_version }
	}

	/// The local peer-id, derived from the public key.
	pub fn peer_id(&self) -> PeerId {
		self.keypair.public().to_peer_id()
	}

	/// The local node's public key.
	pub fn public_key(&self) -> PublicKey {
		self.keypair.public()
	}

	/// The signing keypair, needed to seal peer records.
	pub fn keypair(&self) -> &Keypair {
		&self.keypair
	}
}

impl std::fmt::Debug for HostIdentity {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("HostIdentity")
			.field("peer_id", &self.peer_id())
			.field("protocol_version", &self.protocol_version)
			.field("agent_version", &self.agent_version)
			.finish()
	}
}
