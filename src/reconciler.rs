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

//! Store Reconciler (§4.4): applies a verified identity view for a remote
//! peer to the peer store and address manager, in the fixed order the spec
//! requires so concurrent exchanges against the same peer converge
//! deterministically (§5).

use std::collections::HashSet;

use libp2p_identity::PeerId;
use log::{debug, trace};

use crate::{
	envelope,
	message::IdentifyMessage,
	store::{AddressManager, MetadataKey, PeerStore},
};

/// Whether a reconciled exchange came from the identify or the push
/// protocol. Only identify exchanges feed the observed-address learner
/// (§4.4, step 5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
	/// The message arrived over the identify protocol.
	Identify,
	/// The message arrived over the identify-push protocol.
	Push,
}

/// Applies `msg`, understood to describe `peer`, to `store` (and, for
/// identify exchanges, to `addresses`) in the §4.4 order.
pub fn reconcile(
	peer: PeerId,
	msg: &IdentifyMessage,
	origin: Origin,
	store: &dyn PeerStore,
	addresses: &dyn AddressManager,
	max_observed_addresses: usize,
) {
	let mut envelope_accepted = false;

	if let Some(raw) = &msg.signed_peer_record {
		match envelope::open_and_certify(raw) {
			Ok(record) if envelope::peer_id_of(&record) == peer => {
				if store.consume_peer_record(peer, record) {
					envelope_accepted = true;
				} else {
					trace!(target: "sub-identify", "peer store declined envelope for {peer}, falling back to legacy addrs");
				}
			},
			Ok(record) => {
				debug!(
					target: "sub-identify",
					"signed peer record for {peer} claims different peer-id {}, falling back to legacy addrs",
					envelope::peer_id_of(&record),
				);
			},
			Err(err) => {
				debug!(target: "sub-identify", "signed peer record for {peer} failed to verify ({err}), falling back to legacy addrs");
			},
		}
	}

	if !envelope_accepted {
		store.set_addresses(peer, msg.parsed_listen_addrs());
	}

	store.set_protocols(peer, msg.protocols.iter().cloned().collect::<HashSet<_>>());

	if let Some(agent_version) = &msg.agent_version {
		store.set_metadata(peer, MetadataKey::AgentVersion, agent_version.clone().into_bytes());
	}
	if let Some(protocol_version) = &msg.protocol_version {
		store.set_metadata(
			peer,
			MetadataKey::ProtocolVersion,
			protocol_version.clone().into_bytes(),
		);
	}

	if origin == Origin::Identify {
		if let Some(observed) = msg.parsed_observed_addr() {
			if addresses.get_observed_addrs().len() < max_observed_addresses {
				addresses.add_observed_addr(observed, max_observed_addresses);
			}
		}
	}
}
