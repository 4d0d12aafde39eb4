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

//! Signed peer record handling (§4.3).
//!
//! Cryptographic identity primitives are not reimplemented here: sealing and
//! opening a peer record delegates directly to `libp2p_core::PeerRecord` /
//! `libp2p_core::SignedEnvelope`, which already bind the payload to a domain
//! separator (`"libp2p-peer-record"`) and verify the envelope's signature
//! against its embedded public key. This module is a thin, stateless
//! wrapper that maps those primitives onto our `Error` taxonomy.

use libp2p_core::{PeerRecord, SignedEnvelope};
use libp2p_identity::{Keypair, PeerId};
use multiaddr::Multiaddr;

use crate::error::Error;

/// Parses and verifies a signed envelope, returning the peer record it
/// contains. Fails with [`Error::InvalidSignature`] if the envelope's
/// signature does not verify under its embedded public key.
pub fn open_and_certify(bytes: &[u8]) -> Result<PeerRecord, Error> {
	let envelope =
		SignedEnvelope::from_protobuf_encoding(bytes).map_err(|err| Error::InvalidSignature(err.to_string()))?;
	PeerRecord::from_signed_envelope(envelope).map_err(|err| Error::InvalidSignature(err.to_string()))
}

/// Seals `addresses` into a freshly signed peer record under `keypair`.
pub fn seal(keypair: &Keypair, addresses: Vec<Multiaddr>) -> Result<PeerRecord, Error> {
	PeerRecord::new(keypair, addresses).map_err(|err| Error::InvalidSignature(err.to_string()))
}

/// Serializes a peer record back into the opaque envelope bytes carried on
/// the wire as `signed_peer_record`.
pub fn to_bytes(record: &PeerRecord) -> Vec<u8> {
	record.clone().to_signed_envelope().into_protobuf_encoding()
}

/// The peer-id a verified envelope claims to belong to.
pub fn peer_id_of(record: &PeerRecord) -> PeerId {
	record.peer_id()
}
