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

//! Error taxonomy for the Identify engine.
//!
//! Mirrors the shape of `sc-network`'s own failure enums (`InboundFailure`,
//! `OutboundFailure`, `ResponseFailure`): one variant per failure surface,
//! with `#[from]` conversions so `?` composes across the codec and
//! transport layers.

use libp2p_identity::PeerId;

/// Errors produced by an Identify or Identify-Push exchange.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	/// The substream was closed before one complete frame arrived.
	#[error("connection ended before a complete identify frame was received")]
	ConnectionEnded,

	/// The declared frame length exceeded the configured cap.
	#[error("identify frame of {len} bytes exceeds the {max} byte cap")]
	MessageTooLarge {
		/// Declared length of the oversize frame.
		len: u64,
		/// Configured cap that was exceeded.
		max: u64,
	},

	/// The frame body failed to decode as an Identify message.
	#[error("failed to decode identify message: {0}")]
	InvalidMessage(#[from] prost::DecodeError),

	/// An identify response lacked a `public_key`.
	#[error("identify response did not carry a public key")]
	MissingPublicKey,

	/// The `public_key` bytes did not decode as a valid public key.
	#[error("could not decode public key: {0}")]
	InvalidPublicKey(String),

	/// The derived or enveloped peer-id did not match expectations.
	#[error("peer identity mismatch: expected {expected}, got {got}")]
	InvalidPeer {
		/// The peer-id the engine expected (the connection's remote, or the local peer).
		expected: PeerId,
		/// The peer-id actually observed.
		got: PeerId,
	},

	/// A signed peer record failed to verify.
	#[error("signed peer record failed to verify: {0}")]
	InvalidSignature(String),

	/// The exchange's deadline elapsed before completion.
	#[error("identify exchange timed out")]
	Timeout,

	/// The exchange was cancelled by the caller.
	#[error("identify exchange was cancelled")]
	Cancelled,

	/// Underlying I/O failure on the substream.
	#[error("I/O error during identify exchange: {0}")]
	Io(#[from] std::io::Error),
}

impl From<unsigned_varint::io::ReadError> for Error {
	fn from(err: unsigned_varint::io::ReadError) -> Self {
		match err {
			unsigned_varint::io::ReadError::Io(io) => Error::Io(io),
			other => Error::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, other)),
		}
	}
}
