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

//! Length-prefixed framing for a single Identify message (§4.2).
//!
//! One frame is an unsigned LEB128 varint length followed by that many bytes
//! of protobuf-encoded payload. The codec reads and writes exactly one frame;
//! it never buffers more than `max_len` bytes, so an attacker declaring a
//! huge length cannot force an allocation (P4).

use futures::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use prost::Message as _;
use unsigned_varint::{aio, encode};

use crate::{error::Error, message::IdentifyMessage, proto};

/// Encodes `msg` as a single length-prefixed frame.
pub fn encode(msg: &IdentifyMessage) -> Vec<u8> {
	let proto: proto::Identify = msg.clone().into();
	let payload = proto.encode_to_vec();

	let mut len_buf = encode::u64_buffer();
	let len_bytes = encode::u64(payload.len() as u64, &mut len_buf);

	let mut frame = Vec::with_capacity(len_bytes.len() + payload.len());
	frame.extend_from_slice(len_bytes);
	frame.extend_from_slice(&payload);
	frame
}

/// Writes `msg` as a single frame to `io`.
pub async fn write_one<T>(io: &mut T, msg: &IdentifyMessage) -> Result<(), Error>
where
	T: AsyncWrite + Unpin,
{
	let frame = encode(msg);
	io.write_all(&frame).await?;
	io.flush().await?;
	Ok(())
}

/// Reads exactly one length-prefixed frame from `io`, bounded by `max_len`.
///
/// Fails fast with [`Error::MessageTooLarge`] as soon as the declared length
/// is read, without allocating or reading the payload (P4).
pub async fn read_one<T>(io: &mut T, max_len: usize) -> Result<IdentifyMessage, Error>
where
	T: AsyncRead + Unpin,
{
	let len = match aio::read_u64(io).await {
		Ok(len) => len,
		Err(unsigned_varint::io::ReadError::Io(err))
			if err.kind() == std::io::ErrorKind::UnexpectedEof =>
			return Err(Error::ConnectionEnded),
		Err(err) => return Err(err.into()),
	};

	if len > max_len as u64 {
		return Err(Error::MessageTooLarge { len, max: max_len as u64 });
	}

	let mut payload = vec![0u8; len as usize];
	io.read_exact(&mut payload).await.map_err(|err| {
		if err.kind() == std::io::ErrorKind::UnexpectedEof {
			Error::ConnectionEnded
		} else {
			Error::Io(err)
		}
	})?;

	let proto = proto::Identify::decode(payload.as_slice())?;
	Ok(proto.into())
}

#[cfg(test)]
mod tests {
	use super::*;
	use assert_matches::assert_matches;

	#[tokio::test]
	async fn round_trips_a_frame() {
		use tokio_util::compat::TokioAsyncReadCompatExt;

		let msg = IdentifyMessage {
			protocol_version: Some("ipfs/1.0.0".into()),
			protocols: vec!["/chat/1".into()],
			..Default::default()
		};

		let (a, b) = tokio::io::duplex(1024);
		let mut a = a.compat();
		let mut b = b.compat();

		write_one(&mut a, &msg).await.unwrap();
		let decoded = read_one(&mut b, 8192).await.unwrap();
		assert_eq!(decoded, msg);
	}

	#[tokio::test]
	async fn oversize_frame_is_rejected_without_reading_payload() {
		use tokio_util::compat::TokioAsyncReadCompatExt;

		let (a, b) = tokio::io::duplex(1 << 20);
		let mut a = a.compat();
		let mut b = b.compat();

		let mut len_buf = encode::u64_buffer();
		let len_bytes = encode::u64(9000, &mut len_buf);
		futures::io::AsyncWriteExt::write_all(&mut a, len_bytes).await.unwrap();
		futures::io::AsyncWriteExt::flush(&mut a).await.unwrap();

		let err = read_one(&mut b, 8192).await.unwrap_err();
		assert_matches!(err, Error::MessageTooLarge { len: 9000, max: 8192 });
	}

	#[tokio::test]
	async fn closed_stream_before_any_byte_is_connection_ended() {
		use tokio_util::compat::TokioAsyncReadCompatExt;

		let (a, b) = tokio::io::duplex(16);
		drop(a);
		let mut b = b.compat();
		let err = read_one(&mut b, 8192).await.unwrap_err();
		assert_matches!(err, Error::ConnectionEnded);
	}
}
