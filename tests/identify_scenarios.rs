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

//! End-to-end scenarios, one per §8 narrative case of the Identify protocol
//! specification this crate implements.

use std::sync::Arc;

use assert_matches::assert_matches;
use libp2p_identity::{Keypair, PeerId};
use multiaddr::Multiaddr;
use parking_lot::Mutex;
use sc_identify::{
	testing::{InMemoryAddressManager, InMemoryPeerStore, MockConnection},
	transport::{BoxSubstream, Connection},
	Config, Engine, Error, HostIdentity, IdentifyOptions, MetadataKey, PeerStore,
};
use tokio_util::compat::TokioAsyncReadCompatExt;

fn build_engine(
	agent_version: &str,
	listen_addrs: Vec<Multiaddr>,
) -> (Arc<Engine>, Arc<InMemoryPeerStore>, Arc<InMemoryAddressManager>) {
	let identity = HostIdentity::new(Keypair::generate_ed25519(), "ipfs/1.0.0".into(), agent_version.into());
	let peer_store = Arc::new(InMemoryPeerStore::default());
	let addresses = Arc::new(InMemoryAddressManager::with_listen_addrs(listen_addrs));
	let engine = Engine::new(Config::default(), identity, peer_store.clone(), addresses.clone());
	(engine, peer_store, addresses)
}

/// Wires up a duplex substream pair and a `MockConnection` that hands out the
/// client half, leaving the server half for the test to drive directly.
fn dial(remote_peer: PeerId, remote_address: Multiaddr) -> (MockConnection, BoxSubstream) {
	let (client, server) = tokio::io::duplex(16 * 1024);
	let client: BoxSubstream = Box::pin(client.compat());
	let server: BoxSubstream = Box::pin(server.compat());
	(
		MockConnection { remote_peer_id: remote_peer, remote_address, substreams: Mutex::new(vec![client]) },
		server,
	)
}

#[tokio::test]
async fn scenario_1_happy_path_with_envelope() {
	let addr: Multiaddr = "/ip4/10.0.0.1/tcp/4001".parse().unwrap();
	let (a, a_store, _) = build_engine("a/1", vec![addr.clone()]);
	a_store.set_protocols(a.identity().peer_id(), ["/chat/1".to_string(), "/ping/1".to_string()].into_iter().collect());

	let (b, b_store, _) = build_engine("b/1", vec![]);

	let a_peer = a.identity().peer_id();
	let b_peer = b.identity().peer_id();
	let (connection, mut server_substream) = dial(a_peer, addr.clone());

	let responder = tokio::spawn({
		let a = Arc::clone(&a);
		async move {
			let fake_connection = MockConnection {
				remote_peer_id: b_peer,
				remote_address: "/ip4/10.0.0.9/tcp/1".parse().unwrap(),
				substreams: Mutex::new(vec![]),
			};
			a.handle_identify(&mut server_substream, &fake_connection).await;
		}
	});

	b.identify(&connection, IdentifyOptions::default()).await.unwrap();
	responder.await.unwrap();

	assert_eq!(b_store.addresses_of(a_peer), vec![addr]);
	assert!(b_store.envelope_of(a_peer).is_some());
	let protocols = b_store.protocols_of(a_peer);
	assert!(protocols.contains("/chat/1"));
	assert!(protocols.contains("/ping/1"));
	assert_eq!(b_store.metadata(a_peer, MetadataKey::AgentVersion), Some(b"a/1".to_vec()));
}

#[tokio::test]
async fn scenario_2_legacy_peer_has_no_envelope() {
	// An engine with no addresses on file mints no envelope (§4.1: "if absent
	// and listen_addrs is non-empty, mint..."), so a bare `handle_identify`
	// against such a peer exercises the legacy path on the initiator side.
	let addr: Multiaddr = "/ip4/10.0.0.2/tcp/4001".parse().unwrap();
	let (a, _, a_addresses) = build_engine("a/1", vec![]);
	// Seed the address manager after construction so no envelope gets minted
	// lazily before the exchange: listen_addrs reach the wire, but the store
	// never receives a signed record.
	a_addresses.set_listen_addrs(vec![addr.clone()]);

	let (b, b_store, _) = build_engine("b/1", vec![]);

	let _ = &b;
	let a_peer = a.identity().peer_id();
	let (connection, mut server_substream) = dial(a_peer, addr.clone());

	// Force legacy mode by writing a hand-built message without a signed
	// peer record, bypassing the responder's own envelope-minting logic.
	let msg = sc_identify::IdentifyMessage {
		protocol_version: Some("ipfs/1.0.0".into()),
		agent_version: Some("a/1".into()),
		public_key: Some(a.identity().public_key().encode_protobuf()),
		listen_addrs: vec![addr.to_vec()],
		observed_addr: Some("/ip4/10.0.0.9/tcp/1".parse::<Multiaddr>().unwrap().to_vec()),
		protocols: vec![],
		signed_peer_record: None,
	};

	let writer = tokio::spawn(async move {
		sc_identify::codec::write_one(&mut server_substream, &msg).await.unwrap();
		let _ = futures::io::AsyncWriteExt::close(&mut server_substream).await;
	});

	b.identify(&connection, IdentifyOptions::default()).await.unwrap();
	writer.await.unwrap();

	assert_eq!(b_store.addresses_of(a_peer), vec![addr]);
	assert!(b_store.envelope_of(a_peer).is_none());
}

#[tokio::test]
async fn scenario_3_peer_id_mismatch_fails_and_writes_nothing() {
	let (a, _, _) = build_engine("a/1", vec!["/ip4/10.0.0.1/tcp/4001".parse().unwrap()]);
	let (b, b_store, _) = build_engine("b/1", vec![]);

	// `connection.remote_peer_id()` claims to be some unrelated peer `Z`,
	// but the substream on the other end will present `a`'s real identity.
	let z_peer = PeerId::random();
	let a_peer = a.identity().peer_id();
	let (connection, mut server_substream) = dial(z_peer, "/ip4/10.0.0.1/tcp/4001".parse().unwrap());

	let responder = tokio::spawn({
		let a = Arc::clone(&a);
		async move {
			let fake_connection = MockConnection {
				remote_peer_id: PeerId::random(),
				remote_address: "/ip4/10.0.0.9/tcp/1".parse().unwrap(),
				substreams: Mutex::new(vec![]),
			};
			a.handle_identify(&mut server_substream, &fake_connection).await;
		}
	});

	let err = b.identify(&connection, IdentifyOptions::default()).await.unwrap_err();
	responder.await.unwrap();

	assert_matches!(err, Error::InvalidPeer { .. });
	assert!(b_store.addresses_of(a_peer).is_empty());
	assert!(b_store.addresses_of(z_peer).is_empty());
}

#[tokio::test]
async fn scenario_4_oversize_frame_is_rejected() {
	let (b, _, _) = build_engine("b/1", vec![]);
	let remote = PeerId::random();
	let (connection, mut server_substream) = dial(remote, "/ip4/10.0.0.1/tcp/1".parse().unwrap());

	let writer = tokio::spawn(async move {
		use unsigned_varint::encode;
		let mut len_buf = encode::u64_buffer();
		let len_bytes = encode::u64(9000, &mut len_buf);
		futures::io::AsyncWriteExt::write_all(&mut server_substream, len_bytes).await.unwrap();
		futures::io::AsyncWriteExt::flush(&mut server_substream).await.unwrap();
	});

	let err = b.identify(&connection, IdentifyOptions::default()).await.unwrap_err();
	writer.await.unwrap();

	assert_matches!(err, Error::MessageTooLarge { len: 9000, max: 8192 });
}

#[tokio::test]
async fn scenario_5_push_updates_addresses() {
	let first: Multiaddr = "/ip4/10.0.0.1/tcp/4001".parse().unwrap();
	let (a, _, a_addresses) = build_engine("a/1", vec![first.clone()]);
	let (b, b_store, _) = build_engine("b/1", vec![]);

	let a_peer = a.identity().peer_id();
	a.push_to_peer_store().unwrap();

	let second: Multiaddr = "/ip4/10.0.0.3/tcp/4001".parse().unwrap();
	a_addresses.set_listen_addrs(vec![second.clone()]);
	a.push_to_peer_store().unwrap();

	let (connection, mut server_substream) = dial(a_peer, second.clone());
	let pusher = {
		let a = Arc::clone(&a);
		let connection: Arc<dyn Connection> = Arc::new(connection);
		tokio::spawn(async move {
			a.push(&[connection]).await.unwrap();
		})
	};

	let push_responder_connection =
		MockConnection { remote_peer_id: a_peer, remote_address: second.clone(), substreams: Mutex::new(vec![]) };
	b.handle_push(&mut server_substream, &push_responder_connection).await;
	pusher.await.unwrap();

	assert_eq!(b_store.addresses_of(a_peer), vec![second]);
}

#[tokio::test]
async fn scenario_6_observed_address_cap_retains_exactly_one() {
	let mut config = Config::default();
	config.max_observed_addresses = 1;

	let identity = HostIdentity::new(Keypair::generate_ed25519(), "ipfs/1.0.0".into(), "local/1".into());
	let peer_store = Arc::new(InMemoryPeerStore::default());
	let addresses = Arc::new(InMemoryAddressManager::default());
	let local = Engine::new(config, identity, peer_store.clone(), addresses.clone());

	let (reporter_one, _, _) = build_engine("r1/1", vec![]);
	let (reporter_two, _, _) = build_engine("r2/1", vec![]);

	let observed_one: Multiaddr = "/ip4/203.0.113.1/tcp/4001".parse().unwrap();
	let observed_two: Multiaddr = "/ip4/203.0.113.2/tcp/4001".parse().unwrap();

	let reporter_one_peer = reporter_one.identity().peer_id();
	let reporter_two_peer = reporter_two.identity().peer_id();

	let (connection_one, mut server_one) = dial(reporter_one_peer, observed_one.clone());
	let (connection_two, mut server_two) = dial(reporter_two_peer, observed_two.clone());

	let local_peer = local.identity().peer_id();
	let fake_connection_for = |remote| MockConnection {
		remote_peer_id: remote,
		remote_address: observed_one.clone(),
		substreams: Mutex::new(vec![]),
	};

	let responder_one = tokio::spawn({
		let reporter_one = Arc::clone(&reporter_one);
		let fake = fake_connection_for(local_peer);
		async move {
			reporter_one.handle_identify(&mut server_one, &fake).await;
		}
	});
	local.identify(&connection_one, IdentifyOptions::default()).await.unwrap();
	responder_one.await.unwrap();

	let responder_two = tokio::spawn({
		let reporter_two = Arc::clone(&reporter_two);
		let fake = fake_connection_for(local_peer);
		async move {
			reporter_two.handle_identify(&mut server_two, &fake).await;
		}
	});
	local.identify(&connection_two, IdentifyOptions::default()).await.unwrap();
	responder_two.await.unwrap();

	assert_eq!(addresses.get_observed_addrs().len(), 1);
}
