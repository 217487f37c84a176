use assert_matches::assert_matches;
use ep_sockets::{
	errors::SocketError,
	Endpoint,
	MsgFlags,
	SocketOptions,
	SocketState,
	TcpActiveSocket,
	TcpClientSocket,
	TcpServerSocket,
	UdpClientSocket,
	UdpServerSocket,
};
use std::{
	io::{Read, Write},
	net::{Ipv4Addr, Shutdown},
	thread,
};

const LOOPBACK: &str = "127.0.0.1";

/// Opens a TCP server on an unused loopback port, connects a client to it, and accepts the connection.
fn tcp_pair(options: &SocketOptions) -> (TcpServerSocket, TcpClientSocket, TcpActiveSocket) {
	let server = TcpServerSocket::with_options(LOOPBACK, 0, options).unwrap();
	let port = server.local_endpoint().unwrap().port();

	// The connection completes in the listen backlog, so it doesn't have to be accepted first.
	let client = TcpClientSocket::new(LOOPBACK, port).unwrap();
	let peer = server.accept_and_create().unwrap();

	(server, client, peer)
}

/// Reads from a connected socket until `len` bytes have arrived.
fn read_at_least(socket: &TcpActiveSocket, len: usize) -> Vec<u8> {
	let mut received = Vec::new();

	while received.len() < len {
		let chunk = socket.read().unwrap();
		assert!(!chunk.is_empty(), "connection closed after {} bytes", received.len());
		received.extend(chunk);
	}

	received
}

#[test]
fn udp_ping_pong() -> anyhow::Result<()> {
	let mut server = UdpServerSocket::new(LOOPBACK, 0)?;
	let server_endpoint = server.local_endpoint()?;
	assert_eq!(server.state(), SocketState::Bound);

	let client = UdpClientSocket::new(LOOPBACK, server_endpoint.port())?;
	assert_eq!(client.state(), SocketState::Connected);
	assert_eq!(client.peer_endpoint(), Some(server_endpoint));

	assert_eq!(client.write(b"ping")?, 4);

	let (message, sender) = server.read_from()?;
	assert_eq!(message, b"ping");
	assert_eq!(sender, client.local_endpoint()?);
	assert_eq!(server.peer_endpoint(), Some(sender));

	assert_eq!(server.write_back(b"pong")?, 4);
	assert_eq!(client.read()?, b"pong");

	Ok(())
}

#[test]
fn udp_write_back_answers_latest_sender() {
	let mut server = UdpServerSocket::new(LOOPBACK, 0).unwrap();
	let port = server.local_endpoint().unwrap().port();

	let first = UdpClientSocket::new(LOOPBACK, port).unwrap();
	let second = UdpClientSocket::new(LOOPBACK, port).unwrap();

	first.write(b"one").unwrap();
	assert_eq!(server.read_from().unwrap().1, first.local_endpoint().unwrap());

	second.write(b"two").unwrap();
	let (message, sender) = server.read_from().unwrap();
	assert_eq!(message, b"two");
	assert_eq!(sender, second.local_endpoint().unwrap());

	server.write_back(b"to two").unwrap();
	assert_eq!(second.read().unwrap(), b"to two");
}

#[test]
fn udp_write_back_before_any_read() {
	let server = UdpServerSocket::new(LOOPBACK, 0).unwrap();

	assert_matches!(
		server.write_back(b"nobody"),
		Err(SocketError::Write { error, .. })
		if error.code != 0
	);
}

#[test]
fn tcp_accept_leaves_server_listening() {
	let (server, client, peer) = tcp_pair(&SocketOptions::default());

	assert_matches!(server.is_listening(), Ok(true));
	assert_eq!(server.state(), SocketState::Listening);
	assert_eq!(peer.state(), SocketState::AcceptedPeer);
	assert_eq!(peer.peer_endpoint(), Some(client.local_endpoint().unwrap()));

	assert_eq!(client.write(b"hello").unwrap(), 5);
	assert_eq!(read_at_least(&peer, 5), b"hello");

	peer.write(b"hi").unwrap();
	assert_eq!(client.read().unwrap(), b"hi");

	assert_matches!(server.is_listening(), Ok(true));
}

#[test]
fn tcp_accept_on_another_thread() {
	let server = TcpServerSocket::new(LOOPBACK, 0).unwrap();
	let port = server.local_endpoint().unwrap().port();

	let server_thread = thread::spawn(move || {
		let peer = server.accept_and_create().unwrap();
		let request = read_at_least(&peer, 4);
		peer.write(&request.iter().map(|byte| byte.wrapping_add(1)).collect::<Vec<u8>>()).unwrap();
	});

	let mut client = TcpClientSocket::new(LOOPBACK, port).unwrap();
	client.write(b"HAL!").unwrap();

	let mut response = [0u8; 4];
	client.read_exact(&mut response).unwrap();
	assert_eq!(&response, b"IBM\"");

	server_thread.join().unwrap();
}

#[test]
fn tcp_server_outlives_stopped_connections() {
	let (server, mut client, mut peer) = tcp_pair(&SocketOptions::default());

	client.stop(Shutdown::Both).unwrap();
	peer.stop(Shutdown::Both).unwrap();
	assert_eq!(server.state(), SocketState::Listening);

	let port = server.local_endpoint().unwrap().port();
	let second_client = TcpClientSocket::new(LOOPBACK, port).unwrap();
	let second_peer = server.accept_and_create().unwrap();

	second_client.write(b"again").unwrap();
	assert_eq!(read_at_least(&second_peer, 5), b"again");
	assert_matches!(server.is_listening(), Ok(true));
}

#[test]
fn tcp_stop_writes_keeps_reads() {
	let (_server, client, mut peer) = tcp_pair(&SocketOptions::default());

	client.write(b"hello").unwrap();

	peer.stop(Shutdown::Write).unwrap();
	assert_eq!(peer.state(), SocketState::Shutdown(Shutdown::Write));

	assert_matches!(peer.write(b"too late"), Err(SocketError::Write { .. }));
	assert_eq!(read_at_least(&peer, 5), b"hello");

	// The client sees the end of the stream as an empty read, not an error.
	assert_eq!(client.read().unwrap(), b"");
}

#[test]
fn tcp_peek_does_not_consume() {
	let (_server, client, peer) = tcp_pair(&SocketOptions::default());

	client.write(b"x").unwrap();

	assert_eq!(peer.read_with_flags(MsgFlags::PEEK).unwrap(), b"x");
	assert_eq!(peer.read().unwrap(), b"x");
}

#[test]
fn tcp_write_all_loops_over_partial_writes() {
	const LEN: usize = 4 * 1024 * 1024;

	let (_server, mut client, mut peer) = tcp_pair(&SocketOptions::default());
	let payload: Vec<u8> = (0..LEN).map(|i| i as u8).collect();

	let reader = thread::spawn(move || {
		let mut received = vec![0u8; LEN];
		peer.read_exact(&mut received).unwrap();
		received
	});

	// A single write makes no promise to send everything.
	let sent = client.write(&payload).unwrap();
	assert!(sent > 0 && sent <= LEN);

	client.write_all(&payload[sent..]).unwrap();
	client.flush().unwrap();

	assert!(reader.join().unwrap() == payload);
}

#[test]
fn read_buffer_size_limits_each_read() {
	let mut options = SocketOptions::default();
	options.read_buffer_size = Some(4);

	let (_server, client, peer) = tcp_pair(&options);
	client.write(b"hello world").unwrap();

	let first = peer.read().unwrap();
	assert!(!first.is_empty() && first.len() <= 4);
}

#[test]
fn reuse_address_allows_quick_restart() {
	let mut options = SocketOptions::default();
	options.reuse_address = true;

	let (server, client, peer) = tcp_pair(&options);
	let port = server.local_endpoint().unwrap().port();

	// Closing the accepted side first leaves its port in TIME_WAIT.
	drop(peer);
	drop(client);
	drop(server);

	let server = TcpServerSocket::with_options(LOOPBACK, port, &options).unwrap();
	assert_eq!(server.local_endpoint().unwrap(), Endpoint::new(Ipv4Addr::LOCALHOST, port));
}

#[test]
fn connect_refused() {
	let port = {
		let server = TcpServerSocket::new(LOOPBACK, 0).unwrap();
		server.local_endpoint().unwrap().port()
	};

	let error = TcpClientSocket::new(LOOPBACK, port).unwrap_err();

	assert_matches!(
		&error,
		SocketError::Connect { endpoint, error, .. }
		if endpoint.port() == port && error.code != 0
	);

	// The message names the operation, then the native code, then its description.
	let native = error.native().unwrap();
	assert!(error.to_string().contains(&format!("{} {}", native.code, native.description)));
}

#[test]
fn bad_addresses_fail_before_any_syscall() {
	for address in ["", "localhost", "1.2.3", "1.2.3.4.5", "300.1.1.1"] {
		assert_matches!(UdpServerSocket::new(address, 0), Err(SocketError::AddressParse(_)));
		assert_matches!(UdpClientSocket::new(address, 9), Err(SocketError::AddressParse(_)));
		assert_matches!(TcpServerSocket::new(address, 0), Err(SocketError::AddressParse(_)));
		assert_matches!(TcpClientSocket::new(address, 9), Err(SocketError::AddressParse(_)));
	}
}

#[test]
fn dropping_never_fails() {
	// Never connected, so shutting down fails inside `drop`, which must be ignored.
	drop(UdpServerSocket::new(LOOPBACK, 0).unwrap());
	drop(TcpServerSocket::new(LOOPBACK, 0).unwrap());

	// Already shut down, and the other side already gone.
	let (server, client, mut peer) = tcp_pair(&SocketOptions::default());
	peer.stop(Shutdown::Both).unwrap();
	drop(client);
	drop(peer);
	drop(server);
}

#[test]
fn raw_handles_are_distinct() {
	let (server, client, peer) = tcp_pair(&SocketOptions::default());

	let handles = [
		ep_sockets::as_raw_socket(&server),
		ep_sockets::as_raw_socket(&client),
		ep_sockets::as_raw_socket(&peer),
	];

	assert_ne!(handles[0], handles[1]);
	assert_ne!(handles[0], handles[2]);
	assert_ne!(handles[1], handles[2]);
}
