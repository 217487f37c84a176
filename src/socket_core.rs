//! The platform-neutral socket engine that every role-specific socket type is built on.

use crate::{
	errors::SocketError,
	sys,
	util::as_uninit_mut,
	Endpoint,
	MsgFlags,
	SocketOptions,
	Socketable,
};
use socket2::{
	Domain,
	Protocol,
	Socket,
	Type,
};
use std::{
	io,
	net::Shutdown,
};

#[cfg(test)]
use {
	assert_matches::assert_matches,
	std::{
		sync::mpsc,
		thread,
	},
};

/// Where a [`SocketCore`] is in its lifecycle.
///
/// A socket starts out `Created`. Stream sockets then go through `Bound` and `Listening` (servers), or straight to `Connected` (clients). Sockets produced by accepting a connection start out `AcceptedPeer`. Datagram sockets never listen; they go from `Created` to `Bound` or `Connected`.
///
/// Once [`Socketable::stop`] has been called, the socket is `Shutdown` in one or both directions. The socket is closed only when it is dropped.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum SocketState {
	/// Newly created, with no address assigned.
	Created,

	/// Assigned a local address.
	Bound,

	/// Listening for incoming connections.
	Listening,

	/// Connected to a peer, or, for a datagram socket, given a default peer.
	Connected,

	/// Accepted from a listening socket.
	AcceptedPeer,

	/// Shut down in the given direction.
	Shutdown(Shutdown),
}

/// A connection taken off a listening socket's queue by [`Socketable::accept_and_create`].
///
/// This is the only thing that a [`TcpActiveSocket`][crate::TcpActiveSocket] (or a [`SocketCore`], using [`SocketCore::adopt`]) can be created from.
#[derive(Debug)]
pub struct AcceptedHandle {
	socket: Socket,
	domain: Domain,
	r#type: Type,
	protocol: Option<Protocol>,
	options: SocketOptions,
	peer: Option<Endpoint>,
}

impl AcceptedHandle {
	/// The address of the peer that connected.
	pub fn peer(&self) -> Option<Endpoint> {
		self.peer
	}
}

/// Owns exactly one operating-system socket, and implements every [`Socketable`] operation on it.
///
/// The socket is shut down and closed when this is dropped. Errors in doing so are ignored. There is no other way to close it.
///
///
/// # Concurrency
///
/// Every operation blocks the calling thread until its system call completes. Operations that change the socket's recorded state take `&mut self`; the others take `&self` and may be called from several threads at once, but then no particular order among them is guaranteed.
#[derive(Debug)]
pub struct SocketCore {
	socket: Socket,
	domain: Domain,
	r#type: Type,
	protocol: Option<Protocol>,
	options: SocketOptions,
	state: SocketState,
	local: Option<Endpoint>,
	peer: Option<Endpoint>,
}

impl SocketCore {
	/// Creates a new socket with default [`SocketOptions`].
	///
	/// # Errors
	///
	/// [`SocketError::Allocation`] if the operating system refuses, such as when it is out of sockets or doesn't support the combination of `domain`, `type`, and `protocol`.
	pub fn create(
		domain: Domain,
		r#type: Type,
		protocol: Option<Protocol>,
	) -> Result<Self, SocketError> {
		Self::create_with_options(domain, r#type, protocol, &SocketOptions::default())
	}

	/// Creates a new socket.
	///
	/// `options` determine the listen backlog and the read buffer size. Applying [`SocketOptions::reuse_address`] is up to the caller.
	pub fn create_with_options(
		domain: Domain,
		r#type: Type,
		protocol: Option<Protocol>,
		options: &SocketOptions,
	) -> Result<Self, SocketError> {
		let socket: Socket =
			Socket::new(domain, r#type, protocol)
			.map_err(|error| SocketError::Allocation { error: error.into() })?;

		tracing::debug!(handle = sys::as_raw_socket(&socket), ?domain, socket_type = ?r#type, "created socket");

		Ok(Self {
			socket,
			domain,
			r#type,
			protocol,
			options: options.clone(),
			state: SocketState::Created,
			local: None,
			peer: None,
		})
	}

	/// Takes ownership of an accepted connection. No new socket is created.
	pub fn adopt(handle: AcceptedHandle) -> Self {
		let AcceptedHandle { socket, domain, r#type, protocol, options, peer } = handle;

		tracing::debug!(handle = sys::as_raw_socket(&socket), peer = ?peer, "adopted accepted socket");

		Self {
			socket,
			domain,
			r#type,
			protocol,
			options,
			state: SocketState::AcceptedPeer,
			local: None,
			peer,
		}
	}

	/// Where this socket is in its lifecycle.
	pub fn state(&self) -> SocketState {
		self.state
	}

	/// The socket domain (address family) this socket was created with.
	pub fn domain(&self) -> Domain {
		self.domain
	}

	/// The socket type, such as stream or datagram, this socket was created with.
	pub fn r#type(&self) -> Type {
		self.r#type
	}

	/// The transport protocol this socket was created with, if one was given explicitly.
	pub fn protocol(&self) -> Option<Protocol> {
		self.protocol
	}

	/// The options this socket was created with.
	pub fn options(&self) -> &SocketOptions {
		&self.options
	}

	/// The address and port that this socket is bound to, according to the operating system.
	///
	/// Unlike the address given to [`Socketable::bind_to`], this has the actual port number when binding to port 0.
	pub fn local_endpoint(&self) -> Result<Endpoint, SocketError> {
		let query_error = |error: io::Error| SocketError::Query {
			query: "getsockname",
			error: error.into(),
		};

		let addr: socket2::SockAddr =
			self.socket.local_addr()
			.map_err(query_error)?;

		Endpoint::from_sock_addr(&addr)
		.ok_or_else(|| query_error(io::Error::new(io::ErrorKind::InvalidData, "local address is not an IPv4 address")))
	}

	/// The most recently recorded peer: the address connected to, the sender of the latest datagram received with [`Socketable::read_from`], or, for an accepted socket, the peer that connected.
	pub fn peer_endpoint(&self) -> Option<Endpoint> {
		self.peer
	}

	/// Like [`Socketable::connect_to`], but with an address that is already parsed.
	pub fn connect_endpoint(&mut self, endpoint: Endpoint) -> Result<(), SocketError> {
		self.socket.connect(&endpoint.to_sock_addr())
		.map_err(|error| SocketError::Connect {
			endpoint,
			error: error.into(),
		})?;

		tracing::debug!(handle = sys::as_raw_socket(&self.socket), %endpoint, "connected");

		self.peer = Some(endpoint);
		self.state = SocketState::Connected;
		Ok(())
	}

	/// Like [`Socketable::bind_to`], but with an address that is already parsed.
	pub fn bind_endpoint(&mut self, endpoint: Endpoint) -> Result<(), SocketError> {
		self.socket.bind(&endpoint.to_sock_addr())
		.map_err(|error| SocketError::Bind {
			endpoint,
			error: error.into(),
		})?;

		tracing::debug!(handle = sys::as_raw_socket(&self.socket), %endpoint, "bound");

		self.local = Some(endpoint);
		if self.state == SocketState::Created {
			self.state = SocketState::Bound;
		}
		Ok(())
	}

	/// Receives into the given buffer, rather than a newly allocated one.
	///
	/// Returns the number of bytes received. Zero means that the peer has closed its side of the stream, or that an empty datagram arrived.
	pub fn read_into(&self, buffer: &mut [u8], flags: MsgFlags) -> Result<usize, SocketError> {
		let received: usize =
			self.socket.recv_with_flags(as_uninit_mut(buffer), flags.bits())
			.map_err(|error| SocketError::Read { error: error.into() })?;

		tracing::trace!(handle = sys::as_raw_socket(&self.socket), received, "read");

		Ok(received)
	}

	fn new_read_buffer(&self) -> Vec<u8> {
		vec![0u8; self.options.read_buffer_size()]
	}
}

/// A send that accepts nothing, from a buffer that isn't empty, is a failure.
fn check_sent(sent: usize, requested: usize) -> Result<usize, SocketError> {
	if sent == 0 && requested != 0 {
		Err(SocketError::Write {
			error: io::Error::from(io::ErrorKind::WriteZero).into(),
		})
	}
	else {
		Ok(sent)
	}
}

impl Socketable for SocketCore {
	fn connect_to(&mut self, address: &str, port: u16) -> Result<(), SocketError> {
		self.connect_endpoint(Endpoint::parse(address, port)?)
	}

	fn bind_to(&mut self, address: &str, port: u16) -> Result<(), SocketError> {
		self.bind_endpoint(Endpoint::parse(address, port)?)
	}

	fn be_listening(&mut self) -> Result<(), SocketError> {
		assert_eq!(self.r#type, Type::STREAM, "only stream sockets can listen");
		assert!(self.local.is_some(), "a socket must be bound before it can listen");

		let backlog = self.options.listen_backlog();

		self.socket.listen(backlog)
		.map_err(|error| SocketError::Listen { error: error.into() })?;

		tracing::debug!(handle = sys::as_raw_socket(&self.socket), backlog, "listening");

		self.state = SocketState::Listening;
		Ok(())
	}

	fn is_listening(&self) -> Result<bool, SocketError> {
		sys::is_listening(&self.socket)
		.map_err(|error| SocketError::Query {
			query: "SO_ACCEPTCONN",
			error: error.into(),
		})
	}

	fn accept_and_create(&self) -> Result<AcceptedHandle, SocketError> {
		assert_eq!(self.state, SocketState::Listening, "only listening sockets can accept connections");

		let (socket, peer): (Socket, socket2::SockAddr) =
			self.socket.accept()
			.map_err(|error| SocketError::Accept { error: error.into() })?;

		let peer: Option<Endpoint> = Endpoint::from_sock_addr(&peer);

		tracing::debug!(
			handle = sys::as_raw_socket(&self.socket),
			accepted = sys::as_raw_socket(&socket),
			peer = ?peer,
			"accepted connection"
		);

		Ok(AcceptedHandle {
			socket,
			domain: self.domain,
			r#type: self.r#type,
			protocol: self.protocol,
			options: self.options.clone(),
			peer,
		})
	}

	fn read(&self, flags: MsgFlags) -> Result<Vec<u8>, SocketError> {
		let mut buffer = self.new_read_buffer();
		let received = self.read_into(&mut buffer, flags)?;
		buffer.truncate(received);
		Ok(buffer)
	}

	fn write(&self, buffer: &[u8], flags: MsgFlags) -> Result<usize, SocketError> {
		let sent: usize =
			self.socket.send_with_flags(buffer, flags.bits())
			.map_err(|error| SocketError::Write { error: error.into() })?;

		tracing::trace!(handle = sys::as_raw_socket(&self.socket), sent, requested = buffer.len(), "wrote");

		check_sent(sent, buffer.len())
	}

	fn read_from(&mut self, flags: MsgFlags) -> Result<(Vec<u8>, Endpoint), SocketError> {
		let mut buffer = self.new_read_buffer();

		let (received, sender): (usize, socket2::SockAddr) =
			self.socket.recv_from_with_flags(as_uninit_mut(&mut buffer), flags.bits())
			.map_err(|error| SocketError::Read { error: error.into() })?;

		let sender: Endpoint =
			Endpoint::from_sock_addr(&sender)
			.ok_or_else(|| SocketError::Read {
				error: io::Error::new(io::ErrorKind::InvalidData, "sender is not an IPv4 address").into(),
			})?;

		tracing::trace!(handle = sys::as_raw_socket(&self.socket), received, %sender, "read datagram");

		buffer.truncate(received);
		self.peer = Some(sender);
		Ok((buffer, sender))
	}

	fn write_back(&self, buffer: &[u8], flags: MsgFlags) -> Result<usize, SocketError> {
		let peer: Endpoint =
			self.peer
			.ok_or_else(|| SocketError::Write {
				error: io::Error::from_raw_os_error(sys::EDESTADDRREQ).into(),
			})?;

		let sent: usize =
			self.socket.send_to_with_flags(buffer, &peer.to_sock_addr(), flags.bits())
			.map_err(|error| SocketError::Write { error: error.into() })?;

		tracing::trace!(handle = sys::as_raw_socket(&self.socket), sent, %peer, "wrote datagram");

		check_sent(sent, buffer.len())
	}

	fn reset(&self) -> Result<(), SocketError> {
		self.socket.set_reuse_address(true)
		.map_err(|error| SocketError::SetOption {
			option: "SO_REUSEADDR",
			error: error.into(),
		})?;

		#[cfg(all(unix, not(any(target_os = "solaris", target_os = "illumos"))))]
		self.socket.set_reuse_port(true)
		.map_err(|error| SocketError::SetOption {
			option: "SO_REUSEPORT",
			error: error.into(),
		})?;

		tracing::debug!(handle = sys::as_raw_socket(&self.socket), "enabled address reuse");

		Ok(())
	}

	fn stop(&mut self, direction: Shutdown) -> Result<(), SocketError> {
		self.socket.shutdown(direction)
		.map_err(|error| SocketError::Shutdown { error: error.into() })?;

		tracing::debug!(handle = sys::as_raw_socket(&self.socket), ?direction, "shut down");

		self.state = SocketState::Shutdown(match (self.state, direction) {
			| (SocketState::Shutdown(Shutdown::Read), Shutdown::Write)
			| (SocketState::Shutdown(Shutdown::Write), Shutdown::Read)
			| (SocketState::Shutdown(Shutdown::Both), _)
			=> Shutdown::Both,

			(_, direction) => direction,
		});

		Ok(())
	}
}

impl sys::AsRawSocket for SocketCore {
	#[cfg(unix)]
	fn as_raw_fd(&self) -> sys::RawSocket {
		sys::as_raw_socket(&self.socket)
	}

	#[cfg(windows)]
	fn as_raw_socket(&self) -> sys::RawSocket {
		sys::as_raw_socket(&self.socket)
	}
}

impl Drop for SocketCore {
	fn drop(&mut self) {
		let handle = sys::as_raw_socket(&self.socket);

		// The socket itself is closed when `self.socket` is dropped, right after this.
		if let Err(error) = self.socket.shutdown(Shutdown::Both) {
			tracing::trace!(handle, %error, "ignored error shutting down socket before closing it");
		}
	}
}

#[cfg(test)]
fn loopback_listener() -> SocketCore {
	let mut socket = SocketCore::create(Domain::IPV4, Type::STREAM, None).unwrap();
	socket.bind_to("127.0.0.1", 0).unwrap();
	socket.be_listening().unwrap();
	socket
}

#[test]
fn test_lifecycle() {
	let mut socket = SocketCore::create(Domain::IPV4, Type::STREAM, Some(Protocol::TCP)).unwrap();
	assert_eq!(socket.state(), SocketState::Created);
	assert_matches!(socket.is_listening(), Ok(false));

	socket.bind_to("127.0.0.1", 0).unwrap();
	assert_eq!(socket.state(), SocketState::Bound);

	socket.be_listening().unwrap();
	assert_eq!(socket.state(), SocketState::Listening);
	assert_matches!(socket.is_listening(), Ok(true));

	let local = socket.local_endpoint().unwrap();
	assert_eq!(local.address(), std::net::Ipv4Addr::LOCALHOST);
	assert_ne!(local.port(), 0);
}

#[test]
fn test_bad_address_is_not_a_syscall_failure() {
	let mut socket = SocketCore::create(Domain::IPV4, Type::DGRAM, None).unwrap();

	assert_matches!(socket.bind_to("127.0.0.256", 0), Err(SocketError::AddressParse(_)));
	assert_matches!(socket.connect_to("not an address", 9), Err(SocketError::AddressParse(_)));
	assert_eq!(socket.state(), SocketState::Created);
	assert_eq!(socket.peer_endpoint(), None);
}

#[test]
fn test_failed_bind_can_be_retried() {
	let listener = loopback_listener();
	let taken = listener.local_endpoint().unwrap();

	let mut socket = SocketCore::create(Domain::IPV4, Type::STREAM, None).unwrap();

	let error = socket.bind_to("127.0.0.1", taken.port()).unwrap_err();
	assert_matches!(
		&error,
		SocketError::Bind { endpoint, error }
		if *endpoint == taken && error.code != 0
	);
	assert!(error.to_string().contains(&taken.to_string()));
	assert_eq!(socket.state(), SocketState::Created);

	socket.bind_to("127.0.0.1", 0).unwrap();
	assert_eq!(socket.state(), SocketState::Bound);
}

#[test]
fn test_write_back_without_peer() {
	let mut socket = SocketCore::create(Domain::IPV4, Type::DGRAM, None).unwrap();
	socket.bind_to("127.0.0.1", 0).unwrap();

	assert_matches!(
		socket.write_back(b"anyone?", MsgFlags::NONE),
		Err(SocketError::Write { error })
		if error.code == sys::EDESTADDRREQ
	);
}

#[test]
#[should_panic(expected = "only stream sockets can listen")]
fn test_datagram_cannot_listen() {
	let mut socket = SocketCore::create(Domain::IPV4, Type::DGRAM, None).unwrap();
	socket.bind_to("127.0.0.1", 0).unwrap();
	let _ = socket.be_listening();
}

#[test]
#[should_panic(expected = "only listening sockets can accept connections")]
fn test_accept_requires_listening() {
	let socket = SocketCore::create(Domain::IPV4, Type::STREAM, None).unwrap();
	let _ = socket.accept_and_create();
}

#[test]
fn test_reset_and_rebind() {
	let mut first = SocketCore::create(Domain::IPV4, Type::DGRAM, None).unwrap();
	first.reset().unwrap();
	first.bind_to("127.0.0.1", 0).unwrap();
	let port = first.local_endpoint().unwrap().port();
	drop(first);

	let mut second = SocketCore::create(Domain::IPV4, Type::DGRAM, None).unwrap();
	second.reset().unwrap();
	second.bind_to("127.0.0.1", port).unwrap();
}

#[test]
fn test_accept_and_stop() {
	let listener = loopback_listener();
	let endpoint = listener.local_endpoint().unwrap();
	let (done_tx, done_rx) = mpsc::channel::<()>();

	let client_thread = thread::spawn(move || {
		let mut client = SocketCore::create(Domain::IPV4, Type::STREAM, None).unwrap();
		client.connect_to("127.0.0.1", endpoint.port()).unwrap();
		assert_eq!(client.state(), SocketState::Connected);
		assert_eq!(client.peer_endpoint(), Some(endpoint));

		client.write(b"abc", MsgFlags::NONE).unwrap();

		// Zero bytes means the server shut down its sending side.
		assert_eq!(client.read(MsgFlags::NONE).unwrap(), b"");

		// Stay connected until the server is finished with its side.
		let _ = done_rx.recv();
	});

	let handle = listener.accept_and_create().unwrap();
	assert!(handle.peer().is_some());

	let mut peer = SocketCore::adopt(handle);
	assert_eq!(peer.state(), SocketState::AcceptedPeer);
	assert_matches!(listener.is_listening(), Ok(true));

	peer.stop(Shutdown::Write).unwrap();
	assert_eq!(peer.state(), SocketState::Shutdown(Shutdown::Write));

	let mut received = Vec::new();
	while received.len() < 3 {
		let chunk = peer.read(MsgFlags::NONE).unwrap();
		assert!(!chunk.is_empty());
		received.extend(chunk);
	}
	assert_eq!(received, b"abc");

	peer.stop(Shutdown::Read).unwrap();
	assert_eq!(peer.state(), SocketState::Shutdown(Shutdown::Both));

	done_tx.send(()).unwrap();
	client_thread.join().unwrap();
}

#[test]
fn test_drop_never_fails() {
	// Shutting down a socket that was never connected fails, which must be ignored.
	drop(SocketCore::create(Domain::IPV4, Type::STREAM, None).unwrap());

	let mut socket = SocketCore::create(Domain::IPV4, Type::DGRAM, None).unwrap();
	socket.bind_to("127.0.0.1", 0).unwrap();
	drop(socket);
}

#[test]
fn test_check_sent() {
	assert_matches!(check_sent(0, 0), Ok(0));
	assert_matches!(check_sent(3, 5), Ok(3));
	assert_matches!(
		check_sent(0, 5),
		Err(SocketError::Write { error })
		if error.kind == io::ErrorKind::WriteZero
	);
}
