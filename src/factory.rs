//! The role-specific socket types.
//!
//! Every socket type in this module is an instance of [`MultiSocket`], which is parameterized by transport protocol, role, address family, and socket kind. Only five combinations have any operations:
//!
//! | Type | Created by | Operations |
//! |---|---|---|
//! | [`UdpServerSocket`] | creating, then binding | [`read_from`][UdpServerSocket::read_from], [`write_back`][UdpServerSocket::write_back] |
//! | [`UdpClientSocket`] | creating, then connecting | `read`, `write` |
//! | [`TcpServerSocket`] | creating, binding, then listening | [`accept_and_create`][TcpServerSocket::accept_and_create], [`is_listening`][TcpServerSocket::is_listening] |
//! | [`TcpClientSocket`] | creating, then connecting | `read`, `write`, `stop` |
//! | [`TcpActiveSocket`] | accepting a connection | `read`, `write`, `stop` |
//!
//! Operations that don't fit a role don't exist on its type. There is no way to, for example, call `accept_and_create` on a [`UdpClientSocket`].

use crate::{
	errors::SocketError,
	socket_core::{
		AcceptedHandle,
		SocketCore,
		SocketState,
	},
	sys,
	Endpoint,
	MsgFlags,
	SocketOptions,
	Socketable,
};
use socket2::{
	Domain,
	Protocol,
	Type,
};
use std::{
	io,
	marker::PhantomData,
	net::Shutdown,
};

mod sealed {
	pub trait Sealed {}
}

/// A transport protocol: [`Udp`] or [`Tcp`].
pub trait Transport: sealed::Sealed {
	/// The protocol number passed when creating the socket.
	const PROTOCOL: Protocol;
}

/// What a socket is for: [`Server`], [`Client`], or [`Active`].
pub trait Role: sealed::Sealed {}

/// An address family. Only [`Ipv4`] is supported.
pub trait Family: sealed::Sealed {
	/// The socket domain passed when creating the socket.
	const DOMAIN: Domain;
}

/// A socket kind: [`Dgram`] or [`Stream`].
pub trait Kind: sealed::Sealed {
	/// The socket type passed when creating the socket.
	const TYPE: Type;
}

/// Combinations of transport, role, and kind that exchange data with one connected peer, and so have `read` and `write` operations.
pub trait Connected: sealed::Sealed {}

/// The User Datagram Protocol.
#[derive(Debug)]
pub enum Udp {}

/// The Transmission Control Protocol.
#[derive(Debug)]
pub enum Tcp {}

/// A socket bound to a local address, waiting for others to reach it.
#[derive(Debug)]
pub enum Server {}

/// A socket that reaches out to a server.
#[derive(Debug)]
pub enum Client {}

/// A connection accepted by a server.
#[derive(Debug)]
pub enum Active {}

/// IPv4 addresses.
#[derive(Debug)]
pub enum Ipv4 {}

/// Datagram sockets.
#[derive(Debug)]
pub enum Dgram {}

/// Stream sockets.
#[derive(Debug)]
pub enum Stream {}

impl sealed::Sealed for Udp {}
impl Transport for Udp {
	const PROTOCOL: Protocol = Protocol::UDP;
}

impl sealed::Sealed for Tcp {}
impl Transport for Tcp {
	const PROTOCOL: Protocol = Protocol::TCP;
}

impl sealed::Sealed for Server {}
impl Role for Server {}

impl sealed::Sealed for Client {}
impl Role for Client {}

impl sealed::Sealed for Active {}
impl Role for Active {}

impl sealed::Sealed for Ipv4 {}
impl Family for Ipv4 {
	const DOMAIN: Domain = Domain::IPV4;
}

impl sealed::Sealed for Dgram {}
impl Kind for Dgram {
	const TYPE: Type = Type::DGRAM;
}

impl sealed::Sealed for Stream {}
impl Kind for Stream {
	const TYPE: Type = Type::STREAM;
}

impl sealed::Sealed for (Udp, Client, Dgram) {}
impl Connected for (Udp, Client, Dgram) {}

impl sealed::Sealed for (Tcp, Client, Stream) {}
impl Connected for (Tcp, Client, Stream) {}

impl sealed::Sealed for (Tcp, Active, Stream) {}
impl Connected for (Tcp, Active, Stream) {}

/// A socket for one transport protocol, role, address family, and socket kind, wrapping a [`SocketCore`].
///
/// Use the type aliases, like [`TcpServerSocket`], rather than naming this type directly. See [the module documentation][self] for which operations each of them has.
///
/// The socket is shut down and closed when this is dropped.
#[derive(Debug)]
pub struct MultiSocket<T: Transport, R: Role, F: Family, K: Kind> {
	core: SocketCore,
	_role: PhantomData<fn() -> (T, R, F, K)>,
}

/// A UDP socket bound to a local address, answering whoever sent the latest datagram.
pub type UdpServerSocket = MultiSocket<Udp, Server, Ipv4, Dgram>;

/// A UDP socket connected to one server.
pub type UdpClientSocket = MultiSocket<Udp, Client, Ipv4, Dgram>;

/// A listening TCP socket.
pub type TcpServerSocket = MultiSocket<Tcp, Server, Ipv4, Stream>;

/// A TCP connection accepted by a [`TcpServerSocket`].
pub type TcpActiveSocket = MultiSocket<Tcp, Active, Ipv4, Stream>;

/// A TCP connection to a server.
pub type TcpClientSocket = MultiSocket<Tcp, Client, Ipv4, Stream>;

impl<T: Transport, R: Role, F: Family, K: Kind> MultiSocket<T, R, F, K> {
	fn wrap(core: SocketCore) -> Self {
		Self {
			core,
			_role: PhantomData,
		}
	}

	fn create(options: &SocketOptions) -> Result<SocketCore, SocketError> {
		SocketCore::create_with_options(F::DOMAIN, K::TYPE, Some(T::PROTOCOL), options)
	}

	/// The address is parsed before anything else, so a bad address never costs a system call.
	fn create_bound(address: &str, port: u16, options: &SocketOptions) -> Result<SocketCore, SocketError> {
		let endpoint = Endpoint::parse(address, port)?;
		let mut core = Self::create(options)?;

		if options.reuse_address {
			core.reset()?;
		}

		core.bind_endpoint(endpoint)?;
		Ok(core)
	}

	fn create_connected(address: &str, port: u16, options: &SocketOptions) -> Result<SocketCore, SocketError> {
		let endpoint = Endpoint::parse(address, port)?;
		let mut core = Self::create(options)?;
		core.connect_endpoint(endpoint)?;
		Ok(core)
	}

	/// The address and port that this socket is bound to, according to the operating system.
	///
	/// This is how to find out which port a server got when it was asked to bind to port 0.
	pub fn local_endpoint(&self) -> Result<Endpoint, SocketError> {
		self.core.local_endpoint()
	}

	/// The peer most recently recorded by this socket, if any.
	pub fn peer_endpoint(&self) -> Option<Endpoint> {
		self.core.peer_endpoint()
	}

	/// Where this socket is in its lifecycle.
	pub fn state(&self) -> SocketState {
		self.core.state()
	}
}

impl MultiSocket<Udp, Server, Ipv4, Dgram> {
	/// Creates a UDP socket bound to the given address and port.
	pub fn new(address: &str, port: u16) -> Result<Self, SocketError> {
		Self::with_options(address, port, &SocketOptions::default())
	}

	/// Like [`new`][Self::new], with options.
	pub fn with_options(address: &str, port: u16, options: &SocketOptions) -> Result<Self, SocketError> {
		Self::create_bound(address, port, options).map(Self::wrap)
	}

	/// Waits for a datagram, and returns it along with its sender. The sender is who [`write_back`][Self::write_back] will answer.
	pub fn read_from(&mut self) -> Result<(Vec<u8>, Endpoint), SocketError> {
		self.read_from_with_flags(MsgFlags::NONE)
	}

	/// Like [`read_from`][Self::read_from], with flags.
	pub fn read_from_with_flags(&mut self, flags: MsgFlags) -> Result<(Vec<u8>, Endpoint), SocketError> {
		self.core.read_from(flags)
	}

	/// Sends a datagram to the sender of the latest datagram received by [`read_from`][Self::read_from].
	pub fn write_back(&self, buffer: &[u8]) -> Result<usize, SocketError> {
		self.write_back_with_flags(buffer, MsgFlags::NONE)
	}

	/// Like [`write_back`][Self::write_back], with flags.
	pub fn write_back_with_flags(&self, buffer: &[u8], flags: MsgFlags) -> Result<usize, SocketError> {
		self.core.write_back(buffer, flags)
	}
}

impl MultiSocket<Udp, Client, Ipv4, Dgram> {
	/// Creates a UDP socket that sends to, and only receives from, the given address and port.
	pub fn new(address: &str, port: u16) -> Result<Self, SocketError> {
		Self::with_options(address, port, &SocketOptions::default())
	}

	/// Like [`new`][Self::new], with options.
	pub fn with_options(address: &str, port: u16, options: &SocketOptions) -> Result<Self, SocketError> {
		Self::create_connected(address, port, options).map(Self::wrap)
	}
}

impl MultiSocket<Tcp, Server, Ipv4, Stream> {
	/// Creates a TCP socket listening on the given address and port.
	pub fn new(address: &str, port: u16) -> Result<Self, SocketError> {
		Self::with_options(address, port, &SocketOptions::default())
	}

	/// Like [`new`][Self::new], with options.
	pub fn with_options(address: &str, port: u16, options: &SocketOptions) -> Result<Self, SocketError> {
		let mut core = Self::create_bound(address, port, options)?;
		core.be_listening()?;
		Ok(Self::wrap(core))
	}

	/// Waits for a client to connect, and returns the new connection. This socket keeps listening.
	pub fn accept_and_create(&self) -> Result<TcpActiveSocket, SocketError> {
		self.core.accept_and_create().map(TcpActiveSocket::from)
	}

	/// Asks the operating system whether this socket is listening.
	pub fn is_listening(&self) -> Result<bool, SocketError> {
		self.core.is_listening()
	}
}

impl MultiSocket<Tcp, Client, Ipv4, Stream> {
	/// Creates a TCP socket connected to the given address and port.
	pub fn new(address: &str, port: u16) -> Result<Self, SocketError> {
		Self::with_options(address, port, &SocketOptions::default())
	}

	/// Like [`new`][Self::new], with options.
	pub fn with_options(address: &str, port: u16, options: &SocketOptions) -> Result<Self, SocketError> {
		Self::create_connected(address, port, options).map(Self::wrap)
	}
}

impl MultiSocket<Tcp, Active, Ipv4, Stream> {
	/// Takes ownership of a connection accepted by [`Socketable::accept_and_create`].
	pub fn new(handle: AcceptedHandle) -> Self {
		Self::wrap(SocketCore::adopt(handle))
	}
}

impl From<AcceptedHandle> for MultiSocket<Tcp, Active, Ipv4, Stream> {
	fn from(handle: AcceptedHandle) -> Self {
		Self::new(handle)
	}
}

impl<R: Role> MultiSocket<Tcp, R, Ipv4, Stream>
where
	(Tcp, R, Stream): Connected,
{
	/// Shuts down one or both directions of the connection. The socket stays open until it is dropped.
	///
	/// Only connections have this. A [`TcpServerSocket`] keeps listening until it is dropped:
	///
	/// ```compile_fail
	/// # use ep_sockets::TcpServerSocket;
	/// let mut server = TcpServerSocket::new("127.0.0.1", 0).unwrap();
	/// server.stop(std::net::Shutdown::Read).unwrap();
	/// ```
	pub fn stop(&mut self, direction: Shutdown) -> Result<(), SocketError> {
		self.core.stop(direction)
	}
}

impl<T, R, F, K> MultiSocket<T, R, F, K>
where
	T: Transport,
	R: Role,
	F: Family,
	K: Kind,
	(T, R, K): Connected,
{
	/// Waits for data from the peer, and returns what one receive call delivered.
	///
	/// An empty buffer means that the peer has closed its side of the connection, or, for UDP, that an empty datagram arrived.
	pub fn read(&self) -> Result<Vec<u8>, SocketError> {
		self.read_with_flags(MsgFlags::NONE)
	}

	/// Like [`read`][Self::read], with flags.
	pub fn read_with_flags(&self, flags: MsgFlags) -> Result<Vec<u8>, SocketError> {
		self.core.read(flags)
	}

	/// Sends data to the peer, returning how many bytes were accepted.
	///
	/// That can be fewer than `buffer.len()`. To send all of it, call this again with the rest, or use [`io::Write::write_all`].
	pub fn write(&self, buffer: &[u8]) -> Result<usize, SocketError> {
		self.write_with_flags(buffer, MsgFlags::NONE)
	}

	/// Like [`write`][Self::write], with flags.
	pub fn write_with_flags(&self, buffer: &[u8], flags: MsgFlags) -> Result<usize, SocketError> {
		self.core.write(buffer, flags)
	}
}

impl<T, R, F, K> io::Read for MultiSocket<T, R, F, K>
where
	T: Transport,
	R: Role,
	F: Family,
	K: Kind,
	(T, R, K): Connected,
{
	fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
		Ok(self.core.read_into(buf, MsgFlags::NONE)?)
	}
}

impl<T, R, F, K> io::Write for MultiSocket<T, R, F, K>
where
	T: Transport,
	R: Role,
	F: Family,
	K: Kind,
	(T, R, K): Connected,
{
	fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
		Ok(self.core.write(buf, MsgFlags::NONE)?)
	}

	fn flush(&mut self) -> io::Result<()> {
		Ok(())
	}
}

impl<T: Transport, R: Role, F: Family, K: Kind> sys::AsRawSocket for MultiSocket<T, R, F, K> {
	#[cfg(unix)]
	fn as_raw_fd(&self) -> sys::RawSocket {
		sys::as_raw_socket(&self.core)
	}

	#[cfg(windows)]
	fn as_raw_socket(&self) -> sys::RawSocket {
		sys::as_raw_socket(&self.core)
	}
}
