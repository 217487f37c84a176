use crate::{
	errors::SocketError,
	socket_core::AcceptedHandle,
	Endpoint,
	MsgFlags,
};
use std::net::Shutdown;

#[cfg(doc)]
use crate::socket_core::SocketCore;

/// Every operation that a socket can perform.
///
/// [`SocketCore`] implements all of them. The role-specific socket types, like [`TcpServerSocket`][crate::TcpServerSocket], do not implement this trait. Each of them only has the subset of these operations that make sense for its role, as inherent methods.
///
/// Every operation makes exactly one attempt at the underlying system call, and blocks the calling thread until that call completes. Nothing is retried.
pub trait Socketable {
	/// Connects to the given address and port.
	///
	/// For a stream socket, this establishes a connection. For a datagram socket, this sets the address that datagrams are sent to by default, and the only address that datagrams are received from.
	///
	/// # Errors
	///
	/// [`SocketError::AddressParse`] if `address` is not a dotted-decimal IPv4 address, or [`SocketError::Connect`] if the system call fails. Either way, the socket is left as it was.
	fn connect_to(&mut self, address: &str, port: u16) -> Result<(), SocketError>;

	/// Assigns the given local address and port to this socket.
	///
	/// # Errors
	///
	/// [`SocketError::AddressParse`] if `address` is not a dotted-decimal IPv4 address, or [`SocketError::Bind`] if the system call fails, such as when the address is already in use. Either way, the socket is left as it was, and binding can be tried again.
	fn bind_to(&mut self, address: &str, port: u16) -> Result<(), SocketError>;

	/// Marks this socket as passive, that is, as a socket that will be used to accept incoming connections with [`accept_and_create`][Self::accept_and_create].
	///
	/// # Panics
	///
	/// If this is not a stream socket, or it has not been bound yet.
	fn be_listening(&mut self) -> Result<(), SocketError>;

	/// Asks the operating system whether this socket is listening. Never changes anything.
	fn is_listening(&self) -> Result<bool, SocketError>;

	/// Waits for a pending connection on this listening socket, and takes it off the queue.
	///
	/// The returned handle refers to a new connected socket, and records the peer's address. This socket is not affected, and keeps listening.
	///
	/// # Panics
	///
	/// If this socket is not listening.
	fn accept_and_create(&self) -> Result<AcceptedHandle, SocketError>;

	/// Receives data from the connected peer.
	///
	/// This blocks until at least one byte is available or the peer closes the connection, and returns what one receive call delivered. Messages are not reassembled.
	///
	/// An empty buffer means that the peer has closed its side of the stream, or, for a datagram socket, that an empty datagram arrived.
	fn read(&self, flags: MsgFlags) -> Result<Vec<u8>, SocketError>;

	/// Sends data to the connected peer.
	///
	/// Returns how many bytes were accepted, which can be less than `buffer.len()`. The rest is not sent; callers who need all of it sent must call this again with the remainder.
	fn write(&self, buffer: &[u8], flags: MsgFlags) -> Result<usize, SocketError>;

	/// Receives a datagram, and records its sender as the peer for [`write_back`][Self::write_back].
	///
	/// Returns the data along with the sender's address. An empty buffer is an empty datagram.
	fn read_from(&mut self, flags: MsgFlags) -> Result<(Vec<u8>, Endpoint), SocketError>;

	/// Sends a datagram to the most recently recorded peer.
	///
	/// # Errors
	///
	/// [`SocketError::Write`] if no peer has been recorded yet, with the native "destination address required" error code.
	fn write_back(&self, buffer: &[u8], flags: MsgFlags) -> Result<usize, SocketError>;

	/// Lets this socket bind to an address and port that may still be tied up by a previous socket.
	fn reset(&self) -> Result<(), SocketError>;

	/// Shuts down one or both directions of the connection, without closing the socket.
	fn stop(&mut self, direction: Shutdown) -> Result<(), SocketError>;
}
