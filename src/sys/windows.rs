use once_cell::sync::Lazy;
use socket2::Socket;
use std::{
	collections::HashMap,
	ffi::c_int,
	io,
	mem,
};
use windows_sys::Win32::Networking::WinSock::{
	self as ws,
	getsockopt,
	SO_ACCEPTCONN,
	SOL_SOCKET,
};

pub use std::os::windows::io::{
	AsRawSocket,
	RawSocket,
};

pub const EDESTADDRREQ: i32 = ws::WSAEDESTADDRREQ;

pub const MSG_PEEK: c_int = ws::MSG_PEEK as c_int;
pub const MSG_OOB: c_int = ws::MSG_OOB as c_int;
pub const MSG_WAITALL: c_int = ws::MSG_WAITALL as c_int;
pub const MSG_DONTROUTE: c_int = ws::MSG_DONTROUTE as c_int;

static ERROR_DESCRIPTIONS: Lazy<HashMap<i32, &'static str>> = Lazy::new(|| [
	(0, "No error."),
	(ws::SOCKET_ERROR, "Generic socket error."),
	(ws::WSASYSNOTREADY, "The underlying network subsystem is not ready for network communication."),
	(ws::WSAVERNOTSUPPORTED, "The version of Windows Sockets support requested is not provided by this Windows Sockets implementation."),
	(ws::WSAEPROCLIM, "A limit on the number of tasks supported by the Windows Sockets implementation has been reached."),
	(ws::WSANOTINITIALISED, "A successful WSAStartup call must occur before using this function."),
	(ws::WSAENETDOWN, "The network subsystem has failed."),
	(ws::WSAEINPROGRESS, "A blocking Windows Sockets 1.1 call is in progress, or the service provider is still processing a callback function."),
	(ws::WSAEACCES, "An attempt was made to access a socket in a way forbidden by its access permissions."),
	(ws::WSAEADDRINUSE, "Only one usage of each socket address (protocol/network address/port) is normally permitted."),
	(ws::WSAEADDRNOTAVAIL, "The requested address is not valid in its context."),
	(ws::WSAEFAULT, "The system detected an invalid pointer address in attempting to use a pointer argument in a call."),
	(ws::WSAEINVAL, "An invalid argument was supplied."),
	(ws::WSAENOBUFS, "An operation on a socket could not be performed because the system lacked sufficient buffer space or because a queue was full."),
	(ws::WSAENOTSOCK, "An operation was attempted on something that is not a socket."),
	(ws::WSAENOTCONN, "The socket is not connected."),
	(ws::WSAEINTR, "The blocking call was canceled."),
	(ws::WSAENETRESET, "The connection has been broken due to keep-alive activity detecting a failure, or the time to live of a datagram has expired."),
	(ws::WSAEOPNOTSUPP, "The operation is not supported for the type of object referenced, such as MSG_OOB on a socket that is not stream-style."),
	(ws::WSAESHUTDOWN, "The socket has been shut down in the direction of this operation."),
	(ws::WSAEWOULDBLOCK, "The socket is marked as nonblocking and the operation would block."),
	(ws::WSAEMSGSIZE, "The message was too large to fit into the specified buffer and was truncated."),
	(ws::WSAECONNABORTED, "The virtual circuit was terminated due to a time-out or other failure."),
	(ws::WSAECONNREFUSED, "No connection could be made because the target computer actively refused it."),
	(ws::WSAETIMEDOUT, "The connection has been dropped because of a network failure or because the peer system failed to respond."),
	(ws::WSAECONNRESET, "The virtual circuit was reset by the remote side executing a hard or abortive close."),
	(ws::WSAEHOSTUNREACH, "A socket operation was attempted to an unreachable host."),
	(ws::WSAENETUNREACH, "The network cannot be reached from this host at this time."),
	(ws::WSAEDESTADDRREQ, "A destination address is required."),
	(ws::WSAEAFNOSUPPORT, "Addresses in the specified family cannot be used with this socket."),
].into_iter().collect());

pub fn describe_error(code: i32) -> Option<&'static str> {
	ERROR_DESCRIPTIONS.get(&code).copied()
}

pub fn is_listening(socket: &Socket) -> io::Result<bool> {
	let mut is_listening_dword: u32 = 0;
	let mut is_listening_dword_len: c_int = mem::size_of_val(&is_listening_dword) as c_int;

	let getsockopt_result = unsafe {
		// Safety:
		//
		// * `socket.as_raw_socket()` is a valid socket handle.
		// * `SOL_SOCKET` AND `SO_ACCEPTCONN` are a valid socket option level and socket option in that level, respectively.
		// * `is_listening_dword` is a valid `DWORD`, which is the data type that `SO_ACCEPTCONN` expects a pointer to, and `is_listening_dword_len` is its length.
		getsockopt(
			socket.as_raw_socket() as _,
			SOL_SOCKET,
			SO_ACCEPTCONN,
			&mut is_listening_dword as *mut u32 as *mut _,
			&mut is_listening_dword_len,
		)
	};

	if getsockopt_result != 0 {
		return Err(io::Error::last_os_error());
	}

	Ok(is_listening_dword != 0)
}

pub fn as_raw_socket(socket: &impl AsRawSocket) -> RawSocket {
	socket.as_raw_socket()
}
