use nix::errno::Errno;
use socket2::Socket;
use std::{
	ffi::c_int,
	io,
	mem,
};

pub use std::os::fd::{
	AsRawFd as AsRawSocket,
	RawFd as RawSocket,
};

pub const EDESTADDRREQ: i32 = libc::EDESTADDRREQ;

pub const MSG_PEEK: c_int = libc::MSG_PEEK;
pub const MSG_OOB: c_int = libc::MSG_OOB;
pub const MSG_WAITALL: c_int = libc::MSG_WAITALL;
pub const MSG_DONTROUTE: c_int = libc::MSG_DONTROUTE;
pub const MSG_DONTWAIT: c_int = libc::MSG_DONTWAIT;

pub fn describe_error(code: i32) -> Option<&'static str> {
	match Errno::from_i32(code) {
		Errno::UnknownErrno => None,
		errno => Some(errno.desc()),
	}
}

pub fn is_listening(socket: &Socket) -> io::Result<bool> {
	let mut is_listening: c_int = 0;
	let mut is_listening_len = mem::size_of_val(&is_listening) as libc::socklen_t;

	let getsockopt_result = unsafe {
		// Safety:
		//
		// * `socket.as_raw_fd()` is a valid socket file descriptor.
		// * `SOL_SOCKET` and `SO_ACCEPTCONN` are a valid socket option level and socket option in that level, respectively.
		// * `is_listening` is a valid `int`, which is what `SO_ACCEPTCONN` expects a pointer to, and `is_listening_len` is its length.
		libc::getsockopt(
			socket.as_raw_fd(),
			libc::SOL_SOCKET,
			libc::SO_ACCEPTCONN,
			&mut is_listening as *mut c_int as *mut _,
			&mut is_listening_len,
		)
	};

	if getsockopt_result != 0 {
		return Err(io::Error::last_os_error());
	}

	Ok(is_listening != 0)
}

pub fn as_raw_socket(socket: &impl AsRawSocket) -> RawSocket {
	socket.as_raw_fd()
}
