use crate::sys;
use std::mem::MaybeUninit;

/// Gets a raw socket handle or file descriptor from the given socket-like object, such as a [`TcpClientSocket`][crate::TcpClientSocket].
///
/// This is a simple portable abstraction over either `std::os::fd::AsRawFd::as_raw_fd` or `std::os::windows::io::AsRawSocket::as_raw_socket`, depending on the platform.
pub fn as_raw_socket(socket: &impl sys::AsRawSocket) -> sys::RawSocket {
	sys::as_raw_socket(socket)
}

/// Views an initialized buffer as a buffer for the receive calls in `socket2`, which only ever write initialized bytes into it.
pub(crate) fn as_uninit_mut(buffer: &mut [u8]) -> &mut [MaybeUninit<u8>] {
	unsafe {
		// Safety: `MaybeUninit<u8>` has the same layout as `u8`, and every byte is already initialized. The receive calls never write uninitialized bytes, so the buffer stays initialized.
		&mut *(buffer as *mut [u8] as *mut [MaybeUninit<u8>])
	}
}

#[test]
fn test_as_uninit_mut() {
	let mut buffer = *b"abc";
	let uninit = as_uninit_mut(&mut buffer);

	assert_eq!(uninit.len(), 3);
	uninit[1] = MaybeUninit::new(b'x');

	assert_eq!(&buffer, b"axc");
}
