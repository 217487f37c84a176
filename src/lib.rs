//! This library provides blocking UDP and TCP sockets that behave the same on Unix-like platforms and Windows, with a separate type for each role a socket can play.
//!
//! For example, a [`TcpServerSocket`] is bound and listening as soon as it is created, and all it can do is accept connections, each of which becomes a [`TcpActiveSocket`] that can read and write. Operations that don't make sense for a role, like accepting connections on a [`UdpClientSocket`], don't exist on that role's type.
//!
//!
//! # Usage
//!
//! ```no_run
//! use ep_sockets::{TcpClientSocket, TcpServerSocket};
//!
//! # fn example_fn() -> Result<(), ep_sockets::errors::SocketError> {
//! let server = TcpServerSocket::new("127.0.0.1", 40001)?;
//! let client = TcpClientSocket::new("127.0.0.1", 40001)?;
//!
//! let peer = server.accept_and_create()?;
//! client.write(b"hello")?;
//! assert_eq!(peer.read()?, b"hello");
//! #
//! # Ok(())
//! # }
//! ```
//!
//! Addresses are always a dotted-decimal IPv4 address and a separate port number. Host names are not resolved.
//!
//! Every operation blocks the calling thread until the operating system is done with it, and is attempted exactly once. Failures are reported as a [`SocketError`][errors::SocketError], which names the operation that failed along with the operating system's error code and its description.
//!
//! All of the role-specific types are built on [`SocketCore`], which has every socket operation (see the [`Socketable`] trait) and can be used directly when none of the roles fit.
//!
//!
//! # Feature flags and platform support
//!
//! This library is based on [`socket2`], and should work on any platform that `socket2` works on, which as of this writing is Unix-like platforms and Windows.
//!
//! On Windows, the socket subsystem is initialized by `socket2` when the first socket is created. There is no need to call `WSAStartup` first.
#![cfg_attr(all(
	feature = "clap",
	feature = "serde",
), doc = r#"

## Available feature flags

This library has the following feature flags:

* `clap`: Support parsing socket options from the command line using [`clap`]. Specifically, this adds an implementation of [`clap::Args`] for [`SocketOptions`].
* `serde`: Support parsing socket options from configuration files using [`serde`]. Specifically, this adds an implementation of [`serde::Deserialize`] to [`SocketOptions`], and of `Serialize` and `Deserialize` to [`Endpoint`].
"#)]

#![allow(clippy::tabs_in_doc_comments)] // This project uses tabs for indentation throughout, including in documentation examples.

mod addr;
pub mod errors;
pub mod factory;
mod flags;
mod options;
pub mod socket_core;
mod socketable;
mod util;

pub use self::{
	addr::*,
	factory::{
		TcpActiveSocket,
		TcpClientSocket,
		TcpServerSocket,
		UdpClientSocket,
		UdpServerSocket,
	},
	flags::*,
	options::*,
	socket_core::{
		AcceptedHandle,
		SocketCore,
		SocketState,
	},
	socketable::*,
	util::*,
};

cfg_if::cfg_if! {
	if #[cfg(windows)] {
		#[path = "sys/windows.rs"] mod sys;
	}
	else {
		#[path = "sys/other.rs"] mod sys;
	}
}
