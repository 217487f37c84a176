//! Various errors that can be raised by this library.

use crate::{
	Endpoint,
	sys,
};
use std::{
	borrow::Cow,
	fmt::{self, Display, Formatter},
	io,
	net,
	num::ParseIntError,
};

#[cfg(doc)]
use crate::Socketable;

#[cfg(test)]
use assert_matches::assert_matches;

/// Description used when a native error code is not recognized by [`describe`].
pub const UNRECOGNIZED_ERROR: &str = "Unrecognised error number.";

/// Description used when a textual address is not a valid IPv4 address.
pub const INVALID_ADDRESS: &str = "src does not contain a character string representing a valid network address in the specified address family.";

/// Translates a native error code into a human-readable description.
///
/// On Unix-like platforms, `code` is an `errno` value, and the description is the C library's description of it. On Windows, `code` is a WinSock error code (as returned by `WSAGetLastError`), and the description comes from a fixed table of WinSock errors.
///
/// Codes that are not recognized are described as [`UNRECOGNIZED_ERROR`].
pub fn describe(code: i32) -> Cow<'static, str> {
	match sys::describe_error(code) {
		Some(description) => Cow::Borrowed(description),
		None => Cow::Borrowed(UNRECOGNIZED_ERROR),
	}
}

/// A failed system call: the native error code, and its description according to [`describe`].
///
/// When displayed, the code comes first, followed by the description, like `98 Address already in use`.
#[derive(Debug)]
#[non_exhaustive]
pub struct NativeError {
	/// The native error code. Zero if the failure did not come with one, such as a send that accepted no bytes.
	pub code: i32,

	/// The translated description of [`code`][Self::code].
	pub description: Cow<'static, str>,

	/// The kind of the `io::Error` this one arose from.
	pub kind: io::ErrorKind,
}

impl From<io::Error> for NativeError {
	fn from(error: io::Error) -> Self {
		let kind = error.kind();

		match error.raw_os_error() {
			Some(code) => Self {
				code,
				description: describe(code),
				kind,
			},

			None => Self {
				code: 0,
				description: Cow::Owned(error.to_string()),
				kind,
			},
		}
	}
}

impl Display for NativeError {
	fn fmt(&self, f: &mut Formatter) -> fmt::Result {
		write!(f, "{} {}", self.code, self.description)
	}
}

impl std::error::Error for NativeError {}

/// An error parsing an [`Endpoint`].
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum InvalidEndpointError {
	/// The text is not a dotted-decimal IPv4 address.
	#[error("invalid address `{address}`: {}", INVALID_ADDRESS)]
	#[non_exhaustive]
	Address {
		/// The text that was supposed to be an address.
		address: String,

		/// The error that this one arose from.
		#[source]
		error: net::AddrParseError,
	},

	/// The text is supposed to be an address and port, like `127.0.0.1:80`, but there is no `:` separating the two.
	#[error("invalid endpoint: must be an IPv4 address and port, like `127.0.0.1:80`")]
	#[non_exhaustive]
	MissingPort,

	/// The port number after the `:` is not a valid port number.
	#[error("invalid endpoint: the port is not a number from 0 to 65535: {error}")]
	#[non_exhaustive]
	Port {
		/// The error that this one arose from.
		#[source]
		error: ParseIntError,
	},
}

impl From<InvalidEndpointError> for io::Error {
	fn from(error: InvalidEndpointError) -> Self {
		io::Error::new(io::ErrorKind::InvalidInput, error)
	}
}

/// An error raised by a socket operation.
///
/// There is one variant for each operation that can fail. Every variant other than [`AddressParse`][Self::AddressParse] carries the [`NativeError`] that the operating system reported.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SocketError {
	/// The address given to [`Socketable::bind_to`] or [`Socketable::connect_to`] is not a valid IPv4 address. No system call was attempted.
	#[error(transparent)]
	AddressParse(#[from] InvalidEndpointError),

	/// The operating system refused to create a socket.
	#[error("couldn't create socket: {error}")]
	#[non_exhaustive]
	Allocation {
		/// The error that this one arose from.
		#[source]
		error: NativeError,
	},

	/// [`Socketable::bind_to`] failed.
	#[error("couldn't bind socket to {endpoint}: {error}")]
	#[non_exhaustive]
	Bind {
		/// The endpoint that the socket was to be bound to.
		endpoint: Endpoint,

		/// The error that this one arose from.
		#[source]
		error: NativeError,
	},

	/// [`Socketable::connect_to`] failed.
	#[error("couldn't connect socket to {endpoint}: {error}")]
	#[non_exhaustive]
	Connect {
		/// The endpoint that the socket was to be connected to.
		endpoint: Endpoint,

		/// The error that this one arose from.
		#[source]
		error: NativeError,
	},

	/// [`Socketable::be_listening`] failed.
	#[error("couldn't make the socket listen: {error}")]
	#[non_exhaustive]
	Listen {
		/// The error that this one arose from.
		#[source]
		error: NativeError,
	},

	/// [`Socketable::accept_and_create`] failed.
	#[error("couldn't accept a connection: {error}")]
	#[non_exhaustive]
	Accept {
		/// The error that this one arose from.
		#[source]
		error: NativeError,
	},

	/// Receiving from the socket failed.
	#[error("couldn't read from socket: {error}")]
	#[non_exhaustive]
	Read {
		/// The error that this one arose from.
		#[source]
		error: NativeError,
	},

	/// Sending on the socket failed.
	#[error("couldn't write to socket: {error}")]
	#[non_exhaustive]
	Write {
		/// The error that this one arose from.
		#[source]
		error: NativeError,
	},

	/// Setting a socket option failed.
	#[error("couldn't set socket option `{option}`: {error}")]
	#[non_exhaustive]
	SetOption {
		/// The name of the socket option, like `SO_REUSEADDR`.
		option: &'static str,

		/// The error that this one arose from.
		#[source]
		error: NativeError,
	},

	/// [`Socketable::stop`] failed.
	#[error("couldn't shut down socket: {error}")]
	#[non_exhaustive]
	Shutdown {
		/// The error that this one arose from.
		#[source]
		error: NativeError,
	},

	/// Querying the state of the socket failed.
	#[error("couldn't query socket `{query}`: {error}")]
	#[non_exhaustive]
	Query {
		/// What was being queried, like `SO_ACCEPTCONN` or `getsockname`.
		query: &'static str,

		/// The error that this one arose from.
		#[source]
		error: NativeError,
	},
}

impl SocketError {
	/// The native error behind this one, if there is one.
	pub fn native(&self) -> Option<&NativeError> {
		match self {
			Self::AddressParse(_) => None,

			| Self::Allocation { error }
			| Self::Bind { error, .. }
			| Self::Connect { error, .. }
			| Self::Listen { error }
			| Self::Accept { error }
			| Self::Read { error }
			| Self::Write { error }
			| Self::SetOption { error, .. }
			| Self::Shutdown { error }
			| Self::Query { error, .. }
			=> Some(error),
		}
	}
}

impl From<SocketError> for io::Error {
	fn from(error: SocketError) -> Self {
		let kind = match error.native() {
			Some(native) => native.kind,
			None => io::ErrorKind::InvalidInput,
		};

		io::Error::new(kind, error)
	}
}

#[test]
fn test_native_error_display() {
	let error = NativeError::from(io::Error::from_raw_os_error(sys::EDESTADDRREQ));

	assert_eq!(error.code, sys::EDESTADDRREQ);
	assert_eq!(error.to_string(), format!("{} {}", sys::EDESTADDRREQ, describe(sys::EDESTADDRREQ)));
	assert_ne!(error.description, UNRECOGNIZED_ERROR);
}

#[test]
fn test_native_error_without_code() {
	let error = NativeError::from(io::Error::from(io::ErrorKind::WriteZero));

	assert_eq!(error.code, 0);
	assert_eq!(error.kind, io::ErrorKind::WriteZero);
	assert!(error.to_string().starts_with("0 "));
}

#[test]
fn test_describe_unrecognized() {
	assert_eq!(describe(-12345), UNRECOGNIZED_ERROR);
}

#[test]
fn test_address_parse_error_is_transparent() {
	use std::error::Error;

	let inner = Endpoint::parse("1.2.3", 80).unwrap_err();
	let inner_message = inner.to_string();

	let error = SocketError::from(inner);
	assert_eq!(error.to_string(), inner_message);

	// The source is the inner error's source, so reporters walking the chain don't print the inner error twice.
	assert_matches!(
		error.source().and_then(|source| source.downcast_ref::<net::AddrParseError>()),
		Some(_)
	);
}

#[test]
fn test_socket_error_into_io() {
	let error = SocketError::Write {
		error: io::Error::from_raw_os_error(sys::EDESTADDRREQ).into(),
	};

	let message = error.to_string();
	assert!(message.starts_with("couldn't write to socket: "));
	assert!(message.contains(&sys::EDESTADDRREQ.to_string()));

	let error: io::Error = error.into();
	assert_matches!(
		error.get_ref().and_then(|inner| inner.downcast_ref::<SocketError>()),
		Some(SocketError::Write { .. })
	);

	let parse_error: SocketError = "nope".parse::<Endpoint>().unwrap_err().into();
	let parse_error: io::Error = parse_error.into();
	assert_eq!(parse_error.kind(), io::ErrorKind::InvalidInput);
}
