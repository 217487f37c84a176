use std::ffi::c_int;

#[cfg(doc)]
use crate::Socketable;

/// Options for creating a socket, usually supplied by the user of your application through a command-line option or configuration file.
///
/// Every socket type has a `with_options` constructor that takes this structure. The plain `new` constructors use the [`Default`], which leaves every option unset.
///
/// New fields may be added to this structure, so outside of this crate it can't be built with a struct literal. Start from the [`Default`] and set the fields you need instead:
///
/// ```
/// # use ep_sockets::{SocketOptions, TcpServerSocket};
/// let mut options = SocketOptions::default();
/// options.reuse_address = true;
/// options.listen_backlog = Some(16);
///
/// let server = TcpServerSocket::with_options("127.0.0.1", 0, &options).unwrap();
/// # drop(server);
/// ```
#[cfg_attr(feature = "serde", doc = r#"

This structure is suitable for deserializing with [`serde`], with one caveat: it is marked with the attribute `#[serde(deny_unknown_fields)]`, and therefore must not be referenced in a field marked `#[serde(flatten)]`.
"#)]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "clap", derive(clap::Args))]
#[cfg_attr(feature = "serde", derive(serde::Deserialize), serde(default, deny_unknown_fields))]
#[non_exhaustive]
pub struct SocketOptions {
	/// Allow binding to an address and port that a previous socket is still holding on to, such as a server that was just restarted.
	///
	/// This calls [`Socketable::reset`] before binding. It sets `SO_REUSEADDR`, and on Unix-like platforms other than Solaris and illumos, also `SO_REUSEPORT`.
	///
	/// This option only applies to server sockets, and is ignored for clients.
	#[cfg_attr(feature = "clap", arg(long))]
	pub reuse_address: bool,

	/// Maximum pending connections, for listening sockets. Default is 128.
	///
	/// This option only applies to TCP server sockets, and is ignored for all others.
	#[cfg_attr(feature = "clap", arg(long))]
	pub listen_backlog: Option<c_int>,

	/// The most bytes that a single read will return. Default is 65536, which is enough for any UDP datagram.
	///
	/// A datagram larger than this is truncated.
	#[cfg_attr(feature = "clap", arg(long))]
	pub read_buffer_size: Option<usize>,
}

impl SocketOptions {
	/// The default value used when [`SocketOptions::listen_backlog`] is `None`.
	pub const DEFAULT_LISTEN_BACKLOG: c_int = 128;

	/// The default value used when [`SocketOptions::read_buffer_size`] is `None`.
	pub const DEFAULT_READ_BUFFER_SIZE: usize = 65_536;

	pub(crate) fn listen_backlog(&self) -> c_int {
		self.listen_backlog.unwrap_or(Self::DEFAULT_LISTEN_BACKLOG)
	}

	pub(crate) fn read_buffer_size(&self) -> usize {
		// A zero-length buffer would make every read look like the end of the stream.
		self.read_buffer_size
		.unwrap_or(Self::DEFAULT_READ_BUFFER_SIZE)
		.max(1)
	}
}

#[test]
fn test_defaults() {
	let options = SocketOptions::default();

	assert!(!options.reuse_address);
	assert_eq!(options.listen_backlog(), SocketOptions::DEFAULT_LISTEN_BACKLOG);
	assert_eq!(options.read_buffer_size(), SocketOptions::DEFAULT_READ_BUFFER_SIZE);

	let options = SocketOptions {
		read_buffer_size: Some(0),
		..SocketOptions::default()
	};

	assert_eq!(options.read_buffer_size(), 1);
}

#[cfg(feature = "serde")]
#[test]
fn test_serde() {
	let options: SocketOptions = serde_json::from_value(serde_json::json!({
		"reuse_address": true,
		"listen_backlog": 16,
	})).unwrap();

	assert_eq!(options, SocketOptions {
		reuse_address: true,
		listen_backlog: Some(16),
		read_buffer_size: None,
	});

	assert!(serde_json::from_value::<SocketOptions>(serde_json::json!({ "bogus": 1 })).is_err());
}

#[cfg(feature = "clap")]
#[test]
fn test_clap() {
	use clap::Parser;

	#[derive(Parser)]
	struct Cli {
		#[command(flatten)]
		options: SocketOptions,
	}

	let cli = Cli::try_parse_from(["app", "--reuse-address", "--read-buffer-size", "1500"]).unwrap();

	assert!(cli.options.reuse_address);
	assert_eq!(cli.options.listen_backlog, None);
	assert_eq!(cli.options.read_buffer_size, Some(1500));
}
