use crate::errors::InvalidEndpointError;
use std::{
	net::{Ipv4Addr, SocketAddrV4},
	str::FromStr,
};

#[cfg(test)]
use {
	assert_matches::assert_matches,
	proptest::prelude::*,
};

/// An IPv4 address and port, identifying one side of a conversation.
///
/// This is the form in which every socket in this library takes its addresses. It is parsed from a dotted-decimal address such as `192.168.1.10` and a separate port number, using [`Endpoint::parse`]. Host names are not resolved; only literal addresses are accepted.
///
/// For system calls, an `Endpoint` is [converted][Self::to_sock_addr] to the platform's binary socket address (address family, four address bytes, and the port in network byte order), and peer addresses reported by the operating system are [converted back][Self::from_sock_addr].
///
/// This type is also parsed [from a string][FromStr] of the form `192.168.1.10:80`, and [displayed][std::fmt::Display] the same way.
#[cfg_attr(feature = "serde", doc = r#"

With the `serde` feature, this type is (de)serialized as a string of that form.
"#)]
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, derive_more::Display)]
#[cfg_attr(feature = "serde", derive(serde_with::DeserializeFromStr, serde_with::SerializeDisplay))]
#[display(fmt = "{}:{}", address, port)]
pub struct Endpoint {
	address: Ipv4Addr,
	port: u16,
}

impl Endpoint {
	/// Parses a dotted-decimal IPv4 address, and pairs it with the given port.
	///
	/// # Errors
	///
	/// [`InvalidEndpointError::Address`] if `address` is not a dotted-decimal IPv4 address, like `127.0.0.1`. This is checked before any socket is touched.
	pub fn parse(address: &str, port: u16) -> Result<Self, InvalidEndpointError> {
		let parsed: Ipv4Addr =
			address.parse()
			.map_err(|error| InvalidEndpointError::Address {
				address: address.to_owned(),
				error,
			})?;

		Ok(Self::new(parsed, port))
	}

	/// Creates an `Endpoint` from an already-parsed address.
	pub const fn new(address: Ipv4Addr, port: u16) -> Self {
		Self { address, port }
	}

	/// The IPv4 address.
	pub const fn address(&self) -> Ipv4Addr {
		self.address
	}

	/// The port number.
	pub const fn port(&self) -> u16 {
		self.port
	}

	/// Converts to the binary socket address used in system calls.
	pub fn to_sock_addr(&self) -> socket2::SockAddr {
		SocketAddrV4::from(*self).into()
	}

	/// Converts from a binary socket address, such as the peer address reported by `accept` or `recvfrom`.
	///
	/// Returns `None` if the address is not an IPv4 address.
	pub fn from_sock_addr(addr: &socket2::SockAddr) -> Option<Self> {
		addr.as_socket_ipv4().map(Self::from)
	}
}

impl FromStr for Endpoint {
	type Err = InvalidEndpointError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let (address, port) =
			s.rsplit_once(':')
			.ok_or(InvalidEndpointError::MissingPort)?;

		let port: u16 =
			port.parse()
			.map_err(|error| InvalidEndpointError::Port { error })?;

		Self::parse(address, port)
	}
}

impl From<SocketAddrV4> for Endpoint {
	fn from(addr: SocketAddrV4) -> Self {
		Self::new(*addr.ip(), addr.port())
	}
}

impl From<Endpoint> for SocketAddrV4 {
	fn from(endpoint: Endpoint) -> Self {
		SocketAddrV4::new(endpoint.address, endpoint.port)
	}
}

impl From<Endpoint> for std::net::SocketAddr {
	fn from(endpoint: Endpoint) -> Self {
		SocketAddrV4::from(endpoint).into()
	}
}

#[test]
fn test_parse() {
	let endpoint = Endpoint::parse("192.168.1.10", 40000).unwrap();

	assert_eq!(endpoint.address(), Ipv4Addr::new(192, 168, 1, 10));
	assert_eq!(endpoint.port(), 40000);
	assert_eq!(endpoint.to_string(), "192.168.1.10:40000");
	assert_eq!("192.168.1.10:40000".parse::<Endpoint>().unwrap(), endpoint);

	for bad in ["", "localhost", "1.2.3", "1.2.3.4.5", "1.2.3.256", "::1", " 1.2.3.4"] {
		assert_matches!(
			Endpoint::parse(bad, 80),
			Err(InvalidEndpointError::Address { address, .. })
			if address == bad
		);
	}

	assert_matches!("1.2.3.4".parse::<Endpoint>(), Err(InvalidEndpointError::MissingPort));
	assert_matches!("1.2.3.4:65536".parse::<Endpoint>(), Err(InvalidEndpointError::Port { .. }));
	assert_matches!("1.2.3.4:".parse::<Endpoint>(), Err(InvalidEndpointError::Port { .. }));
}

#[cfg(unix)]
#[test]
fn test_binary_layout() {
	let endpoint = Endpoint::parse("10.0.0.1", 0x1234).unwrap();
	let addr = endpoint.to_sock_addr();

	assert!(addr.is_ipv4());
	assert_eq!(addr.len() as usize, std::mem::size_of::<libc::sockaddr_in>());

	let raw: &libc::sockaddr_in = unsafe {
		// Safety: `addr` is an IPv4 address, so its storage holds a `sockaddr_in`.
		&*(addr.as_ptr() as *const libc::sockaddr_in)
	};

	assert_eq!(raw.sin_family as i32, libc::AF_INET);
	assert_eq!(raw.sin_port.to_ne_bytes(), [0x12, 0x34]);
	assert_eq!(raw.sin_addr.s_addr.to_ne_bytes(), [10, 0, 0, 1]);
}

#[test]
fn test_serde() {
	let endpoint = Endpoint::new(Ipv4Addr::LOCALHOST, 27910);

	#[cfg(feature = "serde")] {
		let serialized = serde_json::to_value(endpoint).unwrap();
		assert_matches!(
			&serialized,
			serde_json::Value::String(string)
			if string == "127.0.0.1:27910"
		);

		assert_eq!(serde_json::from_value::<Endpoint>(serialized).unwrap(), endpoint);
		assert!(serde_json::from_value::<Endpoint>(serde_json::json!("127.0.0.1")).is_err());
	}

	assert_eq!(endpoint.to_string().parse::<Endpoint>().unwrap(), endpoint);
}

#[cfg(test)]
fn malformed_address() -> impl Strategy<Value = String> {
	prop_oneof![
		Just(String::new()),
		"[a-zA-Z]{1,10}",
		prop::collection::vec(any::<u8>(), 1..=3)
		.prop_map(|octets| octets.iter().map(u8::to_string).collect::<Vec<_>>().join(".")),
		prop::collection::vec(any::<u8>(), 5..=8)
		.prop_map(|octets| octets.iter().map(u8::to_string).collect::<Vec<_>>().join(".")),
		(any::<[u8; 3]>(), 256u32..100_000, 0usize..4)
		.prop_map(|(octets, big, position)| {
			let mut parts: Vec<String> = octets.iter().map(u8::to_string).collect();
			parts.insert(position, big.to_string());
			parts.join(".")
		}),
	]
}

#[cfg(test)]
proptest! {
	#[test]
	fn test_round_trip(octets in any::<[u8; 4]>(), port in any::<u16>()) {
		let text = Ipv4Addr::from(octets).to_string();
		let endpoint = Endpoint::parse(&text, port).unwrap();
		let decoded = Endpoint::from_sock_addr(&endpoint.to_sock_addr()).unwrap();

		prop_assert_eq!(decoded, endpoint);
		prop_assert_eq!(decoded.address().octets(), octets);
		prop_assert_eq!(decoded.port(), port);
		prop_assert_eq!(decoded.address().to_string(), text);
	}

	#[test]
	fn test_malformed_rejected(address in malformed_address(), port in any::<u16>()) {
		let is_address_error = matches!(
			Endpoint::parse(&address, port),
			Err(InvalidEndpointError::Address { .. })
		);

		prop_assert!(is_address_error);
	}
}
