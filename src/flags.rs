use crate::sys;
use std::{
	ffi::c_int,
	ops::{BitOr, BitOrAssign},
};

/// Flags for a single send or receive call, such as [`MsgFlags::PEEK`].
///
/// The flags are passed to the operating system unmodified and are not interpreted by this library, so their meaning is platform-dependent. Flags that are specific to one platform can be given with [`MsgFlags::from_bits`].
///
/// The [`Default`] is [`MsgFlags::NONE`].
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct MsgFlags(c_int);

impl MsgFlags {
	/// No flags.
	pub const NONE: Self = Self(0);

	/// Receive data without removing it from the queue (`MSG_PEEK`).
	pub const PEEK: Self = Self(sys::MSG_PEEK);

	/// Send or receive out-of-band data (`MSG_OOB`).
	pub const OOB: Self = Self(sys::MSG_OOB);

	/// Block until the whole buffer is filled (`MSG_WAITALL`).
	pub const WAIT_ALL: Self = Self(sys::MSG_WAITALL);

	/// Send only to directly connected hosts (`MSG_DONTROUTE`).
	pub const DONT_ROUTE: Self = Self(sys::MSG_DONTROUTE);

	/// Make only this call non-blocking (`MSG_DONTWAIT`).
	///
	/// # Availability
	///
	/// Unix-like platforms only.
	#[cfg(unix)]
	pub const DONT_WAIT: Self = Self(sys::MSG_DONTWAIT);

	/// Wraps a raw platform flag mask.
	pub const fn from_bits(bits: c_int) -> Self {
		Self(bits)
	}

	/// The raw platform flag mask.
	pub const fn bits(self) -> c_int {
		self.0
	}

	/// Whether every flag in `other` is also set in `self`.
	pub const fn contains(self, other: Self) -> bool {
		self.0 & other.0 == other.0
	}
}

impl BitOr for MsgFlags {
	type Output = Self;

	fn bitor(self, rhs: Self) -> Self {
		Self(self.0 | rhs.0)
	}
}

impl BitOrAssign for MsgFlags {
	fn bitor_assign(&mut self, rhs: Self) {
		self.0 |= rhs.0;
	}
}

#[test]
fn test_flags() {
	let mut flags = MsgFlags::default();
	assert_eq!(flags, MsgFlags::NONE);
	assert_eq!(flags.bits(), 0);

	flags |= MsgFlags::PEEK;
	assert!(flags.contains(MsgFlags::PEEK));
	assert!(!flags.contains(MsgFlags::OOB));

	let both = MsgFlags::PEEK | MsgFlags::OOB;
	assert_eq!(both.bits(), sys::MSG_PEEK | sys::MSG_OOB);
	assert_eq!(MsgFlags::from_bits(both.bits()), both);
}
