//! Consistent-hashing helpers for the cluster layer.
//!
//! The storage core is a single-node store; placing stores on a hash ring is
//! the job of an outer cluster layer, which consumes these helpers: SHA-1
//! key digests as 160-bit ring positions, their hex representation, and
//! discovery of the local machine's outbound address.
//!
//! Nothing in the `store` crate depends on this one.

use std::fmt;
use std::fmt::Write as _;
use std::net::{IpAddr, UdpSocket};

use sha1::{Digest as _, Sha1};
use thiserror::Error;

/// Length of a SHA-1 digest in bytes.
pub const DIGEST_LEN: usize = 20;

/// A 160-bit ring position, ordered as a big-endian unsigned integer.
///
/// `Ord` on the raw big-endian bytes matches numeric ordering, so digests
/// sort directly into ring order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KeyDigest([u8; DIGEST_LEN]);

/// Error parsing a hex digest string.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid digest hex: {0}")]
pub struct ParseDigestError(&'static str);

impl KeyDigest {
    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// 40-character lowercase hex rendering.
    pub fn to_hex(&self) -> String {
        let mut out = String::with_capacity(DIGEST_LEN * 2);
        for byte in self.0 {
            let _ = write!(out, "{:02x}", byte);
        }
        out
    }

    /// Parses a 40-character hex string (either case) back into a digest.
    pub fn parse_hex(s: &str) -> Result<Self, ParseDigestError> {
        if s.len() != DIGEST_LEN * 2 {
            return Err(ParseDigestError("expected 40 hex characters"));
        }
        let mut bytes = [0u8; DIGEST_LEN];
        for (i, chunk) in s.as_bytes().chunks_exact(2).enumerate() {
            let pair = std::str::from_utf8(chunk)
                .map_err(|_| ParseDigestError("non-ASCII character"))?;
            bytes[i] = u8::from_str_radix(pair, 16)
                .map_err(|_| ParseDigestError("non-hex character"))?;
        }
        Ok(Self(bytes))
    }
}

impl fmt::Display for KeyDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// SHA-1 over the UTF-8 bytes of `input`, the ring position of a key or
/// node name.
pub fn key_digest(input: &str) -> KeyDigest {
    let mut hasher = Sha1::new();
    hasher.update(input.as_bytes());
    KeyDigest(hasher.finalize().into())
}

/// The local machine's first non-loopback address, or `None` if it cannot be
/// determined.
///
/// Uses a connected UDP socket to let the OS pick the outbound interface; no
/// packet is ever sent.
pub fn local_ip() -> Option<IpAddr> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:80").ok()?;
    let ip = socket.local_addr().ok()?.ip();
    if ip.is_loopback() {
        None
    } else {
        Some(ip)
    }
}
