//! Time-based one-time passwords, RFC 6238 over HMAC-SHA1.
//!
//! Pure and stateless: codes are recomputed per attempt and never
//! stored. Output must match what a standard authenticator app shows for
//! the same secret at the same moment.

use std::time::{SystemTime, UNIX_EPOCH};

use hmac::{Hmac, Mac};
use sha1::Sha1;
use thiserror::Error;

type HmacSha1 = Hmac<Sha1>;

/// Seconds per time step, fixed by the ecosystem.
pub const TIME_STEP_SECS: u64 = 30;

const DIGITS: u32 = 6;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TotpError {
	#[error("secret contains no decodable characters")]
	EmptySecret,
}

/// Base32 (RFC 4648 alphabet) decode, tolerant of the forms secrets are
/// shared in: lowercase, embedded spaces, and `=` padding are accepted;
/// anything else outside the alphabet is skipped.
fn decode_base32(secret: &str) -> Vec<u8> {
	const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";
	let mut bits: u64 = 0;
	let mut bit_count: u32 = 0;
	let mut key = Vec::with_capacity(secret.len() * 5 / 8);
	for byte in secret.bytes() {
		let byte = byte.to_ascii_uppercase();
		let Some(index) = ALPHABET.iter().position(|&a| a == byte) else {
			continue;
		};
		bits = (bits << 5) | index as u64;
		bit_count += 5;
		if bit_count >= 8 {
			bit_count -= 8;
			key.push((bits >> bit_count) as u8);
		}
	}
	key
}

/// Code for an explicit time-step counter.
pub fn totp_at(secret: &str, counter: u64) -> Result<String, TotpError> {
	let key = decode_base32(secret);
	if key.is_empty() {
		return Err(TotpError::EmptySecret);
	}
	let mut mac = HmacSha1::new_from_slice(&key).map_err(|_| TotpError::EmptySecret)?;
	mac.update(&counter.to_be_bytes());
	let digest = mac.finalize().into_bytes();

	// Dynamic truncation per RFC 4226 §5.3.
	let offset = (digest[digest.len() - 1] & 0x0f) as usize;
	let code = u32::from_be_bytes([
		digest[offset] & 0x7f,
		digest[offset + 1],
		digest[offset + 2],
		digest[offset + 3],
	]);
	Ok(format!("{:0width$}", code % 10u32.pow(DIGITS), width = DIGITS as usize))
}

/// Code valid at `now` under the standard 30-second window.
pub fn totp(secret: &str, now: SystemTime) -> Result<String, TotpError> {
	let secs = now
		.duration_since(UNIX_EPOCH)
		.unwrap_or_default()
		.as_secs();
	totp_at(secret, secs / TIME_STEP_SECS)
}

#[cfg(test)]
mod tests {
	use std::time::Duration;

	use super::*;

	/// RFC 6238 appendix B secret for SHA-1: "12345678901234567890".
	const RFC_SECRET: &str = "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ";

	#[test]
	fn matches_rfc_6238_test_vectors() {
		// (unix time, expected 8-digit code truncated to our 6 digits)
		let vectors = [
			(59u64, "287082"),
			(1_111_111_109, "081804"),
			(1_111_111_111, "050471"),
			(1_234_567_890, "005924"),
			(2_000_000_000, "279037"),
		];
		for (secs, expected) in vectors {
			let now = UNIX_EPOCH + Duration::from_secs(secs);
			assert_eq!(totp(RFC_SECRET, now).unwrap(), expected, "t={secs}");
		}
	}

	#[test]
	fn code_is_stable_within_one_window() {
		let start = UNIX_EPOCH + Duration::from_secs(60);
		let late = UNIX_EPOCH + Duration::from_secs(89);
		assert_eq!(totp(RFC_SECRET, start).unwrap(), totp(RFC_SECRET, late).unwrap());
		let next = UNIX_EPOCH + Duration::from_secs(90);
		assert_ne!(totp(RFC_SECRET, start).unwrap(), totp(RFC_SECRET, next).unwrap());
	}

	#[test]
	fn tolerates_lowercase_spaces_and_padding() {
		let canonical = totp_at(RFC_SECRET, 1).unwrap();
		assert_eq!(totp_at("gezd gnbv gy3t qojq gezd gnbv gy3t qojq", 1).unwrap(), canonical);
		assert_eq!(totp_at(&format!("{RFC_SECRET}===="), 1).unwrap(), canonical);
	}

	#[test]
	fn undecodable_secret_errors() {
		assert_eq!(totp_at("!!!!", 1), Err(TotpError::EmptySecret));
		assert_eq!(totp_at("", 1), Err(TotpError::EmptySecret));
	}

	#[test]
	fn codes_are_always_six_digits() {
		for counter in 0..200 {
			let code = totp_at(RFC_SECRET, counter).unwrap();
			assert_eq!(code.len(), 6);
			assert!(code.bytes().all(|b| b.is_ascii_digit()));
		}
	}
}
