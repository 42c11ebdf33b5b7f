//! Compact HS256 codec: three base64url segments, HMAC-SHA256 over `header.payload`.
//!
//! The wire contract is frozen for integration compatibility: header exactly
//! `{"typ":"JWT","alg":"HS256"}`, unpadded URL-safe base64, and the claim names of
//! [`AccessClaims`](crate::token::AccessClaims). Verification never decodes the header; the
//! signature covers it byte-for-byte.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
// self
use crate::{error::TokenError, token::claims::AccessClaims};

type HmacSha256 = Hmac<Sha256>;

#[derive(serde::Serialize)]
struct Header {
	typ: &'static str,
	alg: &'static str,
}

const HEADER: Header = Header { typ: "JWT", alg: "HS256" };

/// Serializes and signs claims into the compact `header.payload.signature` form.
pub(crate) fn encode(claims: &AccessClaims, secret: &[u8]) -> Result<String, TokenError> {
	let header = serde_json::to_vec(&HEADER).map_err(|_| TokenError::Malformed)?;
	let payload = serde_json::to_vec(claims).map_err(|_| TokenError::Malformed)?;
	let mut compact = String::with_capacity((header.len() + payload.len()) * 2);

	compact.push_str(&URL_SAFE_NO_PAD.encode(header));
	compact.push('.');
	compact.push_str(&URL_SAFE_NO_PAD.encode(payload));

	let signature = sign(secret, compact.as_bytes())?;

	compact.push('.');
	compact.push_str(&URL_SAFE_NO_PAD.encode(signature));

	Ok(compact)
}

/// Verifies the signature and decodes the payload; expiry and revocation stay with the caller.
pub(crate) fn verify_and_decode(token: &str, secret: &[u8]) -> Result<AccessClaims, TokenError> {
	let mut segments = token.splitn(4, '.');
	let (header, payload, signature) =
		match (segments.next(), segments.next(), segments.next(), segments.next()) {
			(Some(header), Some(payload), Some(signature), None) => (header, payload, signature),
			_ => return Err(TokenError::Malformed),
		};
	// The signing input is the raw first two segments, exactly as presented.
	let signed_len = header.len() + 1 + payload.len();
	let expected = sign(secret, token[..signed_len].as_bytes())?;
	let presented = URL_SAFE_NO_PAD.decode(signature).map_err(|_| TokenError::InvalidSignature)?;

	if !bool::from(expected.as_slice().ct_eq(presented.as_slice())) {
		return Err(TokenError::InvalidSignature);
	}

	let payload = URL_SAFE_NO_PAD.decode(payload).map_err(|_| TokenError::Malformed)?;

	serde_json::from_slice(&payload).map_err(|_| TokenError::Malformed)
}

fn sign(secret: &[u8], input: &[u8]) -> Result<Vec<u8>, TokenError> {
	// HMAC-SHA256 accepts keys of any length; the error arm is unreachable for a non-empty
	// secret, which configuration validation guarantees.
	let mut mac = HmacSha256::new_from_slice(secret).map_err(|_| TokenError::InvalidSignature)?;

	mac.update(input);

	Ok(mac.finalize().into_bytes().to_vec())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::auth::ClientId;

	const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

	fn claims() -> AccessClaims {
		AccessClaims {
			iss: "issuer".into(),
			sub: "u7".into(),
			aud: "c1".into(),
			iat: 1_700_000_000,
			exp: 1_700_003_600,
			jti: "00112233445566778899aabbccddeeff".into(),
			client_id: ClientId::new("c1").expect("Client fixture should be valid."),
			scope: "profile".into(),
			user_id: None,
		}
	}

	#[test]
	fn encode_then_verify_round_trips() {
		let token = encode(&claims(), SECRET).expect("Encoding fixture claims should succeed.");
		let decoded = verify_and_decode(&token, SECRET)
			.expect("A freshly encoded token should verify successfully.");

		assert_eq!(decoded, claims());
	}

	#[test]
	fn header_segment_is_the_frozen_literal() {
		let token = encode(&claims(), SECRET).expect("Encoding fixture claims should succeed.");
		let header = token.split('.').next().expect("Token should have a header segment.");
		let bytes = URL_SAFE_NO_PAD.decode(header).expect("Header segment should be base64url.");

		assert_eq!(bytes, br#"{"typ":"JWT","alg":"HS256"}"#);
	}

	#[test]
	fn segment_count_is_enforced() {
		assert_eq!(verify_and_decode("a.b", SECRET), Err(TokenError::Malformed));
		assert_eq!(verify_and_decode("a.b.c.d", SECRET), Err(TokenError::Malformed));
		assert_eq!(verify_and_decode("", SECRET), Err(TokenError::Malformed));
	}

	#[test]
	fn tampered_payload_fails_the_signature_check() {
		let token = encode(&claims(), SECRET).expect("Encoding fixture claims should succeed.");
		let mut segments: Vec<_> = token.split('.').map(str::to_owned).collect();

		segments[1] = URL_SAFE_NO_PAD.encode(br#"{"sub":"someone-else"}"#);

		let tampered = segments.join(".");

		assert_eq!(verify_and_decode(&tampered, SECRET), Err(TokenError::InvalidSignature));
	}

	#[test]
	fn wrong_secret_fails_the_signature_check() {
		let token = encode(&claims(), SECRET).expect("Encoding fixture claims should succeed.");

		assert_eq!(
			verify_and_decode(&token, b"another-secret-entirely-32-bytes"),
			Err(TokenError::InvalidSignature)
		);
	}

	#[test]
	fn undecodable_payload_is_malformed() {
		let token = encode(&claims(), SECRET).expect("Encoding fixture claims should succeed.");
		let header = token.split('.').next().expect("Token should have a header segment.");
		// Re-sign a payload that is valid base64url but not JSON.
		let garbage = URL_SAFE_NO_PAD.encode(b"not-json");
		let signing_input = format!("{header}.{garbage}");
		let signature = sign(SECRET, signing_input.as_bytes())
			.expect("Signing the garbage payload should succeed.");
		let forged = format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(signature));

		assert_eq!(verify_and_decode(&forged, SECRET), Err(TokenError::Malformed));
	}
}
