//! Fuzz target for identity token verification.
//!
//! Feeds arbitrary byte strings as tokens to header decoding and full
//! verification. Every result must be either `Ok(...)` or `Err(AuthError)`;
//! any panic is a bug. A token that verifies must also re-sign to a token
//! that verifies to the same payload.

#![no_main]

use libfuzzer_sys::fuzz_target;
use twinpath_authn::{TokenCodec, codec::decode_token_header, validate_algorithm};

const SECRET: &[u8] = b"fuzz-secret";

fuzz_target!(|data: &[u8]| {
    // Only process valid UTF-8; cookie and store values are always strings
    let Ok(token) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(header) = decode_token_header(token) {
        let _ = validate_algorithm(&format!("{:?}", header.alg));
    }

    let codec = TokenCodec::new(SECRET);
    if let Ok(payload) = codec.verify(token)
        && let Ok(resigned) = codec.sign(&payload)
    {
        assert_eq!(codec.verify(resigned.as_str()).ok(), Some(payload));
    }
});
