//! EC2-style request signing.
//!
//! Pure functions: given a secret and the canonical form of a request
//! `(verb, host, path, params)`, produce and check a deterministic
//! signature. Some client libraries sign without the port they actually
//! connect on, so verification takes an explicit flag allowing one retry
//! with the port stripped; the request itself is never mutated.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;
type HmacSha1 = Hmac<Sha1>;

/// Canonical form of a signed request. `params` excludes the `Signature`
/// parameter itself.
#[derive(Debug, Clone)]
pub struct SignableRequest {
    pub verb: String,
    pub host: String,
    pub path: String,
    pub params: BTreeMap<String, String>,
}

impl SignableRequest {
    fn with_host(&self, host: String) -> Self {
        Self {
            host,
            ..self.clone()
        }
    }

    fn host_without_port(&self) -> Option<String> {
        self.host
            .split_once(':')
            .map(|(hostname, _port)| hostname.to_string())
    }
}

/// Sign the canonical request: `verb\nhost\npath\n<sorted params>` through
/// HMAC keyed with the secret, base64-encoded. The `SignatureMethod`
/// parameter selects the digest; HMAC-SHA256 unless `HmacSHA1` is asked for.
pub fn sign(secret: &str, request: &SignableRequest) -> String {
    let payload = string_to_sign(request);

    let digest = if request.params.get("SignatureMethod").map(String::as_str) == Some("HmacSHA1") {
        let mut mac =
            HmacSha1::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
        mac.update(payload.as_bytes());
        mac.finalize().into_bytes().to_vec()
    } else {
        let mut mac =
            HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
        mac.update(payload.as_bytes());
        mac.finalize().into_bytes().to_vec()
    };

    BASE64.encode(digest)
}

/// Check a presented signature, optionally retrying with the port stripped
/// from the host.
pub fn verify(
    secret: &str,
    request: &SignableRequest,
    signature: &str,
    allow_port_strip: bool,
) -> bool {
    if matches(secret, request, signature) {
        return true;
    }
    if allow_port_strip {
        if let Some(hostname) = request.host_without_port() {
            return matches(secret, &request.with_host(hostname), signature);
        }
    }
    false
}

fn matches(secret: &str, request: &SignableRequest, signature: &str) -> bool {
    let expected = sign(secret, request);
    expected.as_bytes().ct_eq(signature.as_bytes()).into()
}

fn string_to_sign(request: &SignableRequest) -> String {
    format!(
        "{}\n{}\n{}\n{}",
        request.verb,
        request.host,
        request.path,
        canonical_query(&request.params)
    )
}

fn canonical_query(params: &BTreeMap<String, String>) -> String {
    params
        .iter()
        .filter(|(k, _)| k.as_str() != "Signature")
        .map(|(k, v)| format!("{}={}", percent_encode(k), percent_encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

fn percent_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}
