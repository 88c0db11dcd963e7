//! WSSE UsernameToken authentication, as required by the 1.4 API.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use chrono::Utc;
use sha1::{Digest, Sha1};
use uuid::Uuid;

/// The header carrying the token.
pub(crate) const WSSE_HEADER: &str = "X-WSSE";

/// Builds a fresh `X-WSSE` header value with a random nonce and the current
/// time.
pub(crate) fn wsse_header(username: &str, secret: &str) -> String {
    let nonce = Uuid::new_v4().to_string();
    let created = format!("{}Z", Utc::now().format("%Y-%m-%dT%H:%M:%S%.6f"));
    username_token(username, secret, &nonce, &created)
}

fn username_token(username: &str, secret: &str, nonce: &str, created: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(nonce.as_bytes());
    hasher.update(created.as_bytes());
    hasher.update(secret.as_bytes());
    let digest = BASE64.encode(hasher.finalize());

    format!(
        "UsernameToken Username=\"{username}\", PasswordDigest=\"{digest}\", \
         Nonce=\"{}\", Created=\"{created}\"",
        BASE64.encode(nonce)
    )
}
