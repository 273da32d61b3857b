//! AWS Signature Version 4 implementation.
//!
//! Implements the SigV4 signing algorithm as documented at:
//! <https://docs.aws.amazon.com/general/latest/gr/sigv4_signing.html>
//!
//! 1. Create a canonical request
//! 2. Create the string to sign
//! 3. Calculate the signing key
//! 4. Add the signature to the request

use crate::config::AwsCredentials;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Hash of an empty payload.
pub const EMPTY_PAYLOAD_HASH: &str =
    "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Everything except the RFC 3986 unreserved set gets percent-encoded.
const UNRESERVED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// AWS SigV4 signer bound to one credential set, region and service.
#[derive(Debug, Clone)]
pub struct SigV4Signer {
    credentials: AwsCredentials,
    region: String,
    service: String,
}

/// Headers to attach to a request after signing.
#[derive(Debug, Clone)]
pub struct SignedRequest {
    /// Full URL including query string.
    pub url: String,
    /// Headers including the Authorization header.
    pub headers: BTreeMap<String, String>,
}

impl SigV4Signer {
    pub fn new(credentials: &AwsCredentials, region: &str, service: &str) -> Self {
        Self {
            credentials: credentials.clone(),
            region: region.to_string(),
            service: service.to_string(),
        }
    }

    /// Sign a request. `headers` must already contain `host`.
    pub fn sign_request(
        &self,
        method: &str,
        url: &str,
        headers: &BTreeMap<String, String>,
        body: &str,
        timestamp: DateTime<Utc>,
    ) -> SignedRequest {
        let date_stamp = timestamp.format("%Y%m%d").to_string();
        let amz_date = timestamp.format("%Y%m%dT%H%M%SZ").to_string();

        let mut signed_headers: BTreeMap<String, String> = headers
            .iter()
            .map(|(k, v)| (k.to_lowercase(), v.trim().to_string()))
            .collect();
        signed_headers.insert("x-amz-date".to_string(), amz_date.clone());
        if let Some(ref token) = self.credentials.session_token {
            signed_headers.insert("x-amz-security-token".to_string(), token.clone());
        }
        let payload_hash = sha256_hex(body);
        signed_headers.insert("x-amz-content-sha256".to_string(), payload_hash.clone());

        let (canonical_uri, canonical_query) = canonical_url_parts(url);
        let header_names = signed_header_names(&signed_headers);
        let canonical_request = format!(
            "{}\n{}\n{}\n{}\n{}\n{}",
            method,
            canonical_uri,
            canonical_query,
            canonical_headers(&signed_headers),
            header_names,
            payload_hash
        );

        let scope = self.credential_scope(&date_stamp);
        let string_to_sign = format!(
            "{}\n{}\n{}\n{}",
            ALGORITHM,
            amz_date,
            scope,
            sha256_hex(&canonical_request)
        );

        let signature = hex::encode(hmac_sha256(
            &self.signing_key(&date_stamp),
            string_to_sign.as_bytes(),
        ));

        signed_headers.insert(
            "authorization".to_string(),
            format!(
                "{} Credential={}/{}, SignedHeaders={}, Signature={}",
                ALGORITHM, self.credentials.access_key_id, scope, header_names, signature
            ),
        );

        SignedRequest {
            url: url.to_string(),
            headers: signed_headers,
        }
    }

    fn credential_scope(&self, date_stamp: &str) -> String {
        format!("{}/{}/{}/aws4_request", date_stamp, self.region, self.service)
    }

    /// kSigning = HMAC(HMAC(HMAC(HMAC("AWS4" + secret, date), region), service), "aws4_request")
    fn signing_key(&self, date_stamp: &str) -> Vec<u8> {
        let k_secret = format!("AWS4{}", self.credentials.secret_access_key);
        let k_date = hmac_sha256(k_secret.as_bytes(), date_stamp.as_bytes());
        let k_region = hmac_sha256(&k_date, self.region.as_bytes());
        let k_service = hmac_sha256(&k_region, self.service.as_bytes());
        hmac_sha256(&k_service, b"aws4_request")
    }
}

// ── Helper functions ────────────────────────────────────────────────────

/// Compute SHA-256 hash and return hex-encoded string.
pub fn sha256_hex(data: &str) -> String {
    hex::encode(Sha256::digest(data.as_bytes()))
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// Lowercased headers are already sorted by the map.
fn canonical_headers(headers: &BTreeMap<String, String>) -> String {
    headers
        .iter()
        .map(|(k, v)| format!("{}:{}\n", k, v))
        .collect()
}

fn signed_header_names(headers: &BTreeMap<String, String>) -> String {
    headers.keys().cloned().collect::<Vec<_>>().join(";")
}

/// Split a URL into (canonical URI, canonical query string).
fn canonical_url_parts(url: &str) -> (String, String) {
    let Ok(parsed) = url::Url::parse(url) else {
        return ("/".to_string(), String::new());
    };

    let path = match parsed.path() {
        "" => "/".to_string(),
        p => p.split('/').map(uri_encode).collect::<Vec<_>>().join("/"),
    };

    let mut pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .map(|(k, v)| (uri_encode(&k), uri_encode(&v)))
        .collect();
    pairs.sort();
    let query = pairs
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    (path, query)
}

/// Percent-encode everything outside the RFC 3986 unreserved set.
pub fn uri_encode(input: &str) -> String {
    utf8_percent_encode(input, UNRESERVED).to_string()
}

/// Form-encode parameters in key order.
pub fn form_encode(params: &BTreeMap<String, String>) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", uri_encode(k), uri_encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}
