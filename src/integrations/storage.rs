//! Object storage (S3) download links via SigV4 query-string presigning.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::config::StorageConfig;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";
const MAX_EXPIRY_SECS: u64 = 604_800;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object storage not configured: {0}")]
    NotConfigured(&'static str),

    #[error("invalid object key: {0}")]
    InvalidKey(String),

    #[error("signing failed")]
    Signing,
}

#[derive(Debug, Clone)]
pub struct PresignedUrl {
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

pub struct StorageClient {
    config: StorageConfig,
}

impl StorageClient {
    pub fn new(config: StorageConfig) -> Self {
        Self { config }
    }

    pub fn host(&self) -> String {
        // us-east-1 keeps the legacy global endpoint
        if self.config.region == "us-east-1" {
            format!("{}.s3.amazonaws.com", self.config.bucket)
        } else {
            format!("{}.s3.{}.amazonaws.com", self.config.bucket, self.config.region)
        }
    }

    /// Object key for a stored file URL; bare keys pass through
    pub fn object_key(&self, file_url: &str) -> Option<String> {
        let trimmed = file_url.trim();
        if trimmed.is_empty() {
            return None;
        }
        if !trimmed.starts_with("http://") && !trimmed.starts_with("https://") {
            return Some(trimmed.trim_start_matches('/').to_string());
        }

        let parsed = url::Url::parse(trimmed).ok()?;
        let host = parsed.host_str()?;
        let path = parsed.path().trim_start_matches('/');

        let key = if host == self.host() || host == format!("{}.s3.amazonaws.com", self.config.bucket) {
            path.to_string()
        } else if host.starts_with("s3.") && host.ends_with(".amazonaws.com") {
            // path-style: s3.<region>.amazonaws.com/<bucket>/<key>
            path.strip_prefix(&format!("{}/", self.config.bucket))?.to_string()
        } else {
            return None;
        };

        let decoded = percent_decode(&key);
        (!decoded.is_empty()).then_some(decoded)
    }

    pub fn presign_get(&self, key: &str) -> Result<PresignedUrl, StorageError> {
        self.presign_get_at(key, Utc::now())
    }

    pub fn presign_get_at(&self, key: &str, now: DateTime<Utc>) -> Result<PresignedUrl, StorageError> {
        if self.config.bucket.is_empty() {
            return Err(StorageError::NotConfigured("AWS_S3_BUCKET"));
        }
        if self.config.access_key_id.is_empty() || self.config.secret_access_key.is_empty() {
            return Err(StorageError::NotConfigured("AWS_ACCESS_KEY_ID"));
        }
        let key = key.trim_start_matches('/');
        if key.is_empty() {
            return Err(StorageError::InvalidKey(key.to_string()));
        }

        let expires = self.config.download_url_ttl_secs.clamp(1, MAX_EXPIRY_SECS);
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date = now.format("%Y%m%d").to_string();
        let scope = format!("{}/{}/s3/aws4_request", date, self.config.region);
        let host = self.host();
        let canonical_uri = format!("/{}", uri_encode(key, false));

        // Already in sorted order
        let query = [
            ("X-Amz-Algorithm", ALGORITHM.to_string()),
            ("X-Amz-Credential", format!("{}/{}", self.config.access_key_id, scope)),
            ("X-Amz-Date", amz_date.clone()),
            ("X-Amz-Expires", expires.to_string()),
            ("X-Amz-SignedHeaders", "host".to_string()),
        ];
        let canonical_query = query
            .iter()
            .map(|(k, v)| format!("{}={}", k, uri_encode(v, true)))
            .collect::<Vec<_>>()
            .join("&");

        let canonical_request = format!(
            "GET\n{}\n{}\nhost:{}\n\nhost\nUNSIGNED-PAYLOAD",
            canonical_uri, canonical_query, host
        );
        let string_to_sign = format!(
            "{}\n{}\n{}\n{:x}",
            ALGORITHM,
            amz_date,
            scope,
            Sha256::digest(canonical_request.as_bytes())
        );

        let signing_key = signing_key(&self.config.secret_access_key, &date, &self.config.region)?;
        let signature = format!("{:x}", hmac_sha256(&signing_key, string_to_sign.as_bytes())?.finalize().into_bytes());

        Ok(PresignedUrl {
            url: format!(
                "https://{}{}?{}&X-Amz-Signature={}",
                host, canonical_uri, canonical_query, signature
            ),
            expires_at: now + chrono::Duration::seconds(expires as i64),
        })
    }
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<HmacSha256, StorageError> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| StorageError::Signing)?;
    mac.update(data);
    Ok(mac)
}

fn signing_key(secret: &str, date: &str, region: &str) -> Result<Vec<u8>, StorageError> {
    let k_date = hmac_sha256(format!("AWS4{}", secret).as_bytes(), date.as_bytes())?.finalize().into_bytes();
    let k_region = hmac_sha256(&k_date, region.as_bytes())?.finalize().into_bytes();
    let k_service = hmac_sha256(&k_region, b"s3")?.finalize().into_bytes();
    Ok(hmac_sha256(&k_service, b"aws4_request")?.finalize().into_bytes().to_vec())
}

/// RFC 3986 encoding as SigV4 expects it
fn uri_encode(input: &str, encode_slash: bool) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(byte as char),
            b'/' if !encode_slash => out.push('/'),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

fn percent_decode(input: &str) -> String {
    url::form_urlencoded::parse(format!("k={}", input.replace('+', "%2B")).as_bytes())
        .next()
        .map(|(_, v)| v.into_owned())
        .unwrap_or_else(|| input.to_string())
}
