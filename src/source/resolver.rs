//! Source resolution for document bytes

use crate::error::{Error, Result};
use crate::source::{DocumentCache, Locator};
use base64::Engine;
use futures_util::StreamExt;
use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Limits and policy for fetching locators
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// Allow URLs that resolve to private/reserved IPs (default: false)
    pub allow_private_urls: bool,
    /// Maximum download size in bytes for URL sources (default: 100MB)
    pub max_download_bytes: u64,
    /// Maximum number of cached documents (default: 16)
    pub cache_max_entries: usize,
    /// Maximum total bytes in cache (default: 128MB)
    pub cache_max_bytes: usize,
    /// Timeout for HTTP requests (default: 60s)
    pub http_timeout: Duration,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            allow_private_urls: false,
            max_download_bytes: 100 * 1024 * 1024, // 100MB
            cache_max_entries: 16,
            cache_max_bytes: 128 * 1024 * 1024, // 128MB
            http_timeout: Duration::from_secs(60),
        }
    }
}

fn validate_header(data: &[u8], what: &str) -> Result<()> {
    if data.len() < 4 || &data[0..4] != b"%PDF" {
        return Err(Error::InvalidPdf {
            reason: format!("{} is not a valid PDF file", what),
        });
    }
    Ok(())
}

/// Read a file path as PDF bytes
pub async fn resolve_path<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
    let path = path.as_ref();

    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        return Err(Error::PdfNotFound {
            path: path.display().to_string(),
        });
    }

    let data = tokio::fs::read(path).await?;
    validate_header(&data, "File")?;
    Ok(data)
}

/// Decode base64 data as PDF bytes
pub fn resolve_base64(base64_data: &str) -> Result<Vec<u8>> {
    let engine = base64::engine::general_purpose::STANDARD;
    let data = engine.decode(base64_data)?;
    validate_header(&data, "Decoded data")?;
    Ok(data)
}

/// Check if an IP address is private/reserved (loopback, link-local, private ranges, etc.)
fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_unspecified()
                || v4.octets()[0] == 100 && (v4.octets()[1] & 0xC0) == 64 // CGNAT 100.64/10
        }
        IpAddr::V6(v6) => {
            v6.is_loopback() || v6.is_unspecified() || {
                let segments = v6.segments();
                // fc00::/7 unique local, fe80::/10 link-local
                (segments[0] & 0xFE00) == 0xFC00 || (segments[0] & 0xFFC0) == 0xFE80
            }
        }
    }
}

/// Check URL for SSRF by resolving DNS and verifying IPs are public
async fn check_ssrf(url_str: &str) -> Result<()> {
    let parsed = url::Url::parse(url_str).map_err(|e| Error::SourceResolution {
        reason: format!("Invalid URL: {}", e),
    })?;

    let host = parsed.host_str().ok_or_else(|| Error::SourceResolution {
        reason: "URL has no host".to_string(),
    })?;

    let port = parsed.port_or_known_default().unwrap_or(443);
    let addrs = tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| Error::SourceResolution {
            reason: format!("DNS resolution failed for {}: {}", host, e),
        })?;

    for addr in addrs {
        if is_private_ip(&addr.ip()) {
            return Err(Error::SsrfBlocked {
                url: url_str.to_string(),
            });
        }
    }

    Ok(())
}

/// Download a URL as PDF bytes with SSRF protection and a size limit
pub async fn resolve_url(url: &str, config: &SourceConfig) -> Result<Vec<u8>> {
    if !config.allow_private_urls {
        check_ssrf(url).await?;
    }

    let client = reqwest::Client::builder()
        .timeout(config.http_timeout)
        .build()
        .map_err(Error::HttpRequest)?;

    let response = client.get(url).send().await?;

    if !response.status().is_success() {
        return Err(Error::SourceResolution {
            reason: format!("HTTP request failed with status: {}", response.status()),
        });
    }

    let max_size = config.max_download_bytes;
    if let Some(content_length) = response.content_length() {
        if content_length > max_size {
            return Err(Error::DownloadTooLarge {
                size: content_length,
                max_size,
            });
        }
    }

    // Content-Length can lie; enforce the limit while streaming
    let mut data = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(Error::HttpRequest)?;
        data.extend_from_slice(&chunk);
        if data.len() as u64 > max_size {
            return Err(Error::DownloadTooLarge {
                size: data.len() as u64,
                max_size,
            });
        }
    }

    validate_header(&data, "Downloaded data")?;
    Ok(data)
}

/// Resolves locators to document bytes, consulting the cache first
pub struct SourceResolver {
    config: SourceConfig,
    cache: DocumentCache,
}

impl SourceResolver {
    pub fn new(config: SourceConfig) -> Self {
        let cache = DocumentCache::new(config.cache_max_entries, config.cache_max_bytes);
        Self { config, cache }
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    pub fn cache(&self) -> &DocumentCache {
        &self.cache
    }

    /// Resolve a raw locator string to validated PDF bytes
    pub async fn resolve(&self, raw: &str) -> Result<Arc<Vec<u8>>> {
        if let Some(data) = self.cache.get(raw) {
            tracing::debug!(locator = raw, "document served from cache");
            return Ok(data);
        }

        let locator = Locator::parse(raw)?;
        let data = match &locator {
            Locator::Path(path) => resolve_path(path).await?,
            Locator::Url(url) => resolve_url(url, &self.config).await?,
            Locator::Data(payload) => resolve_base64(payload)?,
        };

        tracing::debug!(
            source = %locator.display_name(),
            bytes = data.len(),
            "document resolved"
        );

        let data = Arc::new(data);
        self.cache.put(raw, Arc::clone(&data));
        Ok(data)
    }
}

impl Default for SourceResolver {
    fn default() -> Self {
        Self::new(SourceConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL_HEADER: &[u8] = b"%PDF-1.4\n";

    #[test]
    fn test_resolve_base64_invalid() {
        // Valid base64 but not PDF
        let result = resolve_base64("SGVsbG8gV29ybGQ="); // "Hello World"
        assert!(matches!(result, Err(Error::InvalidPdf { .. })));
    }

    #[test]
    fn test_resolve_base64_invalid_base64() {
        let result = resolve_base64("not valid base64!!!");
        assert!(matches!(result, Err(Error::Base64Decode(_))));
    }

    #[tokio::test]
    async fn test_resolve_path_not_found() {
        let result = resolve_path("/nonexistent/path/file.pdf").await;
        assert!(matches!(result, Err(Error::PdfNotFound { .. })));
    }

    #[tokio::test]
    async fn test_resolver_caches_by_locator() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.pdf");
        std::fs::write(&path, MINIMAL_HEADER).unwrap();
        let locator = path.display().to_string();

        let resolver = SourceResolver::default();
        let first = resolver.resolve(&locator).await.unwrap();
        assert!(resolver.cache().contains(&locator));

        // Served from cache even after the file disappears
        std::fs::remove_file(&path).unwrap();
        let second = resolver.resolve(&locator).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_resolver_data_uri() {
        let engine = base64::engine::general_purpose::STANDARD;
        let locator = format!("data:application/pdf;base64,{}", engine.encode(MINIMAL_HEADER));

        let resolver = SourceResolver::default();
        let data = resolver.resolve(&locator).await.unwrap();
        assert_eq!(data.as_slice(), MINIMAL_HEADER);
    }

    #[tokio::test]
    async fn test_resolver_rejects_non_pdf_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"hello").unwrap();

        let resolver = SourceResolver::default();
        let result = resolver.resolve(&path.display().to_string()).await;
        assert!(matches!(result, Err(Error::InvalidPdf { .. })));
        assert!(resolver.cache().is_empty());
    }

    #[tokio::test]
    async fn test_resolve_url_blocks_loopback() {
        let result = resolve_url("http://127.0.0.1:9/a.pdf", &SourceConfig::default()).await;
        assert!(matches!(result, Err(Error::SsrfBlocked { .. })));
    }

    #[test]
    fn test_is_private_ip_ranges() {
        assert!(is_private_ip(&"127.0.0.1".parse().unwrap()));
        assert!(is_private_ip(&"10.0.0.1".parse().unwrap()));
        assert!(is_private_ip(&"172.16.0.1".parse().unwrap()));
        assert!(is_private_ip(&"192.168.1.1".parse().unwrap()));
        assert!(is_private_ip(&"169.254.169.254".parse().unwrap()));
        assert!(is_private_ip(&"100.64.0.1".parse().unwrap()));
        assert!(is_private_ip(&"0.0.0.0".parse().unwrap()));
        assert!(is_private_ip(&"255.255.255.255".parse().unwrap()));
    }

    #[test]
    fn test_is_private_ip_public() {
        assert!(!is_private_ip(&"8.8.8.8".parse().unwrap()));
        assert!(!is_private_ip(&"1.1.1.1".parse().unwrap()));
        assert!(!is_private_ip(&"203.0.113.1".parse().unwrap()));
    }

    #[test]
    fn test_is_private_ip_ipv6() {
        assert!(is_private_ip(&"::1".parse().unwrap()));
        assert!(is_private_ip(&"::".parse().unwrap()));
        assert!(is_private_ip(&"fd00::1".parse().unwrap()));
        assert!(is_private_ip(&"fe80::1".parse().unwrap()));
        assert!(!is_private_ip(&"2001:db8::1".parse().unwrap()));
    }
}
