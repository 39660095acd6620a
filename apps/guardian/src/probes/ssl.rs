// [apps/guardian/src/probes/ssl.rs]
//! Opens a TLS connection to each configured URL and reports the negotiated
//! protocol, cipher, certificate chain, SAN match, and days to expiry
//! (`spec.md` §4.2, `ssl`). One sub-test per URL, in declared order.

use crate::config::SslConfig;
use crate::probe::{Probe, ProbeContext, ProbeResult, SubTestLedger, SubTestResult};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use rustls_pki_types::ServerName;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use url::Url;

pub struct SslProbe {
    config: SslConfig,
}

impl SslProbe {
    pub fn new(config: SslConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Probe for SslProbe {
    fn id(&self) -> &'static str {
        "ssl"
    }

    fn display_name(&self) -> &'static str {
        "TLS Endpoint Health"
    }

    fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    async fn execute(&self, ctx: &ProbeContext) -> ProbeResult {
        let started_at = Utc::now();
        let mut ledger = SubTestLedger::new();

        for raw_url in &self.config.urls {
            if ctx.is_cancelled() {
                break;
            }
            ledger.push(raw_url.clone(), check_one(raw_url, ctx.timeout).await);
        }

        ProbeResult::from_ledger(self.id(), self.display_name(), started_at, ledger)
    }
}

/// Connects, performs the TLS handshake, and reports on the negotiated
/// session and leaf certificate. Never returns `Err` — every failure mode
/// is folded into a failing [`SubTestResult`].
pub async fn check_one(raw_url: &str, timeout: std::time::Duration) -> SubTestResult {
    let url = match Url::parse(raw_url) {
        Ok(u) if u.scheme() == "https" => u,
        Ok(_) => return SubTestResult::fail("URL must use the https:// scheme", "use an https:// URL").with_error_code("invalid_scheme"),
        Err(err) => return SubTestResult::fail(format!("could not parse URL: {err}"), "check the URL syntax").with_error_code("invalid_url"),
    };
    let host = match url.host_str() {
        Some(h) => h.to_string(),
        None => return SubTestResult::fail("URL has no host", "check the URL syntax").with_error_code("invalid_url"),
    };
    let port = url.port_or_known_default().unwrap_or(443);

    let attempt = tokio::time::timeout(timeout, handshake(&host, port)).await;

    let outcome = match attempt {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(err)) => {
            return SubTestResult::fail(format!("TLS handshake with {host}:{port} failed: {err}"), "verify the endpoint is reachable and presents a valid certificate")
                .with_error_code("handshake_failed")
        }
        Err(_) => {
            return SubTestResult::fail(format!("TLS handshake with {host}:{port} did not complete within the deadline"), "the endpoint may be unreachable or behind a blackhole route")
                .with_error_code("handshake_timeout")
        }
    };

    let mut result = SubTestResult::ok(format!("TLS {} negotiated with {}", outcome.protocol_version, host))
        .with_detail("tls_version", outcome.protocol_version.clone())
        .with_detail("cipher_suite", outcome.cipher_suite.clone())
        .with_detail("chain_length", outcome.chain_length as u64)
        .with_detail("san_match", outcome.san_match)
        .with_detail("days_to_expiry", outcome.days_to_expiry);

    if !outcome.san_match {
        result = SubTestResult::fail(
            format!("certificate for {host} does not list it in the Subject Alternative Names"),
            "the endpoint is serving the wrong certificate for this hostname",
        )
        .with_error_code("san_mismatch")
        .with_detail("tls_version", outcome.protocol_version)
        .with_detail("cipher_suite", outcome.cipher_suite)
        .with_detail("chain_length", outcome.chain_length as u64)
        .with_detail("san_match", false)
        .with_detail("days_to_expiry", outcome.days_to_expiry);
    } else if outcome.days_to_expiry < 0 {
        result = SubTestResult::fail(format!("certificate for {host} expired {} day(s) ago", -outcome.days_to_expiry), "renew the certificate")
            .with_error_code("certificate_expired")
            .with_detail("tls_version", result.details.get("tls_version").cloned().unwrap_or_default())
            .with_detail("days_to_expiry", outcome.days_to_expiry);
    } else if outcome.days_to_expiry < 14 {
        result = SubTestResult::ok(format!("certificate for {host} expires in {} day(s)", outcome.days_to_expiry))
            .with_detail("tls_version", outcome.protocol_version)
            .with_detail("cipher_suite", outcome.cipher_suite)
            .with_detail("chain_length", outcome.chain_length as u64)
            .with_detail("san_match", true)
            .with_detail("days_to_expiry", outcome.days_to_expiry)
            .with_detail("expiry_warning", true);
    }

    result
}

struct HandshakeOutcome {
    protocol_version: String,
    cipher_suite: String,
    chain_length: usize,
    san_match: bool,
    days_to_expiry: i64,
}

async fn handshake(host: &str, port: u16) -> anyhow::Result<HandshakeOutcome> {
    let mut roots = rustls::RootCertStore::empty();
    for cert in rustls_native_certs::load_native_certs().certs {
        let _ = roots.add(cert);
    }

    let client_config = rustls::ClientConfig::builder().with_root_certificates(roots).with_no_client_auth();
    let connector = TlsConnector::from(Arc::new(client_config));

    let tcp = TcpStream::connect((host, port)).await?;
    let server_name = ServerName::try_from(host.to_string())?;
    let tls_stream = connector.connect(server_name, tcp).await?;

    let (_, session) = tls_stream.get_ref();
    let protocol_version = session.protocol_version().map(|v| format!("{v:?}")).unwrap_or_else(|| "unknown".to_string());
    let cipher_suite = session.negotiated_cipher_suite().map(|cs| format!("{:?}", cs.suite())).unwrap_or_else(|| "unknown".to_string());

    let chain = session.peer_certificates().map(|c| c.to_vec()).unwrap_or_default();
    let chain_length = chain.len();

    let leaf = chain.first().ok_or_else(|| anyhow::anyhow!("server presented no certificates"))?;
    let (_, parsed) = x509_parser::parse_x509_certificate(leaf.as_ref())?;

    let san_match = parsed
        .subject_alternative_name()
        .ok()
        .flatten()
        .map(|ext| {
            ext.value.general_names.iter().any(|name| match name {
                x509_parser::extensions::GeneralName::DNSName(dns) => dns_matches(dns, host),
                _ => false,
            })
        })
        .unwrap_or(false)
        || parsed.subject().iter_common_name().any(|cn| cn.as_str().map(|cn| dns_matches(cn, host)).unwrap_or(false));

    let not_after = parsed.validity().not_after.timestamp();
    let expiry = Utc.timestamp_opt(not_after, 0).single().unwrap_or_else(Utc::now);
    let days_to_expiry = (expiry - Utc::now()).num_days();

    Ok(HandshakeOutcome { protocol_version, cipher_suite, chain_length, san_match, days_to_expiry })
}

/// Matches a certificate DNS name (which may carry a `*.` wildcard prefix)
/// against the host the probe actually dialed.
fn dns_matches(cert_name: &str, host: &str) -> bool {
    if cert_name.eq_ignore_ascii_case(host) {
        return true;
    }
    if let Some(suffix) = cert_name.strip_prefix("*.") {
        if let Some((_, rest)) = host.split_once('.') {
            return rest.eq_ignore_ascii_case(suffix);
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfigured_with_no_urls() {
        let probe = SslProbe::new(SslConfig { urls: vec![] });
        assert!(!probe.is_configured());
    }

    #[test]
    fn wildcard_dns_name_matches_subdomain() {
        assert!(dns_matches("*.example.com", "api.example.com"));
        assert!(!dns_matches("*.example.com", "example.com"));
        assert!(dns_matches("example.com", "example.com"));
        assert!(!dns_matches("example.com", "evil.com"));
    }
}

#[cfg(test)]
mod validation_tests {
    use super::*;

    #[tokio::test]
    async fn rejects_non_https_scheme() {
        let result = check_one("http://example.com", std::time::Duration::from_secs(1)).await;
        assert!(!result.success);
        assert_eq!(result.error_code.as_deref(), Some("invalid_scheme"));
    }

    #[tokio::test]
    async fn rejects_unparsable_url() {
        let result = check_one("not a url", std::time::Duration::from_secs(1)).await;
        assert!(!result.success);
        assert_eq!(result.error_code.as_deref(), Some("invalid_url"));
    }
}
