// [apps/guardian/src/probes/dns.rs]
//! Resolves each configured hostname and reports the records found
//! (`spec.md` §4.2, `dns`). One sub-test per hostname, in the order
//! `DNS_TEST_HOSTNAMES` listed them.

use crate::config::DnsConfig;
use crate::probe::{Probe, ProbeContext, ProbeResult, SubTestLedger, SubTestResult};
use async_trait::async_trait;
use chrono::Utc;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::TokioAsyncResolver;
use std::time::Instant;

pub struct DnsProbe {
    config: DnsConfig,
}

impl DnsProbe {
    pub fn new(config: DnsConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Probe for DnsProbe {
    fn id(&self) -> &'static str {
        "dns"
    }

    fn display_name(&self) -> &'static str {
        "DNS Resolution"
    }

    fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    async fn execute(&self, ctx: &ProbeContext) -> ProbeResult {
        let started_at = Utc::now();
        let mut ledger = SubTestLedger::new();

        let resolver = match TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default()) {
            Ok(resolver) => resolver,
            Err(err) => {
                ledger.push(
                    "resolver_init",
                    SubTestResult::fail(format!("could not build a resolver: {err}"), "verify the system's /etc/resolv.conf is readable")
                        .with_error_code("resolver_init_failed"),
                );
                return ProbeResult::from_ledger(self.id(), self.display_name(), started_at, ledger);
            }
        };

        for hostname in &self.config.hostnames {
            if ctx.is_cancelled() {
                break;
            }
            ledger.push(hostname.clone(), resolve_one(&resolver, hostname).await);
        }

        ProbeResult::from_ledger(self.id(), self.display_name(), started_at, ledger)
    }
}

async fn resolve_one(resolver: &TokioAsyncResolver, hostname: &str) -> SubTestResult {
    let started = Instant::now();

    let ipv4: Vec<String> = resolver
        .ipv4_lookup(hostname)
        .await
        .map(|lookup| lookup.iter().map(|r| r.0.to_string()).collect())
        .unwrap_or_default();

    let ipv6: Vec<String> = resolver
        .ipv6_lookup(hostname)
        .await
        .map(|lookup| lookup.iter().map(|r| r.0.to_string()).collect())
        .unwrap_or_default();

    let cname: Vec<String> = resolver
        .lookup(hostname, hickory_resolver::proto::rr::RecordType::CNAME)
        .await
        .map(|lookup| lookup.iter().map(|r| r.to_string()).collect())
        .unwrap_or_default();

    let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

    if ipv4.is_empty() && ipv6.is_empty() {
        return SubTestResult::fail(format!("no A or AAAA records found for {hostname}"), "verify the hostname is correct and the resolver can reach DNS servers")
            .with_error_code("no_records")
            .with_detail("latency_ms", latency_ms)
            .with_detail("resolver", "system");
    }

    SubTestResult::ok(format!("resolved {} IPv4 and {} IPv6 address(es)", ipv4.len(), ipv6.len()))
        .with_detail("ipv4_addresses", serde_json::json!(ipv4))
        .with_detail("ipv6_addresses", serde_json::json!(ipv6))
        .with_detail("cname_records", serde_json::json!(cname))
        .with_detail("latency_ms", latency_ms)
        .with_detail("resolver", "system")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfigured_with_no_hostnames() {
        let probe = DnsProbe::new(DnsConfig { hostnames: vec![] });
        assert!(!probe.is_configured());
    }

    #[test]
    fn configured_with_hostnames() {
        let probe = DnsProbe::new(DnsConfig { hostnames: vec!["example.com".to_string()] });
        assert!(probe.is_configured());
    }
}
