// [apps/guardian/src/http/validation.rs]
//! Request validation rules from `spec.md` §4.7: ad-hoc DNS hostnames,
//! ad-hoc SSL URLs, and diagnostics namespace names.

use once_cell::sync::Lazy;
use regex::Regex;

static HOSTNAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9.-]+$").unwrap());
static DNS_LABEL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9]([a-z0-9-]*[a-z0-9])?$").unwrap());

/// Alphanumeric + dots + hyphens only, max 253 chars.
pub fn validate_hostname(hostname: &str) -> Result<(), String> {
    if hostname.is_empty() {
        return Err("hostname must not be empty".to_string());
    }
    if hostname.len() > 253 {
        return Err("hostname must be at most 253 characters".to_string());
    }
    if !HOSTNAME_RE.is_match(hostname) {
        return Err("hostname may only contain letters, digits, dots, and hyphens".to_string());
    }
    Ok(())
}

/// Must parse as `https://` scheme; port defaults to 443; explicit ports
/// must be in `1..=65535`.
pub fn validate_ssl_target(hostname: &str, port: Option<i64>) -> Result<u16, String> {
    if hostname.is_empty() {
        return Err("hostname must not be empty".to_string());
    }
    match port {
        None => Ok(443),
        Some(p) if (1..=65535).contains(&p) => Ok(p as u16),
        Some(_) => Err("port must be between 1 and 65535".to_string()),
    }
}

/// Kubernetes DNS-1123 label/subdomain rules: lowercase alphanumeric and
/// `-`, each dot-separated label starts and ends with an alphanumeric.
pub fn validate_namespace(namespace: &str) -> Result<(), String> {
    if namespace.is_empty() || namespace.len() > 253 {
        return Err("namespace must be 1-253 characters".to_string());
    }
    if !namespace.split('.').all(|label| DNS_LABEL_RE.is_match(label) && label.len() <= 63) {
        return Err("namespace must follow Kubernetes DNS-1123 subdomain rules".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_hostname_is_invalid() {
        assert!(validate_hostname("").is_err());
    }

    #[test]
    fn valid_hostname_passes() {
        assert!(validate_hostname("a.b").is_ok());
        assert!(validate_hostname("api.example.com").is_ok());
    }

    #[test]
    fn hostname_with_bang_is_invalid() {
        assert!(validate_hostname("x!.com").is_err());
    }

    #[test]
    fn overlong_hostname_is_invalid() {
        let long = "a".repeat(254);
        assert!(validate_hostname(&long).is_err());
    }

    #[test]
    fn ssl_port_zero_is_invalid() {
        assert!(validate_ssl_target("example.com", Some(0)).is_err());
    }

    #[test]
    fn ssl_port_65536_is_invalid() {
        assert!(validate_ssl_target("example.com", Some(65536)).is_err());
    }

    #[test]
    fn ssl_port_default_is_443() {
        assert_eq!(validate_ssl_target("example.com", None).unwrap(), 443);
    }

    #[test]
    fn namespace_rules() {
        assert!(validate_namespace("kube-system").is_ok());
        assert!(validate_namespace("default").is_ok());
        assert!(validate_namespace("-bad").is_err());
        assert!(validate_namespace("Bad_Name").is_err());
        assert!(validate_namespace("").is_err());
    }
}
