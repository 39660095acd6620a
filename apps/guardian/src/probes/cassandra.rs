// [apps/guardian/src/probes/cassandra.rs]
//! Connects with the `scylla` driver (CQL-compatible with Cassandra),
//! executes a trivial query, and lists keyspaces (`spec.md` §4.2).

use crate::config::CassandraConfig;
use crate::probe::{Probe, ProbeContext, ProbeResult, SubTestLedger, SubTestResult};
use async_trait::async_trait;
use chrono::Utc;
use scylla::SessionBuilder;

pub struct CassandraProbe {
    config: CassandraConfig,
}

impl CassandraProbe {
    pub fn new(config: CassandraConfig) -> Self {
        Self { config }
    }

    fn hosts(&self) -> Vec<String> {
        self.config
            .hosts
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty())
            .collect()
    }
}

#[async_trait]
impl Probe for CassandraProbe {
    fn id(&self) -> &'static str {
        "cassandra"
    }

    fn display_name(&self) -> &'static str {
        "Cassandra"
    }

    fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    async fn execute(&self, ctx: &ProbeContext) -> ProbeResult {
        let started_at = Utc::now();
        let mut ledger = SubTestLedger::new();

        let mut builder = SessionBuilder::new().known_nodes(self.hosts()).connection_timeout(ctx.timeout);
        if let (Some(user), Some(pass)) = (&self.config.username, &self.config.password) {
            builder = builder.user(user, pass);
        }
        if let Some(keyspace) = &self.config.keyspace {
            builder = builder.use_keyspace(keyspace, false);
        }

        let session = match builder.build().await {
            Ok(session) => session,
            Err(err) => {
                ledger.push(
                    "connect",
                    SubTestResult::fail(format!("could not connect: {err}"), "verify CASSANDRA_HOSTS is reachable and credentials are correct")
                        .with_error_code("connection_failed"),
                );
                return ProbeResult::from_ledger(self.id(), self.display_name(), started_at, ledger);
            }
        };
        ledger.push("connect", SubTestResult::ok("connected"));

        match session.query_unpaged("SELECT release_version FROM system.local", &[]).await {
            Ok(_) => ledger.push("cluster_health", SubTestResult::ok("queried system.local")),
            Err(err) => ledger.push(
                "cluster_health",
                SubTestResult::fail(format!("query failed: {err}"), "check the cluster is healthy and reachable from this network")
                    .with_error_code("query_failed"),
            ),
        };

        match session.query_unpaged("SELECT keyspace_name FROM system_schema.keyspaces", &[]).await {
            Ok(result) => {
                let count = result.rows.map(|r| r.len()).unwrap_or(0);
                ledger.push("list_keyspaces", SubTestResult::ok(format!("{count} keyspace(s) visible")))
            }
            Err(err) => ledger.push(
                "list_keyspaces",
                SubTestResult::fail(format!("could not list keyspaces: {err}"), "grant the user SELECT on system_schema.keyspaces")
                    .with_error_code("list_keyspaces_failed"),
            ),
        };

        match session.query_unpaged("SELECT now() FROM system.local", &[]).await {
            Ok(_) => ledger.push("query_execution", SubTestResult::ok("executed a CQL query against the cluster")),
            Err(err) => ledger.push(
                "query_execution",
                SubTestResult::fail(format!("query execution failed: {err}"), "check query privileges for the configured user")
                    .with_error_code("query_execution_failed"),
            ),
        };

        match session
            .query_unpaged("SELECT keyspace_name, replication FROM system_schema.keyspaces", &[])
            .await
        {
            Ok(_) => ledger.push("replication", SubTestResult::ok("read replication settings for visible keyspaces")),
            Err(err) => ledger.push(
                "replication",
                SubTestResult::fail(format!("could not read replication settings: {err}"), "grant the user SELECT on system_schema.keyspaces")
                    .with_error_code("replication_check_failed"),
            ),
        };

        ProbeResult::from_ledger(self.id(), self.display_name(), started_at, ledger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_comma_separated_hosts() {
        let probe = CassandraProbe::new(CassandraConfig {
            enabled: true,
            hosts: Some("10.0.0.1:9042, 10.0.0.2:9042 ,".into()),
            ..Default::default()
        });
        assert_eq!(probe.hosts(), vec!["10.0.0.1:9042", "10.0.0.2:9042"]);
    }

    #[test]
    fn unconfigured_without_hosts() {
        let probe = CassandraProbe::new(CassandraConfig::default());
        assert!(!probe.is_configured());
    }
}
