// [apps/guardian/src/probes/postgresql.rs]
//! Connects with `sqlx`, runs `SELECT 1`, then lists databases and checks
//! the configured one is reachable (`spec.md` §4.2, `postgresqlv2`).

use crate::config::PostgresConfig;
use crate::probe::{Probe, ProbeContext, ProbeResult, SubTestLedger, SubTestResult};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgPoolOptions;
use sqlx::Row;

pub struct PostgresProbe {
    config: PostgresConfig,
}

impl PostgresProbe {
    pub fn new(config: PostgresConfig) -> Self {
        Self { config }
    }

    fn connection_string(&self) -> String {
        let sslmode = self.config.sslmode.as_deref().unwrap_or("prefer");
        format!(
            "postgres://{}:{}@{}:{}/{}?sslmode={}",
            urlencode(self.config.username.as_deref().unwrap_or_default()),
            urlencode(self.config.password.as_deref().unwrap_or_default()),
            self.config.host.as_deref().unwrap_or_default(),
            self.config.port.unwrap_or(5432),
            self.config.database.as_deref().unwrap_or_default(),
            sslmode,
        )
    }
}

fn urlencode(raw: &str) -> String {
    url::form_urlencoded::byte_serialize(raw.as_bytes()).collect()
}

#[async_trait]
impl Probe for PostgresProbe {
    fn id(&self) -> &'static str {
        "postgresqlv2"
    }

    fn display_name(&self) -> &'static str {
        "PostgreSQL"
    }

    fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    async fn execute(&self, ctx: &ProbeContext) -> ProbeResult {
        let started_at = Utc::now();
        let mut ledger = SubTestLedger::new();

        let pool = match PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(ctx.timeout)
            .connect(&self.connection_string())
            .await
        {
            Ok(pool) => pool,
            Err(err) => {
                ledger.push(
                    "connect",
                    SubTestResult::fail(
                        format!("could not connect: {err}"),
                        "verify POSTGRESQL_HOST/PORT are reachable and credentials are correct",
                    )
                    .with_error_code("connection_failed"),
                );
                return ProbeResult::from_ledger(self.id(), self.display_name(), started_at, ledger);
            }
        };
        ledger.push("connect", SubTestResult::ok("connected"));

        match sqlx::query("SELECT datname, pg_database_size(datname) AS size_bytes FROM pg_database WHERE datistemplate = false")
            .fetch_all(&pool)
            .await
        {
            Ok(rows) => {
                let databases: Vec<serde_json::Value> = rows
                    .iter()
                    .map(|r| {
                        serde_json::json!({
                            "name": r.get::<String, _>("datname"),
                            "size_bytes": r.get::<i64, _>("size_bytes"),
                        })
                    })
                    .collect();
                ledger.push(
                    "list_databases",
                    SubTestResult::ok(format!("{} database(s) visible", databases.len()))
                        .with_detail("databases", serde_json::json!(databases)),
                )
            }
            Err(err) => ledger.push(
                "list_databases",
                SubTestResult::fail(format!("could not list databases: {err}"), "grant the user CONNECT on pg_database")
                    .with_error_code("list_databases_failed"),
            ),
        };

        match sqlx::query("SELECT extname, extversion FROM pg_extension ORDER BY extname").fetch_all(&pool).await {
            Ok(rows) => {
                let extensions: Vec<serde_json::Value> = rows
                    .iter()
                    .map(|r| {
                        serde_json::json!({
                            "name": r.get::<String, _>("extname"),
                            "version": r.get::<String, _>("extversion"),
                        })
                    })
                    .collect();
                ledger.push(
                    "list_extensions",
                    SubTestResult::ok(format!("{} extension(s) installed", extensions.len()))
                        .with_detail("extensions", serde_json::json!(extensions)),
                )
            }
            Err(err) => ledger.push(
                "list_extensions",
                SubTestResult::fail(format!("could not list extensions: {err}"), "grant the user SELECT on pg_extension")
                    .with_error_code("list_extensions_failed"),
            ),
        };

        pool.close().await;
        ProbeResult::from_ledger(self.id(), self.display_name(), started_at, ledger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_string_urlencodes_credentials() {
        let probe = PostgresProbe::new(PostgresConfig {
            enabled: true,
            host: Some("db.internal".into()),
            port: Some(5432),
            database: Some("app".into()),
            username: Some("user name".into()),
            password: Some("p@ss/word".into()),
            sslmode: None,
        });
        let dsn = probe.connection_string();
        assert!(dsn.contains("user+name") || dsn.contains("user%20name"));
        assert!(dsn.contains("sslmode=prefer"));
    }

    #[test]
    fn unconfigured_when_password_missing() {
        let probe = PostgresProbe::new(PostgresConfig {
            enabled: true,
            host: Some("db".into()),
            database: Some("app".into()),
            username: Some("u".into()),
            ..Default::default()
        });
        assert!(!probe.is_configured());
    }
}
