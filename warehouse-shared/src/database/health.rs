use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::time::{Duration, Instant};

/// Minimal health surface for this service: there is no cache or message
/// broker to report on, only the database the mutation engine depends on.
#[derive(Clone)]
pub struct HealthChecker {
    pool: PgPool,
    timeout: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub database: HealthStatus,
    pub response_time_ms: u64,
}

impl HealthChecker {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            timeout: Duration::from_secs(5),
        }
    }

    pub async fn check(&self) -> HealthReport {
        let start = Instant::now();
        let database = match tokio::time::timeout(self.timeout, self.ping()).await {
            Ok(Ok(())) => HealthStatus::Healthy,
            _ => HealthStatus::Unhealthy,
        };

        HealthReport {
            status: database,
            database,
            response_time_ms: start.elapsed().as_millis() as u64,
        }
    }

    async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
