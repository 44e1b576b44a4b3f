pub mod connection;
pub mod health;

pub use connection::{connect, migrate};
pub use health::{HealthChecker, HealthReport, HealthStatus};

use sqlx::{PgPool, Postgres, Transaction};

pub type DbPool = PgPool;
pub type DbTransaction<'a> = Transaction<'a, Postgres>;
