use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// Create a PostgreSQL connection pool.
///
/// The worker holds one connection for the live feed for its whole lifetime, so
/// `max_connections` must leave room for transient queries next to it.
pub async fn create_pool(
    database_url: &str,
    min_connections: u32,
    max_connections: u32,
) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .min_connections(min_connections)
        .max_connections(max_connections)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(database_url)
        .await?;

    tracing::info!(min_connections, max_connections, "Connected to PostgreSQL");
    Ok(pool)
}
