use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use nunzio_db::DbPool;
use serde::Serialize;

#[derive(Clone)]
pub struct HealthState {
    db_pool: DbPool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: HealthCheck,
    pub catalog: HealthCheck,
    pub checked_at: String,
}

pub fn router(db_pool: DbPool) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { db_pool })
}

/// Only the database decides readiness. An empty catalog is reported but the
/// handler copes with it by creating exercises on demand.
pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let (database, exercises) =
        match sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM exercises")
            .fetch_one(&state.db_pool)
            .await
        {
            Ok(count) => (
                HealthCheck { status: "ready", detail: "database query succeeded".to_string() },
                Some(count),
            ),
            Err(error) => (
                HealthCheck {
                    status: "degraded",
                    detail: format!("database query failed: {error}"),
                },
                None,
            ),
        };

    let catalog = match exercises {
        Some(0) => HealthCheck { status: "empty", detail: "no exercises seeded".to_string() },
        Some(count) => HealthCheck { status: "ready", detail: format!("{count} exercises") },
        None => HealthCheck { status: "unknown", detail: "database unavailable".to_string() },
    };

    let ready = database.status == "ready";
    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        database,
        catalog,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

#[cfg(test)]
mod tests {
    use axum::{extract::State, http::StatusCode, Json};
    use nunzio_db::{connect_with_settings, migrations, CatalogSeed};

    use crate::health::{health, HealthState};

    #[tokio::test]
    async fn health_is_ready_with_a_seeded_catalog() {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("pool should connect");
        migrations::run_pending(&pool).await.expect("migrations");
        CatalogSeed::load(&pool).await.expect("seed");

        let (status, Json(payload)) = health(State(HealthState { db_pool: pool.clone() })).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "ready");
        assert_eq!(payload.catalog.status, "ready");

        pool.close().await;
    }

    #[tokio::test]
    async fn empty_catalog_is_reported_without_failing() {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("pool should connect");
        migrations::run_pending(&pool).await.expect("migrations");

        let (status, Json(payload)) = health(State(HealthState { db_pool: pool })).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.catalog.status, "empty");
    }

    #[tokio::test]
    async fn closed_pool_reports_service_unavailable() {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("pool should connect");
        pool.close().await;

        let (status, Json(payload)) = health(State(HealthState { db_pool: pool })).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload.status, "degraded");
        assert_eq!(payload.database.status, "degraded");
        assert_eq!(payload.catalog.status, "unknown");
    }
}
