// src/api_tests.rs

#[cfg(test)]
mod tests {
    use crate::api::{router, AppState, BADGE_HEADER};
    use crate::clock::FixedClock;
    use crate::config::SchedulingPolicy;
    use crate::directory::{Employee, RosterExceptions};
    use crate::dispatch::Dispatch;
    use crate::period::Period;
    use crate::service::SchedulingService;
    use crate::store::{DispatchStore, ReplaceOutcome, SqliteStore, StoreError};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use chrono::{DateTime, NaiveDate, TimeZone, Utc};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;
    use uuid::Uuid;

    // --- Test Helpers ---

    const PERIOD: &str = "2025-12-22,2025-12-23,2025-12-29,2025-12-30";

    /// Fails every replacement for badge 1002.
    struct FailingFor1002(Arc<SqliteStore>);

    #[async_trait]
    impl DispatchStore for FailingFor1002 {
        async fn list_for_badges(
            &self,
            badges: &[String],
            dates: &[NaiveDate],
        ) -> Result<Vec<Dispatch>, StoreError> {
            self.0.list_for_badges(badges, dates).await
        }

        async fn replace_for_employee(
            &self,
            badge: &str,
            dates: &[NaiveDate],
            replacement: &[Dispatch],
        ) -> Result<ReplaceOutcome, StoreError> {
            if badge == "1002" {
                return Err(StoreError::Database(sqlx::Error::PoolClosed));
            }
            self.0.replace_for_employee(badge, dates, replacement).await
        }

        async fn find_by_token(&self, token: Uuid) -> Result<Option<Dispatch>, StoreError> {
            self.0.find_by_token(token).await
        }

        async fn record_validation(&self, token: Uuid, at: DateTime<Utc>) -> Result<bool, StoreError> {
            self.0.record_validation(token, at).await
        }
    }

    async fn seeded_store() -> Arc<SqliteStore> {
        let store = SqliteStore::in_memory().await.unwrap();
        store.migrate().await.unwrap();
        for (badge, name, supervisor, level) in [
            ("9001", "Marta Chefe", None, "GERENTE"),
            ("1001", "Ana", Some("Marta Chefe"), "COLABORADOR"),
            ("1002", "Bruno", Some("Marta Chefe"), "COLABORADOR"),
        ] {
            let employee = Employee {
                badge: badge.to_string(),
                name: name.to_string(),
                title: None,
                supervisor_name: supervisor.map(String::from),
                level: Some(level.to_string()),
            };
            store.upsert_employee(&employee, true).await.unwrap();
        }
        Arc::new(store)
    }

    fn app_with(store: Arc<SqliteStore>, dispatches: Arc<dyn DispatchStore>) -> Router {
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2025, 12, 1, 9, 0, 0).unwrap(),
        ));
        let service = SchedulingService::new(
            store,
            dispatches,
            Period::parse(PERIOD).unwrap(),
            SchedulingPolicy::default(),
            RosterExceptions::default(),
            clock,
        );
        router(AppState {
            service: Arc::new(service),
        })
    }

    async fn app() -> (Router, Arc<SqliteStore>) {
        let store = seeded_store().await;
        (app_with(store.clone(), store.clone()), store)
    }

    fn get(uri: &str, badge: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(badge) = badge {
            builder = builder.header(BADGE_HEADER, badge);
        }
        builder.body(Body::empty()).unwrap()
    }

    fn post(uri: &str, badge: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(badge) = badge {
            builder = builder.header(BADGE_HEADER, badge);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    // --- Tests ---

    #[tokio::test]
    async fn health_is_public() {
        let (app, _) = app().await;
        let (status, body) = send(&app, get("/health", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn identity_is_required() {
        let (app, _) = app().await;
        let (status, body) = send(&app, get("/api/schedule", None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);

        let (status, _) = send(&app, get("/api/schedule", Some("4040"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn supervisor_status_endpoint() {
        let (app, _) = app().await;
        let (status, body) = send(&app, get("/api/supervisor/status", Some("9001"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["isSupervisor"], true);
        assert_eq!(body["subordinates"], 2);

        let (_, body) = send(&app, get("/api/supervisor/status", Some("1001"))).await;
        assert_eq!(body["isSupervisor"], false);
    }

    #[tokio::test]
    async fn employees_cannot_list_the_team() {
        let (app, _) = app().await;
        let (status, body) = send(&app, get("/api/schedule", Some("1001"))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["badge"], "1001");
    }

    #[tokio::test]
    async fn save_then_list() {
        let (app, _) = app().await;

        let (status, body) = send(
            &app,
            post(
                "/api/schedule",
                Some("9001"),
                json!({ "entries": [{ "badge": "1001", "name": "Ana", "workDays": ["2025-12-22", "2025-12-23"] }] }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["dispatchesCreated"], 4);
        assert_eq!(body["results"][0]["badge"], "1001");

        let (status, body) = send(&app, get("/api/schedule", Some("9001"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["period"].as_array().unwrap().len(), 4);
        let ana = body["employees"]
            .as_array()
            .unwrap()
            .iter()
            .find(|e| e["badge"] == "1001")
            .unwrap();
        assert_eq!(ana["label"], "off-second-half");
        assert_eq!(ana["hasAnyDispatch"], true);
        assert_eq!(ana["offDays"], json!(["2025-12-29", "2025-12-30"]));

        let bruno = body["employees"]
            .as_array()
            .unwrap()
            .iter()
            .find(|e| e["badge"] == "1002")
            .unwrap();
        assert_eq!(bruno["label"], "none-selected");
        assert_eq!(bruno["workDays"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn label_form_is_accepted() {
        let (app, _) = app().await;
        let (status, body) = send(
            &app,
            post(
                "/api/schedule",
                Some("9001"),
                json!({ "entries": [{ "badge": "1002", "label": "irregular", "offDays": ["2025-12-23"] }] }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["dispatchesCreated"], 6);
    }

    #[tokio::test]
    async fn invalid_entries_are_bad_requests() {
        let (app, store) = app().await;

        let (status, body) = send(
            &app,
            post(
                "/api/schedule",
                Some("9001"),
                json!({ "entries": [{ "badge": "1001", "workDays": [] }] }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["badge"], "1001");

        let (status, _) = send(
            &app,
            post("/api/schedule", Some("9001"), json!({ "entries": "nope" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let stored = store
            .list_for_badges(&["1001".to_string()], Period::parse(PERIOD).unwrap().dates())
            .await
            .unwrap();
        assert!(stored.is_empty());
    }

    #[tokio::test]
    async fn partial_and_total_failures_have_distinct_statuses() {
        let store = seeded_store().await;
        let app = app_with(store.clone(), Arc::new(FailingFor1002(store.clone())));

        let (status, body) = send(
            &app,
            post(
                "/api/schedule",
                Some("9001"),
                json!({ "entries": [
                    { "badge": "1001", "workDays": ["2025-12-22", "2025-12-23", "2025-12-29"] },
                    { "badge": "1002", "workDays": ["2025-12-22", "2025-12-23", "2025-12-29"] }
                ] }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::MULTI_STATUS);
        assert_eq!(body["success"], false);
        assert_eq!(body["dispatchesCreated"], 6);
        assert!(body["results"][0].get("error").is_none());
        assert!(body["results"][1]["error"].is_string());

        let (status, body) = send(
            &app,
            post(
                "/api/schedule",
                Some("9001"),
                json!({ "entries": [{ "badge": "1002", "label": "no-days-off" }] }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["dispatchesCreated"], 0);
    }

    #[tokio::test]
    async fn own_schedule_and_toggle() {
        let (app, _) = app().await;
        let (status, body) = send(&app, get("/api/schedule/me", Some("1001"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["schedule"]["hasAnyDispatch"], false);
        assert_eq!(body["schedule"]["label"], "none-selected");

        let (status, body) = send(
            &app,
            post(
                "/api/schedule/toggle",
                Some("1001"),
                json!({ "workDays": ["2025-12-29", "2025-12-30"], "date": "2025-12-29" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["allowed"], false);
        assert_eq!(body["label"], "off-first-half");

        let (status, _) = send(
            &app,
            post(
                "/api/schedule/toggle",
                Some("1001"),
                json!({ "workDays": [], "date": "2026-01-05" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn toggle_requires_an_identity() {
        let (app, _) = app().await;
        let toggle = json!({ "workDays": ["2025-12-22"], "date": "2025-12-23" });

        let (status, _) = send(&app, post("/api/schedule/toggle", None, toggle.clone())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(&app, post("/api/schedule/toggle", Some("4040"), toggle)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn dispatch_lookup_and_validation() {
        let (app, store) = app().await;
        send(
            &app,
            post(
                "/api/schedule",
                Some("9001"),
                json!({ "entries": [{ "badge": "1001", "label": "no-days-off" }] }),
            ),
        )
        .await;
        let dispatch = store
            .list_for_badges(&["1001".to_string()], Period::parse(PERIOD).unwrap().dates())
            .await
            .unwrap()
            .remove(0);
        let token = dispatch.token;

        let uri = format!("/api/dispatches/{}", token);
        let (status, body) = send(&app, get(&uri, Some("1001"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "pending");
        assert_eq!(body["badge"], "1001");
        assert_eq!(
            body["dispatchAt"],
            serde_json::to_value(dispatch.dispatch_at).unwrap()
        );

        let validate = format!("/api/dispatches/{}/validate", token);
        let (status, body) = send(&app, post(&validate, Some("1001"), json!({}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "validated");

        let (status, _) = send(&app, post(&validate, Some("1001"), json!({}))).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = send(
            &app,
            get(&format!("/api/dispatches/{}", Uuid::new_v4()), Some("1001")),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, get("/api/dispatches/not-a-token", Some("1001"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn dispatches_answer_only_to_their_owner() {
        let (app, store) = app().await;
        send(
            &app,
            post(
                "/api/schedule",
                Some("9001"),
                json!({ "entries": [{ "badge": "1001", "label": "no-days-off" }] }),
            ),
        )
        .await;
        let token = store
            .list_for_badges(&["1001".to_string()], Period::parse(PERIOD).unwrap().dates())
            .await
            .unwrap()[0]
            .token;
        let uri = format!("/api/dispatches/{}", token);
        let validate = format!("/api/dispatches/{}/validate", token);

        let (status, _) = send(&app, get(&uri, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) = send(&app, post(&validate, None, json!({}))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        // a colleague, and the supervisor who scheduled it, are both refused
        for badge in ["1002", "9001"] {
            let (status, body) = send(&app, get(&uri, Some(badge))).await;
            assert_eq!(status, StatusCode::FORBIDDEN);
            assert_eq!(body["badge"], badge);
            let (status, _) = send(&app, post(&validate, Some(badge), json!({}))).await;
            assert_eq!(status, StatusCode::FORBIDDEN);
        }

        let found = store.find_by_token(token).await.unwrap().unwrap();
        assert!(found.validated_at.is_none());
    }
}
