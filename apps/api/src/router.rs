use std::sync::Arc;

use axum::{routing::get, Router};

use appointment_cell::router::{appointment_routes, AppointmentCellState};
use slot_cell::router::{slot_routes, SlotCellState};

pub fn create_router(slots: Arc<SlotCellState>, appointments: Arc<AppointmentCellState>) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic Scheduler API is running!" }))
        .nest("/doctors", slot_routes(slots))
        .nest("/appointments", appointment_routes(appointments))
}

#[cfg(test)]
mod tests {
    use super::*;
    use appointment_cell::services::{LogNotifier, NotificationDispatcher};
    use axum::{
        body::{to_bytes, Body},
        http::{header::AUTHORIZATION, header::CONTENT_TYPE, Request, StatusCode},
    };
    use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};
    use slot_cell::{Clock, FixedClock, SlotStore};
    use chrono::NaiveDate;
    use tower::ServiceExt;

    fn app() -> (Router, Arc<shared_config::AppConfig>) {
        let config = TestConfig::default().to_arc();
        let store = Arc::new(SlotStore::new());
        let monday_morning = NaiveDate::from_ymd_opt(2030, 1, 7)
            .and_then(|d| d.and_hms_opt(6, 0, 0))
            .unwrap();
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(monday_morning));
        let notifications = NotificationDispatcher::spawn(Arc::new(LogNotifier), 16);

        let slots = Arc::new(SlotCellState::new(Arc::clone(&config), Arc::clone(&store), Arc::clone(&clock)));
        let appointments = Arc::new(AppointmentCellState::new(Arc::clone(&config), store, clock, notifications));
        (create_router(slots, appointments), config)
    }

    #[tokio::test]
    async fn liveness_needs_no_token() {
        let (router, _) = app();
        let response = router
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn published_slot_is_bookable_through_the_api() {
        let (router, config) = app();
        let doctor = TestUser::doctor("doctor@example.com");
        let patient = TestUser::patient("patient@example.com");

        let publish = Request::builder()
            .method("POST")
            .uri(format!("/doctors/{}/slots", doctor.id))
            .header(AUTHORIZATION, JwtTestUtils::bearer(&doctor, &config))
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"date":"2030-01-09","start_time":"09:00:00"}"#))
            .unwrap();
        let response = router.clone().oneshot(publish).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body: serde_json::Value =
            serde_json::from_slice(&to_bytes(response.into_body(), usize::MAX).await.unwrap()).unwrap();
        let slot_id = body["slot"]["id"].as_str().unwrap().to_string();

        let book = Request::builder()
            .method("POST")
            .uri("/appointments")
            .header(AUTHORIZATION, JwtTestUtils::bearer(&patient, &config))
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(format!(r#"{{"slot_id":"{}"}}"#, slot_id)))
            .unwrap();
        let response = router.clone().oneshot(book).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let list = Request::builder()
            .uri(format!("/doctors/{}/slots?available_only=true", doctor.id))
            .header(AUTHORIZATION, JwtTestUtils::bearer(&patient, &config))
            .body(Body::empty())
            .unwrap();
        let response = router.oneshot(list).await.unwrap();
        let body: serde_json::Value =
            serde_json::from_slice(&to_bytes(response.into_body(), usize::MAX).await.unwrap()).unwrap();
        assert_eq!(body["total"], 0);
    }
}
