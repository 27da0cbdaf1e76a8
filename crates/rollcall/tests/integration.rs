//! Integration tests for rollcall
//!
//! These tests drive the check-in engine end to end with a real store and
//! mock adapters.

use chrono::{DateTime, Local, TimeZone, Utc};
use rollcall_api::{AttendanceStatus, ReasonCode, ScheduleDescriptor, SessionRecord};
use rollcall_config::parse_config;
use rollcall_core::{CheckInEngine, CoreEvent};
use rollcall_host_api::{LocationError, MockBackend, MockLocation, StaticLocation};
use rollcall_host_http::{HttpAttendanceBackend, HttpBackendConfig};
use rollcall_store::{AuditEventType, SqliteStore, Store};
use rollcall_util::{EARTH_RADIUS_METERS, GeoPoint, SessionId, StudentId};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

const CLASSROOM: GeoPoint = GeoPoint::new_unchecked(13.7563, 100.5018);

const SESSIONS_JSON: &str = r#"[
    {
        "_id": "s001",
        "title": "Lecture 1: Processes",
        "courseCode": "CS301",
        "isAttendanceOpen": true,
        "day": "Mon",
        "time": "09:00-12:00",
        "location": { "latitude": 13.7563, "longitude": 100.5018 }
    },
    {
        "_id": "s002",
        "title": "Lab 1",
        "courseCode": "CS301",
        "isAttendanceOpen": false,
        "day": "monday",
        "time": "13:00-15:00",
        "location": { "latitude": 13.7563, "longitude": 100.5018 }
    },
    {
        "_id": "s003",
        "title": "Guest talk",
        "isAttendanceOpen": true,
        "scheduledStart": "2025-12-29T02:00:00Z",
        "scheduledEnd": "2025-12-29T05:00:00Z"
    }
]"#;

fn load_sessions() -> Vec<SessionRecord> {
    serde_json::from_str(SESSIONS_JSON).unwrap()
}

fn session(id: &str) -> SessionRecord {
    load_sessions()
        .into_iter()
        .find(|s| s.id.as_str() == id)
        .unwrap()
}

// 2025-12-29 is a Monday
fn monday_at(hour: u32, minute: u32) -> DateTime<Local> {
    Local.with_ymd_and_hms(2025, 12, 29, hour, minute, 0).unwrap()
}

fn north_of(p: GeoPoint, meters: f64) -> GeoPoint {
    let d_lat = (meters / EARTH_RADIUS_METERS).to_degrees();
    GeoPoint::new_unchecked(p.latitude + d_lat, p.longitude)
}

fn student() -> StudentId {
    StudentId::new("6501234")
}

#[test]
fn test_session_fixture_parses() {
    let sessions = load_sessions();
    assert_eq!(sessions.len(), 3);
    assert_eq!(sessions[1].schedule, ScheduleDescriptor::weekly("monday", "13:00-15:00"));
    assert!(sessions[2].location.is_none());
}

#[tokio::test]
async fn test_check_in_with_configured_policy() {
    let policy = parse_config(
        r#"
        config_version = 1

        [geofence]
        radius_meters = 50.0

        [submission]
        status = "late"
        "#,
    )
    .unwrap();

    let store = Arc::new(SqliteStore::in_memory().unwrap());
    let location = Arc::new(MockLocation::new(north_of(CLASSROOM, 10.0)));
    let backend = Arc::new(MockBackend::new());
    let engine = CheckInEngine::new(policy, store.clone(), location.clone(), backend.clone());

    let outcome = engine
        .request_check_in(&session("s001"), &student(), monday_at(10, 0))
        .await;

    assert!(outcome.is_checked_in(), "{outcome:?}");
    let submissions = backend.submissions();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].status, AttendanceStatus::Late);
    assert!(store.is_checked(&SessionId::new("s001")).unwrap());
}

#[tokio::test]
async fn test_out_of_range_with_wider_radius_config() {
    let far = north_of(CLASSROOM, 200.0);

    let narrow = CheckInEngine::new(
        parse_config("config_version = 1").unwrap(),
        Arc::new(SqliteStore::in_memory().unwrap()),
        Arc::new(MockLocation::new(far)),
        Arc::new(MockBackend::new()),
    );
    let outcome = narrow
        .request_check_in(&session("s001"), &student(), monday_at(10, 0))
        .await;
    assert!(matches!(outcome.reason(), Some(ReasonCode::OutOfRange { .. })));

    let wide = CheckInEngine::new(
        parse_config("config_version = 1\n[geofence]\nradius_meters = 5000.0\n").unwrap(),
        Arc::new(SqliteStore::in_memory().unwrap()),
        Arc::new(MockLocation::new(far)),
        Arc::new(MockBackend::new()),
    );
    let outcome = wide
        .request_check_in(&session("s001"), &student(), monday_at(10, 0))
        .await;
    assert!(outcome.is_checked_in());
}

#[tokio::test]
async fn test_checked_sessions_survive_restart() {
    let temp_dir = tempfile::tempdir().unwrap();
    let db_path = temp_dir.path().join("rollcall.db");
    let policy = parse_config("config_version = 1").unwrap();

    {
        let engine = CheckInEngine::new(
            policy.clone(),
            Arc::new(SqliteStore::open(&db_path).unwrap()),
            Arc::new(StaticLocation::new(CLASSROOM)),
            Arc::new(MockBackend::new()),
        );
        let outcome = engine
            .request_check_in(&session("s001"), &student(), monday_at(9, 0))
            .await;
        assert!(outcome.is_checked_in());
    }

    let backend = Arc::new(MockBackend::new());
    let engine = CheckInEngine::new(
        policy,
        Arc::new(SqliteStore::open(&db_path).unwrap()),
        Arc::new(StaticLocation::new(CLASSROOM)),
        backend.clone(),
    );

    let outcome = engine
        .request_check_in(&session("s001"), &student(), monday_at(9, 30))
        .await;
    assert_eq!(outcome.reason(), Some(&ReasonCode::AlreadyCheckedIn));
    assert!(backend.submissions().is_empty());

    let views = engine.list_sessions(&load_sessions(), monday_at(9, 30));
    assert!(views[0].already_checked);
    assert!(!views[0].can_check_in);
}

#[tokio::test]
async fn test_unavailable_location_then_retry() {
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    let location = Arc::new(MockLocation::failing(LocationError::Timeout(
        std::time::Duration::from_secs(10),
    )));
    let backend = Arc::new(MockBackend::new());
    let engine = CheckInEngine::new(
        parse_config("config_version = 1").unwrap(),
        store.clone(),
        location.clone(),
        backend.clone(),
    );

    let outcome = engine
        .request_check_in(&session("s001"), &student(), monday_at(10, 0))
        .await;
    assert_eq!(outcome.reason(), Some(&ReasonCode::LocationUnavailable));

    location.set_position(CLASSROOM);
    let outcome = engine
        .request_check_in(&session("s001"), &student(), monday_at(10, 1))
        .await;
    assert!(outcome.is_checked_in());
    assert_eq!(location.calls(), 2);
}

#[tokio::test]
async fn test_explicit_window_session() {
    let backend = Arc::new(MockBackend::new());
    let engine = CheckInEngine::new(
        parse_config("config_version = 1").unwrap(),
        Arc::new(SqliteStore::in_memory().unwrap()),
        Arc::new(StaticLocation::unavailable()),
        backend.clone(),
    );

    let guest = session("s003");
    let inside = Utc.with_ymd_and_hms(2025, 12, 29, 3, 0, 0).unwrap().with_timezone(&Local);
    let after = Utc.with_ymd_and_hms(2025, 12, 29, 6, 0, 0).unwrap().with_timezone(&Local);

    let outcome = engine.request_check_in(&guest, &student(), after).await;
    assert_eq!(outcome.reason(), Some(&ReasonCode::OutsideScheduledTime));

    // No target location, so the missing device fix does not matter
    let outcome = engine.request_check_in(&guest, &student(), inside).await;
    assert!(outcome.is_checked_in());
    assert_eq!(backend.submissions()[0].timestamp, Utc.with_ymd_and_hms(2025, 12, 29, 3, 0, 0).unwrap());
}

#[tokio::test]
async fn test_events_and_audit_log() {
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    let location = Arc::new(MockLocation::new(CLASSROOM));
    let engine = CheckInEngine::new(
        parse_config("config_version = 1").unwrap(),
        store.clone(),
        location.clone(),
        Arc::new(MockBackend::new()),
    );
    let mut events = engine.subscribe();

    // Closed lab: denied without touching the location source
    let outcome = engine
        .request_check_in(&session("s002"), &student(), monday_at(14, 0))
        .await;
    assert_eq!(outcome.reason(), Some(&ReasonCode::SessionClosed));
    assert_eq!(location.calls(), 0);

    engine
        .request_check_in(&session("s001"), &student(), monday_at(10, 0))
        .await;
    engine.clear_history().unwrap();
    engine
        .toggle_attendance(&SessionId::new("s002"), true)
        .await
        .unwrap();

    assert!(matches!(events.try_recv(), Ok(CoreEvent::CheckInDenied { reason: ReasonCode::SessionClosed, .. })));
    assert!(matches!(events.try_recv(), Ok(CoreEvent::CheckedIn { .. })));
    assert!(matches!(events.try_recv(), Ok(CoreEvent::HistoryCleared { removed: 1 })));
    assert!(matches!(events.try_recv(), Ok(CoreEvent::AttendanceToggled { open: true, .. })));

    let kinds: Vec<_> = store
        .get_recent_audits(10)
        .unwrap()
        .into_iter()
        .map(|a| a.event)
        .collect();
    assert_eq!(kinds.len(), 5);
    assert!(matches!(kinds[0], AuditEventType::AttendanceToggled { open: true, .. }));
    assert!(matches!(kinds[1], AuditEventType::HistoryCleared { removed: 1 }));
    assert!(matches!(kinds[2], AuditEventType::CheckInSubmitted { .. }));
    assert!(matches!(kinds[3], AuditEventType::CheckInDenied { .. }));
    assert!(matches!(kinds[4], AuditEventType::ConfigLoaded { .. }));
}

/// Answer every connection with `201 Created` and a plain-text body
async fn created_text_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            loop {
                let n = socket.read(&mut chunk).await.unwrap_or(0);
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                let text = String::from_utf8_lossy(&buf);
                // The submission body is a single JSON object
                if text.contains("\r\n\r\n") && text.trim_end().ends_with('}') {
                    break;
                }
            }
            let response = "HTTP/1.1 201 Created\r\nContent-Type: text/plain\r\nContent-Length: 7\r\nConnection: close\r\n\r\nCreated";
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });

    format!("http://{}/api", addr)
}

#[tokio::test]
async fn test_accepted_submission_with_text_body_marks_session() {
    let base = created_text_server().await;
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    let backend = HttpAttendanceBackend::new(HttpBackendConfig::parse(&base).unwrap()).unwrap();
    let engine = CheckInEngine::new(
        parse_config("config_version = 1").unwrap(),
        store.clone(),
        Arc::new(StaticLocation::new(CLASSROOM)),
        Arc::new(backend),
    );

    let outcome = engine
        .request_check_in(&session("s001"), &student(), monday_at(10, 0))
        .await;

    assert!(outcome.is_checked_in(), "{outcome:?}");
    assert!(store.is_checked(&SessionId::new("s001")).unwrap());

    let outcome = engine
        .request_check_in(&session("s001"), &student(), monday_at(10, 5))
        .await;
    assert_eq!(outcome.reason(), Some(&ReasonCode::AlreadyCheckedIn));
}
