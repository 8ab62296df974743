//! End-to-end tests: the service against an in-memory SQLite store, and the
//! router driven with `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::{
  body::Body,
  http::{Request, StatusCode, header},
};
use chrono::{DateTime, NaiveDate, TimeZone as _, Utc};
use rollcall_core::{
  Error as CoreError,
  attendance::Slot,
  calendar::ServiceCalendar,
  id::{StudentKey, SupervisorId},
  shift::Closing,
  student::StudentProfile,
};
use rollcall_store_sqlite::SqliteStore;
use rollcall_token::TokenCodec;
use serde_json::{Value, json};
use tower::ServiceExt as _;

use crate::{BroadcastEvents, CheckInService, ScanOutcome, api_router};

const SECRET: &[u8] = b"rollcall-test-secret-0123456789";

struct Fixture {
  service: Arc<CheckInService<SqliteStore>>,
  student: StudentKey,
  token:   String,
}

async fn fixture() -> Fixture {
  let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
  let student = StudentKey::new();
  store
    .import_students(vec![StudentProfile {
      student_key: student,
      full_name:   "Grace Hopper".into(),
      email:       Some("grace@example.edu".into()),
      university:  Some("Yale".into()),
      phone:       None,
    }])
    .await
    .unwrap();

  let codec = TokenCodec::new(SECRET).unwrap();
  let service = CheckInService::new(store, codec, ServiceCalendar::utc());
  let token = service.issue_token(student, Utc::now()).await.unwrap().payload;
  Fixture { service: Arc::new(service), student, token }
}

fn sup(name: &str) -> SupervisorId { SupervisorId::new(name).unwrap() }

fn at(h: u32, m: u32) -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2025, 9, 26, h, m, 0).unwrap()
}

// ─── Service ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn two_supervisors_one_student() {
  let Fixture { service, student, token } = fixture().await;
  let a = sup("supervisor-a");
  let b = sup("supervisor-b");

  let shift_a = service.start_shift(&a, at(7, 0)).await.unwrap().into_shift();
  let first = service.scan(&a, &token, "first", at(8, 0)).await.unwrap();
  let ScanOutcome::CheckedIn { record, student: profile } = first else {
    panic!("expected check-in, got {first:?}");
  };
  assert_eq!(record.student_key, student);
  assert_eq!(record.date, NaiveDate::from_ymd_opt(2025, 9, 26).unwrap());
  assert_eq!(profile.full_name, "Grace Hopper");

  service.start_shift(&b, at(7, 30)).await.unwrap();
  let dup = service.scan(&b, &token, "first", at(8, 10)).await.unwrap();
  let ScanOutcome::Duplicate { existing, .. } = dup else {
    panic!("expected duplicate, got {dup:?}");
  };
  assert_eq!(existing.supervisor_id, a);
  assert_eq!(existing.check_in_time, at(8, 0));

  let second = service.scan(&a, &token, " Second ", at(16, 0)).await.unwrap();
  assert!(matches!(second, ScanOutcome::CheckedIn { ref record, .. } if record.slot == Slot::Second));

  let summary = service
    .close_shift(&a, shift_a.shift_id, at(17, 0))
    .await
    .unwrap()
    .into_inner();
  assert_eq!(summary.admissions[&Slot::First], 1);
  assert_eq!(summary.admissions[&Slot::Second], 1);
  assert_eq!(summary.shift.scan_count, 2);

  let after = service.scan(&a, &token, "first", at(17, 5)).await.unwrap();
  assert_eq!(after, ScanOutcome::NoOpenShift);
}

#[tokio::test]
async fn repeat_scan_is_already_checked_in() {
  let Fixture { service, token, .. } = fixture().await;
  let a = sup("supervisor-a");
  service.start_shift(&a, at(7, 0)).await.unwrap();

  let first = service.scan(&a, &token, "first", at(8, 0)).await.unwrap();
  let again = service.scan(&a, &token, "first", at(8, 1)).await.unwrap();

  assert!(first.is_success());
  assert!(matches!(again, ScanOutcome::AlreadyCheckedIn { .. }));
  assert!(again.is_success());
}

#[tokio::test]
async fn scan_in_closed_shift_is_an_outcome() {
  let Fixture { service, token, .. } = fixture().await;
  let a = sup("supervisor-a");
  let shift = service.start_shift(&a, at(7, 0)).await.unwrap().into_shift();
  service.close_shift(&a, shift.shift_id, at(9, 0)).await.unwrap();

  let outcome = service
    .scan_in_shift(&a, shift.shift_id, &token, "first", at(9, 1))
    .await
    .unwrap();
  assert_eq!(outcome, ScanOutcome::ShiftClosed { shift_id: shift.shift_id });
  assert!(service.ledger().records_for_shift(shift.shift_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn scan_in_someone_elses_shift() {
  let Fixture { service, token, .. } = fixture().await;
  let shift = service
    .start_shift(&sup("supervisor-a"), at(7, 0))
    .await
    .unwrap()
    .into_shift();

  let err = service
    .scan_in_shift(&sup("supervisor-b"), shift.shift_id, &token, "first", at(8, 0))
    .await
    .unwrap_err();
  assert!(matches!(err, CoreError::ShiftNotOwned { .. }));
}

#[tokio::test]
async fn bad_input_is_rejected_before_any_write() {
  let Fixture { service, token, .. } = fixture().await;
  let a = sup("supervisor-a");
  service.start_shift(&a, at(7, 0)).await.unwrap();

  let slot = service.scan(&a, &token, "third", at(8, 0)).await.unwrap_err();
  assert!(matches!(slot, CoreError::InvalidSlot(_)));

  let mut forged = token.clone();
  forged.pop();
  let bad = service.scan(&a, &forged, "first", at(8, 0)).await.unwrap_err();
  assert!(matches!(bad, CoreError::MalformedToken(_)));

  let today = NaiveDate::from_ymd_opt(2025, 9, 26).unwrap();
  assert!(service.ledger().records_on(today).await.unwrap().is_empty());
}

#[tokio::test]
async fn unknown_students_cannot_scan_or_be_issued() {
  let Fixture { service, .. } = fixture().await;
  let stranger = StudentKey::new();
  let err = service.issue_token(stranger, at(8, 0)).await.unwrap_err();
  assert!(matches!(err, CoreError::UnknownSubject(k) if k == stranger));
}

#[tokio::test]
async fn admissions_are_published() {
  let Fixture { service, student, token } = fixture().await;
  let service = Arc::try_unwrap(service).ok().unwrap();
  let events = BroadcastEvents::default();
  let mut rx = events.subscribe();
  let service = service.with_events(Arc::new(events));

  let a = sup("supervisor-a");
  service.start_shift(&a, at(7, 0)).await.unwrap();
  service.scan(&a, &token, "first", at(8, 0)).await.unwrap();
  service.scan(&a, &token, "first", at(8, 1)).await.unwrap();

  let event = rx.recv().await.unwrap();
  assert_eq!(event.student_key, student);
  assert_eq!(event.slot, Slot::First);
  assert!(rx.try_recv().is_err(), "repeat scans publish nothing");
}

#[tokio::test]
async fn closing_twice_returns_the_same_summary() {
  let Fixture { service, .. } = fixture().await;
  let a = sup("supervisor-a");
  let shift = service.start_shift(&a, at(7, 0)).await.unwrap().into_shift();

  let first = service.close_shift(&a, shift.shift_id, at(9, 0)).await.unwrap();
  let second = service.close_shift(&a, shift.shift_id, at(9, 5)).await.unwrap();
  assert!(matches!(first, Closing::Closed(_)));
  assert!(matches!(second, Closing::AlreadyClosed(_)));
  assert_eq!(first.into_inner(), second.into_inner());
}

// ─── HTTP ────────────────────────────────────────────────────────────────────

async fn call(
  fx: &Fixture,
  method: &str,
  uri: &str,
  supervisor: Option<&str>,
  body: Option<Value>,
) -> (StatusCode, Value) {
  let mut builder = Request::builder().method(method).uri(uri);
  if let Some(supervisor) = supervisor {
    builder = builder.header("x-supervisor-id", supervisor);
  }
  let body = match body {
    Some(json) => {
      builder = builder.header(header::CONTENT_TYPE, "application/json");
      Body::from(json.to_string())
    }
    None => Body::empty(),
  };
  let resp = api_router(Arc::clone(&fx.service))
    .oneshot(builder.body(body).unwrap())
    .await
    .unwrap();

  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let value = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap()
  };
  (status, value)
}

#[tokio::test]
async fn http_scan_flow() {
  let fx = fixture().await;

  let (status, shift) = call(&fx, "POST", "/shifts", Some("alice"), None).await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(shift["resumed"], false);
  assert_eq!(shift["status"], "open");

  let (status, again) = call(&fx, "POST", "/shifts", Some("alice"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(again["resumed"], true);
  assert_eq!(again["shift_id"], shift["shift_id"]);

  let scan = json!({ "token": fx.token, "slot": "first" });
  let (status, outcome) =
    call(&fx, "POST", "/scans", Some("alice"), Some(scan.clone())).await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(outcome["outcome"], "checked_in");
  assert_eq!(outcome["student"]["full_name"], "Grace Hopper");

  let (status, outcome) =
    call(&fx, "POST", "/scans", Some("alice"), Some(scan.clone())).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(outcome["outcome"], "already_checked_in");

  call(&fx, "POST", "/shifts", Some("bob"), None).await;
  let (status, outcome) = call(&fx, "POST", "/scans", Some("bob"), Some(scan)).await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert_eq!(outcome["outcome"], "duplicate");
  assert_eq!(outcome["existing"]["supervisor_id"], "alice");

  let uri = format!("/attendance?student={}&slot=first", fx.student);
  let (status, records) = call(&fx, "GET", &uri, Some("bob"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(records.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn http_close_then_scan() {
  let fx = fixture().await;
  let (_, shift) = call(&fx, "POST", "/shifts", Some("alice"), None).await;
  let id = shift["shift_id"].as_str().unwrap().to_owned();

  let (status, records) =
    call(&fx, "GET", &format!("/shifts/{id}/records"), Some("alice"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(records, json!([]));

  let close = format!("/shifts/{id}/close");
  let (status, first) = call(&fx, "POST", &close, Some("alice"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(first["already_closed"], false);
  assert_eq!(first["shift"]["status"], "closed");

  let (status, second) = call(&fx, "POST", &close, Some("alice"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(second["already_closed"], true);
  assert_eq!(second["shift"], first["shift"]);

  let (status, body) = call(&fx, "GET", "/shifts/open", Some("alice"), None).await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert_eq!(body["error"], "no_open_shift");

  let scan = json!({ "token": fx.token, "slot": "first" });
  let (status, outcome) = call(&fx, "POST", "/scans", Some("alice"), Some(scan)).await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert_eq!(outcome["outcome"], "no_open_shift");

  let (status, history) = call(&fx, "GET", "/shifts/history", Some("alice"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(history.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn http_errors_are_json() {
  let fx = fixture().await;

  let (status, body) = call(&fx, "POST", "/shifts", None, None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["error"], "missing_supervisor");

  let (_, shift) = call(&fx, "POST", "/shifts", Some("alice"), None).await;
  let id = shift["shift_id"].as_str().unwrap().to_owned();

  let (status, body) =
    call(&fx, "POST", &format!("/shifts/{id}/close"), Some("bob"), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
  assert_eq!(body["error"], "shift_not_owned");

  let scan = json!({ "token": fx.token, "slot": "lunch" });
  let (status, body) = call(&fx, "POST", "/scans", Some("alice"), Some(scan)).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["error"], "invalid_slot");

  let scan = json!({ "token": "RC1.e30.AAAA", "slot": "first" });
  let (status, body) = call(&fx, "POST", "/scans", Some("alice"), Some(scan)).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["error"], "malformed_token");

  let uri = format!("/shifts/{}", uuid_like());
  let (status, body) = call(&fx, "GET", &uri, Some("alice"), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_eq!(body["error"], "shift_not_found");

  let (status, body) =
    call(&fx, "GET", "/attendance?date=2025-09-26&from=2025-09-01", Some("alice"), None)
      .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn http_malformed_requests_are_json() {
  let fx = fixture().await;
  call(&fx, "POST", "/shifts", Some("alice"), None).await;

  let scan = json!({ "token": fx.token });
  let (status, body) = call(&fx, "POST", "/scans", Some("alice"), Some(scan)).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["error"], "bad_request");
  assert!(body["message"].as_str().unwrap().contains("slot"));

  let scan = json!({ "token": fx.token, "slot": "first", "shift_id": "nope" });
  let (status, body) = call(&fx, "POST", "/scans", Some("alice"), Some(scan)).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["error"], "bad_request");

  for uri in ["/shifts/not-a-uuid", "/shifts/not-a-uuid/records"] {
    let (status, body) = call(&fx, "GET", uri, Some("alice"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
    assert_eq!(body["error"], "bad_request", "{uri}");
  }
  let (status, body) =
    call(&fx, "POST", "/shifts/not-a-uuid/close", Some("alice"), None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["error"], "bad_request");

  let (status, body) =
    call(&fx, "GET", "/attendance?date=yesterday", Some("alice"), None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["error"], "bad_request");

  let (status, body) =
    call(&fx, "POST", "/students/not-a-uuid/token", Some("alice"), None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn http_issue_token() {
  let fx = fixture().await;
  let uri = format!("/students/{}/token", fx.student);

  let (status, issued) = call(&fx, "POST", &uri, Some("alice"), None).await;
  assert_eq!(status, StatusCode::CREATED);
  let payload = issued["payload"].as_str().unwrap();
  assert!(payload.starts_with("RC1."));

  let (status, body) = call(&fx, "POST", &uri, None, None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["error"], "missing_supervisor");

  let (status, body) = call(
    &fx,
    "POST",
    &format!("/students/{}/token", uuid_like()),
    Some("alice"),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_eq!(body["error"], "unknown_subject");
}

fn uuid_like() -> String { StudentKey::new().to_string() }
