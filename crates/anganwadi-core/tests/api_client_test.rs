//! HTTP-level tests for `ApiClient` and the resolver running over it.

use std::sync::Arc;

use anganwadi_core::api::{ApiClient, ApiError, BulkMarkRequest, HistoryQuery, MarkRequest};
use anganwadi_core::attendance::{AttendanceError, AttendanceResolver};
use anganwadi_core::models::{AttendanceStatus, NewVaccination, Provenance};
use anganwadi_core::vaccination::{VaccinationScheduler, VaccinationService};
use chrono::NaiveDate;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CENTER: &str = "Akkarakkunnu Anganwadi";

async fn client(server: &MockServer) -> ApiClient {
    let mut client = ApiClient::new(&format!("{}/api", server.uri())).unwrap();
    client.set_token("test-token".to_string());
    client
}

fn ok(data: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "success": true, "data": data }))
}

#[tokio::test]
async fn test_today_roster_uses_encoded_center_and_bearer() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/attendance/today/Akkarakkunnu%20Anganwadi"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ok(json!({
            "date": "2026-10-18",
            "anganwadiCenter": CENTER,
            "children": [
                { "childId": "c1", "childName": "Anu", "status": "present", "timeIn": "09:05" },
                { "childId": "c2", "childName": "Biju", "status": "half-day" }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let roster = client(&server).await.fetch_today_roster(CENTER).await.unwrap();
    assert_eq!(roster.date, NaiveDate::from_ymd_opt(2026, 10, 18).unwrap());
    assert_eq!(roster.len(), 2);
    assert_eq!(roster.get("c1").unwrap().time_in.as_deref(), Some("09:05"));
    assert_eq!(roster.get("c2").unwrap().status, AttendanceStatus::HalfDay);
}

#[tokio::test]
async fn test_children_query_parameters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/registration/children"))
        .and(query_param("anganwadiCenter", CENTER))
        .and(query_param("status", "active"))
        .and(query_param("page", "2"))
        .and(query_param("limit", "50"))
        .respond_with(ok(json!({
            "children": [{ "_id": "c9", "name": "Chinnu", "age": 4 }],
            "total": 51
        })))
        .mount(&server)
        .await;

    let children = client(&server)
        .await
        .fetch_children(CENTER, "active", 2, 50)
        .await
        .unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].id, "c9");
    assert_eq!(children[0].age, Some(4));
}

#[tokio::test]
async fn test_mark_posts_full_record() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/attendance/mark"))
        .and(body_json(json!({
            "childId": "c1",
            "childName": "Anu",
            "anganwadiCenter": CENTER,
            "status": "late",
            "timeIn": "09:40",
            "nutritionReceived": false,
            "healthCheckDone": false
        })))
        .respond_with(ok(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let request = MarkRequest {
        child_id: "c1".to_string(),
        child_name: "Anu".to_string(),
        anganwadi_center: CENTER.to_string(),
        status: AttendanceStatus::Late,
        time_in: Some("09:40".to_string()),
        time_out: None,
        notes: None,
        nutrition_received: Some(false),
        health_check_done: Some(false),
    };
    client(&server).await.mark_attendance(&request).await.unwrap();
}

#[tokio::test]
async fn test_bulk_mark_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/attendance/bulk-mark"))
        .and(body_json(json!({
            "anganwadiCenter": CENTER,
            "status": "absent",
            "childIds": ["c1", "c2"]
        })))
        .respond_with(ok(json!({ "modified": 2 })))
        .expect(1)
        .mount(&server)
        .await;

    let request = BulkMarkRequest {
        anganwadi_center: CENTER.to_string(),
        status: AttendanceStatus::Absent,
        child_ids: Some(vec!["c1".to_string(), "c2".to_string()]),
    };
    client(&server).await.bulk_mark(&request).await.unwrap();
}

#[tokio::test]
async fn test_rejected_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/attendance/mark"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "success": false, "message": "Child not enrolled" })),
        )
        .mount(&server)
        .await;

    let request = MarkRequest {
        child_id: "c1".to_string(),
        child_name: "Anu".to_string(),
        anganwadi_center: CENTER.to_string(),
        status: AttendanceStatus::Present,
        time_in: Some("09:00".to_string()),
        time_out: None,
        notes: None,
        nutrition_received: None,
        health_check_done: None,
    };
    let err = client(&server).await.mark_attendance(&request).await.unwrap_err();
    assert!(matches!(err, ApiError::Rejected(ref m) if m == "Child not enrolled"));
}

#[tokio::test]
async fn test_status_codes_map_to_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/attendance/today/Nowhere"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such center"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/attendance/today/Locked"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let api = client(&server).await;
    assert!(matches!(api.fetch_today_roster("Nowhere").await, Err(ApiError::NotFound(_))));
    assert!(matches!(api.fetch_today_roster("Locked").await, Err(ApiError::Unauthorized)));
}

#[tokio::test]
async fn test_rate_limit_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/attendance/statistics/Ward"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/attendance/statistics/Ward"))
        .respond_with(ok(json!({
            "totalDays": 5,
            "totalRecords": 40,
            "present": 30,
            "absent": 6,
            "late": 2,
            "sick": 1,
            "halfDay": 1,
            "attendanceRate": 82.5
        })))
        .with_priority(2)
        .mount(&server)
        .await;

    let stats = client(&server).await.fetch_statistics("Ward", None, None).await.unwrap();
    assert_eq!(stats.total_days, 5);
    assert_eq!(stats.present, 30);
}

#[tokio::test]
async fn test_history_query_and_wrapped_shape() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/attendance/history/c1"))
        .and(query_param("startDate", "2026-10-01"))
        .and(query_param("limit", "2"))
        .respond_with(ok(json!({
            "history": [
                { "date": "2026-10-17", "status": "present", "timeIn": "09:00" },
                { "date": "2026-10-16", "status": "sick" }
            ]
        })))
        .mount(&server)
        .await;

    let query = HistoryQuery {
        start_date: NaiveDate::from_ymd_opt(2026, 10, 1),
        end_date: None,
        limit: Some(2),
    };
    let entries = client(&server).await.fetch_history("c1", &query).await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1].status, AttendanceStatus::Sick);
}

#[tokio::test]
async fn test_resolver_falls_back_to_registration_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/attendance/today/Akkarakkunnu%20Anganwadi"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/registration/children"))
        .and(query_param("anganwadiCenter", CENTER))
        .respond_with(ok(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/registration/children"))
        .and(query_param("anganwadiCenter", "Akkarakunnu Anganwadi"))
        .respond_with(ok(json!([
            { "_id": "c1", "name": "Anu" },
            { "_id": "c2", "name": "Biju" }
        ])))
        .mount(&server)
        .await;

    let resolver = AttendanceResolver::new(
        Arc::new(client(&server).await),
        vec!["Akkarakunnu Anganwadi".to_string()],
    );
    let resolved = resolver.resolve_roster(CENTER).await.unwrap();
    assert_eq!(resolved.roster.center, CENTER);
    assert_eq!(resolved.roster.len(), 2);
    assert!(resolved.roster.records.iter().all(|r| r.status == AttendanceStatus::Absent));
    assert_eq!(
        resolved.provenance,
        Provenance::Derived {
            center_name: "Akkarakunnu Anganwadi".to_string()
        }
    );
}

#[tokio::test]
async fn test_resolver_reports_unavailable_when_server_is_down() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let resolver = AttendanceResolver::new(Arc::new(client(&server).await), vec![]);
    let err = resolver.resolve_roster(CENTER).await.unwrap_err();
    assert!(matches!(err, AttendanceError::DataUnavailable { .. }));
}

#[tokio::test]
async fn test_vaccination_due_list_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/health/children"))
        .and(query_param("anganwadiCenter", CENTER))
        .respond_with(ok(json!([
            { "_id": "c1", "name": "Anu", "dateOfBirth": "2026-01-18", "vaccinations": ["BCG"] },
            { "_id": "c2", "name": "Biju", "dateOfBirth": "2026-01-18T00:00:00.000Z" }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/health/children/c2/vaccinations"))
        .respond_with(ok(json!({ "vaccinations": [{ "vaccineName": "BCG", "dateGiven": "2026-01-18" }] })))
        .expect(1)
        .mount(&server)
        .await;

    let service = VaccinationService::new(Arc::new(client(&server).await));
    let scheduler = VaccinationScheduler::new(NaiveDate::from_ymd_opt(2026, 10, 18).unwrap());
    let list = service.due_list(Some(CENTER), &scheduler).await.unwrap();

    assert!(list.entries.iter().all(|e| e.vaccine_name != "BCG"));
    assert_eq!(list.counts.due, 2); // MMR 1 for each child
    assert_eq!(list.counts.scheduled, 4);
}

#[tokio::test]
async fn test_health_children_with_embedded_dose_records() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/health/children"))
        .respond_with(ok(json!([
            {
                "_id": "c1",
                "name": "Anu",
                "dateOfBirth": "2026-01-18",
                "vaccinations": [
                    { "vaccineName": "BCG", "dateGiven": "2026-01-18" },
                    { "vaccineName": "Hepatitis B Birth", "dateGiven": "2026-01-18" }
                ]
            }
        ])))
        .mount(&server)
        .await;

    let service = VaccinationService::new(Arc::new(client(&server).await));
    let scheduler = VaccinationScheduler::new(NaiveDate::from_ymd_opt(2026, 10, 18).unwrap());
    let list = service.due_list(None, &scheduler).await.unwrap();

    assert_eq!(list.entries.len(), 12);
    assert!(list
        .entries
        .iter()
        .all(|e| e.vaccine_name != "BCG" && e.vaccine_name != "Hepatitis B Birth"));
}

#[tokio::test]
async fn test_record_vaccination_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/health/vaccinations"))
        .and(body_json(json!({
            "childId": "c1",
            "vaccineName": "MMR 1",
            "dateGiven": "2026-10-18"
        })))
        .respond_with(ok(json!({ "_id": "v1" })))
        .expect(1)
        .mount(&server)
        .await;

    let vaccination = NewVaccination {
        child_id: "c1".to_string(),
        vaccine_name: "MMR 1".to_string(),
        date_given: NaiveDate::from_ymd_opt(2026, 10, 18).unwrap(),
        notes: None,
    };
    client(&server).await.record_vaccination(&vaccination).await.unwrap();
}
