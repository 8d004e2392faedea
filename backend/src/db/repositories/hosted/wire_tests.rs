//! Request-shape tests running the hosted repository against a local
//! stand-in for the managed store.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, Method, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use parking_lot::Mutex;
use reqwest::header::{HeaderValue, CONTENT_RANGE};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

use super::{HostedConfig, HostedRepository};
use crate::api::{Broadcast, OwnedTable, RecipientFilter, Role, UserId};
use crate::db::repository::{BroadcastRepository, IdentityRepository};
use crate::services::broadcast::{dispatch_broadcast, FALLBACK_NAME};
use crate::services::teacher_deletion::delete_teacher;
use crate::services::{DispatchGuard, LocalMailer};

const SERVICE_KEY: &str = "service-key";
const ANON_KEY: &str = "anon-key";

/// One request as the store saw it.
#[derive(Debug, Clone)]
struct Recorded {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    headers: HashMap<String, String>,
    body: Value,
}

impl Recorded {
    fn param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    fn assert_service_role(&self) {
        assert_eq!(self.header("apikey"), Some(SERVICE_KEY), "{}", self.path);
        assert_eq!(
            self.header("authorization"),
            Some("Bearer service-key"),
            "{}",
            self.path
        );
    }
}

/// Canned reply for one request.
struct Canned {
    status: StatusCode,
    body: Value,
    content_range: Option<String>,
}

impl Canned {
    fn json(status: StatusCode, body: Value) -> Self {
        Self {
            status,
            body,
            content_range: None,
        }
    }

    fn ok(body: Value) -> Self {
        Self::json(StatusCode::OK, body)
    }

    fn status(status: StatusCode) -> Self {
        Self::json(status, Value::Null)
    }

    fn with_range(mut self, range: impl Into<String>) -> Self {
        self.content_range = Some(range.into());
        self
    }
}

type Responder = Box<dyn Fn(&Recorded) -> Canned + Send + Sync>;

struct FakeStore {
    requests: Mutex<Vec<Recorded>>,
    respond: Responder,
}

impl FakeStore {
    fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().clone()
    }
}

async fn handle(
    State(store): State<Arc<FakeStore>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Query(query): Query<Vec<(String, String)>>,
    body: Bytes,
) -> Response {
    let recorded = Recorded {
        method,
        path: uri.path().to_string(),
        query,
        headers: headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect(),
        body: if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap_or(Value::Null)
        },
    };

    let canned = (store.respond)(&recorded);
    store.requests.lock().push(recorded);

    let mut response = if canned.body.is_null() {
        canned.status.into_response()
    } else {
        (canned.status, Json(canned.body)).into_response()
    };
    if let Some(range) = canned.content_range {
        response
            .headers_mut()
            .insert(CONTENT_RANGE, HeaderValue::from_str(&range).unwrap());
    }
    response
}

async fn start_store(
    respond: impl Fn(&Recorded) -> Canned + Send + Sync + 'static,
) -> (HostedRepository, Arc<FakeStore>) {
    let store = Arc::new(FakeStore {
        requests: Mutex::new(Vec::new()),
        respond: Box::new(respond),
    });
    let app = Router::new().fallback(handle).with_state(Arc::clone(&store));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let mut config = HostedConfig::with_credentials(format!("http://{}/", addr), SERVICE_KEY);
    config.anon_key = Some(ANON_KEY.to_string());
    config.max_retries = 0;
    let client = Client::builder().no_proxy().build().unwrap();
    (HostedRepository::with_client(config, client), store)
}

fn last_segment(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or_default()
}

// =============================================================================
// Identity
// =============================================================================

#[tokio::test]
async fn test_has_role_posts_rpc_body_and_reads_bool() {
    let (repo, store) = start_store(|req| {
        Canned::ok(Value::Bool(req.body["_role"] == json!("admin")))
    })
    .await;
    let user = UserId::random();

    assert!(repo.has_role(user, Role::Admin).await.unwrap());
    assert!(!repo.has_role(user, Role::Teacher).await.unwrap());

    let requests = store.requests();
    assert_eq!(requests.len(), 2);
    let first = &requests[0];
    assert_eq!(first.method, Method::POST);
    assert_eq!(first.path, "/rest/v1/rpc/has_role");
    assert!(first.query.is_empty());
    first.assert_service_role();
    assert_eq!(
        first.body,
        json!({ "_user_id": user.to_string(), "_role": "admin" })
    );
    assert_eq!(requests[1].body["_role"], json!("teacher"));
}

#[tokio::test]
async fn test_resolve_session_maps_rejections_to_none() {
    let user = UserId::random();
    let (repo, store) = start_store(move |req| {
        match req.header("authorization") {
            Some("Bearer good") => Canned::ok(json!({ "id": user, "email": "t@school.example" })),
            Some("Bearer expired") => Canned::status(StatusCode::UNAUTHORIZED),
            Some("Bearer banned") => Canned::status(StatusCode::FORBIDDEN),
            Some("Bearer gone") => Canned::status(StatusCode::NOT_FOUND),
            _ => Canned::json(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "msg": "auth unavailable" }),
            ),
        }
    })
    .await;

    assert_eq!(repo.resolve_session("good").await.unwrap(), Some(user));
    for token in ["expired", "banned", "gone"] {
        assert_eq!(repo.resolve_session(token).await.unwrap(), None, "{}", token);
    }
    let err = repo.resolve_session("broken").await.unwrap_err();
    assert!(err.to_string().contains("auth unavailable"));

    let requests = store.requests();
    assert_eq!(requests.len(), 5);
    for req in &requests {
        assert_eq!(req.method, Method::GET);
        assert_eq!(req.path, "/auth/v1/user");
        // Caller tokens travel with the public key, never the service key.
        assert_eq!(req.header("apikey"), Some(ANON_KEY));
    }
}

#[tokio::test]
async fn test_find_auth_user_treats_404_as_absent() {
    let known = UserId::random();
    let (repo, store) = start_store(move |req| {
        if req.path == format!("/auth/v1/admin/users/{}", known) {
            Canned::ok(json!({ "id": known, "email": "known@school.example" }))
        } else {
            Canned::json(StatusCode::NOT_FOUND, json!({ "msg": "User not found" }))
        }
    })
    .await;

    let found = repo.find_auth_user(known).await.unwrap().unwrap();
    assert_eq!(found.id, known);
    assert_eq!(found.email.as_deref(), Some("known@school.example"));

    let missing = UserId::random();
    assert!(repo.find_auth_user(missing).await.unwrap().is_none());

    let requests = store.requests();
    assert_eq!(requests[1].path, format!("/auth/v1/admin/users/{}", missing));
    assert_eq!(requests[1].method, Method::GET);
    requests[1].assert_service_role();
}

#[tokio::test]
async fn test_delete_owned_rows_reads_exact_count() {
    let (repo, store) = start_store(|req| match req.path.as_str() {
        "/rest/v1/grades" => Canned::status(StatusCode::NO_CONTENT).with_range("*/3"),
        "/rest/v1/students" => Canned::status(StatusCode::NO_CONTENT).with_range("0-1/2"),
        _ => Canned::status(StatusCode::NO_CONTENT),
    })
    .await;
    let teacher = UserId::random();

    assert_eq!(repo.delete_owned_rows(OwnedTable::Grades, teacher).await.unwrap(), 3);
    assert_eq!(repo.delete_owned_rows(OwnedTable::Students, teacher).await.unwrap(), 2);
    // No Content-Range reads as zero.
    assert_eq!(
        repo.delete_owned_rows(OwnedTable::UserRoles, teacher).await.unwrap(),
        0
    );

    let requests = store.requests();
    let grades = &requests[0];
    assert_eq!(grades.method, Method::DELETE);
    assert_eq!(grades.path, "/rest/v1/grades");
    assert_eq!(
        grades.query,
        vec![("teacher_id".to_string(), format!("eq.{}", teacher))]
    );
    assert!(grades.header("prefer").unwrap().contains("count=exact"));
    grades.assert_service_role();
    assert_eq!(requests[2].param("user_id"), Some(format!("eq.{}", teacher).as_str()));
}

#[tokio::test]
async fn test_teacher_deletion_cascade_requests() {
    let admin = UserId::random();
    let teacher = UserId::random();
    let (repo, store) = start_store(move |req| {
        match (req.method.as_str(), req.path.as_str()) {
            ("GET", "/auth/v1/user") => Canned::ok(json!({ "id": admin })),
            ("POST", "/rest/v1/rpc/has_role") => Canned::ok(json!(true)),
            ("DELETE", "/rest/v1/grades") => {
                Canned::status(StatusCode::NO_CONTENT).with_range("*/4")
            }
            ("DELETE", path) if path.starts_with("/rest/v1/") => {
                Canned::status(StatusCode::NO_CONTENT).with_range("*/1")
            }
            ("DELETE", path) if path.starts_with("/auth/v1/admin/users/") => {
                Canned::ok(json!({}))
            }
            _ => Canned::status(StatusCode::BAD_REQUEST),
        }
    })
    .await;

    let target = teacher.to_string();
    let report = delete_teacher(&repo, Some("admin-token"), Some(&target))
        .await
        .unwrap();
    assert!(report.is_clean());
    assert_eq!(report.rows_deleted(), 4 + 8);

    let requests = store.requests();
    let expected_len = 2 + OwnedTable::DELETION_ORDER.len() + 1;
    assert_eq!(requests.len(), expected_len);

    assert_eq!(requests[0].header("authorization"), Some("Bearer admin-token"));
    assert_eq!(
        requests[1].body,
        json!({ "_user_id": admin.to_string(), "_role": "admin" })
    );

    let table_requests = &requests[2..expected_len - 1];
    for (req, table) in table_requests.iter().zip(OwnedTable::DELETION_ORDER) {
        assert_eq!(req.method, Method::DELETE);
        assert_eq!(req.path, format!("/rest/v1/{}", table.table_name()));
        assert_eq!(
            req.query,
            vec![(table.owner_column().to_string(), format!("eq.{}", teacher))]
        );
        assert!(req.header("prefer").unwrap().contains("count=exact"));
        req.assert_service_role();
    }

    let identity = &requests[expected_len - 1];
    assert_eq!(identity.method, Method::DELETE);
    assert_eq!(identity.path, format!("/auth/v1/admin/users/{}", teacher));
    identity.assert_service_role();
}

// =============================================================================
// Broadcasts
// =============================================================================

#[tokio::test]
async fn test_subscriber_filter_only_for_specific_cohorts() {
    let user = UserId::random();
    let (repo, store) = start_store(move |_| {
        Canned::ok(json!([{ "user_id": user, "status": "trial" }]))
    })
    .await;

    assert_eq!(
        repo.list_subscriber_ids(RecipientFilter::All).await.unwrap(),
        vec![user]
    );
    repo.list_subscriber_ids(RecipientFilter::Trial).await.unwrap();

    let requests = store.requests();
    assert_eq!(requests[0].path, "/rest/v1/subscriptions");
    assert_eq!(
        requests[0].query,
        vec![("select".to_string(), "*".to_string())]
    );
    assert_eq!(requests[1].param("select"), Some("*"));
    assert_eq!(requests[1].param("status"), Some("eq.trial"));
}

#[tokio::test]
async fn test_dispatch_request_sequence() {
    let job = Broadcast::queued(
        "News for {{name}}",
        "<p>Hi {{name}}</p>",
        RecipientFilter::Active,
    );
    let job_row = serde_json::to_value(&job).unwrap();
    let recipients: Vec<UserId> = (0..12).map(|_| UserId::random()).collect();
    let named = recipients[0];
    let subscriber_rows: Vec<Value> = recipients
        .iter()
        .map(|id| json!({ "user_id": id, "status": "active" }))
        .collect();

    let (repo, store) = start_store(move |req| {
        match (req.method.as_str(), req.path.as_str()) {
            ("GET", "/rest/v1/email_broadcasts") => Canned::ok(json!([job_row.clone()])),
            ("GET", "/rest/v1/subscriptions") => Canned::ok(json!(subscriber_rows.clone())),
            ("GET", "/rest/v1/profiles") => {
                if req.param("user_id") == Some(format!("eq.{}", named).as_str()) {
                    Canned::ok(json!([{ "user_id": named, "full_name": "Ahmed" }]))
                } else {
                    Canned::ok(json!([]))
                }
            }
            ("GET", path) if path.starts_with("/auth/v1/admin/users/") => {
                let id = last_segment(path);
                Canned::ok(json!({ "id": id, "email": format!("{}@x.example", id) }))
            }
            ("PATCH", "/rest/v1/email_broadcasts") => Canned::ok(json!([])),
            _ => Canned::status(StatusCode::BAD_REQUEST),
        }
    })
    .await;

    let mailer = LocalMailer::new();
    mailer.fail_for(format!("{}@x.example", recipients[2]));
    let outcome = dispatch_broadcast(&repo, &mailer, &DispatchGuard::new(), job.id)
        .await
        .unwrap();
    assert_eq!(outcome.total_recipients, 12);
    assert_eq!(outcome.sent_count, 11);
    assert_eq!(outcome.failed_count, 1);

    let delivered = mailer.delivered();
    assert!(delivered.iter().all(|m| m.subject == "News for {{name}}"));
    assert_eq!(delivered[0].html, "<p>Hi Ahmed</p>");
    assert_eq!(delivered[1].html, format!("<p>Hi {}</p>", FALLBACK_NAME));

    let requests = store.requests();
    assert_eq!(requests[0].path, "/rest/v1/email_broadcasts");
    assert_eq!(requests[0].param("id"), Some(format!("eq.{}", job.id).as_str()));
    assert_eq!(requests[1].path, "/rest/v1/subscriptions");
    assert_eq!(requests[1].param("status"), Some("eq.active"));

    let patches: Vec<(usize, &Recorded)> = requests
        .iter()
        .enumerate()
        .filter(|(_, req)| req.method == Method::PATCH)
        .collect();
    assert_eq!(patches.len(), 3);
    for (_, req) in &patches {
        assert_eq!(req.path, "/rest/v1/email_broadcasts");
        assert_eq!(
            req.query,
            vec![("id".to_string(), format!("eq.{}", job.id))]
        );
        assert_eq!(req.header("prefer"), Some("return=representation"));
        req.assert_service_role();
    }

    assert_eq!(patches[0].0, 2);
    assert_eq!(
        patches[0].1.body,
        json!({ "status": "sending", "total_recipients": 12 })
    );

    assert_eq!(
        patches[1].1.body,
        json!({ "sent_count": 9, "failed_count": 1 })
    );
    // The checkpoint lands before the 11th recipient is looked up.
    let eleventh = format!("/auth/v1/admin/users/{}", recipients[10]);
    let eleventh_at = requests.iter().position(|req| req.path == eleventh).unwrap();
    assert!(patches[1].0 < eleventh_at);

    let completion = &patches[2].1.body;
    assert_eq!(completion["status"], json!("completed"));
    assert_eq!(completion["sent_count"], json!(11));
    assert_eq!(completion["failed_count"], json!(1));
    let sent_at = completion["sent_at"].as_str().unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(sent_at).is_ok());
    assert_eq!(patches[2].0, requests.len() - 1);
}
