//!
//! EasyPrep HTTP server
//! --------------------
//! This module defines the Axum-based HTTP API for EasyPrep.
//!
//! Responsibilities:
//! - Session management with a simple cookie + CSRF token model.
//! - Login/signup/logout endpoints backed by the `users` store.
//! - Company posting endpoints delegating to the `storage` module, with
//!   role-scoped access decided by the `identity` guard.
//! - Eligibility list extraction and membership checks for postings.
//! - Static serving of uploaded spreadsheets from the uploads folder.

use std::{collections::HashMap, net::SocketAddr, sync::Arc};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::Engine;
use getrandom::getrandom;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::RwLock;
use tracing::{error, info};

use crate::departments;
use crate::eligibility::{extract_register_column, normalize};
use crate::error::AppError;
use crate::identity::{authorize, Decision, Identity, Role, SessionState};
use crate::storage::{NewCompany, SharedStore};
use crate::users::UserStore;

const SESSION_COOKIE: &str = "easyprep_session";

/// Shared server state injected into all handlers.
///
/// Holds the posting store, the credential-backed user store, and the
/// session/CSRF token maps keyed by session id.
#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub users: Arc<UserStore>,
    pub db_root: String,
    /// Session id -> authenticated identity mapping
    pub sessions: Arc<RwLock<HashMap<String, Identity>>>,
    /// Session id -> CSRF token mapping
    pub csrf_tokens: Arc<RwLock<HashMap<String, String>>>,
}

fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookie = headers.get("cookie").or_else(|| headers.get("Cookie"))?;
    let s = cookie.to_str().ok()?;
    for part in s.split(';') {
        let p = part.trim();
        if let Some(eq) = p.find('=') {
            let (k, v) = p.split_at(eq);
            if k == name { return Some(v[1..].to_string()); }
        }
    }
    None
}

fn get_sid_from_headers(headers: &HeaderMap) -> Option<String> {
    parse_cookie(headers, SESSION_COOKIE)
}

async fn get_identity_from_headers(state: &AppState, headers: &HeaderMap) -> Option<Identity> {
    let sid = get_sid_from_headers(headers)?;
    let map = state.sessions.read().await;
    map.get(&sid).cloned()
}

async fn validate_csrf(state: &AppState, headers: &HeaderMap) -> bool {
    let Some(sid) = get_sid_from_headers(headers) else { return false; };
    let Some(provided) = headers.get("x-csrf-token").and_then(|v| v.to_str().ok()).map(|s| s.to_string()) else { return false; };
    let cmap = state.csrf_tokens.read().await;
    match cmap.get(&sid) {
        Some(expected) => expected == &provided,
        None => false,
    }
}

fn gen_token() -> String {
    // 256-bit random token, base64url without padding
    let mut bytes = [0u8; 32];
    let _ = getrandom(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

fn set_session_cookie(sid: &str) -> HeaderValue {
    // Secure, HttpOnly cookie scoped to path / with SameSite=Strict
    HeaderValue::from_str(&format!("{}={}; HttpOnly; Secure; SameSite=Strict; Path=/", SESSION_COOKIE, sid)).unwrap()
}

fn clear_session_cookie() -> HeaderValue {
    HeaderValue::from_str(&format!("{}=deleted; Expires=Thu, 01 Jan 1970 00:00:00 GMT; HttpOnly; Secure; SameSite=Strict; Path=/", SESSION_COOKIE)).unwrap()
}

/// Session state as seen by this request: Authenticated when the cookie maps
/// to a live session, Unauthenticated otherwise.
fn request_state(identity: Option<Identity>) -> SessionState {
    match identity {
        Some(identity) => SessionState::Authenticated(identity),
        None => SessionState::Unauthenticated,
    }
}

/// Evaluate the guard for an area open to any of `allowed` roles.
fn guard(state: &SessionState, allowed: &[Role]) -> Decision {
    for role in allowed {
        if authorize(state, *role) == Decision::Allow {
            return Decision::Allow;
        }
    }
    authorize(state, allowed[0])
}

/// Map a non-Allow guard decision to its HTTP response. The SPA performs the
/// actual navigation using the `redirect` field.
fn decision_response(decision: Decision) -> (StatusCode, Json<serde_json::Value>) {
    match decision {
        Decision::RedirectToSignIn => (
            StatusCode::UNAUTHORIZED,
            Json(json!({"status":"unauthorized","redirect": decision.redirect_path()})),
        ),
        Decision::RedirectToRoleHome(_) => (
            StatusCode::FORBIDDEN,
            Json(json!({"status":"forbidden","redirect": decision.redirect_path()})),
        ),
        // Pending never arises server-side; sign-in resolves within the
        // login request. Treat it as unauthorized if it ever does.
        Decision::Pending => (
            StatusCode::UNAUTHORIZED,
            Json(json!({"status":"unauthorized"})),
        ),
        Decision::Allow => (StatusCode::OK, Json(json!({"status":"ok"}))),
    }
}

fn error_response(e: &AppError) -> (StatusCode, Json<serde_json::Value>) {
    let status = StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(json!({"status":"error","code": e.code_str(), "error": e.message()})))
}

/// Start the EasyPrep HTTP server bound to the given port.
///
/// Ensures the data root and default admin exist, then mounts all routes.
pub async fn run_with_port(http_port: u16, db_root: &str) -> anyhow::Result<()> {
    info!(
        target: "startup",
        "easyprep starting: db_root='{}', db_root_exists={}",
        db_root,
        std::path::Path::new(db_root).exists()
    );

    let store = SharedStore::new(db_root)?;
    let users = Arc::new(UserStore::new(db_root));
    users.ensure_default_admin()?;

    let app_state = AppState {
        store,
        users,
        db_root: db_root.to_string(),
        sessions: Arc::new(RwLock::new(HashMap::new())),
        csrf_tokens: Arc::new(RwLock::new(HashMap::new())),
    };

    let app = router(app_state);

    let addr: SocketAddr = format!("0.0.0.0:{}", http_port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Convenience entry point using the default port (7878) and data root "data".
pub async fn run() -> anyhow::Result<()> {
    run_with_port(7878, "data").await
}

pub fn router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "easyprep ok" }))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/csrf", get(get_csrf))
        .route("/api/auth/me", get(me))
        .route("/api/auth/signup/student", post(signup_student))
        .route("/api/auth/signup/moderator", post(signup_moderator))
        .route("/api/companies", get(list_companies).post(create_company))
        .route("/api/companies/{id}", get(get_company).delete(delete_company))
        .route("/api/companies/{id}/eligibility", post(set_eligibility))
        .route("/api/companies/{id}/eligibility/{register_no}", get(check_eligibility))
        .route("/uploads/{filename}", get(serve_upload))
        .with_state(app_state)
}

#[derive(Debug, Deserialize)]
struct LoginPayload { username: String, password: String }

#[derive(Debug, Deserialize)]
struct SignupPayload {
    email: String,
    name: String,
    password: String,
    #[serde(default)]
    department: Option<String>,
    #[serde(default)]
    program: Option<String>,
    #[serde(default)]
    register_no: Option<String>,
}

/// Issue a session + CSRF token for the identity and build the login response.
async fn issue_session(state: &AppState, identity: Identity) -> (StatusCode, HeaderMap, Json<serde_json::Value>) {
    let sid = gen_token();
    let csrf = gen_token();
    {
        let mut map = state.sessions.write().await;
        map.insert(sid.clone(), identity.clone());
    }
    {
        let mut cmap = state.csrf_tokens.write().await;
        cmap.insert(sid.clone(), csrf.clone());
    }
    let mut headers = HeaderMap::new();
    headers.insert("Set-Cookie", set_session_cookie(&sid));
    let home = identity.role.home();
    (
        StatusCode::OK,
        headers,
        Json(json!({"status":"ok","identity": identity, "home": home})),
    )
}

async fn login(State(state): State<AppState>, Json(payload): Json<LoginPayload>) -> impl IntoResponse {
    match state.users.authenticate(&payload.username, &payload.password) {
        Ok(Some(identity)) => {
            info!(user = %identity.id, role = identity.role.as_str(), "login ok");
            issue_session(&state, identity).await
        }
        Ok(None) => (
            StatusCode::UNAUTHORIZED,
            HeaderMap::new(),
            Json(json!({"status":"unauthorized","code":"invalid_credentials"})),
        ),
        Err(e) => {
            error!("login error: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, HeaderMap::new(), Json(json!({"status":"error","error": e.to_string()})))
        }
    }
}

async fn signup(state: AppState, payload: SignupPayload, role: Role) -> (StatusCode, HeaderMap, Json<serde_json::Value>) {
    let identity = Identity {
        id: uuid::Uuid::new_v4().to_string(),
        email: payload.email,
        name: payload.name,
        department: payload.department,
        program: payload.program,
        register_no: payload.register_no,
        role,
    };
    match state.users.add_user(identity, &payload.password) {
        Ok(identity) => {
            info!(user = %identity.id, role = identity.role.as_str(), "signup ok");
            issue_session(&state, identity).await
        }
        Err(e) => {
            let app: AppError = e.into();
            let (status, body) = error_response(&app);
            (status, HeaderMap::new(), body)
        }
    }
}

async fn signup_student(State(state): State<AppState>, Json(payload): Json<SignupPayload>) -> impl IntoResponse {
    signup(state, payload, Role::Student).await
}

async fn signup_moderator(State(state): State<AppState>, Json(payload): Json<SignupPayload>) -> impl IntoResponse {
    signup(state, payload, Role::Coordinator).await
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    // Require CSRF token
    if !validate_csrf(&state, &headers).await {
        return (StatusCode::FORBIDDEN, HeaderMap::new(), Json(json!({"status":"forbidden","error":"invalid csrf"})));
    }
    if let Some(sid) = get_sid_from_headers(&headers) {
        let mut map = state.sessions.write().await;
        map.remove(&sid);
        let mut cmap = state.csrf_tokens.write().await;
        cmap.remove(&sid);
    }
    let mut h = HeaderMap::new();
    h.insert("Set-Cookie", clear_session_cookie());
    (StatusCode::OK, h, Json(json!({"status":"ok"})))
}

async fn get_csrf(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    // Must be logged in to fetch CSRF token
    let Some(_identity) = get_identity_from_headers(&state, &headers).await else {
        return (StatusCode::UNAUTHORIZED, Json(json!({"status":"unauthorized"})));
    };
    let Some(sid) = get_sid_from_headers(&headers) else {
        return (StatusCode::UNAUTHORIZED, Json(json!({"status":"unauthorized"})));
    };
    let cmap = state.csrf_tokens.read().await;
    if let Some(token) = cmap.get(&sid) {
        return (StatusCode::OK, Json(json!({"status":"ok","csrf": token})));
    }
    (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"status":"error","error":"csrf not available"})))
}

async fn me(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    match get_identity_from_headers(&state, &headers).await {
        Some(identity) => (StatusCode::OK, Json(json!({"status":"ok","identity": identity}))),
        None => (StatusCode::UNAUTHORIZED, Json(json!({"status":"unauthorized"}))),
    }
}

async fn list_companies(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let req_state = request_state(get_identity_from_headers(&state, &headers).await);
    let d = guard(&req_state, &[Role::Student, Role::Coordinator, Role::Admin]);
    if d != Decision::Allow {
        return decision_response(d);
    }
    let guard_store = state.store.0.lock();
    match guard_store.list_companies() {
        Ok(companies) => (StatusCode::OK, Json(json!({"status":"ok","companies": companies}))),
        Err(e) => {
            error!("list companies failed: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"status":"error","error": e.to_string()})))
        }
    }
}

async fn get_company(State(state): State<AppState>, headers: HeaderMap, Path(id): Path<String>) -> impl IntoResponse {
    let req_state = request_state(get_identity_from_headers(&state, &headers).await);
    let d = guard(&req_state, &[Role::Student, Role::Coordinator, Role::Admin]);
    if d != Decision::Allow {
        return decision_response(d);
    }
    let guard_store = state.store.0.lock();
    match guard_store.get_company(&id) {
        Ok(company) => (StatusCode::OK, Json(json!({"status":"ok","company": company}))),
        Err(e) => error_response(&e),
    }
}

async fn create_company(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<NewCompany>,
) -> impl IntoResponse {
    let identity = get_identity_from_headers(&state, &headers).await;
    let req_state = request_state(identity.clone());
    let d = guard(&req_state, &[Role::Coordinator, Role::Admin]);
    if d != Decision::Allow {
        return decision_response(d);
    }
    if !validate_csrf(&state, &headers).await {
        return (StatusCode::FORBIDDEN, Json(json!({"status":"forbidden","error":"invalid csrf"})));
    }
    // Coordinators may only open postings to departments they manage.
    if let Some(identity) = &identity {
        if identity.role == Role::Coordinator {
            let home = identity.department.as_deref().unwrap_or("");
            for dept in &payload.eligible_departments {
                if !departments::can_manage(home, dept) {
                    return (
                        StatusCode::FORBIDDEN,
                        Json(json!({"status":"forbidden","error": format!("department not manageable: {}", dept)})),
                    );
                }
            }
        }
    }
    let guard_store = state.store.0.lock();
    match guard_store.add_company(payload) {
        Ok(company) => (StatusCode::OK, Json(json!({"status":"ok","company": company}))),
        Err(e) => {
            error!("create company failed: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"status":"error","error": e.to_string()})))
        }
    }
}

async fn delete_company(State(state): State<AppState>, headers: HeaderMap, Path(id): Path<String>) -> impl IntoResponse {
    let req_state = request_state(get_identity_from_headers(&state, &headers).await);
    let d = guard(&req_state, &[Role::Admin]);
    if d != Decision::Allow {
        return decision_response(d);
    }
    if !validate_csrf(&state, &headers).await {
        return (StatusCode::FORBIDDEN, Json(json!({"status":"forbidden","error":"invalid csrf"})));
    }
    let guard_store = state.store.0.lock();
    match guard_store.delete_company(&id) {
        Ok(()) => (StatusCode::OK, Json(json!({"status":"ok"}))),
        Err(e) => error_response(&e),
    }
}

#[derive(Debug, Deserialize)]
struct EligibilityPayload {
    /// Decoded sheet: row-major cells, first row is the header.
    rows: Vec<Vec<String>>,
}

async fn set_eligibility(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(payload): Json<EligibilityPayload>,
) -> impl IntoResponse {
    let req_state = request_state(get_identity_from_headers(&state, &headers).await);
    let d = guard(&req_state, &[Role::Coordinator, Role::Admin]);
    if d != Decision::Allow {
        return decision_response(d);
    }
    if !validate_csrf(&state, &headers).await {
        return (StatusCode::FORBIDDEN, Json(json!({"status":"forbidden","error":"invalid csrf"})));
    }
    // Extraction is all-or-nothing: either a complete list is attached or
    // the caller gets the specific reason so they can fix the sheet.
    let list = match extract_register_column(&payload.rows) {
        Ok(list) => list,
        Err(e) => return error_response(&e.into()),
    };
    let guard_store = state.store.0.lock();
    match guard_store.set_eligibility(&id, list) {
        Ok(company) => {
            let unique = company.eligibility.as_ref().map(|l| l.unique_count()).unwrap_or(0);
            (StatusCode::OK, Json(json!({"status":"ok","company": company, "unique_count": unique})))
        }
        Err(e) => error_response(&e),
    }
}

async fn check_eligibility(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((id, register_no)): Path<(String, String)>,
) -> impl IntoResponse {
    let req_state = request_state(get_identity_from_headers(&state, &headers).await);
    let d = guard(&req_state, &[Role::Student, Role::Coordinator, Role::Admin]);
    if d != Decision::Allow {
        return decision_response(d);
    }
    let company = {
        let guard_store = state.store.0.lock();
        guard_store.get_company(&id)
    };
    match company {
        Ok(company) => match &company.eligibility {
            Some(list) => (
                StatusCode::OK,
                Json(json!({
                    "status":"ok",
                    "register_no": normalize(&register_no),
                    "eligible": list.is_eligible(&register_no),
                })),
            ),
            None => error_response(&AppError::not_found("eligibility_not_set", "no eligibility list attached to this posting")),
        },
        Err(e) => error_response(&e),
    }
}

async fn serve_upload(State(state): State<AppState>, Path(filename): Path<String>) -> impl IntoResponse {
    let bytes = {
        let guard_store = state.store.0.lock();
        guard_store.read_upload(&filename)
    };
    match bytes {
        Ok(bytes) => {
            let mut headers = HeaderMap::new();
            headers.insert("content-type", HeaderValue::from_static("application/octet-stream"));
            (StatusCode::OK, headers, bytes).into_response()
        }
        Err(e) => error_response(&e).into_response(),
    }
}
