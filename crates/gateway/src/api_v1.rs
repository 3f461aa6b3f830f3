//! HTTP API v1.
//!
//! Endpoints:
//!
//! - `POST   /v1/guides`                       — Generate a study guide
//! - `POST   /v1/chat/sessions`                — Open a tutor session
//! - `GET    /v1/chat/sessions/{id}`           — Session transcript
//! - `POST   /v1/chat/sessions/{id}/messages`  — Send a tutor turn
//! - `GET    /v1/me/role`                      — Caller's role
//! - `POST   /v1/auth/sign-out`                — Drop the caller's cached role
//! - `GET    /v1/notice`                       — Current notice
//! - `PUT    /v1/notice`                       — Post a notice (admin)
//! - `DELETE /v1/notice`                       — Clear the notice (admin)
//! - `POST   /v1/admin/content`                — Collect a content chunk (admin)
//! - `POST   /v1/admin/concepts`               — Add a concept bundle (admin)
//! - `POST   /v1/admin/draft`                  — AI draft text (admin)
//!
//! Callers identify themselves with the `x-user-id` header; verifying that
//! identity is the job of the authentication proxy in front of this service.

use axum::{
    Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use gongbu_config::AppConfig;
use gongbu_core::error::GuideError;
use gongbu_core::message::Message;
use gongbu_core::model::{ConceptContext, UserRole};
use gongbu_core::provider::Provider;
use gongbu_core::store::Store;
use gongbu_guide::{
    ChatSession, CollectReceipt, ContentCollector, ContentSubmission, DraftRequest, GeneratedGuide,
    GuideRequest, Notice, NoticeBoard, NoticeLevel, RoleCache, StudyGuideBuilder,
};

/// Header carrying the authenticated user's id.
pub const USER_ID_HEADER: &str = "x-user-id";

// ── State ─────────────────────────────────────────────────────────────────

struct SessionEntry {
    created_at: chrono::DateTime<chrono::Utc>,
    session: Arc<Mutex<ChatSession>>,
}

/// Shared state for the v1 API.
pub struct ApiV1State {
    pub config: AppConfig,
    pub provider: Arc<dyn Provider>,
    pub store: Arc<dyn Store>,
    pub builder: StudyGuideBuilder,
    pub collector: ContentCollector,
    pub roles: RoleCache,
    pub notice: NoticeBoard,
    sessions: RwLock<HashMap<String, SessionEntry>>,
}

pub type SharedApiState = Arc<ApiV1State>;

impl ApiV1State {
    /// Wire every service from configuration.
    pub fn new(config: AppConfig, provider: Arc<dyn Provider>, store: Arc<dyn Store>) -> Self {
        let builder = StudyGuideBuilder::from_config(provider.clone(), store.clone(), &config);
        let collector = ContentCollector::from_config(store.clone(), provider.clone(), &config);
        let roles = RoleCache::from_config(store.clone(), &config.auth);
        Self {
            config,
            provider,
            store,
            builder,
            collector,
            roles,
            notice: NoticeBoard::new(),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    async fn insert_session(&self, session: ChatSession) -> Arc<Mutex<ChatSession>> {
        let id = session.id().to_string();
        let created_at = session.transcript().created_at;
        let session = Arc::new(Mutex::new(session));

        let mut sessions = self.sessions.write().await;

        // Evict oldest session if at capacity
        if sessions.len() >= self.config.guide.max_sessions.max(1) {
            if let Some(oldest_key) = sessions
                .iter()
                .min_by_key(|(_, s)| s.created_at)
                .map(|(k, _)| k.clone())
            {
                sessions.remove(&oldest_key);
            }
        }

        sessions.insert(
            id,
            SessionEntry {
                created_at,
                session: session.clone(),
            },
        );
        session
    }

    async fn session(&self, id: &str) -> Option<Arc<Mutex<ChatSession>>> {
        self.sessions.read().await.get(id).map(|s| s.session.clone())
    }
}

// ── Router ────────────────────────────────────────────────────────────────

/// Build the v1 API router. Nest this under "/v1" in the main router.
pub fn v1_router(state: SharedApiState) -> Router {
    Router::new()
        .route("/guides", post(create_guide_handler))
        .route("/chat/sessions", post(open_session_handler))
        .route("/chat/sessions/{id}", get(get_session_handler))
        .route("/chat/sessions/{id}/messages", post(send_message_handler))
        .route("/me/role", get(my_role_handler))
        .route("/auth/sign-out", post(sign_out_handler))
        .route(
            "/notice",
            get(get_notice_handler)
                .put(put_notice_handler)
                .delete(delete_notice_handler),
        )
        .route("/admin/content", post(collect_content_handler))
        .route("/admin/concepts", post(add_concept_handler))
        .route("/admin/draft", post(draft_handler))
        .with_state(state)
}

// ── Request / Response types ──────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, code: &str, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
            code: code.into(),
        }),
    )
}

/// Map a classified guide error onto an HTTP status.
fn guide_error(err: GuideError) -> ApiError {
    let status = match &err {
        GuideError::NotFound => StatusCode::NOT_FOUND,
        GuideError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        GuideError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        GuideError::Api(_) => StatusCode::BAD_GATEWAY,
        GuideError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    api_error(status, err.code(), err.to_string())
}

#[derive(Debug, Deserialize)]
struct OpenSessionRequest {
    /// A guide previously returned by `POST /v1/guides`.
    #[serde(default)]
    guide: Option<GeneratedGuide>,
    /// Free-text system instruction when no guide is given.
    #[serde(default)]
    system: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct MessageDto {
    id: String,
    role: String,
    content: String,
    timestamp: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    fallback: bool,
}

impl From<&Message> for MessageDto {
    fn from(m: &Message) -> Self {
        Self {
            id: m.id.clone(),
            role: m.role.as_str().to_string(),
            content: m.content.clone(),
            timestamp: m.timestamp.to_rfc3339(),
            fallback: m.fallback,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionResponse {
    id: String,
    #[serde(default)]
    topic: Option<String>,
    created_at: String,
    updated_at: String,
    /// Turns after the system instruction.
    messages: Vec<MessageDto>,
}

impl SessionResponse {
    fn from_session(session: &ChatSession) -> Self {
        let transcript = session.transcript();
        Self {
            id: session.id().to_string(),
            topic: session.topic().map(str::to_string),
            created_at: transcript.created_at.to_rfc3339(),
            updated_at: transcript.updated_at.to_rfc3339(),
            messages: transcript.turns().iter().map(MessageDto::from).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SendMessageRequest {
    message: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct SendMessageResponse {
    session_id: String,
    reply: MessageDto,
    turns: usize,
}

#[derive(Debug, Serialize, Deserialize)]
struct RoleResponse {
    user_id: String,
    role: UserRole,
}

#[derive(Debug, Serialize, Deserialize)]
struct SignOutResponse {
    signed_out: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct NoticeResponse {
    notice: Option<Notice>,
}

#[derive(Debug, Deserialize)]
struct PostNoticeRequest {
    message: String,
    #[serde(default)]
    level: NoticeLevel,
}

#[derive(Debug, Serialize, Deserialize)]
struct ConceptCreatedResponse {
    id: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct DraftResponse {
    text: String,
}

// ── Caller identity ───────────────────────────────────────────────────────

fn caller_id(headers: &HeaderMap) -> Result<String, ApiError> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            api_error(
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                format!("Missing {USER_ID_HEADER} header"),
            )
        })
}

async fn require_admin(state: &ApiV1State, headers: &HeaderMap) -> Result<String, ApiError> {
    let user_id = caller_id(headers)?;
    if state.roles.role_for(&user_id).await.is_admin() {
        Ok(user_id)
    } else {
        warn!(user = %user_id, "Admin route refused");
        Err(api_error(StatusCode::FORBIDDEN, "forbidden", "Admin role required"))
    }
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn create_guide_handler(
    State(state): State<SharedApiState>,
    Json(payload): Json<GuideRequest>,
) -> Result<Json<GeneratedGuide>, ApiError> {
    info!(subject = %payload.subject, unit = %payload.unit_range, "v1/guides request");
    state.builder.build(&payload).await.map(Json).map_err(guide_error)
}

async fn open_session_handler(
    State(state): State<SharedApiState>,
    Json(payload): Json<OpenSessionRequest>,
) -> (StatusCode, Json<SessionResponse>) {
    let model = state.builder.model().to_string();

    let session = match (&payload.guide, payload.system.as_deref().map(str::trim)) {
        (Some(generated), _) => ChatSession::for_guide(state.provider.clone(), model, generated),
        (None, Some(system)) if !system.is_empty() => ChatSession::new(state.provider.clone(), model, system),
        _ => ChatSession::new(state.provider.clone(), model, gongbu_guide::prompt::DEFAULT_CHAT_PROMPT),
    }
    .with_temperature(state.config.guide.chat_temperature)
    .with_max_tokens(Some(state.config.default_max_tokens));

    let body = SessionResponse::from_session(&session);
    state.insert_session(session).await;
    info!(session = %body.id, topic = ?body.topic, "Opened tutor session");

    (StatusCode::CREATED, Json(body))
}

fn session_not_found(id: &str) -> ApiError {
    api_error(StatusCode::NOT_FOUND, "not_found", format!("No chat session {id}"))
}

async fn get_session_handler(
    State(state): State<SharedApiState>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = state.session(&id).await.ok_or_else(|| session_not_found(&id))?;
    let session = session.lock().await;
    Ok(Json(SessionResponse::from_session(&session)))
}

async fn send_message_handler(
    State(state): State<SharedApiState>,
    Path(id): Path<String>,
    Json(payload): Json<SendMessageRequest>,
) -> Result<Json<SendMessageResponse>, ApiError> {
    let session = state.session(&id).await.ok_or_else(|| session_not_found(&id))?;
    // Turns within one session are serialized; other sessions proceed.
    let mut session = session.lock().await;

    let reply = session.send(&payload.message).await.map_err(guide_error)?;
    Ok(Json(SendMessageResponse {
        session_id: id,
        reply: MessageDto::from(&reply),
        turns: session.transcript().turns().len(),
    }))
}

async fn my_role_handler(
    State(state): State<SharedApiState>,
    headers: HeaderMap,
) -> Result<Json<RoleResponse>, ApiError> {
    let user_id = caller_id(&headers)?;
    let role = state.roles.role_for(&user_id).await;
    Ok(Json(RoleResponse { user_id, role }))
}

async fn sign_out_handler(
    State(state): State<SharedApiState>,
    headers: HeaderMap,
) -> Result<Json<SignOutResponse>, ApiError> {
    let user_id = caller_id(&headers)?;
    let signed_out = state.roles.invalidate(&user_id).await;
    info!(user = %user_id, "Signed out");
    Ok(Json(SignOutResponse { signed_out }))
}

async fn get_notice_handler(State(state): State<SharedApiState>) -> Json<NoticeResponse> {
    Json(NoticeResponse {
        notice: state.notice.current().await,
    })
}

async fn put_notice_handler(
    State(state): State<SharedApiState>,
    headers: HeaderMap,
    Json(payload): Json<PostNoticeRequest>,
) -> Result<Json<Notice>, ApiError> {
    let admin = require_admin(&state, &headers).await?;
    state
        .notice
        .post(&payload.message, payload.level, &admin)
        .await
        .map(Json)
        .map_err(guide_error)
}

async fn delete_notice_handler(
    State(state): State<SharedApiState>,
    headers: HeaderMap,
) -> Result<Json<NoticeResponse>, ApiError> {
    require_admin(&state, &headers).await?;
    Ok(Json(NoticeResponse {
        notice: state.notice.clear().await,
    }))
}

async fn collect_content_handler(
    State(state): State<SharedApiState>,
    headers: HeaderMap,
    Json(payload): Json<ContentSubmission>,
) -> Result<(StatusCode, Json<CollectReceipt>), ApiError> {
    require_admin(&state, &headers).await?;
    let receipt = state.collector.collect(payload).await.map_err(guide_error)?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

async fn add_concept_handler(
    State(state): State<SharedApiState>,
    headers: HeaderMap,
    Json(payload): Json<ConceptContext>,
) -> Result<(StatusCode, Json<ConceptCreatedResponse>), ApiError> {
    require_admin(&state, &headers).await?;
    let id = state.collector.add_concept(payload).await.map_err(guide_error)?;
    Ok((StatusCode::CREATED, Json(ConceptCreatedResponse { id })))
}

async fn draft_handler(
    State(state): State<SharedApiState>,
    headers: HeaderMap,
    Json(payload): Json<DraftRequest>,
) -> Result<Json<DraftResponse>, ApiError> {
    require_admin(&state, &headers).await?;
    let text = state.collector.draft(&payload).await.map_err(guide_error)?;
    Ok(Json(DraftResponse { text }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use gongbu_core::error::ProviderError;
    use gongbu_core::model::{AppearanceLogic, Concept, EducationLevel, Importance, Profile};
    use gongbu_core::provider::{ProviderRequest, ProviderResponse, Usage};
    use gongbu_store::InMemoryStore;

    const GUIDE_JSON: &str = r#"{"isValid": true, "unitTitle": "세포와 생명", "summary": "모든 생물은 세포로 이루어진다."}"#;

    /// Lightweight mock provider for gateway tests.
    struct MockProvider {
        outcome: Result<String, ProviderError>,
    }

    impl MockProvider {
        fn new(text: &str) -> Self {
            Self {
                outcome: Ok(text.to_string()),
            }
        }

        fn failing(err: ProviderError) -> Self {
            Self { outcome: Err(err) }
        }
    }

    #[async_trait::async_trait]
    impl Provider for MockProvider {
        fn name(&self) -> &str {
            "gateway_mock"
        }

        async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            let text = self.outcome.clone()?;
            Ok(ProviderResponse {
                message: Message::assistant(text),
                usage: Some(Usage {
                    prompt_tokens: 10,
                    completion_tokens: 5,
                    total_tokens: 15,
                }),
                model: "mock-model".into(),
            })
        }
    }

    fn state_with(provider: MockProvider) -> (SharedApiState, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        let state = Arc::new(ApiV1State::new(AppConfig::default(), Arc::new(provider), store.clone()));
        (state, store)
    }

    async fn seed_concept(store: &InMemoryStore) {
        let mut context = ConceptContext::new(Concept {
            id: String::new(),
            subject: "과학".into(),
            title: "세포".into(),
            description: "생물을 이루는 기본 단위".into(),
            importance: Importance::A,
            education_level: EducationLevel::Middle,
            formula: None,
            key_terms: vec![],
        });
        context.logic = Some(AppearanceLogic {
            concept_id: String::new(),
            condition_context: "세포 소기관 비교".into(),
            reasoning_required: "구조와 기능 연결".into(),
            question_type: "객관식".into(),
            frequency_weight: 4,
            test_frequency: None,
        });
        store.insert_concept(context).await.unwrap();
    }

    async fn with_admin(store: &InMemoryStore) {
        store
            .upsert_profile(Profile {
                user_id: "admin-1".into(),
                display_name: "관리자".into(),
                role: UserRole::Admin,
            })
            .await
            .unwrap();
    }

    fn json_request(method: &str, uri: &str, user: Option<&str>, body: serde_json::Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(user) = user {
            builder = builder.header(USER_ID_HEADER, user);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get_request(uri: &str, user: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(user) = user {
            builder = builder.header(USER_ID_HEADER, user);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    fn guide_body() -> serde_json::Value {
        serde_json::json!({
            "subject": "과학",
            "school_level": "middle",
            "grade": "1",
            "unit_range": "생물의 구성"
        })
    }

    #[tokio::test]
    async fn generate_guide() {
        let (state, store) = state_with(MockProvider::new(GUIDE_JSON));
        seed_concept(&store).await;
        let response = v1_router(state)
            .oneshot(json_request("POST", "/guides", None, guide_body()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let generated: GeneratedGuide = body_json(response).await;
        assert!(generated.guide.is_valid);
        assert_eq!(generated.guide.unit_title, "세포와 생명");
        assert!(generated.grounded);
        assert_eq!(generated.sources, vec!["세포".to_string()]);
    }

    #[tokio::test]
    async fn selection_without_concepts_is_404() {
        let (state, _) = state_with(MockProvider::new(GUIDE_JSON));
        let response = v1_router(state)
            .oneshot(json_request("POST", "/guides", None, guide_body()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let err: ErrorResponse = body_json(response).await;
        assert_eq!(err.code, "not_found");
    }

    #[tokio::test]
    async fn invalid_selection_is_404_not_found() {
        let (state, store) = state_with(MockProvider::new(r#"{"isValid": false}"#));
        seed_concept(&store).await;
        let response = v1_router(state)
            .oneshot(json_request("POST", "/guides", None, guide_body()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let err: ErrorResponse = body_json(response).await;
        assert_eq!(err.code, "not_found");
    }

    #[tokio::test]
    async fn rate_limit_is_429() {
        let (state, store) = state_with(MockProvider::failing(ProviderError::RateLimited { retry_after_secs: 5 }));
        seed_concept(&store).await;
        let response = v1_router(state)
            .oneshot(json_request("POST", "/guides", None, guide_body()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let err: ErrorResponse = body_json(response).await;
        assert_eq!(err.code, "rate_limit_exceeded");
    }

    #[tokio::test]
    async fn blank_grade_is_400() {
        let (state, _) = state_with(MockProvider::new(GUIDE_JSON));
        let mut body = guide_body();
        body["grade"] = serde_json::json!(" ");
        let response = v1_router(state)
            .oneshot(json_request("POST", "/guides", None, body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn chat_session_round_trip() {
        let (state, _) = state_with(MockProvider::new("세포막은 물질 출입을 조절해요."));

        let response = v1_router(state.clone())
            .oneshot(json_request("POST", "/chat/sessions", None, serde_json::json!({"system": "과학 선생님"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let opened: SessionResponse = body_json(response).await;
        assert!(opened.messages.is_empty());

        let uri = format!("/chat/sessions/{}/messages", opened.id);
        let response = v1_router(state.clone())
            .oneshot(json_request("POST", &uri, None, serde_json::json!({"message": "세포막이 뭐예요?"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let sent: SendMessageResponse = body_json(response).await;
        assert_eq!(sent.reply.role, "assistant");
        assert_eq!(sent.turns, 2);

        let response = v1_router(state)
            .oneshot(get_request(&format!("/chat/sessions/{}", opened.id), None))
            .await
            .unwrap();
        let detail: SessionResponse = body_json(response).await;
        assert_eq!(detail.messages.len(), 2);
        assert_eq!(detail.messages[0].role, "user");
    }

    #[tokio::test]
    async fn failed_turn_keeps_fallback_in_transcript() {
        let (state, _) = state_with(MockProvider::failing(ProviderError::Network("down".into())));
        let response = v1_router(state.clone())
            .oneshot(json_request("POST", "/chat/sessions", None, serde_json::json!({})))
            .await
            .unwrap();
        let opened: SessionResponse = body_json(response).await;

        let uri = format!("/chat/sessions/{}/messages", opened.id);
        let response = v1_router(state.clone())
            .oneshot(json_request("POST", &uri, None, serde_json::json!({"message": "질문"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let response = v1_router(state)
            .oneshot(get_request(&format!("/chat/sessions/{}", opened.id), None))
            .await
            .unwrap();
        let detail: SessionResponse = body_json(response).await;
        assert_eq!(detail.messages.len(), 2);
        assert!(detail.messages[1].fallback);
    }

    #[tokio::test]
    async fn session_from_guide_has_topic() {
        let (state, store) = state_with(MockProvider::new(GUIDE_JSON));
        seed_concept(&store).await;
        let response = v1_router(state.clone())
            .oneshot(json_request("POST", "/guides", None, guide_body()))
            .await
            .unwrap();
        let generated: GeneratedGuide = body_json(response).await;

        let response = v1_router(state)
            .oneshot(json_request(
                "POST",
                "/chat/sessions",
                None,
                serde_json::json!({ "guide": generated }),
            ))
            .await
            .unwrap();
        let opened: SessionResponse = body_json(response).await;
        assert_eq!(opened.topic.as_deref(), Some("세포와 생명"));
    }

    #[tokio::test]
    async fn unknown_session_is_404() {
        let (state, _) = state_with(MockProvider::new("x"));
        let response = v1_router(state)
            .oneshot(get_request("/chat/sessions/nonexistent", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn oldest_session_is_evicted_at_capacity() {
        let store = Arc::new(InMemoryStore::new());
        let mut config = AppConfig::default();
        config.guide.max_sessions = 2;
        let state = Arc::new(ApiV1State::new(config, Arc::new(MockProvider::new("x")), store));

        let mut ids = Vec::new();
        for _ in 0..3 {
            let response = v1_router(state.clone())
                .oneshot(json_request("POST", "/chat/sessions", None, serde_json::json!({})))
                .await
                .unwrap();
            let opened: SessionResponse = body_json(response).await;
            ids.push(opened.id);
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }
        assert_eq!(state.session_count().await, 2);

        let response = v1_router(state)
            .oneshot(get_request(&format!("/chat/sessions/{}", ids[0]), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn role_requires_user_header() {
        let (state, store) = state_with(MockProvider::new("x"));
        with_admin(&store).await;

        let response = v1_router(state.clone()).oneshot(get_request("/me/role", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = v1_router(state.clone())
            .oneshot(get_request("/me/role", Some("admin-1")))
            .await
            .unwrap();
        let role: RoleResponse = body_json(response).await;
        assert_eq!(role.role, UserRole::Admin);

        let response = v1_router(state)
            .oneshot(get_request("/me/role", Some("student-9")))
            .await
            .unwrap();
        let role: RoleResponse = body_json(response).await;
        assert_eq!(role.role, UserRole::Student);
    }

    #[tokio::test]
    async fn sign_out_drops_cached_role() {
        let (state, store) = state_with(MockProvider::new("x"));
        with_admin(&store).await;
        v1_router(state.clone())
            .oneshot(get_request("/me/role", Some("admin-1")))
            .await
            .unwrap();
        assert_eq!(state.roles.cached("admin-1").await, Some(UserRole::Admin));

        let response = v1_router(state.clone())
            .oneshot(json_request("POST", "/auth/sign-out", Some("admin-1"), serde_json::json!({})))
            .await
            .unwrap();
        let out: SignOutResponse = body_json(response).await;
        assert!(out.signed_out);
        assert_eq!(state.roles.cached("admin-1").await, None);
    }

    #[tokio::test]
    async fn notice_writes_need_admin() {
        let (state, store) = state_with(MockProvider::new("x"));
        with_admin(&store).await;
        let body = serde_json::json!({"message": "시험 기간 운영 안내", "level": "warning"});

        let response = v1_router(state.clone())
            .oneshot(json_request("PUT", "/notice", Some("student-1"), body.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = v1_router(state.clone())
            .oneshot(json_request("PUT", "/notice", Some("admin-1"), body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = v1_router(state.clone()).oneshot(get_request("/notice", None)).await.unwrap();
        let shown: NoticeResponse = body_json(response).await;
        let notice = shown.notice.unwrap();
        assert_eq!(notice.level, NoticeLevel::Warning);
        assert_eq!(notice.posted_by, "admin-1");

        let request = Request::builder()
            .method("DELETE")
            .uri("/notice")
            .header(USER_ID_HEADER, "admin-1")
            .body(Body::empty())
            .unwrap();
        let response = v1_router(state.clone()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(state.notice.current().await.is_none());
    }

    #[tokio::test]
    async fn admin_content_reuses_textbook() {
        let (state, store) = state_with(MockProvider::new("x"));
        with_admin(&store).await;
        let submission = serde_json::json!({
            "publisher": "동아출판",
            "school_level": "high",
            "grade": "2",
            "subject": "화학",
            "unit_number": 1,
            "unit_title": "화학 결합",
            "content_type": "본문",
            "title": "이온 결합",
            "body": "양이온과 음이온 사이의 정전기적 인력"
        });

        let response = v1_router(state.clone())
            .oneshot(json_request("POST", "/admin/content", Some("admin-1"), submission.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let first: CollectReceipt = body_json(response).await;
        assert!(first.textbook_created);

        let response = v1_router(state)
            .oneshot(json_request("POST", "/admin/content", Some("admin-1"), submission))
            .await
            .unwrap();
        let second: CollectReceipt = body_json(response).await;
        assert_eq!(first.textbook_id, second.textbook_id);
        assert!(!second.textbook_created);
        assert_eq!(store.textbook_count().await, 1);
    }

    #[tokio::test]
    async fn admin_concept_weight_is_validated() {
        let (state, store) = state_with(MockProvider::new("x"));
        with_admin(&store).await;
        let mut concept = serde_json::json!({
            "concept": {
                "id": "",
                "subject": "과학",
                "title": "밀도",
                "description": "단위 부피당 질량",
                "importance": "A",
                "education_level": "middle",
                "formula": "ρ = m / V"
            },
            "logic": {
                "concept_id": "",
                "condition_context": "물체가 뜨고 가라앉는 실험",
                "reasoning_required": "밀도 비교",
                "question_type": "계산",
                "frequency_weight": 7
            }
        });

        let response = v1_router(state.clone())
            .oneshot(json_request("POST", "/admin/concepts", Some("admin-1"), concept.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        concept["logic"]["frequency_weight"] = serde_json::json!(5);
        let response = v1_router(state)
            .oneshot(json_request("POST", "/admin/concepts", Some("admin-1"), concept))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created: ConceptCreatedResponse = body_json(response).await;
        assert!(!created.id.is_empty());
    }

    #[tokio::test]
    async fn admin_draft() {
        let (state, store) = state_with(MockProvider::new("이온 결합은 금속과 비금속 사이에서..."));
        with_admin(&store).await;
        let request = serde_json::json!({
            "subject": "화학",
            "school_level": "high",
            "grade": "2",
            "unit_number": 1,
            "unit_title": "화학 결합",
            "content_type": "본문"
        });

        let response = v1_router(state.clone())
            .oneshot(json_request("POST", "/admin/draft", None, request.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = v1_router(state)
            .oneshot(json_request("POST", "/admin/draft", Some("admin-1"), request))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let draft: DraftResponse = body_json(response).await;
        assert!(draft.text.starts_with("이온 결합"));
    }
}
