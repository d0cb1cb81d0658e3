use crate::admin::WordAdmin;
use crate::auth::{Identity, IssuedSession, SessionUser};
use crate::error::{AppError, SERVER_ERROR_MESSAGE};
use crate::lookup::{LookupOutcome, Resolver, Translation};
use crate::store::{Store, StoreError, WordPair};
use askama::Template;
use axum::{
    Form, Json, Router,
    async_trait,
    extract::{FromRequestParts, Path, Query, State},
    http::{HeaderMap, StatusCode, header, request::Parts},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use cookie::{Cookie, SameSite};
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Deserialize;
use serde_json::json;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::compression::CompressionLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{error, info};

type SharedState = Arc<AppState>;

pub const SESSION_COOKIE: &str = "kelime_sid";
const EMPTY_QUERY_MESSAGE: &str = "Lütfen bir kelime gir.";
const NOT_IN_DICTIONARY_MESSAGE: &str = "Bu kelime veritabanında yok.";
const DID_YOU_MEAN_MESSAGE: &str = "Bunu mu demek istedin:";

pub struct AppState {
    pub resolver: Resolver<Store>,
    pub admin: WordAdmin,
    pub identity: Identity,
    pub theme: WebTheme,
    /// `Secure` is set on the session cookie when this is an `https` URL.
    pub base_url: String,
}

impl AppState {
    pub fn new(store: Store, theme: WebTheme, base_url: String, session_ttl: Duration) -> Self {
        Self {
            resolver: Resolver::new(store.clone()),
            admin: WordAdmin::new(store.clone()),
            identity: Identity::new(store).with_session_ttl(session_ttl),
            theme,
            base_url,
        }
    }

    fn secure_cookies(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub enum WebTheme {
    #[default]
    Tailwind,
    Bootstrap,
}

impl fmt::Display for WebTheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WebTheme::Tailwind => write!(f, "tailwind"),
            WebTheme::Bootstrap => write!(f, "bootstrap"),
        }
    }
}

impl FromStr for WebTheme {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "tailwind" => Ok(WebTheme::Tailwind),
            "bootstrap" => Ok(WebTheme::Bootstrap),
            other => Err(format!("unknown theme {other:?}")),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Chrome {
    use_tailwind: bool,
    use_bootstrap: bool,
    body_class: &'static str,
    main_class: &'static str,
    card_class: &'static str,
    eyebrow_class: &'static str,
    headline_class: &'static str,
    lede_class: &'static str,
    input_class: &'static str,
    button_class: &'static str,
    alert_class: &'static str,
    table_row_class: &'static str,
}

impl Chrome {
    fn new(theme: WebTheme) -> Self {
        match theme {
            WebTheme::Tailwind => Self {
                use_tailwind: true,
                use_bootstrap: false,
                body_class: "bg-slate-50 text-slate-900",
                main_class: "min-h-screen flex flex-col items-center justify-start py-10 px-4",
                card_class: "max-w-3xl w-full space-y-6",
                eyebrow_class: "uppercase tracking-wide text-sm text-slate-500",
                headline_class: "text-4xl font-extrabold tracking-tight",
                lede_class: "text-lg text-slate-600",
                input_class: "w-full rounded-md border border-slate-300 px-3 py-2",
                button_class: "inline-flex items-center rounded-md bg-slate-900 px-4 py-2 text-white font-semibold shadow hover:bg-slate-800 transition-colors",
                alert_class: "rounded-md bg-amber-100 text-amber-900 px-4 py-3",
                table_row_class: "border-b border-slate-200",
            },
            WebTheme::Bootstrap => Self {
                use_tailwind: false,
                use_bootstrap: true,
                body_class: "bg-light text-dark",
                main_class: "container py-5",
                card_class: "mx-auto col-lg-8",
                eyebrow_class: "text-uppercase text-muted mb-2",
                headline_class: "display-5 fw-bold",
                lede_class: "lead mb-4",
                input_class: "form-control",
                button_class: "btn btn-primary px-4 py-2",
                alert_class: "alert alert-warning",
                table_row_class: "",
            },
        }
    }
}

#[derive(Clone)]
pub struct WebConfig {
    pub addr: SocketAddr,
    pub theme: WebTheme,
    pub base_url: String,
    pub database: PathBuf,
    pub session_ttl: Duration,
}

#[derive(Debug, Error)]
pub enum WebError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database error: {0}")]
    Store(#[from] StoreError),
}

/// Installs the `tracing` subscriber; `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kelime_rs=info,tower_http=info".into()),
        )
        .init();
}

pub async fn serve(config: WebConfig) -> Result<(), WebError> {
    let store = Store::open(&config.database)?;
    info!(database = %config.database.display(), "database ready");
    let state = Arc::new(AppState::new(
        store,
        config.theme,
        config.base_url.clone(),
        config.session_ttl,
    ));
    let router = build_router(state);
    info!(
        %config.addr,
        theme = ?config.theme,
        base = %config.base_url,
        "Binding HTTP listener"
    );
    let listener = TcpListener::bind(config.addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("HTTP server exited");
    Ok(())
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: message.into(),
        }
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        let status = match err {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::Storage(_) | AppError::PasswordHash(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: displayed(&err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let payload = json!({ "error": self.message });
        (self.status, Json(payload)).into_response()
    }
}

pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/search", get(search_query).post(search_form))
        .route("/api/lookup", get(api_lookup))
        .route("/register", get(register_page).post(register_submit))
        .route("/login", get(login_page).post(login_submit))
        .route("/logout", get(logout))
        .route("/admin/words", get(admin_list).post(admin_create))
        .route(
            "/admin/words/:id/edit",
            get(admin_edit_page).post(admin_update),
        )
        .route("/admin/words/:id/delete", post(admin_delete))
        .route("/healthz", get(health))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new())
                .on_response(DefaultOnResponse::new()),
        )
        .layer(CompressionLayer::new())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        if let Ok(mut stream) = signal(SignalKind::terminate()) {
            let _ = stream.recv().await;
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

// Session gate: handlers taking `SessionUser` only run for a live session.
#[async_trait]
impl FromRequestParts<SharedState> for SessionUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = session_token(&parts.headers) else {
            return Err(Redirect::to("/login").into_response());
        };
        match state.identity.session_user(&token) {
            Ok(Some(user)) => Ok(user),
            Ok(None) => Err(Redirect::to("/login").into_response()),
            Err(err) => Err(server_error(state.theme, &err)),
        }
    }
}

fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
}

fn session_cookie(issued: &IssuedSession, ttl: Duration, secure: bool) -> String {
    Cookie::build((SESSION_COOKIE, issued.token.as_str()))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(cookie::time::Duration::seconds(
            i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX),
        ))
        .build()
        .to_string()
}

fn clear_session_cookie(secure: bool) -> String {
    Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(cookie::time::Duration::ZERO)
        .expires(cookie::time::OffsetDateTime::UNIX_EPOCH)
        .build()
        .to_string()
}

fn signed_in(state: &AppState, issued: &IssuedSession) -> Response {
    let cookie = session_cookie(issued, state.identity.session_ttl(), state.secure_cookies());
    ([(header::SET_COOKIE, cookie)], Redirect::to("/")).into_response()
}

fn render<T: Template>(theme: WebTheme, template: &T) -> Response {
    match template.render() {
        Ok(html) => Html(html).into_response(),
        Err(err) => {
            error!(error = %err, "template render failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(render_error_page(theme, SERVER_ERROR_MESSAGE)),
            )
                .into_response()
        }
    }
}

fn server_error(theme: WebTheme, err: &AppError) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Html(render_error_page(theme, displayed(err))),
    )
        .into_response()
}

/// Message for the caller; internal failures are logged here.
fn displayed(err: &AppError) -> String {
    if err.is_internal() {
        error!(error = %err, "request failed");
    }
    err.user_message()
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok", "service": "kelime-web" }))
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
struct SearchForm {
    #[serde(default)]
    word: String,
}

#[derive(Debug, Deserialize)]
struct LookupParams {
    q: Option<String>,
}

#[derive(Debug, Clone)]
struct SuggestionLink {
    tr: String,
    en: String,
    href: String,
}

/// What the search page shows for one request.
#[derive(Debug, Default)]
struct SearchView {
    query: String,
    message: Option<String>,
    result: Option<Translation>,
    suggestions: Vec<SuggestionLink>,
}

impl SearchView {
    fn from_outcome(outcome: LookupOutcome) -> Self {
        match outcome {
            LookupOutcome::EmptyQuery => Self {
                message: Some(EMPTY_QUERY_MESSAGE.to_string()),
                ..Self::default()
            },
            LookupOutcome::NoMatch {
                display_query,
                suggestions,
            } => {
                let message = if suggestions.is_empty() {
                    NOT_IN_DICTIONARY_MESSAGE
                } else {
                    DID_YOU_MEAN_MESSAGE
                };
                Self {
                    query: display_query,
                    message: Some(message.to_string()),
                    result: None,
                    suggestions: suggestions
                        .into_iter()
                        .map(|s| SuggestionLink {
                            href: search_path(&s.tr),
                            tr: s.tr,
                            en: s.en,
                        })
                        .collect(),
                }
            }
            LookupOutcome::Matched(translation) => Self {
                query: translation.display_query.clone(),
                result: Some(translation),
                ..Self::default()
            },
        }
    }

    fn failed(query: &str, err: &AppError) -> Self {
        Self {
            query: query.trim().to_string(),
            message: Some(displayed(err)),
            ..Self::default()
        }
    }
}

async fn home(State(state): State<SharedState>, user: SessionUser) -> Response {
    render_search(&state, &user, SearchView::default())
}

async fn search_form(
    State(state): State<SharedState>,
    user: SessionUser,
    Form(form): Form<SearchForm>,
) -> Response {
    run_search(&state, &user, &form.word)
}

async fn search_query(
    State(state): State<SharedState>,
    user: SessionUser,
    Query(form): Query<SearchForm>,
) -> Response {
    run_search(&state, &user, &form.word)
}

fn run_search(state: &AppState, user: &SessionUser, raw_query: &str) -> Response {
    let view = match state.resolver.resolve(raw_query) {
        Ok(outcome) => SearchView::from_outcome(outcome),
        Err(err) => SearchView::failed(raw_query, &err),
    };
    render_search(state, user, view)
}

fn render_search(state: &AppState, user: &SessionUser, view: SearchView) -> Response {
    let template = SearchTemplate {
        chrome: Chrome::new(state.theme),
        user,
        view: &view,
    };
    render(state.theme, &template)
}

async fn api_lookup(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Query(params): Query<LookupParams>,
) -> Result<Json<LookupOutcome>, ApiError> {
    let user = match session_token(&headers) {
        Some(token) => state.identity.session_user(&token)?,
        None => None,
    };
    if user.is_none() {
        return Err(ApiError::unauthorized("login required"));
    }
    let query = params.q.unwrap_or_default();
    let outcome = state.resolver.resolve(&query)?;
    Ok(Json(outcome))
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
struct RegisterForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Default, Deserialize)]
struct LoginForm {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

async fn register_page(State(state): State<SharedState>, user: Option<SessionUser>) -> Response {
    if user.is_some() {
        return Redirect::to("/").into_response();
    }
    render_register(&state, "", "", None)
}

async fn register_submit(
    State(state): State<SharedState>,
    Form(form): Form<RegisterForm>,
) -> Response {
    match state
        .identity
        .register(&form.username, &form.email, &form.password)
    {
        Ok(issued) => signed_in(&state, &issued),
        Err(err) => render_register(
            &state,
            form.username.trim(),
            &form.email.trim().to_lowercase(),
            Some(displayed(&err)),
        ),
    }
}

fn render_register(state: &AppState, username: &str, email: &str, error: Option<String>) -> Response {
    let template = RegisterTemplate {
        chrome: Chrome::new(state.theme),
        username,
        email,
        error,
    };
    render(state.theme, &template)
}

async fn login_page(State(state): State<SharedState>, user: Option<SessionUser>) -> Response {
    if user.is_some() {
        return Redirect::to("/").into_response();
    }
    render_login(&state, "", None)
}

async fn login_submit(State(state): State<SharedState>, Form(form): Form<LoginForm>) -> Response {
    match state.identity.login(&form.email, &form.password) {
        Ok(issued) => signed_in(&state, &issued),
        Err(err) => render_login(
            &state,
            &form.email.trim().to_lowercase(),
            Some(displayed(&err)),
        ),
    }
}

fn render_login(state: &AppState, email: &str, error: Option<String>) -> Response {
    let template = LoginTemplate {
        chrome: Chrome::new(state.theme),
        email,
        error,
    };
    render(state.theme, &template)
}

async fn logout(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    if let Some(token) = session_token(&headers) {
        if let Err(err) = state.identity.logout(&token) {
            error!(error = %err, "failed to delete session");
        }
    }
    let cookie = clear_session_cookie(state.secure_cookies());
    ([(header::SET_COOKIE, cookie)], Redirect::to("/login")).into_response()
}

// ---------------------------------------------------------------------------
// Admin
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
struct WordForm {
    #[serde(default)]
    tr: String,
    #[serde(default)]
    en: String,
}

async fn admin_list(State(state): State<SharedState>, user: SessionUser) -> Response {
    render_admin_list(&state, &user, &WordForm::default(), None)
}

async fn admin_create(
    State(state): State<SharedState>,
    user: SessionUser,
    Form(form): Form<WordForm>,
) -> Response {
    match state.admin.create(&form.tr, &form.en) {
        Ok(word) => {
            info!(word_id = word.id, user_id = user.id, "word created");
            Redirect::to("/admin/words").into_response()
        }
        Err(err) => render_admin_list(&state, &user, &form, Some(displayed(&err))),
    }
}

fn render_admin_list(
    state: &AppState,
    user: &SessionUser,
    form: &WordForm,
    error: Option<String>,
) -> Response {
    let words = match state.admin.list() {
        Ok(words) => words,
        Err(err) => return server_error(state.theme, &err),
    };
    let template = AdminWordsTemplate {
        chrome: Chrome::new(state.theme),
        user,
        words,
        form_tr: form.tr.trim(),
        form_en: form.en.trim(),
        error,
    };
    render(state.theme, &template)
}

async fn admin_edit_page(
    State(state): State<SharedState>,
    user: SessionUser,
    Path(id): Path<i64>,
) -> Response {
    match state.admin.get(id) {
        Ok(word) => render_admin_edit(&state, &user, word, None),
        Err(AppError::NotFound(_)) => Redirect::to("/admin/words").into_response(),
        Err(err) => server_error(state.theme, &err),
    }
}

async fn admin_update(
    State(state): State<SharedState>,
    user: SessionUser,
    Path(id): Path<i64>,
    Form(form): Form<WordForm>,
) -> Response {
    match state.admin.update(id, &form.tr, &form.en) {
        Ok(_) => Redirect::to("/admin/words").into_response(),
        Err(AppError::NotFound(_)) => Redirect::to("/admin/words").into_response(),
        Err(err) => {
            let typed = WordPair {
                id,
                tr: form.tr.trim().to_string(),
                en: form.en.trim().to_string(),
            };
            render_admin_edit(&state, &user, typed, Some(displayed(&err)))
        }
    }
}

fn render_admin_edit(
    state: &AppState,
    user: &SessionUser,
    word: WordPair,
    error: Option<String>,
) -> Response {
    let template = AdminEditTemplate {
        chrome: Chrome::new(state.theme),
        user,
        word,
        error,
    };
    render(state.theme, &template)
}

async fn admin_delete(
    State(state): State<SharedState>,
    user: SessionUser,
    Path(id): Path<i64>,
) -> Response {
    match state.admin.delete(id) {
        Ok(()) => {
            info!(word_id = id, user_id = user.id, "word deleted");
            Redirect::to("/admin/words").into_response()
        }
        Err(err) => server_error(state.theme, &err),
    }
}

fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, NON_ALPHANUMERIC).to_string()
}

fn search_path(word: &str) -> String {
    format!("/search?word={}", encode_component(word))
}

fn render_error_page(theme: WebTheme, message: impl Into<String>) -> String {
    let template = ErrorTemplate {
        chrome: Chrome::new(theme),
        message: message.into(),
    };
    template
        .render()
        .unwrap_or_else(|_| SERVER_ERROR_MESSAGE.to_string())
}

#[derive(Template)]
#[template(
    source = r#"<!DOCTYPE html>
<html lang="tr">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>Kelime • Hata</title>
    {% if chrome.use_tailwind %}
    <script src="https://cdn.jsdelivr.net/npm/@tailwindcss/browser@4"></script>
    {% endif %}
    {% if chrome.use_bootstrap %}
    <link href="https://cdn.jsdelivr.net/npm/bootstrap@5.3.8/dist/css/bootstrap.min.css" rel="stylesheet" integrity="sha384-sRIl4kxILFvY47J16cr9ZwB07vP4J8+LH7qKQnuqkuIAvNWLzeN8tE5YBujZqJLB" crossorigin="anonymous">
    {% endif %}
  </head>
  <body class="{{ chrome.body_class }}">
    <main class="{{ chrome.main_class }}">
      <div class="{{ chrome.card_class }}">
        <h1 class="{{ chrome.headline_class }}">Bir şeyler ters gitti</h1>
        <p class="{{ chrome.lede_class }}">{{ message }}</p>
        <a href="/" class="{{ chrome.button_class }}">Ana sayfa</a>
      </div>
    </main>
  </body>
</html>"#,
    ext = "html"
)]
struct ErrorTemplate {
    chrome: Chrome,
    message: String,
}

#[derive(Template)]
#[template(
    source = r#"<!DOCTYPE html>
<html lang="tr">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>Kelime • Sözlük</title>
    {% if chrome.use_tailwind %}
    <script src="https://cdn.jsdelivr.net/npm/@tailwindcss/browser@4"></script>
    {% endif %}
    {% if chrome.use_bootstrap %}
    <link href="https://cdn.jsdelivr.net/npm/bootstrap@5.3.8/dist/css/bootstrap.min.css" rel="stylesheet" integrity="sha384-sRIl4kxILFvY47J16cr9ZwB07vP4J8+LH7qKQnuqkuIAvNWLzeN8tE5YBujZqJLB" crossorigin="anonymous">
    {% endif %}
  </head>
  <body class="{{ chrome.body_class }}">
    <main class="{{ chrome.main_class }}">
      <div class="{{ chrome.card_class }}">
        <nav class="flex gap-4 d-flex text-sm">
          <span>{{ user.username }}</span>
          <a href="/admin/words">Kelimeler</a>
          <a href="/logout">Çıkış</a>
        </nav>
        <div>
          <p class="{{ chrome.eyebrow_class }}">Türkçe ⇄ English</p>
          <h1 class="{{ chrome.headline_class }}">Kelime ara</h1>
        </div>
        <form method="post" action="/search" class="flex gap-3 d-flex">
          <input type="text" name="word" value="{{ view.query }}" placeholder="ev, house…" class="{{ chrome.input_class }}" autofocus>
          <button type="submit" class="{{ chrome.button_class }}">Ara</button>
        </form>
        {% if view.message.is_some() %}
        <div class="{{ chrome.alert_class }}">
          <p>{{ view.message.as_ref().unwrap() }}</p>
          {% if view.suggestions.len() > 0 %}
          <ul>
            {% for s in view.suggestions %}
            <li><a href="{{ s.href }}">{{ s.tr }} / {{ s.en }}</a></li>
            {% endfor %}
          </ul>
          {% endif %}
        </div>
        {% endif %}
        {% if view.result.is_some() %}
        {% let r = view.result.as_ref().unwrap() %}
        <section id="result" class="bg-white shadow rounded p-4 card card-body">
          <p class="{{ chrome.eyebrow_class }}">{{ r.input_lang }} → {{ r.input_lang.opposite() }}</p>
          <h2 class="text-2xl font-bold">{{ r.display_query }}: {{ r.translation }}</h2>
          <p class="text-sm text-slate-500">TR: {{ r.tr }} • EN: {{ r.en }}</p>
          <blockquote class="{{ chrome.lede_class }}">{{ r.example }}</blockquote>
        </section>
        {% endif %}
      </div>
    </main>
  </body>
</html>"#,
    ext = "html"
)]
struct SearchTemplate<'a> {
    chrome: Chrome,
    user: &'a SessionUser,
    view: &'a SearchView,
}

#[derive(Template)]
#[template(
    source = r#"<!DOCTYPE html>
<html lang="tr">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>Kelime • Giriş</title>
    {% if chrome.use_tailwind %}
    <script src="https://cdn.jsdelivr.net/npm/@tailwindcss/browser@4"></script>
    {% endif %}
    {% if chrome.use_bootstrap %}
    <link href="https://cdn.jsdelivr.net/npm/bootstrap@5.3.8/dist/css/bootstrap.min.css" rel="stylesheet" integrity="sha384-sRIl4kxILFvY47J16cr9ZwB07vP4J8+LH7qKQnuqkuIAvNWLzeN8tE5YBujZqJLB" crossorigin="anonymous">
    {% endif %}
  </head>
  <body class="{{ chrome.body_class }}">
    <main class="{{ chrome.main_class }}">
      <div class="{{ chrome.card_class }}">
        <h1 class="{{ chrome.headline_class }}">Giriş yap</h1>
        {% if error.is_some() %}
        <p class="{{ chrome.alert_class }}">{{ error.as_ref().unwrap() }}</p>
        {% endif %}
        <form method="post" action="/login" class="space-y-4">
          <input type="email" name="email" value="{{ email }}" placeholder="Email" class="{{ chrome.input_class }}">
          <input type="password" name="password" placeholder="Şifre" class="{{ chrome.input_class }}">
          <button type="submit" class="{{ chrome.button_class }}">Giriş</button>
        </form>
        <p class="{{ chrome.lede_class }}">Hesabın yok mu? <a href="/register">Kayıt ol</a></p>
      </div>
    </main>
  </body>
</html>"#,
    ext = "html"
)]
struct LoginTemplate<'a> {
    chrome: Chrome,
    email: &'a str,
    error: Option<String>,
}

#[derive(Template)]
#[template(
    source = r#"<!DOCTYPE html>
<html lang="tr">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>Kelime • Kayıt</title>
    {% if chrome.use_tailwind %}
    <script src="https://cdn.jsdelivr.net/npm/@tailwindcss/browser@4"></script>
    {% endif %}
    {% if chrome.use_bootstrap %}
    <link href="https://cdn.jsdelivr.net/npm/bootstrap@5.3.8/dist/css/bootstrap.min.css" rel="stylesheet" integrity="sha384-sRIl4kxILFvY47J16cr9ZwB07vP4J8+LH7qKQnuqkuIAvNWLzeN8tE5YBujZqJLB" crossorigin="anonymous">
    {% endif %}
  </head>
  <body class="{{ chrome.body_class }}">
    <main class="{{ chrome.main_class }}">
      <div class="{{ chrome.card_class }}">
        <h1 class="{{ chrome.headline_class }}">Kayıt ol</h1>
        {% if error.is_some() %}
        <p class="{{ chrome.alert_class }}">{{ error.as_ref().unwrap() }}</p>
        {% endif %}
        <form method="post" action="/register" class="space-y-4">
          <input type="text" name="username" value="{{ username }}" placeholder="Kullanıcı adı" class="{{ chrome.input_class }}">
          <input type="email" name="email" value="{{ email }}" placeholder="Email" class="{{ chrome.input_class }}">
          <input type="password" name="password" placeholder="Şifre" class="{{ chrome.input_class }}">
          <button type="submit" class="{{ chrome.button_class }}">Kayıt ol</button>
        </form>
        <p class="{{ chrome.lede_class }}">Zaten hesabın var mı? <a href="/login">Giriş yap</a></p>
      </div>
    </main>
  </body>
</html>"#,
    ext = "html"
)]
struct RegisterTemplate<'a> {
    chrome: Chrome,
    username: &'a str,
    email: &'a str,
    error: Option<String>,
}

#[derive(Template)]
#[template(
    source = r#"<!DOCTYPE html>
<html lang="tr">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>Kelime • Yönetim</title>
    {% if chrome.use_tailwind %}
    <script src="https://cdn.jsdelivr.net/npm/@tailwindcss/browser@4"></script>
    {% endif %}
    {% if chrome.use_bootstrap %}
    <link href="https://cdn.jsdelivr.net/npm/bootstrap@5.3.8/dist/css/bootstrap.min.css" rel="stylesheet" integrity="sha384-sRIl4kxILFvY47J16cr9ZwB07vP4J8+LH7qKQnuqkuIAvNWLzeN8tE5YBujZqJLB" crossorigin="anonymous">
    {% endif %}
  </head>
  <body class="{{ chrome.body_class }}">
    <main class="{{ chrome.main_class }}">
      <div class="{{ chrome.card_class }}">
        <nav class="flex gap-4 d-flex text-sm">
          <span>{{ user.username }}</span>
          <a href="/">Ara</a>
          <a href="/logout">Çıkış</a>
        </nav>
        <h1 class="{{ chrome.headline_class }}">Kelimeler ({{ words.len() }})</h1>
        {% if error.is_some() %}
        <p class="{{ chrome.alert_class }}">{{ error.as_ref().unwrap() }}</p>
        {% endif %}
        <form method="post" action="/admin/words" class="flex gap-3 d-flex">
          <input type="text" name="tr" value="{{ form_tr }}" placeholder="TR" class="{{ chrome.input_class }}">
          <input type="text" name="en" value="{{ form_en }}" placeholder="EN" class="{{ chrome.input_class }}">
          <button type="submit" class="{{ chrome.button_class }}">Ekle</button>
        </form>
        {% if words.len() == 0 %}
          <p>Henüz kelime yok.</p>
        {% else %}
        <table class="min-w-full table">
          <thead class="bg-slate-100 text-left">
            <tr><th>ID</th><th>TR</th><th>EN</th><th></th></tr>
          </thead>
          <tbody>
            {% for word in words %}
            <tr class="{{ chrome.table_row_class }}">
              <td>{{ word.id }}</td>
              <td>{{ word.tr }}</td>
              <td>{{ word.en }}</td>
              <td class="flex gap-2 d-flex">
                <a href="/admin/words/{{ word.id }}/edit">Düzenle</a>
                <form method="post" action="/admin/words/{{ word.id }}/delete">
                  <button type="submit">Sil</button>
                </form>
              </td>
            </tr>
            {% endfor %}
          </tbody>
        </table>
        {% endif %}
      </div>
    </main>
  </body>
</html>"#,
    ext = "html"
)]
struct AdminWordsTemplate<'a> {
    chrome: Chrome,
    user: &'a SessionUser,
    words: Vec<WordPair>,
    form_tr: &'a str,
    form_en: &'a str,
    error: Option<String>,
}

#[derive(Template)]
#[template(
    source = r#"<!DOCTYPE html>
<html lang="tr">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>Kelime • Düzenle #{{ word.id }}</title>
    {% if chrome.use_tailwind %}
    <script src="https://cdn.jsdelivr.net/npm/@tailwindcss/browser@4"></script>
    {% endif %}
    {% if chrome.use_bootstrap %}
    <link href="https://cdn.jsdelivr.net/npm/bootstrap@5.3.8/dist/css/bootstrap.min.css" rel="stylesheet" integrity="sha384-sRIl4kxILFvY47J16cr9ZwB07vP4J8+LH7qKQnuqkuIAvNWLzeN8tE5YBujZqJLB" crossorigin="anonymous">
    {% endif %}
  </head>
  <body class="{{ chrome.body_class }}">
    <main class="{{ chrome.main_class }}">
      <div class="{{ chrome.card_class }}">
        <nav class="flex gap-4 d-flex text-sm">
          <span>{{ user.username }}</span>
          <a href="/admin/words">Kelimeler</a>
        </nav>
        <h1 class="{{ chrome.headline_class }}">Kelime #{{ word.id }}</h1>
        {% if error.is_some() %}
        <p class="{{ chrome.alert_class }}">{{ error.as_ref().unwrap() }}</p>
        {% endif %}
        <form method="post" action="/admin/words/{{ word.id }}/edit" class="space-y-4">
          <input type="text" name="tr" value="{{ word.tr }}" class="{{ chrome.input_class }}">
          <input type="text" name="en" value="{{ word.en }}" class="{{ chrome.input_class }}">
          <button type="submit" class="{{ chrome.button_class }}">Kaydet</button>
        </form>
      </div>
    </main>
  </body>
</html>"#,
    ext = "html"
)]
struct AdminEditTemplate<'a> {
    chrome: Chrome,
    user: &'a SessionUser,
    word: WordPair,
    error: Option<String>,
}

#[cfg(all(test, feature = "web"))]
mod tests {
    use super::*;
    use crate::auth::test_hasher;
    use axum::{body, body::Body, http::Request};
    use tower::ServiceExt;

    const FORM: &str = "application/x-www-form-urlencoded";

    fn test_router() -> (Router, Store) {
        let store = Store::open_in_memory().unwrap();
        let ev = store.insert_word("ev", "house").unwrap();
        store
            .insert_example(ev, crate::Lang::Tr, "Ev güzel.")
            .unwrap();
        let mut state = AppState::new(
            store.clone(),
            WebTheme::Tailwind,
            "http://127.0.0.1:8080".to_string(),
            crate::auth::DEFAULT_SESSION_TTL,
        );
        state.identity = state.identity.clone().with_hasher(test_hasher());
        (build_router(Arc::new(state)), store)
    }

    async fn send(router: &Router, request: Request<Body>) -> Response {
        router.clone().oneshot(request).await.unwrap()
    }

    fn post_form(uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::post(uri).header(header::CONTENT_TYPE, FORM);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get_with(uri: &str, cookie: &str) -> Request<Body> {
        Request::get(uri)
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn location(response: &Response) -> &str {
        response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }

    /// Registers `ada` and returns the `Cookie` header value for the new session.
    async fn sign_up(router: &Router) -> String {
        let response = send(
            router,
            post_form(
                "/register",
                "username=ada&email=ada%40example.com&password=parola",
                None,
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/");
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .expect("session cookie")
            .to_str()
            .unwrap();
        assert!(set_cookie.contains("HttpOnly"));
        set_cookie.split(';').next().unwrap().to_string()
    }

    #[tokio::test]
    async fn pages_require_a_session() {
        let (router, _) = test_router();
        for uri in ["/", "/admin/words", "/search?word=ev"] {
            let response = send(&router, Request::get(uri).body(Body::empty()).unwrap()).await;
            assert_eq!(response.status(), StatusCode::SEE_OTHER, "{uri}");
            assert_eq!(location(&response), "/login");
        }
        let response = send(&router, get_with("/", "kelime_sid=forged")).await;
        assert_eq!(location(&response), "/login");
    }

    #[tokio::test]
    async fn search_renders_translation_and_example() {
        let (router, _) = test_router();
        let cookie = sign_up(&router).await;
        let request = post_form("/search", "word=+House+", Some(&cookie));
        let html = body_text(send(&router, request).await).await;
        assert!(html.contains("House: ev"), "{html}");
        assert!(html.contains("Ev güzel."));
    }

    #[tokio::test]
    async fn search_reports_missing_words_and_suggestions() {
        let (router, _) = test_router();
        let cookie = sign_up(&router).await;
        let html = body_text(send(&router, get_with("/search?word=xyz", &cookie)).await).await;
        assert!(html.contains(NOT_IN_DICTIONARY_MESSAGE));
        let html = body_text(send(&router, get_with("/search?word=hou", &cookie)).await).await;
        assert!(html.contains(DID_YOU_MEAN_MESSAGE));
        assert!(html.contains("word=ev"));
        let html = body_text(send(&router, post_form("/search", "word=", Some(&cookie))).await).await;
        assert!(html.contains(EMPTY_QUERY_MESSAGE));
    }

    #[tokio::test]
    async fn api_lookup_returns_json_outcome() {
        let (router, _) = test_router();
        let response = send(
            &router,
            Request::get("/api/lookup?q=ev").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let cookie = sign_up(&router).await;
        let response = send(&router, get_with("/api/lookup?q=ev", &cookie)).await;
        assert!(response.status().is_success());
        let payload: serde_json::Value =
            serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(payload["status"], "matched");
        assert_eq!(payload["input_lang"], "tr");
        assert_eq!(payload["translation"], "house");
    }

    #[tokio::test]
    async fn duplicate_email_does_not_sign_in() {
        let (router, _) = test_router();
        sign_up(&router).await;
        let response = send(
            &router,
            post_form(
                "/register",
                "username=other&email=ADA%40example.com&password=x",
                None,
            ),
        )
        .await;
        assert!(response.headers().get(header::SET_COOKIE).is_none());
        let html = body_text(response).await;
        assert!(html.contains(crate::auth::EMAIL_TAKEN));
        assert!(html.contains("value=\"other\""));
    }

    #[tokio::test]
    async fn wrong_password_does_not_sign_in() {
        let (router, _) = test_router();
        sign_up(&router).await;
        let response = send(
            &router,
            post_form("/login", "email=ada%40example.com&password=nope", None),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
        let html = body_text(response).await;
        assert!(html.contains(crate::auth::WRONG_CREDENTIALS));

        let response = send(
            &router,
            post_form("/login", "email=ada%40example.com&password=parola", None),
        )
        .await;
        assert_eq!(location(&response), "/");
        assert!(response.headers().get(header::SET_COOKIE).is_some());
    }

    #[tokio::test]
    async fn signed_in_users_skip_login_page() {
        let (router, _) = test_router();
        let cookie = sign_up(&router).await;
        let response = send(&router, get_with("/login", &cookie)).await;
        assert_eq!(location(&response), "/");
    }

    #[tokio::test]
    async fn logout_invalidates_the_session() {
        let (router, _) = test_router();
        let cookie = sign_up(&router).await;
        let response = send(&router, get_with("/logout", &cookie)).await;
        assert_eq!(location(&response), "/login");
        let cleared = response.headers().get(header::SET_COOKIE).unwrap();
        assert!(cleared.to_str().unwrap().contains("Max-Age=0"));
        let response = send(&router, get_with("/", &cookie)).await;
        assert_eq!(location(&response), "/login");
    }

    #[tokio::test]
    async fn admin_crud_flow() {
        let (router, store) = test_router();
        let cookie = sign_up(&router).await;

        let response = send(
            &router,
            post_form("/admin/words", "tr=Kitap&en=Book", Some(&cookie)),
        )
        .await;
        assert_eq!(location(&response), "/admin/words");
        let kitap = store
            .list_words()
            .unwrap()
            .into_iter()
            .find(|w| w.tr == "kitap")
            .expect("created");
        assert_eq!(kitap.en, "book");

        let html = body_text(
            send(
                &router,
                post_form("/admin/words", "tr=kitap&en=book", Some(&cookie)),
            )
            .await,
        )
        .await;
        assert!(html.contains(crate::admin::DUPLICATE_WORD_MESSAGE));

        let html = body_text(
            send(&router, post_form("/admin/words", "tr=masa&en=", Some(&cookie))).await,
        )
        .await;
        assert!(html.contains(crate::admin::MISSING_FIELDS_MESSAGE));
        assert!(html.contains("value=\"masa\""));

        let uri = format!("/admin/words/{}/edit", kitap.id);
        let response = send(
            &router,
            post_form(&uri, "tr=defter&en=notebook", Some(&cookie)),
        )
        .await;
        assert_eq!(location(&response), "/admin/words");
        assert_eq!(store.get_word(kitap.id).unwrap().unwrap().tr, "defter");

        let uri = format!("/admin/words/{}/delete", kitap.id);
        let response = send(&router, post_form(&uri, "", Some(&cookie))).await;
        assert_eq!(location(&response), "/admin/words");
        assert!(store.get_word(kitap.id).unwrap().is_none());
        let response = send(&router, post_form(&uri, "", Some(&cookie))).await;
        assert_eq!(location(&response), "/admin/words");
    }

    #[tokio::test]
    async fn editing_unknown_word_redirects_to_list() {
        let (router, _) = test_router();
        let cookie = sign_up(&router).await;
        let response = send(&router, get_with("/admin/words/999/edit", &cookie)).await;
        assert_eq!(location(&response), "/admin/words");
    }

    #[tokio::test]
    async fn health_is_public() {
        let (router, _) = test_router();
        let response = send(&router, Request::get("/healthz").body(Body::empty()).unwrap()).await;
        assert!(response.status().is_success());
    }

    #[tokio::test]
    async fn api_lookup_reports_storage_failure_as_server_error() {
        let (router, store) = test_router();
        let cookie = sign_up(&router).await;
        store.execute_raw("DROP TABLE sessions;").unwrap();
        let response = send(&router, get_with("/api/lookup?q=ev", &cookie)).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let payload: serde_json::Value =
            serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(payload["error"], SERVER_ERROR_MESSAGE);
    }

    #[tokio::test]
    async fn session_storage_failure_renders_error_page() {
        let (router, store) = test_router();
        let cookie = sign_up(&router).await;
        store.execute_raw("DROP TABLE sessions;").unwrap();
        let response = send(&router, get_with("/", &cookie)).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let html = body_text(response).await;
        assert!(html.contains(SERVER_ERROR_MESSAGE));
        assert!(html.contains("Bir şeyler ters gitti"));
    }

    #[test]
    fn error_page_escapes_message() {
        let html = render_error_page(WebTheme::Bootstrap, "<script>");
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<p class=\"lead mb-4\"><script>"));
        assert!(html.contains("bootstrap"));
    }
}
