//! JSON API for the browser client. Each game lives in memory behind its own
//! lock; the AI's thinking pause runs as a tokio task that fires the session's
//! ticket once the delay has passed. Games nobody has touched for the idle TTL
//! are swept away by a background task.
use std::collections::HashMap;
use std::path::Path as FsPath;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use axum::{
    extract::{Path, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use connect4_engine::{
    Deferred, GameMode, GameState, MoveRejection, MoveResult, SearchError, Session,
    SessionConfig, SessionEvent, Ticket,
};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::{debug, error, info};

type SharedSession = Arc<Mutex<Session>>;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<Inner>,
}

struct Inner {
    sessions: Mutex<HashMap<u64, Entry>>,
    next_id: AtomicU64,
    config: SessionConfig,
    idle_ttl: Duration,
}

struct Entry {
    session: SharedSession,
    touched: Instant,
}

impl AppState {
    pub fn new(config: SessionConfig, idle_ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                sessions: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                config,
                idle_ttl,
            }),
        }
    }

    fn insert(&self, session: Session) -> (u64, SharedSession) {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let shared = Arc::new(Mutex::new(session));
        let entry = Entry {
            session: shared.clone(),
            touched: Instant::now(),
        };
        lock(&self.inner.sessions).insert(id, entry);
        (id, shared)
    }

    /// Looking a game up counts as activity and restarts its idle clock.
    fn session(&self, id: u64) -> Result<SharedSession, ApiError> {
        let mut sessions = lock(&self.inner.sessions);
        let entry = sessions.get_mut(&id).ok_or(ApiError::NotFound(id))?;
        entry.touched = Instant::now();
        Ok(entry.session.clone())
    }

    fn remove(&self, id: u64) -> Result<(), ApiError> {
        lock(&self.inner.sessions)
            .remove(&id)
            .map(|_| ())
            .ok_or(ApiError::NotFound(id))
    }

    /// Drops every game idle for at least the TTL as of `now`. An AI task
    /// still holding one of them finishes on its own copy.
    pub fn evict_idle(&self, now: Instant) -> usize {
        let ttl = self.inner.idle_ttl;
        let mut sessions = lock(&self.inner.sessions);
        let before = sessions.len();
        sessions.retain(|id, entry| {
            let keep = now.saturating_duration_since(entry.touched) < ttl;
            if !keep {
                debug!(game = *id, "evicting idle game");
            }
            keep
        });
        before - sessions.len()
    }

    pub fn spawn_sweeper(&self, every: Duration) -> JoinHandle<()> {
        let state = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let evicted = state.evict_idle(Instant::now());
                if evicted > 0 {
                    info!(evicted, "idle games evicted");
                }
            }
        })
    }
}

/// A panicking handler must not take every later request down with it.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub fn app_router(state: AppState, static_dir: &FsPath) -> Router {
    let api = Router::new()
        .route("/games", post(create_game))
        .route("/games/:id", get(get_game).delete(delete_game))
        .route("/games/:id/drop", post(drop_piece))
        .route("/games/:id/settle", post(settle))
        .route("/games/:id/reset", post(reset_game))
        .with_state(state);
    Router::new()
        .nest("/api", api)
        .fallback_service(ServeDir::new(static_dir).append_index_html_on_directories(true))
        .layer(
            CorsLayer::new()
                .allow_methods([Method::GET, Method::POST, Method::DELETE])
                .allow_origin(HeaderValue::from_static("*"))
                .allow_headers([header::CONTENT_TYPE]),
        )
        .layer(TraceLayer::new_for_http())
}

#[derive(Debug, Deserialize)]
struct NewGame {
    mode: GameMode,
}

#[derive(Debug, Serialize)]
struct Created {
    id: u64,
    state: GameState,
}

#[derive(Debug, Deserialize)]
struct DropRequest {
    column: usize,
}

#[derive(Debug, Deserialize)]
struct SettleRequest {
    ticket: Ticket,
}

async fn create_game(
    State(state): State<AppState>,
    Json(req): Json<NewGame>,
) -> Result<impl IntoResponse, ApiError> {
    let session = Session::new(req.mode, state.inner.config.clone())?;
    let (id, shared) = state.insert(session);
    let snapshot = lock(&shared).state();
    info!(game = id, mode = ?req.mode, "game created");
    schedule_ai(id, shared);
    Ok((StatusCode::CREATED, Json(Created { id, state: snapshot })))
}

async fn get_game(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<impl IntoResponse, ApiError> {
    let shared = state.session(id)?;
    let snapshot = lock(&shared).state();
    Ok(([(header::CACHE_CONTROL, "no-store")], Json(snapshot)))
}

async fn drop_piece(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(req): Json<DropRequest>,
) -> Result<Json<MoveResult>, ApiError> {
    let shared = state.session(id)?;
    let result = lock(&shared).drop_piece(req.column)?;
    Ok(Json(result))
}

async fn settle(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(req): Json<SettleRequest>,
) -> Result<Json<SessionEvent>, ApiError> {
    let shared = state.session(id)?;
    let event = {
        let mut session = lock(&shared);
        match session.pending() {
            Some(s) if s.ticket == req.ticket && s.task == Deferred::SettleDrop => {
                session.fire(req.ticket)
            }
            _ => None,
        }
    };
    let event = event.ok_or(ApiError::StaleTicket)?;
    schedule_ai(id, shared);
    Ok(Json(event))
}

async fn reset_game(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<GameState>, ApiError> {
    let shared = state.session(id)?;
    let snapshot = {
        let mut session = lock(&shared);
        session.reset();
        session.state()
    };
    info!(game = id, "game reset");
    schedule_ai(id, shared);
    Ok(Json(snapshot))
}

async fn delete_game(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<StatusCode, ApiError> {
    state.remove(id)?;
    info!(game = id, "game deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// If the session now waits on its AI, fire the ticket after the thinking
/// delay. A reset in the meantime turns the ticket stale and the task into a
/// no-op.
fn schedule_ai(id: u64, shared: SharedSession) {
    let scheduled = match lock(&shared).pending() {
        Some(s) if s.task == Deferred::AiMove => s,
        _ => return,
    };
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(scheduled.delay_ms)).await;
        let fired = tokio::task::spawn_blocking(move || {
            let event = lock(&shared).fire(scheduled.ticket);
            event
        })
        .await;
        match fired {
            Ok(Some(SessionEvent::AiMoved(result))) => {
                info!(game = id, column = result.column, row = result.row, "AI moved")
            }
            Ok(_) => debug!(game = id, "AI ticket went stale"),
            Err(err) => error!(game = id, %err, "AI task failed"),
        }
    });
}

#[derive(Debug, thiserror::Error)]
enum ApiError {
    #[error("game {0} not found")]
    NotFound(u64),
    #[error(transparent)]
    Rejected(#[from] MoveRejection),
    #[error("ticket is stale or unknown")]
    StaleTicket,
    #[error("session config is unusable: {0}")]
    Config(#[from] SearchError),
}

impl ApiError {
    fn reason(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "not_found",
            ApiError::Rejected(MoveRejection::InvalidColumn { .. }) => "invalid_column",
            ApiError::Rejected(MoveRejection::ColumnFull { .. }) => "column_full",
            ApiError::Rejected(MoveRejection::MoveWhileBusy) => "move_while_busy",
            ApiError::StaleTicket => "stale_ticket",
            ApiError::Config(_) => "invalid_config",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Rejected(_) | ApiError::StaleTicket => StatusCode::CONFLICT,
            ApiError::Config(err) => {
                error!(%err, "refusing to start a game");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = serde_json::json!({
            "error": self.to_string(),
            "reason": self.reason(),
        });
        (status, Json(body)).into_response()
    }
}
