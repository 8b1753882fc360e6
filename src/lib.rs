pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod revalidate;
pub mod services;
pub mod state;

use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE, IF_NONE_MATCH},
        HeaderValue, Method,
    },
    middleware::from_fn_with_state,
    routing::{get, patch, post, put},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

use crate::middleware::{require_page_session, require_session};
pub use crate::state::AppState;

/// Full application router: public routes, gated pages and the JSON API.
pub fn app(state: AppState) -> Router {
    let config = state.config.clone();

    let router = Router::new()
        // Public
        .route("/", get(handlers::public::root))
        .route("/health", get(handlers::public::health))
        .merge(auth_public_routes())
        // Gated
        .merge(page_routes(state.clone()))
        .merge(api_routes(state.clone()))
        // Global middleware
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(config.api.max_request_size_bytes))
        .layer(cors_layer(&config.security.cors_origins));

    let router = if config.api.enable_request_logging {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    };

    router.with_state(state)
}

fn auth_public_routes() -> Router<AppState> {
    use handlers::public;

    Router::new()
        .route("/login", get(public::login_page))
        .route("/auth/signin", get(public::signin))
        .route("/auth/callback", get(public::callback))
        .route("/auth/signout", post(public::signout))
}

fn page_routes(state: AppState) -> Router<AppState> {
    use handlers::pages;

    Router::new()
        .route("/dashboard", get(pages::dashboard))
        .route("/exercises", get(pages::exercises))
        .route("/workouts", get(pages::workouts))
        .route("/workouts/plans", get(pages::plans))
        .route("/workouts/calendar", get(pages::calendar))
        .route("/workouts/history", get(pages::history))
        .route_layer(from_fn_with_state(state, require_page_session))
}

fn api_routes(state: AppState) -> Router<AppState> {
    use handlers::protected::{auth, exercises, plans, sessions, sets};

    Router::new()
        .route("/api/auth/session", get(auth::session))
        // Exercises
        .route("/api/exercises", get(exercises::list).post(exercises::create))
        .route(
            "/api/exercises/:id",
            get(exercises::get)
                .put(exercises::update)
                .delete(exercises::delete),
        )
        .route("/api/exercises/:id/history", get(exercises::history))
        // Plans
        .route("/api/workout/plans", get(plans::list).post(plans::create))
        .route(
            "/api/workout/plans/:id",
            get(plans::get).put(plans::update).delete(plans::delete),
        )
        // Sessions
        .route("/api/workout/sessions", get(sessions::list))
        .route("/api/workout/sessions/schedule", post(sessions::schedule))
        .route("/api/workout/sessions/log", post(sessions::log))
        .route(
            "/api/workout/sessions/:id",
            get(sessions::get).delete(sessions::delete),
        )
        .route("/api/workout/sessions/:id/start", post(sessions::start))
        .route("/api/workout/sessions/:id/complete", post(sessions::complete))
        .route(
            "/api/workout/sessions/:id/schedule",
            put(sessions::reschedule),
        )
        .route(
            "/api/workout/sessions/:id/progression",
            get(sessions::progression).post(sessions::apply_progression),
        )
        // Sets
        .route("/api/workout/sets/:id", patch(sets::update))
        .route_layer(from_fn_with_state(state, require_session))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, IF_NONE_MATCH])
        .allow_credentials(true)
}
