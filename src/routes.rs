// src/routes.rs

use axum::{
    Router,
    http::Method,
    middleware,
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, attempt, auth, manage, quiz},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware, staff_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, quizzes, attempts, manage, admin).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (store + config).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().expect("valid origin"),
        "http://127.0.0.1:3000".parse().expect("valid origin"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let require_auth = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let quiz_routes = Router::new()
        .route("/", get(quiz::list_quizzes))
        .route("/{id}", get(quiz::get_quiz))
        // Protected quiz-taking routes
        .merge(
            Router::new()
                .route("/{id}/start", post(attempt::start_attempt))
                .route(
                    "/{id}/attempts/{attempt_id}",
                    get(attempt::take_attempt),
                )
                .route(
                    "/{id}/attempts/{attempt_id}/submit",
                    post(attempt::submit_attempt),
                )
                .layer(require_auth.clone()),
        );

    let attempt_routes = Router::new()
        .route("/", get(attempt::my_attempts))
        .route("/{id}/results", get(attempt::get_results))
        .layer(require_auth.clone());

    let manage_routes = Router::new()
        .route("/quizzes", post(manage::create_quiz))
        .route(
            "/quizzes/{id}",
            get(manage::get_managed_quiz)
                .put(manage::update_quiz)
                .delete(manage::delete_quiz),
        )
        .route("/quizzes/{id}/attempts", get(manage::list_quiz_attempts))
        .route("/quizzes/{id}/questions", post(manage::create_question))
        .route(
            "/questions/{id}",
            put(manage::update_question).delete(manage::delete_question),
        )
        .route("/questions/{id}/options", post(manage::create_option))
        .route(
            "/options/{id}",
            put(manage::update_option).delete(manage::delete_option),
        )
        // Auth first, then the authoring-role check
        .layer(middleware::from_fn(staff_middleware))
        .layer(require_auth.clone());

    let admin_routes = Router::new()
        .route("/users", get(admin::list_users))
        .route("/users/{id}/role", put(admin::update_user_role))
        .layer(middleware::from_fn(admin_middleware))
        .layer(require_auth);

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/quizzes", quiz_routes)
        .nest("/api/attempts", attempt_routes)
        .nest("/api/manage", manage_routes)
        .nest("/api/admin", admin_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
