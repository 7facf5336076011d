mod auth;
mod config;
mod db;
mod guard;
mod listing;
mod rate_limit;
mod routes;
mod services;
mod session;
mod state;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = config::Config::from_env().expect("invalid configuration");

    let pool = db::init_pool(&config.database_url, config.db_max_connections)
        .await
        .expect("database init failed");
    let provider = auth::build_provider(&config.auth).expect("auth provider init failed");
    tracing::info!(backend = config.auth.name(), "auth provider ready");

    let state = state::AppState::new(pool, provider, &config);
    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .expect("failed to bind");

    tracing::info!(port = config.port, "wardboard listening");
    axum::serve(listener, app).await.expect("server failed");
}
