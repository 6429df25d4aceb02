use std::net::SocketAddr;

use sea_orm::Database;
use tracing::info;

use roomlet_accounts::config::AccountsConfig;
use roomlet_accounts::infra::email::SmtpMailer;
use roomlet_accounts::router::build_router;
use roomlet_accounts::state::AppState;

#[tokio::main]
async fn main() {
    roomlet_core::tracing::init_tracing();

    let config = AccountsConfig::from_env();

    let db = Database::connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    let redis_cfg = deadpool_redis::Config::from_url(&config.redis_url);
    let redis = redis_cfg
        .create_pool(Some(deadpool_redis::Runtime::Tokio1))
        .expect("failed to create Redis pool");

    let mailer = SmtpMailer::new(
        &config.smtp_host,
        &config.smtp_username,
        &config.smtp_password,
        &config.smtp_from,
    )
    .expect("invalid SMTP configuration");

    let state = AppState {
        db,
        redis,
        mailer,
        jwt_secret: config.jwt_secret,
        link_token_secret: config.link_token_secret,
        cookie_domain: config.cookie_domain,
        public_base_url: config.public_base_url,
    };

    let router = build_router(state);
    let addr = format!("0.0.0.0:{}", config.accounts_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind");

    info!("accounts service listening on {addr}");
    // ConnectInfo supplies the peer address for client-IP extraction.
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("server error");
}
