/// Accounts service configuration loaded from environment variables.
#[derive(Debug)]
pub struct AccountsConfig {
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// Redis connection URL (rate limits, pending challenges).
    pub redis_url: String,
    /// HMAC secret for signing session JWTs.
    pub jwt_secret: String,
    /// HMAC secret for signed one-time link tokens (password reset).
    /// Kept separate from the JWT secret so the two can rotate independently.
    pub link_token_secret: String,
    /// Cookie domain attribute (root domain, e.g. "example.com").
    pub cookie_domain: String,
    /// Public site origin that emailed links point at (e.g. "https://example.com").
    pub public_base_url: String,
    /// SMTP relay host.
    pub smtp_host: String,
    /// SMTP username.
    pub smtp_username: String,
    /// SMTP password.
    pub smtp_password: String,
    /// From address for outbound mail (e.g. "Roomlet <no-reply@example.com>").
    pub smtp_from: String,
    /// TCP port to listen on (default 3114). Env var: `ACCOUNTS_PORT`.
    pub accounts_port: u16,
}

impl AccountsConfig {
    pub fn from_env() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL").expect("DATABASE_URL"),
            redis_url: std::env::var("REDIS_URL").expect("REDIS_URL"),
            jwt_secret: std::env::var("JWT_SECRET").expect("JWT_SECRET"),
            link_token_secret: std::env::var("LINK_TOKEN_SECRET").expect("LINK_TOKEN_SECRET"),
            cookie_domain: std::env::var("COOKIE_DOMAIN").expect("COOKIE_DOMAIN"),
            public_base_url: std::env::var("PUBLIC_BASE_URL").expect("PUBLIC_BASE_URL"),
            smtp_host: std::env::var("SMTP_HOST").expect("SMTP_HOST"),
            smtp_username: std::env::var("SMTP_USERNAME").expect("SMTP_USERNAME"),
            smtp_password: std::env::var("SMTP_PASSWORD").expect("SMTP_PASSWORD"),
            smtp_from: std::env::var("SMTP_FROM").expect("SMTP_FROM"),
            accounts_port: std::env::var("ACCOUNTS_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3114),
        }
    }
}
