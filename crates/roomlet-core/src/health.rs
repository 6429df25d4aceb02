use axum::http::StatusCode;

/// `GET /healthz` — process is up and serving.
pub async fn healthz() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

/// `GET /readyz` — ready to take traffic. Services with external
/// dependencies mount their own probe instead of this one.
pub async fn readyz() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}
