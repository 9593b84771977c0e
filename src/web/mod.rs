use crate::accounts::AccountService;
use crate::auth::SessionTokens;
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

mod account_routes;
mod error;
mod instruction_routes;
mod session;

pub use error::ApiError;
pub use session::{CurrentUser, Viewer};

/// Where the Telegram OAuth flow sends the browser back to.
#[derive(Debug, Clone)]
pub struct TelegramLink {
    pub bot_id: String,
    pub bot_username: String,
    pub origin: String,
    pub redirect_uri: String,
}

#[derive(Clone)]
pub struct AppState {
    pub accounts: Arc<AccountService>,
    pub tokens: SessionTokens,
    pub telegram: TelegramLink,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/register/send-code", post(account_routes::send_code))
        .route("/register/verify", post(account_routes::verify_phone))
        .route("/login", post(account_routes::login))
        .route("/telegram-callback", get(account_routes::telegram_callback))
        .route("/process-telegram-auth", post(account_routes::process_telegram_auth))
        .route(
            "/complete-registration/send-code",
            post(account_routes::complete_registration_send_code),
        )
        .route(
            "/complete-registration/verify",
            post(account_routes::complete_registration_verify),
        )
        .route("/profile", get(account_routes::profile))
        .route(
            "/profile/link-telegram",
            get(account_routes::link_telegram_url).post(account_routes::link_telegram),
        )
        .route("/profile/unlink-telegram", post(account_routes::unlink_telegram))
        .route("/ref", get(instruction_routes::redeem))
        .route("/", get(instruction_routes::list))
        .route("/instructions", get(instruction_routes::list))
        .route("/instruction/{id}", get(instruction_routes::open))
        .route(
            "/admin/instructions",
            get(instruction_routes::admin_list).post(instruction_routes::admin_save),
        )
        .route(
            "/admin/instructions/{id}",
            delete(instruction_routes::admin_delete),
        )
        .route("/admin/users", get(instruction_routes::admin_users))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::accounts::testing::Fixture;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request};
    use serde_json::Value;
    use tower::ServiceExt;

    fn tokens() -> SessionTokens {
        SessionTokens::new("test-secret", chrono::Duration::hours(1))
    }

    pub fn token_for(user: &crate::database::User) -> String {
        tokens().issue(user).unwrap()
    }

    pub fn app(fixture: &Fixture) -> Router {
        router(AppState {
            accounts: fixture.accounts.clone(),
            tokens: tokens(),
            telegram: TelegramLink {
                bot_id: "123456".to_string(),
                bot_username: "qrgate_bot".to_string(),
                origin: "https://qrgate.example".to_string(),
                redirect_uri: "https://qrgate.example/telegram-callback".to_string(),
            },
        })
    }

    pub async fn call(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header("authorization", format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{app, call};
    use crate::accounts::testing::fixture;
    use axum::http::{Method, StatusCode};

    #[tokio::test]
    async fn test_health() {
        let f = fixture();
        let (status, _) = call(&app(&f), Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_garbage_token_is_anonymous() {
        let f = fixture();
        let app = app(&f);

        let (status, _) = call(&app, Method::GET, "/instructions", Some("garbage"), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call(&app, Method::GET, "/profile", Some("garbage"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Authentication required");
    }
}
