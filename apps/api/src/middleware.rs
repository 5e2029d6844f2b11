use axum::extract::Request;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use warden_core::{AppError, AppResult, SessionRole, UserSession};

use crate::error::ApiResult;

/// Header carrying the login resolved by the fronting authentication proxy.
pub const REMOTE_USER_HEADER: &str = "x-remote-user";

/// Header carrying the comma separated account roles of that login.
pub const REMOTE_USER_ROLES_HEADER: &str = "x-remote-user-roles";

pub async fn require_session(mut request: Request, next: Next) -> ApiResult<Response> {
    let session = session_from_headers(request.headers())?;

    request.extensions_mut().insert(session);
    Ok(next.run(request).await)
}

fn session_from_headers(headers: &HeaderMap) -> AppResult<UserSession> {
    let login_id = headers
        .get(REMOTE_USER_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::Unauthorized("authentication required".to_owned()))?;

    let mut roles = headers
        .get(REMOTE_USER_ROLES_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .split(',')
        .filter(|value| !value.trim().is_empty())
        .map(|value| {
            SessionRole::parse(value)
                .ok_or_else(|| AppError::Validation(format!("unknown session role '{value}'")))
        })
        .collect::<AppResult<Vec<_>>>()?;
    if roles.is_empty() {
        roles.push(SessionRole::User);
    }

    Ok(UserSession::new(Some(login_id.to_owned()), roles))
}
