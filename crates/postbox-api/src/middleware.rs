use axum::extract::{Request, State};
use axum::http::{HeaderMap, header};
use axum::middleware::Next;
use axum::response::Response;

use crate::error::ApiError;
use crate::guard::Principal;
use crate::token::{TokenAuthority, TokenError};
use crate::AppState;

/// Extract and verify the bearer token, then attach the resolved
/// `Principal` to the request for the guards downstream. Missing or
/// invalid tokens never reach a handler.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let principal = resolve_principal(req.headers(), &state.tokens)?;
    req.extensions_mut().insert(principal);
    Ok(next.run(req).await)
}

/// Header-to-principal resolution. Fails `Unauthenticated` when the
/// Authorization header is missing, not a bearer, or carries a token that
/// does not verify; an expired token is reported as `TokenExpired`.
fn resolve_principal(headers: &HeaderMap, tokens: &TokenAuthority) -> Result<Principal, ApiError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::Unauthenticated)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(ApiError::Unauthenticated)?;

    let username = tokens.verify(token).map_err(|err| match err {
        TokenError::Expired => ApiError::TokenExpired,
        TokenError::Invalid => ApiError::Unauthenticated,
    })?;

    Ok(Principal(username))
}
