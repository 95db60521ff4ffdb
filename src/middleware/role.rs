//! Role guards for whole routers.
//!
//! Per-operation checks live in the services, which receive a
//! [`courseboard_auth::Caller`]. These guards cover routers whose every route
//! shares one requirement, such as the admin-only user management routes.

use axum::{
    extract::{FromRequestParts, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use courseboard_auth::UserRole;
use courseboard_core::AppError;

use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// Rejects the request unless its bearer token carries one of `allowed_roles`.
///
/// ```rust,ignore
/// let admin_routes = Router::new()
///     .route("/", get(handler))
///     .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));
/// ```
pub async fn require_roles(
    State(state): State<AppState>,
    req: Request,
    next: Next,
    allowed_roles: &[UserRole],
) -> Result<Response, AppError> {
    let (mut parts, body) = req.into_parts();

    let auth_user = AuthUser::from_request_parts(&mut parts, &state).await?;
    auth_user.caller().require_any(allowed_roles)?;

    let req = Request::from_parts(parts, body);
    Ok(next.run(req).await)
}

pub async fn require_admin(State(state): State<AppState>, req: Request, next: Next) -> Response {
    match require_roles(State(state), req, next, &[UserRole::Admin]).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}
