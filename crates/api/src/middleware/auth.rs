//! Bearer-token authentication extractor.
//!
//! Every `/api/user/*` handler except signup and signin takes a
//! [`RequireUser`]. The token is checked before the handler body runs, so a
//! rejected request never reaches the store beyond the account lookup.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::error::{AppError, set_sentry_user};
use crate::models::User;
use crate::services::auth::AuthError;
use crate::state::AppState;

/// Extractor that requires a valid bearer token for a live account.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireUser(user): RequireUser) -> impl IntoResponse {
///     format!("Hello, {}!", user.name)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RequireUser(pub User);

/// Extract the token from `Authorization: Bearer <token>`.
pub fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

impl FromRequestParts<AppState> for RequireUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AuthError::InvalidToken)?;
        let user_id = state.tokens().verify(token)?;

        // Tokens outlive accounts; a deleted account must not keep access.
        let user = state
            .store()
            .get_user(user_id)
            .await
            .map_err(AuthError::Repository)?
            .ok_or(AuthError::InvalidToken)?;

        tracing::Span::current().record("user_id", tracing::field::display(user.id));
        set_sentry_user(&user.id);

        Ok(Self(user))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/user/cart");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&parts(Some("Bearer abc.def"))), Some("abc.def"));
        assert_eq!(bearer_token(&parts(Some("bearer  abc"))), Some("abc"));
        assert_eq!(bearer_token(&parts(Some("Basic abc"))), None);
        assert_eq!(bearer_token(&parts(Some("Bearer "))), None);
        assert_eq!(bearer_token(&parts(Some("abc"))), None);
        assert_eq!(bearer_token(&parts(None)), None);
    }
}
