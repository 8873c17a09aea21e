use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use tracing::warn;
use uuid::Uuid;

use crate::{
    auth::{repo_types::User, services::AuthService},
    error::ApiError,
};

/// Who is making the request. Only exists once a valid token naming an
/// existing user has been presented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
    pub email: String,
    pub is_admin: bool,
}

impl From<&User> for Identity {
    fn from(u: &User) -> Self {
        Self {
            user_id: u.id,
            email: u.email.clone(),
            is_admin: u.is_admin,
        }
    }
}

/// One check in a guard chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    /// Valid bearer token naming an existing user.
    Authenticated,
    /// Resolved identity carries the administrator flag.
    Admin,
}

pub const REQUIRE_AUTHENTICATED: &[Guard] = &[Guard::Authenticated];
pub const REQUIRE_ADMIN: &[Guard] = &[Guard::Authenticated, Guard::Admin];

/// `Authorization: Bearer <token>`, scheme case-insensitive.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Runs `guards` in order and returns the first failure. A guard that needs an
/// identity fails with `Unauthorized` when no earlier guard resolved one.
pub async fn check(auth: &AuthService, headers: &HeaderMap, guards: &[Guard]) -> Result<User, ApiError> {
    let mut user: Option<User> = None;
    for guard in guards {
        match guard {
            Guard::Authenticated => {
                let token = bearer_token(headers).ok_or_else(|| {
                    warn!("missing bearer token");
                    ApiError::Unauthorized
                })?;
                user = Some(auth.current_user(token).await?);
            }
            Guard::Admin => {
                let u = user.as_ref().ok_or(ApiError::Unauthorized)?;
                if !u.is_admin {
                    warn!(user_id = %u.id, "admin required");
                    return Err(ApiError::Forbidden);
                }
            }
        }
    }
    user.ok_or(ApiError::Unauthorized)
}

async fn resolve<S>(parts: &mut Parts, state: &S, guards: &[Guard]) -> Result<User, ApiError>
where
    S: Send + Sync,
    AuthService: FromRef<S>,
{
    let auth = AuthService::from_ref(state);
    let user = check(&auth, &parts.headers, guards).await?;
    parts.extensions.insert(Identity::from(&user));
    Ok(user)
}

/// Any signed-in user.
pub struct AuthUser(pub Identity);

/// Signed-in user with the administrator flag.
pub struct AdminUser(pub Identity);

/// Signed-in user's full record (password hash is never serialized).
pub struct CurrentUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    AuthService: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = resolve(parts, state, REQUIRE_AUTHENTICATED).await?;
        Ok(AuthUser(Identity::from(&user)))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    AuthService: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = resolve(parts, state, REQUIRE_ADMIN).await?;
        Ok(AdminUser(Identity::from(&user)))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
    AuthService: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = resolve(parts, state, REQUIRE_AUTHENTICATED).await?;
        Ok(CurrentUser(user))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use axum::{
        body::Body,
        extract::{Extension, State},
        http::{Request, StatusCode},
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    use super::*;
    use crate::auth::services::SignUpProfile;
    use crate::state::AppState;

    #[derive(Clone)]
    struct CountingState {
        app: AppState,
        calls: Arc<AtomicUsize>,
    }

    impl FromRef<CountingState> for AuthService {
        fn from_ref(p: &CountingState) -> Self {
            AuthService::from_ref(&p.app)
        }
    }

    async fn admin_only(State(p): State<CountingState>, AdminUser(_): AdminUser) -> StatusCode {
        p.calls.fetch_add(1, Ordering::SeqCst);
        StatusCode::OK
    }

    async fn whoami(AuthUser(id): AuthUser, Extension(ctx): Extension<Identity>) -> String {
        assert_eq!(id, ctx);
        id.email
    }

    fn counting_router() -> (Router, CountingState) {
        let counted = CountingState {
            app: AppState::fake(),
            calls: Arc::new(AtomicUsize::new(0)),
        };
        let router = Router::new()
            .route("/admin", get(admin_only))
            .route("/whoami", get(whoami))
            .with_state(counted.clone());
        (router, counted)
    }

    fn request(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut b = Request::builder().uri(uri);
        if let Some(t) = token {
            b = b.header(AUTHORIZATION, format!("Bearer {t}"));
        }
        b.body(Body::empty()).unwrap()
    }

    #[test]
    fn bearer_token_parsing() {
        let mut h = HeaderMap::new();
        assert_eq!(bearer_token(&h), None);
        h.insert(AUTHORIZATION, "Bearer abc".parse().unwrap());
        assert_eq!(bearer_token(&h), Some("abc"));
        h.insert(AUTHORIZATION, "bearer abc".parse().unwrap());
        assert_eq!(bearer_token(&h), Some("abc"));
        h.insert(AUTHORIZATION, "Basic dXNlcjpwYXNz".parse().unwrap());
        assert_eq!(bearer_token(&h), None);
        h.insert(AUTHORIZATION, "Bearer ".parse().unwrap());
        assert_eq!(bearer_token(&h), None);
    }

    #[tokio::test]
    async fn admin_guard_rejects_non_admin_without_calling_handler() {
        let (router, counted) = counting_router();
        let auth = AuthService::from_ref(&counted.app);
        let s = auth
            .sign_up("user@x.io", "password1", SignUpProfile::default())
            .await
            .unwrap();

        let res = router.oneshot(request("/admin", Some(&s.token))).await.unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
        assert_eq!(counted.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_token_is_unauthorized_not_forbidden() {
        let (router, counted) = counting_router();
        let res = router.oneshot(request("/admin", None)).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(counted.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn admin_guard_calls_handler_exactly_once() {
        let (router, counted) = counting_router();
        let auth = AuthService::from_ref(&counted.app);
        let admin = auth.ensure_admin("root@x.io", "password1").await.unwrap();
        let token = auth.keys().issue(admin.id).unwrap();

        let res = router.oneshot(request("/admin", Some(&token))).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(counted.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn identity_is_attached_to_request() {
        let (router, counted) = counting_router();
        let auth = AuthService::from_ref(&counted.app);
        let s = auth
            .sign_up("who@x.io", "password1", SignUpProfile::default())
            .await
            .unwrap();
        let res = router.oneshot(request("/whoami", Some(&s.token))).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn check_orders_guards() {
        let app = AppState::fake();
        let auth = AuthService::from_ref(&app);
        let headers = HeaderMap::new();

        let err = check(&auth, &headers, REQUIRE_ADMIN).await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized));
        // Admin without a preceding Authenticated guard has nobody to check.
        let err = check(&auth, &headers, &[Guard::Admin]).await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized));
    }
}
