/// Gateway identity propagation
///
/// The upstream gateway authenticates callers and forwards `x-user-id`
/// (and optionally `x-username`). Requests without the header are anonymous.
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{Error, FromRequest, HttpMessage, HttpRequest};
use futures::future::{ready, LocalBoxFuture, Ready};
use once_cell::sync::Lazy;
use regex::Regex;
use std::rc::Rc;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::UserProfile;
use crate::storage::UserDirectory;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USERNAME_HEADER: &str = "x-username";

static USERNAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_]{1,30}$").expect("Invalid username regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserId(pub Uuid);

pub struct IdentityMiddleware {
    users: Arc<dyn UserDirectory>,
}

impl IdentityMiddleware {
    pub fn new(users: Arc<dyn UserDirectory>) -> Self {
        Self { users }
    }
}

impl<S, B> Transform<S, ServiceRequest> for IdentityMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = IdentityMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(IdentityMiddlewareService {
            service: Rc::new(service),
            users: self.users.clone(),
        }))
    }
}

pub struct IdentityMiddlewareService<S> {
    service: Rc<S>,
    users: Arc<dyn UserDirectory>,
}

impl<S, B> Service<ServiceRequest> for IdentityMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let users = self.users.clone();

        Box::pin(async move {
            let Some(raw) = req.headers().get(USER_ID_HEADER) else {
                return service.call(req).await;
            };

            let user_id = raw
                .to_str()
                .ok()
                .and_then(|value| Uuid::parse_str(value.trim()).ok())
                .ok_or_else(|| AppError::Unauthorized("Invalid x-user-id header".into()))?;

            let username = req
                .headers()
                .get(USERNAME_HEADER)
                .and_then(|h| h.to_str().ok())
                .map(str::trim)
                .filter(|name| USERNAME_REGEX.is_match(name))
                .map(str::to_string);

            if let Err(e) = register_user(users.as_ref(), user_id, username).await {
                tracing::warn!(user_id = %user_id, error = %e, "Failed to record caller identity");
            }

            req.extensions_mut().insert(UserId(user_id));
            service.call(req).await
        })
    }
}

/// Keep the directory in step with the forwarded identity
async fn register_user(
    users: &dyn UserDirectory,
    user_id: Uuid,
    username: Option<String>,
) -> crate::error::Result<()> {
    match username {
        Some(name) => {
            let known = users.get_user(user_id).await?;
            if known.map(|u| u.username != name).unwrap_or(true) {
                users.upsert_user(UserProfile::new(user_id, name)).await?;
            }
        }
        None => {
            if users.get_user(user_id).await?.is_none() {
                let placeholder = UserProfile::placeholder_username(user_id);
                users
                    .upsert_user(UserProfile::new(user_id, placeholder))
                    .await?;
            }
        }
    }
    Ok(())
}

impl FromRequest for UserId {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut actix_web::dev::Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<UserId>()
                .copied()
                .ok_or_else(|| AppError::Unauthorized("Missing x-user-id header".into()).into()),
        )
    }
}
