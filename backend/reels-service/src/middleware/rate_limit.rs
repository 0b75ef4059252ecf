/// Per-route admission control
///
/// Wraps a resource with one action class. Identified callers are checked
/// against the `AdmissionController` and every response carries the
/// `X-RateLimit-*` headers. Anonymous callers bypass the limiter.
use actix_web::body::EitherBody;
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header::{HeaderMap, HeaderName, HeaderValue};
use actix_web::{Error, HttpMessage, ResponseError};
use futures::future::{ready, LocalBoxFuture, Ready};
use std::rc::Rc;
use std::sync::Arc;

use crate::error::AppError;
use crate::middleware::identity::UserId;
use crate::models::ActionClass;
use crate::services::rate_limiter::{AdmissionController, RateLimitDecision};

pub const LIMIT_HEADER: &str = "x-ratelimit-limit";
pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";
pub const RESET_HEADER: &str = "x-ratelimit-reset";

#[derive(Clone)]
pub struct RateLimit {
    controller: Arc<AdmissionController>,
    class: ActionClass,
}

impl RateLimit {
    pub fn new(controller: Arc<AdmissionController>, class: ActionClass) -> Self {
        Self { controller, class }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimit
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = RateLimitService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitService {
            service: Rc::new(service),
            controller: self.controller.clone(),
            class: self.class,
        }))
    }
}

pub struct RateLimitService<S> {
    service: Rc<S>,
    controller: Arc<AdmissionController>,
    class: ActionClass,
}

impl<S, B> Service<ServiceRequest> for RateLimitService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let user = req.extensions().get::<UserId>().copied();

        let Some(UserId(user_id)) = user else {
            return Box::pin(async move {
                service
                    .call(req)
                    .await
                    .map(ServiceResponse::map_into_left_body)
            });
        };

        let decision = self.controller.check_and_consume(self.class, user_id);

        Box::pin(async move {
            if !decision.allowed {
                let mut response = AppError::RateLimited {
                    retry_after_secs: decision.retry_after_secs,
                }
                .error_response();
                apply_headers(response.headers_mut(), &decision);
                return Ok(req.into_response(response).map_into_right_body());
            }

            let mut res = service.call(req).await?;
            apply_headers(res.headers_mut(), &decision);
            Ok(res.map_into_left_body())
        })
    }
}

fn apply_headers(headers: &mut HeaderMap, decision: &RateLimitDecision) {
    for (name, value) in [
        (LIMIT_HEADER, decision.limit as u64),
        (REMAINING_HEADER, decision.remaining as u64),
        (RESET_HEADER, decision.reset_at),
    ] {
        headers.insert(HeaderName::from_static(name), HeaderValue::from(value));
    }
}
