/// JWT Authentication Middleware
///
/// A [`TokenGuard`] turns a raw `Authorization` header into a validated
/// [`AuthenticatedUser`] or rejects it. [`JwtMiddleware`] runs a guard before
/// the wrapped route and injects the result into request extensions, where
/// handlers pick it up with `web::ReqData<AuthenticatedUser>`.

use std::rc::Rc;
use std::sync::Arc;

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::AUTHORIZATION,
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;

use crate::auth::{TokenIssuer, TokenKind};
use crate::error::{AppError, AuthError};

/// Identity established by a guard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: i64,
    /// The raw token that was presented
    pub token: String,
}

/// Request guard contract: validate the `Authorization` header value.
pub trait TokenGuard: Send + Sync {
    fn authenticate(&self, authorization: Option<&str>) -> Result<AuthenticatedUser, AuthError>;
}

/// Accepts `Bearer <jwt>` headers carrying a token of one kind
pub struct BearerGuard {
    issuer: Arc<TokenIssuer>,
    kind: TokenKind,
}

impl BearerGuard {
    pub fn new(issuer: Arc<TokenIssuer>, kind: TokenKind) -> Self {
        Self { issuer, kind }
    }
}

impl TokenGuard for BearerGuard {
    fn authenticate(&self, authorization: Option<&str>) -> Result<AuthenticatedUser, AuthError> {
        let token = authorization
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingToken)?;

        let claims = self.issuer.verify(token, self.kind)?;

        Ok(AuthenticatedUser {
            user_id: claims.sub,
            token: token.to_string(),
        })
    }
}

/// JWT middleware for protecting routes
pub struct JwtMiddleware {
    guard: Arc<dyn TokenGuard>,
}

impl JwtMiddleware {
    pub fn new(guard: Arc<dyn TokenGuard>) -> Self {
        Self { guard }
    }

    /// Require a valid access token
    pub fn access(issuer: Arc<TokenIssuer>) -> Self {
        Self::new(Arc::new(BearerGuard::new(issuer, TokenKind::Access)))
    }

    /// Require a valid refresh token
    pub fn refresh(issuer: Arc<TokenIssuer>) -> Self {
        Self::new(Arc::new(BearerGuard::new(issuer, TokenKind::Refresh)))
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = JwtMiddlewareService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(JwtMiddlewareService {
            service: Rc::new(service),
            guard: self.guard.clone(),
        }))
    }
}

pub struct JwtMiddlewareService<S> {
    service: Rc<S>,
    guard: Arc<dyn TokenGuard>,
}

impl<S, B> Service<ServiceRequest> for JwtMiddlewareService<S>
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
        let authorization = req
            .headers()
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        match self.guard.authenticate(authorization) {
            Ok(user) => {
                tracing::debug!(user_id = user.user_id, "JWT validated successfully");
                req.extensions_mut().insert(user);

                let service = self.service.clone();
                Box::pin(async move { service.call(req).await })
            }
            Err(e) => {
                tracing::warn!(path = %req.path(), "Request rejected by guard: {}", e);
                let err: Error = AppError::from(e).into();
                Box::pin(async move { Err(err) })
            }
        }
    }
}
