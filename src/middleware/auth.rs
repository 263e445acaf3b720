use crate::core::{AppError, Caller, Role};
use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage,
};
use argon2::{Argon2, PasswordHash, PasswordVerifier};
use futures_util::future::LocalBoxFuture;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::future::{ready, Ready};
use std::rc::Rc;
use std::sync::Arc;

type HmacSha256 = Hmac<Sha256>;

pub const USER_ID_HEADER: &str = "X-User-Id";
pub const USER_ROLE_HEADER: &str = "X-User-Role";
pub const IDENTITY_SIGNATURE_HEADER: &str = "X-Identity-Signature";
pub const SERVICE_KEY_HEADER: &str = "X-Service-Key";

/// Hex HMAC-SHA256 of `"{user_id}:{role}"`, as attached by the upstream gateway
pub fn sign_identity(secret: &[u8], user_id: &str, role: &str) -> crate::core::Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| AppError::Configuration(format!("Invalid identity secret: {}", e)))?;
    mac.update(format!("{}:{}", user_id, role).as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time check of a forwarded identity signature
pub fn verify_identity(secret: &[u8], user_id: &str, role: &str, signature: &str) -> bool {
    let Ok(expected) = hex::decode(signature) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(format!("{}:{}", user_id, role).as_bytes());
    mac.verify_slice(&expected).is_ok()
}

fn header<'a>(req: &'a ServiceRequest, name: &str) -> Option<&'a str> {
    req.headers()
        .get(name)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Resolve the caller from the signed identity headers
fn authenticate(req: &ServiceRequest, secret: &[u8]) -> crate::core::Result<Caller> {
    let user_id = header(req, USER_ID_HEADER)
        .ok_or_else(|| AppError::unauthorized("Missing X-User-Id header"))?;
    let role = header(req, USER_ROLE_HEADER)
        .ok_or_else(|| AppError::unauthorized("Missing X-User-Role header"))?;
    let signature = header(req, IDENTITY_SIGNATURE_HEADER)
        .ok_or_else(|| AppError::unauthorized("Missing X-Identity-Signature header"))?;

    if !verify_identity(secret, user_id, role, signature) {
        return Err(AppError::unauthorized("Invalid identity signature"));
    }

    let role: Role = role.parse().map_err(AppError::unauthorized)?;

    Ok(Caller::new(user_id, role))
}

/// Identity middleware for the public API.
///
/// Stores the verified [`Caller`] in request extensions; handlers take `web::ReqData<Caller>`.
pub struct IdentityAuth {
    secret: Arc<Vec<u8>>,
}

impl IdentityAuth {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: Arc::new(secret.into()),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for IdentityAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = IdentityAuthMiddleware<S>;
    type Future = Ready<std::result::Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(IdentityAuthMiddleware {
            service: Rc::new(service),
            secret: self.secret.clone(),
        }))
    }
}

pub struct IdentityAuthMiddleware<S> {
    service: Rc<S>,
    secret: Arc<Vec<u8>>,
}

impl<S, B> Service<ServiceRequest> for IdentityAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, std::result::Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let svc = self.service.clone();
        let secret = self.secret.clone();

        Box::pin(async move {
            let caller = match authenticate(&req, &secret) {
                Ok(caller) => caller,
                Err(e) => {
                    tracing::warn!(path = %req.path(), error = %e, "Rejected unauthenticated request");
                    return Err(Error::from(e));
                }
            };

            tracing::debug!(caller_id = %caller.id, role = %caller.role, "Caller authenticated");
            req.extensions_mut().insert(caller);

            svc.call(req).await
        })
    }
}

/// Service-key middleware for the internal API.
///
/// The key is compared against an Argon2 hash; verified callers act as [`Role::System`].
pub struct ServiceKeyAuth {
    key_hash: Arc<String>,
}

impl ServiceKeyAuth {
    pub fn new(key_hash: impl Into<String>) -> Self {
        Self {
            key_hash: Arc::new(key_hash.into()),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for ServiceKeyAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = ServiceKeyAuthMiddleware<S>;
    type Future = Ready<std::result::Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(ServiceKeyAuthMiddleware {
            service: Rc::new(service),
            key_hash: self.key_hash.clone(),
        }))
    }
}

pub struct ServiceKeyAuthMiddleware<S> {
    service: Rc<S>,
    key_hash: Arc<String>,
}

impl<S, B> Service<ServiceRequest> for ServiceKeyAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, std::result::Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let svc = self.service.clone();
        let key_hash = self.key_hash.clone();

        Box::pin(async move {
            let service_key = header(&req, SERVICE_KEY_HEADER).ok_or_else(|| {
                Error::from(AppError::unauthorized("Missing X-Service-Key header"))
            })?;

            if !verify_api_key(service_key, &key_hash).map_err(Error::from)? {
                tracing::warn!(path = %req.path(), "Rejected internal request with invalid service key");
                return Err(Error::from(AppError::unauthorized("Invalid service key")));
            }

            req.extensions_mut().insert(Caller::system());

            svc.call(req).await
        })
    }
}

/// Helper function to hash API keys using Argon2
pub fn hash_api_key(api_key: &str) -> crate::core::Result<String> {
    use argon2::password_hash::{rand_core::OsRng, PasswordHasher, SaltString};

    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(api_key.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::internal(format!("Failed to hash API key: {}", e)))
}

/// Helper function to verify API keys using Argon2
pub fn verify_api_key(api_key: &str, hash: &str) -> crate::core::Result<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AppError::Configuration(format!("Invalid service key hash: {}", e)))?;

    Ok(Argon2::default()
        .verify_password(api_key.as_bytes(), &parsed_hash)
        .is_ok())
}
