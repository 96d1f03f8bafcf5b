//! Callback-style handler adapter.
//!
//! For handlers that take an invocation context and report failure as a
//! plain string rather than an HTTP response.

use crate::auth::{TokenValidator, VerifiedIdentity};
use crate::config::ValidationConfig;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

/// Everything a callback-style handler is invoked with.
#[derive(Debug, Clone, Default)]
pub struct InvocationContext {
    /// Trusted settings; `AUTH0_DOMAIN` and `AUTH0_AUDIENCE` are read from here.
    pub secrets: HashMap<String, String>,

    /// Request headers with lowercase names.
    pub headers: HashMap<String, String>,

    /// Set once the bearer token has been validated.
    pub user: Option<VerifiedIdentity>,
}

impl InvocationContext {
    pub fn new(secrets: HashMap<String, String>, headers: HashMap<String, String>) -> Self {
        Self {
            secrets,
            headers,
            user: None,
        }
    }
}

/// Runs a handler only after the context's bearer token validates.
pub struct CallbackAdapter<F> {
    validator: Arc<TokenValidator>,
    handler: F,
}

impl<F, Fut, T> CallbackAdapter<F>
where
    F: Fn(InvocationContext) -> Fut,
    Fut: Future<Output = Result<T, String>>,
{
    pub fn new(validator: Arc<TokenValidator>, handler: F) -> Self {
        Self { validator, handler }
    }

    /// Validate and, on success, invoke the handler with `ctx.user` set.
    ///
    /// # Errors
    ///
    /// On validation failure the handler is not called and the error is
    /// `"{error}: {error_description}"`. Handler errors pass through as-is.
    pub async fn invoke(&self, mut ctx: InvocationContext) -> Result<T, String> {
        let config = ValidationConfig::from_secrets(&ctx.secrets);

        let identity = self
            .validator
            .validate(&config, &ctx.headers)
            .await
            .map_err(|err| err.to_string())?;

        ctx.user = Some(identity);
        (self.handler)(ctx).await
    }
}
