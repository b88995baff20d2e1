//! Deferred completion for [`Jwt`].
//!
//! The `*_async` futures yield to the scheduler before doing any work and
//! the `*_then` variants run the callback from a spawned task, so a result
//! is never delivered inside the call that asked for it.  Both need a tokio
//! runtime; a current-thread runtime is enough.

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::claims::Claims;
use crate::error::JwtError;
use crate::schema::{SignOptions, VerifyOptions};
use crate::token::Jwt;

impl Jwt {
    /// [`sign`](Self::sign), completing on a later scheduler turn.
    pub async fn sign_async(&self, options: SignOptions) -> Result<String, JwtError> {
        tokio::task::yield_now().await;
        self.sign(&options)
    }

    /// [`verify_claims`](Self::verify_claims), completing on a later
    /// scheduler turn.
    pub async fn verify_async(&self, options: VerifyOptions) -> Result<Claims, JwtError> {
        tokio::task::yield_now().await;
        self.verify_claims(&options)
    }

    /// Sign on a spawned task and hand the result to `on_complete`.
    ///
    /// Outside a tokio runtime nothing is spawned, `on_complete` is dropped
    /// uncalled and the error is [`JwtError::Config`].
    ///
    /// ```rust,no_run
    /// use jwt_timeclaims::{Jwt, SignOptions};
    ///
    /// # async fn example(pem: String) {
    /// let handle = Jwt::default().sign_then(
    ///     SignOptions::new(pem).claim("exp", "1d"),
    ///     |result| match result {
    ///         Ok(token) => println!("{token}"),
    ///         Err(e) => eprintln!("{e}"),
    ///     },
    /// );
    /// handle.unwrap().await.unwrap();
    /// # }
    /// ```
    pub fn sign_then<F>(&self, options: SignOptions, on_complete: F) -> Result<JoinHandle<()>, JwtError>
    where
        F: FnOnce(Result<String, JwtError>) + Send + 'static,
    {
        let runtime = current_runtime()?;
        let jwt = self.clone();
        Ok(runtime.spawn(async move { on_complete(jwt.sign_async(options).await) }))
    }

    /// Verify on a spawned task and hand the result to `on_complete`.
    ///
    /// Same runtime requirement as [`sign_then`](Self::sign_then).
    pub fn verify_then<F>(&self, options: VerifyOptions, on_complete: F) -> Result<JoinHandle<()>, JwtError>
    where
        F: FnOnce(Result<Claims, JwtError>) + Send + 'static,
    {
        let runtime = current_runtime()?;
        let jwt = self.clone();
        Ok(runtime.spawn(async move { on_complete(jwt.verify_async(options).await) }))
    }
}

fn current_runtime() -> Result<Handle, JwtError> {
    Handle::try_current().map_err(|e| {
        tracing::debug!(error = %e, "deferred call made outside a tokio runtime");
        JwtError::Config(format!("no tokio runtime: {e}"))
    })
}
