//! Completion-handler adapter.
//!
//! Every driver operation returns a future. Callers that prefer a callback
//! can route an operation through [`complete`]: the handler sees the outcome
//! once, and the same outcome is still returned to the awaiting caller.
//!
//! ```rust
//! use strata::adapter::complete;
//! use strata::MigrateResult;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let outcome: MigrateResult<u64> = complete(async { Ok(3) }, Some(|r: &MigrateResult<u64>| {
//!     assert!(r.is_ok());
//! }))
//! .await;
//! assert_eq!(outcome.unwrap(), 3);
//! # }
//! ```

use std::future::Future;

/// Await `future`, hand its outcome to `handler` if one is given, and return it.
pub async fn complete<T, E, F, H>(future: F, handler: Option<H>) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    H: FnOnce(&Result<T, E>),
{
    let outcome = future.await;
    if let Some(handler) = handler {
        handler(&outcome);
    }
    outcome
}

/// [`complete`] without a handler.
pub async fn complete_silently<T, E, F>(future: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
{
    complete(future, None::<fn(&Result<T, E>)>).await
}
