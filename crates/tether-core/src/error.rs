//! Error types for `tether-core`.

use thiserror::Error;

/// Failure of a single identity resolution.
///
/// Store failures propagate unchanged; the core never swallows them.
#[derive(Debug, Error)]
pub enum ResolveError<E>
where
  E: std::error::Error + Send + Sync + 'static,
{
  /// The submission carried neither an email nor a phone number.
  ///
  /// The HTTP boundary rejects this before the core runs; the check is
  /// repeated here so the algorithm never operates on an empty seed.
  #[error("either email or phoneNumber must be provided")]
  MissingIdentifiers,

  #[error("store error: {0}")]
  Store(#[source] E),
}
