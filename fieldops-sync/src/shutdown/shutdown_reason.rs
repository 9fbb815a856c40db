use crate::error_tracker::ErrorTracker;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownReason {
  /// Ctrl-C or an explicit call from the host.
  Requested,
  /// The local store kept rejecting writes.
  StoreFailure(ErrorTracker),
}
