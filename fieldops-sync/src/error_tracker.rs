/// Consecutive failures per background concern. A success clears the list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorTracker {
  pub probe: Vec<String>,
  pub store: Vec<String>,
}
