use std::{sync::Arc, time::Duration};

use futures_util::future::BoxFuture;
use tokio::{
  sync::{oneshot, Mutex},
  time::timeout,
};
use tracing::{info, warn};

/// How long one teardown step may run before shutdown moves on without it.
pub const DEFAULT_TEARDOWN_DEADLINE: Duration = Duration::from_secs(5);

type Teardown = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send + Sync>;

struct TeardownStep {
  name: String,
  run: Teardown,
}

/// What happened to the registered steps, in the order they ran.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeardownSummary {
  pub completed: Vec<String>,
  /// Steps dropped at the deadline. Whatever they spawned keeps running
  /// detached.
  pub abandoned: Vec<String>,
}

pub struct ShutdownManager<A> {
  pub shutdown: Arc<Shutdown<A>>,
  receiver: oneshot::Receiver<A>,
}

impl<A> ShutdownManager<A> {
  pub fn new() -> Self {
    Self::with_deadline(DEFAULT_TEARDOWN_DEADLINE)
  }

  pub fn with_deadline(deadline: Duration) -> Self {
    let (sender, receiver) = oneshot::channel();
    let shutdown = Arc::new(Shutdown {
      sender: Mutex::new(Some(sender)),
      steps: Mutex::new(Vec::new()),
      deadline,
    });

    Self { shutdown, receiver }
  }

  pub async fn await_shutdown(self) -> Result<A, oneshot::error::RecvError> {
    self.receiver.await
  }
}

impl<A> Default for ShutdownManager<A> {
  fn default() -> Self {
    Self::new()
  }
}

pub struct Shutdown<A> {
  sender: Mutex<Option<oneshot::Sender<A>>>,
  steps: Mutex<Vec<TeardownStep>>,
  deadline: Duration,
}

impl<A> Shutdown<A> {
  pub async fn register_shutdown_task<F>(&self, task: F, description: impl Into<String>)
  where
    F: FnOnce() -> BoxFuture<'static, ()> + Send + Sync + 'static,
  {
    self.steps.lock().await.push(TeardownStep {
      name: description.into(),
      run: Box::new(task),
    });
  }

  /// Runs the registered steps newest first, each bounded by the deadline,
  /// then hands `value` to whoever awaits the manager. Only the first call
  /// does anything; later ones return `None` right away.
  pub async fn trigger(&self, value: A) -> Option<TeardownSummary> {
    let sender = self.sender.lock().await.take()?;
    info!("Triggering shutdown");

    let steps = std::mem::take(&mut *self.steps.lock().await);
    let total = steps.len();
    let mut summary = TeardownSummary::default();

    for (index, step) in steps.into_iter().rev().enumerate() {
      info!("[{}/{}] Tearing down {}", index + 1, total, step.name);

      match timeout(self.deadline, (step.run)()).await {
        Ok(()) => {
          info!("[{}/{}] {} stopped", index + 1, total, step.name);
          summary.completed.push(step.name);
        }
        Err(_) => {
          warn!(
            "[{}/{}] {} did not stop within {:?}, abandoning it",
            index + 1,
            total,
            step.name,
            self.deadline
          );
          summary.abandoned.push(step.name);
        }
      }
    }

    if sender.send(value).is_ok() {
      info!("Shutdown reason delivered");
    } else {
      warn!("Nobody is waiting for the shutdown reason");
    }

    Some(summary)
  }

  pub async fn is_triggered(&self) -> bool {
    self.sender.lock().await.is_none()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::Mutex as StdMutex;

  #[tokio::test]
  async fn test_steps_run_newest_first_and_once() {
    let manager: ShutdownManager<&'static str> = ShutdownManager::new();
    let order = Arc::new(StdMutex::new(Vec::new()));

    for name in ["first", "second", "third"] {
      let order = order.clone();
      manager
        .shutdown
        .register_shutdown_task(
          move || {
            Box::pin(async move {
              order.lock().unwrap().push(name);
            })
          },
          name,
        )
        .await;
    }

    let shutdown = manager.shutdown.clone();
    assert!(!shutdown.is_triggered().await);

    let summary = shutdown.trigger("bye").await.unwrap();
    assert_eq!(shutdown.trigger("again").await, None);

    assert!(shutdown.is_triggered().await);
    assert_eq!(*order.lock().unwrap(), vec!["third", "second", "first"]);
    assert_eq!(summary.completed, vec!["third", "second", "first"]);
    assert!(summary.abandoned.is_empty());
    assert_eq!(manager.await_shutdown().await.unwrap(), "bye");
  }

  #[tokio::test(start_paused = true)]
  async fn test_stuck_step_is_abandoned_at_the_deadline() {
    let manager: ShutdownManager<&'static str> = ShutdownManager::with_deadline(Duration::from_secs(2));
    let flushed = Arc::new(StdMutex::new(false));

    let flag = flushed.clone();
    manager
      .shutdown
      .register_shutdown_task(
        move || {
          Box::pin(async move {
            *flag.lock().unwrap() = true;
          })
        },
        "flush logs",
      )
      .await;
    manager
      .shutdown
      .register_shutdown_task(|| Box::pin(std::future::pending::<()>()), "wedged upload")
      .await;

    let started = tokio::time::Instant::now();
    let summary = manager.shutdown.trigger("done").await.unwrap();

    assert!(started.elapsed() >= Duration::from_secs(2));
    assert_eq!(summary.abandoned, vec!["wedged upload"]);
    assert_eq!(summary.completed, vec!["flush logs"]);
    assert!(*flushed.lock().unwrap());
    assert_eq!(manager.await_shutdown().await.unwrap(), "done");
  }
}
