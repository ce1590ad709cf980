//! Off-path delivery of a message to a single watcher.
//!
//! [`DeliveryScheduler::notify_async`] returns immediately with a
//! [`Delivery`] handle; the watcher's `receive` runs on tokio's blocking pool
//! (transports may block on I/O). The scheduler never touches catalog state.

use std::{
  future::Future,
  pin::Pin,
  sync::Arc,
  task::{Context, Poll},
  time::Duration,
};

use tokio::{
  runtime::Handle,
  task::{JoinError, JoinHandle},
};

use crate::{Error, Result, id::PersonId, notify::Watcher};

// ─── Scheduler ───────────────────────────────────────────────────────────────

/// Spawns deliveries onto a tokio runtime.
#[derive(Debug, Clone)]
pub struct DeliveryScheduler {
  runtime: Handle,
  latency: Duration,
}

impl DeliveryScheduler {
  pub fn new(runtime: Handle) -> Self {
    Self {
      runtime,
      latency: Duration::ZERO,
    }
  }

  /// Wait `latency` before each delivery. Stands in for transport latency.
  pub fn with_latency(mut self, latency: Duration) -> Self {
    self.latency = latency;
    self
  }

  pub fn latency(&self) -> Duration { self.latency }

  /// Deliver `message` to `watcher` without blocking the caller.
  ///
  /// How the message is presented (plain attendee vs. organizer) is up to the
  /// watcher. Dropping the returned handle does not cancel the delivery.
  pub fn notify_async(
    &self,
    watcher: Arc<dyn Watcher>,
    message: impl Into<String>,
  ) -> Delivery {
    let message = message.into();
    let recipient = watcher.id();
    let latency = self.latency;

    tracing::debug!(%recipient, ?latency, "scheduling delivery");
    let task = self.runtime.spawn(async move {
      if !latency.is_zero() {
        tokio::time::sleep(latency).await;
      }
      tokio::task::spawn_blocking(move || watcher.receive(&message)).await
    });

    Delivery { recipient, task }
  }
}

// ─── Handle ──────────────────────────────────────────────────────────────────

/// Completes once the watcher's `receive` has returned.
///
/// Resolves to [`Error::DeliveryFailed`] if the watcher panicked or the task
/// was aborted before delivery started.
#[derive(Debug)]
pub struct Delivery {
  recipient: PersonId,
  task:      JoinHandle<Result<(), JoinError>>,
}

impl Delivery {
  pub fn recipient(&self) -> PersonId { self.recipient }

  pub fn is_finished(&self) -> bool { self.task.is_finished() }

  /// Best effort: a delivery already handed to the watcher still completes.
  pub fn abort(&self) { self.task.abort(); }
}

impl Future for Delivery {
  type Output = Result<()>;

  fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
    let recipient = self.recipient;
    Pin::new(&mut self.task).poll(cx).map(|joined| match joined {
      Ok(Ok(())) => Ok(()),
      Ok(Err(e)) | Err(e) => {
        tracing::warn!(%recipient, error = %e, "delivery failed");
        Err(Error::DeliveryFailed(format!("to {recipient}: {e}")))
      }
    })
  }
}

#[cfg(test)]
mod tests {
  use std::{sync::mpsc, time::Instant};

  use parking_lot::Mutex;

  use super::*;
  use crate::{
    notify::test_helpers::Recorder,
    person::{Attendee, Organizer, Person, Priority, test_helpers::Outbox},
  };

  fn scheduler() -> DeliveryScheduler { DeliveryScheduler::new(Handle::current()) }

  #[tokio::test]
  async fn delivers_to_the_watcher() {
    let w = Recorder::new();
    let delivery = scheduler().notify_async(w.clone(), "hello");
    assert_eq!(delivery.recipient(), w.id);

    delivery.await.unwrap();
    assert_eq!(w.messages(), vec!["hello".to_string()]);
  }

  #[tokio::test]
  async fn formatting_follows_the_watcher_role() {
    let outbox = Arc::new(Outbox::default());
    let ann = Attendee::new(Person::new("Ann", "ann@x"), outbox.clone());
    let olga = Organizer::new(Person::new("Olga", "olga@x"), outbox.clone());

    let s = scheduler();
    s.notify_async(ann, "doors open").await.unwrap();
    s.notify_async(olga, "doors open").await.unwrap();

    let sent = outbox.sent.lock();
    assert_eq!(sent[0].1.priority, Priority::Normal);
    assert_eq!(sent[1].1.priority, Priority::High);
    assert!(sent[1].1.body.starts_with("PRIORITY"));
  }

  /// Blocks in `receive` until the test opens the gate.
  struct Gated {
    id:   PersonId,
    gate: Mutex<mpsc::Receiver<()>>,
    done: Mutex<bool>,
  }

  impl Watcher for Gated {
    fn id(&self) -> PersonId { self.id }

    fn receive(&self, _message: &str) {
      let _ = self.gate.lock().recv();
      *self.done.lock() = true;
    }
  }

  #[tokio::test]
  async fn caller_is_not_blocked() {
    let (open, gate) = mpsc::channel();
    let w = Arc::new(Gated {
      id:   PersonId::generate(),
      gate: Mutex::new(gate),
      done: Mutex::new(false),
    });

    let delivery = scheduler().notify_async(w.clone(), "slow");
    assert!(!*w.done.lock());

    open.send(()).unwrap();
    delivery.await.unwrap();
    assert!(*w.done.lock());
  }

  #[tokio::test]
  async fn latency_delays_delivery() {
    let w = Recorder::new();
    let s = scheduler().with_latency(Duration::from_millis(30));
    assert_eq!(s.latency(), Duration::from_millis(30));

    let started = Instant::now();
    s.notify_async(w.clone(), "late").await.unwrap();
    assert!(started.elapsed() >= Duration::from_millis(30));
    assert_eq!(w.messages().len(), 1);
  }

  struct Panicky(PersonId);

  impl Watcher for Panicky {
    fn id(&self) -> PersonId { self.0 }

    fn receive(&self, _message: &str) { panic!("transport down") }
  }

  #[tokio::test]
  async fn panicking_watcher_surfaces_as_delivery_failed() {
    let err = scheduler()
      .notify_async(Arc::new(Panicky(PersonId::generate())), "boom")
      .await
      .unwrap_err();
    assert!(matches!(err, Error::DeliveryFailed(_)));
  }
}
