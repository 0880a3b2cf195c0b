use std::time::Duration;

use tokio::task::JoinHandle;

use crate::session::{EventSender, SessionEvent};

/// Owned, cancellable one-shot timer.
///
/// A session holds exactly one of these per timer role; `arm` always
/// cancels the previous instance first, so at most one is ever
/// outstanding.
#[derive(Debug, Default)]
pub struct TimerHandle {
    task: Option<JoinHandle<()>>,
}

impl TimerHandle {
    pub fn idle() -> Self {
        Self::default()
    }

    /// True while a scheduled timer has neither fired nor been cancelled.
    pub fn is_armed(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Cancel-then-schedule: after `delay`, `event` is posted to the
    /// session queue.
    pub fn arm(&mut self, delay: Duration, events: EventSender, event: SessionEvent) {
        self.cancel();
        self.task = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(event);
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test(start_paused = true)]
    async fn test_armed_timer_fires_once() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timer = TimerHandle::idle();
        timer.arm(Duration::from_millis(800), tx, SessionEvent::ReconnectElapsed);
        assert!(timer.is_armed());

        tokio::time::sleep(Duration::from_millis(801)).await;
        assert!(matches!(rx.try_recv(), Ok(SessionEvent::ReconnectElapsed)));
        assert!(rx.try_recv().is_err());
        assert!(!timer.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_fire() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timer = TimerHandle::idle();
        timer.arm(Duration::from_millis(100), tx, SessionEvent::DisconnectElapsed);
        timer.cancel();
        assert!(!timer.is_armed());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_replaces_previous() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timer = TimerHandle::idle();
        timer.arm(
            Duration::from_millis(100),
            tx.clone(),
            SessionEvent::ReconnectElapsed,
        );
        timer.arm(Duration::from_millis(500), tx, SessionEvent::ReconnectElapsed);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(matches!(rx.try_recv(), Ok(SessionEvent::ReconnectElapsed)));
        assert!(rx.try_recv().is_err());
    }
}
