use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::StreamConfig;
use crate::session::SessionHandle;

/// Translates host visibility callbacks into suspend/resume events.
///
/// The `background` flag bypasses every suspension path; `visibility_check`
/// gates page-visibility handling; a zero `visibility_threshold` disables
/// viewport-based suspension entirely. Resume paths only fire while the
/// widget is attached.
#[derive(Debug)]
pub struct VisibilityController {
    background: bool,
    visibility_check: bool,
    threshold: f32,
    attached: AtomicBool,
    handle: SessionHandle,
}

impl VisibilityController {
    pub fn new(config: &StreamConfig, handle: SessionHandle) -> Self {
        Self {
            background: config.background,
            visibility_check: config.visibility_check,
            threshold: config.visibility_threshold,
            attached: AtomicBool::new(false),
            handle,
        }
    }

    /// Widget attached to the host surface.
    pub fn attached(&self) {
        self.attached.store(true, Ordering::Relaxed);
        self.handle.resume();
    }

    /// Widget detached. Transient: teardown only happens if the grace
    /// timer expires un-cancelled.
    pub fn detached(&self) {
        self.attached.store(false, Ordering::Relaxed);
        if !self.background {
            self.handle.suspend();
        }
    }

    pub fn page_hidden(&self) {
        if !self.background && self.visibility_check {
            self.handle.suspend();
        }
    }

    pub fn page_visible(&self) {
        if !self.background && self.visibility_check && self.attached.load(Ordering::Relaxed) {
            self.handle.resume();
        }
    }

    /// Viewport intersection ratio changed.
    pub fn intersection(&self, ratio: f32) {
        if self.background || self.threshold <= 0.0 {
            return;
        }
        if ratio >= self.threshold {
            if self.attached.load(Ordering::Relaxed) {
                self.handle.resume();
            }
        } else {
            self.handle.suspend();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionEvent;

    fn controller(config: StreamConfig) -> (VisibilityController, tokio::sync::mpsc::UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        (
            VisibilityController::new(&config, SessionHandle::new(tx)),
            rx,
        )
    }

    #[tokio::test]
    async fn test_attach_detach_cycle() {
        let (ctl, mut rx) = controller(StreamConfig::default());
        ctl.attached();
        assert!(matches!(rx.try_recv(), Ok(SessionEvent::Resume)));
        ctl.detached();
        assert!(matches!(rx.try_recv(), Ok(SessionEvent::Suspend)));
    }

    #[tokio::test]
    async fn test_background_bypasses_suspension() {
        let (ctl, mut rx) = controller(StreamConfig::unattended());
        ctl.attached();
        assert!(matches!(rx.try_recv(), Ok(SessionEvent::Resume)));
        ctl.detached();
        ctl.page_hidden();
        ctl.intersection(0.0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_page_visibility_requires_attachment() {
        let (ctl, mut rx) = controller(StreamConfig::default());
        ctl.page_visible();
        assert!(rx.try_recv().is_err());

        ctl.attached();
        let _ = rx.try_recv();
        ctl.page_hidden();
        assert!(matches!(rx.try_recv(), Ok(SessionEvent::Suspend)));
        ctl.page_visible();
        assert!(matches!(rx.try_recv(), Ok(SessionEvent::Resume)));
    }

    #[tokio::test]
    async fn test_zero_threshold_disables_viewport_suspension() {
        let (ctl, mut rx) = controller(StreamConfig::default());
        ctl.attached();
        let _ = rx.try_recv();
        ctl.intersection(0.0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_threshold_crossings() {
        let config = StreamConfig {
            visibility_threshold: 0.5,
            ..StreamConfig::default()
        };
        let (ctl, mut rx) = controller(config);
        ctl.attached();
        let _ = rx.try_recv();

        ctl.intersection(0.2);
        assert!(matches!(rx.try_recv(), Ok(SessionEvent::Suspend)));
        ctl.intersection(0.8);
        assert!(matches!(rx.try_recv(), Ok(SessionEvent::Resume)));
    }
}
