//! Connection lifecycle: the session state machine, its event queue,
//! owned timers and the visibility-driven suspend/resume policy.

pub mod event;
pub mod lifecycle;
pub mod timer;
pub mod visibility;

pub use event::{EventSender, SessionEvent};
pub use lifecycle::{Session, SessionHandle};
pub use timer::TimerHandle;
pub use visibility::VisibilityController;
