pub mod clock;
pub mod input;
pub mod result;
pub mod state;

pub use input::Key;
pub use result::SessionMetrics;
pub use state::{FinishReason, LiveSnapshot, Session, SessionStatus};
