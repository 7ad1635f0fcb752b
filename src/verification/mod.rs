pub mod record;
pub mod session;

pub use record::{ParsedIdentity, VerificationRecord, VerificationStep};
pub use session::{SessionScope, VerificationSession, SESSION_KEY};
