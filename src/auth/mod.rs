pub mod credentials;
pub mod guard;
pub mod session;

pub use credentials::{CredentialStore, DynCredentialStore, MemoryCredentialStore, SqliteCredentialStore, StoredCredentials};
pub use guard::{Decision, DenyReason, Denial, Navigation, NavigationGuard};
pub use session::{Session, SessionManager};
