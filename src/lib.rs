pub mod amount;
pub mod config;
pub mod console;
pub mod csv;
pub mod model;
pub mod session;
pub mod transport;

pub use amount::Amount;
pub use console::{Console, ConsoleError, Dispatch};
pub use model::{CollectionKind, MutationKind, PendingKind, Record, RecordId, Role, Target};
pub use session::{Session, SessionStore};
