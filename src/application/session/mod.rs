pub mod connection;
pub mod registry;

pub use connection::{Connection, Outbound, SessionInfo};
pub use registry::{RegisterResult, SessionError, SessionRegistry, SharedSessionRegistry};
