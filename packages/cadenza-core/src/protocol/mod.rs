//! Wire protocol: request rendering, reply parsing and connections.

pub mod address;
pub mod command;
pub mod connection;
pub mod response;
pub mod tag;
pub mod traits;

pub use address::ServerAddress;
pub use command::Command;
pub use connection::{MpdConnection, MpdConnector, Transport};
pub use response::{AckError, AckKind, Response};
pub use tag::Tag;
pub use traits::{Connection, Connector};
