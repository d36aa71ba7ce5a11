//! Server-side sessions
//!
//! - [`TokenCodec`] signs a session id into the opaque cookie value
//! - [`SessionStore`] keeps records in the key-value backend with sliding expiry
//! - [`SessionManager`] ties the two together for login, authentication and logout

mod manager;
mod record;
mod store;
mod token;

pub use manager::SessionManager;
pub use record::{SessionRecord, UserData};
pub use store::SessionStore;
pub use token::{DecodeError, TokenCodec};
