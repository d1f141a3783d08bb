mod error;
mod functions;
mod signing;
mod traits;
mod types;

pub use error::SessionError;
pub use functions::{generate_session_id, is_expired};
pub use signing::{decode_payload, encode_payload, sign, unsign};
pub use traits::{Result, SessionRepository};
pub use types::{Session, SessionId, SessionValues};
