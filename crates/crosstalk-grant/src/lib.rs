//! Signed access grants for the Crosstalk platform
//!
//! A grant is the single trust handoff between a tenant's backend and an
//! untrusted browser client: a signed, time-bounded claim set tying
//! `(tenant, room, user, role)` to one signaling session. The envelope is
//! the familiar compact JWT shape (HS256), but the verifier pins the
//! algorithm rather than trusting the header.

pub mod claims;
pub mod error;
pub mod token;
pub mod ttl;

pub use claims::{GrantClaims, MAX_USER_ID_LEN};
pub use error::GrantError;
pub use token::{GrantSigner, IssuedGrant};
pub use ttl::parse_ttl;
