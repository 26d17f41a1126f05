//! Auth-domain identifiers, token secrets, and the token owner contract.

pub mod id;
pub mod memory;
pub mod owner;
pub mod secret;

pub use id::*;
pub use memory::*;
pub use owner::*;
pub use secret::*;
