//! Session-backed models for the storefront.

pub mod flash;
pub mod session;

pub use flash::{Flash, FlashKind};
pub use session::{CurrentAdmin, SessionState, keys};
