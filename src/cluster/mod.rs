//! Neighbor membership for the chat group.
pub mod membership;

pub use membership::Membership;
