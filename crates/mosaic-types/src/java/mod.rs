//! Java-flavoured algorithms over the type model.
//!
//! Everything in here is a pure function of a [`crate::TypeEnv`] and owned [`crate::Type`] values:
//! nothing mutates the store, so callers can run speculative inference freely.

pub mod format;
pub mod helpers;
pub mod sam;
pub mod subtyping;
