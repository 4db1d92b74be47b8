pub mod actor;
pub mod builder;
pub mod system;
pub mod verifier;

pub use verifier::{VerifierActor, VerifierMsg};
