//! The court: advocates, arbiter, scribe, and the loop that drives them.

pub mod arbiter;
pub mod controller;
pub mod finalizer;
pub mod researcher;
pub mod state;

pub use controller::DeliberationController;
pub use researcher::{Brief, ResearchPolicy};
pub use state::IllegalTransition;
