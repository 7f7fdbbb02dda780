//! Tactica engine library.
//!
//! Drives the reaction rules in `tactica-domain` from a host turn loop.
//!
//! ## Structure
//!
//! - `use_cases/` - Reaction scheduler, confirmation protocol, ability configurations
//! - `infrastructure/` - Port traits and in-memory adapters
//! - `app` - Application composition

pub mod app;
pub mod infrastructure;
pub mod use_cases;

pub use app::App;
