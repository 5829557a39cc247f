//! Persona domain module.
//!
//! - `model`: the immutable `Persona` record
//! - `preset`: built-in personas
//! - `registry`: the ordered, read-only catalog loaded at startup

mod model;
mod preset;
mod registry;

pub use model::Persona;
pub use preset::get_default_presets;
pub use registry::PersonaRegistry;
