//! Persona configuration module.

mod model;

pub use model::{Formality, PersonaConfig};
