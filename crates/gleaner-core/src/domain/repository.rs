//! Configuration lookup trait.

use super::model::DomainConfig;
use crate::persona::PersonaConfig;

/// Read-only access to domain and persona configuration.
///
/// Configuration is loaded up front by the infrastructure layer; the core
/// never mutates it.
pub trait ConfigRepository: Send + Sync {
    /// Finds a domain configuration by name.
    fn domain(&self, name: &str) -> Option<DomainConfig>;

    /// Finds a persona configuration by name.
    fn persona(&self, name: &str) -> Option<PersonaConfig>;
}
