//! Plugin-based provider registry
//!
//! The registry allows DNS providers to be registered dynamically at runtime,
//! avoiding hardcoded if-else chains over backend types.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dnssync_core::registry::ProviderRegistry;
//!
//! // Built-in backends (memory, file)
//! let registry = ProviderRegistry::with_builtin();
//!
//! // Backends living in other crates register themselves
//! dnssync_provider_cloudflare::register(&registry);
//!
//! // Create provider from config
//! let provider = registry.create_provider(&zone.source.provider)?;
//! ```

use crate::backends::{FileProviderFactory, MemoryProviderFactory};
use crate::config::ProviderConfig;
use crate::error::{Error, Result};
use crate::traits::{DnsProvider, DnsProviderFactory};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Provider registry for plugin-based DNS provider creation
///
/// The registry maintains a map of provider type names to factory objects,
/// allowing dynamic instantiation of providers based on configuration.
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct ProviderRegistry {
    /// Registered DNS provider factories
    providers: RwLock<HashMap<String, Box<dyn DnsProviderFactory>>>,
}

impl ProviderRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the `memory` and `file` backends already registered
    pub fn with_builtin() -> Self {
        let registry = Self::new();
        registry.register_provider("memory", Box::new(MemoryProviderFactory));
        registry.register_provider("file", Box::new(FileProviderFactory));
        registry
    }

    /// Register a DNS provider factory
    ///
    /// Registering a name twice replaces the earlier factory.
    ///
    /// # Parameters
    ///
    /// - `name`: Provider type name (e.g., "cloudflare", "file")
    /// - `factory`: Factory object for creating provider instances
    pub fn register_provider(&self, name: impl Into<String>, factory: Box<dyn DnsProviderFactory>) {
        let name = name.into();
        let mut providers = self.providers.write().unwrap_or_else(PoisonError::into_inner);
        providers.insert(name, factory);
    }

    /// Create a DNS provider from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn DnsProvider>)`: Created provider instance
    /// - `Err(Error)`: If provider type is not registered or creation fails
    pub fn create_provider(&self, config: &ProviderConfig) -> Result<Box<dyn DnsProvider>> {
        let provider_type = config.type_name();
        let providers = self.providers.read().unwrap_or_else(PoisonError::into_inner);

        let factory = providers
            .get(provider_type)
            .ok_or_else(|| Error::config(format!("Unknown provider type: {}", provider_type)))?;

        factory.create(config)
    }

    /// List all registered provider types
    pub fn list_providers(&self) -> Vec<String> {
        let providers = self.providers.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = providers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Check if a provider type is registered
    pub fn has_provider(&self, name: &str) -> bool {
        let providers = self.providers.read().unwrap_or_else(PoisonError::into_inner);
        providers.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockProviderFactory;

    impl DnsProviderFactory for MockProviderFactory {
        fn create(&self, _config: &ProviderConfig) -> Result<Box<dyn DnsProvider>> {
            Err(Error::not_found("Mock provider not implemented"))
        }
    }

    #[test]
    fn test_registry_registration() {
        let registry = ProviderRegistry::new();

        // Initially empty
        assert!(!registry.has_provider("mock"));

        // Register
        registry.register_provider("mock", Box::new(MockProviderFactory));

        // Now present
        assert!(registry.has_provider("mock"));
        assert!(registry.list_providers().contains(&"mock".to_string()));
    }

    #[test]
    fn builtin_backends_are_registered() {
        let registry = ProviderRegistry::with_builtin();
        assert_eq!(registry.list_providers(), vec!["file", "memory"]);

        let provider = registry.create_provider(&ProviderConfig::memory()).unwrap();
        assert_eq!(provider.provider_name(), "memory");
    }

    #[test]
    fn unknown_type_is_a_config_error() {
        let registry = ProviderRegistry::new();
        let err = registry
            .create_provider(&ProviderConfig::Custom {
                factory: "route53".to_string(),
                config: serde_json::json!({}),
            })
            .err()
            .unwrap();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("route53"));
    }
}
