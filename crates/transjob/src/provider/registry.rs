use std::sync::Arc;

use uuid::Uuid;

use super::TranslationProvider;
use crate::error::JobError;

/// Providers known to the host, addressable by alias or key.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn TranslationProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a provider. Alias and key must both be unused.
    pub fn register(&mut self, provider: Arc<dyn TranslationProvider>) -> Result<(), JobError> {
        if let Some(existing) = self
            .providers
            .iter()
            .find(|p| p.alias() == provider.alias() || p.key() == provider.key())
        {
            return Err(JobError::Provider(format!(
                "provider '{}' ({}) clashes with registered provider '{}' ({})",
                provider.alias(),
                provider.key(),
                existing.alias(),
                existing.key()
            )));
        }

        log::info!(
            "Registered translation provider '{}' ({})",
            provider.alias(),
            provider.key()
        );
        self.providers.push(provider);
        Ok(())
    }

    pub fn with(mut self, provider: Arc<dyn TranslationProvider>) -> Result<Self, JobError> {
        self.register(provider)?;
        Ok(self)
    }

    pub fn by_alias(&self, alias: &str) -> Option<Arc<dyn TranslationProvider>> {
        self.providers
            .iter()
            .find(|p| p.alias().eq_ignore_ascii_case(alias))
            .cloned()
    }

    pub fn by_key(&self, key: Uuid) -> Option<Arc<dyn TranslationProvider>> {
        self.providers.iter().find(|p| p.key() == key).cloned()
    }

    /// Providers that can currently accept work.
    pub fn active(&self) -> Vec<Arc<dyn TranslationProvider>> {
        self.providers.iter().filter(|p| p.active()).cloned().collect()
    }

    pub fn all(&self) -> &[Arc<dyn TranslationProvider>] {
        &self.providers
    }

    pub fn reload_all(&self) {
        for provider in &self.providers {
            provider.reload();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{Attempt, ProviderViews};
    use crate::job::TranslationJob;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct Stub {
        alias: &'static str,
        key: Uuid,
        active: AtomicBool,
        reloads: AtomicUsize,
    }

    impl Stub {
        fn new(alias: &'static str, active: bool) -> Arc<Self> {
            Arc::new(Self {
                alias,
                key: Uuid::new_v4(),
                active: AtomicBool::new(active),
                reloads: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl TranslationProvider for Stub {
        fn name(&self) -> &str {
            self.alias
        }
        fn alias(&self) -> &str {
            self.alias
        }
        fn key(&self) -> Uuid {
            self.key
        }
        fn views(&self) -> ProviderViews {
            ProviderViews::default()
        }
        fn active(&self) -> bool {
            self.active.load(Ordering::SeqCst)
        }
        async fn submit(&self, job: TranslationJob) -> Attempt {
            Ok(job)
        }
        async fn check(&self, job: TranslationJob) -> Attempt {
            Ok(job)
        }
        fn reload(&self) {
            self.reloads.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_lookup_by_alias_and_key() {
        let a = Stub::new("alpha", true);
        let registry = ProviderRegistry::new().with(a.clone()).unwrap();

        assert_eq!(registry.by_alias("alpha").unwrap().key(), a.key);
        assert_eq!(registry.by_alias("ALPHA").unwrap().key(), a.key);
        assert_eq!(registry.by_key(a.key).unwrap().alias(), "alpha");
        assert!(registry.by_alias("beta").is_none());
        assert!(registry.by_key(Uuid::new_v4()).is_none());
    }

    #[test]
    fn test_active_filters_inactive() {
        let registry = ProviderRegistry::new()
            .with(Stub::new("alpha", true))
            .unwrap()
            .with(Stub::new("beta", false))
            .unwrap();

        let active: Vec<String> = registry
            .active()
            .iter()
            .map(|p| p.alias().to_string())
            .collect();
        assert_eq!(active, vec!["alpha".to_string()]);
        assert_eq!(registry.all().len(), 2);
    }

    #[test]
    fn test_duplicate_alias_rejected() {
        let mut registry = ProviderRegistry::new();
        registry.register(Stub::new("alpha", true)).unwrap();
        assert!(matches!(
            registry.register(Stub::new("alpha", true)),
            Err(JobError::Provider(_))
        ));
    }

    #[test]
    fn test_reload_all() {
        let a = Stub::new("alpha", true);
        let b = Stub::new("beta", true);
        let registry = ProviderRegistry::new()
            .with(a.clone())
            .unwrap()
            .with(b.clone())
            .unwrap();

        registry.reload_all();
        assert_eq!(a.reloads.load(Ordering::SeqCst), 1);
        assert_eq!(b.reloads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_default_target_languages_not_supported() {
        let stub = Stub::new("alpha", true);
        assert!(matches!(
            stub.target_languages("en-GB"),
            Err(JobError::NotSupported(_))
        ));
    }
}
