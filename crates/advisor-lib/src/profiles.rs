//! Profile lookup and provider resolution

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{AdvisorError, Result};
use crate::models::CloudProfile;
use crate::provider::{CloudProvider, ProviderFactory};

/// Source of cloud profiles, keyed by profile id.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn profiles(&self) -> Result<HashMap<String, CloudProfile>>;
}

/// Profiles fixed at startup, typically from the configuration file.
#[derive(Debug, Default, Clone)]
pub struct StaticProfileStore {
    profiles: HashMap<String, CloudProfile>,
}

impl StaticProfileStore {
    pub fn new(profiles: impl IntoIterator<Item = CloudProfile>) -> Self {
        Self {
            profiles: profiles.into_iter().map(|p| (p.id.clone(), p)).collect(),
        }
    }
}

#[async_trait]
impl ProfileStore for StaticProfileStore {
    async fn profiles(&self) -> Result<HashMap<String, CloudProfile>> {
        Ok(self.profiles.clone())
    }
}

/// Profile ids are non-empty and limited to ASCII letters, digits, `-`,
/// `_` and `.`.
pub fn validate_profile_id(id: &str) -> Result<()> {
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(AdvisorError::InvalidProfileId(id.to_string()))
    }
}

/// A profile together with a live provider for its tenancy.
#[derive(Clone)]
pub struct ResolvedProfile {
    pub profile_id: String,
    pub tenancy_id: String,
    pub provider: Arc<dyn CloudProvider>,
}

#[derive(Clone)]
pub struct ProfileResolver {
    store: Arc<dyn ProfileStore>,
    factory: Arc<dyn ProviderFactory>,
}

impl ProfileResolver {
    pub fn new(store: Arc<dyn ProfileStore>, factory: Arc<dyn ProviderFactory>) -> Self {
        Self { store, factory }
    }

    /// Loads the profile table once per run.
    pub async fn load(&self) -> Result<HashMap<String, CloudProfile>> {
        self.store.profiles().await
    }

    pub async fn resolve(
        &self,
        profiles: &HashMap<String, CloudProfile>,
        profile_id: &str,
    ) -> Result<ResolvedProfile> {
        validate_profile_id(profile_id)?;
        let profile = profiles
            .get(profile_id)
            .ok_or_else(|| AdvisorError::ProfileNotFound(profile_id.to_string()))?;
        let provider = self.factory.connect(profile).await?;
        Ok(ResolvedProfile {
            profile_id: profile.id.clone(),
            tenancy_id: profile.tenancy_id.clone(),
            provider,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{InMemoryProvider, SnapshotProviderFactory, TenancySnapshot};

    fn profile(id: &str, tenancy: &str) -> CloudProfile {
        CloudProfile {
            id: id.into(),
            tenancy_id: tenancy.into(),
            user_id: "ocid1.user".into(),
            key_fingerprint: "aa:bb".into(),
            region: "eu-frankfurt-1".into(),
            private_key_path: None,
            private_key: None,
        }
    }

    fn resolver() -> ProfileResolver {
        let store = StaticProfileStore::new([profile("prod", "t1"), profile("orphan", "t9")]);
        let factory = SnapshotProviderFactory::new()
            .with_tenancy("t1", InMemoryProvider::new(TenancySnapshot::default()));
        ProfileResolver::new(Arc::new(store), Arc::new(factory))
    }

    #[test]
    fn test_validate_profile_id() {
        assert!(validate_profile_id("prod-eu_1.a").is_ok());
        assert!(validate_profile_id("").is_err());
        assert!(validate_profile_id("a b").is_err());
        assert!(validate_profile_id("../etc").is_err());
    }

    #[tokio::test]
    async fn test_resolve_known_profile() {
        let resolver = resolver();
        let profiles = resolver.load().await.unwrap();
        let resolved = resolver.resolve(&profiles, "prod").await.unwrap();
        assert_eq!(resolved.tenancy_id, "t1");
    }

    #[tokio::test]
    async fn test_resolve_failures() {
        let resolver = resolver();
        let profiles = resolver.load().await.unwrap();

        assert!(matches!(
            resolver.resolve(&profiles, "bad id").await,
            Err(AdvisorError::InvalidProfileId(_))
        ));
        assert!(matches!(
            resolver.resolve(&profiles, "missing").await,
            Err(AdvisorError::ProfileNotFound(_))
        ));
        assert!(matches!(
            resolver.resolve(&profiles, "orphan").await,
            Err(AdvisorError::Connect { .. })
        ));
    }
}
