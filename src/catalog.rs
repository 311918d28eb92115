use std::error::Error;
use std::sync::Arc;
use thiserror::Error;
use log::info;

use crate::llm::chat::ModelLister;

pub const API_KEY_ENV: &str = "GOOGLE_API_KEY";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("{0} NOT FOUND")]
    MissingCredential(&'static str),
    #[error("failed to list models: {0}")]
    Provider(String),
}

/// Reads the credential, then asks the provider once. `connect` is only
/// invoked when a credential is present.
pub async fn list_models<F>(api_key: Option<String>, connect: F) -> Result<Vec<String>, CatalogError>
    where F: FnOnce(String) -> Result<Arc<dyn ModelLister>, Box<dyn Error + Send + Sync>>
{
    let api_key = api_key
        .filter(|k| !k.trim().is_empty())
        .ok_or(CatalogError::MissingCredential(API_KEY_ENV))?;

    let lister = connect(api_key).map_err(|e| CatalogError::Provider(e.to_string()))?;
    let names = lister.list_models().await.map_err(|e| CatalogError::Provider(e.to_string()))?;
    info!("Provider returned {} models", names.len());
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{ AtomicBool, Ordering };

    struct FixedLister(Vec<&'static str>);

    #[async_trait]
    impl ModelLister for FixedLister {
        async fn list_models(&self) -> Result<Vec<String>, Box<dyn Error + Send + Sync>> {
            Ok(self.0.iter().map(|s| s.to_string()).collect())
        }
    }

    struct BrokenLister;

    #[async_trait]
    impl ModelLister for BrokenLister {
        async fn list_models(&self) -> Result<Vec<String>, Box<dyn Error + Send + Sync>> {
            Err("403 Forbidden".into())
        }
    }

    #[tokio::test]
    async fn missing_credential_never_connects() {
        let connected = AtomicBool::new(false);
        let result = list_models(None, |_| {
            connected.store(true, Ordering::SeqCst);
            Ok(Arc::new(FixedLister(vec!["models/x"])) as Arc<dyn ModelLister>)
        }).await;

        assert!(matches!(result, Err(CatalogError::MissingCredential(API_KEY_ENV))));
        assert!(!connected.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn blank_credential_counts_as_missing() {
        let result = list_models(Some("".into()), |_| -> Result<Arc<dyn ModelLister>, Box<dyn Error + Send + Sync>> {
            panic!("must not connect")
        }).await;
        assert_eq!(result.unwrap_err().to_string(), "GOOGLE_API_KEY NOT FOUND");
    }

    #[tokio::test]
    async fn names_keep_provider_order() {
        let names = list_models(Some("k".into()), |key| {
            assert_eq!(key, "k");
            Ok(Arc::new(FixedLister(vec!["models/b", "models/a"])) as Arc<dyn ModelLister>)
        }).await.unwrap();
        assert_eq!(names, vec!["models/b", "models/a"]);
    }

    #[tokio::test]
    async fn provider_failure_is_wrapped() {
        let err = list_models(Some("k".into()), |_| Ok(Arc::new(BrokenLister) as Arc<dyn ModelLister>))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Provider(ref m) if m.contains("403")));
    }
}
