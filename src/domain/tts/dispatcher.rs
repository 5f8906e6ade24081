use super::error::SynthesisError;
use super::model::{ProviderKind, SynthesisRequest, SynthesisResult};
use crate::infrastructure::model::executor::remove_if_exists;
use crate::infrastructure::repositories::TtsRepository;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Routes a request to the provider it names and folds every outcome into a [`SynthesisResult`].
///
/// `dispatch` never returns an error: callers treat all providers identically.
#[derive(Clone, Default)]
pub struct ProviderDispatcher {
    providers: HashMap<ProviderKind, Arc<dyn TtsRepository>>,
}

impl ProviderDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_provider(mut self, repository: Arc<dyn TtsRepository>) -> Self {
        self.register(repository);
        self
    }

    pub fn register(&mut self, repository: Arc<dyn TtsRepository>) {
        self.providers.insert(repository.kind(), repository);
    }

    pub fn supports(&self, kind: ProviderKind) -> bool {
        self.providers.contains_key(&kind)
    }

    pub fn providers(&self) -> Vec<ProviderKind> {
        let mut kinds: Vec<_> = self.providers.keys().copied().collect();
        kinds.sort_by_key(|k| k.as_str());
        kinds
    }

    pub async fn dispatch(
        &self,
        task_id: Uuid,
        request: &SynthesisRequest,
        destination: &Path,
    ) -> SynthesisResult {
        let started = Instant::now();
        let provider = request.provider;

        let outcome = match self.providers.get(&provider) {
            Some(repository) => repository.synthesize(request, destination).await,
            None => Err(SynthesisError::InvalidInput(format!(
                "provider '{}' is not configured",
                provider
            ))),
        };

        let outcome = match outcome {
            Ok(artifact) if artifact.path.is_file() => Ok(artifact),
            Ok(artifact) => Err(SynthesisError::Inference(format!(
                "provider reported success but {} does not exist",
                artifact.path.display()
            ))),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(artifact) => {
                tracing::debug!(
                    task_id = %task_id,
                    provider = %provider,
                    path = %artifact.path.display(),
                    "Synthesis succeeded"
                );
                SynthesisResult::succeeded(task_id, provider, artifact, started.elapsed())
            }
            Err(e) => {
                tracing::error!(
                    task_id = %task_id,
                    provider = %provider,
                    error_kind = %e.kind(),
                    error = %e,
                    "Synthesis failed"
                );
                remove_if_exists(destination).await;
                SynthesisResult::failed(task_id, provider, &e, started.elapsed())
            }
        }
    }
}
