use crate::domain::tts::{AudioArtifact, ProviderKind, SynthesisError, SynthesisRequest};
use async_trait::async_trait;
use std::path::Path;

/// A synthesis backend: the resident local model or one of the remote HTTP providers.
///
/// Implementations are responsible for:
/// - Handling provider-specific text length limitations
/// - Writing the produced audio to `destination`, in the provider's native format
/// - Mapping every failure into [`SynthesisError`]
///
/// On error, implementations should not leave a file at `destination`; the dispatcher
/// removes it anyway.
#[async_trait]
pub trait TtsRepository: Send + Sync {
    fn kind(&self) -> ProviderKind;

    async fn synthesize(
        &self,
        request: &SynthesisRequest,
        destination: &Path,
    ) -> Result<AudioArtifact, SynthesisError>;
}
