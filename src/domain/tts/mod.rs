pub mod dispatcher;
pub mod dto;
pub mod error;
pub mod model;
pub mod service;
pub mod text;

pub use dispatcher::ProviderDispatcher;
pub use dto::{DeviceReport, GenerateRequest, HealthReport, HealthStatus, ServiceDescriptor};
pub use error::{ErrorKind, SynthesisError};
pub use model::{
    AudioArtifact, AudioFormat, ProviderKind, SynthesisFailure, SynthesisOutcome,
    SynthesisRequest, SynthesisResult,
};
pub use service::{GenerateFailure, GeneratedAudio, ServiceSettings, ServiceState, SynthesisService};
pub use text::normalize_text;
