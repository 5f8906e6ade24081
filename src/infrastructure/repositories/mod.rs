pub mod local_tts_repository;
pub mod minimax_tts_repository;
pub mod qwen_tts_repository;
pub mod remote;
pub mod service_tts_repository;
pub mod text_batches;
pub mod tts_repository;

pub use local_tts_repository::LocalTtsRepository;
pub use minimax_tts_repository::MiniMaxTtsRepository;
pub use qwen_tts_repository::QwenTtsRepository;
pub use remote::RetryPolicy;
pub use service_tts_repository::ServiceTtsRepository;
pub use tts_repository::TtsRepository;
