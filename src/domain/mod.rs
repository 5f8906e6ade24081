pub mod narration;
pub mod tts;
