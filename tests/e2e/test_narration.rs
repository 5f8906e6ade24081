use crate::e2e::helpers;

use deckvoice::domain::narration::{NarrationManifest, NarrationOrchestrator};
use deckvoice::domain::tts::{ErrorKind, ProviderDispatcher, ProviderKind};
use deckvoice::infrastructure::config::MiniMaxConfig;
use deckvoice::infrastructure::repositories::{MiniMaxTtsRepository, ServiceTtsRepository};
use helpers::fakes::{FakeProbe, ModelBehavior, FAKE_WAV};
use helpers::provider_mocks::{MockProvider, FAKE_MP3};
use helpers::{test_remote_config, AppOptions, TestContext};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn minimax_dispatcher(base_url: &str) -> ProviderDispatcher {
    let config = MiniMaxConfig {
        group_id: Some("deck-group".to_string()),
        access_token: Some("deck-token".to_string()),
        base_url: base_url.to_string(),
        ..MiniMaxConfig::default()
    };
    let repository = MiniMaxTtsRepository::new(&config, &test_remote_config()).unwrap();
    ProviderDispatcher::new().with_provider(Arc::new(repository))
}

const NOTES: &str = r#"{
    "notes": [
        { "slide": 3, "note": "Finally, our roadmap for next year." },
        { "slide": 1, "note": "Welcome, everyone." },
        { "slide": 2, "note": "   " }
    ]
}"#;

#[tokio::test]
async fn it_should_narrate_a_deck_in_slide_order() {
    let mock = MockProvider::minimax().await;
    let audio_dir = TempDir::new().unwrap();
    let notes_path = audio_dir.path().join("notes.json");
    std::fs::write(&notes_path, NOTES).unwrap();

    let manifest = NarrationManifest::load(&notes_path).unwrap();
    let orchestrator = NarrationOrchestrator::new(
        minimax_dispatcher(&mock.base_url),
        ProviderKind::MiniMax,
        audio_dir.path().join("audio"),
    )
    .with_pacing(Duration::from_millis(20));

    let summary = orchestrator.run_batch(&manifest).await;

    assert_eq!((summary.succeeded, summary.failed, summary.skipped, summary.total), (2, 0, 1, 3));
    assert!(summary.is_success());
    assert_eq!(
        mock.state.texts(),
        vec![
            "Welcome, everyone.".to_string(),
            "Finally, our roadmap for next year.".to_string(),
        ]
    );

    let slide_1 = std::fs::read(audio_dir.path().join("audio/slide_1.mp3")).unwrap();
    assert_eq!(slide_1, FAKE_MP3);
    assert!(audio_dir.path().join("audio/slide_3.mp3").is_file());
    assert!(!audio_dir.path().join("audio/slide_2.mp3").exists());
}

#[tokio::test]
async fn it_should_report_overall_failure_when_every_slide_fails() {
    let mock = MockProvider::minimax().await;
    mock.reject(2013, "invalid voice id");
    let audio_dir = TempDir::new().unwrap();

    let manifest = NarrationManifest::from_json(NOTES).unwrap();
    let orchestrator = NarrationOrchestrator::new(
        minimax_dispatcher(&mock.base_url),
        ProviderKind::MiniMax,
        audio_dir.path().to_path_buf(),
    )
    .with_pacing(Duration::ZERO);

    let summary = orchestrator.run_batch(&manifest).await;

    assert_eq!((summary.succeeded, summary.failed, summary.skipped), (0, 2, 1));
    assert!(!summary.is_success());
    assert!(std::fs::read_dir(audio_dir.path()).unwrap().next().is_none());
}

#[tokio::test]
async fn it_should_narrate_a_single_slide_from_the_manifest() {
    let mock = MockProvider::minimax().await;
    let audio_dir = TempDir::new().unwrap();

    let manifest = NarrationManifest::from_json(NOTES).unwrap();
    let orchestrator = NarrationOrchestrator::new(
        minimax_dispatcher(&mock.base_url),
        ProviderKind::MiniMax,
        audio_dir.path().to_path_buf(),
    );

    let result = orchestrator.run_single_from_manifest(&manifest, 3).await.unwrap();

    assert!(result.is_success());
    assert_eq!(result.output_path(), Some(audio_dir.path().join("slide_3.mp3").as_path()));
    assert_eq!(mock.state.generation_calls(), 1);

    let blank = orchestrator.run_single_from_manifest(&manifest, 2).await.unwrap();
    assert_eq!(blank.failure().map(|f| f.kind), Some(ErrorKind::InvalidInput));
    assert_eq!(mock.state.generation_calls(), 1);

    assert!(orchestrator.run_single_from_manifest(&manifest, 7).await.is_err());
}

#[tokio::test]
async fn it_should_narrate_through_a_running_service_without_a_second_model() {
    let mut ctx = TestContext::spawn(AppOptions::default()).await;
    let audio_dir = TempDir::new().unwrap();

    let repository = ServiceTtsRepository::connect(&ctx.base_url, &test_remote_config())
        .await
        .unwrap();
    let orchestrator = NarrationOrchestrator::new(
        ProviderDispatcher::new().with_provider(Arc::new(repository)),
        ProviderKind::Local,
        audio_dir.path().to_path_buf(),
    );

    let manifest = NarrationManifest::from_json(NOTES).unwrap();
    let summary = orchestrator.run_batch(&manifest).await;

    assert_eq!((summary.succeeded, summary.failed, summary.skipped), (2, 0, 1));
    assert_eq!(std::fs::read(audio_dir.path().join("slide_1.wav")).unwrap(), FAKE_WAV);
    assert!(audio_dir.path().join("slide_3.wav").is_file());
    // The server's resident model did the work
    assert_eq!(ctx.model.loads(), 1);
    assert_eq!(ctx.model.calls(), 2);
    assert!(ctx.scratch_files().is_empty());

    ctx.shutdown().await;
}

#[tokio::test]
async fn it_should_carry_service_failures_into_the_batch_result() {
    let mut ctx = TestContext::spawn(
        AppOptions::default().model(ModelBehavior::Fail("CUDA error: illegal address".into())),
    )
    .await;
    let audio_dir = TempDir::new().unwrap();

    let repository = ServiceTtsRepository::connect(&ctx.base_url, &test_remote_config())
        .await
        .unwrap();
    let orchestrator = NarrationOrchestrator::new(
        ProviderDispatcher::new().with_provider(Arc::new(repository)),
        ProviderKind::Local,
        audio_dir.path().to_path_buf(),
    );

    let result = orchestrator.run_single(4, "This slide breaks the model.").await;

    assert_eq!(result.failure().map(|f| f.kind), Some(ErrorKind::Inference));
    assert!(!audio_dir.path().join("slide_4.wav").exists());

    ctx.shutdown().await;
}

#[tokio::test]
async fn it_should_refuse_an_unhealthy_service() {
    let mut ctx = TestContext::spawn(AppOptions::default().probe(FakeProbe::absent())).await;

    let result = ServiceTtsRepository::connect(&ctx.base_url, &test_remote_config()).await;

    assert_eq!(
        result.err().map(|e| e.kind()),
        Some(ErrorKind::ServiceUnavailable)
    );

    ctx.shutdown().await;
}
