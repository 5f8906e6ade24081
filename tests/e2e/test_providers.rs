use crate::e2e::helpers;

use helpers::provider_mocks::{closed_port_url, MockProvider, FAKE_MP3, FAKE_REMOTE_WAV};
use helpers::{AppOptions, TestContext};
use hyper::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::Duration;

#[tokio::test]
async fn it_should_synthesize_through_minimax() {
    let mock = MockProvider::minimax().await;
    let mut ctx = TestContext::spawn(AppOptions::minimax(&mock.base_url)).await;

    let response = ctx
        .client
        .post("/generate", &json!({ "text": "大家好，今天我们来看第三季度的数据。" }))
        .await
        .unwrap();

    response
        .assert_status(StatusCode::OK)
        .assert_header("content-type", "audio/mpeg")
        .assert_header_exists("x-task-id");
    assert_eq!(response.body_bytes, FAKE_MP3);

    assert_eq!(mock.state.generation_calls(), 1);
    assert_eq!(
        mock.state.authorization.lock().unwrap().as_deref(),
        Some("Bearer test-token")
    );
    assert_eq!(*mock.state.group_ids.lock().unwrap(), vec!["test-group".to_string()]);
    assert_eq!(mock.state.texts(), vec!["大家好，今天我们来看第三季度的数据。".to_string()]);

    let body = mock.state.bodies.lock().unwrap()[0].clone();
    assert_eq!(
        body.pointer("/voice_setting/voice_id").and_then(|v| v.as_str()),
        Some("Chinese (Mandarin)_News_Anchor")
    );

    // Remote synthesis never touches the local model
    assert_eq!(ctx.model.loads(), 0);
    assert!(ctx.scratch_files().is_empty());

    ctx.shutdown().await;
}

#[tokio::test]
async fn it_should_retry_transient_minimax_failures() {
    let mock = MockProvider::minimax().await;
    mock.fail_transiently(2);
    let mut ctx = TestContext::spawn(AppOptions::minimax(&mock.base_url)).await;

    let response = ctx
        .client
        .post("/generate", &json!({ "text": "Retry me." }))
        .await
        .unwrap();

    response.assert_status(StatusCode::OK);
    assert_eq!(response.body_bytes, FAKE_MP3);
    assert_eq!(mock.state.generation_calls(), 3);

    ctx.shutdown().await;
}

#[tokio::test]
async fn it_should_give_up_after_retries_are_exhausted() {
    let mock = MockProvider::minimax().await;
    mock.fail_transiently(10);
    let mut ctx = TestContext::spawn(AppOptions::minimax(&mock.base_url)).await;

    let response = ctx
        .client
        .post("/generate", &json!({ "text": "Nobody is home." }))
        .await
        .unwrap();

    response
        .assert_status(StatusCode::BAD_GATEWAY)
        .assert_failure_kind("network");
    assert_eq!(mock.state.generation_calls(), 3);
    assert!(ctx.scratch_files().is_empty());

    ctx.shutdown().await;
}

#[tokio::test]
async fn it_should_surface_minimax_business_errors_without_retrying() {
    let mock = MockProvider::minimax().await;
    mock.reject(1004, "authentication failed");
    let mut ctx = TestContext::spawn(AppOptions::minimax(&mock.base_url)).await;

    let response = ctx
        .client
        .post("/generate", &json!({ "text": "Who am I?" }))
        .await
        .unwrap();

    response
        .assert_status(StatusCode::BAD_GATEWAY)
        .assert_failure_kind("provider")
        .assert_error_message("authentication failed");
    assert_eq!(mock.state.generation_calls(), 1);
    assert!(ctx.scratch_files().is_empty());

    ctx.shutdown().await;
}

#[tokio::test]
async fn it_should_synthesize_through_qwen_in_two_round_trips() {
    let mock = MockProvider::dashscope().await;
    let mut ctx = TestContext::spawn(AppOptions::qwen(&mock.base_url)).await;

    let response = ctx
        .client
        .post("/generate", &json!({ "text": "Revenue grew twelve percent." }))
        .await
        .unwrap();

    response
        .assert_status(StatusCode::OK)
        .assert_header("content-type", "audio/wav");
    assert_eq!(response.body_bytes, FAKE_REMOTE_WAV);

    assert_eq!(mock.state.generation_calls(), 1);
    assert_eq!(mock.state.download_calls(), 1);
    assert_eq!(
        mock.state.authorization.lock().unwrap().as_deref(),
        Some("Bearer sk-test")
    );

    let body = mock.state.bodies.lock().unwrap()[0].clone();
    assert_eq!(body.get("model").and_then(|v| v.as_str()), Some("qwen3-tts-flash"));
    assert_eq!(body.pointer("/input/voice").and_then(|v| v.as_str()), Some("Cherry"));
    assert_eq!(
        body.pointer("/input/text").and_then(|v| v.as_str()),
        Some("Revenue grew twelve percent.")
    );
    assert_eq!(ctx.model.loads(), 0);

    ctx.shutdown().await;
}

#[tokio::test]
async fn it_should_report_qwen_rejections_as_provider_errors() {
    let mock = MockProvider::dashscope().await;
    mock.reject(400, "Input text exceeds the limit");
    let mut ctx = TestContext::spawn(AppOptions::qwen(&mock.base_url)).await;

    let response = ctx
        .client
        .post("/generate", &json!({ "text": "Too much." }))
        .await
        .unwrap();

    response
        .assert_status(StatusCode::BAD_GATEWAY)
        .assert_failure_kind("provider");
    assert_eq!(mock.state.generation_calls(), 1);
    assert_eq!(mock.state.download_calls(), 0);
    assert!(ctx.scratch_files().is_empty());

    ctx.shutdown().await;
}

#[tokio::test]
async fn it_should_report_unreachable_providers_as_network_errors() {
    let url = closed_port_url().await;

    for options in [AppOptions::minimax(&url), AppOptions::qwen(&url)] {
        let mut ctx = TestContext::spawn(options).await;

        let response = ctx
            .client
            .post("/generate", &json!({ "text": "Is anyone there?" }))
            .await
            .unwrap();

        response
            .assert_status(StatusCode::BAD_GATEWAY)
            .assert_failure_kind("network");
        assert!(ctx.scratch_files().is_empty());

        ctx.shutdown().await;
    }
}

#[tokio::test]
async fn it_should_time_out_a_hanging_minimax_call() {
    let mock = MockProvider::minimax().await;
    mock.stall(Duration::from_secs(5));
    let mut ctx = TestContext::spawn(
        AppOptions::minimax(&mock.base_url).remote_timeout(Duration::from_millis(200)),
    )
    .await;

    let response = ctx
        .client
        .post("/generate", &json!({ "text": "Hold the line." }))
        .await
        .unwrap();

    response
        .assert_status(StatusCode::BAD_GATEWAY)
        .assert_failure_kind("network");
    // One call plus two retries, each cut off by the client timeout
    assert_eq!(mock.state.generation_calls(), 3);
    assert!(ctx.scratch_files().is_empty());

    ctx.shutdown().await;
}

#[tokio::test]
async fn it_should_time_out_a_hanging_qwen_call() {
    let mock = MockProvider::dashscope().await;
    mock.stall(Duration::from_secs(5));
    let mut ctx = TestContext::spawn(
        AppOptions::qwen(&mock.base_url).remote_timeout(Duration::from_millis(200)),
    )
    .await;

    let response = ctx
        .client
        .post("/generate", &json!({ "text": "Hold the line." }))
        .await
        .unwrap();

    response
        .assert_status(StatusCode::BAD_GATEWAY)
        .assert_failure_kind("network");
    assert_eq!(mock.state.download_calls(), 0);
    assert!(ctx.scratch_files().is_empty());

    ctx.shutdown().await;
}

#[tokio::test]
async fn it_should_fail_when_the_qwen_download_is_gone() {
    let mock = MockProvider::dashscope().await;
    mock.fail_downloads(StatusCode::NOT_FOUND);
    let mut ctx = TestContext::spawn(AppOptions::qwen(&mock.base_url)).await;

    let response = ctx
        .client
        .post("/generate", &json!({ "text": "Second stage breaks." }))
        .await
        .unwrap();

    response
        .assert_status(StatusCode::BAD_GATEWAY)
        .assert_failure_kind("provider");
    assert_eq!(mock.state.generation_calls(), 1);
    assert_eq!(mock.state.download_calls(), 1);
    assert!(ctx.scratch_files().is_empty());

    ctx.shutdown().await;
}

#[tokio::test]
async fn it_should_retry_a_failing_qwen_download_then_give_up() {
    let mock = MockProvider::dashscope().await;
    mock.fail_downloads(StatusCode::INTERNAL_SERVER_ERROR);
    let mut ctx = TestContext::spawn(AppOptions::qwen(&mock.base_url)).await;

    let response = ctx
        .client
        .post("/generate", &json!({ "text": "Second stage flakes." }))
        .await
        .unwrap();

    response
        .assert_status(StatusCode::BAD_GATEWAY)
        .assert_failure_kind("network");
    // The generation call is not repeated when only the download fails
    assert_eq!(mock.state.generation_calls(), 1);
    assert_eq!(mock.state.download_calls(), 3);
    assert!(ctx.scratch_files().is_empty());

    ctx.shutdown().await;
}
