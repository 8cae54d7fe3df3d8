//! Lifecycle Test: request lifecycle guarantees against a scripted gateway.
//!
//! Covers:
//! 1. Empty chat input is a no-op (no transcript change, no gateway call)
//! 2. Streamed fragments replace a single model entry per turn
//! 3. An always-failing gateway leaves every feature idle with an error set
//! 4. A fixed decoder payload lands in `result` unchanged
//! 5. Concurrent submissions on one feature invoke the gateway once
//! 6. Media polling reports progress and ends with a usable handle
//!
//! Run with: `cargo test --test lifecycle_test`

use std::sync::Arc;
use std::time::Duration;

use divine_core::chat::{Role, CHAT_FAILURE_NOTICE};
use divine_core::gateway::mock::MockOp;
use divine_core::lifecycle::{
    ImageRequest, ReformatInput, StudioInput, VideoAnalysisInput, DECODE_FAILURE_NOTICE,
};
use divine_core::{
    AspectRatio, ChatSession, Features, ImageSize, MediaFile, MediaVault, MockGateway, SoulDecoderInput,
    SpiritualIntelligenceResponse, Submission, ValidationError, VideoAspect,
};
use tokio::sync::Notify;

fn leila() -> SoulDecoderInput {
    SoulDecoderInput {
        name: "Leila Cloud".into(),
        dob: "1978-12-05".into(),
        time: "07:30".into(),
        city: "Lisbon".into(),
        country: "Portugal".into(),
    }
}

async fn wait_until_busy(check: impl Fn() -> bool) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("feature never became busy");
}

#[tokio::test]
async fn test_empty_chat_input_is_a_no_op() {
    let gateway = MockGateway::new();
    let chat = ChatSession::new();

    let outcome = chat.submit(&gateway, "   ").await;

    assert_eq!(
        outcome,
        Submission::Rejected(ValidationError::EmptyInput { field: "message" })
    );
    assert!(chat.messages().is_empty());
    assert_eq!(gateway.total_calls(), 0);
}

#[tokio::test]
async fn test_streamed_fragments_replace_one_model_entry() {
    let gateway = MockGateway::new().with_chat_fragments(["In ", "stillness ", "the ", "answer ", "waits."]);
    let chat = ChatSession::new();

    let mut seen = Vec::new();
    let outcome = chat
        .submit_with(&gateway, "What is silence?", |text| seen.push(text.to_string()))
        .await;
    assert_eq!(outcome, Submission::Settled);

    // every callback sees the accumulated reply, never a duplicate entry
    assert_eq!(seen.len(), 5);
    assert_eq!(seen.last().map(String::as_str), Some("In stillness the answer waits."));

    let messages = chat.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::User);
    assert_eq!(messages[1].role, Role::Model);
    assert_eq!(messages[1].text, "In stillness the answer waits.");

    chat.submit(&gateway, "And after?").await;
    chat.submit(&gateway, "And then?").await;
    let messages = chat.messages();
    assert_eq!(messages.len(), 6);
    assert!(messages.len() <= 2 * 3);
    assert!(!chat.is_busy());
}

#[tokio::test]
async fn test_chat_failure_clears_busy_and_keeps_one_model_entry() {
    let gateway = MockGateway::failing();
    let chat = ChatSession::new();

    assert_eq!(chat.submit(&gateway, "hello").await, Submission::Failed);

    let state = chat.snapshot();
    assert!(!state.busy);
    assert_eq!(state.messages.len(), 2);
    assert_eq!(state.messages[1].text, CHAT_FAILURE_NOTICE);
    assert_eq!(
        state.last_error.map(|e| e.notice).as_deref(),
        Some(CHAT_FAILURE_NOTICE)
    );
}

#[tokio::test]
async fn test_failing_gateway_settles_every_feature() {
    let gateway = MockGateway::failing();
    let features = Features::new();
    let video = MediaFile::new("rite.mp4", "video/mp4", vec![0, 1, 2]);

    let outcomes = vec![
        features.decode_soul(&gateway, leila(), "gemini-3-pro-preview").await.submission,
        features.search_meaning(&gateway, "raven".into()).await.submission,
        features
            .analyze_video(
                &gateway,
                VideoAnalysisInput {
                    file: Some(video),
                    prompt: String::new(),
                },
            )
            .await
            .submission,
        features
            .animate(
                &gateway,
                StudioInput {
                    prompt: "lotus opening".into(),
                    image: None,
                    aspect: VideoAspect::Landscape,
                },
            )
            .await
            .submission,
        features.answer_question(&gateway, "Why 11:11?".into()).await.submission,
        features.sync_live_feed(&gateway).await.submission,
        features
            .reformat(
                &gateway,
                ReformatInput {
                    insight: "light".into(),
                    format: "haiku".into(),
                },
            )
            .await
            .submission,
        features
            .generate_image(
                &gateway,
                ImageRequest {
                    prompt: "sacred geometry".into(),
                    size: ImageSize::K1,
                    aspect: AspectRatio::Square,
                },
            )
            .await
            .submission,
    ];
    assert!(outcomes.iter().all(|o| *o == Submission::Failed));

    let snap = features.snapshot();
    assert!(!snap.decode.busy && snap.decode.last_error.is_some());
    assert!(!snap.meaning.busy && snap.meaning.last_error.is_some());
    assert!(!snap.video_analysis.busy && snap.video_analysis.last_error.is_some());
    assert!(!snap.studio.busy && snap.studio.last_error.is_some());
    assert!(snap.studio.progress.is_none());
    assert!(!snap.community.busy && snap.community.last_error.is_some());
    assert!(!snap.live_feed.busy && snap.live_feed.last_error.is_some());
    assert!(!snap.reformat.busy && snap.reformat.last_error.is_some());
    assert!(!snap.image.busy && snap.image.last_error.is_some());
    assert_eq!(
        snap.decode.last_error.map(|e| e.notice).as_deref(),
        Some(DECODE_FAILURE_NOTICE)
    );
}

#[tokio::test]
async fn test_fixed_decoder_payload_is_the_result() {
    let payload = SpiritualIntelligenceResponse {
        soul_blueprint: "A".into(),
        numerology: "B".into(),
        astrology: "C".into(),
        shadow_work: "D".into(),
        past_life: "E".into(),
        emotional_reflection: "F".into(),
    };
    let gateway = MockGateway::new().with_decode(payload.clone());
    let features = Features::new();

    let outcome = features.decode_soul(&gateway, leila(), "gemini-3-pro-preview").await;

    assert_eq!(outcome.submission, Submission::Settled);
    let state = features.decode.snapshot();
    assert_eq!(state.result, Some(payload));
    assert!(state.last_error.is_none());
    assert!(!state.busy);
}

#[tokio::test]
async fn test_concurrent_submissions_invoke_gateway_once() {
    let gate = Arc::new(Notify::new());
    let gateway = Arc::new(MockGateway::new().with_gate(Arc::clone(&gate)));
    let features = Features::new();

    let first = {
        let features = features.clone();
        let gateway = Arc::clone(&gateway);
        tokio::spawn(async move { features.decode_soul(gateway.as_ref(), leila(), "m").await })
    };
    wait_until_busy(|| features.decode.is_busy()).await;

    let second = features.decode_soul(gateway.as_ref(), leila(), "m").await;
    assert_eq!(
        second.submission,
        Submission::Rejected(ValidationError::Busy { feature: "decoder" })
    );

    // other features stay independent while decode is in flight
    assert!(!features.meaning.is_busy());

    gate.notify_one();
    let first = first.await.expect("join decode task");
    assert_eq!(first.submission, Submission::Settled);
    assert_eq!(gateway.calls(MockOp::Decode), 1);
    assert!(!features.decode.is_busy());
}

#[tokio::test]
async fn test_meaning_survives_diagram_failure() {
    let gateway = MockGateway::new().failing_on(MockOp::Diagram);
    let features = Features::new();

    assert!(features.search_meaning(&gateway, "feather".into()).await.is_settled());

    let result = features.meaning.snapshot().result.expect("meaning result");
    assert!(result.diagram.is_none());
    assert!(!result.answer.summary.is_empty());
}

#[tokio::test]
async fn test_studio_polling_reports_progress_and_returns_handle() {
    let vault = Arc::new(MediaVault::new());
    let gateway = Arc::new(
        MockGateway::new()
            .with_vault(Arc::clone(&vault))
            .with_polling(3, 10, Duration::from_millis(20)),
    );
    let features = Features::new();

    let task = {
        let features = features.clone();
        let gateway = Arc::clone(&gateway);
        tokio::spawn(async move {
            features
                .animate(
                    gateway.as_ref(),
                    StudioInput {
                        prompt: "aurora over the temple".into(),
                        image: None,
                        aspect: VideoAspect::Portrait,
                    },
                )
                .await
        })
    };

    let mut observed = Vec::new();
    for _ in 0..100 {
        if let Some(line) = features.studio.snapshot().progress {
            if observed.last() != Some(&line) {
                observed.push(line);
            }
        }
        if task.is_finished() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    assert_eq!(task.await.expect("join studio task").submission, Submission::Settled);
    assert!(!observed.is_empty(), "progress was never reported");

    let state = features.studio.snapshot();
    let handle = state.result.expect("media handle");
    assert!(handle.size > 0);
    assert!(vault.get(&handle.id).is_some());
    assert!(state.progress.is_none());
}

#[tokio::test]
async fn test_video_analysis_requires_file() {
    let gateway = MockGateway::new();
    let features = Features::new();

    let outcome = features
        .analyze_video(
            &gateway,
            VideoAnalysisInput {
                file: None,
                prompt: "what do you see".into(),
            },
        )
        .await;

    assert_eq!(outcome.submission, Submission::Rejected(ValidationError::MissingFile));
    assert_eq!(gateway.calls(MockOp::AnalyzeVideo), 0);
}
