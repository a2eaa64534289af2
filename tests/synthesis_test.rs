use tokio_test::assert_ok;
use voxcoach::styles::CoachingStyle;
use voxcoach::synthesis::{RemoteSynthesizer, SynthesisError, Synthesizer};

#[tokio::test]
async fn test_synthesize_returns_audio_bytes() {
    let mut server = mockito::Server::new_async().await;
    let voice_id = CoachingStyle::Motivational.profile().voice_id;

    let mock = server
        .mock("POST", format!("/synthesize/{}", voice_id).as_str())
        .match_header("x-api-key", "test-key")
        .match_body(mockito::Matcher::PartialJson(serde_json::json!({
            "text": "Push through, you have this!",
            "modelId": "coach_multilingual_v2",
            "voiceSettings": {"speakerBoost": true}
        })))
        .with_status(200)
        .with_body(vec![0x49u8, 0x44, 0x33, 0x04])
        .create_async()
        .await;

    let client = RemoteSynthesizer::new(&server.url(), "coach_multilingual_v2", "test-key", 5);
    let bytes = assert_ok!(
        client
            .synthesize("Push through, you have this!", CoachingStyle::Motivational)
            .await
    );

    assert_eq!(bytes, vec![0x49, 0x44, 0x33, 0x04]);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_synthesize_classifies_http_errors() {
    let mut server = mockito::Server::new_async().await;
    let voice_id = CoachingStyle::Technical.profile().voice_id;

    server
        .mock("POST", format!("/synthesize/{}", voice_id).as_str())
        .with_status(503)
        .with_body("synthesis capacity exhausted")
        .create_async()
        .await;

    let client = RemoteSynthesizer::new(&server.url(), "coach_multilingual_v2", "test-key", 5);
    let err = client
        .synthesize("Keep your elbows tucked.", CoachingStyle::Technical)
        .await
        .unwrap_err();

    match err {
        SynthesisError::Http { status, body } => {
            assert_eq!(status, 503);
            assert!(body.contains("capacity"));
        }
        other => panic!("expected Http error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_synthesize_rejects_empty_success_body() {
    let mut server = mockito::Server::new_async().await;
    let voice_id = CoachingStyle::Supportive.profile().voice_id;

    server
        .mock("POST", format!("/synthesize/{}", voice_id).as_str())
        .with_status(200)
        .with_body("")
        .create_async()
        .await;

    let client = RemoteSynthesizer::new(&server.url(), "coach_multilingual_v2", "test-key", 5);
    let err = client
        .synthesize("You're doing great.", CoachingStyle::Supportive)
        .await
        .unwrap_err();

    assert!(matches!(err, SynthesisError::EmptyResponse));
}

#[tokio::test]
async fn test_synthesize_classifies_transport_failure() {
    // Nothing listens here; the connection is refused.
    let client = RemoteSynthesizer::new(
        "http://127.0.0.1:1",
        "coach_multilingual_v2",
        "test-key",
        5,
    );
    let err = client
        .synthesize("Reset your stance.", CoachingStyle::Professional)
        .await
        .unwrap_err();

    assert!(matches!(err, SynthesisError::Network(_)));
}
