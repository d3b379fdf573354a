use super::*;
use serde_json::json;
use shared::domain::ApplicationId;
use url::Url;
use wiremock::{
    matchers::{body_string_contains, method, path},
    Mock, MockServer, ResponseTemplate,
};

fn rest(base: &str) -> Arc<DiscordRest> {
    let base = Url::parse(base).expect("url");
    Arc::new(DiscordRest::new(&base, "secret", ApplicationId(1100)))
}

#[tokio::test]
async fn first_reply_becomes_the_http_response() {
    let (replier, response) =
        HttpInteractionReplier::new(rest("http://127.0.0.1:9"), "tok", ResponseType::DeferredUpdate);

    replier
        .reply(OutgoingMessage::ephemeral_text("hello"))
        .await
        .expect("reply");

    let response = response.await.expect("response");
    assert_eq!(response.kind, ResponseType::ChannelMessage);
    assert_eq!(
        response.data.and_then(|data| data.content).as_deref(),
        Some("hello")
    );
    assert_eq!(replier.state(), ReplyState::Replied);
}

#[tokio::test]
async fn second_initial_answer_is_refused() {
    let (replier, _response) =
        HttpInteractionReplier::new(rest("http://127.0.0.1:9"), "tok", ResponseType::DeferredUpdate);

    replier
        .update(OutgoingMessage::ephemeral_text("page"))
        .await
        .expect("update");
    let err = replier
        .reply(OutgoingMessage::ephemeral_text("again"))
        .await
        .expect_err("should fail");
    assert_eq!(err, TransportError::AlreadyAnswered);
}

#[tokio::test]
async fn defer_uses_the_kind_for_the_interaction() {
    let (replier, response) = HttpInteractionReplier::new(
        rest("http://127.0.0.1:9"),
        "tok",
        ResponseType::DeferredChannelMessage,
    );

    replier.defer().await.expect("defer");

    assert_eq!(
        response.await.expect("response"),
        InteractionResponse::deferred(ResponseType::DeferredChannelMessage)
    );
    assert_eq!(replier.state(), ReplyState::Deferred);
}

#[tokio::test]
async fn follow_up_requires_an_answer_first() {
    let (replier, _response) =
        HttpInteractionReplier::new(rest("http://127.0.0.1:9"), "tok", ResponseType::DeferredUpdate);

    let err = replier
        .follow_up(OutgoingMessage::ephemeral_text("late"))
        .await
        .expect_err("should fail");
    assert!(matches!(err, TransportError::Request(_)));
}

#[tokio::test]
async fn answers_after_endpoint_acknowledgement_go_through_the_webhook() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/webhooks/1100/tok"))
        .and(body_string_contains("Error loading process list."))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "1"})))
        .expect(1)
        .mount(&server)
        .await;

    let (replier, response) =
        HttpInteractionReplier::new(rest(&server.uri()), "tok", ResponseType::DeferredUpdate);

    assert!(replier.acknowledge_pending());
    assert!(response.await.is_err());
    assert!(!replier.acknowledge_pending());

    replier
        .reply(OutgoingMessage::ephemeral_text("Error loading process list."))
        .await
        .expect("reply via webhook");
    assert_eq!(replier.state(), ReplyState::Replied);
}

#[tokio::test]
async fn finish_releases_an_unanswered_response() {
    let (replier, response) =
        HttpInteractionReplier::new(rest("http://127.0.0.1:9"), "tok", ResponseType::DeferredUpdate);

    replier.finish();

    assert!(response.await.is_err());
}
