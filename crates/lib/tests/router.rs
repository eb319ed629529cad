//! Router behaviour end to end against an in-memory client: relay captions, status replies,
//! self-message filtering, dedup, and failure isolation.

mod common;

use common::*;
use onceover::channels::{
    InboundMessage, MediaKind, MessageKey, OutboundPayload, Payload, QuotedRef, ViewOnceMedia,
};
use onceover::routing::MessageRouter;
use std::sync::Arc;

fn media_caption(client: &FakeClient) -> (String, String, MediaKind) {
    let sent = client.sent();
    assert_eq!(sent.len(), 1, "expected exactly one outbound message");
    match &sent[0].payload {
        OutboundPayload::Media { kind, caption, .. } => (sent[0].to.clone(), caption.clone(), *kind),
        other => panic!("expected media, got {:?}", other),
    }
}

#[tokio::test]
async fn direct_view_once_is_relayed_to_dump_chat() {
    let dir = temp_dir("onceover-router");
    let router = MessageRouter::from_settings(&settings(&dir));
    let client = FakeClient::new();

    let out = router
        .route(&client, vec![view_once_image("V1", ALICE, None, Some("secret pic"))])
        .await
        .expect("batch not empty");
    assert!(out.relayed);
    assert!(!out.replied);

    let (to, caption, kind) = media_caption(&client);
    assert_eq!(to, DUMP);
    assert_eq!(kind, MediaKind::Image);
    assert_eq!(caption, "Phone: 6281234567890\nCaption: secret pic");
    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn group_view_once_caption_starts_with_group_and_participant() {
    let dir = temp_dir("onceover-router");
    let router = MessageRouter::from_settings(&settings(&dir));
    let client = FakeClient::new();

    router
        .route(&client, vec![view_once_image("V2", GROUP, Some(BOB), None)])
        .await;

    let (_, caption, _) = media_caption(&client);
    let lines: Vec<&str> = caption.lines().collect();
    assert_eq!(lines, vec!["GC: Family", "Phone: 6289876543210"]);
    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn view_once_video_is_relayed_as_video() {
    let dir = temp_dir("onceover-router");
    let router = MessageRouter::from_settings(&settings(&dir));
    let client = FakeClient::new();
    let mut msg = view_once_image("V3", ALICE, None, None);
    if let Payload::ViewOnce(v) = &mut msg.payload {
        v.video = v.image.take();
    }

    router.route(&client, vec![msg]).await;

    let (_, caption, kind) = media_caption(&client);
    assert_eq!(kind, MediaKind::Video);
    assert_eq!(caption, "Phone: 6281234567890");
    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn unknown_group_still_relays_and_answers() {
    let dir = temp_dir("onceover-router");
    let router = MessageRouter::from_settings(&settings(&dir));
    let client = FakeClient::new();
    let unknown = "120363999999999999@g.us";

    router
        .route(&client, vec![view_once_image("V4", unknown, Some(BOB), None)])
        .await;
    let out = router
        .route(&client, vec![text("T4", unknown, Some(BOB), ".status")])
        .await
        .unwrap();
    assert!(out.replied);

    let sent = client.sent();
    assert_eq!(sent.len(), 2);
    match &sent[0].payload {
        OutboundPayload::Media { caption, .. } => assert_eq!(caption, "GC: \nPhone: 6289876543210"),
        other => panic!("expected media, got {:?}", other),
    }
    assert_eq!(error_log_entries(&dir).len(), 2);
    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn status_in_direct_chat_is_answered_unquoted() {
    let dir = temp_dir("onceover-router");
    let router = MessageRouter::from_settings(&settings(&dir));
    let client = FakeClient::new();

    let out = router
        .route(&client, vec![text("T1", ALICE, None, "please check .status now")])
        .await
        .unwrap();
    assert!(out.replied);

    let sent = client.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, ALICE);
    assert_eq!(sent[0].payload, OutboundPayload::Text("I'm OK".to_string()));
    assert!(sent[0].quoted.is_none());
    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn status_in_group_quotes_original() {
    let dir = temp_dir("onceover-router");
    let router = MessageRouter::from_settings(&settings(&dir));
    let client = FakeClient::new();

    router
        .route(&client, vec![text("T2", GROUP, Some(BOB), ".status")])
        .await;

    let sent = client.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, GROUP);
    assert_eq!(
        sent[0].quoted,
        Some(QuotedRef {
            remote_jid: GROUP.to_string(),
            id: "T2".to_string(),
            participant: Some(BOB.to_string()),
            body: String::new(),
        })
    );
    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn text_without_trigger_is_ignored() {
    let dir = temp_dir("onceover-router");
    let router = MessageRouter::from_settings(&settings(&dir));
    let client = FakeClient::new();

    let out = router
        .route(&client, vec![text("T3", ALICE, None, "status check")])
        .await
        .unwrap();
    assert!(!out.replied);
    assert!(client.sent().is_empty());
    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn redelivered_message_is_answered_once() {
    let dir = temp_dir("onceover-router");
    let router = MessageRouter::from_settings(&settings(&dir));
    let client = FakeClient::new();

    for _ in 0..3 {
        router
            .route(&client, vec![text("DUP", ALICE, None, ".status")])
            .await;
    }
    assert_eq!(client.sent().len(), 1);
    assert!(router.responder().replied().contains("DUP").await);
    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn self_sent_messages_never_produce_output() {
    let dir = temp_dir("onceover-router");
    let router = MessageRouter::from_settings(&settings(&dir));
    let client = FakeClient::new();

    let batches = vec![
        from_me(text("S1", ALICE, None, ".status")),
        from_me(text("S2", GROUP, Some(BOB), ".status")),
        from_me(view_once_image("S3", ALICE, None, Some("x"))),
        from_me(view_once_image("S4", GROUP, Some(BOB), None)),
    ];
    for m in batches {
        let out = router.route(&client, vec![m]).await.unwrap();
        assert!(out.skipped_self);
    }
    assert!(client.sent().is_empty());
    // A self-sent id must not poison the replied set for a later genuine delivery.
    assert!(!router.responder().replied().contains("S1").await);
    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn download_failure_logs_once_and_does_not_block_later_messages() {
    let dir = temp_dir("onceover-router");
    let router = MessageRouter::from_settings(&settings(&dir));
    let client = FakeClient {
        fail_download: true,
        ..FakeClient::new()
    };

    let out = router
        .route(&client, vec![view_once_image("F1", ALICE, None, None)])
        .await
        .unwrap();
    assert!(out.failed);
    assert!(client.sent().is_empty());
    let entries = error_log_entries(&dir);
    assert_eq!(entries, vec!["media download failed: media error or time out".to_string()]);

    let out = router
        .route(&client, vec![text("F2", BOB, None, ".status")])
        .await
        .unwrap();
    assert!(out.replied);
    assert_eq!(client.sent().len(), 1);
    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn empty_view_once_wrapper_is_an_error_not_an_empty_send() {
    let dir = temp_dir("onceover-router");
    let router = MessageRouter::from_settings(&settings(&dir));
    let client = FakeClient::new();
    let msg = InboundMessage {
        key: MessageKey {
            id: "E1".to_string(),
            remote_jid: ALICE.to_string(),
            participant: None,
            from_me: false,
        },
        push_name: String::new(),
        payload: Payload::ViewOnce(ViewOnceMedia::default()),
    };

    let out = router.route(&client, vec![msg]).await.unwrap();
    assert!(out.failed);
    assert!(client.sent().is_empty());
    assert_eq!(error_log_entries(&dir).len(), 1);
    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn send_failure_is_contained() {
    let dir = temp_dir("onceover-router");
    let router = MessageRouter::from_settings(&settings(&dir));
    let client = FakeClient {
        fail_send: true,
        ..FakeClient::new()
    };

    let out = router
        .route(&client, vec![text("X1", ALICE, None, ".status")])
        .await
        .unwrap();
    assert!(out.failed);
    assert!(!out.replied);
    assert_eq!(error_log_entries(&dir).len(), 1);
    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn only_first_message_of_batch_is_routed() {
    let dir = temp_dir("onceover-router");
    let router = MessageRouter::from_settings(&settings(&dir));
    let client = FakeClient::new();

    router
        .route(
            &client,
            vec![
                text("B1", ALICE, None, "hello"),
                text("B2", ALICE, None, ".status"),
            ],
        )
        .await;
    assert!(client.sent().is_empty());
    assert!(router.route(&client, Vec::new()).await.is_none());
    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn group_view_once_without_participant_leaves_phone_empty() {
    let dir = temp_dir("onceover-router");
    let router = MessageRouter::from_settings(&settings(&dir));
    let client = FakeClient::new();

    router
        .route(&client, vec![view_once_image("V9", GROUP, None, None)])
        .await;

    let (_, caption, _) = media_caption(&client);
    assert_eq!(caption, "GC: Family\nPhone: ");
    assert!(!caption.contains("120363000000000001"));
    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_redelivery_is_answered_once() {
    let dir = temp_dir("onceover-router");
    let router = Arc::new(MessageRouter::from_settings(&settings(&dir)));
    let client = Arc::new(FakeClient::new());

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..32 {
        let router = router.clone();
        let client = client.clone();
        tasks.spawn(async move {
            router
                .route(client.as_ref(), vec![text("SAME", GROUP, Some(ALICE), "ping .status")])
                .await
        });
    }
    let mut replied = 0;
    while let Some(res) = tasks.join_next().await {
        if res.unwrap().is_some_and(|out| out.replied) {
            replied += 1;
        }
    }

    assert_eq!(replied, 1);
    assert_eq!(client.sent().len(), 1);
    let _ = std::fs::remove_dir_all(&dir);
}
