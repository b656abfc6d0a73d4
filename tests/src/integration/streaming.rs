//! # Streaming Tests
//!
//! `reviewAdded` over `graphql-transport-ws`:
//!
//! ```text
//! client ── connection_init ──► binder
//! client ◄── connection_ack ──
//! client ── subscribe ───────►
//! client ◄── next(review:1) ── next(review:2) ── next(review:3) ── next(review:1) …
//! ```

#[cfg(test)]
mod tests {
    use super::super::harness::{
        connect, next_data, next_json, open_session, post_query, send_json, start_host, subscribe,
        EVENT_INTERVAL,
    };
    use serde_json::json;
    use futures::{SinkExt, StreamExt};
    use std::time::{Duration, Instant};
    use tokio_tungstenite::tungstenite::{self, Message};

    const REVIEW_ADDED: &str = "subscription { reviewAdded { id product { upc } } }";

    #[tokio::test]
    async fn test_review_added_cycles_through_catalog() {
        let (mut router, addr) = start_host(&[]).await;
        let mut socket = open_session(addr, "reviews").await;
        let started = Instant::now();
        subscribe(&mut socket, "1", REVIEW_ADDED).await;

        let mut ids = Vec::new();
        for _ in 0..4 {
            let data = next_data(&mut socket, "1").await;
            ids.push(data["reviewAdded"]["id"].as_str().unwrap().to_string());
        }
        assert_eq!(ids, vec!["review:1", "review:2", "review:3", "review:1"]);
        // first event is immediate, then one per interval
        assert!(started.elapsed() >= EVENT_INTERVAL * 3);

        router.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_event_payload_matches_query_selection() {
        let (mut router, addr) = start_host(&[]).await;
        let mut socket = open_session(addr, "reviews").await;
        subscribe(&mut socket, "only", REVIEW_ADDED).await;

        let data = next_data(&mut socket, "only").await;
        assert_eq!(
            data,
            json!({ "reviewAdded": { "id": "review:1", "product": { "upc": "1" } } })
        );

        router.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_subscriptions_are_independent() {
        let (mut router, addr) = start_host(&[]).await;

        let mut first = open_session(addr, "reviews").await;
        subscribe(&mut first, "a", REVIEW_ADDED).await;
        assert_eq!(next_data(&mut first, "a").await["reviewAdded"]["id"], "review:1");
        assert_eq!(next_data(&mut first, "a").await["reviewAdded"]["id"], "review:2");

        // a later subscriber starts from the beginning, not where `a` is
        let mut second = open_session(addr, "reviews").await;
        subscribe(&mut second, "b", REVIEW_ADDED).await;
        assert_eq!(next_data(&mut second, "b").await["reviewAdded"]["id"], "review:1");

        // two operations on one socket keep separate cursors too
        subscribe(&mut second, "c", REVIEW_ADDED).await;
        let mut c_ids = Vec::new();
        while c_ids.len() < 2 {
            let message = next_json(&mut second).await;
            if message["id"] == "c" {
                c_ids.push(message["payload"]["data"]["reviewAdded"]["id"].clone());
            }
        }
        assert_eq!(c_ids, vec![json!("review:1"), json!("review:2")]);

        assert_eq!(next_data(&mut first, "a").await["reviewAdded"]["id"], "review:3");

        router.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_complete_stops_one_subscription() {
        let (mut router, addr) = start_host(&[]).await;
        let mut socket = open_session(addr, "reviews").await;
        subscribe(&mut socket, "1", REVIEW_ADDED).await;
        next_data(&mut socket, "1").await;

        send_json(&mut socket, json!({ "id": "1", "type": "complete" })).await;
        subscribe(&mut socket, "2", REVIEW_ADDED).await;

        // everything after the new subscribe belongs to it
        let data = next_data(&mut socket, "2").await;
        assert_eq!(data["reviewAdded"]["id"], "review:1");

        router.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_queries_still_served_on_streaming_path() {
        let (mut router, addr) = start_host(&[]).await;
        let (status, body) = post_query(addr, "reviews", "{ reviews { id } }").await;
        assert_eq!(status, 200);
        assert_eq!(body["data"]["reviews"].as_array().unwrap().len(), 3);
        router.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_upgrade_on_non_streaming_subgraph_fails() {
        let (mut router, addr) = start_host(&[]).await;

        for subgraph in ["products", "users"] {
            match connect(addr, subgraph).await {
                Err(tungstenite::Error::Http(response)) => {
                    assert!(response.status().is_client_error(), "{}", response.status());
                }
                Err(other) => panic!("unexpected error: {}", other),
                Ok(_) => panic!("{} accepted a WebSocket upgrade", subgraph),
            }
        }

        router.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_malformed_frame_closes_only_its_connection() {
        let (mut router, addr) = start_host(&[]).await;

        let mut healthy = open_session(addr, "reviews").await;
        subscribe(&mut healthy, "ok", REVIEW_ADDED).await;
        assert_eq!(next_data(&mut healthy, "ok").await["reviewAdded"]["id"], "review:1");

        // invalid operation: answered with an error, session survives
        let mut faulty = open_session(addr, "reviews").await;
        subscribe(&mut faulty, "bad", "subscription { nope }").await;
        let reply = next_json(&mut faulty).await;
        assert_eq!(reply["id"], "bad");
        let reported = reply["type"] == "error"
            || reply["payload"]["errors"]
                .as_array()
                .map_or(false, |errors| !errors.is_empty());
        assert!(reported, "expected an error for the invalid operation, got {}", reply);

        // unparsable frame: the protocol ends this session
        faulty
            .send(Message::text("this is not json"))
            .await
            .unwrap();
        let ended = tokio::time::timeout(Duration::from_secs(5), async {
            while let Some(frame) = faulty.next().await {
                match frame {
                    Ok(Message::Close(_)) | Err(_) => break,
                    Ok(_) => continue,
                }
            }
        })
        .await;
        assert!(ended.is_ok(), "faulty session was not closed");

        let mut rest = Vec::new();
        for _ in 0..3 {
            rest.push(next_data(&mut healthy, "ok").await["reviewAdded"]["id"].clone());
        }
        assert_eq!(rest, vec![json!("review:2"), json!("review:3"), json!("review:1")]);

        // listener still accepts new sessions
        let mut fresh = open_session(addr, "reviews").await;
        subscribe(&mut fresh, "new", REVIEW_ADDED).await;
        assert_eq!(next_data(&mut fresh, "new").await["reviewAdded"]["id"], "review:1");

        router.shutdown().await.unwrap();
    }
}
