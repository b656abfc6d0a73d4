//! # Lifecycle Tests
//!
//! Startup is all-or-nothing; shutdown closes every streaming connection with
//! a normal close frame before the listener goes away.

#[cfg(test)]
mod tests {
    use super::super::harness::{
        next_data, next_frame, open_session, post_query, start_host, subscribe, test_config,
    };
    use host_runtime::build_router;
    use std::time::Duration;
    use subgraph_catalog::local_subgraphs;
    use subgraph_gateway::ws::connection::SHUTDOWN_REASON;
    use subgraph_gateway::{
        CompositionRouter, ConfigError, GatewayError, ProcessIdentity, RouterState,
        SchemaBuildError, SubgraphDescriptor,
    };
    use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
    use tokio_tungstenite::tungstenite::Message;

    #[tokio::test]
    async fn test_shutdown_sends_normal_close() {
        let (mut router, addr) = start_host(&[]).await;
        let mut socket = open_session(addr, "reviews").await;
        subscribe(&mut socket, "1", "subscription { reviewAdded { id } }").await;
        next_data(&mut socket, "1").await;

        let shutdown = tokio::spawn(async move {
            let result = router.shutdown().await;
            (router, result)
        });

        let frame = loop {
            match next_frame(&mut socket).await {
                Some(Message::Close(frame)) => break frame,
                Some(_) => continue,
                None => panic!("socket ended without a close frame"),
            }
        };
        let frame = frame.expect("close frame without payload");
        assert_eq!(frame.code, CloseCode::Normal);
        assert_eq!(frame.reason.as_str(), SHUTDOWN_REASON);

        let (router, result) = shutdown.await.unwrap();
        result.unwrap();
        assert_eq!(router.state(), RouterState::Stopped);
        assert_eq!(router.metrics().to_json()["streaming"]["forced_closes"], 0);
    }

    #[tokio::test]
    async fn test_listener_released_after_shutdown() {
        let (mut router, addr) = start_host(&[]).await;
        let (status, _) = post_query(addr, "products", "{ topProducts { upc } }").await;
        assert_eq!(status, 200);

        router.shutdown().await.unwrap();
        assert!(reqwest::get(format!("http://{}/health", addr)).await.is_err());
    }

    #[test]
    fn test_duplicate_subgraph_rejected() {
        let mut descriptors = local_subgraphs();
        descriptors.extend(local_subgraphs().into_iter().take(1));

        let result = CompositionRouter::new(
            test_config(&[]).gateway,
            ProcessIdentity::default(),
            descriptors,
        );
        assert!(matches!(
            result,
            Err(GatewayError::Config(ConfigError::DuplicateSubgraph(name))) if name == "products"
        ));
    }

    #[tokio::test]
    async fn test_failing_subgraph_aborts_whole_host() {
        let mut descriptors = local_subgraphs();
        descriptors.push(SubgraphDescriptor::new("inventory", || {
            Err(SchemaBuildError::Supplier("warehouse offline".into()))
        }));

        let mut router = CompositionRouter::new(
            test_config(&[]).gateway,
            ProcessIdentity::default(),
            descriptors,
        )
        .unwrap();

        let err = router.start().await.unwrap_err();
        assert!(matches!(err, GatewayError::SchemaBuild { ref subgraph, .. } if subgraph == "inventory"));
        assert_eq!(router.state(), RouterState::Stopped);
        assert!(router.local_addr().is_none());
    }

    #[tokio::test]
    async fn test_run_until_stops_on_signal() {
        let router = build_router(&test_config(&[])).unwrap();
        let mut states = router.subscribe_state();
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

        let running = tokio::spawn(router.run_until(async move {
            let _ = stop_rx.await;
        }));

        let addr = loop {
            states.changed().await.unwrap();
            if let RouterState::Listening { addr } = *states.borrow() {
                break addr;
            }
        };
        let (status, _) = post_query(addr, "users", "{ allUsers { id } }").await;
        assert_eq!(status, 200);

        stop_tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(5), running)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(*states.borrow(), RouterState::Stopped);
    }
}
