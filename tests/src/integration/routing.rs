//! # Routing Tests
//!
//! Each subgraph answers only on its own path, with its own schema.
//!
//! ```text
//! POST /products/graphql ──► products engine
//! POST /reviews/graphql  ──► reviews engine
//! POST /users/graphql    ──► users engine
//! GET  /health, /metrics ──► shared listener
//! ```

#[cfg(test)]
mod tests {
    use super::super::harness::{get_json, post_query, start_host};
    use serde_json::json;

    #[tokio::test]
    async fn test_each_path_serves_its_own_subgraph() {
        let (mut router, addr) = start_host(&[]).await;

        let (status, body) = post_query(addr, "products", "{ topProducts { upc name } }").await;
        assert_eq!(status, 200);
        assert_eq!(
            body["data"]["topProducts"],
            json!([
                { "upc": "1", "name": "Table" },
                { "upc": "2", "name": "Couch" },
                { "upc": "3", "name": "Chair" },
            ])
        );

        let (_, body) = post_query(addr, "reviews", r#"{ review(id: "review:3") { title } }"#).await;
        assert_eq!(body["data"]["review"]["title"], "Comfortable");

        let (_, body) = post_query(addr, "users", r#"{ user(id: "user:1") { username } }"#).await;
        assert_eq!(body["data"]["user"]["username"], "User One");

        router.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_get_query_on_non_streaming_path() {
        let (mut router, addr) = start_host(&[]).await;

        let response = reqwest::Client::new()
            .get(format!("http://{}/products/graphql", addr))
            .query(&[("query", r#"{ product(upc: "3") { name } }"#)])
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 200);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["data"]["product"]["name"], "Chair");

        router.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_foreign_field_is_a_structured_error() {
        let (mut router, addr) = start_host(&[]).await;

        // `reviews` exists on the reviews subgraph only
        let (status, body) = post_query(addr, "products", "{ reviews { id } }").await;
        assert_eq!(status, 200);
        assert!(body.get("data").map_or(true, |d| d.is_null()));
        let message = body["errors"][0]["message"].as_str().unwrap();
        assert!(message.contains("reviews"), "unexpected error: {}", message);

        router.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_unknown_subgraph_path_is_not_found() {
        let (mut router, addr) = start_host(&[]).await;

        let status = reqwest::Client::new()
            .post(format!("http://{}/inventory/graphql", addr))
            .json(&json!({ "query": "{ __typename }" }))
            .send()
            .await
            .unwrap()
            .status();
        assert_eq!(status.as_u16(), 404);

        router.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_mocked_subgraph_fills_missing_values() {
        let (mut router, addr) = start_host(&["products"]).await;

        let (_, body) = post_query(addr, "products", r#"{ product(upc: "999") { upc name } }"#).await;
        assert_eq!(body["data"]["product"], json!({ "upc": "Hello World", "name": "Hello World" }));

        // authored values survive mocking
        let (_, body) = post_query(addr, "products", r#"{ product(upc: "2") { name } }"#).await;
        assert_eq!(body["data"]["product"]["name"], "Couch");

        router.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_users_never_mocked() {
        let (mut router, addr) = start_host(&["users"]).await;

        let (_, body) = post_query(addr, "users", r#"{ user(id: "user:404") { username } }"#).await;
        assert_eq!(body["errors"][0]["message"], "Could not locate user by id: user:404");

        router.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_health_and_metrics() {
        let (mut router, addr) = start_host(&[]).await;

        let (status, health) = get_json(addr, "/health").await;
        assert_eq!(status, 200);
        assert_eq!(health["status"], "ok");
        assert_eq!(health["host"], "test-host");

        post_query(addr, "products", "{ topProducts { upc } }").await;
        let (status, metrics) = get_json(addr, "/metrics").await;
        assert_eq!(status, 200);
        assert!(metrics["requests"]["total"].as_u64().unwrap() >= 1);

        router.shutdown().await.unwrap();
    }
}
