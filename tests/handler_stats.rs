mod common;

use clickstream_shortener::domain::click_event::ClickEvent;
use clickstream_shortener::domain::repositories::AnalyticsRepository;

#[tokio::test]
async fn test_stats_success() {
    let app = common::create_test_app();
    app.insert_url("abcd", "https://example.com").await;

    for referer in ["https://a.example", "https://a.example", "https://b.example", ""] {
        app.analytics
            .save_click_event(&ClickEvent::new("abcd", "10.0.0.1", "ua", referer))
            .await
            .unwrap();
    }

    let server = app.server();
    let response = server.get("/api/stats/abcd").await;

    response.assert_status_ok();

    let json = response.json::<serde_json::Value>();
    assert_eq!(json["short_code"], "abcd");
    assert_eq!(json["original_url"], "https://example.com");
    assert_eq!(json["total_clicks"], 0);
    assert_eq!(json["clicks_by_date"][0]["count"], 4);
    assert_eq!(json["top_referers"][0]["referer"], "https://a.example");
    assert_eq!(json["top_referers"][0]["count"], 2);
    assert_eq!(json["top_referers"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_stats_after_redirects() {
    let app = common::create_test_app();
    app.insert_url("abcd", "https://example.com").await;
    app.state.click_pipeline.start().await;
    let server = app.server();

    for _ in 0..3 {
        server.get("/abcd").await;
    }
    app.state.click_pipeline.stop().await;

    let json = server
        .get("/api/stats/abcd")
        .await
        .json::<serde_json::Value>();
    assert_eq!(json["total_clicks"], 3);
    assert_eq!(json["clicks_by_date"][0]["count"], 3);
    assert!(json["top_referers"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_stats_not_found() {
    let app = common::create_test_app();
    let server = app.server();

    let response = server.get("/api/stats/nope").await;

    response.assert_status_not_found();
}
