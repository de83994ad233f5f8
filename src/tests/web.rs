use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use super::StubFetcher;
use crate::store::MemoryStore;
use crate::web::{self, SharedState};

const OG_PAGE: &str = r#"<html><head>
    <meta property="og:title" content="OG Title">
    <meta property="og:site_name" content="Example">
</head><body></body></html>"#;

fn app_with(fetcher: Arc<StubFetcher>) -> (Router, Arc<SharedState>) {
    let store = Arc::new(MemoryStore::new());
    let state = Arc::new(SharedState::new(store, fetcher));
    (web::router(state.clone()), state)
}

fn rt() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[test]
pub fn test_preview_rejects_invalid_url() {
    let (app, _state) = app_with(Arc::new(StubFetcher::new(OG_PAGE)));

    rt().block_on(async {
        let response = app
            .oneshot(post_json("/api/preview", json!({"url": "not a url"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Please enter a valid URL");
    });
}

#[test]
pub fn test_preview_happy_path() {
    let fetcher = Arc::new(StubFetcher::new(OG_PAGE));
    let (app, _state) = app_with(fetcher.clone());

    rt().block_on(async {
        let response = app
            .oneshot(post_json(
                "/api/preview",
                json!({"url": "https://example.com/page"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["id"], 1);
        assert_eq!(body["url"], "https://example.com/page");
        assert_eq!(body["title"], "OG Title");
        assert_eq!(body["siteName"], "Example");
        assert_eq!(body["description"], "");
        assert!(body["createdAt"].is_string());
    });

    assert_eq!(fetcher.fetch_count(), 1);
}

#[test]
pub fn test_preview_force_refresh_flag() {
    let fetcher = Arc::new(StubFetcher::new(OG_PAGE));
    let (app, _state) = app_with(fetcher.clone());

    rt().block_on(async {
        let request = json!({"url": "https://example.com/page"});
        let response = app
            .clone()
            .oneshot(post_json("/api/preview", request.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // cached: no extra fetch
        app.clone()
            .oneshot(post_json("/api/preview", request))
            .await
            .unwrap();
        assert_eq!(fetcher.fetch_count(), 1);

        let response = app
            .oneshot(post_json(
                "/api/preview",
                json!({"url": "https://example.com/page", "forceRefresh": true}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["id"], 1);
    });

    assert_eq!(fetcher.fetch_count(), 2);
}

#[test]
pub fn test_preview_fetch_failure_maps_to_400() {
    let (app, _state) = app_with(Arc::new(StubFetcher::failing()));

    rt().block_on(async {
        let response = app
            .oneshot(post_json(
                "/api/preview",
                json!({"url": "http://nonexistent.invalid"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(
            body["message"],
            "Unable to generate preview for this URL. The site may be blocking requests or is temporarily unavailable."
        );
    });
}

#[test]
pub fn test_styles_catalog() {
    let (app, _state) = app_with(Arc::new(StubFetcher::new(OG_PAGE)));

    rt().block_on(async {
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/styles")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let styles = body.as_array().unwrap();
        assert_eq!(styles.len(), 4);
        assert_eq!(styles[0]["name"], "Default");
        assert_eq!(styles[0]["borderRadius"], "12px");
        assert_eq!(styles[0]["layout"], "horizontal");
        assert_eq!(styles[2]["showImage"], false);
    });
}

#[test]
pub fn test_create_style() {
    let (app, _state) = app_with(Arc::new(StubFetcher::new(OG_PAGE)));

    rt().block_on(async {
        let payload = json!({
            "name": "Neon",
            "borderRadius": "20px",
            "borderColor": "#00ff00",
            "backgroundColor": "#000000",
            "textColor": "#ffffff",
            "accentColor": "#00ffcc",
            "showImage": true,
            "showFavicon": false,
            "layout": "vertical"
        });

        let response = app
            .clone()
            .oneshot(post_json("/api/styles", payload))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["id"], 5);
        assert_eq!(body["name"], "Neon");

        // bad color is rejected with the validation message
        let bad = json!({
            "name": "Broken",
            "borderRadius": "20px",
            "borderColor": "#00ff00",
            "backgroundColor": "black",
            "textColor": "#ffffff",
            "accentColor": "#00ffcc",
            "showImage": true,
            "showFavicon": false,
            "layout": "vertical"
        });
        let response = app.oneshot(post_json("/api/styles", bad)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body["message"]
            .as_str()
            .unwrap()
            .contains("backgroundColor"));
    });
}

#[test]
pub fn test_export_unknown_preview_is_404() {
    let (app, _state) = app_with(Arc::new(StubFetcher::new(OG_PAGE)));

    rt().block_on(async {
        let response = app
            .oneshot(post_json("/api/export", json!({"previewId": 42})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    });
}

#[test]
pub fn test_export_rejects_out_of_range_dimensions() {
    let (app, _state) = app_with(Arc::new(StubFetcher::new(OG_PAGE)));

    rt().block_on(async {
        let response = app
            .oneshot(post_json(
                "/api/export",
                json!({"previewId": 1, "width": 100}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body["message"].as_str().unwrap().contains("width"));
    });
}

#[test]
pub fn test_export_returns_image() {
    let (app, state) = app_with(Arc::new(StubFetcher::new(OG_PAGE)));
    state
        .service
        .get_or_fetch("https://example.com/page", false)
        .unwrap();

    rt().block_on(async {
        let response = app
            .clone()
            .oneshot(post_json("/api/export", json!({"previewId": 1})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["content-type"].to_str().unwrap(),
            "image/png"
        );
        assert_eq!(
            response.headers()["content-disposition"].to_str().unwrap(),
            "attachment; filename=\"preview.png\""
        );
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");

        let response = app
            .oneshot(post_json(
                "/api/export",
                json!({"previewId": 1, "format": "webp", "styleId": 2, "width": 600, "height": 300}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["content-type"].to_str().unwrap(),
            "image/webp"
        );
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WEBP");
    });
}
