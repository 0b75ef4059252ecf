//! Feed composition through the HTTP surface
#[macro_use]
mod common;

use actix_web::http::StatusCode;
use actix_web::test;
use serde_json::{json, Value};
use uuid::Uuid;

use common::{multipart, Part};
use reels_service::middleware::{USERNAME_HEADER, USER_ID_HEADER};

fn ids(items: &Value) -> Vec<String> {
    items
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["id"].as_str().unwrap().to_string())
        .collect()
}

#[actix_web::test]
async fn test_upload_create_and_view_from_third_party() {
    let dir = tempfile::tempdir().unwrap();
    let state = common::test_state(dir.path()).await;
    let app = test_app!(state);

    let author = Uuid::new_v4();
    let (content_type, body) = multipart(&[
        Part::file("video", "clip.mp4", "video/mp4", vec![0u8; 2048]),
        Part::file("thumbnail", "cover.jpg", "image/jpeg", vec![1u8; 512]),
    ]);
    let req = test::TestRequest::post()
        .uri("/api/v1/reels/upload")
        .insert_header((USER_ID_HEADER, author.to_string()))
        .insert_header((USERNAME_HEADER, "maker"))
        .insert_header(("content-type", content_type))
        .set_payload(body)
        .to_request();
    let upload: Value = test::call_and_read_body_json(&app, req).await;
    let video_url = upload["videoUrl"].as_str().unwrap().to_string();
    assert!(video_url.starts_with("/media/"));
    assert!(video_url.ends_with(".mp4"));
    assert!(upload["thumbnailUrl"].as_str().unwrap().ends_with(".jpg"));

    let req = test::TestRequest::post()
        .uri("/api/v1/reels")
        .insert_header((USER_ID_HEADER, author.to_string()))
        .set_json(json!({
            "videoUrl": video_url,
            "thumbnailUrl": upload["thumbnailUrl"],
            "caption": "first goal of the season",
            "hashtags": ["#Goal", "goal", "Derby"],
            "category": "football",
        }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: Value = test::read_body_json(res).await;
    assert_eq!(created["hashtags"], json!(["goal", "derby"]));
    assert_eq!(created["author"]["username"], "maker");

    let viewer = Uuid::new_v4();
    let req = test::TestRequest::get()
        .uri("/api/v1/reels/trending?page=1&limit=10")
        .insert_header((USER_ID_HEADER, viewer.to_string()))
        .to_request();
    let feed: Value = test::call_and_read_body_json(&app, req).await;
    let items = feed.as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], created["id"]);
    assert_eq!(items[0]["likeCount"], 0);
    assert_eq!(items[0]["isLiked"], false);
    assert_eq!(items[0]["author"]["id"], json!(author));

    // the file is reachable through the storage directory
    let filename = upload["filename"].as_str().unwrap();
    assert!(dir.path().join(filename).is_file());
}

#[actix_web::test]
async fn test_create_without_video_url_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let state = common::test_state(dir.path()).await;
    let app = test_app!(state);

    let req = test::TestRequest::post()
        .uri("/api/v1/reels")
        .insert_header((USER_ID_HEADER, Uuid::new_v4().to_string()))
        .set_json(json!({ "caption": "no video" }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_trending_orders_by_engagement_then_recency() {
    let dir = tempfile::tempdir().unwrap();
    let state = common::test_state(dir.path()).await;
    let app = test_app!(state);

    let author = Uuid::new_v4().to_string();
    let mut reel_ids = Vec::new();
    for n in 0..3 {
        let req = test::TestRequest::post()
            .uri("/api/v1/reels")
            .insert_header((USER_ID_HEADER, author.clone()))
            .set_json(json!({ "videoUrl": format!("https://cdn.example.com/{n}.mp4") }))
            .to_request();
        let reel: Value = test::call_and_read_body_json(&app, req).await;
        reel_ids.push(reel["id"].as_str().unwrap().to_string());
    }
    let (oldest, middle, newest) = (&reel_ids[0], &reel_ids[1], &reel_ids[2]);

    // oldest: two likes, middle: one comment, newest: nothing
    for _ in 0..2 {
        let req = test::TestRequest::post()
            .uri(&format!("/api/v1/reels/{oldest}/like"))
            .insert_header((USER_ID_HEADER, Uuid::new_v4().to_string()))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    }
    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/reels/{middle}/comments"))
        .insert_header((USER_ID_HEADER, Uuid::new_v4().to_string()))
        .set_json(json!({ "content": "wow" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

    let req = test::TestRequest::get().uri("/api/v1/reels/trending").to_request();
    let feed: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(ids(&feed), vec![oldest.clone(), middle.clone(), newest.clone()]);
    assert_eq!(feed[0]["likeCount"], 2);
    assert_eq!(feed[1]["commentCount"], 1);

    // a second page past the end is empty
    let req = test::TestRequest::get()
        .uri("/api/v1/reels/trending?page=2&limit=3")
        .to_request();
    let feed: Value = test::call_and_read_body_json(&app, req).await;
    assert!(feed.as_array().unwrap().is_empty());
}

#[actix_web::test]
async fn test_blocked_author_disappears_from_viewer_feeds() {
    let dir = tempfile::tempdir().unwrap();
    let state = common::test_state(dir.path()).await;
    let app = test_app!(state);

    let troll = Uuid::new_v4();
    let friend = Uuid::new_v4();
    let viewer = Uuid::new_v4();

    for (author, n) in [(troll, 0), (friend, 1)] {
        let req = test::TestRequest::post()
            .uri("/api/v1/reels")
            .insert_header((USER_ID_HEADER, author.to_string()))
            .set_json(json!({ "videoUrl": format!("https://cdn.example.com/{n}.mp4") }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);
    }

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/reels/users/{troll}/block"))
        .insert_header((USER_ID_HEADER, viewer.to_string()))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    for mode in ["feed", "trending", "explore"] {
        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/reels/{mode}"))
            .insert_header((USER_ID_HEADER, viewer.to_string()))
            .to_request();
        let feed: Value = test::call_and_read_body_json(&app, req).await;
        let items = feed.as_array().unwrap();
        assert_eq!(items.len(), 1, "mode {mode}");
        assert_eq!(items[0]["authorId"], json!(friend));
    }

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/reels/users/{troll}/reels"))
        .insert_header((USER_ID_HEADER, viewer.to_string()))
        .to_request();
    let feed: Value = test::call_and_read_body_json(&app, req).await;
    assert!(feed.as_array().unwrap().is_empty());

    // blocking is one-directional
    let req = test::TestRequest::get()
        .uri("/api/v1/reels/trending")
        .insert_header((USER_ID_HEADER, troll.to_string()))
        .to_request();
    let feed: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(feed.as_array().unwrap().len(), 2);

    let req = test::TestRequest::get()
        .uri("/api/v1/reels/users/blocked")
        .insert_header((USER_ID_HEADER, viewer.to_string()))
        .to_request();
    let blocked: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(blocked[0]["id"], json!(troll));

    let req = test::TestRequest::delete()
        .uri(&format!("/api/v1/reels/users/{troll}/block"))
        .insert_header((USER_ID_HEADER, viewer.to_string()))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri("/api/v1/reels/trending")
        .insert_header((USER_ID_HEADER, viewer.to_string()))
        .to_request();
    let feed: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(feed.as_array().unwrap().len(), 2);
}

#[actix_web::test]
async fn test_self_block_and_double_block_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let state = common::test_state(dir.path()).await;
    let app = test_app!(state);

    let me = Uuid::new_v4();
    let other = Uuid::new_v4();

    // register the other user
    let req = test::TestRequest::get()
        .uri("/api/v1/reels/feed")
        .insert_header((USER_ID_HEADER, other.to_string()))
        .to_request();
    test::call_service(&app, req).await;

    let block = |target: Uuid| {
        test::TestRequest::post()
            .uri(&format!("/api/v1/reels/users/{target}/block"))
            .insert_header((USER_ID_HEADER, me.to_string()))
            .to_request()
    };

    assert_eq!(test::call_service(&app, block(me)).await.status(), StatusCode::BAD_REQUEST);
    assert_eq!(test::call_service(&app, block(other)).await.status(), StatusCode::OK);
    assert_eq!(test::call_service(&app, block(other)).await.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        test::call_service(&app, block(Uuid::new_v4())).await.status(),
        StatusCode::NOT_FOUND
    );
}

#[actix_web::test]
async fn test_max_page_number_returns_empty_page() {
    let dir = tempfile::tempdir().unwrap();
    let state = common::test_state(dir.path()).await;
    let app = test_app!(state);

    for feed in ["trending", "explore", "feed", "saved"] {
        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/reels/{feed}?page={}&limit=50", usize::MAX))
            .insert_header((USER_ID_HEADER, Uuid::new_v4().to_string()))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK, "{feed}");
        let items: Value = test::read_body_json(res).await;
        assert_eq!(items, json!([]));
    }
}
