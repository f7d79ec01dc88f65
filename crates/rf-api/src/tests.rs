use super::*;
use actix_web::cookie::Cookie;
use actix_web::http::{header, StatusCode};
use actix_web::{test, App};
use rf_auth_simple::StaticTokenProvider;
use rf_core::models::Principal;
use rf_db_sqlite::SqliteForumRepo;
use rf_services::ForumService;
use rf_session_memory::MemorySessionStore;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::extract::SESSION_COOKIE;
use crate::handlers::AppState;

const ALICE: &str = "alice-token";
const BOB: &str = "bob-token";

async fn state() -> web::Data<AppState> {
    let repo = SqliteForumRepo::new("sqlite::memory:").await.unwrap();
    let identity = StaticTokenProvider::new()
        .with_token(Principal { id: Uuid::now_v7(), username: "alice".into() }, ALICE)
        .with_token(Principal { id: Uuid::now_v7(), username: "bob".into() }, BOB);
    web::Data::new(AppState {
        forum: ForumService::new(Arc::new(repo)),
        identity: Arc::new(identity),
        sessions: Arc::new(MemorySessionStore::new()),
    })
}

fn auth(token: &str) -> (header::HeaderName, String) {
    (header::AUTHORIZATION, format!("Token {token}"))
}

/// Sends a request through the service; evaluates to an awaitable response.
macro_rules! send {
    ($app:expr, $req:expr $(,)?) => {
        async { test::call_service($app, $req.to_request()).await }
    };
}

/// POSTs `body` as `token`, asserts 201 and yields the JSON body.
macro_rules! create_json {
    ($app:expr, $uri:expr, $token:expr, $body:expr $(,)?) => {
        async {
            let uri: &str = $uri;
            let req = test::TestRequest::post().uri(uri).insert_header(auth($token)).set_json($body);
            let resp = test::call_service($app, req.to_request()).await;
            assert_eq!(resp.status(), StatusCode::CREATED, "POST {uri}");
            let value: Value = test::read_body_json(resp).await;
            value
        }
    };
}

fn id_of(value: &Value) -> &str {
    value["id"].as_str().unwrap()
}

#[actix_web::test]
async fn test_mutations_require_a_token() {
    let app = test::init_service(App::new().app_data(state().await).configure(configure_routes)).await;

    let resp = send!(
        &app,
        test::TestRequest::post()
            .uri("/api/magazines")
            .set_json(json!({"name": "rust", "title": "Rust"})),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"].as_str().unwrap().contains("unauthorized"));

    let resp = send!(
        &app,
        test::TestRequest::post()
            .uri("/api/magazines")
            .insert_header(auth("nope"))
            .set_json(json!({"name": "rust", "title": "Rust"})),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_thread_filter_and_order_are_sticky_per_session() {
    let app = test::init_service(App::new().app_data(state().await).configure(configure_routes)).await;
    let mag = create_json!(&app, "/api/magazines", ALICE, json!({"name": "rust", "title": "Rust"})).await;
    let mag_id = id_of(&mag).to_string();

    let text = create_json!(&app, "/api/threads", ALICE, json!({"magazine_id": mag_id, "title": "text"})).await;
    let low = create_json!(
        &app,
        "/api/threads",
        ALICE,
        json!({"magazine_id": mag_id, "title": "low", "url": "https://a.example"}),
    )
    .await;
    let high = create_json!(
        &app,
        "/api/threads",
        ALICE,
        json!({"magazine_id": mag_id, "title": "high", "url": "https://b.example"}),
    )
    .await;
    assert_eq!(text["is_link"], json!(false));
    create_json!(&app, &format!("/api/threads/{}/boost", id_of(&high)), BOB, json!({})).await;

    let resp = send!(&app, test::TestRequest::get().uri("/api/threads?filter=links&order_by=points")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let session = resp
        .response()
        .cookies()
        .find(|c| c.name() == SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .unwrap();
    let first: Vec<Value> = test::read_body_json(resp).await;

    let resp = send!(
        &app,
        test::TestRequest::get()
            .uri("/api/threads")
            .cookie(Cookie::new(SESSION_COOKIE, session.clone())),
    )
    .await;
    let second: Vec<Value> = test::read_body_json(resp).await;

    assert_eq!(first, second);
    let ids: Vec<&str> = second.iter().map(id_of).collect();
    assert_eq!(ids, vec![id_of(&high), id_of(&low)]);

    // A different session still gets the defaults.
    let resp = send!(&app, test::TestRequest::get().uri("/api/threads")).await;
    let fresh: Vec<Value> = test::read_body_json(resp).await;
    assert_eq!(fresh.len(), 3);
}

#[actix_web::test]
async fn test_boost_twice_conflicts_and_unboost_is_no_content() {
    let app = test::init_service(App::new().app_data(state().await).configure(configure_routes)).await;
    let mag = create_json!(&app, "/api/magazines", ALICE, json!({"name": "rust", "title": "Rust"})).await;
    let thread = create_json!(&app, "/api/threads", ALICE, json!({"magazine_id": id_of(&mag), "title": "t"})).await;
    let uri = format!("/api/threads/{}/boost", id_of(&thread));

    create_json!(&app, &uri, BOB, json!({})).await;
    let resp = send!(&app, test::TestRequest::post().uri(&uri).insert_header(auth(BOB))).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = send!(&app, test::TestRequest::get().uri(&format!("/api/threads/{}", id_of(&thread)))).await;
    let stored: Value = test::read_body_json(resp).await;
    assert_eq!(stored["num_points"], json!(1));

    let resp = send!(&app, test::TestRequest::delete().uri(&uri).insert_header(auth(BOB))).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    let resp = send!(&app, test::TestRequest::delete().uri(&uri).insert_header(auth(BOB))).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_reply_parents_are_validated() {
    let app = test::init_service(App::new().app_data(state().await).configure(configure_routes)).await;
    let mag = create_json!(&app, "/api/magazines", ALICE, json!({"name": "rust", "title": "Rust"})).await;
    let thread = create_json!(&app, "/api/threads", ALICE, json!({"magazine_id": id_of(&mag), "title": "t"})).await;
    let uri = format!("/api/threads/{}/comments", id_of(&thread));

    let comment = create_json!(&app, &uri, ALICE, json!({"body": "root"})).await;
    assert_eq!(comment["kind"], json!("comment"));
    let comment_id = comment["item"]["id"].as_str().unwrap().to_string();

    let reply = create_json!(&app, &uri, BOB, json!({"body": "r1", "parent_comment": comment_id})).await;
    assert_eq!(reply["item"]["reply_level"], json!(1));
    let reply_id = reply["item"]["id"].as_str().unwrap().to_string();

    let nested = create_json!(
        &app,
        &uri,
        ALICE,
        json!({"body": "r2", "parent_comment": comment_id, "parent_reply": reply_id}),
    )
    .await;
    assert_eq!(nested["item"]["reply_level"], json!(2));

    let resp = send!(
        &app,
        test::TestRequest::post()
            .uri(&uri)
            .insert_header(auth(ALICE))
            .set_json(json!({"body": "orphan", "parent_reply": reply_id})),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = send!(&app, test::TestRequest::get().uri(&format!("/api/comments/{comment_id}/replies"))).await;
    let tree: Vec<Value> = test::read_body_json(resp).await;
    assert_eq!(tree.len(), 1);
    assert_eq!(tree[0]["replies"].as_array().unwrap().len(), 1);

    let resp = send!(&app, test::TestRequest::get().uri(&format!("/api/threads/{}", id_of(&thread)))).await;
    let stored: Value = test::read_body_json(resp).await;
    assert_eq!(stored["num_comments"], json!(3));
}

#[actix_web::test]
async fn test_vote_toggle_and_retraction_routes() {
    let app = test::init_service(App::new().app_data(state().await).configure(configure_routes)).await;
    let mag = create_json!(&app, "/api/magazines", ALICE, json!({"name": "rust", "title": "Rust"})).await;
    let thread = create_json!(&app, "/api/threads", ALICE, json!({"magazine_id": id_of(&mag), "title": "t"})).await;
    let like = format!("/api/threads/{}/like", id_of(&thread));
    let dislike = format!("/api/threads/{}/dislike", id_of(&thread));

    let resp = send!(&app, test::TestRequest::post().uri(&like).insert_header(auth(BOB))).await;
    let outcome: Value = test::read_body_json(resp).await;
    assert_eq!((outcome["state"].clone(), outcome["num_likes"].clone()), (json!("like"), json!(1)));

    let resp = send!(&app, test::TestRequest::post().uri(&dislike).insert_header(auth(BOB))).await;
    let outcome: Value = test::read_body_json(resp).await;
    assert_eq!((outcome["num_likes"].clone(), outcome["num_dislikes"].clone()), (json!(0), json!(1)));

    let resp = send!(&app, test::TestRequest::delete().uri(&like).insert_header(auth(BOB))).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let resp = send!(&app, test::TestRequest::delete().uri(&dislike).insert_header(auth(BOB))).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = send!(&app, test::TestRequest::get().uri(&format!("/api/threads/{}", id_of(&thread)))).await;
    let stored: Value = test::read_body_json(resp).await;
    assert_eq!((stored["num_likes"].clone(), stored["num_dislikes"].clone()), (json!(0), json!(0)));
}

#[actix_web::test]
async fn test_only_the_author_may_edit() {
    let app = test::init_service(App::new().app_data(state().await).configure(configure_routes)).await;
    let mag = create_json!(&app, "/api/magazines", ALICE, json!({"name": "rust", "title": "Rust"})).await;
    let thread = create_json!(&app, "/api/threads", ALICE, json!({"magazine_id": id_of(&mag), "title": "t"})).await;
    let uri = format!("/api/threads/{}", id_of(&thread));

    let resp = send!(
        &app,
        test::TestRequest::patch().uri(&uri).insert_header(auth(BOB)).set_json(json!({"title": "mine now"})),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = send!(
        &app,
        test::TestRequest::patch().uri(&uri).insert_header(auth(ALICE)).set_json(json!({"title": "renamed"})),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Value = test::read_body_json(resp).await;
    assert_eq!(updated["title"], json!("renamed"));
}

#[actix_web::test]
async fn test_reads_carry_the_callers_own_votes_and_boosts() {
    let app = test::init_service(App::new().app_data(state().await).configure(configure_routes)).await;
    let mag = create_json!(&app, "/api/magazines", ALICE, json!({"name": "rust", "title": "Rust"})).await;
    let thread = create_json!(&app, "/api/threads", ALICE, json!({"magazine_id": id_of(&mag), "title": "t"})).await;
    let thread_uri = format!("/api/threads/{}", id_of(&thread));
    let comment = create_json!(&app, &format!("{thread_uri}/comments"), ALICE, json!({"body": "root"})).await;
    let comment_id = comment["item"]["id"].as_str().unwrap().to_string();

    send!(&app, test::TestRequest::post().uri(&format!("{thread_uri}/like")).insert_header(auth(BOB))).await;
    send!(&app, test::TestRequest::post().uri(&format!("{thread_uri}/boost")).insert_header(auth(BOB))).await;
    send!(
        &app,
        test::TestRequest::post().uri(&format!("/api/comments/{comment_id}/dislike")).insert_header(auth(BOB)),
    )
    .await;

    // Anonymous callers see nulls.
    let resp = send!(&app, test::TestRequest::get().uri(&thread_uri)).await;
    let anonymous: Value = test::read_body_json(resp).await;
    assert_eq!(anonymous["user_has_liked"], json!(null));
    assert_eq!(anonymous["user_has_disliked"], json!(null));

    let resp = send!(&app, test::TestRequest::get().uri(&thread_uri).insert_header(auth(BOB))).await;
    let seen_by_bob: Value = test::read_body_json(resp).await;
    assert_eq!(seen_by_bob["user_has_liked"], json!(true));
    assert_eq!(seen_by_bob["user_has_disliked"], json!(false));
    assert_eq!(seen_by_bob["user_has_boosted"], json!(true));

    let resp = send!(&app, test::TestRequest::get().uri("/api/threads").insert_header(auth(ALICE))).await;
    let seen_by_alice: Vec<Value> = test::read_body_json(resp).await;
    assert_eq!(seen_by_alice[0]["user_has_liked"], json!(false));
    assert_eq!(seen_by_alice[0]["user_has_boosted"], json!(false));

    let resp = send!(
        &app,
        test::TestRequest::get().uri(&format!("{thread_uri}/comments")).insert_header(auth(BOB)),
    )
    .await;
    let comments: Vec<Value> = test::read_body_json(resp).await;
    assert_eq!(comments[0]["user_has_disliked"], json!(true));
    assert!(comments[0].get("user_has_boosted").is_none());

    let resp = send!(&app, test::TestRequest::get().uri(&thread_uri).insert_header(auth("nope"))).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_user_info_route() {
    let app = test::init_service(App::new().app_data(state().await).configure(configure_routes)).await;
    let mag = create_json!(&app, "/api/magazines", ALICE, json!({"name": "rust", "title": "Rust"})).await;
    let thread = create_json!(&app, "/api/threads", ALICE, json!({"magazine_id": id_of(&mag), "title": "t"})).await;
    let author = thread["author_id"].as_str().unwrap().to_string();
    create_json!(&app, &format!("/api/threads/{}/comments", id_of(&thread)), ALICE, json!({"body": "hi"})).await;

    let resp = send!(&app, test::TestRequest::get().uri(&format!("/api/users/{author}"))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let info: Value = test::read_body_json(resp).await;
    assert_eq!(info["username"], json!("alice"));
    assert_eq!(info["id"], json!(author));
    assert_eq!((info["threads_count"].clone(), info["comments_count"].clone()), (json!(1), json!(1)));
    assert_eq!(info["boosts_count"], json!(0));

    let resp = send!(&app, test::TestRequest::get().uri(&format!("/api/users/{}", Uuid::now_v7()))).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
