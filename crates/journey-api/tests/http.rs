mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{account, app, call, group, invite_and_join, invite_path};

#[tokio::test]
async fn health_is_public_and_groups_are_not() {
    let app = app();
    let (status, _) = call(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(&app, "GET", "/groups", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "missing bearer token");

    let (status, _) = call(&app, "GET", "/groups", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn sign_up_rejects_duplicates_and_bad_passwords() {
    let app = app();
    account(&app, "alice01").await;

    let dup = json!({ "login": "alice01", "email": "other@trip.io", "password": "hunter22" });
    let (status, body) = call(&app, "POST", "/auth/sign-up", None, Some(dup)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "this login is already registered");

    let wrong = json!({ "login": "alice01", "password": "wrong-one" });
    let (status, _) = call(&app, "POST", "/auth/sign-in", None, Some(wrong)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn invite_and_join_flow() {
    let app = app();
    let alice = account(&app, "alice01").await;
    let bob = account(&app, "bobby01").await;
    let group_id = group(&app, &alice).await;

    let uri = format!("/groups/{}/invites", group_id);
    let bobby = json!({ "login": "bobby01" });
    let (status, _) = call(&app, "POST", &uri, Some(&alice), Some(bobby.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = call(&app, "POST", &uri, Some(&alice), Some(bobby)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "this user is already invited to this group");

    let (_, invites) = call(&app, "GET", "/groups/invites", Some(&bob), None).await;
    assert_eq!(invites[0]["text"], "User alice01 invited you to the group Alps 2030");
    let path = invite_path(&app, &bob).await;

    let (status, body) = call(&app, "GET", &path, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], group_id.as_str());

    let group_uri = format!("/groups/{}", group_id);
    let (status, body) = call(&app, "GET", &group_uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["members"], json!(["alice01", "bobby01"]));
    assert_eq!(body["leader_login"], "alice01");

    // Token is single use.
    let (status, _) = call(&app, "GET", &path, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn leader_leaving_passes_the_role_on() {
    let app = app();
    let alice = account(&app, "alice01").await;
    let bob = account(&app, "bobby01").await;
    let group_id = group(&app, &alice).await;
    invite_and_join(&app, &alice, &group_id, "bobby01", &bob).await;

    let leave = format!("/groups/{}/leave", group_id);
    let (status, _) = call(&app, "POST", &leave, Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);

    let group_uri = format!("/groups/{}", group_id);
    let (_, body) = call(&app, "GET", &group_uri, Some(&bob), None).await;
    assert_eq!(body["leader_login"], "bobby01");
    assert_eq!(body["members"], json!(["bobby01"]));

    let (status, _) = call(&app, "GET", &group_uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn tasks_reject_overlaps() {
    let app = app();
    let alice = account(&app, "alice01").await;
    let group_id = group(&app, &alice).await;

    let task = |title: &str, time: &str, hours: i64| {
        json!({
            "group_id": group_id,
            "title": title,
            "start": { "start_date": "2099-06-01", "start_time": time },
            "duration": { "days": 0, "hours": hours, "minutes": 0 }
        })
    };

    let museum = task("Museum", "10:00", 2);
    let (status, _) = call(&app, "POST", "/tasks", Some(&alice), Some(museum)).await;
    assert_eq!(status, StatusCode::CREATED);

    let clash = task("Lunch", "11:00", 1);
    let (status, body) = call(&app, "POST", "/tasks", Some(&alice), Some(clash)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "task overlaps with an existing task: Museum");

    let lunch = task("Lunch", "12:00", 1);
    let (status, _) = call(&app, "POST", "/tasks", Some(&alice), Some(lunch)).await;
    assert_eq!(status, StatusCode::CREATED);

    let list = format!("/tasks?group_id={}", group_id);
    let (status, tasks) = call(&app, "GET", &list, Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tasks.as_array().unwrap().len(), 2);
    assert_eq!(tasks[0]["title"], "Museum");
    assert_eq!(tasks[0]["duration"], 120);
}

#[tokio::test]
async fn polls_count_one_vote_per_member() {
    let app = app();
    let alice = account(&app, "alice01").await;
    let group_id = group(&app, &alice).await;

    let poll = json!({
        "group_id": group_id,
        "title": "Dinner?",
        "first_option": "Pizza",
        "second_option": "Pasta",
        "duration": 0
    });
    let (status, body) = call(&app, "POST", "/polls", Some(&alice), Some(poll)).await;
    assert_eq!(status, StatusCode::CREATED);
    let poll_id = body["id"].as_str().unwrap().to_string();

    let vote_uri = format!("/polls/{}/vote", poll_id);
    for option in ["firstOption", "secondOption"] {
        let vote = json!({ "group_id": group_id, "option": option });
        let (status, _) = call(&app, "PUT", &vote_uri, Some(&alice), Some(vote)).await;
        assert_eq!(status, StatusCode::OK);
    }
    let bad = json!({ "group_id": group_id, "option": "maybe" });
    let (status, _) = call(&app, "PUT", &vote_uri, Some(&alice), Some(bad)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let list = format!("/polls?group_id={}", group_id);
    let (_, polls) = call(&app, "GET", &list, Some(&alice), None).await;
    assert_eq!(polls["open"][0]["first_votes_count"], 0);
    assert_eq!(polls["open"][0]["second_votes_count"], 1);

    let close_uri = format!("/polls/{}/close?group_id={}", poll_id, group_id);
    let (status, _) = call(&app, "PUT", &close_uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = call(&app, "PUT", &close_uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "poll is already closed");
}

#[tokio::test]
async fn chat_upgrade_requires_membership() {
    let app = app();
    let alice = account(&app, "alice01").await;
    let mallory = account(&app, "mallory").await;
    let group_id = group(&app, &alice).await;

    let uri = format!("/groups/ws?group_id={}", group_id);
    let (status, _) = call(&app, "GET", &uri, Some(&mallory), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(&app, "GET", "/groups/ws?group_id=nope", Some(&alice), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
