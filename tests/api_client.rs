//! HTTP behaviour of the API client against an in-process mock server.

mod helpers;

use dashboard::api::{ApiError, PoolUpdateUserRequest, ScoreQuery};
use dashboard::auth::Role;
use dashboard::cache::{KvStore, MemoryStore, Scope, StatusSource};
use futures::future::join_all;
use helpers::{MockApi, POOL_TOKEN, SUPERADMIN_TOKEN, TOKEN, app_with_store, spawn};
use std::sync::Arc;
use std::sync::atomic::Ordering;

async fn setup() -> (MockApi, Arc<MemoryStore>, dashboard::app::App) {
    let api = MockApi::default();
    let base = spawn(api.clone()).await;
    let store = Arc::new(MemoryStore::new());
    let app = app_with_store(&base, store.clone() as Arc<dyn KvStore>);
    (api, store, app)
}

#[tokio::test]
async fn attaches_bearer_token_and_parses_scores() {
    let (api, _store, app) = setup().await;

    let scores = app.dashboard().api().list_scores(2, 17).await.unwrap();

    assert_eq!(scores.len(), 2);
    assert_eq!(scores[0].key, "s_2_17_1");
    assert_eq!(
        api.last_auth.lock().unwrap().as_deref(),
        Some(format!("Bearer {TOKEN}").as_str())
    );
}

#[tokio::test]
async fn concurrent_score_lookups_share_one_request() {
    let (api, _store, app) = setup().await;
    api.score_delay_ms.store(100, Ordering::SeqCst);
    let client = app.dashboard().api();

    let results = join_all((0..6).map(|_| client.list_scores(2, 17))).await;

    assert_eq!(api.score_calls(), 1);
    let first = results[0].as_ref().unwrap();
    assert!(results.iter().all(|r| r.as_ref().unwrap() == first));
    assert_eq!(client.dedup().in_flight(), 0);

    // Settled lookups are not remembered.
    client.list_scores(2, 17).await.unwrap();
    assert_eq!(api.score_calls(), 2);
}

#[tokio::test]
async fn different_parameters_are_not_merged() {
    let (api, _store, app) = setup().await;
    api.score_delay_ms.store(50, Ordering::SeqCst);
    let client = app.dashboard().api();

    let (a, b) = tokio::join!(client.list_scores(2, 17), client.list_scores(2, 18));

    assert_eq!(a.unwrap()[0].key, "s_2_17_1");
    assert_eq!(b.unwrap()[0].key, "s_2_18_1");
    assert_eq!(api.score_calls(), 2);
}

#[tokio::test]
async fn unauthorized_drops_the_session_token() {
    let (_api, store, app) = setup().await;
    store.set("auth_token", "expired").unwrap();
    store.set("auth_user", "{}").unwrap();
    store.set("superadmin_token", "root").unwrap();

    let err = app.dashboard().api().get_user(1).await.unwrap_err();

    assert!(matches!(err, ApiError::Unauthorized));
    assert!(store.get("auth_token").is_none());
    assert!(store.get("auth_user").is_none());
    assert_eq!(store.get("superadmin_token").as_deref(), Some("root"));
}

#[tokio::test]
async fn missing_token_fails_before_any_request() {
    let (api, store, app) = setup().await;
    store.remove("auth_token");

    let err = app.dashboard().api().get_user(1).await.unwrap_err();

    assert!(matches!(err, ApiError::MissingToken));
    assert_eq!(api.user_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn error_body_message_is_surfaced() {
    let (_api, _store, app) = setup().await;
    let client = app.dashboard().api();

    match client.get_user(404).await.unwrap_err() {
        ApiError::Status { status, message } => {
            assert_eq!(status, 404);
            assert_eq!(message, "User not found");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    match client.get_user(500).await.unwrap_err() {
        ApiError::Status { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "API error (500)");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn malformed_body_reports_field_path() {
    let (_api, _store, app) = setup().await;

    let err = app.dashboard().api().latest_score(2, 17).await.unwrap_err();

    match err {
        ApiError::ParseFailed { status, detail, .. } => {
            assert_eq!(status, 200);
            assert!(detail.contains("score"), "{detail}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn user_profile_decodes_tags_and_uniform_number() {
    let (_api, _store, app) = setup().await;

    let user = app.dashboard().api().get_user(5).await.unwrap();

    assert_eq!(user.id, 5);
    assert_eq!(user.tags[0].name, "Rookie");
    assert_eq!(
        user.uniform_number,
        Some(dashboard::api::UniformNumber::Number(23))
    );
}

#[tokio::test]
async fn status_endpoint_depends_on_scope() {
    let (api, _store, app) = setup().await;
    api.set_freshness("abc");
    let client = app.dashboard().api();

    let user = client.cache_status(Scope::User(3)).await.unwrap();
    let tenant = client.cache_status(Scope::Tenant(2)).await.unwrap();

    assert_eq!(user.cache_key, "abc");
    assert_eq!(user.user_id, Some(3));
    assert_eq!(tenant.cache_key, "tenant-abc");
    assert_eq!(tenant.user_count, Some(12));
}

#[tokio::test]
async fn tag_endpoints_round_trip() {
    let (_api, _store, app) = setup().await;
    let client = app.dashboard().api();

    let suggestions = client.tag_suggestions("ro", Some(8)).await.unwrap();
    assert_eq!(suggestions[0].name, "ro|8");
    let unfiltered = client.tag_suggestions("", None).await.unwrap();
    assert_eq!(unfiltered[0].name, "|none");

    let assigned = client.assign_tags(5, &[3, 4]).await.unwrap();
    let names: Vec<_> = assigned.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, ["tag-3", "tag-4"]);

    client.delete_tag(3).await.unwrap();
}

#[tokio::test]
async fn pool_admin_reads_use_the_pool_token_and_share_requests() {
    let (api, store, app) = setup().await;
    store.set("pool_admin_token", POOL_TOKEN).unwrap();
    api.score_delay_ms.store(100, Ordering::SeqCst);
    let client = app.dashboard().api();

    let results = join_all((0..4).map(|_| client.pool_user_scores(17))).await;

    assert_eq!(api.pool_calls(), 1);
    assert!(results.iter().all(|r| r.as_ref().unwrap()[0].key == "s_0_17_1"));
    assert_eq!(api.last_auth(), Some(format!("Bearer {POOL_TOKEN}")));

    let averages = client.pool_user_storage_avg(17).await.unwrap();
    assert_eq!(averages[0].left_ma, Some(0.4));
    assert_eq!(api.pool_calls(), 2);
}

#[tokio::test]
async fn pool_admin_calls_need_their_own_token() {
    let (api, _store, app) = setup().await;

    // Only the member token is stored.
    let err = app.dashboard().api().pool_user_scores(17).await.unwrap_err();

    assert!(matches!(err, ApiError::MissingToken));
    assert_eq!(api.pool_calls(), 0);
}

#[tokio::test]
async fn rejected_pool_token_leaves_member_session_alone() {
    let (_api, store, app) = setup().await;
    store.set("pool_admin_token", "expired").unwrap();
    store.set("pool_admin_user", "{}").unwrap();

    let err = app.dashboard().api().pool_tags().await.unwrap_err();

    assert!(matches!(err, ApiError::Unauthorized));
    assert!(store.get("pool_admin_token").is_none());
    assert!(store.get("pool_admin_user").is_none());
    assert_eq!(store.get("auth_token").as_deref(), Some(TOKEN));
}

#[tokio::test]
async fn null_lists_decode_as_empty() {
    let (_api, store, app) = setup().await;
    store.set("pool_admin_token", POOL_TOKEN).unwrap();
    let client = app.dashboard().api();

    assert!(client.pool_user_scores(0).await.unwrap().is_empty());
    assert!(client.pool_tags().await.unwrap().is_empty());
}

#[tokio::test]
async fn pool_update_reports_protected_tags() {
    let (api, store, app) = setup().await;
    store.set("pool_admin_token", POOL_TOKEN).unwrap();

    let request = PoolUpdateUserRequest {
        name: Some("Avery".into()),
        remove_tags: vec![4, 9],
        ..Default::default()
    };
    let response = app
        .dashboard()
        .api()
        .pool_update_user(17, &request)
        .await
        .unwrap();

    assert_eq!(response.tags_protected, vec![4, 9]);
    assert_eq!(api.last_auth(), Some(format!("Bearer {POOL_TOKEN}")));
}

#[tokio::test]
async fn superadmin_endpoints_use_the_superadmin_token() {
    let (api, store, app) = setup().await;
    store.set("superadmin_token", SUPERADMIN_TOKEN).unwrap();
    let client = app.dashboard().api();

    let devices = client.managed_devices().await.unwrap();
    assert_eq!(devices[0].device_id, "quest-3");
    assert!(!devices[0].permissions.manage_users);
    assert_eq!(api.last_auth(), Some(format!("Bearer {SUPERADMIN_TOKEN}")));

    let query = ScoreQuery {
        limit: Some(20),
        offset: Some(0),
        device_id: Some("quest-3".into()),
    };
    let page = client.all_scores(&query).await.unwrap();
    assert_eq!(page["params"]["limit"], "20");
    assert_eq!(page["params"]["device_id"], "quest-3");
    assert!(page["params"].get("offset").is_none());
}

#[tokio::test]
async fn role_bound_client_sends_shared_endpoints_as_that_role() {
    let (api, store, app) = setup().await;
    store.set("pool_admin_token", POOL_TOKEN).unwrap();
    let pool_client = app.dashboard().api().as_role(Role::PoolAdmin);

    pool_client.cache_status(Scope::User(17)).await.unwrap();

    assert_eq!(api.last_auth(), Some(format!("Bearer {POOL_TOKEN}")));
}
