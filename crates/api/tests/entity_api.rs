//! HTTP-level tests for the entity hierarchy, permissions, and grant
//! administration.

mod common;

use std::time::Duration;

use arbor_core::roles::AccessLevel;
use arbor_core::types::DbId;
use arbor_db::repositories::UserRoleRepo;
use arbor_db::store::PgEntityTransaction;
use axum::http::StatusCode;
use common::{body_json, delete_auth, get_auth, grant, post_json_auth, put_json_auth};
use serde_json::{json, Value};
use sqlx::PgPool;

const ADMIN: DbId = 1;
const ALICE: DbId = 2;
const BOB: DbId = 3;

async fn create(pool: &PgPool, body: Value) -> Value {
    let app = common::build_test_app(pool.clone());
    let response = post_json_auth(app, "/api/v1/entities", ADMIN, body).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["data"].clone()
}

/// Eng (dept, root) -> Team (dept) -> Doc (article), plus Ops (dept, root).
/// Returns `(eng, team, doc, ops)`.
async fn seed_tree(pool: &PgPool) -> (DbId, DbId, DbId, DbId) {
    grant(pool, ADMIN, AccessLevel::Admin, None).await;
    let eng = create(pool, json!({ "entity_type": "department", "name": "Eng" })).await;
    let eng = eng["id"].as_i64().unwrap();
    let team = create(
        pool,
        json!({ "entity_type": "department", "name": "Team", "parent_id": eng }),
    )
    .await["id"]
        .as_i64()
        .unwrap();
    let doc = create(
        pool,
        json!({ "entity_type": "article", "name": "Doc", "content": "v1", "parent_id": team }),
    )
    .await["id"]
        .as_i64()
        .unwrap();
    let ops = create(pool, json!({ "entity_type": "department", "name": "Ops" })).await["id"]
        .as_i64()
        .unwrap();
    (eng, team, doc, ops)
}

// ---------------------------------------------------------------------------
// Tree
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn scoped_reader_sees_granted_subtree(pool: PgPool) {
    let (eng, team, doc, _ops) = seed_tree(&pool).await;
    grant(&pool, ALICE, AccessLevel::Read, Some(eng)).await;

    let app = common::build_test_app(pool);
    let response = get_auth(app, "/api/v1/entities/tree", ALICE).await;
    assert_eq!(response.status(), StatusCode::OK);

    let forest = body_json(response).await["data"].clone();
    let roots = forest.as_array().unwrap();
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0]["id"], eng);
    assert_eq!(roots[0]["children"][0]["id"], team);
    assert_eq!(roots[0]["children"][0]["children"][0]["id"], doc);
    assert_eq!(roots[0]["children"][0]["children"][0]["entity_type"], "article");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn admin_tree_lists_every_root_sorted_by_name(pool: PgPool) {
    seed_tree(&pool).await;

    let app = common::build_test_app(pool);
    let forest = body_json(get_auth(app, "/api/v1/entities/tree", ADMIN).await).await;
    let names: Vec<_> = forest["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["Eng", "Ops"]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn reader_of_leaf_sees_its_ancestors(pool: PgPool) {
    let (eng, team, doc, _ops) = seed_tree(&pool).await;
    grant(&pool, ALICE, AccessLevel::Read, Some(doc)).await;

    let app = common::build_test_app(pool.clone());
    let forest = body_json(get_auth(app, "/api/v1/entities/tree", ALICE).await).await;
    assert_eq!(forest["data"][0]["id"], eng);
    assert_eq!(forest["data"][0]["children"][0]["id"], team);

    let app = common::build_test_app(pool);
    let response = get_auth(app, &format!("/api/v1/entities/{eng}"), ALICE).await;
    assert_eq!(response.status(), StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Create / update / delete
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn article_without_parent_is_400(pool: PgPool) {
    grant(&pool, ADMIN, AccessLevel::Admin, None).await;
    let app = common::build_test_app(pool);

    let response = post_json_auth(
        app,
        "/api/v1/entities",
        ADMIN,
        json!({ "entity_type": "article", "name": "Orphan" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "PARENT_REQUIRED");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn department_under_article_is_400(pool: PgPool) {
    let (_eng, team, doc, _ops) = seed_tree(&pool).await;
    let app = common::build_test_app(pool);

    let response = put_json_auth(
        app,
        &format!("/api/v1/entities/{team}"),
        ADMIN,
        json!({ "name": "Team", "parent_id": doc }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "PARENT_TYPE_INCOMPATIBLE");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn moving_under_own_descendant_is_400(pool: PgPool) {
    let (eng, team, _doc, _ops) = seed_tree(&pool).await;
    let app = common::build_test_app(pool);

    let response = put_json_auth(
        app,
        &format!("/api/v1/entities/{eng}"),
        ADMIN,
        json!({ "name": "Eng", "parent_id": team }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "PARENT_CYCLE");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn missing_parent_is_404(pool: PgPool) {
    grant(&pool, ADMIN, AccessLevel::Admin, None).await;
    let app = common::build_test_app(pool);

    let response = post_json_auth(
        app,
        "/api/v1/entities",
        ADMIN,
        json!({ "entity_type": "department", "name": "Lost", "parent_id": 999_999 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn writer_creates_under_granted_parent_only(pool: PgPool) {
    let (_eng, team, _doc, ops) = seed_tree(&pool).await;
    grant(&pool, BOB, AccessLevel::Write, Some(team)).await;

    let app = common::build_test_app(pool.clone());
    let response = post_json_auth(
        app,
        "/api/v1/entities",
        BOB,
        json!({ "entity_type": "article", "name": "Notes", "parent_id": team }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await["data"].clone();
    assert_eq!(created["created_by"], BOB);
    assert_eq!(created["status"], "published");
    assert_eq!(created["current_version"], 1);

    let app = common::build_test_app(pool.clone());
    let response = post_json_auth(
        app,
        "/api/v1/entities",
        BOB,
        json!({ "entity_type": "article", "name": "Elsewhere", "parent_id": ops }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let app = common::build_test_app(pool);
    let response = post_json_auth(
        app,
        "/api/v1/entities",
        BOB,
        json!({ "entity_type": "department", "name": "NewRoot" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn reader_cannot_update(pool: PgPool) {
    let (eng, _team, doc, _ops) = seed_tree(&pool).await;
    grant(&pool, ALICE, AccessLevel::Read, Some(eng)).await;
    let app = common::build_test_app(pool);

    let response = put_json_auth(
        app,
        &format!("/api/v1/entities/{doc}"),
        ALICE,
        json!({ "name": "Doc" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn published_updates_append_versions(pool: PgPool) {
    let (_eng, _team, doc, _ops) = seed_tree(&pool).await;

    for content in ["v2", "v3"] {
        let app = common::build_test_app(pool.clone());
        let response = put_json_auth(
            app,
            &format!("/api/v1/entities/{doc}"),
            ADMIN,
            json!({ "name": "Doc", "content": content }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let app = common::build_test_app(pool.clone());
    let versions = body_json(
        get_auth(app, &format!("/api/v1/entities/{doc}/versions"), ADMIN).await,
    )
    .await;
    let numbers: Vec<_> = versions["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["version"].as_i64().unwrap())
        .collect();
    assert_eq!(numbers, vec![1, 2, 3]);

    let app = common::build_test_app(pool.clone());
    let v2 = body_json(get_auth(app, &format!("/api/v1/entities/{doc}/versions/2"), ADMIN).await)
        .await;
    assert_eq!(v2["data"]["content"], "v2");

    let app = common::build_test_app(pool);
    let response = get_auth(app, &format!("/api/v1/entities/{doc}/versions/9"), ADMIN).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn drafting_parent_with_children_is_400_until_emptied(pool: PgPool) {
    let (_eng, team, doc, ops) = seed_tree(&pool).await;

    let app = common::build_test_app(pool.clone());
    let response = put_json_auth(
        app,
        &format!("/api/v1/entities/{team}"),
        ADMIN,
        json!({ "name": "Team", "is_draft": true }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "CANNOT_DRAFT_WITH_CHILDREN");

    let app = common::build_test_app(pool.clone());
    let response = put_json_auth(
        app,
        &format!("/api/v1/entities/{doc}"),
        ADMIN,
        json!({ "name": "Doc", "parent_id": ops }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let app = common::build_test_app(pool);
    let response = put_json_auth(
        app,
        &format!("/api/v1/entities/{team}"),
        ADMIN,
        json!({ "name": "Team", "is_draft": true }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["status"], "draft");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn delete_removes_subtree(pool: PgPool) {
    let (eng, team, doc, _ops) = seed_tree(&pool).await;

    let app = common::build_test_app(pool.clone());
    let response = delete_auth(app, &format!("/api/v1/entities/{eng}"), ADMIN).await;
    assert_eq!(response.status(), StatusCode::OK);
    let mut deleted: Vec<_> = body_json(response).await["data"]["deleted_ids"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_i64().unwrap())
        .collect();
    deleted.sort_unstable();
    assert_eq!(deleted, vec![eng, team, doc]);

    let app = common::build_test_app(pool);
    let response = get_auth(app, &format!("/api/v1/entities/{doc}"), ADMIN).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn write_permission_is_checked_under_the_structural_lock(pool: PgPool) {
    let (_eng, team, doc, _ops) = seed_tree(&pool).await;
    grant(&pool, BOB, AccessLevel::Write, Some(team)).await;
    let grant_id: DbId = sqlx::query_scalar("SELECT id FROM user_roles WHERE user_id = $1")
        .bind(BOB)
        .fetch_one(&pool)
        .await
        .unwrap();

    // Hold the lock so BOB's update queues behind it.
    let held = PgEntityTransaction::begin(&pool).await.unwrap();
    let app = common::build_test_app(pool.clone());
    let pending = tokio::spawn(async move {
        let uri = format!("/api/v1/entities/{doc}");
        put_json_auth(app, &uri, BOB, json!({ "name": "Doc" }))
            .await
            .status()
    });
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert!(UserRoleRepo::delete(&pool, grant_id).await.unwrap());
    held.commit().await.unwrap();

    assert_eq!(pending.await.unwrap(), StatusCode::FORBIDDEN);
    let versions: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM entity_versions WHERE entity_id = $1")
            .bind(doc)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(versions, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn scoped_reader_gets_403_for_unknown_ids(pool: PgPool) {
    let (eng, ..) = seed_tree(&pool).await;
    grant(&pool, ALICE, AccessLevel::Read, Some(eng)).await;

    let app = common::build_test_app(pool.clone());
    let response = get_auth(app, "/api/v1/entities/999999", ALICE).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let app = common::build_test_app(pool);
    let response = get_auth(app, "/api/v1/entities/999999", ADMIN).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Permissions and grants
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn permissions_report_direct_grants(pool: PgPool) {
    let (eng, team, _doc, _ops) = seed_tree(&pool).await;
    grant(&pool, ALICE, AccessLevel::Read, Some(eng)).await;
    grant(&pool, ALICE, AccessLevel::Write, Some(team)).await;

    let app = common::build_test_app(pool.clone());
    let read = body_json(get_auth(app, "/api/v1/permissions", ALICE).await).await;
    assert_eq!(read["data"]["is_admin"], false);
    assert_eq!(read["data"]["entity_ids"], json!([eng, team]));

    let app = common::build_test_app(pool.clone());
    let write = body_json(get_auth(app, "/api/v1/permissions?level=write", ALICE).await).await;
    assert_eq!(write["data"]["entity_ids"], json!([team]));

    let app = common::build_test_app(pool.clone());
    let admin = body_json(get_auth(app, "/api/v1/permissions?level=read", ADMIN).await).await;
    assert_eq!(admin["data"]["is_admin"], true);
    assert_eq!(admin["data"]["entity_ids"], json!([]));

    let app = common::build_test_app(pool);
    let response = get_auth(app, "/api/v1/permissions?level=owner", ALICE).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn admin_grants_and_revokes_roles(pool: PgPool) {
    let (eng, ..) = seed_tree(&pool).await;

    let app = common::build_test_app(pool.clone());
    let response = post_json_auth(
        app,
        &format!("/api/v1/admin/users/{ALICE}/roles"),
        ADMIN,
        json!({ "role": "read", "entity_id": eng }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let grant_id = body_json(response).await["data"]["id"].as_i64().unwrap();

    let app = common::build_test_app(pool.clone());
    let response = post_json_auth(
        app,
        &format!("/api/v1/admin/users/{ALICE}/roles"),
        ADMIN,
        json!({ "role": "read", "entity_id": eng }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let app = common::build_test_app(pool.clone());
    let response = get_auth(app, &format!("/api/v1/entities/{eng}"), ALICE).await;
    assert_eq!(response.status(), StatusCode::OK);

    let app = common::build_test_app(pool.clone());
    let response = delete_auth(app, &format!("/api/v1/admin/roles/{grant_id}"), ADMIN).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let app = common::build_test_app(pool);
    let response = get_auth(app, &format!("/api/v1/entities/{eng}"), ALICE).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn non_admin_cannot_manage_roles(pool: PgPool) {
    let (eng, ..) = seed_tree(&pool).await;
    grant(&pool, BOB, AccessLevel::Admin, Some(eng)).await;

    let app = common::build_test_app(pool);
    let response = get_auth(app, &format!("/api/v1/admin/users/{ALICE}/roles"), BOB).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
