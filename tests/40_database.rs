// Behaviour that needs PostgreSQL. Every test returns early unless
// TEST_DATABASE_URL points at a disposable database.

mod common;

use std::collections::HashMap;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

use common::db::TestDatabase;
use template_store_api::database::models::{OrderStatus, UserRole};
use template_store_api::integrations::payment::CheckoutSession;
use template_store_api::services::{
    blog_service::BlogPostInput, category_service::CategoryInput, BlogService, CategoryService, ClientInfo,
    OrderService, TemplateService, UserService,
};

fn paid_session(id: &str, user_id: uuid::Uuid, template_id: uuid::Uuid) -> CheckoutSession {
    CheckoutSession {
        id: id.to_string(),
        url: None,
        payment_status: "paid".to_string(),
        amount_total: Some(1999),
        payment_intent: Some(format!("pi_{}", id)),
        metadata: HashMap::from([
            ("userId".to_string(), user_id.to_string()),
            ("templateId".to_string(), template_id.to_string()),
        ]),
        customer_email: None,
    }
}

#[tokio::test]
async fn concurrent_session_completion_applies_once() -> Result<()> {
    let Some(db) = TestDatabase::connect().await? else {
        return Ok(());
    };
    let buyer = db.create_user(UserRole::User).await?;
    let template = db.create_template(None).await?;
    let session = paid_session(&format!("cs_race_{}", uuid::Uuid::new_v4().simple()), buyer.id, template.id);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let checkout = db.checkout();
        let session = session.clone();
        handles.push(tokio::spawn(async move {
            checkout.complete_session(&session, &ClientInfo::default()).await
        }));
    }

    let mut applied = 0;
    let mut order_ids = Vec::new();
    for handle in handles {
        let reconciled = handle.await??;
        if reconciled.applied {
            applied += 1;
        }
        assert_eq!(reconciled.order.status, OrderStatus::Completed);
        order_ids.push(reconciled.order.id);
    }
    assert_eq!(applied, 1);
    order_ids.dedup();
    assert_eq!(order_ids.len(), 1);

    // A later webhook replay changes nothing
    let replay = db
        .checkout()
        .complete_session(&session, &ClientInfo::default())
        .await?;
    assert!(!replay.applied);
    assert_eq!(replay.order.id, order_ids[0]);

    let stats = OrderService::new(db.pool.clone()).stats_for_user(buyer.id).await?;
    assert_eq!(stats.total_orders, 1);
    assert_eq!(stats.completed_orders, 1);
    Ok(())
}

#[tokio::test]
async fn failure_after_completion_is_ignored() -> Result<()> {
    let Some(db) = TestDatabase::connect().await? else {
        return Ok(());
    };
    let buyer = db.create_user(UserRole::User).await?;
    let template = db.create_template(None).await?;
    let session = paid_session(&format!("cs_late_{}", uuid::Uuid::new_v4().simple()), buyer.id, template.id);

    let checkout = db.checkout();
    checkout
        .complete_session(&session, &ClientInfo::default())
        .await?;

    let order = checkout
        .fail_session(&session.id)
        .await?
        .expect("order for session");
    assert_eq!(order.status, OrderStatus::Completed);

    let stored = OrderService::new(db.pool.clone()).get_by_session_id(&session.id).await?.expect("stored order");
    assert_eq!(stored.status, OrderStatus::Completed);
    Ok(())
}

#[tokio::test]
async fn refund_of_pending_order_is_conflict() -> Result<()> {
    let Some(db) = TestDatabase::connect().await? else {
        return Ok(());
    };
    let admin = db.create_user(UserRole::Admin).await?;
    let buyer = db.create_user(UserRole::User).await?;
    let template = db.create_template(None).await?;
    let order = db.create_pending_order(&buyer, &template).await?;

    let server = db.server_as(&admin).await?;
    let res = reqwest::Client::new()
        .post(server.url(&format!("/api/v1/admin/orders/{}/refund", order.id)))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let stored = OrderService::new(db.pool.clone()).get_by_id(order.id).await?.expect("order");
    assert_eq!(stored.status, OrderStatus::Pending);
    Ok(())
}

#[tokio::test]
async fn roles_gate_content_and_admin_routes() -> Result<()> {
    let Some(db) = TestDatabase::connect().await? else {
        return Ok(());
    };
    let client = reqwest::Client::new();

    let user = db.create_user(UserRole::User).await?;
    let server = db.server_as(&user).await?;
    let res = client.get(server.url("/api/v1/admin/users")).send().await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(common::error_message(res).await?, "Admin access required");

    let res = client
        .post(server.url("/api/v1/templates"))
        .json(&json!({ "name": "Invoice", "price": 10 }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(common::error_message(res).await?, "Insufficient permissions");
    drop(server);

    let author = db.create_user(UserRole::Author).await?;
    let server = db.server_as(&author).await?;
    let res = client
        .post(server.url("/api/v1/templates"))
        .json(&json!({ "name": "Invoice", "price": 10 }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = client
        .post(server.url("/api/v1/categories"))
        .json(&json!({ "name": format!("Category {}", uuid::Uuid::new_v4().simple()) }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn soft_deleted_rows_disappear_from_reads() -> Result<()> {
    let Some(db) = TestDatabase::connect().await? else {
        return Ok(());
    };
    let viewer = db.create_user(UserRole::User).await?;
    let category = CategoryService::new(db.pool.clone())
        .create(&CategoryInput {
            name: Some(format!("Category {}", uuid::Uuid::new_v4().simple())),
            description: None,
        })
        .await?;
    let kept = db.create_template(Some(category.id)).await?;
    let removed = db.create_template(Some(category.id)).await?;
    TemplateService::new(db.pool.clone()).soft_delete(removed.id).await?;

    let server = db.server_as(&viewer).await?;
    let client = reqwest::Client::new();

    let res = client.get(server.url(&format!("/api/v1/templates/{}", removed.id))).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .get(server.url(&format!("/api/v1/templates/category/{}", category.id)))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["count"], 1);
    assert_eq!(body["templates"][0]["id"], kept.id.to_string());

    CategoryService::new(db.pool.clone()).soft_delete(category.id).await?;
    let res = client.get(server.url(&format!("/api/v1/categories/{}", category.id))).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn admin_profile_edit_cannot_demote_self() -> Result<()> {
    let Some(db) = TestDatabase::connect().await? else {
        return Ok(());
    };
    let admin = db.create_user(UserRole::Admin).await?;
    let server = db.server_as(&admin).await?;

    let res = reqwest::Client::new()
        .put(server.url(&format!("/api/v1/admin/users/{}", admin.id)))
        .json(&json!({ "name": "Renamed", "role": "user" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // Rejected before the profile write
    let stored = UserService::new(db.pool.clone()).require(admin.id).await?;
    assert_eq!(stored.name, admin.name);
    assert_eq!(stored.role, UserRole::Admin);
    Ok(())
}

#[tokio::test]
async fn blank_slug_falls_back_to_title() -> Result<()> {
    let Some(db) = TestDatabase::connect().await? else {
        return Ok(());
    };
    let author = db.create_user(UserRole::Author).await?;
    let blog = BlogService::new(db.pool.clone());
    let title = format!("Launch Notes {}", uuid::Uuid::new_v4().simple());

    let mut slugs = Vec::new();
    for _ in 0..2 {
        let post = blog
            .create(
                author.id,
                &BlogPostInput {
                    title: Some(title.clone()),
                    content: Some("Body".to_string()),
                    slug: Some(String::new()),
                    ..Default::default()
                },
            )
            .await?;
        let slug = post.slug.expect("derived slug");
        assert!(slug.starts_with("launch-notes-"), "{}", slug);
        slugs.push(slug);
    }
    assert_ne!(slugs[0], slugs[1]);
    Ok(())
}

#[tokio::test]
async fn profile_orders_are_private_to_their_owner() -> Result<()> {
    let Some(db) = TestDatabase::connect().await? else {
        return Ok(());
    };
    let owner = db.create_user(UserRole::User).await?;
    let stranger = db.create_user(UserRole::User).await?;
    let template = db.create_template(None).await?;
    let session = paid_session(&format!("cs_owner_{}", uuid::Uuid::new_v4().simple()), owner.id, template.id);
    let order = db
        .checkout()
        .complete_session(&session, &ClientInfo::default())
        .await?
        .order;
    let client = reqwest::Client::new();

    let server = db.server_as(&stranger).await?;
    let res = client.get(server.url(&format!("/api/v1/profile/orders/{}", order.id))).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    drop(server);

    let server = db.server_as(&owner).await?;
    let res = client.get(server.url(&format!("/api/v1/profile/orders/{}", order.id))).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["order"]["id"], order.id.to_string());
    assert_eq!(body["order"]["templateName"], template.name.as_str());

    let res = client.get(server.url("/api/v1/profile/dashboard")).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["stats"]["totalOrders"], 1);
    assert_eq!(body["stats"]["templatesPurchased"], 1);
    assert_eq!(body["recentOrders"].as_array().map(Vec::len), Some(1));

    let res = client.get(server.url("/api/v1/profile/login-history?limit=5")).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["total"], 0);
    assert_eq!(body["limit"], 5);

    // Buying the same template twice is refused before any payment call
    let res = client
        .post(server.url("/api/v1/payment/checkout"))
        .json(&json!({ "templateId": template.id }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CONFLICT);
    assert_eq!(common::error_message(res).await?, "You already own this template");
    Ok(())
}

#[tokio::test]
async fn listing_pages_through_limit_and_offset() -> Result<()> {
    let Some(db) = TestDatabase::connect().await? else {
        return Ok(());
    };
    let viewer = db.create_user(UserRole::User).await?;
    let category = CategoryService::new(db.pool.clone())
        .create(&CategoryInput {
            name: Some(format!("Category {}", uuid::Uuid::new_v4().simple())),
            description: None,
        })
        .await?;
    for _ in 0..3 {
        db.create_template(Some(category.id)).await?;
    }

    let server = db.server_as(&viewer).await?;
    let client = reqwest::Client::new();
    let page = |query: &str| server.url(&format!("/api/v1/templates/category/{}?{}", category.id, query));

    let body = client.get(page("limit=2")).send().await?.json::<serde_json::Value>().await?;
    assert_eq!(body["count"], 2);
    assert_eq!(body["limit"], 2);

    let body = client.get(page("limit=2&offset=2")).send().await?.json::<serde_json::Value>().await?;
    assert_eq!(body["count"], 1);
    assert_eq!(body["offset"], 2);

    // Malformed values fall back to the defaults
    let body = client.get(page("limit=abc&offset=-4")).send().await?.json::<serde_json::Value>().await?;
    assert_eq!(body["count"], 3);
    assert_eq!(body["limit"], 50);
    assert_eq!(body["offset"], 0);
    Ok(())
}
