/// Integration tests for the block tree commands.
///
/// Scenarios:
/// 1. A page with nested blocks gets materialized paths derived from its ancestors
/// 2. list_children / list_page_top_blocks return direct children only, ordered
/// 3. update_block merges meta and keeps the type fixed
/// 4. Nesting fields are classified before anything is written
use noted_lib::commands::block;
use noted_lib::config::NotedConfig;
use noted_lib::engine::RequestContext;
use noted_lib::models::{
    Block, BlockType, CreateBlockPayload, CreatePagePayload, UpdateBlockPayload,
};
use noted_lib::{AppState, BlockError};
use serde_json::json;

async fn setup() -> (AppState, RequestContext) {
    let state = AppState::open(NotedConfig::in_memory()).await.unwrap();
    let ctx = state.context();
    (state, ctx)
}

async fn page(state: &AppState, ctx: &RequestContext, owner: &str, title: &str) -> Block {
    block::create_page(
        state,
        ctx,
        owner,
        CreatePagePayload {
            title: title.to_string(),
            order: 0,
        },
    )
    .await
    .unwrap()
}

fn text_under_page(page_id: &str, order: i64) -> CreateBlockPayload {
    CreateBlockPayload {
        block_type: BlockType::Text,
        meta: json!({ "json": { "text": format!("line {}", order) } }),
        order,
        parent_id: None,
        page_id: Some(page_id.to_string()),
    }
}

fn text_under_parent(parent_id: &str, order: i64) -> CreateBlockPayload {
    CreateBlockPayload {
        block_type: BlockType::Text,
        meta: json!({ "json": { "text": format!("nested {}", order) } }),
        order,
        parent_id: Some(parent_id.to_string()),
        page_id: None,
    }
}

#[tokio::test]
async fn test_nested_paths_follow_ancestors() {
    let (state, ctx) = setup().await;

    let p1 = page(&state, &ctx, "u1", "Notes").await;
    assert_eq!(p1.path.as_str(), p1.id);
    assert_eq!(p1.owner_id.as_deref(), Some("u1"));

    let b1 = block::create_block(&state, &ctx, "u1", text_under_page(&p1.id, 0))
        .await
        .unwrap();
    let b2 = block::create_block(&state, &ctx, "u1", text_under_parent(&b1.id, 0))
        .await
        .unwrap();

    assert_eq!(b1.path.as_str(), format!("{}.{}", p1.id, b1.id));
    assert_eq!(b2.path.as_str(), format!("{}.{}.{}", p1.id, b1.id, b2.id));
    assert_eq!(b2.page_id(), p1.id);
    assert!(b1.owner_id.is_none());

    // Every non-root path is its parent's path plus its own id.
    let parent = b2.path.parent().unwrap();
    assert_eq!(parent, b1.path);
    assert!(p1.path.contains(&b2.path));
}

#[tokio::test]
async fn test_list_children_is_direct_and_ordered() {
    let (state, ctx) = setup().await;
    let p1 = page(&state, &ctx, "u1", "Ordered").await;

    let second = block::create_block(&state, &ctx, "u1", text_under_page(&p1.id, 2))
        .await
        .unwrap();
    let first = block::create_block(&state, &ctx, "u1", text_under_page(&p1.id, 1))
        .await
        .unwrap();
    let grandchild = block::create_block(&state, &ctx, "u1", text_under_parent(&first.id, 0))
        .await
        .unwrap();

    let top = block::list_page_top_blocks(&state, &ctx, "u1", &p1.id)
        .await
        .unwrap();
    let ids: Vec<_> = top.iter().map(|b| b.id.as_str()).collect();
    assert_eq!(ids, vec![first.id.as_str(), second.id.as_str()]);

    let children = block::list_children(&state, &ctx, "u1", &first.id)
        .await
        .unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].id, grandchild.id);

    let leaf = block::list_children(&state, &ctx, "u1", &grandchild.id)
        .await
        .unwrap();
    assert!(leaf.is_empty());
}

#[tokio::test]
async fn test_list_page_top_blocks_rejects_non_page() {
    let (state, ctx) = setup().await;
    let p1 = page(&state, &ctx, "u1", "Page").await;
    let b1 = block::create_block(&state, &ctx, "u1", text_under_page(&p1.id, 0))
        .await
        .unwrap();

    let err = block::list_page_top_blocks(&state, &ctx, "u1", &b1.id)
        .await
        .unwrap_err();
    assert!(matches!(err, BlockError::ValidationFailed(_)));
}

#[tokio::test]
async fn test_update_block_merges_meta() {
    let (state, ctx) = setup().await;
    let p1 = page(&state, &ctx, "u1", "Draft").await;
    let container = block::create_block(
        &state,
        &ctx,
        "u1",
        CreateBlockPayload {
            block_type: BlockType::Container,
            meta: json!({ "title": "Section", "collapsed": false }),
            order: 0,
            parent_id: None,
            page_id: Some(p1.id.clone()),
        },
    )
    .await
    .unwrap();

    let mut meta = serde_json::Map::new();
    meta.insert("collapsed".to_string(), json!(true));
    let updated = block::update_block(
        &state,
        &ctx,
        "u1",
        UpdateBlockPayload {
            block_id: container.id.clone(),
            block_type: None,
            meta,
            order: Some(7),
        },
    )
    .await
    .unwrap();

    assert_eq!(updated.meta["title"], "Section");
    assert_eq!(updated.meta["collapsed"], true);
    assert_eq!(updated.order, 7);
    assert_eq!(updated.path, container.path);
    assert!(updated.updated_at >= container.updated_at);

    // Page titles go through the same merge.
    let mut meta = serde_json::Map::new();
    meta.insert("title".to_string(), json!("Final"));
    let renamed = block::update_block(
        &state,
        &ctx,
        "u1",
        UpdateBlockPayload {
            block_id: p1.id.clone(),
            block_type: None,
            meta,
            order: None,
        },
    )
    .await
    .unwrap();
    assert_eq!(renamed.title(), Some("Final"));
}

#[tokio::test]
async fn test_update_block_rejects_type_change_and_bad_meta() {
    let (state, ctx) = setup().await;
    let p1 = page(&state, &ctx, "u1", "Draft").await;
    let b1 = block::create_block(&state, &ctx, "u1", text_under_page(&p1.id, 0))
        .await
        .unwrap();

    let err = block::update_block(
        &state,
        &ctx,
        "u1",
        UpdateBlockPayload {
            block_id: b1.id.clone(),
            block_type: Some(BlockType::Container),
            meta: serde_json::Map::new(),
            order: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, BlockError::ValidationFailed(_)));

    let mut meta = serde_json::Map::new();
    meta.insert("json".to_string(), json!("not an object"));
    let err = block::update_block(
        &state,
        &ctx,
        "u1",
        UpdateBlockPayload {
            block_id: b1.id.clone(),
            block_type: None,
            meta,
            order: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, BlockError::ValidationFailed(_)));

    let unchanged = block::get_block(&state, &ctx, "u1", &b1.id).await.unwrap();
    assert_eq!(unchanged.meta, b1.meta);
}

#[tokio::test]
async fn test_create_block_nesting_errors() {
    let (state, ctx) = setup().await;
    let p1 = page(&state, &ctx, "u1", "Page").await;
    let b1 = block::create_block(&state, &ctx, "u1", text_under_page(&p1.id, 0))
        .await
        .unwrap();

    // Both targets set.
    let mut both = text_under_page(&p1.id, 0);
    both.parent_id = Some(b1.id.clone());
    let err = block::create_block(&state, &ctx, "u1", both).await.unwrap_err();
    assert!(matches!(err, BlockError::ValidationFailed(_)));

    // Neither set.
    let mut neither = text_under_page(&p1.id, 0);
    neither.page_id = None;
    let err = block::create_block(&state, &ctx, "u1", neither)
        .await
        .unwrap_err();
    assert!(matches!(err, BlockError::ValidationFailed(_)));

    // page_id pointing at a non-page block.
    let err = block::create_block(&state, &ctx, "u1", text_under_page(&b1.id, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, BlockError::ValidationFailed(_)));

    // parent_id pointing at a page.
    let err = block::create_block(&state, &ctx, "u1", text_under_parent(&p1.id, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, BlockError::ValidationFailed(_)));

    // Unknown target.
    let err = block::create_block(&state, &ctx, "u1", text_under_parent("missing", 0))
        .await
        .unwrap_err();
    assert!(matches!(err, BlockError::BlockNotFound(_)));

    let children = block::list_children(&state, &ctx, "u1", &b1.id)
        .await
        .unwrap();
    assert!(children.is_empty());
}

#[tokio::test]
async fn test_create_block_validates_meta_and_type() {
    let (state, ctx) = setup().await;
    let p1 = page(&state, &ctx, "u1", "Page").await;

    let mut bad = text_under_page(&p1.id, 0);
    bad.meta = json!({ "json": {} });
    let err = block::create_block(&state, &ctx, "u1", bad).await.unwrap_err();
    assert!(matches!(err, BlockError::ValidationFailed(_)));

    let mut nested_page = text_under_page(&p1.id, 0);
    nested_page.block_type = BlockType::Page;
    nested_page.meta = json!({ "title": "Sub" });
    let err = block::create_block(&state, &ctx, "u1", nested_page)
        .await
        .unwrap_err();
    assert!(matches!(err, BlockError::ValidationFailed(_)));

    // Types without a registered validator are accepted as-is.
    let custom = block::create_block(
        &state,
        &ctx,
        "u1",
        CreateBlockPayload {
            block_type: BlockType::from("IMAGE"),
            meta: json!({ "src": "cat.png" }),
            order: 0,
            parent_id: None,
            page_id: Some(p1.id.clone()),
        },
    )
    .await
    .unwrap();
    assert_eq!(custom.block_type.as_str(), "IMAGE");
}

#[tokio::test]
async fn test_create_page_requires_title() {
    let (state, ctx) = setup().await;
    let err = block::create_page(
        &state,
        &ctx,
        "u1",
        CreatePagePayload {
            title: String::new(),
            order: 0,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, BlockError::ValidationFailed(_)));

    let titles = block::list_page_titles(&state, &ctx, "u1").await.unwrap();
    assert!(titles.is_empty());
}

#[tokio::test]
async fn test_page_titles_only_list_owned_pages() {
    let (state, ctx) = setup().await;
    let a = page(&state, &ctx, "u1", "Alpha").await;
    page(&state, &ctx, "u2", "Other").await;

    let titles = block::list_page_titles(&state, &ctx, "u1").await.unwrap();
    assert_eq!(titles.len(), 1);
    assert_eq!(titles[0].id, a.id);
    assert_eq!(titles[0].title.as_deref(), Some("Alpha"));
}
