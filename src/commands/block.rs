use crate::commands::nesting::{classify, Nesting};
use crate::engine::RequestContext;
use crate::error::{BlockError, BlockResult};
use crate::models::{
    merge_meta, Block, BlockType, CreateBlockPayload, CreatePagePayload, PageTitle, Permission,
    UpdateBlockPayload,
};
use crate::state::AppState;
use crate::utils::time::now_utc;

/// Create a new page owned by the actor.
///
/// # Arguments
/// * `actor_id` - Authenticated user; becomes the page owner
/// * `payload` - Title and sibling order of the page
///
/// # Returns
/// * `Ok(Block)` - The persisted page (`path == id`)
/// * `Err(ValidationFailed)` - Empty title
pub async fn create_page(
    state: &AppState,
    ctx: &RequestContext,
    actor_id: &str,
    payload: CreatePagePayload,
) -> BlockResult<Block> {
    let meta = serde_json::json!({ "title": payload.title });
    state.validators.validate(&BlockType::Page, &meta)?;

    state
        .blocks
        .create_page(ctx, actor_id, &payload.title, payload.order)
        .await
}

/// Create a block at the top of a page or under an existing block.
///
/// Runs the full pipeline: nesting classification, metadata validation,
/// `EDIT` check on the target, then the insert.
///
/// # Returns
/// * `Ok(Block)` - The persisted block, path `target.path + "." + id`
/// * `Err(ValidationFailed)` - Bad nesting fields, bad meta, PAGE type, or a
///   target of the wrong kind
/// * `Err(BlockNotFound)` / `Err(BlockAccessDenied)` - Target problems
pub async fn create_block(
    state: &AppState,
    ctx: &RequestContext,
    actor_id: &str,
    payload: CreateBlockPayload,
) -> BlockResult<Block> {
    let nesting = classify(payload.parent_id.as_deref(), payload.page_id.as_deref())?;

    if payload.block_type == BlockType::Page {
        return Err(BlockError::validation(
            "PAGE blocks are root blocks; use create_page",
        ));
    }
    state.validators.validate(&payload.block_type, &payload.meta)?;

    let target = state
        .evaluator
        .check_access(ctx, actor_id, nesting.target_id(), Permission::Edit)
        .await?;

    match nesting {
        Nesting::Top { page_id } if !target.is_page() => {
            return Err(BlockError::validation(format!(
                "page_id '{}' does not name a page",
                page_id
            )));
        }
        Nesting::Child { parent_id } if target.is_page() => {
            return Err(BlockError::validation(format!(
                "parent_id '{}' is a page; use page_id for top-level blocks",
                parent_id
            )));
        }
        _ => {}
    }

    state
        .blocks
        .create_child(ctx, &target.id, &payload.block_type, &payload.meta, payload.order)
        .await
}

/// Merge new meta into a block and/or change its sibling order.
///
/// The block type is immutable; the merged meta must still satisfy the
/// type's schema.
pub async fn update_block(
    state: &AppState,
    ctx: &RequestContext,
    actor_id: &str,
    payload: UpdateBlockPayload,
) -> BlockResult<Block> {
    let block = state
        .evaluator
        .check_access(ctx, actor_id, &payload.block_id, Permission::Edit)
        .await?;

    if let Some(block_type) = &payload.block_type {
        if *block_type != block.block_type {
            return Err(BlockError::validation(format!(
                "block type is immutable ({} -> {})",
                block.block_type, block_type
            )));
        }
    }

    if !payload.meta.is_empty() {
        let mut merged = block.meta.clone();
        merge_meta(&mut merged, &payload.meta);
        state.validators.validate(&block.block_type, &merged)?;
    }

    state
        .blocks
        .update_block(ctx, &block.id, &payload.meta, payload.order)
        .await
}

pub async fn get_block(
    state: &AppState,
    ctx: &RequestContext,
    actor_id: &str,
    block_id: &str,
) -> BlockResult<Block> {
    state
        .evaluator
        .check_access(ctx, actor_id, block_id, Permission::View)
        .await
}

/// Direct children of a block the actor can view.
pub async fn list_children(
    state: &AppState,
    ctx: &RequestContext,
    actor_id: &str,
    block_id: &str,
) -> BlockResult<Vec<Block>> {
    let parent = state
        .evaluator
        .check_access(ctx, actor_id, block_id, Permission::View)
        .await?;
    state.blocks.list_children(ctx, &parent.id).await
}

/// Top-level blocks of a page.
pub async fn list_page_top_blocks(
    state: &AppState,
    ctx: &RequestContext,
    actor_id: &str,
    page_id: &str,
) -> BlockResult<Vec<Block>> {
    let page = state
        .evaluator
        .check_access(ctx, actor_id, page_id, Permission::View)
        .await?;
    if !page.is_page() {
        return Err(BlockError::validation(format!(
            "'{}' is not a page",
            page_id
        )));
    }
    state.blocks.list_children(ctx, &page.id).await
}

/// Pages the actor owns or has been given access to.
pub async fn list_pages(
    state: &AppState,
    ctx: &RequestContext,
    actor_id: &str,
) -> BlockResult<Vec<Block>> {
    state
        .blocks
        .list_pages_for_user(ctx, actor_id, now_utc())
        .await
}

/// Ids and titles of the pages the actor owns.
pub async fn list_page_titles(
    state: &AppState,
    ctx: &RequestContext,
    actor_id: &str,
) -> BlockResult<Vec<PageTitle>> {
    state.blocks.list_owned_page_titles(ctx, actor_id).await
}

/// Delete a block with its whole subtree and the grants scoped inside it.
///
/// Deleting a page needs `OWNER`; deleting anything below a page needs `EDIT`.
pub async fn delete_block(
    state: &AppState,
    ctx: &RequestContext,
    actor_id: &str,
    block_id: &str,
) -> BlockResult<()> {
    let block = state.blocks.get_by_id(ctx, block_id).await?;
    let required = if block.is_page() {
        Permission::Owner
    } else {
        Permission::Edit
    };

    state
        .evaluator
        .check_block_access(ctx, actor_id, &block, required)
        .await?;

    state.blocks.delete_subtree(ctx, &block.id).await
}
