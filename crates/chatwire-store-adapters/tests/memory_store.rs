use chatwire_contract::request::CreateAttachmentParams;
use chatwire_contract::{
    AttachmentKind, AttachmentStore, PageQuery, RequestContext, SortOrder, Store, StoreError,
    ThreadItem, ThreadMetadata,
};
use chatwire_store_adapters::{MemoryAttachmentStore, MemoryStore};
use serde_json::json;

fn ctx() -> RequestContext {
    RequestContext::new("req_test")
}

async fn store_with_thread(id: &str) -> MemoryStore {
    let store = MemoryStore::new();
    store
        .save_thread(&ThreadMetadata::new(id, 1), &ctx())
        .await
        .unwrap();
    store
}

fn message(id: &str, thread_id: &str) -> ThreadItem {
    ThreadItem::assistant_text(id, thread_id, 1, format!("text of {id}"))
}

#[tokio::test]
async fn test_save_and_load_thread() {
    let store = store_with_thread("thr_1").await;
    let loaded = store.load_thread("thr_1", &ctx()).await.unwrap();
    assert_eq!(loaded.id, "thr_1");

    let mut updated = loaded.clone();
    updated.title = Some("Renamed".into());
    store.save_thread(&updated, &ctx()).await.unwrap();
    assert_eq!(
        store.load_thread("thr_1", &ctx()).await.unwrap().title.as_deref(),
        Some("Renamed")
    );
}

#[tokio::test]
async fn test_load_missing_thread_is_not_found() {
    let store = MemoryStore::new();
    let err = store.load_thread("nope", &ctx()).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_saving_metadata_keeps_items() {
    let store = store_with_thread("thr_1").await;
    store
        .create_item("thr_1", &message("msg_1", "thr_1"), &ctx())
        .await
        .unwrap();
    store
        .save_thread(&ThreadMetadata::new("thr_1", 1).with_title("t"), &ctx())
        .await
        .unwrap();
    let items = store.load_all_items("thr_1", &ctx()).await.unwrap();
    assert_eq!(items.len(), 1);
}

#[tokio::test]
async fn test_items_keep_insertion_order() {
    let store = store_with_thread("thr_1").await;
    for id in ["msg_c", "msg_a", "msg_b"] {
        store
            .create_item("thr_1", &message(id, "thr_1"), &ctx())
            .await
            .unwrap();
    }

    let asc = store
        .list_items("thr_1", &PageQuery::new(10, SortOrder::Asc), &ctx())
        .await
        .unwrap();
    let ids: Vec<&str> = asc.data.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["msg_c", "msg_a", "msg_b"]);

    let latest = store.latest_item("thr_1", &ctx()).await.unwrap().unwrap();
    assert_eq!(latest.id, "msg_b");
}

#[tokio::test]
async fn test_item_pagination_follows_cursor() {
    let store = store_with_thread("thr_1").await;
    for i in 0..5 {
        store
            .create_item("thr_1", &message(&format!("msg_{i}"), "thr_1"), &ctx())
            .await
            .unwrap();
    }

    let first = store
        .list_items("thr_1", &PageQuery::new(2, SortOrder::Desc), &ctx())
        .await
        .unwrap();
    assert_eq!(first.after.as_deref(), Some("msg_3"));
    assert!(first.has_more);

    let second = store
        .list_items(
            "thr_1",
            &PageQuery::new(2, SortOrder::Desc).after(first.after.clone()),
            &ctx(),
        )
        .await
        .unwrap();
    let ids: Vec<&str> = second.data.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["msg_2", "msg_1"]);
}

#[tokio::test]
async fn test_duplicate_item_is_rejected() {
    let store = store_with_thread("thr_1").await;
    let item = message("msg_1", "thr_1");
    store.create_item("thr_1", &item, &ctx()).await.unwrap();
    let err = store.create_item("thr_1", &item, &ctx()).await.unwrap_err();
    assert!(matches!(err, StoreError::AlreadyExists(_)));
}

#[tokio::test]
async fn test_replace_item_in_place() {
    let store = store_with_thread("thr_1").await;
    store
        .create_item("thr_1", &message("msg_1", "thr_1"), &ctx())
        .await
        .unwrap();
    store
        .create_item("thr_1", &message("msg_2", "thr_1"), &ctx())
        .await
        .unwrap();

    let replacement = ThreadItem::assistant_text("msg_1", "thr_1", 1, "edited");
    store.replace_item("thr_1", &replacement, &ctx()).await.unwrap();

    let items = store.load_all_items("thr_1", &ctx()).await.unwrap();
    assert_eq!(items[0].text().as_deref(), Some("edited"));
    assert_eq!(items[1].id, "msg_2");
}

#[tokio::test]
async fn test_delete_item_and_thread() {
    let store = store_with_thread("thr_1").await;
    store
        .create_item("thr_1", &message("msg_1", "thr_1"), &ctx())
        .await
        .unwrap();
    store.delete_item("thr_1", "msg_1", &ctx()).await.unwrap();
    assert!(store
        .load_item("thr_1", "msg_1", &ctx())
        .await
        .unwrap_err()
        .is_not_found());

    store.delete_thread("thr_1", &ctx()).await.unwrap();
    assert!(store.load_thread("thr_1", &ctx()).await.is_err());
}

#[tokio::test]
async fn test_item_write_to_missing_thread_fails() {
    let store = MemoryStore::new();
    let err = store
        .create_item("thr_x", &message("msg_1", "thr_x"), &ctx())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_invalid_ids_are_rejected() {
    let store = MemoryStore::new();
    let err = store
        .save_thread(&ThreadMetadata::new("", 1), &ctx())
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidId(_)));
}

#[tokio::test]
async fn test_list_threads_newest_first() {
    let store = MemoryStore::new();
    for (id, created_at) in [("thr_a", 1), ("thr_b", 3), ("thr_c", 2)] {
        store
            .save_thread(&ThreadMetadata::new(id, created_at), &ctx())
            .await
            .unwrap();
    }
    let page = store
        .list_threads(&PageQuery::new(10, SortOrder::Desc), &ctx())
        .await
        .unwrap();
    let ids: Vec<&str> = page.data.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["thr_b", "thr_c", "thr_a"]);
}

#[tokio::test]
async fn test_hidden_items_are_stored_like_any_other() {
    let store = store_with_thread("thr_1").await;
    let hidden = ThreadItem::hidden_context("ctx_1", "thr_1", 1, json!({"note": "x"}));
    store.create_item("thr_1", &hidden, &ctx()).await.unwrap();
    let loaded = store.load_item("thr_1", "ctx_1", &ctx()).await.unwrap();
    assert!(loaded.is_hidden());
}

#[tokio::test]
async fn test_attachment_lifecycle() {
    let blobs = MemoryAttachmentStore::new();
    let store = MemoryStore::new();
    let params = CreateAttachmentParams {
        name: "cat.png".into(),
        size: 10,
        mime_type: "image/png".into(),
    };

    let attachment = blobs.create_attachment(&params, &ctx()).await.unwrap();
    assert!(attachment.id.starts_with("atc_"));
    assert!(matches!(attachment.kind, AttachmentKind::Image { .. }));
    assert!(blobs.contains(&attachment.id).await);

    store.save_attachment(&attachment, &ctx()).await.unwrap();
    assert_eq!(
        store.load_attachment(&attachment.id, &ctx()).await.unwrap(),
        attachment
    );

    blobs.delete_attachment(&attachment.id, &ctx()).await.unwrap();
    store
        .delete_attachment_metadata(&attachment.id, &ctx())
        .await
        .unwrap();
    assert!(!blobs.contains(&attachment.id).await);
    assert!(store.load_attachment(&attachment.id, &ctx()).await.is_err());
    assert!(blobs
        .delete_attachment(&attachment.id, &ctx())
        .await
        .unwrap_err()
        .is_not_found());
}
