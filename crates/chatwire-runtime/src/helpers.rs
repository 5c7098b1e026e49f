//! Building blocks for responders.

use chatwire_contract::{
    now_millis, AssistantContent, EventStream, ItemContent, ItemKind, ItemUpdate, ResponseContext,
    ThreadItem, ThreadStreamEvent, WidgetNode,
};
use chatwire_widget::diff;
use futures::{Stream, StreamExt};

/// Stream a widget from successive snapshots of its tree.
///
/// The first snapshot is announced with `thread.item.added`, each later one
/// as a `widget.patch` against its predecessor (skipped when nothing
/// changed), and the last one is sent in `thread.item.done`. An empty
/// snapshot sequence produces no events.
pub fn stream_widget<S>(ctx: &ResponseContext, snapshots: S, copy_text: Option<String>) -> EventStream
where
    S: Stream<Item = WidgetNode> + Send + 'static,
{
    let item_id = ctx.generate_item_id(ItemKind::Widget);
    let thread_id = ctx.thread_id().to_string();
    let created_at = now_millis();
    let widget_item = move |widget: WidgetNode, copy_text: Option<String>| {
        ThreadItem::new(
            item_id.clone(),
            thread_id.clone(),
            created_at,
            ItemContent::Widget { widget, copy_text },
        )
    };

    Box::pin(async_stream::stream! {
        let mut snapshots = Box::pin(snapshots);
        let mut current: Option<ThreadItem> = None;
        while let Some(next) = snapshots.next().await {
            let item = widget_item(next, None);
            match current.as_ref().and_then(widget_of) {
                None => {
                    yield Ok(ThreadStreamEvent::ItemAdded { item: item.clone() });
                }
                Some(previous) => {
                    if let Some(next) = widget_of(&item) {
                        let patch = diff(Some(previous), next);
                        if !patch.is_empty() {
                            yield Ok(ThreadStreamEvent::WidgetPatch {
                                item_id: item.id.clone(),
                                patch,
                            });
                        }
                    }
                }
            }
            current = Some(item);
        }
        if let Some(mut item) = current {
            if let ItemContent::Widget { copy_text: slot, .. } = &mut item.content {
                *slot = copy_text;
            }
            yield Ok(ThreadStreamEvent::ItemDone { item });
        }
    })
}

fn widget_of(item: &ThreadItem) -> Option<&WidgetNode> {
    match &item.content {
        ItemContent::Widget { widget, .. } => Some(widget),
        _ => None,
    }
}

/// Stream an assistant message from text deltas.
///
/// Emits `thread.item.added` with an empty message, one text delta per
/// chunk, and `thread.item.done` with the full text.
pub fn stream_assistant_text<S>(ctx: &ResponseContext, deltas: S) -> EventStream
where
    S: Stream<Item = String> + Send + 'static,
{
    let item = ctx.new_item(ItemContent::AssistantMessage {
        content: vec![AssistantContent::text("")],
    });

    Box::pin(async_stream::stream! {
        let mut deltas = Box::pin(deltas);
        let mut text = String::new();
        yield Ok(ThreadStreamEvent::ItemAdded { item: item.clone() });
        while let Some(delta) = deltas.next().await {
            text.push_str(&delta);
            yield Ok(ThreadStreamEvent::ItemUpdated {
                item_id: item.id.clone(),
                update: ItemUpdate::TextDelta { content_index: 0, delta },
            });
        }
        let mut done = item;
        done.content = ItemContent::AssistantMessage {
            content: vec![AssistantContent::text(text)],
        };
        yield Ok(ThreadStreamEvent::ItemDone { item: done });
    })
}
