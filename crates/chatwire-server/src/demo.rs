//! Demo collaborators wired into the binary when no real responder exists.

use async_trait::async_trait;
use chatwire_contract::{
    Action, EventStream, ItemContent, Responder, ResponseContext, ThreadItem, ThreadMetadata,
    ThreadStreamEvent, WidgetNode,
};
use chatwire_runtime::{stream_assistant_text, stream_widget, ActionHandler};
use futures::stream;
use serde_json::json;
use std::time::Duration;

/// Action type handled by [`CounterHandler`].
pub const COUNTER_INCREMENT: &str = "counter.increment";

const WIDGET_COMMAND: &str = "/counter";

/// Echoes the user's message back word by word.
///
/// A message of `/counter` streams a small counter widget instead.
#[derive(Debug, Default)]
pub struct EchoResponder;

#[async_trait]
impl Responder for EchoResponder {
    fn respond(
        &self,
        _thread: ThreadMetadata,
        input: Option<ThreadItem>,
        ctx: ResponseContext,
    ) -> EventStream {
        let text = input
            .as_ref()
            .and_then(ThreadItem::text)
            .unwrap_or_else(|| "Tool output received.".to_string());

        if text.trim() == WIDGET_COMMAND {
            return stream_widget(&ctx, counter_snapshots(), Some("Counter: 0".into()));
        }

        let words: Vec<String> = text
            .split_inclusive(' ')
            .map(str::to_string)
            .collect();
        stream_assistant_text(&ctx, stream::iter(words))
    }
}

fn counter_card(title: &str, count: Option<i64>) -> WidgetNode {
    let mut card = WidgetNode::new("Card")
        .with_key("counter")
        .with_child(WidgetNode::new("Title").with_key("title").with_attr("value", title));
    if let Some(count) = count {
        card = card
            .with_child(WidgetNode::new("Text").with_key("count").with_attr("value", count))
            .with_child(
                WidgetNode::new("Button")
                    .with_key("increment")
                    .with_attr("label", "+1")
                    .with_attr("onClickAction", json!({"type": COUNTER_INCREMENT})),
            );
    }
    card
}

fn counter_snapshots() -> impl futures::Stream<Item = WidgetNode> + Send + 'static {
    async_stream::stream! {
        yield counter_card("Preparing counter", None);
        tokio::time::sleep(Duration::from_millis(50)).await;
        yield counter_card("Counter", Some(0));
    }
}

/// Increments the counter widget that sent the action and replaces it in place.
#[derive(Debug, Default)]
pub struct CounterHandler;

impl ActionHandler for CounterHandler {
    fn handle(
        &self,
        _thread: ThreadMetadata,
        _action: Action,
        sender: Option<ThreadItem>,
        _ctx: ResponseContext,
    ) -> EventStream {
        let Some(mut item) = sender else {
            return Box::pin(stream::empty());
        };
        let ItemContent::Widget { widget, copy_text } = &mut item.content else {
            return Box::pin(stream::empty());
        };
        let count = widget
            .find_by_key("count")
            .and_then(|node| node.attr("value"))
            .and_then(|value| value.as_i64())
            .unwrap_or(0)
            + 1;
        *widget = counter_card("Counter", Some(count));
        *copy_text = Some(format!("Counter: {count}"));
        Box::pin(stream::iter(vec![Ok(ThreadStreamEvent::ItemReplaced {
            item,
        })]))
    }
}
