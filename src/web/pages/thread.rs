//! Thread page: the parent post, the post itself and its direct replies.

use chrono::Utc;
use maud::{html, Markup, Render};

use crate::components::{Alert, BaseLayout, PostCard};
use crate::feed::Thread;
use crate::session::Session;

#[must_use]
pub fn render_thread_page(session: &Session, thread: &Thread) -> Markup {
    let now = Utc::now();
    let Some(post) = &thread.post else {
        let content = html! { (Alert::error("This post is unavailable.").with_title("Not found:")) };
        return BaseLayout::new("Post not found", Some(session)).render(content);
    };

    let content = html! {
        ul class="thread" {
            @if let Some(parent) = &thread.parent {
                (PostCard::new(parent, now).render())
            }
            (PostCard::new(post, now).focused().render())
        }
        @if !thread.replies.is_empty() {
            h2 { "Replies" }
            ul class="thread-replies" {
                @for reply in &thread.replies {
                    (PostCard::new(reply, now).render())
                }
            }
        }
    };
    let title = format!("Post by {}", post.author.name());
    BaseLayout::new(&title, Some(session)).render(content)
}
