// SPDX-License-Identifier: MIT
//
// Demo content producer.
//
// Stands in for a model backend: composes a reply that echoes the user's
// message and streams it back in uneven chunks, split without regard for
// word boundaries, after a short "thinking" pause. The reply uses every
// inline pattern so the styling is visible.

use std::time::Duration;

use futures::{Stream, StreamExt, stream};

/// Delay before the first chunk.
const THINK_TIME: Duration = Duration::from_millis(900);

/// Delay between chunks.
const CHUNK_GAP: Duration = Duration::from_millis(40);

/// Chunk lengths in characters, cycled.
const CHUNK_LENS: [usize; 5] = [4, 7, 3, 9, 5];

/// A reply to `message`. `attempt` counts regenerations, starting at 1.
pub fn reply(message: &str, attempt: u32) -> impl Stream<Item = String> + use<> {
    chunked(compose(message, attempt))
}

/// A reply to the opening message, which the user never sees.
pub fn intro(message: &str, attempt: u32) -> impl Stream<Item = String> + use<> {
    let opener = if attempt > 1 {
        format!("Hello again (take {attempt}).")
    } else {
        "Hello!".to_owned()
    };
    chunked(format!(
        "{opener} I am the [echo] backend, and I was asked to \"{message}\" \
         before you arrived. Replies are *made up locally*, so feel free to \
         _try things out_."
    ))
}

/// More of the previous reply, without new input. `previous` is the raw
/// text of the reply being continued.
pub fn continuation(previous: &str, turn: usize) -> impl Stream<Item = String> + use<> {
    let tail: Vec<&str> = previous.split_whitespace().rev().take(3).collect();
    let tail: Vec<&str> = tail.into_iter().rev().collect();
    let opener = if tail.is_empty() {
        "Starting fresh".to_owned()
    } else {
        format!("Picking up after \"{}\"", tail.join(" "))
    };
    chunked(format!(
        "{opener} (part {}). There is *nothing new* to add, but the [echo] \
         backend is happy to keep _talking_.",
        turn + 1
    ))
}

fn compose(message: &str, attempt: u32) -> String {
    let opener = if attempt > 1 {
        format!("Take {attempt}.")
    } else {
        "Sure.".to_owned()
    };
    format!(
        "{opener} You said \"{message}\" [echo]. This reply is *generated locally* \
         so the _terminal side_ can be tried without a model. Press Ctrl-R to \
         regenerate it or Ctrl-E to edit your message."
    )
}

/// Split `text` into pieces of cycling lengths.
fn split(text: &str) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut chars = text.chars().peekable();
    for &len in CHUNK_LENS.iter().cycle() {
        if chars.peek().is_none() {
            break;
        }
        pieces.push(chars.by_ref().take(len).collect());
    }
    pieces
}

fn chunked(text: String) -> impl Stream<Item = String> {
    stream::iter(split(&text).into_iter().enumerate()).then(|(i, piece)| async move {
        tokio::time::sleep(if i == 0 { THINK_TIME } else { CHUNK_GAP }).await;
        piece
    })
}
