//! Progress event stream.
//!
//! `n` progress events, one per tick, then a `done` event one tick later.
//! The first event is immediate. Dropping the stream (client gone) stops it.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use futures::{Stream, StreamExt, stream};
use serde_json::{Value, json};
use tokio_stream::wrappers::IntervalStream;

/// Count used when the request has no `n`.
pub const DEFAULT_COUNT: u32 = 5;

/// Build the event stream for one request.
pub fn progress_events(n: u32, interval: Duration) -> impl Stream<Item = Value> + Send + 'static {
    let total = u64::from(n);
    // A zero period panics in `tokio::time::interval`.
    let period = interval.max(Duration::from_millis(1));
    let ticks = IntervalStream::new(tokio::time::interval(period));
    stream::iter(1..=total + 1)
        .zip(ticks)
        .map(move |(step, _)| {
            if step <= total {
                progress(step, total)
            } else {
                done()
            }
        })
}

fn progress(step: u64, total: u64) -> Value {
    json!({"event": "progress", "step": step, "total": total, "timestamp": now_secs()})
}

fn done() -> Value {
    json!({"event": "done", "timestamp": now_secs()})
}

fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}
