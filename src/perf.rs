//! Performance tracing for the extraction pipeline.
//!
//! Each pipeline phase reports begin / checkpoint / end events for a
//! [`Span`] to the observers registered on its [`SpanLog`]. With no
//! interested observer the whole mechanism reduces to a hash-map miss,
//! and the wrapping macros compile the calls out of release builds
//! entirely.

macro_rules! span_begin {
    ($log:expr, $span:expr) => {
        if cfg!(debug_assertions) {
            $log.begin($span);
        }
    };
}

macro_rules! span_mark {
    ($log:expr, $span:expr, $label:expr) => {
        if cfg!(debug_assertions) {
            $log.checkpoint($span, $label);
        }
    };
}

macro_rules! span_end {
    ($log:expr, $span:expr) => {
        if cfg!(debug_assertions) {
            $log.end($span);
        }
    };
}

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// The traceable phases of the extraction pipeline.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Span {
    Extract,
    PrepDocument,
    CollectMetadata,
    GrabArticle,
    PrepNodes,
    ScoreCandidates,
    PrepArticle,
    PostProcess,
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Span::Extract => "extract",
            Span::PrepDocument => "prep-document",
            Span::CollectMetadata => "collect-metadata",
            Span::GrabArticle => "grab-article",
            Span::PrepNodes => "prep-nodes",
            Span::ScoreCandidates => "score-candidates",
            Span::PrepArticle => "prep-article",
            Span::PostProcess => "post-process",
        })
    }
}

/// Observer interface for span events. All callbacks run synchronously
/// from the extraction code; keep them lightweight.
pub trait SpanObserver {
    /// Whether this observer cares about `span`. When `false`, none of
    /// the other callbacks fire for that span.
    fn wants(&self, span: Span) -> bool;
    /// A span began.
    fn on_begin(&self, span: Span);
    /// A labelled checkpoint inside an open span, with the wall-clock
    /// duration since the previous checkpoint (or the span begin).
    fn on_checkpoint(&self, span: Span, label: &str, since_last: Duration);
    /// A span ended, with its total duration.
    fn on_end(&self, span: Span, total: Duration);
}

struct OpenSpan {
    started: Instant,
    last_mark: Instant,
    observers: Vec<Rc<dyn SpanObserver>>,
}

/// Tracks in-flight spans and fans events out to registered observers.
///
/// Not `Send` or `Sync`: the open-span table uses `RefCell`, and each
/// extraction owns its own `SpanLog`.
pub struct SpanLog {
    observers: Vec<Rc<dyn SpanObserver>>,
    open: RefCell<HashMap<Span, OpenSpan>>,
}

impl SpanLog {
    pub fn new(observers: Vec<Rc<dyn SpanObserver>>) -> SpanLog {
        SpanLog {
            observers,
            open: RefCell::new(HashMap::new()),
        }
    }

    pub fn begin(&self, span: Span) {
        let interested: Vec<_> = self
            .observers
            .iter()
            .filter(|o| o.wants(span))
            .cloned()
            .collect();
        if interested.is_empty() {
            return;
        }
        let now = Instant::now();
        for observer in &interested {
            observer.on_begin(span);
        }
        self.open.borrow_mut().insert(
            span,
            OpenSpan {
                started: now,
                last_mark: now,
                observers: interested,
            },
        );
    }

    pub fn checkpoint(&self, span: Span, label: &str) {
        if let Some(open) = self.open.borrow_mut().get_mut(&span) {
            let now = Instant::now();
            let since_last = now.duration_since(open.last_mark);
            for observer in &open.observers {
                observer.on_checkpoint(span, label, since_last);
            }
            open.last_mark = now;
        }
    }

    pub fn end(&self, span: Span) {
        if let Some(open) = self.open.borrow_mut().remove(&span) {
            let total = open.started.elapsed();
            for observer in &open.observers {
                observer.on_end(span, total);
            }
        }
    }
}

/// Observer that prints span timings to stderr. Handy while working on
/// the pipeline; [`wants`][SpanObserver::wants] returns `false` so it
/// stays silent until edited.
pub struct StderrSpanObserver;

impl SpanObserver for StderrSpanObserver {
    fn wants(&self, _span: Span) -> bool {
        false
    }

    fn on_begin(&self, span: Span) {
        eprintln!("span {}: begin", span);
    }

    fn on_checkpoint(&self, span: Span, label: &str, since_last: Duration) {
        eprintln!("span {}: {} (+{:?})", span, label, since_last);
    }

    fn on_end(&self, span: Span, total: Duration) {
        eprintln!("span {}: end after {:?}", span, total);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct CountingObserver {
        begins: Cell<usize>,
        checkpoints: Cell<usize>,
        ends: Cell<usize>,
    }

    impl SpanObserver for CountingObserver {
        fn wants(&self, span: Span) -> bool {
            span == Span::Extract
        }
        fn on_begin(&self, _span: Span) {
            self.begins.set(self.begins.get() + 1);
        }
        fn on_checkpoint(&self, _span: Span, _label: &str, _since_last: Duration) {
            self.checkpoints.set(self.checkpoints.get() + 1);
        }
        fn on_end(&self, _span: Span, _total: Duration) {
            self.ends.set(self.ends.get() + 1);
        }
    }

    #[test]
    fn events_only_fire_for_wanted_spans() {
        let observer = Rc::new(CountingObserver {
            begins: Cell::new(0),
            checkpoints: Cell::new(0),
            ends: Cell::new(0),
        });
        let log = SpanLog::new(vec![observer.clone() as Rc<dyn SpanObserver>]);

        log.begin(Span::Extract);
        log.checkpoint(Span::Extract, "midway");
        log.end(Span::Extract);

        log.begin(Span::PrepDocument);
        log.checkpoint(Span::PrepDocument, "ignored");
        log.end(Span::PrepDocument);

        assert_eq!(observer.begins.get(), 1);
        assert_eq!(observer.checkpoints.get(), 1);
        assert_eq!(observer.ends.get(), 1);
    }

    #[test]
    fn checkpoint_on_closed_span_is_a_no_op() {
        let log = SpanLog::new(vec![]);
        log.checkpoint(Span::Extract, "nothing open");
        log.end(Span::Extract);
    }
}
