//! Single-writer aggregation of worker results
//!
//! Workers report counter updates and finished pages over a channel. One
//! collector task owns the [`CrawlStats`] and the [`Assembler`], so no
//! counter is ever shared between workers.

use crate::crawler::frontier::Frontier;
use crate::extract::PageResult;
use crate::output::{Assembler, CrawlStats, StatEvent};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

/// Included pages between two progress log lines
const PROGRESS_EVERY: u64 = 10;

/// Message from a worker to the collector
#[derive(Debug)]
pub enum CrawlEvent {
    Stat(StatEvent),
    Page { seq: u64, page: PageResult },
}

/// Worker side of the collector channel
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<CrawlEvent>,
}

impl EventSender {
    pub fn stat(&self, event: StatEvent) {
        // The collector outlives every worker; a closed channel means the run is over
        let _ = self.tx.send(CrawlEvent::Stat(event));
    }

    pub fn page(&self, seq: u64, page: PageResult) {
        let _ = self.tx.send(CrawlEvent::Page { seq, page });
    }
}

/// Spawns the collector
///
/// The task ends once every [`EventSender`] is dropped and yields the final
/// statistics together with the filled assembler.
pub fn spawn_collector(
    assembler: Assembler,
    frontier: Arc<Frontier>,
) -> (EventSender, JoinHandle<(CrawlStats, Assembler)>) {
    let (tx, mut rx) = mpsc::unbounded_channel();

    let handle = tokio::spawn(async move {
        let mut stats = CrawlStats::default();
        let mut assembler = assembler;
        let start_time = Instant::now();

        while let Some(event) = rx.recv().await {
            match event {
                CrawlEvent::Stat(event) => stats.apply(&event),
                CrawlEvent::Page { seq, page } => {
                    stats.record_page(&page);
                    assembler.push(seq, page);

                    if stats.pages_included % PROGRESS_EVERY == 0 {
                        let rate =
                            stats.pages_included as f64 / start_time.elapsed().as_secs_f64();
                        info!(
                            "Progress: {} pages included, {} in frontier, {:.2} pages/sec",
                            stats.pages_included,
                            frontier.pending(),
                            rate
                        );
                    }
                }
            }
        }

        (stats, assembler)
    });

    (EventSender { tx }, handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::url::DomainScope;
    use tokio_util::sync::CancellationToken;
    use url::Url;

    fn page(path: &str) -> PageResult {
        PageResult {
            url: Url::parse(&format!("https://docs.example.com{}", path)).unwrap(),
            title: Some(path.to_string()),
            markdown: "text".to_string(),
            headings: Vec::new(),
            links: Vec::new(),
            char_count: 4,
            word_count: 1,
            code_block_count: 2,
            html_bytes: 100,
        }
    }

    #[tokio::test]
    async fn test_collects_from_many_senders() {
        let base = Url::parse("https://docs.example.com/").unwrap();
        let frontier = Arc::new(Frontier::new(
            DomainScope::new(&base).unwrap(),
            10,
            CancellationToken::new(),
        ));
        let (events, handle) =
            spawn_collector(Assembler::new(base.as_str(), 3), frontier);

        let mut tasks = Vec::new();
        for i in 0..4u64 {
            let events = events.clone();
            tasks.push(tokio::spawn(async move {
                events.stat(StatEvent::Fetched);
                events.page(i, page(&format!("/p{}", i)));
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
        events.stat(StatEvent::Failed);
        drop(events);

        let (stats, assembler) = handle.await.unwrap();
        assert_eq!(stats.fetched, 4);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.pages_included, 4);
        assert_eq!(stats.code_blocks, 8);
        assert_eq!(assembler.len(), 4);
    }
}
