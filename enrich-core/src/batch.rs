use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use thiserror::Error;
use tokio::{
    sync::{Mutex, mpsc},
    task::{JoinError, JoinSet},
};
use tracing::{debug, info};

use crate::{
    enrich::Enricher,
    model::{EnrichedRow, InputRow},
};

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("enrichment worker failed: {0}")]
    Worker(#[from] JoinError),

    #[error("no result was collected for row {0}")]
    MissingRow(usize),
}

/// Advisory counters; they never influence the produced rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub total: usize,
    pub complete: usize,
    /// Rows with at least one null field group.
    pub partial: usize,
    pub missing_geo: usize,
    pub missing_weather: usize,
    pub missing_fx: usize,
}

impl BatchStats {
    fn record(&mut self, row: &EnrichedRow) {
        self.total += 1;
        if row.is_partial() {
            self.partial += 1;
        } else {
            self.complete += 1;
        }
        self.missing_geo += usize::from(!row.has_geo());
        self.missing_weather += usize::from(!row.has_weather());
        self.missing_fx += usize::from(!row.has_fx());
    }
}

#[derive(Debug, Clone)]
pub struct BatchReport {
    /// One row per input row, in input order.
    pub rows: Vec<EnrichedRow>,
    pub stats: BatchStats,
}

/// Enrich every row with at most `workers` rows in flight, keeping input order.
pub async fn enrich_all(
    enricher: &Enricher,
    rows: Vec<InputRow>,
    workers: usize,
) -> Result<BatchReport, BatchError> {
    let total = rows.len();
    let workers = workers.clamp(1, total.max(1));

    let (tx, rx) = mpsc::channel(total.max(1));
    for job in rows.into_iter().enumerate() {
        // Capacity covers every row and the receiver is alive, so this cannot fail.
        let _ = tx.try_send(job);
    }
    drop(tx);

    let queue = Arc::new(Mutex::new(rx));
    let done = Arc::new(AtomicUsize::new(0));

    let mut pool = JoinSet::new();
    for worker in 0..workers {
        let enricher = enricher.clone();
        let queue = Arc::clone(&queue);
        let done = Arc::clone(&done);

        pool.spawn(async move {
            let mut finished = Vec::new();
            loop {
                let next = queue.lock().await.recv().await;
                let Some((index, row)) = next else { break };

                let enriched = enricher.enrich(&row).await;
                let n = done.fetch_add(1, Ordering::Relaxed) + 1;
                debug!(worker, row = index, city = %row.city, "[{n}/{total}] row enriched");

                finished.push((index, enriched));
            }
            finished
        });
    }

    let mut slots: Vec<Option<EnrichedRow>> = vec![None; total];
    while let Some(joined) = pool.join_next().await {
        for (index, enriched) in joined? {
            slots[index] = Some(enriched);
        }
    }

    let mut stats = BatchStats::default();
    let mut out = Vec::with_capacity(total);
    for (index, slot) in slots.into_iter().enumerate() {
        let row = slot.ok_or(BatchError::MissingRow(index))?;
        stats.record(&row);
        out.push(row);
    }

    info!(
        total = stats.total,
        complete = stats.complete,
        partial = stats.partial,
        missing_geo = stats.missing_geo,
        missing_weather = stats.missing_weather,
        missing_fx = stats.missing_fx,
        "batch enrichment finished"
    );

    Ok(BatchReport { rows: out, stats })
}
