use crate::domain::model::{ContentKind, ItemFailure, RunSummary};
use crate::domain::ports::Pipeline;
use crate::utils::error::Result;
use tracing::Instrument;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    /// Processes every discovered announcement in order. Only a failed
    /// discovery is returned as an error; per-item failures are counted.
    pub async fn run(&self) -> Result<RunSummary> {
        tracing::info!("🎓 Starting scholarship ETL run");

        let items = self.pipeline.extract().await?;
        let total = items.len();
        let delay = self.pipeline.item_delay();

        let mut summary = RunSummary {
            discovered: total,
            ..Default::default()
        };

        if items.is_empty() {
            tracing::warn!("No announcements to process");
            return Ok(summary);
        }

        tracing::info!("🔄 Processing {} announcements", total);

        for (index, item) in items.iter().enumerate() {
            let span = tracing::info_span!("announcement", index = index + 1, total, link = %item.link);

            let outcome = async {
                tracing::info!(title = %item.title, "Processing announcement");
                let record = self.pipeline.transform(item).await?;
                self.pipeline.load(&record).await?;
                Ok::<_, ItemFailure>(record.content_kind)
            }
            .instrument(span.clone())
            .await;

            span.in_scope(|| match outcome {
                Ok(kind) => {
                    summary.succeeded += 1;
                    match kind {
                        ContentKind::Image => summary.via_image += 1,
                        ContentKind::Text => summary.via_text += 1,
                    }
                    tracing::info!(outcome = "stored", via = %kind, "✅ Announcement stored");
                }
                Err(failure) => {
                    summary.failed += 1;
                    tracing::warn!(outcome = "skipped", reason = %failure, "⚠️ Announcement skipped");
                }
            });

            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        tracing::info!(
            discovered = summary.discovered,
            succeeded = summary.succeeded,
            failed = summary.failed,
            via_image = summary.via_image,
            via_text = summary.via_text,
            "✅ Run finished"
        );

        Ok(summary)
    }
}
