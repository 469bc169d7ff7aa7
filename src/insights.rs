//! Narrative dataset report: one generation call over the statistical
//! summary, returned as plain text.

use anyhow::{Context, Result};
use log::info;

use crate::{llm::GenerationClient, profile::DatasetSummary};

pub fn generate_insights(client: &GenerationClient, summary: &DatasetSummary) -> Result<String> {
    let summary_json =
        serde_json::to_string_pretty(summary).context("serializing dataset summary")?;
    let prompt = format!(
        "You are a data analyst. Below is the statistical profile of a \
dataset as JSON.\n\n{summary_json}\n\n\
Write a concise report with these sections:\n\
1. Overview - what the dataset appears to describe\n\
2. Key statistics - the numbers that stand out\n\
3. Data quality - missing values and anything suspicious\n\
4. Patterns - relationships or distributions worth noting\n\
5. Business insights - what the numbers suggest\n\
6. Next steps - analyses worth running next\n\n\
Keep each section short and grounded in the profile above.",
    );

    info!(
        "Requesting narrative report for {} rows x {} cols",
        summary.rows, summary.cols
    );
    client
        .generate(&prompt)
        .context("generating dataset report")
}
