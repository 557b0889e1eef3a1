//! Results listing and trend output.

use anyhow::Result;
use comfy_table::{ContentArrangement, Table};
use protrack_core::services::results::{self, chart_series};
use protrack_types::TestResult;

use super::{AppContext, report};

fn render_table(results: &[TestResult]) -> String {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["When", "Result", "Entry", "Notes"]);

    for result in results {
        table.add_row(vec![
            result.timestamp.format("%Y-%m-%d %H:%M").to_string(),
            result.result.to_string(),
            result.entry_method.to_string(),
            result.notes.clone().unwrap_or_default(),
        ]);
    }

    table.to_string()
}

async fn fetch(ctx: &AppContext) -> Result<Vec<TestResult>> {
    ctx.require_auth()?;
    results::list(&ctx.api).await.map_err(|err| report(ctx, err))
}

pub async fn list(ctx: &AppContext) -> Result<()> {
    let mut results = fetch(ctx).await?;

    if results.is_empty() {
        println!("No results yet. Submit one with 'protrack submit'.");
        return Ok(());
    }

    // Newest first for the table view.
    results.sort_by_key(|r| std::cmp::Reverse(r.timestamp));
    println!("{}", render_table(&results));
    Ok(())
}

pub async fn trend(ctx: &AppContext) -> Result<()> {
    let results = fetch(ctx).await?;

    if results.is_empty() {
        println!("No results yet. Submit one with 'protrack submit'.");
        return Ok(());
    }

    for (timestamp, value) in chart_series(&results) {
        println!("{}\t{value}", timestamp.to_rfc3339());
    }
    Ok(())
}
