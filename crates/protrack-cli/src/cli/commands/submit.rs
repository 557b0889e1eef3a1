//! Result submission handlers.

use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use protrack_core::flow::{self, FlowEvent};
use protrack_types::{ManualEntry, ProteinLevel, SubmissionStatus};
use tokio::sync::mpsc;

use super::{AppContext, report};

fn parse_date(raw: Option<&str>) -> Result<DateTime<Utc>> {
    match raw {
        Some(raw) => {
            let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .with_context(|| format!("Invalid date '{raw}' (expected YYYY-MM-DD)"))?;
            Ok(date.and_time(NaiveTime::MIN).and_utc())
        }
        None => Ok(Utc::now()),
    }
}

pub async fn manual(
    ctx: &AppContext,
    result: &str,
    notes: Option<String>,
    date: Option<&str>,
) -> Result<()> {
    ctx.require_auth()?;

    let level: ProteinLevel = result.parse().map_err(|msg: String| anyhow::anyhow!(msg))?;
    let entry = ManualEntry {
        result: Some(level),
        notes,
        timestamp: parse_date(date)?,
    };

    let (tx, mut rx) = mpsc::unbounded_channel();

    // Print progress as the flow emits it, so the user sees the record
    // before the network round trip finishes.
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                FlowEvent::RecordVisible { record } => {
                    println!("Recorded {} (syncing...)", record.record.result);
                }
                FlowEvent::Confirmed { record, .. } => match record.id {
                    Some(id) => println!("Synced (id {id})"),
                    None => println!("Synced"),
                },
                FlowEvent::SubmitFailed { message, .. } => {
                    println!("Sync failed: {message} (kept locally)");
                }
                FlowEvent::SessionEnded => {
                    println!("Session expired. Run 'protrack login' again.");
                }
                FlowEvent::RequestDispatched { .. }
                | FlowEvent::UploadStarted
                | FlowEvent::UploadFinished => {}
            }
        }
    });

    let local = match flow::submit_manual(&ctx.api, &ctx.session, entry, &tx).await {
        Ok(local) => local,
        Err(err) => {
            drop(tx);
            return Err(report(ctx, err));
        }
    };
    drop(tx);
    printer.await.context("flow printer task")?;

    if local.status == SubmissionStatus::Failed {
        // The record stands; the exit code just reflects the sync.
        std::process::exit(2);
    }
    Ok(())
}

fn mime_for(path: &Path) -> Result<&'static str> {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
        .as_deref()
    {
        Some("jpg" | "jpeg") => Ok("image/jpeg"),
        Some("png") => Ok("image/png"),
        _ => bail!("Unsupported image type (expected .jpg, .jpeg, or .png)"),
    }
}

pub async fn photo(ctx: &AppContext, image: &Path) -> Result<()> {
    ctx.require_auth()?;

    let mime_type = mime_for(image)?;
    let bytes = std::fs::read(image)
        .with_context(|| format!("Failed to read image {}", image.display()))?;
    let file_name = image
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("strip.jpg")
        .to_string();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let display_path = image.display().to_string();
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                FlowEvent::UploadStarted => {
                    println!("Uploading {display_path} for analysis...");
                }
                _ => {}
            }
        }
    });

    let outcome =
        flow::submit_photo(&ctx.api, &ctx.session, bytes, &file_name, mime_type, &tx).await;
    drop(tx);
    printer.await.context("flow printer task")?;

    match outcome {
        Ok(record) => {
            println!("Strip read: {}", record.result);
            if let Some(id) = record.id {
                println!("Saved (id {id})");
            }
            Ok(())
        }
        Err(err) => Err(report(ctx, err)),
    }
}
