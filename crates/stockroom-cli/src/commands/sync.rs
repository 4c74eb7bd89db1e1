use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;
use stockroom_core::services::{InventoryService, StockSummary};

use crate::commands::common::{open_service, Context, OpenMode};
use crate::error::CliError;

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct StatusReport {
    pub online: bool,
    pub api_base_url: Option<String>,
    pub categories: usize,
    pub products: usize,
    pub units_in_stock: i64,
    pub customers: usize,
    pub orders: usize,
    pub pending: BTreeMap<&'static str, usize>,
}

pub fn status_report(service: &InventoryService, summary: StockSummary) -> StatusReport {
    StatusReport {
        online: service.connectivity().is_online(),
        api_base_url: service.settings().api_base_url.clone(),
        categories: summary.categories,
        products: summary.products,
        units_in_stock: summary.units_in_stock,
        customers: summary.customers,
        orders: summary.orders,
        pending: summary.pending.into_iter().collect(),
    }
}

pub fn format_status_lines(report: &StatusReport) -> Vec<String> {
    let connection = match (&report.api_base_url, report.online) {
        (None, _) => "local only (no API configured)".to_string(),
        (Some(url), true) => format!("online ({url})"),
        (Some(url), false) => format!("offline ({url} unreachable)"),
    };

    let mut lines = vec![
        format!("Connection:  {connection}"),
        format!("Categories:  {}", report.categories),
        format!(
            "Products:    {} ({} units in stock)",
            report.products, report.units_in_stock
        ),
        format!("Customers:   {}", report.customers),
        format!("Orders:      {}", report.orders),
    ];

    let pending: Vec<String> = report
        .pending
        .iter()
        .filter(|(_, count)| **count > 0)
        .map(|(kind, count)| format!("{count} {kind}"))
        .collect();
    if pending.is_empty() {
        lines.push("Pending:     nothing, all changes synced".to_string());
    } else {
        lines.push(format!("Pending:     {}", pending.join(", ")));
    }
    lines
}

pub async fn run_sync(ctx: &Context) -> Result<(), CliError> {
    let service = open_service(ctx, OpenMode::CheckOnly).await?;
    if !service.has_remote() {
        return Err(CliError::SyncNotConfigured);
    }
    if !service.connectivity().is_online() {
        let pending = service.summary().await?.total_pending();
        println!("Stock API unreachable; {pending} change(s) still pending");
        return Ok(());
    }

    let report = service.sync_now().await;
    println!(
        "Sync completed: {} pushed, {} failed",
        report.pushed, report.failed
    );
    Ok(())
}

pub async fn run_refresh(ctx: &Context) -> Result<(), CliError> {
    let service = open_service(ctx, OpenMode::CheckOnly).await?;
    if !service.has_remote() {
        return Err(CliError::SyncNotConfigured);
    }
    if !service.connectivity().is_online() {
        println!("Stock API unreachable; showing local data");
        return Ok(());
    }

    service.refresh_all().await;
    println!("Refresh completed");
    Ok(())
}

pub async fn run_status(as_json: bool, ctx: &Context) -> Result<(), CliError> {
    let service = open_service(ctx, OpenMode::CheckOnly).await?;
    let report = status_report(&service, service.summary().await?);

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for line in format_status_lines(&report) {
            println!("{line}");
        }
    }
    Ok(())
}

/// Run the orchestrator in the foreground, pinging the API so reconnects
/// trigger a sweep
pub async fn run_watch(check_interval_secs: u64, ctx: &Context) -> Result<(), CliError> {
    let service = open_service(ctx, OpenMode::CheckOnly).await?;
    if !service.has_remote() {
        return Err(CliError::SyncNotConfigured);
    }

    let handle = service.orchestrator().start();
    let mut checks = tokio::time::interval(Duration::from_secs(check_interval_secs.max(1)));
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    println!("Watching for changes; press Ctrl-C to stop");
    loop {
        tokio::select! {
            result = &mut shutdown => {
                result?;
                break;
            }
            _ = checks.tick() => {
                service.check_connection().await;
            }
        }
    }

    handle.shutdown().await;
    let pending = service.summary().await?.total_pending();
    println!("Stopped; {pending} change(s) pending");
    Ok(())
}
