// src/lib.rs

pub mod cli;
pub mod config;
pub mod delivery;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod output;
pub mod types;
pub mod upload;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cli::{CliArgs, Commands};
use crate::config::{Invocation, WebhookSettings};
use crate::delivery::DeliveryClient;
use crate::errors::Result;
use crate::exec::printer::{print_post_execution, print_pre_execution};
use crate::exec::{ExecutionResult, ProcessRunner};
use crate::output::{JsonResult, print_result};
use crate::upload::{Provider, UploadStaging, render_dry_run_plan, render_upload_info};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - argument resolution into one `Invocation`
/// - the process runner
/// - (optional) upload of the output files
/// - (optional) webhook delivery
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let invocation = match args.command {
        Commands::Run(run) => Invocation::try_from(run)?,
        Commands::Diff(diff) => Invocation::try_from(diff)?,
    };

    // Ctrl-C → cancel the child and any pending webhook retry.
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            cancel.cancel();
        });
    }

    let result = execute_invocation(&invocation, &cancel).await?;
    print_result(&result)
}

/// Run (or simulate) the command, upload its files and deliver the result
/// if configured.
///
/// Upload failures are fatal. Delivery failures end up in `webhook_sent` /
/// `webhook_error`; they never turn into an `Err` here.
pub async fn execute_invocation(
    invocation: &Invocation,
    cancel: &CancellationToken,
) -> Result<JsonResult> {
    let provider = match &invocation.upload {
        Some(settings) if !invocation.dry_run => Some(upload::connect(settings).await?),
        _ => None,
    };
    execute_with_provider(invocation, cancel, provider.as_deref()).await
}

/// [`execute_invocation`] with an already configured upload provider.
///
/// `provider` is ignored unless the invocation has upload settings, and is
/// not needed for dry runs.
pub async fn execute_with_provider(
    invocation: &Invocation,
    cancel: &CancellationToken,
    provider: Option<&dyn Provider>,
) -> Result<JsonResult> {
    let chatty = invocation.verbose() || invocation.dry_run;

    if chatty {
        if let Some(settings) = &invocation.upload {
            eprint!("{}", render_upload_info(settings, invocation.dry_run));
        }
        print_pre_execution(&invocation.spec, invocation.dry_run);
    }

    let execution = if invocation.dry_run {
        if let Some(context) = &invocation.context {
            print_context_info(context)?;
        }
        ExecutionResult::simulated(invocation.spec.command_line())
    } else {
        run_and_upload(invocation, cancel, provider).await?
    };

    if chatty {
        print_post_execution(&execution, invocation.dry_run);
    }
    if let (Some(settings), true) = (&invocation.upload, invocation.dry_run) {
        eprint!("{}", render_dry_run_plan(settings));
    }

    let mut result = JsonResult::new(invocation, &execution);

    if let Some(webhook) = &invocation.webhook {
        if invocation.dry_run {
            eprintln!("[DRY RUN] Webhook would be sent to {}", webhook.config.url);
        } else {
            deliver(webhook, &mut result, cancel).await;
        }
    }

    Ok(result)
}

async fn run_and_upload(
    invocation: &Invocation,
    cancel: &CancellationToken,
    provider: Option<&dyn Provider>,
) -> Result<ExecutionResult> {
    let runner = ProcessRunner::new(cancel.clone());
    let Some(settings) = &invocation.upload else {
        return runner.execute(&invocation.spec).await;
    };
    let provider = provider.ok_or(upload::UploadError::NotConfigured("upload"))?;

    // Temporaries live until the staging is dropped, after the upload.
    let staging = UploadStaging::prepare(settings)?;
    let execution = runner.execute(&staging.apply(&invocation.spec)).await?;
    staging.upload_all(provider, invocation.verbose()).await?;
    Ok(execution)
}

async fn deliver(settings: &WebhookSettings, result: &mut JsonResult, cancel: &CancellationToken) {
    if settings.config.verbose {
        eprintln!("[WEBHOOK] Sending to {}", settings.config.url);
    }
    info!(url = %settings.config.url, "delivering result to webhook");

    let payload = result.webhook_payload();
    let outcome = match DeliveryClient::new(settings.config.clone(), settings.policy.clone()) {
        Ok(client) => client.send(cancel, &payload).await,
        Err(e) => Err(e),
    };

    if let Err(e) = &outcome {
        debug!(error = %e, "webhook delivery recorded as failed");
    }
    result.record_delivery(outcome);
}

fn print_context_info(context: &serde_json::Value) -> Result<()> {
    eprintln!("========================================");
    eprintln!("Context Configuration (DRY RUN)");
    eprintln!("========================================");
    eprintln!("{}", serde_json::to_string_pretty(context)?);
    eprintln!("----------------------------------------");
    Ok(())
}
