//! ScriptBox download post-processor.
//!
//! Invoked by the download manager after a job finishes. Options come from
//! the command line or the environment; a `.env` file is loaded first if present.

use std::process::ExitCode;

use clap::Parser;
use scriptbox_postprocess::{init_logging, run, CliArgs, PostProcessError, Settings};
use scriptbox_storage_s3::S3StorageClient;

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let args: CliArgs = CliArgs::parse();

    if let Err(e) = init_logging(&args.info_log, &args.error_log) {
        eprintln!("{}", e);
        return ExitCode::from(PostProcessError::from(e).exit_code());
    }

    match process(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(exit_code = e.exit_code(), "{}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

async fn process(args: CliArgs) -> Result<(), PostProcessError> {
    let settings: Settings = Settings::try_from(args)?;
    let client: S3StorageClient = S3StorageClient::new(&settings.storage).await?;

    let outcome = run(&settings, &client).await?;
    tracing::info!(
        bucket = %outcome.receipt.bucket,
        key = %outcome.receipt.key,
        bytes = outcome.receipt.bytes,
        cleaned_up = outcome.cleanup_warning.is_none(),
        "Post-processing finished"
    );
    Ok(())
}
