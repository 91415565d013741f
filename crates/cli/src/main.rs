use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use shema_api::ApiClient;
use shema_core::ScheduleFilter;
use shema_core::constants::DEFAULT_API_URL;
use tracing_subscriber::EnvFilter;

use crate::commands::register::PaymentArgs;
use crate::draft::DraftStore;

mod commands;
mod draft;

#[derive(Parser)]
#[command(name = "shema")]
#[command(about = "Shema Music course registration and AI recommendations", long_about = None)]
struct Cli {
    /// Base URL of the Shema Music API
    #[arg(long, global = true, env = "SHEMA_API_URL")]
    api_url: Option<String>,

    /// SSE endpoint pushing assessment result changes
    #[arg(long, global = true, env = "SHEMA_REALTIME_URL")]
    realtime_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit questionnaire answers (JSON file) and wait for the recommendation
    Recommend { answers: PathBuf },
    /// Wait for the analysis of an already submitted assessment
    Watch { assessment_id: String },
    /// Show a stored analysis result
    Result {
        #[arg(short, long)]
        assessment_id: Option<String>,
    },
    /// List instruments, or levels and class types for one instrument
    Courses {
        #[arg(short, long)]
        instrument: Option<String>,
    },
    /// List instructors teaching an instrument and class type
    Instructors {
        #[arg(short, long)]
        instrument: Option<String>,
        #[arg(short, long)]
        class_type: Option<String>,
    },
    /// Narrow an instructor's free slots by day and time
    Slots {
        #[arg(long)]
        instructor: String,
        #[arg(short, long)]
        instrument: Option<String>,
        #[arg(short, long)]
        class_type: Option<String>,
        #[arg(short, long)]
        day: Option<String>,
        #[arg(short, long)]
        time: Option<String>,
    },
    /// Register for a course from a form file (JSON with optional `schedules`)
    Register {
        form: PathBuf,
        #[arg(long)]
        payment_proof: String,
        #[arg(long, default_value = "transfer")]
        payment_method: String,
        #[arg(long, env = "SHEMA_CAPTCHA_TOKEN", default_value = "")]
        captcha_token: String,
    },
    /// Inspect or discard the local registration draft
    Draft {
        #[command(subcommand)]
        action: DraftAction,
    },
}

#[derive(Subcommand)]
enum DraftAction {
    Show,
    Clear,
}

pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn api_client(api_url: Option<&str>) -> Result<Arc<ApiClient>> {
    let client = ApiClient::new(api_url.unwrap_or(DEFAULT_API_URL))?;
    tracing::debug!(base_url = client.base_url(), "api client ready");
    Ok(Arc::new(client))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let realtime_url = cli.realtime_url.as_deref();

    match cli.command {
        Commands::Recommend { answers } => {
            let api = api_client(cli.api_url.as_deref())?;
            commands::recommend::run_recommend(api, realtime_url, &answers).await?;
        },
        Commands::Watch { assessment_id } => {
            let api = api_client(cli.api_url.as_deref())?;
            commands::recommend::run_watch(api, realtime_url, &assessment_id).await?;
        },
        Commands::Result { assessment_id } => {
            let api = api_client(cli.api_url.as_deref())?;
            commands::recommend::run_result(api, assessment_id.as_deref()).await?;
        },
        Commands::Courses { instrument } => {
            let api = api_client(cli.api_url.as_deref())?;
            commands::catalog::run_courses(api, instrument.as_deref()).await?;
        },
        Commands::Instructors { instrument, class_type } => {
            let api = api_client(cli.api_url.as_deref())?;
            commands::catalog::run_instructors(api, instrument.as_deref(), class_type.as_deref())
                .await?;
        },
        Commands::Slots { instructor, instrument, class_type, day, time } => {
            let api = api_client(cli.api_url.as_deref())?;
            let filter = ScheduleFilter::new(instrument.as_deref(), class_type.as_deref());
            commands::catalog::run_slots(api, &instructor, filter, day.as_deref(), time.as_deref())
                .await?;
        },
        Commands::Register { form, payment_proof, payment_method, captcha_token } => {
            let api = api_client(cli.api_url.as_deref())?;
            let payment = PaymentArgs {
                proof_url: &payment_proof,
                method: &payment_method,
                captcha_token: &captcha_token,
            };
            commands::register::run_register(api, &DraftStore::from_env(), &form, payment).await?;
        },
        Commands::Draft { action } => {
            let store = DraftStore::from_env();
            match action {
                DraftAction::Show => commands::draft::run_show(&store)?,
                DraftAction::Clear => commands::draft::run_clear(&store)?,
            }
        },
    }

    Ok(())
}
