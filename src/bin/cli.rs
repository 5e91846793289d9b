use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use std::path::PathBuf;
use std::process::ExitCode;

use scolarite::cli::{PreviewOptions, preview_document};
use scolarite::logging::init_cli_tracing;
use scolarite::utils::jwt::{ADMIN_ROLE, create_token};
use scolarite_config::{DocumentConfig, JwtConfig};
use scolarite_db::{init_db_pool, run_migrations};
use scolarite_models::details::DocumentType;

#[derive(Parser)]
#[command(name = "scolarite-cli")]
#[command(about = "Scolarite CLI - Offline tools for the student services API", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a document from JSON files without touching the database
    Preview {
        /// school-certificate, success-certificate, transcript or internship
        #[arg(short = 't', long = "type")]
        document_type: DocumentType,

        /// Student record as JSON
        #[arg(short = 's', long)]
        student: PathBuf,

        /// Incoming details as a JSON object
        #[arg(short = 'd', long)]
        details: Option<PathBuf>,

        /// Reference printed on the document
        #[arg(short = 'r', long)]
        reference: Option<String>,

        /// Output PDF path
        #[arg(short = 'o', long)]
        out: PathBuf,
    },
    /// Apply database migrations
    Migrate,
    /// Mint an admin token signed with JWT_SECRET, for local testing
    Token {
        #[arg(short = 'e', long)]
        email: String,

        /// Lifetime in seconds
        #[arg(long, default_value = "3600")]
        ttl: i64,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();
    init_cli_tracing();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Preview {
            document_type,
            student,
            details,
            reference,
            out,
        } => {
            let options = PreviewOptions {
                document_type,
                student,
                details,
                reference,
                out: out.clone(),
            };
            preview_document(DocumentConfig::from_env(), options)
                .await
                .map(|merged| {
                    let missing = merged.missing_fields();
                    println!("✅ Wrote {}", out.display());
                    if !missing.is_empty() {
                        println!("   Missing fields: {}", missing.join(", "));
                    }
                })
        }
        Commands::Migrate => {
            match init_db_pool().await {
                Ok(pool) => run_migrations(&pool)
                    .await
                    .map(|_| println!("✅ Migrations applied"))
                    .map_err(anyhow::Error::from),
                Err(e) => Err(anyhow::Error::from(e).context("Failed to connect to database")),
            }
        }
        Commands::Token { email, ttl } => {
            create_token(&email, &email, ADMIN_ROLE, ttl, &JwtConfig::from_env())
                .map(|token| println!("{}", token))
                .map_err(|e| e.error)
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("❌ {:#}", e);
            ExitCode::FAILURE
        }
    }
}
