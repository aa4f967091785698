//! Reportal Web Server
//!
//! Role-gated report distribution backed by an external identity provider
//! and a blob store.

use clap::Parser;
use reportal_web::server::ReportalServerBuilder;
use reportal_web::init_logging;

/// Reportal Web Server - role-gated report distribution
#[derive(Parser)]
#[command(name = "reportal-web")]
#[command(about = "Web backend for the report portal")]
#[command(version)]
struct Args {
    /// Server host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Database URL for the identity store
    #[arg(long)]
    database_url: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    std::env::set_var(
        "RUST_LOG",
        format!("reportal_web={},tower_http=debug", args.log_level),
    );
    init_logging();

    // Load environment variables
    dotenvy::dotenv().ok();

    // Check for required environment variables
    let mut missing_vars = Vec::new();
    if std::env::var("SUPABASE_URL").is_err() {
        missing_vars.push("SUPABASE_URL");
    }
    if std::env::var("SUPABASE_KEY").is_err() {
        missing_vars.push("SUPABASE_KEY");
    }
    if std::env::var("AWS_STORAGE_BUCKET_NAME").is_err() {
        missing_vars.push("AWS_STORAGE_BUCKET_NAME");
    }

    if !missing_vars.is_empty() {
        println!("⚠️  Warning: Missing environment variables:");
        for var in missing_vars {
            println!("   - {}", var);
        }
        println!("   The server will start but some features may not work properly.");
    }

    let mut builder = ReportalServerBuilder::new()
        .host(args.host)
        .port(args.port);
    if let Some(database_url) = args.database_url {
        builder = builder.database_url(database_url);
    }

    let server = match builder.build().await {
        Ok(server) => server,
        Err(e) => {
            eprintln!("❌ Failed to build server: {}", e);
            std::process::exit(1);
        }
    };

    println!(
        "🚀 Reportal Web Server starting on http://{}",
        server.config().address()
    );

    if let Err(e) = server.start().await {
        eprintln!("❌ Server error: {}", e);
        std::process::exit(1);
    }
}
