use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use path_router::config::load_config;
use path_router::http::MatchedBody;
use path_router::lifecycle::{build_router, EndpointRouter};

#[derive(Parser)]
#[command(name = "route-cli")]
#[command(about = "Offline tools for path-router route tables", long_about = None)]
struct Cli {
    /// Route table (TOML).
    #[arg(short, long, default_value = "routes.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the table and build its router
    Check,
    /// Resolve a path and print the match as JSON
    Resolve {
        path: String,
        #[arg(short, long)]
        method: Option<String>,
    },
    /// Print the compiled decision procedure
    Inspect,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&cli.config)?;
    let router = build_router(&config)?;

    match cli.command {
        Commands::Check => print_summary(&router),
        Commands::Resolve { path, method } => {
            let resolution = router.resolve(&path, method.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&MatchedBody::new(&resolution))?);
        }
        Commands::Inspect => print!("{}", router.procedure()),
    }

    Ok(())
}

fn print_summary(router: &EndpointRouter) {
    let statics = router.routes().iter().filter(|r| r.is_static()).count();
    println!(
        "OK: {} routes ({} static, {} dynamic)",
        router.routes().len(),
        statics,
        router.routes().len() - statics
    );
    for route in router.routes() {
        let name = route.name().map(|n| format!(" [{n}]")).unwrap_or_default();
        println!("  {}{} {}", route.methods().join(","), name, route.path());
    }
}
