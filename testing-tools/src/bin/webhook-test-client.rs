use anyhow::Result;
use clap::Parser;
use colored::*;

use testing_tools::output::print_test_summary;
use testing_tools::scenarios;
use testing_tools::WebhookClient;

#[derive(Parser)]
#[command(name = "webhook-test-client")]
#[command(about = "Webhook ingest integration testing tool")]
struct Cli {
    /// Full webhook URL, including the configured path (e.g., http://localhost:8080/)
    #[arg(long)]
    url: String,

    /// Test scenario to run
    #[arg(long, value_enum, default_value = "all")]
    scenario: ScenarioChoice,

    /// Enable verbose output
    #[arg(long, short)]
    verbose: bool,
}

#[derive(clap::ValueEnum, Clone)]
enum ScenarioChoice {
    /// A valid notification is acknowledged
    Acknowledge,
    /// A malformed body is rejected with 400
    InvalidJson,
    /// A GET is answered with 404
    WrongMethod,
    /// A POST to another path is answered with 404
    WrongPath,
    /// Run every scenario
    All,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    }

    println!("{}", "=== SETUP PHASE ===".bright_white().bold());
    println!("{} Target: {}", "→".blue(), cli.url);
    let client = WebhookClient::new(cli.url.clone());

    let mut results = Vec::new();
    match cli.scenario {
        ScenarioChoice::Acknowledge => results.push(scenarios::test_acknowledge(&client).await?),
        ScenarioChoice::InvalidJson => results.push(scenarios::test_invalid_json(&client).await?),
        ScenarioChoice::WrongMethod => results.push(scenarios::test_wrong_method(&client).await?),
        ScenarioChoice::WrongPath => results.push(scenarios::test_wrong_path(&cli.url).await?),
        ScenarioChoice::All => {
            results.push(scenarios::test_acknowledge(&client).await?);
            results.push(scenarios::test_invalid_json(&client).await?);
            results.push(scenarios::test_wrong_method(&client).await?);
            results.push(scenarios::test_wrong_path(&cli.url).await?);
        }
    }

    print_test_summary(&results);

    if results.iter().any(|result| !result.passed) {
        std::process::exit(1);
    }
    Ok(())
}
