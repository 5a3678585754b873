use financial_query_orchestrator::{agent::Orchestrator, config::Settings};
use tracing::info;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: orchestrator \"<question>\" | orchestrator --brief";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        eprintln!("{}", USAGE);
        std::process::exit(2);
    }

    let settings = Settings::from_env()?;
    let orchestrator = Orchestrator::from_settings(&settings)?;

    let result = if args.len() == 1 && args[0] == "--brief" {
        info!("Generating market brief");
        orchestrator.get_market_brief().await
    } else {
        let question = args.join(" ");
        info!(question = %question, "Answering question");
        orchestrator.handle(&question).await
    };

    match result {
        Ok(answer) => {
            println!("{}", answer);
            Ok(())
        }
        Err(e) => {
            eprintln!("Orchestration failed: {}", e);
            Err(Box::new(e) as Box<dyn std::error::Error>)
        }
    }
}
