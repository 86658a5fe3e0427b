use std::sync::Arc;

use grok_agent::{
    builtin_toolkit, default_catalog, Agent, AppConfig, SearchParameters, Session, XaiClient,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> grok_agent::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "grok_agent=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::from_env()?;
    if let Err(err) = config.validate() {
        println!("{err}");
        return Ok(());
    }

    let client = XaiClient::from_config(&config.model)?;
    tracing::info!(model = client.model(), "starting session");
    let agent = Agent::new(Arc::new(client))
        .with_tools(builtin_toolkit(), default_catalog())?
        .with_search(Some(SearchParameters::from(&config.search)))
        .with_max_round_trips(config.agent.max_round_trips);

    let mut session = Session::new(agent, config.agent.system_prompt.clone());
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    session.run(stdin, tokio::io::stdout()).await
}
