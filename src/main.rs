use anyhow::Context;
use bookshelf_service::configuration::get_configuration;
use bookshelf_service::startup::Application;
use bookshelf_service::telemetry::{get_tracing_subscriber, init_tracing_subscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let tracing_subscriber =
        get_tracing_subscriber("bookshelf_service".into(), "info".into(), std::io::stdout);
    init_tracing_subscriber(tracing_subscriber);

    let configuration = get_configuration().context("Failed to read configuration")?;

    let application =
        Application::build(configuration).context("Failed to build application")?;

    application.run_until_stopped().await?;
    Ok(())
}
