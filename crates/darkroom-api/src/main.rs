use darkroom_core::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    darkroom_api::telemetry::init_tracing();

    let config = Config::from_env()?;

    let (_state, router) = darkroom_api::setup::initialize_app(config.clone()).await?;

    darkroom_api::setup::server::start_server(&config, router).await?;

    Ok(())
}
