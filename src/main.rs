use doover_processors::config;
use doover_processors::events::Invocation;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Error> {
    doover_processors::set_up_logging();

    info!(
        "Initializing {} version {}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );

    let config = config::Config::load_from_env()?;
    info!("processor profile {}", config.profile);

    run(service_fn(|request: LambdaEvent<Invocation>| {
        doover_processors::function_handler(&config, request)
    }))
    .await
}
