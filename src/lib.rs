use lambda_runtime::{Error, LambdaEvent};
use tracing::level_filters::LevelFilter;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::doover::DooverClient;
use crate::events::Invocation;

pub mod config;
pub mod decode;
pub mod doover;
pub mod events;
pub mod process;
pub mod profiles;
pub mod ui;

pub fn set_up_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .from_env_lossy(),
        )
        .init();
}

// lambda handler
pub async fn function_handler(config: &Config, evt: LambdaEvent<Invocation>) -> Result<(), Error> {
    info!("Handling lambda invocation");
    debug!("Handling event payload: {:?}", evt.payload);

    let invocation = evt.payload;
    let credentials = invocation.credentials(&config.endpoint);
    let client = match DooverClient::new(credentials, config.debug_mode, config.verify_ssl) {
        Ok(client) => client,
        Err(err) => {
            error!("failed to create doover client: {}", err);
            return Ok(());
        }
    };

    process::run(&client, config, &invocation).await;
    Ok(())
}
