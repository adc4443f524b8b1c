use clap::Parser;
use comms::transport::client::HttpRoomApi;
use tracing::info;

use crate::{
    config::Config,
    state_store::StateStore,
    termination::{create_termination, Interrupted},
    ui_management::UiManager,
};

mod config;
mod logging;
mod session;
mod state_store;
mod termination;
mod ui_management;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    let _log_guard = logging::init_logging(&config)?;

    let api = HttpRoomApi::new(&config.server_url)?
        .with_retry_delay(config.retry_delay())
        .with_request_timeout(config.request_timeout());
    info!(server_url = %config.server_url, "starting room chat client");

    let (terminator, mut interrupt_rx) = create_termination();
    let (state_store, state_rx) = StateStore::new(config.server_url.clone());
    let (ui_manager, action_rx) = UiManager::new();

    tokio::try_join!(
        state_store.main_loop(api, terminator, action_rx, interrupt_rx.resubscribe()),
        ui_manager.main_loop(state_rx, interrupt_rx.resubscribe()),
    )?;

    if let Ok(reason) = interrupt_rx.recv().await {
        match reason {
            Interrupted::UserInt => println!("exited per user request"),
            Interrupted::OsSigInt => println!("exited because of an os sig int"),
        }
    } else {
        println!("exited because of an unexpected error");
    }

    Ok(())
}
