// Application orchestration loop.
//
// Multiplexes user commands from the TUI and completion events from spawned
// backend requests, feeding both into the `StoryClient`. The client pushes
// its own `UiUpdate`s, so this loop only routes.

use fablepath_core::protocol::UserCommand;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::client::{ApiEvent, StoryClient};

/// Run the event loop until the user quits or the command channel closes.
///
/// Any in-flight request is aborted before returning.
pub async fn run(
    mut cmd_rx: mpsc::Receiver<UserCommand>,
    mut api_rx: mpsc::Receiver<ApiEvent>,
    mut client: StoryClient,
) -> anyhow::Result<()> {
    info!("Application event loop started");

    // The client keeps a sender alive, but guard anyway so select! never
    // spins on a closed receiver.
    let mut api_open = true;

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UserCommand::Quit) => {
                        info!("Quit command received, shutting down");
                        break;
                    }
                    Some(cmd) => handle_user_command(&mut client, cmd).await,
                    None => {
                        info!("Command channel closed, shutting down");
                        break;
                    }
                }
            }

            event = api_rx.recv(), if api_open => {
                match event {
                    Some(event) => client.handle_api_event(event).await,
                    None => {
                        debug!("API event channel closed");
                        api_open = false;
                    }
                }
            }
        }
    }

    client.shutdown();
    Ok(())
}

async fn handle_user_command(client: &mut StoryClient, cmd: UserCommand) {
    match cmd {
        UserCommand::StartStory(prompt) => client.start_story(&prompt).await,
        UserCommand::Choose(choice) => client.continue_story(choice).await,
        UserCommand::Cancel => client.cancel_request().await,
        UserCommand::Quit => {}
    }
}
