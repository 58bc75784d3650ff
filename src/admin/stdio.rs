use std::io::IsTerminal;
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::{AdminCommand, USAGE, execute, parse_command};
use crate::error::AppError;
use crate::settings::SettingsStore;

/// Serve admin commands from stdin until `/exit`, EOF, or `shutdown`.
///
/// Cancels `shutdown` on the way out so the rest of the process stops too.
/// A stdin read failure ends the loop and is returned to the caller.
pub async fn run(store: Arc<SettingsStore>, shutdown: CancellationToken) -> Result<(), AppError> {
    let interactive_tty = std::io::stdin().is_terminal() && std::io::stdout().is_terminal();
    info!(interactive = interactive_tty, "admin stdio adapter: connected");

    serve(BufReader::new(tokio::io::stdin()), store, shutdown, interactive_tty).await
}

/// Command loop over any line source; replies go to stdout, errors to stderr.
pub(crate) async fn serve<R>(
    input: R,
    store: Arc<SettingsStore>,
    shutdown: CancellationToken,
    prompt: bool,
) -> Result<(), AppError>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    let mut outcome = Ok(());

    loop {
        if prompt {
            print!("# ");
            use std::io::Write as _;
            let _ = std::io::stdout().flush();
        }

        tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                info!("admin stdio adapter shutting down");
                break;
            }

            line = lines.next_line() => {
                let input = match line {
                    Ok(Some(l)) => l,
                    Ok(None) => {
                        info!("admin stdio adapter stdin closed");
                        break;
                    }
                    Err(e) => {
                        warn!("admin stdio adapter read error: {e}");
                        outcome = Err(AppError::Io(e));
                        break;
                    }
                };

                match parse_command(&input) {
                    Ok(None) => {}
                    Ok(Some(AdminCommand::Help)) => eprintln!("{USAGE}"),
                    Ok(Some(AdminCommand::Exit)) => {
                        info!("admin stdio adapter: exit requested");
                        break;
                    }
                    Ok(Some(command)) => {
                        let store = Arc::clone(&store);
                        match tokio::task::spawn_blocking(move || execute(&store, command)).await {
                            Ok(Ok(reply)) => println!("{reply}"),
                            Ok(Err(err)) => eprintln!("settings error: {err}"),
                            Err(err) => eprintln!("admin task failed: {err}"),
                        }
                    }
                    Err(e) => {
                        eprintln!("{e}");
                        eprintln!("{USAGE}");
                    }
                }
            }
        }
    }

    shutdown.cancel();
    outcome
}
