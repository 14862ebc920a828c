//! `wterm connect [host]`: open an interactive terminal session.
//!
//! Resolves the host from the host book (or asks with a picker), connects the
//! STOMP channel, and enters raw terminal mode. Keys go through the session
//! controller with local echo; captured files open in an external editor and
//! are written back when the editor exits with changes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{self, Event};
use dialoguer::Select;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use wterm_client::classifier::NOT_FOUND_TEXT;
use wterm_client::{
    CommandRewriter, DisplaySink, SessionController, SessionEvent, StompConnector,
    TerminalClient,
};
use wterm_core::{SessionIdentity, TermError, TermResult};

use crate::config::{Config, HostEntry};
use crate::editor;
use crate::terminal::{self as term, InputEvent, RawModeGuard, StdoutDisplay};

type Client = TerminalClient<StompConnector, StdoutDisplay>;

/// How long the input thread waits for an event before rechecking its flags.
const INPUT_POLL: Duration = Duration::from_millis(100);

/// Run an interactive session against `target` (host name or id).
pub async fn run(
    cfg: &Config,
    url: &str,
    target: Option<&str>,
    connection_type: Option<&str>,
) -> Result<()> {
    let host = match target {
        Some(target) => cfg.resolve_target(target)?,
        None => pick_host(cfg)?,
    };
    let connection_type = connection_type.unwrap_or(&host.connection_type);
    info!(id = host.id, host = %host.label(), connection_type, "connecting");

    let connector = StompConnector::new(url)
        .context("invalid bridge URL")?
        .with_connect_timeout(Duration::from_secs(cfg.default.connect_timeout));
    debug!(url = %connector.url(), "bridge URL");

    let identity = SessionIdentity::new(host.id, connection_type);
    let controller = SessionController::new(identity, CommandRewriter::new(cfg.alias_table()));
    let (tx_events, mut rx_events) = mpsc::unbounded_channel();
    let mut client = TerminalClient::new(connector, controller, StdoutDisplay::new(), tx_events)
        .with_topic_template(cfg.default.topic.clone());

    client
        .connect()
        .await
        .with_context(|| format!("failed to connect to {}", host.label()))?;

    let editor = editor::resolve_editor(cfg.default.editor.as_deref());
    let mut guard = RawModeGuard::enter()?;
    let (cols, rows) = term::get_terminal_size();
    client.resize(cols, rows);

    let (tx_input, mut rx_input) = mpsc::channel::<InputEvent>(64);
    let (tx_resize, mut rx_resize) = mpsc::channel::<(u16, u16)>(8);
    let paused = Arc::new(AtomicBool::new(false));
    let stop = Arc::new(AtomicBool::new(false));

    // Blocking thread reading crossterm events. It stands aside while the
    // external editor owns the terminal.
    let input_handle = {
        let paused = paused.clone();
        let stop = stop.clone();
        tokio::task::spawn_blocking(move || {
            while !stop.load(Ordering::SeqCst) {
                if paused.load(Ordering::SeqCst) {
                    std::thread::sleep(INPUT_POLL);
                    continue;
                }
                match event::poll(INPUT_POLL) {
                    Ok(true) if !paused.load(Ordering::SeqCst) => {}
                    Ok(_) => continue,
                    Err(e) => {
                        warn!("crossterm poll error: {e}");
                        break;
                    }
                }
                match event::read() {
                    Ok(Event::Key(key_event)) => {
                        let Some(input) = term::key_event_to_input(&key_event) else {
                            continue;
                        };
                        if tx_input.blocking_send(input).is_err() {
                            break;
                        }
                    }
                    Ok(Event::Resize(new_cols, new_rows)) => {
                        let _ = tx_resize.blocking_send((new_cols, new_rows));
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!("crossterm event error: {e}");
                        break;
                    }
                }
            }
        })
    };

    let result = session_loop(
        &mut client,
        &mut rx_input,
        &mut rx_resize,
        &mut rx_events,
        &editor,
        &mut guard,
        &paused,
    )
    .await;

    stop.store(true, Ordering::SeqCst);
    if let Err(e) = client.disconnect().await {
        debug!("disconnect error: {e}");
    }
    input_handle.abort();
    drop(guard);
    eprintln!("\r\nConnection to {} closed.", host.label());

    result
}

async fn session_loop(
    client: &mut Client,
    rx_input: &mut mpsc::Receiver<InputEvent>,
    rx_resize: &mut mpsc::Receiver<(u16, u16)>,
    rx_events: &mut mpsc::UnboundedReceiver<SessionEvent>,
    editor: &str,
    guard: &mut RawModeGuard,
    paused: &AtomicBool,
) -> Result<()> {
    loop {
        tokio::select! {
            inbound = client.next_inbound(), if client.is_connected() => match inbound {
                Ok(Some(message)) => client.on_inbound(&message).await?,
                Ok(None) => {
                    info!("channel closed by the bridge");
                    client.disconnect().await?;
                    client
                        .display_mut()
                        .notice("connection closed (Ctrl+R reconnects, Ctrl+] quits)")?;
                }
                Err(e) => {
                    warn!("inbound error: {e}");
                    client.disconnect().await?;
                    client.display_mut().notice(&format!("{e} (Ctrl+R reconnects)"))?;
                }
            },
            input = rx_input.recv() => match input {
                Some(InputEvent::Key(key)) => {
                    let result = client.handle_key(key).await;
                    report(client, result)?;
                }
                Some(InputEvent::Reconnect) => {
                    info!("reconnect requested");
                    let result = client.reconnect().await;
                    report(client, result)?;
                }
                Some(InputEvent::Disconnect) | None => {
                    info!("disconnect requested");
                    return Ok(());
                }
            },
            Some((cols, rows)) = rx_resize.recv() => client.resize(cols, rows),
            Some(event) = rx_events.recv() => {
                handle_event(client, event, editor, guard, paused).await?;
            }
        }
    }
}

/// Turn recoverable session errors into notices; anything else ends the session.
fn report(client: &mut Client, result: TermResult<()>) -> Result<()> {
    match result {
        Ok(()) => Ok(()),
        Err(TermError::Busy(reason)) => {
            debug!("{reason}");
            client.display_mut().write("\x07")?;
            Ok(())
        }
        Err(TermError::NotConnected) => {
            client
                .display_mut()
                .notice("not connected (Ctrl+R reconnects, Ctrl+] quits)")?;
            Ok(())
        }
        Err(e @ (TermError::Transport(_) | TermError::Timeout | TermError::NoEditTarget)) => {
            warn!("{e}");
            client.display_mut().notice(&e.to_string())?;
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

async fn handle_event(
    client: &mut Client,
    event: SessionEvent,
    editor: &str,
    guard: &mut RawModeGuard,
    paused: &AtomicBool,
) -> Result<()> {
    match event {
        SessionEvent::ConnectSuccess => info!("session connected"),
        SessionEvent::OpenEditor { filename, text } => {
            paused.store(true, Ordering::SeqCst);
            guard.suspend()?;
            let edited = {
                let editor = editor.to_string();
                let filename = filename.clone();
                tokio::task::spawn_blocking(move || editor::edit_text(&editor, &filename, &text))
                    .await
                    .context("editor task failed")?
            };
            guard.resume()?;
            paused.store(false, Ordering::SeqCst);

            let result = match edited {
                Ok(Some(text)) => {
                    debug!(file = %filename, "saving edited file");
                    let result = client.save_editor(&text).await;
                    if let Some(notice) = save_refused_notice(&filename, &result) {
                        client.display_mut().notice(&notice)?;
                        return Ok(());
                    }
                    result
                }
                Ok(None) => {
                    debug!(file = %filename, "file unchanged");
                    client.abandon_edit().await
                }
                Err(e) => {
                    client.display_mut().notice(&format!("{e:#}"))?;
                    client.abandon_edit().await
                }
            };
            report(client, result)?;
        }
        SessionEvent::OpenEditorFailure { filename } => {
            client
                .display_mut()
                .notice(&format!("{filename}: {NOT_FOUND_TEXT}"))?;
        }
        SessionEvent::CloseEditor => debug!("save confirmed"),
        SessionEvent::SaveFailure { filename } => {
            client
                .display_mut()
                .notice(&format!("could not save {filename}; edit discarded"))?;
            let result = client.abandon_edit().await;
            report(client, result)?;
        }
        SessionEvent::Cancelled { state } => {
            warn!(%state, "edit cancelled by disconnect");
            client.display_mut().notice("edit cancelled")?;
        }
    }
    Ok(())
}

/// A save refused because the session moved on loses the edit; say so
/// instead of only ringing the bell.
fn save_refused_notice(filename: &str, result: &TermResult<()>) -> Option<String> {
    match result {
        Err(TermError::Busy(reason)) => {
            Some(format!("{filename} not saved ({reason}); edit discarded"))
        }
        _ => None,
    }
}

fn pick_host(cfg: &Config) -> Result<HostEntry> {
    if cfg.hosts.is_empty() {
        anyhow::bail!("no hosts configured; pass a host id or add [[hosts]] to the config");
    }
    let labels: Vec<String> = cfg.hosts.iter().map(HostEntry::label).collect();
    let index = Select::new()
        .with_prompt("Connect to")
        .items(&labels)
        .default(0)
        .interact()
        .context("host selection cancelled")?;
    Ok(cfg.hosts[index].clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refused_save_gets_a_notice() {
        let refused = Err(TermError::Busy("cannot save while await-response".into()));
        assert_eq!(
            save_refused_notice("f.txt", &refused).as_deref(),
            Some("f.txt not saved (cannot save while await-response); edit discarded")
        );
    }

    #[test]
    fn accepted_save_needs_no_notice() {
        assert_eq!(save_refused_notice("f.txt", &Ok(())), None);
        assert_eq!(save_refused_notice("f.txt", &Err(TermError::NoEditTarget)), None);
    }
}
