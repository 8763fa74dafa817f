//! Chat command: join a room and chat in the terminal.
//!
//! The driver owns the session state machine and feeds it two kinds of
//! input one at a time: terminal keys and session events from the network
//! tasks. Connecting and the handshake run on a spawned task.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use pakechat::config::{ClientConfig, RoomCredential, Salt, DEFAULT_HOST, DEFAULT_OUTBOUND_CAPACITY};
use pakechat::events::SessionEvent;
use pakechat::identity::Identity;
use pakechat::session::SessionProtocol;
use pakechat::state::{ChatSessionState, SendOutcome};
use pakechat::transport::WebSocketConnector;
use pakechat::tui::{
    handle_key_event, init_terminal, render, restore_terminal, App, Event, EventHandler, KeyAction,
    Tui,
};

use super::CommandExecutor;

/// How long to wait for the connection to close on quit.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

/// Terminal refresh interval.
const TICK_RATE: Duration = Duration::from_millis(100);

/// Join a chat room.
#[derive(Args, Debug, Clone)]
pub struct ChatCommand {
    /// Chat server address (host:port)
    #[arg(long, default_value = DEFAULT_HOST)]
    pub host: String,

    /// Process-wide key-derivation salt, shared by every client of a room
    #[arg(long, env = "SALT_MASTER", hide_env_values = true)]
    pub salt: Option<String>,

    /// Outgoing messages buffered before new ones are dropped
    #[arg(long, default_value_t = DEFAULT_OUTBOUND_CAPACITY)]
    pub outbound_capacity: usize,
}

type Protocol = SessionProtocol<WebSocketConnector>;

impl CommandExecutor for ChatCommand {
    fn execute(&self) -> Result<()> {
        let salt = Salt::from_config_str(self.salt.as_deref().unwrap_or_default())
            .context("SALT_MASTER must be set (generate one with `pakechat gen-salt`)")?;

        let config = ClientConfig {
            outbound_capacity: self.outbound_capacity,
            ..ClientConfig::with_host(self.host.clone())
        };

        let rt = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;
        rt.block_on(run(config, salt))
    }
}

async fn run(config: ClientConfig, salt: Salt) -> Result<()> {
    let identity = Identity::generate();
    info!(user_id = identity.user_id(), host = %config.host, "starting chat client");

    let state = ChatSessionState::new(identity, config.max_message_len);
    let (events_tx, events_rx) = mpsc::channel(config.event_capacity);
    let protocol = Arc::new(SessionProtocol::new(
        WebSocketConnector::new(config.clone()),
        salt,
        config,
    ));

    let mut terminal = init_terminal().context("Failed to initialize terminal")?;
    let mut app = App::new(state);
    let mut driver = Driver {
        protocol,
        events_tx,
        events_rx,
        connection: None,
    };

    let result = driver.run(&mut terminal, &mut app).await;

    restore_terminal(&mut terminal).context("Failed to restore terminal")?;
    driver.shutdown(&mut app).await;
    result
}

struct Driver {
    protocol: Arc<Protocol>,
    events_tx: mpsc::Sender<SessionEvent>,
    events_rx: mpsc::Receiver<SessionEvent>,
    connection: Option<JoinHandle<()>>,
}

impl Driver {
    async fn run(&mut self, terminal: &mut Tui, app: &mut App) -> Result<()> {
        let mut terminal_events = EventHandler::new();
        terminal_events.spawn_reader(TICK_RATE);

        loop {
            terminal.draw(|frame| render(frame, app))?;

            tokio::select! {
                event = terminal_events.next() => match event {
                    Some(Event::Key(key)) => {
                        let action = handle_key_event(app, key);
                        self.perform(app, action);
                    }
                    Some(Event::Resize(_, _)) | Some(Event::Tick) => {}
                    None => return Ok(()),
                },
                Some(event) = self.events_rx.recv() => {
                    app.session.handle(event);
                    app.scroll_to_bottom();
                }
            }

            if app.should_quit {
                return Ok(());
            }
        }
    }

    fn perform(&mut self, app: &mut App, action: KeyAction) {
        match action {
            KeyAction::None => {}
            KeyAction::Quit => app.session.quit(),
            KeyAction::ToggleReveal => app.session.toggle_reveal(),
            KeyAction::Connect => {
                let (room, password) = app.take_login();
                match app.session.confirm_login(&room, &password) {
                    Ok(credential) => self.connect(credential),
                    Err(e) => debug!(error = %e, "login rejected"),
                }
            }
            KeyAction::SendMessage => {
                let text = app.input.take();
                match app.session.send_message(&text) {
                    Ok(SendOutcome::Sent) => app.scroll_to_bottom(),
                    Ok(SendOutcome::Ignored) => {}
                    Ok(SendOutcome::Dropped) => app.set_notice("Message dropped: outbound queue full"),
                    Err(e) => app.set_notice(e.to_string()),
                }
            }
        }
    }

    /// Establish the session in the background; events arrive on `events_rx`.
    fn connect(&mut self, credential: RoomCredential) {
        let protocol = Arc::clone(&self.protocol);
        let events = self.events_tx.clone();

        self.connection = Some(tokio::spawn(async move {
            if let Ok(pump) = protocol.establish(&credential, events).await {
                pump.join().await;
            }
        }));
    }

    /// Close the session and give the connection a moment to shut down.
    async fn shutdown(self, app: &mut App) {
        app.session.quit();
        if let Some(connection) = self.connection {
            if tokio::time::timeout(SHUTDOWN_GRACE, connection).await.is_err() {
                debug!("connection still open at exit");
            }
        }
    }
}
