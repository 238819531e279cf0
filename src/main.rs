use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

use surge_explorer::app::{App, StatusLevel, Tab};
use surge_explorer::config::{self, CliOverrides, EnvOverrides, Settings};
use surge_explorer::infrastructure::runtime::{
    RuntimeBridge, RuntimeCommand, RuntimeEvent, WorkerSettings,
};
use surge_explorer::infrastructure::tendermint::{Gateway, HttpGateway};
use surge_explorer::ui;

#[derive(Debug, Parser)]
#[command(
    name = "surge-explorer",
    version,
    about = "Terminal block explorer for the Surge chain"
)]
struct Args {
    /// Tendermint RPC endpoint (e.g. https://rpc.devnet.surge.dev)
    #[arg(long)]
    rpc: Option<String>,

    /// Display name for the endpoint
    #[arg(long)]
    name: Option<String>,

    /// Inscription API URL
    #[arg(long)]
    inscriptions_url: Option<String>,

    /// Rows kept per list
    #[arg(long)]
    max_rows: Option<usize>,

    /// Log file (default: <data dir>/surge-explorer.log)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_file.clone())?;

    let settings = Settings::resolve(
        config::load(),
        EnvOverrides::from_env(),
        CliOverrides {
            rpc: args.rpc,
            name: args.name,
            inscriptions_url: args.inscriptions_url,
            max_rows: args.max_rows,
        },
    );
    info!(rpc = %settings.rpc, max_rows = settings.max_rows, "starting");

    let gateway = HttpGateway::new(
        &settings.rpc,
        &settings.inscriptions_url,
        &settings.name,
        settings.request_timeout,
    )?;
    let endpoint = gateway.endpoint_name();
    let gateway: Arc<dyn Gateway> = Arc::new(gateway);
    let runtime = RuntimeBridge::new(
        gateway,
        WorkerSettings {
            poll_interval: settings.poll_interval,
            inscription_poll: settings.inscription_poll,
            backlog: settings.max_rows,
        },
    )?;

    let mut app = App::new(endpoint, settings.max_rows);
    app.set_status("Connecting…", StatusLevel::Info);

    let mut stdout = io::stdout();
    enable_raw_mode()?;
    execute!(stdout, EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app, runtime);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("{err:?}");
    }

    Ok(())
}

/// The terminal belongs to the TUI, so logs go to a file
fn init_logging(path: Option<PathBuf>) -> Result<()> {
    let Some(path) = path.or_else(config::default_log_path) else {
        return Ok(());
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    let fmt_layer = fmt::layer()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = Registry::default().with(filter).with(fmt_layer);
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install tracing subscriber")?;
    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    mut app: App,
    runtime: RuntimeBridge,
) -> Result<()> {
    let tick_rate = Duration::from_millis(200);
    let mut last_tick = Instant::now();

    loop {
        pump_background(&mut app, &runtime);
        terminal.draw(|f| ui::draw(f, &mut app))?;
        if app.should_quit {
            let _ = runtime.send(RuntimeCommand::Shutdown);
            return Ok(());
        }

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                handle_key(&mut app, key);
            }
        }

        if last_tick.elapsed() >= tick_rate {
            app.on_tick();
            last_tick = Instant::now();
        }
    }
}

fn pump_background(app: &mut App, runtime: &RuntimeBridge) {
    for event in runtime.poll_events() {
        match event {
            RuntimeEvent::Connected { endpoint, status } => app.apply_connected(endpoint, status),
            RuntimeEvent::BlocksPage {
                feed,
                ticket,
                result,
            } => app.apply_blocks_page(feed, ticket, result),
            RuntimeEvent::TxsPage {
                feed,
                ticket,
                result,
            } => app.apply_txs_page(feed, ticket, result),
            RuntimeEvent::Stream(event) => app.apply_stream(event),
            RuntimeEvent::Inscriptions(set) => app.apply_inscriptions(set),
            RuntimeEvent::RangeReady {
                slot,
                start,
                end,
                result,
            } => app.apply_range(slot, start, end, result),
            RuntimeEvent::Validators { result } => app.apply_validators(result),
            RuntimeEvent::Detail { ticket, result } => app.apply_detail(ticket, result),
            RuntimeEvent::Error { message } => app.apply_rpc_error(message),
        }
    }

    for command in app.take_commands() {
        if let Err(err) = runtime.send(command) {
            warn!("{err:#}");
            app.set_status(format!("{err:#}"), StatusLevel::Error);
            break;
        }
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    if key.kind != KeyEventKind::Press {
        return;
    }

    if app.search_input.is_some() {
        match (key.code, key.modifiers) {
            (KeyCode::Char('c'), mods) if mods.contains(KeyModifiers::CONTROL) => {
                app.should_quit = true
            }
            (KeyCode::Esc, _) => app.cancel_search(),
            (KeyCode::Enter, _) => app.submit_search(),
            (KeyCode::Backspace, _) => app.search_pop(),
            (KeyCode::Char(c), mods) if !mods.contains(KeyModifiers::CONTROL) => {
                app.search_push(c)
            }
            _ => {}
        }
        return;
    }

    match (key.code, key.modifiers) {
        (KeyCode::Char('q'), _) => app.should_quit = true,
        (KeyCode::Char('/'), _) => app.open_search(),
        (KeyCode::Esc, _) => app.close_detail(),
        (KeyCode::Char('c'), mods) if mods.contains(KeyModifiers::CONTROL) => {
            app.should_quit = true
        }
        (KeyCode::Char('r'), _) => {
            app.reload();
            app.set_status("Reloading…", StatusLevel::Info);
        }
        (KeyCode::Tab, _) => app.next_tab(),
        (KeyCode::Char('n') | KeyCode::Right | KeyCode::PageDown, _) => app.next_page(),
        (KeyCode::Char('p') | KeyCode::Left | KeyCode::PageUp, _) => app.prev_page(),
        (KeyCode::Char(c), _) => {
            if let Some(tab) = Tab::from_shortcut(c) {
                app.select_tab(tab);
            }
        }
        _ => {}
    }
}
