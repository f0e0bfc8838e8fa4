mod app;
mod engine;
mod notify;
mod price;
mod store;
mod timefmt;
mod ui;
mod wallet;

use std::io::{self, Stdout};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use app::App;
use chrono::Utc;
use crossterm::event::{self, Event as CEvent};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use crate::engine::Engine;
use crate::price::{CoinGecko, PRICE_POLL_SECS, PriceOracle};
use crate::store::Store;
use crate::ui::draw;
use crate::wallet::SimWallet;

enum Event<I> {
    Input(I),
    Tick,
    Price(Result<f64>),
}

fn main() -> Result<()> {
    env_logger::init();

    let now = Utc::now().timestamp();
    let store = Store::at_default_location();
    let engine = Engine::new(StdRng::from_entropy(), now);
    let wallet = Box::new(SimWallet::new(StdRng::from_entropy()));
    let mut app = App::new(store, engine, wallet, now);

    let mut terminal = setup_terminal()?;
    let res = run_app(&mut terminal, &mut app);
    restore_terminal(&mut terminal)?;
    app.shutdown();
    res
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    let (tx, rx) = mpsc::channel();
    // The reconciler runs at 1 Hz; everything else is event-driven.
    let tick_rate = Duration::from_secs(1);

    let input_tx = tx.clone();
    thread::spawn(move || {
        loop {
            if !event::poll(Duration::from_millis(250)).unwrap_or(false) {
                continue;
            }
            match event::read() {
                Ok(CEvent::Key(key)) => {
                    if input_tx.send(Event::Input(key)).is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(_) => {}
            }
        }
    });

    let price_tx = tx.clone();
    thread::spawn(move || {
        let oracle = match CoinGecko::new() {
            Ok(oracle) => oracle,
            Err(err) => {
                let _ = price_tx.send(Event::Price(Err(err)));
                return;
            }
        };
        loop {
            if price_tx
                .send(Event::Price(oracle.fetch_usd_price()))
                .is_err()
            {
                break;
            }
            thread::sleep(Duration::from_secs(PRICE_POLL_SECS));
        }
    });

    thread::spawn(move || {
        loop {
            if tx.send(Event::Tick).is_err() {
                break;
            }
            thread::sleep(tick_rate);
        }
    });

    loop {
        terminal.draw(|f| draw(f, app))?;

        match rx.recv()? {
            Event::Input(key) => {
                app.on_key(key, Utc::now().timestamp());
            }
            Event::Tick => {
                app.on_tick(Utc::now().timestamp());
            }
            Event::Price(result) => {
                app.on_price(result);
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
