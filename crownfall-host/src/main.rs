//! Standalone console host.
//!
//! One authority thread owns the engine and drains a task channel; a
//! timer thread feeds it capture, upkeep, cleanup, and autosave ticks;
//! the main thread parses stdin lines into commands. Player positions
//! are whatever the last command line said they were, which is enough
//! to exercise wars interactively.

use std::collections::{HashMap, HashSet};
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{bail, Context, Result};
use clap::Parser;
use crownfall_core::{
    ActionError, CurrencyLedger, Engine, EngineConfig, EngineTask, MemoryLedger, Notifier,
    Occupant, PlayerId, Region, Reply, UnixMillis, UpkeepPolicy,
};

mod commands;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the save file
    #[arg(long, default_value = "crownfall.json")]
    save_path: PathBuf,

    /// Seconds between autosaves
    #[arg(long, default_value_t = 300)]
    autosave_secs: u64,

    /// Balance granted to a player on their first command, in bronze
    #[arg(long, default_value_t = 100_000)]
    starting_balance: i64,

    /// Response to unpaid upkeep (falling, shrink)
    #[arg(long, default_value = "falling")]
    upkeep_policy: String,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Prints everything to the console.
struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&mut self, player: &PlayerId, message: &str) {
        println!("[to {}] {}", player, message);
    }

    fn broadcast(&mut self, message: &str) {
        println!("[realm] {}", message);
    }
}

fn now_ms() -> UnixMillis {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = std::str::FromStr::from_str(&args.log_level).unwrap_or(log::LevelFilter::Info);
    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .init();

    let upkeep_policy = match args.upkeep_policy.as_str() {
        "falling" => UpkeepPolicy::Falling,
        "shrink" => UpkeepPolicy::Shrink,
        other => bail!("unknown upkeep policy '{}'", other),
    };
    let config = EngineConfig {
        upkeep_policy,
        ..Default::default()
    };

    let engine = if args.save_path.exists() {
        let (registry, wars) = crownfall_core::load_from_path(&args.save_path)
            .with_context(|| format!("loading {}", args.save_path.display()))?;
        log::info!(
            "Loaded {} kingdoms, {} wars from {}",
            registry.kingdoms.len(),
            wars.wars.len(),
            args.save_path.display()
        );
        Engine::from_parts(registry, wars, config)
    } else {
        log::info!("No save at {}, starting fresh", args.save_path.display());
        Engine::new(config)
    };

    let (tx, rx) = mpsc::channel::<EngineTask>();
    let positions: Arc<Mutex<HashMap<PlayerId, Region>>> = Arc::new(Mutex::new(HashMap::new()));

    let authority = spawn_authority(engine, rx, args.save_path.clone(), args.starting_balance);
    spawn_timers(tx.clone(), Arc::clone(&positions), args.autosave_secs, args.save_path.clone());

    println!("crownfall ready. Lines are '<player> <x> <z> <command> ...'; 'help' lists commands; 'quit' exits.");
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line.context("reading stdin")?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match trimmed {
            "quit" | "exit" => break,
            "help" => {
                print_help();
                continue;
            }
            _ => {}
        }

        let parsed = match commands::parse_line(trimmed) {
            Ok(parsed) => parsed,
            Err(err) => {
                println!("! {}", err);
                continue;
            }
        };
        if let Ok(mut map) = positions.lock() {
            map.insert(parsed.actor.clone(), parsed.at);
        }

        let (reply_tx, reply_rx) = mpsc::channel();
        let task = EngineTask::Apply {
            actor: parsed.actor,
            at: parsed.at,
            command: parsed.command,
            now: now_ms(),
            reply: reply_tx,
        };
        if tx.send(task).is_err() {
            bail!("engine thread is gone");
        }
        match reply_rx.recv() {
            Ok(Ok(reply)) => print_reply(reply),
            Ok(Err(err)) => print_error(err),
            Err(_) => bail!("engine thread is gone"),
        }
    }

    let _ = tx.send(EngineTask::Shutdown);
    if authority.join().is_err() {
        bail!("engine thread panicked");
    }
    Ok(())
}

fn spawn_authority(
    mut engine: Engine,
    rx: mpsc::Receiver<EngineTask>,
    save_path: PathBuf,
    starting_balance: i64,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut ledger = MemoryLedger::new();
        let mut notifier = ConsoleNotifier;
        let mut seen: HashSet<PlayerId> = HashSet::new();

        while let Ok(task) = rx.recv() {
            if let EngineTask::Apply { actor, .. } = &task {
                if seen.insert(actor.clone()) {
                    ledger.deposit(actor, starting_balance);
                    log::debug!("granted {} starting coins to {}", starting_balance, actor);
                }
            }
            if !engine.run_task(task, &mut ledger, &mut notifier) {
                break;
            }
        }

        if let Err(err) = crownfall_core::save_to_path(&save_path, &engine.registry, &engine.wars) {
            log::error!("final save failed: {}", err);
        } else {
            log::info!("state saved to {}", save_path.display());
        }
    })
}

fn spawn_timers(
    tx: mpsc::Sender<EngineTask>,
    positions: Arc<Mutex<HashMap<PlayerId, Region>>>,
    autosave_secs: u64,
    save_path: PathBuf,
) {
    thread::spawn(move || {
        let mut tick: u64 = 0;
        loop {
            thread::sleep(Duration::from_secs(1));
            tick += 1;
            let now = now_ms();

            let occupants: Vec<Occupant> = match positions.lock() {
                Ok(map) => map
                    .iter()
                    .map(|(player, &region)| Occupant {
                        player: player.clone(),
                        region,
                    })
                    .collect(),
                Err(_) => return,
            };
            if tx.send(EngineTask::CaptureTick { occupants, now }).is_err() {
                return;
            }
            if tick % 30 == 0 && tx.send(EngineTask::CleanupTick { now }).is_err() {
                return;
            }
            if tick % 60 == 0 && tx.send(EngineTask::UpkeepTick { now }).is_err() {
                return;
            }
            if autosave_secs > 0
                && tick % autosave_secs == 0
                && tx
                    .send(EngineTask::Save {
                        path: save_path.clone(),
                    })
                    .is_err()
            {
                return;
            }
        }
    });
}

fn print_reply(reply: Reply) {
    match reply {
        Reply::Done => println!("ok"),
        Reply::Message(text) => println!("{}", text),
        Reply::Lines(lines) => {
            for line in lines {
                println!("{}", line);
            }
        }
    }
}

fn print_error(err: ActionError) {
    match err {
        ActionError::InsufficientFunds {
            required,
            available,
        } => println!(
            "! you need {} but only have {}",
            commands::format_coins(required),
            commands::format_coins(available)
        ),
        ActionError::InsufficientTreasury {
            required,
            available,
        } => println!(
            "! the treasury needs {} but holds {}",
            commands::format_coins(required),
            commands::format_coins(available)
        ),
        other => println!("! {}", other),
    }
}

fn print_help() {
    for line in [
        "create <name> | delete | confirm-delete",
        "claim | unclaim | sethome",
        "invite <player> | accept | decline | leave | kick <player>",
        "rank <player> <rank> | transfer <player>",
        "deposit <amount> | withdraw <amount>",
        "pclaim | punclaim | ptransfer <player>",
        "set <key> <on|off>",
        "ally <kingdom> | unally <kingdom> | enemy <kingdom> | unenemy <kingdom>",
        "war <kingdom> | endwar <id> | surrender <id> | claimfallen <id> | reclaim",
        "info [kingdom] | here | wars",
    ] {
        println!("  {}", line);
    }
}
