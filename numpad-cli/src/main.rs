mod halfkay;
mod hex;
mod layout;
mod simulate;

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use numpad_core::matrix::validate_wiring;
use numpad_core::WIRING;

#[derive(Parser)]
#[command(name = "numpad-cli")]
#[command(about = "Macro numpad flasher and host-side tools")]
struct Cli {
    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Flash a .hex firmware file via the HalfKay bootloader
    Flash {
        /// Path to the Intel HEX firmware file
        firmware: PathBuf,
    },
    /// Detect if a board is connected in bootloader mode
    Detect,
    /// Render the key layout and bound actions as HTML
    Layout {
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate the wiring table and print the scan grid
    Check,
    /// Replay a key script through the scan and dispatch pipeline
    Simulate {
        /// Script file (press N, release N, tap N, tick, fail-after N, heal)
        script: PathBuf,
        /// Print key-state lines instead of firing actions
        #[arg(long)]
        matrix_test: bool,
    },
}

fn flash(firmware: &Path) -> Result<()> {
    let contents = fs::read_to_string(firmware)
        .with_context(|| format!("reading {}", firmware.display()))?;
    let image = hex::Image::from_hex(&contents).context("parsing Intel HEX file")?;
    println!(
        "Firmware: {} bytes at base address 0x{:04X}",
        image.data.len(),
        image.base
    );

    if !halfkay::detect()? {
        if !halfkay::reboot_keypad()? {
            eprintln!("Bootloader not detected and keypad not found.");
            eprintln!("Press the reset button and try again.");
            std::process::exit(1);
        }
        info!("Rebooting keypad into bootloader...");
        if !halfkay::wait_for_bootloader(Duration::from_secs(5))? {
            eprintln!("Bootloader not detected after reboot.");
            eprintln!("Press the reset button and try again.");
            std::process::exit(1);
        }
    }

    halfkay::Bootloader::open()?.flash(&image)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();

    match cli.command {
        Command::Flash { firmware } => flash(&firmware)?,
        Command::Detect => {
            if halfkay::detect()? {
                println!("Bootloader detected (HalfKay mode).");
            } else {
                println!("Bootloader not detected.");
                println!("Press the reset button to enter bootloader mode.");
            }
        }
        Command::Layout { output } => {
            let html = layout::generate_html();
            match output {
                Some(path) => {
                    fs::write(&path, html)
                        .with_context(|| format!("writing {}", path.display()))?;
                    info!("Wrote {}", path.display());
                }
                None => print!("{}", html),
            }
        }
        Command::Check => {
            validate_wiring(&WIRING).map_err(|e| anyhow::anyhow!("wiring table: {}", e))?;
            print!("{}", layout::scan_grid());
            println!("Wiring OK: {} keys", WIRING.len());
        }
        Command::Simulate {
            script,
            matrix_test,
        } => {
            let input = fs::read_to_string(&script)
                .with_context(|| format!("reading {}", script.display()))?;
            let steps = simulate::parse(&input)
                .with_context(|| format!("parsing {}", script.display()))?;
            let stdout = io::stdout();
            let mut out = stdout.lock();
            simulate::run(&steps, matrix_test, &mut out)?;
            out.flush()?;
        }
    }

    Ok(())
}
