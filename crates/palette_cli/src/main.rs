//! Terminal stand-in for the color list screen.
//!
//! # Responsibility
//! - Wire a store, a `ContentViewModel` and a text renderer together.
//! - Re-render from fresh view-model state whenever the change event fired.
//!
//! Without `DB_PATH` the store is in memory. `PALETTE_LOG_DIR` (absolute)
//! enables file logging at `PALETTE_LOG_LEVEL` or the build default.

use clap::Parser;
use palette_core::{
    core_version, default_log_level, init_logging, ContentViewModel, Rgb, Store, StoreError,
    StoreOptions,
};
use std::cell::Cell;
use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;

/// Adds random colors to a palette store and prints the list after each change.
#[derive(Parser, Debug)]
#[command(name = "palette_cli")]
#[command(version, long_about = None)]
struct Cli {
    /// SQLite file to open; in memory when omitted
    db_path: Option<PathBuf>,

    /// Number of random colors to add
    #[arg(default_value_t = 3)]
    count: usize,

    /// Absolute directory for rolling log files
    #[arg(long = "log-dir", env = "PALETTE_LOG_DIR")]
    log_dir: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long = "log-level", env = "PALETTE_LOG_LEVEL")]
    log_level: Option<String>,
}

impl Cli {
    fn store_options(&self) -> StoreOptions {
        match &self.db_path {
            Some(path) => StoreOptions::file(path),
            None => StoreOptions::in_memory(),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(log_dir) = &cli.log_dir {
        let level = cli.log_level.as_deref().unwrap_or(default_log_level());
        if let Err(err) = init_logging(level, log_dir) {
            eprintln!("logging disabled: {err}");
        }
    }

    match run(&cli.store_options(), cli.count) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("palette_cli failed: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(options: &StoreOptions, count: usize) -> Result<(), StoreError> {
    println!("palette_core version={}", core_version());

    let store = Store::open(options)?;
    let mut view_model = ContentViewModel::new(&store)?;

    let needs_render = Rc::new(Cell::new(true));
    let flag = Rc::clone(&needs_render);
    let _render_subscription = view_model.on_object_will_change(move || flag.set(true));

    render_if_needed(&view_model, &needs_render);
    for _ in 0..count {
        view_model.add_random_color()?;
        render_if_needed(&view_model, &needs_render);
    }

    if let Some(first) = view_model.colors().first().copied() {
        view_model.set_selected_color_item(Some(first));
        render_if_needed(&view_model, &needs_render);
        view_model.randomise_selected()?;
        render_if_needed(&view_model, &needs_render);
    }

    Ok(())
}

fn render_if_needed(view_model: &ContentViewModel, needs_render: &Cell<bool>) {
    if !needs_render.replace(false) {
        return;
    }

    let store = view_model.store();
    let selected = view_model.selected_color_item();
    println!("Colors");
    for item in view_model.colors().iter() {
        let hex = match store.hex(item) {
            Ok(Some(hex)) => hex,
            Ok(None) => "<unset>".to_string(),
            Err(err) => format!("<{err}>"),
        };
        let swatch = match Rgb::from_hex(&hex) {
            Ok(rgb) => format!("rgb({:>3}, {:>3}, {:>3})", rgb.red, rgb.green, rgb.blue),
            Err(err) => format!("unparsable: {err}"),
        };
        let marker = if selected == Some(*item) { '>' } else { ' ' };
        println!("{marker} {hex}  {swatch}");
    }
    if let Some(item) = selected {
        match store.hex(&item) {
            Ok(Some(hex)) => println!("selected: {hex}"),
            Ok(None) => println!("selected: <unset>"),
            Err(err) => println!("selected: <{err}>"),
        }
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::Cli;
    use clap::{CommandFactory, Parser};
    use palette_core::StoreLocation;
    use std::path::PathBuf;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_arguments_means_in_memory_with_three_colors() {
        let cli = Cli::try_parse_from(["palette_cli"]).unwrap();

        assert_eq!(cli.count, 3);
        assert_eq!(cli.store_options().location, StoreLocation::InMemory);
    }

    #[test]
    fn path_and_count_are_positional() {
        let cli = Cli::try_parse_from(["palette_cli", "/tmp/colors.db", "7"]).unwrap();

        assert_eq!(cli.count, 7);
        assert_eq!(
            cli.store_options().location,
            StoreLocation::File(PathBuf::from("/tmp/colors.db"))
        );
    }

    #[test]
    fn non_numeric_count_is_rejected() {
        assert!(Cli::try_parse_from(["palette_cli", "/tmp/colors.db", "many"]).is_err());
    }

    #[test]
    fn log_options_accept_flags() {
        let cli = Cli::try_parse_from([
            "palette_cli",
            "--log-dir",
            "/tmp/palette-logs",
            "--log-level",
            "warn",
        ])
        .unwrap();

        assert_eq!(cli.log_dir.as_deref(), Some("/tmp/palette-logs"));
        assert_eq!(cli.log_level.as_deref(), Some("warn"));
    }
}
