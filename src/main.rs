use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use crossterm::terminal;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use trax::audio;
use trax::audio_api::AudioGraph;
use trax::config::Features;
use trax::loader::{Catalog, DirAssets, SampleLoader};
use trax::middle::Middle;
use trax::pipeline::Session;
use trax::pipeline::persistence::{self, HostMessage};
use trax::shared::InputEvent;
use trax::tui;

fn main() {
    // stderr shares the terminal with the tui, so logging stays off unless asked for
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("off")).init();

    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

// trax [project_dir] [trax_string] [--config download;lowpass;volume]
struct Args {
    project_dir: PathBuf,
    trax: Option<String>,
    config: Option<String>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Args {
    let mut positional = Vec::new();
    let mut config = None;
    while let Some(arg) = args.next() {
        if arg == "--config" {
            config = args.next();
        } else if let Some(opts) = arg.strip_prefix("--config=") {
            config = Some(opts.to_string());
        } else {
            positional.push(arg);
        }
    }
    let mut positional = positional.into_iter();
    Args {
        project_dir: positional
            .next()
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_default()),
        trax: positional.next(),
        config,
    }
}

fn run() -> anyhow::Result<()> {
    let args = parse_args(std::env::args().skip(1));
    let project_dir = args.project_dir;

    let mut config = persistence::load_config(&project_dir).unwrap_or_default();
    if let Some(opts) = &args.config {
        config.features = config.features.merge(Features::parse(opts));
    }

    let catalog = match Catalog::load(&config.catalog_path(&project_dir)) {
        Ok(c) => c,
        Err(e) => {
            log::warn!("starting with an empty catalog: {e:#}");
            Catalog::default()
        }
    };
    let assets = DirAssets::new(config.samples_path(&project_dir));
    let session = Session::new(config.grid, catalog, SampleLoader::new(Arc::new(assets)));
    let mut middle = Middle::new(
        session,
        &config,
        project_dir.clone(),
        Box::new(|| -> anyhow::Result<Box<dyn AudioGraph>> { Ok(Box::new(audio::start_audio()?)) }),
    );

    // a string on the command line wins over the saved song
    let initial = args
        .trax
        .map(|string| HostMessage::LoadTraxString { string })
        .or_else(|| persistence::load_song(&project_dir));
    if let Some(msg) = initial {
        middle.handle_host_message(msg);
    }

    terminal::enable_raw_mode()?;
    // Enable keyboard enhancement for real press/release detection.
    // Falls back gracefully if the terminal doesn't support it.
    let _ = crossterm::execute!(
        std::io::stdout(),
        crossterm::event::PushKeyboardEnhancementFlags(
            crossterm::event::KeyboardEnhancementFlags::REPORT_EVENT_TYPES
        )
    );
    let _guard = RawModeGuard; // auto drops when out of scope

    let backend = CrosstermBackend::new(std::io::stdout());
    let mut term = Terminal::new(backend)?;
    term.clear()?;

    let tick_rate = std::time::Duration::from_millis(16); // ~60fps
    let blink_start = Instant::now();
    let mut tui_state = tui::mode::TuiState::default();

    loop {
        let blink_on = (blink_start.elapsed().as_millis() / 250) % 2 == 0;
        let cols = tui::grid::visible_cols(term.size()?.width);

        // playhead loop runs once per frame
        middle.tick(cols);
        let ds = middle.display_state(cols);
        tui_state.playing = ds.playing;

        term.draw(|frame| {
            tui::view::render(frame, frame.area(), &ds, tui_state.collection_mode, blink_on);
        })?;

        let events = tui::input::poll_input(tick_rate, &mut tui_state)?;
        for event in events {
            if event == InputEvent::Quit {
                // save before quitting
                middle.finish_export();
                if let Err(e) = middle.save() {
                    log::error!("save on quit failed: {e:#}");
                }
                drop(term);
                return Ok(());
            }
            middle.handle_input(event);
        }
    }
}

struct RawModeGuard;
impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = crossterm::execute!(
            std::io::stdout(),
            crossterm::event::PopKeyboardEnhancementFlags
        );
        let _ = terminal::disable_raw_mode();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(s: &[&str]) -> Args {
        parse_args(s.iter().map(|a| a.to_string()))
    }

    #[test]
    fn positional_and_config_args() {
        let a = args(&["proj", "1:7,2", "--config", "download;volume"]);
        assert_eq!(a.project_dir, PathBuf::from("proj"));
        assert_eq!(a.trax.as_deref(), Some("1:7,2"));
        assert_eq!(a.config.as_deref(), Some("download;volume"));

        let a = args(&["--config=lowpass", "proj"]);
        assert_eq!(a.project_dir, PathBuf::from("proj"));
        assert!(a.trax.is_none());
        assert_eq!(a.config.as_deref(), Some("lowpass"));
    }
}
