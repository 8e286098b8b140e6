mod hotkeys;

use ai_glance_core::{
    AiGlance, AiMode, CaptureRegion, HotkeyEvent, OverlayState, ScreenCapturer, config::Config,
    init, ui,
};
use anyhow::{Context, Result};
use clap::Parser;
use hotkeys::HotkeyMatcher;
use std::sync::Arc;
use std::thread;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Override the model defined in .env
    #[arg(short, long)]
    model: Option<String>,

    /// Analysis mode: `vision` sends the image, `text` sends OCR text
    #[arg(long)]
    mode: Option<AiMode>,

    /// Select which monitor to capture
    #[arg(long)]
    monitor: Option<usize>,

    /// Capture only this region, as x,y,width,height
    #[arg(long)]
    region: Option<CaptureRegion>,

    /// List available monitors and exit
    #[arg(long)]
    list_monitors: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    init();
    let args = Args::parse();

    // Handle --list-monitors before anything that needs an API key
    if args.list_monitors {
        let capturer = ScreenCapturer::new(0).context("Failed to initialize screen capturer")?;
        println!("Available monitors:");
        for info in capturer.list_screen() {
            println!("{}", info);
        }
        return Ok(());
    }

    // Load config and apply CLI overrides
    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(model) = args.model {
        config.model_name = model;
    }
    if let Some(mode) = args.mode {
        config.mode = mode;
    }
    if let Some(monitor) = args.monitor {
        config.monitor = monitor;
    }
    if args.region.is_some() {
        config.capture_region = args.region;
    }

    let matcher =
        HotkeyMatcher::from_bindings(&config.hotkeys).context("Invalid hotkey configuration")?;
    let hint = matcher.cheat_sheet();
    let greeting = match matcher.combo_for(HotkeyEvent::ScanRequested) {
        Some(combo) => format!("Ready. Press **{}** to ask about the screen.", combo),
        None => "Ready.".to_string(),
    };
    log::info!("hotkeys: {}", hint);

    let app = AiGlance::with_config(config).context(
        "Failed to initialize screen capturer. Try using --list-monitors to check indices",
    )?;
    log::info!(
        "capturing monitor {} of {}",
        app.config().monitor,
        app.list_monitors().len()
    );
    let (overlay, visual_rx) = OverlayState::new(greeting);
    let repaint = overlay.repaint_signal();
    let (selector, selection_rx) = ui::selection_channel();
    let (mut orchestrator, handle) = app
        .into_pipeline(overlay, Arc::new(selector))
        .context("Failed to set up the AI client")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to create async runtime")?;

    // Dropping the orchestrator at the end of this thread closes the window
    let pipeline = thread::Builder::new()
        .name("pipeline".to_string())
        .spawn(move || runtime.block_on(orchestrator.run()))
        .context("Failed to start pipeline thread")?;

    hotkeys::spawn_listener(matcher, handle.clone())?;

    // The window owns the main thread until the pipeline stops
    let ui_result = ui::run_overlay(visual_rx, repaint, selection_rx, hint);

    handle.on_hotkey(HotkeyEvent::QuitRequested);
    if pipeline.join().is_err() {
        log::error!("pipeline thread panicked");
    }

    ui_result.context("Overlay window failed")?;
    Ok(())
}
