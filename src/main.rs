//! Application entry point: Ingredient Scanner.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run).
//! 3. Create [`tokio`] runtime (multi-thread, 2 workers).
//! 4. Build the recognizer and recipe assistant from config.
//! 5. Pick the camera backend (falls back to an unavailable stub).
//! 6. Spawn the scan session on the tokio runtime.
//! 7. Run [`eframe::run_native`], which blocks the main thread until the
//!    window is closed.

use std::sync::Arc;
use std::time::Duration;

use eframe::egui;
use tokio::sync::mpsc;

use ingredient_scanner::{
    app::ScannerApp,
    camera::CameraBackend,
    config::AppConfig,
    recipes::{ApiRecipeAssistant, RecipeAssistant},
    recognition::{ApiRecognizer, IngredientRecognizer},
    session::{new_shared_session, ScanSession, SessionCommand, SessionEvent},
};

// ---------------------------------------------------------------------------
// Camera backend selection
// ---------------------------------------------------------------------------

#[cfg(feature = "webcam")]
fn camera_backend(config: &AppConfig) -> Arc<dyn CameraBackend> {
    log::info!("camera: using device {}", config.camera.device_index);
    Arc::new(ingredient_scanner::camera::NokhwaBackend::new(
        config.camera.device_index,
    ))
}

#[cfg(not(feature = "webcam"))]
fn camera_backend(_config: &AppConfig) -> Arc<dyn CameraBackend> {
    log::warn!("camera: built without the `webcam` feature; manual entry only");
    Arc::new(ingredient_scanner::camera::UnavailableBackend::new(
        "built without webcam support",
    ))
}

// ---------------------------------------------------------------------------
// Native options builder
// ---------------------------------------------------------------------------

fn native_options(config: &AppConfig) -> eframe::NativeOptions {
    let (width, height) = config.ui.window_size;
    let mut vp = egui::ViewportBuilder::default()
        .with_title("Ingredient Scanner")
        .with_inner_size([width, height])
        .with_min_inner_size([320.0, 240.0]);

    if config.ui.always_on_top {
        vp = vp.with_always_on_top();
    }

    eframe::NativeOptions {
        viewport: vp,
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> eframe::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Ingredient Scanner starting up");

    // 2. Configuration
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });

    // 3. Tokio runtime (recognition and recipe requests share it)
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("failed to create tokio runtime");

    // 4. Remote capabilities
    let recognizer: Arc<dyn IngredientRecognizer> =
        Arc::new(ApiRecognizer::from_config(&config.recognition));
    let assistant: Arc<dyn RecipeAssistant> =
        Arc::new(ApiRecipeAssistant::from_config(&config.recipes));

    // 5. Camera
    let camera = camera_backend(&config);

    // 6. Scan session
    let shared = new_shared_session();
    let (command_tx, command_rx) = mpsc::channel::<SessionCommand>(16);
    let (event_tx, event_rx) = mpsc::unbounded_channel::<SessionEvent>();

    let session = ScanSession::new(
        &config,
        camera,
        recognizer,
        Arc::clone(&shared),
        event_tx,
    );
    let session_task = rt.spawn(session.run(command_rx));

    if config.camera.activate_on_start {
        let _ = command_tx.try_send(SessionCommand::ActivateCamera);
    }

    // 7. Build the egui app and run it (blocks until the window is closed)
    let app = ScannerApp::new(
        shared,
        command_tx.clone(),
        event_rx,
        assistant,
        rt.handle().clone(),
    );
    let options = native_options(&config);

    let result = eframe::run_native(
        "Ingredient Scanner",
        options,
        Box::new(move |_cc| Ok(Box::new(app))),
    );

    // The app sends Shutdown from on_exit; wait for the camera to be released.
    let _ = command_tx.try_send(SessionCommand::Shutdown);
    drop(command_tx);
    if let Err(e) = rt.block_on(session_task) {
        log::warn!("session task ended abnormally: {e}");
    }
    // A camera open stuck on a permission prompt must not keep the process alive.
    rt.shutdown_timeout(Duration::from_secs(2));

    result
}
