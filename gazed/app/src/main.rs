use anyhow::Result;
use api::{LandmarkModule, LandmarkUpdate, LogLevel, ModuleLogger, PerformanceProfile};
use common::gesture_store::GestureProfileStore;
use common::{CalibrationPhase, ControllerConfig};
use gazed::control::{self, ControlCommand, ControlStatus};
use gazed::dispatcher::Dispatcher;
use gazed::pipeline::ControlPipeline;
use gazed::sinks;
use libloading::{Library, Symbol};
use log::{debug, error, info, trace, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::sync_channel;
use std::sync::{Arc, RwLock};
use std::thread;
use std::time::{Duration, Instant};

fn load_config(path: &Path) -> Result<ControllerConfig> {
    if path.exists() {
        info!("Loading config from {:?}", path);
        let file = fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        let config = serde_json::from_reader(reader)?;
        Ok(config)
    } else {
        info!("Config not found. Creating default at {:?}", path);
        let config = ControllerConfig::default();
        let file = fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, &config)?;
        Ok(config)
    }
}

extern "C" fn module_log_callback(level: LogLevel, target: *const i8, message: *const i8) {
    unsafe {
        let target_str = std::ffi::CStr::from_ptr(target)
            .to_str()
            .unwrap_or("unknown");
        let message_str = std::ffi::CStr::from_ptr(message).to_str().unwrap_or("");

        match level {
            LogLevel::Error => error!(target: target_str, "{}", message_str),
            LogLevel::Warn => warn!(target: target_str, "{}", message_str),
            LogLevel::Info => info!(target: target_str, "{}", message_str),
            LogLevel::Debug => debug!(target: target_str, "{}", message_str),
            LogLevel::Trace => trace!(target: target_str, "{}", message_str),
        }
    }
}

struct LoadedModule {
    name: String,
    module: Box<dyn LandmarkModule>,
}

fn discover_modules() -> Result<Vec<LoadedModule>> {
    let mut modules = Vec::new();

    let mut native_dir = Path::new("plugins/native").to_path_buf();
    if !native_dir.exists() {
        let parent_native = Path::new("../plugins/native");
        if parent_native.exists() {
            native_dir = parent_native.to_path_buf();
        }
    }

    if !native_dir.exists() {
        warn!("'plugins/native' directory not found. Creating it.");
        fs::create_dir_all(native_dir)?;
        return Ok(modules);
    }

    for entry in fs::read_dir(&native_dir)? {
        let entry = entry?;
        let path = entry.path();
        if path
            .extension()
            .is_some_and(|ext| ext == "dll" || ext == "so" || ext == "dylib")
        {
            let filename = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("unknown")
                .to_string();

            info!("Loading module: {:?}", path);

            match (|| -> Result<Box<dyn LandmarkModule>> {
                unsafe {
                    let lib = Library::new(&path)?;
                    let func: Symbol<unsafe extern "C" fn() -> *mut dyn LandmarkModule> =
                        lib.get(b"create_module")?;
                    let module = Box::from_raw(func());
                    std::mem::forget(lib);
                    Ok(module)
                }
            })() {
                Ok(module) => {
                    info!("✓ Successfully loaded module: {}", filename);
                    modules.push(LoadedModule {
                        name: filename,
                        module,
                    });
                }
                Err(e) => {
                    error!("✗ Failed to load module {:?}: {}", path, e);
                }
            }
        }
    }

    Ok(modules)
}

fn main() -> Result<()> {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    info!("Starting gazed...");
    debug!("Debug logging is active");
    trace!("Trace logging is active");

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    ctrlc::set_handler(move || {
        info!("Received Ctrl-C, shutting down...");
        r.store(false, Ordering::SeqCst);
    })
    .expect("Error setting Ctrl-C handler");

    let config_path = Path::new("config.json");
    let config = load_config(config_path).unwrap_or_else(|e| {
        error!("Failed to load config: {}. Using defaults.", e);
        ControllerConfig::default()
    });
    info!("Loaded Config: {:?}", config);

    let mut modules = discover_modules()?;
    if modules.is_empty() {
        warn!("No landmark modules loaded!");
    } else {
        info!("Loaded {} module(s) successfully", modules.len());
    }

    info!("Initializing Modules...");
    for module_wrapper in &mut modules {
        let logger_name = format!("gazed::plugins::{}", module_wrapper.name);
        let logger = ModuleLogger::new(module_log_callback, logger_name);

        match module_wrapper.module.initialize(logger) {
            Ok(_) => {
                info!("✓ Initialized module: {}", module_wrapper.name);
            }
            Err(e) => {
                error!(
                    "✗ Failed to initialize module {}: {}",
                    module_wrapper.name, e
                );
            }
        }
    }

    let status = Arc::new(RwLock::new(ControlStatus::default()));
    let status_for_host = status.clone();
    let status_for_consumer = status.clone();

    let command = Arc::new(RwLock::new(None::<ControlCommand>));
    let command_for_host = command.clone();
    let command_for_consumer = command.clone();

    let shared_profile = Arc::new(RwLock::new(PerformanceProfile::for_tier(
        config.governor.tier,
    )));
    let profile_for_producer = shared_profile.clone();
    let profile_for_consumer = shared_profile.clone();

    let control_port = config.control_port;
    thread::spawn(move || {
        let rt = tokio::runtime::Runtime::new().expect("Failed to create Tokio runtime");
        rt.block_on(async {
            let router = control::get_router(status_for_host, command_for_host);
            let addr = ("127.0.0.1", control_port);
            match tokio::net::TcpListener::bind(addr).await {
                Ok(listener) => {
                    info!("Control surface listening on 127.0.0.1:{}", control_port);
                    if let Err(e) = axum::serve(listener, router).await {
                        error!("Control surface failed: {}", e);
                    }
                }
                Err(e) => error!("Failed to bind control port {}: {}", control_port, e),
            }
        });
    });

    let storage_dir = PathBuf::from(".");
    let gesture_store = GestureProfileStore::new(storage_dir.clone());
    let profiles = gesture_store.load_all().unwrap_or_else(|e| {
        error!("Failed to load gesture profiles: {}. Starting empty.", e);
        Vec::new()
    });
    if profiles.is_empty() {
        warn!("No gesture profiles loaded; gesture control is idle until trained.");
    }

    let mut pipeline = ControlPipeline::new(config.clone(), profiles, storage_dir);
    if let Err(e) = pipeline.calibration.load() {
        error!("Failed to load calibration: {}", e);
    }

    let mut transport = Dispatcher::new(sinks::create_sink(&config.output));
    if let Err(e) = transport.initialize() {
        error!("Failed to initialize action sink: {}", e);
        return Err(e);
    }
    info!("Action sink initialized with {:?} mode.", config.output.mode);

    // One shared monotonic timebase for frame stamps and fusion.
    let epoch = Instant::now();

    let (tx, rx) = sync_channel::<LandmarkUpdate>(1);

    let running_consumer = running.clone();

    let consumer = thread::spawn(move || {
        info!("Consumer Thread Started");

        let transport = transport;
        let mut last_published = pipeline.profile();

        while running_consumer.load(Ordering::SeqCst) {
            // Latest-wins: a missed interval still runs a cycle so the
            // estimator can count toward tracking loss.
            let update = rx
                .recv_timeout(Duration::from_millis(100))
                .unwrap_or_default();

            if let Ok(mut cmd) = command_for_consumer.write() {
                match cmd.take() {
                    Some(ControlCommand::StartCalibration) => {
                        info!("Starting calibration from HTTP request");
                        if let Err(e) = pipeline.start_calibration() {
                            warn!("Could not start calibration: {}", e);
                        }
                    }
                    Some(ControlCommand::CancelCalibration) => pipeline.cancel_calibration(),
                    None => {}
                }
            }

            let now = epoch.elapsed();
            let action = pipeline.run_cycle(update, now);

            #[cfg(feature = "xtralog")]
            if action.is_none() {
                trace!("Idle cycle, gaze at {:?}", pipeline.gaze_state().position);
            }

            if let Some(event) = action {
                debug!("Action: {:?} via {:?}", event.kind, event.trigger);
                if let Err(e) = transport.send(&event) {
                    error!("Failed to send action: {}", e);
                }
            }

            let profile = pipeline.profile();
            if profile != last_published {
                if let Ok(mut shared) = profile_for_consumer.write() {
                    *shared = profile;
                }
                last_published = profile;
            }

            if let Ok(mut st) = status_for_consumer.write() {
                let phase = pipeline.calibration.phase();
                st.gaze = *pipeline.gaze_state();
                st.tier = format!("{:?}", profile.tier);
                st.fps = pipeline.achieved_fps();
                st.calibrating = matches!(
                    phase,
                    CalibrationPhase::Collecting { .. } | CalibrationPhase::Fitting
                );
                st.calibration_phase = format!("{:?}", phase);
                st.calibration_progress = pipeline.calibration.progress();
                st.calibration_target =
                    pipeline.calibration.current_target().map(|t| [t.x, t.y]);
                st.calibration_residual = pipeline.calibration.model().map(|m| m.residual);
            }
        }

        info!("Consumer Thread draining");
    });

    info!("Entering Main Loop (Producer)...");

    let active_module = config.module.active.clone();
    let mut frame_count: u64 = 0;
    let mut log_interval: u64 = 1000;
    let mut last_log = Instant::now();
    let mut last_frame_time = Instant::now();
    let mut decimation_index: u64 = 0;
    let mut module_profile = PerformanceProfile::for_tier(config.governor.tier);
    let target_frame_duration = config.max_fps.map(|fps| Duration::from_secs_f32(1.0 / fps));

    let mut update = LandmarkUpdate::default();

    while running.load(Ordering::SeqCst) {
        let profile = profile_for_producer
            .read()
            .map(|p| *p)
            .unwrap_or(module_profile);
        if profile != module_profile {
            for module_wrapper in &mut modules {
                module_wrapper.module.apply_profile(&profile);
            }
            module_profile = profile;
        }

        // Detection decimation: skip full detections between frames on
        // constrained tiers.
        decimation_index += 1;
        let skip = profile.detection_decimation > 1
            && !decimation_index.is_multiple_of(profile.detection_decimation as u64);

        let mut any_updated = false;
        let mut active_module_found = false;

        if !skip {
            for module_wrapper in &mut modules {
                if module_wrapper.name == active_module {
                    active_module_found = true;
                    update.clear();
                    if module_wrapper
                        .module
                        .update(&mut update, epoch.elapsed())
                        .is_ok()
                    {
                        any_updated = true;
                    }
                }
            }

            if !active_module_found && !modules.is_empty() {
                use std::cell::Cell;
                thread_local! {
                    static LAST_PLUGIN_WARN: Cell<Option<Instant>> = const { Cell::new(None) };
                }
                let now = Instant::now();
                let should_log = LAST_PLUGIN_WARN.with(|cell| match cell.get() {
                    Some(last) if now.duration_since(last).as_secs() < 5 => false,
                    _ => {
                        cell.set(Some(now));
                        true
                    }
                });
                if should_log {
                    warn!(
                        "Active module '{}' not found among loaded modules!",
                        active_module
                    );
                }
            }
        }

        if any_updated {
            let _ = tx.try_send(update.clone());

            frame_count += 1;
            if frame_count.is_multiple_of(log_interval) {
                let elapsed = last_log.elapsed().as_secs_f32();
                let fps = log_interval as f32 / elapsed;
                info!(
                    "Tracking Active: Processed {} frames (approx {:.1} FPS)",
                    frame_count, fps
                );
                last_log = Instant::now();

                if frame_count >= 1_000_000 {
                    log_interval = 1_000_000;
                } else if frame_count >= 100_000 {
                    log_interval = 100_000;
                } else if frame_count >= 10_000 {
                    log_interval = 10_000;
                }
            }

            if let Some(target_duration) = target_frame_duration {
                let elapsed = last_frame_time.elapsed();
                if elapsed < target_duration {
                    thread::sleep(target_duration - elapsed);
                }
            }
            last_frame_time = Instant::now();
        } else {
            thread::sleep(Duration::from_millis(5));
        }
    }

    info!("Shutting down...");
    // Let the in-flight cycle drain before the modules release their
    // camera and detector resources.
    drop(tx);
    if consumer.join().is_err() {
        error!("Consumer thread panicked during shutdown");
    }
    for module_wrapper in &mut modules {
        module_wrapper.module.unload();
    }
    Ok(())
}
