pub mod config;
pub mod controller;
pub mod event_loop;
pub mod injector;
pub mod mapping;

use crate::config::Settings;
use crate::controller::driver::{ControllerDriver, ControllerEvents};
use crate::controller::gilrs_driver::{self, GilrsDriver};
use crate::event_loop::ExitReason;
use crate::injector::dry_run::DryRunInjector;
use crate::injector::InputInjector;
use crate::mapping::Router;
use color_eyre::{eyre::eyre, Result};
use tokio_util::sync::CancellationToken;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let settings_path = Settings::default_path();
    let (settings, source) = Settings::load(&settings_path).await?;
    setup_logging(settings.level()?);
    settings.log_source(&settings_path, source);

    let shutdown = CancellationToken::new();
    event_loop::cancel_on_interrupt(shutdown.clone());

    let gilrs = gilrs_driver::open()?;
    let devices = gilrs_driver::search(&gilrs, settings.device)?;
    let device = devices
        .first()
        .ok_or_else(|| eyre!("No {:?} controller found", settings.device))?;
    let (driver, events) = GilrsDriver::connect(gilrs, device, (&settings).into())?;
    info!("connected: {}", driver.name());

    let injector = host_injector(&settings)?;
    let reason = serve(driver, injector, &settings, events, &shutdown).await;
    info!("Shutting down ({})", reason);
    Ok(())
}

async fn serve<I: InputInjector>(
    driver: GilrsDriver,
    injector: I,
    settings: &Settings,
    mut events: ControllerEvents,
    shutdown: &CancellationToken,
) -> ExitReason {
    let mut router = Router::new(driver, injector, settings.into());
    let reason = event_loop::run(&mut router, &mut events, shutdown).await;

    // unblock the driver thread before joining it
    drop(events);
    let (mut driver, _) = router.into_parts();
    driver.close();
    reason
}

#[cfg(target_os = "linux")]
fn host_injector(settings: &Settings) -> Result<Box<dyn InputInjector>> {
    if settings.dry_run {
        return Ok(Box::new(DryRunInjector::new(
            settings.screen_width,
            settings.screen_height,
        )));
    }
    let injector =
        injector::uinput::UinputInjector::new(settings.screen_width, settings.screen_height)
            .map_err(|e| eyre!("Failed to create input injector: {}", e))?;
    Ok(Box::new(injector))
}

#[cfg(not(target_os = "linux"))]
fn host_injector(settings: &Settings) -> Result<Box<dyn InputInjector>> {
    if !settings.dry_run {
        tracing::warn!("uinput is only available on Linux, falling back to dry run");
    }
    Ok(Box::new(DryRunInjector::new(
        settings.screen_width,
        settings.screen_height,
    )))
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    Ok(())
}

fn setup_logging(level: Level) {
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
