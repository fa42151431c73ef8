//! Not a CLI — no argument parsing. Exercises `Display::open` against the
//! mock HAL so the crate's public surface can be eyeballed without real
//! hardware.

use chromawave::hal::mock::MockHal;
use chromawave::{Canvas, Color, ConfigSettings, Display, DitherStrategy, Renderer, Surface};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let hal = MockHal::new();
    let handle = hal.handle();
    handle.set_default_busy_level(false);

    let mut display = Display::open("epd_2in13_v4", hal, ConfigSettings::default())?;
    println!(
        "opened {} ({}x{}, {})",
        display.model_name(),
        display.width(),
        display.height(),
        display.format().name
    );

    let mut canvas = Canvas::new(display.width() as u32, display.height() as u32, Color::WHITE);
    canvas.set_pixel(0, 0, Color::BLACK);

    let renderer = Renderer::new(display.format(), DitherStrategy::FloydSteinberg);
    display.show(&canvas, &renderer)?;
    display.deep_sleep()?;

    println!("wrote {} bus events", handle.transcript().len());
    Ok(())
}
