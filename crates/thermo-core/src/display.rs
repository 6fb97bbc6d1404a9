//! OLED rendering of the current temperature
//!
//! The layout is a pure function of the [`Temperature`]: the whole surface is
//! cleared and both lines are drawn again on every cycle.

use core::fmt::Write;

use embedded_graphics::{
    Drawable as EgDrawable,
    mono_font::{
        MonoTextStyle,
        ascii::{FONT_6X10, FONT_10X20},
    },
    pixelcolor::BinaryColor,
    prelude::*,
    text::{Baseline, Text},
};
use heapless::String;
use thiserror_no_std::Error;

use crate::app_state::Temperature;

pub const DISPLAY_WIDTH_PX: u32 = 128;
pub const DISPLAY_HEIGHT_PX: u32 = 64;

/// Top-left corner of the small "Temperature:" label.
pub const LABEL_ORIGIN: Point = Point::new(0, 10);

/// Top-left corner of the large value line.
pub const VALUE_ORIGIN: Point = Point::new(10, 30);

pub const LABEL_TEXT: &str = "Temperature:";

/// Room for any `f32` rendered by `Display` plus the unit suffix.
pub type ValueLine = String<64>;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayError {
    #[error("display did not respond to initialization")]
    InitFailed,
    #[error("display transfer failed")]
    TransferFailed,
}

/// A monochrome pixel surface that can be brought up and pushed to glass.
pub trait Screen: DrawTarget<Color = BinaryColor> {
    /// Bring the panel up. Called once at start-up.
    fn init(&mut self) -> impl Future<Output = Result<(), DisplayError>>;

    /// Push everything drawn since the last flush to the panel.
    fn flush(&mut self) -> impl Future<Output = Result<(), DisplayError>>;
}

/// Text of the second line, e.g. `23.5 C`.
pub fn value_line(temperature: Temperature) -> ValueLine {
    let mut line = ValueLine::new();
    // Capacity covers the longest f32 Display output.
    let _ = write!(line, "{} C", temperature);
    line
}

/// Clear `target` and draw the two-line reading layout.
pub fn draw_reading<D>(target: &mut D, temperature: Temperature) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    target.clear(BinaryColor::Off)?;

    EgDrawable::draw(
        &Text::with_baseline(
            LABEL_TEXT,
            LABEL_ORIGIN,
            MonoTextStyle::new(&FONT_6X10, BinaryColor::On),
            Baseline::Top,
        ),
        target,
    )?;

    EgDrawable::draw(
        &Text::with_baseline(
            value_line(temperature).as_str(),
            VALUE_ORIGIN,
            MonoTextStyle::new(&FONT_10X20, BinaryColor::On),
            Baseline::Top,
        ),
        target,
    )?;

    Ok(())
}

/// Full clear-then-redraw of `screen`, followed by a flush.
pub async fn redraw<S: Screen>(screen: &mut S, temperature: Temperature) -> Result<(), DisplayError> {
    draw_reading(screen, temperature).map_err(|_| DisplayError::TransferFailed)?;
    screen.flush().await
}

/// Blank the panel right after it comes up.
pub async fn blank<S: Screen>(screen: &mut S) -> Result<(), DisplayError> {
    screen
        .clear(BinaryColor::Off)
        .map_err(|_| DisplayError::TransferFailed)?;
    screen.flush().await
}
