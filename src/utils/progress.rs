use std::borrow::Cow;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::utils::logging::LoggingConfigurator;

/// Animation used by a [`Spinner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpinnerStyle {
    Dots,
    #[default]
    SimpleDotsScrolling,
    Line,
}

impl SpinnerStyle {
    /// Animation frames; the last one is shown once finished.
    pub fn tick_strings(self) -> &'static [&'static str] {
        match self {
            SpinnerStyle::Dots => &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "✔"],
            SpinnerStyle::SimpleDotsScrolling => &[".  ", ".. ", "...", " ..", "  .", "   ", "✔"],
            SpinnerStyle::Line => &["-", "\\", "|", "/", "✔"],
        }
    }

    pub fn interval(self) -> Duration {
        match self {
            SpinnerStyle::Dots => Duration::from_millis(80),
            SpinnerStyle::SimpleDotsScrolling => Duration::from_millis(200),
            SpinnerStyle::Line => Duration::from_millis(130),
        }
    }

    fn progress_style(self) -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(self.tick_strings())
    }
}

/// Spinner shown while a blocking call runs. Cleared when dropped unless
/// [`Spinner::finish_with_message`] left a final line.
///
/// Nothing is drawn unless logging was configured with a console.
pub struct Spinner {
    bar: ProgressBar,
}

impl Spinner {
    pub fn start(message: impl Into<Cow<'static, str>>, style: SpinnerStyle) -> Self {
        let bar = if LoggingConfigurator::console_enabled() {
            ProgressBar::new_spinner()
        } else {
            ProgressBar::hidden()
        };
        Self::with_bar(bar, message, style)
    }

    /// A spinner that tracks its message but never draws.
    pub fn hidden(message: impl Into<Cow<'static, str>>, style: SpinnerStyle) -> Self {
        Self::with_bar(ProgressBar::hidden(), message, style)
    }

    fn with_bar(
        bar: ProgressBar,
        message: impl Into<Cow<'static, str>>,
        style: SpinnerStyle,
    ) -> Self {
        bar.set_style(style.progress_style());
        bar.set_message(message);
        if !bar.is_hidden() {
            bar.enable_steady_tick(style.interval());
        }
        Self { bar }
    }

    pub fn set_message(&self, message: impl Into<Cow<'static, str>>) {
        self.bar.set_message(message);
    }

    pub fn message(&self) -> String {
        self.bar.message()
    }

    pub fn is_hidden(&self) -> bool {
        self.bar.is_hidden()
    }

    pub fn finish_with_message(self, message: impl Into<Cow<'static, str>>) {
        self.bar.finish_with_message(message);
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}

/// Run `f` with the default spinner showing `message` and return its result.
pub fn with_spinner<T, F>(message: impl Into<Cow<'static, str>>, f: F) -> T
where
    F: FnOnce() -> T,
{
    with_spinner_style(message, SpinnerStyle::default(), f)
}

pub fn with_spinner_style<T, F>(
    message: impl Into<Cow<'static, str>>,
    style: SpinnerStyle,
    f: F,
) -> T
where
    F: FnOnce() -> T,
{
    let _spinner = Spinner::start(message, style);
    f()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_spinner_returns_result() {
        let value = with_spinner("Computing...", || 6 * 7);
        assert_eq!(value, 42);

        let result: Result<u8, String> = with_spinner_style("Failing...", SpinnerStyle::Line, || {
            Err("boom".to_string())
        });
        assert_eq!(result.unwrap_err(), "boom");
    }

    #[test]
    fn test_hidden_without_console_logging() {
        let spinner = Spinner::start("Loading", SpinnerStyle::Dots);
        assert!(spinner.is_hidden());
    }

    #[test]
    fn test_message_updates() {
        let spinner = Spinner::hidden("Step 1", SpinnerStyle::default());
        assert_eq!(spinner.message(), "Step 1");

        spinner.set_message(format!("Step {}", 2));
        assert_eq!(spinner.message(), "Step 2");
        spinner.finish_with_message("Done");
    }

    #[test]
    fn test_styles_end_with_finished_frame() {
        for style in [SpinnerStyle::Dots, SpinnerStyle::SimpleDotsScrolling, SpinnerStyle::Line] {
            let frames = style.tick_strings();
            assert!(frames.len() >= 2);
            assert_eq!(frames.last(), Some(&"✔"));
            assert!(style.interval() >= Duration::from_millis(50));
        }
        assert_eq!(SpinnerStyle::default(), SpinnerStyle::SimpleDotsScrolling);
    }
}
