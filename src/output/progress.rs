use std::future::Future;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use super::styling::{bright_red, bright_yellow};

/// Spinner shown on stderr while a request is in flight.
pub struct Loading {
    pb: ProgressBar,
}

impl Loading {
    pub fn start(message: &str) -> Self {
        Self {
            pb: create_spinner(bright_yellow(message).to_string()),
        }
    }

    pub fn finish_err(self, message: &str) {
        self.pb
            .finish_with_message(bright_red(format!("{message} ✗")).to_string());
    }

    /// Clears the spinner line without a final message.
    pub fn clear(self) {
        self.pb.finish_and_clear();
    }
}

/// Runs `future` behind a spinner labelled `message`.
pub async fn with_spinner<T, E, F>(message: &str, future: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
{
    let loading = Loading::start(message);
    let result = future.await;
    match &result {
        Ok(_) => loading.clear(),
        Err(_) => loading.finish_err(message),
    }
    result
}

fn create_spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_draw_target(ProgressDrawTarget::stderr());
    if let Ok(style) = ProgressStyle::default_spinner().template("  {msg} {spinner}") {
        pb.set_style(style);
    }
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_with_spinner_passes_result_through() {
        let ok: Result<u32, String> = with_spinner("Loading", async { Ok(7) }).await;
        assert_eq!(ok, Ok(7));

        let err: Result<u32, String> =
            with_spinner("Loading", async { Err("boom".to_string()) }).await;
        assert_eq!(err, Err("boom".to_string()));
    }
}
