use std::path::PathBuf;

/// Caption sent with the welcome banner, Telegram HTML.
pub const WELCOME_CAPTION: &str =
    "🎉 <b>Welcome!</b>\n\nSubscribe to our channel to get access.";

/// Plain text sent when the welcome banner or caption can't be delivered.
pub const WELCOME_FALLBACK: &str = "🎉 Welcome!";

/// Locates the welcome banner image on disk.
///
/// The lookup runs on every entry so a banner dropped into the directory
/// while the bot is running is picked up without a restart.
#[derive(Debug, Clone, Default)]
pub struct WelcomeBanner {
    dir: PathBuf,
    candidates: Vec<String>,
}

impl WelcomeBanner {
    pub const DEFAULT_FILES: [&'static str; 3] =
        ["Бот баннер.png", "bot_banner.png", "welcome.png"];

    pub fn new(dir: impl Into<PathBuf>, candidates: Vec<String>) -> Self {
        Self {
            dir: dir.into(),
            candidates,
        }
    }

    /// Banner that never resolves; only the text welcome is sent.
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    /// First candidate that exists as a regular file.
    #[must_use]
    pub fn locate(&self) -> Option<PathBuf> {
        self.candidates
            .iter()
            .map(|name| self.dir.join(name))
            .find(|path| path.is_file())
    }
}
