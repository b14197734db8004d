mod settings;

pub use settings::{os_user, Settings, SettingsError, TomlSettings, PROJECT_SETTINGS_FILE};
