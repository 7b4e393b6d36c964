// Palette configuration and persistence

pub mod paths;
pub mod settings;
pub mod store;

pub use settings::{CommandPaletteSettings, DamSettings};
pub use store::{
    load_settings_or_default, load_usage_or_default, persist_in_background, JsonFileStore,
    MemoryStore, SettingsStore, SqliteStore, StoreError,
};
