//! Preference commands: follow, bookmark, view, and the `prefs` display.

use feedsync_core::{DarkThemeConfig, ThemeBrand, UserPreferences};
use feedsync_engine::UserDataMerger;
use std::path::Path;

/// A single preference mutation requested on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Follow these topics.
    Follow(Vec<String>),
    /// Unfollow these topics.
    Unfollow(Vec<String>),
    /// Bookmark a resource.
    Bookmark(String),
    /// Remove a bookmark.
    Unbookmark(String),
    /// Mark a resource viewed.
    View(String),
}

/// Settings changes for the `prefs` command.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    /// New theme brand.
    pub theme_brand: Option<ThemeBrand>,
    /// New dark theme selection.
    pub dark_theme: Option<DarkThemeConfig>,
    /// New dynamic colour setting.
    pub dynamic_color: Option<bool>,
    /// Mark onboarding complete.
    pub complete_onboarding: bool,
    /// Show onboarding again.
    pub reset_onboarding: bool,
    /// Clear view history.
    pub clear_history: bool,
}

/// Applies `intent` through the merger.
pub fn apply(merger: &UserDataMerger, intent: &Intent) -> Result<(), Box<dyn std::error::Error>> {
    match intent {
        Intent::Follow(ids) => {
            for id in ids {
                merger.follow_topic(id)?;
            }
        }
        Intent::Unfollow(ids) => {
            for id in ids {
                merger.unfollow_topic(id)?;
            }
        }
        Intent::Bookmark(id) => merger.bookmark(id)?,
        Intent::Unbookmark(id) => merger.unbookmark(id)?,
        Intent::View(id) => merger.mark_viewed(id)?,
    }
    Ok(())
}

/// Applies every requested settings change.
pub fn apply_settings(
    merger: &UserDataMerger,
    settings: &Settings,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(brand) = settings.theme_brand {
        merger.set_theme_brand(brand)?;
    }
    if let Some(config) = settings.dark_theme {
        merger.set_dark_theme_config(config)?;
    }
    if let Some(enabled) = settings.dynamic_color {
        merger.set_dynamic_color(enabled)?;
    }
    if settings.clear_history {
        merger.clear_view_history()?;
    }
    if settings.reset_onboarding {
        merger.reset_onboarding()?;
    }
    if settings.complete_onboarding {
        merger.complete_onboarding()?;
    }
    Ok(())
}

/// Runs a mutation command.
pub fn run(path: &Path, intent: &Intent) -> Result<(), Box<dyn std::error::Error>> {
    let merger = UserDataMerger::new(super::open_store(path, true)?);
    apply(&merger, intent)?;
    println!("✓ {intent:?}");
    Ok(())
}

/// Runs the `prefs` command: applies settings, then prints preferences.
pub fn run_show(
    path: &Path,
    settings: &Settings,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let merger = UserDataMerger::new(super::open_store(path, true)?);
    apply_settings(&merger, settings)?;
    let prefs = merger.preferences();

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&*prefs)?);
        }
        _ => print_text_output(&prefs),
    }
    Ok(())
}

fn join(ids: &std::collections::BTreeSet<String>) -> String {
    if ids.is_empty() {
        "-".to_string()
    } else {
        ids.iter().cloned().collect::<Vec<_>>().join(", ")
    }
}

fn print_text_output(prefs: &UserPreferences) {
    println!("Preferences:");
    println!("  Followed topics:  {}", join(&prefs.followed_topics));
    println!("  Bookmarked:       {}", join(&prefs.bookmarked));
    println!("  Viewed:           {}", join(&prefs.viewed));
    println!("  Theme brand:      {:?}", prefs.theme_brand);
    println!("  Dark theme:       {:?}", prefs.dark_theme_config);
    println!("  Dynamic colour:   {}", prefs.use_dynamic_color);
    println!("  Onboarding done:  {}", prefs.should_hide_onboarding);
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedsync_core::{Database, StoreConfig};
    use std::sync::Arc;

    #[test]
    fn intents_persist() {
        let dir = tempfile::tempdir().unwrap();
        {
            let db = Arc::new(Database::open(dir.path(), StoreConfig::default()).unwrap());
            let merger = UserDataMerger::new(db);
            apply(&merger, &Intent::Follow(vec!["a".into(), "b".into()])).unwrap();
            apply(&merger, &Intent::Bookmark("n1".into())).unwrap();
            apply(&merger, &Intent::Unfollow(vec!["a".into()])).unwrap();
        }

        let db = Database::open(dir.path(), StoreConfig::default()).unwrap();
        let prefs = db.preferences().get();
        assert!(prefs.is_following("b"));
        assert!(!prefs.is_following("a"));
        assert!(prefs.is_bookmarked("n1"));
        assert!(prefs.is_viewed("n1"));
    }

    #[test]
    fn settings_apply_in_order() {
        let merger = UserDataMerger::new(Arc::new(Database::open_in_memory().unwrap()));
        apply(&merger, &Intent::Bookmark("n1".into())).unwrap();
        apply(&merger, &Intent::View("n2".into())).unwrap();

        let settings = Settings {
            theme_brand: Some(ThemeBrand::Android),
            dark_theme: Some(DarkThemeConfig::Dark),
            dynamic_color: Some(true),
            complete_onboarding: true,
            clear_history: true,
            ..Settings::default()
        };
        apply_settings(&merger, &settings).unwrap();

        let prefs = merger.preferences();
        assert_eq!(prefs.theme_brand, ThemeBrand::Android);
        assert_eq!(prefs.dark_theme_config, DarkThemeConfig::Dark);
        assert!(prefs.use_dynamic_color);
        assert!(prefs.should_hide_onboarding);
        assert!(prefs.is_viewed("n1"));
        assert!(!prefs.is_viewed("n2"));
    }
}
