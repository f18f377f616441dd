// src/i18n.rs
//
// Runtime UI strings:
// - Bundled table: assets/i18n.json, embedded at build time,
//   format { "<lang>": { "key": "value" } }
// - Per-language override: assets/i18n/<lang>.json (flat { "key": "value" }),
//   searched next to the executable, then in the working directory
// - Lookup order: selected lang -> fallback en -> the key itself
// - {name} placeholders via tr_with

use once_cell::sync::OnceCell;
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::RwLock,
};

pub const FALLBACK_LANG: &str = "en";

const BUNDLED: &str = include_str!("../assets/i18n.json");

type Table = HashMap<String, String>;

#[derive(Debug, Clone)]
pub struct I18n {
    pub lang: String,
    map: Table,
    fallback_map: Table,
}

static I18N: OnceCell<RwLock<I18n>> = OnceCell::new();

fn bundled() -> HashMap<String, Table> {
    match serde_json::from_str(BUNDLED) {
        Ok(all) => all,
        Err(e) => {
            log::error!("bundled i18n table is invalid: {e}");
            HashMap::new()
        }
    }
}

fn load_override(path: &Path) -> Option<Table> {
    let text = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&text) {
        Ok(map) => Some(map),
        Err(e) => {
            log::warn!("ignoring {}: {e}", path.display());
            None
        }
    }
}

fn find_override(lang: &str) -> Option<PathBuf> {
    let file = format!("{lang}.json");

    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let p = dir.join("assets").join("i18n").join(&file);
            if p.exists() {
                return Some(p);
            }
        }
    }

    let p = PathBuf::from("assets").join("i18n").join(&file);
    p.exists().then_some(p)
}

impl I18n {
    /// Builds the tables for `lang` from the bundled strings and any override file.
    pub fn load(lang: &str) -> Self {
        let mut all = bundled();
        let mut table_for = |code: &str| {
            let mut map = all.remove(code).unwrap_or_default();
            if let Some(extra) = find_override(code).as_deref().and_then(load_override) {
                map.extend(extra);
            }
            map
        };

        let map = table_for(lang);
        let fallback_map = if lang == FALLBACK_LANG {
            map.clone()
        } else {
            table_for(FALLBACK_LANG)
        };

        if map.is_empty() {
            log::warn!("no strings for language {lang:?}, using {FALLBACK_LANG}");
        }

        Self {
            lang: lang.to_string(),
            map,
            fallback_map,
        }
    }

    pub fn lookup(&self, key: &str) -> String {
        self.map
            .get(key)
            .or_else(|| self.fallback_map.get(key))
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }
}

/// Languages with a bundled table, as (code, native name), sorted by code.
pub fn available_languages() -> Vec<(String, String)> {
    let mut langs: Vec<(String, String)> = bundled()
        .into_iter()
        .map(|(code, table)| {
            let name = table.get("lang.name").cloned().unwrap_or_else(|| code.clone());
            (code, name)
        })
        .collect();
    langs.sort();
    langs
}

/// Switches the global language. Safe to call repeatedly.
pub fn init(lang: impl AsRef<str>) {
    let i = I18n::load(lang.as_ref());
    log::info!("ui language: {}", i.lang);

    if let Some(lock) = I18N.get() {
        if let Ok(mut w) = lock.write() {
            *w = i;
        }
    } else {
        let _ = I18N.set(RwLock::new(i));
    }
}

/// Localized text for `key`, or the key itself when no table has it.
pub fn tr(key: &str) -> String {
    match I18N.get().and_then(|l| l.read().ok()) {
        Some(i) => i.lookup(key),
        None => key.to_string(),
    }
}

/// Like [`tr`], then replaces `{name}` placeholders. Unknown placeholders stay as-is.
pub fn tr_with(key: &str, args: &[(&str, String)]) -> String {
    substitute(tr(key), args)
}

fn substitute(mut s: String, args: &[(&str, String)]) -> String {
    for (k, v) in args {
        s = s.replace(&format!("{{{k}}}"), v);
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_table_parses() {
        let all = bundled();
        assert!(all.contains_key(FALLBACK_LANG));
        assert!(all[FALLBACK_LANG].contains_key("app.title"));
    }

    #[test]
    fn test_every_language_has_every_key() {
        let all = bundled();
        let en = &all[FALLBACK_LANG];
        for (code, table) in &all {
            for key in en.keys() {
                assert!(table.contains_key(key), "{code} is missing {key}");
            }
        }
    }

    #[test]
    fn test_fallback_and_missing_key() {
        let i = I18n::load("xx");
        assert_eq!(i.lookup("menu.file"), I18n::load("en").lookup("menu.file"));
        assert_eq!(i.lookup("no.such.key"), "no.such.key");
    }

    #[test]
    fn test_substitute_placeholders() {
        let s = substitute(
            "{w}x{h} at {path}".to_string(),
            &[("w", "10".to_string()), ("h", "5".to_string())],
        );
        assert_eq!(s, "10x5 at {path}");
    }

    #[test]
    fn test_available_languages_sorted_with_names() {
        let langs = available_languages();
        assert!(langs.iter().any(|(c, n)| c == "en" && n == "English"));
        assert!(langs.windows(2).all(|w| w[0].0 < w[1].0));
    }
}
