use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

use crate::error::{ReplayError, Result};

#[derive(Debug, Clone, Default)]
pub struct Profile {
    pub name: String,
    pub values: BTreeMap<String, String>,
}

impl Profile {
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        let Some(raw) = self.get(key) else {
            return Ok(None);
        };
        match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            _ => Err(self.invalid(key, "a boolean")),
        }
    }

    /// Parse `key` as `T`, reporting `expected` when the value is malformed.
    pub fn get_parsed<T: FromStr>(&self, key: &str, expected: &'static str) -> Result<Option<T>> {
        self.get(key)
            .map(|raw| raw.trim().parse::<T>().map_err(|_| self.invalid(key, expected)))
            .transpose()
    }

    /// Comma-separated list, empty entries dropped.
    #[must_use]
    pub fn get_list(&self, key: &str) -> Option<Vec<String>> {
        self.get(key).map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect()
        })
    }

    /// Values from `other` replace values here key by key.
    pub fn overlay(&mut self, other: Profile) {
        self.name = format!("{}+{}", self.name, other.name);
        self.values.extend(other.values);
    }

    fn invalid(&self, key: &str, expected: &'static str) -> ReplayError {
        ReplayError::InvalidProfileValue {
            key: key.to_string(),
            value: self.get(key).unwrap_or_default().to_string(),
            expected,
        }
    }
}

const DEFAULT: &str = include_str!("../profiles/default.env");
const TYPING: &str = include_str!("../profiles/typing.env");
const COMPACT: &str = include_str!("../profiles/compact.env");
const STRICT_JSON: &str = include_str!("../profiles/strict-json.env");

const BUILTIN_PROFILES: [(&str, &str); 4] = [
    ("default", DEFAULT),
    ("typing", TYPING),
    ("compact", COMPACT),
    ("strict-json", STRICT_JSON),
];

#[must_use]
pub fn list_profile_names() -> Vec<String> {
    BUILTIN_PROFILES
        .iter()
        .map(|(name, _)| (*name).to_string())
        .collect()
}

pub fn load_profile(name: &str) -> Result<Profile> {
    let (_, content) = BUILTIN_PROFILES
        .iter()
        .find(|(candidate, _)| *candidate == name)
        .ok_or_else(|| ReplayError::ProfileNotFound {
            name: name.to_string(),
        })?;

    Ok(Profile {
        name: name.to_string(),
        values: parse_profile_content(content),
    })
}

/// Load an `.env`-style profile from disk.
pub fn load_profile_file(path: &Path) -> Result<Profile> {
    if !path.exists() {
        return Err(ReplayError::MissingPath {
            path: path.to_path_buf(),
        });
    }
    let content = std::fs::read_to_string(path)?;
    let name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string());
    Ok(Profile {
        name,
        values: parse_profile_content(&content),
    })
}

#[must_use]
pub fn parse_profile_content(content: &str) -> BTreeMap<String, String> {
    let mut values = BTreeMap::new();

    for raw_line in content.lines() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((key, value_raw)) = line.split_once('=') else {
            continue;
        };

        let key = key.trim().to_string();
        let mut value = value_raw.trim().to_string();

        if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
            value = value[1..value.len() - 1].to_string();
        }

        values.insert(key, value);
    }

    values
}
