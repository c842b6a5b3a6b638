// Configuration module
// Reads INI-style configuration files with environment variable overrides
//
// Keys are addressed as "Section.Key" (e.g. "Compiler.GameVersion"). The matching
// environment variable is the prefix followed by the key with '.' replaced by '_'
// (e.g. "Levelc_Compiler_GameVersion") and always wins over the file.

use configparser::ini::Ini;
use std::path::Path;

/// Configuration file parser
pub struct Config {
    ini: Ini,
    filename: String,
    env_prefix: String,
}

impl Config {
    pub fn new() -> Self {
        Config {
            ini: Ini::new_cs(),
            filename: String::new(),
            env_prefix: String::new(),
        }
    }

    /// Load configuration from a file.
    /// `env_prefix` is used to check environment variables (e.g. "Levelc_").
    /// A missing file is not an error: defaults and the environment still apply.
    pub fn set_source(&mut self, filename: &str, env_prefix: &str) -> Result<bool, String> {
        self.filename = filename.to_string();
        self.env_prefix = env_prefix.to_string();
        self.reload()
    }

    /// Load configuration from an in-memory INI document
    pub fn set_source_str(&mut self, content: &str, env_prefix: &str) -> Result<(), String> {
        self.filename.clear();
        self.env_prefix = env_prefix.to_string();
        self.ini = Ini::new_cs();
        self.ini.read(content.to_string())?;
        Ok(())
    }

    /// Reload the configuration file. Returns whether a file was actually read.
    pub fn reload(&mut self) -> Result<bool, String> {
        self.ini = Ini::new_cs();

        if self.filename.is_empty() || !Path::new(&self.filename).exists() {
            return Ok(false);
        }

        self.ini.load(&self.filename)?;
        Ok(true)
    }

    /// Name of the file this configuration was loaded from
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Check if a key is set
    pub fn is_set(&self, key: &str) -> bool {
        self.get_env_or_config(key).is_some()
    }

    /// Get a string value with a default
    pub fn get_string_default(&self, key: &str, default: &str) -> String {
        self.get_env_or_config(key)
            .unwrap_or_else(|| default.to_string())
    }

    /// Get a boolean value with a default
    pub fn get_bool_default(&self, key: &str, default: bool) -> bool {
        match self.get_env_or_config(key) {
            Some(val) => {
                let lower = val.to_lowercase();
                matches!(lower.as_str(), "1" | "true" | "yes" | "on")
            }
            None => default,
        }
    }

    /// Get an integer value with a default
    pub fn get_int_default(&self, key: &str, default: i32) -> i32 {
        match self.get_env_or_config(key) {
            Some(val) => val.trim().parse().unwrap_or(default),
            None => default,
        }
    }

    /// Get a float value with a default
    pub fn get_float_default(&self, key: &str, default: f32) -> f32 {
        match self.get_env_or_config(key) {
            Some(val) => val.trim().parse().unwrap_or(default),
            None => default,
        }
    }

    /// Try environment variable first, then config file
    fn get_env_or_config(&self, key: &str) -> Option<String> {
        if !self.env_prefix.is_empty() {
            let env_key = format!("{}{}", self.env_prefix, key.replace('.', "_"));
            if let Ok(val) = std::env::var(&env_key) {
                return Some(val);
            }
        }

        let (section, name) = key.split_once('.').unwrap_or(("default", key));
        self.ini.get(section, name).map(|v| strip_quotes(&v))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

fn strip_quotes(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        trimmed[1..trimmed.len() - 1].to_string()
    } else {
        trimmed.to_string()
    }
}
