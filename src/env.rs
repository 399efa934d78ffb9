use std::path::Path;

const SECRETS_FILE: &str = ".secrets.env";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Development,
    Production,
}

impl Profile {
    /// Rocket's own profile variable decides which env files are layered.
    pub fn current() -> Self {
        match dotenvy::var("ROCKET_PROFILE").as_deref() {
            Ok("production") | Ok("release") => Profile::Production,
            _ => Profile::Development,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Profile::Development => "development",
            Profile::Production => "production",
        }
    }

    /// Later files override earlier ones.
    pub fn env_files(&self) -> [&'static str; 3] {
        let profile_file = match self {
            Profile::Development => "config/dev.env",
            Profile::Production => "config/prod.env",
        };
        ["config/common.env", profile_file, SECRETS_FILE]
    }
}

/// What `load_environment` found. Loading runs before the subscriber is
/// installed, so the caller logs this afterwards.
#[derive(Debug, Default)]
pub struct LoadedEnv {
    pub loaded: Vec<&'static str>,
    pub missing: Vec<&'static str>,
}

pub fn load_environment(profile: Profile) -> Result<LoadedEnv, dotenvy::Error> {
    let mut result = LoadedEnv::default();

    for path in profile.env_files() {
        if Path::new(path).exists() {
            dotenvy::from_filename_override(path)?;
            result.loaded.push(path);
        } else {
            result.missing.push(path);
        }
    }

    Ok(result)
}
