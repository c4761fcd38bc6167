use anyhow::{Context as _, Result};
use fbsync_config::AppConfig;
use fbsync_core::Phonebook;
use fbsync_sync::{parse_phonebook, FritzBoxClient};
use serde::Serialize;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

pub mod backup;
pub mod completions;
pub mod convert;
pub mod download;
pub mod fax;
pub mod pipeline;
pub mod quickdials;
pub mod restore;
pub mod run;
pub mod save;
pub mod upload;

pub struct Context<'a> {
    pub json: bool,
    pub config: &'a AppConfig,
}

impl Context<'_> {
    pub fn device(&self) -> Result<FritzBoxClient> {
        let device = &self.config.device;
        let password = fbsync_config::resolve_secret(device.password_env.as_deref())
            .with_context(|| "resolve device password")?;
        FritzBoxClient::login(&device.url, &device.user, &password)
            .with_context(|| format!("log in to {}", device.url))
    }
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)?;
    Ok(())
}

pub fn read_phonebook_file(path: &Path) -> Result<Phonebook> {
    let xml = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    parse_phonebook(&xml).with_context(|| format!("parse phonebook {}", path.display()))
}

pub fn write_output(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).with_context(|| format!("write {}", path.display()))
}
