// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//since this is going to get included in demos that might not use everything, clear out warnings
//that are unnecessary
#![allow(dead_code)]

use std::sync::Arc;

use birdcall::{Authenticator, HttpsTransport, Settings, StdinPrompt};
use tracing_subscriber::EnvFilter;

//This is not a demo that can be run with cargo! This is some helper code for the other demos so
//they can load their settings and authorize the same way.

/// Where the settings are read from, unless `BIRDCALL_SETTINGS` says otherwise. The extension is
/// left off so any format the `config` crate knows will do.
const DEFAULT_SETTINGS: &str = "birdcall";

pub struct Setup {
    pub settings: Settings,
    pub auth: Arc<Authenticator>,
}

/// Installs the log subscriber (`RUST_LOG` picks the level, `info` by default), loads the
/// settings, and runs the handshake on the terminal.
pub async fn setup() -> birdcall::error::Result<Setup> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .without_time()
        .init();

    let path = std::env::var("BIRDCALL_SETTINGS").unwrap_or_else(|_| DEFAULT_SETTINGS.to_string());
    let settings = Settings::load(&path)?;

    let auth = Arc::new(Authenticator::from_settings(
        &settings,
        Arc::new(HttpsTransport::new()),
        StdinPrompt,
    ));
    auth.authenticate().await?;

    Ok(Setup { settings, auth })
}
