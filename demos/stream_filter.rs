// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

mod common;

use birdcall::Call;

#[tokio::main]
async fn main() -> birdcall::error::Result<()> {
    let common::Setup { settings, auth } = common::setup().await?;

    let call = birdcall::stream::filter(auth, &settings);
    println!(
        "Streaming statuses containing {:?} for {} seconds (at most {})",
        settings.search_text.as_deref().unwrap_or(""),
        call.delay().as_secs(),
        call.max_records()
    );

    match call.execute().await {
        Ok(statuses) => {
            for status in statuses.ordered() {
                println!("{}", status);
                println!("──────────────────────────────────────");
            }
        }
        Err(e) => {
            println!("Stream error: {}", e);
            println!("Disconnected");
        }
    }

    Ok(())
}
