// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

mod common;

use birdcall::Call;

#[tokio::main]
async fn main() -> birdcall::error::Result<()> {
    let common::Setup { settings, auth } = common::setup().await?;

    println!(
        "Searching for {:?}",
        settings.search_text.as_deref().unwrap_or("")
    );

    let page = birdcall::search::search(auth, &settings).execute().await?;

    for status in page.ordered() {
        println!("{}", status);
    }
    println!(
        "{} statuses; {} searches left until {}",
        page.len(),
        page.rate_limit_status.remaining,
        page.rate_limit_status.reset
    );

    Ok(())
}
