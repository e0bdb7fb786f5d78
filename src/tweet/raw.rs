// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use serde::Deserialize;

use super::Status;

/// The envelope of a search response. Everything besides the statuses (like `search_metadata`)
/// is ignored.
#[derive(Debug, Deserialize)]
pub struct RawStatuses {
    #[serde(default)]
    pub statuses: Vec<Status>,
}
