// Copyright (c) 2020 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Affero General Public License that can be found
// in the LICENSE file.

use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};

/// Maximum number of bytes a v3.1/v3.1.1 client id may occupy on the wire.
pub const MAX_CLIENT_ID_BYTES: usize = 23;

/// Generate a random alphanumeric string, useful for client ids in tests
/// and examples.
#[must_use]
pub fn random_string(len: usize) -> String {
    thread_rng().sample_iter(&Alphanumeric).take(len).map(char::from).collect()
}

/// Truncate a client id to the first `MAX_CLIENT_ID_BYTES` bytes, splitting
/// only on a UTF-8 character boundary.
#[must_use]
pub fn truncate_client_id(client_id: &str) -> &str {
    if client_id.len() <= MAX_CLIENT_ID_BYTES {
        return client_id;
    }
    let mut end = MAX_CLIENT_ID_BYTES;
    while end > 0 && !client_id.is_char_boundary(end) {
        end -= 1;
    }
    &client_id[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_client_id_is_unchanged() {
        assert_eq!(truncate_client_id("abc"), "abc");
    }

    #[test]
    fn long_client_id_is_truncated() {
        let id = "a".repeat(30);
        assert_eq!(truncate_client_id(&id).len(), MAX_CLIENT_ID_BYTES);
    }
}
