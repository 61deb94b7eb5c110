//! The cluster admin token.

/// Token shared between cluster peers so node-to-node calls authenticate
/// without a managed session.
///
/// Comparison is constant time. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct AdminToken(String);

impl AdminToken {
    /// `None` when the configured token is empty, which disables the bypass.
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        if token.is_empty() { None } else { Some(Self(token)) }
    }

    pub fn matches(&self, candidate: &str) -> bool {
        safe_equal(&self.0, candidate)
    }
}

impl core::fmt::Debug for AdminToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("AdminToken(..)")
    }
}

fn safe_equal(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let diff = a
        .as_bytes()
        .iter()
        .zip(b.as_bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y));
    diff == 0
}
