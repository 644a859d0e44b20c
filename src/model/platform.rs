use serde::{Deserialize, Serialize};

/// Simplified platform family, inferred from raw nix system strings such as
/// `x86_64-linux` or `aarch64-darwin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Darwin,
    Linux,
    Windows,
    Freebsd,
    Cygwin,
}

impl Platform {
    /// Families in the order they are probed against a raw platform string.
    pub const ALL: [Platform; 5] = [
        Platform::Darwin,
        Platform::Linux,
        Platform::Windows,
        Platform::Freebsd,
        Platform::Cygwin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Darwin => "darwin",
            Platform::Linux => "linux",
            Platform::Windows => "windows",
            Platform::Freebsd => "freebsd",
            Platform::Cygwin => "cygwin",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reduces raw platform strings to the distinct families they mention.
///
/// Each raw string contributes at most one new family: the first family
/// (in [`Platform::ALL`] order) it contains that has not been seen yet.
/// The result keeps first-seen order.
pub fn simplify_platforms<S: AsRef<str>>(raw: &[S]) -> Vec<Platform> {
    let mut simplified = Vec::new();
    for platform in raw {
        let platform = platform.as_ref();
        for family in Platform::ALL {
            if !platform.contains(family.as_str()) || simplified.contains(&family) {
                continue;
            }
            simplified.push(family);
            break;
        }
    }
    simplified
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simplify_keeps_first_seen_order() {
        let raw = ["x86_64-linux", "aarch64-darwin"];
        assert_eq!(
            simplify_platforms(&raw),
            vec![Platform::Linux, Platform::Darwin]
        );
    }

    #[test]
    fn test_simplify_deduplicates() {
        let raw = [
            "x86_64-linux",
            "aarch64-linux",
            "i686-cygwin",
            "x86_64-darwin",
            "aarch64-darwin",
        ];
        assert_eq!(
            simplify_platforms(&raw),
            vec![Platform::Linux, Platform::Cygwin, Platform::Darwin]
        );
    }

    #[test]
    fn test_simplify_ignores_unknown_systems() {
        let raw = ["riscv64-none", "wasm32-wasi", "x86_64-freebsd"];
        assert_eq!(simplify_platforms(&raw), vec![Platform::Freebsd]);
        assert!(simplify_platforms::<&str>(&[]).is_empty());
    }
}
