//! Key and source-identity normalization.

use std::sync::LazyLock;

use regex::Regex;

/// Fallback owner for records whose owner hint normalizes to nothing.
pub const UNKNOWN_OWNER: &str = "unknown";

/// Runs of anything that is not a lowercase ASCII letter or digit.
static NON_ALNUM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("non-alnum regex"));

/// `github.com/<owner>/<repo>[/tree/<branch>][/<path>]`.
static GITHUB_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"github\.com/([^/]+)/([^/]+)(?:/tree/[^/]+)?(?:/(.+))?").expect("github regex")
});

/// Derive a stable key from a display name.
///
/// Lower-cases, collapses every run of non-alphanumeric characters into a
/// single `-`, and trims leading/trailing separators. `"Foo Bar"` and
/// `"foo-bar"` both become `foo-bar`.
pub fn name_to_key(name: &str) -> String {
    let lowered = name.to_lowercase();
    NON_ALNUM_RE
        .replace_all(&lowered, "-")
        .trim_matches('-')
        .to_string()
}

/// Normalize an owner hint into a partition identifier.
pub fn owner_key(hint: &str) -> String {
    let key = name_to_key(hint);
    if key.is_empty() {
        UNKNOWN_OWNER.to_string()
    } else {
        key
    }
}

/// Convert a reference URL into its source identity.
///
/// GitHub URLs become `github:<owner>/<repo>[/<path>]`; anything else is
/// returned unchanged.
pub fn url_to_source(url: &str) -> String {
    match GITHUB_RE.captures(url) {
        Some(caps) => match caps.get(3) {
            Some(path) => format!("github:{}/{}/{}", &caps[1], &caps[2], path.as_str()),
            None => format!("github:{}/{}", &caps[1], &caps[2]),
        },
        None => url.to_string(),
    }
}

/// Best-effort publisher of a reference URL: the GitHub owner, else the host.
pub fn url_owner_hint(url: &str) -> Option<String> {
    if let Some(caps) = GITHUB_RE.captures(url) {
        return Some(caps[1].to_string());
    }
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_collapse_separators() {
        assert_eq!(name_to_key("Foo Bar"), "foo-bar");
        assert_eq!(name_to_key("foo-bar"), "foo-bar");
        assert_eq!(name_to_key("  --Hello,  World!!  "), "hello-world");
        assert_eq!(name_to_key("PDF/Excel (v2)"), "pdf-excel-v2");
    }

    #[test]
    fn key_of_symbols_is_empty() {
        assert_eq!(name_to_key("!!!"), "");
        assert_eq!(name_to_key(""), "");
    }

    #[test]
    fn owner_falls_back_to_unknown() {
        assert_eq!(owner_key("Acme Corp"), "acme-corp");
        assert_eq!(owner_key("  "), UNKNOWN_OWNER);
    }

    #[test]
    fn github_urls_become_sources() {
        assert_eq!(
            url_to_source("https://github.com/acme/skills/tree/main/pdf"),
            "github:acme/skills/pdf"
        );
        assert_eq!(url_to_source("https://github.com/acme/skills"), "github:acme/skills");
        assert_eq!(
            url_to_source("https://github.com/acme/skills/blob/main/README.md"),
            "github:acme/skills/blob/main/README.md"
        );
    }

    #[test]
    fn other_urls_are_kept() {
        assert_eq!(url_to_source("https://example.com/tool"), "https://example.com/tool");
        assert_eq!(url_to_source(""), "");
    }

    #[test]
    fn owner_hint_from_url() {
        assert_eq!(
            url_owner_hint("https://github.com/modelcontextprotocol/servers").as_deref(),
            Some("modelcontextprotocol")
        );
        assert_eq!(
            url_owner_hint("https://docs.example.com/x").as_deref(),
            Some("docs.example.com")
        );
        assert_eq!(url_owner_hint("not a url"), None);
    }
}
