/// URL utilities
pub mod url {
    use url::Url;

    pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "avi", "mov", "wmv", "flv", "webm"];
    pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "svg"];

    /// Extract host from URL, lowercased
    pub fn extract_host(url_str: &str) -> Option<String> {
        Url::parse(url_str)
            .ok()
            .and_then(|url| url.host_str().map(|h| h.to_ascii_lowercase()))
    }

    /// `host` equals `domain` or is a subdomain of it
    pub fn host_matches(host: &str, domain: &str) -> bool {
        host == domain || host.ends_with(&format!(".{}", domain))
    }

    /// Path of the URL with query and fragment dropped, lowercased.
    fn bare_path(url_str: &str) -> String {
        let end = url_str.find(['?', '#']).unwrap_or(url_str.len());
        url_str[..end].to_ascii_lowercase()
    }

    pub fn has_suffix(url_str: &str, suffix: &str) -> bool {
        bare_path(url_str).ends_with(suffix)
    }

    pub fn has_extension(url_str: &str, extensions: &[&str]) -> bool {
        let path = bare_path(url_str);
        extensions.iter().any(|ext| path.ends_with(&format!(".{}", ext)))
    }

    /// The listing API HTML-escapes ampersands inside URLs.
    pub fn unescape(url_str: &str) -> String {
        url_str.replace("&amp;", "&")
    }

    /// Validate http(s) URL format
    pub fn is_http_url(url_str: &str) -> bool {
        if let Ok(url) = Url::parse(url_str) {
            url.scheme() == "http" || url.scheme() == "https"
        } else {
            false
        }
    }
}
