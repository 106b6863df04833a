//! User-Agent classification using woothee

use woothee::parser::Parser;

use crate::models::{DEFAULT_DEVICE_TYPE, UNKNOWN};

/// Value woothee reports for anything it could not determine
const WOOTHEE_UNKNOWN: &str = "UNKNOWN";

/// Browser, OS and device fields decomposed from a User-Agent string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    pub browser_name: String,
    pub browser_version: String,
    pub os_name: String,
    pub os_version: String,
    pub device_type: String,
}

impl ClientInfo {
    /// Classification used when the User-Agent is missing or unparseable
    pub fn unknown() -> Self {
        Self {
            browser_name: UNKNOWN.to_string(),
            browser_version: String::new(),
            os_name: UNKNOWN.to_string(),
            os_version: String::new(),
            device_type: DEFAULT_DEVICE_TYPE.to_string(),
        }
    }

    /// `"<browser name> <browser version>"`
    pub fn browser_label(&self) -> String {
        label(&self.browser_name, &self.browser_version)
    }

    /// `"<os name> <os version>"`, or just the name when it already names the
    /// release (woothee reports Windows as `"Windows 10"` + `"NT 10.0"`)
    pub fn os_label(&self) -> String {
        if names_release(&self.os_name) || self.os_version.starts_with("NT ") {
            self.os_name.clone()
        } else {
            label(&self.os_name, &self.os_version)
        }
    }
}

/// Last word of the name carries a digit, e.g. `"Windows 10"`, `"Windows 8.1"`
fn names_release(os_name: &str) -> bool {
    os_name
        .rsplit(' ')
        .next()
        .is_some_and(|word| word.chars().any(|c| c.is_ascii_digit()))
}

fn label(name: &str, version: &str) -> String {
    format!("{name} {version}").trim().to_string()
}

/// Classify a raw User-Agent string.
///
/// Never fails: anything woothee cannot determine comes back as `"Unknown"`
/// (names), an empty string (versions) or `"Desktop"` (device type).
pub fn classify(user_agent: &str) -> ClientInfo {
    let parser = Parser::new();
    let Some(result) = parser.parse(user_agent) else {
        return ClientInfo::unknown();
    };

    ClientInfo {
        browser_name: known(&result.name.to_string()).unwrap_or_else(|| UNKNOWN.to_string()),
        browser_version: known(&result.version.to_string()).unwrap_or_default(),
        os_name: known(&result.os.to_string()).unwrap_or_else(|| UNKNOWN.to_string()),
        os_version: known(&result.os_version.to_string()).unwrap_or_default(),
        device_type: device_type(&result.category.to_string()),
    }
}

fn known(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty() && value != WOOTHEE_UNKNOWN).then(|| value.to_string())
}

/// Desktop browsers (woothee's `pc`) and unclassified agents become `"Desktop"`;
/// every other category passes through unchanged
fn device_type(category: &str) -> String {
    match known(category).as_deref() {
        None | Some("pc") => DEFAULT_DEVICE_TYPE.to_string(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHROME_WINDOWS: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
    const SAFARI_IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_1 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Mobile/15E148 Safari/604.1";
    const GOOGLEBOT: &str =
        "Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)";

    #[test]
    fn test_classify_desktop_chrome() {
        let info = classify(CHROME_WINDOWS);

        assert_eq!(info.browser_name, "Chrome");
        assert!(info.browser_label().starts_with("Chrome 120"));
        assert_eq!(info.os_label(), "Windows 10");
        assert_eq!(info.device_type, "Desktop");
    }

    #[test]
    fn test_os_label_keeps_version_only_when_name_lacks_it() {
        let mut info = ClientInfo::unknown();

        info.os_name = "Mac OSX".to_string();
        info.os_version = "10.15.7".to_string();
        assert_eq!(info.os_label(), "Mac OSX 10.15.7");

        info.os_name = "Windows 8.1".to_string();
        info.os_version = "NT 6.3".to_string();
        assert_eq!(info.os_label(), "Windows 8.1");

        info.os_name = "Windows Vista".to_string();
        info.os_version = "NT 6.0".to_string();
        assert_eq!(info.os_label(), "Windows Vista");
    }

    #[test]
    fn test_classify_mobile_passes_category_through() {
        let info = classify(SAFARI_IPHONE);
        assert_eq!(info.device_type, "smartphone");
    }

    #[test]
    fn test_classify_crawler() {
        let info = classify(GOOGLEBOT);
        assert_eq!(info.device_type, "crawler");
    }

    #[test]
    fn test_classify_empty_user_agent() {
        let info = classify("");

        assert_eq!(info.browser_label(), "Unknown");
        assert_eq!(info.os_label(), "Unknown");
        assert_eq!(info.device_type, "Desktop");
    }

    #[test]
    fn test_label_trims_missing_version() {
        assert_eq!(label("Firefox", ""), "Firefox");
        assert_eq!(label("Firefox", "121.0"), "Firefox 121.0");
    }

    #[test]
    fn test_device_type_mapping() {
        assert_eq!(device_type("pc"), "Desktop");
        assert_eq!(device_type("UNKNOWN"), "Desktop");
        assert_eq!(device_type(""), "Desktop");
        assert_eq!(device_type("mobilephone"), "mobilephone");
    }
}
