use std::sync::OnceLock;

use chrono::Utc;
use regex::Regex;

pub fn now_utc_iso() -> String {
    Utc::now().to_rfc3339()
}

/// Strips a trailing `?token=...` query from an uploaded file path.
pub fn path_without_token(path: &str) -> String {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    TOKEN
        .get_or_init(|| Regex::new(r"\?token=[^&]*$").expect("token pattern is valid"))
        .replace(path, "")
        .into_owned()
}
