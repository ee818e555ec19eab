use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_NAVIGATE_DELAY_MS: u64 = 100;
const DEFAULT_IMAGE_CONCURRENCY: usize = 4;
const DEFAULT_SHOW_PAGE_PREFIX: &str = "/object";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorConfig {
    /// Cosmetic pause between a successful save and the navigation signal.
    pub navigate_delay: Duration,
    /// Upper bound on image create/update/delete calls in flight at once.
    pub image_concurrency: usize,
    pub show_page_prefix: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            navigate_delay: Duration::from_millis(DEFAULT_NAVIGATE_DELAY_MS),
            image_concurrency: DEFAULT_IMAGE_CONCURRENCY,
            show_page_prefix: DEFAULT_SHOW_PAGE_PREFIX.to_string(),
        }
    }
}

impl EditorConfig {
    pub fn from_env() -> Self {
        let navigate_delay = parse_override::<u64>(
            "RECORDEDIT_NAVIGATE_DELAY_MS",
            env::var("RECORDEDIT_NAVIGATE_DELAY_MS").ok(),
        )
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_millis(DEFAULT_NAVIGATE_DELAY_MS));
        let image_concurrency = parse_override::<usize>(
            "RECORDEDIT_IMAGE_CONCURRENCY",
            env::var("RECORDEDIT_IMAGE_CONCURRENCY").ok(),
        )
        .unwrap_or(DEFAULT_IMAGE_CONCURRENCY)
        .max(1);
        let show_page_prefix = env::var("RECORDEDIT_SHOW_PAGE_PREFIX")
            .ok()
            .map(|raw| raw.trim().trim_end_matches('/').to_string())
            .filter(|raw| !raw.is_empty())
            .unwrap_or_else(|| DEFAULT_SHOW_PAGE_PREFIX.to_string());

        Self {
            navigate_delay,
            image_concurrency,
            show_page_prefix,
        }
    }

    pub fn with_navigate_delay(mut self, delay: Duration) -> Self {
        self.navigate_delay = delay;
        self
    }

    pub fn with_image_concurrency(mut self, limit: usize) -> Self {
        self.image_concurrency = limit.max(1);
        self
    }

    /// Link to a record's show page.
    pub fn show_page_link(&self, object_name_singular: &str, record_id: &str) -> String {
        format!("{}/{object_name_singular}/{record_id}", self.show_page_prefix)
    }
}

/// Parses an override, logging and discarding values that don't parse.
fn parse_override<T>(name: &str, raw: Option<String>) -> Option<T>
where
    T: FromStr,
    T::Err: Display,
{
    let raw = raw?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(variable = name, value = %raw, error = %err, "ignoring invalid override");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct CapturedLog(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn valid_override_is_parsed() {
        assert_eq!(
            parse_override::<u64>("RECORDEDIT_NAVIGATE_DELAY_MS", Some(" 250 ".into())),
            Some(250)
        );
        assert_eq!(parse_override::<u64>("RECORDEDIT_NAVIGATE_DELAY_MS", None), None);
    }

    #[test]
    fn invalid_override_is_logged_and_dropped() {
        let log = CapturedLog::default();
        let writer = log.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        let parsed = tracing::subscriber::with_default(subscriber, || {
            parse_override::<usize>("RECORDEDIT_IMAGE_CONCURRENCY", Some("lots".into()))
        });

        assert_eq!(parsed, None);
        let output = String::from_utf8(log.0.lock().unwrap().clone()).expect("utf8 log");
        assert!(output.contains("WARN"));
        assert!(output.contains("RECORDEDIT_IMAGE_CONCURRENCY"));
        assert!(output.contains("lots"));
    }

    #[test]
    fn defaults() {
        let config = EditorConfig::default();
        assert_eq!(config.navigate_delay, Duration::from_millis(100));
        assert_eq!(config.image_concurrency, 4);
        assert_eq!(
            config.show_page_link("property", "prop-1"),
            "/object/property/prop-1"
        );
    }

    #[test]
    fn concurrency_never_drops_below_one() {
        let config = EditorConfig::default().with_image_concurrency(0);
        assert_eq!(config.image_concurrency, 1);
    }
}
