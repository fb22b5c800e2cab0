//! Configuration access port trait.

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;

    /// Trimmed value, `None` when absent or blank.
    fn get_trimmed(&self, section: &str, key: &str) -> Option<String> {
        self.get_string(section, key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }
}
