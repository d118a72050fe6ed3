//! User-safe replies substituted for raw failure detail.

use anyhow::{Result, bail};
use rand::Rng;

/// Picks which fallback message to show.
pub trait FallbackSelector: Send + Sync {
    /// Return an index in `0..len`. `len` is always at least 1.
    fn select(&self, len: usize) -> usize;
}

/// Uniform random choice (the default).
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomSelector;

impl FallbackSelector for RandomSelector {
    fn select(&self, len: usize) -> usize {
        rand::thread_rng().gen_range(0..len)
    }
}

/// Always the same index; out-of-range indices wrap.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixedSelector(pub usize);

impl FallbackSelector for FixedSelector {
    fn select(&self, len: usize) -> usize {
        self.0 % len
    }
}

/// Non-empty set of fallback messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackMessages {
    messages: Vec<String>,
}

impl FallbackMessages {
    /// Blank entries are dropped; at least one message must remain.
    pub fn new(messages: Vec<String>) -> Result<Self> {
        let messages: Vec<String> = messages
            .into_iter()
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .collect();
        if messages.is_empty() {
            bail!("at least one fallback message is required");
        }
        Ok(Self { messages })
    }

    pub fn pick(&self, selector: &dyn FallbackSelector) -> &str {
        let index = selector.select(self.messages.len()) % self.messages.len();
        &self.messages[index]
    }

    pub fn as_slice(&self) -> &[String] {
        &self.messages
    }
}

impl Default for FallbackMessages {
    fn default() -> Self {
        Self {
            messages: relay_config::default_fallback_messages(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_drops_blank_entries() {
        let messages =
            FallbackMessages::new(vec![" ".into(), "Try later.".into(), "".into()]).unwrap();
        assert_eq!(messages.as_slice(), &["Try later.".to_string()]);
    }

    #[test]
    fn test_new_rejects_empty_set() {
        assert!(FallbackMessages::new(vec![]).is_err());
        assert!(FallbackMessages::new(vec!["  ".into()]).is_err());
    }

    #[test]
    fn test_fixed_selector_wraps() {
        let messages = FallbackMessages::new(vec!["a".into(), "b".into()]).unwrap();
        assert_eq!(messages.pick(&FixedSelector(0)), "a");
        assert_eq!(messages.pick(&FixedSelector(1)), "b");
        assert_eq!(messages.pick(&FixedSelector(3)), "b");
    }

    #[test]
    fn test_random_selector_stays_in_range() {
        let messages = FallbackMessages::default();
        for _ in 0..100 {
            let picked = messages.pick(&RandomSelector);
            assert!(messages.as_slice().iter().any(|m| m == picked));
        }
    }
}
