//! Skip Filter: veto delivery when a rendered message matches a pattern.

use regex::Regex;
use tracing::info;

use crate::error::{Mail2MatrixError, Result};

/// An ordered set of compiled skip patterns.
///
/// Built once from configuration and never mutated afterwards.
#[derive(Debug, Clone, Default)]
pub struct SkipFilter {
    patterns: Vec<Regex>,
}

impl SkipFilter {
    /// Compile `patterns` in order. The first invalid one aborts with
    /// [`Mail2MatrixError::Pattern`] naming it.
    pub fn new<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| {
                let p = p.as_ref();
                Regex::new(p).map_err(|source| Mail2MatrixError::Pattern {
                    pattern: p.to_string(),
                    source,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    /// `false` as soon as any pattern matches anywhere in `rendered`.
    pub fn should_forward(&self, rendered: &str) -> bool {
        match self.patterns.iter().find(|re| re.is_match(rendered)) {
            Some(re) => {
                info!(pattern = re.as_str(), "Message matched skip pattern");
                false
            }
            None => true,
        }
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
