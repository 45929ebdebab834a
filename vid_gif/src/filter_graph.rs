//! FFmpeg filter-graph assembly
//!
//! A graph is a list of chains separated by `;`. Each chain is a comma list
//! of filters with optional `[label]` pads in front of and behind it:
//!
//! ```text
//! fps=20,split[tmp1][tmp2];[tmp1]palettegen[pal];[tmp2][pal]paletteuse
//! ```

use std::fmt;

/// One linear chain of filters between labeled pads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterChain {
    inputs: Vec<String>,
    filters: Vec<String>,
    outputs: Vec<String>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(mut self, label: &str) -> Self {
        self.inputs.push(label.to_string());
        self
    }

    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filters.push(filter.into());
        self
    }

    pub fn filters<I, S>(mut self, filters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filters.extend(filters.into_iter().map(Into::into));
        self
    }

    pub fn output(mut self, label: &str) -> Self {
        self.outputs.push(label.to_string());
        self
    }

    /// A chain without filters renders as nothing at all.
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl fmt::Display for FilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return Ok(());
        }
        for label in &self.inputs {
            write!(f, "[{}]", label)?;
        }
        f.write_str(&self.filters.join(","))?;
        for label in &self.outputs {
            write!(f, "[{}]", label)?;
        }
        Ok(())
    }
}

/// Chains joined with `;`. Empty chains are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterGraph {
    chains: Vec<FilterChain>,
}

impl FilterGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chain(mut self, chain: FilterChain) -> Self {
        self.chains.push(chain);
        self
    }

    pub fn chains(&self) -> impl Iterator<Item = &FilterChain> {
        self.chains.iter().filter(|c| !c.is_empty())
    }
}

impl fmt::Display for FilterGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, chain) in self.chains().enumerate() {
            if i > 0 {
                f.write_str(";")?;
            }
            write!(f, "{}", chain)?;
        }
        Ok(())
    }
}
