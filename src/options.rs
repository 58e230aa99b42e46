//! Short/long option allocation for a single parser build.
//!
//! Generated flags are derived from the parameter name itself: the long form
//! from the full name, the short form from the first free letter of the name
//! (lowercased for affirmative options, uppercased for negative ones). The
//! registry tracks what has been handed out so no two parameters of one task
//! collide; nothing is shared across tasks.

use std::collections::HashSet;
use std::fmt;

use thiserror::Error;

const HELP_SHORT: &str = "-h";
const HELP_LONG: &str = "--help";

/// Whether an option leans the destination towards its declared value
/// (`Yes`) or away from it (`No`, the `--no-` form).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    Yes,
    No,
}

/// Allocation failures.
///
/// There is no renaming fallback beyond the deterministic character scan, so
/// any of these aborts the parser build.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptionError {
    #[error("option `{0}` is already reserved")]
    Reserved(String),
    #[error("no free short option for `{0}`")]
    NoFreeShort(String),
    #[error("no free long option for `{0}`")]
    NoFreeLong(String),
}

/// A short/long option pair allocated for one parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionPair {
    pub short: char,
    /// Long form including its leading dashes, e.g. `--dry-run`.
    pub long: String,
}

impl OptionPair {
    /// The short option as written on a command line, e.g. `-v`.
    #[must_use]
    pub fn short_flag(&self) -> String {
        format!("-{}", self.short)
    }

    /// The long option without its leading dashes.
    #[must_use]
    pub fn long_name(&self) -> &str {
        self.long.trim_start_matches('-')
    }
}

impl fmt::Display for OptionPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "-{}/{}", self.short, self.long)
    }
}

/// Tracks free short-option letters and reserved option strings while one
/// task's parser is being built.
#[derive(Debug, Clone)]
pub struct OptionRegistry {
    free_yes: HashSet<char>,
    free_no: HashSet<char>,
    reserved: HashSet<String>,
}

impl OptionRegistry {
    /// Registry with the default `a`-`z`/`A`-`Z` letter pools.
    #[must_use]
    pub fn new() -> Self {
        Self::with_pools('a'..='z', 'A'..='Z')
    }

    /// Registry with explicit letter pools. `-h`/`--help` start out
    /// reserved regardless of the pools.
    #[must_use]
    pub fn with_pools(
        yes: impl IntoIterator<Item = char>,
        no: impl IntoIterator<Item = char>,
    ) -> Self {
        let mut registry = OptionRegistry {
            free_yes: yes.into_iter().collect(),
            free_no: no.into_iter().collect(),
            reserved: HashSet::new(),
        };
        registry.reserve_short_unchecked(HELP_SHORT);
        registry.reserve_long_unchecked(HELP_LONG);
        registry
    }

    /// Fail if `option` has already been reserved.
    ///
    /// # Errors
    ///
    /// Returns [`OptionError::Reserved`] naming the option.
    pub fn check_free(&self, option: &str) -> Result<(), OptionError> {
        if self.reserved.contains(option) {
            return Err(OptionError::Reserved(option.to_string()));
        }
        Ok(())
    }

    /// Reserve a specific short option string such as `-x`, taking its
    /// letter out of both pools.
    ///
    /// # Errors
    ///
    /// Returns [`OptionError::Reserved`] if the option is already taken.
    pub fn reserve_short(&mut self, option: &str) -> Result<(), OptionError> {
        self.check_free(option)?;
        self.reserve_short_unchecked(option);
        Ok(())
    }

    /// Reserve a specific long option string such as `--example`.
    ///
    /// # Errors
    ///
    /// Returns [`OptionError::Reserved`] if the option is already taken.
    pub fn reserve_long(&mut self, option: &str) -> Result<(), OptionError> {
        self.check_free(option)?;
        self.reserve_long_unchecked(option);
        Ok(())
    }

    /// Reserve both halves of a pair. Both are checked before either is
    /// taken, so a failure leaves the registry untouched.
    ///
    /// # Errors
    ///
    /// Returns [`OptionError::Reserved`] if either half is already taken.
    pub fn reserve(&mut self, pair: &OptionPair) -> Result<(), OptionError> {
        let short = pair.short_flag();
        self.check_free(&short)?;
        self.check_free(&pair.long)?;
        self.reserve_short_unchecked(&short);
        self.reserve_long_unchecked(&pair.long);
        Ok(())
    }

    /// The first free letter of `dest`, scanning the name's own characters
    /// left to right. `Yes` scans the lowercased name against the lowercase
    /// pool, `No` the uppercased name against the uppercase pool.
    ///
    /// # Errors
    ///
    /// Returns [`OptionError::NoFreeShort`] when every candidate letter is
    /// taken.
    pub fn find_free_short(&self, polarity: Polarity, dest: &str) -> Result<char, OptionError> {
        let (candidates, pool) = match polarity {
            Polarity::Yes => (dest.to_lowercase(), &self.free_yes),
            Polarity::No => (dest.to_uppercase(), &self.free_no),
        };
        for c in candidates.chars() {
            if pool.contains(&c) && !self.reserved.contains(&format!("-{c}")) {
                return Ok(c);
            }
        }
        Err(OptionError::NoFreeShort(dest.to_string()))
    }

    /// The long form derived from the full name: underscores become
    /// hyphens, and `No` polarity gets a `no-` prefix. Long names are never
    /// perturbed; if the exact string is taken, allocation fails.
    ///
    /// # Errors
    ///
    /// Returns [`OptionError::NoFreeLong`] when the derived name is taken.
    pub fn find_free_long(&self, polarity: Polarity, dest: &str) -> Result<String, OptionError> {
        let mut option = String::from("--");
        if polarity == Polarity::No {
            option.push_str("no-");
        }
        option.push_str(&dest.replace('_', "-"));
        if self.reserved.contains(&option) {
            return Err(OptionError::NoFreeLong(dest.to_string()));
        }
        Ok(option)
    }

    /// A free short/long pair for `dest`, found but not yet reserved.
    ///
    /// # Errors
    ///
    /// Propagates the short or long scan failure.
    pub fn find_free(&self, polarity: Polarity, dest: &str) -> Result<OptionPair, OptionError> {
        Ok(OptionPair {
            short: self.find_free_short(polarity, dest)?,
            long: self.find_free_long(polarity, dest)?,
        })
    }

    /// Find and reserve a pair in one step.
    ///
    /// # Errors
    ///
    /// Propagates the short or long scan failure.
    pub fn assign(&mut self, polarity: Polarity, dest: &str) -> Result<OptionPair, OptionError> {
        let pair = self.find_free(polarity, dest)?;
        self.reserve_short_unchecked(&pair.short_flag());
        self.reserve_long_unchecked(&pair.long);
        Ok(pair)
    }

    /// [`Self::assign`] with `Yes` polarity, the common case for value
    /// flags.
    ///
    /// # Errors
    ///
    /// Propagates the short or long scan failure.
    pub fn assign_yes(&mut self, dest: &str) -> Result<OptionPair, OptionError> {
        self.assign(Polarity::Yes, dest)
    }

    fn reserve_short_unchecked(&mut self, option: &str) {
        if let Some(c) = option.strip_prefix('-').and_then(|rest| rest.chars().next()) {
            self.free_yes.remove(&c);
            self.free_no.remove(&c);
        }
        self.reserved.insert(option.to_string());
    }

    fn reserve_long_unchecked(&mut self, option: &str) {
        self.reserved.insert(option.to_string());
    }
}

impl Default for OptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
