//! Dice rolling and skill checks.
//!
//! Supports dice formulas like "1d20+5", "2d6-1", "d8". Randomness is injected
//! through [`DiceRoller`] so hosts can swap in seeded or manually entered dice.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Source of individual die results.
pub trait DiceRoller {
    /// Roll a single die, returning a value in `1..=sides`.
    fn roll_die(&mut self, sides: u32) -> u32;
}

/// Roller backed by a random number generator.
#[derive(Debug, Clone)]
pub struct RngRoller<R = ChaCha8Rng> {
    rng: R,
}

impl RngRoller<ChaCha8Rng> {
    /// Reproducible roller; the same seed yields the same session.
    pub fn seeded(seed: u64) -> Self {
        Self::new(ChaCha8Rng::seed_from_u64(seed))
    }

    /// Roller seeded from operating system entropy.
    pub fn from_entropy() -> Self {
        Self::new(ChaCha8Rng::from_entropy())
    }
}

impl<R: Rng> RngRoller<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> DiceRoller for RngRoller<R> {
    fn roll_die(&mut self, sides: u32) -> u32 {
        self.rng.gen_range(1..=sides.max(1))
    }
}

/// Roller that replays forced results, e.g. physical dice typed in by the table.
///
/// Once the queue is exhausted every roll returns `fallback`. Results are
/// clamped into the die's range.
#[derive(Debug, Clone, Default)]
pub struct FixedRoller {
    queue: VecDeque<u32>,
    fallback: u32,
}

impl FixedRoller {
    pub fn new(results: impl IntoIterator<Item = u32>) -> Self {
        Self {
            queue: results.into_iter().collect(),
            fallback: 1,
        }
    }

    /// Roller that always returns the same value.
    pub fn always(value: u32) -> Self {
        Self {
            queue: VecDeque::new(),
            fallback: value,
        }
    }

    /// Queue another forced result.
    pub fn push(&mut self, value: u32) {
        self.queue.push_back(value);
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }
}

impl DiceRoller for FixedRoller {
    fn roll_die(&mut self, sides: u32) -> u32 {
        let value = self.queue.pop_front().unwrap_or(self.fallback);
        value.clamp(1, sides.max(1))
    }
}

/// Error when parsing a dice formula.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiceParseError {
    #[error("Empty dice formula")]
    Empty,
    #[error("Invalid dice format: {0}")]
    InvalidFormat(String),
    #[error("Dice count must be at least 1")]
    InvalidDiceCount,
    #[error("Die size must be at least 2")]
    InvalidDieSize,
    #[error("At most 100 dice per formula")]
    TooManyDice,
    #[error("Die size must be at most 1000")]
    DieTooLarge,
}

/// Upper bound on the dice in one formula.
pub const MAX_DICE: u32 = 100;
/// Upper bound on the sides of one die.
pub const MAX_DIE_SIZE: u32 = 1000;

/// A parsed dice formula like "2d6+3".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DiceFormula {
    /// Number of dice to roll (X in XdY).
    pub dice_count: u32,
    /// Size of each die (Y in XdY).
    pub die_size: u32,
    /// Modifier added after rolling (+Z or -Z).
    pub modifier: i32,
}

impl DiceFormula {
    pub fn new(dice_count: u32, die_size: u32, modifier: i32) -> Result<Self, DiceParseError> {
        if dice_count == 0 {
            return Err(DiceParseError::InvalidDiceCount);
        }
        if dice_count > MAX_DICE {
            return Err(DiceParseError::TooManyDice);
        }
        if die_size < 2 {
            return Err(DiceParseError::InvalidDieSize);
        }
        if die_size > MAX_DIE_SIZE {
            return Err(DiceParseError::DieTooLarge);
        }
        Ok(Self {
            dice_count,
            die_size,
            modifier,
        })
    }

    /// Parse a dice formula string.
    ///
    /// Supported formats: "XdY", "XdY+Z", "XdY-Z" and the shorthand "dY".
    pub fn parse(input: &str) -> Result<Self, DiceParseError> {
        let input = input.trim().to_lowercase();
        if input.is_empty() {
            return Err(DiceParseError::Empty);
        }

        let d_pos = input.find('d').ok_or_else(|| {
            DiceParseError::InvalidFormat(format!("Missing 'd' separator in '{}'", input))
        })?;

        let count_str = &input[..d_pos];
        let dice_count: u32 = if count_str.is_empty() {
            1
        } else {
            count_str.parse().map_err(|_| {
                DiceParseError::InvalidFormat(format!("Invalid dice count: '{}'", count_str))
            })?
        };

        let after_d = &input[d_pos + 1..];
        let (size_str, modifier) = match after_d.find(['+', '-']) {
            Some(0) => {
                return Err(DiceParseError::InvalidFormat(format!(
                    "Invalid die size: '{}'",
                    after_d
                )))
            }
            Some(pos) => {
                let modifier: i32 = after_d[pos + 1..].parse().map_err(|_| {
                    DiceParseError::InvalidFormat(format!("Invalid modifier: '{}'", &after_d[pos..]))
                })?;
                let sign = if after_d.as_bytes()[pos] == b'-' { -1 } else { 1 };
                (&after_d[..pos], sign * modifier)
            }
            None => (after_d, 0),
        };

        let die_size: u32 = size_str.parse().map_err(|_| {
            DiceParseError::InvalidFormat(format!("Invalid die size: '{}'", size_str))
        })?;

        Self::new(dice_count, die_size, modifier)
    }

    /// Roll the dice and return the result.
    pub fn roll(&self, roller: &mut dyn DiceRoller) -> DiceRollResult {
        let individual_rolls: Vec<u32> = (0..self.dice_count)
            .map(|_| roller.roll_die(self.die_size))
            .collect();
        let dice_total = individual_rolls
            .iter()
            .fold(0i32, |sum, &r| sum.saturating_add(to_i32(r)));

        DiceRollResult {
            formula: *self,
            individual_rolls,
            dice_total,
            total: dice_total.saturating_add(self.modifier),
        }
    }

    /// Get the minimum possible roll.
    pub fn min_roll(&self) -> i32 {
        to_i32(self.dice_count).saturating_add(self.modifier)
    }

    /// Get the maximum possible roll.
    pub fn max_roll(&self) -> i32 {
        to_i32(self.dice_count.saturating_mul(self.die_size)).saturating_add(self.modifier)
    }
}

fn to_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

impl fmt::Display for DiceFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.modifier {
            0 => write!(f, "{}d{}", self.dice_count, self.die_size),
            m if m > 0 => write!(f, "{}d{}+{}", self.dice_count, self.die_size, m),
            m => write!(f, "{}d{}{}", self.dice_count, self.die_size, m),
        }
    }
}

impl FromStr for DiceFormula {
    type Err = DiceParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DiceFormula {
    type Error = DiceParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<DiceFormula> for String {
    fn from(formula: DiceFormula) -> Self {
        formula.to_string()
    }
}

/// Result of rolling dice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiceRollResult {
    pub formula: DiceFormula,
    pub individual_rolls: Vec<u32>,
    /// Sum of dice before modifier.
    pub dice_total: i32,
    /// Final total (dice_total + modifier).
    pub total: i32,
}

/// A d20 check: roll + modifier against a difficulty class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillCheck {
    pub modifier: i32,
    pub dc: i32,
}

impl SkillCheck {
    pub fn new(modifier: i32, dc: i32) -> Self {
        Self { modifier, dc }
    }

    /// Roll 1d20 and compare the total against the DC. Meeting the DC succeeds.
    pub fn resolve(&self, roller: &mut dyn DiceRoller) -> CheckResult {
        let roll = roller.roll_die(20);
        let total = to_i32(roll).saturating_add(self.modifier);
        CheckResult {
            roll,
            modifier: self.modifier,
            total,
            dc: self.dc,
            success: total >= self.dc,
        }
    }
}

/// Outcome of a resolved skill check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResult {
    /// Natural d20 result.
    pub roll: u32,
    pub modifier: i32,
    pub total: i32,
    pub dc: i32,
    pub success: bool,
}

impl CheckResult {
    /// Format as a breakdown string (e.g., "d20(13) + 2 = 15 vs DC 15: success").
    pub fn breakdown(&self) -> String {
        let sign = if self.modifier < 0 { '-' } else { '+' };
        format!(
            "d20({}) {} {} = {} vs DC {}: {}",
            self.roll,
            sign,
            self.modifier.unsigned_abs(),
            self.total,
            self.dc,
            if self.success { "success" } else { "failure" }
        )
    }
}
