//! Evolution stages derived from today's step count.
//!
//! An [`EvolutionTable`] is an ordered list of [`StageRule`]s that
//! partitions `[0, inf)` into contiguous, non-overlapping step ranges. The
//! last rule is unbounded. Stage lookup, progress, and steps-to-next are
//! pure functions of the table and a step count.
//!
//! The table is validated once at construction so every lookup afterwards
//! is total: for any `steps` exactly one rule matches.

use serde::Deserialize;

/// Errors raised when a stage table does not partition `[0, inf)`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvolutionError {
    /// The table has no rules.
    #[error("evolution table must contain at least one stage")]
    Empty,

    /// The first rule does not start at zero steps.
    #[error("first stage must start at 0 steps, found {min_steps}")]
    FirstMinNotZero {
        /// The offending lower bound.
        min_steps: u64,
    },

    /// Stage numbers are not 0, 1, 2, ... in table order.
    #[error("rule at position {position} has stage {stage}, expected {position}")]
    StageOrder {
        /// Position of the rule in the table.
        position: usize,
        /// Stage number found at that position.
        stage: u32,
    },

    /// A rule's upper bound is below its lower bound.
    #[error("stage {stage} has max {max_steps} below min {min_steps}")]
    Inverted {
        /// The offending stage.
        stage: u32,
        /// Its lower bound.
        min_steps: u64,
        /// Its upper bound.
        max_steps: u64,
    },

    /// Two neighbouring rules leave a gap or overlap.
    #[error("stage {stage} must start at {expected_min} steps, found {min_steps}")]
    NotContiguous {
        /// The stage whose lower bound is wrong.
        stage: u32,
        /// The lower bound implied by the previous rule.
        expected_min: u64,
        /// The lower bound found.
        min_steps: u64,
    },

    /// A rule other than the last is unbounded, or the last is bounded.
    #[error("only the final stage may be unbounded (stage {stage})")]
    Unbounded {
        /// The offending stage.
        stage: u32,
    },
}

/// One row of the stage table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StageRule {
    /// Stage number (0-based, equal to the rule's position).
    pub stage: u32,
    /// Display title of the stage.
    pub title: String,
    /// Smallest step count in this stage.
    pub min_steps: u64,
    /// Largest step count in this stage, `None` for the final stage.
    #[serde(default)]
    pub max_steps: Option<u64>,
}

impl StageRule {
    /// Whether `steps` falls inside this rule's range.
    pub fn contains(&self, steps: u64) -> bool {
        steps >= self.min_steps && self.max_steps.is_none_or(|max| steps <= max)
    }
}

/// A validated, ordered stage table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvolutionTable {
    rules: Vec<StageRule>,
}

impl EvolutionTable {
    /// Validate `rules` and build a table.
    ///
    /// # Errors
    ///
    /// Returns an [`EvolutionError`] if the rules do not partition `[0, inf)`
    /// in stage order.
    pub fn new(rules: Vec<StageRule>) -> Result<Self, EvolutionError> {
        let first = rules.first().ok_or(EvolutionError::Empty)?;
        if first.min_steps != 0 {
            return Err(EvolutionError::FirstMinNotZero {
                min_steps: first.min_steps,
            });
        }

        let last_position = rules.len().saturating_sub(1);
        let mut expected_min: u64 = 0;
        for (position, rule) in rules.iter().enumerate() {
            if usize::try_from(rule.stage).ok() != Some(position) {
                return Err(EvolutionError::StageOrder {
                    position,
                    stage: rule.stage,
                });
            }
            if rule.min_steps != expected_min {
                return Err(EvolutionError::NotContiguous {
                    stage: rule.stage,
                    expected_min,
                    min_steps: rule.min_steps,
                });
            }
            match rule.max_steps {
                Some(max_steps) if position < last_position => {
                    if max_steps < rule.min_steps {
                        return Err(EvolutionError::Inverted {
                            stage: rule.stage,
                            min_steps: rule.min_steps,
                            max_steps,
                        });
                    }
                    // A bounded rule ending at u64::MAX leaves no room for a successor.
                    expected_min = max_steps
                        .checked_add(1)
                        .ok_or(EvolutionError::Unbounded { stage: rule.stage })?;
                }
                None if position == last_position => {}
                _ => return Err(EvolutionError::Unbounded { stage: rule.stage }),
            }
        }

        Ok(Self { rules })
    }

    /// The rules in stage order.
    pub fn rules(&self) -> &[StageRule] {
        &self.rules
    }

    /// Number of stages.
    pub fn stage_count(&self) -> usize {
        self.rules.len()
    }

    /// The highest stage number.
    pub fn final_stage(&self) -> u32 {
        self.rules.last().map_or(0, |rule| rule.stage)
    }

    /// Look up the rule for `stage`.
    pub fn rule(&self, stage: u32) -> Option<&StageRule> {
        usize::try_from(stage)
            .ok()
            .and_then(|index| self.rules.get(index))
    }

    /// The stage whose range contains `steps`.
    ///
    /// Falls back to the final stage if no rule matches, which cannot happen
    /// for a validated table.
    pub fn stage_for(&self, steps: u64) -> u32 {
        self.rules
            .iter()
            .find(|rule| rule.contains(steps))
            .map_or_else(|| self.final_stage(), |rule| rule.stage)
    }

    /// Lower bound of the stage after `stage`, or `None` at the final stage.
    pub fn next_stage_threshold(&self, stage: u32) -> Option<u64> {
        stage
            .checked_add(1)
            .and_then(|next| self.rule(next))
            .map(|rule| rule.min_steps)
    }

    /// Fraction of the way from `stage`'s lower bound to the next stage,
    /// clamped to `[0, 1]`. Exactly `1.0` at the final stage.
    pub fn progress_fraction(&self, stage: u32, steps: u64) -> f64 {
        let (Some(rule), Some(next_min)) = (self.rule(stage), self.next_stage_threshold(stage))
        else {
            return 1.0;
        };
        let span = next_min.saturating_sub(rule.min_steps);
        if span == 0 {
            return 1.0;
        }
        let progress = steps.saturating_sub(rule.min_steps);
        #[allow(clippy::cast_precision_loss)]
        let fraction = progress as f64 / span as f64;
        fraction.clamp(0.0, 1.0)
    }

    /// Steps still needed to reach the next stage. Zero at the final stage.
    pub fn steps_to_next_stage(&self, stage: u32, steps: u64) -> u64 {
        self.next_stage_threshold(stage)
            .map_or(0, |next_min| next_min.saturating_sub(steps))
    }

    /// Display title of `stage`, or `"Stage N"` (1-based) for unknown stages.
    pub fn title_for(&self, stage: u32) -> String {
        self.rule(stage).map_or_else(
            || format!("Stage {}", stage.saturating_add(1)),
            |rule| rule.title.clone(),
        )
    }
}

impl Default for EvolutionTable {
    fn default() -> Self {
        Self {
            rules: default_stage_rules(),
        }
    }
}

/// The built-in four-stage table: Egg, Hatchling, Companion, Mythic.
pub fn default_stage_rules() -> Vec<StageRule> {
    let row = |stage: u32, title: &str, min_steps: u64, max_steps: Option<u64>| StageRule {
        stage,
        title: title.to_owned(),
        min_steps,
        max_steps,
    };
    vec![
        row(0, "Egg", 0, Some(2_999)),
        row(1, "Hatchling", 3_000, Some(6_499)),
        row(2, "Companion", 6_500, Some(9_999)),
        row(3, "Mythic", 10_000, None),
    ]
}
