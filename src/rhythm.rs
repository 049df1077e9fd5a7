//! Euclidean and step rhythms: boolean step patterns which can be turned into note events.

use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

use crate::{
    time::{Event, Fraction},
    Error, Result,
};

// -------------------------------------------------------------------------------------------------

/// Distributes `pulses` onsets as evenly as possible over `steps` steps (Bjorklund's algorithm).
pub fn bjorklund(pulses: usize, steps: usize) -> Vec<bool> {
    type Pattern = Vec<bool>;
    type Patterns = Vec<Pattern>;

    /// Recursively appends the trailing groups onto the front groups, one for one.
    fn combine_groups(mut front_groups: Patterns, mut last_groups: Patterns) -> Patterns {
        if last_groups.len() < 2 {
            front_groups.append(&mut last_groups);
            return front_groups;
        }
        let mut new_front_groups: Patterns =
            Vec::with_capacity(front_groups.len().min(last_groups.len()));
        while !front_groups.is_empty() && !last_groups.is_empty() {
            if let (Some(mut front_group), Some(mut last_group)) =
                (front_groups.pop(), last_groups.pop())
            {
                front_group.append(&mut last_group);
                new_front_groups.push(front_group);
            }
        }
        // whatever is left of either side becomes the new remainder
        front_groups.append(&mut last_groups);
        combine_groups(new_front_groups, front_groups)
    }

    if pulses == 0 {
        vec![false; steps]
    } else if pulses >= steps {
        vec![true; steps]
    } else {
        let front_groups = vec![vec![true]; pulses];
        let last_groups = vec![vec![false]; steps - pulses];
        combine_groups(front_groups, last_groups)
            .into_iter()
            .flatten()
            .collect()
    }
}

/// Cyclic left rotation by `n` steps. Negative values rotate right and any `n` wraps around.
pub fn rotate<T: Clone>(pattern: &[T], n: i64) -> Vec<T> {
    let mut rotated = pattern.to_vec();
    if !rotated.is_empty() {
        let shift = n.rem_euclid(rotated.len() as i64) as usize;
        rotated.rotate_left(shift);
    }
    rotated
}

// -------------------------------------------------------------------------------------------------

/// A step pattern which spreads evenly over a duration.
pub trait Rhythm: Display {
    /// One entry per step: true for onsets.
    fn pattern(&self) -> Vec<bool>;

    /// One `(onset, length)` event per onset step, each lasting a single step.
    fn to_events(&self, start: Fraction, duration: Fraction) -> Vec<Event> {
        let pattern = self.pattern();
        if pattern.is_empty() {
            return Vec::new();
        }
        let step = duration / Fraction::from(pattern.len() as i64);
        pattern
            .iter()
            .enumerate()
            .filter(|(_, onset)| **onset)
            .map(|(index, _)| (start + step * Fraction::from(index as i64), step))
            .collect()
    }
}

// -------------------------------------------------------------------------------------------------

/// A rotated Euclidean rhythm, written as `"euclidean <pulses> <steps> <rotation>"`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EuclideanRhythm {
    pulses: usize,
    steps: usize,
    rotation: i64,
}

impl EuclideanRhythm {
    pub fn new(pulses: usize, steps: usize) -> Self {
        Self {
            pulses,
            steps,
            rotation: 0,
        }
    }

    #[must_use]
    pub fn with_rotation(self, rotation: i64) -> Self {
        Self { rotation, ..self }
    }

    pub fn pulses(&self) -> usize {
        self.pulses
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn rotation(&self) -> i64 {
        self.rotation
    }
}

impl Rhythm for EuclideanRhythm {
    fn pattern(&self) -> Vec<bool> {
        rotate(&bjorklund(self.pulses, self.steps), self.rotation)
    }
}

impl Display for EuclideanRhythm {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "euclidean {} {} {}", self.pulses, self.steps, self.rotation)
    }
}

impl FromStr for EuclideanRhythm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts = s.split_whitespace().collect::<Vec<_>>();
        let ["euclidean", pulses, steps, rotation] = parts.as_slice() else {
            return Err(Error::rhythm(
                s,
                "expected 'euclidean <pulses> <steps> <rotation>'",
            ));
        };
        let pulses = pulses
            .parse::<usize>()
            .map_err(|err| Error::rhythm(s, format!("invalid pulses: {}", err)))?;
        let steps = steps
            .parse::<usize>()
            .map_err(|err| Error::rhythm(s, format!("invalid steps: {}", err)))?;
        let rotation = rotation
            .parse::<i64>()
            .map_err(|err| Error::rhythm(s, format!("invalid rotation: {}", err)))?;
        if pulses > steps {
            return Err(Error::rhythm(s, "pulses must not exceed steps"));
        }
        Ok(Self::new(pulses, steps).with_rotation(rotation))
    }
}

// -------------------------------------------------------------------------------------------------

/// An explicit step pattern, written as a string of `0` and `1` characters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StepRhythm {
    steps: Vec<bool>,
}

impl StepRhythm {
    pub fn new(steps: Vec<bool>) -> Self {
        Self { steps }
    }
}

impl Rhythm for StepRhythm {
    fn pattern(&self) -> Vec<bool> {
        self.steps.clone()
    }
}

impl From<&EuclideanRhythm> for StepRhythm {
    fn from(rhythm: &EuclideanRhythm) -> Self {
        Self::new(rhythm.pattern())
    }
}

impl Display for StepRhythm {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for step in &self.steps {
            write!(f, "{}", if *step { '1' } else { '0' })?;
        }
        Ok(())
    }
}

impl FromStr for StepRhythm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::rhythm(s, "empty step pattern"));
        }
        let steps = s
            .chars()
            .map(|c| match c {
                '0' => Ok(false),
                '1' => Ok(true),
                _ => Err(Error::rhythm(s, format!("unexpected character '{}'", c))),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(steps))
    }
}

/// Parse either rhythm string form.
pub fn parse_rhythm(s: &str) -> Result<Box<dyn Rhythm>> {
    if s.trim_start().starts_with("euclidean") {
        Ok(Box::new(s.parse::<EuclideanRhythm>()?))
    } else {
        Ok(Box::new(s.parse::<StepRhythm>()?))
    }
}

// --------------------------------------------------------------------------------------------------
