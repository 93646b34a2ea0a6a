use crate::common::config::SessionConfig;

/// Terminal result of one verification attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Accepted,
    Rejected,
    /// Too many frames without a detectable face.
    Abandoned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    Continue,
    Done(Outcome),
}

/// Converts a noisy stream of per-frame identity checks into one terminal
/// decision. The match/mismatch counters are independent and monotonic over
/// the whole session, not a sliding window: 3 matches accept the instant the
/// third one lands, 10 mismatches reject, 50 missed frames abandon.
#[derive(Debug)]
pub struct VerificationSession {
    matches: u32,
    mismatches: u32,
    missed_frames: u32,
    limits: SessionConfig,
    outcome: Option<Outcome>,
}

impl VerificationSession {
    pub fn new(limits: SessionConfig) -> Self {
        Self {
            matches: 0,
            mismatches: 0,
            missed_frames: 0,
            limits,
            outcome: None,
        }
    }

    pub fn matches(&self) -> u32 {
        self.matches
    }

    pub fn mismatches(&self) -> u32 {
        self.mismatches
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    /// The frame contained no usable face.
    pub fn note_missed_frame(&mut self) -> Progress {
        if let Some(outcome) = self.outcome {
            return Progress::Done(outcome);
        }
        self.missed_frames += 1;
        if self.missed_frames >= self.limits.max_missed_frames {
            return self.finish(Outcome::Abandoned);
        }
        Progress::Continue
    }

    /// The frame produced a prediction and an identity-hash check result.
    pub fn note_match(&mut self, matched: bool) -> Progress {
        if let Some(outcome) = self.outcome {
            return Progress::Done(outcome);
        }
        if matched {
            self.matches += 1;
            if self.matches >= self.limits.required_matches {
                return self.finish(Outcome::Accepted);
            }
        } else {
            self.mismatches += 1;
            if self.mismatches >= self.limits.max_mismatches {
                return self.finish(Outcome::Rejected);
            }
        }
        Progress::Continue
    }

    fn finish(&mut self, outcome: Outcome) -> Progress {
        self.outcome = Some(outcome);
        Progress::Done(outcome)
    }
}
