// Types and enums for the attempt state machine
use crate::error::CaptchaError;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SolvePhase {
    #[default]
    Init,
    Downloading,
    Validating,
    AwaitingRegions,
    Matching,
    Assigning,
    Acting,
    Submitting,
    Verifying,
    Success,
    RetryableFailure,
    FatalFailure,
}

impl SolvePhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, SolvePhase::Success | SolvePhase::FatalFailure)
    }
}

impl fmt::Display for SolvePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SolvePhase::Init => "init",
            SolvePhase::Downloading => "downloading",
            SolvePhase::Validating => "validating",
            SolvePhase::AwaitingRegions => "awaiting-regions",
            SolvePhase::Matching => "matching",
            SolvePhase::Assigning => "assigning",
            SolvePhase::Acting => "acting",
            SolvePhase::Submitting => "submitting",
            SolvePhase::Verifying => "verifying",
            SolvePhase::Success => "success",
            SolvePhase::RetryableFailure => "retryable-failure",
            SolvePhase::FatalFailure => "fatal-failure",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttemptState {
    /// 0-based, below the configured retry limit
    pub attempt_number: u32,
    pub phase: SolvePhase,
    pub last_failure: Option<String>,
}

/// How a solve ended when it did not hit an unexpected error
#[derive(Debug)]
pub enum SolveOutcome {
    Success { attempts: u32 },
    /// Fatal failure or exhausted attempt budget
    Failed { attempts: u32, error: CaptchaError },
}

impl SolveOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SolveOutcome::Success { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            SolveOutcome::Success { attempts } | SolveOutcome::Failed { attempts, .. } => *attempts,
        }
    }
}
