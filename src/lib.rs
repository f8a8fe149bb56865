pub mod captcha;
pub mod error;
pub mod matching;

pub use captcha::{AttemptController, SolveOutcome, SolverConfig};
pub use error::{CaptchaError, CaptchaResult};
