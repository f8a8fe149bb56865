// Attempt controller: drives download -> validate -> match -> act -> verify
use super::assets::{AssetStore, BACKGROUND, PuzzleAsset, SPRITE_SHEET};
use super::config::SolverConfig;
use super::download::Downloader;
use super::log_sink::LogSink;
use super::session::{InteractiveSession, RegionDetector, SessionError, ValidityClassifier};
use super::types::{AttemptState, SolveOutcome, SolvePhase};
use super::validity::SpriteValidator;
use crate::error::{CaptchaError, CaptchaResult};
use crate::matching::{
    AssignmentResolver, AssignmentResult, CoordinateMapper, FeatureMatcher,
    background_url_from_style, resolve_rendered_size,
};
use log::Level;
use std::time::Duration;

// Send a message to the log facade and keep a copy in the sink
macro_rules! report {
    ($sink:expr, $level:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        log::log!($level, "{}", message);
        $sink.record($level, &message);
    }};
}

pub struct AttemptController<'a> {
    session: &'a mut dyn InteractiveSession,
    detector: &'a dyn RegionDetector,
    classifier: &'a dyn ValidityClassifier,
    downloader: &'a dyn Downloader,
    sink: &'a mut dyn LogSink,
    config: SolverConfig,
    resolver: AssignmentResolver,
    store: AssetStore,
    state: AttemptState,
}

impl<'a> AttemptController<'a> {
    pub fn new(
        session: &'a mut dyn InteractiveSession,
        detector: &'a dyn RegionDetector,
        classifier: &'a dyn ValidityClassifier,
        downloader: &'a dyn Downloader,
        sink: &'a mut dyn LogSink,
        config: SolverConfig,
    ) -> Self {
        let resolver = AssignmentResolver::new(FeatureMatcher::new(config.matching.clone()));
        Self {
            session,
            detector,
            classifier,
            downloader,
            sink,
            config,
            resolver,
            store: AssetStore::new(),
            state: AttemptState::default(),
        }
    }

    /// Use a specific store, e.g. one that mirrors assets to disk
    pub fn with_store(mut self, store: AssetStore) -> Self {
        self.store = store;
        self
    }

    pub fn state(&self) -> &AttemptState {
        &self.state
    }

    pub fn store(&self) -> &AssetStore {
        &self.store
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Run attempts until success, a fatal failure or the attempt budget runs out.
    ///
    /// Retryable failures refresh the puzzle and start over. Errors that are
    /// neither retryable nor fatal are returned as `Err` straight away.
    pub fn solve(&mut self) -> CaptchaResult<SolveOutcome> {
        self.state = AttemptState::default();
        let limit = self.config.retry_limit;
        if limit == 0 {
            let error = CaptchaError::RetryLimitExceeded {
                limit,
                last_reason: "no attempts allowed".to_string(),
            };
            return Ok(self.fail(error, 0));
        }

        loop {
            let attempt = self.state.attempt_number + 1;
            report!(self.sink, Level::Info, "Captcha attempt {}/{}", attempt, limit);

            let error = match self.run_attempt() {
                Ok(()) => {
                    self.enter(SolvePhase::Success);
                    report!(self.sink, Level::Info, "✅ Captcha solved on attempt {}", attempt);
                    return Ok(SolveOutcome::Success { attempts: attempt });
                }
                Err(e) => e,
            };

            if error.is_fatal() {
                return Ok(self.fail(error, attempt));
            }
            if !error.is_retryable() {
                self.state.last_failure = Some(error.to_string());
                report!(self.sink, Level::Error, "❌ Unexpected error: {}", error);
                return Err(error);
            }

            let reason = error.to_string();
            self.state.last_failure = Some(reason.clone());
            self.enter(SolvePhase::RetryableFailure);
            report!(self.sink, Level::Warn, "⚠️ Attempt {} failed: {}", attempt, reason);

            // Every retryable failure leaves a fresh puzzle behind, even the last one
            if let Err(error) = self.refresh() {
                return Ok(self.fail(error, attempt));
            }
            if attempt >= limit {
                let error = CaptchaError::RetryLimitExceeded {
                    limit,
                    last_reason: reason,
                };
                return Ok(self.fail(error, attempt));
            }
            self.state.attempt_number += 1;
        }
    }

    fn fail(&mut self, error: CaptchaError, attempts: u32) -> SolveOutcome {
        self.state.last_failure = Some(error.to_string());
        self.enter(SolvePhase::FatalFailure);
        report!(self.sink, Level::Error, "❌ Captcha failed: {}", error);
        SolveOutcome::Failed { attempts, error }
    }

    fn enter(&mut self, phase: SolvePhase) {
        self.state.phase = phase;
        report!(self.sink, Level::Debug, "Phase: {}", phase);
    }

    fn run_attempt(&mut self) -> CaptchaResult<()> {
        self.enter(SolvePhase::Init);
        self.store.clear()?;

        self.enter(SolvePhase::Downloading);
        let element = self.session.background_element().map_err(element_error)?;
        let background_url = background_url_from_style(element.style.as_deref())?;
        let sprite_url = self.session.sprite_sheet_url().map_err(element_error)?;
        let background = self.download(&background_url)?;
        self.store.put(BACKGROUND, background)?;
        let sheet = self.download(&sprite_url)?;
        self.store.put(SPRITE_SHEET, sheet)?;
        let puzzle = PuzzleAsset::decode(&self.store)?;

        self.enter(SolvePhase::Validating);
        SpriteValidator::new(self.classifier, &self.config)
            .check(&mut self.store, &puzzle)?
            .into_result()?;

        self.enter(SolvePhase::AwaitingRegions);
        let regions = self
            .detector
            .detect(self.store.get(BACKGROUND)?)
            .map_err(|e| CaptchaError::Model {
                reason: e.to_string(),
            })?;
        report!(self.sink, Level::Info, "Detected {} candidate regions", regions.len());

        self.enter(SolvePhase::Matching);
        let best = self
            .resolver
            .scan(&puzzle.background_gray(), &puzzle.sprites_gray(), &regions);

        self.enter(SolvePhase::Assigning);
        let assignment = AssignmentResolver::validate(best)?;
        for m in &assignment.matches {
            report!(
                self.sink,
                Level::Info,
                "Sprite {}: position {:?}, similarity {:.3}",
                m.score.sprite_index,
                m.center,
                m.score.similarity
            );
        }

        self.enter(SolvePhase::Acting);
        self.act(puzzle.background_size(), &assignment)?;

        self.enter(SolvePhase::Submitting);
        self.session
            .click_submit()
            .map_err(|e| CaptchaError::interaction_unavailable("submit", e))?;

        self.enter(SolvePhase::Verifying);
        sleep(self.config.settle_delay);
        let class = self.session.result_indicator_class().map_err(element_error)?;
        if class.contains(&self.config.success_marker) {
            Ok(())
        } else {
            Err(CaptchaError::Rejected { class })
        }
    }

    /// Click every sprite position in sprite order.
    ///
    /// The element is re-read before each click since it can move or rescale.
    fn act(&mut self, raw_size: (u32, u32), assignment: &AssignmentResult) -> CaptchaResult<()> {
        for m in &assignment.matches {
            let element = self.session.background_element().map_err(element_error)?;
            let rendered = resolve_rendered_size(element.style.as_deref(), element.measured_size)?;
            let (x, y) = m.center;
            let offset = CoordinateMapper::new(raw_size, rendered).to_screen(x as f64, y as f64);
            let (dx, dy) = offset.to_pixels();
            report!(
                self.sink,
                Level::Debug,
                "Clicking sprite {} at offset ({}, {})",
                m.score.sprite_index,
                dx,
                dy
            );
            self.session.click_at_offset(dx, dy).map_err(element_error)?;
        }
        Ok(())
    }

    fn download(&mut self, url: &str) -> CaptchaResult<Vec<u8>> {
        self.downloader
            .fetch(url)
            .map_err(|e| CaptchaError::AssetFetch {
                url: url.to_string(),
                reason: e.to_string(),
            })
    }

    /// Ask for a new puzzle; failing to do so ends the solve
    fn refresh(&mut self) -> CaptchaResult<()> {
        report!(self.sink, Level::Info, "🔄 Refreshing puzzle");
        sleep(self.config.refresh_delay);
        self.session
            .click_reload()
            .map_err(|e| CaptchaError::interaction_unavailable("reload", e))?;
        sleep(self.config.refresh_delay);
        Ok(())
    }
}

// A puzzle element that is late or gone usually means the puzzle changed under us
fn element_error(err: SessionError) -> CaptchaError {
    match err {
        SessionError::Timeout { what } | SessionError::ElementMissing { what } => {
            CaptchaError::ElementTimeout { what }
        }
        other => CaptchaError::from(other),
    }
}

fn sleep(delay: Duration) {
    if !delay.is_zero() {
        std::thread::sleep(delay);
    }
}
