mod args;

use args::{AnalyzeArgs, Args, Mode};
use serde::Serialize;
use slider_captcha_solver::captcha::StaticRegionDetector;
use slider_captcha_solver::captcha::assets::{decode_image, slice_sprite_sheet};
use slider_captcha_solver::captcha::session::RegionDetector;
use slider_captcha_solver::matching::{
    AssignmentResolver, BestMatch, ClickPlan, CoordinateMapper, DetectedRegion, FeatureMatcher,
};
use slider_captcha_solver::{CaptchaError, CaptchaResult, SolverConfig};
use std::path::Path;
use std::process::ExitCode;

#[derive(Debug, Serialize)]
struct AnalysisReport {
    background_size: (u32, u32),
    regions: Vec<DetectedRegion>,
    matches: Vec<BestMatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    click_plan: Option<ClickPlan>,
}

fn main() -> ExitCode {
    let args = match Args::parse() {
        Ok(Some(args)) => args,
        Ok(None) => return ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("❌ {}", e);
            args::print_help();
            return ExitCode::from(2);
        }
    };

    let level = if args.debug_mode {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    match args.mode {
        Mode::Analyze(analyze_args) => match analyze(&analyze_args) {
            Ok(report) => match serde_json::to_string_pretty(&report) {
                Ok(json) => {
                    println!("{}", json);
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("❌ Failed to serialize report: {}", e);
                    ExitCode::FAILURE
                }
            },
            Err(e) => {
                eprintln!("❌ Analysis failed: {}", e);
                ExitCode::FAILURE
            }
        },
    }
}

fn read_bytes(path: &Path) -> CaptchaResult<Vec<u8>> {
    std::fs::read(path).map_err(|e| CaptchaError::asset_read(path.display().to_string(), e))
}

/// Match local puzzle files without a browser or classifier
fn analyze(args: &AnalyzeArgs) -> CaptchaResult<AnalysisReport> {
    let background_name = args.background.display().to_string();
    let background = decode_image(&background_name, &read_bytes(&args.background)?)?;
    let sheet_name = args.sprites.display().to_string();
    let sheet = decode_image(&sheet_name, &read_bytes(&args.sprites)?)?;
    let sprites = slice_sprite_sheet(&sheet)?.map(|s| s.to_luma8());

    let regions_json = std::fs::read_to_string(&args.regions)?;
    let regions = StaticRegionDetector::from_json(&regions_json)
        .map_err(|e| CaptchaError::asset_read(args.regions.display().to_string(), e))?
        .detect(&[])
        .map_err(|e| CaptchaError::Model {
            reason: e.to_string(),
        })?;
    log::info!("Loaded {} candidate regions", regions.len());

    let config = SolverConfig::from_env();
    let resolver = AssignmentResolver::new(FeatureMatcher::new(config.matching));
    let assignment = resolver.resolve(&background.to_luma8(), &sprites, &regions)?;
    for m in &assignment.matches {
        log::info!(
            "Sprite {}: position {:?}, similarity {:.3}",
            m.score.sprite_index,
            m.center,
            m.score.similarity
        );
    }

    let background_size = (background.width(), background.height());
    let click_plan = args
        .rendered
        .map(|rendered| CoordinateMapper::new(background_size, rendered).plan(&assignment));

    Ok(AnalysisReport {
        background_size,
        regions,
        matches: assignment.matches.to_vec(),
        click_plan,
    })
}
