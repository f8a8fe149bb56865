use slider_captcha_solver::matching::RenderedSize;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub enum Mode {
    Analyze(AnalyzeArgs),
}

#[derive(Debug, Clone)]
pub struct AnalyzeArgs {
    pub background: PathBuf,
    pub sprites: PathBuf,
    pub regions: PathBuf,
    pub rendered: Option<RenderedSize>,
}

#[derive(Debug)]
pub struct Args {
    pub mode: Mode,
    pub debug_mode: bool,
}

impl Args {
    /// `Ok(None)` when help or version was printed
    pub fn parse() -> Result<Option<Self>, String> {
        Self::parse_from(env::args().skip(1))
    }

    pub fn parse_from(args: impl IntoIterator<Item = String>) -> Result<Option<Self>, String> {
        let mut args = args.into_iter();

        let mut command: Option<String> = None;
        let mut debug_mode: bool = false;
        let mut background: Option<PathBuf> = None;
        let mut sprites: Option<PathBuf> = None;
        let mut regions: Option<PathBuf> = None;
        let mut rendered: Option<RenderedSize> = None;

        while let Some(arg) = args.next() {
            let mut value = |flag: &str| {
                args.next()
                    .ok_or_else(|| format!("Missing value for {}", flag))
            };
            match arg.as_str() {
                "--help" | "-h" => {
                    print_help();
                    return Ok(None);
                }
                "--version" | "-v" => {
                    println!("Slider Captcha Solver v{}", env!("CARGO_PKG_VERSION"));
                    return Ok(None);
                }
                "--debug" => debug_mode = true,
                "--background" => background = Some(value("--background")?.into()),
                "--sprites" => sprites = Some(value("--sprites")?.into()),
                "--regions" => regions = Some(value("--regions")?.into()),
                "--rendered" => rendered = Some(parse_size(&value("--rendered")?)?),
                other if other.starts_with('-') => {
                    return Err(format!("Unknown argument: {}", other));
                }
                other if command.is_none() => command = Some(other.to_string()),
                other => return Err(format!("Unexpected argument: {}", other)),
            }
        }

        let mode = match command.as_deref() {
            Some("analyze") => Mode::Analyze(AnalyzeArgs {
                background: background.ok_or("analyze needs --background <img>")?,
                sprites: sprites.ok_or("analyze needs --sprites <img>")?,
                regions: regions.ok_or("analyze needs --regions <json>")?,
                rendered,
            }),
            Some(other) => return Err(format!("Unknown command: {}", other)),
            None => return Err("No command given".to_string()),
        };

        Ok(Some(Args { mode, debug_mode }))
    }
}

/// `WIDTHxHEIGHT`, fractional values allowed
fn parse_size(raw: &str) -> Result<RenderedSize, String> {
    let invalid = || format!("Invalid size '{}', expected WIDTHxHEIGHT", raw);
    let (w, h) = raw.split_once(['x', 'X']).ok_or_else(invalid)?;
    let width: f64 = w.trim().parse().map_err(|_| invalid())?;
    let height: f64 = h.trim().parse().map_err(|_| invalid())?;
    if width <= 0.0 || height <= 0.0 {
        return Err(invalid());
    }
    Ok(RenderedSize { width, height })
}

pub fn print_help() {
    println!("🧩 Slider Captcha Solver");
    println!();
    println!("USAGE:");
    println!("    slider-captcha-solver analyze --background <img> --sprites <img> --regions <json> [FLAGS]");
    println!();
    println!("FLAGS:");
    println!("    --background <img>  Puzzle background image");
    println!("    --sprites <img>     Sprite sheet holding the 3 reference sprites side by side");
    println!("    --regions <json>    JSON array of [x1, y1, x2, y2] candidate boxes");
    println!("    --rendered WxH      On-screen size of the background, prints click offsets");
    println!("    --debug             Enable debug logging");
    println!("    --help, -h          Show this help message");
    println!("    --version, -v       Show version information");
    println!();
    println!("ENVIRONMENT:");
    println!("    RUST_LOG            Log filter, overrides --debug");
    println!();
    println!("EXAMPLES:");
    println!("    slider-captcha-solver analyze --background bg.jpg --sprites sprite.jpg --regions boxes.json");
    println!("    slider-captcha-solver analyze --background bg.jpg --sprites sprite.jpg --regions boxes.json --rendered 340x243");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Option<Args>, String> {
        Args::parse_from(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_parse_analyze() {
        let args = parse(&[
            "analyze",
            "--background",
            "bg.jpg",
            "--sprites",
            "sprite.jpg",
            "--regions",
            "boxes.json",
            "--rendered",
            "340x243.5",
            "--debug",
        ])
        .unwrap()
        .unwrap();

        assert!(args.debug_mode);
        let Mode::Analyze(analyze) = args.mode;
        assert_eq!(analyze.background, PathBuf::from("bg.jpg"));
        assert_eq!(analyze.regions, PathBuf::from("boxes.json"));
        let size = analyze.rendered.unwrap();
        assert_eq!((size.width, size.height), (340.0, 243.5));
    }

    #[test]
    fn test_missing_inputs() {
        assert!(parse(&["analyze", "--background", "bg.jpg"]).is_err());
        assert!(parse(&["analyze", "--background"]).is_err());
        assert!(parse(&[]).is_err());
        assert!(parse(&["solve"]).is_err());
        assert!(parse(&["analyze", "--fast"]).is_err());
    }

    #[test]
    fn test_parse_size() {
        assert!(parse_size("150X100").is_ok());
        assert!(parse_size("150").is_err());
        assert!(parse_size("0x100").is_err());
        assert!(parse_size("ax100").is_err());
    }
}
