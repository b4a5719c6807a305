use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser};
use core_clipstitch::{services::stitch::Profile, Settings};
use tracing::Level;

use super::config::info::APP_NAME;

fn parse_profile(value: &str) -> Result<Profile, String> {
    value.parse().map_err(|_| {
        format!("unknown profile '{value}', expected one of: {}", Profile::names().join(", "))
    })
}

/// Stitch the clips of every subfolder side by side into one video.
#[rustfmt::skip]
#[derive(Parser, Debug, Clone)]
#[command(name = APP_NAME, version, disable_help_subcommand = true)]
pub struct Cli {
    /// root folder holding one subfolder per clip set
    #[arg(display_order = 0)]
    pub root: PathBuf,
    /// ordering profile: rgba, gif or resample
    #[arg(short, long, value_parser = parse_profile)]
    pub profile: Option<Profile>,
    /// output frame rate for the gif and resample profiles
    #[arg(short = 'f', long = "fps")]
    pub target_fps: Option<f64>,
    /// settings file (defaults to ./clipstitch.toml when present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// subfolders processed at once, 0 = number of CPUs
    #[arg(short, long)]
    pub jobs: Option<usize>,
    /// process only this subfolder
    #[arg(long, value_name = "NAME")]
    pub only: Vec<String>,
    /// skip this subfolder as well
    #[arg(long, value_name = "NAME")]
    pub skip: Vec<String>,
    /// don't save the segment-3 first frame
    #[arg(long)]
    pub no_snapshot: bool,
    /// leave subfolders with an existing output alone
    #[arg(long)]
    pub no_overwrite: bool,
    /// print the effective settings as TOML and exit
    #[arg(long)]
    pub print_config: bool,
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,
    #[arg(short, long, action = ArgAction::Count)]
    pub quiet: u8,
}

impl Cli {
    pub fn log_level(&self) -> Level {
        match (self.verbose, self.quiet) {
            (0, 0) => Level::INFO,
            (1, _) => Level::DEBUG,
            (_, 0) => Level::TRACE,
            (_, 1) => Level::WARN,
            _ => Level::ERROR,
        }
    }

    /// Command line flags take precedence over the settings file.
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(profile) = self.profile {
            settings.profile = profile;
        }
        if let Some(fps) = self.target_fps {
            settings.target_fps = fps;
        }
        if let Some(jobs) = self.jobs {
            settings.jobs = jobs;
        }
        for name in &self.skip {
            if !settings.skip_dirs.contains(name) {
                settings.skip_dirs.push(name.to_owned());
            }
        }
        if self.no_snapshot {
            settings.snapshot = false;
        }
        if self.no_overwrite {
            settings.overwrite = false;
        }
    }

    pub fn settings(&self) -> Result<Settings> {
        let mut settings = Settings::load_or_default(self.config.as_deref())?;
        self.apply(&mut settings);
        settings.validate()?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once(APP_NAME).chain(args.iter().copied()))
            .expect("failed to parse arguments")
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&["fg2bg"]);
        assert_eq!(cli.root, PathBuf::from("fg2bg"));
        assert_eq!(cli.profile, None);
        assert_eq!(cli.log_level(), Level::INFO);

        let mut settings = Settings::default();
        cli.apply(&mut settings);
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_overrides() {
        let cli = parse(&[
            "bg2fg-rgba", "-p", "gif", "--fps", "12", "-j", "0", "--skip", "old", "--skip", "bp",
            "--only", "1-1", "--no-snapshot", "--no-overwrite",
        ]);
        let mut settings = Settings::default();
        cli.apply(&mut settings);

        assert_eq!(settings.profile, Profile::Gif);
        assert_eq!(settings.target_fps, 12.0);
        assert_eq!(settings.jobs, 0);
        assert_eq!(settings.skip_dirs, ["bp", "old"]);
        assert!(!settings.snapshot);
        assert!(!settings.overwrite);
        assert_eq!(cli.only, ["1-1"]);
        assert!(!cli.print_config);
    }

    #[test]
    fn test_print_config_reflects_flags() {
        let cli = parse(&["r", "--print-config", "-p", "rgba", "--no-snapshot"]);
        assert!(cli.print_config);

        let text = cli.settings().unwrap().to_toml().unwrap();
        assert!(text.contains("profile = \"rgba\""), "{text}");
        assert!(text.contains("snapshot = false"), "{text}");
    }

    #[test]
    fn test_unknown_profile() {
        let err = Cli::try_parse_from([APP_NAME, "root", "--profile", "mosaic"]).unwrap_err();
        assert!(err.to_string().contains("resample"));
    }

    #[test]
    fn test_log_level() {
        assert_eq!(parse(&["r", "-v"]).log_level(), Level::DEBUG);
        assert_eq!(parse(&["r", "-vv"]).log_level(), Level::TRACE);
        assert_eq!(parse(&["r", "-q"]).log_level(), Level::WARN);
        assert_eq!(parse(&["r", "-qq"]).log_level(), Level::ERROR);
        assert!(Cli::try_parse_from([APP_NAME, "r", "-v", "-q"]).is_err());
    }

    #[test]
    fn test_invalid_fps_is_rejected() {
        let cli = parse(&["r", "--fps", "0"]);
        assert!(cli.settings().is_err());
    }
}
