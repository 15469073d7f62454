//! Operator tool for the post generation pipeline.
//!
//! Checks identity files, lints candidate text against an identity's
//! validators, scores readability, and writes the default config.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};

use postgen::core::readability::{flesch_kincaid_grade, tone_score_for_grade};
use postgen::core::types::Verdict;
use postgen::core::validators::ValidatorSet;
use postgen::exit_codes;
use postgen::io::config::{DEFAULT_CONFIG_PATH, PipelineConfig, load_config, write_config};
use postgen::io::identity_store::load_identity;

#[derive(Parser)]
#[command(
    name = "postgen",
    version,
    about = "Brand-aware social post generation pipeline"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Inspect identity specification files.
    Identity {
        #[command(subcommand)]
        command: IdentityCommand,
    },
    /// Check text against an identity's validators (template, structure, tone).
    Lint {
        /// Identity file (JSON or TOML).
        #[arg(long)]
        identity: PathBuf,
        /// Which generated part the text is.
        #[arg(long, value_enum)]
        kind: TextKind,
        /// Pipeline config providing validation limits.
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
        text: String,
    },
    /// Print the readability grade and tone score of text.
    Tone {
        /// Pipeline config providing the tone threshold.
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
        text: String,
    },
    /// Manage the pipeline config file.
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand)]
enum IdentityCommand {
    /// Validate an identity file against the identity schema.
    Check { path: PathBuf },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Write the default config.
    Init {
        /// Overwrite an existing file.
        #[arg(short, long)]
        force: bool,
        #[arg(default_value = DEFAULT_CONFIG_PATH)]
        path: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum TextKind {
    Hook,
    Body,
    Cta,
}

fn main() {
    postgen::logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Identity {
            command: IdentityCommand::Check { path },
        } => cmd_identity_check(&path),
        Command::Lint {
            identity,
            kind,
            config,
            text,
        } => cmd_lint(&identity, kind, &config, &text),
        Command::Tone { config, text } => cmd_tone(&config, &text),
        Command::Config {
            command: ConfigCommand::Init { force, path },
        } => cmd_config_init(&path, force),
    }
}

fn cmd_identity_check(path: &Path) -> Result<i32> {
    let spec = load_identity(path)?;
    println!(
        "{}: ok ({} hook templates, {} pillars)",
        spec.creator,
        spec.hook_templates.len(),
        spec.pillars_ranked.len()
    );
    Ok(exit_codes::OK)
}

fn cmd_lint(identity_path: &Path, kind: TextKind, config_path: &Path, text: &str) -> Result<i32> {
    let config = load_config(config_path)?;
    let spec = load_identity(identity_path)?;
    let validators = ValidatorSet::bind(&spec, &config.validation)?;

    let verdict = match kind {
        TextKind::Hook => validators.check_hook(text),
        TextKind::Body | TextKind::Cta => validators.check_structure(text),
    };
    let score = validators.tone_score(text);
    let mut problems = Vec::new();
    if let Verdict::Rejected(reason) = verdict {
        problems.push(reason);
    }
    if score < validators.tone_threshold() {
        problems.push(format!(
            "tone score {score:.2} below threshold {:.2}",
            validators.tone_threshold()
        ));
    }

    if problems.is_empty() {
        println!("ok (tone {score:.2})");
        return Ok(exit_codes::OK);
    }
    for problem in &problems {
        println!("rejected: {problem}");
    }
    Ok(exit_codes::REJECTED)
}

fn cmd_tone(config_path: &Path, text: &str) -> Result<i32> {
    let config = load_config(config_path)?;
    let grade = flesch_kincaid_grade(text);
    let score = tone_score_for_grade(grade);
    println!("grade {grade:.1}, tone {score:.2}");
    if score < config.validation.tone_threshold {
        return Ok(exit_codes::REJECTED);
    }
    Ok(exit_codes::OK)
}

fn cmd_config_init(path: &Path, force: bool) -> Result<i32> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    write_config(path, &PipelineConfig::default())
        .with_context(|| format!("initialize {}", path.display()))?;
    println!("wrote {}", path.display());
    Ok(exit_codes::OK)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_identity_check() {
        let cli = Cli::parse_from(["postgen", "identity", "check", "brand.json"]);
        match cli.command {
            Command::Identity {
                command: IdentityCommand::Check { path },
            } => assert_eq!(path, PathBuf::from("brand.json")),
            _ => panic!("expected identity check"),
        }
    }

    #[test]
    fn parse_lint_with_kind() {
        let cli = Cli::parse_from([
            "postgen",
            "lint",
            "--identity",
            "brand.json",
            "--kind",
            "cta",
            "Comment below.",
        ]);
        match cli.command {
            Command::Lint {
                kind, config, text, ..
            } => {
                assert_eq!(kind, TextKind::Cta);
                assert_eq!(config, PathBuf::from(DEFAULT_CONFIG_PATH));
                assert_eq!(text, "Comment below.");
            }
            _ => panic!("expected lint"),
        }
    }

    #[test]
    fn parse_config_init_force() {
        let cli = Cli::parse_from(["postgen", "config", "init", "--force"]);
        assert!(matches!(
            cli.command,
            Command::Config {
                command: ConfigCommand::Init { force: true, .. }
            }
        ));
    }

    #[test]
    fn config_init_refuses_to_overwrite_without_force() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("postgen.toml");
        assert_eq!(cmd_config_init(&path, false).expect("init"), exit_codes::OK);
        assert!(cmd_config_init(&path, false).is_err());
        assert_eq!(cmd_config_init(&path, true).expect("force"), exit_codes::OK);
    }

    #[test]
    fn lint_reports_rejected_hook() {
        let temp = tempfile::tempdir().expect("tempdir");
        let identity_path = temp.path().join("identity.json");
        let raw = serde_json::to_string(&postgen::test_support::identity()).expect("json");
        std::fs::write(&identity_path, raw).expect("write");
        let config_path = temp.path().join("missing.toml");

        let accepted = cmd_lint(&identity_path, TextKind::Hook, &config_path, "Did you know we ship?");
        assert_eq!(accepted.expect("lint"), exit_codes::OK);
        let rejected = cmd_lint(&identity_path, TextKind::Hook, &config_path, "We ship.");
        assert_eq!(rejected.expect("lint"), exit_codes::REJECTED);
    }
}
