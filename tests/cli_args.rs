use clap::Parser;
use codebox::cli::{Cli, Commands, FormatArg};
use codebox_core::{ReturnFormat, TimeoutSetting, WorkspaceMode};
use pretty_assertions::assert_eq;

fn run_args(argv: &[&str]) -> codebox::cli::RunArgs {
    let cli = Cli::try_parse_from(argv).expect("arguments should parse");
    match cli.command {
        Commands::Run(args) => args,
        other => panic!("expected run, got {other:?}"),
    }
}

#[test]
fn run_defaults() {
    let args = run_args(&["codebox", "run", "print(1)"]);
    assert_eq!(args.code.as_deref(), Some("print(1)"));
    assert_eq!(args.timeout_ms, TimeoutSetting::Auto);
    assert_eq!(args.workspace_mode(), WorkspaceMode::Ephemeral);
    assert_eq!(ReturnFormat::from(args.format), ReturnFormat::Simple);
    assert!(args.install.is_empty());
    assert!(!args.json);
}

#[test]
fn run_accepts_every_option() {
    let args = run_args(&[
        "codebox",
        "run",
        "--timeout-ms",
        "2500",
        "--install",
        "requests==2.32.3",
        "--install",
        "numpy",
        "--workspace",
        "persistent",
        "--format",
        "detailed",
        "--target-directory",
        "work",
        "--json",
        "print(1)",
    ]);
    assert_eq!(args.timeout_ms, TimeoutSetting::Millis(2500));
    assert_eq!(args.install, vec!["requests==2.32.3", "numpy"]);
    assert_eq!(args.workspace_mode(), WorkspaceMode::Persistent);
    assert_eq!(args.format, FormatArg::Detailed);
    assert_eq!(
        args.target_directory.as_deref(),
        Some(std::path::Path::new("work"))
    );
    assert!(args.json);
}

#[test]
fn zero_and_garbage_timeouts_are_rejected() {
    assert!(Cli::try_parse_from(["codebox", "run", "--timeout-ms", "0", "x"]).is_err());
    assert!(Cli::try_parse_from(["codebox", "run", "--timeout-ms", "soon", "x"]).is_err());
    let args = run_args(&["codebox", "run", "--timeout-ms", "auto", "x"]);
    assert_eq!(args.timeout_ms, TimeoutSetting::Auto);
}

#[test]
fn file_conflicts_with_inline_code() {
    assert!(Cli::try_parse_from(["codebox", "run", "--file", "a.py", "print(1)"]).is_err());
}

#[test]
fn global_options_work_after_subcommand() {
    let cli = Cli::try_parse_from([
        "codebox",
        "config",
        "--interpreter",
        "python3.12",
        "--config",
        "custom.toml",
    ])
    .expect("arguments should parse");
    assert!(matches!(cli.command, Commands::Config));
    assert_eq!(cli.interpreter.as_deref(), Some("python3.12"));
    assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("custom.toml")));
}

#[test]
fn custom_workspace_is_a_path() {
    let args = run_args(&["codebox", "run", "--workspace", "scratch/area", "x"]);
    assert_eq!(
        args.workspace_mode(),
        WorkspaceMode::Custom("scratch/area".into())
    );
}
