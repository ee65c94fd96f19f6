// ABOUTME: Tests for command-line argument parsing
// ABOUTME: Verifies subcommand defaults, multi-word messages and global flags

use clap::Parser;
use shopchat::cli::{Cli, Command};
use std::path::PathBuf;

#[test]
fn test_no_subcommand_opens_tui() {
    let cli = Cli::try_parse_from(["shopchat"]).unwrap();
    assert_eq!(cli.command(), Command::Tui);
    assert!(!cli.ephemeral);
}

#[test]
fn test_send_joins_words_and_takes_image() {
    let cli = Cli::try_parse_from([
        "shopchat",
        "send",
        "--image",
        "face.png",
        "best",
        "toner",
        "for",
        "oily",
        "skin",
    ])
    .unwrap();

    match cli.command() {
        Command::Send {
            text,
            image,
            no_suggestions,
        } => {
            assert_eq!(text.join(" "), "best toner for oily skin");
            assert_eq!(image, Some(PathBuf::from("face.png")));
            assert!(!no_suggestions);
        }
        other => panic!("expected send, got {:?}", other),
    }
}

#[test]
fn test_send_requires_text() {
    assert!(Cli::try_parse_from(["shopchat", "send"]).is_err());
}

#[test]
fn test_ephemeral_is_global() {
    let cli = Cli::try_parse_from(["shopchat", "history", "--json", "--ephemeral"]).unwrap();
    assert!(cli.ephemeral);
    assert_eq!(cli.command(), Command::History { json: true });
}

#[test]
fn test_name_takes_value() {
    let cli = Cli::try_parse_from(["shopchat", "name", "Nadia"]).unwrap();
    assert_eq!(
        cli.command(),
        Command::Name {
            name: "Nadia".to_string()
        }
    );
}

#[test]
fn test_unknown_subcommand_rejected() {
    assert!(Cli::try_parse_from(["shopchat", "checkout"]).is_err());
}
