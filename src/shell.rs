//! Interactive question shell and the one-shot `ask` entry point.
//!
//! The loop reads questions from stdin and prints grounded answers. EOF and
//! Ctrl-C both leave the shell cleanly; they are never reported as errors.

use std::io::Write;

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::config::Config;
use crate::generate::{Answer, AnswerEngine};

/// Column width for wrapped answers.
const ANSWER_WIDTH: usize = 88;

#[derive(Debug, PartialEq, Eq)]
enum ShellAction {
    Exit,
    Skip,
    Ask(String),
}

fn handle_line(line: &str) -> ShellAction {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return ShellAction::Skip;
    }
    if trimmed.eq_ignore_ascii_case("exit") || trimmed.eq_ignore_ascii_case("quit") {
        return ShellAction::Exit;
    }
    ShellAction::Ask(trimmed.to_string())
}

fn print_answer(answer: &Answer, debug: bool) {
    println!();
    println!("{}", wrap_text(&answer.text, ANSWER_WIDTH));
    println!();

    if debug {
        println!("Retrieved context chunks:");
        for c in &answer.contexts {
            println!("- {} (chunk {}, score={:.4})", c.source, c.chunk_id, c.score);
        }
        println!();
    }
}

/// Run the interactive shell until EOF, Ctrl-C, or an exit command.
pub async fn run_chat(config: &Config, debug: bool) -> Result<()> {
    let engine = AnswerEngine::open(config)?;

    println!("Healthcare Knowledge Assistant - RAG PoC");
    println!("Type your question and press Enter. Type 'exit' or 'quit' to leave.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        std::io::stdout().flush().context("Failed to flush stdout")?;

        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read from stdin")?,
            _ = tokio::signal::ctrl_c() => {
                println!("\nExiting.");
                break;
            }
        };

        let line = match line {
            Some(line) => line,
            None => {
                println!("\nExiting.");
                break;
            }
        };

        match handle_line(&line) {
            ShellAction::Exit => {
                println!("Goodbye.");
                break;
            }
            ShellAction::Skip => continue,
            ShellAction::Ask(question) => {
                let answer = engine.answer(&question).await?;
                print_answer(&answer, debug);
            }
        }
    }

    Ok(())
}

/// Answer a single question and exit.
pub async fn run_ask(config: &Config, question: &str, debug: bool) -> Result<()> {
    let question = question.trim();
    if question.is_empty() {
        bail!("Question must not be empty");
    }

    let engine = AnswerEngine::open(config)?;
    let answer = engine.answer(question).await?;
    print_answer(&answer, debug);

    Ok(())
}

/// Greedy word wrap at `width` columns. Existing newlines are preserved;
/// words longer than the width get their own line, unbroken.
fn wrap_text(text: &str, width: usize) -> String {
    let mut out = String::new();
    for (i, paragraph) in text.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let mut col = 0;
        for word in paragraph.split_whitespace() {
            let len = word.chars().count();
            if col == 0 {
                out.push_str(word);
                col = len;
            } else if col + 1 + len <= width {
                out.push(' ');
                out.push_str(word);
                col += 1 + len;
            } else {
                out.push('\n');
                out.push_str(word);
                col = len;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_line_exit_commands() {
        assert_eq!(handle_line("exit"), ShellAction::Exit);
        assert_eq!(handle_line("  QUIT  "), ShellAction::Exit);
        assert_eq!(handle_line("Exit"), ShellAction::Exit);
    }

    #[test]
    fn test_handle_line_blank_is_skipped() {
        assert_eq!(handle_line(""), ShellAction::Skip);
        assert_eq!(handle_line("   \t "), ShellAction::Skip);
    }

    #[test]
    fn test_handle_line_question_is_trimmed() {
        assert_eq!(
            handle_line("  what causes fever?  "),
            ShellAction::Ask("what causes fever?".to_string())
        );
    }

    #[test]
    fn test_wrap_respects_width_and_keeps_words_whole() {
        let text = "the quick brown fox jumps over the lazy dog near the quiet riverbank today";
        let wrapped = wrap_text(text, 20);

        for line in wrapped.lines() {
            assert!(line.chars().count() <= 20, "line too long: {line:?}");
        }
        let rejoined: Vec<&str> = wrapped.split_whitespace().collect();
        let original: Vec<&str> = text.split_whitespace().collect();
        assert_eq!(rejoined, original);
    }

    #[test]
    fn test_wrap_preserves_existing_newlines() {
        let wrapped = wrap_text("first line\n\nsecond line", 88);
        assert_eq!(wrapped, "first line\n\nsecond line");
    }

    #[test]
    fn test_wrap_overlong_word_gets_own_line() {
        let long = "x".repeat(40);
        let text = format!("a {long} b");
        let wrapped = wrap_text(&text, 10);
        let lines: Vec<&str> = wrapped.lines().collect();
        assert_eq!(lines, vec!["a", long.as_str(), "b"]);
    }

    #[test]
    fn test_wrap_fills_to_the_boundary() {
        assert_eq!(wrap_text("aaaaa bbbbb ccccc", 11), "aaaaa bbbbb\nccccc");
    }
}
