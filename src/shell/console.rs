/// Operator console abstraction
use crate::error::{GalleryError, GalleryResult};
use std::collections::VecDeque;
use std::io::{self, Write};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::runtime::{Builder, Runtime};

/// Line-oriented operator I/O
///
/// `prompt` returns [`GalleryError::Interrupted`] when the operator presses
/// Ctrl-C or input ends.
pub trait Console {
    /// Show `prompt` and read one line, without the trailing newline
    fn prompt(&mut self, prompt: &str) -> GalleryResult<String>;

    /// Print one line
    fn say(&mut self, line: &str);

    /// Wait for the operator before redrawing a menu
    fn pause(&mut self) -> GalleryResult<()> {
        self.prompt("\nPress ENTER to continue...").map(|_| ())
    }

    /// Clear the screen before a menu is drawn
    fn clear(&mut self) {}
}

/// Interactive terminal console
///
/// Each read races stdin against Ctrl-C on a current-thread runtime, so an
/// interrupt cancels the pending prompt instead of killing the process.
pub struct TerminalConsole {
    runtime: Runtime,
    lines: Lines<BufReader<Stdin>>,
}

impl TerminalConsole {
    pub fn new() -> GalleryResult<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        let lines = {
            let _guard = runtime.enter();
            BufReader::new(tokio::io::stdin()).lines()
        };
        Ok(Self { runtime, lines })
    }
}

impl Console for TerminalConsole {
    fn prompt(&mut self, prompt: &str) -> GalleryResult<String> {
        print!("{}", prompt);
        io::stdout().flush()?;

        let Self { runtime, lines } = self;
        runtime.block_on(async {
            tokio::select! {
                line = lines.next_line() => match line {
                    Ok(Some(line)) => Ok(line.trim_end_matches('\r').to_string()),
                    Ok(None) => Err(GalleryError::Interrupted),
                    Err(e) => Err(GalleryError::Io(e)),
                },
                _ = tokio::signal::ctrl_c() => {
                    println!();
                    Err(GalleryError::Interrupted)
                }
            }
        })
    }

    fn say(&mut self, line: &str) {
        println!("{}", line);
    }

    fn clear(&mut self) {
        print!("\x1B[2J\x1B[1;1H");
    }
}

/// Console fed from a fixed list of answers, recording everything shown
///
/// Running out of answers behaves like Ctrl-C.
#[derive(Debug, Default)]
pub struct ScriptedConsole {
    answers: VecDeque<String>,
    transcript: Vec<String>,
}

impl ScriptedConsole {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            transcript: Vec::new(),
        }
    }

    /// Prompts and lines shown so far
    pub fn transcript(&self) -> &[String] {
        &self.transcript
    }

    /// Whole transcript as one string
    pub fn output(&self) -> String {
        self.transcript.join("\n")
    }

    /// Answers not yet consumed
    pub fn remaining(&self) -> usize {
        self.answers.len()
    }
}

impl Console for ScriptedConsole {
    fn prompt(&mut self, prompt: &str) -> GalleryResult<String> {
        self.transcript.push(prompt.to_string());
        self.answers.pop_front().ok_or(GalleryError::Interrupted)
    }

    fn say(&mut self, line: &str) {
        self.transcript.push(line.to_string());
    }

    fn pause(&mut self) -> GalleryResult<()> {
        Ok(())
    }
}
