//! Splitting raw input lines into instructions and tokens.
//!
//! A line holds any number of instructions separated by `;` or `&`. Inside an
//! instruction, tokens are separated by spaces or tabs; there is no quoting. An
//! instruction ended by `&` gets a trailing `&` token so it runs in the
//! background.

use regex::Regex;
use std::collections::VecDeque;
use std::sync::LazyLock;

/// `context:command`, split at the first colon.
static CONTEXT_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([^:]*):(.*)$").expect("context prefix pattern is valid")
});

struct Splitter {
    instructions: Vec<VecDeque<String>>,
    current: VecDeque<String>,
    word: String,
    /// Inside a run of `;`/`&` delimiters.
    delimiting: bool,
    /// The current delimiter run contains `&`.
    background: bool,
}

impl Splitter {
    fn new() -> Self {
        Self {
            instructions: Vec::new(),
            current: VecDeque::new(),
            word: String::new(),
            delimiting: false,
            background: false,
        }
    }

    fn feed(&mut self, ch: char) {
        match ch {
            ';' | '&' => {
                self.finish_word();
                self.delimiting = true;
                self.background |= ch == '&';
            }
            _ => {
                if self.delimiting {
                    self.finish_instruction();
                }
                if matches!(ch, ' ' | '\t' | '\n' | '\r') {
                    self.finish_word();
                } else {
                    self.word.push(ch);
                }
            }
        }
    }

    fn finish_word(&mut self) {
        if !self.word.is_empty() {
            self.current.push_back(std::mem::take(&mut self.word));
        }
    }

    fn finish_instruction(&mut self) {
        self.finish_word();
        if !self.current.is_empty() {
            if self.background {
                self.current.push_back("&".to_string());
            }
            self.instructions.push(std::mem::take(&mut self.current));
        }
        self.delimiting = false;
        self.background = false;
    }

    fn finish(mut self) -> Vec<VecDeque<String>> {
        self.finish_instruction();
        self.instructions
    }
}

/// Split `line` into instructions, each an ordered queue of tokens.
///
/// Empty instructions are dropped, so the result never contains an empty queue.
pub fn split_instructions(line: &str) -> Vec<VecDeque<String>> {
    let mut splitter = Splitter::new();
    for ch in line.chars() {
        splitter.feed(ch);
    }
    splitter.finish()
}

/// Separate an optional `context:` prefix from a command word.
///
/// `bin:ls` yields `(Some("bin"), "ls")`, `ls` yields `(None, "ls")`. Only the
/// first colon counts, so `a:b:c` addresses context `a` with command `b:c`.
pub fn split_context_prefix(word: &str) -> (Option<&str>, &str) {
    match CONTEXT_PREFIX.captures(word) {
        Some(caps) => {
            let context = caps.get(1).map_or("", |m| m.as_str());
            let command = caps.get(2).map_or("", |m| m.as_str());
            (Some(context), command)
        }
        None => (None, word),
    }
}
