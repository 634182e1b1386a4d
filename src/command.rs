use crate::context::ExecutionContext;
use crate::resolve;
use log::debug;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

/// Conventional process exit code type used by this crate.
///
/// 0 is success; 1-255 is either a child's own exit code or, when the child was
/// killed, the number of the signal that terminated it.
pub type ExitCode = i32;

/// Single-character tokens with a meaning of their own inside an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    /// `<`: the next token names the file standard input is read from.
    Input,
    /// `>`: the next token names the file standard output is written to.
    Output,
    /// `&`: run without waiting.
    Background,
    /// `|`: the next token names the program of the next stage.
    Pipe,
    /// `;`: already handled by the instruction splitter.
    Separator,
}

impl Control {
    fn of(token: &str) -> Option<Self> {
        let mut chars = token.chars();
        match (chars.next(), chars.next()) {
            (Some('<'), None) => Some(Control::Input),
            (Some('>'), None) => Some(Control::Output),
            (Some('&'), None) => Some(Control::Background),
            (Some('|'), None) => Some(Control::Pipe),
            (Some(';'), None) => Some(Control::Separator),
            _ => None,
        }
    }
}

/// One program of a pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    program: String,
    executable: Option<PathBuf>,
    args: Vec<String>,
    piped: bool,
}

impl Stage {
    fn new(program: String, executable: Option<PathBuf>) -> Self {
        Self {
            program,
            executable,
            args: Vec::new(),
            piped: false,
        }
    }

    /// The program name as it was typed.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// The absolute path the program resolved to, if it did.
    pub fn executable(&self) -> Option<&Path> {
        self.executable.as_deref()
    }

    /// Positional arguments, not including the program itself.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Whether a `|` boundary follows this stage.
    pub fn is_piped(&self) -> bool {
        self.piped
    }
}

/// The parsed form of one instruction, ready for the [`PipelineExecutor`].
///
/// Later pipeline stages are resolved while parsing, so `stage_count` is the
/// length of the resolvable prefix of `stages`: the first stage that fails to
/// resolve truncates the pipeline, even if stages after it would resolve.
///
/// [`PipelineExecutor`]: crate::pipeline::PipelineExecutor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    stages: Vec<Stage>,
    stage_count: usize,
    input_redirect: Option<String>,
    output_redirect: Option<String>,
    background: bool,
}

impl CommandSpec {
    /// Parse `tokens` for a command already resolved to `executable`, resolving
    /// later stages in `context`.
    pub fn build(
        context: &ExecutionContext,
        program: &str,
        executable: PathBuf,
        tokens: VecDeque<String>,
    ) -> Self {
        Self::parse(program, executable, tokens, |name| {
            resolve::resolve(context, name)
        })
    }

    /// Parse `tokens` with a caller-supplied resolver for later stages.
    pub fn parse<R>(program: &str, executable: PathBuf, mut tokens: VecDeque<String>, resolve: R) -> Self
    where
        R: Fn(&str) -> Option<PathBuf>,
    {
        let mut spec = Self {
            stages: vec![Stage::new(program.to_string(), Some(executable))],
            stage_count: 1,
            input_redirect: None,
            output_redirect: None,
            background: false,
        };
        let mut truncated = false;

        while let Some(token) = tokens.pop_front() {
            match Control::of(&token) {
                Some(Control::Input) => {
                    if let Some(file) = tokens.pop_front() {
                        spec.input_redirect = Some(file);
                    }
                }
                Some(Control::Output) => {
                    if let Some(file) = tokens.pop_front() {
                        spec.output_redirect = Some(file);
                    }
                }
                Some(Control::Background) => spec.background = true,
                Some(Control::Pipe) => {
                    spec.current_stage().piped = true;
                    let Some(name) = tokens.pop_front() else {
                        continue;
                    };
                    let executable = resolve(&name);
                    match executable {
                        Some(_) if !truncated => spec.stage_count += 1,
                        Some(_) => {}
                        None => {
                            debug!("pipeline truncated at {name}");
                            truncated = true;
                        }
                    }
                    spec.stages.push(Stage::new(name, executable));
                }
                Some(Control::Separator) => {}
                None => spec.current_stage().args.push(token),
            }
        }

        spec
    }

    fn current_stage(&mut self) -> &mut Stage {
        let last = self.stages.len() - 1;
        &mut self.stages[last]
    }

    /// Every stage named on the line, including any after a truncation point.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// The stages that will actually be spawned.
    pub fn runnable_stages(&self) -> &[Stage] {
        &self.stages[..self.stage_count]
    }

    pub fn stage_count(&self) -> usize {
        self.stage_count
    }

    pub fn input_redirect(&self) -> Option<&str> {
        self.input_redirect.as_deref()
    }

    pub fn output_redirect(&self) -> Option<&str> {
        self.output_redirect.as_deref()
    }

    pub fn is_background(&self) -> bool {
        self.background
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(line: &str) -> VecDeque<String> {
        line.split_whitespace().map(str::to_string).collect()
    }

    /// Resolves every name except the ones starting with "bad".
    fn fake_resolver(name: &str) -> Option<PathBuf> {
        if name.starts_with("bad") {
            None
        } else {
            Some(PathBuf::from("/fake/bin").join(name))
        }
    }

    fn parse(line: &str) -> CommandSpec {
        CommandSpec::parse("ls", PathBuf::from("/fake/bin/ls"), tokens(line), fake_resolver)
    }

    #[test]
    fn plain_arguments_stay_in_order() {
        let spec = parse("-l -a /tmp");
        assert_eq!(spec.stage_count(), 1);
        assert_eq!(spec.stages()[0].args(), ["-l", "-a", "/tmp"]);
        assert_eq!(spec.stages()[0].executable(), Some(Path::new("/fake/bin/ls")));
        assert!(!spec.is_background());
        assert!(!spec.stages()[0].is_piped());
    }

    #[test]
    fn redirections_consume_the_following_token() {
        let spec = parse("< in.txt -l > out.txt");
        assert_eq!(spec.input_redirect(), Some("in.txt"));
        assert_eq!(spec.output_redirect(), Some("out.txt"));
        assert_eq!(spec.stages()[0].args(), ["-l"]);
    }

    #[test]
    fn trailing_redirection_without_target_is_dropped() {
        let spec = parse("-l >");
        assert_eq!(spec.output_redirect(), None);
        assert_eq!(spec.stages()[0].args(), ["-l"]);
    }

    #[test]
    fn ampersand_sets_background_and_semicolon_is_ignored() {
        let spec = parse("-l ; &");
        assert!(spec.is_background());
        assert_eq!(spec.stages()[0].args(), ["-l"]);
    }

    #[test]
    fn multi_character_symbols_are_arguments() {
        let spec = parse(">> && || <<");
        assert_eq!(spec.stages()[0].args(), [">>", "&&", "||", "<<"]);
        assert_eq!(spec.output_redirect(), None);
        assert!(!spec.is_background());
    }

    #[test]
    fn pipes_split_stages_and_resolve_eagerly() {
        let spec = parse("-l | grep foo | wc -l");
        assert_eq!(spec.stage_count(), 3);

        let stages = spec.stages();
        assert!(stages[0].is_piped());
        assert_eq!(stages[1].program(), "grep");
        assert_eq!(stages[1].executable(), Some(Path::new("/fake/bin/grep")));
        assert_eq!(stages[1].args(), ["foo"]);
        assert!(stages[1].is_piped());
        assert_eq!(stages[2].args(), ["-l"]);
        assert!(!stages[2].is_piped());
    }

    #[test]
    fn unresolved_stage_truncates_the_pipeline() {
        let spec = parse("| cat | badcmd | wc");
        assert_eq!(spec.stages().len(), 4);
        assert_eq!(spec.stage_count(), 2);
        assert_eq!(spec.runnable_stages().len(), 2);

        let bad = &spec.stages()[2];
        assert_eq!(bad.program(), "badcmd");
        assert_eq!(bad.executable(), None);
        // stages after the truncation point are still recorded but never counted
        assert!(spec.stages()[3].executable().is_some());
        assert!(spec.runnable_stages()[1].is_piped());
    }

    #[test]
    fn trailing_pipe_opens_no_stage() {
        let spec = parse("-l |");
        assert_eq!(spec.stages().len(), 1);
        assert_eq!(spec.stage_count(), 1);
        assert!(spec.stages()[0].is_piped());
    }

    #[test]
    fn build_resolves_later_stages_in_the_context() {
        let _lock = crate::testutil::lock_current_dir();
        let dir = tempfile::tempdir().unwrap();
        let ctx = ExecutionContext::create(
            &crate::testutil::system_search_path(),
            &dir.path().to_string_lossy(),
        )
        .unwrap();
        let spec = CommandSpec::build(
            &ctx,
            "echo",
            crate::testutil::system("echo"),
            tokens("hi | cat | surely-not-a-command-1234"),
        );
        assert_eq!(spec.stage_count(), 2);
        assert!(spec.stages()[1].executable().unwrap().ends_with("cat"));
    }
}
