use crate::models::target::Target;
use serde::{Deserialize, Serialize};

/// A command to run on every target, kept as an argument vector.
///
/// Arguments may contain `{user}` and `{host}`, which are replaced per target
/// before each argument is shell-escaped. The remote shell therefore always
/// sees exactly one word per argument, whatever the inventory contains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl RemoteCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Runs `script` through `sh -c` on the remote side.
    pub fn shell(script: impl Into<String>) -> Self {
        Self::new("sh").arg("-c").arg(script)
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Builds a command from argv as given on the command line.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, rest) = argv.split_first()?;
        Some(Self::new(program.clone()).args(rest.iter().cloned()))
    }

    /// The words for `target`, placeholders substituted, not yet escaped.
    pub fn words_for(&self, target: &Target) -> Vec<String> {
        std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|word| substitute(word, target))
            .collect()
    }

    /// The single command string handed to the remote shell.
    pub fn render(&self, target: &Target) -> String {
        shell_words::join(self.words_for(target))
    }
}

fn substitute(word: &str, target: &Target) -> String {
    word.replace("{user}", &target.user)
        .replace("{host}", &target.host)
}
