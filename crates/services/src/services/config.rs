use serde::{Deserialize, Serialize};

fn default_trigger() -> char {
    '/'
}

fn default_define_aliases() -> Vec<String> {
    vec!["neverforget".to_string(), "never4get".to_string()]
}

fn default_info_aliases() -> Vec<String> {
    vec!["i".to_string()]
}

fn default_cancel_aliases() -> Vec<String> {
    vec!["nevermind".to_string()]
}

/// Chat-facing behavior of the bot.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct BotConfig {
    /// character that marks a message as a command
    #[serde(default = "default_trigger")]
    pub trigger: char,
    /// names of the directive that defines a command
    #[serde(default = "default_define_aliases")]
    pub define_aliases: Vec<String>,
    /// names of the directive that describes a command
    #[serde(default = "default_info_aliases")]
    pub info_aliases: Vec<String>,
    /// names of the directive that abandons a pending definition
    #[serde(default = "default_cancel_aliases")]
    pub cancel_aliases: Vec<String>,
    /// reply when an invoked command does not exist, instead of staying silent
    #[serde(default)]
    pub announce_unknown_commands: bool,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            trigger: default_trigger(),
            define_aliases: default_define_aliases(),
            info_aliases: default_info_aliases(),
            cancel_aliases: default_cancel_aliases(),
            announce_unknown_commands: false,
        }
    }
}

/// Which built-in directive a command name refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    Define,
    Info,
    Cancel,
}

impl BotConfig {
    pub fn directive(&self, name: &str) -> Option<Directive> {
        let matches = |aliases: &[String]| aliases.iter().any(|alias| alias == name);
        if matches(&self.define_aliases) {
            Some(Directive::Define)
        } else if matches(&self.info_aliases) {
            Some(Directive::Info)
        } else if matches(&self.cancel_aliases) {
            Some(Directive::Cancel)
        } else {
            None
        }
    }

    /// Directive names cannot be used as command names.
    pub fn is_reserved(&self, name: &str) -> bool {
        self.directive(name).is_some()
    }
}
