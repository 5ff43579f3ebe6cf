#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Join,
    Leave,
    Help,
}

impl Command {
    /// Everything registered in the client's command menu.
    pub const ALL: [Command; 4] = [Command::Start, Command::Join, Command::Leave, Command::Help];

    /// Parses `/name` or `/name@botname`, ignoring anything after the command word.
    /// Unknown commands yield `None` and are relayed like any other text.
    pub fn parse(text: &str) -> Option<Self> {
        let word = text.strip_prefix('/')?.split_whitespace().next()?;
        let name = word.split_once('@').map_or(word, |(name, _)| name);

        match name.to_ascii_lowercase().as_str() {
            "start" => Some(Command::Start),
            "join" => Some(Command::Join),
            "leave" => Some(Command::Leave),
            "help" => Some(Command::Help),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Command::Start => "start",
            Command::Join => "join",
            Command::Leave => "leave",
            Command::Help => "help",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Command::Start => "Start the bot",
            Command::Join => "Join the anonymous chat",
            Command::Leave => "Leave the anonymous chat",
            Command::Help => "Show the available commands",
        }
    }
}
