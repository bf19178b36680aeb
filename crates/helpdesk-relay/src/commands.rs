/// How a piece of message text should be treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parsed<'a> {
    /// Not a command; relay it.
    Plain,
    /// A command for this bot, without the leading `/` and `@mention`.
    Command(&'a str),
    /// `/cmd@other_bot`: somebody else's command.
    ForAnotherBot,
}

/// Splits a leading `/command[@bot]` token off `text`.
pub fn parse<'a>(text: &'a str, bot_username: Option<&str>) -> Parsed<'a> {
    let Some(rest) = text.strip_prefix('/') else {
        return Parsed::Plain;
    };

    let token = rest.split_whitespace().next().unwrap_or("");
    match token.split_once('@') {
        None => Parsed::Command(token),
        Some((name, mention)) => match bot_username {
            Some(me) if !me.eq_ignore_ascii_case(mention) => Parsed::ForAnotherBot,
            _ => Parsed::Command(name),
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupportCommand {
    Help,
    Take,
    Close,
    Unknown,
}

impl SupportCommand {
    pub fn from_name(name: &str) -> Self {
        if name.eq_ignore_ascii_case("help") {
            Self::Help
        } else if name.eq_ignore_ascii_case("take") {
            Self::Take
        } else if name.eq_ignore_ascii_case("close") {
            Self::Close
        } else {
            Self::Unknown
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserCommand {
    Start,
    Unknown,
}

impl UserCommand {
    pub fn from_name(name: &str) -> Self {
        if name.eq_ignore_ascii_case("start") {
            Self::Start
        } else {
            Self::Unknown
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_not_a_command() {
        assert_eq!(parse("hello /take", Some("relay_bot")), Parsed::Plain);
        assert_eq!(parse("", None), Parsed::Plain);
    }

    #[test]
    fn command_word_is_the_first_token() {
        assert_eq!(parse("/take", None), Parsed::Command("take"));
        assert_eq!(parse("/close please\nnow", None), Parsed::Command("close"));
        assert_eq!(parse("/", None), Parsed::Command(""));
    }

    #[test]
    fn mentions_are_matched_against_our_username() {
        assert_eq!(parse("/take@Relay_Bot", Some("relay_bot")), Parsed::Command("take"));
        assert_eq!(parse("/take@other_bot", Some("relay_bot")), Parsed::ForAnotherBot);
        assert_eq!(parse("/take@whoever", None), Parsed::Command("take"));
    }

    #[test]
    fn command_names() {
        assert_eq!(SupportCommand::from_name("TAKE"), SupportCommand::Take);
        assert_eq!(SupportCommand::from_name("close"), SupportCommand::Close);
        assert_eq!(SupportCommand::from_name("help"), SupportCommand::Help);
        assert_eq!(SupportCommand::from_name("start"), SupportCommand::Unknown);
        assert_eq!(UserCommand::from_name("start"), UserCommand::Start);
        assert_eq!(UserCommand::from_name("take"), UserCommand::Unknown);
    }
}
