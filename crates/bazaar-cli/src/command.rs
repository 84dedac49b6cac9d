//! Parsing of the stall's one-line commands.

/// A command typed at the stall prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// List the commands.
    Help,
    /// Show gold, stock, and rapport.
    Status,
    /// Price the merchant's wares.
    Quote,
    /// Pay the quoted price.
    Buy,
    /// Name a price for the merchant's wares.
    Haggle(u32),
    /// Start selling the player's item to the merchant.
    Sell,
    /// Ask a price in the open negotiation.
    Offer(u32),
    /// Ask the price the merchant last suggested.
    Accept,
    /// Walk away from the open negotiation.
    Cancel,
    /// Leave the stall.
    Quit,
}

/// Why a line could not be understood.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    /// Nothing was typed.
    #[error("type a command, or `help`")]
    Empty,

    /// The first word is not a command.
    #[error("unknown command `{0}`, try `help`")]
    Unknown(String),

    /// A priced command came without a price.
    #[error("`{0}` needs a price, e.g. `{0} 30`")]
    MissingPrice(&'static str),

    /// The price is not a whole number of gold.
    #[error("`{0}` is not a price in whole gold")]
    BadPrice(String),
}

/// Usage text printed by `help`.
pub const HELP: &str = "\
commands:
  quote           price the merchant's wares
  buy             pay the quoted price
  haggle <gold>   name your own price for the wares
  sell            start selling your item to the merchant
  offer <gold>    ask a price in the open negotiation
  accept          ask the merchant's last counter-offer
  cancel          walk away from the negotiation
  status          gold, stock, and rapport
  quit            leave the stall";

impl Command {
    /// Parse one input line. Words are case-insensitive.
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Err(CommandError::Empty);
        };

        match head.to_ascii_lowercase().as_str() {
            "help" | "?" => Ok(Self::Help),
            "status" => Ok(Self::Status),
            "quote" => Ok(Self::Quote),
            "buy" => Ok(Self::Buy),
            "haggle" => price(words.next(), "haggle").map(Self::Haggle),
            "sell" => Ok(Self::Sell),
            "offer" | "ask" => price(words.next(), "offer").map(Self::Offer),
            "accept" | "deal" => Ok(Self::Accept),
            "cancel" | "leave" => Ok(Self::Cancel),
            "quit" | "exit" => Ok(Self::Quit),
            other => Err(CommandError::Unknown(other.to_owned())),
        }
    }
}

fn price(word: Option<&str>, command: &'static str) -> Result<u32, CommandError> {
    let word = word.ok_or(CommandError::MissingPrice(command))?;
    word.trim_end_matches('g')
        .parse()
        .map_err(|_parse| CommandError::BadPrice(word.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_commands() {
        assert_eq!(Command::parse("quote"), Ok(Command::Quote));
        assert_eq!(Command::parse("  SELL "), Ok(Command::Sell));
        assert_eq!(Command::parse("exit"), Ok(Command::Quit));
        assert_eq!(Command::parse("Accept"), Ok(Command::Accept));
    }

    #[test]
    fn priced_commands() {
        assert_eq!(Command::parse("offer 42"), Ok(Command::Offer(42)));
        assert_eq!(Command::parse("haggle 30g"), Ok(Command::Haggle(30)));
        assert_eq!(Command::parse("offer"), Err(CommandError::MissingPrice("offer")));
        assert_eq!(
            Command::parse("haggle lots"),
            Err(CommandError::BadPrice("lots".to_owned()))
        );
        assert_eq!(
            Command::parse("offer -3"),
            Err(CommandError::BadPrice("-3".to_owned()))
        );
    }

    #[test]
    fn nonsense() {
        assert_eq!(Command::parse(""), Err(CommandError::Empty));
        assert_eq!(
            Command::parse("dance"),
            Err(CommandError::Unknown("dance".to_owned()))
        );
    }
}
