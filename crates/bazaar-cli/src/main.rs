//! Terminal market stall for the Bazaar trading engine.
//!
//! One merchant, one item for sale, one item the player can sell. The stall
//! reads commands from stdin and drives a [`TradeDesk`] with the same
//! oracle stack the game uses.
//!
//! # Configuration
//!
//! `bazaar.yaml` in the working directory (or the file named by
//! `BAZAAR_CONFIG`) is loaded when present. Without a file the oracle is
//! configured from `ORACLE_*` environment variables alone. Set
//! `ORACLE_API_KEY` to let an LLM play the merchant; without it every
//! negotiation round is decided by the local fallback.

mod command;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use bazaar_engine::{
    BazaarConfig, DEFAULT_ORACLE_DEADLINE, EngineError, TracingJournal, TradeDesk,
};
use bazaar_ledger::{PlayerLedger, WealthLedger};
use bazaar_oracle::{
    DeterministicFallbackOracle, NegotiationOracle, OracleConfig, RemoteOracle, ResilientOracle,
    RetryPolicy,
};
use bazaar_pricing::FallbackResolver;
use bazaar_types::{
    Item, ItemCategory, Merchant, Personality, PlayerId, Rarity, SessionId, SkillProfile,
};

use crate::command::{Command, HELP};

type Desk = TradeDesk<PlayerLedger, ResilientOracle<RemoteOracle>>;

/// Where the configuration came from.
enum ConfigSource {
    File(PathBuf),
    Environment,
}

/// Application entry point.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded, the oracle
/// cannot be built, or stdin fails.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (config, source) = load_config()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    match &source {
        ConfigSource::File(path) => info!(path = %path.display(), "bazaar stall opening"),
        ConfigSource::Environment => info!("bazaar stall opening with default configuration"),
    }

    let (oracle, deadline) = build_oracle(&config, &source)?;
    let mut stall = Stall::open(&config, oracle, deadline)?;
    stall.run().await
}

fn load_config() -> anyhow::Result<(BazaarConfig, ConfigSource)> {
    let path = std::env::var("BAZAAR_CONFIG")
        .map_or_else(|_| PathBuf::from("bazaar.yaml"), PathBuf::from);
    if path.exists() {
        let config = BazaarConfig::from_file(&path)
            .with_context(|| format!("loading {}", path.display()))?;
        return Ok((config, ConfigSource::File(path)));
    }
    Ok((BazaarConfig::default(), ConfigSource::Environment))
}

/// Remote oracle settings, or `None` to run on the fallback alone.
fn oracle_settings(
    config: &BazaarConfig,
    source: &ConfigSource,
) -> anyhow::Result<Option<OracleConfig>> {
    match source {
        ConfigSource::File(_) => Ok(config.oracle_config()?),
        ConfigSource::Environment => {
            if std::env::var_os("ORACLE_API_KEY").is_none() {
                return Ok(None);
            }
            Ok(Some(OracleConfig::from_env()?))
        }
    }
}

fn build_oracle(
    config: &BazaarConfig,
    source: &ConfigSource,
) -> anyhow::Result<(ResilientOracle<RemoteOracle>, Duration)> {
    let resolver = FallbackResolver::new(config.pricing.fallback.clone());
    let fallback = match config.fallback.seed {
        Some(seed) => DeterministicFallbackOracle::seeded(resolver, seed),
        None => DeterministicFallbackOracle::from_entropy(resolver),
    };

    let Some(oracle_config) = oracle_settings(config, source)? else {
        info!("no oracle API key, merchants negotiate with the local fallback");
        return Ok((ResilientOracle::fallback_only(fallback), DEFAULT_ORACLE_DEADLINE));
    };

    let remote = RemoteOracle::from_config(&oracle_config)?;
    let policy = RetryPolicy::from(&oracle_config);
    let deadline = DEFAULT_ORACLE_DEADLINE
        .max(policy.round_budget().saturating_add(Duration::from_secs(1)));
    info!(
        backend = remote.name(),
        model = oracle_config.backend.model,
        timeout_ms = oracle_config.request_timeout.as_millis(),
        max_retries = policy.max_retries,
        round_deadline_ms = deadline.as_millis(),
        "remote negotiation oracle configured"
    );
    Ok((ResilientOracle::new(remote, fallback, policy), deadline))
}

// ---------------------------------------------------------------------------
// Stall
// ---------------------------------------------------------------------------

struct Stall {
    desk: Desk,
    journal: std::sync::Arc<TracingJournal>,
    merchant: Merchant,
    wares: Item,
    keepsake: Item,
    negotiation: Option<SessionId>,
}

impl Stall {
    fn open(
        config: &BazaarConfig,
        oracle: ResilientOracle<RemoteOracle>,
        deadline: Duration,
    ) -> anyhow::Result<Self> {
        let merchant =
            Merchant::new("Hassan", Personality::Greedy, 0.6).with_languages(["Elvish"]);
        let wares = Item::new("Brass Lantern", 60, [ItemCategory::Tool], Rarity::Common)
            .context("lantern must have a price")?;
        let keepsake = Item::new("Silk Scarf", 40, [ItemCategory::Misc], Rarity::Uncommon)
            .context("scarf must have a price")?;

        let skills = SkillProfile {
            bargaining_level: 2,
            ..SkillProfile::default()
        };
        let ledger =
            PlayerLedger::with_stock(PlayerId::new(), 100, [(keepsake.name.as_str(), 1)]);
        let journal = std::sync::Arc::new(TracingJournal::new());

        let mut desk = TradeDesk::new(ledger, skills, oracle, &config.pricing)
            .with_oracle_deadline(deadline)
            .with_hook(std::sync::Arc::clone(&journal));
        if let Some(seed) = config.fallback.seed {
            desk = desk.with_seed(seed);
        }

        Ok(Self {
            desk,
            journal,
            merchant,
            wares,
            keepsake,
            negotiation: None,
        })
    }

    async fn run(&mut self) -> anyhow::Result<()> {
        println!(
            "{} ({}) sells a {}. You carry a {}.",
            self.merchant.name,
            self.merchant.personality.description(),
            self.wares.name,
            self.keepsake.name
        );
        println!("{HELP}");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await.context("reading stdin")? {
            let command = match Command::parse(&line) {
                Ok(command) => command,
                Err(e) => {
                    println!("{e}");
                    continue;
                }
            };
            if command == Command::Quit {
                break;
            }
            if let Err(e) = self.dispatch(command).await {
                println!("{}", e.user_message());
            }
        }

        if let Some(id) = self.negotiation.take() {
            self.desk.dismiss(id);
        }
        info!(
            xp = self.journal.total_xp(),
            trades = self.journal.entries(),
            "bazaar stall closing"
        );
        Ok(())
    }

    async fn dispatch(&mut self, command: Command) -> Result<(), EngineError> {
        match command {
            Command::Help => println!("{HELP}"),
            Command::Status => self.status(),
            Command::Quote => {
                let quote = self.desk.quote(&self.merchant, &self.wares);
                println!(
                    "{}: {} gold (list {}).",
                    self.wares.name, quote.final_price, quote.base_price
                );
                for modifier in &quote.breakdown {
                    println!("  {:<12} {:>5.2}", modifier.label, modifier.value);
                }
            }
            Command::Buy => {
                let record = self.desk.buy(&self.merchant, &self.wares)?;
                println!("You buy the {} for {} gold.", record.item, record.price);
            }
            Command::Haggle(price) => {
                let receipt = self.desk.haggle(&self.merchant, &self.wares, price)?;
                if receipt.outcome.success {
                    println!("{} grumbles and takes your {price} gold.", self.merchant.name);
                } else {
                    println!(
                        "{} waves you off. The fair price is {}.",
                        self.merchant.name, receipt.outcome.fair_price
                    );
                }
            }
            Command::Sell => {
                let id = self.desk.open_negotiation(&self.merchant, &self.keepsake)?;
                self.negotiation = Some(id);
                let suggested = self.desk.session(id).map_or(0, |s| s.suggested_price());
                println!(
                    "{} eyes your {}. Try asking around {suggested} gold.",
                    self.merchant.name, self.keepsake.name
                );
            }
            Command::Offer(price) => self.offer(price).await?,
            Command::Accept => {
                let suggested = self
                    .negotiation
                    .and_then(|id| self.desk.session(id))
                    .map(bazaar_engine::NegotiationSession::suggested_price);
                match suggested {
                    Some(price) => self.offer(price).await?,
                    None => println!("Start with `sell` first."),
                }
            }
            Command::Cancel => match self.negotiation.take() {
                Some(id) => {
                    self.desk.cancel(id)?;
                    println!("You walk away.");
                }
                None => println!("You are not negotiating."),
            },
            Command::Quit => {}
        }
        Ok(())
    }

    async fn offer(&mut self, price: u32) -> Result<(), EngineError> {
        let Some(id) = self.negotiation else {
            println!("Start with `sell` first.");
            return Ok(());
        };

        let result = match self.desk.propose(id, price).await {
            Ok(result) => result,
            Err(e @ (EngineError::UnknownSession(_) | EngineError::StaleResponse)) => {
                warn!(session_id = %id, "negotiation vanished");
                self.negotiation = None;
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        println!("{}: \"{}\"", self.merchant.name, result.outcome.dialogue);
        if let Some(record) = result.record {
            println!("Sold for {} gold.", record.price);
            self.negotiation = None;
        } else {
            println!(
                "(rapport {}, try {} gold)",
                result.relationship_score, result.suggested_price
            );
        }
        Ok(())
    }

    fn status(&self) {
        let ledger = self.desk.ledger();
        println!(
            "gold {}, {} x{}, {} x{}, rapport with {} {}",
            ledger.gold(),
            self.keepsake.name,
            ledger.stock_of(&self.keepsake.name),
            self.wares.name,
            ledger.stock_of(&self.wares.name),
            self.merchant.name,
            self.desk.tracker().get(self.merchant.id)
        );
    }
}
