//! Tombola demo binary
//!
//! Runs one simulated game room end to end: players buy chips, cards are
//! dealt, numbers are drawn, and the payout coordinator credits every win
//! through the ledger.

use clap::Parser;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::sync::Arc;
use tombola::{
    Card, ConfigLoader, LedgerStore, LedgerStorage, LocalChipStore, PayoutCoordinator, PrizeTable,
    TxCategory, WalletSession,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "tombola")]
#[command(about = "Tombola chip ledger demo room", long_about = None)]
struct Args {
    /// Configuration file (TOML)
    #[arg(long)]
    config: Option<String>,

    /// Ledger database directory
    #[arg(long)]
    data_dir: Option<String>,

    /// Owner identity of the system wallet funding payouts
    #[arg(long)]
    system_wallet: Option<String>,

    /// Number of players in the simulated room
    #[arg(long, default_value = "4")]
    players: usize,

    /// RNG seed for a reproducible room
    #[arg(long, default_value = "7")]
    seed: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();

    let mut loader = ConfigLoader::new();
    if let Some(ref path) = args.config {
        loader = loader.with_path(path);
    }
    let mut config = loader.load()?;
    if let Some(data_dir) = args.data_dir {
        config.storage.data_dir = data_dir;
    }
    if args.system_wallet.is_some() {
        config.system_wallet_owner = args.system_wallet;
    }

    let storage = LedgerStorage::open(&config.storage)?;
    let ledger = Arc::new(LedgerStore::new(storage));
    let local = LocalChipStore::new(&config.local_wallet_path);
    let prizes = PrizeTable::from(&config.prizes);
    let coordinator = PayoutCoordinator::new(ledger.clone(), prizes);

    // Print ledger events as they happen, the way a UI would consume them.
    let mut events = ledger.events().subscribe();
    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            info!(?event, "ledger event");
        }
    });

    let mut session = WalletSession::new(
        ledger.clone(),
        local,
        config.system_wallet_owner.clone(),
    );

    // Buy chips anonymously, then sign in; the local balance merges into
    // the authenticated wallet.
    session.credit(1000, TxCategory::Purchase).await?;
    let merged = session.sign_in("player-1").await?;
    info!(balance = merged, "player-1 signed in");

    let mut rng = rand::rngs::StdRng::seed_from_u64(args.seed);
    let room_id = "demo-room";
    let cards = deal_cards(room_id, args.players, &mut rng);
    for card in &cards {
        info!(card_id = %card.id, player_id = %card.player_id, "dealt card");
    }

    let mut draw_order: Vec<u32> = (1..=90).collect();
    draw_order.shuffle(&mut rng);

    let mut drawn: Vec<u32> = Vec::new();
    for number in draw_order {
        drawn.push(number);
        let report = coordinator
            .process_draw(&mut session, room_id, &cards, &drawn)
            .await?;
        for win in &report.paid {
            info!(
                number,
                pattern = %win.win_type,
                player_id = %win.player_id,
                prize = win.prize,
                "win"
            );
        }
        if ledger.awarded_patterns(room_id)?.len() == 5 {
            break;
        }
    }

    info!(drawn = drawn.len(), "room finished");
    for player in cards.iter().map(|c| c.player_id.as_str()) {
        if let Some(wallet) = ledger.find_wallet(player)? {
            info!(player, balance = wallet.balance, "final balance");
        }
    }
    if let Some(ref owner) = config.system_wallet_owner {
        if let Some(wallet) = ledger.find_wallet(owner)? {
            info!(system = %owner, balance = wallet.balance, "system wallet");
        }
    }

    drop(ledger);
    printer.abort();
    Ok(())
}

/// Deal one 3x5 card of distinct numbers to each player.
fn deal_cards(room_id: &str, players: usize, rng: &mut impl rand::Rng) -> Vec<Card> {
    let mut cards = Vec::with_capacity(players);
    for p in 1..=players {
        let mut pool: Vec<u32> = (1..=90).collect();
        pool.shuffle(rng);
        let mut numbers = [0u32; 15];
        numbers.copy_from_slice(&pool[..15]);
        cards.push(Card {
            id: format!("card-{}", p),
            room_id: room_id.to_string(),
            player_id: format!("player-{}", p),
            numbers,
        });
    }
    cards
}
