use fieldops_dispatch::{AssignmentSettings, Board, Dispatcher};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let board_file = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("FIELDOPS_BOARD_FILE").ok())
        .ok_or("usage: fieldops-dispatch <board.json> (or set FIELDOPS_BOARD_FILE)")?;

    let settings = AssignmentSettings::from_env()?;
    info!("Loading board from {} with settings {:?}", board_file, settings);

    let board: Board = serde_json::from_str(&tokio::fs::read_to_string(&board_file).await?)?;
    info!(
        "Board has {} personnel and {} work items ({} pending)",
        board.personnel.len(),
        board.work_items.len(),
        board.pending().count()
    );

    let mut dispatcher = Dispatcher::new(settings, board);
    let report = dispatcher.auto_assign_all();

    for (id, error) in &report.unassigned {
        warn!("Could not assign {}: {}", id, error);
    }

    tokio::fs::write(&board_file, serde_json::to_string_pretty(dispatcher.board())?).await?;
    info!("Wrote updated board to {}", board_file);

    Ok(())
}
