//! Standalone migration runner (`cargo run -p migration -- up`), for
//! operating on a database without booting the control plane.

use migration::Migrator;
use sea_orm_migration::cli;

#[tokio::main]
async fn main() {
    cli::run_cli(Migrator).await;
}
