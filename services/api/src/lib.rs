mod cli;
mod console;
mod demo;
mod infra;
mod routes;
mod server;

use lexgate::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
