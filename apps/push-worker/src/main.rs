//! Push Worker Service - Entry Point
//!
//! Background worker that dispatches push jobs from the Redis stream to
//! APNs and FCM.

#[tokio::main]
async fn main() -> eyre::Result<()> {
    push_worker::run().await
}
