//! Stream live attendance punches for one minute.

use std::time::Duration;

use bioterm::{Device, LiveEvent};

#[tokio::main]
async fn main() -> bioterm::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let ip = std::env::var("DEVICE_IP").unwrap_or_else(|_| "192.168.1.201".to_string());

    let mut device = Device::udp(ip, bioterm::DEFAULT_PORT);
    device.connect().await?;

    let mut capture = device.live_capture().await?;
    let handle = capture.cancel_handle();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(60)).await;
        handle.cancel();
    });

    println!("waiting for punches...");
    while let Some(event) = capture.next().await? {
        match event {
            LiveEvent::Attendance(att) => println!("{}", att),
            LiveEvent::Idle => println!("(idle)"),
        }
    }

    device.disconnect().await?;
    Ok(())
}
