//! Connect to a terminal and dump its identity, capacities and user table.

use bioterm::Device;

#[tokio::main]
async fn main() -> bioterm::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let ip = std::env::var("DEVICE_IP").unwrap_or_else(|_| "192.168.1.201".to_string());
    let password = std::env::var("DEVICE_PASSWORD")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(0);

    let mut device = Device::udp(ip, bioterm::DEFAULT_PORT).with_password(password);
    device.connect().await?;

    let info = device.get_device_info().await?;
    println!("device: {}", info);

    let sizes = device.read_sizes().await?;
    println!("capacity: {}", sizes);

    for user in device.get_users().await? {
        println!("  {:5}  {:24}  {}", user.uid, user.name, user.user_id);
    }

    device.disconnect().await?;
    Ok(())
}
