/// 18B20 Sensor Simulator
///
/// Sends the datagram mix a field probe produces to a running receiver: a
/// registration on start, temperature frames every cycle, a heartbeat every
/// few cycles, and now and then a fault sentinel or a garbage datagram.
///
/// Usage: sensor_simulator [target] [cycles]
/// Default target 127.0.0.1:8889, default 20 cycles.

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use log::info;
use rand::Rng;
use temp_udp_receiver::encode_read_response;
use temp_udp_receiver::temperature::SensorFault;
use temp_udp_receiver::utils::{format, logging};
use tokio::net::UdpSocket;
use tokio::time::sleep;

const DEVICE_ADDRESS: u8 = 0x01;
const HEARTBEAT_EVERY: u32 = 5;
const CYCLE: Duration = Duration::from_secs(1);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_logger(log::LevelFilter::Info);

    let target: SocketAddr = env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:8889".to_string())
        .parse()
        .context("parsing target address")?;
    let cycles: u32 = match env::args().nth(2) {
        Some(arg) => arg.parse().context("parsing cycle count")?,
        None => 20,
    };

    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    socket.connect(target).await?;
    info!("🚀 Simulating 18B20 probe {} -> {}", socket.local_addr()?, target);

    send(&socket, b"register device_info type=18B20 fw=1.2").await?;

    let mut rng = rand::thread_rng();
    let mut tenths: i16 = 225;

    for cycle in 0..cycles {
        let register = match rng.gen_range(0..20) {
            0 => SensorFault::Disconnected.to_u16(),
            1 => SensorFault::InitializationFailed.to_u16(),
            _ => {
                tenths = (tenths + rng.gen_range(-3..=3)).clamp(-550, 1250);
                tenths as u16
            }
        };
        // Full device frame: temperature plus three unused registers
        let frame = encode_read_response(DEVICE_ADDRESS, &[register, 0, 0, 0]);
        send(&socket, &frame).await?;

        if cycle % HEARTBEAT_EVERY == 0 {
            send(&socket, format!("heartbeat seq={}", cycle).as_bytes()).await?;
        }

        if rng.gen_bool(0.05) {
            let garbage: Vec<u8> = (0..rng.gen_range(1..16)).map(|_| rng.gen()).collect();
            send(&socket, &garbage).await?;
        }

        sleep(CYCLE).await;
    }

    info!("✅ Sent {} cycles", cycles);
    Ok(())
}

async fn send(socket: &UdpSocket, data: &[u8]) -> anyhow::Result<()> {
    socket.send(data).await?;
    info!("📤 {} bytes: {}", data.len(), format::bytes_to_hex(data));
    Ok(())
}
