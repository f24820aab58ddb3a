//! UDP telemetry and image streaming.
//!
//! `UdpStreamer` owns one socket per channel (bounding-box metadata and
//! image), each aimed at a pre-resolved destination. Sends are synchronous,
//! best-effort, and performed on the consumer loop's thread; there is no
//! acknowledgment, retry, or reordering protection on either channel.
//!
//! Socket setup failure is fatal at startup. After that, the send paths
//! report transient errors to the caller and never retry; connection
//! recovery belongs to a supervising layer.

pub mod wire;

use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};

use anyhow::{anyhow, Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;

use crate::frame::CameraFrame;
use crate::transport::wire::{
    chunk_payload, encode_box_datagram, start_marker, BoxPacket, IMAGE_STOP_MAGIC,
    MAX_BOXES_PER_DATAGRAM,
};

/// JPEG quality for the image channel. Low on purpose: the feed favors frame
/// rate over fidelity.
pub const JPEG_QUALITY: u8 = 30;

#[derive(Clone, Debug)]
pub struct StreamerConfig {
    /// Destination host for both channels.
    pub host: String,
    /// Port receiving bounding-box datagrams.
    pub data_port: u16,
    /// Port receiving the chunked image stream.
    pub image_port: u16,
    pub jpeg_quality: u8,
}

impl Default for StreamerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            data_port: 45_100,
            image_port: 45_101,
            jpeg_quality: JPEG_QUALITY,
        }
    }
}

pub struct UdpStreamer {
    data_socket: UdpSocket,
    data_addr: SocketAddr,
    image_socket: UdpSocket,
    image_addr: SocketAddr,
    jpeg_quality: u8,
}

impl UdpStreamer {
    /// Resolve both destinations once and bind the channel sockets.
    pub fn new(config: &StreamerConfig) -> Result<Self> {
        let data_addr = resolve(&config.host, config.data_port)?;
        let image_addr = resolve(&config.host, config.image_port)?;

        let data_socket =
            UdpSocket::bind("0.0.0.0:0").context("failed to open telemetry socket")?;
        let image_socket = UdpSocket::bind("0.0.0.0:0").context("failed to open image socket")?;

        Ok(Self {
            data_socket,
            data_addr,
            image_socket,
            image_addr,
            jpeg_quality: config.jpeg_quality,
        })
    }

    /// Transmit one batch of box results as a single datagram.
    ///
    /// Batches beyond the header's 8-bit count are clamped to the first 255
    /// packets, with a diagnostic; the datagram itself is always well formed.
    pub fn send_boxes(&self, sender_id: u8, packets: &[BoxPacket]) -> Result<()> {
        if packets.len() > MAX_BOXES_PER_DATAGRAM {
            log::warn!(
                "box batch of {} exceeds datagram capacity, clamping to {}",
                packets.len(),
                MAX_BOXES_PER_DATAGRAM
            );
        }
        let datagram = encode_box_datagram(sender_id, packets);
        self.data_socket
            .send_to(&datagram, self.data_addr)
            .context("telemetry send failed")?;
        Ok(())
    }

    /// Compress and transmit one frame on the image channel.
    ///
    /// An encode failure skips this frame's image (logged, not an error);
    /// the stream continues with the next frame.
    pub fn send_image(&self, frame: &CameraFrame) -> Result<()> {
        let jpeg = match encode_jpeg(frame, self.jpeg_quality) {
            Ok(jpeg) => jpeg,
            Err(e) => {
                log::warn!("jpeg encode failed, skipping frame {}: {:#}", frame.seq, e);
                return Ok(());
            }
        };

        self.image_socket
            .send_to(&start_marker(jpeg.len()), self.image_addr)
            .context("image start marker send failed")?;
        for chunk in chunk_payload(&jpeg) {
            self.image_socket
                .send_to(chunk, self.image_addr)
                .context("image chunk send failed")?;
        }
        self.image_socket
            .send_to(IMAGE_STOP_MAGIC, self.image_addr)
            .context("image stop marker send failed")?;
        Ok(())
    }
}

fn resolve(host: &str, port: u16) -> Result<SocketAddr> {
    (host, port)
        .to_socket_addrs()
        .with_context(|| format!("failed to resolve {}:{}", host, port))?
        .next()
        .ok_or_else(|| anyhow!("no address for {}:{}", host, port))
}

/// JPEG-encode a BGR8 frame at the given quality.
fn encode_jpeg(frame: &CameraFrame, quality: u8) -> Result<Vec<u8>> {
    // The encoder wants RGB; captures are BGR.
    let mut rgb = Vec::with_capacity(frame.color.len());
    for px in frame.color.chunks_exact(3) {
        rgb.extend_from_slice(&[px[2], px[1], px[0]]);
    }

    let mut jpeg = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut jpeg, quality);
    encoder
        .encode(&rgb, frame.width, frame.height, ExtendedColorType::Rgb8)
        .context("jpeg encode")?;
    Ok(jpeg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::wire::decode_box_datagram;
    use std::time::Duration;

    fn loopback_receiver() -> (UdpSocket, u16) {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        socket
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        let port = socket.local_addr().unwrap().port();
        (socket, port)
    }

    #[test]
    fn send_boxes_reaches_loopback_receiver() {
        let (receiver, port) = loopback_receiver();
        let streamer = UdpStreamer::new(&StreamerConfig {
            host: "127.0.0.1".to_string(),
            data_port: port,
            image_port: port,
            ..StreamerConfig::default()
        })
        .unwrap();

        let packets = vec![BoxPacket {
            min_distance: 1.25,
            x_min: 10,
            x_max: 90,
            y_min: 20,
            y_max: 180,
        }];
        streamer.send_boxes(7, &packets).unwrap();

        let mut buf = [0u8; 2048];
        let (n, _) = receiver.recv_from(&mut buf).unwrap();
        let (sender_id, decoded) = decode_box_datagram(&buf[..n]).unwrap();
        assert_eq!(sender_id, 7);
        assert_eq!(decoded, packets);
    }

    #[test]
    fn encode_jpeg_produces_jpeg_magic() {
        let frame = CameraFrame {
            color: vec![128u8; 16 * 16 * 3],
            depth: vec![0u16; 16 * 16],
            width: 16,
            height: 16,
            depth_scale: 0.001,
            seq: 1,
        };
        let jpeg = encode_jpeg(&frame, JPEG_QUALITY).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn streamer_rejects_unresolvable_host() {
        let config = StreamerConfig {
            host: "".to_string(),
            ..StreamerConfig::default()
        };
        assert!(UdpStreamer::new(&config).is_err());
    }
}
