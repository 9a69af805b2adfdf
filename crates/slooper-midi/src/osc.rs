//! OSC transport for engine commands
//!
//! Commands are encoded with rosc and sent as single UDP datagrams. There is
//! no acknowledgment; send failures are logged and dropped.

use crate::command::{Command, CommandArg, CommandEmitter};
use crate::config::OscConfig;
use rosc::{OscMessage, OscPacket, OscType};
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};

/// Error type for OSC setup and one-shot sends
#[derive(Debug, thiserror::Error)]
pub enum OscError {
    #[error("Failed to bind UDP socket: {0}")]
    Bind(#[source] std::io::Error),

    #[error("Failed to resolve OSC target {0}")]
    Resolve(String),

    #[error("Failed to encode OSC packet: {0:?}")]
    Encode(rosc::OscError),

    #[error("Failed to decode OSC packet: {0:?}")]
    Decode(rosc::OscError),

    #[error("Failed to send OSC packet: {0}")]
    Send(#[source] std::io::Error),
}

/// Convert a command into its OSC message form
pub fn to_osc_message(command: &Command) -> OscMessage {
    let args = command
        .args()
        .into_iter()
        .map(|arg| match arg {
            CommandArg::Str(s) => OscType::String(s.to_string()),
            // int32 unless the value needs the wider type
            CommandArg::Int(i) => i32::try_from(i).map_or(OscType::Long(i), OscType::Int),
        })
        .collect();
    OscMessage {
        addr: command.address(),
        args,
    }
}

/// Interpret command-line words as OSC arguments
///
/// Integers become `Int`, other numbers `Float`, everything else `String`.
pub fn parse_args<S: AsRef<str>>(words: &[S]) -> Vec<OscType> {
    words
        .iter()
        .map(|word| {
            let word = word.as_ref();
            if let Ok(i) = word.parse::<i32>() {
                OscType::Int(i)
            } else if let Ok(f) = word.parse::<f32>() {
                OscType::Float(f)
            } else {
                OscType::String(word.to_string())
            }
        })
        .collect()
}

/// Flatten a decoded packet into its messages (bundles are unpacked)
pub fn flatten_packet(packet: OscPacket) -> Vec<OscMessage> {
    match packet {
        OscPacket::Message(msg) => vec![msg],
        OscPacket::Bundle(bundle) => bundle
            .content
            .into_iter()
            .flat_map(flatten_packet)
            .collect(),
    }
}

/// Decode one UDP datagram into messages
pub fn decode_datagram(data: &[u8]) -> Result<Vec<OscMessage>, OscError> {
    let (_, packet) = rosc::decoder::decode_udp(data).map_err(OscError::Decode)?;
    Ok(flatten_packet(packet))
}

/// UDP sender bound to one engine address
pub struct OscEmitter {
    socket: UdpSocket,
    target: SocketAddr,
}

impl OscEmitter {
    /// Bind an ephemeral local socket and resolve the engine address
    pub fn connect(config: &OscConfig) -> Result<Self, OscError> {
        let target_str = format!("{}:{}", config.host, config.port);
        let target = target_str
            .to_socket_addrs()
            .map_err(|_| OscError::Resolve(target_str.clone()))?
            .next()
            .ok_or_else(|| OscError::Resolve(target_str.clone()))?;

        let bind_addr = if target.is_ipv6() { "[::]:0" } else { "0.0.0.0:0" };
        let socket = UdpSocket::bind(bind_addr).map_err(OscError::Bind)?;

        log::info!("OSC: Sending engine commands to {}", target);
        Ok(Self { socket, target })
    }

    /// Encode and send an arbitrary message
    pub fn send_message(&self, message: OscMessage) -> Result<(), OscError> {
        let packet = OscPacket::Message(message);
        let bytes = rosc::encoder::encode(&packet).map_err(OscError::Encode)?;
        self.socket
            .send_to(&bytes, self.target)
            .map_err(OscError::Send)?;
        Ok(())
    }
}

impl CommandEmitter for OscEmitter {
    fn emit(&mut self, command: &Command) {
        log::debug!("[OSC OUT] {}", command);
        if let Err(e) = self.send_message(to_osc_message(command)) {
            log::warn!("OSC: Failed to send {}: {}", command, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::SlotParam;

    #[test]
    fn test_to_osc_message() {
        let msg = to_osc_message(&Command::slot(1, SlotParam::Rec, 1));
        assert_eq!(msg.addr, "/slot1");
        assert_eq!(
            msg.args,
            vec![OscType::String("rec".to_string()), OscType::Int(1)]
        );

        let msg = to_osc_message(&Command::Monitor(false));
        assert_eq!(msg.addr, "/monitor");
        assert_eq!(msg.args, vec![OscType::Int(0)]);
    }

    #[test]
    fn test_parse_args() {
        let args = parse_args(&["crop", "-50", "0.5"]);
        assert_eq!(
            args,
            vec![
                OscType::String("crop".to_string()),
                OscType::Int(-50),
                OscType::Float(0.5),
            ]
        );
    }

    #[test]
    fn test_emitter_delivers_over_udp() {
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        receiver
            .set_read_timeout(Some(std::time::Duration::from_secs(2)))
            .unwrap();
        let port = receiver.local_addr().unwrap().port();

        let mut emitter = OscEmitter::connect(&OscConfig {
            host: "127.0.0.1".to_string(),
            port,
        })
        .unwrap();
        emitter.emit(&Command::slot(2, SlotParam::Crop, 150));

        let mut buf = [0u8; 1024];
        let (len, _) = receiver.recv_from(&mut buf).unwrap();
        let messages = decode_datagram(&buf[..len]).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].addr, "/slot2");
        assert_eq!(
            messages[0].args,
            vec![OscType::String("crop".to_string()), OscType::Int(150)]
        );
    }

    #[test]
    fn test_unresolvable_target() {
        let result = OscEmitter::connect(&OscConfig {
            host: "not a host name".to_string(),
            port: 9000,
        });
        assert!(matches!(result, Err(OscError::Resolve(_))));
    }

    #[test]
    fn test_wide_crop_value_uses_int64() {
        let msg = to_osc_message(&Command::slot(1, SlotParam::Crop, 3_000_000_000));
        assert_eq!(
            msg.args,
            vec![
                OscType::String("crop".to_string()),
                OscType::Long(3_000_000_000),
            ]
        );
    }
}
