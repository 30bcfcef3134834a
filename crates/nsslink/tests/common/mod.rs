//! Simulated reaction wheel for integration tests.
//!
//! [`Wheel`] answers NSP requests the way the firmware does: it ignores
//! frames for other addresses and frames with a bad CRC, ACKs valid
//! commands and NACKs unknown blocks, addresses and modes.

#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::io::{Read, Write};
use std::os::unix::net::UnixListener;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;

use bytes::{BufMut, Bytes, BytesMut};
use nsslink_frame::{
    slip, Checksum, Command, Crc16, Frame, PacketCodec, SlipDecoder, COMMAND_MASK,
    DEFAULT_DEVICE_ADDR,
};
use nsslink_icd::{memory, ControlMode, QFormat, TelemetryBlock};
use nsslink_transport::Transport;

pub const DEVICE_TYPE: u8 = 0x4E;
pub const SERIAL: u8 = 42;
pub const FIRMWARE: [u8; 3] = [1, 4, 2];

/// NACK payload for a malformed or unsupported request.
pub const NACK_INVALID: u8 = 0x01;

#[derive(Debug)]
pub struct Wheel {
    pub addr: u8,
    pub memory: BTreeMap<u8, u32>,
    pub mode: u8,
    pub setpoint: i32,
    pub fault: u32,
    pub status: u32,
    pub protection: u32,
    pub speed_rpm: f64,
    /// Replies to swallow before answering again.
    pub drop_replies: u32,
    /// Replies to send with a broken CRC.
    pub corrupt_replies: u32,
    /// Every request that passed the CRC, in arrival order.
    pub requests: Vec<Frame>,
    codec: PacketCodec,
    decoder: SlipDecoder,
}

impl Default for Wheel {
    fn default() -> Self {
        let mut memory = BTreeMap::new();
        memory.insert(memory::SERIAL_NUMBER, u32::from(SERIAL));
        memory.insert(memory::OVERSPEED_FAULT_THRESHOLD, QFormat::UQ24_8.encode(6000.0));
        memory.insert(memory::ACTIVE_SPEED_LIMIT, QFormat::UQ24_8.encode(5000.0));
        Self {
            addr: DEFAULT_DEVICE_ADDR,
            memory,
            mode: ControlMode::Idle.code(),
            setpoint: 0,
            fault: 0,
            status: 0,
            protection: 0,
            speed_rpm: 0.0,
            drop_replies: 0,
            corrupt_replies: 0,
            requests: Vec::new(),
            codec: PacketCodec::new(),
            decoder: SlipDecoder::new(),
        }
    }
}

impl Wheel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed wire bytes from the host and return the wire bytes sent back.
    pub fn respond(&mut self, wire: &[u8]) -> Vec<u8> {
        let mut out = BytesMut::new();
        for raw in self.decoder.feed(wire) {
            let Ok(request) = self.codec.decode(&raw) else {
                continue;
            };
            self.requests.push(request.clone());
            let Some(reply) = self.handle(&request) else {
                continue;
            };
            if self.drop_replies > 0 {
                self.drop_replies -= 1;
                continue;
            }
            if self.corrupt_replies > 0 {
                self.corrupt_replies -= 1;
                let mut body = Crc16::CCITT_FALSE.with_checksum(&reply.to_bytes()).to_vec();
                if let Some(last) = body.last_mut() {
                    *last ^= 0x5A;
                }
                out.extend_from_slice(&slip::encode(&body));
                continue;
            }
            self.codec.encode(&reply, &mut out);
        }
        out.to_vec()
    }

    /// Reply to one request, or `None` when the wheel stays silent.
    pub fn handle(&mut self, request: &Frame) -> Option<Frame> {
        if request.dest_addr != self.addr || !request.is_request() {
            return None;
        }
        let code = request.command_code();
        let Some(command) = request.command() else {
            return Some(Frame {
                dest_addr: request.src_addr,
                src_addr: self.addr,
                control: code & COMMAND_MASK,
                payload: Bytes::from_static(&[NACK_INVALID]),
            });
        };

        let payload = &request.payload[..];
        let result = match command {
            Command::Ping => {
                let mut info = vec![DEVICE_TYPE, SERIAL];
                info.extend_from_slice(&FIRMWARE);
                Ok(info)
            }
            Command::Peek => match payload {
                [addr] => self
                    .memory
                    .get(addr)
                    .map(|value| value.to_le_bytes().to_vec())
                    .ok_or(()),
                _ => Err(()),
            },
            Command::Poke => match payload {
                [addr, b0, b1, b2, b3] if self.memory.contains_key(addr) => {
                    self.memory
                        .insert(*addr, u32::from_le_bytes([*b0, *b1, *b2, *b3]));
                    Ok(Vec::new())
                }
                _ => Err(()),
            },
            Command::AppTelemetry => match payload {
                [id] => TelemetryBlock::try_from(*id)
                    .map(|block| self.telemetry(block))
                    .map_err(|_| ()),
                _ => Err(()),
            },
            Command::AppCommand => match payload {
                [mode, b0, b1, b2, b3] => match ControlMode::try_from(*mode) {
                    Ok(parsed) => {
                        self.mode = *mode;
                        self.setpoint = i32::from_le_bytes([*b0, *b1, *b2, *b3]);
                        self.speed_rpm = match parsed {
                            ControlMode::Speed => QFormat::Q14_18.decode(self.setpoint as u32),
                            ControlMode::Idle => 0.0,
                            _ => self.speed_rpm,
                        };
                        Ok(Vec::new())
                    }
                    Err(_) => Err(()),
                },
                _ => Err(()),
            },
            Command::ClearFault => match payload {
                [b0, b1, b2, b3] => {
                    self.fault &= !u32::from_le_bytes([*b0, *b1, *b2, *b3]);
                    Ok(Vec::new())
                }
                _ => Err(()),
            },
            Command::ConfigProtection => match payload {
                [b0, b1, b2, b3] => {
                    self.protection = u32::from_le_bytes([*b0, *b1, *b2, *b3]);
                    Ok(Vec::new())
                }
                _ => Err(()),
            },
            Command::TripLcl => Err(()),
        };

        Some(match result {
            Ok(body) => Frame::reply(command, body, true, request.src_addr, self.addr),
            Err(()) => Frame::reply(command, vec![NACK_INVALID], false, request.src_addr, self.addr),
        })
    }

    fn telemetry(&self, block: TelemetryBlock) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(block.len());
        match block {
            TelemetryBlock::Standard => {
                buf.put_u32_le(self.status);
                buf.put_u32_le(self.fault);
                buf.put_u8(self.mode);
                buf.put_i32_le(self.setpoint);
                buf.put_i16_le(0);
                buf.put_u16_le(QFormat::Q14_2.encode(0.0) as u16);
                buf.put_u32_le(QFormat::Q20_12.encode(0.0));
                buf.put_u32_le(QFormat::Q24_8.encode(self.speed_rpm));
            }
            TelemetryBlock::Temp => {
                for raw in [1200u16, 1300, 1400, 1500] {
                    buf.put_u16_le(raw);
                }
            }
            TelemetryBlock::Volt => {
                for volts in [1.5, 3.3, 5.0, 12.0, 30.0, 2.5] {
                    buf.put_u32_le(QFormat::UQ16_16.encode(volts));
                }
            }
            TelemetryBlock::Curr => {
                for amps in [10.0, 20.0, 30.0, 40.0, 50.0, 0.5] {
                    buf.put_u32_le(QFormat::UQ16_16.encode(amps));
                }
            }
            TelemetryBlock::DiagGeneral => {
                buf.put_u32_le(QFormat::UQ30_2.encode(3600.25));
                for count in [1000u32, 0, 0, 0] {
                    buf.put_u32_le(count);
                }
            }
        }
        buf.to_vec()
    }
}

/// In-process transport wired straight to a [`Wheel`].
#[derive(Debug, Clone, Default)]
pub struct SimTransport {
    pub wheel: Arc<Mutex<Wheel>>,
    rx: Arc<Mutex<VecDeque<u8>>>,
}

impl SimTransport {
    pub fn new(wheel: Wheel) -> Self {
        Self {
            wheel: Arc::new(Mutex::new(wheel)),
            rx: Arc::default(),
        }
    }

    pub fn with_wheel<R>(&self, f: impl FnOnce(&mut Wheel) -> R) -> R {
        let mut wheel = self.wheel.lock().expect("wheel lock should not be poisoned");
        f(&mut wheel)
    }
}

impl Transport for SimTransport {
    fn write(&mut self, data: &[u8]) -> nsslink_transport::Result<usize> {
        let reply = self.with_wheel(|wheel| wheel.respond(data));
        self.rx
            .lock()
            .expect("rx lock should not be poisoned")
            .extend(reply);
        Ok(data.len())
    }

    fn read_available(&mut self) -> nsslink_transport::Result<Bytes> {
        let mut rx = self.rx.lock().expect("rx lock should not be poisoned");
        Ok(rx.drain(..).collect::<Vec<u8>>().into())
    }

    fn flush_input(&mut self) -> nsslink_transport::Result<()> {
        self.rx.lock().expect("rx lock should not be poisoned").clear();
        Ok(())
    }
}

pub fn unique_socket_path(tag: &str) -> PathBuf {
    let dir = PathBuf::from(format!(
        "/tmp/nsslink-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir.join("wheel.sock")
}

/// Serve `wheel` on a unix socket, one connection at a time, until the
/// test process exits.
pub fn serve_socket(path: &Path, wheel: Wheel) -> Arc<Mutex<Wheel>> {
    let listener = UnixListener::bind(path).expect("emulator socket should bind");
    let wheel = Arc::new(Mutex::new(wheel));
    let shared = wheel.clone();
    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else {
                continue;
            };
            let mut buf = [0u8; 512];
            loop {
                let n = match stream.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => n,
                };
                let reply = shared
                    .lock()
                    .expect("wheel lock should not be poisoned")
                    .respond(&buf[..n]);
                if !reply.is_empty() && stream.write_all(&reply).is_err() {
                    break;
                }
            }
        }
    });
    wheel
}

/// Accept connections and read requests without ever answering.
pub fn serve_silent(path: &Path) {
    let listener = UnixListener::bind(path).expect("emulator socket should bind");
    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else {
                continue;
            };
            let mut buf = [0u8; 512];
            while matches!(stream.read(&mut buf), Ok(n) if n > 0) {}
        }
    });
}
