//! Snowflake-style id generation.
//!
//! Ids pack `(tick << 22) | (machine_id << 10) | sequence` into an i64,
//! where a tick is 10 milliseconds since 2020-01-01T00:00:00Z. The machine
//! id mixes the low byte of the host's routed IPv4 address with the
//! process id, resolved once per process. Exhausting the 10-bit sequence
//! within one tick yields 0; callers retry on the next tick.

use std::net::{SocketAddr, UdpSocket};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use lazy_static::lazy_static;

/// Seconds from the Unix epoch to 2020-01-01T00:00:00Z.
const EPOCH_OFFSET_SECS: i64 = 1_577_836_800;
const SEQUENCE_BITS: u32 = 10;
const MACHINE_BITS: u32 = 12;

struct TickState {
    last_tick: i64,
    last_seq: i64,
}

/// Generator with its tick/sequence pair behind a mutex, safe to share
/// across tasks and threads.
pub struct SnowflakeGenerator {
    machine_id: i64,
    state: Mutex<TickState>,
}

impl SnowflakeGenerator {
    #[must_use]
    pub fn new(machine_id: i64) -> Self {
        SnowflakeGenerator {
            machine_id: machine_id & ((1 << MACHINE_BITS) - 1),
            state: Mutex::new(TickState {
                last_tick: 0,
                last_seq: 0,
            }),
        }
    }

    fn current_tick() -> i64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        i64::try_from(now.as_millis() / 10).unwrap_or(i64::MAX) - EPOCH_OFFSET_SECS * 100
    }

    /// Next id, or 0 when the current tick's sequence space is used up.
    pub fn generate(&self) -> i64 {
        self.generate_at(Self::current_tick())
    }

    /// Spin until the clock moves past an exhausted tick.
    pub fn generate_blocking(&self) -> i64 {
        loop {
            let id = self.generate();
            if id != 0 {
                return id;
            }
            std::hint::spin_loop();
        }
    }

    fn generate_at(&self, tick: i64) -> i64 {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let count;
        if state.last_tick == tick {
            count = state.last_seq + 1;
            if count >= (1 << SEQUENCE_BITS) {
                return 0;
            }
        } else {
            count = 0;
            state.last_tick = tick;
        }
        state.last_seq = count;
        (tick << (SEQUENCE_BITS + MACHINE_BITS)) | (self.machine_id << SEQUENCE_BITS) | count
    }
}

/// Low byte of the local address used to reach the outside, via the
/// connected-UDP-socket trick (no packet is sent). Hosts without a route
/// fall back to 0 and rely on the pid component alone.
fn local_addr_low_byte() -> Option<u8> {
    let socket = UdpSocket::bind(("0.0.0.0", 0)).ok()?;
    socket.connect(("8.8.8.8", 80)).ok()?;
    match socket.local_addr().ok()? {
        SocketAddr::V4(addr) => Some(addr.ip().octets()[3]),
        SocketAddr::V6(_) => None,
    }
}

fn resolve_machine_id() -> i64 {
    let low = local_addr_low_byte().unwrap_or(0);
    (i64::from(low) << 4) | i64::from(std::process::id() % 16)
}

lazy_static! {
    static ref GENERATOR: SnowflakeGenerator = SnowflakeGenerator::new(resolve_machine_id());
}

/// Next id from the process-wide generator (0 on tick exhaustion).
#[must_use]
pub fn next_id() -> i64 {
    GENERATOR.generate()
}

/// Next id from the process-wide generator, spinning through exhaustion.
#[must_use]
pub fn next_id_blocking() -> i64 {
    GENERATOR.generate_blocking()
}
